//! Definition outline for Quill programs.
//!
//! Walks a parsed [`Program`] and collects only its definition nodes (types,
//! modules and methods) together with their leading comment text. This is
//! the AST-level view the documentation generator consumes; it performs no
//! evaluation.

use crate::ast::*;
use crate::Span;
use serde::Serialize;

/// The kind of a definition node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DefinitionKind {
    Type,
    Module,
    Method,
    ClassMethod,
}

/// One definition and the definitions nested inside it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Definition {
    pub kind: DefinitionKind,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    /// Parameter signature for methods, e.g. `(a, *rest)`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Definition>,
    pub span: Span,
}

/// Collect the definition outline of a whole program, in source order.
pub fn outline(program: &Program) -> Vec<Definition> {
    let mut out = Vec::new();
    collect(&program.body, &mut out);
    out
}

fn collect(exprs: &[Expr], out: &mut Vec<Definition>) {
    for expr in exprs {
        match &expr.kind {
            ExprKind::TypeDef(def) => {
                let mut children = Vec::new();
                collect(&def.body, &mut children);
                out.push(Definition {
                    kind: match def.kind {
                        TypeDefKind::Type => DefinitionKind::Type,
                        TypeDefKind::Module => DefinitionKind::Module,
                    },
                    name: def.name.name.clone(),
                    doc: def.doc.clone(),
                    signature: None,
                    children,
                    span: def.span,
                });
            }
            ExprKind::Def(def) => out.push(Definition {
                kind: if def.singleton {
                    DefinitionKind::ClassMethod
                } else {
                    DefinitionKind::Method
                },
                name: def.name.name.clone(),
                doc: def.doc.clone(),
                signature: Some(def.params.to_string()),
                children: Vec::new(),
                span: def.span,
            }),
            _ => {}
        }
    }
}
