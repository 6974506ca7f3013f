//! Definition parsing: `def`, `type` and `module`.

use std::rc::Rc;

use quill_lexer::TokenKind;
use quill_types::ast::*;

use crate::parse_expr::operator_method_name;
use crate::parser::{PResult, Parser};

impl Parser {
    // ══════════════════════════════════════════════════════════════════════════
    // Method Definitions
    // ══════════════════════════════════════════════════════════════════════════

    /// ```text
    /// "def" ["self" "."] MethodName ["(" Params ")"] ["if" Expr] Sep
    ///     Body { Rescue } ["else" Body] ["ensure" Body]
    /// "end"
    /// ```
    pub(crate) fn parse_def(&mut self) -> PResult<Expr> {
        let doc = self.current_doc();
        let start = self.advance().span;

        let singleton =
            self.check_exact(&TokenKind::SelfKw) && self.look_ahead(1) == &TokenKind::Dot;
        if singleton {
            self.advance();
            self.advance();
        }

        let name = self.parse_def_name()?;
        let params = if self.eat(&TokenKind::LParen) {
            let params = self.parse_param_list(&TokenKind::RParen)?;
            self.expect(&TokenKind::RParen)?;
            params
        } else {
            ParamList::default()
        };
        let guard = self.parse_guard()?;
        self.expect_separator()?;

        let body = self.parse_protected_body(start, "def")?;
        let span = body.span;
        let def = MethodDef {
            name,
            singleton,
            params,
            guard,
            body,
            doc,
            span,
        };
        Ok(Expr::new(ExprKind::Def(Rc::new(def)), span))
    }

    /// A method name after `def`: everything accepted after `.`, plus
    /// setters (`name=`) and `[]=`.
    fn parse_def_name(&mut self) -> PResult<Ident> {
        let token = self.peek().clone();
        match &token.kind {
            TokenKind::Identifier(name) if self.look_ahead(1) == &TokenKind::Assign => {
                self.advance();
                let eq = self.advance();
                Ok(Ident::new(format!("{name}="), token.span.merge(eq.span)))
            }
            TokenKind::LBracket
                if self.look_ahead(1) == &TokenKind::RBracket
                    && self.look_ahead(2) == &TokenKind::Assign =>
            {
                self.advance();
                self.advance();
                let eq = self.advance();
                Ok(Ident::new("[]=", token.span.merge(eq.span)))
            }
            kind if operator_method_name(kind).is_some() => self.expect_method_name(),
            TokenKind::Identifier(_)
            | TokenKind::Constant(_)
            | TokenKind::LBracket => self.expect_method_name(),
            kind if kind.is_keyword() => self.expect_method_name(),
            _ => Err(self.unexpected("method name")),
        }
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Type & Module Definitions
    // ══════════════════════════════════════════════════════════════════════════

    /// `"type" Constant ["<" Postfix] Sep Body "end"` or
    /// `"module" Constant Sep Body "end"`
    pub(crate) fn parse_type_def(&mut self, kind: TypeDefKind) -> PResult<Expr> {
        let doc = self.current_doc();
        let start = self.advance().span;
        let name = self.expect_constant()?;

        let superclass = if kind == TypeDefKind::Type && self.eat(&TokenKind::Less) {
            Some(self.parse_postfix()?)
        } else {
            None
        };
        self.expect_separator()?;

        let body = self.parse_statements()?;
        let end = self.expect_end(kind.keyword())?;
        let span = start.merge(end.span);
        let def = TypeDef {
            kind,
            name,
            superclass,
            body,
            doc,
            span,
        };
        Ok(Expr::new(ExprKind::TypeDef(Rc::new(def)), span))
    }
}
