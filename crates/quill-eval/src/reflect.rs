//! Reflection data for documentation tooling.
//!
//! A [`TypeInfo`] is a read-only snapshot of a type or module: its ancestry,
//! its method tables with per-clause arity and doc comments, its constants,
//! and the types and modules nested inside it. Tables keep declaration order.

use std::rc::Rc;

use serde::Serialize;

use crate::object::{ancestors, Clause, TypeKind, TypeRef};
use crate::value::{scalar_inspect, Value};

/// A type or module.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeInfo {
    pub name: String,
    pub kind: TypeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    /// Qualified names, self first.
    pub ancestors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub superclass: Option<String>,
    pub instance_methods: Vec<MethodInfo>,
    pub class_methods: Vec<MethodInfo>,
    /// Constants other than nested types and modules.
    pub constants: Vec<ConstantInfo>,
    pub nested: Vec<TypeInfo>,
}

/// One method name and its overload set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodInfo {
    pub name: String,
    pub clauses: Vec<ClauseInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClauseInfo {
    /// Required positional arguments.
    pub arity: usize,
    pub variadic: bool,
    pub native: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstantInfo {
    pub name: String,
    /// `inspect` text for scalar values.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl TypeInfo {
    pub fn instance_method(&self, name: &str) -> Option<&MethodInfo> {
        self.instance_methods.iter().find(|m| m.name == name)
    }

    pub fn class_method(&self, name: &str) -> Option<&MethodInfo> {
        self.class_methods.iter().find(|m| m.name == name)
    }

    pub fn nested_type(&self, name: &str) -> Option<&TypeInfo> {
        self.nested.iter().find(|t| t.name == name)
    }
}

/// Snapshot `ty`, recursing into types and modules defined inside it.
pub fn type_info(ty: &TypeRef) -> TypeInfo {
    let mut constants = Vec::new();
    let mut nested = Vec::new();
    for (name, value) in ty.constants() {
        match &value {
            Value::Type(inner) if is_nested_in(inner, ty) => nested.push(type_info(inner)),
            // Aliases of types defined elsewhere.
            Value::Type(inner) => constants.push(ConstantInfo {
                name,
                value: Some(inner.name.clone()),
            }),
            _ => constants.push(ConstantInfo {
                name,
                value: scalar_inspect(&value),
            }),
        }
    }

    TypeInfo {
        name: ty.name.clone(),
        kind: ty.kind,
        doc: ty.doc(),
        ancestors: ancestors(ty).iter().map(|t| t.name.clone()).collect(),
        superclass: ty.superclass().map(|s| s.name.clone()),
        instance_methods: ty
            .method_names()
            .into_iter()
            .map(|name| {
                let clauses = ty.method(&name).unwrap_or_default();
                method_info(name, &clauses)
            })
            .collect(),
        class_methods: ty
            .class_method_names()
            .into_iter()
            .map(|name| {
                let clauses = ty.class_method(&name).unwrap_or_default();
                method_info(name, &clauses)
            })
            .collect(),
        constants,
        nested,
    }
}

fn is_nested_in(inner: &TypeRef, outer: &TypeRef) -> bool {
    inner.parent().is_some_and(|p| Rc::ptr_eq(&p, outer))
}

fn method_info(name: String, clauses: &[Clause]) -> MethodInfo {
    MethodInfo {
        name,
        clauses: clauses
            .iter()
            .map(|clause| ClauseInfo {
                arity: clause.arity(),
                variadic: clause.is_variadic(),
                native: clause.is_native(),
                doc: clause.doc(),
            })
            .collect(),
    }
}

/// Pretty-printed JSON.
pub fn to_json<T: Serialize + ?Sized>(info: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(info)
}
