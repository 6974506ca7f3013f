//! The object model: type and module objects, method tables, ancestry.
//!
//! User-defined types and modules are data, not host-language subclasses:
//! a [`TypeObj`] carries its superclass, included modules, instance-side and
//! class-side method tables and its constants. Dispatch walks
//! [`ancestors`] and looks methods up in those tables.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use quill_types::ast::{MethodDef, Pattern};
use serde::Serialize;

use crate::native::NativeMethod;
use crate::value::Value;

pub type TypeRef = Rc<TypeObj>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    Type,
    Module,
}

impl TypeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeKind::Type => "type",
            TypeKind::Module => "module",
        }
    }
}

/// A type or module object.
pub struct TypeObj {
    /// Qualified name, e.g. `Geo.Point`.
    pub name: String,
    pub kind: TypeKind,
    superclass: Option<TypeRef>,
    /// Lexically enclosing type or module.
    parent: Option<Weak<TypeObj>>,
    /// Included modules in inclusion order.
    includes: RefCell<Vec<TypeRef>>,
    methods: RefCell<MethodTable>,
    class_methods: RefCell<MethodTable>,
    constants: RefCell<IndexMap<String, Value>>,
    /// `@name` state when `self` is the type object itself.
    attrs: RefCell<IndexMap<String, Value>>,
    doc: RefCell<Option<String>>,
}

impl TypeObj {
    pub fn new(
        name: impl Into<String>,
        kind: TypeKind,
        superclass: Option<TypeRef>,
        parent: Option<&TypeRef>,
    ) -> TypeRef {
        Rc::new(Self {
            name: name.into(),
            kind,
            superclass,
            parent: parent.map(Rc::downgrade),
            includes: RefCell::new(Vec::new()),
            methods: RefCell::new(MethodTable::default()),
            class_methods: RefCell::new(MethodTable::default()),
            constants: RefCell::new(IndexMap::new()),
            attrs: RefCell::new(IndexMap::new()),
            doc: RefCell::new(None),
        })
    }

    pub fn superclass(&self) -> Option<&TypeRef> {
        self.superclass.as_ref()
    }

    pub fn parent(&self) -> Option<TypeRef> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    /// The name without its enclosing path.
    pub fn short_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    // ── Modules ───────────────────────────────────────────────────────────

    /// Include `module`. Returns `false` when it is already included.
    pub fn include(&self, module: &TypeRef) -> bool {
        let mut includes = self.includes.borrow_mut();
        if includes.iter().any(|m| Rc::ptr_eq(m, module)) {
            return false;
        }
        includes.push(module.clone());
        true
    }

    pub fn includes(&self) -> Vec<TypeRef> {
        self.includes.borrow().clone()
    }

    // ── Methods ───────────────────────────────────────────────────────────

    pub fn add_method(&self, name: &str, clause: Clause) {
        self.methods.borrow_mut().insert(name, clause);
    }

    pub fn add_class_method(&self, name: &str, clause: Clause) {
        self.class_methods.borrow_mut().insert(name, clause);
    }

    /// The instance-side clauses this type itself declares for `name`.
    pub fn method(&self, name: &str) -> Option<Vec<Clause>> {
        self.methods.borrow().get(name).map(<[Clause]>::to_vec)
    }

    pub fn class_method(&self, name: &str) -> Option<Vec<Clause>> {
        self.class_methods.borrow().get(name).map(<[Clause]>::to_vec)
    }

    pub fn method_names(&self) -> Vec<String> {
        self.methods.borrow().names()
    }

    pub fn class_method_names(&self) -> Vec<String> {
        self.class_methods.borrow().names()
    }

    // ── Constants & state ─────────────────────────────────────────────────

    pub fn constant(&self, name: &str) -> Option<Value> {
        self.constants.borrow().get(name).cloned()
    }

    pub fn set_constant(&self, name: &str, value: Value) {
        self.constants.borrow_mut().insert(name.to_string(), value);
    }

    pub fn constant_names(&self) -> Vec<String> {
        self.constants.borrow().keys().cloned().collect()
    }

    pub fn constants(&self) -> Vec<(String, Value)> {
        self.constants
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn attr(&self, name: &str) -> Value {
        self.attrs.borrow().get(name).cloned().unwrap_or(Value::Nil)
    }

    pub fn set_attr(&self, name: &str, value: Value) {
        self.attrs.borrow_mut().insert(name.to_string(), value);
    }

    pub fn doc(&self) -> Option<String> {
        self.doc.borrow().clone()
    }

    pub fn set_doc(&self, doc: Option<String>) {
        if doc.is_some() {
            *self.doc.borrow_mut() = doc;
        }
    }
}

impl fmt::Debug for TypeObj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.as_str(), self.name)
    }
}

/// The method-resolution order of `ty`: self first, then included modules
/// (most recently included first, each followed by its own linearisation),
/// then the superclass's linearisation. The first occurrence of a type wins.
pub fn ancestors(ty: &TypeRef) -> Vec<TypeRef> {
    let mut out = Vec::new();
    linearize(ty, &mut out);
    out
}

fn linearize(ty: &TypeRef, out: &mut Vec<TypeRef>) {
    if out.iter().any(|seen| Rc::ptr_eq(seen, ty)) {
        return;
    }
    out.push(ty.clone());
    for module in ty.includes().iter().rev() {
        linearize(module, out);
    }
    if let Some(superclass) = ty.superclass() {
        linearize(superclass, out);
    }
}

/// Whether `ancestor` appears in `ancestors(ty)`.
pub fn descends_from(ty: &TypeRef, ancestor: &TypeRef) -> bool {
    ancestors(ty).iter().any(|t| Rc::ptr_eq(t, ancestor))
}

// ══════════════════════════════════════════════════════════════════════════════
// Method Tables
// ══════════════════════════════════════════════════════════════════════════════

/// One alternative definition of a method.
#[derive(Clone)]
pub enum Clause {
    User(Rc<MethodDef>),
    Native(Rc<NativeMethod>),
}

impl Clause {
    pub fn is_native(&self) -> bool {
        matches!(self, Clause::Native(_))
    }

    /// Positional arguments required.
    pub fn arity(&self) -> usize {
        match self {
            Clause::User(def) => def.params.required(),
            Clause::Native(native) => native.signature.params.len(),
        }
    }

    pub fn is_variadic(&self) -> bool {
        match self {
            Clause::User(def) => def.params.is_variadic(),
            Clause::Native(native) => native.signature.rest.is_some(),
        }
    }

    pub fn doc(&self) -> Option<String> {
        match self {
            Clause::User(def) => def.doc.clone(),
            Clause::Native(native) => native.doc.map(str::to_string),
        }
    }

    /// An unguarded user clause whose parameters are plain names, matching
    /// any arguments of the right count.
    fn is_catch_all(&self) -> bool {
        match self {
            Clause::User(def) => {
                def.guard.is_none()
                    && def.params.items.iter().all(|p| {
                        matches!(
                            p,
                            Pattern::Bind { type_path: None, .. }
                                | Pattern::Wildcard(_)
                                | Pattern::Splat { .. }
                        )
                    })
            }
            Clause::Native(_) => true,
        }
    }

    /// Whether defining `self` should replace `existing` rather than add an
    /// alternative after it.
    fn replaces(&self, existing: &Clause) -> bool {
        match (self, existing) {
            (Clause::User(new), Clause::User(old)) => {
                new.guard.is_none()
                    && old.guard.is_none()
                    && new.params.same_shape(&old.params)
            }
            _ => {
                self.is_catch_all()
                    && existing.is_catch_all()
                    && self.arity() == existing.arity()
                    && self.is_variadic() == existing.is_variadic()
            }
        }
    }
}

/// Ordered overload sets keyed by method name.
#[derive(Default)]
pub struct MethodTable {
    entries: IndexMap<String, Vec<Clause>>,
}

impl MethodTable {
    /// Append `clause` to the overload set for `name`, replacing a clause
    /// with the same parameter shape.
    pub fn insert(&mut self, name: &str, clause: Clause) {
        let clauses = self.entries.entry(name.to_string()).or_default();
        match clauses.iter().position(|existing| clause.replaces(existing)) {
            Some(index) => clauses[index] = clause,
            None => clauses.push(clause),
        }
    }

    pub fn get(&self, name: &str) -> Option<&[Clause]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

/// The active method invocation, used by `super` and `yield`.
pub struct MethodFrame {
    pub name: String,
    /// The type whose table held the running clause.
    pub owner: TypeRef,
    /// Whether the clause came from a class-side table.
    pub class_side: bool,
    pub args: Vec<Value>,
    pub block: Option<Value>,
}

// ══════════════════════════════════════════════════════════════════════════════
// Core Types
// ══════════════════════════════════════════════════════════════════════════════

/// The built-in hierarchy, created once per interpreter.
pub struct CoreTypes {
    pub object: TypeRef,
    pub nil: TypeRef,
    pub bool: TypeRef,
    pub number: TypeRef,
    pub int: TypeRef,
    pub float: TypeRef,
    pub string: TypeRef,
    pub symbol: TypeRef,
    pub list: TypeRef,
    pub lambda: TypeRef,
    pub module: TypeRef,
    pub type_: TypeRef,
    pub error: TypeRef,
    pub method_missing: TypeRef,
    pub no_match: TypeRef,
    pub argument_type_error: TypeRef,
    pub name_error: TypeRef,
    pub zero_division_error: TypeRef,
    pub runtime_error: TypeRef,
}

impl CoreTypes {
    pub fn new() -> Self {
        let object = TypeObj::new("Object", TypeKind::Type, None, None);
        let sub = |name: &str, parent: &TypeRef| {
            TypeObj::new(name, TypeKind::Type, Some(parent.clone()), None)
        };
        let number = sub("Number", &object);
        let module = sub("Module", &object);
        let error = sub("Error", &object);

        let core = Self {
            nil: sub("Nil", &object),
            bool: sub("Bool", &object),
            int: sub("Int", &number),
            float: sub("Float", &number),
            string: sub("String", &object),
            symbol: sub("Symbol", &object),
            list: sub("List", &object),
            lambda: sub("Lambda", &object),
            type_: sub("Type", &module),
            method_missing: sub("MethodMissing", &error),
            no_match: sub("NoMatch", &error),
            argument_type_error: sub("ArgumentTypeError", &error),
            name_error: sub("NameError", &error),
            zero_division_error: sub("ZeroDivisionError", &error),
            runtime_error: sub("RuntimeError", &error),
            number,
            module,
            error,
            object,
        };
        for ty in core.all() {
            core.object.set_constant(&ty.name, Value::Type(ty.clone()));
        }
        core
    }

    pub fn all(&self) -> [&TypeRef; 19] {
        [
            &self.object,
            &self.nil,
            &self.bool,
            &self.number,
            &self.int,
            &self.float,
            &self.string,
            &self.symbol,
            &self.list,
            &self.lambda,
            &self.module,
            &self.type_,
            &self.error,
            &self.method_missing,
            &self.no_match,
            &self.argument_type_error,
            &self.name_error,
            &self.zero_division_error,
            &self.runtime_error,
        ]
    }

    /// Built-in types whose values are not `Instance`s.
    pub fn is_primitive(&self, ty: &TypeRef) -> bool {
        [
            &self.nil,
            &self.bool,
            &self.number,
            &self.int,
            &self.float,
            &self.string,
            &self.symbol,
            &self.list,
            &self.lambda,
            &self.module,
            &self.type_,
        ]
        .iter()
        .any(|t| Rc::ptr_eq(t, ty))
    }

    /// The direct type of a value.
    pub fn type_of(&self, value: &Value) -> TypeRef {
        match value {
            Value::Nil => self.nil.clone(),
            Value::Bool(_) => self.bool.clone(),
            Value::Int(_) => self.int.clone(),
            Value::Float(_) => self.float.clone(),
            Value::Str(_) => self.string.clone(),
            Value::Symbol(_) => self.symbol.clone(),
            Value::List(_) => self.list.clone(),
            Value::Lambda(_) => self.lambda.clone(),
            Value::Type(ty) => match ty.kind {
                TypeKind::Type => self.type_.clone(),
                TypeKind::Module => self.module.clone(),
            },
            Value::Instance(instance) => instance.ty.clone(),
        }
    }

    /// `is_instance(value, ty)`: `ty` is in the ancestry of the value's type.
    pub fn is_instance(&self, value: &Value, ty: &TypeRef) -> bool {
        descends_from(&self.type_of(value), ty)
    }
}

impl Default for CoreTypes {
    fn default() -> Self {
        Self::new()
    }
}
