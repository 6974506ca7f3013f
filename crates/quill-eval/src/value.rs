//! Runtime values.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use quill_types::ast::{BlockLit, Literal};

use crate::env::Scope;
use crate::object::{MethodFrame, TypeRef};

/// Shared, mutable list storage.
pub type ListRef = Rc<RefCell<Vec<Value>>>;

/// A Quill value.
///
/// Scalars are stored inline. Lists, lambdas, types and instances are shared
/// handles: cloning a `Value` never copies their contents, so a mutation
/// through one handle is visible through every other.
#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    Symbol(Rc<str>),
    List(ListRef),
    Lambda(Rc<Lambda>),
    /// A type or module object.
    Type(TypeRef),
    Instance(Rc<Instance>),
}

impl Value {
    pub fn str(s: impl AsRef<str>) -> Self {
        Value::Str(Rc::from(s.as_ref()))
    }

    pub fn symbol(s: impl AsRef<str>) -> Self {
        Value::Symbol(Rc::from(s.as_ref()))
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items)))
    }

    /// Everything except `nil` and `false` is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Integers and floats as `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The text of a string or a symbol.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Value::Str(s) | Value::Symbol(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ListRef> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_lambda(&self) -> Option<&Rc<Lambda>> {
        match self {
            Value::Lambda(lambda) => Some(lambda),
            _ => None,
        }
    }

    pub fn as_type(&self) -> Option<&TypeRef> {
        match self {
            Value::Type(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&Rc<Instance>> {
        match self {
            Value::Instance(instance) => Some(instance),
            _ => None,
        }
    }

    /// Identity for shared values, value equality for scalars. This is what
    /// `equal?` reports and what `Object#==` falls back to.
    pub fn identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
            (Value::Lambda(a), Value::Lambda(b)) => Rc::ptr_eq(a, b),
            (Value::Type(a), Value::Type(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            _ => self.scalar_eq(other).unwrap_or(false),
        }
    }

    /// Equality between two scalars, or `None` when either side needs
    /// method dispatch to decide. Ints and floats compare numerically.
    pub fn scalar_eq(&self, other: &Value) -> Option<bool> {
        let eq = match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                (*a as f64) == *b
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (
                Value::Nil | Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Str(_)
                | Value::Symbol(_),
                Value::Nil | Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Str(_)
                | Value::Symbol(_),
            ) => false,
            _ => return None,
        };
        Some(eq)
    }
}

impl From<&Literal> for Value {
    fn from(lit: &Literal) -> Self {
        match lit {
            Literal::Nil => Value::Nil,
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Int(n) => Value::Int(*n),
            Literal::Float(n) => Value::Float(*n),
            Literal::Str(s) => Value::str(s),
            Literal::Symbol(s) => Value::symbol(s),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

/// Structural for lists, identity for lambdas, types and instances.
/// Intended for host-side comparisons; Quill code compares through `==`.
impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            _ => self.identical(other),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(n) => write!(f, "{n:?}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Symbol(s) => write!(f, ":{s}"),
            Value::List(items) => f.debug_list().entries(items.borrow().iter()).finish(),
            Value::Lambda(lambda) => write!(f, "#<Lambda {}>", lambda.block.params),
            Value::Type(ty) => f.write_str(&ty.name),
            Value::Instance(instance) => write!(f, "#<{}>", instance.ty.name),
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Lambdas & Instances
// ══════════════════════════════════════════════════════════════════════════════

/// A block literal closed over the scope it was created in.
pub struct Lambda {
    /// Unique per creation; `break` inside the block unwinds to the call that
    /// received this particular closure.
    pub id: u64,
    pub block: Rc<BlockLit>,
    pub scope: Scope,
    pub self_value: Value,
    /// Lexical type or module, for constants and `def`.
    pub module: TypeRef,
    /// The method invocation the block was written in, for `yield` and
    /// `super` inside the block.
    pub method: Option<Rc<MethodFrame>>,
}

impl Lambda {
    /// Required positional parameters; negative (`-n-1`) when variadic.
    pub fn arity(&self) -> i64 {
        let required = self.block.params.required() as i64;
        if self.block.params.is_variadic() {
            -required - 1
        } else {
            required
        }
    }
}

/// An instance of a user-defined type.
pub struct Instance {
    pub ty: TypeRef,
    pub attrs: RefCell<IndexMap<String, Value>>,
}

impl Instance {
    pub fn new(ty: TypeRef) -> Self {
        Self {
            ty,
            attrs: RefCell::new(IndexMap::new()),
        }
    }

    pub fn get(&self, name: &str) -> Value {
        self.attrs.borrow().get(name).cloned().unwrap_or(Value::Nil)
    }

    pub fn set(&self, name: &str, value: Value) {
        self.attrs.borrow_mut().insert(name.to_string(), value);
    }
}

/// Text for `to_s` of scalars and type objects; `None` for values whose
/// text depends on dispatch.
pub(crate) fn scalar_to_s(value: &Value) -> Option<String> {
    Some(match value {
        Value::Nil => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Int(n) => n.to_string(),
        Value::Float(n) => format_float(*n),
        Value::Str(s) => s.to_string(),
        Value::Symbol(s) => s.to_string(),
        Value::Type(ty) => ty.name.clone(),
        _ => return None,
    })
}

/// Text for `inspect` of scalars and type objects.
pub(crate) fn scalar_inspect(value: &Value) -> Option<String> {
    Some(match value {
        Value::Nil => "nil".to_string(),
        Value::Str(s) => format!("{s:?}"),
        Value::Symbol(s) => format!(":{s}"),
        Value::Lambda(lambda) => format!("#<Lambda {}>", lambda.block.params),
        other => return scalar_to_s(other),
    })
}

/// The element at `index`, reading through a fresh borrow so callers may
/// run Quill code (which can mutate the list) between reads.
pub(crate) fn item_at(list: &ListRef, index: usize) -> Option<Value> {
    list.borrow().get(index).cloned()
}

pub(crate) fn format_float(n: f64) -> String {
    if n.is_finite() {
        format!("{n:?}")
    } else if n.is_nan() {
        "NaN".to_string()
    } else if n > 0.0 {
        "Infinity".to_string()
    } else {
        "-Infinity".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(Value::Int(0).is_truthy());
        assert!(Value::str("").is_truthy());
        assert!(Value::list(vec![]).is_truthy());
    }

    #[test]
    fn scalar_equality_is_numeric_across_int_and_float() {
        assert_eq!(Value::Int(1).scalar_eq(&Value::Float(1.0)), Some(true));
        assert_eq!(Value::Int(1).scalar_eq(&Value::str("1")), Some(false));
        assert_eq!(Value::symbol("a").scalar_eq(&Value::str("a")), Some(false));
        assert_eq!(Value::Nil.scalar_eq(&Value::list(vec![])), None);
    }

    #[test]
    fn lists_are_shared_handles() {
        let a = Value::list(vec![Value::Int(1)]);
        let b = a.clone();
        b.as_list().unwrap().borrow_mut().push(Value::Int(2));
        assert_eq!(a.as_list().unwrap().borrow().len(), 2);
        assert!(a.identical(&b));
        assert!(!a.identical(&Value::list(vec![Value::Int(1), Value::Int(2)])));
        assert_eq!(a, Value::list(vec![Value::Int(1), Value::Int(2)]));
    }

    #[test]
    fn float_formatting() {
        assert_eq!(format_float(1.0), "1.0");
        assert_eq!(format_float(3.25), "3.25");
        assert_eq!(format_float(f64::INFINITY), "Infinity");
    }
}
