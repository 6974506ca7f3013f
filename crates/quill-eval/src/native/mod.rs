//! The native bridge.
//!
//! Host routines are registered on a type under a name and a [`Signature`]
//! and become ordinary clauses of that type's method table. Before a native
//! runs, dispatch checks the receiver, each argument and the block against
//! the signature; a mismatch makes the clause fail to match, and a call
//! that no clause accepts raises `ArgumentTypeError`.
//!
//! Natives call back into the interpreter through [`Interpreter::send`] and
//! [`Interpreter::call_value`], and fail by returning an [`Unwind`], so
//! Quill code cannot tell them apart from in-language methods.

mod kernel;
mod list;
mod meta;
mod numeric;
mod string;

use std::fmt;

use quill_types::Span;

use crate::error::{EvalResult, Unwind};
use crate::interpreter::Interpreter;
use crate::object::TypeKind;
use crate::value::Value;

/// The host function behind a native method.
pub type NativeFn = fn(&mut Interpreter, NativeCall) -> EvalResult<Value>;

/// Arguments of one native invocation.
pub struct NativeCall {
    pub receiver: Value,
    pub args: Vec<Value>,
    pub block: Option<Value>,
    /// The call site.
    pub span: Span,
}

impl NativeCall {
    /// The argument at `index`, or `nil`.
    pub fn arg(&self, index: usize) -> Value {
        self.args.get(index).cloned().unwrap_or(Value::Nil)
    }
}

/// A registered native method.
pub struct NativeMethod {
    /// `Type#name` or `Type.name`, for error messages.
    pub label: String,
    pub signature: Signature,
    pub func: NativeFn,
    pub doc: Option<&'static str>,
}

/// The shape a value must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    Any,
    Nil,
    Bool,
    Int,
    Float,
    /// Int or Float.
    Number,
    String,
    Symbol,
    List,
    Lambda,
    /// A type object (not a module).
    Type,
    /// A type or module object.
    Module,
    /// An instance of a user-defined type.
    Instance,
}

impl Expect {
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Expect::Any => true,
            Expect::Nil => matches!(value, Value::Nil),
            Expect::Bool => matches!(value, Value::Bool(_)),
            Expect::Int => matches!(value, Value::Int(_)),
            Expect::Float => matches!(value, Value::Float(_)),
            Expect::Number => matches!(value, Value::Int(_) | Value::Float(_)),
            Expect::String => matches!(value, Value::Str(_)),
            Expect::Symbol => matches!(value, Value::Symbol(_)),
            Expect::List => matches!(value, Value::List(_)),
            Expect::Lambda => matches!(value, Value::Lambda(_)),
            Expect::Type => matches!(value, Value::Type(t) if t.kind == TypeKind::Type),
            Expect::Module => matches!(value, Value::Type(_)),
            Expect::Instance => matches!(value, Value::Instance(_)),
        }
    }
}

impl fmt::Display for Expect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Expect::Any => "any value",
            Expect::Nil => "Nil",
            Expect::Bool => "Bool",
            Expect::Int => "Int",
            Expect::Float => "Float",
            Expect::Number => "Number",
            Expect::String => "String",
            Expect::Symbol => "Symbol",
            Expect::List => "List",
            Expect::Lambda => "Lambda",
            Expect::Type => "Type",
            Expect::Module => "Module",
            Expect::Instance => "an instance",
        };
        f.write_str(name)
    }
}

/// How a native uses the caller's block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockUse {
    /// Any block is ignored.
    Ignored,
    Optional,
    Required,
}

/// Declared receiver, positional parameters, rest parameter and block use.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub receiver: Expect,
    pub params: Vec<Expect>,
    pub rest: Option<Expect>,
    pub block: BlockUse,
}

impl Signature {
    pub fn new(receiver: Expect) -> Self {
        Self {
            receiver,
            params: Vec::new(),
            rest: None,
            block: BlockUse::Ignored,
        }
    }

    pub fn param(mut self, expect: Expect) -> Self {
        self.params.push(expect);
        self
    }

    pub fn rest(mut self, expect: Expect) -> Self {
        self.rest = Some(expect);
        self
    }

    pub fn block(mut self, block: BlockUse) -> Self {
        self.block = block;
        self
    }

    /// Check a call against the signature, describing the first mismatch.
    pub fn check(&self, receiver: &Value, args: &[Value], block: Option<&Value>) -> Result<(), String> {
        if !self.receiver.accepts(receiver) {
            return Err(format!("receiver must be {}", self.receiver));
        }
        let fixed = self.params.len();
        let arity_ok = match self.rest {
            Some(_) => args.len() >= fixed,
            None => args.len() == fixed,
        };
        if !arity_ok {
            let expected = match self.rest {
                Some(_) => format!("at least {fixed}"),
                None => fixed.to_string(),
            };
            return Err(format!(
                "wrong number of arguments (given {}, expected {expected})",
                args.len()
            ));
        }
        for (index, arg) in args.iter().enumerate() {
            let expect = self.params.get(index).or(self.rest.as_ref());
            if let Some(expect) = expect {
                if !expect.accepts(arg) {
                    return Err(format!("argument {} must be {expect}", index + 1));
                }
            }
        }
        if self.block == BlockUse::Required && block.is_none() {
            return Err("a block is required".to_string());
        }
        Ok(())
    }
}

/// Install every built-in native method.
pub(crate) fn install(interp: &mut Interpreter) {
    kernel::install(interp);
    numeric::install(interp);
    string::install(interp);
    list::install(interp);
    meta::install(interp);
}

/// Largest string (in bytes) or list a native builds from a size argument.
pub(crate) const MAX_BUILD_LEN: usize = 1 << 24;

/// `len`, or a `RuntimeError` when it overflowed or exceeds [`MAX_BUILD_LEN`].
pub(crate) fn checked_len(
    interp: &mut Interpreter,
    len: Option<usize>,
    span: Span,
) -> EvalResult<usize> {
    match len {
        Some(len) if len <= MAX_BUILD_LEN => Ok(len),
        _ => Err(interp.runtime_error("size too large", span)),
    }
}

/// Raise for a value that a signature should already have rejected.
pub(crate) fn unexpected(interp: &mut Interpreter, call: &NativeCall, what: &str) -> Unwind {
    let message = format!("expected {what}");
    interp.argument_error(message, call.span)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arity_and_types_are_checked() {
        let sig = Signature::new(Expect::Int).param(Expect::Number);
        assert!(sig.check(&Value::Int(1), &[Value::Float(2.0)], None).is_ok());
        assert_eq!(
            sig.check(&Value::Int(1), &[Value::str("x")], None),
            Err("argument 1 must be Number".to_string())
        );
        assert_eq!(
            sig.check(&Value::Int(1), &[], None),
            Err("wrong number of arguments (given 0, expected 1)".to_string())
        );
        assert_eq!(
            sig.check(&Value::Float(1.0), &[Value::Int(1)], None),
            Err("receiver must be Int".to_string())
        );
    }

    #[test]
    fn rest_parameters() {
        let sig = Signature::new(Expect::Any).param(Expect::Symbol).rest(Expect::Int);
        assert!(sig.check(&Value::Nil, &[Value::symbol("a")], None).is_ok());
        assert!(sig
            .check(&Value::Nil, &[Value::symbol("a"), Value::Int(1), Value::Int(2)], None)
            .is_ok());
        assert!(sig
            .check(&Value::Nil, &[Value::symbol("a"), Value::Nil], None)
            .is_err());
        assert!(sig.check(&Value::Nil, &[], None).is_err());
    }

    #[test]
    fn required_block() {
        let sig = Signature::new(Expect::List).block(BlockUse::Required);
        let list = Value::list(vec![]);
        assert_eq!(
            sig.check(&list, &[], None),
            Err("a block is required".to_string())
        );
    }
}
