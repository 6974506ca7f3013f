//! `Int` and `Float` natives.
//!
//! Arithmetic and comparison live on `Number` and accept either kind of
//! operand. Two `Int`s stay integral, with checked overflow; any `Float`
//! operand makes the result a `Float`. Integer division floors and the
//! modulus takes the sign of the divisor.

use std::cmp::Ordering;

use crate::error::{EvalResult, Unwind};
use crate::interpreter::Interpreter;
use crate::native::{unexpected, BlockUse, Expect, NativeCall, Signature};
use crate::value::{format_float, Value};

#[derive(Clone, Copy)]
enum Arith {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

pub(super) fn install(interp: &mut Interpreter) {
    let number = interp.core.number.clone();
    let binary = || Signature::new(Expect::Number).param(Expect::Number);
    let unary = || Signature::new(Expect::Number);

    interp.define_native(&number, "+", binary(), add);
    interp.define_native(&number, "-", binary(), sub);
    interp.define_native(&number, "*", binary(), mul);
    interp.define_native(&number, "/", binary(), div);
    interp.define_native(&number, "%", binary(), rem);
    interp.define_native(&number, "<", binary(), less);
    interp.define_native(&number, "<=", binary(), less_eq);
    interp.define_native(&number, ">", binary(), greater);
    interp.define_native(&number, ">=", binary(), greater_eq);
    interp.define_native(
        &number,
        "==",
        Signature::new(Expect::Number).param(Expect::Any),
        equal,
    );
    interp.define_native(&number, "-@", unary(), negate);
    interp.define_native(&number, "abs", unary(), abs);
    interp.define_native(&number, "to_s", unary(), to_s);
    interp.define_native(&number, "to_i", unary(), to_i);
    interp.define_native(&number, "to_f", unary(), to_f);

    let int = interp.core.int.clone();
    interp.define_native(
        &int,
        "times",
        Signature::new(Expect::Int).block(BlockUse::Required),
        times,
    );
}

fn add(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    arith(interp, &call, Arith::Add)
}

fn sub(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    arith(interp, &call, Arith::Sub)
}

fn mul(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    arith(interp, &call, Arith::Mul)
}

fn div(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    arith(interp, &call, Arith::Div)
}

fn rem(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    arith(interp, &call, Arith::Mod)
}

fn arith(interp: &mut Interpreter, call: &NativeCall, op: Arith) -> EvalResult<Value> {
    let rhs = call.arg(0);
    if let (Value::Int(a), Value::Int(b)) = (&call.receiver, &rhs) {
        return int_arith(interp, call, *a, *b, op);
    }
    let (Some(a), Some(b)) = (call.receiver.as_f64(), rhs.as_f64()) else {
        return Err(unexpected(interp, call, "numbers"));
    };
    let result = match op {
        Arith::Add => a + b,
        Arith::Sub => a - b,
        Arith::Mul => a * b,
        Arith::Div | Arith::Mod if b == 0.0 => {
            return Err(divided_by_zero(interp, call));
        }
        Arith::Div => a / b,
        Arith::Mod => {
            let r = a % b;
            if r != 0.0 && (r < 0.0) != (b < 0.0) {
                r + b
            } else {
                r
            }
        }
    };
    Ok(Value::Float(result))
}

fn int_arith(interp: &mut Interpreter, call: &NativeCall, a: i64, b: i64, op: Arith) -> EvalResult<Value> {
    if b == 0 && matches!(op, Arith::Div | Arith::Mod) {
        return Err(divided_by_zero(interp, call));
    }
    let result = match op {
        Arith::Add => a.checked_add(b),
        Arith::Sub => a.checked_sub(b),
        Arith::Mul => a.checked_mul(b),
        Arith::Div => a.checked_div(b).map(|q| {
            if a % b != 0 && (a < 0) != (b < 0) {
                q - 1
            } else {
                q
            }
        }),
        Arith::Mod => {
            let r = a.wrapping_rem(b);
            Some(if r != 0 && (r < 0) != (b < 0) { r + b } else { r })
        }
    };
    match result {
        Some(n) => Ok(Value::Int(n)),
        None => Err(interp.runtime_error("integer overflow", call.span)),
    }
}

fn divided_by_zero(interp: &mut Interpreter, call: &NativeCall) -> Unwind {
    let ty = interp.core.zero_division_error.clone();
    interp.error(&ty, "divided by 0", call.span)
}

/// `None` when either side is NaN.
fn compare(call: &NativeCall) -> Option<Ordering> {
    match (&call.receiver, &call.arg(0)) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (a, b) => a.as_f64()?.partial_cmp(&b.as_f64()?),
    }
}

fn less(_: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    Ok(Value::Bool(compare(&call) == Some(Ordering::Less)))
}

fn less_eq(_: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    Ok(Value::Bool(matches!(
        compare(&call),
        Some(Ordering::Less | Ordering::Equal)
    )))
}

fn greater(_: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    Ok(Value::Bool(compare(&call) == Some(Ordering::Greater)))
}

fn greater_eq(_: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    Ok(Value::Bool(matches!(
        compare(&call),
        Some(Ordering::Greater | Ordering::Equal)
    )))
}

fn equal(_: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    let other = call.arg(0);
    Ok(Value::Bool(call.receiver.scalar_eq(&other).unwrap_or(false)))
}

fn negate(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    match call.receiver {
        Value::Int(n) => n
            .checked_neg()
            .map(Value::Int)
            .ok_or_else(|| interp.runtime_error("integer overflow", call.span)),
        Value::Float(n) => Ok(Value::Float(-n)),
        _ => Err(unexpected(interp, &call, "a number")),
    }
}

fn abs(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    match call.receiver {
        Value::Int(n) => n
            .checked_abs()
            .map(Value::Int)
            .ok_or_else(|| interp.runtime_error("integer overflow", call.span)),
        Value::Float(n) => Ok(Value::Float(n.abs())),
        _ => Err(unexpected(interp, &call, "a number")),
    }
}

fn to_s(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    match call.receiver {
        Value::Int(n) => Ok(Value::str(n.to_string())),
        Value::Float(n) => Ok(Value::str(format_float(n))),
        _ => Err(unexpected(interp, &call, "a number")),
    }
}

/// Truncates toward zero.
fn to_i(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    match call.receiver {
        Value::Int(n) => Ok(Value::Int(n)),
        Value::Float(n) if n.is_finite() && n.trunc().abs() < 9.2e18 => Ok(Value::Int(n.trunc() as i64)),
        Value::Float(n) => {
            Err(interp.runtime_error(format!("cannot convert {} to Int", format_float(n)), call.span))
        }
        _ => Err(unexpected(interp, &call, "a number")),
    }
}

fn to_f(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    match call.receiver.as_f64() {
        Some(n) => Ok(Value::Float(n)),
        None => Err(unexpected(interp, &call, "a number")),
    }
}

/// `n.times { |i| ... }` yields `0..n` and returns `n`.
fn times(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    let (Value::Int(count), Some(block)) = (&call.receiver, &call.block) else {
        return Err(unexpected(interp, &call, "an Int and a block"));
    };
    for i in 0..*count {
        interp.call_value(block, vec![Value::Int(i)], None, call.span)?;
    }
    Ok(call.receiver.clone())
}
