//! `String` and `Symbol` natives. Sizes and indices count characters.

use crate::error::EvalResult;
use crate::interpreter::Interpreter;
use crate::native::{checked_len, unexpected, Expect, NativeCall, Signature};
use crate::value::{scalar_inspect, Value};

pub(super) fn install(interp: &mut Interpreter) {
    let string = interp.core.string.clone();
    let s = || Signature::new(Expect::String);
    let with_string = || s().param(Expect::String);

    interp.define_native(&string, "+", with_string(), concat);
    interp.define_native(&string, "*", s().param(Expect::Int), repeat);
    interp.define_native(&string, "==", s().param(Expect::Any), equal);
    interp.define_native(&string, "<", with_string(), less);
    interp.define_native(&string, "<=", with_string(), less_eq);
    interp.define_native(&string, ">", with_string(), greater);
    interp.define_native(&string, ">=", with_string(), greater_eq);
    interp.define_native(&string, "size", s(), size);
    interp.define_native(&string, "length", s(), size);
    interp.define_native(&string, "empty?", s(), is_empty);
    interp.define_native(&string, "upcase", s(), upcase);
    interp.define_native(&string, "downcase", s(), downcase);
    interp.define_native(&string, "include?", with_string(), includes);
    interp.define_native(&string, "split", s(), split_whitespace);
    interp.define_native(&string, "split", with_string(), split);
    interp.define_native(&string, "chars", s(), chars);
    interp.define_native(&string, "strip", s(), strip);
    interp.define_native(&string, "to_s", s(), itself);
    interp.define_native(&string, "to_sym", s(), to_sym);
    interp.define_native(&string, "inspect", s(), inspect);
    interp.define_native(&string, "[]", s().param(Expect::Int), char_at);

    let symbol = interp.core.symbol.clone();
    let sym = || Signature::new(Expect::Symbol);
    interp.define_native(&symbol, "==", sym().param(Expect::Any), equal);
    interp.define_native(&symbol, "to_s", sym(), symbol_to_s);
    interp.define_native(&symbol, "to_sym", sym(), itself);
    interp.define_native(&symbol, "inspect", sym(), inspect);
}

/// The receiver's text. Signatures guarantee a string or symbol receiver.
fn text(call: &NativeCall) -> &str {
    call.receiver.as_name().unwrap_or_default()
}

fn arg_text(call: &NativeCall) -> String {
    call.arg(0).as_str().unwrap_or_default().to_string()
}

fn concat(_: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    Ok(Value::str(format!("{}{}", text(&call), arg_text(&call))))
}

fn repeat(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    let count = call.arg(0).as_int().unwrap_or_default();
    let Ok(count) = usize::try_from(count) else {
        return Err(interp.argument_error("negative repeat count", call.span));
    };
    let text = text(&call);
    checked_len(interp, text.len().checked_mul(count), call.span)?;
    Ok(Value::str(text.repeat(count)))
}

/// Strings equal strings and symbols equal symbols; never across kinds.
fn equal(_: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    Ok(Value::Bool(call.receiver.scalar_eq(&call.arg(0)).unwrap_or(false)))
}

fn less(_: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    Ok(Value::Bool(text(&call) < arg_text(&call).as_str()))
}

fn less_eq(_: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    Ok(Value::Bool(text(&call) <= arg_text(&call).as_str()))
}

fn greater(_: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    Ok(Value::Bool(text(&call) > arg_text(&call).as_str()))
}

fn greater_eq(_: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    Ok(Value::Bool(text(&call) >= arg_text(&call).as_str()))
}

fn size(_: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    Ok(Value::Int(text(&call).chars().count() as i64))
}

fn is_empty(_: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    Ok(Value::Bool(text(&call).is_empty()))
}

fn upcase(_: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    Ok(Value::str(text(&call).to_uppercase()))
}

fn downcase(_: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    Ok(Value::str(text(&call).to_lowercase()))
}

fn includes(_: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    Ok(Value::Bool(text(&call).contains(arg_text(&call).as_str())))
}

fn split_whitespace(_: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    let parts = text(&call).split_whitespace().map(Value::str).collect();
    Ok(Value::list(parts))
}

/// Splitting on `""` yields the characters.
fn split(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    let separator = arg_text(&call);
    if separator.is_empty() {
        return chars(interp, call);
    }
    let parts = text(&call).split(separator.as_str()).map(Value::str).collect();
    Ok(Value::list(parts))
}

fn chars(_: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    let parts = text(&call)
        .chars()
        .map(|c| Value::str(c.to_string()))
        .collect();
    Ok(Value::list(parts))
}

fn strip(_: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    Ok(Value::str(text(&call).trim()))
}

fn itself(_: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    Ok(call.receiver)
}

fn to_sym(_: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    Ok(Value::symbol(text(&call)))
}

fn symbol_to_s(_: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    Ok(Value::str(text(&call)))
}

fn inspect(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    match scalar_inspect(&call.receiver) {
        Some(shown) => Ok(Value::str(shown)),
        None => Err(unexpected(interp, &call, "a string or symbol")),
    }
}

/// The character at `index` (negative counts from the end), or `nil`.
fn char_at(_: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    let index = call.arg(0).as_int().unwrap_or_default();
    let chars: Vec<char> = text(&call).chars().collect();
    let resolved = if index < 0 {
        chars.len() as i64 + index
    } else {
        index
    };
    Ok(usize::try_from(resolved)
        .ok()
        .and_then(|i| chars.get(i))
        .map_or(Value::Nil, |c| Value::str(c.to_string())))
}
