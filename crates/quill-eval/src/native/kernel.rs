//! `Object`, `Error` and `Lambda` natives.

use crate::error::EvalResult;
use crate::interpreter::Interpreter;
use crate::native::{unexpected, BlockUse, Expect, NativeCall, Signature};
use crate::value::{scalar_inspect, scalar_to_s, Value};

pub(super) fn install(interp: &mut Interpreter) {
    let object = interp.core.object.clone();
    let any = || Signature::new(Expect::Any);

    interp.define_native(&object, "initialize", any(), initialize);
    interp.define_native(&object, "==", any().param(Expect::Any), identical);
    interp.define_native(&object, "!=", any().param(Expect::Any), not_equal);
    interp.define_native(&object, "equal?", any().param(Expect::Any), identical);
    interp.define_native(&object, "class", any(), class);
    interp.define_native(&object, "is_a?", any().param(Expect::Module), is_a);
    interp.define_native(&object, "respond_to?", any().param(Expect::Any), respond_to);
    interp.define_native(&object, "nil?", any(), is_nil);
    interp.define_native(&object, "to_s", any(), to_s);
    interp.define_native(&object, "inspect", any(), inspect);
    interp.define_native(
        &object,
        "send",
        any().param(Expect::Any).rest(Expect::Any).block(BlockUse::Optional),
        send,
    );
    interp.define_native(&object, "print", any().rest(Expect::Any), print);
    interp.define_native(&object, "puts", any().rest(Expect::Any), puts);
    interp.define_native(&object, "p", any().rest(Expect::Any), p);
    interp.define_native(&object, "lambda", any().block(BlockUse::Required), lambda);

    let error = interp.core.error.clone();
    let instance = || Signature::new(Expect::Instance);
    interp.define_native(&error, "initialize", instance().rest(Expect::Any), error_initialize);
    interp.define_native(&error, "message", instance(), error_message);

    let lambda_type = interp.core.lambda.clone();
    let callable = || Signature::new(Expect::Lambda);
    interp.define_native(
        &lambda_type,
        "call",
        callable().rest(Expect::Any).block(BlockUse::Optional),
        call,
    );
    interp.define_native(&lambda_type, "arity", callable(), arity);
}

fn initialize(_: &mut Interpreter, _: NativeCall) -> EvalResult<Value> {
    Ok(Value::Nil)
}

fn identical(_: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    Ok(Value::Bool(call.receiver.identical(&call.arg(0))))
}

fn not_equal(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    let eq = interp.send(call.receiver, "==", call.args, None, call.span)?;
    Ok(Value::Bool(!eq.is_truthy()))
}

fn class(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    Ok(Value::Type(interp.type_of(&call.receiver)))
}

fn is_a(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    match call.arg(0) {
        Value::Type(ty) => Ok(Value::Bool(interp.is_instance(&call.receiver, &ty))),
        _ => Err(unexpected(interp, &call, "a type or module")),
    }
}

fn respond_to(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    let arg = call.arg(0);
    match arg.as_name() {
        Some(name) => Ok(Value::Bool(interp.respond_to(&call.receiver, name))),
        None => Err(unexpected(interp, &call, "a symbol or string")),
    }
}

fn is_nil(_: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    Ok(Value::Bool(call.receiver.is_nil()))
}

fn to_s(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    let text = scalar_to_s(&call.receiver)
        .unwrap_or_else(|| format!("#<{}>", interp.type_of(&call.receiver).name));
    Ok(Value::str(text))
}

/// `#<Point @x=1, @y=2>` for instances.
fn inspect(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    if let Some(text) = scalar_inspect(&call.receiver) {
        return Ok(Value::str(text));
    }
    let ty = interp.type_of(&call.receiver);
    let attrs: Vec<(String, Value)> = match &call.receiver {
        Value::Instance(instance) => instance
            .attrs
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        _ => Vec::new(),
    };
    if attrs.is_empty() {
        return Ok(Value::str(format!("#<{}>", ty.name)));
    }
    let mut parts = Vec::with_capacity(attrs.len());
    for (name, value) in &attrs {
        parts.push(format!("@{name}={}", interp.inspect(value)?));
    }
    Ok(Value::str(format!("#<{} {}>", ty.name, parts.join(", "))))
}

fn send(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    let mut args = call.args;
    let target = args.remove(0);
    let Some(name) = target.as_name() else {
        return Err(interp.argument_error("send expects a method name", call.span));
    };
    interp.send(call.receiver, name, args, call.block, call.span)
}

fn print(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    for arg in &call.args {
        let text = interp.to_display(arg)?;
        interp.write_output(&text);
    }
    Ok(Value::Nil)
}

fn puts(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    if call.args.is_empty() {
        interp.write_output("\n");
    }
    for arg in &call.args {
        let mut text = interp.to_display(arg)?;
        if !text.ends_with('\n') {
            text.push('\n');
        }
        interp.write_output(&text);
    }
    Ok(Value::Nil)
}

/// Writes `inspect` of each argument and returns the argument (or the list
/// of arguments when there are several).
fn p(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    for arg in &call.args {
        let text = interp.inspect(arg)?;
        interp.write_output(&format!("{text}\n"));
    }
    let mut args = call.args;
    Ok(match args.len() {
        0 => Value::Nil,
        1 => args.remove(0),
        _ => Value::list(args),
    })
}

fn lambda(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    call.block
        .clone()
        .ok_or_else(|| unexpected(interp, &call, "a block"))
}

fn error_initialize(_: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    if let Value::Instance(instance) = &call.receiver {
        instance.set("message", call.arg(0));
    }
    Ok(Value::Nil)
}

fn error_message(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    Ok(interp.get_attr(&call.receiver, "message"))
}

fn call(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    match &call.receiver {
        Value::Lambda(lambda) => interp.call_lambda(lambda, call.args, call.block, call.span),
        _ => Err(unexpected(interp, &call, "a lambda")),
    }
}

fn arity(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    match &call.receiver {
        Value::Lambda(lambda) => Ok(Value::Int(lambda.arity())),
        _ => Err(unexpected(interp, &call, "a lambda")),
    }
}
