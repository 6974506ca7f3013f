//! Reflection natives on `Module` and `Type`, and `Type#new`.

use std::rc::Rc;

use crate::error::EvalResult;
use crate::interpreter::Interpreter;
use crate::native::{unexpected, BlockUse, Expect, NativeCall, Signature};
use crate::object::{ancestors, TypeKind, TypeRef};
use crate::value::{Instance, Value};

pub(super) fn install(interp: &mut Interpreter) {
    let module = interp.core.module.clone();
    let m = || Signature::new(Expect::Module);

    interp.define_native(&module, "name", m(), name);
    interp.define_native(&module, "to_s", m(), name);
    interp.define_native(&module, "inspect", m(), name);
    interp.define_native(&module, "ancestors", m(), ancestor_list);
    interp.define_native(&module, "instance_methods", m(), instance_methods);
    interp.define_native(&module, "class_methods", m(), class_methods);
    interp.define_native(&module, "constants", m(), constants);
    interp.define_native(&module, "doc", m(), doc);
    interp.define_native(&module, "method_doc", m().param(Expect::Any), method_doc);
    interp.define_native(&module, "include?", m().param(Expect::Module), includes);
    interp.define_native(&module, "superclass", m(), superclass);

    let type_ = interp.core.type_.clone();
    interp.define_native(
        &type_,
        "new",
        Signature::new(Expect::Type)
            .rest(Expect::Any)
            .block(BlockUse::Optional),
        new,
    );
}

fn receiver_type(interp: &mut Interpreter, call: &NativeCall) -> EvalResult<TypeRef> {
    match call.receiver.as_type() {
        Some(ty) => Ok(ty.clone()),
        None => Err(unexpected(interp, call, "a type or module")),
    }
}

fn symbols(names: Vec<String>) -> Value {
    Value::list(names.into_iter().map(Value::symbol).collect())
}

fn name(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    let ty = receiver_type(interp, &call)?;
    Ok(Value::str(&ty.name))
}

fn ancestor_list(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    let ty = receiver_type(interp, &call)?;
    Ok(Value::list(ancestors(&ty).into_iter().map(Value::Type).collect()))
}

/// Methods the receiver itself declares, in declaration order.
fn instance_methods(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    let ty = receiver_type(interp, &call)?;
    Ok(symbols(ty.method_names()))
}

fn class_methods(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    let ty = receiver_type(interp, &call)?;
    Ok(symbols(ty.class_method_names()))
}

fn constants(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    let ty = receiver_type(interp, &call)?;
    Ok(symbols(ty.constant_names()))
}

fn doc(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    let ty = receiver_type(interp, &call)?;
    Ok(ty.doc().map_or(Value::Nil, Value::str))
}

/// The doc comment of the first documented clause of `name`, searching the
/// ancestry and then the receiver's class side.
fn method_doc(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    let ty = receiver_type(interp, &call)?;
    let arg = call.arg(0);
    let Some(method) = arg.as_name() else {
        return Err(unexpected(interp, &call, "a symbol or string"));
    };
    let chain = ancestors(&ty);
    let instance_side = chain.iter().filter_map(|t| t.method(method)).flatten();
    let found = instance_side
        .chain(ty.class_method(method).unwrap_or_default())
        .find_map(|clause| clause.doc());
    Ok(found.map_or(Value::Nil, Value::str))
}

/// Whether `module` is a module in the receiver's ancestry.
fn includes(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    let ty = receiver_type(interp, &call)?;
    let Value::Type(module) = call.arg(0) else {
        return Err(unexpected(interp, &call, "a module"));
    };
    let found = module.kind == TypeKind::Module
        && !Rc::ptr_eq(&ty, &module)
        && ancestors(&ty).iter().any(|t| Rc::ptr_eq(t, &module));
    Ok(Value::Bool(found))
}

fn superclass(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    let ty = receiver_type(interp, &call)?;
    Ok(ty.superclass().cloned().map_or(Value::Nil, Value::Type))
}

/// Allocate an instance and run `initialize` with the arguments and block.
fn new(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    let ty = receiver_type(interp, &call)?;
    if interp.core.is_primitive(&ty) {
        let message = format!("cannot instantiate {}", ty.name);
        return Err(interp.runtime_error(message, call.span));
    }
    let instance = Value::Instance(Rc::new(Instance::new(ty)));
    interp.send(instance.clone(), "initialize", call.args, call.block, call.span)?;
    Ok(instance)
}
