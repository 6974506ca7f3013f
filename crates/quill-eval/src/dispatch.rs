//! Method dispatch, clause selection and invocation of methods and blocks.

use std::rc::Rc;

use quill_types::ast::{MethodDef, ParamList};
use quill_types::{ensure_sufficient_stack, Span};

use crate::error::{EvalResult, Unwind};
use crate::interpreter::{Ctx, Interpreter};
use crate::native::{NativeCall, NativeMethod};
use crate::object::{ancestors, Clause, MethodFrame, TypeRef};
use crate::pattern::{bind_all, BindMode};
use crate::value::{scalar_inspect, Lambda, Value};

/// The overload set a call resolved to.
struct Resolved {
    name: String,
    /// The type or module whose table holds the clauses.
    owner: TypeRef,
    clauses: Vec<Clause>,
    class_side: bool,
}

impl Resolved {
    fn label(&self) -> String {
        let sep = if self.class_side { "." } else { "#" };
        format!("{}{sep}{}", self.owner.name, self.name)
    }
}

impl Interpreter {
    /// Send `name` to `receiver`.
    ///
    /// Type and module receivers try their class side first (along the
    /// superclass chain), then nested constants for capitalised names, then
    /// the instance side of `Type`/`Module`. Every other receiver dispatches
    /// through the ancestors of its type.
    #[tracing::instrument(level = "trace", skip_all, fields(method = name))]
    pub fn send(
        &mut self,
        receiver: Value,
        name: &str,
        args: Vec<Value>,
        block: Option<Value>,
        span: Span,
    ) -> EvalResult<Value> {
        if let Value::Type(ty) = &receiver {
            if let Some(resolved) = resolve_class_side(ty, name) {
                return self.invoke(resolved, receiver, args, block, span);
            }
            if args.is_empty() && block.is_none() && is_constant_name(name) {
                if let Some(value) = ty.constant(name) {
                    return Ok(value);
                }
            }
        }
        match self.resolve_instance_side(&receiver, name) {
            Some(resolved) => self.invoke(resolved, receiver, args, block, span),
            None => {
                let message = format!("undefined method '{name}' for {}", describe(&receiver));
                Err(self.method_missing(&receiver, name, message, span))
            }
        }
    }

    fn resolve_instance_side(&self, receiver: &Value, name: &str) -> Option<Resolved> {
        ancestors(&self.type_of(receiver)).into_iter().find_map(|ty| {
            ty.method(name).map(|clauses| Resolved {
                name: name.to_string(),
                owner: ty,
                clauses,
                class_side: false,
            })
        })
    }

    /// Whether sending `name` to `receiver` would find a method.
    pub fn respond_to(&self, receiver: &Value, name: &str) -> bool {
        if let Value::Type(ty) = receiver {
            if resolve_class_side(ty, name).is_some() {
                return true;
            }
        }
        self.resolve_instance_side(receiver, name).is_some()
    }

    /// Try each clause in declaration order; the first that accepts the
    /// arguments runs.
    fn invoke(
        &mut self,
        resolved: Resolved,
        receiver: Value,
        args: Vec<Value>,
        block: Option<Value>,
        span: Span,
    ) -> EvalResult<Value> {
        let mut mismatch = None;
        for clause in &resolved.clauses {
            match clause {
                Clause::Native(native) => {
                    match native.signature.check(&receiver, &args, block.as_ref()) {
                        Ok(()) => return self.call_native(native, receiver, args, block, span),
                        Err(reason) => {
                            mismatch.get_or_insert(reason);
                        }
                    }
                }
                Clause::User(def) => {
                    if let Some(ctx) = self.bind_method(def, &resolved, &receiver, &args, &block)? {
                        return self.call_user(def, ctx, resolved.label(), span);
                    }
                }
            }
        }

        let label = resolved.label();
        if resolved.clauses.iter().all(Clause::is_native) {
            let reason = mismatch.unwrap_or_else(|| "no matching signature".to_string());
            return Err(self.argument_error(format!("{label}: {reason}"), span));
        }
        let mut shown = Vec::with_capacity(args.len());
        for arg in &args {
            shown.push(self.inspect_lossy(arg));
        }
        let message = format!("no clause of {label} matches ({})", shown.join(", "));
        Err(self.method_missing(&receiver, &resolved.name, message, span))
    }

    /// Check arity, patterns and guard of a user clause. On success returns
    /// the context the body runs in, with parameters bound.
    fn bind_method(
        &mut self,
        def: &Rc<MethodDef>,
        resolved: &Resolved,
        receiver: &Value,
        args: &[Value],
        block: &Option<Value>,
    ) -> EvalResult<Option<Ctx>> {
        let required = def.params.required();
        let arity_ok = if def.params.is_variadic() {
            args.len() >= required
        } else {
            args.len() == required
        };
        if !arity_ok {
            return Ok(None);
        }

        let frame = MethodFrame {
            name: resolved.name.clone(),
            owner: resolved.owner.clone(),
            class_side: resolved.class_side,
            args: args.to_vec(),
            block: block.clone(),
        };
        let ctx = Ctx {
            scope: self.root_scope().child(),
            self_value: receiver.clone(),
            module: resolved.owner.clone(),
            method: Some(Rc::new(frame)),
        };

        let mut bindings = Vec::new();
        if !self.match_sequence(&def.params.items, args, &ctx, &mut bindings)? {
            return Ok(None);
        }
        bind_all(bindings, &ctx.scope, BindMode::Define);
        bind_block_param(&def.params, block, &ctx);

        if let Some(guard) = &def.guard {
            if !self.eval(guard, &ctx)?.is_truthy() {
                return Ok(None);
            }
        }
        Ok(Some(ctx))
    }

    fn call_user(&mut self, def: &MethodDef, ctx: Ctx, label: String, span: Span) -> EvalResult<Value> {
        self.push_frame(label, span)?;
        let result = ensure_sufficient_stack(|| self.eval_body(&def.body, &ctx));
        self.pop_frame();
        match result {
            Err(Unwind::Return(value)) => Ok(value),
            Err(Unwind::Break(_)) => {
                Err(self.runtime_error("break outside of a block or loop", span))
            }
            Err(Unwind::Next(_)) => Err(self.runtime_error("next outside of a block or loop", span)),
            other => other,
        }
    }

    fn call_native(
        &mut self,
        native: &NativeMethod,
        receiver: Value,
        args: Vec<Value>,
        block: Option<Value>,
        span: Span,
    ) -> EvalResult<Value> {
        self.push_frame(native.label.clone(), span)?;
        let call = NativeCall {
            receiver,
            args,
            block,
            span,
        };
        let result = ensure_sufficient_stack(|| (native.func)(self, call));
        self.pop_frame();
        result
    }

    /// Call a block or any value that responds to `call`.
    pub fn call_value(
        &mut self,
        callee: &Value,
        args: Vec<Value>,
        block: Option<Value>,
        span: Span,
    ) -> EvalResult<Value> {
        match callee {
            Value::Lambda(lambda) => self.call_lambda(lambda, args, block, span),
            other => self.send(other.clone(), "call", args, block, span),
        }
    }

    /// Run a block's body in a fresh child of its captured scope.
    ///
    /// `next` and `return` end this invocation with their value; `break`
    /// becomes a [`Unwind::BlockBreak`] for the call that received the block.
    pub(crate) fn call_lambda(
        &mut self,
        lambda: &Rc<Lambda>,
        args: Vec<Value>,
        block: Option<Value>,
        span: Span,
    ) -> EvalResult<Value> {
        let ctx = Ctx {
            scope: lambda.scope.child(),
            self_value: lambda.self_value.clone(),
            module: lambda.module.clone(),
            method: lambda.method.clone(),
        };
        let params = &lambda.block.params;
        let args = fit_block_args(params, args);
        let mut bindings = Vec::new();
        if !self.match_sequence(&params.items, &args, &ctx, &mut bindings)? {
            let shown = self.inspect_lossy(&Value::list(args));
            return Err(self.no_match_error(
                format!("block parameters {params} do not match {shown}"),
                span,
            ));
        }
        bind_all(bindings, &ctx.scope, BindMode::Define);
        bind_block_param(params, &block, &ctx);

        let label = match &lambda.method {
            Some(frame) => format!("block in {}", frame.name),
            None => "block".to_string(),
        };
        self.push_frame(label, span)?;
        let result = ensure_sufficient_stack(|| self.eval_seq(&lambda.block.body, &ctx));
        self.pop_frame();
        match result {
            Err(Unwind::Next(value) | Unwind::Return(value)) => Ok(value),
            Err(Unwind::Break(value)) => Err(Unwind::BlockBreak {
                block: lambda.id,
                value,
            }),
            other => other,
        }
    }

    /// `super`: continue lookup after the running clause's owner.
    pub(crate) fn send_super(
        &mut self,
        frame: &MethodFrame,
        receiver: Value,
        args: Vec<Value>,
        block: Option<Value>,
        span: Span,
    ) -> EvalResult<Value> {
        let name = frame.name.as_str();
        let resolved = if frame.class_side {
            frame
                .owner
                .superclass()
                .and_then(|parent| resolve_class_side(parent, name))
                .or_else(|| self.resolve_instance_side(&receiver, name))
        } else {
            let chain = ancestors(&self.type_of(&receiver));
            let start = chain
                .iter()
                .position(|ty| Rc::ptr_eq(ty, &frame.owner))
                .map_or(chain.len(), |index| index + 1);
            chain[start..].iter().find_map(|ty| {
                ty.method(name).map(|clauses| Resolved {
                    name: name.to_string(),
                    owner: ty.clone(),
                    clauses,
                    class_side: false,
                })
            })
        };
        match resolved {
            Some(resolved) => self.invoke(resolved, receiver, args, block, span),
            None => {
                let message = format!("super: no superclass method '{name}'");
                Err(self.method_missing(&receiver, name, message, span))
            }
        }
    }
}

/// Class-side lookup along the superclass chain.
fn resolve_class_side(ty: &TypeRef, name: &str) -> Option<Resolved> {
    let mut current = Some(ty.clone());
    while let Some(ty) = current {
        if let Some(clauses) = ty.class_method(name) {
            return Some(Resolved {
                name: name.to_string(),
                owner: ty,
                clauses,
                class_side: true,
            });
        }
        current = ty.superclass().cloned();
    }
    None
}

fn is_constant_name(name: &str) -> bool {
    name.starts_with(|c: char| c.is_ascii_uppercase())
}

fn bind_block_param(params: &ParamList, block: &Option<Value>, ctx: &Ctx) {
    if let Some(name) = &params.block {
        ctx.scope
            .define(&name.name, block.clone().unwrap_or(Value::Nil));
    }
}

/// Blocks are lenient: a single list argument spreads over several
/// parameters, missing arguments are `nil` and extras are dropped.
fn fit_block_args(params: &ParamList, mut args: Vec<Value>) -> Vec<Value> {
    if params.items.len() > 1 && args.len() == 1 {
        if let Value::List(items) = &args[0] {
            let spread = items.borrow().clone();
            args = spread;
        }
    }
    let required = params.required();
    if !params.is_variadic() {
        args.resize(required, Value::Nil);
    } else if args.len() < required {
        args.resize(required, Value::Nil);
    }
    args
}

/// Short receiver description for `MethodMissing` messages.
fn describe(value: &Value) -> String {
    match value {
        Value::Instance(instance) => format!("an instance of {}", instance.ty.name),
        Value::List(_) => "a List".to_string(),
        other => scalar_inspect(other).unwrap_or_else(|| format!("{other:?}")),
    }
}
