//! The interpreter: owns the object model, the root scope and the call
//! stack, and is the entry point for running programs.

use std::rc::Rc;

use quill_parser::parse_str;
use quill_types::ast::{Expr, MethodDef, Program, TypeDef, TypeDefKind};
use quill_types::{SourceFile, Span};

use crate::config::EvalConfig;
use crate::env::Scope;
use crate::error::{EvalResult, Raised, RunError, Unwind};
use crate::native::{self, NativeFn, NativeMethod, Signature};
use crate::object::{ancestors, Clause, CoreTypes, MethodFrame, TypeKind, TypeObj, TypeRef};
use crate::reflect::{self, TypeInfo};
use crate::value::{scalar_inspect, scalar_to_s, Instance, Value};

/// Quill code evaluated into every interpreter at construction.
const PRELUDE: &str = include_str!("prelude.ql");

/// Evaluation context of the code currently running.
#[derive(Clone)]
pub(crate) struct Ctx {
    pub scope: Scope,
    pub self_value: Value,
    /// Lexical type or module: where `def` defines, where constants are
    /// looked up first.
    pub module: TypeRef,
    /// The enclosing method invocation, if any.
    pub method: Option<Rc<MethodFrame>>,
}

/// One entry of the call stack.
struct CallFrame {
    label: String,
    span: Span,
}

/// A Quill interpreter.
///
/// Each interpreter is an independent evaluation context with its own core
/// types, root scope and output buffer.
pub struct Interpreter {
    config: EvalConfig,
    pub(crate) core: CoreTypes,
    /// Parent of every method scope. Empty unless the host defines globals.
    root: Scope,
    /// Scope of top-level code; persists across `run` calls.
    main_scope: Scope,
    main: Value,
    frames: Vec<CallFrame>,
    /// Values being handled by the rescue clauses currently running.
    pub(crate) rescuing: Vec<Raised>,
    steps: u64,
    output: String,
    next_block_id: u64,
}

impl Interpreter {
    pub fn new() -> Result<Self, RunError> {
        Self::with_config(EvalConfig::default())
    }

    pub fn with_config(config: EvalConfig) -> Result<Self, RunError> {
        let core = CoreTypes::new();
        let main = Value::Instance(Rc::new(Instance::new(core.object.clone())));
        let root = Scope::new();
        let mut interp = Self {
            config,
            core,
            main_scope: root.child(),
            root,
            main,
            frames: Vec::new(),
            rescuing: Vec::new(),
            steps: 0,
            output: String::new(),
            next_block_id: 0,
        };
        native::install(&mut interp);
        interp.eval_str(PRELUDE)?;
        interp.output.clear();
        Ok(interp)
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    pub fn core(&self) -> &CoreTypes {
        &self.core
    }

    /// The scope every method body can see. Bindings defined here act as
    /// globals.
    pub fn root_scope(&self) -> &Scope {
        &self.root
    }

    /// The scope top-level code runs in.
    pub fn main_scope(&self) -> &Scope {
        &self.main_scope
    }

    /// Text written by `print`, `puts` and `p`.
    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }

    /// Evaluation steps taken by the last run.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn type_of(&self, value: &Value) -> TypeRef {
        self.core.type_of(value)
    }

    pub fn is_instance(&self, value: &Value, ty: &TypeRef) -> bool {
        self.core.is_instance(value, ty)
    }

    // ── Running ───────────────────────────────────────────────────────────

    /// Lex, parse and run `source`.
    pub fn eval_str(&mut self, source: &str) -> Result<Value, RunError> {
        let program = parse_str(source)?;
        self.run(&program)
    }

    pub fn eval_source(&mut self, file: &SourceFile) -> Result<Value, RunError> {
        tracing::debug!(file = %file.name, "evaluating source file");
        self.eval_str(&file.source)
    }

    /// Run a parsed program at top level and return its last value.
    pub fn run(&mut self, program: &Program) -> Result<Value, RunError> {
        self.steps = 0;
        self.frames.clear();
        self.rescuing.clear();
        let ctx = self.top_ctx();
        let result = self.eval_seq(&program.body, &ctx);
        let outcome = match result {
            Ok(value) | Err(Unwind::Return(value)) => Ok(value),
            Err(Unwind::Raise(raised)) => Err(self.uncaught(*raised)),
            Err(Unwind::Halt(err)) => Err(err),
            Err(Unwind::Break(_)) => {
                Err(self.stray_jump("break outside of a block or loop", program.span))
            }
            Err(Unwind::BlockBreak { .. }) => {
                Err(self.stray_jump("break from a block whose call has returned", program.span))
            }
            Err(Unwind::Next(_)) => {
                Err(self.stray_jump("next outside of a block or loop", program.span))
            }
        };
        self.frames.clear();
        outcome
    }

    fn top_ctx(&self) -> Ctx {
        Ctx {
            scope: self.main_scope.clone(),
            self_value: self.main.clone(),
            module: self.core.object.clone(),
            method: None,
        }
    }

    fn stray_jump(&self, message: &str, span: Span) -> RunError {
        RunError::Uncaught {
            message: message.to_string(),
            type_name: self.core.runtime_error.name.clone(),
            span,
            backtrace: Vec::new(),
        }
    }

    /// Describe a raised value that reached the top of the stack.
    fn uncaught(&mut self, raised: Raised) -> RunError {
        let ty = self.type_of(&raised.value);
        let message = match &raised.value {
            Value::Instance(instance) if self.is_instance(&raised.value, &self.core.error) => {
                match instance.get("message") {
                    Value::Nil => ty.name.clone(),
                    message => self.to_display_lossy(&message),
                }
            }
            other => self.inspect_lossy(other),
        };
        RunError::Uncaught {
            message,
            type_name: ty.name.clone(),
            span: raised.span,
            backtrace: raised.backtrace,
        }
    }

    // ── Limits & call stack ───────────────────────────────────────────────

    /// Count one evaluation step.
    pub(crate) fn tick(&mut self) -> EvalResult<()> {
        self.steps += 1;
        match self.config.step_limit {
            Some(limit) if self.steps > limit => {
                tracing::warn!(limit, "step limit exceeded, halting");
                Err(Unwind::Halt(RunError::StepLimitExceeded { limit }))
            }
            _ => Ok(()),
        }
    }

    pub(crate) fn push_frame(&mut self, label: String, span: Span) -> EvalResult<()> {
        let limit = self.config.max_call_depth;
        if self.frames.len() >= limit {
            tracing::warn!(limit, %label, "call depth limit exceeded, halting");
            return Err(Unwind::Halt(RunError::CallDepthExceeded { limit }));
        }
        self.frames.push(CallFrame { label, span });
        Ok(())
    }

    pub(crate) fn pop_frame(&mut self) {
        self.frames.pop();
    }

    fn backtrace(&self) -> Vec<String> {
        self.frames
            .iter()
            .rev()
            .map(|frame| format!("{} at {}", frame.label, frame.span))
            .collect()
    }

    pub(crate) fn next_block_id(&mut self) -> u64 {
        self.next_block_id += 1;
        self.next_block_id
    }

    // ── Raising ───────────────────────────────────────────────────────────

    /// Raise `value` from `span`.
    pub fn raise(&self, value: Value, span: Span) -> Unwind {
        Unwind::Raise(Box::new(Raised {
            value,
            span,
            backtrace: self.backtrace(),
        }))
    }

    /// A new instance of an error type with its `message` set.
    pub fn make_error(&self, ty: &TypeRef, message: impl Into<String>) -> Value {
        let instance = Instance::new(ty.clone());
        instance.set("message", Value::str(message.into()));
        Value::Instance(Rc::new(instance))
    }

    pub fn error(&self, ty: &TypeRef, message: impl Into<String>, span: Span) -> Unwind {
        self.raise(self.make_error(ty, message), span)
    }

    pub fn argument_error(&self, message: impl Into<String>, span: Span) -> Unwind {
        self.error(&self.core.argument_type_error, message, span)
    }

    pub fn runtime_error(&self, message: impl Into<String>, span: Span) -> Unwind {
        self.error(&self.core.runtime_error, message, span)
    }

    pub(crate) fn no_match_error(&self, message: impl Into<String>, span: Span) -> Unwind {
        self.error(&self.core.no_match, message, span)
    }

    /// `MethodMissing` carrying the method name and the receiver.
    pub(crate) fn method_missing(&self, receiver: &Value, name: &str, message: String, span: Span) -> Unwind {
        let error = self.make_error(&self.core.method_missing, message);
        if let Value::Instance(instance) = &error {
            instance.set("name", Value::symbol(name));
            instance.set("receiver", receiver.clone());
        }
        self.raise(error, span)
    }

    // ── Text conversion ───────────────────────────────────────────────────

    /// `value.inspect`, dispatched unless the value is a scalar.
    pub fn inspect(&mut self, value: &Value) -> EvalResult<String> {
        if let Some(text) = scalar_inspect(value) {
            return Ok(text);
        }
        let result = self.send(value.clone(), "inspect", Vec::new(), None, Span::default())?;
        Ok(self.text_of(result))
    }

    /// `value.to_s`, dispatched unless the value is a scalar.
    pub fn to_display(&mut self, value: &Value) -> EvalResult<String> {
        if let Some(text) = scalar_to_s(value) {
            return Ok(text);
        }
        let result = self.send(value.clone(), "to_s", Vec::new(), None, Span::default())?;
        Ok(self.text_of(result))
    }

    fn text_of(&self, value: Value) -> String {
        scalar_to_s(&value).unwrap_or_else(|| format!("{value:?}"))
    }

    /// `inspect` for error messages: never fails.
    pub(crate) fn inspect_lossy(&mut self, value: &Value) -> String {
        self.inspect(value).unwrap_or_else(|_| format!("{value:?}"))
    }

    fn to_display_lossy(&mut self, value: &Value) -> String {
        self.to_display(value).unwrap_or_else(|_| format!("{value:?}"))
    }

    pub(crate) fn write_output(&mut self, text: &str) {
        if self.config.echo_output {
            print!("{text}");
        }
        self.output.push_str(text);
    }

    // ── Attributes ────────────────────────────────────────────────────────

    pub(crate) fn get_attr(&self, target: &Value, name: &str) -> Value {
        match target {
            Value::Instance(instance) => instance.get(name),
            Value::Type(ty) => ty.attr(name),
            _ => Value::Nil,
        }
    }

    pub(crate) fn set_attr(&self, target: &Value, name: &str, value: Value, span: Span) -> EvalResult<()> {
        match target {
            Value::Instance(instance) => instance.set(name, value),
            Value::Type(ty) => ty.set_attr(name, value),
            other => {
                let ty = self.type_of(other);
                return Err(self.runtime_error(format!("cannot set @{name} on {}", ty.name), span));
            }
        }
        Ok(())
    }

    // ── Constants ─────────────────────────────────────────────────────────

    /// Lexical module nesting first, then the ancestry of the innermost
    /// module, then the top level.
    pub(crate) fn find_constant(&self, ctx: &Ctx, name: &str) -> Option<Value> {
        let mut module = Some(ctx.module.clone());
        while let Some(current) = module {
            if let Some(value) = current.constant(name) {
                return Some(value);
            }
            module = current.parent();
        }
        ancestors(&ctx.module)
            .iter()
            .find_map(|ty| ty.constant(name))
            .or_else(|| self.core.object.constant(name))
    }

    pub(crate) fn lookup_constant(&self, ctx: &Ctx, name: &str, span: Span) -> EvalResult<Value> {
        self.find_constant(ctx, name).ok_or_else(|| {
            self.error(
                &self.core.name_error,
                format!("uninitialized constant {name}"),
                span,
            )
        })
    }

    /// Resolve a dotted type name such as `Geo.Point` from the top level.
    pub fn lookup_type(&self, path: &str) -> Option<TypeRef> {
        let mut current = self.core.object.clone();
        for segment in path.split('.') {
            current = match current.constant(segment)? {
                Value::Type(ty) => ty,
                _ => return None,
            };
        }
        Some(current)
    }

    // ── Definitions ───────────────────────────────────────────────────────

    /// `type Name [< Super] ... end` / `module Name ... end`: create the type
    /// or re-open an existing one, then run the body with the type as `self`.
    pub(crate) fn define_type(&mut self, def: &TypeDef, ctx: &Ctx) -> EvalResult<Value> {
        let kind = match def.kind {
            TypeDefKind::Type => TypeKind::Type,
            TypeDefKind::Module => TypeKind::Module,
        };
        let name = &def.name.name;
        let superclass = match &def.superclass {
            Some(expr) => Some(self.eval_superclass(expr, ctx)?),
            None => None,
        };

        let container = ctx.module.clone();
        let ty = match container.constant(name) {
            Some(Value::Type(existing)) if existing.kind == kind => {
                if let Some(requested) = &superclass {
                    let same = existing
                        .superclass()
                        .is_some_and(|current| Rc::ptr_eq(current, requested));
                    if !same {
                        return Err(self.runtime_error(
                            format!("superclass mismatch for {}", existing.name),
                            def.name.span,
                        ));
                    }
                }
                existing
            }
            Some(_) => {
                return Err(self.runtime_error(
                    format!("{name} is not a {}", kind.as_str()),
                    def.name.span,
                ));
            }
            None => {
                let top_level = Rc::ptr_eq(&container, &self.core.object);
                let (qualified, parent) = if top_level {
                    (name.clone(), None)
                } else {
                    (format!("{}.{name}", container.name), Some(&container))
                };
                let superclass = match kind {
                    TypeKind::Type => superclass.or_else(|| Some(self.core.object.clone())),
                    TypeKind::Module => None,
                };
                let ty = TypeObj::new(qualified, kind, superclass, parent);
                container.set_constant(name, Value::Type(ty.clone()));
                tracing::debug!(name = %ty.name, kind = kind.as_str(), "defined type");
                ty
            }
        };
        ty.set_doc(def.doc.clone());

        let body_ctx = Ctx {
            scope: self.root.child(),
            self_value: Value::Type(ty.clone()),
            module: ty.clone(),
            method: None,
        };
        self.eval_seq(&def.body, &body_ctx)?;
        Ok(Value::Type(ty))
    }

    fn eval_superclass(&mut self, expr: &Expr, ctx: &Ctx) -> EvalResult<TypeRef> {
        match self.eval(expr, ctx)? {
            Value::Type(ty) if ty.kind == TypeKind::Type => Ok(ty),
            other => {
                let found = self.inspect_lossy(&other);
                Err(self.argument_error(format!("superclass must be a type, got {found}"), expr.span))
            }
        }
    }

    /// `def`: add a clause to the lexical module, or to `self`'s class side
    /// for `def self.name`.
    pub(crate) fn define_method(&mut self, def: &Rc<MethodDef>, ctx: &Ctx) -> EvalResult<Value> {
        let name = &def.name.name;
        let clause = Clause::User(def.clone());
        if def.singleton {
            let Value::Type(target) = &ctx.self_value else {
                return Err(self.runtime_error(
                    format!("def self.{name} outside a type or module"),
                    def.name.span,
                ));
            };
            target.add_class_method(name, clause);
            tracing::debug!(owner = %target.name, method = %name, "defined class method");
        } else {
            ctx.module.add_method(name, clause);
            tracing::debug!(owner = %ctx.module.name, method = %name, "defined method");
        }
        Ok(Value::symbol(name))
    }

    /// `include Module` into the lexical module.
    pub(crate) fn include_module(&mut self, expr: &Expr, ctx: &Ctx) -> EvalResult<Value> {
        let value = self.eval(expr, ctx)?;
        match &value {
            Value::Type(module) if module.kind == TypeKind::Module => {
                if ctx.module.include(module) {
                    tracing::debug!(owner = %ctx.module.name, module = %module.name, "included module");
                }
                Ok(value)
            }
            other => {
                let found = self.inspect_lossy(other);
                Err(self.argument_error(format!("include expects a module, got {found}"), expr.span))
            }
        }
    }

    // ── Native registration ───────────────────────────────────────────────

    /// Install a host routine as an instance-side method of `ty`.
    pub fn define_native(&mut self, ty: &TypeRef, name: &str, signature: Signature, func: NativeFn) {
        let native = NativeMethod {
            label: format!("{}#{name}", ty.name),
            signature,
            func,
            doc: None,
        };
        ty.add_method(name, Clause::Native(Rc::new(native)));
        tracing::debug!(owner = %ty.name, method = name, "registered native method");
    }

    /// Install a host routine as a class-side method of `ty`.
    pub fn define_class_native(
        &mut self,
        ty: &TypeRef,
        name: &str,
        signature: Signature,
        func: NativeFn,
    ) {
        let native = NativeMethod {
            label: format!("{}.{name}", ty.name),
            signature,
            func,
            doc: None,
        };
        ty.add_class_method(name, Clause::Native(Rc::new(native)));
        tracing::debug!(owner = %ty.name, method = name, "registered native class method");
    }

    // ── Reflection ────────────────────────────────────────────────────────

    /// Reflection data for the type or module at `path`, e.g. `Geo.Point`.
    pub fn reflect(&self, path: &str) -> Option<TypeInfo> {
        self.lookup_type(path).map(|ty| reflect::type_info(&ty))
    }

    /// Reflection data for every top-level type and module.
    pub fn reflect_all(&self) -> Vec<TypeInfo> {
        self.core
            .object
            .constants()
            .into_iter()
            .filter_map(|(_, value)| match value {
                Value::Type(ty) if ty.parent().is_none() => Some(reflect::type_info(&ty)),
                _ => None,
            })
            .collect()
    }
}
