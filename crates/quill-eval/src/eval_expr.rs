//! Expression evaluation.
//!
//! Every construct is an expression and evaluates left to right. Non-local
//! exits travel as [`Unwind`] values through `?` until the construct that
//! handles them.

use std::rc::Rc;

use quill_types::ast::{
    AssignOp, BinOp, BlockArg, BlockLit, Body, Call, CaseExpr, Expr, ExprKind, ForExpr, LogicalOp,
    RescueClause, SuperCall, Target, UnaryOp, WhileExpr,
};
use quill_types::{ensure_sufficient_stack, Span};

use crate::error::{EvalResult, Raised, Unwind};
use crate::interpreter::{Ctx, Interpreter};
use crate::pattern::{bind_all, BindMode};
use crate::value::{item_at, Lambda, Value};

/// A resolved assignment target. Receivers and index arguments are
/// evaluated once, before the right-hand side.
enum Place {
    Local(String),
    Attribute(String),
    Constant(String),
    Index { receiver: Value, args: Vec<Value> },
    Member { receiver: Value, name: String },
}

impl Interpreter {
    pub(crate) fn eval(&mut self, expr: &Expr, ctx: &Ctx) -> EvalResult<Value> {
        self.tick()?;
        ensure_sufficient_stack(|| self.eval_kind(expr, ctx))
    }

    /// Evaluate a sequence, returning the last value (`nil` when empty).
    pub(crate) fn eval_seq(&mut self, exprs: &[Expr], ctx: &Ctx) -> EvalResult<Value> {
        let mut last = Value::Nil;
        for expr in exprs {
            last = self.eval(expr, ctx)?;
        }
        Ok(last)
    }

    fn eval_args(&mut self, exprs: &[Expr], ctx: &Ctx) -> EvalResult<Vec<Value>> {
        let mut values = Vec::with_capacity(exprs.len());
        for expr in exprs {
            values.push(self.eval(expr, ctx)?);
        }
        Ok(values)
    }

    fn eval_kind(&mut self, expr: &Expr, ctx: &Ctx) -> EvalResult<Value> {
        let span = expr.span;
        match &expr.kind {
            ExprKind::Literal(lit) => Ok(Value::from(lit)),
            ExprKind::List(items) => Ok(Value::list(self.eval_args(items, ctx)?)),
            ExprKind::SelfRef => Ok(ctx.self_value.clone()),

            ExprKind::Identifier(name) => match ctx.scope.get(name) {
                Some(value) => Ok(value),
                None => self.send(ctx.self_value.clone(), name, Vec::new(), None, span),
            },
            ExprKind::Constant(name) => self.lookup_constant(ctx, name, span),
            ExprKind::Attribute(name) => Ok(self.get_attr(&ctx.self_value, name)),

            ExprKind::Call(call) => self.eval_call(call, span, ctx),
            ExprKind::Super(call) => self.eval_super(call, span, ctx),
            ExprKind::Yield(args) => self.eval_yield(args, span, ctx),
            ExprKind::Block(block) => Ok(Value::Lambda(self.make_lambda(block, ctx))),

            ExprKind::Binary { op, left, right } => {
                let left = self.eval(left, ctx)?;
                let right = self.eval(right, ctx)?;
                let result = self.send(left, op.method_name(), vec![right], None, span)?;
                if *op == BinOp::NotEq {
                    Ok(Value::Bool(!result.is_truthy()))
                } else {
                    Ok(result)
                }
            }
            ExprKind::Unary { op, operand } => {
                let value = self.eval(operand, ctx)?;
                match op {
                    UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
                    UnaryOp::Neg => self.send(value, "-@", Vec::new(), None, span),
                }
            }
            ExprKind::Logical { op, left, right } => {
                let left = self.eval(left, ctx)?;
                match (op, left.is_truthy()) {
                    (LogicalOp::And, false) | (LogicalOp::Or, true) => Ok(left),
                    _ => self.eval(right, ctx),
                }
            }
            ExprKind::MatchTest { value, pattern } => {
                let value = self.eval(value, ctx)?;
                let mut bindings = Vec::new();
                if self.match_pattern(pattern, &value, ctx, &mut bindings)? {
                    bind_all(bindings, &ctx.scope, BindMode::Assign);
                    Ok(Value::Bool(true))
                } else {
                    Ok(Value::Bool(false))
                }
            }

            ExprKind::Assign { target, value } => {
                let place = self.resolve_place(target, ctx)?;
                let value = self.eval(value, ctx)?;
                self.write_place(place, value.clone(), ctx, span)?;
                Ok(value)
            }
            ExprKind::OpAssign { target, op, value } => {
                self.eval_op_assign(target, *op, value, span, ctx)
            }
            ExprKind::Destructure { pattern, value } => {
                let value = self.eval(value, ctx)?;
                let mut bindings = Vec::new();
                if !self.match_pattern(pattern, &value, ctx, &mut bindings)? {
                    return Err(self.no_match(pattern, &value, span));
                }
                bind_all(bindings, &ctx.scope, BindMode::Assign);
                Ok(value)
            }

            ExprKind::If(if_expr) => {
                if self.eval(&if_expr.condition, ctx)?.is_truthy() {
                    self.eval_seq(&if_expr.then_body, ctx)
                } else {
                    match &if_expr.else_body {
                        Some(body) => self.eval_seq(body, ctx),
                        None => Ok(Value::Nil),
                    }
                }
            }
            ExprKind::While(while_expr) => self.eval_while(while_expr, ctx),
            ExprKind::For(for_expr) => self.eval_for(for_expr, ctx),
            ExprKind::Case(case) => self.eval_case(case, ctx),
            ExprKind::Begin(body) => self.eval_body(body, ctx),

            ExprKind::Raise(value) => self.eval_raise(value.as_deref(), span, ctx),
            ExprKind::Return(value) => Err(Unwind::Return(self.eval_opt(value.as_deref(), ctx)?)),
            ExprKind::Break(value) => Err(Unwind::Break(self.eval_opt(value.as_deref(), ctx)?)),
            ExprKind::Next(value) => Err(Unwind::Next(self.eval_opt(value.as_deref(), ctx)?)),

            ExprKind::Def(def) => self.define_method(def, ctx),
            ExprKind::TypeDef(def) => self.define_type(def, ctx),
            ExprKind::Include(module) => self.include_module(module, ctx),
        }
    }

    fn eval_opt(&mut self, expr: Option<&Expr>, ctx: &Ctx) -> EvalResult<Value> {
        match expr {
            Some(expr) => self.eval(expr, ctx),
            None => Ok(Value::Nil),
        }
    }

    // ── Assignment ────────────────────────────────────────────────────────

    fn resolve_place(&mut self, target: &Target, ctx: &Ctx) -> EvalResult<Place> {
        Ok(match target {
            Target::Local(name) => Place::Local(name.name.clone()),
            Target::Attribute(name) => Place::Attribute(name.name.clone()),
            Target::Constant(name) => Place::Constant(name.name.clone()),
            Target::Index { receiver, args } => Place::Index {
                receiver: self.eval(receiver, ctx)?,
                args: self.eval_args(args, ctx)?,
            },
            Target::Member { receiver, name } => Place::Member {
                receiver: self.eval(receiver, ctx)?,
                name: name.name.clone(),
            },
        })
    }

    /// Current value of a place; unset locals and constants read as `nil`.
    fn read_place(&mut self, place: &Place, ctx: &Ctx, span: Span) -> EvalResult<Value> {
        match place {
            Place::Local(name) => Ok(ctx.scope.get(name).unwrap_or(Value::Nil)),
            Place::Attribute(name) => Ok(self.get_attr(&ctx.self_value, name)),
            Place::Constant(name) => Ok(self.find_constant(ctx, name).unwrap_or(Value::Nil)),
            Place::Index { receiver, args } => self.send(receiver.clone(), "[]", args.clone(), None, span),
            Place::Member { receiver, name } => self.send(receiver.clone(), name, Vec::new(), None, span),
        }
    }

    fn write_place(&mut self, place: Place, value: Value, ctx: &Ctx, span: Span) -> EvalResult<()> {
        match place {
            Place::Local(name) => ctx.scope.set(&name, value),
            Place::Attribute(name) => self.set_attr(&ctx.self_value, &name, value, span)?,
            Place::Constant(name) => ctx.module.set_constant(&name, value),
            Place::Index { receiver, mut args } => {
                args.push(value);
                self.send(receiver, "[]=", args, None, span)?;
            }
            Place::Member { receiver, name } => {
                self.send(receiver, &format!("{name}="), vec![value], None, span)?;
            }
        }
        Ok(())
    }

    fn eval_op_assign(
        &mut self,
        target: &Target,
        op: AssignOp,
        value: &Expr,
        span: Span,
        ctx: &Ctx,
    ) -> EvalResult<Value> {
        let place = self.resolve_place(target, ctx)?;
        let current = self.read_place(&place, ctx, span)?;
        let updated = match op {
            AssignOp::Arith(bin) => {
                let rhs = self.eval(value, ctx)?;
                self.send(current, bin.method_name(), vec![rhs], None, span)?
            }
            AssignOp::And if !current.is_truthy() => return Ok(current),
            AssignOp::Or if current.is_truthy() => return Ok(current),
            AssignOp::And | AssignOp::Or => self.eval(value, ctx)?,
        };
        self.write_place(place, updated.clone(), ctx, span)?;
        Ok(updated)
    }

    // ── Loops & case ──────────────────────────────────────────────────────

    fn eval_while(&mut self, while_expr: &WhileExpr, ctx: &Ctx) -> EvalResult<Value> {
        while self.eval(&while_expr.condition, ctx)?.is_truthy() {
            match self.eval_seq(&while_expr.body, ctx) {
                Ok(_) | Err(Unwind::Next(_)) => {}
                Err(Unwind::Break(value)) => return Ok(value),
                Err(other) => return Err(other),
            }
        }
        Ok(Value::Nil)
    }

    /// `for pattern in list`: binds in the enclosing scope and returns the
    /// list. Elements are read one at a time, so the body may mutate it.
    fn eval_for(&mut self, for_expr: &ForExpr, ctx: &Ctx) -> EvalResult<Value> {
        let iterable = self.eval(&for_expr.iterable, ctx)?;
        let Value::List(list) = &iterable else {
            let found = self.inspect_lossy(&iterable);
            return Err(self.argument_error(
                format!("for expects a List, got {found}"),
                for_expr.iterable.span,
            ));
        };
        let mut index = 0;
        while let Some(item) = item_at(list, index) {
            index += 1;
            let mut bindings = Vec::new();
            if !self.match_pattern(&for_expr.pattern, &item, ctx, &mut bindings)? {
                return Err(self.no_match(&for_expr.pattern, &item, for_expr.span));
            }
            bind_all(bindings, &ctx.scope, BindMode::Assign);
            match self.eval_seq(&for_expr.body, ctx) {
                Ok(_) | Err(Unwind::Next(_)) => {}
                Err(Unwind::Break(value)) => return Ok(value),
                Err(other) => return Err(other),
            }
        }
        Ok(iterable.clone())
    }

    fn eval_case(&mut self, case: &CaseExpr, ctx: &Ctx) -> EvalResult<Value> {
        let subject = self.eval(&case.subject, ctx)?;
        for arm in &case.arms {
            let mut bindings = Vec::new();
            if !self.match_pattern(&arm.pattern, &subject, ctx, &mut bindings)? {
                continue;
            }
            bind_all(bindings, &ctx.scope, BindMode::Assign);
            if let Some(guard) = &arm.guard {
                if !self.eval(guard, ctx)?.is_truthy() {
                    continue;
                }
            }
            return self.eval_seq(&arm.body, ctx);
        }
        match &case.else_body {
            Some(body) => self.eval_seq(body, ctx),
            None => {
                let shown = self.inspect_lossy(&subject);
                Err(self.no_match_error(format!("no when clause matches {shown}"), case.span))
            }
        }
    }

    // ── Exceptions ────────────────────────────────────────────────────────

    /// A body with optional `rescue`, `else` and `ensure` parts. `ensure`
    /// runs on every exit except a halt, and its own unwind replaces the
    /// body's outcome.
    pub(crate) fn eval_body(&mut self, body: &Body, ctx: &Ctx) -> EvalResult<Value> {
        if !body.is_protected() {
            return self.eval_seq(&body.stmts, ctx);
        }
        let result = match self.eval_seq(&body.stmts, ctx) {
            Err(Unwind::Raise(raised)) => self.rescue(&body.rescues, *raised, ctx),
            Ok(value) => match &body.else_body {
                Some(else_body) => self.eval_seq(else_body, ctx),
                None => Ok(value),
            },
            other => other,
        };
        if let Some(ensure) = &body.ensure {
            if matches!(result, Err(Unwind::Halt(_))) {
                return result;
            }
            self.eval_seq(ensure, ctx)?;
        }
        result
    }

    /// Try each rescue clause in order; re-raise when none matches.
    fn rescue(&mut self, clauses: &[RescueClause], raised: Raised, ctx: &Ctx) -> EvalResult<Value> {
        for clause in clauses {
            let clause_ctx = Ctx {
                scope: ctx.scope.child(),
                ..ctx.clone()
            };
            let mut bindings = Vec::new();
            if let Some(pattern) = &clause.pattern {
                if !self.match_pattern(pattern, &raised.value, &clause_ctx, &mut bindings)? {
                    continue;
                }
            }
            bind_all(bindings, &clause_ctx.scope, BindMode::Define);
            if let Some(guard) = &clause.guard {
                if !self.eval(guard, &clause_ctx)?.is_truthy() {
                    continue;
                }
            }
            tracing::trace!(line = raised.span.line(), "rescued");
            self.rescuing.push(raised);
            let result = self.eval_seq(&clause.body, &clause_ctx);
            self.rescuing.pop();
            return result;
        }
        Err(Unwind::Raise(Box::new(raised)))
    }

    /// `raise value`, or bare `raise` to re-raise inside a rescue clause.
    fn eval_raise(&mut self, value: Option<&Expr>, span: Span, ctx: &Ctx) -> EvalResult<Value> {
        match value {
            Some(expr) => {
                let value = self.eval(expr, ctx)?;
                Err(self.raise(value, span))
            }
            None => match self.rescuing.last() {
                Some(current) => Err(Unwind::Raise(Box::new(current.clone()))),
                None => Err(self.runtime_error("unhandled exception", span)),
            },
        }
    }

    // ── Calls & blocks ────────────────────────────────────────────────────

    /// `recv.name(args) { block }` or `name(args)`. Without a receiver, a
    /// local holding a lambda is called; otherwise the call goes to `self`.
    fn eval_call(&mut self, call: &Call, span: Span, ctx: &Ctx) -> EvalResult<Value> {
        let name = call.method.name.as_str();
        let receiver = match &call.receiver {
            Some(expr) => Some(self.eval(expr, ctx)?),
            None => None,
        };
        let args = self.eval_args(&call.args, ctx)?;
        let (block, literal) = self.eval_block_arg(call.block.as_ref(), ctx)?;
        let result = match receiver {
            Some(receiver) => self.send(receiver, name, args, block, span),
            None => match ctx.scope.get(name) {
                Some(Value::Lambda(lambda)) => self.call_lambda(&lambda, args, block, span),
                _ => self.send(ctx.self_value.clone(), name, args, block, span),
            },
        };
        catch_block_break(result, literal)
    }

    /// The block passed to a call, and the id of the literal when it was
    /// written at the call site.
    fn eval_block_arg(
        &mut self,
        block: Option<&BlockArg>,
        ctx: &Ctx,
    ) -> EvalResult<(Option<Value>, Option<u64>)> {
        match block {
            None => Ok((None, None)),
            Some(BlockArg::Literal(lit)) => {
                let lambda = self.make_lambda(lit, ctx);
                let id = lambda.id;
                Ok((Some(Value::Lambda(lambda)), Some(id)))
            }
            Some(BlockArg::Pass(expr)) => match self.eval(expr, ctx)? {
                Value::Nil => Ok((None, None)),
                lambda @ Value::Lambda(_) => Ok((Some(lambda), None)),
                other => {
                    let found = self.inspect_lossy(&other);
                    Err(self.argument_error(
                        format!("block argument must be a Lambda, got {found}"),
                        expr.span,
                    ))
                }
            },
        }
    }

    fn eval_super(&mut self, call: &SuperCall, span: Span, ctx: &Ctx) -> EvalResult<Value> {
        let Some(frame) = ctx.method.clone() else {
            return Err(self.runtime_error("super called outside of a method", span));
        };
        let args = match &call.args {
            Some(exprs) => self.eval_args(exprs, ctx)?,
            None => frame.args.clone(),
        };
        let (block, literal) = match &call.block {
            Some(block) => self.eval_block_arg(Some(block), ctx)?,
            None => (frame.block.clone(), None),
        };
        let result = self.send_super(&frame, ctx.self_value.clone(), args, block, span);
        catch_block_break(result, literal)
    }

    fn eval_yield(&mut self, args: &[Expr], span: Span, ctx: &Ctx) -> EvalResult<Value> {
        let block = ctx.method.as_ref().and_then(|frame| frame.block.clone());
        let Some(block) = block else {
            return Err(self.runtime_error("no block given (yield)", span));
        };
        let args = self.eval_args(args, ctx)?;
        self.call_value(&block, args, None, span)
    }

    pub(crate) fn make_lambda(&mut self, block: &Rc<BlockLit>, ctx: &Ctx) -> Rc<Lambda> {
        Rc::new(Lambda {
            id: self.next_block_id(),
            block: block.clone(),
            scope: ctx.scope.clone(),
            self_value: ctx.self_value.clone(),
            module: ctx.module.clone(),
            method: ctx.method.clone(),
        })
    }
}

/// `break` inside a block literal ends the call the literal was passed to.
fn catch_block_break(result: EvalResult<Value>, literal: Option<u64>) -> EvalResult<Value> {
    match (result, literal) {
        (Err(Unwind::BlockBreak { block, value }), Some(id)) if block == id => Ok(value),
        (result, _) => result,
    }
}
