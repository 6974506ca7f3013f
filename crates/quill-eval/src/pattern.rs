//! Structural pattern matching, shared by parameters, destructuring, `=:`,
//! `case` arms and `rescue` clauses.
//!
//! Matching never binds directly: it collects `(name, value)` pairs and the
//! caller binds them only once the whole pattern (and any guard) succeeded.

use quill_types::ast::{Pattern, TypePath};
use quill_types::Span;

use crate::env::Scope;
use crate::error::{EvalResult, Unwind};
use crate::interpreter::{Ctx, Interpreter};
use crate::object::TypeRef;
use crate::value::Value;

/// Names bound by a successful match, in pattern order.
pub(crate) type Bindings = Vec<(String, Value)>;

/// How matched names enter a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BindMode {
    /// Update the nearest frame that binds the name, else define here.
    Assign,
    /// Always define in the given frame.
    Define,
}

pub(crate) fn bind_all(bindings: Bindings, scope: &Scope, mode: BindMode) {
    for (name, value) in bindings {
        match mode {
            BindMode::Assign => scope.set(&name, value),
            BindMode::Define => scope.define(&name, value),
        }
    }
}

impl Interpreter {
    pub(crate) fn match_pattern(
        &mut self,
        pattern: &Pattern,
        value: &Value,
        ctx: &Ctx,
        out: &mut Bindings,
    ) -> EvalResult<bool> {
        match pattern {
            Pattern::Wildcard(_) => Ok(true),
            Pattern::Bind { name, type_path } => {
                if let Some(path) = type_path {
                    let ty = self.resolve_type(path, ctx)?;
                    if !self.is_instance(value, &ty) {
                        return Ok(false);
                    }
                }
                out.push((name.name.clone(), value.clone()));
                Ok(true)
            }
            Pattern::Const(path) => {
                let constant = self.resolve_type_path(path, ctx)?;
                self.matches_const(&constant, value)
            }
            Pattern::Literal(lit, _) => self.values_equal(&Value::from(lit), value),
            Pattern::List { items, .. } => {
                let Value::List(list) = value else {
                    return Ok(false);
                };
                let values = list.borrow().clone();
                self.match_sequence(items, &values, ctx, out)
            }
            Pattern::Splat { name, .. } => {
                if let Some(name) = name {
                    out.push((name.name.clone(), value.clone()));
                }
                Ok(true)
            }
        }
    }

    /// Match positional patterns against values. At most one splat takes
    /// whatever the patterns before and after it leave over.
    pub(crate) fn match_sequence(
        &mut self,
        patterns: &[Pattern],
        values: &[Value],
        ctx: &Ctx,
        out: &mut Bindings,
    ) -> EvalResult<bool> {
        let Some(at) = patterns
            .iter()
            .position(|p| matches!(p, Pattern::Splat { .. }))
        else {
            if patterns.len() != values.len() {
                return Ok(false);
            }
            return self.match_each(patterns, values, ctx, out);
        };

        let suffix = patterns.len() - at - 1;
        if values.len() < at + suffix {
            return Ok(false);
        }
        let rest_end = values.len() - suffix;
        if !self.match_each(&patterns[..at], &values[..at], ctx, out)? {
            return Ok(false);
        }
        if let Pattern::Splat { name: Some(name), .. } = &patterns[at] {
            out.push((name.name.clone(), Value::list(values[at..rest_end].to_vec())));
        }
        self.match_each(&patterns[at + 1..], &values[rest_end..], ctx, out)
    }

    fn match_each(
        &mut self,
        patterns: &[Pattern],
        values: &[Value],
        ctx: &Ctx,
        out: &mut Bindings,
    ) -> EvalResult<bool> {
        for (pattern, value) in patterns.iter().zip(values) {
            if !self.match_pattern(pattern, value, ctx, out)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// A constant pattern: an ancestry test when the constant is a type or
    /// module, otherwise equality with its value.
    fn matches_const(&mut self, constant: &Value, value: &Value) -> EvalResult<bool> {
        match constant {
            Value::Type(ty) => Ok(self.is_instance(value, ty)),
            other => self.values_equal(other, value),
        }
    }

    /// `left == right`, without dispatch when both sides are scalars.
    pub(crate) fn values_equal(&mut self, left: &Value, right: &Value) -> EvalResult<bool> {
        if let Some(eq) = left.scalar_eq(right) {
            return Ok(eq);
        }
        let result = self.send(left.clone(), "==", vec![right.clone()], None, Span::default())?;
        Ok(result.is_truthy())
    }

    /// The value of a dotted constant path such as `Geo.Point`.
    pub(crate) fn resolve_type_path(&mut self, path: &TypePath, ctx: &Ctx) -> EvalResult<Value> {
        let mut segments = path.segments.iter();
        let Some(first) = segments.next() else {
            return Ok(Value::Nil);
        };
        let mut current = self.lookup_constant(ctx, &first.name, first.span)?;
        let mut walked = first.name.clone();
        for segment in segments {
            walked = format!("{walked}.{}", segment.name);
            let found = match &current {
                Value::Type(ty) => ty.constant(&segment.name),
                _ => None,
            };
            current = found.ok_or_else(|| {
                self.error(
                    &self.core.name_error,
                    format!("uninitialized constant {walked}"),
                    segment.span,
                )
            })?;
        }
        Ok(current)
    }

    /// A path that must name a type or module, as in `x: Point`.
    fn resolve_type(&mut self, path: &TypePath, ctx: &Ctx) -> EvalResult<TypeRef> {
        match self.resolve_type_path(path, ctx)? {
            Value::Type(ty) => Ok(ty),
            _ => Err(self.argument_error(format!("{path} is not a type or module"), path.span)),
        }
    }

    /// `NoMatch` for `value` against `pattern`.
    pub(crate) fn no_match(&mut self, pattern: &Pattern, value: &Value, span: Span) -> Unwind {
        let shown = self.inspect_lossy(value);
        self.no_match_error(format!("{shown} does not match {pattern}"), span)
    }
}
