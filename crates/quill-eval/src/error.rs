//! Runtime error types for the Quill evaluator.

use quill_types::{Span, SyntaxError};
use thiserror::Error;

use crate::value::Value;

/// A failure surfaced to the host: either the program did not parse, a
/// raised value reached the top of the stack, or a configured limit stopped
/// evaluation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RunError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    /// An unhandled `raise`.
    #[error("{span}: {type_name}: {message}")]
    Uncaught {
        /// Textual representation of the raised value.
        message: String,
        /// Name of the raised value's type.
        type_name: String,
        /// Where the value was raised.
        span: Span,
        /// Innermost call first, e.g. `area at 3:5`.
        backtrace: Vec<String>,
    },

    #[error("step limit of {limit} exceeded")]
    StepLimitExceeded { limit: u64 },

    #[error("call depth limit of {limit} exceeded")]
    CallDepthExceeded { limit: usize },
}

impl RunError {
    /// The raise site or syntax error position, when there is one.
    pub fn span(&self) -> Option<Span> {
        match self {
            RunError::Syntax(e) => Some(e.span()),
            RunError::Uncaught { span, .. } => Some(*span),
            _ => None,
        }
    }
}

/// A value in flight through `raise`.
#[derive(Debug, Clone)]
pub struct Raised {
    pub value: Value,
    pub span: Span,
    pub backtrace: Vec<String>,
}

/// Non-local exits. Every evaluation step returns `Result<Value, Unwind>` and
/// `?` carries these outward until the construct that handles them.
#[derive(Debug, Clone)]
pub enum Unwind {
    /// `raise`, and every built-in condition.
    Raise(Box<Raised>),
    /// `return`: stops at the nearest method or block invocation.
    Return(Value),
    /// `break` inside a loop body.
    Break(Value),
    /// `break` that escaped a block; stops at the call that received the
    /// block with this id.
    BlockBreak { block: u64, value: Value },
    /// `next`: stops at the nearest block invocation or loop iteration.
    Next(Value),
    /// A configured limit was hit. Never rescued.
    Halt(RunError),
}

/// Result alias for evaluator operations.
pub type EvalResult<T> = Result<T, Unwind>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uncaught_display_has_position_and_type() {
        let err = RunError::Uncaught {
            message: "boom".into(),
            type_name: "RuntimeError".into(),
            span: Span::point(3, 7),
            backtrace: vec![],
        };
        assert_eq!(err.to_string(), "3:7: RuntimeError: boom");
        assert_eq!(err.span(), Some(Span::point(3, 7)));
    }

    #[test]
    fn limit_errors_have_no_span() {
        let err = RunError::StepLimitExceeded { limit: 10 };
        assert_eq!(err.to_string(), "step limit of 10 exceeded");
        assert_eq!(err.span(), None);
    }
}
