use crate::Span;
use serde::Serialize;
use thiserror::Error;

/// Unrecognised input met by the lexer. Lexing stops at the first one.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{span}: {message}")]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

impl LexError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

/// A grammar violation. Parsing aborts at the first one; no partial tree
/// is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{span}: expected {expected}, found {found}")]
pub struct ParseError {
    /// Human-readable description of what the grammar allowed here.
    pub expected: String,
    /// The token that was actually present.
    pub found: String,
    pub span: Span,
}

impl ParseError {
    pub fn new(expected: impl Into<String>, found: impl Into<String>, span: Span) -> Self {
        Self {
            expected: expected.into(),
            found: found.into(),
            span,
        }
    }
}

/// Any failure of the front end (lexing or parsing), reported as a single
/// fatal condition with its position.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "stage", rename_all = "lowercase")]
pub enum SyntaxError {
    #[error("lex error at {0}")]
    Lex(#[from] LexError),
    #[error("parse error at {0}")]
    Parse(#[from] ParseError),
}

impl SyntaxError {
    pub fn span(&self) -> Span {
        match self {
            SyntaxError::Lex(e) => e.span,
            SyntaxError::Parse(e) => e.span,
        }
    }
}
