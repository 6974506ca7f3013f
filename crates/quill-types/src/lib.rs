//! Shared types for the Quill interpreter.
//!
//! This crate defines the AST node types, source spans and the syntax error
//! types used by the lexer, the parser and the evaluator.

mod error;
mod span;
pub mod ast;
pub mod outline;
pub mod stack;

pub use error::{LexError, ParseError, SyntaxError};
pub use span::{Position, SourceFile, Span};
pub use stack::ensure_sufficient_stack;

/// Result type used by the front end (lexer and parser).
pub type Result<T> = std::result::Result<T, SyntaxError>;
