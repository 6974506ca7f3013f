//! Quill lexer: converts source text into a lazy token stream.

pub mod lexer;
pub mod token;

pub use lexer::{tokenize, Lexer};
pub use token::{Token, TokenKind, ALL_KEYWORDS};
