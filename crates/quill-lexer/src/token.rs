//! Token types for the Quill lexer.
//!
//! Defines [`TokenKind`] covering every lexeme in Quill and [`Token`], which
//! pairs a kind with its raw text and source [`Span`].

use quill_types::Span;
use std::fmt;

/// All reserved words in Quill.
///
/// The lexer recognises each one and emits a specific keyword token instead
/// of [`TokenKind::Identifier`]. After `.` or `def` the parser accepts them
/// as method names.
pub const ALL_KEYWORDS: &[&str] = &[
    "def", "end", "type", "module", "include", "if", "elsif", "else", "while", "for", "in",
    "do", "case", "when", "begin", "rescue", "ensure", "raise", "return", "break", "next",
    "yield", "super", "self", "nil", "true", "false",
];

// ─────────────────────────────────────────────────────────────────────
// Token
// ─────────────────────────────────────────────────────────────────────

/// A single token produced by the Quill lexer. Immutable once produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// The exact source text of the token.
    pub lexeme: String,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            span,
        }
    }

    /// Whitespace and comments: present in the stream, ignored by the grammar.
    pub fn is_trivia(&self) -> bool {
        self.kind.is_trivia()
    }
}

// ─────────────────────────────────────────────────────────────────────
// TokenKind
// ─────────────────────────────────────────────────────────────────────

/// Every kind of token in Quill. Literal kinds carry their decoded value.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // ── Literals ─────────────────────────────────────────────

    /// `42`, `1_000`
    Int(i64),
    /// `3.25`
    Float(f64),
    /// `"text"` / `'text'` with escapes decoded
    Str(String),
    /// `:name`
    Symbol(String),

    // ── Names ────────────────────────────────────────────────

    /// `name`, `empty?`, `push!`
    Identifier(String),
    /// `Name`
    Constant(String),
    /// `@name` (stores the name without `@`)
    Attribute(String),

    // ── Keywords ─────────────────────────────────────────────

    Def,
    End,
    Type,
    Module,
    Include,
    If,
    Elsif,
    Else,
    While,
    For,
    In,
    Do,
    Case,
    When,
    Begin,
    Rescue,
    Ensure,
    Raise,
    Return,
    Break,
    Next,
    Yield,
    Super,
    SelfKw,
    Nil,
    True,
    False,

    // ── Arithmetic ───────────────────────────────────────────

    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `%`
    Percent,
    /// `-@`, only valid as a method name after `def` or `.`
    MinusAt,

    // ── Comparison ───────────────────────────────────────────

    /// `<`
    Less,
    /// `<=`
    LessEqual,
    /// `==`
    EqualEqual,
    /// `!=`
    BangEqual,
    /// `>=`
    GreaterEqual,
    /// `>`
    Greater,

    // ── Logical & match ──────────────────────────────────────

    /// `&&`
    AndAnd,
    /// `||`
    OrOr,
    /// `!`
    Bang,
    /// `=:`
    MatchOp,

    // ── Assignment ───────────────────────────────────────────

    /// `=`
    Assign,
    /// `+=`
    PlusAssign,
    /// `-=`
    MinusAssign,
    /// `*=`
    StarAssign,
    /// `/=`
    SlashAssign,
    /// `%=`
    PercentAssign,
    /// `&&=`
    AndAndAssign,
    /// `||=`
    OrOrAssign,

    // ── Punctuation ──────────────────────────────────────────

    /// `,`
    Comma,
    /// `.`
    Dot,
    /// `:`
    Colon,
    /// `;`
    Semicolon,
    /// `&`
    Amp,
    /// `|`
    Pipe,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `{`
    LBrace,
    /// `}`
    RBrace,

    // ── Trivia & special ─────────────────────────────────────

    /// A run of spaces/tabs, never containing a newline.
    Whitespace,
    /// A single `\n`.
    Newline,
    /// `# ...` through end of line; the text includes the `#`.
    Comment(String),
    /// End of input or the `\0` sentinel.
    Eof,
}

impl TokenKind {
    /// Look up a reserved word. Returns `None` for user identifiers.
    pub fn from_keyword(s: &str) -> Option<TokenKind> {
        Some(match s {
            "def" => TokenKind::Def,
            "end" => TokenKind::End,
            "type" => TokenKind::Type,
            "module" => TokenKind::Module,
            "include" => TokenKind::Include,
            "if" => TokenKind::If,
            "elsif" => TokenKind::Elsif,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "for" => TokenKind::For,
            "in" => TokenKind::In,
            "do" => TokenKind::Do,
            "case" => TokenKind::Case,
            "when" => TokenKind::When,
            "begin" => TokenKind::Begin,
            "rescue" => TokenKind::Rescue,
            "ensure" => TokenKind::Ensure,
            "raise" => TokenKind::Raise,
            "return" => TokenKind::Return,
            "break" => TokenKind::Break,
            "next" => TokenKind::Next,
            "yield" => TokenKind::Yield,
            "super" => TokenKind::Super,
            "self" => TokenKind::SelfKw,
            "nil" => TokenKind::Nil,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            _ => return None,
        })
    }

    pub fn is_keyword(&self) -> bool {
        self.keyword_text().is_some()
    }

    /// Source text of a keyword token, `None` for everything else.
    pub fn keyword_text(&self) -> Option<&'static str> {
        Some(match self {
            TokenKind::Def => "def",
            TokenKind::End => "end",
            TokenKind::Type => "type",
            TokenKind::Module => "module",
            TokenKind::Include => "include",
            TokenKind::If => "if",
            TokenKind::Elsif => "elsif",
            TokenKind::Else => "else",
            TokenKind::While => "while",
            TokenKind::For => "for",
            TokenKind::In => "in",
            TokenKind::Do => "do",
            TokenKind::Case => "case",
            TokenKind::When => "when",
            TokenKind::Begin => "begin",
            TokenKind::Rescue => "rescue",
            TokenKind::Ensure => "ensure",
            TokenKind::Raise => "raise",
            TokenKind::Return => "return",
            TokenKind::Break => "break",
            TokenKind::Next => "next",
            TokenKind::Yield => "yield",
            TokenKind::Super => "super",
            TokenKind::SelfKw => "self",
            TokenKind::Nil => "nil",
            TokenKind::True => "true",
            TokenKind::False => "false",
            _ => return None,
        })
    }

    /// Source text of an operator or punctuation token.
    pub fn operator_text(&self) -> Option<&'static str> {
        Some(match self {
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::MinusAt => "-@",
            TokenKind::Less => "<",
            TokenKind::LessEqual => "<=",
            TokenKind::EqualEqual => "==",
            TokenKind::BangEqual => "!=",
            TokenKind::GreaterEqual => ">=",
            TokenKind::Greater => ">",
            TokenKind::AndAnd => "&&",
            TokenKind::OrOr => "||",
            TokenKind::Bang => "!",
            TokenKind::MatchOp => "=:",
            TokenKind::Assign => "=",
            TokenKind::PlusAssign => "+=",
            TokenKind::MinusAssign => "-=",
            TokenKind::StarAssign => "*=",
            TokenKind::SlashAssign => "/=",
            TokenKind::PercentAssign => "%=",
            TokenKind::AndAndAssign => "&&=",
            TokenKind::OrOrAssign => "||=",
            TokenKind::Comma => ",",
            TokenKind::Dot => ".",
            TokenKind::Colon => ":",
            TokenKind::Semicolon => ";",
            TokenKind::Amp => "&",
            TokenKind::Pipe => "|",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            _ => return None,
        })
    }

    pub fn is_trivia(&self) -> bool {
        matches!(self, TokenKind::Whitespace | TokenKind::Comment(_))
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(text) = self.keyword_text().or_else(|| self.operator_text()) {
            return write!(f, "'{text}'");
        }
        match self {
            TokenKind::Int(n) => write!(f, "{n}"),
            TokenKind::Float(n) => write!(f, "{n:?}"),
            TokenKind::Str(s) => write!(f, "{s:?}"),
            TokenKind::Symbol(s) => write!(f, ":{s}"),
            TokenKind::Identifier(s) | TokenKind::Constant(s) => f.write_str(s),
            TokenKind::Attribute(s) => write!(f, "@{s}"),
            TokenKind::Whitespace => f.write_str("whitespace"),
            TokenKind::Newline => f.write_str("newline"),
            TokenKind::Comment(_) => f.write_str("comment"),
            TokenKind::Eof => f.write_str("end of file"),
            _ => write!(f, "{self:?}"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────
