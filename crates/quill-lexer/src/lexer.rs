//! Core Quill lexer: converts source text to a lazy token stream.
//!
//! Features:
//! - Whitespace runs (space, tab, `\r`) merged into one `Whitespace` token
//! - Every `\n` emitted as its own `Newline` token
//! - `#` comments kept as `Comment` tokens
//! - `\0` treated as end of input; nothing after it is scanned
//! - Maximal munch over multi-character operators
//! - Stops at the first unrecognised character with a [`LexError`]

use quill_types::{LexError, Span};

use crate::token::{Token, TokenKind};

/// The Quill lexer.
///
/// Implements [`Iterator`] over `Result<Token, LexError>`. The stream ends
/// after the first `Eof` token or the first error, whichever comes first.
pub struct Lexer<'src> {
    /// The full source text.
    source: &'src str,
    /// Current byte offset into `source`.
    pos: usize,
    /// Current line number (1-based).
    line: u32,
    /// Current column number (1-based, counted in characters).
    col: u32,
    /// Set once `Eof` or an error has been produced.
    finished: bool,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            pos: 0,
            line: 1,
            col: 1,
            finished: false,
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Character-level helpers
    // ─────────────────────────────────────────────────────────────

    fn bytes(&self) -> &'src [u8] {
        self.source.as_bytes()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes().get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes().get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let ch = self.peek()?;
        self.pos += 1;
        if ch == b'\n' {
            self.line += 1;
            self.col = 1;
        } else if ch & 0xC0 != 0x80 {
            // UTF-8 continuation bytes do not start a new column.
            self.col += 1;
        }
        Some(ch)
    }

    fn at_end(&self) -> bool {
        matches!(self.peek(), None | Some(b'\0'))
    }

    fn current_span(&self) -> Span {
        Span::point(self.line, self.col)
    }

    fn span_from(&self, start_line: u32, start_col: u32) -> Span {
        Span::new(
            start_line,
            start_col,
            self.line,
            self.col.saturating_sub(1).max(1),
        )
    }

    fn error(&self, message: impl Into<String>, start_line: u32, start_col: u32) -> LexError {
        LexError::new(message, self.span_from(start_line, start_col))
    }

    fn is_ident_start(ch: u8) -> bool {
        ch.is_ascii_lowercase() || ch == b'_'
    }

    fn is_ident_continue(ch: u8) -> bool {
        ch.is_ascii_alphanumeric() || ch == b'_'
    }

    // ─────────────────────────────────────────────────────────────
    // Token scanning
    // ─────────────────────────────────────────────────────────────

    /// Scan exactly one token starting at the current position.
    fn scan_token(&mut self) -> Result<Token, LexError> {
        let start = self.pos;
        let start_line = self.line;
        let start_col = self.col;

        let Some(ch) = self.peek().filter(|&c| c != b'\0') else {
            return Ok(Token::new(TokenKind::Eof, "", self.current_span()));
        };

        let kind = match ch {
            b' ' | b'\t' | b'\r' => {
                while matches!(self.peek(), Some(b' ' | b'\t' | b'\r')) {
                    self.advance();
                }
                TokenKind::Whitespace
            }
            b'\n' => {
                self.advance();
                TokenKind::Newline
            }
            b'#' => {
                while !self.at_end() && self.peek() != Some(b'\n') {
                    self.advance();
                }
                TokenKind::Comment(self.source[start..self.pos].to_string())
            }
            b'0'..=b'9' => self.scan_number(start, start_line, start_col)?,
            b'"' => self.scan_string(start_line, start_col)?,
            b'\'' => self.scan_raw_string(start_line, start_col)?,
            b'@' => {
                self.advance();
                match self.peek() {
                    Some(c) if Self::is_ident_start(c) => {
                        let name = self.scan_name_tail(true);
                        TokenKind::Attribute(name.to_string())
                    }
                    _ => {
                        return Err(self.error(
                            "expected attribute name after '@'",
                            start_line,
                            start_col,
                        ))
                    }
                }
            }
            b':' => {
                self.advance();
                match self.peek() {
                    Some(c) if c.is_ascii_alphabetic() || c == b'_' => {
                        let name = self.scan_name_tail(true);
                        TokenKind::Symbol(name.to_string())
                    }
                    _ => TokenKind::Colon,
                }
            }
            c if Self::is_ident_start(c) => {
                let name = self.scan_name_tail(true);
                TokenKind::from_keyword(name)
                    .unwrap_or_else(|| TokenKind::Identifier(name.to_string()))
            }
            c if c.is_ascii_uppercase() => {
                let name = self.scan_name_tail(false);
                TokenKind::Constant(name.to_string())
            }
            _ => self.scan_operator(start_line, start_col)?,
        };

        let lexeme = &self.source[start..self.pos];
        Ok(Token::new(kind, lexeme, self.span_from(start_line, start_col)))
    }

    /// Consume `[A-Za-z0-9_]*` (the first character included) and, when
    /// `suffix` is set, one trailing `?` or `!` (the latter only when not
    /// starting `!=`). Returns the consumed text.
    fn scan_name_tail(&mut self, suffix: bool) -> &'src str {
        let start = self.pos;
        self.advance();
        while self.peek().is_some_and(Self::is_ident_continue) {
            self.advance();
        }
        if suffix {
            match (self.peek(), self.peek_at(1)) {
                (Some(b'?'), _) => {
                    self.advance();
                }
                (Some(b'!'), next) if next != Some(b'=') => {
                    self.advance();
                }
                _ => {}
            }
        }
        &self.source[start..self.pos]
    }

    // ─────────────────────────────────────────────────────────────
    // Operators & punctuation
    // ─────────────────────────────────────────────────────────────

    fn scan_operator(&mut self, start_line: u32, start_col: u32) -> Result<TokenKind, LexError> {
        let first = self.peek().unwrap_or(b'\0');
        let second = self.peek_at(1);
        let third = self.peek_at(2);

        let (kind, len) = match (first, second, third) {
            (b'&', Some(b'&'), Some(b'=')) => (TokenKind::AndAndAssign, 3),
            (b'|', Some(b'|'), Some(b'=')) => (TokenKind::OrOrAssign, 3),

            // `-@x` is `-` followed by an attribute.
            (b'-', Some(b'@'), next) if !next.is_some_and(Self::is_ident_start) => {
                (TokenKind::MinusAt, 2)
            }
            (b'&', Some(b'&'), _) => (TokenKind::AndAnd, 2),
            (b'|', Some(b'|'), _) => (TokenKind::OrOr, 2),
            (b'<', Some(b'='), _) => (TokenKind::LessEqual, 2),
            (b'>', Some(b'='), _) => (TokenKind::GreaterEqual, 2),
            (b'=', Some(b'='), _) => (TokenKind::EqualEqual, 2),
            (b'!', Some(b'='), _) => (TokenKind::BangEqual, 2),
            (b'=', Some(b':'), _) => (TokenKind::MatchOp, 2),
            (b'+', Some(b'='), _) => (TokenKind::PlusAssign, 2),
            (b'-', Some(b'='), _) => (TokenKind::MinusAssign, 2),
            (b'*', Some(b'='), _) => (TokenKind::StarAssign, 2),
            (b'/', Some(b'='), _) => (TokenKind::SlashAssign, 2),
            (b'%', Some(b'='), _) => (TokenKind::PercentAssign, 2),

            (b'+', _, _) => (TokenKind::Plus, 1),
            (b'-', _, _) => (TokenKind::Minus, 1),
            (b'*', _, _) => (TokenKind::Star, 1),
            (b'/', _, _) => (TokenKind::Slash, 1),
            (b'%', _, _) => (TokenKind::Percent, 1),
            (b'<', _, _) => (TokenKind::Less, 1),
            (b'>', _, _) => (TokenKind::Greater, 1),
            (b'=', _, _) => (TokenKind::Assign, 1),
            (b'!', _, _) => (TokenKind::Bang, 1),
            (b'&', _, _) => (TokenKind::Amp, 1),
            (b'|', _, _) => (TokenKind::Pipe, 1),
            (b',', _, _) => (TokenKind::Comma, 1),
            (b'.', _, _) => (TokenKind::Dot, 1),
            (b';', _, _) => (TokenKind::Semicolon, 1),
            (b'(', _, _) => (TokenKind::LParen, 1),
            (b')', _, _) => (TokenKind::RParen, 1),
            (b'[', _, _) => (TokenKind::LBracket, 1),
            (b']', _, _) => (TokenKind::RBracket, 1),
            (b'{', _, _) => (TokenKind::LBrace, 1),
            (b'}', _, _) => (TokenKind::RBrace, 1),

            _ => {
                let ch = self.source[self.pos..].chars().next().unwrap_or('\u{fffd}');
                self.advance();
                return Err(self.error(
                    format!("unexpected character '{}'", ch.escape_debug()),
                    start_line,
                    start_col,
                ));
            }
        };

        for _ in 0..len {
            self.advance();
        }
        Ok(kind)
    }

    // ─────────────────────────────────────────────────────────────
    // Number literals
    // ─────────────────────────────────────────────────────────────

    fn scan_number(
        &mut self,
        start: usize,
        start_line: u32,
        start_col: u32,
    ) -> Result<TokenKind, LexError> {
        while matches!(self.peek(), Some(b'0'..=b'9' | b'_')) {
            self.advance();
        }

        // A digit must follow the dot, otherwise `1.to_s` would be a float.
        let is_float = self.peek() == Some(b'.') && matches!(self.peek_at(1), Some(b'0'..=b'9'));
        if is_float {
            self.advance();
            while matches!(self.peek(), Some(b'0'..=b'9' | b'_')) {
                self.advance();
            }
        }

        let text: String = self.source[start..self.pos]
            .chars()
            .filter(|&c| c != '_')
            .collect();

        if is_float {
            text.parse::<f64>()
                .map(TokenKind::Float)
                .map_err(|_| self.error(format!("invalid float literal '{text}'"), start_line, start_col))
        } else {
            text.parse::<i64>().map(TokenKind::Int).map_err(|_| {
                self.error(
                    format!("integer literal '{text}' is out of range"),
                    start_line,
                    start_col,
                )
            })
        }
    }

    // ─────────────────────────────────────────────────────────────
    // String literals
    // ─────────────────────────────────────────────────────────────

    /// Scan a `"..."` literal, decoding escapes. Strings may span lines.
    fn scan_string(&mut self, start_line: u32, start_col: u32) -> Result<TokenKind, LexError> {
        self.advance(); // opening quote
        let mut buf: Vec<u8> = Vec::new();

        loop {
            match self.peek() {
                None | Some(b'\0') => {
                    return Err(self.error("unterminated string literal", start_line, start_col))
                }
                Some(b'"') => {
                    self.advance();
                    break;
                }
                Some(b'\\') => {
                    let esc_line = self.line;
                    let esc_col = self.col;
                    self.advance();
                    let decoded = match self.peek() {
                        Some(b'n') => b'\n',
                        Some(b't') => b'\t',
                        Some(b'r') => b'\r',
                        Some(b'0') => b'\0',
                        Some(b'e') => 0x1b,
                        Some(b'\\') => b'\\',
                        Some(b'"') => b'"',
                        None | Some(b'\0') => {
                            return Err(self.error(
                                "unterminated string literal",
                                start_line,
                                start_col,
                            ))
                        }
                        Some(other) => {
                            self.advance();
                            return Err(self.error(
                                format!("invalid escape sequence '\\{}'", other as char),
                                esc_line,
                                esc_col,
                            ));
                        }
                    };
                    self.advance();
                    buf.push(decoded);
                }
                Some(ch) => {
                    self.advance();
                    buf.push(ch);
                }
            }
        }

        Ok(TokenKind::Str(into_string(buf)))
    }

    /// Scan a `'...'` literal. Only `\'` and `\\` are escapes.
    fn scan_raw_string(&mut self, start_line: u32, start_col: u32) -> Result<TokenKind, LexError> {
        self.advance(); // opening quote
        let mut buf: Vec<u8> = Vec::new();

        loop {
            match self.peek() {
                None | Some(b'\0') => {
                    return Err(self.error("unterminated string literal", start_line, start_col))
                }
                Some(b'\'') => {
                    self.advance();
                    break;
                }
                Some(b'\\') if matches!(self.peek_at(1), Some(b'\'' | b'\\')) => {
                    self.advance();
                    if let Some(ch) = self.advance() {
                        buf.push(ch);
                    }
                }
                Some(ch) => {
                    self.advance();
                    buf.push(ch);
                }
            }
        }

        Ok(TokenKind::Str(into_string(buf)))
    }
}

/// The source is valid UTF-8 and escapes only produce ASCII, so decoding
/// never actually loses data.
fn into_string(buf: Vec<u8>) -> String {
    String::from_utf8(buf).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let result = self.scan_token();
        match &result {
            Ok(token) if token.kind == TokenKind::Eof => self.finished = true,
            Err(_) => self.finished = true,
            Ok(_) => {}
        }
        Some(result)
    }
}

impl std::iter::FusedIterator for Lexer<'_> {}

/// Tokenize `source` completely.
///
/// The returned stream always ends with exactly one [`TokenKind::Eof`].
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(source).collect()
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────
