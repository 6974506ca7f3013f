//! Core parser infrastructure: token cursor, doc-comment collection, error
//! reporting and the public entry points.

use quill_lexer::{tokenize, Token, TokenKind};
use quill_types::ast::{Ident, Program};
use quill_types::{ParseError, SourceFile, Span};

pub(crate) type PResult<T> = Result<T, ParseError>;

/// The Quill parser.
///
/// Consumes the lexer's token stream and builds an AST. Whitespace and
/// comment tokens are dropped on construction; comment lines that directly
/// precede a `def`, `type` or `module` are kept as that definition's doc
/// text. Parsing stops at the first error.
pub struct Parser {
    /// Significant tokens (no whitespace or comments). Always ends with `Eof`.
    tokens: Vec<Token>,
    /// Doc text for the token at the same index, if any.
    docs: Vec<Option<String>>,
    /// Current index into `tokens`.
    pos: usize,
}

impl Parser {
    /// Create a parser over a raw token stream (trivia included).
    pub fn new(raw: Vec<Token>) -> Self {
        let mut tokens = Vec::with_capacity(raw.len());
        let mut docs = Vec::with_capacity(raw.len());
        let mut pending: Vec<String> = Vec::new();
        let mut line_has_code = false;
        let mut line_has_comment = false;

        for token in raw {
            match &token.kind {
                TokenKind::Whitespace => continue,
                TokenKind::Comment(text) => {
                    if !line_has_code {
                        pending.push(strip_comment_marker(text));
                    }
                    line_has_comment = true;
                    continue;
                }
                TokenKind::Newline => {
                    // A blank line detaches the comments above it.
                    if !line_has_code && !line_has_comment {
                        pending.clear();
                    }
                    line_has_code = false;
                    line_has_comment = false;
                    docs.push(None);
                }
                kind => {
                    let is_definition =
                        matches!(kind, TokenKind::Def | TokenKind::Type | TokenKind::Module);
                    if is_definition && !line_has_code && !pending.is_empty() {
                        docs.push(Some(pending.join("\n")));
                    } else {
                        docs.push(None);
                    }
                    pending.clear();
                    line_has_code = true;
                }
            }
            tokens.push(token);
        }

        if tokens.last().is_none_or(|t| t.kind != TokenKind::Eof) {
            let span = tokens.last().map(|t| t.span).unwrap_or_default();
            tokens.push(Token::new(TokenKind::Eof, "", span));
            docs.push(None);
        }

        Self {
            tokens,
            docs,
            pos: 0,
        }
    }

    /// Parse a complete program.
    pub fn parse_program(mut self) -> PResult<Program> {
        let start = self.current_span();
        let body = self.parse_statements()?;
        if !self.at_end() {
            return Err(self.unexpected("expression or end of file"));
        }
        let span = match body.last() {
            Some(last) => start.merge(last.span),
            None => start,
        };
        Ok(Program { body, span })
    }

    // ── Token Cursor ──────────────────────────────────────────────────────────

    /// Returns the current token without advancing.
    pub(crate) fn peek(&self) -> &Token {
        let idx = self.pos.min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    /// Returns the kind of the current token.
    pub(crate) fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    /// Advance the cursor by one and return the consumed token.
    pub(crate) fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    /// Returns the previously consumed token's span.
    pub(crate) fn previous_span(&self) -> Span {
        if self.pos > 0 {
            self.tokens[self.pos - 1].span
        } else {
            Span::point(1, 1)
        }
    }

    /// Returns the span of the current token.
    pub(crate) fn current_span(&self) -> Span {
        self.peek().span
    }

    /// Returns `true` if the current token is `Eof`.
    pub(crate) fn at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    /// Check if the current token matches the given kind exactly.
    pub(crate) fn check_exact(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    /// If the current token matches, advance and return `true`.
    pub(crate) fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check_exact(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Look ahead by `n` tokens from current position.
    pub(crate) fn look_ahead(&self, n: usize) -> &TokenKind {
        self.tokens
            .get(self.pos + n)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    /// Save the cursor for a speculative parse.
    pub(crate) fn checkpoint(&self) -> usize {
        self.pos
    }

    /// Rewind to a saved cursor.
    pub(crate) fn rewind(&mut self, checkpoint: usize) {
        self.pos = checkpoint;
    }

    /// Doc text attached to the current token.
    pub(crate) fn current_doc(&self) -> Option<String> {
        self.docs.get(self.pos).cloned().flatten()
    }

    // ── Separators ────────────────────────────────────────────────────────────

    /// Skip all consecutive newline tokens.
    pub(crate) fn skip_newlines(&mut self) {
        while self.check_exact(&TokenKind::Newline) {
            self.advance();
        }
    }

    pub(crate) fn at_separator(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Newline | TokenKind::Semicolon)
    }

    /// Skip newlines and semicolons.
    pub(crate) fn skip_separators(&mut self) {
        while self.at_separator() {
            self.advance();
        }
    }

    /// Require at least one newline or `;`, then skip the rest.
    pub(crate) fn expect_separator(&mut self) -> PResult<()> {
        if !self.at_separator() {
            return Err(self.unexpected("newline or ';'"));
        }
        self.skip_separators();
        Ok(())
    }

    // ── Expect Helpers ────────────────────────────────────────────────────────

    /// Expect a specific token kind.
    pub(crate) fn expect(&mut self, expected: &TokenKind) -> PResult<Token> {
        if self.check_exact(expected) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(expected.to_string()))
        }
    }

    /// Expect a lower-case identifier.
    pub(crate) fn expect_identifier(&mut self) -> PResult<Ident> {
        match self.peek_kind().clone() {
            TokenKind::Identifier(name) => {
                let span = self.advance().span;
                Ok(Ident::new(name, span))
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    /// Expect a capitalised constant name.
    pub(crate) fn expect_constant(&mut self) -> PResult<Ident> {
        match self.peek_kind().clone() {
            TokenKind::Constant(name) => {
                let span = self.advance().span;
                Ok(Ident::new(name, span))
            }
            _ => Err(self.unexpected("constant name")),
        }
    }

    /// Expect `end`, reporting the construct it closes.
    pub(crate) fn expect_end(&mut self, construct: &str) -> PResult<Token> {
        if self.check_exact(&TokenKind::End) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(format!("'end' to close '{construct}'")))
        }
    }

    // ── Error Reporting ───────────────────────────────────────────────────────

    /// Build an error describing the current token.
    pub(crate) fn unexpected(&self, expected: impl Into<String>) -> ParseError {
        ParseError::new(expected, self.peek_kind().to_string(), self.current_span())
    }

    /// Build an error at a specific span.
    pub(crate) fn error_at(
        &self,
        expected: impl Into<String>,
        found: impl Into<String>,
        span: Span,
    ) -> ParseError {
        ParseError::new(expected, found, span)
    }
}

/// `# text` → `text`: the `#` and at most one following space are removed.
fn strip_comment_marker(text: &str) -> String {
    let body = text.strip_prefix('#').unwrap_or(text);
    body.strip_prefix(' ').unwrap_or(body).to_string()
}

// ══════════════════════════════════════════════════════════════════════════════
// Entry Points
// ══════════════════════════════════════════════════════════════════════════════

/// Parse a token stream produced by [`quill_lexer::tokenize`].
pub fn parse(tokens: Vec<Token>) -> Result<Program, ParseError> {
    Parser::new(tokens).parse_program()
}

/// Lex and parse a source string.
pub fn parse_str(source: &str) -> quill_types::Result<Program> {
    let tokens = tokenize(source)?;
    Ok(parse(tokens)?)
}

/// Lex and parse a source file.
pub fn parse_source(file: &SourceFile) -> quill_types::Result<Program> {
    parse_str(&file.source)
}
