//! Statement lists and control-flow constructs.
//!
//! Every construct here is an expression; "statement" only means an
//! expression followed by a newline or `;`.

use quill_lexer::TokenKind;
use quill_types::ast::*;
use quill_types::Span;

use crate::parser::{PResult, Parser};

impl Parser {
    /// `Body = { Expr Sep }`, ending before `end`, `else`, `elsif`,
    /// `rescue`, `ensure`, `when`, `}` or end of file.
    pub(crate) fn parse_statements(&mut self) -> PResult<Vec<Expr>> {
        let mut stmts = Vec::new();
        loop {
            self.skip_separators();
            if self.at_body_end() {
                break;
            }
            stmts.push(self.parse_expression()?);
            if !self.at_separator() && !self.at_body_end() {
                return Err(self.unexpected("newline or ';'"));
            }
        }
        Ok(stmts)
    }

    pub(crate) fn at_body_end(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::End
                | TokenKind::Else
                | TokenKind::Elsif
                | TokenKind::Rescue
                | TokenKind::Ensure
                | TokenKind::When
                | TokenKind::RBrace
                | TokenKind::Eof
        )
    }

    // ── if / elsif / else ─────────────────────────────────────────────────────

    /// `"if" Expr Sep Body { "elsif" Expr Sep Body } [ "else" Body ] "end"`
    pub(crate) fn parse_if(&mut self) -> PResult<Expr> {
        let mut expr = self.parse_if_clauses()?;
        let end = self.expect_end("if")?;
        expr.span = expr.span.merge(end.span);
        Ok(expr)
    }

    /// Parses from `if`/`elsif` up to, not including, the closing `end`.
    /// Each `elsif` becomes a nested `If` in the else branch.
    fn parse_if_clauses(&mut self) -> PResult<Expr> {
        let start = self.advance().span;
        let condition = self.parse_expression()?;
        self.expect_separator()?;
        let then_body = self.parse_statements()?;

        let else_body = if self.check_exact(&TokenKind::Elsif) {
            Some(vec![self.parse_if_clauses()?])
        } else if self.eat(&TokenKind::Else) {
            Some(self.parse_statements()?)
        } else {
            None
        };

        let span = start.merge(self.previous_span());
        Ok(Expr::new(
            ExprKind::If(Box::new(IfExpr {
                condition,
                then_body,
                else_body,
                span,
            })),
            span,
        ))
    }

    // ── Loops ─────────────────────────────────────────────────────────────────

    /// `"while" Expr Sep Body "end"`
    pub(crate) fn parse_while(&mut self) -> PResult<Expr> {
        let start = self.advance().span;
        let condition = self.parse_expression()?;
        self.expect_separator()?;
        let body = self.parse_statements()?;
        let span = start.merge(self.expect_end("while")?.span);
        Ok(Expr::new(
            ExprKind::While(Box::new(WhileExpr {
                condition,
                body,
                span,
            })),
            span,
        ))
    }

    /// `"for" Pattern "in" Expr Sep Body "end"`
    pub(crate) fn parse_for(&mut self) -> PResult<Expr> {
        let start = self.advance().span;
        let pattern = self.parse_pattern()?;
        self.expect(&TokenKind::In)?;
        let iterable = self.parse_expression()?;
        self.expect_separator()?;
        let body = self.parse_statements()?;
        let span = start.merge(self.expect_end("for")?.span);
        Ok(Expr::new(
            ExprKind::For(Box::new(ForExpr {
                pattern,
                iterable,
                body,
                span,
            })),
            span,
        ))
    }

    // ── case / when ───────────────────────────────────────────────────────────

    /// `"case" Expr Sep { "when" Pattern ["if" Expr] Sep Body } ["else" Body] "end"`
    pub(crate) fn parse_case(&mut self) -> PResult<Expr> {
        let start = self.advance().span;
        let subject = self.parse_expression()?;
        self.expect_separator()?;

        let mut arms = Vec::new();
        while self.check_exact(&TokenKind::When) {
            let arm_start = self.advance().span;
            let pattern = self.parse_pattern()?;
            let guard = self.parse_guard()?;
            self.expect_separator()?;
            let body = self.parse_statements()?;
            arms.push(CaseArm {
                pattern,
                guard,
                body,
                span: arm_start.merge(self.previous_span()),
            });
        }
        if arms.is_empty() {
            return Err(self.unexpected("'when'"));
        }

        let else_body = if self.eat(&TokenKind::Else) {
            Some(self.parse_statements()?)
        } else {
            None
        };
        let span = start.merge(self.expect_end("case")?.span);
        Ok(Expr::new(
            ExprKind::Case(Box::new(CaseExpr {
                subject,
                arms,
                else_body,
                span,
            })),
            span,
        ))
    }

    /// Optional `if guard` after a pattern or method header.
    pub(crate) fn parse_guard(&mut self) -> PResult<Option<Expr>> {
        if self.eat(&TokenKind::If) {
            Ok(Some(self.parse_expression()?))
        } else {
            Ok(None)
        }
    }

    // ── begin / rescue / else / ensure ────────────────────────────────────────

    /// `"begin" Body { Rescue } ["else" Body] ["ensure" Body] "end"`
    pub(crate) fn parse_begin(&mut self) -> PResult<Expr> {
        let start = self.advance().span;
        let body = self.parse_protected_body(start, "begin")?;
        let span = body.span;
        Ok(Expr::new(ExprKind::Begin(Box::new(body)), span))
    }

    /// Statements plus their `rescue`/`else`/`ensure` sections, through the
    /// closing `end`. Shared by `begin` and `def`.
    pub(crate) fn parse_protected_body(&mut self, start: Span, construct: &str) -> PResult<Body> {
        let stmts = self.parse_statements()?;

        let mut rescues = Vec::new();
        while self.check_exact(&TokenKind::Rescue) {
            rescues.push(self.parse_rescue_clause()?);
        }
        let else_body = if self.eat(&TokenKind::Else) {
            Some(self.parse_statements()?)
        } else {
            None
        };
        let ensure = if self.eat(&TokenKind::Ensure) {
            Some(self.parse_statements()?)
        } else {
            None
        };

        let end = self.expect_end(construct)?;
        Ok(Body {
            stmts,
            rescues,
            else_body,
            ensure,
            span: start.merge(end.span),
        })
    }

    /// `"rescue" [Pattern] ["if" Expr] Sep Body`
    fn parse_rescue_clause(&mut self) -> PResult<RescueClause> {
        let start = self.advance().span;
        let pattern = if self.at_separator() || self.check_exact(&TokenKind::If) {
            None
        } else {
            Some(self.parse_pattern()?)
        };
        let guard = self.parse_guard()?;
        self.expect_separator()?;
        let body = self.parse_statements()?;
        Ok(RescueClause {
            pattern,
            guard,
            body,
            span: start.merge(self.previous_span()),
        })
    }
}
