//! Expression parsing with full operator precedence.
//!
//! Precedence (lowest → highest):
//! 9. assignment `=`, `+=`, `||=`, ... (right-associative) and `[..] = v`
//! 8. `||`
//! 7. `&&`
//! 6. `==`, `!=`, `=:` (no chaining)
//! 5. `<`, `<=`, `>`, `>=`
//! 4. `+`, `-`
//! 3. `*`, `/`, `%`
//! 2. unary `-`, `!`
//! 1. `.name(args) { block }`, `[index]`

use std::rc::Rc;

use quill_lexer::TokenKind;
use quill_types::ast::*;
use quill_types::{ensure_sufficient_stack, Position};

use crate::parser::{PResult, Parser};

impl Parser {
    // ══════════════════════════════════════════════════════════════════════════
    // Entry Point
    // ══════════════════════════════════════════════════════════════════════════

    /// Parse one expression.
    pub(crate) fn parse_expression(&mut self) -> PResult<Expr> {
        ensure_sufficient_stack(|| self.parse_assignment())
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Assignment
    // ══════════════════════════════════════════════════════════════════════════

    /// `Assignment = Target AssignOp Assignment | ListPattern "=" Assignment | OrExpr`
    fn parse_assignment(&mut self) -> PResult<Expr> {
        if self.check_exact(&TokenKind::LBracket) {
            if let Some(destructure) = self.try_parse_destructure()? {
                return Ok(destructure);
            }
        }

        let lhs = self.parse_or()?;
        let op = match self.peek_kind() {
            TokenKind::Assign => None,
            TokenKind::PlusAssign => Some(AssignOp::Arith(BinOp::Add)),
            TokenKind::MinusAssign => Some(AssignOp::Arith(BinOp::Sub)),
            TokenKind::StarAssign => Some(AssignOp::Arith(BinOp::Mul)),
            TokenKind::SlashAssign => Some(AssignOp::Arith(BinOp::Div)),
            TokenKind::PercentAssign => Some(AssignOp::Arith(BinOp::Mod)),
            TokenKind::AndAndAssign => Some(AssignOp::And),
            TokenKind::OrOrAssign => Some(AssignOp::Or),
            _ => return Ok(lhs),
        };
        self.advance();
        self.skip_newlines();

        let lhs_span = lhs.span;
        let target = Box::new(self.into_target(lhs)?);
        let value = Box::new(self.parse_expression()?);
        let span = lhs_span.merge(value.span);
        let kind = match op {
            None => ExprKind::Assign { target, value },
            Some(op) => ExprKind::OpAssign { target, op, value },
        };
        Ok(Expr::new(kind, span))
    }

    /// Speculatively parse `[pattern, ...] = value`. Rewinds and returns
    /// `None` when the bracket turns out to start an ordinary expression.
    fn try_parse_destructure(&mut self) -> PResult<Option<Expr>> {
        let checkpoint = self.checkpoint();
        let start = self.current_span();
        match self.parse_pattern() {
            Ok(pattern) if self.check_exact(&TokenKind::Assign) => {
                self.advance();
                self.skip_newlines();
                let value = self.parse_expression()?;
                let span = start.merge(value.span);
                Ok(Some(Expr::new(
                    ExprKind::Destructure {
                        pattern,
                        value: Box::new(value),
                    },
                    span,
                )))
            }
            _ => {
                self.rewind(checkpoint);
                Ok(None)
            }
        }
    }

    /// Convert a parsed left-hand side into an assignment target.
    fn into_target(&self, lhs: Expr) -> PResult<Target> {
        let span = lhs.span;
        match lhs.kind {
            ExprKind::Identifier(name) => Ok(Target::Local(Ident::new(name, span))),
            ExprKind::Attribute(name) => Ok(Target::Attribute(Ident::new(name, span))),
            ExprKind::Constant(name) => Ok(Target::Constant(Ident::new(name, span))),
            ExprKind::Call(call) => {
                let Call {
                    receiver,
                    method,
                    args,
                    block,
                } = *call;
                match receiver {
                    Some(receiver) if block.is_none() && method.name == "[]" => {
                        Ok(Target::Index { receiver, args })
                    }
                    Some(receiver)
                        if block.is_none() && args.is_empty() && is_setter_base(&method.name) =>
                    {
                        Ok(Target::Member {
                            receiver,
                            name: method,
                        })
                    }
                    _ => Err(self.error_at("assignable expression", "method call", span)),
                }
            }
            _ => Err(self.error_at("assignable expression", "expression", span)),
        }
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Precedence Chain
    // ══════════════════════════════════════════════════════════════════════════

    /// `OrExpr = AndExpr { "||" AndExpr }`
    fn parse_or(&mut self) -> PResult<Expr> {
        let mut left = self.parse_and()?;
        while self.eat(&TokenKind::OrOr) {
            self.skip_newlines();
            let right = self.parse_and()?;
            left = logical(LogicalOp::Or, left, right);
        }
        Ok(left)
    }

    /// `AndExpr = Equality { "&&" Equality }`
    fn parse_and(&mut self) -> PResult<Expr> {
        let mut left = self.parse_equality()?;
        while self.eat(&TokenKind::AndAnd) {
            self.skip_newlines();
            let right = self.parse_equality()?;
            left = logical(LogicalOp::And, left, right);
        }
        Ok(left)
    }

    /// `Equality = Relational [ ("==" | "!=") Relational | "=:" Pattern ]`
    ///
    /// Equality operators do NOT chain: `a == b == c` is a parse error.
    fn parse_equality(&mut self) -> PResult<Expr> {
        let left = self.parse_relational()?;
        let op = match self.peek_kind() {
            TokenKind::EqualEqual => BinOp::Eq,
            TokenKind::BangEqual => BinOp::NotEq,
            TokenKind::MatchOp => {
                self.advance();
                self.skip_newlines();
                let pattern = self.parse_pattern()?;
                let span = left.span.merge(pattern.span());
                return Ok(Expr::new(
                    ExprKind::MatchTest {
                        value: Box::new(left),
                        pattern,
                    },
                    span,
                ));
            }
            _ => return Ok(left),
        };
        self.advance();
        self.skip_newlines();
        let right = self.parse_relational()?;
        if matches!(
            self.peek_kind(),
            TokenKind::EqualEqual | TokenKind::BangEqual | TokenKind::MatchOp
        ) {
            return Err(self.unexpected("end of expression (equality operators do not chain)"));
        }
        Ok(binary(op, left, right))
    }

    /// `Relational = Additive { ("<" | "<=" | ">" | ">=") Additive }`
    fn parse_relational(&mut self) -> PResult<Expr> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Less => BinOp::Less,
                TokenKind::LessEqual => BinOp::LessEq,
                TokenKind::Greater => BinOp::Greater,
                TokenKind::GreaterEqual => BinOp::GreaterEq,
                _ => break,
            };
            self.advance();
            self.skip_newlines();
            let right = self.parse_additive()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    /// `Additive = Multiplicative { ("+" | "-") Multiplicative }`
    fn parse_additive(&mut self) -> PResult<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            self.skip_newlines();
            let right = self.parse_multiplicative()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    /// `Multiplicative = Unary { ("*" | "/" | "%") Unary }`
    fn parse_multiplicative(&mut self) -> PResult<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Mod,
                _ => break,
            };
            self.advance();
            self.skip_newlines();
            let right = self.parse_unary()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    /// `Unary = ("-" | "!") Unary | Postfix`
    ///
    /// A `-` written directly against a number literal folds into a negative
    /// literal, so `-5.abs` is `(-5).abs`.
    fn parse_unary(&mut self) -> PResult<Expr> {
        let op = match self.peek_kind() {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Bang => UnaryOp::Not,
            _ => return self.parse_postfix(),
        };
        let start = self.advance().span;

        if op == UnaryOp::Neg && self.current_span().start == next_column(start.end) {
            let negated = match *self.peek_kind() {
                TokenKind::Int(n) => Some(Literal::Int(-n)),
                TokenKind::Float(n) => Some(Literal::Float(-n)),
                _ => None,
            };
            if let Some(lit) = negated {
                let span = start.merge(self.advance().span);
                let literal = Expr::new(ExprKind::Literal(lit), span);
                return self.parse_postfix_ops(literal);
            }
        }

        let operand = ensure_sufficient_stack(|| self.parse_unary())?;
        let span = start.merge(operand.span);
        Ok(Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Postfix: method calls and indexing
    // ══════════════════════════════════════════════════════════════════════════

    /// `Postfix = Primary { "." Name [ "(" Args ")" ] [Block] | "[" Args "]" }`
    pub(crate) fn parse_postfix(&mut self) -> PResult<Expr> {
        let primary = self.parse_primary()?;
        self.parse_postfix_ops(primary)
    }

    fn parse_postfix_ops(&mut self, mut expr: Expr) -> PResult<Expr> {
        loop {
            match self.peek_kind() {
                TokenKind::Dot => {
                    self.advance();
                    self.skip_newlines();
                    let method = self.expect_method_name()?;
                    let (args, block) = self.parse_call_suffix()?;
                    let span = expr.span.merge(self.previous_span());
                    expr = call(Some(expr), method, args, block, span);
                }
                TokenKind::LBracket => {
                    let open = self.advance().span;
                    let (args, block) = self.parse_args(&TokenKind::RBracket)?;
                    self.expect(&TokenKind::RBracket)?;
                    if block.is_some() {
                        return Err(self.error_at("index argument", "'&'", open));
                    }
                    let span = expr.span.merge(self.previous_span());
                    let method = Ident::new("[]", open);
                    expr = call(Some(expr), method, args, None, span);
                }
                // A leading `.` on the next line continues the chain.
                TokenKind::Newline if self.chain_continues() => self.skip_newlines(),
                _ => break,
            }
        }
        Ok(expr)
    }

    fn chain_continues(&self) -> bool {
        let mut n = 0;
        while self.look_ahead(n) == &TokenKind::Newline {
            n += 1;
        }
        self.look_ahead(n) == &TokenKind::Dot
    }

    /// Optional `(args)` followed by an optional block literal.
    pub(crate) fn parse_call_suffix(&mut self) -> PResult<(Vec<Expr>, Option<BlockArg>)> {
        let (args, mut block) = if self.eat(&TokenKind::LParen) {
            let parsed = self.parse_args(&TokenKind::RParen)?;
            self.expect(&TokenKind::RParen)?;
            parsed
        } else {
            (Vec::new(), None)
        };

        if self.at_block_start() {
            let span = self.current_span();
            let literal = self.parse_block_literal()?;
            if block.is_some() {
                return Err(self.error_at("a single block", "second block", span));
            }
            block = Some(BlockArg::Literal(literal));
        }
        Ok((args, block))
    }

    /// `Args = [ Arg { "," Arg } [","] ]` with `Arg = Expr | "&" Expr` (last).
    /// Stops before `closing` without consuming it.
    pub(crate) fn parse_args(
        &mut self,
        closing: &TokenKind,
    ) -> PResult<(Vec<Expr>, Option<BlockArg>)> {
        let mut args = Vec::new();
        let mut block = None;
        self.skip_newlines();
        while !self.check_exact(closing) {
            if block.is_some() {
                return Err(self.unexpected(format!("{closing} after block argument")));
            }
            if self.eat(&TokenKind::Amp) {
                block = Some(BlockArg::Pass(Box::new(self.parse_expression()?)));
            } else {
                args.push(self.parse_expression()?);
            }
            self.skip_newlines();
            if !self.eat(&TokenKind::Comma) {
                break;
            }
            self.skip_newlines();
        }
        Ok((args, block))
    }

    /// A method name after `.`: identifiers, constants, keywords and
    /// operator names.
    pub(crate) fn expect_method_name(&mut self) -> PResult<Ident> {
        let token = self.peek().clone();
        let name = match &token.kind {
            TokenKind::Identifier(name) | TokenKind::Constant(name) => name.clone(),
            TokenKind::LBracket if self.look_ahead(1) == &TokenKind::RBracket => {
                self.advance();
                let close = self.advance();
                return Ok(Ident::new("[]", token.span.merge(close.span)));
            }
            kind => match kind.keyword_text().or_else(|| operator_method_name(kind)) {
                Some(text) => text.to_string(),
                None => return Err(self.unexpected("method name")),
            },
        };
        self.advance();
        Ok(Ident::new(name, token.span))
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Primary Expressions
    // ══════════════════════════════════════════════════════════════════════════

    fn parse_primary(&mut self) -> PResult<Expr> {
        let token = self.peek().clone();
        let span = token.span;
        let literal = |lit: Literal| Expr::new(ExprKind::Literal(lit), span);

        match token.kind {
            // ── Literals ──
            TokenKind::Int(n) => {
                self.advance();
                Ok(literal(Literal::Int(n)))
            }
            TokenKind::Float(n) => {
                self.advance();
                Ok(literal(Literal::Float(n)))
            }
            TokenKind::Str(s) => {
                self.advance();
                Ok(literal(Literal::Str(s)))
            }
            TokenKind::Symbol(s) => {
                self.advance();
                Ok(literal(Literal::Symbol(s)))
            }
            TokenKind::Nil => {
                self.advance();
                Ok(literal(Literal::Nil))
            }
            TokenKind::True => {
                self.advance();
                Ok(literal(Literal::Bool(true)))
            }
            TokenKind::False => {
                self.advance();
                Ok(literal(Literal::Bool(false)))
            }
            TokenKind::LBracket => {
                self.advance();
                let (items, block) = self.parse_args(&TokenKind::RBracket)?;
                self.expect(&TokenKind::RBracket)?;
                if block.is_some() {
                    return Err(self.error_at("list element", "'&'", span));
                }
                Ok(Expr::new(
                    ExprKind::List(items),
                    span.merge(self.previous_span()),
                ))
            }

            // ── Names ──
            TokenKind::Identifier(name) => {
                self.advance();
                if self.check_exact(&TokenKind::LParen) || self.at_block_start() {
                    let (args, block) = self.parse_call_suffix()?;
                    let full = span.merge(self.previous_span());
                    Ok(call(None, Ident::new(name, span), args, block, full))
                } else {
                    Ok(Expr::new(ExprKind::Identifier(name), span))
                }
            }
            TokenKind::Constant(name) => {
                self.advance();
                Ok(Expr::new(ExprKind::Constant(name), span))
            }
            TokenKind::Attribute(name) => {
                self.advance();
                Ok(Expr::new(ExprKind::Attribute(name), span))
            }
            TokenKind::SelfKw => {
                self.advance();
                Ok(Expr::new(ExprKind::SelfRef, span))
            }

            // ── Grouping & blocks ──
            TokenKind::LParen => {
                self.advance();
                self.skip_newlines();
                let inner = self.parse_expression()?;
                self.skip_newlines();
                let close = self.expect(&TokenKind::RParen)?;
                Ok(Expr::new(inner.kind, span.merge(close.span)))
            }
            TokenKind::LBrace | TokenKind::Do => {
                let block = self.parse_block_literal()?;
                let full = block.span;
                Ok(Expr::new(ExprKind::Block(block), full))
            }

            // ── Control flow ──
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Case => self.parse_case(),
            TokenKind::Begin => self.parse_begin(),
            TokenKind::Raise => self.parse_jump(ExprKind::Raise),
            TokenKind::Return => self.parse_jump(ExprKind::Return),
            TokenKind::Break => self.parse_jump(ExprKind::Break),
            TokenKind::Next => self.parse_jump(ExprKind::Next),
            TokenKind::Yield => {
                self.advance();
                let args = if self.eat(&TokenKind::LParen) {
                    let (args, block) = self.parse_args(&TokenKind::RParen)?;
                    self.expect(&TokenKind::RParen)?;
                    if block.is_some() {
                        return Err(self.error_at("yield argument", "'&'", span));
                    }
                    args
                } else {
                    Vec::new()
                };
                Ok(Expr::new(
                    ExprKind::Yield(args),
                    span.merge(self.previous_span()),
                ))
            }
            TokenKind::Super => {
                self.advance();
                // Bare `super` forwards the caller's arguments.
                let explicit = self.check_exact(&TokenKind::LParen);
                let (args, block) = self.parse_call_suffix()?;
                let super_call = SuperCall {
                    args: explicit.then_some(args),
                    block,
                };
                Ok(Expr::new(
                    ExprKind::Super(Box::new(super_call)),
                    span.merge(self.previous_span()),
                ))
            }

            // ── Definitions ──
            TokenKind::Def => self.parse_def(),
            TokenKind::Type => self.parse_type_def(TypeDefKind::Type),
            TokenKind::Module => self.parse_type_def(TypeDefKind::Module),
            TokenKind::Include => {
                self.advance();
                let module = self.parse_expression()?;
                let full = span.merge(module.span);
                Ok(Expr::new(ExprKind::Include(Box::new(module)), full))
            }

            _ => Err(self.unexpected("expression")),
        }
    }

    /// `raise`, `return`, `break`, `next` with an optional value.
    fn parse_jump(&mut self, make: fn(Option<Box<Expr>>) -> ExprKind) -> PResult<Expr> {
        let start = self.advance().span;
        if self.at_statement_end() {
            return Ok(Expr::new(make(None), start));
        }
        let value = self.parse_expression()?;
        let span = start.merge(value.span);
        Ok(Expr::new(make(Some(Box::new(value))), span))
    }

    /// True where an expression cannot start: separators, closers and
    /// body-ending keywords.
    fn at_statement_end(&self) -> bool {
        self.at_separator()
            || self.at_body_end()
            || matches!(
                self.peek_kind(),
                TokenKind::RParen | TokenKind::RBracket | TokenKind::Comma
            )
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Block Literals
    // ══════════════════════════════════════════════════════════════════════════

    pub(crate) fn at_block_start(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::LBrace | TokenKind::Do)
    }

    /// `"{" ["|" Params "|"] Body "}"` or `"do" ["|" Params "|"] Body "end"`
    pub(crate) fn parse_block_literal(&mut self) -> PResult<Rc<BlockLit>> {
        let open = self.advance();
        let params = if self.eat(&TokenKind::OrOr) {
            ParamList::default()
        } else if self.eat(&TokenKind::Pipe) {
            let params = self.parse_param_list(&TokenKind::Pipe)?;
            self.expect(&TokenKind::Pipe)?;
            params
        } else {
            ParamList::default()
        };

        let body = self.parse_statements()?;
        let close = if open.kind == TokenKind::LBrace {
            self.expect(&TokenKind::RBrace)?
        } else {
            self.expect_end("do")?
        };

        Ok(Rc::new(BlockLit {
            params,
            body,
            span: open.span.merge(close.span),
        }))
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

fn binary(op: BinOp, left: Expr, right: Expr) -> Expr {
    let span = left.span.merge(right.span);
    Expr::new(
        ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        span,
    )
}

fn logical(op: LogicalOp, left: Expr, right: Expr) -> Expr {
    let span = left.span.merge(right.span);
    Expr::new(
        ExprKind::Logical {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        span,
    )
}

fn call(
    receiver: Option<Expr>,
    method: Ident,
    args: Vec<Expr>,
    block: Option<BlockArg>,
    span: quill_types::Span,
) -> Expr {
    Expr::new(
        ExprKind::Call(Box::new(Call {
            receiver,
            method,
            args,
            block,
        })),
        span,
    )
}

/// The position directly after `pos` on the same line.
fn next_column(pos: Position) -> Position {
    Position::new(pos.line, pos.column + 1)
}

/// Operators that may be used as method names.
pub(crate) fn operator_method_name(kind: &TokenKind) -> Option<&'static str> {
    match kind {
        TokenKind::Plus
        | TokenKind::Minus
        | TokenKind::Star
        | TokenKind::Slash
        | TokenKind::Percent
        | TokenKind::Less
        | TokenKind::LessEqual
        | TokenKind::Greater
        | TokenKind::GreaterEqual
        | TokenKind::EqualEqual
        | TokenKind::MinusAt => kind.operator_text(),
        _ => None,
    }
}

/// `recv.name = v` is only valid for plain lower-case names.
fn is_setter_base(name: &str) -> bool {
    name.starts_with(|c: char| c.is_ascii_lowercase() || c == '_')
        && !name.ends_with(['?', '!'])
}
