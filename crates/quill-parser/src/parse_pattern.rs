//! Pattern and parameter-list parsing.
//!
//! ```text
//! Pattern  = "_" | Name [":" TypePath] | TypePath | Literal | "-" Number
//!          | "[" [Pattern { "," Pattern }] "]"      (one "*" [Name] allowed)
//! TypePath = Constant { "." Constant }
//! Params   = [Param { "," Param }]     Param = Pattern | "*" [Name] | "&" Name
//! ```

use quill_lexer::TokenKind;
use quill_types::ast::*;

use crate::parser::{PResult, Parser};

impl Parser {
    pub(crate) fn parse_pattern(&mut self) -> PResult<Pattern> {
        let token = self.peek().clone();
        let span = token.span;
        let literal = |lit: Literal| Pattern::Literal(lit, span);

        match token.kind {
            TokenKind::Identifier(name) => {
                self.advance();
                if self.eat(&TokenKind::Colon) {
                    let type_path = Some(self.parse_type_path()?);
                    Ok(Pattern::Bind {
                        name: Ident::new(name, span),
                        type_path,
                    })
                } else if name == "_" {
                    Ok(Pattern::Wildcard(span))
                } else {
                    Ok(Pattern::Bind {
                        name: Ident::new(name, span),
                        type_path: None,
                    })
                }
            }
            TokenKind::Constant(_) => Ok(Pattern::Const(self.parse_type_path()?)),
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
            TokenKind::Minus => {
                self.advance();
                let number = match *self.peek_kind() {
                    TokenKind::Int(n) => Literal::Int(-n),
                    TokenKind::Float(n) => Literal::Float(-n),
                    _ => return Err(self.unexpected("number after '-' in pattern")),
                };
                let end = self.advance().span;
                Ok(Pattern::Literal(number, span.merge(end)))
            }
            TokenKind::LBracket => self.parse_list_pattern(),
            TokenKind::Star => Err(self.error_at(
                "pattern",
                "'*' outside a list pattern",
                span,
            )),
            _ => Err(self.unexpected("pattern")),
        }
    }

    /// `Constant { "." Constant }`
    pub(crate) fn parse_type_path(&mut self) -> PResult<TypePath> {
        let first = self.expect_constant()?;
        let mut span = first.span;
        let mut segments = vec![first];
        while self.check_exact(&TokenKind::Dot)
            && matches!(self.look_ahead(1), TokenKind::Constant(_))
        {
            self.advance();
            let segment = self.expect_constant()?;
            span = span.merge(segment.span);
            segments.push(segment);
        }
        Ok(TypePath { segments, span })
    }

    /// `"[" [Pattern { "," Pattern }] "]"` with at most one splat.
    fn parse_list_pattern(&mut self) -> PResult<Pattern> {
        let start = self.advance().span;
        let mut items = Vec::new();
        let mut seen_splat = false;
        self.skip_newlines();
        while !self.check_exact(&TokenKind::RBracket) {
            if self.check_exact(&TokenKind::Star) {
                if seen_splat {
                    return Err(self.unexpected("at most one splat per list pattern"));
                }
                seen_splat = true;
                items.push(self.parse_splat()?);
            } else {
                items.push(self.parse_pattern()?);
            }
            self.skip_newlines();
            if !self.eat(&TokenKind::Comma) {
                break;
            }
            self.skip_newlines();
        }
        let end = self.expect(&TokenKind::RBracket)?;
        Ok(Pattern::List {
            items,
            span: start.merge(end.span),
        })
    }

    /// `"*" [Name]`; `*_` is the same as a bare `*`.
    fn parse_splat(&mut self) -> PResult<Pattern> {
        let star = self.advance().span;
        let name = match self.peek_kind() {
            TokenKind::Identifier(_) => Some(self.expect_identifier()?),
            _ => None,
        };
        let span = name.as_ref().map_or(star, |n| star.merge(n.span));
        Ok(Pattern::Splat {
            name: name.filter(|n| n.name != "_"),
            span,
        })
    }

    /// Parameters up to (not including) `closing`: patterns, at most one
    /// splat, and an optional trailing `&block`.
    pub(crate) fn parse_param_list(&mut self, closing: &TokenKind) -> PResult<ParamList> {
        let mut params = ParamList::default();
        self.skip_newlines();
        while !self.check_exact(closing) {
            if params.block.is_some() {
                return Err(self.unexpected(format!("{closing} after block parameter")));
            }
            if self.eat(&TokenKind::Amp) {
                params.block = Some(self.expect_identifier()?);
            } else if self.check_exact(&TokenKind::Star) {
                if params.is_variadic() {
                    return Err(self.unexpected("at most one splat parameter"));
                }
                params.items.push(self.parse_splat()?);
            } else {
                params.items.push(self.parse_pattern()?);
            }
            self.skip_newlines();
            if !self.eat(&TokenKind::Comma) {
                break;
            }
            self.skip_newlines();
        }
        Ok(params)
    }
}
