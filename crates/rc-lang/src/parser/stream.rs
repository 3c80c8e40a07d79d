//! Token stream wrapper with lookahead and span tracking.

use super::{Lexeme, ParseError};
use crate::foundation::Span;
use crate::lexer::Token;

/// Cursor over a lexed token slice.
///
/// Provides lookahead, consumption, and span reconstruction for the
/// recursive descent parser. Spans use the byte ranges recorded during
/// lexing, so diagnostics point at exact source positions.
pub struct TokenStream<'src> {
    tokens: &'src [Lexeme],
    pos: usize,
    file_id: u16,
}

impl<'src> TokenStream<'src> {
    pub fn new(tokens: &'src [Lexeme], file_id: u16) -> Self {
        Self {
            tokens,
            pos: 0,
            file_id,
        }
    }

    /// Current token without consuming it.
    pub fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|l| &l.token)
    }

    /// Token `n` past the current one.
    pub fn peek_nth(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.pos + n).map(|l| &l.token)
    }

    /// Consume and return the current token.
    pub fn advance(&mut self) -> Option<&Token> {
        let lexeme = self.tokens.get(self.pos);
        if lexeme.is_some() {
            self.pos += 1;
        }
        lexeme.map(|l| &l.token)
    }

    /// Whether the current token has the same discriminant as `expected`.
    pub fn check(&self, expected: &Token) -> bool {
        matches!(self.peek(), Some(t) if std::mem::discriminant(t) == std::mem::discriminant(expected))
    }

    /// Consume the current token if it matches `expected`.
    pub fn eat(&mut self, expected: &Token) -> bool {
        if self.check(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume a required token or produce a parse error.
    pub fn expect(&mut self, expected: Token) -> Result<(), ParseError> {
        if self.check(&expected) {
            self.advance();
            Ok(())
        } else {
            Err(ParseError::expected_token(
                &expected,
                self.peek(),
                self.current_span(),
            ))
        }
    }

    /// Consume an identifier token and return its text.
    pub fn expect_identifier(&mut self, context: &str) -> Result<(String, Span), ParseError> {
        let span = self.current_span();
        match self.advance() {
            Some(Token::Ident(name)) => Ok((name.clone(), span)),
            other => {
                let other = other.cloned();
                Err(ParseError::unexpected_token(
                    other.as_ref(),
                    context,
                    span,
                ))
            }
        }
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    pub fn mark(&self) -> usize {
        self.pos
    }

    /// Span covering the tokens from `start` (a [`Self::mark`]) up to the
    /// most recently consumed token.
    pub fn span_from(&self, start: usize) -> Span {
        let Some(first) = self.tokens.get(start) else {
            return self.current_span();
        };
        let last = if self.pos > start {
            &self.tokens[self.pos - 1]
        } else {
            first
        };
        Span::new(
            self.file_id,
            first.range.start as u32,
            last.range.end as u32,
            first.line,
        )
    }

    /// Span of the current token, or a point span at EOF.
    pub fn current_span(&self) -> Span {
        match self.tokens.get(self.pos) {
            Some(l) => Span::new(
                self.file_id,
                l.range.start as u32,
                l.range.end as u32,
                l.line,
            ),
            None => match self.tokens.last() {
                Some(l) => Span::new(self.file_id, l.range.end as u32, l.range.end as u32, l.line),
                None => Span::zero(self.file_id),
            },
        }
    }
}
