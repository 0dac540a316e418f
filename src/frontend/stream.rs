//! Token stream with pushback and checkpoints.
//!
//! The parser never looks further ahead than the current token plus the
//! tokens it pushed back. Multi-token lookahead is only available through
//! [`TokenStream::checkpoint`], which snapshots the whole stream.

use log::trace;
use num_traits::{Signed, ToPrimitive};

use crate::frontend::lexer::Lexer;
use crate::frontend::token::{Token, TokenKind, TokenValue};
use crate::utils::errors::{ParseError, ParseErrorKind, PolyResult};
use crate::utils::matrix::pow;

/// Maximum number of pushed-back tokens.
pub const MAX_PUSHBACK: usize = 2;

/// A snapshot of a [`TokenStream`].
#[derive(Debug, Clone)]
pub struct Checkpoint<'a> {
    lexer: Lexer<'a>,
    pushed: Vec<Token>,
}

/// Token source for the parser.
#[derive(Debug, Clone)]
pub struct TokenStream<'a> {
    lexer: Lexer<'a>,
    pushed: Vec<Token>,
}

impl<'a> TokenStream<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { lexer: Lexer::new(source), pushed: Vec::with_capacity(MAX_PUSHBACK) }
    }

    /// Next token; a literal followed by `^` and a literal is replaced by
    /// the power.
    pub fn next(&mut self) -> PolyResult<Token> {
        if let Some(tok) = self.pushed.pop() {
            return Ok(tok);
        }
        let mut tok = self.lexer.next_token()?;
        if tok.kind != TokenKind::Value {
            return Ok(tok);
        }
        let mut look = self.lexer.clone();
        if !matches!(look.next_token(), Ok(ref t) if t.kind == TokenKind::Caret) {
            return Ok(tok);
        }
        self.lexer = look;
        let exp = self.lexer.next_token()?;
        let e = match exp.int() {
            Some(e) if !e.is_negative() => e.to_u32(),
            _ => None,
        };
        let e = e.ok_or_else(|| {
            ParseError::expected("non-negative exponent", exp.to_string(), exp.span)
                .with_kind(ParseErrorKind::ExpectedValue)
        })?;
        if let TokenValue::Int(base) = &tok.value {
            tok.value = TokenValue::Int(pow(base, e));
        }
        tok.span = tok.span.merge(&exp.span);
        Ok(tok)
    }

    /// Push a token back onto the stream.
    pub fn push(&mut self, tok: Token) {
        debug_assert!(self.pushed.len() < MAX_PUSHBACK, "token pushback overflow");
        trace!("push back {}", tok);
        self.pushed.push(tok);
    }

    /// Returns true if the next token has the given kind, without
    /// consuming it.
    pub fn next_is(&mut self, kind: TokenKind) -> PolyResult<bool> {
        let tok = self.next()?;
        let is = tok.kind == kind;
        self.push(tok);
        Ok(is)
    }

    /// Consume the next token if it has the given kind.
    pub fn eat_if(&mut self, kind: TokenKind) -> PolyResult<bool> {
        let tok = self.next()?;
        if tok.kind == kind {
            Ok(true)
        } else {
            self.push(tok);
            Ok(false)
        }
    }

    /// Consume a token of the given kind or fail.
    pub fn expect(&mut self, kind: TokenKind) -> PolyResult<Token> {
        let tok = self.next()?;
        if tok.kind == kind {
            Ok(tok)
        } else {
            let err = ParseError::expected(format!("'{}'", kind), tok.to_string(), tok.span);
            let err = if tok.is_eof() { err.with_kind(ParseErrorKind::UnexpectedEof) } else { err };
            Err(err.into())
        }
    }

    /// Snapshot the stream, pushed-back tokens included.
    pub fn checkpoint(&self) -> Checkpoint<'a> {
        trace!("checkpoint with {} pushed tokens", self.pushed.len());
        Checkpoint { lexer: self.lexer.clone(), pushed: self.pushed.clone() }
    }

    /// Return to a snapshot.
    pub fn restore(&mut self, cp: Checkpoint<'a>) {
        trace!("restore checkpoint");
        self.lexer = cp.lexer;
        self.pushed = cp.pushed;
    }
}
