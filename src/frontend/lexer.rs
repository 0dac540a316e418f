//! Lexer for the set notation.
//!
//! The lexer converts source text into tokens on demand. It holds nothing
//! but a position in the source, so cloning it is a cheap way to look
//! several tokens ahead and come back.

use crate::frontend::token::{Token, TokenKind, TokenValue};
use crate::utils::errors::{LexerError, LexerErrorKind};
use crate::utils::location::{SourceLocation, Span};
use crate::utils::matrix::Int;
use unicode_xid::UnicodeXID;

/// A lexer for tokenizing source text.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    /// The source text
    source: &'a str,
    /// Current byte offset
    offset: usize,
    /// Current line number (1-indexed)
    line: usize,
    /// Current column number (1-indexed)
    column: usize,
    /// Start of current token
    token_start: SourceLocation,
    /// No token produced on the current line yet
    line_start: bool,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            offset: 0,
            line: 1,
            column: 1,
            token_start: SourceLocation::start(),
            line_start: true,
        }
    }

    fn current_location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column, self.offset)
    }

    fn make_span(&self) -> Span {
        Span::from_locations(self.token_start, self.current_location())
    }

    fn peek(&self) -> Option<char> {
        self.source[self.offset..].chars().next()
    }

    fn peek_next(&self) -> Option<char> {
        let mut chars = self.source[self.offset..].chars();
        chars.next();
        chars.next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.offset += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
            self.line_start = true;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn skip_line(&mut self) {
        while self.peek().is_some() && self.peek() != Some('\n') {
            self.advance();
        }
    }

    /// Skip whitespace and comments.
    fn skip_whitespace(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('#') => self.skip_line(),
                Some('/') if self.peek_next() == Some('/') => self.skip_line(),
                Some('/') if self.peek_next() == Some('*') => {
                    self.advance();
                    self.advance();
                    let mut depth = 1;
                    while depth > 0 {
                        match self.advance() {
                            Some('*') if self.peek() == Some('/') => {
                                self.advance();
                                depth -= 1;
                            }
                            Some('/') if self.peek() == Some('*') => {
                                self.advance();
                                depth += 1;
                            }
                            None => break,
                            _ => {}
                        }
                    }
                }
                _ => break,
            }
        }
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(kind, self.make_span(), TokenValue::None)
    }

    fn make_error(&self, message: &str, kind: LexerErrorKind) -> LexerError {
        LexerError {
            message: message.to_string(),
            span: self.make_span(),
            kind,
        }
    }

    /// Scan an integer literal whose first character (a digit or the
    /// minus sign) is already consumed.
    fn scan_number(&mut self, negative: bool) -> Result<Token, LexerError> {
        while self.peek().map(|c| c.is_ascii_digit()).unwrap_or(false) {
            self.advance();
        }
        let digits_start = self.token_start.offset + usize::from(negative);
        let digits = &self.source[digits_start..self.offset];
        let mut value: Int = digits
            .parse()
            .map_err(|_| self.make_error("Invalid number literal", LexerErrorKind::InvalidNumber))?;
        if negative {
            value = -value;
        }
        Ok(Token::new(TokenKind::Value, self.make_span(), TokenValue::Int(value)))
    }

    /// Scan an identifier or keyword. Identifiers may end in primes (`i'`).
    fn scan_identifier(&mut self) -> Token {
        while self.peek().map(|c| c.is_xid_continue() || c == '_').unwrap_or(false) {
            self.advance();
        }
        while self.peek() == Some('\'') {
            self.advance();
        }

        let span = self.make_span();
        let lexeme = &self.source[span.start_offset..span.end_offset];
        let kind = TokenKind::keyword(lexeme).unwrap_or(TokenKind::Ident);
        Token::new(kind, span, TokenValue::Text(lexeme.to_string()))
    }

    /// Scan a string literal.
    fn scan_string(&mut self) -> Result<Token, LexerError> {
        // Opening quote already consumed
        let mut value = String::new();
        loop {
            match self.advance() {
                Some('"') => break,
                Some('\n') | None => {
                    return Err(self.make_error(
                        "Unterminated string literal",
                        LexerErrorKind::UnterminatedString,
                    ));
                }
                Some(c) => value.push(c),
            }
        }
        Ok(Token::new(TokenKind::String, self.make_span(), TokenValue::Text(value)))
    }

    /// Scan the next token.
    pub fn next_token(&mut self) -> Result<Token, LexerError> {
        self.skip_whitespace();
        self.token_start = self.current_location();
        let on_new_line = self.line_start;
        self.line_start = false;

        let mut token = self.scan()?;
        token.on_new_line = on_new_line;
        Ok(token)
    }

    fn scan(&mut self) -> Result<Token, LexerError> {
        let c = match self.advance() {
            Some(c) => c,
            None => return Ok(self.make_token(TokenKind::Eof)),
        };

        match c {
            '(' => Ok(self.make_token(TokenKind::LeftParen)),
            ')' => Ok(self.make_token(TokenKind::RightParen)),
            '[' => Ok(self.make_token(TokenKind::LeftBracket)),
            ']' => Ok(self.make_token(TokenKind::RightBracket)),
            '{' => Ok(self.make_token(TokenKind::LeftBrace)),
            '}' => Ok(self.make_token(TokenKind::RightBrace)),
            ',' => Ok(self.make_token(TokenKind::Comma)),
            ';' => Ok(self.make_token(TokenKind::Semicolon)),
            ':' => Ok(self.make_token(TokenKind::Colon)),
            '?' => Ok(self.make_token(TokenKind::Question)),
            '+' => Ok(self.make_token(TokenKind::Plus)),
            '*' => Ok(self.make_token(TokenKind::Star)),
            '/' => Ok(self.make_token(TokenKind::Slash)),
            '%' => Ok(self.make_token(TokenKind::Percent)),
            '^' => Ok(self.make_token(TokenKind::Caret)),

            '-' => {
                if self.match_char('>') {
                    Ok(self.make_token(TokenKind::Arrow))
                } else if self.peek().map(|c| c.is_ascii_digit()).unwrap_or(false) {
                    self.scan_number(true)
                } else {
                    Ok(self.make_token(TokenKind::Minus))
                }
            }
            '=' => {
                self.match_char('=');
                Ok(self.make_token(TokenKind::Eq))
            }
            '!' => {
                if self.match_char('=') {
                    Ok(self.make_token(TokenKind::Ne))
                } else {
                    Ok(self.make_token(TokenKind::Not))
                }
            }
            '<' => {
                if self.match_char('=') {
                    Ok(self.make_token(TokenKind::Le))
                } else {
                    Ok(self.make_token(TokenKind::Lt))
                }
            }
            '>' => {
                if self.match_char('=') {
                    Ok(self.make_token(TokenKind::Ge))
                } else {
                    Ok(self.make_token(TokenKind::Gt))
                }
            }
            '&' => {
                if self.match_char('&') {
                    Ok(self.make_token(TokenKind::And))
                } else {
                    Err(self.make_error(
                        "Expected '&&', found single '&'",
                        LexerErrorKind::UnexpectedChar,
                    ))
                }
            }
            '|' => {
                if self.match_char('|') {
                    Ok(self.make_token(TokenKind::Or))
                } else {
                    Ok(self.make_token(TokenKind::Pipe))
                }
            }

            '"' => self.scan_string(),

            c if c.is_ascii_digit() => self.scan_number(false),

            c if c.is_xid_start() || c == '_' => Ok(self.scan_identifier()),

            _ => Err(self.make_error(
                &format!("Unexpected character: '{}'", c),
                LexerErrorKind::UnexpectedChar,
            )),
        }
    }

    /// Collect all tokens into a vector.
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexerError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let is_eof = token.is_eof();
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }
}
