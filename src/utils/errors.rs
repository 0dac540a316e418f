//! Error types for the reader and the constraint model.
//!
//! Errors are organized by the phase that produces them: lexing, syntax
//! and semantic checks during parsing, plus the two failure modes of the
//! model operations (invalid arguments and documented partial functions).

use thiserror::Error;
use crate::utils::location::Span;
use std::fmt;

/// Top-level error type.
#[derive(Error, Debug)]
pub enum PolyError {
    /// Error during lexing/tokenization
    #[error("Lexer error: {0}")]
    Lexer(#[from] LexerError),

    /// Error during parsing
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Error while resolving names and dimensions
    #[error("Semantic error: {0}")]
    Semantic(#[from] SemanticError),

    /// Arguments that do not fit together (spaces, widths, ranges)
    #[error("Invalid argument: {0}")]
    Invalid(String),

    /// Operation outside the supported fragment
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PolyError {
    /// Create an invalid-argument error.
    pub fn invalid(message: impl Into<String>) -> Self {
        PolyError::Invalid(message.into())
    }

    /// Create an unsupported-operation error.
    pub fn unsupported(message: impl Into<String>) -> Self {
        PolyError::Unsupported(message.into())
    }

    /// The source span of the error, if it came from the reader.
    pub fn span(&self) -> Option<Span> {
        match self {
            PolyError::Lexer(e) => Some(e.span),
            PolyError::Parse(e) => Some(e.span),
            PolyError::Semantic(e) => Some(e.span),
            _ => None,
        }
    }
}

/// Error during lexical analysis.
#[derive(Error, Debug, Clone)]
pub struct LexerError {
    /// The error message
    pub message: String,
    /// Location in source
    pub span: Span,
    /// The kind of lexer error
    pub kind: LexerErrorKind,
}

impl fmt::Display for LexerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.message, self.span)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexerErrorKind {
    /// Unexpected character
    UnexpectedChar,
    /// Unterminated string literal
    UnterminatedString,
    /// Invalid number literal
    InvalidNumber,
}

/// Error during parsing.
#[derive(Error, Debug, Clone)]
pub struct ParseError {
    /// The error message
    pub message: String,
    /// Location in source
    pub span: Span,
    /// The kind of parse error
    pub kind: ParseErrorKind,
    /// Expected construct (if applicable)
    pub expected: Option<String>,
    /// What was found
    pub found: Option<String>,
}

impl ParseError {
    /// Error for a token that does not fit the current production.
    pub fn unexpected(message: impl Into<String>, found: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
            kind: ParseErrorKind::UnexpectedToken,
            expected: None,
            found: Some(found.into()),
        }
    }

    /// Error for a specific token or construct that was required.
    pub fn expected(expected: impl Into<String>, found: impl Into<String>, span: Span) -> Self {
        let expected = expected.into();
        Self {
            message: format!("expecting {}", expected),
            span,
            kind: ParseErrorKind::ExpectedToken,
            expected: Some(expected),
            found: Some(found.into()),
        }
    }

    /// Override the kind.
    pub fn with_kind(mut self, kind: ParseErrorKind) -> Self {
        self.kind = kind;
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.message, self.span)?;
        if let Some(ref found) = self.found {
            write!(f, " (found: {})", found)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Unexpected token
    UnexpectedToken,
    /// Expected a specific token
    ExpectedToken,
    /// Expected an affine factor
    ExpectedFactor,
    /// Expected a comparison operator
    MissingOperator,
    /// Expected a constant value
    ExpectedValue,
    /// Unexpected end of input
    UnexpectedEof,
}

/// Error while resolving names and dimensions during parsing.
#[derive(Error, Debug, Clone)]
pub struct SemanticError {
    /// The error message
    pub message: String,
    /// Location in source
    pub span: Span,
    /// The kind of semantic error
    pub kind: SemanticErrorKind,
}

impl SemanticError {
    /// Create a semantic error.
    pub fn new(kind: SemanticErrorKind, message: impl Into<String>, span: Span) -> Self {
        Self { message: message.into(), span, kind }
    }
}

impl fmt::Display for SemanticError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.message, self.span)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemanticErrorKind {
    /// Identifier used before being declared
    UnknownIdentifier,
    /// A fresh name was required but the name is already bound
    DuplicateIdentifier,
    /// Bodies or pieces that cannot be combined
    IncompatibleObjects,
}

/// Result type using PolyError.
pub type PolyResult<T> = Result<T, PolyError>;
