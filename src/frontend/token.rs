//! Token types for the set notation.
//!
//! Besides the lexical tokens, a token can carry an already parsed value:
//! the parser re-tags a parenthesised expression as an affine or relation
//! placeholder and pushes it back for the enclosing production to inspect.

use crate::polyhedral::map::Map;
use crate::polyhedral::pw_aff::{CmpOp, PwAff};
use crate::utils::location::Span;
use crate::utils::matrix::Int;
use std::fmt;

/// A token in the source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The kind of token
    pub kind: TokenKind,
    /// The source span
    pub span: Span,
    /// Whether the token is the first on its line
    pub on_new_line: bool,
    /// Payload
    pub value: TokenValue,
}

/// Payload of a token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenValue {
    None,
    /// Value of an integer literal
    Int(Int),
    /// Text of an identifier, keyword or string
    Text(String),
    /// Parsed affine expression
    Aff(PwAff),
    /// Parsed condition
    Map(Map),
}

impl Token {
    /// Create a new token.
    pub fn new(kind: TokenKind, span: Span, value: TokenValue) -> Self {
        Self { kind, span, on_new_line: false, value }
    }

    /// A placeholder carrying a parsed affine expression.
    pub fn aff(pa: PwAff, span: Span) -> Self {
        Self::new(TokenKind::Aff, span, TokenValue::Aff(pa))
    }

    /// A placeholder carrying a parsed condition.
    pub fn map(map: Map, span: Span) -> Self {
        Self::new(TokenKind::Map, span, TokenValue::Map(map))
    }

    /// Check if this is an EOF token.
    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }

    /// Check if this token is a keyword.
    pub fn is_keyword(&self) -> bool {
        self.kind.is_keyword()
    }

    /// Identifier or keyword text.
    pub fn text(&self) -> Option<&str> {
        match &self.value {
            TokenValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Literal value.
    pub fn int(&self) -> Option<&Int> {
        match &self.value {
            TokenValue::Int(v) => Some(v),
            _ => None,
        }
    }

    /// The comparison this token denotes, if any.
    pub fn comparator(&self) -> Option<CmpOp> {
        match self.kind {
            TokenKind::Lt => Some(CmpOp::Lt),
            TokenKind::Le => Some(CmpOp::Le),
            TokenKind::Gt => Some(CmpOp::Gt),
            TokenKind::Ge => Some(CmpOp::Ge),
            TokenKind::Eq => Some(CmpOp::Eq),
            TokenKind::Ne => Some(CmpOp::Ne),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            TokenValue::Int(v) => write!(f, "{}", v),
            TokenValue::Text(s) if self.kind == TokenKind::String => write!(f, "\"{}\"", s),
            TokenValue::Text(s) => write!(f, "{}", s),
            TokenValue::Aff(_) => write!(f, "affine expression"),
            TokenValue::Map(_) => write!(f, "condition"),
            TokenValue::None => write!(f, "{}", self.kind),
        }
    }
}

/// The kind of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Literals
    /// Integer literal, possibly negative
    Value,
    /// String literal
    String,

    /// Identifier
    Ident,

    // Keywords
    /// `exists` keyword
    Exists,
    /// `and` keyword or `&&`
    And,
    /// `or` keyword or `||`
    Or,
    /// `not` keyword or `!`
    Not,
    /// `true` keyword
    True,
    /// `false` keyword
    False,
    /// `min` keyword
    Min,
    /// `max` keyword
    Max,
    /// `floord` keyword
    Floord,
    /// `ceild` keyword
    Ceild,
    /// `mod` keyword
    Mod,

    // Arithmetic operators
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
    /// `^`
    Caret,

    // Comparison operators
    /// `=` or `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,

    // Delimiters
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// `[`
    LeftBracket,
    /// `]`
    RightBracket,
    /// `{`
    LeftBrace,
    /// `}`
    RightBrace,
    /// `,`
    Comma,
    /// `;`
    Semicolon,
    /// `:`
    Colon,
    /// `|`
    Pipe,
    /// `?`
    Question,
    /// `->`
    Arrow,

    // Placeholders
    /// Parsed affine expression
    Aff,
    /// Parsed condition
    Map,

    /// End of input
    Eof,
}

impl TokenKind {
    /// Check if this is a keyword.
    pub fn is_keyword(&self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            Exists | And | Or | Not | True | False | Min | Max | Floord | Ceild | Mod
        )
    }

    /// Get the keyword for a string, if it is a keyword.
    pub fn keyword(s: &str) -> Option<TokenKind> {
        match s {
            "exists" => Some(TokenKind::Exists),
            "and" => Some(TokenKind::And),
            "or" => Some(TokenKind::Or),
            "not" => Some(TokenKind::Not),
            "true" => Some(TokenKind::True),
            "false" => Some(TokenKind::False),
            "min" => Some(TokenKind::Min),
            "max" => Some(TokenKind::Max),
            "floord" => Some(TokenKind::Floord),
            "ceild" => Some(TokenKind::Ceild),
            "mod" => Some(TokenKind::Mod),
            _ => None,
        }
    }

    /// Get a human-readable name for this token kind.
    pub fn name(&self) -> &'static str {
        use TokenKind::*;
        match self {
            Value => "value",
            String => "string",
            Ident => "identifier",
            Exists => "exists",
            And => "and",
            Or => "or",
            Not => "not",
            True => "true",
            False => "false",
            Min => "min",
            Max => "max",
            Floord => "floord",
            Ceild => "ceild",
            Mod => "mod",
            Plus => "+",
            Minus => "-",
            Star => "*",
            Slash => "/",
            Percent => "%",
            Caret => "^",
            Eq => "=",
            Ne => "!=",
            Lt => "<",
            Le => "<=",
            Gt => ">",
            Ge => ">=",
            LeftParen => "(",
            RightParen => ")",
            LeftBracket => "[",
            RightBracket => "]",
            LeftBrace => "{",
            RightBrace => "}",
            Comma => ",",
            Semicolon => ";",
            Colon => ":",
            Pipe => "|",
            Question => "?",
            Arrow => "->",
            Aff => "affine expression",
            Map => "condition",
            Eof => "end of input",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
