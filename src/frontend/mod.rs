//! Frontend: lexer, token stream and parser for the set notation.
//!
//! ## Notation overview
//!
//! ```text
//! [N] -> { S[i, j] -> T[i + j] : 0 <= i < N and exists (a : j = 2a) }
//! [N] -> { [i] -> [floord(i, 4) + N] : i >= 0; [i] -> [0] : i < 0 }
//! ```
//!
//! An object is an optional parameter tuple followed by a brace-enclosed
//! list of bodies separated by `;`. Each body is a tuple, a relation
//! between two tuples or a parameter-only condition, optionally
//! restricted by a condition after `:`.

pub mod lexer;
pub mod parser;
pub mod stream;
pub mod token;
pub mod vars;

// Re-exports
pub use lexer::Lexer;
pub use parser::{Object, Parser};
pub use stream::TokenStream;
pub use token::{Token, TokenKind};
pub use vars::VarTable;
