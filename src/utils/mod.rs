//! Utility modules shared by the parser and the constraint model.
//!
//! - Error types
//! - Arbitrary-precision integer sequences and matrices
//! - Source location tracking
//! - Printing in the parser's own notation

pub mod errors;
pub mod matrix;
pub mod location;
pub mod poly_print;

// Re-exports
pub use errors::*;
pub use location::{SourceLocation, Span};
pub use poly_print::DimNames;
