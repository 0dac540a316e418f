//! Integer sets and relations with existential divisions.
//!
//! This module provides the constraint model the parser builds:
//! - Tuple spaces and local spaces (spaces plus integer divisions)
//! - Quasi-affine and piecewise quasi-affine expressions
//! - Basic relations, finite unions of them, and unions over several spaces

pub mod space;
pub mod local_space;
pub mod aff;
pub mod pw_aff;
pub mod constraint;
pub mod basic_map;
pub mod map;
pub mod union_map;

pub use space::{DimType, Space, Tuple};
pub use local_space::{DivMerge, LocalSpace};
pub use aff::Aff;
pub use pw_aff::{CmpOp, PwAff};
pub use constraint::{Constraint, ConstraintKind};
pub use basic_map::{BasicMap, BasicSet};
pub use map::{Map, Set};
pub use union_map::{UnionMap, UnionSet};
