//! # polyparse - integer set and relation notation
//!
//! A reader for the textual notation of integer sets, binary relations and
//! piecewise quasi-affine functions, together with the constraint model it
//! builds:
//! - Tuple spaces and local spaces carrying integer divisions
//! - Quasi-affine and piecewise quasi-affine expressions
//! - Basic relations, finite unions of them, and unions over several spaces
//!
//! ## Architecture
//!
//! ```text
//! Text → Lexer → TokenStream → Parser → Map / UnionMap / PwAff
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use polyparse::prelude::*;
//!
//! let map = polyparse::read_map("[N] -> { [i] -> [j] : 0 <= i < N and j = [i/2] }")?;
//! assert!(map.contains(&row(&[10, 5, 2]))?);
//! println!("{}", map);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod frontend;
pub mod polyhedral;
pub mod utils;

use serde::{Deserialize, Serialize};

use crate::frontend::{Object, Parser};
use crate::polyhedral::{Map, PwAff, Set, UnionMap};
use crate::utils::errors::{PolyError, PolyResult};

// Re-export commonly used types
pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    pub use crate::frontend::{Object, Parser};
    pub use crate::polyhedral::{
        Aff, BasicMap, BasicSet, CmpOp, Constraint, DimType, LocalSpace, Map, PwAff, Set, Space, Tuple,
        UnionMap, UnionSet,
    };
    pub use crate::utils::errors::*;
    pub use crate::utils::matrix::{int, row, Int};
    pub use crate::{
        read_map, read_map_with, read_pw_aff, read_pw_aff_with, read_set, read_set_with, read_union_map,
        read_union_map_with, Config,
    };
}

/// Reader configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bound on the values tried for unknown divisions in membership tests
    pub search_radius: u32,
    /// Bring the divisions of every parsed basic relation into canonical order
    pub sort_divs: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self { search_radius: 32, sort_divs: true }
    }
}

impl Config {
    /// Set the membership search radius.
    pub fn with_search_radius(mut self, radius: u32) -> Self {
        self.search_radius = radius;
        self
    }

    /// Enable or disable division sorting.
    pub fn with_sort_divs(mut self, sort: bool) -> Self {
        self.sort_divs = sort;
        self
    }
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Read a relation (or set) over a single space.
pub fn read_map(source: &str) -> PolyResult<Map> {
    read_map_with(source, &Config::default())
}

/// [`read_map`] with an explicit configuration.
pub fn read_map_with(source: &str, config: &Config) -> PolyResult<Map> {
    match Parser::with_config(source, config.clone()).read_object()? {
        Object::Map(map) => Ok(map),
        Object::Union(umap) => Err(PolyError::invalid(format!(
            "expected a single relation, found a union over {} spaces",
            umap.n_map()
        ))),
    }
}

/// Read a set over a single space.
pub fn read_set(source: &str) -> PolyResult<Set> {
    read_set_with(source, &Config::default())
}

/// [`read_set`] with an explicit configuration.
pub fn read_set_with(source: &str, config: &Config) -> PolyResult<Set> {
    let map = read_map_with(source, config)?;
    if !map.is_set() {
        return Err(PolyError::invalid(format!("expected a set, found a relation over {}", map.space())));
    }
    Ok(map)
}

/// Read a union of relations, possibly over several spaces.
pub fn read_union_map(source: &str) -> PolyResult<UnionMap> {
    read_union_map_with(source, &Config::default())
}

/// [`read_union_map`] with an explicit configuration.
pub fn read_union_map_with(source: &str, config: &Config) -> PolyResult<UnionMap> {
    Ok(Parser::with_config(source, config.clone()).read_object()?.into_union())
}

/// Read a piecewise quasi-affine expression.
pub fn read_pw_aff(source: &str) -> PolyResult<PwAff> {
    read_pw_aff_with(source, &Config::default())
}

/// [`read_pw_aff`] with an explicit configuration.
pub fn read_pw_aff_with(source: &str, config: &Config) -> PolyResult<PwAff> {
    Parser::with_config(source, config.clone()).read_pw_aff()
}
