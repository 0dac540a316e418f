//! Collections of relations over different spaces.

use serde::{Deserialize, Serialize};

use crate::polyhedral::map::Map;
use crate::polyhedral::space::Space;
use crate::utils::errors::{PolyError, PolyResult};

/// A union of relations, at most one per space.
///
/// Parameters are shared: every member has the same parameter list.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UnionMap {
    maps: Vec<Map>,
}

/// A union of sets.
pub type UnionSet = UnionMap;

impl UnionMap {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_map(map: Map) -> Self {
        let mut umap = Self::empty();
        umap.maps.push(map);
        umap
    }

    pub fn maps(&self) -> &[Map] {
        &self.maps
    }

    pub fn n_map(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.iter().all(Map::is_obviously_empty)
    }

    /// The member over `space`, if any.
    pub fn get(&self, space: &Space) -> Option<&Map> {
        self.maps.iter().find(|m| m.space().is_equal(space))
    }

    /// Add a relation, merging it with the member over the same space.
    pub fn add_map(&mut self, map: Map) -> PolyResult<()> {
        if let Some(first) = self.maps.first() {
            if first.space().param_names() != map.space().param_names() {
                return Err(PolyError::invalid(format!(
                    "parameters of {} differ from those of {}",
                    map.space(),
                    first.space()
                )));
            }
        }
        match self.maps.iter_mut().find(|m| m.space().is_equal(map.space())) {
            Some(existing) => {
                *existing = existing.union(&map)?;
            }
            None => self.maps.push(map),
        }
        Ok(())
    }

    /// Union of two collections.
    pub fn union(&self, other: &UnionMap) -> PolyResult<UnionMap> {
        let mut result = self.clone();
        for map in &other.maps {
            result.add_map(map.clone())?;
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polyhedral::space::Tuple;

    fn named(name: &str, n: usize) -> Space {
        Space::set_from_tuple(Vec::new(), Tuple::new(Some(name.to_string()), vec![None; n]))
    }

    #[test]
    fn test_add_map_merges_same_space() {
        let mut umap = UnionMap::empty();
        umap.add_map(Map::universe(named("A", 1))).unwrap();
        umap.add_map(Map::universe(named("B", 1))).unwrap();
        umap.add_map(Map::empty(named("A", 1))).unwrap();
        assert_eq!(umap.n_map(), 2);
        assert!(umap.get(&named("B", 1)).is_some());
        assert!(umap.get(&named("C", 1)).is_none());
        assert!(!umap.is_empty());
    }

    #[test]
    fn test_parameters_must_agree() {
        let mut umap = UnionMap::from_map(Map::universe(named("A", 1)));
        let with_param = Space::set_from_tuple(
            vec![Some("N".to_string())],
            Tuple::new(Some("B".to_string()), vec![None]),
        );
        assert!(umap.add_map(Map::universe(with_param)).is_err());
    }
}
