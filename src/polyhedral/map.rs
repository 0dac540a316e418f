//! Relations and sets as finite unions of basic relations.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::polyhedral::basic_map::BasicMap;
use crate::polyhedral::space::{DimType, Space};
use crate::utils::errors::{PolyError, PolyResult};
use crate::utils::matrix::Int;

/// A finite union of basic relations over one space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Map {
    space: Space,
    basics: Vec<BasicMap>,
}

/// A union of basic sets.
pub type Set = Map;

impl Map {
    /// All tuples of the space.
    pub fn universe(space: Space) -> Self {
        let basic = BasicMap::universe(space.clone());
        Self { space, basics: vec![basic] }
    }

    /// The empty relation.
    pub fn empty(space: Space) -> Self {
        Self { space, basics: Vec::new() }
    }

    /// A relation with a single basic relation.
    pub fn from_basic_map(bmap: BasicMap) -> Self {
        let space = bmap.space().clone();
        let mut map = Self::empty(space);
        map.push(bmap);
        map
    }

    fn push(&mut self, bmap: BasicMap) {
        if !bmap.is_obviously_empty() {
            self.basics.push(bmap);
        }
    }

    pub fn space(&self) -> &Space {
        &self.space
    }

    pub fn basic_maps(&self) -> &[BasicMap] {
        &self.basics
    }

    pub fn n_basic_map(&self) -> usize {
        self.basics.len()
    }

    pub fn is_set(&self) -> bool {
        self.space.is_set()
    }

    /// Number of dimensions of the given kind.
    pub fn dim(&self, kind: DimType) -> usize {
        self.space.dim(kind)
    }

    /// No basic relation left.
    pub fn is_obviously_empty(&self) -> bool {
        self.basics.iter().all(BasicMap::is_obviously_empty)
    }

    /// A single basic relation without constraints or divisions.
    pub fn is_plain_universe(&self) -> bool {
        self.basics.iter().any(BasicMap::is_plain_universe)
    }

    fn check_space(&self, other: &Map) -> PolyResult<()> {
        if !self.space.is_equal(&other.space) {
            return Err(PolyError::invalid(format!(
                "spaces don't match: {} vs {}",
                self.space, other.space
            )));
        }
        Ok(())
    }

    /// Pairwise intersection of the basic relations.
    pub fn intersect(&self, other: &Map) -> PolyResult<Map> {
        self.check_space(other)?;
        let mut result = Map::empty(self.space.clone());
        for a in &self.basics {
            for b in &other.basics {
                result.push(a.intersect(b)?);
            }
        }
        Ok(result)
    }

    /// Union of two relations over the same space.
    pub fn union(&self, other: &Map) -> PolyResult<Map> {
        self.check_space(other)?;
        let mut result = self.clone();
        for b in &other.basics {
            let mut b = b.clone();
            b.reset_space(self.space.clone())?;
            result.push(b);
        }
        Ok(result)
    }

    /// Tuples of `self` not in `other`.
    ///
    /// Every division of `other` must have a known definition, possibly
    /// recovered from its constraints; otherwise the complement cannot be
    /// expressed and the operation is unsupported.
    pub fn subtract(&self, other: &Map) -> PolyResult<Map> {
        self.check_space(other)?;
        let mut pieces: Vec<BasicMap> = self.basics.clone();
        for q in &other.basics {
            let mut q = q.clone();
            q.detect_div_definitions()?;
            if !q.local_space().divs_known() {
                return Err(PolyError::unsupported(
                    "subtracting a relation with existentially quantified variables",
                ));
            }
            let mut next = Vec::new();
            for p in &pieces {
                next.extend(subtract_basic(p, &q)?);
            }
            pieces = next;
        }
        debug!("subtraction left {} basic relations", pieces.len());
        let mut result = Map::empty(self.space.clone());
        for p in pieces {
            result.push(p);
        }
        Ok(result)
    }

    /// Bring the divisions of every basic relation into canonical order.
    pub fn sort_divs(&mut self) {
        for b in &mut self.basics {
            b.sort_divs();
        }
    }

    /// Recover division definitions from constraints where possible.
    pub fn detect_div_definitions(&mut self) -> PolyResult<usize> {
        let mut found = 0;
        for b in &mut self.basics {
            found += b.detect_div_definitions()?;
        }
        Ok(found)
    }

    /// Replace the space by one with the same dimension counts.
    pub fn reset_space(&mut self, space: Space) -> PolyResult<()> {
        if space.total() != self.space.total() {
            return Err(PolyError::invalid(format!(
                "space {} does not fit relation over {}",
                space, self.space
            )));
        }
        for b in &mut self.basics {
            b.reset_space(space.clone())?;
        }
        self.space = space;
        Ok(())
    }

    /// Append `n` dimensions of `kind`.
    pub fn add_dims(&mut self, kind: DimType, n: usize) -> PolyResult<()> {
        self.space.add_dims(kind, n)?;
        for b in &mut self.basics {
            b.add_dims(kind, n)?;
        }
        Ok(())
    }

    /// Existentially quantify dimensions `first..first + n` of `kind`.
    pub fn project_out(&mut self, kind: DimType, first: usize, n: usize) -> PolyResult<()> {
        self.space.drop_dims(kind, first, n)?;
        for b in &mut self.basics {
            b.project_out(kind, first, n)?;
        }
        Ok(())
    }

    /// Membership test with the default search window.
    pub fn contains(&self, point: &[Int]) -> PolyResult<bool> {
        self.contains_with(point, crate::Config::default().search_radius)
    }

    /// Membership test; see [`BasicMap::contains_with`].
    pub fn contains_with(&self, point: &[Int], radius: u32) -> PolyResult<bool> {
        for b in &self.basics {
            if b.contains_with(point, radius)? {
                return Ok(true);
            }
        }
        if point.len() != self.space.total() {
            return Err(PolyError::invalid(format!(
                "point with {} coordinates for {} dimensions",
                point.len(),
                self.space.total()
            )));
        }
        Ok(false)
    }
}

/// `p` minus `q`, where every division of `q` is known.
///
/// For the constraints `c1, ..., cn` of `q` (division constraints aside),
/// the result is the disjoint union over `i` of
/// `p and c1 and ... and c(i-1) and not ci`.
fn subtract_basic(p: &BasicMap, q: &BasicMap) -> PolyResult<Vec<BasicMap>> {
    let merged = p.local_space().merge(q.local_space())?;
    let mut acc = p.expand_into(&merged.ls, &merged.exp1)?;
    let q_ex = q.expand_into(&merged.ls, &merged.exp2)?;
    let mut pieces = Vec::new();
    for c in q_ex.constraints() {
        if q_ex.is_div_constraint(c) {
            continue;
        }
        for neg in c.complements() {
            let mut piece = acc.clone();
            piece.add_constraint(neg)?;
            if !piece.is_obviously_empty() {
                pieces.push(piece);
            }
        }
        acc.add_constraint(c.clone())?;
        if acc.is_obviously_empty() {
            break;
        }
    }
    Ok(pieces)
}
