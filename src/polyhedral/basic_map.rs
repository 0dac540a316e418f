//! Basic relations: conjunctions of constraints over a local space.
//!
//! A [`BasicMap`] is the set of tuples satisfying every constraint for some
//! values of its divisions. Known divisions are always accompanied by the
//! two inequalities defining them, so that a division row and its
//! constraints stay interchangeable.

use log::trace;
use num_integer::Integer;
use num_traits::{One, Signed, Zero};
use serde::{Deserialize, Serialize};

use crate::polyhedral::aff::Aff;
use crate::polyhedral::constraint::{Constraint, ConstraintKind, Normalized};
use crate::polyhedral::local_space::{expand_row, LocalSpace};
use crate::polyhedral::space::{DimType, Space};
use crate::utils::errors::{PolyError, PolyResult};
use crate::utils::matrix::{cdiv_q, fdiv_q, seq_inner_product, Int};

/// A conjunction of linear constraints over a local space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicMap {
    ls: LocalSpace,
    constraints: Vec<Constraint>,
    empty: bool,
}

/// A basic relation over a set space.
pub type BasicSet = BasicMap;

impl BasicMap {
    /// All tuples of the space.
    pub fn universe(space: Space) -> Self {
        Self::from_local_space(LocalSpace::from_space(space))
    }

    /// No tuples at all.
    pub fn empty(space: Space) -> Self {
        Self {
            ls: LocalSpace::from_space(space),
            constraints: Vec::new(),
            empty: true,
        }
    }

    /// All tuples of the local space, with the defining constraints of its
    /// known divisions.
    pub fn from_local_space(ls: LocalSpace) -> Self {
        let mut bmap = Self { ls, constraints: Vec::new(), empty: false };
        for k in 0..bmap.ls.n_div() {
            bmap.push_div_constraints(k);
        }
        bmap
    }

    /// A single constraint over a local space.
    pub fn from_constraint(ls: LocalSpace, constraint: Constraint) -> PolyResult<Self> {
        let mut bmap = Self::from_local_space(ls);
        bmap.add_constraint(constraint)?;
        Ok(bmap)
    }

    /// `aff >= 0` or `aff = 0`, depending on `kind`.
    pub fn from_aff(aff: &Aff, kind: ConstraintKind) -> PolyResult<Self> {
        let constraint = Constraint::new(aff.numerator().to_vec(), kind);
        Self::from_constraint(aff.local_space().clone(), constraint)
    }

    pub fn local_space(&self) -> &LocalSpace {
        &self.ls
    }

    pub fn space(&self) -> &Space {
        self.ls.space()
    }

    pub fn n_div(&self) -> usize {
        self.ls.n_div()
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Number of equalities.
    pub fn n_eq(&self) -> usize {
        self.constraints.iter().filter(|c| c.is_equality()).count()
    }

    /// Number of inequalities.
    pub fn n_ineq(&self) -> usize {
        self.constraints.iter().filter(|c| c.is_inequality()).count()
    }

    /// No constraints and no divisions.
    pub fn is_plain_universe(&self) -> bool {
        !self.empty && self.constraints.is_empty() && self.ls.n_div() == 0
    }

    fn width(&self) -> usize {
        1 + self.ls.dim_all()
    }

    /// Add a constraint, normalizing it first.
    pub fn add_constraint(&mut self, mut constraint: Constraint) -> PolyResult<()> {
        if constraint.width() != self.width() {
            return Err(PolyError::invalid(format!(
                "constraint of width {} added to relation of width {}",
                constraint.width(),
                self.width()
            )));
        }
        match constraint.normalize() {
            Normalized::Trivial => {}
            Normalized::Infeasible => {
                self.empty = true;
            }
            Normalized::Kept => {
                if !self.constraints.iter().any(|c| c.is_same(&constraint)) {
                    self.constraints.push(constraint);
                }
            }
        }
        Ok(())
    }

    /// The inequalities `f - m d >= 0` and `-f + m d + m - 1 >= 0` of a
    /// known division `d = floor(f / m)`.
    pub fn div_constraints(&self, k: usize) -> Option<[Constraint; 2]> {
        let div = self.ls.get_div(k)?;
        let m = &div[0];
        if m.is_zero() {
            return None;
        }
        let pos = 1 + self.ls.space().total() + k;
        let mut lower = div[1..].to_vec();
        lower[pos] = -m;
        let mut upper: Vec<Int> = lower.iter().map(|v| -v).collect();
        upper[0] += m - 1;
        Some([Constraint::ge_zero(lower), Constraint::ge_zero(upper)])
    }

    fn push_div_constraints(&mut self, k: usize) {
        if let Some(pair) = self.div_constraints(k) {
            for c in pair {
                if !self.constraints.iter().any(|e| e.is_same(&c)) {
                    self.constraints.push(c);
                }
            }
        }
    }

    /// Returns true if `constraint` is one of the defining inequalities of
    /// a known division.
    pub fn is_div_constraint(&self, constraint: &Constraint) -> bool {
        constraint.is_inequality()
            && (0..self.ls.n_div()).any(|k| self.ls.is_div_constraint(&constraint.row, k))
    }

    /// Replace the tuple space by one with the same dimension counts.
    pub fn reset_space(&mut self, space: Space) -> PolyResult<()> {
        self.ls.reset_space(space)
    }

    /// Insert `n` dimensions of `kind` before `first`.
    pub fn insert_dims(&mut self, kind: DimType, first: usize, n: usize) -> PolyResult<()> {
        let pos = 1 + self.ls.offset(kind) + first;
        self.ls.insert_dims(kind, first, n)?;
        for c in &mut self.constraints {
            c.insert_zeros(pos, n);
        }
        Ok(())
    }

    /// Append `n` dimensions of `kind`.
    pub fn add_dims(&mut self, kind: DimType, n: usize) -> PolyResult<()> {
        let pos = self.ls.dim(kind);
        self.insert_dims(kind, pos, n)
    }

    /// Existentially quantify dimensions `first..first + n` of `kind`.
    ///
    /// The dimensions become divisions of unknown definition in front of
    /// the existing divisions.
    pub fn project_out(&mut self, kind: DimType, first: usize, n: usize) -> PolyResult<()> {
        let src = 1 + self.ls.offset(kind) + first;
        let dst = 1 + self.ls.space().total() - n.min(self.ls.space().total());
        self.ls.move_dims_to_divs(kind, first, n)?;
        for c in &mut self.constraints {
            c.move_entries(src, n, dst);
        }
        Ok(())
    }

    /// Bring the divisions into canonical order.
    pub fn sort_divs(&mut self) {
        let start = 1 + self.ls.space().total();
        for (a, b) in self.ls.sort_divs() {
            for c in &mut self.constraints {
                c.row.swap(start + a, start + b);
            }
        }
    }

    /// Rewrite this relation over a local space whose divisions include
    /// ours at the positions given by `exp`.
    pub fn expand_into(&self, ls: &LocalSpace, exp: &[usize]) -> PolyResult<BasicMap> {
        let prefix = 1 + self.ls.space().total();
        let mut bmap = BasicMap::from_local_space(ls.clone());
        bmap.empty = self.empty;
        for c in &self.constraints {
            let row = expand_row(&c.row, prefix, exp, ls.n_div());
            bmap.add_constraint(Constraint::new(row, c.kind))?;
        }
        Ok(bmap)
    }

    /// Conjunction of two relations over the same space.
    pub fn intersect(&self, other: &BasicMap) -> PolyResult<BasicMap> {
        let merged = self.ls.merge(&other.ls)?;
        let mut bmap = self.expand_into(&merged.ls, &merged.exp1)?;
        let prefix = 1 + self.ls.space().total();
        for c in &other.constraints {
            let row = expand_row(&c.row, prefix, &merged.exp2, merged.ls.n_div());
            bmap.add_constraint(Constraint::new(row, c.kind))?;
        }
        bmap.empty |= other.empty;
        Ok(bmap)
    }

    /// Cheap emptiness test: a contradictory constraint was added, or two
    /// opposite inequalities leave no room between them.
    pub fn is_obviously_empty(&self) -> bool {
        if self.empty {
            return true;
        }
        let ineqs: Vec<Constraint> = self.constraints.iter().flat_map(|c| c.as_inequalities()).collect();
        for (i, a) in ineqs.iter().enumerate() {
            for b in &ineqs[i + 1..] {
                if a.is_opposite(b) && (&a.row[0] + &b.row[0]).is_negative() {
                    return true;
                }
            }
        }
        false
    }

    /// Recover definitions of unknown divisions from the constraints.
    ///
    /// A division `d` gets the definition `floor(f / m)` when the
    /// constraints contain `f - m d >= 0` and `-f + m d + m - 1 >= 0`, or
    /// an equality `a d + g = 0` with no later division. Returns the
    /// number of divisions that became known.
    pub fn detect_div_definitions(&mut self) -> PolyResult<usize> {
        let total = self.ls.space().total();
        let mut found = 0;
        for k in 0..self.ls.n_div() {
            if self.ls.div_is_known(k) {
                continue;
            }
            let pos = 1 + total + k;
            if let Some(def) = self.definition_from_constraints(pos) {
                trace!("division {} defined by constraints", k);
                let mut row = Vec::with_capacity(1 + self.width());
                row.push(def.0);
                row.extend(def.1);
                self.ls.set_div(k, row)?;
                self.push_div_constraints(k);
                found += 1;
            }
        }
        Ok(found)
    }

    fn definition_from_constraints(&self, pos: usize) -> Option<(Int, Vec<Int>)> {
        let usable = |c: &&Constraint| !c.row[pos].is_zero() && c.is_zero_from(pos + 1);
        if let Some(c) = self.constraints.iter().filter(usable).find(|c| c.is_equality()) {
            // a d + g = 0 gives d = -g / a exactly
            let a = &c.row[pos];
            let mut f: Vec<Int> = c.row.iter().map(|v| if a.is_positive() { -v } else { v.clone() }).collect();
            f[pos] = Int::zero();
            return Some((a.abs(), f));
        }
        let ineqs: Vec<&Constraint> =
            self.constraints.iter().filter(usable).filter(|c| c.is_inequality()).collect();
        for lower in ineqs.iter().filter(|c| c.row[pos].is_negative()) {
            let m = -&lower.row[pos];
            let matches = ineqs.iter().any(|upper| {
                upper.row[pos] == m
                    && upper.is_opposite(lower)
                    && &upper.row[0] + &lower.row[0] == &m - 1
            });
            if matches {
                let mut f = lower.row.clone();
                f[pos] = Int::zero();
                return Some((m, f));
            }
        }
        None
    }

    /// Membership test with the default search window for divisions of
    /// unknown definition.
    pub fn contains(&self, point: &[Int]) -> PolyResult<bool> {
        self.contains_with(point, crate::Config::default().search_radius)
    }

    /// Membership test.
    ///
    /// `point` gives a value for every tuple dimension. Known divisions are
    /// computed; unknown ones are solved from an equality when possible and
    /// otherwise searched between the bounds implied by the constraints,
    /// at most `radius` values away from a bound (or from zero when
    /// unbounded).
    pub fn contains_with(&self, point: &[Int], radius: u32) -> PolyResult<bool> {
        let total = self.ls.space().total();
        if point.len() != total {
            return Err(PolyError::invalid(format!(
                "point with {} coordinates for {} dimensions",
                point.len(),
                total
            )));
        }
        if self.empty {
            return Ok(false);
        }
        let mut values = Vec::with_capacity(self.width());
        values.push(Int::one());
        values.extend(point.iter().cloned());
        if !self.partial_ok(&values) {
            return Ok(false);
        }
        Ok(self.search(0, &mut values, &Int::from(radius)))
    }

    fn partial_ok(&self, values: &[Int]) -> bool {
        let n = values.len();
        self.constraints
            .iter()
            .filter(|c| c.is_zero_from(n))
            .all(|c| c.is_satisfied(values))
    }

    fn search(&self, k: usize, values: &mut Vec<Int>, radius: &Int) -> bool {
        if k == self.ls.n_div() {
            return self.constraints.iter().all(|c| c.is_satisfied(values));
        }
        for candidate in self.candidates(k, values, radius) {
            values.push(candidate);
            if self.partial_ok(values) && self.search(k + 1, values, radius) {
                return true;
            }
            values.pop();
        }
        false
    }

    fn candidates(&self, k: usize, values: &[Int], radius: &Int) -> Vec<Int> {
        let pos = values.len();
        if let Some(div) = self.ls.get_div(k) {
            if !div[0].is_zero() {
                let num = seq_inner_product(&div[1..1 + pos], values);
                return vec![fdiv_q(&num, &div[0])];
            }
        }
        let mut lo: Option<Int> = None;
        let mut hi: Option<Int> = None;
        for c in self.constraints.iter().filter(|c| !c.row[pos].is_zero() && c.is_zero_from(pos + 1)) {
            let a = &c.row[pos];
            let rest = seq_inner_product(&c.row[..pos], values);
            if c.is_equality() {
                let (q, r) = (-&rest).div_rem(a);
                return if r.is_zero() { vec![q] } else { Vec::new() };
            }
            if a.is_positive() {
                let bound = cdiv_q(&-&rest, a);
                lo = Some(lo.map_or(bound.clone(), |l| l.max(bound)));
            } else {
                let bound = fdiv_q(&rest, &-a);
                hi = Some(hi.map_or(bound.clone(), |h| h.min(bound)));
            }
        }
        let width = radius * 2;
        let (start, end) = match (lo, hi) {
            (Some(l), Some(h)) => {
                let capped = &l + &width;
                let end = if h > capped { capped } else { h };
                (l, end)
            }
            (Some(l), None) => {
                let end = &l + &width;
                (l, end)
            }
            (None, Some(h)) => (&h - &width, h),
            (None, None) => (-radius, radius.clone()),
        };
        let mut out = Vec::new();
        let mut v = start;
        while v <= end {
            out.push(v.clone());
            v += 1;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::matrix::{int, row};

    fn set1() -> Space {
        Space::set_alloc(0, 1)
    }

    #[test]
    fn test_add_constraint_normalizes() {
        let mut bset = BasicMap::universe(set1());
        bset.add_constraint(Constraint::ge_zero(row(&[3, 2]))).unwrap();
        assert_eq!(bset.constraints()[0].row, row(&[1, 1]));
        bset.add_constraint(Constraint::ge_zero(row(&[2, 2]))).unwrap();
        assert_eq!(bset.constraints().len(), 1);
        assert!(bset.add_constraint(Constraint::ge_zero(row(&[1, 1, 1]))).is_err());
        bset.add_constraint(Constraint::eq_zero(row(&[1, 0]))).unwrap();
        assert!(bset.is_obviously_empty());
    }

    #[test]
    fn test_opposite_bounds_are_empty() {
        let mut bset = BasicMap::universe(set1());
        bset.add_constraint(Constraint::ge_zero(row(&[0, 1]))).unwrap();
        bset.add_constraint(Constraint::ge_zero(row(&[-1, -1]))).unwrap();
        assert!(bset.is_obviously_empty());
    }

    #[test]
    fn test_div_constraints_from_local_space() {
        let mut ls = LocalSpace::from_space(set1());
        ls.add_div(row(&[3, 1, 1])).unwrap();
        let bset = BasicMap::from_local_space(ls);
        assert_eq!(bset.constraints().len(), 2);
        assert!(bset.constraints().iter().all(|c| bset.is_div_constraint(c)));
    }

    #[test]
    fn test_contains_with_existential() {
        // { [i] : exists a : i = 2a }
        let mut bset = BasicMap::universe(Space::set_alloc(0, 2));
        bset.add_constraint(Constraint::eq_zero(row(&[0, 1, -2]))).unwrap();
        bset.project_out(DimType::Out, 1, 1).unwrap();
        assert_eq!(bset.n_div(), 1);
        assert!(bset.contains(&[int(4)]).unwrap());
        assert!(!bset.contains(&[int(5)]).unwrap());
    }

    #[test]
    fn test_contains_searches_bounds() {
        // { [i] : exists a : 3a <= i <= 3a + 1 }
        let mut bset = BasicMap::universe(Space::set_alloc(0, 2));
        bset.add_constraint(Constraint::ge_zero(row(&[0, 1, -3]))).unwrap();
        bset.add_constraint(Constraint::ge_zero(row(&[1, -1, 3]))).unwrap();
        bset.project_out(DimType::Out, 1, 1).unwrap();
        for i in -6..6i64 {
            assert_eq!(bset.contains(&[int(i)]).unwrap(), i.rem_euclid(3) != 2);
        }
    }

    #[test]
    fn test_detect_div_definitions() {
        // 0 <= i - 4a <= 3 defines a = floor(i / 4)
        let mut bset = BasicMap::universe(Space::set_alloc(0, 2));
        bset.add_constraint(Constraint::ge_zero(row(&[0, 1, -4]))).unwrap();
        bset.add_constraint(Constraint::ge_zero(row(&[3, -1, 4]))).unwrap();
        bset.project_out(DimType::Out, 1, 1).unwrap();
        assert_eq!(bset.detect_div_definitions().unwrap(), 1);
        assert_eq!(bset.local_space().get_div(0), Some(row(&[4, 0, 1, 0]).as_slice()));
    }

    #[test]
    fn test_detect_div_from_equality() {
        // i = 5q defines q = floor(i / 5)
        let mut bset = BasicMap::universe(Space::set_alloc(0, 2));
        bset.add_constraint(Constraint::eq_zero(row(&[0, 1, -5]))).unwrap();
        bset.project_out(DimType::Out, 1, 1).unwrap();
        assert_eq!(bset.detect_div_definitions().unwrap(), 1);
        assert_eq!(bset.local_space().get_div(0), Some(row(&[5, 0, 1, 0]).as_slice()));
    }

    #[test]
    fn test_intersect_merges_divs() {
        let ls = LocalSpace::from_space(set1());
        let x = Aff::var_on_domain(ls.clone(), DimType::Out, 0).unwrap();
        let f = x.floor_div(&int(2)).unwrap();
        // floor(i/2) >= 1 and floor(i/2) <= 2
        let a = BasicMap::from_aff(&f.add_constant(&int(-1)), ConstraintKind::Inequality).unwrap();
        let b = BasicMap::from_aff(&f.neg().add_constant(&int(2)), ConstraintKind::Inequality).unwrap();
        let both = a.intersect(&b).unwrap();
        assert_eq!(both.n_div(), 1);
        let members: Vec<i64> = (-2..8).filter(|&i| both.contains(&[int(i)]).unwrap()).collect();
        assert_eq!(members, vec![2, 3, 4, 5]);
    }
}
