//! Local spaces: a tuple space together with a list of existential
//! integer divisions.
//!
//! Division `k` is stored as a row
//! `[denominator, constant, coefficients of the tuple dimensions,
//! coefficients of divisions]` and denotes
//! `floor((constant + coefficients . x) / denominator)`. A zero denominator
//! marks a division whose definition is unknown (a plain existential
//! variable). Division `k` only ever refers to divisions `< k`, so every
//! row has zeros from its own column onwards.
//!
//! Both the tuple space and the division matrix are shared between clones
//! through reference counting and copied on first mutation: every mutator
//! goes through [`Rc::make_mut`], so a clone never observes another owner's
//! changes.

use log::trace;
use num_traits::{Signed, Zero};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::rc::Rc;

use crate::polyhedral::aff::Aff;
use crate::polyhedral::space::{DimType, Space};
use crate::utils::errors::{PolyError, PolyResult};
use crate::utils::matrix::{
    fdiv_q, seq_cmp, seq_elim, seq_first_non_zero, seq_gcd, seq_is_zero, seq_last_non_zero,
    seq_scale, Int, IntMat,
};

/// A tuple space plus an ordered list of integer divisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalSpace {
    space: Rc<Space>,
    div: Rc<IntMat>,
}

/// Result of merging the division lists of two local spaces.
#[derive(Debug, Clone)]
pub struct DivMerge {
    /// Local space holding the merged divisions
    pub ls: LocalSpace,
    /// New index of every division of the first operand
    pub exp1: Vec<usize>,
    /// New index of every division of the second operand
    pub exp2: Vec<usize>,
}

impl LocalSpace {
    /// A local space without divisions.
    pub fn from_space(space: Space) -> Self {
        let n_col = 2 + space.total();
        Self {
            space: Rc::new(space),
            div: Rc::new(IntMat::new(n_col)),
        }
    }

    /// A local space with `n_div` divisions of unknown definition.
    pub fn alloc(space: Space, n_div: usize) -> Self {
        let n_col = 2 + space.total() + n_div;
        Self {
            space: Rc::new(space),
            div: Rc::new(IntMat::zeros(n_div, n_col)),
        }
    }

    /// Assemble a local space from a shared space and a division matrix,
    /// checking the matrix width and the ordering invariant.
    pub fn from_parts(space: Rc<Space>, div: IntMat) -> PolyResult<Self> {
        let d = 2 + space.total();
        if div.n_col() != d + div.n_row() {
            return Err(PolyError::invalid(format!(
                "division matrix with {} columns for {} dimensions and {} divisions",
                div.n_col(),
                space.total(),
                div.n_row()
            )));
        }
        for k in 0..div.n_row() {
            if !seq_is_zero(&div.row(k)[d + k..]) {
                return Err(PolyError::invalid(format!(
                    "division {} refers to itself or a later division",
                    k
                )));
            }
        }
        Ok(Self { space, div: Rc::new(div) })
    }

    /// The tuple space.
    pub fn space(&self) -> &Space {
        &self.space
    }

    /// The division matrix.
    pub fn divs(&self) -> &IntMat {
        &self.div
    }

    /// Returns true if either component is shared with another owner.
    pub fn is_shared(&self) -> bool {
        Rc::strong_count(&self.space) > 1 || Rc::strong_count(&self.div) > 1
    }

    /// Ensure unique ownership of both components and hand them out for
    /// mutation.
    pub fn cow(&mut self) -> (&mut Space, &mut IntMat) {
        (Rc::make_mut(&mut self.space), Rc::make_mut(&mut self.div))
    }

    fn divs_mut(&mut self) -> &mut IntMat {
        Rc::make_mut(&mut self.div)
    }

    /// Number of dimensions of the given kind.
    pub fn dim(&self, kind: DimType) -> usize {
        match kind {
            DimType::Div => self.div.n_row(),
            _ => self.space.dim(kind),
        }
    }

    /// Number of tuple dimensions plus divisions.
    pub fn dim_all(&self) -> usize {
        self.space.total() + self.div.n_row()
    }

    /// Position of the first dimension of `kind` among all dimensions
    /// (divisions come last).
    pub fn offset(&self, kind: DimType) -> usize {
        self.space.offset(kind)
    }

    /// Number of divisions.
    pub fn n_div(&self) -> usize {
        self.div.n_row()
    }

    /// Definition row of division `k`.
    pub fn get_div(&self, k: usize) -> Option<&[Int]> {
        (k < self.div.n_row()).then(|| self.div.row(k))
    }

    /// Returns true if division `k` has a known definition.
    pub fn div_is_known(&self, k: usize) -> bool {
        self.get_div(k).map_or(false, |row| !row[0].is_zero())
    }

    /// Returns true if every division has a known definition.
    pub fn divs_known(&self) -> bool {
        (0..self.n_div()).all(|k| self.div_is_known(k))
    }

    /// Equal spaces and identical division lists.
    pub fn is_equal(&self, other: &LocalSpace) -> bool {
        self.space.is_equal(&other.space) && self.div == other.div
    }

    /// Replace the tuple space by one with the same number of dimensions.
    pub fn reset_space(&mut self, space: Space) -> PolyResult<()> {
        if space.total() != self.space.total() {
            return Err(PolyError::invalid(format!(
                "space with {} dimensions replacing one with {}",
                space.total(),
                self.space.total()
            )));
        }
        self.space = Rc::new(space);
        Ok(())
    }

    /// Rename a tuple dimension.
    pub fn set_dim_name(&mut self, kind: DimType, pos: usize, name: Option<String>) -> PolyResult<()> {
        Rc::make_mut(&mut self.space).set_dim_name(kind, pos, name)
    }

    /// Append a division definition.
    ///
    /// `row` must have one entry per column of the current division
    /// matrix; the new division gets a zero coefficient for itself.
    pub fn add_div(&mut self, row: Vec<Int>) -> PolyResult<usize> {
        if row.len() != self.div.n_col() {
            return Err(PolyError::invalid(format!(
                "division of width {} added to local space of width {}",
                row.len(),
                self.div.n_col()
            )));
        }
        let div = self.divs_mut();
        div.add_zero_cols(1);
        let mut row = row;
        row.push(Int::zero());
        div.push_row(row)?;
        Ok(div.n_row() - 1)
    }

    /// Give division `k` a definition.
    pub fn set_div(&mut self, k: usize, row: Vec<Int>) -> PolyResult<()> {
        let d = 2 + self.space.total();
        if k >= self.n_div() || row.len() != self.div.n_col() || !seq_is_zero(&row[d + k..]) {
            return Err(PolyError::invalid(format!("invalid definition for division {}", k)));
        }
        *self.divs_mut().row_mut(k) = row;
        self.normalize_div(k);
        Ok(())
    }

    /// Insert `n` dimensions of `kind` before position `first`.
    ///
    /// For tuple dimensions the space is updated and zero columns are
    /// inserted in every division; for divisions, unknown rows are inserted
    /// along with their columns.
    pub fn insert_dims(&mut self, kind: DimType, first: usize, n: usize) -> PolyResult<()> {
        if first > self.dim(kind) {
            return Err(PolyError::invalid(format!(
                "insertion position {} beyond {} dimensions of kind {:?}",
                first,
                self.dim(kind),
                kind
            )));
        }
        if n == 0 {
            return Ok(());
        }
        let col = 2 + self.offset(kind) + first;
        let (space, div) = self.cow();
        if kind == DimType::Div {
            div.insert_zero_rows(first, n);
        } else {
            space.insert_dims(kind, first, n)?;
        }
        div.insert_zero_cols(col, n);
        Ok(())
    }

    /// Append `n` dimensions of `kind`.
    pub fn add_dims(&mut self, kind: DimType, n: usize) -> PolyResult<()> {
        let pos = self.dim(kind);
        self.insert_dims(kind, pos, n)
    }

    /// Remove dimensions `first..first + n` of `kind`.
    pub fn drop_dims(&mut self, kind: DimType, first: usize, n: usize) -> PolyResult<()> {
        if first + n > self.dim(kind) {
            return Err(PolyError::invalid(format!(
                "dimension range {}..{} of kind {:?} out of bounds",
                first,
                first + n,
                kind
            )));
        }
        if n == 0 {
            return Ok(());
        }
        let col = 2 + self.offset(kind) + first;
        let (space, div) = self.cow();
        if kind == DimType::Div {
            div.drop_rows(first, n);
        } else {
            space.drop_dims(kind, first, n)?;
        }
        div.drop_cols(col, n);
        Ok(())
    }

    fn check_unused(&self, kind: DimType) -> PolyResult<()> {
        let start = 2 + self.offset(kind);
        let end = start + self.dim(kind);
        if self.div.rows().iter().any(|row| !seq_is_zero(&row[start..end])) {
            return Err(PolyError::invalid(format!(
                "divisions refer to {:?} dimensions being removed",
                kind
            )));
        }
        Ok(())
    }

    /// Turn tuple dimensions `first..first + n` of `kind` into divisions of
    /// unknown definition, placed before the existing divisions.
    ///
    /// Existing divisions that referred to the moved dimensions now refer
    /// to the new divisions.
    pub fn move_dims_to_divs(&mut self, kind: DimType, first: usize, n: usize) -> PolyResult<()> {
        if kind == DimType::Div || first + n > self.dim(kind) {
            return Err(PolyError::invalid(format!(
                "cannot project {:?} dimensions {}..{}",
                kind,
                first,
                first + n
            )));
        }
        if n == 0 {
            return Ok(());
        }
        let src = 2 + self.offset(kind) + first;
        let dst = 2 + self.space.total() - n;
        let (space, div) = self.cow();
        space.drop_dims(kind, first, n)?;
        div.move_cols(src, n, dst);
        div.insert_zero_rows(0, n);
        Ok(())
    }

    /// The local space of the input tuple of a relation.
    pub fn domain(&self) -> PolyResult<LocalSpace> {
        self.check_unused(DimType::Out)?;
        let mut ls = self.clone();
        let n_out = ls.dim(DimType::Out);
        ls.drop_dims(DimType::Out, 0, n_out)?;
        let space = ls.space.domain();
        ls.reset_space(space)?;
        Ok(ls)
    }

    /// The local space of the output tuple of a relation.
    pub fn range(&self) -> PolyResult<LocalSpace> {
        if self.space.is_set() {
            return Ok(self.clone());
        }
        self.check_unused(DimType::In)?;
        let mut ls = self.clone();
        let n_in = ls.dim(DimType::In);
        ls.drop_dims(DimType::In, 0, n_in)?;
        let space = ls.space.range();
        ls.reset_space(space)?;
        Ok(ls)
    }

    /// Turn a set local space into the local space of a relation from that
    /// set to a zero-dimensional range. Columns are unchanged.
    pub fn from_domain(&self) -> PolyResult<LocalSpace> {
        let space = Space::from_domain(&self.space)?;
        let mut ls = self.clone();
        ls.reset_space(space)?;
        Ok(ls)
    }

    /// Exchange divisions `a` and `b`, rows and columns alike.
    pub fn swap_div(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        let d = 2 + self.space.total();
        let div = self.divs_mut();
        div.swap_rows(a, b);
        div.swap_cols(d + a, d + b);
    }

    /// Move known divisions after the divisions they depend on.
    ///
    /// Returns the transpositions applied, in order, so that callers holding
    /// rows over the same divisions can replay them.
    pub fn order_divs(&mut self) -> Vec<(usize, usize)> {
        let d = 2 + self.space.total();
        let mut swaps = Vec::new();
        let mut i = 0;
        while i < self.n_div() {
            let row = self.div.row(i);
            if row[0].is_zero() {
                i += 1;
                continue;
            }
            match seq_first_non_zero(&row[d + i..]) {
                Some(pos) if pos > 0 => {
                    self.swap_div(i, i + pos);
                    swaps.push((i, i + pos));
                }
                _ => i += 1,
            }
        }
        swaps
    }

    /// Sort divisions into canonical order: dependencies first, then by
    /// [`cmp_row`] with adjacent swaps.
    ///
    /// Returns the transpositions applied.
    pub fn sort_divs(&mut self) -> Vec<(usize, usize)> {
        let mut swaps = self.order_divs();
        let n_row = self.n_div();
        if n_row <= 1 {
            return swaps;
        }
        let n_col = self.div.n_col();
        for i in 1..n_row {
            for j in (0..i).rev() {
                let ord = cmp_row(self.div.row(j), self.div.row(j + 1), j, j + 1, n_row, n_col);
                if ord != Ordering::Greater {
                    break;
                }
                self.swap_div(j, j + 1);
                swaps.push((j, j + 1));
            }
        }
        if !swaps.is_empty() {
            trace!("sorted {} divisions with {} swaps", n_row, swaps.len());
        }
        swaps
    }

    /// Check whether `constraint` is one of the two bounds
    /// `f - m d >= 0` or `-f + m d + m - 1 >= 0` defining division `k`
    /// as `d = floor(f / m)`.
    ///
    /// `constraint` is `[constant, coefficients of all dimensions and
    /// divisions]`.
    pub fn is_div_constraint(&self, constraint: &[Int], k: usize) -> bool {
        let div = match self.get_div(k) {
            Some(row) if !row[0].is_zero() => row,
            _ => return false,
        };
        let m = &div[0];
        let pos = 1 + self.space.total() + k;
        if constraint.len() <= pos {
            return false;
        }
        let c = &constraint[pos];
        let matches = if c == m {
            // -f + m d + m - 1 >= 0
            let shifted: Int = &div[1] - m + 1;
            constraint[0] == -shifted
                && constraint[1..pos].iter().zip(&div[2..pos + 1]).all(|(a, b)| *a == -b)
        } else if c.abs() == *m {
            // f - m d >= 0
            constraint[..pos] == div[1..pos + 1]
        } else {
            false
        };
        matches && seq_is_zero(&constraint[pos + 1..])
    }

    /// Divide division `k` by the gcd of its coefficients and denominator,
    /// rounding the constant down.
    pub fn normalize_div(&mut self, k: usize) {
        let row = self.divs_mut().row_mut(k);
        let g = seq_gcd(&row[2..]);
        let g = num_integer::Integer::gcd(&g, &row[0]);
        if g.is_zero() || g == Int::from(1) {
            return;
        }
        for v in row[2..].iter_mut() {
            *v = &*v / &g;
        }
        row[0] = &row[0] / &g;
        row[1] = fdiv_q(&row[1], &g);
    }

    /// Use equalities to simplify division definitions.
    ///
    /// Every equality is `[constant, coefficients of all dimensions and
    /// divisions of this local space, ...]`. For an equality whose last
    /// non-zero coefficient `j` is a dimension or division of this local
    /// space, `j` is eliminated from every division that mentions it.
    pub fn substitute_equalities(&mut self, eqs: &[Vec<Int>]) -> PolyResult<()> {
        let total = 1 + self.dim_all();
        for eq in eqs {
            if eq.len() < total {
                return Err(PolyError::invalid(format!(
                    "equality of width {} for local space of width {}",
                    eq.len(),
                    total
                )));
            }
            let j = match seq_last_non_zero(eq) {
                Some(j) if j > 0 && j < total => j,
                _ => continue,
            };
            for k in 0..self.n_div() {
                if self.div.row(k)[1 + j].is_zero() {
                    continue;
                }
                let row = self.divs_mut().row_mut(k);
                let (denom, rest) = row.split_at_mut(1);
                seq_elim(rest, &eq[..total], j, Some(&mut denom[0]));
                self.normalize_div(k);
            }
        }
        Ok(())
    }

    /// Replace dimension `(kind, pos)` by `subs` in every division.
    ///
    /// Writing `subs` as `g / s`, a division `floor((a x_pos + f) / m)`
    /// becomes `floor((a g + s f) / (s m))`. Replacements that carry
    /// divisions of their own are not supported.
    pub fn substitute(&mut self, kind: DimType, pos: usize, subs: &Aff) -> PolyResult<()> {
        if !self.space.is_equal(subs.local_space().space()) {
            return Err(PolyError::invalid("spaces don't match"));
        }
        if subs.local_space().n_div() != 0 {
            return Err(PolyError::unsupported(
                "substituting an expression with divisions",
            ));
        }
        if kind == DimType::Div || pos >= self.dim(kind) {
            return Err(PolyError::invalid(format!("cannot substitute {:?} dimension {}", kind, pos)));
        }
        let col = 2 + self.offset(kind) + pos;
        let v_subs = subs.vector();
        let s = &v_subs[0];
        for i in 0..self.n_div() {
            if self.div.row(i)[col].is_zero() {
                continue;
            }
            let row = self.divs_mut().row_mut(i);
            let a = std::mem::replace(&mut row[col], Int::zero());
            seq_scale(&mut row[1..], s);
            for (dst, src) in row[1..].iter_mut().zip(&v_subs[1..]) {
                *dst += &a * src;
            }
            row[0] = &row[0] * s;
            self.normalize_div(i);
        }
        Ok(())
    }

    /// Merge the divisions of two local spaces over the same tuple space.
    pub fn merge(&self, other: &LocalSpace) -> PolyResult<DivMerge> {
        if !self.space.is_equal(&other.space) {
            return Err(PolyError::invalid(format!(
                "spaces should be identical: {} vs {}",
                self.space, other.space
            )));
        }
        if other.n_div() == 0 {
            return Ok(DivMerge {
                ls: self.clone(),
                exp1: (0..self.n_div()).collect(),
                exp2: Vec::new(),
            });
        }
        if self.n_div() == 0 {
            return Ok(DivMerge {
                ls: LocalSpace { space: Rc::clone(&self.space), div: Rc::clone(&other.div) },
                exp1: Vec::new(),
                exp2: (0..other.n_div()).collect(),
            });
        }
        let (divs, exp1, exp2) = merge_divs(&self.div, &other.div)?;
        Ok(DivMerge {
            ls: LocalSpace { space: Rc::clone(&self.space), div: Rc::new(divs) },
            exp1,
            exp2,
        })
    }

    /// A local space containing the divisions of both operands.
    pub fn intersect(&self, other: &LocalSpace) -> PolyResult<LocalSpace> {
        Ok(self.merge(other)?.ls)
    }
}

/// Ordering of two division rows of the same matrix.
///
/// Two unknown divisions keep their current relative order. Otherwise each
/// division is keyed by its highest-order dependency (the position of its
/// last non-zero entry, or its own column when unknown) and ties are broken
/// lexicographically.
pub fn cmp_row(row_i: &[Int], row_j: &[Int], i: usize, j: usize, n_row: usize, n_col: usize) -> Ordering {
    let unknown_i = row_i[0].is_zero();
    let unknown_j = row_j[0].is_zero();
    if unknown_i && unknown_j {
        return i.cmp(&j);
    }
    let key = |row: &[Int], unknown: bool, idx: usize| -> usize {
        if unknown {
            n_col - n_row + idx
        } else {
            seq_last_non_zero(&row[..n_col]).unwrap_or(0)
        }
    };
    let li = key(row_i, unknown_i, i);
    let lj = key(row_j, unknown_j, j);
    if li != lj {
        return li.cmp(&lj);
    }
    seq_cmp(&row_i[..n_col], &row_j[..n_col])
}

/// Copy `row` into a coordinate system with `n_div` divisions, sending its
/// division coefficient `i` to position `exp[i]`. The first `prefix`
/// entries (everything before the divisions) are copied unchanged.
pub fn expand_row(row: &[Int], prefix: usize, exp: &[usize], n_div: usize) -> Vec<Int> {
    let mut out = vec![Int::zero(); prefix + n_div];
    out[..prefix].clone_from_slice(&row[..prefix]);
    for (i, &e) in exp.iter().enumerate() {
        if prefix + i < row.len() {
            out[prefix + e] = row[prefix + i].clone();
        }
    }
    out
}

/// Combine two division lists over the same tuple dimensions.
///
/// Returns the merged matrix and, for each input, the new index of each of
/// its rows. The maps are strictly increasing and never move a row to an
/// earlier index. Equal rows are shared.
pub fn merge_divs(div1: &IntMat, div2: &IntMat) -> PolyResult<(IntMat, Vec<usize>, Vec<usize>)> {
    let d = div1.n_col() - div1.n_row();
    let (n1, n2) = (div1.n_row(), div2.n_row());
    let n_row = 1 + n1 + n2;
    let n_col = d + n1 + n2;
    let mut exp1 = vec![0; n1];
    let mut exp2 = vec![0; n2];
    let mut rows: Vec<Vec<Int>> = Vec::with_capacity(n1 + n2);

    let expand = |src: &IntMat, s: usize, exp: &[usize]| -> Vec<Int> {
        let mut out = vec![Int::zero(); n_col];
        out[..d].clone_from_slice(&src.row(s)[..d]);
        for i in 0..s {
            out[d + exp[i]] = src.row(s)[d + i].clone();
        }
        out
    };

    let (mut i, mut j) = (0, 0);
    while i < n1 && j < n2 {
        let k = rows.len();
        let a = expand(div1, i, &exp1);
        let b = expand(div2, j, &exp2);
        match cmp_row(&a, &b, k, k + 1, n_row, n_col) {
            Ordering::Equal => {
                exp1[i] = k;
                exp2[j] = k;
                i += 1;
                j += 1;
                rows.push(a);
            }
            Ordering::Less => {
                exp1[i] = k;
                i += 1;
                rows.push(a);
            }
            Ordering::Greater => {
                exp2[j] = k;
                j += 1;
                rows.push(b);
            }
        }
    }
    while i < n1 {
        exp1[i] = rows.len();
        rows.push(expand(div1, i, &exp1));
        i += 1;
    }
    while j < n2 {
        exp2[j] = rows.len();
        rows.push(expand(div2, j, &exp2));
        j += 1;
    }

    let k = rows.len();
    for row in &mut rows {
        row.truncate(d + k);
    }
    let merged = IntMat::from_rows(d + k, rows)?;
    Ok((merged, exp1, exp2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polyhedral::space::Tuple;
    use crate::utils::matrix::{int, row};
    use proptest::prelude::*;

    fn set_space(names: &[&str]) -> Space {
        Space::set_from_tuple(
            vec![],
            Tuple::new(None, names.iter().map(|s| Some(s.to_string())).collect()),
        )
    }

    fn ls_with_divs(n_dim: usize, divs: &[Vec<i64>]) -> LocalSpace {
        let mut ls = LocalSpace::from_space(Space::set_alloc(0, n_dim));
        for d in divs {
            let mut r = row(d);
            r.resize(ls.divs().n_col(), Int::zero());
            ls.add_div(r).unwrap();
        }
        ls
    }

    #[test]
    fn test_alloc_unknown_divs() {
        let ls = LocalSpace::alloc(Space::set_alloc(1, 2), 2);
        assert_eq!(ls.n_div(), 2);
        assert_eq!(ls.divs().n_col(), 2 + 3 + 2);
        assert!(!ls.div_is_known(0));
        assert!(!ls.divs_known());
    }

    #[test]
    fn test_add_div_checks_width() {
        let mut ls = LocalSpace::from_space(Space::set_alloc(0, 1));
        assert!(ls.add_div(row(&[3, 0])).is_err());
        let k = ls.add_div(row(&[3, 0, 1])).unwrap();
        assert_eq!(k, 0);
        assert_eq!(ls.get_div(0), Some(row(&[3, 0, 1, 0]).as_slice()));
        assert!(ls.divs_known());
    }

    #[test]
    fn test_cow_isolation() {
        let original = ls_with_divs(1, &[vec![2, 0, 1]]);
        let mut copy = original.clone();
        assert!(copy.is_shared());
        copy.insert_dims(DimType::Out, 0, 1).unwrap();
        copy.add_div(vec![int(0); copy.divs().n_col()]).unwrap();
        assert_eq!(original.dim(DimType::Out), 1);
        assert_eq!(original.n_div(), 1);
        assert_eq!(original.get_div(0), Some(row(&[2, 0, 1, 0]).as_slice()));
        assert_eq!(copy.get_div(0), Some(row(&[2, 0, 0, 1, 0, 0]).as_slice()));
    }

    #[test]
    fn test_insert_and_drop_dims() {
        let mut ls = ls_with_divs(2, &[vec![2, 1, 1, 1]]);
        ls.insert_dims(DimType::Out, 1, 1).unwrap();
        assert_eq!(ls.get_div(0), Some(row(&[2, 1, 1, 0, 1, 0]).as_slice()));
        ls.drop_dims(DimType::Out, 1, 1).unwrap();
        assert_eq!(ls.get_div(0), Some(row(&[2, 1, 1, 1, 0]).as_slice()));
        assert!(ls.drop_dims(DimType::Out, 1, 2).is_err());
        ls.insert_dims(DimType::Div, 0, 1).unwrap();
        assert_eq!(ls.n_div(), 2);
        assert!(!ls.div_is_known(0));
        assert!(ls.div_is_known(1));
        ls.drop_dims(DimType::Div, 0, 1).unwrap();
        assert_eq!(ls.get_div(0), Some(row(&[2, 1, 1, 1, 0]).as_slice()));
    }

    #[test]
    fn test_move_dims_to_divs() {
        // floor((i + a) / 2) over (i, a), then project a.
        let mut ls = ls_with_divs(2, &[vec![2, 0, 1, 1]]);
        ls.move_dims_to_divs(DimType::Out, 1, 1).unwrap();
        assert_eq!(ls.dim(DimType::Out), 1);
        assert_eq!(ls.n_div(), 2);
        assert!(!ls.div_is_known(0));
        assert_eq!(ls.get_div(1), Some(row(&[2, 0, 1, 1, 0]).as_slice()));
        assert!(ls.move_dims_to_divs(DimType::Out, 0, 2).is_err());
    }

    #[test]
    fn test_is_div_constraint() {
        // d = floor((i + 1) / 3)
        let ls = ls_with_divs(1, &[vec![3, 1, 1]]);
        // i + 1 - 3d >= 0
        assert!(ls.is_div_constraint(&row(&[1, 1, -3]), 0));
        // -i - 1 + 3d + 2 >= 0
        assert!(ls.is_div_constraint(&row(&[1, -1, 3]), 0));
        assert!(!ls.is_div_constraint(&row(&[0, -1, 3]), 0));
        assert!(!ls.is_div_constraint(&row(&[1, 1, -2]), 0));
    }

    #[test]
    fn test_substitute_equalities() {
        // Dimensions (y, x) with x - 2y = 0; division floor((x + 1) / 4).
        let mut ls = LocalSpace::from_space(set_space(&["y", "x"]));
        ls.add_div(row(&[4, 1, 0, 1])).unwrap();
        ls.substitute_equalities(&[row(&[0, -2, 1, 0])]).unwrap();
        // floor((2y + 1) / 4) normalizes to floor(y / 2).
        assert_eq!(ls.get_div(0), Some(row(&[2, 0, 1, 0, 0]).as_slice()));
        for y in -10i64..10 {
            let before = fdiv_q(&int(2 * y + 1), &int(4));
            let after = fdiv_q(&int(y), &int(2));
            assert_eq!(before, after);
        }
    }

    #[test]
    fn test_substitute_rejects_divs() {
        let mut ls = ls_with_divs(1, &[vec![2, 0, 1]]);
        let mut subs = Aff::var_on_domain(LocalSpace::from_space(Space::set_alloc(0, 1)), DimType::Out, 0).unwrap();
        subs = subs.floor_div(&int(3)).unwrap();
        let err = ls.substitute(DimType::Out, 0, &subs).unwrap_err();
        assert!(matches!(err, PolyError::Unsupported(_)));
    }

    #[test]
    fn test_substitute() {
        // floor(i / 2) with i := (j + 1) / 3 over dims (i, j)
        let space = set_space(&["i", "j"]);
        let mut ls = LocalSpace::from_space(space.clone());
        ls.add_div(row(&[2, 0, 1, 0])).unwrap();
        let subs = Aff::from_vector(LocalSpace::from_space(space), row(&[3, 1, 0, 1])).unwrap();
        ls.substitute(DimType::Out, 0, &subs).unwrap();
        assert_eq!(ls.get_div(0), Some(row(&[6, 1, 0, 1, 0]).as_slice()));
    }

    #[test]
    fn test_order_divs_moves_dependencies_first() {
        // div 0 = floor(div 1 / 2) is stored before div 1 = floor(i / 3).
        let mut div = IntMat::zeros(2, 5);
        *div.row_mut(0) = row(&[2, 0, 0, 0, 1]);
        *div.row_mut(1) = row(&[3, 0, 1, 0, 0]);
        let mut ls = LocalSpace { space: Rc::new(Space::set_alloc(0, 1)), div: Rc::new(div) };
        let swaps = ls.order_divs();
        assert_eq!(swaps, vec![(0, 1)]);
        assert_eq!(ls.get_div(0), Some(row(&[3, 0, 1, 0, 0]).as_slice()));
        assert_eq!(ls.get_div(1), Some(row(&[2, 0, 0, 1, 0]).as_slice()));
    }

    #[test]
    fn test_sort_divs_orders_by_dependency() {
        // floor(j / 2) then floor(i / 2) over (i, j): the second depends on an
        // earlier dimension and must come first.
        let mut ls = ls_with_divs(2, &[vec![2, 0, 0, 1], vec![2, 0, 1, 0]]);
        let swaps = ls.sort_divs();
        assert_eq!(swaps, vec![(0, 1)]);
        assert_eq!(&ls.get_div(0).unwrap()[..4], row(&[2, 0, 1, 0]).as_slice());
        assert!(ls.sort_divs().is_empty());
    }

    #[test]
    fn test_merge_shares_equal_rows() {
        let a = ls_with_divs(1, &[vec![2, 0, 1], vec![3, 0, 1]]);
        let b = ls_with_divs(1, &[vec![3, 0, 1]]);
        let merged = a.merge(&b).unwrap();
        assert_eq!(merged.ls.n_div(), 2);
        assert_eq!(merged.exp1, vec![0, 1]);
        assert_eq!(merged.exp2, vec![1]);

        let (divs, exp1, exp2) = merge_divs(a.divs(), b.divs()).unwrap();
        assert_eq!(divs.n_col(), 5);
        assert_eq!(divs.row(0), &row(&[2, 0, 1, 0, 0])[..]);
        assert_eq!(divs.row(1), &row(&[3, 0, 1, 0, 0])[..]);
        assert_eq!((exp1, exp2), (vec![0, 1], vec![1]));
    }

    #[test]
    fn test_merge_keeps_unknown_divs_apart() {
        let a = LocalSpace::alloc(Space::set_alloc(0, 1), 1);
        let b = LocalSpace::alloc(Space::set_alloc(0, 1), 1);
        let merged = a.merge(&b).unwrap();
        assert_eq!(merged.ls.n_div(), 2);
        assert_eq!(merged.exp1, vec![0]);
        assert_eq!(merged.exp2, vec![1]);
    }

    #[test]
    fn test_intersect_requires_equal_spaces() {
        let a = ls_with_divs(1, &[vec![2, 0, 1]]);
        let b = ls_with_divs(2, &[vec![2, 0, 1, 0]]);
        assert!(matches!(a.intersect(&b), Err(PolyError::Invalid(_))));
        let empty = LocalSpace::from_space(Space::set_alloc(0, 1));
        assert_eq!(empty.intersect(&a).unwrap().n_div(), 1);
        assert_eq!(a.intersect(&empty).unwrap().n_div(), 1);
    }

    #[test]
    fn test_domain_and_range() {
        let mut ls = LocalSpace::from_space(Space::map_alloc(0, 1, 1));
        ls.add_div(row(&[2, 0, 1, 0])).unwrap();
        let dom = ls.domain().unwrap();
        assert!(dom.space().is_set());
        assert_eq!(dom.get_div(0), Some(row(&[2, 0, 1, 0]).as_slice()));
        assert!(ls.range().is_err());
        let back = dom.from_domain().unwrap();
        assert_eq!(back.dim(DimType::In), 1);
        assert_eq!(back.dim(DimType::Out), 0);
    }

    fn arb_divs(n_dim: usize) -> impl Strategy<Value = Vec<(i64, Vec<i64>)>> {
        prop::collection::vec(
            (prop_oneof![Just(0i64), 1i64..5], prop::collection::vec(-2i64..3, n_dim + 1 + 4)),
            0..4,
        )
    }

    fn build(n_dim: usize, divs: &[(i64, Vec<i64>)]) -> LocalSpace {
        let mut ls = LocalSpace::from_space(Space::set_alloc(0, n_dim));
        for (k, (denom, coeffs)) in divs.iter().enumerate() {
            let mut r = vec![int(*denom)];
            if *denom != 0 {
                r.extend(coeffs[..1 + n_dim + k].iter().map(|&v| int(v)));
            } else {
                r.resize(2 + n_dim + k, Int::zero());
            }
            ls.add_div(r).unwrap();
        }
        ls
    }

    fn depends_on_later(ls: &LocalSpace) -> bool {
        let d = 2 + ls.space().total();
        (0..ls.n_div()).any(|k| !seq_is_zero(&ls.divs().row(k)[d + k..]))
    }

    proptest! {
        #[test]
        fn prop_merge_maps_are_monotone(a in arb_divs(2), b in arb_divs(2)) {
            let mut la = build(2, &a);
            let mut lb = build(2, &b);
            la.sort_divs();
            lb.sort_divs();
            let merged = la.merge(&lb).unwrap();
            for (i, &e) in merged.exp1.iter().enumerate() {
                prop_assert!(e >= i);
                if i > 0 { prop_assert!(e > merged.exp1[i - 1]); }
            }
            for (j, &e) in merged.exp2.iter().enumerate() {
                prop_assert!(e >= j);
                if j > 0 { prop_assert!(e > merged.exp2[j - 1]); }
            }
            let d = 2 + la.space().total();
            let n = merged.ls.n_div();
            for (i, &e) in merged.exp1.iter().enumerate() {
                if la.div_is_known(i) {
                    let expanded = expand_row(la.get_div(i).unwrap(), d, &merged.exp1[..i], n);
                    prop_assert_eq!(expanded.as_slice(), merged.ls.get_div(e).unwrap());
                }
            }
            for (j, &e) in merged.exp2.iter().enumerate() {
                if lb.div_is_known(j) {
                    let expanded = expand_row(lb.get_div(j).unwrap(), d, &merged.exp2[..j], n);
                    prop_assert_eq!(expanded.as_slice(), merged.ls.get_div(e).unwrap());
                }
            }
            prop_assert!(!depends_on_later(&merged.ls));
        }

        #[test]
        fn prop_sort_divs_swaps_replay(a in arb_divs(2)) {
            let original = build(2, &a);
            let mut sorted = original.clone();
            let swaps = sorted.sort_divs();
            prop_assert!(!depends_on_later(&sorted));
            let mut replayed = original;
            for (x, y) in swaps {
                replayed.swap_div(x, y);
            }
            prop_assert_eq!(replayed, sorted);
        }

        #[test]
        fn prop_sort_divs_idempotent(
            defs in prop::collection::vec((1i64..5, prop::collection::vec(-3i64..4, 3)), 0..5)
        ) {
            let mut ls = LocalSpace::from_space(Space::set_alloc(0, 2));
            for (denom, coeffs) in &defs {
                let mut r = vec![int(*denom)];
                r.extend(coeffs.iter().map(|&v| int(v)));
                r.resize(ls.divs().n_col(), Int::zero());
                ls.add_div(r).unwrap();
            }
            ls.sort_divs();
            let sorted = ls.clone();
            prop_assert!(ls.sort_divs().is_empty());
            prop_assert_eq!(ls, sorted);
        }
    }
}
