//! Integer sequences and matrices.
//!
//! Constraint rows, affine expressions and division definitions are all
//! stored as plain sequences of arbitrary precision integers. The helpers
//! in this module implement the handful of row operations the rest of the
//! crate needs (combination, elimination, gcd normalization) together with
//! a small dense matrix used for division lists.

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Signed, Zero};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::utils::errors::{PolyError, PolyResult};

/// Arbitrary precision integer used for every coefficient.
pub type Int = BigInt;

/// Shorthand for building an [`Int`] from a machine integer.
pub fn int(v: i64) -> Int {
    Int::from(v)
}

/// Floor division.
pub fn fdiv_q(a: &Int, b: &Int) -> Int {
    a.div_floor(b)
}

/// Remainder of floor division (same sign as `b`).
pub fn fdiv_r(a: &Int, b: &Int) -> Int {
    a.mod_floor(b)
}

/// Ceiling division.
pub fn cdiv_q(a: &Int, b: &Int) -> Int {
    -((-a).div_floor(b))
}

/// Returns true if every entry is zero.
pub fn seq_is_zero(s: &[Int]) -> bool {
    s.iter().all(Zero::is_zero)
}

/// Position of the first non-zero entry.
pub fn seq_first_non_zero(s: &[Int]) -> Option<usize> {
    s.iter().position(|v| !v.is_zero())
}

/// Position of the last non-zero entry.
pub fn seq_last_non_zero(s: &[Int]) -> Option<usize> {
    s.iter().rposition(|v| !v.is_zero())
}

/// Greatest common divisor of all entries, zero for an all-zero sequence.
pub fn seq_gcd(s: &[Int]) -> Int {
    let mut g = Int::zero();
    for v in s {
        if v.is_zero() {
            continue;
        }
        g = g.gcd(v);
        if g.is_one() {
            break;
        }
    }
    g
}

/// Negate every entry in place.
pub fn seq_neg(s: &mut [Int]) {
    for v in s.iter_mut() {
        *v = -&*v;
    }
}

/// Multiply every entry by `f`.
pub fn seq_scale(s: &mut [Int], f: &Int) {
    for v in s.iter_mut() {
        *v *= f;
    }
}

/// Divide every entry by `f`; the division must be exact.
pub fn seq_scale_down(s: &mut [Int], f: &Int) {
    for v in s.iter_mut() {
        *v = &*v / f;
    }
}

/// `dst = m1 * dst + m2 * src`, entry by entry.
pub fn seq_combine(dst: &mut [Int], m1: &Int, m2: &Int, src: &[Int]) {
    for (d, s) in dst.iter_mut().zip(src) {
        *d = m1 * &*d + m2 * s;
    }
}

/// Eliminate the coefficient at `pos` of `dst` using `src`.
///
/// `dst` is replaced by a positive multiple of itself plus a multiple of
/// `src` such that `dst[pos]` becomes zero. The positive multiplier applied
/// to `dst` is also applied to `m` when given, which keeps a denominator
/// stored outside the sequence consistent.
pub fn seq_elim(dst: &mut [Int], src: &[Int], pos: usize, m: Option<&mut Int>) {
    if dst[pos].is_zero() {
        return;
    }
    let g = src[pos].gcd(&dst[pos]);
    let mut b = &dst[pos] / &g;
    if src[pos].is_positive() {
        b = -b;
    }
    let a = (&src[pos] / &g).abs();
    seq_combine(dst, &a, &b, src);
    if let Some(m) = m {
        *m *= &a;
    }
}

/// Lexicographic comparison.
pub fn seq_cmp(a: &[Int], b: &[Int]) -> Ordering {
    for (x, y) in a.iter().zip(b) {
        match x.cmp(y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    a.len().cmp(&b.len())
}

/// Inner product of two sequences of equal length.
pub fn seq_inner_product(a: &[Int], b: &[Int]) -> Int {
    a.iter().zip(b).fold(Int::zero(), |acc, (x, y)| acc + x * y)
}

/// Least common multiple of two positive integers.
pub fn lcm(a: &Int, b: &Int) -> Int {
    a.lcm(b)
}

/// Integer power with a small non-negative exponent.
pub fn pow(base: &Int, exp: u32) -> Int {
    num_traits::pow(base.clone(), exp as usize)
}

/// Returns true if `v` is one.
pub fn is_one(v: &Int) -> bool {
    v.is_one()
}

/// A dense integer matrix with rows of uniform width.
///
/// Used for division lists, where row `i` is
/// `[denominator, constant, coefficients..., division coefficients...]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct IntMat {
    n_col: usize,
    rows: Vec<Vec<Int>>,
}

impl IntMat {
    /// An empty matrix with the given number of columns.
    pub fn new(n_col: usize) -> Self {
        Self { n_col, rows: Vec::new() }
    }

    /// A zero matrix.
    pub fn zeros(n_row: usize, n_col: usize) -> Self {
        Self {
            n_col,
            rows: vec![vec![Int::zero(); n_col]; n_row],
        }
    }

    /// Build from explicit rows; all rows must have width `n_col`.
    pub fn from_rows(n_col: usize, rows: Vec<Vec<Int>>) -> PolyResult<Self> {
        if let Some(bad) = rows.iter().find(|r| r.len() != n_col) {
            return Err(PolyError::invalid(format!(
                "row of width {} in matrix with {} columns",
                bad.len(),
                n_col
            )));
        }
        Ok(Self { n_col, rows })
    }

    /// Number of rows.
    pub fn n_row(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    pub fn n_col(&self) -> usize {
        self.n_col
    }

    /// Borrow a row.
    pub fn row(&self, i: usize) -> &[Int] {
        &self.rows[i]
    }

    /// Mutably borrow a row.
    pub fn row_mut(&mut self, i: usize) -> &mut Vec<Int> {
        &mut self.rows[i]
    }

    /// All rows.
    pub fn rows(&self) -> &[Vec<Int>] {
        &self.rows
    }

    /// Append a row, checking its width.
    pub fn push_row(&mut self, row: Vec<Int>) -> PolyResult<()> {
        if row.len() != self.n_col {
            return Err(PolyError::invalid(format!(
                "row of width {} in matrix with {} columns",
                row.len(),
                self.n_col
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Insert `n` zero columns before column `pos`.
    pub fn insert_zero_cols(&mut self, pos: usize, n: usize) {
        for row in &mut self.rows {
            row.splice(pos..pos, std::iter::repeat(Int::zero()).take(n));
        }
        self.n_col += n;
    }

    /// Append `n` zero columns.
    pub fn add_zero_cols(&mut self, n: usize) {
        let pos = self.n_col;
        self.insert_zero_cols(pos, n);
    }

    /// Remove columns `pos..pos + n`.
    pub fn drop_cols(&mut self, pos: usize, n: usize) {
        for row in &mut self.rows {
            row.drain(pos..pos + n);
        }
        self.n_col -= n;
    }

    /// Insert `n` zero rows before row `pos`.
    pub fn insert_zero_rows(&mut self, pos: usize, n: usize) {
        let zero = vec![Int::zero(); self.n_col];
        self.rows
            .splice(pos..pos, std::iter::repeat(zero).take(n));
    }

    /// Remove rows `pos..pos + n`.
    pub fn drop_rows(&mut self, pos: usize, n: usize) {
        self.rows.drain(pos..pos + n);
    }

    /// Swap two rows.
    pub fn swap_rows(&mut self, i: usize, j: usize) {
        self.rows.swap(i, j);
    }

    /// Move columns `src..src + n` so that they start at column `dst` of
    /// the result.
    pub fn move_cols(&mut self, src: usize, n: usize, dst: usize) {
        for row in &mut self.rows {
            move_entries(row, src, n, dst);
        }
    }

    /// Swap two columns in every row.
    pub fn swap_cols(&mut self, i: usize, j: usize) {
        for row in &mut self.rows {
            row.swap(i, j);
        }
    }
}

impl fmt::Display for IntMat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, row) in self.rows.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "[")?;
            for (j, v) in row.iter().enumerate() {
                if j > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{}", v)?;
            }
            write!(f, "]")?;
        }
        write!(f, "]")
    }
}

/// Move entries `src..src + n` of `row` so that they start at `dst` of the
/// result.
pub fn move_entries(row: &mut Vec<Int>, src: usize, n: usize, dst: usize) {
    let moved: Vec<Int> = row.drain(src..src + n).collect();
    row.splice(dst..dst, moved);
}

/// Build a row of [`Int`]s from machine integers.
pub fn row(values: &[i64]) -> Vec<Int> {
    values.iter().map(|&v| int(v)).collect()
}
