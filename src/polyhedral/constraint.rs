//! Linear constraints over a local space.
//!
//! A constraint row is `[constant, coefficients of the tuple dimensions,
//! coefficients of divisions]`:
//! - Inequality: row . (1, x) >= 0
//! - Equality: row . (1, x) = 0

use num_integer::Integer;
use num_traits::{One, Signed, Zero};
use serde::{Deserialize, Serialize};

use crate::utils::matrix::{fdiv_q, move_entries, seq_gcd, seq_inner_product, seq_is_zero, Int};

/// A linear constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Constraint {
    /// Constant followed by one coefficient per dimension and division
    pub row: Vec<Int>,
    /// Kind of constraint
    pub kind: ConstraintKind,
}

/// Kind of constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstraintKind {
    /// Greater than or equal: row >= 0
    Inequality,
    /// Equal: row = 0
    Equality,
}

/// Outcome of normalizing a constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    /// The constraint carries information and has been reduced
    Kept,
    /// Satisfied by every point
    Trivial,
    /// Satisfied by no point
    Infeasible,
}

impl Constraint {
    /// Create a new constraint.
    pub fn new(row: Vec<Int>, kind: ConstraintKind) -> Self {
        Self { row, kind }
    }

    /// Create an inequality constraint: row >= 0
    pub fn ge_zero(row: Vec<Int>) -> Self {
        Self::new(row, ConstraintKind::Inequality)
    }

    /// Create an equality constraint: row = 0
    pub fn eq_zero(row: Vec<Int>) -> Self {
        Self::new(row, ConstraintKind::Equality)
    }

    pub fn is_equality(&self) -> bool {
        matches!(self.kind, ConstraintKind::Equality)
    }

    pub fn is_inequality(&self) -> bool {
        matches!(self.kind, ConstraintKind::Inequality)
    }

    /// Number of entries, constant included.
    pub fn width(&self) -> usize {
        self.row.len()
    }

    /// Check the constraint at `values = [1, x...]`.
    pub fn is_satisfied(&self, values: &[Int]) -> bool {
        let value = seq_inner_product(&self.row, values);
        match self.kind {
            ConstraintKind::Inequality => !value.is_negative(),
            ConstraintKind::Equality => value.is_zero(),
        }
    }

    /// Constraints whose disjunction is the complement of this one.
    ///
    /// `e >= 0` becomes `-e - 1 >= 0`; `e = 0` becomes the pair
    /// `e - 1 >= 0`, `-e - 1 >= 0`.
    pub fn complements(&self) -> Vec<Constraint> {
        let negated = |row: &[Int]| {
            let mut neg: Vec<Int> = row.iter().map(|v| -v).collect();
            neg[0] -= 1;
            Constraint::ge_zero(neg)
        };
        match self.kind {
            ConstraintKind::Inequality => vec![negated(&self.row)],
            ConstraintKind::Equality => {
                let mut pos = self.row.clone();
                pos[0] -= 1;
                vec![Constraint::ge_zero(pos), negated(&self.row)]
            }
        }
    }

    /// The two inequalities equivalent to this constraint when it is an
    /// equality, or the constraint itself.
    pub fn as_inequalities(&self) -> Vec<Constraint> {
        match self.kind {
            ConstraintKind::Inequality => vec![self.clone()],
            ConstraintKind::Equality => vec![
                Constraint::ge_zero(self.row.clone()),
                Constraint::ge_zero(self.row.iter().map(|v| -v).collect()),
            ],
        }
    }

    /// Divide by the gcd of the coefficients, rounding the constant of an
    /// inequality down, and classify constraints without coefficients.
    pub fn normalize(&mut self) -> Normalized {
        let g = seq_gcd(&self.row[1..]);
        if g.is_zero() {
            let holds = match self.kind {
                ConstraintKind::Inequality => !self.row[0].is_negative(),
                ConstraintKind::Equality => self.row[0].is_zero(),
            };
            return if holds { Normalized::Trivial } else { Normalized::Infeasible };
        }
        if self.is_equality() && !self.row[0].is_multiple_of(&g) {
            return Normalized::Infeasible;
        }
        if !g.is_one() {
            for v in self.row[1..].iter_mut() {
                *v = &*v / &g;
            }
            self.row[0] = fdiv_q(&self.row[0], &g);
        }
        Normalized::Kept
    }

    /// Same constraint, an equality being equal to its negation.
    pub fn is_same(&self, other: &Constraint) -> bool {
        if self.kind != other.kind {
            return false;
        }
        self.row == other.row
            || (self.is_equality() && self.row.iter().zip(&other.row).all(|(a, b)| *a == -b))
    }

    /// Returns true if `other` is `-self` up to the constant.
    pub fn is_opposite(&self, other: &Constraint) -> bool {
        self.row.len() == other.row.len()
            && self.row[1..].iter().zip(&other.row[1..]).all(|(a, b)| *a == -b)
    }

    /// Insert `n` zero coefficients before entry `pos`.
    pub fn insert_zeros(&mut self, pos: usize, n: usize) {
        self.row.splice(pos..pos, std::iter::repeat(Int::zero()).take(n));
    }

    /// Move entries `src..src + n` to start at `dst`.
    pub fn move_entries(&mut self, src: usize, n: usize, dst: usize) {
        move_entries(&mut self.row, src, n, dst);
    }

    /// Returns true if no coefficient from `start` on is non-zero.
    pub fn is_zero_from(&self, start: usize) -> bool {
        start >= self.row.len() || seq_is_zero(&self.row[start..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::matrix::row;

    #[test]
    fn test_is_satisfied() {
        // i - 3 >= 0
        let c = Constraint::ge_zero(row(&[-3, 1]));
        assert!(c.is_satisfied(&row(&[1, 3])));
        assert!(!c.is_satisfied(&row(&[1, 2])));
        let e = Constraint::eq_zero(row(&[-3, 1]));
        assert!(e.is_satisfied(&row(&[1, 3])));
        assert!(!e.is_satisfied(&row(&[1, 4])));
    }

    #[test]
    fn test_complements() {
        let c = Constraint::ge_zero(row(&[-3, 1]));
        assert_eq!(c.complements(), vec![Constraint::ge_zero(row(&[2, -1]))]);
        let e = Constraint::eq_zero(row(&[0, 1]));
        let parts = e.complements();
        assert_eq!(parts.len(), 2);
        for i in -3..=3 {
            let values = row(&[1, i]);
            let outside = parts.iter().any(|p| p.is_satisfied(&values));
            assert_eq!(outside, !e.is_satisfied(&values));
        }
    }

    #[test]
    fn test_normalize() {
        let mut c = Constraint::ge_zero(row(&[3, 2, -4]));
        assert_eq!(c.normalize(), Normalized::Kept);
        assert_eq!(c.row, row(&[1, 1, -2]));

        let mut e = Constraint::eq_zero(row(&[1, 2, 4]));
        assert_eq!(e.normalize(), Normalized::Infeasible);

        let mut e = Constraint::eq_zero(row(&[2, -2, 4]));
        assert_eq!(e.normalize(), Normalized::Kept);
        assert_eq!(e.row, row(&[1, -1, 2]));

        let mut t = Constraint::ge_zero(row(&[0, 0]));
        assert_eq!(t.normalize(), Normalized::Trivial);
        let mut f = Constraint::ge_zero(row(&[-1, 0]));
        assert_eq!(f.normalize(), Normalized::Infeasible);
    }
}
