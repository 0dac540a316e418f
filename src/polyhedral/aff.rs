//! Quasi-affine expressions over a local space.
//!
//! An [`Aff`] is stored as `[denominator, constant, coefficients of the
//! tuple dimensions, coefficients of divisions]` and denotes
//! `(constant + coefficients . x) / denominator`. The denominator is always
//! positive. Integer division and modulo introduce new divisions in the
//! local space.

use num_rational::BigRational;
use num_traits::{One, Signed, Zero};
use serde::{Deserialize, Serialize};

use crate::polyhedral::local_space::{expand_row, LocalSpace};
use crate::polyhedral::space::{DimType, Space};
use crate::utils::errors::{PolyError, PolyResult};
use crate::utils::matrix::{
    fdiv_q, fdiv_r, lcm, seq_gcd, seq_inner_product, seq_is_zero, seq_neg, seq_scale, Int,
};

/// An affine expression with a denominator, over a local space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aff {
    ls: LocalSpace,
    v: Vec<Int>,
}

impl Aff {
    /// The zero expression.
    pub fn zero_on_domain(ls: LocalSpace) -> Self {
        let mut v = vec![Int::zero(); 2 + ls.dim_all()];
        v[0] = Int::one();
        Self { ls, v }
    }

    /// A constant expression.
    pub fn val_on_domain(ls: LocalSpace, value: Int) -> Self {
        let mut aff = Self::zero_on_domain(ls);
        aff.v[1] = value;
        aff
    }

    /// The expression equal to dimension `(kind, pos)`.
    pub fn var_on_domain(ls: LocalSpace, kind: DimType, pos: usize) -> PolyResult<Self> {
        if pos >= ls.dim(kind) {
            return Err(PolyError::invalid(format!(
                "position {} out of bounds for {:?} dimensions",
                pos, kind
            )));
        }
        let col = 2 + ls.offset(kind) + pos;
        let mut aff = Self::zero_on_domain(ls);
        aff.v[col] = Int::one();
        Ok(aff)
    }

    /// Build from an explicit vector.
    pub fn from_vector(ls: LocalSpace, v: Vec<Int>) -> PolyResult<Self> {
        if v.len() != 2 + ls.dim_all() {
            return Err(PolyError::invalid(format!(
                "affine vector of length {} for local space of width {}",
                v.len(),
                2 + ls.dim_all()
            )));
        }
        if !v[0].is_positive() {
            return Err(PolyError::invalid("affine denominator must be positive"));
        }
        let mut aff = Self { ls, v };
        aff.normalize();
        Ok(aff)
    }

    pub fn local_space(&self) -> &LocalSpace {
        &self.ls
    }

    pub fn space(&self) -> &Space {
        self.ls.space()
    }

    /// `[denominator, constant, coefficients...]`.
    pub fn vector(&self) -> &[Int] {
        &self.v
    }

    pub fn denominator(&self) -> &Int {
        &self.v[0]
    }

    pub fn constant(&self) -> &Int {
        &self.v[1]
    }

    /// Returns true if no dimension or division appears.
    pub fn is_cst(&self) -> bool {
        seq_is_zero(&self.v[2..])
    }

    /// Numerator as a constraint row `[constant, coefficients...]`.
    pub fn numerator(&self) -> &[Int] {
        &self.v[1..]
    }

    fn normalize(&mut self) {
        let g = seq_gcd(&self.v);
        if g.is_zero() || g.is_one() {
            return;
        }
        for e in self.v.iter_mut() {
            *e = &*e / &g;
        }
    }

    /// Replace the tuple space by one with the same dimension counts.
    pub fn reset_space(mut self, space: Space) -> PolyResult<Self> {
        self.ls.reset_space(space)?;
        Ok(self)
    }

    /// Insert `n` dimensions of `kind` before `first`.
    pub fn insert_dims(&mut self, kind: DimType, first: usize, n: usize) -> PolyResult<()> {
        let col = 2 + self.ls.offset(kind) + first;
        self.ls.insert_dims(kind, first, n)?;
        self.v.splice(col..col, std::iter::repeat(Int::zero()).take(n));
        Ok(())
    }

    /// Append `n` dimensions of `kind`.
    pub fn add_dims(&mut self, kind: DimType, n: usize) -> PolyResult<()> {
        let pos = self.ls.dim(kind);
        self.insert_dims(kind, pos, n)
    }

    /// Bring two expressions into a common local space; returns the
    /// merged local space and both vectors expanded into it.
    fn align(&self, other: &Aff) -> PolyResult<(LocalSpace, Vec<Int>, Vec<Int>)> {
        let merged = self.ls.merge(&other.ls)?;
        let n_div = merged.ls.n_div();
        let prefix = 2 + self.ls.space().total();
        let v1 = expand_row(&self.v, prefix, &merged.exp1, n_div);
        let v2 = expand_row(&other.v, prefix, &merged.exp2, n_div);
        Ok((merged.ls, v1, v2))
    }

    /// Sum of two expressions over the same space.
    pub fn add(&self, other: &Aff) -> PolyResult<Aff> {
        let (ls, v1, v2) = self.align(other)?;
        let l = lcm(&v1[0], &v2[0]);
        let f1 = &l / &v1[0];
        let f2 = &l / &v2[0];
        let mut v = Vec::with_capacity(v1.len());
        v.push(l);
        for (a, b) in v1[1..].iter().zip(&v2[1..]) {
            v.push(&f1 * a + &f2 * b);
        }
        let mut aff = Aff { ls, v };
        aff.normalize();
        Ok(aff)
    }

    /// Difference of two expressions over the same space.
    pub fn sub(&self, other: &Aff) -> PolyResult<Aff> {
        self.add(&other.neg())
    }

    pub fn neg(&self) -> Aff {
        let mut aff = self.clone();
        seq_neg(&mut aff.v[1..]);
        aff
    }

    /// Add an integer constant.
    pub fn add_constant(&self, c: &Int) -> Aff {
        let mut aff = self.clone();
        aff.v[1] += c * &self.v[0];
        aff
    }

    /// Multiply by an integer.
    pub fn scale(&self, f: &Int) -> Aff {
        let mut aff = self.clone();
        if f.is_zero() {
            return Aff::zero_on_domain(aff.ls);
        }
        seq_scale(&mut aff.v[1..], f);
        aff.normalize();
        aff
    }

    /// Divide by a positive integer.
    pub fn scale_down(&self, f: &Int) -> PolyResult<Aff> {
        if !f.is_positive() {
            return Err(PolyError::invalid(format!("cannot divide by non-positive value {}", f)));
        }
        let mut aff = self.clone();
        let g = num_integer::Integer::gcd(&seq_gcd(&aff.v[1..]), f);
        let f = if g.is_zero() { f.clone() } else { f / &g };
        if !g.is_zero() && !g.is_one() {
            for e in aff.v[1..].iter_mut() {
                *e = &*e / &g;
            }
        }
        aff.v[0] *= f;
        Ok(aff)
    }

    /// Greatest integer not above the expression.
    ///
    /// The numerator coefficients are split as `e = q m + r` with `r`
    /// in `(-m/2, m/2]`; the integer parts stay in the expression and the
    /// remainders become a new division.
    pub fn floor(&self) -> PolyResult<Aff> {
        if self.v[0].is_one() {
            return Ok(self.clone());
        }
        let mut aff = self.clone();
        let m = aff.v[0].clone();
        if aff.is_cst() {
            aff.v[1] = fdiv_q(&aff.v[1], &m);
            aff.v[0] = Int::one();
            return Ok(aff);
        }
        let half = fdiv_q(&m, &Int::from(2));
        let mut div = Vec::with_capacity(aff.v.len());
        div.push(m.clone());
        for e in aff.v[1..].iter_mut() {
            let mut r = fdiv_r(e, &m);
            let mut q = fdiv_q(e, &m);
            if r > half {
                r -= &m;
                q += 1;
            }
            div.push(r);
            *e = q;
        }
        aff.v[0] = Int::one();
        let k = aff.ls.add_div(div)?;
        aff.ls.normalize_div(k);
        aff.v.push(Int::one());
        Ok(aff)
    }

    /// Least integer not below the expression.
    pub fn ceil(&self) -> PolyResult<Aff> {
        Ok(self.neg().floor()?.neg())
    }

    /// `floor(self / d)` for a positive integer `d`.
    pub fn floor_div(&self, d: &Int) -> PolyResult<Aff> {
        self.scale_down(d)?.floor()
    }

    /// `ceil(self / d)` for a positive integer `d`.
    pub fn ceil_div(&self, d: &Int) -> PolyResult<Aff> {
        self.scale_down(d)?.ceil()
    }

    /// `self - m * floor(self / m)` for a positive integer `m`.
    pub fn mod_val(&self, m: &Int) -> PolyResult<Aff> {
        let q = self.floor_div(m)?;
        self.sub(&q.scale(m))
    }

    /// Evaluate at a point given values for every tuple dimension.
    ///
    /// Divisions are computed from their definitions; an expression over a
    /// division of unknown definition cannot be evaluated.
    pub fn eval(&self, point: &[Int]) -> PolyResult<BigRational> {
        let total = self.ls.space().total();
        if point.len() != total {
            return Err(PolyError::invalid(format!(
                "point with {} coordinates for {} dimensions",
                point.len(),
                total
            )));
        }
        let mut values = Vec::with_capacity(1 + self.ls.dim_all());
        values.push(Int::one());
        values.extend(point.iter().cloned());
        for k in 0..self.ls.n_div() {
            let div = self.ls.get_div(k).unwrap_or(&[]);
            if div.first().map_or(true, Zero::is_zero) {
                if self.v[2 + total + k].is_zero() {
                    values.push(Int::zero());
                    continue;
                }
                return Err(PolyError::unsupported("evaluating a division of unknown definition"));
            }
            let num = seq_inner_product(&div[1..1 + values.len()], &values);
            values.push(fdiv_q(&num, &div[0]));
        }
        let num = seq_inner_product(&self.v[1..], &values);
        Ok(BigRational::new(num, self.v[0].clone()))
    }
}
