//! Piecewise quasi-affine functions.
//!
//! A [`PwAff`] is a list of `(domain, expression)` pieces with pairwise
//! disjoint domains, all over the same domain space. Outside the union of
//! the domains the function is undefined.

use log::{debug, warn};
use num_rational::BigRational;
use num_traits::One;
use serde::{Deserialize, Serialize};

use crate::polyhedral::aff::Aff;
use crate::polyhedral::basic_map::BasicMap;
use crate::polyhedral::constraint::ConstraintKind;
use crate::polyhedral::local_space::LocalSpace;
use crate::polyhedral::map::Set;
use crate::polyhedral::space::Space;
use crate::utils::errors::{PolyError, PolyResult};
use crate::utils::matrix::Int;

/// Comparison between two expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CmpOp {
    Eq,
    Ne,
    Le,
    Lt,
    Ge,
    Gt,
}

/// A piecewise quasi-affine function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PwAff {
    space: Space,
    pieces: Vec<(Set, Aff)>,
}

impl PwAff {
    /// The function defined nowhere.
    pub fn empty(space: Space) -> Self {
        Self { space, pieces: Vec::new() }
    }

    /// A single expression over the whole domain space.
    pub fn from_aff(aff: Aff) -> Self {
        let space = aff.space().clone();
        let dom = Set::universe(space.clone());
        Self { space, pieces: vec![(dom, aff)] }
    }

    /// A single expression restricted to `dom`.
    pub fn alloc(dom: Set, aff: Aff) -> PolyResult<Self> {
        if !dom.space().is_equal(aff.space()) {
            return Err(PolyError::invalid(format!(
                "domain {} does not match expression space {}",
                dom.space(),
                aff.space()
            )));
        }
        let mut pa = Self::empty(dom.space().clone());
        pa.push(dom, aff);
        Ok(pa)
    }

    /// A constant over the whole domain space.
    pub fn val(space: Space, value: Int) -> Self {
        Self::from_aff(Aff::val_on_domain(LocalSpace::from_space(space), value))
    }

    fn push(&mut self, dom: Set, aff: Aff) {
        if !dom.is_obviously_empty() {
            self.pieces.push((dom, aff));
        }
    }

    pub fn space(&self) -> &Space {
        &self.space
    }

    pub fn pieces(&self) -> &[(Set, Aff)] {
        &self.pieces
    }

    pub fn n_piece(&self) -> usize {
        self.pieces.len()
    }

    /// Defined nowhere.
    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    /// Union of the piece domains.
    pub fn domain(&self) -> PolyResult<Set> {
        let mut dom = Set::empty(self.space.clone());
        for (d, _) in &self.pieces {
            dom = dom.union(d)?;
        }
        Ok(dom)
    }

    fn check_space(&self, other: &PwAff) -> PolyResult<()> {
        if !self.space.is_equal(&other.space) {
            return Err(PolyError::invalid(format!(
                "spaces don't match: {} vs {}",
                self.space, other.space
            )));
        }
        Ok(())
    }

    fn map_affs(&self, f: impl Fn(&Aff) -> PolyResult<Aff>) -> PolyResult<PwAff> {
        let mut pieces = Vec::with_capacity(self.pieces.len());
        for (dom, aff) in &self.pieces {
            pieces.push((dom.clone(), f(aff)?));
        }
        Ok(PwAff { space: self.space.clone(), pieces })
    }

    /// Combine the expressions of every pair of overlapping pieces.
    fn on_shared_domain(
        &self,
        other: &PwAff,
        f: impl Fn(&Aff, &Aff) -> PolyResult<Aff>,
    ) -> PolyResult<PwAff> {
        self.check_space(other)?;
        let mut result = PwAff::empty(self.space.clone());
        for (d1, a1) in &self.pieces {
            for (d2, a2) in &other.pieces {
                let dom = d1.intersect(d2)?;
                if dom.is_obviously_empty() {
                    continue;
                }
                result.push(dom, f(a1, a2)?);
            }
        }
        Ok(result)
    }

    pub fn add(&self, other: &PwAff) -> PolyResult<PwAff> {
        self.on_shared_domain(other, |a, b| a.add(b))
    }

    pub fn sub(&self, other: &PwAff) -> PolyResult<PwAff> {
        self.on_shared_domain(other, |a, b| a.sub(b))
    }

    pub fn neg(&self) -> PwAff {
        PwAff {
            space: self.space.clone(),
            pieces: self.pieces.iter().map(|(d, a)| (d.clone(), a.neg())).collect(),
        }
    }

    /// Multiply by an integer.
    pub fn scale(&self, f: &Int) -> PwAff {
        PwAff {
            space: self.space.clone(),
            pieces: self.pieces.iter().map(|(d, a)| (d.clone(), a.scale(f))).collect(),
        }
    }

    /// Divide by a positive integer.
    pub fn scale_down(&self, f: &Int) -> PolyResult<PwAff> {
        self.map_affs(|a| a.scale_down(f))
    }

    pub fn add_constant(&self, c: &Int) -> PwAff {
        PwAff {
            space: self.space.clone(),
            pieces: self.pieces.iter().map(|(d, a)| (d.clone(), a.add_constant(c))).collect(),
        }
    }

    pub fn floor(&self) -> PolyResult<PwAff> {
        self.map_affs(Aff::floor)
    }

    pub fn ceil(&self) -> PolyResult<PwAff> {
        self.map_affs(Aff::ceil)
    }

    /// Remainder of floor division by a positive integer.
    pub fn mod_val(&self, m: &Int) -> PolyResult<PwAff> {
        self.map_affs(|a| a.mod_val(m))
    }

    /// Restrict every piece to `set`.
    pub fn intersect_domain(&self, set: &Set) -> PolyResult<PwAff> {
        let mut result = PwAff::empty(self.space.clone());
        for (dom, aff) in &self.pieces {
            result.push(dom.intersect(set)?, aff.clone());
        }
        Ok(result)
    }

    /// Replace the domain space by one with the same dimension counts.
    pub fn reset_space(&self, space: Space) -> PolyResult<PwAff> {
        let mut pieces = Vec::with_capacity(self.pieces.len());
        for (dom, aff) in &self.pieces {
            let mut dom = dom.clone();
            dom.reset_space(space.clone())?;
            pieces.push((dom, aff.clone().reset_space(space.clone())?));
        }
        Ok(PwAff { space, pieces })
    }

    /// The sum where both functions are defined, and whichever is defined
    /// elsewhere.
    pub fn union_add(&self, other: &PwAff) -> PolyResult<PwAff> {
        self.check_space(other)?;
        let both = self.add(other)?;
        if both.is_empty() {
            let mut result = self.clone();
            for (d, a) in &other.pieces {
                let mut d = d.clone();
                d.reset_space(self.space.clone())?;
                result.push(d, a.clone());
            }
            return Ok(result);
        }
        let dom1 = self.domain()?;
        let dom2 = other.domain()?;
        let mut result = both;
        for (d, a) in &self.pieces {
            result.push(d.subtract(&dom2)?, a.clone());
        }
        for (d, a) in &other.pieces {
            result.push(d.subtract(&dom1)?, a.clone());
        }
        Ok(result)
    }

    /// Set of domain points where `self op other` holds, over the shared
    /// domain of the two functions.
    pub fn cmp_set(&self, other: &PwAff, op: CmpOp) -> PolyResult<Set> {
        self.check_space(other)?;
        let mut result = Set::empty(self.space.clone());
        for (d1, a1) in &self.pieces {
            for (d2, a2) in &other.pieces {
                let dom = d1.intersect(d2)?;
                if dom.is_obviously_empty() {
                    continue;
                }
                let rel = compare(&a1.sub(a2)?, op)?;
                result = result.union(&dom.intersect(&rel)?)?;
            }
        }
        Ok(result)
    }

    pub fn eq_set(&self, other: &PwAff) -> PolyResult<Set> {
        self.cmp_set(other, CmpOp::Eq)
    }

    pub fn ne_set(&self, other: &PwAff) -> PolyResult<Set> {
        self.cmp_set(other, CmpOp::Ne)
    }

    pub fn le_set(&self, other: &PwAff) -> PolyResult<Set> {
        self.cmp_set(other, CmpOp::Le)
    }

    pub fn lt_set(&self, other: &PwAff) -> PolyResult<Set> {
        self.cmp_set(other, CmpOp::Lt)
    }

    pub fn ge_set(&self, other: &PwAff) -> PolyResult<Set> {
        self.cmp_set(other, CmpOp::Ge)
    }

    pub fn gt_set(&self, other: &PwAff) -> PolyResult<Set> {
        self.cmp_set(other, CmpOp::Gt)
    }

    /// Pointwise minimum over the shared domain.
    pub fn min(&self, other: &PwAff) -> PolyResult<PwAff> {
        self.select(other, CmpOp::Le)
    }

    /// Pointwise maximum over the shared domain.
    pub fn max(&self, other: &PwAff) -> PolyResult<PwAff> {
        self.select(other, CmpOp::Ge)
    }

    /// `self` where `self op other` holds, `other` elsewhere.
    fn select(&self, other: &PwAff, op: CmpOp) -> PolyResult<PwAff> {
        self.check_space(other)?;
        let negated = match op {
            CmpOp::Le => CmpOp::Gt,
            _ => CmpOp::Lt,
        };
        let mut result = PwAff::empty(self.space.clone());
        for (d1, a1) in &self.pieces {
            for (d2, a2) in &other.pieces {
                let dom = d1.intersect(d2)?;
                if dom.is_obviously_empty() {
                    continue;
                }
                let diff = a1.sub(a2)?;
                result.push(dom.intersect(&compare(&diff, op)?)?, a1.clone());
                result.push(dom.intersect(&compare(&diff, negated)?)?, a2.clone());
            }
        }
        Ok(result)
    }

    /// Points of the domain where the function is zero.
    pub fn zero_set(&self) -> PolyResult<Set> {
        self.value_set(CmpOp::Eq)
    }

    /// Points of the domain where the function is not zero.
    pub fn non_zero_set(&self) -> PolyResult<Set> {
        self.value_set(CmpOp::Ne)
    }

    fn value_set(&self, op: CmpOp) -> PolyResult<Set> {
        let mut result = Set::empty(self.space.clone());
        for (dom, aff) in &self.pieces {
            result = result.union(&dom.intersect(&compare(aff, op)?)?)?;
        }
        Ok(result)
    }

    /// The function equal to one on `set` and zero on the rest of its
    /// space.
    pub fn indicator(set: &Set) -> PolyResult<PwAff> {
        let space = set.space().clone();
        let ls = LocalSpace::from_space(space.clone());
        let complement = Set::universe(space.clone()).subtract(set)?;
        let mut pa = PwAff::empty(space);
        pa.push(set.clone(), Aff::val_on_domain(ls.clone(), Int::one()));
        pa.push(complement, Aff::zero_on_domain(ls));
        Ok(pa)
    }

    /// `if_true` where `cond` is non-zero and `if_false` where it is zero.
    ///
    /// The result is undefined wherever the selected branch is undefined;
    /// no check is made that the branches cover their parts of the domain.
    pub fn cond(cond: &PwAff, if_true: &PwAff, if_false: &PwAff) -> PolyResult<PwAff> {
        if_true.check_space(if_false)?;
        if_true.check_space(cond)?;
        let non_zero = cond.non_zero_set()?;
        let zero = cond.zero_set()?;
        let taken = if_true.intersect_domain(&non_zero)?;
        let skipped = if_false.intersect_domain(&zero)?;
        debug!(
            "conditional with {} pieces for the true branch and {} for the false branch",
            taken.n_piece(),
            skipped.n_piece()
        );
        let mut result = taken;
        for (d, a) in skipped.pieces {
            result.push(d, a);
        }
        Ok(result)
    }

    /// `if_true` on `cond` and `if_false` on its complement, through the
    /// indicator function of `cond`.
    pub fn select_by(cond: &Set, if_true: &PwAff, if_false: &PwAff) -> PolyResult<PwAff> {
        warn!("conditional expression: branch domains are not checked for coverage");
        PwAff::cond(&PwAff::indicator(cond)?, if_true, if_false)
    }

    /// Value at an integer point, if the point lies in some piece.
    pub fn eval(&self, point: &[Int]) -> PolyResult<Option<BigRational>> {
        for (dom, aff) in &self.pieces {
            if dom.contains(point)? {
                return aff.eval(point).map(Some);
            }
        }
        Ok(None)
    }
}

/// `aff op 0` as a set over the expression's local space.
fn compare(aff: &Aff, op: CmpOp) -> PolyResult<Set> {
    let one = Int::one();
    let basic = |a: &Aff, kind| -> PolyResult<Set> {
        Ok(Set::from_basic_map(BasicMap::from_aff(a, kind)?))
    };
    match op {
        CmpOp::Eq => basic(aff, ConstraintKind::Equality),
        CmpOp::Ge => basic(aff, ConstraintKind::Inequality),
        CmpOp::Le => basic(&aff.neg(), ConstraintKind::Inequality),
        CmpOp::Gt => basic(&numerator_shift(aff, &one)?, ConstraintKind::Inequality),
        CmpOp::Lt => basic(&numerator_shift(&aff.neg(), &one)?, ConstraintKind::Inequality),
        CmpOp::Ne => {
            let gt = compare(aff, CmpOp::Gt)?;
            gt.union(&compare(aff, CmpOp::Lt)?)
        }
    }
}

/// `n/d` becomes `(n - c)/d`: on integer points, `n/d > 0` holds exactly
/// when `n - 1 >= 0`.
fn numerator_shift(aff: &Aff, c: &Int) -> PolyResult<Aff> {
    let v = aff.vector();
    let mut shifted = v.to_vec();
    shifted[1] -= c;
    Aff::from_vector(aff.local_space().clone(), shifted)
}

/// Minimum of a non-empty list.
pub fn list_min(list: &[PwAff]) -> PolyResult<PwAff> {
    fold_list(list, PwAff::min)
}

/// Maximum of a non-empty list.
pub fn list_max(list: &[PwAff]) -> PolyResult<PwAff> {
    fold_list(list, PwAff::max)
}

fn fold_list(list: &[PwAff], f: impl Fn(&PwAff, &PwAff) -> PolyResult<PwAff>) -> PolyResult<PwAff> {
    let (first, rest) = list
        .split_first()
        .ok_or_else(|| PolyError::invalid("empty expression list"))?;
    let mut acc = first.clone();
    for pa in rest {
        acc = f(&acc, pa)?;
    }
    Ok(acc)
}

/// Points where `a op b` holds for every `a` in `lhs` and `b` in `rhs`.
pub fn list_cmp_set(lhs: &[PwAff], rhs: &[PwAff], op: CmpOp) -> PolyResult<Set> {
    let space = lhs
        .first()
        .or_else(|| rhs.first())
        .map(|pa| pa.space().clone())
        .ok_or_else(|| PolyError::invalid("empty expression list"))?;
    let mut result = Set::universe(space);
    for a in lhs {
        for b in rhs {
            result = result.intersect(&a.cmp_set(b, op)?)?;
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polyhedral::space::DimType;
    use crate::utils::matrix::int;

    fn space() -> Space {
        Space::set_alloc(0, 1)
    }

    fn var() -> PwAff {
        PwAff::from_aff(Aff::var_on_domain(LocalSpace::from_space(space()), DimType::Out, 0).unwrap())
    }

    fn cst(v: i64) -> PwAff {
        PwAff::val(space(), int(v))
    }

    fn at(pa: &PwAff, i: i64) -> Option<Int> {
        pa.eval(&[int(i)]).unwrap().map(|v| v.to_integer())
    }

    #[test]
    fn test_min_max() {
        let i = var();
        let m = i.min(&cst(3)).unwrap();
        assert_eq!(m.n_piece(), 2);
        assert_eq!(at(&m, 1), Some(int(1)));
        assert_eq!(at(&m, 7), Some(int(3)));
        let m = list_max(&[i.neg(), i.clone(), cst(-2)]).unwrap();
        assert_eq!(at(&m, -5), Some(int(5)));
        assert_eq!(at(&m, 0), Some(int(0)));
        assert!(list_min(&[]).is_err());
    }

    #[test]
    fn test_cmp_sets() {
        let i = var();
        let lt = i.lt_set(&cst(2)).unwrap();
        assert!(lt.contains(&[int(1)]).unwrap());
        assert!(!lt.contains(&[int(2)]).unwrap());
        let ne = i.ne_set(&cst(2)).unwrap();
        assert!(ne.contains(&[int(3)]).unwrap());
        assert!(!ne.contains(&[int(2)]).unwrap());
        let half = i.scale_down(&int(2)).unwrap();
        let gt = half.gt_set(&cst(1)).unwrap();
        assert!(!gt.contains(&[int(2)]).unwrap());
        assert!(gt.contains(&[int(3)]).unwrap());
    }

    #[test]
    fn test_list_cmp_set() {
        let i = var();
        // 0, 1 <= i, i + 1 <= 5
        let set = list_cmp_set(&[cst(0), cst(1)], &[i.clone(), i.add_constant(&int(1))], CmpOp::Le).unwrap();
        let set = set.intersect(&i.add_constant(&int(1)).le_set(&cst(5)).unwrap()).unwrap();
        let members: Vec<i64> = (-3..8).filter(|&v| set.contains(&[int(v)]).unwrap()).collect();
        assert_eq!(members, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_cond_selects_branches() {
        let i = var();
        let cond = i.ge_set(&cst(0)).unwrap();
        let abs = PwAff::select_by(&cond, &i, &i.neg()).unwrap();
        assert_eq!(at(&abs, -4), Some(int(4)));
        assert_eq!(at(&abs, 3), Some(int(3)));
    }

    #[test]
    fn test_cond_keeps_branch_gaps() {
        // The true branch is only defined for i <= 5: points with i > 5 get
        // no value even though they satisfy the condition.
        let i = var();
        let cond = i.ge_set(&cst(0)).unwrap();
        let partial = i.intersect_domain(&i.le_set(&cst(5)).unwrap()).unwrap();
        let f = PwAff::select_by(&cond, &partial, &cst(-1)).unwrap();
        assert_eq!(at(&f, 3), Some(int(3)));
        assert_eq!(at(&f, -3), Some(int(-1)));
        assert_eq!(at(&f, 9), None);
    }

    #[test]
    fn test_union_add() {
        let i = var();
        let left = i.intersect_domain(&i.le_set(&cst(0)).unwrap()).unwrap();
        let right = cst(10).intersect_domain(&i.ge_set(&cst(0)).unwrap()).unwrap();
        let sum = left.union_add(&right).unwrap();
        assert_eq!(at(&sum, -3), Some(int(-3)));
        assert_eq!(at(&sum, 0), Some(int(10)));
        assert_eq!(at(&sum, 4), Some(int(10)));
    }

    #[test]
    fn test_floor_and_mod() {
        let i = var();
        let f = i.scale_down(&int(3)).unwrap().floor().unwrap();
        assert_eq!(at(&f, -1), Some(int(-1)));
        let m = i.mod_val(&int(3)).unwrap();
        assert_eq!(at(&m, -1), Some(int(2)));
        let c = i.scale_down(&int(3)).unwrap().ceil().unwrap();
        assert_eq!(at(&c, 1), Some(int(1)));
    }
}
