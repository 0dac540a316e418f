//! Tuple spaces describe the dimensions of sets and relations.
//!
//! A space is an ordered catalogue of dimension groups:
//! - Parameter dimensions (symbolic constants shared by every tuple)
//! - Input tuple dimensions (relations only)
//! - Output tuple dimensions (the set tuple for sets)
//!
//! Each tuple may carry a name (`S[i, j]`) and may itself be a wrapped
//! relation (`[[a] -> [b]]`), recorded in [`Tuple::nested`].

use serde::{Serialize, Deserialize};
use std::fmt;

use crate::utils::errors::{PolyError, PolyResult};

/// Kind of dimension within a local space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DimType {
    /// Parameter
    Param,
    /// Input tuple dimension
    In,
    /// Output tuple dimension (also the set dimensions of a set)
    Out,
    /// Existential integer division
    Div,
}

impl DimType {
    /// Set dimensions live in the output tuple.
    pub const SET: DimType = DimType::Out;
}

/// A (possibly named, possibly nested) tuple of dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Tuple {
    /// Tuple name, e.g. `S` in `S[i]`
    pub name: Option<String>,
    /// Dimension names in order
    pub ids: Vec<Option<String>>,
    /// Domain and range when the tuple is a wrapped relation
    pub nested: Option<Box<(Tuple, Tuple)>>,
}

impl Tuple {
    /// An unnamed tuple of `n` unnamed dimensions.
    pub fn anonymous(n: usize) -> Self {
        Self { name: None, ids: vec![None; n], nested: None }
    }

    /// A tuple with the given name and dimension names.
    pub fn new(name: Option<String>, ids: Vec<Option<String>>) -> Self {
        Self { name, ids, nested: None }
    }

    /// A tuple wrapping the relation `domain -> range`.
    pub fn wrap(name: Option<String>, domain: Tuple, range: Tuple) -> Self {
        let ids = domain.ids.iter().chain(range.ids.iter()).cloned().collect();
        Self { name, ids, nested: Some(Box::new((domain, range))) }
    }

    /// Number of dimensions.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns true for a zero-dimensional tuple.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Same name, dimension count and nesting; dimension names are ignored.
    pub fn same_shape(&self, other: &Tuple) -> bool {
        if self.name != other.name || self.len() != other.len() {
            return false;
        }
        match (&self.nested, &other.nested) {
            (None, None) => true,
            (Some(a), Some(b)) => a.0.same_shape(&b.0) && a.1.same_shape(&b.1),
            _ => false,
        }
    }

    fn insert(&mut self, pos: usize, n: usize) {
        self.ids.splice(pos..pos, std::iter::repeat(None).take(n));
        self.nested = None;
    }

    fn remove(&mut self, first: usize, n: usize) {
        self.ids.drain(first..first + n);
        self.nested = None;
    }
}

/// A tuple space.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Space {
    params: Vec<Option<String>>,
    input: Tuple,
    output: Tuple,
    is_set: bool,
}

impl Space {
    /// A parameter-only space (a zero-dimensional set space).
    pub fn params_alloc(params: Vec<Option<String>>) -> Self {
        Self {
            params,
            input: Tuple::default(),
            output: Tuple::default(),
            is_set: true,
        }
    }

    /// A set space with anonymous dimensions.
    pub fn set_alloc(n_param: usize, n_dim: usize) -> Self {
        Self::set_from_tuple(vec![None; n_param], Tuple::anonymous(n_dim))
    }

    /// A relation space with anonymous dimensions.
    pub fn map_alloc(n_param: usize, n_in: usize, n_out: usize) -> Self {
        Self::map_from_tuples(vec![None; n_param], Tuple::anonymous(n_in), Tuple::anonymous(n_out))
    }

    /// A set space over the given tuple.
    pub fn set_from_tuple(params: Vec<Option<String>>, tuple: Tuple) -> Self {
        Self {
            params,
            input: Tuple::default(),
            output: tuple,
            is_set: true,
        }
    }

    /// A relation space `input -> output`.
    pub fn map_from_tuples(params: Vec<Option<String>>, input: Tuple, output: Tuple) -> Self {
        Self { params, input, output, is_set: false }
    }

    /// Returns true for set spaces.
    pub fn is_set(&self) -> bool {
        self.is_set
    }

    /// Returns true for parameter-only spaces.
    pub fn is_params(&self) -> bool {
        self.is_set && self.output.is_empty() && self.output.name.is_none()
    }

    /// Number of dimensions of the given kind (divisions are not part of
    /// a tuple space).
    pub fn dim(&self, kind: DimType) -> usize {
        match kind {
            DimType::Param => self.params.len(),
            DimType::In => self.input.len(),
            DimType::Out => self.output.len(),
            DimType::Div => 0,
        }
    }

    /// Total number of dimensions.
    pub fn total(&self) -> usize {
        self.params.len() + self.input.len() + self.output.len()
    }

    /// Position of the first dimension of `kind` among all dimensions.
    pub fn offset(&self, kind: DimType) -> usize {
        match kind {
            DimType::Param => 0,
            DimType::In => self.params.len(),
            DimType::Out => self.params.len() + self.input.len(),
            DimType::Div => self.total(),
        }
    }

    /// Parameter names.
    pub fn param_names(&self) -> &[Option<String>] {
        &self.params
    }

    /// Input or output tuple.
    pub fn tuple(&self, kind: DimType) -> Option<&Tuple> {
        match kind {
            DimType::In => Some(&self.input),
            DimType::Out => Some(&self.output),
            _ => None,
        }
    }

    fn names(&self, kind: DimType) -> Option<&Vec<Option<String>>> {
        match kind {
            DimType::Param => Some(&self.params),
            DimType::In => Some(&self.input.ids),
            DimType::Out => Some(&self.output.ids),
            DimType::Div => None,
        }
    }

    fn names_mut(&mut self, kind: DimType) -> PolyResult<&mut Vec<Option<String>>> {
        match kind {
            DimType::Param => Ok(&mut self.params),
            DimType::In if self.is_set => Err(PolyError::invalid("set spaces have no input tuple")),
            DimType::In => Ok(&mut self.input.ids),
            DimType::Out => Ok(&mut self.output.ids),
            DimType::Div => Err(PolyError::invalid("divisions are not part of a tuple space")),
        }
    }

    /// Name of a dimension, if any.
    pub fn dim_name(&self, kind: DimType, pos: usize) -> Option<&str> {
        self.names(kind)?.get(pos)?.as_deref()
    }

    /// Set the name of a dimension.
    pub fn set_dim_name(&mut self, kind: DimType, pos: usize, name: Option<String>) -> PolyResult<()> {
        let names = self.names_mut(kind)?;
        let slot = names
            .get_mut(pos)
            .ok_or_else(|| PolyError::invalid(format!("dimension {} out of bounds", pos)))?;
        *slot = name;
        Ok(())
    }

    /// Name of the input or output tuple.
    pub fn tuple_name(&self, kind: DimType) -> Option<&str> {
        self.tuple(kind)?.name.as_deref()
    }

    /// Replace the input or output tuple wholesale; the dimension count
    /// must not change.
    pub fn set_tuple(&mut self, kind: DimType, tuple: Tuple) -> PolyResult<()> {
        let slot = match kind {
            DimType::In if !self.is_set => &mut self.input,
            DimType::Out => &mut self.output,
            _ => return Err(PolyError::invalid(format!("no {:?} tuple to replace", kind))),
        };
        if slot.len() != tuple.len() {
            return Err(PolyError::invalid(format!(
                "tuple with {} dimensions replacing one with {}",
                tuple.len(),
                slot.len()
            )));
        }
        *slot = tuple;
        Ok(())
    }

    /// Insert `n` anonymous dimensions of `kind` before position `pos`.
    pub fn insert_dims(&mut self, kind: DimType, pos: usize, n: usize) -> PolyResult<()> {
        let len = self.dim(kind);
        if pos > len {
            return Err(PolyError::invalid(format!(
                "insertion position {} beyond {} dimensions",
                pos, len
            )));
        }
        match kind {
            DimType::Param => {
                self.params.splice(pos..pos, std::iter::repeat(None).take(n));
            }
            DimType::In if !self.is_set => self.input.insert(pos, n),
            DimType::Out => self.output.insert(pos, n),
            _ => return Err(PolyError::invalid(format!("cannot insert {:?} dimensions", kind))),
        }
        Ok(())
    }

    /// Append `n` anonymous dimensions of `kind`.
    pub fn add_dims(&mut self, kind: DimType, n: usize) -> PolyResult<()> {
        let pos = self.dim(kind);
        self.insert_dims(kind, pos, n)
    }

    /// Remove dimensions `first..first + n` of `kind`.
    pub fn drop_dims(&mut self, kind: DimType, first: usize, n: usize) -> PolyResult<()> {
        if first + n > self.dim(kind) {
            return Err(PolyError::invalid(format!(
                "dimension range {}..{} out of bounds",
                first,
                first + n
            )));
        }
        match kind {
            DimType::Param => {
                self.params.drain(first..first + n);
            }
            DimType::In if !self.is_set => self.input.remove(first, n),
            DimType::Out => self.output.remove(first, n),
            _ => return Err(PolyError::invalid(format!("cannot drop {:?} dimensions", kind))),
        }
        Ok(())
    }

    /// Identical up to the names of individual tuple dimensions.
    pub fn is_equal(&self, other: &Space) -> bool {
        self.is_set == other.is_set
            && self.params == other.params
            && self.output.same_shape(&other.output)
            && (self.is_set || self.input.same_shape(&other.input))
    }

    /// The set space of the input tuple.
    pub fn domain(&self) -> Space {
        Space::set_from_tuple(self.params.clone(), self.input.clone())
    }

    /// The set space of the output tuple.
    pub fn range(&self) -> Space {
        Space::set_from_tuple(self.params.clone(), self.output.clone())
    }

    /// A relation space from the given set space to a zero-dimensional
    /// range.
    pub fn from_domain(set: &Space) -> PolyResult<Space> {
        if !set.is_set {
            return Err(PolyError::invalid("expecting a set space"));
        }
        Ok(Space::map_from_tuples(set.params.clone(), set.output.clone(), Tuple::default()))
    }

    /// View a relation space as a set space over the concatenation of its
    /// input and output tuples.
    pub fn flatten(&self) -> Space {
        if self.is_set {
            return self.clone();
        }
        let ids = self.input.ids.iter().chain(self.output.ids.iter()).cloned().collect();
        Space::set_from_tuple(self.params.clone(), Tuple::new(None, ids))
    }
}

impl fmt::Display for Space {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = crate::utils::poly_print::DimNames::new(self);
        if !self.params.is_empty() {
            write!(f, "[{}] -> ", names.params().join(", "))?;
        }
        write!(f, "{{ ")?;
        if !self.is_set {
            names.write_tuple(f, DimType::In)?;
            write!(f, " -> ")?;
        }
        names.write_tuple(f, DimType::Out)?;
        write!(f, " }}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(names: &[&str]) -> Vec<Option<String>> {
        names.iter().map(|s| Some(s.to_string())).collect()
    }

    #[test]
    fn test_offsets() {
        let space = Space::map_alloc(1, 2, 3);
        assert_eq!(space.total(), 6);
        assert_eq!(space.offset(DimType::In), 1);
        assert_eq!(space.offset(DimType::Out), 3);
        assert_eq!(space.offset(DimType::Div), 6);
    }

    #[test]
    fn test_insert_and_drop() {
        let mut space = Space::set_from_tuple(named(&["N"]), Tuple::new(None, named(&["i", "j"])));
        space.insert_dims(DimType::Out, 1, 1).unwrap();
        assert_eq!(space.dim(DimType::Out), 3);
        assert_eq!(space.dim_name(DimType::Out, 2), Some("j"));
        assert_eq!(space.dim_name(DimType::Out, 1), None);
        space.drop_dims(DimType::Out, 0, 2).unwrap();
        assert_eq!(space.dim_name(DimType::Out, 0), Some("j"));
        assert!(space.drop_dims(DimType::Out, 0, 2).is_err());
        assert!(space.insert_dims(DimType::In, 0, 1).is_err());
    }

    #[test]
    fn test_equality_ignores_dim_names() {
        let a = Space::set_from_tuple(named(&["N"]), Tuple::new(Some("S".into()), named(&["i"])));
        let b = Space::set_from_tuple(named(&["N"]), Tuple::new(Some("S".into()), named(&["k"])));
        let c = Space::set_from_tuple(named(&["N"]), Tuple::new(Some("T".into()), named(&["i"])));
        assert!(a.is_equal(&b));
        assert!(!a.is_equal(&c));
    }

    #[test]
    fn test_nested_tuple() {
        let inner = Tuple::wrap(None, Tuple::new(None, named(&["a"])), Tuple::new(None, named(&["b"])));
        let space = Space::map_from_tuples(vec![], inner, Tuple::new(None, named(&["c"])));
        assert_eq!(space.dim(DimType::In), 2);
        assert_eq!(space.to_string(), "{ [[a] -> [b]] -> [c] }");
        assert_eq!(space.domain().dim(DimType::Out), 2);
    }

    #[test]
    fn test_display_params() {
        let space = Space::set_from_tuple(named(&["N"]), Tuple::new(None, vec![None]));
        assert_eq!(space.to_string(), "[N] -> { [i0] }");
    }
}
