//! Printing of sets, relations and affine expressions in the same notation
//! the parser reads.
//!
//! Anonymous dimensions get generated names (`p0` for parameters, `i0` for
//! set and input dimensions, `o0` for output dimensions, `e0` for
//! existential variables). Known divisions are printed inline as
//! `[(expr)/m]`, and their defining inequalities are left out.

use num_traits::{One, Signed, Zero};
use std::collections::HashSet;
use std::fmt;

use crate::polyhedral::aff::Aff;
use crate::polyhedral::basic_map::BasicMap;
use crate::polyhedral::local_space::LocalSpace;
use crate::polyhedral::map::Map;
use crate::polyhedral::pw_aff::PwAff;
use crate::polyhedral::space::{DimType, Space, Tuple};
use crate::polyhedral::union_map::UnionMap;
use crate::utils::matrix::Int;

/// Printable names for every dimension of a space.
///
/// Names are unique: a dimension whose name is already taken by an earlier
/// dimension is printed under a generated name instead.
pub struct DimNames<'a> {
    space: &'a Space,
    names: Vec<String>,
    taken: HashSet<String>,
}

impl<'a> DimNames<'a> {
    pub fn new(space: &'a Space) -> Self {
        let mut taken: HashSet<String> = HashSet::new();
        let kinds = [DimType::Param, DimType::In, DimType::Out];
        let mut slots: Vec<(DimType, usize, Option<String>)> = Vec::with_capacity(space.total());
        for kind in kinds {
            for pos in 0..space.dim(kind) {
                let name = space.dim_name(kind, pos).map(str::to_string);
                let name = name.filter(|n| taken.insert(n.clone()));
                slots.push((kind, pos, name));
            }
        }
        let mut names = Vec::with_capacity(slots.len());
        for (kind, pos, name) in slots {
            let name = match name {
                Some(name) => name,
                None => {
                    let prefix = match kind {
                        DimType::Param => "p",
                        DimType::Out if !space.is_set() => "o",
                        _ => "i",
                    };
                    fresh(&mut taken, prefix, pos)
                }
            };
            names.push(name);
        }
        Self { space, names, taken }
    }

    /// Parameter names.
    pub fn params(&self) -> Vec<String> {
        self.names[..self.space.dim(DimType::Param)].to_vec()
    }

    /// Names of all tuple dimensions in column order.
    pub fn all(&self) -> &[String] {
        &self.names
    }

    fn kind_names(&self, kind: DimType) -> &[String] {
        let off = self.space.offset(kind);
        &self.names[off..off + self.space.dim(kind)]
    }

    /// Write the input or output tuple, e.g. `S[i, j]` or `[[a] -> [b]]`.
    pub fn write_tuple(&self, f: &mut fmt::Formatter<'_>, kind: DimType) -> fmt::Result {
        match self.space.tuple(kind) {
            Some(tuple) => f.write_str(&tuple_text(tuple, self.kind_names(kind))),
            None => Ok(()),
        }
    }

    fn tuple_part(&self) -> String {
        let out = self.space.tuple(DimType::Out);
        let out_text = out.map(|t| tuple_text(t, self.kind_names(DimType::Out))).unwrap_or_default();
        if self.space.is_set() {
            if self.space.is_params() {
                return String::new();
            }
            return out_text;
        }
        let in_text = self
            .space
            .tuple(DimType::In)
            .map(|t| tuple_text(t, self.kind_names(DimType::In)))
            .unwrap_or_default();
        format!("{} -> {}", in_text, out_text)
    }

    /// Column names of a local space: tuple dimensions, then divisions.
    /// Unknown divisions get fresh names, also returned separately.
    fn local_names(&self, ls: &LocalSpace) -> (Vec<String>, Vec<String>) {
        let mut taken = self.taken.clone();
        let mut cols = self.names.clone();
        let mut unknown = Vec::new();
        for k in 0..ls.n_div() {
            let name = match ls.get_div(k) {
                Some(div) if !div[0].is_zero() => {
                    format!("[({})/{}]", affine_text(&div[1..], &cols), div[0])
                }
                _ => {
                    let name = fresh(&mut taken, "e", unknown.len());
                    unknown.push(name.clone());
                    name
                }
            };
            cols.push(name);
        }
        (cols, unknown)
    }

    fn write_params(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.space.dim(DimType::Param) > 0 {
            write!(f, "[{}] -> ", self.params().join(", "))?;
        }
        Ok(())
    }
}

fn fresh(taken: &mut HashSet<String>, prefix: &str, start: usize) -> String {
    let mut n = start;
    loop {
        let candidate = format!("{}{}", prefix, n);
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

fn tuple_text(tuple: &Tuple, names: &[String]) -> String {
    let mut text = tuple.name.clone().unwrap_or_default();
    match &tuple.nested {
        Some(pair) => {
            let (dom, ran) = (&pair.0, &pair.1);
            let split = dom.len().min(names.len());
            text.push('[');
            text.push_str(&tuple_text(dom, &names[..split]));
            text.push_str(" -> ");
            text.push_str(&tuple_text(ran, &names[split..]));
            text.push(']');
        }
        None => {
            text.push('[');
            text.push_str(&names.join(", "));
            text.push(']');
        }
    }
    text
}

fn term(coef: &Int, name: &str) -> String {
    let abs = coef.abs();
    if abs.is_one() {
        name.to_string()
    } else if name.starts_with('[') {
        format!("{}*{}", abs, name)
    } else {
        format!("{}{}", abs, name)
    }
}

/// `c0 + c1 x1 + ...` for `row = [c0, c1, ...]`, variables first.
fn affine_text(row: &[Int], names: &[String]) -> String {
    let terms: Vec<(Int, &str)> = row[1..]
        .iter()
        .zip(names)
        .filter(|(c, _)| !c.is_zero())
        .map(|(c, n)| (c.clone(), n.as_str()))
        .collect();
    sum_text(&terms, &row[0])
}

fn sum_text(terms: &[(Int, &str)], constant: &Int) -> String {
    let mut text = String::new();
    for (coef, name) in terms {
        if text.is_empty() {
            if coef.is_negative() {
                text.push('-');
            }
        } else if coef.is_negative() {
            text.push_str(" - ");
        } else {
            text.push_str(" + ");
        }
        text.push_str(&term(coef, name));
    }
    if text.is_empty() {
        return constant.to_string();
    }
    if constant.is_positive() {
        text.push_str(&format!(" + {}", constant));
    } else if constant.is_negative() {
        text.push_str(&format!(" - {}", constant.abs()));
    }
    text
}

/// `row >= 0` or `row = 0` with negative terms moved to the right.
fn constraint_text(row: &[Int], is_eq: bool, names: &[String]) -> String {
    let mut lhs = Vec::new();
    let mut rhs = Vec::new();
    for (c, n) in row[1..].iter().zip(names) {
        if c.is_positive() {
            lhs.push((c.clone(), n.as_str()));
        } else if c.is_negative() {
            rhs.push((-c, n.as_str()));
        }
    }
    let zero = Int::zero();
    let (lc, rc) = if row[0].is_negative() { (zero, -&row[0]) } else { (row[0].clone(), zero) };
    let op = if is_eq { "=" } else { ">=" };
    format!("{} {} {}", sum_text(&lhs, &lc), op, sum_text(&rhs, &rc))
}

/// Condition describing one basic relation.
fn basic_text(bmap: &BasicMap, names: &DimNames<'_>) -> String {
    let (cols, unknown) = names.local_names(bmap.local_space());
    let parts: Vec<String> = bmap
        .constraints()
        .iter()
        .filter(|c| !bmap.is_div_constraint(c))
        .map(|c| constraint_text(&c.row, c.is_equality(), &cols))
        .collect();
    let body = if parts.is_empty() { "true".to_string() } else { parts.join(" and ") };
    if unknown.is_empty() {
        body
    } else {
        format!("exists ({} : {})", unknown.join(", "), body)
    }
}

fn disjunction_text(basics: &[BasicMap], names: &DimNames<'_>) -> String {
    if basics.is_empty() {
        return "false".to_string();
    }
    basics.iter().map(|b| basic_text(b, names)).collect::<Vec<_>>().join(" or ")
}

/// `tuples : condition` for one relation inside braces.
fn map_body(map: &Map, names: &DimNames<'_>) -> String {
    let tuples = names.tuple_part();
    let universe = map.n_basic_map() == 1 && map.is_plain_universe();
    if universe && !tuples.is_empty() {
        return tuples;
    }
    let cond = if universe { "true".to_string() } else { disjunction_text(map.basic_maps(), names) };
    if tuples.is_empty() {
        format!(": {}", cond)
    } else {
        format!("{} : {}", tuples, cond)
    }
}

fn aff_text(aff: &Aff, names: &DimNames<'_>) -> String {
    let (cols, _) = names.local_names(aff.local_space());
    let num = affine_text(aff.numerator(), &cols);
    if aff.denominator().is_one() {
        format!("[({})]", num)
    } else {
        format!("[(({})/{})]", num, aff.denominator())
    }
}

fn pw_piece_text(dom: Option<&Map>, aff: &Aff, names: &DimNames<'_>) -> String {
    let tuples = names.tuple_part();
    let mut text = if tuples.is_empty() {
        aff_text(aff, names)
    } else {
        format!("{} -> {}", tuples, aff_text(aff, names))
    };
    match dom {
        Some(dom) if !dom.is_plain_universe() => {
            text.push_str(" : ");
            text.push_str(&disjunction_text(dom.basic_maps(), names));
        }
        Some(_) => {}
        None => text.push_str(" : false"),
    }
    text
}

impl fmt::Display for BasicMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Map::from_basic_map(self.clone()).fmt(f)
    }
}

impl fmt::Display for Map {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = DimNames::new(self.space());
        names.write_params(f)?;
        write!(f, "{{ {} }}", map_body(self, &names))
    }
}

impl fmt::Display for Aff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = DimNames::new(self.space());
        names.write_params(f)?;
        let tuples = names.tuple_part();
        if tuples.is_empty() {
            write!(f, "{{ {} }}", aff_text(self, &names))
        } else {
            write!(f, "{{ {} -> {} }}", tuples, aff_text(self, &names))
        }
    }
}

impl fmt::Display for PwAff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = DimNames::new(self.space());
        names.write_params(f)?;
        if self.is_empty() {
            let zero = Aff::zero_on_domain(LocalSpace::from_space(self.space().clone()));
            return write!(f, "{{ {} }}", pw_piece_text(None, &zero, &names));
        }
        let pieces: Vec<String> = self
            .pieces()
            .iter()
            .map(|(dom, aff)| pw_piece_text(Some(dom), aff, &names))
            .collect();
        write!(f, "{{ {} }}", pieces.join("; "))
    }
}

impl fmt::Display for UnionMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let first = match self.maps().first() {
            Some(first) => first,
            None => return write!(f, "{{ }}"),
        };
        DimNames::new(first.space()).write_params(f)?;
        let bodies: Vec<String> = self
            .maps()
            .iter()
            .map(|m| map_body(m, &DimNames::new(m.space())))
            .collect();
        write!(f, "{{ {} }}", bodies.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polyhedral::constraint::Constraint;
    use crate::utils::matrix::{int, row};

    fn named(names: &[&str]) -> Vec<Option<String>> {
        names.iter().map(|s| Some(s.to_string())).collect()
    }

    #[test]
    fn test_constraint_text() {
        let names = vec!["i".to_string(), "j".to_string()];
        assert_eq!(constraint_text(&row(&[-3, 1, 0]), false, &names), "i >= 3");
        assert_eq!(constraint_text(&row(&[5, -1, 2]), false, &names), "2j + 5 >= i");
        assert_eq!(constraint_text(&row(&[0, 1, -1]), true, &names), "i = j");
        assert_eq!(affine_text(&row(&[-1, -1, 0]), &names), "-i - 1");
    }

    #[test]
    fn test_duplicate_names_are_renamed() {
        let space = Space::map_from_tuples(
            vec![],
            Tuple::new(None, named(&["i"])),
            Tuple::new(None, named(&["i"])),
        );
        let names = DimNames::new(&space);
        assert_eq!(names.all(), &["i".to_string(), "o0".to_string()]);
    }

    #[test]
    fn test_print_map() {
        let space = Space::map_from_tuples(
            named(&["N"]),
            Tuple::new(Some("S".into()), named(&["i"])),
            Tuple::new(None, named(&["j"])),
        );
        let mut b = BasicMap::universe(space.clone());
        b.add_constraint(Constraint::ge_zero(row(&[0, 1, -1, 0]))).unwrap();
        b.add_constraint(Constraint::eq_zero(row(&[0, 0, 1, -1]))).unwrap();
        let map = Map::from_basic_map(b);
        assert_eq!(map.to_string(), "[N] -> { S[i] -> [j] : N >= i and i = j }");
        assert_eq!(Map::empty(space.clone()).to_string(), "[N] -> { S[i] -> [j] : false }");
        assert_eq!(Map::universe(space).to_string(), "[N] -> { S[i] -> [j] }");
    }

    #[test]
    fn test_print_params_set() {
        let space = Space::params_alloc(named(&["N"]));
        assert_eq!(Map::universe(space).to_string(), "[N] -> { : true }");
    }

    #[test]
    fn test_print_known_and_unknown_divs() {
        let ls = LocalSpace::from_space(Space::set_alloc(0, 1));
        let x = Aff::var_on_domain(ls, DimType::Out, 0).unwrap();
        let even = x.sub(&x.floor_div(&int(2)).unwrap().scale(&int(2))).unwrap();
        let map = Map::from_basic_map(BasicMap::from_aff(&even, crate::polyhedral::constraint::ConstraintKind::Equality).unwrap());
        assert_eq!(map.to_string(), "{ [i0] : i0 = 2*[(i0)/2] }");

        let mut b = BasicMap::universe(Space::set_alloc(0, 2));
        b.add_constraint(Constraint::eq_zero(row(&[0, 1, -3]))).unwrap();
        b.project_out(DimType::Out, 1, 1).unwrap();
        assert_eq!(b.to_string(), "{ [i0] : exists (e0 : i0 = 3e0) }");
    }

    #[test]
    fn test_print_aff() {
        let ls = LocalSpace::from_space(Space::set_alloc(0, 1));
        let x = Aff::var_on_domain(ls, DimType::Out, 0).unwrap();
        let half = x.add_constant(&int(1)).scale_down(&int(2)).unwrap();
        assert_eq!(half.to_string(), "{ [i0] -> [((i0 + 1)/2)] }");
        assert_eq!(PwAff::from_aff(x).to_string(), "{ [i0] -> [(i0)] }");
    }
}
