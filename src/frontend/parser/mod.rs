//! Recursive-descent reader for the set notation.
//!
//! Productions are split by family: `affine` builds piecewise affine
//! expressions, `condition` builds relations out of constraints and
//! quantifiers, `tuple` reads tuple shapes. Each production takes the
//! relation built so far by value and returns the extended relation, so a
//! failure anywhere simply drops the partial result.
//!
//! While a body is being read every variable is a dimension of a flat
//! working set: parameters first, then tuple and quantified variables in
//! declaration order. The position of a name in the [`VarTable`] is
//! therefore also the position of its dimension. Once the body is complete
//! the working set is given its real (named, possibly relational) space.

mod affine;
mod condition;
mod tuple;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::frontend::stream::TokenStream;
use crate::frontend::token::TokenKind;
use crate::frontend::vars::VarTable;
use crate::polyhedral::aff::Aff;
use crate::polyhedral::local_space::LocalSpace;
use crate::polyhedral::map::Map;
use crate::polyhedral::pw_aff::PwAff;
use crate::polyhedral::space::{DimType, Space, Tuple};
use crate::polyhedral::union_map::UnionMap;
use crate::utils::errors::{ParseError, PolyResult, SemanticError, SemanticErrorKind};
use crate::utils::location::Span;
use crate::Config;

/// Result of reading a `{ ... }` object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Object {
    /// Every body lives in the same space
    Map(Map),
    /// Bodies over several spaces, or the empty union `{}`
    Union(UnionMap),
}

impl Object {
    /// Add the relation of another body.
    fn add(self, map: Map, span: Span) -> PolyResult<Object> {
        let is_set = match &self {
            Object::Map(m) => Some(m.is_set()),
            Object::Union(u) => u.maps().first().map(Map::is_set),
        };
        if is_set.map_or(false, |s| s != map.is_set()) {
            return Err(SemanticError::new(
                SemanticErrorKind::IncompatibleObjects,
                "cannot combine sets and relations in one union",
                span,
            )
            .into());
        }
        match self {
            Object::Map(m) if m.space().is_equal(map.space()) => Ok(Object::Map(m.union(&map)?)),
            Object::Map(m) => {
                let mut umap = UnionMap::from_map(m);
                umap.add_map(map)?;
                Ok(Object::Union(umap))
            }
            Object::Union(mut umap) => {
                umap.add_map(map)?;
                Ok(Object::Union(umap))
            }
        }
    }

    /// View the object as a union.
    pub fn into_union(self) -> UnionMap {
        match self {
            Object::Map(m) => UnionMap::from_map(m),
            Object::Union(u) => u,
        }
    }
}

/// A reader over one source text.
pub struct Parser<'a> {
    stream: TokenStream<'a>,
    vars: VarTable,
    config: Config,
}

impl<'a> Parser<'a> {
    /// Create a parser with the default configuration.
    pub fn new(source: &'a str) -> Self {
        Self::with_config(source, Config::default())
    }

    pub fn with_config(source: &'a str, config: Config) -> Self {
        Self { stream: TokenStream::new(source), vars: VarTable::new(), config }
    }

    /// Read `[params] -> { body; body; ... }` up to the end of the input.
    pub fn read_object(&mut self) -> PolyResult<Object> {
        let mut params = self.read_params()?;
        self.stream.expect(TokenKind::LeftBrace)?;

        let tok = self.stream.next()?;
        match tok.kind {
            TokenKind::Ident if tok.text() == Some("Sym") => {
                self.stream.expect(TokenKind::Eq)?;
                params = self.read_tuple(params, DimType::Param)?.0;
            }
            TokenKind::RightBrace => {
                self.expect_eof()?;
                debug!("read empty union");
                return Ok(Object::Union(UnionMap::empty()));
            }
            _ => self.stream.push(tok),
        }

        let mut obj = Object::Map(self.read_body(&params)?);
        while self.stream.eat_if(TokenKind::Semicolon)? {
            if self.stream.next_is(TokenKind::RightBrace)? {
                break;
            }
            let span = self.peek_span()?;
            let map = self.read_body(&params)?;
            obj = obj.add(map, span)?;
        }
        self.stream.expect(TokenKind::RightBrace)?;
        self.expect_eof()?;
        Ok(obj)
    }

    /// Read `[params] -> { [dom] -> [aff] : cond; ... }`.
    pub fn read_pw_aff(&mut self) -> PolyResult<PwAff> {
        let params = self.read_params()?;
        self.stream.expect(TokenKind::LeftBrace)?;
        let mut pa = self.read_pw_aff_piece(&params)?;
        while self.stream.eat_if(TokenKind::Semicolon)? {
            if self.stream.next_is(TokenKind::RightBrace)? {
                break;
            }
            let span = self.peek_span()?;
            let piece = self.read_pw_aff_piece(&params)?;
            if !pa.space().is_equal(piece.space()) {
                return Err(SemanticError::new(
                    SemanticErrorKind::IncompatibleObjects,
                    format!("piece over {} in expression over {}", piece.space(), pa.space()),
                    span,
                )
                .into());
            }
            pa = pa.union_add(&piece)?;
        }
        self.stream.expect(TokenKind::RightBrace)?;
        self.expect_eof()?;
        debug!("read piecewise expression with {} pieces", pa.n_piece());
        Ok(pa)
    }

    /// Optional `[params] ->` prefix; returns the parameter universe.
    fn read_params(&mut self) -> PolyResult<Map> {
        let map = Map::universe(Space::params_alloc(Vec::new()));
        if !self.stream.next_is(TokenKind::LeftBracket)? {
            return Ok(map);
        }
        let (map, _) = self.read_tuple(map, DimType::Param)?;
        self.stream.expect(TokenKind::Arrow)?;
        debug!("read {} parameters", map.dim(DimType::Param));
        Ok(map)
    }

    /// One `tuple [-> tuple] [: cond]` or `: cond` body.
    fn read_body(&mut self, params: &Map) -> PolyResult<Map> {
        let mark = self.vars.mark();
        let n_param = params.dim(DimType::Param);
        let param_names = self.param_names(n_param);

        let (map, space) = if self.stream.next_is(TokenKind::Colon)? {
            let map = self.read_optional_disjuncts(params.clone())?;
            (map, Space::params_alloc(param_names))
        } else {
            let (map, first) = self.read_tuple(params.clone(), DimType::Out)?;
            let (map, space) = if self.stream.eat_if(TokenKind::Arrow)? {
                let (map, second) = self.read_tuple(map, DimType::Out)?;
                (map, Space::map_from_tuples(param_names, first, second))
            } else {
                (map, Space::set_from_tuple(param_names, first))
            };
            (self.read_optional_disjuncts(map)?, space)
        };

        self.vars.rollback(mark);
        self.finish(map, space)
    }

    fn read_pw_aff_piece(&mut self, params: &Map) -> PolyResult<PwAff> {
        let mark = self.vars.mark();
        let n_param = params.dim(DimType::Param);
        let param_names = self.param_names(n_param);

        let (dom, tuple) = self.read_aff_domain(params.clone())?;
        if tuple.is_some() {
            self.stream.expect(TokenKind::Arrow)?;
        }
        self.stream.expect(TokenKind::LeftBracket)?;
        let pa = self.accept_extended_affine(dom.space())?;
        self.stream.expect(TokenKind::RightBracket)?;
        let dom = self.read_optional_disjuncts(dom)?;
        let pa = pa.intersect_domain(&dom)?;
        self.vars.rollback(mark);

        let space = match tuple {
            Some(tuple) => Space::set_from_tuple(param_names, tuple),
            None => Space::params_alloc(param_names),
        };
        pa.reset_space(space)
    }

    /// Domain of a piecewise expression. A `[` starts a domain tuple only
    /// if it is followed by a nested tuple, `]` or a fresh identifier;
    /// otherwise it opens the expression of a parameter domain.
    fn read_aff_domain(&mut self, dom: Map) -> PolyResult<(Map, Option<Tuple>)> {
        let tok = self.stream.next()?;
        if tok.kind == TokenKind::Ident || tok.is_keyword() {
            self.stream.push(tok);
            let (dom, tuple) = self.read_tuple(dom, DimType::Out)?;
            return Ok((dom, Some(tuple)));
        }
        if tok.kind != TokenKind::LeftBracket {
            return Err(ParseError::expected("'['", tok.to_string(), tok.span).into());
        }
        self.stream.push(tok);

        let cp = self.stream.checkpoint();
        self.stream.next()?;
        let is_domain = self.next_is_tuple()?
            || self.stream.next_is(TokenKind::RightBracket)?
            || self.next_is_fresh_ident()?;
        self.stream.restore(cp);

        if is_domain {
            let (dom, tuple) = self.read_tuple(dom, DimType::Out)?;
            Ok((dom, Some(tuple)))
        } else {
            Ok((dom, None))
        }
    }

    fn next_is_fresh_ident(&mut self) -> PolyResult<bool> {
        let tok = self.stream.next()?;
        let fresh = tok.kind == TokenKind::Ident
            && tok.text().map_or(false, |name| self.vars.lookup(name).is_none());
        self.stream.push(tok);
        Ok(fresh)
    }

    /// Install the real space of a completed body.
    fn finish(&self, mut map: Map, space: Space) -> PolyResult<Map> {
        map.reset_space(space)?;
        if self.config.sort_divs {
            map.sort_divs();
        }
        debug!("read {} with {} basic relations", map.space(), map.n_basic_map());
        Ok(map)
    }

    fn param_names(&self, n_param: usize) -> Vec<Option<String>> {
        self.vars.names(0, n_param)
    }

    fn peek_span(&mut self) -> PolyResult<Span> {
        let tok = self.stream.next()?;
        let span = tok.span;
        self.stream.push(tok);
        Ok(span)
    }

    fn expect_eof(&mut self) -> PolyResult<()> {
        let tok = self.stream.next()?;
        if tok.is_eof() {
            Ok(())
        } else {
            Err(ParseError::unexpected("unexpected input after object", tok.to_string(), tok.span).into())
        }
    }
}

/// The expression equal to the variable at `pos` of a working set.
fn var_pw_aff(space: &Space, pos: usize) -> PolyResult<PwAff> {
    let n_param = space.dim(DimType::Param);
    let (kind, pos) = if pos < n_param {
        (DimType::Param, pos)
    } else {
        (DimType::Out, pos - n_param)
    };
    let aff = Aff::var_on_domain(LocalSpace::from_space(space.clone()), kind, pos)?;
    Ok(PwAff::from_aff(aff))
}

/// Dimension name for an identifier; trailing primes are dropped.
fn dim_name(ident: &str) -> String {
    let stripped = ident.trim_end_matches('\'');
    if stripped.is_empty() {
        ident.to_string()
    } else {
        stripped.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::errors::{ParseErrorKind, PolyError};
    use crate::utils::matrix::{int, row};

    fn read(source: &str) -> Map {
        match Parser::new(source).read_object().unwrap() {
            Object::Map(m) => m,
            Object::Union(u) => panic!("expected a single relation, got {} members", u.n_map()),
        }
    }

    fn contains(map: &Map, point: &[i64]) -> bool {
        map.contains(&row(point)).unwrap()
    }

    #[test]
    fn test_even_integers() {
        let set = read("{ [i] : exists (a : i = 2a) }");
        assert!(set.is_set());
        assert!(contains(&set, &[4]));
        assert!(contains(&set, &[-2]));
        assert!(!contains(&set, &[5]));
    }

    #[test]
    fn test_parametric_relation() {
        let map = read("[N] -> { [i] -> [j] : 0 <= i < N and j = i + 1 }");
        assert!(!map.is_set());
        assert_eq!(map.dim(DimType::Param), 1);
        assert_eq!(map.dim(DimType::In), 1);
        assert_eq!(map.dim(DimType::Out), 1);
        assert_eq!(map.n_basic_map(), 1);
        assert_eq!(map.basic_maps()[0].constraints().len(), 3);
        assert_eq!(map.space().dim_name(DimType::Param, 0), Some("N"));
        assert!(contains(&map, &[5, 0, 1]));
        assert!(!contains(&map, &[5, 5, 6]));
        assert!(!contains(&map, &[5, 1, 1]));
    }

    #[test]
    fn test_floor_creates_one_division() {
        let map = read("{ [i] -> [ [i/3] ] }");
        assert_eq!(map.n_basic_map(), 1);
        let bmap = &map.basic_maps()[0];
        assert_eq!(bmap.n_div(), 1);
        let div = bmap.local_space().get_div(0).unwrap();
        assert_eq!(div, &row(&[3, 0, 1, 0, 0])[..]);
        assert!(contains(&map, &[7, 2]));
        assert!(contains(&map, &[-1, -1]));
        assert!(!contains(&map, &[7, 3]));
    }

    #[test]
    fn test_mod_matches_exists() {
        let by_mod = read("{ [i] : i % 5 = 0 }");
        let by_exists = read("{ [i] : exists (q : i = 5 q) }");
        for i in -12..=12 {
            assert_eq!(contains(&by_mod, &[i]), contains(&by_exists, &[i]), "i = {}", i);
        }
    }

    #[test]
    fn test_params_only_body() {
        let set = read("[N] -> { : N > 0 }");
        assert!(set.space().is_params());
        assert!(contains(&set, &[3]));
        assert!(!contains(&set, &[0]));
    }

    #[test]
    fn test_tuple_definitions_and_names() {
        let set = read("{ S[i, j = i + 1] : 0 <= i <= 3 }");
        assert_eq!(set.space().tuple_name(DimType::Out), Some("S"));
        assert_eq!(set.space().dim_name(DimType::Out, 1), Some("j"));
        assert!(contains(&set, &[2, 3]));
        assert!(!contains(&set, &[2, 2]));
    }

    #[test]
    fn test_primed_names() {
        let map = read("{ [i] -> [i'] : i' = i + 1 }");
        assert_eq!(map.space().dim_name(DimType::Out, 0), Some("i"));
        assert!(contains(&map, &[1, 2]));
    }

    #[test]
    fn test_expression_items() {
        let map = read("{ [i] -> [2i + 1, i] }");
        assert!(contains(&map, &[3, 7, 3]));
        assert!(!contains(&map, &[3, 6, 3]));
        assert_eq!(map.space().dim_name(DimType::Out, 0), None);
    }

    #[test]
    fn test_continued_tuple() {
        let set = read("{ A[i][j] : i = j }");
        assert_eq!(set.dim(DimType::Out), 2);
        assert!(contains(&set, &[1, 1]));
    }

    #[test]
    fn test_nested_tuple() {
        let set = read("{ [[a] -> [b]] : a < b }");
        let tuple = set.space().tuple(DimType::Out).unwrap();
        assert!(tuple.nested.is_some());
        assert!(contains(&set, &[0, 1]));
        assert!(!contains(&set, &[1, 0]));
    }

    #[test]
    fn test_union_of_spaces() {
        let obj = Parser::new("{ A[i] : i > 0; B[i, j] : i = j; A[i] : i < -3; }").read_object().unwrap();
        match obj {
            Object::Union(u) => assert_eq!(u.n_map(), 2),
            Object::Map(_) => panic!("expected a union"),
        }
    }

    #[test]
    fn test_empty_union_and_universe() {
        match Parser::new("{ }").read_object().unwrap() {
            Object::Union(u) => assert_eq!(u.n_map(), 0),
            Object::Map(_) => panic!("expected the empty union"),
        }
        let set = read("{ [i] : }");
        assert!(set.is_plain_universe());
    }

    #[test]
    fn test_mixing_sets_and_relations() {
        let err = Parser::new("{ [i]; [i] -> [j] }").read_object().unwrap_err();
        assert!(matches!(
            err,
            PolyError::Semantic(SemanticError { kind: SemanticErrorKind::IncompatibleObjects, .. })
        ));
    }

    #[test]
    fn test_sym_params() {
        let set = read("{ Sym = [N, M] : M < N }");
        assert_eq!(set.dim(DimType::Param), 2);
        assert_eq!(set.space().dim_name(DimType::Param, 1), Some("M"));
        assert!(contains(&set, &[4, 3]));
        assert!(!contains(&set, &[4, 4]));

        // A tuple right after the parameter tuple continues it.
        let set = read("{ Sym = [N] [i] : i < N }");
        assert_eq!(set.dim(DimType::Param), 2);
        assert_eq!(set.dim(DimType::Out), 0);
        assert_eq!(set.space().dim_name(DimType::Param, 1), Some("i"));
        assert!(contains(&set, &[4, 3]));
        assert!(!contains(&set, &[4, 4]));
    }

    #[test]
    fn test_unknown_identifier() {
        let err = Parser::new("{ [i] : i < M }").read_object().unwrap_err();
        match err {
            PolyError::Semantic(e) => {
                assert_eq!(e.kind, SemanticErrorKind::UnknownIdentifier);
                assert!(e.message.contains("unknown identifier"));
                assert_eq!(e.span.start_column, 13);
            }
            other => panic!("unexpected error {}", other),
        }
    }

    #[test]
    fn test_missing_operator() {
        let err = Parser::new("{ [i] : i + 1 }").read_object().unwrap_err();
        match err {
            PolyError::Parse(e) => {
                assert_eq!(e.kind, ParseErrorKind::MissingOperator);
                assert!(e.message.contains("missing operator"));
            }
            other => panic!("unexpected error {}", other),
        }
    }

    #[test]
    fn test_parameter_tuple_needs_fresh_names() {
        let err = Parser::new("[N, N] -> { [i] }").read_object().unwrap_err();
        assert!(err.to_string().contains("expecting unique identifier"));
        let err = Parser::new("[1] -> { [i] }").read_object().unwrap_err();
        assert!(err.to_string().contains("expecting unique identifier"));
    }

    #[test]
    fn test_trailing_input() {
        assert!(Parser::new("{ [i] } x").read_object().is_err());
        assert!(Parser::new("{ [i]").read_object().is_err());
    }

    #[test]
    fn test_pw_aff_on_set_domain() {
        let pa = Parser::new("[N] -> { [i] -> [i + N] : i >= 0 }").read_pw_aff().unwrap();
        assert_eq!(pa.n_piece(), 1);
        assert!(!pa.space().is_params());
        let v = pa.eval(&row(&[10, 2])).unwrap().unwrap();
        assert_eq!(v.to_integer(), int(12));
        assert!(pa.eval(&row(&[10, -1])).unwrap().is_none());
    }

    #[test]
    fn test_pw_aff_on_params() {
        let pa = Parser::new("[N] -> { [(N + 1)/2] }").read_pw_aff().unwrap();
        assert!(pa.space().is_params());
        let v = pa.eval(&row(&[3])).unwrap().unwrap();
        assert_eq!(v.to_integer(), int(2));
    }

    #[test]
    fn test_pw_aff_pieces() {
        let pa = Parser::new("{ [i] -> [i] : i >= 0; [i] -> [-i] : i < 0 }").read_pw_aff().unwrap();
        for i in -4..=4i64 {
            let v = pa.eval(&row(&[i])).unwrap().unwrap();
            assert_eq!(v.to_integer(), int(i.abs()));
        }
    }
}
