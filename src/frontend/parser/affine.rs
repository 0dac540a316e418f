//! Affine expressions: sums of signed factors, floors, min/max and the
//! ternary conditional.

use log::trace;
use num_traits::{One, Signed, Zero};

use super::{var_pw_aff, Parser};
use crate::frontend::token::{Token, TokenKind, TokenValue};
use crate::polyhedral::map::Map;
use crate::polyhedral::pw_aff::{list_max, list_min, PwAff};
use crate::polyhedral::space::Space;
use crate::utils::errors::{ParseError, ParseErrorKind, PolyResult, SemanticError, SemanticErrorKind};
use crate::utils::matrix::Int;

impl<'a> Parser<'a> {
    /// `[-] factor ((+|-) factor)*`.
    ///
    /// A literal directly followed by `*` or an identifier is the
    /// coefficient of the factor after it. A negative literal where an
    /// operator is expected starts the next term.
    pub(super) fn accept_affine(&mut self, space: &Space) -> PolyResult<PwAff> {
        let mut res = PwAff::val(space.clone(), Int::zero());
        let mut negate = false;
        loop {
            let tok = self.stream.next()?;
            match tok.kind {
                TokenKind::Minus => {
                    negate = !negate;
                    continue;
                }
                TokenKind::LeftParen
                | TokenKind::LeftBracket
                | TokenKind::Min
                | TokenKind::Max
                | TokenKind::Floord
                | TokenKind::Ceild
                | TokenKind::Ident
                | TokenKind::Aff => {
                    self.stream.push(tok);
                    let term = self.accept_affine_factor(space)?;
                    res = if negate { res.sub(&term)? } else { res.add(&term)? };
                }
                TokenKind::Value => {
                    let span = tok.span;
                    self.stream.push(tok);
                    let mut v = self.accept_value()?;
                    if negate {
                        v = -v;
                    }
                    let term = if self.stream.eat_if(TokenKind::Star)? || self.stream.next_is(TokenKind::Ident)? {
                        self.accept_affine_factor(space)?.scale(&v)
                    } else {
                        self.stream.push(Token::new(TokenKind::Value, span, TokenValue::Int(v)));
                        self.accept_affine_factor(space)?
                    };
                    res = res.add(&term)?;
                }
                TokenKind::Eof => {
                    return Err(ParseError::expected("affine expression", tok.to_string(), tok.span)
                        .with_kind(ParseErrorKind::UnexpectedEof)
                        .into());
                }
                _ => {
                    return Err(ParseError::unexpected("unexpected token", tok.to_string(), tok.span)
                        .with_kind(ParseErrorKind::ExpectedFactor)
                        .into());
                }
            }
            negate = false;

            let tok = self.stream.next()?;
            match tok.kind {
                TokenKind::Minus => negate = true,
                TokenKind::Plus => {}
                TokenKind::Value if tok.int().map_or(false, |v| v.is_negative()) => {
                    self.stream.push(tok);
                }
                _ => {
                    self.stream.push(tok);
                    break;
                }
            }
        }
        Ok(res)
    }

    /// A single factor, optionally followed by `% m`, `mod m`, `* c` or
    /// `/ d`.
    pub(super) fn accept_affine_factor(&mut self, space: &Space) -> PolyResult<PwAff> {
        let tok = self.stream.next()?;
        let mut res = match tok.kind {
            TokenKind::Aff => match tok.value {
                TokenValue::Aff(pa) => pa,
                _ => return Err(ParseError::unexpected("empty expression placeholder", "", tok.span).into()),
            },
            TokenKind::Ident => {
                let name = tok.text().unwrap_or_default();
                let pos = self.vars.lookup(name).ok_or_else(|| {
                    SemanticError::new(
                        SemanticErrorKind::UnknownIdentifier,
                        format!("unknown identifier '{}'", name),
                        tok.span,
                    )
                })?;
                var_pw_aff(space, pos)?
            }
            TokenKind::Value => {
                self.stream.push(tok);
                let v = self.accept_value()?;
                if self.stream.eat_if(TokenKind::Star)? {
                    self.accept_affine_factor(space)?.scale(&v)
                } else {
                    PwAff::val(space.clone(), v)
                }
            }
            TokenKind::LeftParen => {
                let pa = self.accept_affine(space)?;
                self.stream.expect(TokenKind::RightParen)?;
                pa
            }
            TokenKind::LeftBracket | TokenKind::Floord | TokenKind::Ceild => {
                self.stream.push(tok);
                self.accept_div(space)?
            }
            TokenKind::Min | TokenKind::Max => {
                self.stream.push(tok);
                self.accept_minmax(space)?
            }
            _ => {
                return Err(ParseError::expected("factor", tok.to_string(), tok.span)
                    .with_kind(ParseErrorKind::ExpectedFactor)
                    .into());
            }
        };

        if self.stream.eat_if(TokenKind::Percent)? || self.stream.eat_if(TokenKind::Mod)? {
            let m = self.accept_positive_value()?;
            return res.mod_val(&m);
        }
        if self.stream.eat_if(TokenKind::Star)? {
            let f = self.accept_cst_factor()?;
            res = res.scale(&f);
        }
        if self.stream.eat_if(TokenKind::Slash)? {
            let d = self.accept_positive_value()?;
            res = res.scale_down(&d)?;
        }
        Ok(res)
    }

    /// Product of literals `c (* c)*`.
    fn accept_cst_factor(&mut self) -> PolyResult<Int> {
        let mut f = Int::one();
        loop {
            f *= self.accept_value()?;
            if !self.stream.eat_if(TokenKind::Star)? {
                return Ok(f);
            }
        }
    }

    fn accept_value(&mut self) -> PolyResult<Int> {
        let tok = self.stream.next()?;
        match (tok.kind, tok.value) {
            (TokenKind::Value, TokenValue::Int(v)) => Ok(v),
            (kind, value) => {
                let found = Token::new(kind, tok.span, value).to_string();
                Err(ParseError::expected("constant value", found, tok.span)
                    .with_kind(ParseErrorKind::ExpectedValue)
                    .into())
            }
        }
    }

    fn accept_positive_value(&mut self) -> PolyResult<Int> {
        let tok = self.stream.next()?;
        if let Some(v) = tok.int().filter(|v| v.is_positive()) {
            return Ok(v.clone());
        }
        Err(ParseError::expected("positive constant", tok.to_string(), tok.span)
            .with_kind(ParseErrorKind::ExpectedValue)
            .into())
    }

    /// `[e]`, `[e/d]`, `floord(e, d)` or `ceild(e, d)`.
    fn accept_div(&mut self, space: &Space) -> PolyResult<PwAff> {
        let tok = self.stream.next()?;
        let is_ceil = tok.kind == TokenKind::Ceild;
        if matches!(tok.kind, TokenKind::Floord | TokenKind::Ceild) {
            self.stream.expect(TokenKind::LeftParen)?;
            let pa = self.accept_affine(space)?;
            self.stream.expect(TokenKind::Comma)?;
            let d = self.accept_positive_value()?;
            self.stream.expect(TokenKind::RightParen)?;
            let pa = pa.scale_down(&d)?;
            return if is_ceil { pa.ceil() } else { pa.floor() };
        }

        // Factors fold `e / d` into a rational expression, so `[e/d]`
        // arrives here as a single expression.
        let pa = self.accept_affine(space)?;
        self.stream.expect(TokenKind::RightBracket)?;
        trace!("floor over {} pieces", pa.n_piece());
        pa.floor()
    }

    /// `min(list)` or `max(list)`.
    fn accept_minmax(&mut self, space: &Space) -> PolyResult<PwAff> {
        let tok = self.stream.next()?;
        let is_min = tok.kind == TokenKind::Min;
        self.stream.expect(TokenKind::LeftParen)?;
        let list = self.accept_affine_list(space)?;
        self.stream.expect(TokenKind::RightParen)?;
        if is_min {
            list_min(&list)
        } else {
            list_max(&list)
        }
    }

    /// Comma-separated affine expressions.
    pub(super) fn accept_affine_list(&mut self, space: &Space) -> PolyResult<Vec<PwAff>> {
        let mut list = vec![self.accept_affine(space)?];
        while self.stream.eat_if(TokenKind::Comma)? {
            list.push(self.accept_affine(space)?);
        }
        Ok(list)
    }

    /// An affine expression, or `cond ? a : b` when a comparison follows
    /// the first expression.
    pub(super) fn accept_extended_affine(&mut self, space: &Space) -> PolyResult<PwAff> {
        let first = self.stream.next()?;
        let span = first.span;
        self.stream.push(first);

        let pa = self.accept_affine(space)?;
        let tok = self.stream.next()?;
        let is_comparison = tok.comparator().is_some();
        self.stream.push(tok);
        if !is_comparison {
            return Ok(pa);
        }

        self.stream.push(Token::aff(pa, span));
        let cond = self.read_disjuncts(Map::universe(space.clone()))?;
        self.accept_ternary(cond, space)
    }

    /// `? a : b` after the condition has been read.
    fn accept_ternary(&mut self, cond: Map, space: &Space) -> PolyResult<PwAff> {
        self.stream.expect(TokenKind::Question)?;
        let if_true = self.accept_extended_affine(space)?;
        self.stream.expect(TokenKind::Colon)?;
        let if_false = self.accept_extended_affine(space)?;
        PwAff::select_by(&cond, &if_true, &if_false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::parser::Object;
    use crate::polyhedral::space::DimType;
    use crate::utils::errors::PolyError;
    use crate::utils::location::Span;
    use crate::utils::matrix::{int, row};

    fn read(source: &str) -> Map {
        match Parser::new(source).read_object().unwrap() {
            Object::Map(m) => m,
            Object::Union(_) => panic!("expected a single set"),
        }
    }

    fn members(set: &Map, range: std::ops::RangeInclusive<i64>) -> Vec<i64> {
        range.filter(|&i| set.contains(&row(&[i])).unwrap()).collect()
    }

    fn eval(pa: &PwAff, point: &[i64]) -> Option<Int> {
        pa.eval(&row(point)).unwrap().map(|v| v.to_integer())
    }

    #[test]
    fn test_coefficients_and_signs() {
        let set = read("{ [i] : 2i - -3 = 7 }");
        assert_eq!(members(&set, -5..=5), vec![2]);
        let set = read("{ [i] : 3 * 2 * i = 12 }");
        assert_eq!(members(&set, -5..=5), vec![2]);
        let set = read("{ [i] : i-1 = 2 }");
        assert_eq!(members(&set, -5..=5), vec![3]);
    }

    #[test]
    fn test_power_literal() {
        let set = read("{ [i] : i = 2^3 }");
        assert_eq!(members(&set, 0..=10), vec![8]);
    }

    #[test]
    fn test_floord_and_ceild() {
        let pa = Parser::new("{ [i] -> [floord(i, 4)] }").read_pw_aff().unwrap();
        assert_eq!(eval(&pa, &[7]), Some(int(1)));
        assert_eq!(eval(&pa, &[-1]), Some(int(-1)));
        let pa = Parser::new("{ [i] -> [ceild(i, 4)] }").read_pw_aff().unwrap();
        assert_eq!(eval(&pa, &[7]), Some(int(2)));
        assert_eq!(eval(&pa, &[-1]), Some(int(0)));
    }

    #[test]
    fn test_floor_of_parenthesised_sum() {
        let pa = Parser::new("{ [i] -> [[(i + 1)/3]] }").read_pw_aff().unwrap();
        assert_eq!(eval(&pa, &[4]), Some(int(1)));
        assert_eq!(eval(&pa, &[5]), Some(int(2)));
        assert_eq!(pa.pieces()[0].1.local_space().n_div(), 1);
    }

    #[test]
    fn test_mod_keyword() {
        let a = read("{ [i] : i mod 3 = 1 }");
        let b = read("{ [i] : i % 3 = 1 }");
        assert_eq!(members(&a, -6..=6), members(&b, -6..=6));
        assert_eq!(members(&a, -6..=6), vec![-5, -2, 1, 4]);
    }

    #[test]
    fn test_min_max() {
        let pa = Parser::new("{ [i, j] -> [min(i, j, 3)] }").read_pw_aff().unwrap();
        assert_eq!(eval(&pa, &[5, 4]), Some(int(3)));
        assert_eq!(eval(&pa, &[1, 4]), Some(int(1)));
        let pa = Parser::new("{ [i] -> [max(i, -i)] }").read_pw_aff().unwrap();
        assert_eq!(eval(&pa, &[-7]), Some(int(7)));
    }

    #[test]
    fn test_ternary() {
        let pa = Parser::new("{ [i] -> [i >= 0 ? i : -i] }").read_pw_aff().unwrap();
        for i in -3..=3i64 {
            assert_eq!(eval(&pa, &[i]), Some(int(i.abs())));
        }
    }

    #[test]
    fn test_ternary_in_tuple() {
        let map = read("{ [i] -> [i > 2 ? 1 : 0] }");
        assert!(map.contains(&row(&[5, 1])).unwrap());
        assert!(map.contains(&row(&[1, 0])).unwrap());
        assert!(!map.contains(&row(&[1, 1])).unwrap());
        assert_eq!(map.dim(DimType::Out), 1);
    }

    #[test]
    fn test_nested_ternary() {
        let pa = Parser::new("{ [i] -> [i > 0 ? i > 5 ? 2 : 1 : 0] }").read_pw_aff().unwrap();
        assert_eq!(eval(&pa, &[7]), Some(int(2)));
        assert_eq!(eval(&pa, &[3]), Some(int(1)));
        assert_eq!(eval(&pa, &[-1]), Some(int(0)));
    }

    #[test]
    fn test_non_constant_scale_is_rejected() {
        let err = Parser::new("{ [i, j] : i * j = 0 }").read_object().unwrap_err();
        assert!(err.to_string().contains("expecting constant value"));
    }

    #[test]
    fn test_zero_denominator_is_rejected() {
        let err = Parser::new("{ [i] -> [[i/0]] }").read_object().unwrap_err();
        match err {
            PolyError::Parse(e) => assert_eq!(e.kind, ParseErrorKind::ExpectedValue),
            other => panic!("unexpected error {}", other),
        }
    }

    #[test]
    fn test_value_token_without_literal_is_rejected() {
        let mut parser = Parser::new("");
        parser.stream.push(Token::new(TokenKind::Value, Span::dummy(), TokenValue::None));
        let err = parser.accept_affine(&Space::set_alloc(0, 1)).unwrap_err();
        match err {
            PolyError::Parse(e) => assert_eq!(e.kind, ParseErrorKind::ExpectedValue),
            other => panic!("unexpected error {}", other),
        }
    }

    #[test]
    fn test_missing_factor() {
        let err = Parser::new("{ [i] : i + = 0 }").read_object().unwrap_err();
        assert!(matches!(err, PolyError::Parse(_)));
    }
}
