//! Conditions: disjunctions of conjunctions of constraints, quantifiers
//! and parenthesised sub-conditions.

use log::{debug, trace};

use super::Parser;
use crate::frontend::token::{Token, TokenKind, TokenValue};
use crate::polyhedral::map::Map;
use crate::polyhedral::pw_aff::list_cmp_set;
use crate::polyhedral::space::DimType;
use crate::utils::errors::{ParseError, ParseErrorKind, PolyResult, SemanticError, SemanticErrorKind};

impl<'a> Parser<'a> {
    /// `[(: | '|') disjuncts]`.
    pub(super) fn read_optional_disjuncts(&mut self, map: Map) -> PolyResult<Map> {
        let tok = self.stream.next()?;
        if matches!(tok.kind, TokenKind::Colon | TokenKind::Pipe) {
            self.read_disjuncts(map)
        } else {
            self.stream.push(tok);
            Ok(map)
        }
    }

    /// `conjuncts (or conjuncts)*`; an empty condition keeps `map` as is.
    pub(super) fn read_disjuncts(&mut self, map: Map) -> PolyResult<Map> {
        let tok = self.stream.next()?;
        let is_empty = matches!(tok.kind, TokenKind::RightBrace | TokenKind::Semicolon);
        self.stream.push(tok);
        if is_empty {
            return Ok(map);
        }

        let mut res = self.read_conjuncts(map.clone())?;
        while self.stream.eat_if(TokenKind::Or)? {
            let next = self.read_conjuncts(map.clone())?;
            res = res.union(&next)?;
        }
        Ok(res)
    }

    /// `[not] conjunct (and [not] conjunct)*`. A negated conjunct is
    /// subtracted from what has been built so far.
    fn read_conjuncts(&mut self, map: Map) -> PolyResult<Map> {
        let negate = self.stream.eat_if(TokenKind::Not)?;
        let mut res = self.read_conjunct(map.clone())?;
        if negate {
            res = map.subtract(&res)?;
        }
        while self.stream.eat_if(TokenKind::And)? {
            let negate = self.stream.eat_if(TokenKind::Not)?;
            let next = self.read_conjunct(map.clone())?;
            res = if negate { res.subtract(&next)? } else { res.intersect(&next)? };
        }
        Ok(res)
    }

    fn read_conjunct(&mut self, map: Map) -> PolyResult<Map> {
        if self.stream.next_is(TokenKind::LeftParen)? {
            self.resolve_paren_expr(map.clone())?;
        }

        let tok = self.stream.next()?;
        match tok.kind {
            TokenKind::Map => match tok.value {
                TokenValue::Map(m) => Ok(m),
                _ => Err(ParseError::unexpected("empty condition placeholder", "", tok.span).into()),
            },
            TokenKind::Exists => self.read_exists(map),
            TokenKind::True => Ok(map),
            TokenKind::False => Ok(Map::empty(map.space().clone())),
            _ => {
                self.stream.push(tok);
                self.add_constraint(map)
            }
        }
    }

    /// `list op list (op list)*`; every comparison is between all pairs of
    /// the two neighbouring lists.
    fn add_constraint(&mut self, mut map: Map) -> PolyResult<Map> {
        let space = map.space().clone();
        let mut lhs = self.accept_affine_list(&space)?;
        let tok = self.stream.next()?;
        let mut op = tok.comparator().ok_or_else(|| {
            ParseError::unexpected("missing operator", tok.to_string(), tok.span)
                .with_kind(ParseErrorKind::MissingOperator)
        })?;
        loop {
            let rhs = self.accept_affine_list(&space)?;
            let cond = list_cmp_set(&lhs, &rhs, op)?;
            map = map.intersect(&cond)?;
            lhs = rhs;

            let tok = self.stream.next()?;
            match tok.comparator() {
                Some(next) => op = next,
                None => {
                    self.stream.push(tok);
                    break;
                }
            }
        }
        Ok(map)
    }

    /// `exists [(] var-list : disjuncts [)]`, after the keyword.
    ///
    /// The quantified variables become trailing dimensions while the body
    /// is read and are then projected out into divisions.
    fn read_exists(&mut self, map: Map) -> PolyResult<Map> {
        let mark = self.vars.mark();
        let first = map.dim(DimType::Out);
        let seen_paren = self.stream.eat_if(TokenKind::LeftParen)?;

        let map = self.read_defined_var_list(map)?;
        self.stream.expect(TokenKind::Colon)?;
        let mut map = self.read_disjuncts(map)?;

        let n = map.dim(DimType::Out) - first;
        map.project_out(DimType::Out, first, n)?;
        let found = map.detect_div_definitions()?;
        self.vars.rollback(mark);
        if seen_paren {
            self.stream.expect(TokenKind::RightParen)?;
        }
        debug!("exists: projected out {} variables, {} division definitions recovered", n, found);
        Ok(map)
    }

    /// Fresh names, each optionally defined by `= affine`.
    fn read_defined_var_list(&mut self, mut map: Map) -> PolyResult<Map> {
        loop {
            let tok = self.stream.next()?;
            if tok.kind != TokenKind::Ident {
                self.stream.push(tok);
                break;
            }
            let name = tok.text().unwrap_or_default();
            if self.vars.lookup(name).is_some() {
                return Err(SemanticError::new(
                    SemanticErrorKind::DuplicateIdentifier,
                    format!("expecting unique identifier, found '{}'", name),
                    tok.span,
                )
                .into());
            }
            let pos = self.vars.add(Some(name.to_string()));
            map.add_dims(DimType::Out, 1)?;
            if self.stream.eat_if(TokenKind::Eq)? {
                map = self.read_var_def(map, pos)?;
            }
            if !self.stream.eat_if(TokenKind::Comma)? {
                break;
            }
        }
        Ok(map)
    }

    /// Resolve a parenthesised expression at the start of a conjunct.
    ///
    /// The parenthesis is consumed and replaced by a placeholder token: a
    /// condition if the contents are one, otherwise an affine expression
    /// that the caller goes on to compare.
    fn resolve_paren_expr(&mut self, map: Map) -> PolyResult<()> {
        let open = self.stream.expect(TokenKind::LeftParen)?;
        if self.stream.next_is(TokenKind::LeftParen)? {
            self.resolve_paren_expr(map.clone())?;
        }

        let tok = self.stream.next()?;
        let span = tok.span;
        let is_condition = matches!(
            tok.kind,
            TokenKind::Exists | TokenKind::Not | TokenKind::True | TokenKind::False | TokenKind::Map
        );
        self.stream.push(tok);

        if !is_condition {
            let pa = self.accept_affine(map.space())?;
            let placeholder = Token::aff(pa, span);
            if self.stream.eat_if(TokenKind::RightParen)? {
                trace!("parenthesised expression at {}", span);
                self.stream.push(placeholder);
                return Ok(());
            }
            self.stream.push(placeholder);
        }

        let map = self.read_disjuncts(map)?;
        let close = self.stream.expect(TokenKind::RightParen)?;
        trace!("parenthesised condition at {}", open.span);
        self.stream.push(Token::map(map, open.span.merge(&close.span)));
        Ok(())
    }

    /// Intersect `map` with `var(pos) = affine`.
    pub(super) fn read_var_def(&mut self, map: Map, pos: usize) -> PolyResult<Map> {
        let def = self.accept_extended_affine(map.space())?;
        let var = super::var_pw_aff(map.space(), pos)?;
        map.intersect(&var.eq_set(&def)?)
    }
}
