//! Tuple shapes: `[name] '[' item (, item)* ']'`, continued tuples
//! `A[i][j]` and wrapped relations `[[a] -> [b]]`.

use log::debug;

use super::{dim_name, Parser};
use crate::frontend::token::TokenKind;
use crate::polyhedral::map::Map;
use crate::polyhedral::space::{DimType, Tuple};
use crate::utils::errors::{ParseError, PolyResult, SemanticError, SemanticErrorKind};

impl<'a> Parser<'a> {
    /// Returns true if a tuple starts here: `[` or a name followed by `[`.
    pub(super) fn next_is_tuple(&mut self) -> PolyResult<bool> {
        let cp = self.stream.checkpoint();
        let tok = self.stream.next()?;
        let is_tuple = match tok.kind {
            TokenKind::LeftBracket => true,
            TokenKind::Ident => self.stream.next_is(TokenKind::LeftBracket)?,
            _ if tok.is_keyword() => self.stream.next_is(TokenKind::LeftBracket)?,
            _ => false,
        };
        self.stream.restore(cp);
        Ok(is_tuple)
    }

    /// Returns true if the items of the tuple being read form a wrapped
    /// relation: a tuple whose matching `]` is followed by `->`.
    fn next_is_nested_tuple(&mut self) -> PolyResult<bool> {
        if !self.next_is_tuple()? {
            return Ok(false);
        }
        let cp = self.stream.checkpoint();
        let mut depth = 0usize;
        let is_nested = loop {
            let tok = self.stream.next()?;
            match tok.kind {
                TokenKind::LeftBracket => depth += 1,
                TokenKind::RightBracket => {
                    depth -= 1;
                    if depth == 0 {
                        break self.stream.next_is(TokenKind::Arrow)?;
                    }
                }
                TokenKind::Eof => break false,
                _ => {}
            }
        };
        self.stream.restore(cp);
        Ok(is_nested)
    }

    /// Read a tuple, adding its variables as dimensions of `kind` to the
    /// working relation.
    pub(super) fn read_tuple(&mut self, map: Map, kind: DimType) -> PolyResult<(Map, Tuple)> {
        let mut tok = self.stream.next()?;
        let mut name = None;
        if tok.kind == TokenKind::Ident || tok.is_keyword() {
            name = tok.text().map(str::to_string);
            tok = self.stream.next()?;
        }
        if tok.kind != TokenKind::LeftBracket {
            return Err(ParseError::expected("'['", tok.to_string(), tok.span).into());
        }

        let (map, mut tuple) = if kind != DimType::Param && self.next_is_nested_tuple()? {
            let (map, domain) = self.read_tuple(map, kind)?;
            self.stream.expect(TokenKind::Arrow)?;
            let (map, range) = self.read_tuple(map, kind)?;
            (map, Tuple::wrap(None, domain, range))
        } else {
            self.read_var_list(map, kind)?
        };
        self.stream.expect(TokenKind::RightBracket)?;

        tuple.name = name;
        debug!(
            "read {}tuple {} with {} dimensions",
            if tuple.nested.is_some() { "nested " } else { "" },
            tuple.name.as_deref().unwrap_or("<anonymous>"),
            tuple.len()
        );
        Ok((map, tuple))
    }

    /// Items of a tuple up to (not including) the closing `]`.
    ///
    /// A fresh identifier declares a new variable. Anything else is an
    /// expression defining an anonymous variable, except in a parameter
    /// tuple where only fresh names are allowed.
    fn read_var_list(&mut self, mut map: Map, kind: DimType) -> PolyResult<(Map, Tuple)> {
        let mut ids = Vec::new();
        if self.stream.next_is(TokenKind::RightBracket)? {
            return Ok((map, Tuple::new(None, ids)));
        }

        loop {
            let tok = self.stream.next()?;
            let fresh = tok.kind == TokenKind::Ident
                && tok.text().map_or(false, |name| self.vars.lookup(name).is_none());

            if fresh {
                let ident = tok.text().unwrap_or_default().to_string();
                ids.push(Some(dim_name(&ident)));
                let pos = self.vars.add(Some(ident));
                map.add_dims(kind, 1)?;
                if self.stream.eat_if(TokenKind::Eq)? {
                    map = self.read_var_def(map, pos)?;
                }
            } else if kind == DimType::Param {
                return Err(if tok.kind == TokenKind::Ident {
                    SemanticError::new(
                        SemanticErrorKind::DuplicateIdentifier,
                        format!("expecting unique identifier, found '{}'", tok),
                        tok.span,
                    )
                    .into()
                } else {
                    ParseError::expected("unique identifier", tok.to_string(), tok.span).into()
                });
            } else {
                self.stream.push(tok);
                let pos = self.vars.add_anon();
                ids.push(None);
                map.add_dims(kind, 1)?;
                map = self.read_var_def(map, pos)?;
            }

            let tok = self.stream.next()?;
            match tok.kind {
                TokenKind::Comma => {}
                TokenKind::RightBracket if self.stream.next_is(TokenKind::LeftBracket)? => {
                    self.stream.next()?;
                }
                _ => {
                    self.stream.push(tok);
                    break;
                }
            }
        }
        Ok((map, Tuple::new(None, ids)))
    }
}
