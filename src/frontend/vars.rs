//! Variable table: identifier names mapped to dimension positions.
//!
//! Positions are handed out contiguously in declaration order, so the
//! position of a variable is also the column of its dimension. Scopes
//! (quantifiers, tuples of one body) nest strictly and are left by
//! dropping the most recent entries.

use log::trace;

/// Declared variables in order; `None` marks an anonymous dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VarTable {
    entries: Vec<Option<String>>,
}

impl VarTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of declared variables.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Position of the most recent declaration of `name`.
    pub fn lookup(&self, name: &str) -> Option<usize> {
        self.entries.iter().rposition(|e| e.as_deref() == Some(name))
    }

    /// Declare a variable at the next free position.
    pub fn add(&mut self, name: Option<String>) -> usize {
        self.entries.push(name);
        self.entries.len() - 1
    }

    /// Declare an anonymous variable.
    pub fn add_anon(&mut self) -> usize {
        self.add(None)
    }

    pub fn name(&self, pos: usize) -> Option<&str> {
        self.entries.get(pos)?.as_deref()
    }

    /// Names of the variables `first..first + n`.
    pub fn names(&self, first: usize, n: usize) -> Vec<Option<String>> {
        self.entries[first..first + n].to_vec()
    }

    /// Current scope mark.
    pub fn mark(&self) -> usize {
        self.entries.len()
    }

    /// Drop every variable declared since `mark`.
    pub fn rollback(&mut self, mark: usize) {
        let n = self.entries.len().saturating_sub(mark);
        self.drop(n);
    }

    /// Drop the `n` most recent variables.
    pub fn drop(&mut self, n: usize) {
        let n = n.min(self.entries.len());
        trace!("dropping {} variables", n);
        self.entries.truncate(self.entries.len() - n);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_shadowing() {
        let mut vars = VarTable::new();
        assert_eq!(vars.add(Some("i".into())), 0);
        assert_eq!(vars.add(Some("j".into())), 1);
        assert_eq!(vars.lookup("i"), Some(0));
        let mark = vars.mark();
        let inner = vars.add(Some("i".into()));
        assert_eq!(vars.lookup("i"), Some(inner));
        vars.rollback(mark);
        assert_eq!(vars.lookup("i"), Some(0));
    }

    #[test]
    fn test_anonymous_entries() {
        let mut vars = VarTable::new();
        vars.add_anon();
        vars.add(Some("x".into()));
        assert_eq!(vars.name(0), None);
        assert_eq!(vars.lookup("x"), Some(1));
        assert_eq!(vars.names(0, 2), vec![None, Some("x".to_string())]);
    }

    proptest! {
        #[test]
        fn prop_drop_restores_scope(
            outer in proptest::collection::vec("[a-d]", 0..6),
            inner in proptest::collection::vec(proptest::option::of("[a-f]"), 0..8),
        ) {
            let mut vars = VarTable::new();
            for name in &outer {
                vars.add(Some(name.clone()));
            }
            let before = vars.clone();
            for name in &inner {
                vars.add(name.clone());
            }
            vars.drop(inner.len());
            prop_assert_eq!(&vars, &before);
            for name in &outer {
                prop_assert_eq!(vars.lookup(name), before.lookup(name));
            }
        }
    }
}
