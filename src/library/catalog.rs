// SPDX-License-Identifier: PMPL-1.0-or-later

//! Graph-independent view of a library's predicate names
//!
//! The checker validates scripts against a catalog, so it never needs a
//! bound graph.

use crate::logic::term::Signature;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinKind {
    /// Facts derived from graph structure (`node/1`, `edge/3`, ...)
    Structural,
    Attribute,
    Numeric,
    Boolean,
    /// Produced by the compiler itself; never defined by scripts
    Reserved,
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: BTreeMap<String, BTreeMap<usize, BuiltinKind>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, signature: Signature, kind: BuiltinKind) {
        self.entries
            .entry(signature.name)
            .or_default()
            .insert(signature.arity, kind);
    }

    pub fn reserve(&mut self, name: &str, arity: usize) {
        self.insert(Signature::new(name, arity), BuiltinKind::Reserved);
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn kind(&self, name: &str, arity: usize) -> Option<BuiltinKind> {
        self.entries.get(name)?.get(&arity).copied()
    }

    /// Arities a built-in name is declared with, ascending
    pub fn arities(&self, name: &str) -> Vec<usize> {
        self.entries
            .get(name)
            .map(|arities| arities.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn signatures(&self) -> impl Iterator<Item = (Signature, BuiltinKind)> + '_ {
        self.entries.iter().flat_map(|(name, arities)| {
            arities
                .iter()
                .map(move |(arity, kind)| (Signature::new(name, *arity), *kind))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiple_arities_per_name() {
        let mut catalog = Catalog::new();
        catalog.insert(Signature::new("edge", 3), BuiltinKind::Structural);
        catalog.insert(Signature::new("edge", 1), BuiltinKind::Structural);
        catalog.reserve("query", 2);

        assert_eq!(catalog.arities("edge"), vec![1, 3]);
        assert_eq!(catalog.kind("edge", 2), None);
        assert_eq!(catalog.kind("query", 2), Some(BuiltinKind::Reserved));
        assert!(catalog.contains_name("edge"));
        assert!(!catalog.contains_name("color"));
        assert_eq!(catalog.signatures().count(), 3);
    }
}
