// SPDX-License-Identifier: PMPL-1.0-or-later

//! Variable bindings with a trail for backtracking

use crate::logic::term::{Term, Var};
use std::collections::HashMap;

/// Position in the trail; undoing to a mark removes every later binding
pub type TrailMark = usize;

/// Mutable substitution. Each binding is recorded on the trail so a choice
/// point can restore the exact state it saw.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    map: HashMap<Var, Term>,
    trail: Vec<Var>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&self) -> TrailMark {
        self.trail.len()
    }

    pub fn undo_to(&mut self, mark: TrailMark) {
        while self.trail.len() > mark {
            if let Some(var) = self.trail.pop() {
                self.map.remove(&var);
            }
        }
    }

    fn bind(&mut self, var: Var, term: Term) {
        self.trail.push(var.clone());
        self.map.insert(var, term);
    }

    /// Walk a term through the bindings, resolving the outermost variable
    pub fn walk(&self, term: &Term) -> Term {
        let mut current = term;
        while let Term::Var(v) = current {
            match self.map.get(v) {
                Some(bound) => current = bound,
                None => break,
            }
        }
        current.clone()
    }

    /// Resolve a term completely, including nested compound arguments
    pub fn resolve(&self, term: &Term) -> Term {
        match self.walk(term) {
            Term::Compound(name, args) => {
                Term::Compound(name, args.iter().map(|arg| self.resolve(arg)).collect())
            }
            other => other,
        }
    }

    /// Unify two terms. On failure the bindings made during this call are
    /// undone, so the store is left exactly as it was.
    pub fn unify(&mut self, t1: &Term, t2: &Term) -> bool {
        let mark = self.mark();
        if self.unify_inner(t1, t2) {
            true
        } else {
            self.undo_to(mark);
            false
        }
    }

    fn unify_inner(&mut self, t1: &Term, t2: &Term) -> bool {
        let t1 = self.walk(t1);
        let t2 = self.walk(t2);

        match (&t1, &t2) {
            (a, b) if a == b => true,

            (Term::Var(v), _) => {
                self.bind(v.clone(), t2);
                true
            }
            (_, Term::Var(v)) => {
                self.bind(v.clone(), t1);
                true
            }

            (Term::Compound(f1, args1), Term::Compound(f2, args2)) => {
                if f1 != f2 || args1.len() != args2.len() {
                    return false;
                }
                args1
                    .iter()
                    .zip(args2.iter())
                    .all(|(a1, a2)| self.unify_inner(a1, a2))
            }

            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unification_atoms() {
        let mut b = Bindings::new();
        assert!(b.unify(&Term::atom("hello"), &Term::atom("hello")));
        assert!(!b.unify(&Term::atom("hello"), &Term::atom("world")));
    }

    #[test]
    fn test_unification_variables() {
        let mut b = Bindings::new();
        assert!(b.unify(&Term::var("X"), &Term::atom("test")));
        assert_eq!(b.resolve(&Term::var("X")), Term::atom("test"));
    }

    #[test]
    fn test_compound_unification() {
        let mut b = Bindings::new();
        let t1 = Term::compound("f", vec![Term::var("X"), Term::atom("b")]);
        let t2 = Term::compound("f", vec![Term::atom("a"), Term::atom("b")]);
        assert!(b.unify(&t1, &t2));
        assert_eq!(b.resolve(&Term::var("X")), Term::atom("a"));
    }

    #[test]
    fn test_failed_unification_leaves_no_bindings() {
        let mut b = Bindings::new();
        let t1 = Term::compound("f", vec![Term::var("X"), Term::atom("b")]);
        let t2 = Term::compound("f", vec![Term::atom("a"), Term::atom("c")]);
        assert!(!b.unify(&t1, &t2));
        assert_eq!(b.mark(), 0);
        assert!(b.resolve(&Term::var("X")).is_var());
    }

    #[test]
    fn test_undo_to_mark() {
        let mut b = Bindings::new();
        assert!(b.unify(&Term::var("X"), &Term::int(1)));
        let mark = b.mark();
        assert!(b.unify(&Term::var("Y"), &Term::var("X")));
        assert_eq!(b.resolve(&Term::var("Y")), Term::int(1));
        b.undo_to(mark);
        assert!(b.resolve(&Term::var("Y")).is_var());
        assert_eq!(b.resolve(&Term::var("X")), Term::int(1));
    }
}
