// SPDX-License-Identifier: PMPL-1.0-or-later

//! SLD resolution over compiled clauses and a foreign predicate library
//!
//! Solutions are produced lazily: [`Solutions`] keeps a goal list, a stack
//! of choice points and a binding trail, and only does the work needed for
//! the next answer. Dropping it abandons the search; nothing outside the
//! iterator is touched.
//!
//! Built-in control: `true`, `fail`, `','/2`, `';'/2`, `not/1` (negation as
//! failure) and the numeric comparisons `== != < <= > >=`. Clauses for one
//! signature are tried in declaration order, the library's derived theory
//! first.

use crate::config::EngineConfig;
use crate::graph::Graph;
use crate::library::Library;
use crate::logic::bindings::{Bindings, TrailMark};
use crate::logic::term::{Clause, Signature, Term, Var};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;
use tracing::{debug, trace, warn};

/// Goal names handled by the engine itself
pub const COMPARISONS: &[&str] = &["==", "!=", "<", "<=", ">", ">="];

pub struct Engine {
    library: Library,
    database: HashMap<Signature, Vec<Clause>>,
    clause_count: usize,
    config: EngineConfig,
}

impl Engine {
    pub fn new(library: Library) -> Self {
        Self::with_config(library, EngineConfig::default())
    }

    pub fn with_config(library: Library, config: EngineConfig) -> Self {
        Self {
            library,
            database: HashMap::new(),
            clause_count: 0,
            config,
        }
    }

    /// Add clauses to the database, keeping their relative order
    pub fn load_theory(&mut self, clauses: impl IntoIterator<Item = Clause>) {
        let mut loaded = 0;
        for clause in clauses {
            if let Some(sig) = clause.signature() {
                self.database.entry(sig).or_default().push(clause);
                loaded += 1;
            }
        }
        self.clause_count += loaded;
        debug!(loaded, total = self.clause_count, "theory loaded");
    }

    pub fn clear_theory(&mut self) {
        self.database.clear();
        self.clause_count = 0;
    }

    pub fn clause_count(&self) -> usize {
        self.clause_count
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    /// Rebind the library's graph. Needs `&mut self`, so no resolution can
    /// be running against the old one.
    pub fn set_graph(&mut self, graph: Graph) -> Graph {
        self.library.set_graph(graph)
    }

    /// Lazily enumerate the solutions of `goal`
    pub fn solve(&self, goal: Term) -> Solutions<'_> {
        let query_vars = goal
            .variables()
            .into_iter()
            .filter(|v| !v.name.starts_with('_'))
            .collect();
        Solutions {
            engine: self,
            bindings: Bindings::new(),
            goals: cons(goal, 0, None),
            stack: Vec::new(),
            query_vars,
            next_scope: 0,
            state: State::Fresh,
            emitted: 0,
            depth_exceeded: false,
        }
    }

    /// True when `goal` has at least one solution
    pub fn holds(&self, goal: Term) -> bool {
        self.solve(goal).next().is_some()
    }

    fn clauses_for(&self, signature: &Signature) -> Vec<&Clause> {
        self.library
            .theory(signature)
            .iter()
            .chain(self.database.get(signature).into_iter().flatten())
            .collect()
    }
}

/// Variable bindings of one answer, keyed by the goal's variable names
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Solution {
    bindings: BTreeMap<String, Term>,
}

impl Solution {
    pub fn get(&self, name: &str) -> Option<&Term> {
        self.bindings.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Term)> {
        self.bindings.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl fmt::Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bindings.is_empty() {
            return f.write_str("true");
        }
        for (i, (name, value)) in self.bindings.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} = {}", name, value)?;
        }
        Ok(())
    }
}

struct GoalNode {
    goal: Term,
    depth: usize,
    next: Goals,
}

type Goals = Option<Rc<GoalNode>>;

fn cons(goal: Term, depth: usize, next: Goals) -> Goals {
    Some(Rc::new(GoalNode { goal, depth, next }))
}

enum Alternative<'a> {
    /// Resume with the stored goal list (right branch of a disjunction)
    Goals,
    /// Try the remaining clauses for a goal
    Clauses {
        goal: Term,
        depth: usize,
        candidates: Rc<[&'a Clause]>,
        next: usize,
    },
}

struct ChoicePoint<'a> {
    mark: TrailMark,
    goals: Goals,
    alternative: Alternative<'a>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Fresh,
    Yielded,
    Done,
}

/// Lazy, restartable-from-scratch sequence of answers to one goal
pub struct Solutions<'a> {
    engine: &'a Engine,
    bindings: Bindings,
    goals: Goals,
    stack: Vec<ChoicePoint<'a>>,
    query_vars: Vec<Var>,
    next_scope: u32,
    state: State,
    emitted: usize,
    depth_exceeded: bool,
}

impl<'a> Iterator for Solutions<'a> {
    type Item = Solution;

    fn next(&mut self) -> Option<Solution> {
        match self.state {
            State::Done => return None,
            State::Yielded => {
                if !self.backtrack() {
                    self.state = State::Done;
                    return None;
                }
            }
            State::Fresh => {}
        }

        if let Some(limit) = self.engine.config.max_solutions {
            if self.emitted >= limit {
                self.state = State::Done;
                return None;
            }
        }

        loop {
            let Some(node) = self.goals.take() else {
                self.state = State::Yielded;
                self.emitted += 1;
                return Some(self.solution());
            };
            self.goals = node.next.clone();
            if !self.step(&node.goal, node.depth) && !self.backtrack() {
                self.state = State::Done;
                return None;
            }
        }
    }
}

impl<'a> Solutions<'a> {
    /// True when the search stopped a branch at the configured depth limit
    pub fn depth_exceeded(&self) -> bool {
        self.depth_exceeded
    }

    fn solution(&self) -> Solution {
        Solution {
            bindings: self
                .query_vars
                .iter()
                .map(|v| (v.name.clone(), self.bindings.resolve(&Term::Var(v.clone()))))
                .collect(),
        }
    }

    fn step(&mut self, goal: &Term, depth: usize) -> bool {
        let goal = self.bindings.walk(goal);
        trace!(%goal, depth, "step");
        match &goal {
            Term::Atom(name) if name == "true" => true,
            Term::Atom(name) if name == "fail" || name == "false" => false,
            Term::Compound(name, args) if name == "," && args.len() == 2 => {
                let rest = cons(args[1].clone(), depth, self.goals.take());
                self.goals = cons(args[0].clone(), depth, rest);
                true
            }
            Term::Compound(name, args) if name == ";" && args.len() == 2 => {
                let continuation = self.goals.take();
                self.stack.push(ChoicePoint {
                    mark: self.bindings.mark(),
                    goals: cons(args[1].clone(), depth, continuation.clone()),
                    alternative: Alternative::Goals,
                });
                self.goals = cons(args[0].clone(), depth, continuation);
                true
            }
            Term::Compound(name, args) if name == "not" && args.len() == 1 => {
                !self.provable(&args[0], depth)
            }
            Term::Compound(name, args) if args.len() == 2 && COMPARISONS.contains(&name.as_str()) => {
                self.compare(name, &args[0], &args[1])
            }
            Term::Atom(_) | Term::Compound(..) => self.call(goal, depth),
            Term::Var(_) | Term::Number(_) => {
                debug!(%goal, "goal is not callable");
                false
            }
        }
    }

    fn call(&mut self, goal: Term, depth: usize) -> bool {
        let Some(signature) = goal.signature() else {
            return false;
        };
        let engine = self.engine;

        if engine.library.is_foreign(&signature) {
            let args: Vec<Term> = goal.args().iter().map(|a| self.bindings.resolve(a)).collect();
            let Some(unifications) = engine.library.call(&signature, &args) else {
                return false;
            };
            let mark = self.bindings.mark();
            for (left, right) in &unifications {
                if !self.bindings.unify(left, right) {
                    self.bindings.undo_to(mark);
                    return false;
                }
            }
            return true;
        }

        if depth >= engine.config.max_depth {
            if !self.depth_exceeded {
                warn!(%signature, depth, "resolution depth limit reached; branch cut");
                self.depth_exceeded = true;
            }
            return false;
        }

        let candidates: Rc<[&'a Clause]> = engine.clauses_for(&signature).into();
        if candidates.is_empty() {
            trace!(%signature, "no clauses");
            return false;
        }
        let continuation = self.goals.take();
        self.try_clauses(goal, depth, candidates, 0, continuation)
    }

    fn try_clauses(
        &mut self,
        goal: Term,
        depth: usize,
        candidates: Rc<[&'a Clause]>,
        start: usize,
        continuation: Goals,
    ) -> bool {
        for i in start..candidates.len() {
            let mark = self.bindings.mark();
            self.next_scope += 1;
            let clause = candidates[i].rename(self.next_scope);
            if !self.bindings.unify(&goal, &clause.head) {
                continue;
            }
            if i + 1 < candidates.len() {
                self.stack.push(ChoicePoint {
                    mark,
                    goals: continuation.clone(),
                    alternative: Alternative::Clauses {
                        goal: goal.clone(),
                        depth,
                        candidates: Rc::clone(&candidates),
                        next: i + 1,
                    },
                });
            }
            let mut goals = continuation;
            for body_goal in clause.body.into_iter().rev() {
                goals = cons(body_goal, depth + 1, goals);
            }
            self.goals = goals;
            return true;
        }
        false
    }

    fn backtrack(&mut self) -> bool {
        while let Some(choice) = self.stack.pop() {
            self.bindings.undo_to(choice.mark);
            match choice.alternative {
                Alternative::Goals => {
                    self.goals = choice.goals;
                    return true;
                }
                Alternative::Clauses {
                    goal,
                    depth,
                    candidates,
                    next,
                } => {
                    if self.try_clauses(goal, depth, candidates, next, choice.goals) {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Negation as failure: run `goal` in a throwaway copy of the bindings
    fn provable(&mut self, goal: &Term, depth: usize) -> bool {
        let mut inner = Solutions {
            engine: self.engine,
            bindings: self.bindings.clone(),
            goals: cons(goal.clone(), depth, None),
            stack: Vec::new(),
            query_vars: Vec::new(),
            next_scope: self.next_scope,
            state: State::Fresh,
            emitted: 0,
            depth_exceeded: false,
        };
        let found = inner.next().is_some();
        self.next_scope = inner.next_scope;
        self.depth_exceeded |= inner.depth_exceeded;
        found
    }

    fn compare(&self, op: &str, left: &Term, right: &Term) -> bool {
        let left = self.bindings.resolve(left);
        let right = self.bindings.resolve(right);
        if let (Term::Number(a), Term::Number(b)) = (&left, &right) {
            let Some(ordering) = a.numeric_cmp(*b) else {
                return op == "!=";
            };
            return match op {
                "==" => ordering.is_eq(),
                "!=" => ordering.is_ne(),
                "<" => ordering.is_lt(),
                "<=" => ordering.is_le(),
                ">" => ordering.is_gt(),
                ">=" => ordering.is_ge(),
                _ => false,
            };
        }
        match op {
            "==" => left == right,
            "!=" => left != right,
            _ => {
                debug!(%left, op, %right, "ordering comparison needs numbers");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::Library;

    fn family() -> Engine {
        let mut engine = Engine::new(Library::standard(Graph::default()));
        let parent = |a: &str, b: &str| {
            Clause::fact(Term::compound("parent", vec![Term::atom(a), Term::atom(b)]))
        };
        engine.load_theory(vec![
            parent("tom", "bob"),
            parent("tom", "liz"),
            parent("bob", "ann"),
            // grandparent(X, Z) :- parent(X, Y), parent(Y, Z).
            Clause::rule(
                Term::compound("grandparent", vec![Term::var("X"), Term::var("Z")]),
                vec![
                    Term::compound("parent", vec![Term::var("X"), Term::var("Y")]),
                    Term::compound("parent", vec![Term::var("Y"), Term::var("Z")]),
                ],
            ),
        ]);
        engine
    }

    #[test]
    fn test_facts_in_declaration_order() {
        let engine = family();
        let answers: Vec<String> = engine
            .solve(Term::compound("parent", vec![Term::atom("tom"), Term::var("C")]))
            .map(|s| s.to_string())
            .collect();
        assert_eq!(answers, vec!["C = bob", "C = liz"]);
    }

    #[test]
    fn test_rule_resolution() {
        let engine = family();
        let answers: Vec<Solution> = engine
            .solve(Term::compound("grandparent", vec![Term::var("G"), Term::var("C")]))
            .collect();
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].get("G"), Some(&Term::atom("tom")));
        assert_eq!(answers[0].get("C"), Some(&Term::atom("ann")));
    }

    #[test]
    fn test_negation_and_disjunction() {
        let engine = family();
        // parent(tom, C), not(parent(C, _))
        let goal = Term::conjunction(vec![
            Term::compound("parent", vec![Term::atom("tom"), Term::var("C")]),
            Term::compound(
                "not",
                vec![Term::compound("parent", vec![Term::var("C"), Term::var("_")])],
            ),
        ]);
        let answers: Vec<String> = engine.solve(goal).map(|s| s.to_string()).collect();
        assert_eq!(answers, vec!["C = liz"]);

        let goal = Term::disjunction(vec![
            Term::compound("parent", vec![Term::atom("bob"), Term::var("C")]),
            Term::compound("parent", vec![Term::atom("liz"), Term::var("C")]),
            Term::compound("==", vec![Term::var("C"), Term::atom("zed")]),
        ]);
        let answers: Vec<String> = engine.solve(goal).map(|s| s.to_string()).collect();
        assert_eq!(answers, vec!["C = ann"]);
    }

    #[test]
    fn test_comparisons() {
        let engine = family();
        assert!(engine.holds(Term::compound("<", vec![Term::int(2), Term::float(2.5)])));
        assert!(engine.holds(Term::compound("==", vec![Term::int(3), Term::float(3.0)])));
        assert!(!engine.holds(Term::compound(">", vec![Term::atom("b"), Term::atom("a")])));
        assert!(engine.holds(Term::compound("!=", vec![Term::atom("b"), Term::atom("a")])));
    }

    #[test]
    fn test_clear_theory_keeps_library() {
        let mut engine = family();
        assert_eq!(engine.clause_count(), 4);
        engine.clear_theory();
        assert_eq!(engine.clause_count(), 0);
        assert!(!engine.holds(Term::compound("parent", vec![Term::var("A"), Term::var("B")])));
        assert!(engine.holds(Term::compound("graph", vec![Term::atom("graph")])));
    }

    #[test]
    fn test_unknown_predicate_fails() {
        let engine = family();
        assert!(!engine.holds(Term::compound("sibling", vec![Term::var("A"), Term::var("B")])));
        assert!(!engine.holds(Term::var("G")));
    }

    #[test]
    fn test_depth_limit_cuts_infinite_recursion() {
        let config = EngineConfig {
            max_depth: 20,
            max_solutions: None,
        };
        let mut engine = Engine::with_config(Library::standard(Graph::default()), config);
        // loop :- loop.
        engine.load_theory(vec![Clause::rule(Term::atom("loop"), vec![Term::atom("loop")])]);
        let mut solutions = engine.solve(Term::atom("loop"));
        assert!(solutions.next().is_none());
        assert!(solutions.depth_exceeded());
    }

    #[test]
    fn test_lazy_infinite_generator_can_be_abandoned() {
        let mut engine = Engine::new(Library::standard(Graph::default()));
        // nat(zero). nat(s(X)) :- nat(X).
        engine.load_theory(vec![
            Clause::fact(Term::compound("nat", vec![Term::atom("zero")])),
            Clause::rule(
                Term::compound("nat", vec![Term::compound("s", vec![Term::var("X")])]),
                vec![Term::compound("nat", vec![Term::var("X")])],
            ),
        ]);
        let first: Vec<String> = engine
            .solve(Term::compound("nat", vec![Term::var("N")]))
            .take(3)
            .map(|s| s.to_string())
            .collect();
        assert_eq!(first, vec!["N = zero", "N = s(zero)", "N = s(s(zero))"]);
    }

    #[test]
    fn test_max_solutions() {
        let config = EngineConfig {
            max_depth: 512,
            max_solutions: Some(1),
        };
        let mut engine = Engine::with_config(Library::standard(Graph::default()), config);
        engine.load_theory(family().database.into_values().flatten());
        let goal = Term::compound("parent", vec![Term::var("P"), Term::var("C")]);
        assert_eq!(engine.solve(goal).count(), 1);
    }
}
