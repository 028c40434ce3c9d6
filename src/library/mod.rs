// SPDX-License-Identifier: PMPL-1.0-or-later

//! Foreign predicate bridge
//!
//! A [`Library`] maps `name/arity` to native handlers that answer goals from
//! the live graph. Libraries are assembled from [`Declarations`], which are
//! plain data and compose by concatenation.
//!
//! Handlers return a three-way [`Outcome`]. Faults (a precondition a handler
//! could not meet) are turned into plain failure by [`Library::call`] before
//! they reach the engine, so a bad argument can never corrupt resolution.

pub mod catalog;
pub mod standard;

use crate::graph::metrics::{BooleanMetric, NumericMetric};
use crate::graph::{Element, ElementKind, Graph};
use crate::logic::term::{Clause, Signature, Term};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

pub use catalog::{BuiltinKind, Catalog};

/// Term pairs a successful call asks the engine to unify
pub type Unifications = Vec<(Term, Term)>;

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Succeed(Unifications),
    Fail,
    Fault(Fault),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Fault {
    #[error("{predicate}: argument {position} is unbound")]
    Unbound { predicate: Signature, position: usize },

    #[error("{predicate}: argument {position} must be {expected}, found {found}")]
    Shape {
        predicate: Signature,
        position: usize,
        expected: &'static str,
        found: Term,
    },

    #[error("{predicate}: attribute {attribute} of {element} is not numeric")]
    NotNumeric {
        predicate: Signature,
        element: String,
        attribute: String,
    },

    #[error("{predicate}: metric undefined for {kind} {element}")]
    Undefined {
        predicate: Signature,
        kind: ElementKind,
        element: String,
    },

    #[error("{predicate}: called with {found} arguments")]
    Arity { predicate: Signature, found: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredicateKind {
    Attribute,
    Numeric,
    Boolean,
}

/// Element kinds a predicate accepts as its subject
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scope {
    pub nodes: bool,
    pub edges: bool,
    pub graph: bool,
}

impl Scope {
    pub const NODES: Scope = Scope {
        nodes: true,
        edges: false,
        graph: false,
    };
    pub const EDGES: Scope = Scope {
        nodes: false,
        edges: true,
        graph: false,
    };
    pub const GRAPH: Scope = Scope {
        nodes: false,
        edges: false,
        graph: true,
    };
    pub const ALL: Scope = Scope {
        nodes: true,
        edges: true,
        graph: true,
    };

    pub fn union(self, other: Scope) -> Scope {
        Scope {
            nodes: self.nodes || other.nodes,
            edges: self.edges || other.edges,
            graph: self.graph || other.graph,
        }
    }

    pub fn contains(self, kind: ElementKind) -> bool {
        match kind {
            ElementKind::Node => self.nodes,
            ElementKind::Edge => self.edges,
            ElementKind::Graph => self.graph,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = [
            (self.nodes, "nodes"),
            (self.edges, "edges"),
            (self.graph, "graph"),
        ]
        .iter()
        .filter(|(on, _)| *on)
        .map(|(_, name)| *name)
        .collect();
        f.write_str(&parts.join(","))
    }
}

pub type Handler = Arc<dyn Fn(&Graph, &[Term]) -> Outcome + Send + Sync>;

/// A registered foreign predicate
#[derive(Clone)]
pub struct Predicate {
    pub signature: Signature,
    pub kind: PredicateKind,
    pub scope: Scope,
    handler: Handler,
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate")
            .field("signature", &self.signature)
            .field("kind", &self.kind)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Resolve the subject argument. Unknown ids are `Ok(None)`: absence is a
/// logical failure, not a fault.
fn subject<'g>(
    graph: &'g Graph,
    predicate: &Signature,
    arg: &Term,
) -> Result<Option<Element<'g>>, Fault> {
    match arg {
        Term::Atom(id) => Ok(graph.get_by_id(id)),
        Term::Var(_) => Err(Fault::Unbound {
            predicate: predicate.clone(),
            position: 1,
        }),
        other => Err(Fault::Shape {
            predicate: predicate.clone(),
            position: 1,
            expected: "an element id",
            found: other.clone(),
        }),
    }
}

fn check_arity(predicate: &Signature, args: &[Term]) -> Result<(), Fault> {
    if args.len() == predicate.arity {
        Ok(())
    } else {
        Err(Fault::Arity {
            predicate: predicate.clone(),
            found: args.len(),
        })
    }
}

fn attribute_goal(graph: &Graph, predicate: &Signature, args: &[Term]) -> Result<Outcome, Fault> {
    check_arity(predicate, args)?;
    let Some(element) = subject(graph, predicate, &args[0])? else {
        return Ok(Outcome::Fail);
    };
    let name = match &args[1] {
        Term::Atom(name) => name,
        Term::Var(_) => {
            return Err(Fault::Unbound {
                predicate: predicate.clone(),
                position: 2,
            })
        }
        other => {
            return Err(Fault::Shape {
                predicate: predicate.clone(),
                position: 2,
                expected: "an attribute name",
                found: other.clone(),
            })
        }
    };
    let Some(stored) = element.attribute(name) else {
        return Ok(Outcome::Fail);
    };

    let outcome = match &args[2] {
        // string equality only; a numeric attribute never equals an atom
        Term::Atom(value) => {
            if stored.as_text() == Some(value.as_str()) {
                Outcome::Succeed(Vec::new())
            } else {
                Outcome::Fail
            }
        }
        Term::Number(value) => {
            let actual = stored.as_number().ok_or_else(|| Fault::NotNumeric {
                predicate: predicate.clone(),
                element: element.id().to_string(),
                attribute: name.clone(),
            })?;
            if actual.numeric_eq(*value) {
                Outcome::Succeed(Vec::new())
            } else {
                Outcome::Fail
            }
        }
        var @ Term::Var(_) => Outcome::Succeed(vec![(var.clone(), Term::Atom(stored.render()))]),
        Term::Compound(..) => Outcome::Fail,
    };
    Ok(outcome)
}

fn numeric_goal(
    graph: &Graph,
    predicate: &Signature,
    scope: Scope,
    metric: NumericMetric,
    args: &[Term],
) -> Result<Outcome, Fault> {
    check_arity(predicate, args)?;
    let Some(element) = subject(graph, predicate, &args[0])? else {
        return Ok(Outcome::Fail);
    };
    if !scope.contains(element.kind()) {
        return Ok(Outcome::Fail);
    }
    let actual = metric(graph, element).ok_or_else(|| Fault::Undefined {
        predicate: predicate.clone(),
        kind: element.kind(),
        element: element.id().to_string(),
    })?;

    let outcome = match &args[1] {
        Term::Number(expected) => {
            if actual.numeric_eq(*expected) {
                Outcome::Succeed(Vec::new())
            } else {
                Outcome::Fail
            }
        }
        var @ Term::Var(_) => Outcome::Succeed(vec![(var.clone(), Term::Number(actual))]),
        _ => Outcome::Fail,
    };
    Ok(outcome)
}

fn boolean_goal(
    graph: &Graph,
    predicate: &Signature,
    scope: Scope,
    metric: BooleanMetric,
    args: &[Term],
) -> Result<Outcome, Fault> {
    check_arity(predicate, args)?;
    let Some(element) = subject(graph, predicate, &args[0])? else {
        return Ok(Outcome::Fail);
    };
    if !scope.contains(element.kind()) {
        return Ok(Outcome::Fail);
    }
    let holds = metric(graph, element).ok_or_else(|| Fault::Undefined {
        predicate: predicate.clone(),
        kind: element.kind(),
        element: element.id().to_string(),
    })?;
    Ok(if holds {
        Outcome::Succeed(Vec::new())
    } else {
        Outcome::Fail
    })
}

impl Predicate {
    pub fn new(signature: Signature, kind: PredicateKind, scope: Scope, handler: Handler) -> Self {
        Self {
            signature,
            kind,
            scope,
            handler,
        }
    }

    /// `attribute(Id, Name, Value)` over every element kind
    pub fn attribute() -> Self {
        let signature = Signature::new("attribute", 3);
        let sig = signature.clone();
        Self::new(
            signature,
            PredicateKind::Attribute,
            Scope::ALL,
            Arc::new(move |graph: &Graph, args: &[Term]| {
                attribute_goal(graph, &sig, args).unwrap_or_else(Outcome::Fault)
            }),
        )
    }

    /// `name(Key, Value)` backed by a numeric metric
    pub fn numeric(name: &str, scope: Scope, metric: NumericMetric) -> Self {
        let signature = Signature::new(name, 2);
        let sig = signature.clone();
        Self::new(
            signature,
            PredicateKind::Numeric,
            scope,
            Arc::new(move |graph: &Graph, args: &[Term]| {
                numeric_goal(graph, &sig, scope, metric, args).unwrap_or_else(Outcome::Fault)
            }),
        )
    }

    /// `name(Key)` backed by a boolean metric
    pub fn boolean(name: &str, scope: Scope, metric: BooleanMetric) -> Self {
        let signature = Signature::new(name, 1);
        let sig = signature.clone();
        Self::new(
            signature,
            PredicateKind::Boolean,
            scope,
            Arc::new(move |graph: &Graph, args: &[Term]| {
                boolean_goal(graph, &sig, scope, metric, args).unwrap_or_else(Outcome::Fault)
            }),
        )
    }

    /// Run the handler without fault containment
    pub fn invoke(&self, graph: &Graph, args: &[Term]) -> Outcome {
        (self.handler)(graph, args)
    }
}

pub type TheoryBuilder = fn(&Graph) -> Vec<Clause>;

/// Clauses a library derives from its bound graph
#[derive(Clone)]
pub struct TheoryDecl {
    pub signatures: Vec<Signature>,
    pub build: TheoryBuilder,
}

/// Declarative content of a library: foreign predicates plus derived theory
#[derive(Clone, Default)]
pub struct Declarations {
    predicates: Vec<Predicate>,
    theories: Vec<TheoryDecl>,
}

impl Declarations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn with_theory(mut self, signatures: Vec<Signature>, build: TheoryBuilder) -> Self {
        self.theories.push(TheoryDecl { signatures, build });
        self
    }

    /// Concatenate two declaration sets; later predicates replace earlier
    /// ones with the same signature when a library is built
    pub fn concat(mut self, other: Declarations) -> Self {
        self.predicates.extend(other.predicates);
        self.theories.extend(other.theories);
        self
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Signatures and kinds, independent of any graph
    pub fn catalog(&self) -> Catalog {
        let mut catalog = Catalog::new();
        for theory in &self.theories {
            for sig in &theory.signatures {
                catalog.insert(sig.clone(), BuiltinKind::Structural);
            }
        }
        for predicate in &self.predicates {
            let kind = match predicate.kind {
                PredicateKind::Attribute => BuiltinKind::Attribute,
                PredicateKind::Numeric => BuiltinKind::Numeric,
                PredicateKind::Boolean => BuiltinKind::Boolean,
            };
            catalog.insert(predicate.signature.clone(), kind);
        }
        catalog
    }
}

/// A predicate library bound to one graph instance
pub struct Library {
    graph: Graph,
    predicates: HashMap<Signature, Predicate>,
    theories: Vec<TheoryDecl>,
    theory: HashMap<Signature, Vec<Clause>>,
}

impl Library {
    pub fn new(graph: Graph, declarations: Declarations) -> Self {
        let predicates = declarations
            .predicates
            .into_iter()
            .map(|p| (p.signature.clone(), p))
            .collect();
        let mut library = Self {
            graph,
            predicates,
            theories: declarations.theories,
            theory: HashMap::new(),
        };
        library.rebuild_theory();
        library
    }

    /// Library with the standard graph predicates
    pub fn standard(graph: Graph) -> Self {
        Self::new(graph, standard::declarations())
    }

    fn rebuild_theory(&mut self) {
        self.theory.clear();
        for decl in &self.theories {
            for clause in (decl.build)(&self.graph) {
                if let Some(sig) = clause.signature() {
                    self.theory.entry(sig).or_default().push(clause);
                }
            }
        }
        debug!(
            graph = %self.graph.id,
            clauses = self.theory.values().map(Vec::len).sum::<usize>(),
            "library theory rebuilt"
        );
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Bind a new graph, keeping every registration. Returns the old graph.
    pub fn set_graph(&mut self, graph: Graph) -> Graph {
        let previous = std::mem::replace(&mut self.graph, graph);
        self.rebuild_theory();
        previous
    }

    pub fn lookup(&self, signature: &Signature) -> Option<&Predicate> {
        self.predicates.get(signature)
    }

    pub fn is_foreign(&self, signature: &Signature) -> bool {
        self.predicates.contains_key(signature)
    }

    /// Declared clauses for a signature, derived from the bound graph
    pub fn theory(&self, signature: &Signature) -> &[Clause] {
        self.theory.get(signature).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Registered predicates ordered by signature
    pub fn predicates(&self) -> Vec<&Predicate> {
        let mut all: Vec<&Predicate> = self.predicates.values().collect();
        all.sort_by(|a, b| a.signature.cmp(&b.signature));
        all
    }

    /// Call a foreign predicate. `None` is logical failure; faults are
    /// logged and reported as failure.
    pub fn call(&self, signature: &Signature, args: &[Term]) -> Option<Unifications> {
        let predicate = self.lookup(signature)?;
        match predicate.invoke(&self.graph, args) {
            Outcome::Succeed(unifications) => Some(unifications),
            Outcome::Fail => None,
            Outcome::Fault(fault) => {
                debug!(predicate = %signature, %fault, "predicate fault contained");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::term::Number;

    fn graph() -> Graph {
        let mut g = Graph::default();
        g.add_node("n").unwrap();
        g.add_node("m").unwrap();
        g.add_edge("nm", "n", "m").unwrap();
        g.set_attribute("n", "color", "red").unwrap();
        g.set_attribute("n", "size", 12i64).unwrap();
        g.set_attribute("n", "ratio", "0.5").unwrap();
        g
    }

    fn attr(id: Term, name: &str, value: Term) -> Outcome {
        Predicate::attribute().invoke(&graph(), &[id, Term::atom(name), value])
    }

    #[test]
    fn test_attribute_modes() {
        let n = || Term::atom("n");
        assert_eq!(attr(n(), "color", Term::atom("red")), Outcome::Succeed(vec![]));
        assert_eq!(attr(n(), "color", Term::atom("blue")), Outcome::Fail);
        assert_eq!(
            attr(n(), "color", Term::var("V")),
            Outcome::Succeed(vec![(Term::var("V"), Term::atom("red"))])
        );
        assert_eq!(attr(n(), "missing", Term::var("V")), Outcome::Fail);
        assert_eq!(attr(Term::atom("nope"), "color", Term::var("V")), Outcome::Fail);
    }

    #[test]
    fn test_attribute_numeric_comparison() {
        let n = || Term::atom("n");
        assert_eq!(attr(n(), "size", Term::int(12)), Outcome::Succeed(vec![]));
        assert_eq!(attr(n(), "size", Term::float(12.0)), Outcome::Succeed(vec![]));
        assert_eq!(attr(n(), "ratio", Term::float(0.5)), Outcome::Succeed(vec![]));
        assert_eq!(attr(n(), "size", Term::int(13)), Outcome::Fail);
        // no coercion between stored numbers and atoms
        assert_eq!(attr(n(), "size", Term::atom("12")), Outcome::Fail);
        assert!(matches!(attr(n(), "color", Term::int(1)), Outcome::Fault(Fault::NotNumeric { .. })));
    }

    #[test]
    fn test_attribute_other_shapes_fail_closed() {
        let value = Term::compound("f", vec![Term::atom("red")]);
        assert_eq!(attr(Term::atom("n"), "color", value), Outcome::Fail);
        assert!(matches!(
            attr(Term::var("X"), "color", Term::var("V")),
            Outcome::Fault(Fault::Unbound { position: 1, .. })
        ));
        assert!(matches!(
            attr(Term::int(3), "color", Term::var("V")),
            Outcome::Fault(Fault::Shape { .. })
        ));
    }

    #[test]
    fn test_library_call_contains_faults() {
        let library = Library::standard(graph());
        let sig = Signature::new("attribute", 3);
        let args = [Term::var("X"), Term::atom("color"), Term::var("V")];
        assert_eq!(library.call(&sig, &args), None);
        let args = [Term::atom("n"), Term::atom("color"), Term::var("V")];
        assert_eq!(
            library.call(&sig, &args),
            Some(vec![(Term::var("V"), Term::atom("red"))])
        );
    }

    #[test]
    fn test_metric_scope_is_enforced() {
        let library = Library::standard(graph());
        let degree = Signature::new("degree", 2);
        assert_eq!(
            library.call(&degree, &[Term::atom("n"), Term::var("D")]),
            Some(vec![(Term::var("D"), Term::Number(Number::Int(1)))])
        );
        assert_eq!(library.call(&degree, &[Term::atom("nm"), Term::var("D")]), None);
        assert_eq!(library.call(&degree, &[Term::atom("n"), Term::atom("one")]), None);

        let is_loop = Signature::new("is_loop", 1);
        assert_eq!(library.call(&is_loop, &[Term::atom("nm")]), None);
        assert_eq!(library.call(&is_loop, &[Term::atom("n")]), None);
    }

    #[test]
    fn test_set_graph_keeps_registrations() {
        let mut library = Library::standard(graph());
        let before = library.predicates().len();
        let nodes = Signature::new("node", 1);
        assert_eq!(library.theory(&nodes).len(), 2);

        let old = library.set_graph(Graph::default());
        assert_eq!(old.node_count(), 2);
        assert_eq!(library.predicates().len(), before);
        assert!(library.theory(&nodes).is_empty());
    }

    #[test]
    fn test_concat_overrides_by_signature() {
        fn always(_: &Graph, _: Element<'_>) -> Option<bool> {
            Some(true)
        }
        let decls = standard::declarations().concat(
            Declarations::new().with(Predicate::boolean("is_loop", Scope::ALL, always)),
        );
        let library = Library::new(graph(), decls);
        assert!(library
            .call(&Signature::new("is_loop", 1), &[Term::atom("n")])
            .is_some());
    }
}
