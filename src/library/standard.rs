// SPDX-License-Identifier: PMPL-1.0-or-later

//! Standard graph library
//!
//! | predicate            | kind      | scope         |
//! |----------------------|-----------|---------------|
//! | `attribute/3`        | attribute | all           |
//! | `degree/2`           | numeric   | nodes         |
//! | `in_degree/2`        | numeric   | nodes         |
//! | `out_degree/2`       | numeric   | nodes         |
//! | `component_size/2`   | numeric   | nodes         |
//! | `multiplicity/2`     | numeric   | edges         |
//! | `node_count/2`       | numeric   | graph         |
//! | `edge_count/2`       | numeric   | graph         |
//! | `is_leaf/1`          | boolean   | nodes         |
//! | `is_root/1`          | boolean   | nodes         |
//! | `is_isolated/1`      | boolean   | nodes         |
//! | `is_loop/1`          | boolean   | edges         |
//! | `is_directed/1`      | boolean   | edges, graph  |
//! | `is_connected/1`     | boolean   | graph         |
//!
//! The structural theory (`graph/1`, `node/1`, `edge/1`, `edge/2`,
//! `edge/3`) is regenerated from whichever graph the library is bound to.

use crate::graph::metrics;
use crate::graph::Graph;
use crate::library::{Declarations, Predicate, Scope};
use crate::logic::term::{Clause, Signature, Term};

pub fn declarations() -> Declarations {
    structure()
        .concat(attributes())
        .concat(node_metrics())
        .concat(edge_metrics())
        .concat(graph_metrics())
}

pub fn structure() -> Declarations {
    Declarations::new().with_theory(
        vec![
            Signature::new("graph", 1),
            Signature::new("node", 1),
            Signature::new("edge", 1),
            Signature::new("edge", 2),
            Signature::new("edge", 3),
        ],
        structural_theory,
    )
}

pub fn attributes() -> Declarations {
    Declarations::new().with(Predicate::attribute())
}

pub fn node_metrics() -> Declarations {
    Declarations::new()
        .with(Predicate::numeric("degree", Scope::NODES, metrics::degree))
        .with(Predicate::numeric("in_degree", Scope::NODES, metrics::in_degree))
        .with(Predicate::numeric("out_degree", Scope::NODES, metrics::out_degree))
        .with(Predicate::numeric("component_size", Scope::NODES, metrics::component_size))
        .with(Predicate::boolean("is_leaf", Scope::NODES, metrics::is_leaf))
        .with(Predicate::boolean("is_root", Scope::NODES, metrics::is_root))
        .with(Predicate::boolean("is_isolated", Scope::NODES, metrics::is_isolated))
}

pub fn edge_metrics() -> Declarations {
    Declarations::new()
        .with(Predicate::numeric("multiplicity", Scope::EDGES, metrics::multiplicity))
        .with(Predicate::boolean("is_loop", Scope::EDGES, metrics::is_loop))
        .with(Predicate::boolean(
            "is_directed",
            Scope::EDGES.union(Scope::GRAPH),
            metrics::is_directed,
        ))
}

pub fn graph_metrics() -> Declarations {
    Declarations::new()
        .with(Predicate::numeric("node_count", Scope::GRAPH, metrics::node_count))
        .with(Predicate::numeric("edge_count", Scope::GRAPH, metrics::edge_count))
        .with(Predicate::boolean("is_connected", Scope::GRAPH, metrics::is_connected))
}

/// Facts describing the graph's shape
pub fn structural_theory(graph: &Graph) -> Vec<Clause> {
    let id = |s: &str| Term::atom(s);
    let mut clauses = vec![Clause::fact(Term::compound("graph", vec![id(&graph.id)]))];
    for node in graph.nodes() {
        clauses.push(Clause::fact(Term::compound("node", vec![id(&node.id)])));
    }
    for edge in graph.edges() {
        clauses.push(Clause::fact(Term::compound("edge", vec![id(&edge.id)])));
        clauses.push(Clause::fact(Term::compound(
            "edge",
            vec![id(&edge.source), id(&edge.target)],
        )));
        clauses.push(Clause::fact(Term::compound(
            "edge",
            vec![id(&edge.source), id(&edge.target), id(&edge.id)],
        )));
    }
    clauses
}
