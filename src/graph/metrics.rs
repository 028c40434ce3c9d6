// SPDX-License-Identifier: PMPL-1.0-or-later

//! Derived metrics over graph elements
//!
//! Metrics are pure functions of the current graph state. They return `None`
//! when applied to an element of a kind they are not defined for.

use crate::graph::{Element, Graph};
use crate::logic::term::Number;
use std::collections::{HashSet, VecDeque};

pub type NumericMetric = fn(&Graph, Element<'_>) -> Option<Number>;
pub type BooleanMetric = fn(&Graph, Element<'_>) -> Option<bool>;

fn count_in(graph: &Graph, node: &str) -> usize {
    graph.edges().iter().filter(|e| e.target == node).count()
}

fn count_out(graph: &Graph, node: &str) -> usize {
    graph.edges().iter().filter(|e| e.source == node).count()
}

fn node_degree(graph: &Graph, node: &str) -> usize {
    // a self-loop contributes both of its endpoints
    count_in(graph, node) + count_out(graph, node)
}

fn component_of(graph: &Graph, start: &str) -> HashSet<String> {
    let mut seen = HashSet::new();
    let mut queue = VecDeque::new();
    seen.insert(start.to_string());
    queue.push_back(start.to_string());
    while let Some(current) = queue.pop_front() {
        for next in graph.neighbors(&current) {
            if seen.insert(next.to_string()) {
                queue.push_back(next.to_string());
            }
        }
    }
    seen
}

pub fn degree(graph: &Graph, element: Element<'_>) -> Option<Number> {
    match element {
        Element::Node(n) => Some(Number::Int(node_degree(graph, &n.id) as i64)),
        _ => None,
    }
}

/// Incoming edge count; in an undirected graph this is the degree
pub fn in_degree(graph: &Graph, element: Element<'_>) -> Option<Number> {
    match element {
        Element::Node(n) if graph.directed => Some(Number::Int(count_in(graph, &n.id) as i64)),
        Element::Node(_) => degree(graph, element),
        _ => None,
    }
}

/// Outgoing edge count; in an undirected graph this is the degree
pub fn out_degree(graph: &Graph, element: Element<'_>) -> Option<Number> {
    match element {
        Element::Node(n) if graph.directed => Some(Number::Int(count_out(graph, &n.id) as i64)),
        Element::Node(_) => degree(graph, element),
        _ => None,
    }
}

/// Number of nodes reachable from the node, ignoring direction, itself included
pub fn component_size(graph: &Graph, element: Element<'_>) -> Option<Number> {
    match element {
        Element::Node(n) => Some(Number::Int(component_of(graph, &n.id).len() as i64)),
        _ => None,
    }
}

/// Number of edges sharing this edge's endpoints (the edge itself included)
pub fn multiplicity(graph: &Graph, element: Element<'_>) -> Option<Number> {
    let Element::Edge(edge) = element else {
        return None;
    };
    let count = graph
        .edges()
        .iter()
        .filter(|e| {
            (e.source == edge.source && e.target == edge.target)
                || (!graph.directed && e.source == edge.target && e.target == edge.source)
        })
        .count();
    Some(Number::Int(count as i64))
}

pub fn node_count(graph: &Graph, element: Element<'_>) -> Option<Number> {
    match element {
        Element::Graph(_) => Some(Number::Int(graph.node_count() as i64)),
        _ => None,
    }
}

pub fn edge_count(graph: &Graph, element: Element<'_>) -> Option<Number> {
    match element {
        Element::Graph(_) => Some(Number::Int(graph.edge_count() as i64)),
        _ => None,
    }
}

/// Directed: a sink with at least one incoming edge. Undirected: degree one.
pub fn is_leaf(graph: &Graph, element: Element<'_>) -> Option<bool> {
    let Element::Node(n) = element else {
        return None;
    };
    if graph.directed {
        Some(count_out(graph, &n.id) == 0 && count_in(graph, &n.id) > 0)
    } else {
        Some(node_degree(graph, &n.id) == 1)
    }
}

/// Directed: a source with at least one outgoing edge. Never true undirected.
pub fn is_root(graph: &Graph, element: Element<'_>) -> Option<bool> {
    let Element::Node(n) = element else {
        return None;
    };
    Some(graph.directed && count_in(graph, &n.id) == 0 && count_out(graph, &n.id) > 0)
}

pub fn is_isolated(graph: &Graph, element: Element<'_>) -> Option<bool> {
    match element {
        Element::Node(n) => Some(node_degree(graph, &n.id) == 0),
        _ => None,
    }
}

pub fn is_loop(_graph: &Graph, element: Element<'_>) -> Option<bool> {
    match element {
        Element::Edge(e) => Some(e.is_loop()),
        _ => None,
    }
}

pub fn is_directed(graph: &Graph, element: Element<'_>) -> Option<bool> {
    match element {
        Element::Edge(_) | Element::Graph(_) => Some(graph.directed),
        Element::Node(_) => None,
    }
}

/// Weakly connected; the empty graph counts as connected
pub fn is_connected(graph: &Graph, element: Element<'_>) -> Option<bool> {
    let Element::Graph(_) = element else {
        return None;
    };
    match graph.nodes().first() {
        None => Some(true),
        Some(first) => Some(component_of(graph, &first.id).len() == graph.node_count()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // a -> b -> c, a -> c, d isolated, c -> c loop
    fn sample(directed: bool) -> Graph {
        let mut g = Graph::new("g", directed);
        for id in ["a", "b", "c", "d"] {
            g.add_node(id).unwrap();
        }
        g.add_edge("ab", "a", "b").unwrap();
        g.add_edge("bc", "b", "c").unwrap();
        g.add_edge("ac", "a", "c").unwrap();
        g.add_edge("cc", "c", "c").unwrap();
        g
    }

    fn el<'g>(g: &'g Graph, id: &str) -> Element<'g> {
        g.get_by_id(id).unwrap()
    }

    #[test]
    fn test_degrees() {
        let g = sample(true);
        assert_eq!(degree(&g, el(&g, "a")), Some(Number::Int(2)));
        assert_eq!(degree(&g, el(&g, "c")), Some(Number::Int(4)));
        assert_eq!(in_degree(&g, el(&g, "c")), Some(Number::Int(3)));
        assert_eq!(out_degree(&g, el(&g, "a")), Some(Number::Int(2)));
        assert_eq!(degree(&g, el(&g, "ab")), None);
    }

    #[test]
    fn test_undirected_degrees_are_symmetric() {
        let g = sample(false);
        assert_eq!(in_degree(&g, el(&g, "b")), Some(Number::Int(2)));
        assert_eq!(out_degree(&g, el(&g, "b")), Some(Number::Int(2)));
        assert_eq!(is_root(&g, el(&g, "a")), Some(false));
    }

    #[test]
    fn test_components_and_connectivity() {
        let g = sample(true);
        assert_eq!(component_size(&g, el(&g, "a")), Some(Number::Int(3)));
        assert_eq!(component_size(&g, el(&g, "d")), Some(Number::Int(1)));
        assert_eq!(is_connected(&g, el(&g, "g")), Some(false));

        let empty = Graph::default();
        assert_eq!(is_connected(&empty, el(&empty, "graph")), Some(true));
    }

    #[test]
    fn test_boolean_node_metrics() {
        let g = sample(true);
        assert_eq!(is_root(&g, el(&g, "a")), Some(true));
        assert_eq!(is_leaf(&g, el(&g, "b")), Some(false));
        assert_eq!(is_isolated(&g, el(&g, "d")), Some(true));
        assert_eq!(is_loop(&g, el(&g, "cc")), Some(true));
        assert_eq!(is_loop(&g, el(&g, "ab")), Some(false));
        assert_eq!(is_directed(&g, el(&g, "a")), None);
    }

    #[test]
    fn test_multiplicity_respects_direction() {
        let mut g = sample(false);
        g.add_edge("ba", "b", "a").unwrap();
        assert_eq!(multiplicity(&g, el(&g, "ab")), Some(Number::Int(2)));

        let mut g = sample(true);
        g.add_edge("ba", "b", "a").unwrap();
        assert_eq!(multiplicity(&g, el(&g, "ab")), Some(Number::Int(1)));
    }
}
