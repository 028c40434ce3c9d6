// SPDX-License-Identifier: PMPL-1.0-or-later

//! Attributed graph model
//!
//! Nodes, edges and the graph itself are elements with a string id and a
//! map of attributes. Ids are unique across all three kinds so an element
//! can be looked up by id alone, which is how logic terms refer to them.

pub mod document;
pub mod metrics;

use crate::logic::term::Number;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use thiserror::Error;

pub use document::{load_graph, parse_graph, GraphDocument, GraphFormat};

pub const DEFAULT_GRAPH_ID: &str = "graph";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("duplicate element id: {0}")]
    DuplicateId(String),

    #[error("edge {edge} refers to unknown node {node}")]
    UnknownEndpoint { edge: String, node: String },

    #[error("unknown element: {0}")]
    UnknownElement(String),
}

/// Attribute value as stored on an element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl AttrValue {
    /// String form used when a value is handed to the logic side
    pub fn render(&self) -> String {
        match self {
            AttrValue::Text(s) => s.clone(),
            AttrValue::Int(i) => i.to_string(),
            AttrValue::Float(f) => f.to_string(),
            AttrValue::Bool(b) => b.to_string(),
        }
    }

    /// Stored string, if the value is textual
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The value read as a number. Text is parsed; booleans never convert.
    pub fn as_number(&self) -> Option<Number> {
        match self {
            AttrValue::Int(i) => Some(Number::Int(*i)),
            AttrValue::Float(f) => Some(Number::Float(*f)),
            AttrValue::Text(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .map(Number::Int)
                    .or_else(|_| s.parse::<f64>().map(Number::Float))
                    .ok()
            }
            AttrValue::Bool(_) => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Float(value)
    }
}

pub type Attributes = BTreeMap<String, AttrValue>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Node,
    Edge,
    Graph,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ElementKind::Node => "node",
            ElementKind::Edge => "edge",
            ElementKind::Graph => "graph",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: String,
    pub attributes: Attributes,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub attributes: Attributes,
}

impl Edge {
    pub fn is_loop(&self) -> bool {
        self.source == self.target
    }

    pub fn touches(&self, node: &str) -> bool {
        self.source == node || self.target == node
    }
}

/// Borrowed view of any element
#[derive(Debug, Clone, Copy)]
pub enum Element<'g> {
    Node(&'g Node),
    Edge(&'g Edge),
    Graph(&'g Graph),
}

impl<'g> Element<'g> {
    pub fn kind(&self) -> ElementKind {
        match self {
            Element::Node(_) => ElementKind::Node,
            Element::Edge(_) => ElementKind::Edge,
            Element::Graph(_) => ElementKind::Graph,
        }
    }

    pub fn id(&self) -> &'g str {
        match self {
            Element::Node(n) => &n.id,
            Element::Edge(e) => &e.id,
            Element::Graph(g) => &g.id,
        }
    }

    pub fn attributes(&self) -> &'g Attributes {
        match self {
            Element::Node(n) => &n.attributes,
            Element::Edge(e) => &e.attributes,
            Element::Graph(g) => &g.attributes,
        }
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes().contains_key(name)
    }

    pub fn attribute(&self, name: &str) -> Option<&'g AttrValue> {
        self.attributes().get(name)
    }

    pub fn numeric_attribute(&self, name: &str) -> Option<Number> {
        self.attribute(name).and_then(AttrValue::as_number)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Graph,
    Node(usize),
    Edge(usize),
}

#[derive(Debug, Clone)]
pub struct Graph {
    pub id: String,
    pub directed: bool,
    pub attributes: Attributes,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    index: HashMap<String, Slot>,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new(DEFAULT_GRAPH_ID, true)
    }
}

impl Graph {
    pub fn new(id: &str, directed: bool) -> Self {
        let mut index = HashMap::new();
        index.insert(id.to_string(), Slot::Graph);
        Self {
            id: id.to_string(),
            directed,
            attributes: Attributes::new(),
            nodes: Vec::new(),
            edges: Vec::new(),
            index,
        }
    }

    pub fn add_node(&mut self, id: &str) -> Result<&mut Node, GraphError> {
        if self.index.contains_key(id) {
            return Err(GraphError::DuplicateId(id.to_string()));
        }
        self.index.insert(id.to_string(), Slot::Node(self.nodes.len()));
        self.nodes.push(Node {
            id: id.to_string(),
            attributes: Attributes::new(),
        });
        let last = self.nodes.len() - 1;
        Ok(&mut self.nodes[last])
    }

    pub fn add_edge(&mut self, id: &str, source: &str, target: &str) -> Result<&mut Edge, GraphError> {
        if self.index.contains_key(id) {
            return Err(GraphError::DuplicateId(id.to_string()));
        }
        for endpoint in [source, target] {
            if !matches!(self.index.get(endpoint), Some(Slot::Node(_))) {
                return Err(GraphError::UnknownEndpoint {
                    edge: id.to_string(),
                    node: endpoint.to_string(),
                });
            }
        }
        self.index.insert(id.to_string(), Slot::Edge(self.edges.len()));
        self.edges.push(Edge {
            id: id.to_string(),
            source: source.to_string(),
            target: target.to_string(),
            attributes: Attributes::new(),
        });
        let last = self.edges.len() - 1;
        Ok(&mut self.edges[last])
    }

    /// Set an attribute on any element by id
    pub fn set_attribute(
        &mut self,
        id: &str,
        name: &str,
        value: impl Into<AttrValue>,
    ) -> Result<(), GraphError> {
        let attributes = match self.index.get(id).copied() {
            Some(Slot::Graph) => &mut self.attributes,
            Some(Slot::Node(i)) => &mut self.nodes[i].attributes,
            Some(Slot::Edge(i)) => &mut self.edges[i].attributes,
            None => return Err(GraphError::UnknownElement(id.to_string())),
        };
        attributes.insert(name.to_string(), value.into());
        Ok(())
    }

    pub fn get_by_id(&self, id: &str) -> Option<Element<'_>> {
        match self.index.get(id)? {
            Slot::Graph => Some(Element::Graph(self)),
            Slot::Node(i) => self.nodes.get(*i).map(Element::Node),
            Slot::Edge(i) => self.edges.get(*i).map(Element::Edge),
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Ids of nodes adjacent to `node`, ignoring edge direction
    pub fn neighbors<'a>(&'a self, node: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.edges.iter().filter_map(move |e| {
            if e.source == node {
                Some(e.target.as_str())
            } else if e.target == node {
                Some(e.source.as_str())
            } else {
                None
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Graph {
        let mut g = Graph::default();
        g.add_node("a").unwrap();
        g.add_node("b").unwrap();
        g.add_edge("ab", "a", "b").unwrap();
        g.set_attribute("a", "color", "red").unwrap();
        g.set_attribute("ab", "weight", 3i64).unwrap();
        g
    }

    #[test]
    fn test_lookup_by_id_across_kinds() {
        let g = sample();
        assert_eq!(g.get_by_id("a").map(|e| e.kind()), Some(ElementKind::Node));
        assert_eq!(g.get_by_id("ab").map(|e| e.kind()), Some(ElementKind::Edge));
        assert_eq!(g.get_by_id("graph").map(|e| e.kind()), Some(ElementKind::Graph));
        assert!(g.get_by_id("zzz").is_none());
    }

    #[test]
    fn test_ids_are_unique() {
        let mut g = sample();
        assert_eq!(g.add_node("ab").unwrap_err(), GraphError::DuplicateId("ab".into()));
        assert!(matches!(
            g.add_edge("bc", "b", "c"),
            Err(GraphError::UnknownEndpoint { .. })
        ));
    }

    #[test]
    fn test_attribute_reads() {
        let g = sample();
        let a = g.get_by_id("a").unwrap();
        assert!(a.has_attribute("color"));
        assert_eq!(a.attribute("color").map(AttrValue::render), Some("red".into()));
        assert_eq!(a.numeric_attribute("color"), None);

        let ab = g.get_by_id("ab").unwrap();
        assert_eq!(ab.numeric_attribute("weight"), Some(Number::Int(3)));
    }

    #[test]
    fn test_text_reads_as_number() {
        assert_eq!(AttrValue::from("42").as_number(), Some(Number::Int(42)));
        assert_eq!(AttrValue::from(" 1.5 ").as_number(), Some(Number::Float(1.5)));
        assert_eq!(AttrValue::Bool(true).as_number(), None);
        assert_eq!(AttrValue::Float(2.0).render(), "2");
    }
}
