// SPDX-License-Identifier: PMPL-1.0-or-later

//! JSON/YAML graph documents

use crate::graph::{Attributes, Graph, GraphError, DEFAULT_GRAPH_ID};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphFormat {
    Json,
    Yaml,
}

impl GraphFormat {
    /// Pick a format from a file extension; anything unrecognised is JSON
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("yaml") | Some("yml") => GraphFormat::Yaml,
            _ => GraphFormat::Json,
        }
    }
}

fn default_graph_id() -> String {
    DEFAULT_GRAPH_ID.to_string()
}

fn default_directed() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphDocument {
    #[serde(default = "default_graph_id")]
    pub id: String,
    #[serde(default = "default_directed")]
    pub directed: bool,
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default)]
    pub nodes: Vec<NodeDocument>,
    #[serde(default)]
    pub edges: Vec<EdgeDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDocument {
    pub id: String,
    #[serde(default)]
    pub attributes: Attributes,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeDocument {
    #[serde(default)]
    pub id: Option<String>,
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub attributes: Attributes,
}

impl GraphDocument {
    /// Build the graph. Edges without an id are named `e<index>`.
    pub fn into_graph(self) -> Result<Graph, GraphError> {
        let mut graph = Graph::new(&self.id, self.directed);
        graph.attributes = self.attributes;
        for node in self.nodes {
            graph.add_node(&node.id)?.attributes = node.attributes;
        }
        for (index, edge) in self.edges.into_iter().enumerate() {
            let id = edge.id.unwrap_or_else(|| format!("e{}", index));
            graph.add_edge(&id, &edge.source, &edge.target)?.attributes = edge.attributes;
        }
        Ok(graph)
    }
}

pub fn parse_graph(text: &str, format: GraphFormat) -> Result<Graph> {
    let document: GraphDocument = match format {
        GraphFormat::Json => serde_json::from_str(text).context("parsing graph json")?,
        GraphFormat::Yaml => serde_yaml::from_str(text).context("parsing graph yaml")?,
    };
    Ok(document.into_graph()?)
}

pub fn load_graph(path: &Path) -> Result<Graph> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading graph {}", path.display()))?;
    parse_graph(&text, GraphFormat::from_path(path))
        .with_context(|| format!("loading graph {}", path.display()))
}
