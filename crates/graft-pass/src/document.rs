// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! JSON interchange form of a host graph.
//!
//! Edges name their endpoints by node name, so documents are easy to write by
//! hand. Ports default to `0`; a negative port marks a control edge.

use graft_core::{GraphError, GraphStore, NodeDef};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for document conversion.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Malformed JSON.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    /// An edge names a node the document does not declare.
    #[error("edge references unknown node `{0}`")]
    UnknownNode(String),
    /// The graph rejected a node or edge.
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// One edge, endpoints by name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeDocument {
    /// Producer name.
    pub src: String,
    /// Producer port.
    #[serde(default)]
    pub src_port: i32,
    /// Consumer name.
    pub dst: String,
    /// Consumer port.
    #[serde(default)]
    pub dst_port: i32,
}

/// A whole graph.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    /// Nodes in insertion order.
    pub nodes: Vec<NodeDef>,
    /// Edges in insertion order.
    #[serde(default)]
    pub edges: Vec<EdgeDocument>,
}

impl GraphDocument {
    /// Parses a JSON document.
    pub fn from_json(json: &str) -> Result<Self, DocumentError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Snapshot of the live nodes and edges of `graph`, in handle order.
    pub fn from_graph(graph: &GraphStore) -> Self {
        let nodes = graph
            .iter_nodes()
            .map(|(_, rec)| NodeDef {
                name: rec.name.clone(),
                op: rec.op.clone(),
                device: rec.device.clone(),
                attrs: rec.attrs.clone(),
                inputs: rec.inputs.clone(),
            })
            .collect();
        let name_of = |id| graph.node(id).map(|n| n.name.clone()).unwrap_or_default();
        let edges = graph
            .iter_edges()
            .map(|e| EdgeDocument {
                src: name_of(e.src),
                src_port: e.src_port,
                dst: name_of(e.dst),
                dst_port: e.dst_port,
            })
            .collect();
        Self { nodes, edges }
    }

    /// Builds a fresh graph from the document.
    pub fn into_graph(self) -> Result<GraphStore, DocumentError> {
        let mut graph = GraphStore::new();
        for node in self.nodes {
            graph.add_node(node)?;
        }
        for edge in self.edges {
            let resolve = |name: &str| {
                graph
                    .node_by_name(name)
                    .ok_or_else(|| DocumentError::UnknownNode(name.to_owned()))
            };
            let src = resolve(&edge.src)?;
            let dst = resolve(&edge.dst)?;
            graph.add_edge(src, edge.src_port, dst, edge.dst_port)?;
        }
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sparse_edges_and_rebuilds_the_graph() {
        let doc = GraphDocument::from_json(
            r#"{
                "nodes": [
                    {"name": "x", "op": "Placeholder"},
                    {"name": "y", "op": "Neg", "device": "/cpu:0"}
                ],
                "edges": [{"src": "x", "dst": "y"}, {"src": "x", "src_port": -1, "dst": "y", "dst_port": -1}]
            }"#,
        )
        .expect("parse");
        let graph = doc.clone().into_graph().expect("graph");
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(GraphDocument::from_graph(&graph), doc);
    }

    #[test]
    fn unknown_endpoint_is_reported() {
        let doc = GraphDocument {
            nodes: vec![NodeDef::new("x", "Placeholder")],
            edges: vec![EdgeDocument {
                src: "x".into(),
                src_port: 0,
                dst: "ghost".into(),
                dst_port: 0,
            }],
        };
        assert!(matches!(
            doc.into_graph(),
            Err(DocumentError::UnknownNode(name)) if name == "ghost"
        ));
    }
}
