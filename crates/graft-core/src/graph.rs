// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Arena-backed host graph used by the matcher, the rewriter, and tests.
use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::ident::{EdgeId, NodeId};
use crate::node_def::NodeDef;
use crate::record::{EdgeRecord, NodeRecord};

/// 32-byte BLAKE3 digest.
pub type Hash = [u8; 32];

/// Errors returned by [`GraphStore`] primitives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// The node handle does not resolve to a live node.
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
    /// The edge handle does not resolve to a live edge.
    #[error("unknown edge {0}")]
    UnknownEdge(EdgeId),
    /// A node with this name already exists.
    #[error("duplicate node name `{0}`")]
    DuplicateName(String),
    /// Node descriptors must carry a name.
    #[error("node descriptor has an empty name")]
    EmptyName,
    /// Node descriptors must carry an operator kind.
    #[error("node `{0}` has an empty operator kind")]
    EmptyOp(String),
    /// The node still has incident edges.
    #[error("node {0} still has incident edges")]
    NodeHasEdges(NodeId),
    /// The arena ran out of 32-bit handles.
    #[error("graph arena capacity exhausted")]
    Capacity,
}

/// In-memory host graph.
///
/// Nodes and edges live in arenas addressed by [`NodeId`] / [`EdgeId`].
/// Removal tombstones the slot, so handles stay stable for the lifetime of
/// the store and a stale handle resolves to `None`.
#[derive(Debug, Clone, Default)]
pub struct GraphStore {
    nodes: Vec<Option<NodeRecord>>,
    edges: Vec<Option<EdgeRecord>>,
    /// Inbound edge ids per node slot, in insertion order.
    in_edges: Vec<Vec<EdgeId>>,
    /// Outbound edge ids per node slot, in insertion order.
    out_edges: Vec<Vec<EdgeId>>,
    names: FxHashMap<String, NodeId>,
    live_nodes: usize,
    live_edges: usize,
}

impl GraphStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.live_nodes
    }

    /// Number of live edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.live_edges
    }

    /// Returns the node record when `id` is live.
    pub fn node(&self, id: NodeId) -> Option<&NodeRecord> {
        self.nodes.get(id.index()).and_then(Option::as_ref)
    }

    /// Returns the operator kind of a live node.
    pub fn op(&self, id: NodeId) -> Option<&str> {
        self.node(id).map(|n| n.op.as_str())
    }

    /// Looks a node up by its unique name.
    pub fn node_by_name(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).copied()
    }

    /// Returns the edge record when `id` is live.
    pub fn edge(&self, id: EdgeId) -> Option<&EdgeRecord> {
        self.edges.get(id.index()).and_then(Option::as_ref)
    }

    /// Returns `true` if an edge with `id` is live.
    #[must_use]
    pub fn has_edge(&self, id: EdgeId) -> bool {
        self.edge(id).is_some()
    }

    /// Iterate over live nodes in handle order.
    #[allow(clippy::cast_possible_truncation)] // add_node caps the arena at u32::MAX
    pub fn iter_nodes(&self) -> impl Iterator<Item = (NodeId, &NodeRecord)> {
        self.nodes.iter().enumerate().filter_map(|(i, slot)| {
            slot.as_ref().map(|rec| (NodeId(i as u32), rec))
        })
    }

    /// Iterate over live edges in handle order.
    pub fn iter_edges(&self) -> impl Iterator<Item = &EdgeRecord> {
        self.edges.iter().filter_map(Option::as_ref)
    }

    /// Inbound edges of `node` (data and control), in insertion order.
    ///
    /// Yields nothing for unknown nodes.
    pub fn in_edges(&self, node: NodeId) -> impl Iterator<Item = &EdgeRecord> {
        self.in_edges
            .get(node.index())
            .into_iter()
            .flatten()
            .filter_map(|id| self.edge(*id))
    }

    /// Outbound edges of `node` (data and control), in insertion order.
    ///
    /// Yields nothing for unknown nodes.
    pub fn out_edges(&self, node: NodeId) -> impl Iterator<Item = &EdgeRecord> {
        self.out_edges
            .get(node.index())
            .into_iter()
            .flatten()
            .filter_map(|id| self.edge(*id))
    }

    /// Outbound data edges of `node` grouped by source port, ports ascending.
    ///
    /// Control edges are excluded.
    pub fn out_edges_by_port(&self, node: NodeId) -> BTreeMap<i32, Vec<EdgeRecord>> {
        let mut groups: BTreeMap<i32, Vec<EdgeRecord>> = BTreeMap::new();
        for edge in self.out_edges(node).filter(|e| !e.is_control()) {
            groups.entry(edge.src_port).or_default().push(*edge);
        }
        groups
    }

    /// Validates `def` and inserts it as a new node.
    ///
    /// # Errors
    /// - [`GraphError::EmptyName`] / [`GraphError::EmptyOp`] for incomplete descriptors
    /// - [`GraphError::DuplicateName`] when the name is taken
    /// - [`GraphError::Capacity`] when the arena is full
    pub fn add_node(&mut self, def: NodeDef) -> Result<NodeId, GraphError> {
        if def.name.is_empty() {
            return Err(GraphError::EmptyName);
        }
        if def.op.is_empty() {
            return Err(GraphError::EmptyOp(def.name));
        }
        if self.names.contains_key(&def.name) {
            return Err(GraphError::DuplicateName(def.name));
        }
        let id = NodeId(u32::try_from(self.nodes.len()).map_err(|_| GraphError::Capacity)?);
        self.names.insert(def.name.clone(), id);
        self.nodes.push(Some(NodeRecord {
            name: def.name,
            op: def.op,
            device: def.device,
            attrs: def.attrs,
            inputs: def.inputs,
        }));
        self.in_edges.push(Vec::new());
        self.out_edges.push(Vec::new());
        self.live_nodes += 1;
        Ok(id)
    }

    /// Adds a directed edge `src:src_port -> dst:dst_port`.
    ///
    /// Negative ports create a control edge.
    ///
    /// # Errors
    /// [`GraphError::UnknownNode`] when either endpoint is not live.
    pub fn add_edge(
        &mut self,
        src: NodeId,
        src_port: i32,
        dst: NodeId,
        dst_port: i32,
    ) -> Result<EdgeId, GraphError> {
        for node in [src, dst] {
            if self.node(node).is_none() {
                return Err(GraphError::UnknownNode(node));
            }
        }
        let id = EdgeId(u32::try_from(self.edges.len()).map_err(|_| GraphError::Capacity)?);
        self.edges.push(Some(EdgeRecord {
            id,
            src,
            src_port,
            dst,
            dst_port,
        }));
        self.out_edges[src.index()].push(id);
        self.in_edges[dst.index()].push(id);
        self.live_edges += 1;
        Ok(id)
    }

    /// Removes a live edge and returns its record.
    ///
    /// # Errors
    /// [`GraphError::UnknownEdge`] when the edge is not live.
    pub fn remove_edge(&mut self, id: EdgeId) -> Result<EdgeRecord, GraphError> {
        let edge = self
            .edges
            .get_mut(id.index())
            .and_then(Option::take)
            .ok_or(GraphError::UnknownEdge(id))?;
        if let Some(out) = self.out_edges.get_mut(edge.src.index()) {
            out.retain(|e| *e != id);
        }
        if let Some(inb) = self.in_edges.get_mut(edge.dst.index()) {
            inb.retain(|e| *e != id);
        }
        self.live_edges -= 1;
        Ok(edge)
    }

    /// Removes a node that has no incident edges.
    ///
    /// Removal does not cascade: callers detach edges first, which keeps every
    /// remaining edge pointing at a live node.
    ///
    /// # Errors
    /// - [`GraphError::UnknownNode`] if the node is not live
    /// - [`GraphError::NodeHasEdges`] if any edge still touches the node
    pub fn remove_node_isolated(&mut self, id: NodeId) -> Result<NodeRecord, GraphError> {
        if self.node(id).is_none() {
            return Err(GraphError::UnknownNode(id));
        }
        if self.in_edges(id).next().is_some() || self.out_edges(id).next().is_some() {
            return Err(GraphError::NodeHasEdges(id));
        }
        let record = self.nodes[id.index()]
            .take()
            .ok_or(GraphError::UnknownNode(id))?;
        self.names.remove(&record.name);
        self.live_nodes -= 1;
        Ok(record)
    }

    /// Computes a canonical BLAKE3 digest of the live graph.
    ///
    /// Two stores with the same live node and edge sets (same handles, same
    /// records) hash equal regardless of adjacency-list ordering.
    ///
    /// Layout:
    /// 1. Header `b"GRAFT_STATE_HASH_V1\0"`
    /// 2. Node count (u64 LE), then per node in handle order:
    ///    `b"N\0"` + id + name + op + device + inputs + attrs
    /// 3. Edge count (u64 LE), then per edge in handle order:
    ///    `b"E\0"` + id + src + `src_port` + dst + `dst_port`
    #[must_use]
    pub fn canonical_state_hash(&self) -> Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"GRAFT_STATE_HASH_V1\0");

        hasher.update(&(self.live_nodes as u64).to_le_bytes());
        for (id, rec) in self.iter_nodes() {
            hasher.update(b"N\0");
            hasher.update(&id.0.to_le_bytes());
            hash_str(&mut hasher, &rec.name);
            hash_str(&mut hasher, &rec.op);
            hash_str(&mut hasher, &rec.device);
            hasher.update(&(rec.inputs.len() as u64).to_le_bytes());
            for input in &rec.inputs {
                hash_str(&mut hasher, input);
            }
            hasher.update(&(rec.attrs.len() as u64).to_le_bytes());
            for (key, value) in &rec.attrs {
                hash_str(&mut hasher, key);
                hash_str(&mut hasher, &format!("{value:?}"));
            }
        }

        hasher.update(&(self.live_edges as u64).to_le_bytes());
        for edge in self.iter_edges() {
            hasher.update(b"E\0");
            hasher.update(&edge.id.0.to_le_bytes());
            hasher.update(&edge.src.0.to_le_bytes());
            hasher.update(&edge.src_port.to_le_bytes());
            hasher.update(&edge.dst.0.to_le_bytes());
            hasher.update(&edge.dst_port.to_le_bytes());
        }

        *hasher.finalize().as_bytes()
    }
}

fn hash_str(hasher: &mut blake3::Hasher, s: &str) {
    hasher.update(&(s.len() as u64).to_le_bytes());
    hasher.update(s.as_bytes());
}
