// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Node descriptors: the builder template authors use to synthesize a
//! replacement node before handing it to [`crate::GraphStore::add_node`].
use std::collections::BTreeMap;

use crate::graph::{GraphError, GraphStore};
use crate::record::{AttrValue, EdgeRecord, NodeRecord};

/// Unvalidated description of a node to add to a [`GraphStore`].
///
/// The store validates the descriptor on insertion; building one never fails.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct NodeDef {
    /// Node name; must be unique in the target store.
    pub name: String,
    /// Operator kind tag.
    pub op: String,
    /// Device/placement tag.
    pub device: String,
    /// Attribute map.
    pub attrs: BTreeMap<String, AttrValue>,
    /// Named input references (`node_name:port`).
    pub inputs: Vec<String>,
}

impl NodeDef {
    /// Starts a descriptor with `name` and operator kind `op`.
    pub fn new(name: impl Into<String>, op: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            op: op.into(),
            ..Self::default()
        }
    }

    /// Sets the operator kind.
    pub fn set_op(&mut self, op: impl Into<String>) -> &mut Self {
        self.op = op.into();
        self
    }

    /// Sets the node name.
    pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = name.into();
        self
    }

    /// Sets the device/placement tag.
    pub fn set_device(&mut self, device: impl Into<String>) -> &mut Self {
        self.device = device.into();
        self
    }

    /// Inserts or replaces a single attribute.
    pub fn set_attr(&mut self, key: impl Into<String>, value: AttrValue) -> &mut Self {
        self.attrs.insert(key.into(), value);
        self
    }

    /// Merges every attribute of `src` into this descriptor.
    ///
    /// Keys already present on the descriptor are kept.
    pub fn copy_attrs_from(&mut self, src: &NodeRecord) -> &mut Self {
        for (key, value) in &src.attrs {
            self.attrs
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
        self
    }

    /// Appends a named input reference `node_name:port`.
    pub fn push_input(&mut self, node_name: &str, port: i32) -> &mut Self {
        self.inputs.push(format!("{node_name}:{port}"));
        self
    }

    /// Appends the named input reference for the producer end of `edge`.
    ///
    /// # Errors
    /// [`GraphError::UnknownNode`] when the edge's source node is gone.
    pub fn add_input(&mut self, graph: &GraphStore, edge: &EdgeRecord) -> Result<(), GraphError> {
        let src = graph
            .node(edge.src)
            .ok_or(GraphError::UnknownNode(edge.src))?;
        self.push_input(&src.name, edge.src_port);
        Ok(())
    }
}
