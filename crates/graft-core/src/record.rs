// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Graph record types: nodes, edges, and attribute values.
use std::collections::BTreeMap;

use crate::ident::{is_control_port, EdgeId, NodeId};

/// Element type of a tensor attribute or a `T`-style type attribute.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DataType {
    /// 32-bit IEEE float.
    Float,
    /// 64-bit signed integer.
    Int64,
    /// Boolean.
    Bool,
}

/// Dense tensor payload carried by constant nodes.
///
/// Only the flat element list matters to the engine; shapes are owned by the
/// external shape-inference collaborator.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TensorValue {
    /// Float elements.
    Float(Vec<f32>),
    /// Integer elements.
    Int64(Vec<i64>),
    /// Boolean elements.
    Bool(Vec<bool>),
}

impl TensorValue {
    /// Element type of the payload.
    #[must_use]
    pub const fn dtype(&self) -> DataType {
        match self {
            Self::Float(_) => DataType::Float,
            Self::Int64(_) => DataType::Int64,
            Self::Bool(_) => DataType::Bool,
        }
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Float(v) => v.len(),
            Self::Int64(v) => v.len(),
            Self::Bool(v) => v.len(),
        }
    }

    /// Returns `true` when the payload holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` for a float tensor whose every element lies within
    /// `tolerance` of zero.
    ///
    /// Non-float tensors never qualify: fusion guards only accept float zeros.
    #[must_use]
    pub fn is_constant_zero(&self, tolerance: f32) -> bool {
        match self {
            Self::Float(v) => v.iter().all(|x| x.abs() <= tolerance),
            Self::Int64(_) | Self::Bool(_) => false,
        }
    }
}

/// Attribute value stored on a node.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AttrValue {
    /// Element type attribute (e.g. `T`).
    Type(DataType),
    /// Integer attribute.
    Int(i64),
    /// Float attribute.
    Float(f32),
    /// Boolean attribute.
    Bool(bool),
    /// String attribute.
    Str(String),
    /// Tensor attribute (e.g. a constant's `value`).
    Tensor(TensorValue),
}

/// Materialised record for a single node stored in the graph.
///
/// Invariants
/// - `name` is unique within the owning store.
/// - `op` is non-empty.
/// - `inputs` are the descriptor's named input references (`name:port`); the
///   structural connections live in the store's edge arena, not here.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeRecord {
    /// Unique node name.
    pub name: String,
    /// Operator kind tag.
    pub op: String,
    /// Device/placement tag; opaque to the engine.
    pub device: String,
    /// Attribute map.
    pub attrs: BTreeMap<String, AttrValue>,
    /// Named input references recorded by the descriptor.
    pub inputs: Vec<String>,
}

impl NodeRecord {
    /// Returns the attribute stored under `key`.
    pub fn attr(&self, key: &str) -> Option<&AttrValue> {
        self.attrs.get(key)
    }

    /// Returns the tensor stored under `key`, when that attribute is a tensor.
    pub fn tensor_attr(&self, key: &str) -> Option<&TensorValue> {
        match self.attrs.get(key) {
            Some(AttrValue::Tensor(t)) => Some(t),
            _ => None,
        }
    }
}

/// Materialised record for a single directed, port-addressed edge.
///
/// Invariants
/// - `src` and `dst` reference live nodes in the same store.
/// - A negative port on either end marks a control edge; control edges carry
///   no data and are skipped by port arithmetic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EdgeRecord {
    /// Stable identifier for the edge.
    pub id: EdgeId,
    /// Producer node.
    pub src: NodeId,
    /// Producer output port.
    pub src_port: i32,
    /// Consumer node.
    pub dst: NodeId,
    /// Consumer input port.
    pub dst_port: i32,
}

impl EdgeRecord {
    /// Returns `true` for control (dependency) edges.
    #[must_use]
    pub const fn is_control(&self) -> bool {
        is_control_port(self.src_port) || is_control_port(self.dst_port)
    }
}
