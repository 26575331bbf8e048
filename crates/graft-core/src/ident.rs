// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Arena handles for nodes and edges.

/// Port index used for control (dependency) edges.
///
/// Any negative port denotes a control edge; this is the canonical value the
/// store and the rewriter use when they create one.
pub const CONTROL_PORT: i32 = -1;

/// Stable handle for a node slot in a [`crate::GraphStore`] arena.
///
/// Handles are never reused within one store: a removed node leaves a
/// tombstone, so a stale `NodeId` resolves to `None` instead of aliasing a
/// newer node.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId(pub u32);

impl NodeId {
    /// Returns the arena slot index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl core::fmt::Display for NodeId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Stable handle for an edge slot in a [`crate::GraphStore`] arena.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EdgeId(pub u32);

impl EdgeId {
    /// Returns the arena slot index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl core::fmt::Display for EdgeId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// Returns `true` when `port` addresses a control (dependency) edge.
#[must_use]
pub const fn is_control_port(port: i32) -> bool {
    port < 0
}
