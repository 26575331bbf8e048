// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Declarative operator traits consulted by the matcher.
use std::collections::BTreeMap;

/// Operator kind whose consumers are always treated as explained.
pub const DEFAULT_PASSTHROUGH_OP: &str = "ShapeN";
/// Operator kind that may feed consumers outside a match.
pub const DEFAULT_DUPLICABLE_OP: &str = "Const";

/// Matching-relevant traits of one operator kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OpTraits {
    /// Consumers of this kind only read metadata (e.g. shapes) and never block
    /// a fusion: an edge into such a node counts as explained.
    pub control_passthrough: bool,
    /// Producers of this kind are free to duplicate, so they may carry extra
    /// consumers outside the matched subgraph.
    pub freely_duplicable: bool,
}

/// Registry mapping operator kinds to their [`OpTraits`].
///
/// Unregistered kinds have no traits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpRegistry {
    traits: BTreeMap<String, OpTraits>,
}

impl Default for OpRegistry {
    /// `ShapeN` is a control passthrough and `Const` is freely duplicable.
    fn default() -> Self {
        let mut reg = Self::empty();
        reg.mark_passthrough(DEFAULT_PASSTHROUGH_OP);
        reg.mark_duplicable(DEFAULT_DUPLICABLE_OP);
        reg
    }
}

impl OpRegistry {
    /// A registry with no traits at all.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            traits: BTreeMap::new(),
        }
    }

    /// Replaces the traits of `op`.
    pub fn insert(&mut self, op: impl Into<String>, traits: OpTraits) -> &mut Self {
        self.traits.insert(op.into(), traits);
        self
    }

    /// Marks `op` as a control passthrough consumer.
    pub fn mark_passthrough(&mut self, op: impl Into<String>) -> &mut Self {
        self.traits.entry(op.into()).or_default().control_passthrough = true;
        self
    }

    /// Marks `op` as a freely duplicable producer.
    pub fn mark_duplicable(&mut self, op: impl Into<String>) -> &mut Self {
        self.traits.entry(op.into()).or_default().freely_duplicable = true;
        self
    }

    /// Traits of `op`; default (none) when unregistered.
    #[must_use]
    pub fn traits(&self, op: &str) -> OpTraits {
        self.traits.get(op).copied().unwrap_or_default()
    }

    /// Shorthand for `traits(op).control_passthrough`.
    #[must_use]
    pub fn is_passthrough(&self, op: &str) -> bool {
        self.traits(op).control_passthrough
    }

    /// Shorthand for `traits(op).freely_duplicable`.
    #[must_use]
    pub fn is_duplicable(&self, op: &str) -> bool {
        self.traits(op).freely_duplicable
    }
}
