// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Summary of one pass run.

use graft_core::{Hash, NodeId};
use serde::Serialize;

/// One applied fusion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Rewrite {
    /// Template name.
    pub template: String,
    /// Anchor the match grew from.
    pub anchor: NodeId,
    /// Node that replaced the match.
    pub replacement: NodeId,
    /// Name given to the replacement.
    pub replacement_name: String,
    /// Number of host nodes the match bound.
    pub bound_nodes: usize,
}

/// What a [`crate::FusionPass`] did to a graph.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PassReport {
    /// Applied fusions in order.
    pub rewrites: Vec<Rewrite>,
    /// Fusion attempts, including retries after a rescan.
    pub attempts: usize,
    /// Attempts that ended in a recoverable failure.
    pub rejections: usize,
    /// Hex canonical state hash before the run.
    pub fingerprint_before: String,
    /// Hex canonical state hash after the run.
    pub fingerprint_after: String,
}

impl PassReport {
    pub(crate) fn start(before: &Hash) -> Self {
        let fingerprint = hex::encode(before);
        Self {
            rewrites: Vec::new(),
            attempts: 0,
            rejections: 0,
            fingerprint_after: fingerprint.clone(),
            fingerprint_before: fingerprint,
        }
    }

    pub(crate) fn finish(&mut self, after: &Hash) {
        self.fingerprint_after = hex::encode(after);
    }

    /// Whether the graph changed.
    pub fn changed(&self) -> bool {
        self.fingerprint_before != self.fingerprint_after
    }

    /// Rewrites applied by `template`.
    pub fn rewrites_for<'a>(&'a self, template: &'a str) -> impl Iterator<Item = &'a Rewrite> {
        self.rewrites.iter().filter(move |r| r.template == template)
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
