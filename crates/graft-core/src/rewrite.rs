// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Graph splice primitives.
//!
//! The free functions perform one edit each. [`SplicePlan`] batches them so a
//! whole rewrite is checked against the live graph before its first edit:
//! either every boundary edge moves onto the replacement node or none does.
//! Matched nodes are never deleted here; once detached they are dead and left
//! for a later dead-node sweep.
use std::collections::BTreeSet;

use thiserror::Error;

use crate::graph::{GraphError, GraphStore};
use crate::ident::{EdgeId, NodeId, CONTROL_PORT};
use crate::matcher::MatchRecord;
use crate::record::EdgeRecord;

/// Splice failed validation or hit a host primitive error mid-apply.
///
/// A validation failure leaves the graph untouched. A [`SpliceError::Graph`]
/// raised after validation means the host broke its own contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpliceError {
    /// The replacement node is not live.
    #[error("replacement node {0} is not live")]
    MissingReplacement(NodeId),
    /// A planned edge no longer exists or no longer has its recorded endpoints.
    #[error("boundary edge {0} is stale")]
    StaleEdge(EdgeId),
    /// The same edge appears in two steps.
    #[error("boundary edge {0} is scheduled twice")]
    DuplicateEdge(EdgeId),
    /// A data step targets a negative (control) port.
    #[error("replacement data port {0} is negative")]
    InvalidPort(i32),
    /// Host primitive failure.
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Moves one boundary input onto `replacement:input_port`.
///
/// Adds `edge.src:edge.src_port -> replacement:input_port`, then removes
/// `edge`. Returns the new edge.
///
/// # Errors
/// [`GraphError::UnknownEdge`] if `edge` is not live, or
/// [`GraphError::UnknownNode`] if `replacement` is not; the graph is unchanged
/// in both cases.
pub fn reroute_input(
    graph: &mut GraphStore,
    replacement: NodeId,
    input_port: i32,
    edge: &EdgeRecord,
) -> Result<EdgeId, GraphError> {
    if !graph.has_edge(edge.id) {
        return Err(GraphError::UnknownEdge(edge.id));
    }
    let added = graph.add_edge(edge.src, edge.src_port, replacement, input_port)?;
    graph.remove_edge(edge.id)?;
    Ok(added)
}

/// Moves every edge of one boundary output group onto
/// `replacement:output_port`, keeping each consumer's port.
///
/// # Errors
/// As [`reroute_input`]; edges rerouted before the failing one stay moved.
/// Use [`SplicePlan`] for all-or-nothing semantics.
pub fn reroute_outputs(
    graph: &mut GraphStore,
    replacement: NodeId,
    output_port: i32,
    edges: &[EdgeRecord],
) -> Result<Vec<EdgeId>, GraphError> {
    let mut added = Vec::with_capacity(edges.len());
    for edge in edges {
        if !graph.has_edge(edge.id) {
            return Err(GraphError::UnknownEdge(edge.id));
        }
        added.push(graph.add_edge(replacement, output_port, edge.dst, edge.dst_port)?);
        graph.remove_edge(edge.id)?;
    }
    Ok(added)
}

/// Detaches `edges` without replacement.
///
/// # Errors
/// [`GraphError::UnknownEdge`] at the first edge that is not live.
pub fn remove_edges(graph: &mut GraphStore, edges: &[EdgeRecord]) -> Result<(), GraphError> {
    for edge in edges {
        graph.remove_edge(edge.id)?;
    }
    Ok(())
}

/// One planned edit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SpliceStep {
    /// Boundary input edge onto a replacement input port.
    Input {
        /// Replacement input port.
        port: i32,
        /// Edge to move.
        edge: EdgeRecord,
    },
    /// Boundary output group onto a replacement output port.
    Outputs {
        /// Replacement output port.
        port: i32,
        /// Edges to move.
        edges: Vec<EdgeRecord>,
    },
    /// Control edge onto the replacement's control port.
    Dependency(EdgeRecord),
    /// Edges to drop.
    Detach(Vec<EdgeRecord>),
}

impl SpliceStep {
    fn edges(&self) -> &[EdgeRecord] {
        match self {
            Self::Input { edge, .. } | Self::Dependency(edge) => std::slice::from_ref(edge),
            Self::Outputs { edges, .. } | Self::Detach(edges) => edges,
        }
    }
}

/// Ordered, validated-before-apply batch of splice steps.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SplicePlan {
    steps: Vec<SpliceStep>,
}

impl SplicePlan {
    /// Empty plan.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Positional plan for a match record: external input `i` to port `i`,
    /// wildcard inputs to the ports after them, external output `i` from port
    /// `i`, and every dependency input onto the control port.
    #[must_use]
    pub fn positional(record: &MatchRecord) -> Self {
        let mut plan = Self::new();
        let mut port = 0;
        for edge in record.boundary_inputs().iter().chain(record.dynamic_inputs()) {
            plan = plan.input(port, *edge);
            port += 1;
        }
        for (port, group) in (0..).zip(record.boundary_outputs()) {
            plan = plan.outputs(port, group.clone());
        }
        for edge in record.dependency_inputs() {
            plan = plan.dependency(*edge);
        }
        plan
    }

    /// Schedules `edge` onto replacement input `port`.
    #[must_use]
    pub fn input(mut self, port: i32, edge: EdgeRecord) -> Self {
        self.steps.push(SpliceStep::Input { port, edge });
        self
    }

    /// Schedules `edges` onto replacement output `port`.
    #[must_use]
    pub fn outputs(mut self, port: i32, edges: Vec<EdgeRecord>) -> Self {
        self.steps.push(SpliceStep::Outputs { port, edges });
        self
    }

    /// Schedules a control edge onto the replacement's control port.
    #[must_use]
    pub fn dependency(mut self, edge: EdgeRecord) -> Self {
        self.steps.push(SpliceStep::Dependency(edge));
        self
    }

    /// Schedules `edges` for removal.
    #[must_use]
    pub fn detach(mut self, edges: Vec<EdgeRecord>) -> Self {
        self.steps.push(SpliceStep::Detach(edges));
        self
    }

    /// Planned steps in application order.
    #[must_use]
    pub fn steps(&self) -> &[SpliceStep] {
        &self.steps
    }

    /// Number of data input ports the plan wires on the replacement.
    #[must_use]
    pub fn input_arity(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s, SpliceStep::Input { .. }))
            .count()
    }

    /// Checks every edge against the live graph without modifying it.
    ///
    /// `replacement` is checked too when given; pass `None` to validate
    /// before the replacement node exists.
    ///
    /// # Errors
    /// The first [`SpliceError`] found.
    pub fn validate(
        &self,
        graph: &GraphStore,
        replacement: Option<NodeId>,
    ) -> Result<(), SpliceError> {
        if let Some(node) = replacement {
            if graph.node(node).is_none() {
                return Err(SpliceError::MissingReplacement(node));
            }
        }
        let mut seen = BTreeSet::new();
        for step in &self.steps {
            match step {
                SpliceStep::Input { port, .. } | SpliceStep::Outputs { port, .. } if *port < 0 => {
                    return Err(SpliceError::InvalidPort(*port));
                }
                _ => {}
            }
            for edge in step.edges() {
                if graph.edge(edge.id) != Some(edge) {
                    return Err(SpliceError::StaleEdge(edge.id));
                }
                if !seen.insert(edge.id) {
                    return Err(SpliceError::DuplicateEdge(edge.id));
                }
            }
        }
        Ok(())
    }

    /// Validates, then applies every step onto `replacement`.
    ///
    /// # Errors
    /// A validation [`SpliceError`] with the graph untouched, or
    /// [`SpliceError::Graph`] if a primitive fails after validation.
    pub fn apply(&self, graph: &mut GraphStore, replacement: NodeId) -> Result<(), SpliceError> {
        self.validate(graph, Some(replacement))?;
        for step in &self.steps {
            match step {
                SpliceStep::Input { port, edge } => {
                    reroute_input(graph, replacement, *port, edge)?;
                }
                SpliceStep::Outputs { port, edges } => {
                    reroute_outputs(graph, replacement, *port, edges)?;
                }
                SpliceStep::Dependency(edge) => {
                    graph.add_edge(edge.src, CONTROL_PORT, replacement, CONTROL_PORT)?;
                    graph.remove_edge(edge.id)?;
                }
                SpliceStep::Detach(edges) => remove_edges(graph, edges)?,
            }
        }
        Ok(())
    }
}
