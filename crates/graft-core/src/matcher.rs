// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Template matcher: grows a binding from an anchor host node outward.
//!
//! Matching is read-only. All intermediate state (bindings, the reverse
//! node→key index, boundary edges) lives in a per-attempt [`Attempt`] that is
//! dropped on failure and turned into a [`MatchRecord`] on success.
//!
//! The work-list visits bound keys in the order they were bound. For each one
//! the matcher resolves the node's inbound data edges (binding producers),
//! then its outbound edges grouped per port (binding consumers and checking
//! for undeclared fan-out).
use std::collections::{BTreeMap, VecDeque};

use thiserror::Error;

use crate::edge_group::{remap_port, OutputEdgeGroup};
use crate::graph::GraphStore;
use crate::ident::{EdgeId, NodeId};
use crate::ops::OpRegistry;
use crate::record::EdgeRecord;
use crate::template::{DynamicWindow, InputSpec, OutputSpec, Template, TemplateNode};

static WILDCARD: InputSpec = InputSpec::Wildcard;

/// Policy for generalizing a template slot to a variable number of host edges.
///
/// Applies to inbound and outbound resolution alike.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DynamicMode {
    /// Every edge in a dynamic window shares one endpoint (one key).
    #[default]
    Shared,
    /// Every additional distinct endpoint gets its own derived key `base_N`.
    Distinct,
    /// No window collapse: ports map 1:1 onto declared slots.
    Disabled,
}

/// Why a match attempt failed. Never fatal; the graph is untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchFailure {
    /// The anchor handle does not resolve to a live node.
    #[error("unknown anchor node {0}")]
    UnknownNode(NodeId),
    /// The anchor's operator kind differs from the template anchor's.
    #[error("anchor kind mismatch: expected `{expected}`, found `{found}`")]
    AnchorKindMismatch {
        /// Template anchor kind.
        expected: String,
        /// Host node kind.
        found: String,
    },
    /// A producer or consumer has the wrong operator kind for its slot.
    #[error("`{key}` expects kind `{expected}`, found `{found}`")]
    KindMismatch {
        /// Template key being bound.
        key: String,
        /// Declared kind.
        expected: String,
        /// Host node kind.
        found: String,
    },
    /// A key is already bound to a different host node.
    #[error("`{key}` is bound to {bound} but the graph also presents {found}")]
    BindingConflict {
        /// Template key.
        key: String,
        /// Node already bound under `key`.
        bound: NodeId,
        /// Conflicting node.
        found: NodeId,
    },
    /// A host node is already claimed by another template slot.
    #[error("{node} is claimed by `{claimed_by}`, cannot bind it as `{key}`")]
    NodeClaimed {
        /// Host node.
        node: NodeId,
        /// Key that tried to claim it.
        key: String,
        /// Key it is bound to.
        claimed_by: String,
    },
    /// An already-bound producer feeds a port whose slot expects something else.
    #[error("`{key}` input port {port} is fed by `{source_key}`, which the template does not declare there")]
    InputSourceMismatch {
        /// Consumer key.
        key: String,
        /// Consumer input port.
        port: i32,
        /// Key bound to the producer.
        source_key: String,
    },
    /// An inbound data port maps onto no declared input slot.
    #[error("`{key}` has no input slot for port {port}")]
    UnmappedInputPort {
        /// Template key.
        key: String,
        /// Host port.
        port: i32,
    },
    /// An outbound data port maps onto no declared output port.
    #[error("`{key}` has no output slot for port {port}")]
    UnmappedOutputPort {
        /// Template key.
        key: String,
        /// Host port.
        port: i32,
    },
    /// A declared fixed input slot saw no host edge.
    #[error("`{key}` input slot {slot} is not connected")]
    MissingInput {
        /// Template key.
        key: String,
        /// Logical slot.
        slot: usize,
    },
    /// A declared consumer was not found on its output port.
    #[error("`{key}` output port {port} does not feed `{consumer}`")]
    MissingConsumer {
        /// Producer key.
        key: String,
        /// Host port.
        port: i32,
        /// Declared consumer key.
        consumer: String,
    },
    /// An output port has consumers the template does not declare.
    #[error("`{key}` output port {port} has {count} undeclared consumer(s)")]
    UnexplainedConsumers {
        /// Producer key.
        key: String,
        /// Host port.
        port: i32,
        /// Number of unexplained edges.
        count: usize,
    },
    /// Two different producers claim the same external input.
    #[error("external input {0} is fed by two different producers")]
    ExternalInputConflict(usize),
    /// Two different edge groups claim the same external output.
    #[error("external output {0} is claimed by two different ports")]
    ExternalOutputConflict(usize),
    /// A template node found no host counterpart.
    #[error("template node `{0}` is not bound")]
    UnboundTemplateNode(String),
    /// No host edge fills an external input.
    #[error("external input {0} is not connected")]
    UnfilledInput(usize),
    /// No host edge group fills an external output.
    #[error("external output {0} is not connected")]
    UnfilledOutput(usize),
    /// An edge recorded as boundary input or output joins two matched nodes.
    #[error("boundary edge {0} joins two matched nodes")]
    InternalBoundaryEdge(EdgeId),
    /// Control inputs do not match the declared count.
    #[error("expected {expected} dependency input(s), found {found}")]
    DependencyArity {
        /// Declared count.
        expected: usize,
        /// Found count.
        found: usize,
    },
}

/// One binding of a match record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchedNode {
    /// Bound host node.
    pub node: NodeId,
    /// Template key whose node description applies (differs from the binding
    /// key only for derived keys).
    pub base_key: String,
    /// Whether the node's edges have been resolved.
    pub visited: bool,
    /// Next suffix to use when minting a derived key from this binding;
    /// starts at 1.
    pub replication: u32,
}

/// Successful match: the binding plus every boundary edge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchRecord {
    template: String,
    anchor: NodeId,
    bindings: BTreeMap<String, MatchedNode>,
    key_index: BTreeMap<NodeId, String>,
    inputs: Vec<EdgeRecord>,
    dynamic_inputs: Vec<EdgeRecord>,
    dependency_inputs: Vec<EdgeRecord>,
    outputs: Vec<Vec<EdgeRecord>>,
}

impl MatchRecord {
    /// Name of the matched template.
    #[must_use]
    pub fn template_name(&self) -> &str {
        &self.template
    }

    /// Anchor host node the match grew from.
    #[must_use]
    pub fn anchor(&self) -> NodeId {
        self.anchor
    }

    /// Host node bound under `key` (template or derived key).
    pub fn node(&self, key: &str) -> Option<NodeId> {
        self.bindings.get(key).map(|m| m.node)
    }

    /// Full binding entry for `key`.
    pub fn binding(&self, key: &str) -> Option<&MatchedNode> {
        self.bindings.get(key)
    }

    /// All bindings in key order.
    pub fn bindings(&self) -> impl Iterator<Item = (&str, &MatchedNode)> {
        self.bindings.iter().map(|(k, m)| (k.as_str(), m))
    }

    /// Key a host node is bound under.
    pub fn key_of(&self, node: NodeId) -> Option<&str> {
        self.key_index.get(&node).map(String::as_str)
    }

    /// Bound host nodes in handle order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.key_index.keys().copied()
    }

    /// Number of bound nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Always `false` for a successful match (the anchor is bound).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Boundary input edge per external input index.
    #[must_use]
    pub fn boundary_inputs(&self) -> &[EdgeRecord] {
        &self.inputs
    }

    /// Edges absorbed by wildcard input slots, in resolution order.
    #[must_use]
    pub fn dynamic_inputs(&self) -> &[EdgeRecord] {
        &self.dynamic_inputs
    }

    /// Control edges entering the match from outside, by edge id.
    #[must_use]
    pub fn dependency_inputs(&self) -> &[EdgeRecord] {
        &self.dependency_inputs
    }

    /// Boundary output edge group per external output index.
    #[must_use]
    pub fn boundary_outputs(&self) -> &[Vec<EdgeRecord>] {
        &self.outputs
    }
}

/// Matches `template` against `graph`, growing from `anchor`.
///
/// # Errors
/// A [`MatchFailure`] describing the first violated constraint. The graph is
/// never modified.
pub fn match_template(
    graph: &GraphStore,
    anchor: NodeId,
    template: &Template,
    mode: DynamicMode,
    ops: &OpRegistry,
) -> Result<MatchRecord, MatchFailure> {
    let found = graph.op(anchor).ok_or(MatchFailure::UnknownNode(anchor))?;
    let expected = &template.anchor().op;
    if found != expected {
        return Err(MatchFailure::AnchorKindMismatch {
            expected: expected.clone(),
            found: found.to_owned(),
        });
    }

    let mut attempt = Attempt::new(graph, template, mode, ops);
    attempt.bind(template.anchor_key(), template.anchor_key(), anchor)?;
    while let Some(key) = attempt.queue.pop_front() {
        attempt.visit(&key)?;
    }
    attempt.finish(anchor)
}

/// Per-attempt scratch state.
struct Attempt<'a> {
    graph: &'a GraphStore,
    template: &'a Template,
    mode: DynamicMode,
    ops: &'a OpRegistry,
    bindings: BTreeMap<String, MatchedNode>,
    key_index: BTreeMap<NodeId, String>,
    queue: VecDeque<String>,
    inputs: Vec<Option<EdgeRecord>>,
    dynamic_inputs: Vec<EdgeRecord>,
    outputs: Vec<Option<Vec<EdgeRecord>>>,
}

impl<'a> Attempt<'a> {
    fn new(
        graph: &'a GraphStore,
        template: &'a Template,
        mode: DynamicMode,
        ops: &'a OpRegistry,
    ) -> Self {
        Self {
            graph,
            template,
            mode,
            ops,
            bindings: BTreeMap::new(),
            key_index: BTreeMap::new(),
            queue: VecDeque::new(),
            inputs: vec![None; template.external_input_count()],
            dynamic_inputs: Vec::new(),
            outputs: vec![None; template.external_output_count()],
        }
    }

    fn op_of(&self, node: NodeId) -> &'a str {
        self.graph.op(node).unwrap_or_default()
    }

    fn base_of(&self, key: &str) -> Option<&str> {
        self.bindings.get(key).map(|m| m.base_key.as_str())
    }

    /// Base key of the slot that already claims `node`, if any.
    fn claimed_base(&self, node: NodeId) -> Option<&str> {
        self.key_index.get(&node).and_then(|k| self.base_of(k))
    }

    fn bind(&mut self, key: &str, base_key: &str, node: NodeId) -> Result<(), MatchFailure> {
        if let Some(claimed_by) = self.key_index.get(&node) {
            if claimed_by == key {
                return Ok(());
            }
            return Err(MatchFailure::NodeClaimed {
                node,
                key: key.to_owned(),
                claimed_by: claimed_by.clone(),
            });
        }
        self.bindings.insert(
            key.to_owned(),
            MatchedNode {
                node,
                base_key: base_key.to_owned(),
                visited: false,
                replication: 1,
            },
        );
        self.key_index.insert(node, key.to_owned());
        self.queue.push_back(key.to_owned());
        Ok(())
    }

    /// Binds `node` under a fresh derived key `base_N`.
    fn mint(&mut self, base: &str, node: NodeId) -> Result<String, MatchFailure> {
        let key = loop {
            let Some(entry) = self.bindings.get_mut(base) else {
                return Err(MatchFailure::UnboundTemplateNode(base.to_owned()));
            };
            let candidate = format!("{base}_{}", entry.replication);
            entry.replication += 1;
            if !self.bindings.contains_key(&candidate) && self.template.node(&candidate).is_none()
            {
                break candidate;
            }
        };
        self.bind(&key, base, node)?;
        Ok(key)
    }

    fn visit(&mut self, key: &str) -> Result<(), MatchFailure> {
        let template = self.template;
        let Some(entry) = self.bindings.get_mut(key) else {
            return Ok(());
        };
        if entry.visited {
            return Ok(());
        }
        entry.visited = true;
        let node = entry.node;
        let base = entry.base_key.clone();
        let tnode = template
            .node(&base)
            .ok_or_else(|| MatchFailure::UnboundTemplateNode(base.clone()))?;
        self.resolve_inputs(key, node, tnode)?;
        self.resolve_outputs(key, node, tnode)
    }

    fn resolve_inputs(
        &mut self,
        key: &str,
        node: NodeId,
        tnode: &'a TemplateNode,
    ) -> Result<(), MatchFailure> {
        let mut data: Vec<EdgeRecord> = self
            .graph
            .in_edges(node)
            .filter(|e| !e.is_control())
            .copied()
            .collect();
        data.sort_by_key(|e| (e.dst_port, e.id));
        let max_port = data.iter().map(|e| e.dst_port).max().unwrap_or(0);
        let window = self.window(tnode.input_window);
        let mut seen = vec![false; tnode.inputs.len()];

        for edge in data {
            let unmapped = || MatchFailure::UnmappedInputPort {
                key: key.to_owned(),
                port: edge.dst_port,
            };
            let port = usize::try_from(edge.dst_port).map_err(|_| unmapped())?;
            let max = usize::try_from(max_port).map_err(|_| unmapped())?;
            let slot = remap_port(port, max, window).slot();
            let spec = match tnode.inputs.get(slot) {
                Some(spec) => {
                    seen[slot] = true;
                    spec
                }
                None if tnode.has_trailing_wildcard() => &WILDCARD,
                None => return Err(unmapped()),
            };

            if let Some(source_key) = self.key_index.get(&edge.src) {
                let agrees = match spec {
                    InputSpec::Node(expected) => self.base_of(source_key) == Some(expected),
                    InputSpec::Wildcard => true,
                    InputSpec::External(_) => false,
                };
                if !agrees {
                    return Err(MatchFailure::InputSourceMismatch {
                        key: key.to_owned(),
                        port: edge.dst_port,
                        source_key: source_key.clone(),
                    });
                }
                continue;
            }

            match spec {
                InputSpec::External(index) => self.record_input(*index, edge)?,
                InputSpec::Wildcard => self.dynamic_inputs.push(edge),
                InputSpec::Node(expected) => self.bind_producer(expected, edge.src)?,
            }
        }

        for (slot, spec) in tnode.inputs.iter().enumerate() {
            if !seen[slot] && *spec != InputSpec::Wildcard {
                return Err(MatchFailure::MissingInput {
                    key: key.to_owned(),
                    slot,
                });
            }
        }
        Ok(())
    }

    fn bind_producer(&mut self, expected: &str, src: NodeId) -> Result<(), MatchFailure> {
        let template = self.template;
        let Some(producer) = template.node(expected) else {
            return Err(MatchFailure::UnboundTemplateNode(expected.to_owned()));
        };
        let found = self.op_of(src);
        if found != producer.op {
            return Err(MatchFailure::KindMismatch {
                key: expected.to_owned(),
                expected: producer.op.clone(),
                found: found.to_owned(),
            });
        }
        match self.bindings.get(expected).map(|m| m.node) {
            None => self.bind(expected, expected, src),
            Some(_) if self.mode == DynamicMode::Distinct => self.mint(expected, src).map(|_| ()),
            Some(bound) => Err(MatchFailure::BindingConflict {
                key: expected.to_owned(),
                bound,
                found: src,
            }),
        }
    }

    fn record_input(&mut self, index: usize, edge: EdgeRecord) -> Result<(), MatchFailure> {
        let Some(slot) = self.inputs.get_mut(index) else {
            return Err(MatchFailure::ExternalInputConflict(index));
        };
        match slot {
            None => *slot = Some(edge),
            // Same tensor feeding two pattern nodes: one boundary edge suffices.
            Some(prev) if prev.src == edge.src && prev.src_port == edge.src_port => {}
            Some(_) => return Err(MatchFailure::ExternalInputConflict(index)),
        }
        Ok(())
    }

    fn resolve_outputs(
        &mut self,
        key: &str,
        node: NodeId,
        tnode: &'a TemplateNode,
    ) -> Result<(), MatchFailure> {
        let groups = self.graph.out_edges_by_port(node);
        let max_port = groups.keys().copied().max().unwrap_or(0);
        let window = self.window(tnode.output_window);
        let duplicable = self.ops.is_duplicable(self.op_of(node));

        for (port, edges) in groups {
            let unmapped = || MatchFailure::UnmappedOutputPort {
                key: key.to_owned(),
                port,
            };
            let physical = usize::try_from(port).map_err(|_| unmapped())?;
            let max = usize::try_from(max_port).map_err(|_| unmapped())?;
            let slot = remap_port(physical, max, window).slot();
            let consumers = tnode.outputs.get(slot).ok_or_else(unmapped)?;

            let mut group = OutputEdgeGroup::new(port, edges);
            for i in 0..group.len() {
                if self.ops.is_passthrough(self.op_of(group.edges()[i].dst)) {
                    group.explain(i);
                }
            }

            let mut boundary = false;
            for spec in consumers {
                match spec {
                    OutputSpec::External(index) => {
                        self.record_output(*index, group.edges())?;
                        group.explain_all();
                        boundary = true;
                    }
                    OutputSpec::Node(consumer) => {
                        if !self.resolve_consumer(&mut group, consumer)? {
                            return Err(MatchFailure::MissingConsumer {
                                key: key.to_owned(),
                                port,
                                consumer: consumer.clone(),
                            });
                        }
                    }
                }
            }

            if !boundary && group.remaining() > 0 && !duplicable {
                return Err(MatchFailure::UnexplainedConsumers {
                    key: key.to_owned(),
                    port,
                    count: group.remaining(),
                });
            }
        }
        Ok(())
    }

    /// Explains the group's edges that reach `consumer` (or nodes derived
    /// from it), binding or minting as the mode allows. Returns whether any
    /// edge reaches the consumer slot.
    ///
    /// A consumer still unbound when the group is reached binds its first
    /// same-kind destination and mints derived keys for the rest in every
    /// mode. Once bound, further destinations are minted only in
    /// [`DynamicMode::Distinct`], and a passthrough destination stands in
    /// for it.
    fn resolve_consumer(
        &mut self,
        group: &mut OutputEdgeGroup,
        consumer: &str,
    ) -> Result<bool, MatchFailure> {
        let template = self.template;
        let Some(tnode) = template.node(consumer) else {
            return Err(MatchFailure::UnboundTemplateNode(consumer.to_owned()));
        };
        let was_bound = self.bindings.contains_key(consumer);
        let mut found = false;

        for i in 0..group.len() {
            let dst = group.edges()[i].dst;
            if was_bound && self.ops.is_passthrough(self.op_of(dst)) {
                found = true;
                continue;
            }
            match self.claimed_base(dst) {
                Some(base) if base == consumer => {
                    group.explain(i);
                    found = true;
                    continue;
                }
                Some(_) => continue,
                None => {}
            }
            if self.op_of(dst) != tnode.op {
                continue;
            }
            if !self.bindings.contains_key(consumer) {
                self.bind(consumer, consumer, dst)?;
            } else if !was_bound || self.mode == DynamicMode::Distinct {
                self.mint(consumer, dst)?;
            } else {
                continue;
            }
            group.explain(i);
            found = true;
        }
        Ok(found)
    }

    fn record_output(&mut self, index: usize, edges: &[EdgeRecord]) -> Result<(), MatchFailure> {
        let Some(slot) = self.outputs.get_mut(index) else {
            return Err(MatchFailure::ExternalOutputConflict(index));
        };
        match slot {
            None => *slot = Some(edges.to_vec()),
            Some(prev) if prev.as_slice() == edges => {}
            Some(_) => return Err(MatchFailure::ExternalOutputConflict(index)),
        }
        Ok(())
    }

    fn window(&self, declared: Option<DynamicWindow>) -> Option<DynamicWindow> {
        match self.mode {
            DynamicMode::Disabled => None,
            DynamicMode::Shared | DynamicMode::Distinct => declared,
        }
    }

    fn finish(self, anchor: NodeId) -> Result<MatchRecord, MatchFailure> {
        for tnode in self.template.nodes() {
            if !self.bindings.contains_key(&tnode.key) {
                return Err(MatchFailure::UnboundTemplateNode(tnode.key.clone()));
            }
        }
        let inputs = self
            .inputs
            .into_iter()
            .enumerate()
            .map(|(i, e)| e.ok_or(MatchFailure::UnfilledInput(i)))
            .collect::<Result<Vec<_>, _>>()?;
        let outputs = self
            .outputs
            .into_iter()
            .enumerate()
            .map(|(i, e)| e.ok_or(MatchFailure::UnfilledOutput(i)))
            .collect::<Result<Vec<_>, _>>()?;
        // An endpoint bound after its edge was classified makes the edge internal.
        let bound = |n: &NodeId| self.key_index.contains_key(n);
        let internal = inputs
            .iter()
            .chain(&self.dynamic_inputs)
            .find(|e| bound(&e.src))
            .or_else(|| outputs.iter().flatten().find(|e| bound(&e.dst)));
        if let Some(edge) = internal {
            return Err(MatchFailure::InternalBoundaryEdge(edge.id));
        }

        let mut dependency_inputs: Vec<EdgeRecord> = self
            .key_index
            .keys()
            .flat_map(|n| self.graph.in_edges(*n))
            .filter(|e| e.is_control() && !self.key_index.contains_key(&e.src))
            .copied()
            .collect();
        dependency_inputs.sort_by_key(|e| e.id);
        let expected = self.template.dependency_input_count();
        if expected > 0 && dependency_inputs.len() != expected {
            return Err(MatchFailure::DependencyArity {
                expected,
                found: dependency_inputs.len(),
            });
        }

        Ok(MatchRecord {
            template: self.template.name().to_owned(),
            anchor,
            bindings: self.bindings,
            key_index: self.key_index,
            inputs,
            dynamic_inputs: self.dynamic_inputs,
            dependency_inputs,
            outputs,
        })
    }
}
