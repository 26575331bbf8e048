// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Template model: the immutable, declarative description of a pattern.
//!
//! A [`Template`] is an ordered list of [`TemplateNode`]s. Each node names the
//! operator kind a host node must carry, where each of its inputs comes from
//! ([`InputSpec`]) and who consumes each of its logical output ports
//! ([`OutputSpec`]). Numeric specs are zero-based indices into the template's
//! external inputs/outputs; they are a separate variant, never a string that
//! happens to parse as a number.
use std::collections::BTreeMap;

use thiserror::Error;

/// Where one input slot of a template node is fed from.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InputSpec {
    /// External input `index` of the whole pattern.
    External(usize),
    /// Output of another template node, by key.
    Node(String),
    /// Open slot: absorbs as many edges as the host graph presents.
    Wildcard,
}

impl InputSpec {
    /// Shorthand for [`InputSpec::Node`].
    pub fn node(key: impl Into<String>) -> Self {
        Self::Node(key.into())
    }
}

/// A declared consumer of one logical output port.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OutputSpec {
    /// External output `index` of the whole pattern.
    External(usize),
    /// Another template node, by key.
    Node(String),
}

impl OutputSpec {
    /// Shorthand for [`OutputSpec::Node`].
    pub fn node(key: impl Into<String>) -> Self {
        Self::Node(key.into())
    }
}

/// Port window whose host edges collapse onto one variadic template slot.
///
/// For a host node whose highest port is `max_port`, physical ports
/// `start_port ..= max_port + end_port` map onto logical slot `start_port`.
/// Ports below the window map 1:1; ports above shift left by the number of
/// collapsed ports minus one. `end_port` is usually `0` (window runs to the
/// last port) or negative (leaves trailing fixed ports).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DynamicWindow {
    /// First physical (and the only logical) port of the variadic slot.
    pub start_port: usize,
    /// Offset from the host's highest port to the last port of the window.
    pub end_port: i32,
}

impl DynamicWindow {
    /// Window starting at `start_port` and ending `end_port` from the last port.
    #[must_use]
    pub const fn new(start_port: usize, end_port: i32) -> Self {
        Self {
            start_port,
            end_port,
        }
    }
}

/// One operator node of a template.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TemplateNode {
    /// Key, unique within the template.
    pub key: String,
    /// Operator kind the host node must carry.
    pub op: String,
    /// Input slots in port order.
    pub inputs: Vec<InputSpec>,
    /// Declared consumers per logical output port.
    pub outputs: Vec<Vec<OutputSpec>>,
    /// Variadic window over inbound ports, if any.
    pub input_window: Option<DynamicWindow>,
    /// Variadic window over outbound ports, if any.
    pub output_window: Option<DynamicWindow>,
}

impl TemplateNode {
    /// Starts a node with no inputs and no outputs.
    pub fn new(key: impl Into<String>, op: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            op: op.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            input_window: None,
            output_window: None,
        }
    }

    /// Sets the input slots.
    #[must_use]
    pub fn inputs(mut self, inputs: impl IntoIterator<Item = InputSpec>) -> Self {
        self.inputs = inputs.into_iter().collect();
        self
    }

    /// Appends one logical output port with its declared consumers.
    #[must_use]
    pub fn output(mut self, consumers: impl IntoIterator<Item = OutputSpec>) -> Self {
        self.outputs.push(consumers.into_iter().collect());
        self
    }

    /// Declares a variadic window over inbound ports.
    #[must_use]
    pub fn input_window(mut self, window: DynamicWindow) -> Self {
        self.input_window = Some(window);
        self
    }

    /// Declares a variadic window over outbound ports.
    #[must_use]
    pub fn output_window(mut self, window: DynamicWindow) -> Self {
        self.output_window = Some(window);
        self
    }

    /// Returns `true` if the last input slot is a catch-all wildcard.
    #[must_use]
    pub fn has_trailing_wildcard(&self) -> bool {
        matches!(self.inputs.last(), Some(InputSpec::Wildcard))
    }
}

/// Malformed template detected at construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// A template needs at least one node.
    #[error("template `{0}` has no nodes")]
    Empty(String),
    /// Two nodes share a key.
    #[error("duplicate template key `{0}`")]
    DuplicateKey(String),
    /// The anchor key names no node.
    #[error("anchor key `{0}` names no template node")]
    UnknownAnchor(String),
    /// A node spec references a key that does not exist.
    #[error("node `{node}` references unknown key `{reference}`")]
    UnknownReference {
        /// Referencing node.
        node: String,
        /// Missing key.
        reference: String,
    },
    /// An external input index is not below the declared count.
    #[error("node `{node}` uses external input {index} but only {count} are declared")]
    ExternalInputOutOfRange {
        /// Referencing node.
        node: String,
        /// Offending index.
        index: usize,
        /// Declared external input count.
        count: usize,
    },
    /// An external output index is not below the declared count.
    #[error("node `{node}` uses external output {index} but only {count} are declared")]
    ExternalOutputOutOfRange {
        /// Referencing node.
        node: String,
        /// Offending index.
        index: usize,
        /// Declared external output count.
        count: usize,
    },
    /// A dynamic window starts past the node's declared slots.
    #[error("node `{node}` declares a dynamic window at slot {start_port} it does not have")]
    WindowOutOfRange {
        /// Offending node.
        node: String,
        /// Window start slot.
        start_port: usize,
    },
}

/// Immutable pattern description.
///
/// Built once via [`Template::new`], then shared read-only across every match
/// attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Template {
    name: String,
    nodes: Vec<TemplateNode>,
    index: BTreeMap<String, usize>,
    anchor_key: String,
    external_inputs: usize,
    external_outputs: usize,
    dependency_inputs: usize,
}

impl Template {
    /// Validates and builds a template.
    ///
    /// # Errors
    /// Returns a [`TemplateError`] if keys repeat, the anchor or any node
    /// reference is unknown, an external index is out of range, or a dynamic
    /// window points at a missing slot.
    pub fn new(
        name: impl Into<String>,
        nodes: Vec<TemplateNode>,
        anchor_key: impl Into<String>,
        external_inputs: usize,
        external_outputs: usize,
    ) -> Result<Self, TemplateError> {
        let name = name.into();
        let anchor_key = anchor_key.into();
        if nodes.is_empty() {
            return Err(TemplateError::Empty(name));
        }
        let mut index = BTreeMap::new();
        for (i, node) in nodes.iter().enumerate() {
            if index.insert(node.key.clone(), i).is_some() {
                return Err(TemplateError::DuplicateKey(node.key.clone()));
            }
        }
        if !index.contains_key(&anchor_key) {
            return Err(TemplateError::UnknownAnchor(anchor_key));
        }
        for node in &nodes {
            validate_node(node, &index, external_inputs, external_outputs)?;
        }
        Ok(Self {
            name,
            nodes,
            index,
            anchor_key,
            external_inputs,
            external_outputs,
            dependency_inputs: 0,
        })
    }

    /// Declares how many control-only inputs the pattern expects.
    ///
    /// Zero (the default) means control inputs are collected but not counted.
    #[must_use]
    pub fn with_dependency_inputs(mut self, count: usize) -> Self {
        self.dependency_inputs = count;
        self
    }

    /// Template name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Nodes in declaration order.
    #[must_use]
    pub fn nodes(&self) -> &[TemplateNode] {
        &self.nodes
    }

    /// Node declared under `key`.
    pub fn node(&self, key: &str) -> Option<&TemplateNode> {
        self.index.get(key).map(|&i| &self.nodes[i])
    }

    /// Key of the anchor node.
    #[must_use]
    pub fn anchor_key(&self) -> &str {
        &self.anchor_key
    }

    /// The anchor node.
    #[must_use]
    pub fn anchor(&self) -> &TemplateNode {
        &self.nodes[self.index[&self.anchor_key]]
    }

    /// Number of external data inputs.
    #[must_use]
    pub fn external_input_count(&self) -> usize {
        self.external_inputs
    }

    /// Number of external outputs.
    #[must_use]
    pub fn external_output_count(&self) -> usize {
        self.external_outputs
    }

    /// Number of control-only inputs; zero when not enforced.
    #[must_use]
    pub fn dependency_input_count(&self) -> usize {
        self.dependency_inputs
    }
}

fn validate_node(
    node: &TemplateNode,
    index: &BTreeMap<String, usize>,
    external_inputs: usize,
    external_outputs: usize,
) -> Result<(), TemplateError> {
    let unknown = |reference: &str| TemplateError::UnknownReference {
        node: node.key.clone(),
        reference: reference.to_owned(),
    };
    for spec in &node.inputs {
        match spec {
            InputSpec::External(i) if *i >= external_inputs => {
                return Err(TemplateError::ExternalInputOutOfRange {
                    node: node.key.clone(),
                    index: *i,
                    count: external_inputs,
                });
            }
            InputSpec::Node(key) if !index.contains_key(key) => return Err(unknown(key)),
            _ => {}
        }
    }
    for spec in node.outputs.iter().flatten() {
        match spec {
            OutputSpec::External(i) if *i >= external_outputs => {
                return Err(TemplateError::ExternalOutputOutOfRange {
                    node: node.key.clone(),
                    index: *i,
                    count: external_outputs,
                });
            }
            OutputSpec::Node(key) if !index.contains_key(key) => return Err(unknown(key)),
            _ => {}
        }
    }
    let window_err = |start_port| TemplateError::WindowOutOfRange {
        node: node.key.clone(),
        start_port,
    };
    if let Some(w) = node.input_window {
        if w.start_port >= node.inputs.len() {
            return Err(window_err(w.start_port));
        }
    }
    if let Some(w) = node.output_window {
        if w.start_port >= node.outputs.len() {
            return Err(window_err(w.start_port));
        }
    }
    Ok(())
}
