// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! graft-core: port-addressed subgraph template matching and fusion.
//!
//! A [`Template`] describes a small chain of typed operator nodes. The
//! [`match_template`] function grows a binding from an anchor node of a host
//! [`GraphStore`], generalizing variadic ports according to a
//! [`DynamicMode`]. A [`FusionTemplate`] plugin then turns a successful
//! [`MatchRecord`] into one replacement node via [`fuse`], rerouting every
//! boundary edge with an all-or-nothing [`SplicePlan`].
//!
//! The engine never logs; every failure is a value.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::missing_const_for_fn,
    clippy::redundant_pub_crate,
    clippy::module_name_repetitions,
    clippy::use_self
)]

mod edge_group;
mod fusion;
mod graph;
mod ident;
mod matcher;
mod node_def;
mod ops;
mod record;
mod rewrite;
mod template;

/// Output edge groups and variadic port arithmetic.
pub use edge_group::{remap_port, OutputEdgeGroup, PortSlot};
/// Plugin contract and the shared fusion flow.
pub use fusion::{fuse, fuse_with_mode, BuildError, Fused, FusionError, FusionTemplate};
/// Reference host graph.
pub use graph::{GraphError, GraphStore, Hash};
/// Stable node/edge handles.
pub use ident::{is_control_port, EdgeId, NodeId, CONTROL_PORT};
/// Matcher entry point and per-attempt records.
pub use matcher::{match_template, DynamicMode, MatchFailure, MatchRecord, MatchedNode};
/// Replacement-node descriptor builder.
pub use node_def::NodeDef;
/// Operator traits consulted during matching.
pub use ops::{OpRegistry, OpTraits, DEFAULT_DUPLICABLE_OP, DEFAULT_PASSTHROUGH_OP};
/// Host node/edge records and attribute values.
pub use record::{AttrValue, DataType, EdgeRecord, NodeRecord, TensorValue};
/// Splice primitives.
pub use rewrite::{remove_edges, reroute_input, reroute_outputs, SpliceError, SplicePlan, SpliceStep};
/// Template model.
pub use template::{DynamicWindow, InputSpec, OutputSpec, Template, TemplateError, TemplateNode};
