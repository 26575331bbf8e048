// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! graft-pass: the optimization-pass driver for `graft-core` fusions.
//!
//! [`FusionPass`] walks a [`graft_core::GraphStore`], tries every enabled
//! template at every anchor of the right kind, and reports what it rewrote.
//! Configuration is JSON ([`PassConfig`]); progress is logged through
//! `tracing`.
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
    clippy::missing_errors_doc,
    clippy::module_name_repetitions
)]

mod config;
mod document;
mod pass;
mod report;

pub use config::{ConfigError, PassConfig};
pub use document::{DocumentError, EdgeDocument, GraphDocument};
pub use pass::{FusionPass, PassError};
pub use report::{PassReport, Rewrite};
