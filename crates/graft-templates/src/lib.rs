// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! graft-templates: concrete fusion plugins for `graft-core`.
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
#![allow(clippy::must_use_candidate, clippy::module_name_repetitions)]

use graft_core::{FusionTemplate, TemplateError};

mod logicsum;

pub use logicsum::{LogicSum, LOGICSUM_NAME, LOGICSUM_OP, ZERO_TOLERANCE};

/// A plugin that can be shared with a pass driver.
pub type BoxedTemplate = Box<dyn FusionTemplate + Send + Sync>;

/// Every plugin this crate ships, in registration order.
///
/// # Errors
/// A [`TemplateError`] if a built-in template declaration is malformed.
pub fn builtin_templates() -> Result<Vec<BoxedTemplate>, TemplateError> {
    Ok(vec![Box::new(LogicSum::new()?)])
}
