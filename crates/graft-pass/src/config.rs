// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Pass configuration, stored as JSON.

use graft_core::{DynamicMode, OpRegistry, DEFAULT_DUPLICABLE_OP, DEFAULT_PASSTHROUGH_OP};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for config operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Serialization/deserialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    /// A value parsed but is unusable.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Knobs for one [`crate::FusionPass`] run.
///
/// Every field has a default, so `{}` is a valid config.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PassConfig {
    /// Prefix for replacement node names.
    pub name_prefix: String,
    /// Overrides every template's own dynamic mode when set.
    pub dynamic_mode: Option<DynamicMode>,
    /// Stop after this many rewrites.
    pub max_rewrites: Option<usize>,
    /// Templates to run, by name; `None` runs all of them.
    pub enabled_templates: Option<Vec<String>>,
    /// Operator kinds whose outputs may feed consumers outside a match.
    pub duplicable_ops: Vec<String>,
    /// Operator kinds always accepted as consumers of a matched node.
    pub passthrough_ops: Vec<String>,
}

impl Default for PassConfig {
    fn default() -> Self {
        Self {
            name_prefix: String::from("fused/"),
            dynamic_mode: None,
            max_rewrites: None,
            enabled_templates: None,
            duplicable_ops: vec![DEFAULT_DUPLICABLE_OP.to_owned()],
            passthrough_ops: vec![DEFAULT_PASSTHROUGH_OP.to_owned()],
        }
    }
}

impl PassConfig {
    /// Parses and validates a JSON config.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Rejects values the pass cannot honour.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(op) = self
            .duplicable_ops
            .iter()
            .chain(&self.passthrough_ops)
            .find(|op| op.is_empty())
        {
            return Err(ConfigError::Invalid(format!(
                "empty operator kind in op lists ({op:?})"
            )));
        }
        if matches!(&self.enabled_templates, Some(names) if names.iter().any(String::is_empty)) {
            return Err(ConfigError::Invalid("empty template name".into()));
        }
        Ok(())
    }

    /// Whether the template called `name` should run.
    pub fn is_enabled(&self, name: &str) -> bool {
        self.enabled_templates
            .as_ref()
            .is_none_or(|names| names.iter().any(|n| n == name))
    }

    /// Operator traits built from the op lists.
    pub fn op_registry(&self) -> OpRegistry {
        let mut ops = OpRegistry::empty();
        for op in &self.duplicable_ops {
            ops.mark_duplicable(op.clone());
        }
        for op in &self.passthrough_ops {
            ops.mark_passthrough(op.clone());
        }
        ops
    }
}
