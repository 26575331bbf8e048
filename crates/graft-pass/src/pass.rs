// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Sequential fusion pass over a whole graph.

use std::collections::BTreeSet;

use graft_core::{fuse_with_mode, FusionError, GraphStore, NodeId, OpRegistry, TemplateError};
use graft_templates::{builtin_templates, BoxedTemplate};
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::config::PassConfig;
use crate::report::{PassReport, Rewrite};

/// A pass run that could not complete.
#[derive(Debug, Error)]
pub enum PassError {
    /// A built-in template declaration is malformed.
    #[error("failed to load built-in templates: {0}")]
    Templates(#[from] TemplateError),
    /// A fusion failed in a way that may leave the graph inconsistent.
    #[error("template `{template}` failed at anchor {anchor}: {source}")]
    Fatal {
        /// Template being applied.
        template: String,
        /// Anchor being tried.
        anchor: NodeId,
        /// Underlying failure.
        #[source]
        source: FusionError,
    },
}

/// Applies every enabled template at every anchor until nothing matches.
///
/// Attempts are serialized: each one sees the graph left by the previous. After
/// a successful rewrite the anchor list is rebuilt from the live graph.
pub struct FusionPass {
    templates: Vec<BoxedTemplate>,
    config: PassConfig,
    ops: OpRegistry,
}

impl FusionPass {
    /// Pass over the built-in templates.
    pub fn new(config: PassConfig) -> Result<Self, PassError> {
        Ok(Self::with_templates(config, builtin_templates()?))
    }

    /// Pass over an explicit template list, applied in order.
    pub fn with_templates(config: PassConfig, templates: Vec<BoxedTemplate>) -> Self {
        let ops = config.op_registry();
        Self {
            templates,
            config,
            ops,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &PassConfig {
        &self.config
    }

    /// Names of the templates that will run.
    pub fn enabled_templates(&self) -> impl Iterator<Item = &str> {
        self.templates
            .iter()
            .map(|t| t.name())
            .filter(|name| self.config.is_enabled(name))
    }

    fn limit_reached(&self, report: &PassReport) -> bool {
        self.config
            .max_rewrites
            .is_some_and(|max| report.rewrites.len() >= max)
    }

    /// Runs the pass.
    ///
    /// Recoverable failures (no match, guard rejection, build rejection) are
    /// logged at `debug` and counted; the pass moves on to the next anchor.
    #[instrument(skip_all, fields(nodes = graph.node_count(), edges = graph.edge_count()))]
    pub fn run(&self, graph: &mut GraphStore) -> Result<PassReport, PassError> {
        let mut report = PassReport::start(&graph.canonical_state_hash());
        // Replacements and matched nodes never anchor again in this run.
        let mut retired: BTreeSet<NodeId> = BTreeSet::new();

        for plugin in &self.templates {
            let name = plugin.name();
            if !self.config.is_enabled(name) {
                debug!(template = name, "template disabled");
                continue;
            }
            let mode = self.config.dynamic_mode.unwrap_or_else(|| plugin.dynamic_mode());
            let anchor_op = plugin.template().anchor().op.as_str();

            'rescan: loop {
                let anchors: Vec<NodeId> = graph
                    .iter_nodes()
                    .filter(|(id, rec)| rec.op == anchor_op && !retired.contains(id))
                    .map(|(id, _)| id)
                    .collect();
                for anchor in anchors {
                    if self.limit_reached(&report) {
                        info!(limit = report.rewrites.len(), "rewrite limit reached");
                        break 'rescan;
                    }
                    report.attempts += 1;
                    match fuse_with_mode(
                        graph,
                        plugin.as_ref(),
                        anchor,
                        &self.config.name_prefix,
                        &self.ops,
                        mode,
                    ) {
                        Ok(fused) => {
                            let replacement_name = graph
                                .node(fused.replacement)
                                .map(|n| n.name.clone())
                                .unwrap_or_default();
                            info!(
                                template = name,
                                %anchor,
                                replacement = %replacement_name,
                                bound = fused.record.len(),
                                "fused subgraph"
                            );
                            retired.insert(fused.replacement);
                            retired.extend(fused.record.nodes());
                            report.rewrites.push(Rewrite {
                                template: name.to_owned(),
                                anchor,
                                replacement: fused.replacement,
                                replacement_name,
                                bound_nodes: fused.record.len(),
                            });
                            continue 'rescan;
                        }
                        Err(err) if err.is_recoverable() => {
                            debug!(template = name, %anchor, error = %err, "anchor rejected");
                            report.rejections += 1;
                        }
                        Err(source) => {
                            return Err(PassError::Fatal {
                                template: name.to_owned(),
                                anchor,
                                source,
                            });
                        }
                    }
                }
                break;
            }
        }

        report.finish(&graph.canonical_state_hash());
        info!(
            rewrites = report.rewrites.len(),
            attempts = report.attempts,
            rejections = report.rejections,
            "fusion pass complete"
        );
        Ok(report)
    }
}
