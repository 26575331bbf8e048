// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Fusion plugin contract and the shared match → guard → build → splice flow.
use thiserror::Error;

use crate::graph::{GraphError, GraphStore};
use crate::ident::NodeId;
use crate::matcher::{match_template, DynamicMode, MatchFailure, MatchRecord};
use crate::node_def::NodeDef;
use crate::ops::OpRegistry;
use crate::rewrite::{SpliceError, SplicePlan};
use crate::template::Template;

/// The replacement could not be planned or described.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// A binding the plugin relies on is absent from the record.
    #[error("match record has no binding for `{0}`")]
    MissingBinding(String),
    /// The boundary does not have the shape the replacement needs.
    #[error("{what}: expected {expected}, found {found}")]
    Arity {
        /// Which boundary list.
        what: &'static str,
        /// Required count.
        expected: usize,
        /// Actual count.
        found: usize,
    },
    /// Host graph rejected a read or the replacement descriptor.
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Outcome of one [`fuse`] attempt that did not produce a rewrite.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FusionError {
    /// The template does not match at this anchor.
    #[error("no match: {0}")]
    NoMatch(#[from] MatchFailure),
    /// The match was found but the plugin's semantic guard refused it.
    #[error("guard rejected match: {0}")]
    GuardRejected(String),
    /// The replacement could not be planned or added; graph unmodified.
    #[error("build failed: {0}")]
    Build(#[from] BuildError),
    /// The splice failed after validation; the graph may be inconsistent.
    #[error("splice failed: {0}")]
    Splice(#[from] SpliceError),
}

impl FusionError {
    /// Whether the caller may move on to the next anchor.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Splice(_))
    }
}

/// A concrete fusion: one template plus its guard and replacement.
///
/// Implementors supply the pattern and the pattern-specific pieces; [`fuse`]
/// drives the shared matching and splicing.
pub trait FusionTemplate {
    /// The pattern.
    fn template(&self) -> &Template;

    /// Identifier used for configuration and replacement naming.
    fn name(&self) -> &str {
        self.template().name()
    }

    /// Dynamic-port policy for matching.
    fn dynamic_mode(&self) -> DynamicMode {
        DynamicMode::Shared
    }

    /// Semantic guard run after a structural match.
    ///
    /// # Errors
    /// A human-readable reason when the fusion must not apply.
    fn check(&self, graph: &GraphStore, record: &MatchRecord) -> Result<(), String> {
        let _ = (graph, record);
        Ok(())
    }

    /// Maps the boundary onto replacement ports.
    ///
    /// # Errors
    /// [`BuildError`] when the boundary has the wrong shape.
    fn splice_plan(&self, record: &MatchRecord) -> Result<SplicePlan, BuildError> {
        Ok(SplicePlan::positional(record))
    }

    /// Describes the replacement node; `prefix` namespaces its name.
    ///
    /// # Errors
    /// [`BuildError`] when the descriptor cannot be produced.
    fn build_replacement(
        &self,
        graph: &GraphStore,
        record: &MatchRecord,
        prefix: &str,
    ) -> Result<NodeDef, BuildError>;
}

/// A successful rewrite.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fused {
    /// The node that replaced the match.
    pub replacement: NodeId,
    /// The match that was replaced.
    pub record: MatchRecord,
}

/// Matches `plugin` at `anchor` using its own dynamic mode and, on success,
/// replaces the match with one node.
///
/// # Errors
/// See [`fuse_with_mode`].
pub fn fuse<T: FusionTemplate + ?Sized>(
    graph: &mut GraphStore,
    plugin: &T,
    anchor: NodeId,
    prefix: &str,
    ops: &OpRegistry,
) -> Result<Fused, FusionError> {
    fuse_with_mode(graph, plugin, anchor, prefix, ops, plugin.dynamic_mode())
}

/// [`fuse`] with an explicit [`DynamicMode`].
///
/// Steps: match, guard, plan, build, validate the plan, add the replacement,
/// apply. Every error before the final apply leaves the graph as it was. The
/// replacement gets a `_N` suffix when its name is taken.
///
/// # Errors
/// - [`FusionError::NoMatch`] / [`FusionError::GuardRejected`]: nothing applies here
/// - [`FusionError::Build`]: the plugin or the host rejected the replacement
/// - [`FusionError::Splice`]: the splice failed; not recoverable
pub fn fuse_with_mode<T: FusionTemplate + ?Sized>(
    graph: &mut GraphStore,
    plugin: &T,
    anchor: NodeId,
    prefix: &str,
    ops: &OpRegistry,
    mode: DynamicMode,
) -> Result<Fused, FusionError> {
    let record = match_template(graph, anchor, plugin.template(), mode, ops)?;
    plugin
        .check(graph, &record)
        .map_err(FusionError::GuardRejected)?;
    let plan = plugin.splice_plan(&record)?;
    let mut def = plugin.build_replacement(graph, &record, prefix)?;
    def.name = unique_name(graph, &def.name);
    plan.validate(graph, None)?;

    let replacement = graph.add_node(def).map_err(BuildError::from)?;
    plan.apply(graph, replacement)?;
    Ok(Fused {
        replacement,
        record,
    })
}

fn unique_name(graph: &GraphStore, base: &str) -> String {
    if graph.node_by_name(base).is_none() {
        return base.to_owned();
    }
    (1..)
        .map(|n| format!("{base}_{n}"))
        .find(|name| graph.node_by_name(name).is_none())
        .unwrap_or_else(|| base.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{InputSpec, OutputSpec, TemplateNode};

    struct NegAbs(Template);

    impl NegAbs {
        fn new() -> Self {
            let t = Template::new(
                "neg_abs",
                vec![
                    TemplateNode::new("neg", "Neg")
                        .inputs([InputSpec::External(0)])
                        .output([OutputSpec::node("abs")]),
                    TemplateNode::new("abs", "Abs")
                        .inputs([InputSpec::node("neg")])
                        .output([OutputSpec::External(0)]),
                ],
                "neg",
                1,
                1,
            )
            .expect("template");
            Self(t)
        }
    }

    impl FusionTemplate for NegAbs {
        fn template(&self) -> &Template {
            &self.0
        }

        fn check(&self, graph: &GraphStore, record: &MatchRecord) -> Result<(), String> {
            let src = record.boundary_inputs()[0].src;
            match graph.op(src) {
                Some("Forbidden") => Err("forbidden producer".into()),
                _ => Ok(()),
            }
        }

        fn build_replacement(
            &self,
            graph: &GraphStore,
            record: &MatchRecord,
            prefix: &str,
        ) -> Result<NodeDef, BuildError> {
            let mut def = NodeDef::new(format!("{prefix}neg_abs"), "NegAbs");
            def.add_input(graph, &record.boundary_inputs()[0])?;
            Ok(def)
        }
    }

    fn chain(g: &mut GraphStore, tag: &str, src_op: &str) -> NodeId {
        let x = g.add_node(NodeDef::new(format!("x{tag}"), src_op)).expect("x");
        let neg = g.add_node(NodeDef::new(format!("neg{tag}"), "Neg")).expect("neg");
        let abs = g.add_node(NodeDef::new(format!("abs{tag}"), "Abs")).expect("abs");
        let y = g.add_node(NodeDef::new(format!("y{tag}"), "Identity")).expect("y");
        g.add_edge(x, 0, neg, 0).expect("edge");
        g.add_edge(neg, 0, abs, 0).expect("edge");
        g.add_edge(abs, 0, y, 0).expect("edge");
        neg
    }

    #[test]
    fn fuse_rewires_the_boundary_onto_the_replacement() {
        let mut g = GraphStore::new();
        let neg = chain(&mut g, "", "Placeholder");
        let fused = fuse(&mut g, &NegAbs::new(), neg, "f/", &OpRegistry::default())
            .expect("fuse");

        let rec = g.node(fused.replacement).expect("replacement");
        assert_eq!(rec.name, "f/neg_abs");
        assert_eq!(rec.inputs, vec!["x:0".to_owned()]);
        assert_eq!(g.in_edges(fused.replacement).count(), 1);
        assert_eq!(g.out_edges(fused.replacement).count(), 1);
        assert_eq!(g.in_edges(neg).count(), 0);
    }

    #[test]
    fn guard_rejection_is_recoverable_and_leaves_the_graph_alone() {
        let mut g = GraphStore::new();
        let neg = chain(&mut g, "", "Forbidden");
        let before = g.canonical_state_hash();
        let err = fuse(&mut g, &NegAbs::new(), neg, "", &OpRegistry::default())
            .expect_err("guard");
        assert_eq!(err, FusionError::GuardRejected("forbidden producer".into()));
        assert!(err.is_recoverable());
        assert_eq!(g.canonical_state_hash(), before);
    }

    #[test]
    fn replacement_names_are_made_unique() {
        let mut g = GraphStore::new();
        let first = chain(&mut g, "0", "Placeholder");
        let second = chain(&mut g, "1", "Placeholder");
        let plugin = NegAbs::new();
        let ops = OpRegistry::default();
        let a = fuse(&mut g, &plugin, first, "", &ops).expect("first");
        let b = fuse(&mut g, &plugin, second, "", &ops).expect("second");
        assert_eq!(g.node(a.replacement).map(|n| n.name.as_str()), Some("neg_abs"));
        assert_eq!(g.node(b.replacement).map(|n| n.name.as_str()), Some("neg_abs_1"));
    }

    #[test]
    fn splice_errors_are_fatal() {
        let err = FusionError::from(SpliceError::StaleEdge(crate::ident::EdgeId(0)));
        assert!(!err.is_recoverable());
        assert!(FusionError::from(BuildError::MissingBinding("k".into())).is_recoverable());
    }
}
