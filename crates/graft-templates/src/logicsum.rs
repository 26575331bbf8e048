// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Boolean-logic-to-sum fusion.
//!
//! Matches
//!
//! ```text
//! greater_0   = Greater(a, b)
//! greater_1   = Greater(c, d)
//! logic_or_0  = LogicalOr(greater_0, greater_1)
//! logic_and_0 = LogicalAnd(greater_0, greater_1)
//! logic_not_0 = LogicalNot(logic_and_0)
//! logic_xor_0 = LogicalAnd(logic_or_0, logic_not_0)
//! cast_0      = Cast(logic_xor_0)
//! sum_0       = Sum(cast_0, e)
//! neg_0       = Neg(sum_0)            -> external output 0
//! ```
//!
//! and replaces it with one `LogicalSum(a, c)` node when `a` and `c` are
//! constant float zeros.
use graft_core::{
    AttrValue, BuildError, DataType, EdgeRecord, FusionTemplate, GraphStore, InputSpec,
    MatchRecord, NodeDef, OutputSpec, SplicePlan, Template, TemplateError, TemplateNode,
};

/// Template name; also the replacement's name suffix.
pub const LOGICSUM_NAME: &str = "logicsum_base";
/// Operator kind of the replacement node.
pub const LOGICSUM_OP: &str = "LogicalSum";
/// Absolute tolerance for the constant-zero guard.
pub const ZERO_TOLERANCE: f32 = 1e-6;

const EXTERNAL_INPUTS: usize = 5;
/// Boundary inputs the replacement keeps, in replacement port order.
const KEPT_INPUTS: [usize; 2] = [0, 2];

/// The boolean-logic-to-sum fusion plugin.
#[derive(Clone, Debug)]
pub struct LogicSum {
    template: Template,
}

impl LogicSum {
    /// Builds the nine-node template.
    ///
    /// # Errors
    /// Only if the declaration below is inconsistent.
    pub fn new() -> Result<Self, TemplateError> {
        let both_comparisons = || {
            [
                InputSpec::node("greater_0"),
                InputSpec::node("greater_1"),
            ]
        };
        let nodes = vec![
            TemplateNode::new("greater_0", "Greater")
                .inputs([InputSpec::External(0), InputSpec::External(1)])
                .output([OutputSpec::node("logic_or_0"), OutputSpec::node("logic_and_0")]),
            TemplateNode::new("greater_1", "Greater")
                .inputs([InputSpec::External(2), InputSpec::External(3)])
                .output([OutputSpec::node("logic_or_0"), OutputSpec::node("logic_and_0")]),
            TemplateNode::new("logic_or_0", "LogicalOr")
                .inputs(both_comparisons())
                .output([OutputSpec::node("logic_xor_0")]),
            TemplateNode::new("logic_and_0", "LogicalAnd")
                .inputs(both_comparisons())
                .output([OutputSpec::node("logic_not_0")]),
            TemplateNode::new("logic_not_0", "LogicalNot")
                .inputs([InputSpec::node("logic_and_0")])
                .output([OutputSpec::node("logic_xor_0")]),
            TemplateNode::new("logic_xor_0", "LogicalAnd")
                .inputs([InputSpec::node("logic_or_0"), InputSpec::node("logic_not_0")])
                .output([OutputSpec::node("cast_0")]),
            TemplateNode::new("cast_0", "Cast")
                .inputs([InputSpec::node("logic_xor_0")])
                .output([OutputSpec::node("sum_0")]),
            TemplateNode::new("sum_0", "Sum")
                .inputs([InputSpec::node("cast_0"), InputSpec::External(4)])
                .output([OutputSpec::node("neg_0")]),
            TemplateNode::new("neg_0", "Neg")
                .inputs([InputSpec::node("sum_0")])
                .output([OutputSpec::External(0)]),
        ];
        let template = Template::new(LOGICSUM_NAME, nodes, "greater_0", EXTERNAL_INPUTS, 1)?;
        Ok(Self { template })
    }

    fn kept_inputs(record: &MatchRecord) -> Result<[&EdgeRecord; 2], BuildError> {
        let inputs = record.boundary_inputs();
        if inputs.len() != EXTERNAL_INPUTS {
            return Err(BuildError::Arity {
                what: "boundary inputs",
                expected: EXTERNAL_INPUTS,
                found: inputs.len(),
            });
        }
        Ok(KEPT_INPUTS.map(|i| &inputs[i]))
    }
}

fn is_zero_constant(graph: &GraphStore, edge: &EdgeRecord) -> bool {
    graph
        .node(edge.src)
        .and_then(|n| n.tensor_attr("value"))
        .is_some_and(|t| t.is_constant_zero(ZERO_TOLERANCE))
}

impl FusionTemplate for LogicSum {
    fn template(&self) -> &Template {
        &self.template
    }

    fn check(&self, graph: &GraphStore, record: &MatchRecord) -> Result<(), String> {
        let kept = Self::kept_inputs(record).map_err(|e| e.to_string())?;
        for (edge, slot) in kept.into_iter().zip(KEPT_INPUTS) {
            if !is_zero_constant(graph, edge) {
                return Err(format!("input {slot} is not a constant float zero"));
            }
        }
        Ok(())
    }

    fn splice_plan(&self, record: &MatchRecord) -> Result<SplicePlan, BuildError> {
        let [a, c] = Self::kept_inputs(record)?;
        let outputs = record.boundary_outputs();
        if outputs.len() > 1 {
            return Err(BuildError::Arity {
                what: "boundary output groups",
                expected: 1,
                found: outputs.len(),
            });
        }
        let mut plan = SplicePlan::new().input(0, *a).input(1, *c);
        if let Some(group) = outputs.first() {
            plan = plan.outputs(0, group.clone());
        }
        Ok(plan)
    }

    fn build_replacement(
        &self,
        graph: &GraphStore,
        record: &MatchRecord,
        prefix: &str,
    ) -> Result<NodeDef, BuildError> {
        let anchor = record
            .node(self.template.anchor_key())
            .and_then(|n| graph.node(n))
            .ok_or_else(|| BuildError::MissingBinding(self.template.anchor_key().to_owned()))?;
        let mut def = NodeDef::new(format!("{prefix}{LOGICSUM_NAME}"), LOGICSUM_OP);
        def.set_device(anchor.device.clone())
            .set_attr("T", AttrValue::Type(DataType::Float));
        for edge in Self::kept_inputs(record)? {
            def.add_input(graph, edge)?;
        }
        Ok(def)
    }
}
