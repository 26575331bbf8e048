// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(dead_code)]

use graft_core::{
    BuildError, DynamicWindow, EdgeId, EdgeRecord, FusionTemplate, GraphStore, InputSpec,
    MatchRecord, NodeDef, NodeId, OutputSpec, Template, TemplateNode,
};

// =============================================================================
// GRAPH BUILDING
// =============================================================================

/// Adds a node with a unique name; panics on failure (tests only).
pub fn node(g: &mut GraphStore, name: &str, op: &str) -> NodeId {
    g.add_node(NodeDef::new(name, op)).expect("add node")
}

/// Adds a data or control edge; panics on failure (tests only).
pub fn edge(g: &mut GraphStore, src: NodeId, src_port: i32, dst: NodeId, dst_port: i32) -> EdgeId {
    g.add_edge(src, src_port, dst, dst_port).expect("add edge")
}

/// Every live edge must point at live nodes.
pub fn assert_no_dangling_edges(g: &GraphStore) {
    for e in g.iter_edges() {
        assert!(g.node(e.src).is_some(), "edge {} has a dead source", e.id);
        assert!(g.node(e.dst).is_some(), "edge {} has a dead destination", e.id);
    }
}

/// Data in-degree and out-degree of `n`.
pub fn data_degree(g: &GraphStore, n: NodeId) -> (usize, usize) {
    let inbound = g.in_edges(n).filter(|e| !e.is_control()).count();
    let outbound = g.out_edges(n).filter(|e| !e.is_control()).count();
    (inbound, outbound)
}

// =============================================================================
// TEMPLATES
// =============================================================================

/// `External(0) -> Neg -> Abs -> External(0)`, anchored at `neg`.
pub fn neg_abs_template() -> Template {
    Template::new(
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
    .expect("neg_abs template")
}

/// Five-port producer: ports `0 ..= max-1` feed `Concat` consumer(s), the
/// last port feeds an `Abs`. Anchored at `p`.
pub fn fan_out_template() -> Template {
    Template::new(
        "fan_out",
        vec![
            TemplateNode::new("p", "Split")
                .inputs([InputSpec::External(0)])
                .output([OutputSpec::node("c")])
                .output([OutputSpec::node("t")])
                .output_window(DynamicWindow::new(0, -1)),
            TemplateNode::new("c", "Concat")
                .inputs([InputSpec::node("p")])
                .input_window(DynamicWindow::new(0, 0)),
            TemplateNode::new("t", "Abs").inputs([InputSpec::node("p")]),
        ],
        "p",
        1,
        0,
    )
    .expect("fan_out template")
}

/// Variadic sum of `Const` producers, anchored at `s`.
pub fn fan_in_template() -> Template {
    Template::new(
        "fan_in",
        vec![
            TemplateNode::new("s", "AddN")
                .inputs([InputSpec::node("k")])
                .input_window(DynamicWindow::new(0, 0))
                .output([OutputSpec::External(0)]),
            TemplateNode::new("k", "Const").output([OutputSpec::node("s")]),
        ],
        "s",
        0,
        1,
    )
    .expect("fan_in template")
}

/// `Mul(External(0), <producer_op>)`, anchored at `m`.
pub fn scale_template(producer_op: &str) -> Template {
    Template::new(
        "scale",
        vec![
            TemplateNode::new("m", "Mul")
                .inputs([InputSpec::External(0), InputSpec::node("k")])
                .output([OutputSpec::External(0)]),
            TemplateNode::new("k", producer_op).output([OutputSpec::node("m")]),
        ],
        "m",
        1,
        1,
    )
    .expect("scale template")
}

// =============================================================================
// HOST GRAPHS
// =============================================================================

/// `x -> neg -> abs -> y`; returns the graph and `neg`.
pub fn neg_abs_chain() -> (GraphStore, NodeId) {
    let mut g = GraphStore::new();
    let x = node(&mut g, "x", "Placeholder");
    let neg = node(&mut g, "neg", "Neg");
    let abs = node(&mut g, "abs", "Abs");
    let y = node(&mut g, "y", "Identity");
    edge(&mut g, x, 0, neg, 0);
    edge(&mut g, neg, 0, abs, 0);
    edge(&mut g, abs, 0, y, 0);
    (g, neg)
}

/// A `Split` with five output ports. With `distinct`, ports 0..=3 each feed
/// their own `Concat`; otherwise they all feed one `Concat`. Port 4 feeds an
/// `Abs`. Returns the graph and the producer.
pub fn five_port_producer(distinct: bool) -> (GraphStore, NodeId) {
    let mut g = GraphStore::new();
    let x = node(&mut g, "x", "Placeholder");
    let p = node(&mut g, "p", "Split");
    edge(&mut g, x, 0, p, 0);
    if distinct {
        for port in 0..4 {
            let c = node(&mut g, &format!("c{port}"), "Concat");
            edge(&mut g, p, port, c, 0);
        }
    } else {
        let c = node(&mut g, "c", "Concat");
        for port in 0..4 {
            edge(&mut g, p, port, c, port);
        }
    }
    let t = node(&mut g, "t", "Abs");
    edge(&mut g, p, 4, t, 0);
    (g, p)
}

// =============================================================================
// PLUGINS
// =============================================================================

/// Fuses `Neg -> Abs` into one `NegAbs` node.
pub struct NegAbs(pub Template);

impl NegAbs {
    pub fn new() -> Self {
        Self(neg_abs_template())
    }
}

impl FusionTemplate for NegAbs {
    fn template(&self) -> &Template {
        &self.0
    }

    fn build_replacement(
        &self,
        graph: &GraphStore,
        record: &MatchRecord,
        prefix: &str,
    ) -> Result<NodeDef, BuildError> {
        let neg = record
            .node("neg")
            .ok_or_else(|| BuildError::MissingBinding("neg".into()))?;
        let mut def = NodeDef::new(format!("{prefix}neg_abs"), "NegAbs");
        if let Some(rec) = graph.node(neg) {
            def.set_device(rec.device.clone()).copy_attrs_from(rec);
        }
        for input in record.boundary_inputs() {
            def.add_input(graph, input)?;
        }
        Ok(def)
    }
}

/// Records sorted by id, for comparing edge sets.
pub fn sorted_ids(edges: &[EdgeRecord]) -> Vec<EdgeId> {
    let mut ids: Vec<_> = edges.iter().map(|e| e.id).collect();
    ids.sort();
    ids
}
