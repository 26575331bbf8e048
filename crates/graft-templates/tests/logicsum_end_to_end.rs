// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The boolean-logic-to-sum fusion on its reference host graph.

#![allow(missing_docs)]
mod common;

use common::{scenario, zero_scenario};
use graft_core::{
    fuse, match_template, AttrValue, DataType, DynamicMode, FusionError, FusionTemplate,
    MatchFailure, NodeDef, OpRegistry, TensorValue,
};
use graft_templates::{LogicSum, LOGICSUM_OP};
use proptest::prelude::*;

fn plugin() -> LogicSum {
    LogicSum::new().expect("logicsum template")
}

#[test]
fn match_binds_the_whole_chain_and_reports_the_boundary() {
    let s = zero_scenario();
    let p = plugin();
    let m = match_template(
        &s.graph,
        s.greater_0,
        p.template(),
        p.dynamic_mode(),
        &OpRegistry::default(),
    )
    .expect("match");

    assert_eq!(m.len(), 9);
    let expected = [
        ("greater_0", s.greater_0),
        ("greater_1", s.greater_1),
        ("logic_or_0", s.logic_or),
        ("logic_and_0", s.logic_and),
        ("logic_not_0", s.logic_not),
        ("logic_xor_0", s.logic_xor),
        ("cast_0", s.cast),
        ("sum_0", s.sum),
        ("neg_0", s.neg),
    ];
    for (key, node) in expected {
        assert_eq!(m.node(key), Some(node), "binding for {key}");
    }
    let sources: Vec<_> = m.boundary_inputs().iter().map(|e| e.src).collect();
    assert_eq!(sources, vec![s.a, s.b, s.c, s.d, s.e]);
    let outputs = m.boundary_outputs();
    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].len(), 1);
    assert_eq!((outputs[0][0].src, outputs[0][0].dst), (s.neg, s.x));
}

#[test]
fn fusion_replaces_the_chain_with_one_node() {
    let mut s = zero_scenario();
    let fused = fuse(
        &mut s.graph,
        &plugin(),
        s.greater_0,
        "fused/",
        &OpRegistry::default(),
    )
    .expect("fuse");
    let g = &s.graph;
    let r = fused.replacement;

    let rec = g.node(r).expect("replacement");
    assert_eq!(rec.op, LOGICSUM_OP);
    assert_eq!(rec.name, "fused/logicsum_base");
    assert_eq!(rec.device, "/device:CPU:0");
    assert_eq!(rec.attr("T"), Some(&AttrValue::Type(DataType::Float)));
    assert_eq!(rec.inputs, vec!["a:0".to_owned(), "c:0".to_owned()]);

    let mut inbound: Vec<_> = g.in_edges(r).map(|e| (e.dst_port, e.src)).collect();
    inbound.sort();
    assert_eq!(inbound, vec![(0, s.a), (1, s.c)]);

    let into_x: Vec<_> = g.in_edges(s.x).map(|e| (e.src, e.src_port, e.dst_port)).collect();
    assert_eq!(into_x, vec![(r, 0, 0)]);
    assert_eq!(g.out_edges(s.neg).count(), 0);

    for e in g.iter_edges() {
        assert!(g.node(e.src).is_some() && g.node(e.dst).is_some());
    }
}

#[test]
fn guard_rejects_non_zero_comparison_inputs() {
    let cases = [
        (TensorValue::Float(vec![0.0, 0.5]), TensorValue::Float(vec![0.0])),
        (TensorValue::Float(vec![0.0]), TensorValue::Float(vec![-1.0])),
        (TensorValue::Float(vec![0.0]), TensorValue::Int64(vec![0])),
    ];
    for (a, c) in cases {
        let mut s = scenario(a, c);
        let before = s.graph.canonical_state_hash();
        let err = fuse(&mut s.graph, &plugin(), s.greater_0, "", &OpRegistry::default())
            .expect_err("guard must reject");
        assert!(matches!(err, FusionError::GuardRejected(_)), "{err}");
        assert!(err.is_recoverable());
        assert_eq!(s.graph.canonical_state_hash(), before);
    }
}

#[test]
fn guard_rejects_inputs_without_a_constant_payload() {
    let mut s = zero_scenario();
    // Swap `c` for a placeholder feeding the same port.
    let edge = s
        .graph
        .in_edges(s.greater_1)
        .find(|e| e.dst_port == 0)
        .map(|e| e.id)
        .expect("c edge");
    s.graph.remove_edge(edge).expect("remove");
    let p = s
        .graph
        .add_node(NodeDef::new("c_placeholder", "Placeholder"))
        .expect("node");
    s.graph.add_edge(p, 0, s.greater_1, 0).expect("edge");

    let err = fuse(&mut s.graph, &plugin(), s.greater_0, "", &OpRegistry::default())
        .expect_err("guard must reject");
    assert!(matches!(err, FusionError::GuardRejected(_)));
}

#[test]
fn extra_consumer_inside_the_chain_prevents_the_match() {
    let mut s = zero_scenario();
    let spy = s
        .graph
        .add_node(NodeDef::new("spy", "Identity"))
        .expect("node");
    s.graph.add_edge(s.logic_or, 0, spy, 0).expect("edge");

    let err = fuse(&mut s.graph, &plugin(), s.greater_0, "", &OpRegistry::default())
        .expect_err("no match");
    assert!(matches!(
        err,
        FusionError::NoMatch(MatchFailure::UnexplainedConsumers { .. })
    ));
}

#[test]
fn second_comparison_is_not_an_anchor() {
    let s = zero_scenario();
    let p = plugin();
    // Anchoring at the other Greater binds it as greater_0, so its inputs land
    // in the wrong external slots and the shared consumers disagree.
    let m = match_template(
        &s.graph,
        s.greater_1,
        p.template(),
        DynamicMode::Shared,
        &OpRegistry::default(),
    );
    assert!(m.is_err());
}

proptest! {
    #[test]
    fn guard_accepts_only_values_within_tolerance(
        values in prop::collection::vec(-1.0e-5f32..1.0e-5, 1..6)
    ) {
        let zero = values.iter().all(|v| v.abs() <= 1.0e-6);
        let mut s = scenario(TensorValue::Float(values), TensorValue::Float(vec![0.0]));
        let result = fuse(&mut s.graph, &plugin(), s.greater_0, "", &OpRegistry::default());
        prop_assert_eq!(result.is_ok(), zero);
    }
}
