// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(dead_code)]

use graft_core::{AttrValue, GraphStore, NodeDef, NodeId, TensorValue};

fn add(g: &mut GraphStore, def: NodeDef) -> NodeId {
    g.add_node(def).expect("add node")
}

fn link(g: &mut GraphStore, src: NodeId, dst: NodeId, dst_port: i32) {
    g.add_edge(src, 0, dst, dst_port).expect("add edge");
}

/// Appends one boolean-logic chain whose node names carry `tag`; the guarded
/// constants hold `a_value` and zero. Returns the first `Greater` and the
/// chain's external consumer.
pub fn add_logic_chain(g: &mut GraphStore, tag: &str, a_value: f32) -> (NodeId, NodeId) {
    let n = |name: &str| format!("{name}_{tag}");
    let constant = |name: String, v: f32| {
        let mut def = NodeDef::new(name, "Const");
        def.set_attr("value", AttrValue::Tensor(TensorValue::Float(vec![v])));
        def
    };
    let a = add(g, constant(n("a"), a_value));
    let b = add(g, NodeDef::new(n("b"), "Placeholder"));
    let c = add(g, constant(n("c"), 0.0));
    let d = add(g, NodeDef::new(n("d"), "Placeholder"));
    let e = add(g, NodeDef::new(n("e"), "Placeholder"));
    let g0 = add(g, NodeDef::new(n("greater_a"), "Greater"));
    let g1 = add(g, NodeDef::new(n("greater_c"), "Greater"));
    let or = add(g, NodeDef::new(n("or"), "LogicalOr"));
    let and = add(g, NodeDef::new(n("and"), "LogicalAnd"));
    let not = add(g, NodeDef::new(n("not"), "LogicalNot"));
    let xor = add(g, NodeDef::new(n("xor"), "LogicalAnd"));
    let cast = add(g, NodeDef::new(n("cast"), "Cast"));
    let sum = add(g, NodeDef::new(n("sum"), "Sum"));
    let neg = add(g, NodeDef::new(n("neg"), "Neg"));
    let x = add(g, NodeDef::new(n("x"), "Identity"));

    link(g, a, g0, 0);
    link(g, b, g0, 1);
    link(g, c, g1, 0);
    link(g, d, g1, 1);
    for (src, port) in [(g0, 0), (g1, 1)] {
        link(g, src, or, port);
        link(g, src, and, port);
    }
    link(g, and, not, 0);
    link(g, or, xor, 0);
    link(g, not, xor, 1);
    link(g, xor, cast, 0);
    link(g, cast, sum, 0);
    link(g, e, sum, 1);
    link(g, sum, neg, 0);
    link(g, neg, x, 0);
    (g0, x)
}
