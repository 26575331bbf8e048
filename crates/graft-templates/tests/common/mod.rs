// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(dead_code)]

use graft_core::{AttrValue, GraphStore, NodeDef, NodeId, TensorValue};

/// Handles into the boolean-logic scenario graph.
pub struct Scenario {
    pub graph: GraphStore,
    pub a: NodeId,
    pub b: NodeId,
    pub c: NodeId,
    pub d: NodeId,
    pub e: NodeId,
    pub greater_0: NodeId,
    pub greater_1: NodeId,
    pub logic_or: NodeId,
    pub logic_and: NodeId,
    pub logic_not: NodeId,
    pub logic_xor: NodeId,
    pub cast: NodeId,
    pub sum: NodeId,
    pub neg: NodeId,
    pub x: NodeId,
}

fn add(g: &mut GraphStore, def: NodeDef) -> NodeId {
    g.add_node(def).expect("add node")
}

fn constant(name: &str, value: TensorValue) -> NodeDef {
    let mut def = NodeDef::new(name, "Const");
    def.set_attr("value", AttrValue::Tensor(value));
    def
}

fn link(g: &mut GraphStore, src: NodeId, dst: NodeId, dst_port: i32) {
    g.add_edge(src, 0, dst, dst_port).expect("add edge");
}

/// `Greater(a,b)`, `Greater(c,d)` through the boolean chain into `Sum(.., e)`,
/// `Neg`, and a single consumer `x`. `a` and `c` are constants with the given
/// payloads.
pub fn scenario(a_value: TensorValue, c_value: TensorValue) -> Scenario {
    let mut g = GraphStore::new();
    let a = add(&mut g, constant("a", a_value));
    let b = add(&mut g, NodeDef::new("b", "Placeholder"));
    let c = add(&mut g, constant("c", c_value));
    let d = add(&mut g, NodeDef::new("d", "Placeholder"));
    let e = add(&mut g, NodeDef::new("e", "Placeholder"));

    let mut g0 = NodeDef::new("greater_a", "Greater");
    g0.set_device("/device:CPU:0");
    let greater_0 = add(&mut g, g0);
    let greater_1 = add(&mut g, NodeDef::new("greater_c", "Greater"));
    let logic_or = add(&mut g, NodeDef::new("or", "LogicalOr"));
    let logic_and = add(&mut g, NodeDef::new("and", "LogicalAnd"));
    let logic_not = add(&mut g, NodeDef::new("not", "LogicalNot"));
    let logic_xor = add(&mut g, NodeDef::new("xor", "LogicalAnd"));
    let cast = add(&mut g, NodeDef::new("cast", "Cast"));
    let sum = add(&mut g, NodeDef::new("sum", "Sum"));
    let neg = add(&mut g, NodeDef::new("neg", "Neg"));
    let x = add(&mut g, NodeDef::new("x", "Identity"));

    link(&mut g, a, greater_0, 0);
    link(&mut g, b, greater_0, 1);
    link(&mut g, c, greater_1, 0);
    link(&mut g, d, greater_1, 1);
    for (src, port) in [(greater_0, 0), (greater_1, 1)] {
        link(&mut g, src, logic_or, port);
        link(&mut g, src, logic_and, port);
    }
    link(&mut g, logic_and, logic_not, 0);
    link(&mut g, logic_or, logic_xor, 0);
    link(&mut g, logic_not, logic_xor, 1);
    link(&mut g, logic_xor, cast, 0);
    link(&mut g, cast, sum, 0);
    link(&mut g, e, sum, 1);
    link(&mut g, sum, neg, 0);
    link(&mut g, neg, x, 0);

    Scenario {
        graph: g,
        a,
        b,
        c,
        d,
        e,
        greater_0,
        greater_1,
        logic_or,
        logic_and,
        logic_not,
        logic_xor,
        cast,
        sum,
        neg,
        x,
    }
}

/// Scenario whose guarded inputs are both float zeros.
pub fn zero_scenario() -> Scenario {
    scenario(
        TensorValue::Float(vec![0.0; 4]),
        TensorValue::Float(vec![0.0]),
    )
}
