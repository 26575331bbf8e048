// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Output edge groups and port-remap arithmetic.
//!
//! Every host edge leaving one `(node, port)` pair lands in a single
//! [`OutputEdgeGroup`]. The matcher marks edges as *explained* as it resolves
//! the template's declared consumers; whatever is left unexplained is an
//! undeclared consumer that may block the match.
use crate::record::EdgeRecord;
use crate::template::DynamicWindow;

/// Logical template slot a physical host port maps onto.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PortSlot {
    /// A fixed, 1:1 slot.
    Fixed(usize),
    /// The variadic slot `slot`; `offset` is the port's distance from the
    /// window start (`0` for the first collapsed port).
    Dynamic {
        /// Logical slot (the window's start port).
        slot: usize,
        /// Position inside the window.
        offset: usize,
    },
}

impl PortSlot {
    /// The logical slot index regardless of kind.
    #[must_use]
    pub const fn slot(self) -> usize {
        match self {
            Self::Fixed(slot) | Self::Dynamic { slot, .. } => slot,
        }
    }
}

/// Maps physical `port` of a host node whose highest data port is `max_port`
/// onto a logical template slot.
///
/// Without a window every port maps to itself. With a window, ports in
/// `start_port ..= max_port + end_port` collapse onto `start_port`; ports
/// above shift left by `collapsed - 1`.
///
/// An empty window still occupies its logical slot, so ports past it shift
/// right by one instead of keeping their physical index. A node declared as
/// `[x, *var, y]` with only two ports therefore maps port 1 onto `y`.
#[must_use]
pub fn remap_port(port: usize, max_port: usize, window: Option<DynamicWindow>) -> PortSlot {
    let Some(w) = window else {
        return PortSlot::Fixed(port);
    };
    if port < w.start_port {
        return PortSlot::Fixed(port);
    }
    let start = w.start_port as i64;
    let last = max_port as i64 + i64::from(w.end_port);
    let p = port as i64;
    if p <= last {
        return PortSlot::Dynamic {
            slot: w.start_port,
            offset: port - w.start_port,
        };
    }
    let collapsed = (last - start + 1).max(0);
    let logical = p - collapsed + 1;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // logical > start >= 0
    PortSlot::Fixed(logical as usize)
}

/// All data edges sharing one source `(node, port)`, with per-edge
/// bookkeeping of which ones the template accounts for.
#[derive(Clone, Debug)]
pub struct OutputEdgeGroup {
    port: i32,
    edges: Vec<EdgeRecord>,
    explained: Vec<bool>,
}

impl OutputEdgeGroup {
    /// Builds a group for `port`; every edge starts unexplained.
    #[must_use]
    pub fn new(port: i32, edges: Vec<EdgeRecord>) -> Self {
        let explained = vec![false; edges.len()];
        Self {
            port,
            edges,
            explained,
        }
    }

    /// Source port shared by every edge in the group.
    #[must_use]
    pub fn port(&self) -> i32 {
        self.port
    }

    /// The edges, in host insertion order.
    #[must_use]
    pub fn edges(&self) -> &[EdgeRecord] {
        &self.edges
    }

    /// Number of edges.
    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Returns `true` for a group with no edges.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Number of edges not yet explained.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.explained.iter().filter(|e| !**e).count()
    }

    /// Marks edge `i` explained. Explaining twice is a no-op, so an edge
    /// accounted for by two declared consumers is still counted once.
    pub fn explain(&mut self, i: usize) {
        if let Some(flag) = self.explained.get_mut(i) {
            *flag = true;
        }
    }

    /// Marks every edge explained (the group is a boundary output).
    pub fn explain_all(&mut self) {
        self.explained.fill(true);
    }
}
