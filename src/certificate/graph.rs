//! Shared certificate graph base (C7/C8's common shape)
//!
//! Grounded on `strong-timed-bisim/certificate/certificate_graph.hh`'s
//! `graph_t<node, edge>`: sequential node ids assigned at first insertion,
//! `find_node` via linear location-pair-equality scan, duplicate insertion
//! dispatched to a caller-supplied merge hook. Per the design notes'
//! back-pointer redesign flag, edges store indices into the node vector
//! instead of node pointers.

#![forbid(unsafe_code)]

use crate::certificate::node::CertNode;

/// An edge of a certificate graph: indices into the owning graph's node
/// vector, plus a label describing the transition or delay.
#[derive(Clone, Debug)]
pub struct CertEdge {
    /// index of the source node
    pub src: usize,
    /// index of the target node
    pub tgt: usize,
    /// the edge's kind-specific label
    pub label: EdgeLabel,
}

/// What an edge represents.
#[derive(Clone, Debug, PartialEq)]
pub enum EdgeLabel {
    /// an action transition, carrying one event label per side
    Action {
        /// left side's transition label
        left: String,
        /// right side's transition label
        right: String,
    },
    /// a delay transition, carrying the elapsed amount rendered as a string
    /// (exact rational, typically an integer or half-integer)
    Delay {
        /// the delay amount, already formatted
        amount: String,
    },
}

/// Owns the node and edge vectors of one certificate graph (a contradiction
/// DAG or a witness graph). Node identity is location-pair equality; `add_node`
/// assigns the next sequential id on first insertion and otherwise reports
/// the existing node's index so the caller can merge.
#[derive(Clone, Debug, Default)]
pub struct CertGraph {
    nodes: Vec<CertNode>,
    edges: Vec<CertEdge>,
}

/// Outcome of [`CertGraph::add_node`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddNodeOutcome {
    /// the node was new; index of its slot
    Inserted(usize),
    /// an equal node already existed; index of the existing slot
    AlreadyPresent(usize),
}

impl CertGraph {
    /// An empty graph.
    pub fn new() -> CertGraph {
        CertGraph { nodes: Vec::new(), edges: Vec::new() }
    }

    /// All nodes, in insertion (id) order.
    pub fn nodes(&self) -> &[CertNode] {
        &self.nodes
    }

    /// All edges, in insertion order.
    pub fn edges(&self) -> &[CertEdge] {
        &self.edges
    }

    /// `find_node`: linear scan for a node with the same location pair.
    pub fn find_node(&self, candidate: &CertNode) -> Option<usize> {
        self.nodes.iter().position(|n| n.location_eq(candidate))
    }

    /// `add_node`: insert `node` if no equal node exists, assigning the next
    /// sequential id; otherwise report the existing slot without touching
    /// the graph.
    pub fn add_node(&mut self, mut node: CertNode) -> AddNodeOutcome {
        if let Some(idx) = self.find_node(&node) {
            return AddNodeOutcome::AlreadyPresent(idx);
        }
        let id = self.nodes.len();
        node.set_id(id);
        self.nodes.push(node);
        AddNodeOutcome::Inserted(id)
    }

    /// Insert `node` unconditionally, assigning the next sequential id
    /// without checking for an existing equal node. Used by builders (such
    /// as the contradiction-DAG builder) that need a finer node-identity
    /// notion than plain location-pair equality for their own cycle
    /// detection, while still sharing this graph's id/edge bookkeeping.
    pub fn insert_unconditional(&mut self, mut node: CertNode) -> usize {
        let id = self.nodes.len();
        node.set_id(id);
        self.nodes.push(node);
        id
    }

    /// `add_edge`: append an edge between two existing node indices.
    pub fn add_edge(&mut self, src: usize, tgt: usize, label: EdgeLabel) {
        debug_assert!(src < self.nodes.len() && tgt < self.nodes.len());
        self.edges.push(CertEdge { src, tgt, label });
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Mutable access to a node by index, for payload updates (e.g. setting
    /// a contradiction node's finality once it is classified as a leaf).
    pub fn node_mut(&mut self, idx: usize) -> &mut CertNode {
        &mut self.nodes[idx]
    }

    /// Shared access to a node by index.
    pub fn node(&self, idx: usize) -> &CertNode {
        &self.nodes[idx]
    }

    /// Mutable access to every node, for a cleanup pass that updates payload
    /// state in place (e.g. re-compressing a witness node's zone container).
    pub fn nodes_mut_for_cleanup(&mut self) -> &mut [CertNode] {
        &mut self.nodes
    }

    /// `edge_cleanup`: drop edges that exactly duplicate the `(src, tgt,
    /// label)` of an earlier edge. Grounded on
    /// `witness_graph.hh::edge_cleanup`'s subsumption pass, specialized to
    /// this crate's plain-label edges (no separate per-edge condition to
    /// compare for containment).
    pub fn dedup_edges(&mut self) {
        let mut seen: Vec<(usize, usize, EdgeLabel)> = Vec::new();
        self.edges.retain(|e| {
            let key = (e.src, e.tgt, e.label.clone());
            if seen.contains(&key) {
                false
            } else {
                seen.push(key);
                true
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificate::node::{LocationPair, LocationState, NodePayload};
    use crate::zone::ZoneContainer;

    fn node(name: &str) -> CertNode {
        let pair = LocationPair {
            first: LocationState { vloc: vec![name.to_string()], intval: Vec::new() },
            second: LocationState { vloc: vec!["m0".to_string()], intval: Vec::new() },
        };
        CertNode::new(pair, false, NodePayload::Witness { regions: ZoneContainer::new() })
    }

    #[test]
    fn ids_assigned_in_insertion_order() {
        let mut g = CertGraph::new();
        assert_eq!(g.add_node(node("l0")), AddNodeOutcome::Inserted(0));
        assert_eq!(g.add_node(node("l1")), AddNodeOutcome::Inserted(1));
        assert_eq!(g.add_node(node("l0")), AddNodeOutcome::AlreadyPresent(0));
        assert_eq!(g.node_count(), 2);
    }

    #[test]
    fn edges_reference_node_indices() {
        let mut g = CertGraph::new();
        let a = match g.add_node(node("l0")) {
            AddNodeOutcome::Inserted(i) => i,
            _ => unreachable!(),
        };
        let b = match g.add_node(node("l1")) {
            AddNodeOutcome::Inserted(i) => i,
            _ => unreachable!(),
        };
        g.add_edge(a, b, EdgeLabel::Delay { amount: "1.0".to_string() });
        assert_eq!(g.edges().len(), 1);
        assert_eq!(g.edges()[0].src, a);
        assert_eq!(g.edges()[0].tgt, b);
    }
}
