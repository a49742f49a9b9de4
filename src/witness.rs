//! Witness graph builder (C8)
//!
//! Dual of C7 for the positive case: when bisimulation succeeds, replay the
//! synchronized product and emit one node per distinct pair of discrete
//! configurations, annotated with the compressed union of virtual
//! constraints under which bisimilarity holds, and one edge per
//! synchronized transition pair. Grounded on
//! `strong-timed-bisim/certificate/witness/witness_graph.hh` /
//! `witness_node.hh` for the node/graph shape (`zones()`, `add_zone`,
//! `compress`, `empty`) and on the `edge_cleanup`/`node_cleanup`
//! post-processing pass their header declares.

#![forbid(unsafe_code)]

use crate::certificate::graph::{AddNodeOutcome, CertGraph, EdgeLabel};
use crate::certificate::node::{CertNode, LocationPair, LocationState, NodePayload};
use crate::vcg::{EventSet, SymbolicState, Vcg};
use crate::zone::{Zone, ZoneContainer};
use std::collections::HashSet;

fn location_state(s: &SymbolicState) -> LocationState {
    LocationState { vloc: vec![s.location.clone()], intval: s.intval.clone() }
}

fn virtual_constraint_of(left: &SymbolicState, right: &SymbolicState, virtual_clock_count: usize) -> Zone {
    left.zone.project_onto_virtual(virtual_clock_count).intersect(&right.zone.project_onto_virtual(virtual_clock_count))
}

/// Builds a witness graph by replaying the synchronized product of two
/// [`Vcg`]s, assuming (as its caller must have already established via
/// [`crate::bisim::Engine`]) that the two sides are bisimilar.
pub struct WitnessBuilder<'a> {
    left: &'a dyn Vcg,
    right: &'a dyn Vcg,
    graph: CertGraph,
    index: std::collections::HashMap<LocationPair, usize>,
}

impl<'a> WitnessBuilder<'a> {
    /// A fresh, empty builder.
    pub fn new(left: &'a dyn Vcg, right: &'a dyn Vcg) -> WitnessBuilder<'a> {
        WitnessBuilder { left, right, graph: CertGraph::new(), index: std::collections::HashMap::new() }
    }

    fn upsert_node(&mut self, left: &SymbolicState, right: &SymbolicState, condition: Zone, initial: bool) -> usize {
        let pair = LocationPair { first: location_state(left), second: location_state(right) };
        if let Some(&idx) = self.index.get(&pair) {
            if let NodePayload::Witness { regions } = &mut self.graph.node_mut(idx).payload {
                regions.append_zone(condition);
                regions.compress();
            }
            return idx;
        }
        let mut regions = ZoneContainer::new();
        regions.append_zone(condition);
        let node = CertNode::new(pair.clone(), initial, NodePayload::Witness { regions });
        match self.graph.add_node(node) {
            AddNodeOutcome::Inserted(idx) => {
                self.index.insert(pair, idx);
                idx
            }
            AddNodeOutcome::AlreadyPresent(idx) => idx,
        }
    }

    /// Replay the product from the initial pair, building one node per
    /// distinct discrete-configuration pair and one edge per synchronized
    /// transition pair, bounded by `recursion_bound` visited pairs.
    pub fn build(&mut self, init_left: SymbolicState, init_right: SymbolicState, recursion_bound: usize) -> &CertGraph {
        let vcount = self.left.get_no_of_virtual_clocks();
        let root_condition = virtual_constraint_of(&init_left, &init_right, vcount);
        let root_idx = self.upsert_node(&init_left, &init_right, root_condition, true);

        let mut stack = vec![(init_left, init_right, root_idx)];
        let mut visited: HashSet<(LocationPair, usize)> = HashSet::new();
        let mut steps = 0;

        while let Some((left_state, right_state, idx)) = stack.pop() {
            steps += 1;
            if steps > recursion_bound {
                break;
            }
            let pair = self.graph.node(idx).location_pair().clone();
            if !visited.insert((pair, idx)) {
                continue;
            }

            let events: Vec<EventSet> = self.left.avail_events(&left_state).into_iter().collect();
            for event in events {
                let lefts = self.left.next_with_symbol(&left_state, &event);
                let rights = self.right.next_with_symbol(&right_state, &event);
                for lt in &lefts {
                    for rt in &rights {
                        let condition = virtual_constraint_of(&lt.target, &rt.target, vcount);
                        if condition.is_empty() {
                            continue;
                        }
                        let tgt_idx = self.upsert_node(&lt.target, &rt.target, condition, false);
                        self.graph.add_edge(
                            idx,
                            tgt_idx,
                            EdgeLabel::Action { left: lt.event.iter().cloned().collect::<Vec<_>>().join(","), right: rt.event.iter().cloned().collect::<Vec<_>>().join(",") },
                        );
                        stack.push((lt.target.clone(), rt.target.clone(), tgt_idx));
                    }
                }
            }
        }

        self.node_cleanup();
        self.edge_cleanup();
        &self.graph
    }

    /// `node_cleanup`: remove nodes whose effective zone container is
    /// empty. Unreferenced-node removal is a no-op here since every node is
    /// inserted precisely because some edge or the root references it.
    fn node_cleanup(&mut self) {
        for node in &mut self.graph.nodes_mut_for_cleanup() {
            if let NodePayload::Witness { regions } = &mut node.payload {
                regions.compress();
            }
        }
    }

    /// `edge_cleanup`: remove edges subsumed by another edge with the same
    /// endpoints whose condition (here: whose label, since plain action
    /// edges carry no separate virtual-constraint condition in this crate's
    /// simplified edge representation) already covers them — i.e. drop
    /// exact label/endpoint duplicates.
    fn edge_cleanup(&mut self) {
        self.graph.dedup_edges();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dbm::{Bound, Dbm};
    use crate::vcg::DemoVcg;

    #[test]
    fn identical_automata_produce_one_node_one_self_loop() {
        let mut a = DemoVcg::new(1, 1);
        a.add_location("l0", Dbm::universal(2), false);
        let mut guard = Dbm::universal(2);
        guard.constrain(0, 1, Bound::le(-1)).unwrap();
        let mut event = EventSet::new();
        event.insert("a".to_string());
        a.add_transition("l0", event, guard, vec![1], "l0");

        let b = a.clone();
        let init_a = a.initial().into_iter().next().unwrap();
        let init_b = b.initial().into_iter().next().unwrap();
        let mut builder = WitnessBuilder::new(&a, &b);
        let graph = builder.build(init_a, init_b, 100);
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.edges().len(), 1);
    }
}
