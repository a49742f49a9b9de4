//! Shared certificate node (base of C7/C8's node types)
//!
//! Grounded on `strong-timed-bisim/certificate/certificate_node.hh` / `.cc`:
//! a node carries a pair of TA locations, an assigned integer id and an
//! initial-node flag; equality and ordering compare the location pair only
//! (id and initial are excluded, matching the source's `operator<`). Per the
//! class-hierarchy redesign flag, the contradiction- and witness-specific
//! extensions are a payload enum rather than subclasses.

#![forbid(unsafe_code)]

use crate::clock::Valuation;
use crate::dbm::Dbm;
use crate::zone::ZoneContainer;
use std::cmp::Ordering;

/// One side of a location pair: a discrete location plus its
/// integer-variable valuation.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct LocationState {
    /// location vector, one name per process
    pub vloc: Vec<String>,
    /// integer-variable valuation
    pub intval: Vec<i64>,
}

/// The pair of locations a certificate node represents.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct LocationPair {
    /// left side
    pub first: LocationState,
    /// right side
    pub second: LocationState,
}

/// Per-kind data a certificate node carries beyond the shared location
/// pair, id and initial flag.
#[derive(Clone, Debug)]
pub enum NodePayload {
    /// A contradiction-DAG node: two concrete clock valuations, two
    /// invariant constraint DBMs (for the initial locations), whether an
    /// urgent clock exists, and the finality record once this node is
    /// classified as a leaf.
    Contradiction {
        /// left valuation
        left_valuation: Valuation,
        /// right valuation
        right_valuation: Valuation,
        /// left-side invariant, carried from the initial location
        left_invariant: Dbm,
        /// right-side invariant, carried from the initial location
        right_invariant: Dbm,
        /// whether an urgent clock slot exists in these valuations
        has_urgent_clock: bool,
        /// set once this node is classified as a leaf
        finality: Option<Finality>,
    },
    /// A witness-graph node: the compressed union of virtual constraints
    /// under which this pair is known to be bisimilar.
    Witness {
        /// regions under which bisimilarity holds
        regions: ZoneContainer,
    },
}

/// Which side disables, and under what symbol/delay, at a contradiction
/// leaf.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FinalSide {
    /// the first (left) side carries the witnessing difference
    First,
    /// the second (right) side carries the witnessing difference
    Second,
}

/// A leaf's finality record: which side disables, and the observable
/// witness (an event-set mismatch rendered as a symbol, or a delay amount
/// rendered to one decimal).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Finality {
    /// which side has the disabling transition / larger delay
    pub side: FinalSide,
    /// rendered witness: either an event name or a decimal delay string
    pub symbol: String,
}

/// A node of a certificate graph (contradiction DAG or witness graph).
#[derive(Clone, Debug)]
pub struct CertNode {
    location_pair: LocationPair,
    id: usize,
    initial: bool,
    /// kind-specific payload
    pub payload: NodePayload,
}

impl CertNode {
    /// Build a new node. `id` is a placeholder until inserted into a graph
    /// (the graph assigns the real sequential id on first insertion).
    pub fn new(location_pair: LocationPair, initial: bool, payload: NodePayload) -> CertNode {
        CertNode { location_pair, id: 0, initial, payload }
    }

    /// The location pair this node represents.
    pub fn location_pair(&self) -> &LocationPair {
        &self.location_pair
    }

    /// The node's assigned integer id.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Assign a new id (called once, by the owning graph, at insertion).
    pub fn set_id(&mut self, id: usize) {
        self.id = id;
    }

    /// Whether this is the graph's initial node.
    pub fn initial(&self) -> bool {
        self.initial
    }

    /// Ordering on nodes, by location pair only (id and initial excluded),
    /// matching `certificate_node.cc::operator<`.
    pub fn location_cmp(&self, other: &CertNode) -> Ordering {
        self.location_pair.cmp(&other.location_pair)
    }

    /// Equality by location pair only.
    pub fn location_eq(&self, other: &CertNode) -> bool {
        self.location_pair == other.location_pair
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(name: &str) -> LocationState {
        LocationState { vloc: vec![name.to_string()], intval: Vec::new() }
    }

    #[test]
    fn equality_ignores_id_and_initial() {
        let pair = LocationPair { first: loc("l0"), second: loc("m0") };
        let mut a = CertNode::new(pair.clone(), true, NodePayload::Witness { regions: ZoneContainer::new() });
        a.set_id(5);
        let b = CertNode::new(pair, false, NodePayload::Witness { regions: ZoneContainer::new() });
        assert!(a.location_eq(&b));
    }

    #[test]
    fn different_locations_are_not_equal() {
        let a = CertNode::new(
            LocationPair { first: loc("l0"), second: loc("m0") },
            false,
            NodePayload::Witness { regions: ZoneContainer::new() },
        );
        let b = CertNode::new(
            LocationPair { first: loc("l1"), second: loc("m0") },
            false,
            NodePayload::Witness { regions: ZoneContainer::new() },
        );
        assert!(!a.location_eq(&b));
    }
}
