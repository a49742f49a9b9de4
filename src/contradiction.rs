//! Contradiction DAG builder (C7)
//!
//! Consumes the populated non-bisim cache and synthesizes a finite
//! certificate DAG rooted at the initial synchronized pair, or reports that
//! no finite certificate exists (a cycle was detected). Grounded directly on
//! `strong-timed-bisim/certificate/contradiction/cont_dag.cc` (main loop,
//! `add_non_bisim_action_transition`'s row/column quantifier selection,
//! `add_nodes_and_edges_of`'s sub-DAG merge) and `cont_node.cc` (`is_leaf`,
//! `synchronize`, `max_delay`, `generate_zones`). Node/edge storage reuses
//! [`crate::certificate::graph::CertGraph`]; per the design notes this
//! crate's DAG builder keeps a `HashMap` index alongside the shared
//! `Vec`-backed graph for O(1) location-pair lookup, a Rust-idiom
//! strengthening of the source's linear `find_node` scan.

#![forbid(unsafe_code)]

use crate::cache::{DiscreteKey, NonBisimCache};
use crate::certificate::graph::{AddNodeOutcome, CertGraph, EdgeLabel};
use crate::certificate::node::{CertNode, FinalSide, Finality, LocationPair, LocationState, NodePayload};
use crate::clock::{ClockValue, Valuation};
use crate::dbm::{Bound, Dbm, DbmError};
use crate::maxdelay::max_delay;
use crate::vcg::{EventSet, SymbolicState, Vcg};
use crate::zone::Zone;
use std::collections::HashMap;

/// Errors from certificate construction itself (as opposed to "no
/// certificate" findings, which are reported via the `Ok(false)` result per
/// spec section 4.7's failure semantics).
#[derive(Debug, thiserror::Error)]
pub enum ContradictionError {
    /// The recursion depth bound for sub-DAG construction was exceeded.
    #[error("contradiction builder exceeded its recursion bound ({0})")]
    RecursionBound(usize),
    /// A DBM operation failed while building a contradiction-node zone.
    #[error(transparent)]
    Dbm(#[from] DbmError),
}

/// The resolution `generate_zones` builds its point-DBMs and scaled
/// invariants at, so that the half-integer delay candidates `max_delay`
/// checks (§4.8) have an exact integer representation.
const DELAY_RESOLUTION: i64 = 2;

fn discrete_key(loc: &LocationState) -> DiscreteKey {
    DiscreteKey { vloc: loc.vloc.clone(), intval: loc.intval.clone() }
}

/// Identity key used for contradiction-DAG cycle detection: location pair
/// *and* both valuations. Grounded on `contra::node_t::operator==`, which
/// overrides the shared certificate node's location-pair-only equality to
/// additionally compare both clock valuations — required for a linear
/// delay/synchronization chain to make progress at all, since every step
/// along it keeps the same location pair. The witness graph (C8) keeps the
/// plain location-pair identity described generally in the data model.
fn val_key(v: &Valuation) -> Vec<(i64, i64)> {
    v.values().iter().map(|r| (*r.numer(), *r.denom())).collect()
}

/// Layout of one side's contradiction-node valuation: `[ref, own originals,
/// mirrored copies of the other side's originals]`, optionally followed by
/// one urgent-clock slot. This is a documented simplification of the
/// source's doubled `2*o1 + o2 + 1` bookkeeping (see the design ledger).
struct Layout {
    own: usize,
    other: usize,
    urgent: bool,
}

impl Layout {
    fn dim(&self) -> usize {
        1 + self.own + self.other + if self.urgent { 1 } else { 0 }
    }

    fn own_range(&self) -> std::ops::Range<usize> {
        1..(1 + self.own)
    }

    fn other_range(&self) -> std::ops::Range<usize> {
        (1 + self.own)..(1 + self.own + self.other)
    }

    fn urgent_idx(&self) -> Option<usize> {
        if self.urgent {
            Some(1 + self.own + self.other)
        } else {
            None
        }
    }
}

/// Owns one contradiction-DAG construction run over a pair of [`Vcg`]s.
pub struct ContradictionBuilder<'a> {
    left: &'a dyn Vcg,
    right: &'a dyn Vcg,
    left_layout: Layout,
    right_layout: Layout,
    urgent_clk_exists: bool,
    max_delay_bound: u64,
    graph: CertGraph,
    index: HashMap<(LocationPair, Vec<(i64, i64)>, Vec<(i64, i64)>), usize>,
    root: Option<usize>,
}

impl<'a> ContradictionBuilder<'a> {
    /// Build a fresh, empty builder for a pair of VCGs and a configured
    /// maximum exploration delay (the `-n`/delay tuning bound).
    pub fn new(left: &'a dyn Vcg, right: &'a dyn Vcg, max_delay_bound: u64) -> ContradictionBuilder<'a> {
        let o1 = left.get_no_of_original_clocks();
        let o2 = right.get_no_of_original_clocks();
        let urgent = o1 + o2 < left.get_no_of_virtual_clocks();
        ContradictionBuilder {
            left,
            right,
            left_layout: Layout { own: o1, other: o2, urgent },
            right_layout: Layout { own: o2, other: o1, urgent },
            urgent_clk_exists: urgent,
            max_delay_bound,
            graph: CertGraph::new(),
            index: HashMap::new(),
            root: None,
        }
    }

    /// The finished graph, once construction succeeds.
    pub fn into_graph(self) -> CertGraph {
        self.graph
    }

    fn node_identity(node: &CertNode) -> (LocationPair, Vec<(i64, i64)>, Vec<(i64, i64)>) {
        match &node.payload {
            NodePayload::Contradiction { left_valuation, right_valuation, .. } => {
                (node.location_pair().clone(), val_key(left_valuation), val_key(right_valuation))
            }
            NodePayload::Witness { .. } => unreachable!("contradiction builder only holds Contradiction payloads"),
        }
    }

    fn add_node(&mut self, node: CertNode) -> AddNodeOutcome {
        let key = Self::node_identity(&node);
        if let Some(&idx) = self.index.get(&key) {
            return AddNodeOutcome::AlreadyPresent(idx);
        }
        let idx = self.graph.insert_unconditional(node);
        self.index.insert(key, idx);
        AddNodeOutcome::Inserted(idx)
    }

    /// Whether a node with this location pair AND these valuations already
    /// exists elsewhere in the graph (the contradiction-DAG cycle test).
    fn find_existing(&self, pair: &LocationPair, left: &Valuation, right: &Valuation) -> Option<usize> {
        self.index.get(&(pair.clone(), val_key(left), val_key(right))).copied()
    }

    /// Top-level entry point: `create_cont_from_non_bisim_cache`.
    ///
    /// Returns `Ok(true)` with a populated graph (see [`Self::into_graph`])
    /// when a certificate was built, `Ok(false)` when no finite certificate
    /// exists (a cycle was detected, or no branch of actions refutes).
    pub fn build(
        &mut self,
        cache: &NonBisimCache,
        init_left: SymbolicState,
        init_right: SymbolicState,
        invariant_1: Dbm,
        invariant_2: Dbm,
    ) -> Result<bool, ContradictionError> {
        let left_valuation = Valuation::zero(self.left_layout.dim());
        let right_valuation = Valuation::zero(self.right_layout.dim());
        let pair = LocationPair {
            first: LocationState { vloc: vec![init_left.location.clone()], intval: init_left.intval.clone() },
            second: LocationState { vloc: vec![init_right.location.clone()], intval: init_right.intval.clone() },
        };
        let node = CertNode::new(
            pair,
            true,
            NodePayload::Contradiction {
                left_valuation,
                right_valuation,
                left_invariant: invariant_1,
                right_invariant: invariant_2,
                has_urgent_clock: self.urgent_clk_exists,
                finality: None,
            },
        );
        let root_idx = match self.add_node(node) {
            AddNodeOutcome::Inserted(idx) => idx,
            AddNodeOutcome::AlreadyPresent(idx) => idx,
        };
        self.root = Some(root_idx);
        self.run_chain(cache, root_idx, init_left, init_right, 0)
    }

    fn payload_valuations(&self, idx: usize) -> (Valuation, Valuation) {
        match &self.graph.node(idx).payload {
            NodePayload::Contradiction { left_valuation, right_valuation, .. } => {
                (left_valuation.clone(), right_valuation.clone())
            }
            NodePayload::Witness { .. } => unreachable!("contradiction builder only holds Contradiction payloads"),
        }
    }

    fn is_synchronized(&self, left: &Valuation, right: &Valuation) -> bool {
        for i in self.left_layout.own_range() {
            let mirror = self.right_layout.other_range().nth(i - 1).unwrap();
            if left.get(i) != right.get(mirror) {
                return false;
            }
        }
        for j in self.right_layout.own_range() {
            let mirror = self.left_layout.other_range().nth(j - 1).unwrap();
            if right.get(j) != left.get(mirror) {
                return false;
            }
        }
        if let (Some(lu), Some(ru)) = (self.left_layout.urgent_idx(), self.right_layout.urgent_idx()) {
            if left.get(lu) != right.get(ru) {
                return false;
            }
        }
        true
    }

    /// `synchronize()`: reset-only. For every mismatched mirrored pair, if
    /// either side already reads zero, set both twins to zero.
    fn synchronize(&self, left: &mut Valuation, right: &mut Valuation) {
        for i in self.left_layout.own_range() {
            let mirror = self.right_layout.other_range().nth(i - 1).unwrap();
            if left.get(i) != right.get(mirror) {
                let zero = ClockValue::from_integer(0);
                if left.get(i) == zero || right.get(mirror) == zero {
                    left.reset(i);
                    right.reset(mirror);
                }
            }
        }
        for j in self.right_layout.own_range() {
            let mirror = self.left_layout.other_range().nth(j - 1).unwrap();
            if right.get(j) != left.get(mirror) {
                let zero = ClockValue::from_integer(0);
                if right.get(j) == zero || left.get(mirror) == zero {
                    right.reset(j);
                    left.reset(mirror);
                }
            }
        }
        if let (Some(lu), Some(ru)) = (self.left_layout.urgent_idx(), self.right_layout.urgent_idx()) {
            if left.get(lu) != right.get(ru) {
                let zero = ClockValue::from_integer(0);
                if left.get(lu) == zero || right.get(ru) == zero {
                    left.reset(lu);
                    right.reset(ru);
                }
            }
        }
    }

    /// Builds each side's zone by reducing to the point given by this side's
    /// own leading clocks (reference clock plus own originals, matching
    /// `left_inv`'s/`right_inv`'s own dimension) and future-closing against
    /// that side's invariant. Both the point and the invariant are built at
    /// [`DELAY_RESOLUTION`] so the half-integer candidates `max_delay`
    /// checks stay exact; the invariant and valuation dimensions always
    /// agree by construction, so `delay`'s internal `intersect` never trips
    /// its dimension invariant.
    fn generate_zones(
        &self,
        left_valuation: &Valuation,
        right_valuation: &Valuation,
        left_inv: &Dbm,
        right_inv: &Dbm,
    ) -> Result<(Zone, Zone), ContradictionError> {
        let left_ints = own_clock_ints(left_valuation, left_inv.dim(), DELAY_RESOLUTION);
        let right_ints = own_clock_ints(right_valuation, right_inv.dim(), DELAY_RESOLUTION);
        let mut left_dbm = Dbm::reduce_to_valuation(left_inv.dim(), &left_ints);
        let mut right_dbm = Dbm::reduce_to_valuation(right_inv.dim(), &right_ints);
        let scaled_left_inv = scale_invariant(left_inv, DELAY_RESOLUTION)?;
        let scaled_right_inv = scale_invariant(right_inv, DELAY_RESOLUTION)?;
        left_dbm.delay(&scaled_left_inv)?;
        right_dbm.delay(&scaled_right_inv)?;
        Ok((Zone::new(left_dbm), Zone::new(right_dbm)))
    }

    fn is_leaf(
        &self,
        left_state: &SymbolicState,
        right_state: &SymbolicState,
        left_valuation: &Valuation,
        right_valuation: &Valuation,
        left_inv: &Dbm,
        right_inv: &Dbm,
    ) -> Result<Option<Finality>, ContradictionError> {
        if !self.is_synchronized(left_valuation, right_valuation) {
            return Ok(None);
        }

        let events_l = self.left.avail_events(left_state);
        let events_r = self.right.avail_events(right_state);
        if events_l != events_r {
            let mut only_left: Vec<&EventSet> = events_l.difference(&events_r).collect();
            let mut only_right: Vec<&EventSet> = events_r.difference(&events_l).collect();
            only_left.sort();
            only_right.sort();
            if let Some(e) = only_left.first() {
                return Ok(Some(Finality { side: FinalSide::First, symbol: render_event(e) }));
            }
            if let Some(e) = only_right.first() {
                return Ok(Some(Finality { side: FinalSide::Second, symbol: render_event(e) }));
            }
        }

        let (left_zone, right_zone) = self.generate_zones(left_valuation, right_valuation, left_inv, right_inv)?;
        // left_zone/right_zone are sized to left_inv/right_inv's own-clock
        // dimension, not the full layout; truncate the valuations to match
        // before comparing or delaying against them.
        let left_trunc = Valuation::from_values(left_valuation.values()[..left_zone.dim()].to_vec());
        let right_trunc = Valuation::from_values(right_valuation.values()[..right_zone.dim()].to_vec());
        let vcount = self.left.get_no_of_virtual_clocks();
        let left_vc = left_zone.project_onto_virtual(vcount.min(left_zone.dim().saturating_sub(1)));
        let right_vc = right_zone.project_onto_virtual(vcount.min(right_zone.dim().saturating_sub(1)));
        if left_vc == right_vc {
            return Ok(None);
        }

        let left_delay = max_delay(&left_zone, &left_trunc, self.max_delay_bound, 0, DELAY_RESOLUTION);
        let right_delay = max_delay(&right_zone, &right_trunc, self.max_delay_bound, 0, DELAY_RESOLUTION);
        let (side, delay) = if left_delay >= right_delay {
            (FinalSide::First, left_delay)
        } else {
            (FinalSide::Second, right_delay)
        };
        Ok(Some(Finality { side, symbol: render_decimal(delay) }))
    }

    fn run_chain(
        &mut self,
        cache: &NonBisimCache,
        mut cur_idx: usize,
        left_state: SymbolicState,
        right_state: SymbolicState,
        depth: usize,
    ) -> Result<bool, ContradictionError> {
        if depth > 10_000 {
            return Err(ContradictionError::RecursionBound(10_000));
        }

        loop {
            let (left_invariant, right_invariant) = match &self.graph.node(cur_idx).payload {
                NodePayload::Contradiction { left_invariant, right_invariant, .. } => {
                    (left_invariant.clone(), right_invariant.clone())
                }
                NodePayload::Witness { .. } => unreachable!(),
            };
            let (left_valuation, right_valuation) = self.payload_valuations(cur_idx);

            if let Some(finality) =
                self.is_leaf(&left_state, &right_state, &left_valuation, &right_valuation, &left_invariant, &right_invariant)?
            {
                if let NodePayload::Contradiction { finality: slot, .. } = &mut self.graph.node_mut(cur_idx).payload {
                    *slot = Some(finality);
                }
                return Ok(true);
            }

            if !self.is_synchronized(&left_valuation, &right_valuation) {
                let mut new_left = left_valuation.clone();
                let mut new_right = right_valuation.clone();
                self.synchronize(&mut new_left, &mut new_right);
                let pair = self.graph.node(cur_idx).location_pair().clone();
                if self.find_existing(&pair, &new_left, &new_right).is_some_and(|i| i != cur_idx) {
                    return Ok(false);
                }
                let candidate = CertNode::new(
                    pair,
                    false,
                    NodePayload::Contradiction {
                        left_valuation: new_left,
                        right_valuation: new_right,
                        left_invariant: left_invariant.clone(),
                        right_invariant: right_invariant.clone(),
                        has_urgent_clock: self.urgent_clk_exists,
                        finality: None,
                    },
                );
                let new_idx = match self.add_node(candidate) {
                    AddNodeOutcome::Inserted(idx) => idx,
                    AddNodeOutcome::AlreadyPresent(_) => return Ok(false),
                };
                self.graph.add_edge(cur_idx, new_idx, EdgeLabel::Delay { amount: "0".to_string() });
                cur_idx = new_idx;
                continue;
            }

            let left_key = discrete_key(&self.graph.node(cur_idx).location_pair().first);
            let right_key = discrete_key(&self.graph.node(cur_idx).location_pair().second);
            let region = cache.already_cached(&left_key, &right_key, &left_state.zone);
            let delay = if region.is_empty() {
                ClockValue::from_integer(0)
            } else {
                let left_trunc = Valuation::from_values(left_valuation.values()[..left_state.zone.dim()].to_vec());
                let mut best = ClockValue::from_integer(0);
                for member in region.iter() {
                    let d = max_delay(member, &left_trunc, self.max_delay_bound, 0, 1);
                    if d > best {
                        best = d;
                    }
                }
                best
            };

            if delay > ClockValue::from_integer(0) {
                let new_left = left_valuation.add_delay(delay);
                let new_right = right_valuation.add_delay(delay);
                let pair = self.graph.node(cur_idx).location_pair().clone();
                if self.find_existing(&pair, &new_left, &new_right).is_some_and(|i| i != cur_idx) {
                    return Ok(false);
                }
                let candidate = CertNode::new(
                    pair,
                    false,
                    NodePayload::Contradiction {
                        left_valuation: new_left,
                        right_valuation: new_right,
                        left_invariant: left_invariant.clone(),
                        right_invariant: right_invariant.clone(),
                        has_urgent_clock: self.urgent_clk_exists,
                        finality: None,
                    },
                );
                let new_idx = match self.add_node(candidate) {
                    AddNodeOutcome::Inserted(idx) => idx,
                    AddNodeOutcome::AlreadyPresent(_) => return Ok(false),
                };
                self.graph.add_edge(cur_idx, new_idx, EdgeLabel::Delay { amount: render_decimal(delay) });
                cur_idx = new_idx;
                continue;
            }

            return self.add_non_bisim_action_transition(cache, cur_idx, left_state, right_state, depth);
        }
    }

    fn add_non_bisim_action_transition(
        &mut self,
        cache: &NonBisimCache,
        src_idx: usize,
        left_state: SymbolicState,
        right_state: SymbolicState,
        depth: usize,
    ) -> Result<bool, ContradictionError> {
        let events_l = self.left.avail_events(&left_state);

        for event in events_l.iter() {
            let left_targets = self.left.next_with_symbol(&left_state, event);
            let right_targets = self.right.next_with_symbol(&right_state, event);
            if left_targets.is_empty() || right_targets.is_empty() {
                continue;
            }

            let mut results = vec![vec![false; right_targets.len()]; left_targets.len()];
            let mut sub_graphs: Vec<Vec<Option<CertGraph>>> =
                (0..left_targets.len()).map(|_| (0..right_targets.len()).map(|_| None).collect()).collect();

            for (i1, t1) in left_targets.iter().enumerate() {
                for (i2, t2) in right_targets.iter().enumerate() {
                    let mut sub = ContradictionBuilder::new(self.left, self.right, self.max_delay_bound);
                    let ok = sub.build(
                        cache,
                        t1.target.clone(),
                        t2.target.clone(),
                        t1.target.zone.dbm().clone(),
                        t2.target.zone.dbm().clone(),
                    )?;
                    results[i1][i2] = ok;
                    if ok {
                        sub_graphs[i1][i2] = Some(sub.into_graph());
                    }
                    let _ = depth;
                }
            }

            for (i1, row) in results.iter().enumerate() {
                if !row.is_empty() && row.iter().all(|&v| v) {
                    for (i2, t2) in right_targets.iter().enumerate() {
                        if let Some(sub_graph) = sub_graphs[i1][i2].take() {
                            self.merge_sub_graph(src_idx, sub_graph, &left_targets[i1].event, &t2.event);
                        }
                    }
                    return Ok(true);
                }
            }

            for i2 in 0..right_targets.len() {
                if results.iter().all(|row| row[i2]) && !results.is_empty() {
                    for (i1, t1) in left_targets.iter().enumerate() {
                        if let Some(sub_graph) = sub_graphs[i1][i2].take() {
                            self.merge_sub_graph(src_idx, sub_graph, &t1.event, &right_targets[i2].event);
                        }
                    }
                    return Ok(true);
                }
            }
        }

        Ok(false)
    }

    fn merge_sub_graph(&mut self, src_idx: usize, sub: CertGraph, left_event: &EventSet, right_event: &EventSet) {
        let mut remap: HashMap<usize, usize> = HashMap::new();
        for (old_idx, node) in sub.nodes().iter().enumerate() {
            match self.add_node(node.clone()) {
                AddNodeOutcome::Inserted(idx) | AddNodeOutcome::AlreadyPresent(idx) => {
                    remap.insert(old_idx, idx);
                }
            }
        }
        let sub_root = remap[&0];
        self.graph.add_edge(
            src_idx,
            sub_root,
            EdgeLabel::Action { left: render_event(left_event), right: render_event(right_event) },
        );
        for edge in sub.edges() {
            let s = remap[&edge.src];
            let t = remap[&edge.tgt];
            self.graph.add_edge(s, t, edge.label.clone());
        }
    }
}

/// Integer-scaled coordinates of `valuation`'s leading `dim` components (the
/// reference clock plus this side's own original clocks, per [`Layout`]'s
/// ordering), at `resolution`. Exact: every clock value's denominator is 1
/// or 2, and `resolution` is always a multiple of both.
fn own_clock_ints(valuation: &Valuation, dim: usize, resolution: i64) -> Vec<i64> {
    valuation.values()[..dim].iter().map(|v| v.numer() * resolution / v.denom()).collect()
}

/// Scales every finite bound of `inv` by `resolution`, preserving strictness
/// and dimension. `inv` is canonical on entry, so scaling a consistent DBM
/// by a positive constant keeps it consistent; `constrain`'s own emptiness
/// check is still propagated rather than discarded.
fn scale_invariant(inv: &Dbm, resolution: i64) -> Result<Dbm, DbmError> {
    let dim = inv.dim();
    if inv.is_empty() {
        return Ok(Dbm::empty(dim));
    }
    let mut out = Dbm::universal(dim);
    for i in 0..dim {
        for j in 0..dim {
            if i == j {
                continue;
            }
            if let Bound::Finite { value, strict } = inv.get(i, j) {
                out.constrain(i, j, Bound::Finite { value: value * resolution, strict })?;
            }
        }
    }
    Ok(out)
}

fn render_event(e: &EventSet) -> String {
    e.iter().cloned().collect::<Vec<_>>().join(",")
}

fn render_decimal(v: ClockValue) -> String {
    let whole = v.trunc().to_integer();
    let frac = v - ClockValue::from_integer(whole);
    if frac == ClockValue::new(1, 2) {
        format!("{whole}.5")
    } else {
        format!("{whole}.0")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bisim::Engine;
    use crate::dbm::Bound;
    use crate::vcg::DemoVcg;

    fn mismatched_guard_demo() -> (DemoVcg, DemoVcg) {
        let mut a = DemoVcg::new(1, 1);
        a.add_location("l0", Dbm::universal(2), false);
        a.add_location("l1", Dbm::universal(2), false);
        let mut guard_a = Dbm::universal(2);
        guard_a.constrain(0, 1, Bound::le(-1)).unwrap();
        let mut event = EventSet::new();
        event.insert("a".to_string());
        a.add_transition("l0", event.clone(), guard_a, vec![1], "l1");

        let mut b = DemoVcg::new(1, 1);
        b.add_location("l0", Dbm::universal(2), false);
        b.add_location("l1", Dbm::universal(2), false);
        let mut guard_b = Dbm::universal(2);
        guard_b.constrain(0, 1, Bound::le(-2)).unwrap();
        b.add_transition("l0", event, guard_b, vec![1], "l1");
        (a, b)
    }

    #[test]
    fn mismatched_guard_produces_a_certificate() {
        let (a, b) = mismatched_guard_demo();
        let mut engine = Engine::new(&a, &b, 64).unwrap();
        let answer = engine.run().unwrap();
        assert_eq!(answer, crate::bisim::Answer::NotBisimilar);
        let cache = engine.into_cache();

        let init_l = a.initial().into_iter().next().unwrap();
        let init_r = b.initial().into_iter().next().unwrap();
        let inv_l = a.invariant(&init_l.location);
        let inv_r = b.invariant(&init_r.location);
        let mut builder = ContradictionBuilder::new(&a, &b, 8);
        let ok = builder.build(&cache, init_l, init_r, inv_l, inv_r).unwrap();
        assert!(ok);
        let graph = builder.into_graph();
        assert!(graph.node_count() >= 1);
    }
}
