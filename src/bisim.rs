//! Bisimulation core (C6)
//!
//! Recursive(-shaped, explicit-stack) exploration of the synchronized
//! product of two [`Vcg`]s, populating a [`NonBisimCache`]. Structured after
//! the teacher's `Prover`/`Verifier` pairing in `scheduler.rs` — one struct
//! owning the run's state, one entry-point method driving a work list — and
//! grounded behaviorally on spec section 4.6's sketch of the algorithm as
//! implemented by `strong-timed-bisim/vcg-timed-bisim.cc` (not present in
//! the retrieved source tree; the quantifier/selection pattern it describes
//! matches `cont_dag.cc::add_non_bisim_action_transition`, which this module
//! shares via [`crate::contradiction`]).

#![forbid(unsafe_code)]

use crate::cache::{DiscreteKey, NonBisimCache};
use crate::vcg::{check_compatible, EventSet, SymbolicState, Vcg, VcgError};
use crate::zone::{Zone, ZoneContainer};
use std::collections::HashMap;
use tracing::debug;

/// Errors from the exploration engine itself.
#[derive(Debug, thiserror::Error)]
pub enum BisimError {
    /// The two VCGs are not comparable.
    #[error(transparent)]
    Vcg(#[from] VcgError),
    /// The work stack exceeded its configured depth bound.
    #[error("exploration exceeded the configured recursion bound ({0})")]
    RecursionBound(usize),
}

/// Final verdict of one exploration run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Answer {
    /// Every reachable pair (modulo virtual projection) turned out bisimilar.
    Bisimilar,
    /// At least one reachable pair is refuted; `cache` holds the witnessing
    /// regions.
    NotBisimilar,
}

fn discrete_key(s: &SymbolicState) -> DiscreteKey {
    DiscreteKey { vloc: vec![s.location.clone()], intval: s.intval.clone() }
}

/// The zone reachable from `state` by letting time pass, closed against its
/// location's invariant. Used to detect divergence that a plain event-set
/// comparison misses: two states can offer the same events yet disagree on
/// how long they may idle before an invariant forces a transition.
fn delay_successor_zone(vcg: &dyn Vcg, state: &SymbolicState) -> Zone {
    let mut d = state.zone.dbm().clone();
    let inv = vcg.invariant(&state.location);
    let _ = d.delay(&inv);
    Zone::new(d)
}

/// A pair of symbolic states visited during exploration, one per side.
#[derive(Clone, Debug)]
pub struct Pair {
    /// left side's symbolic state
    pub left: SymbolicState,
    /// right side's symbolic state
    pub right: SymbolicState,
}

/// Owns the two VCGs and the growing non-bisim cache for one comparison
/// run.
pub struct Engine<'a> {
    left: &'a dyn Vcg,
    right: &'a dyn Vcg,
    cache: NonBisimCache,
    visited: HashMap<(DiscreteKey, DiscreteKey), ()>,
    visited_states: usize,
    recursion_bound: usize,
}

impl<'a> Engine<'a> {
    /// Build an engine over two VCGs, checking they are comparable.
    pub fn new(left: &'a dyn Vcg, right: &'a dyn Vcg, recursion_bound: usize) -> Result<Engine<'a>, BisimError> {
        check_compatible(left, right)?;
        Ok(Engine {
            left,
            right,
            cache: NonBisimCache::new(),
            visited: HashMap::new(),
            visited_states: 0,
            recursion_bound,
        })
    }

    /// Number of distinct pairs visited so far (for statistics).
    pub fn visited_states(&self) -> usize {
        self.visited_states
    }

    /// The populated non-bisim cache.
    pub fn cache(&self) -> &NonBisimCache {
        &self.cache
    }

    /// Consume the engine, returning its cache.
    pub fn into_cache(self) -> NonBisimCache {
        self.cache
    }

    /// `bisim(A, B)`: decide bisimilarity and populate the cache.
    pub fn run(&mut self) -> Result<Answer, BisimError> {
        let i_a = self.left.initial().into_iter().next().expect("VCG has no initial state");
        let i_b = self.right.initial().into_iter().next().expect("VCG has no initial state");
        let root = Pair { left: i_a, right: i_b };
        let refuted = self.explore(&root, 0)?;
        let answer = if refuted.is_empty() { Answer::Bisimilar } else { Answer::NotBisimilar };
        debug!(visited = self.visited_states, cached = self.cache.len(), ?answer, "exploration finished");
        Ok(answer)
    }

    /// Explore one pair, returning its refutation region (empty means
    /// bisimilar on that pair). Caches the region for interior pairs as a
    /// side effect, mirroring step 4 of spec section 4.6.
    fn explore(&mut self, pair: &Pair, depth: usize) -> Result<ZoneContainer, BisimError> {
        if depth > self.recursion_bound {
            return Err(BisimError::RecursionBound(self.recursion_bound));
        }

        let lk = discrete_key(&pair.left);
        let rk = discrete_key(&pair.right);
        if self.visited.contains_key(&(lk.clone(), rk.clone())) {
            return Ok(self.cache.already_cached(&lk, &rk, &pair.left.zone));
        }
        self.visited.insert((lk.clone(), rk.clone()), ());
        self.visited_states += 1;

        let events_l = self.left.avail_events(&pair.left);
        let events_r = self.right.avail_events(&pair.right);
        let delay_left = delay_successor_zone(self.left, &pair.left);
        let delay_right = delay_successor_zone(self.right, &pair.right);
        if events_l != events_r || delay_left != delay_right {
            let refuted = pair.left.zone.clone().intersect(&pair.right.zone);
            let mut container = ZoneContainer::new();
            container.append_zone(refuted);
            self.cache.emplace(lk, rk, container.clone());
            return Ok(container);
        }

        let mut refuted = ZoneContainer::new();
        for event in events_l.iter() {
            let region = self.explore_event(pair, event, depth)?;
            refuted.combine(&region);
        }

        if !refuted.is_empty() {
            self.cache.emplace(lk, rk, refuted.clone());
        }
        Ok(refuted)
    }

    fn explore_event(&mut self, pair: &Pair, event: &EventSet, depth: usize) -> Result<ZoneContainer, BisimError> {
        let left_targets = self.left.next_with_symbol(&pair.left, event);
        let right_targets = self.right.next_with_symbol(&pair.right, event);

        let mut row_min: Vec<ZoneContainer> = Vec::with_capacity(left_targets.len());
        for lt in &left_targets {
            let mut col_min: Option<ZoneContainer> = None;
            for rt in &right_targets {
                let sub = Pair { left: lt.target.clone(), right: rt.target.clone() };
                let region = self.explore(&sub, depth + 1)?;
                col_min = Some(match col_min {
                    None => region,
                    Some(mut acc) => {
                        acc.combine(&region);
                        acc
                    }
                });
            }
            row_min.push(col_min.unwrap_or_default());
        }

        let mut union_over_rows = ZoneContainer::new();
        for r in row_min {
            union_over_rows.combine(&r);
        }
        Ok(union_over_rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dbm::{Bound, Dbm};
    use crate::vcg::{DemoVcg, EventSet};

    fn identical_single_clock_automaton() -> DemoVcg {
        let mut vcg = DemoVcg::new(1, 1);
        vcg.add_location("l0", Dbm::universal(2), false);
        let mut guard = Dbm::universal(2);
        guard.constrain(0, 1, Bound::le(-1)).unwrap();
        let mut event = EventSet::new();
        event.insert("a".to_string());
        vcg.add_transition("l0", event, guard, vec![1], "l0");
        vcg
    }

    #[test]
    fn identical_automata_are_bisimilar() {
        let a = identical_single_clock_automaton();
        let b = identical_single_clock_automaton();
        let mut engine = Engine::new(&a, &b, 64).unwrap();
        assert_eq!(engine.run().unwrap(), Answer::Bisimilar);
        assert!(engine.cache().is_empty());
    }

    #[test]
    fn differing_guard_is_not_bisimilar() {
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

        let mut engine = Engine::new(&a, &b, 64).unwrap();
        assert_eq!(engine.run().unwrap(), Answer::NotBisimilar);
        assert!(!engine.cache().is_empty());
    }

    #[test]
    fn invariant_only_divergence_is_not_bisimilar() {
        let mut a = DemoVcg::new(1, 1);
        let mut inv_a = Dbm::universal(2);
        inv_a.constrain(1, 0, Bound::le(5)).unwrap();
        a.add_location("l0", inv_a, false);

        let mut b = DemoVcg::new(1, 1);
        let mut inv_b = Dbm::universal(2);
        inv_b.constrain(1, 0, Bound::le(3)).unwrap();
        b.add_location("l0", inv_b, false);

        let mut engine = Engine::new(&a, &b, 64).unwrap();
        assert_eq!(engine.run().unwrap(), Answer::NotBisimilar);
        assert!(!engine.cache().is_empty());
    }
}
