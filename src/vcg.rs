//! Syncprod / VCG transition system (C4)
//!
//! Defines the [`Vcg`] trait the bisimulation core consumes, and a small
//! in-memory `demo` implementation used by tests and the CLI (the textual
//! NTA parser and full synchronous-product construction are external
//! collaborators, per scope). Grounded on the transition-system interface
//! implied throughout `strong-timed-bisim/vcg-timed-bisim.hh` call sites and
//! on `syncprod/vedge.cc` for the vedge shape.

#![forbid(unsafe_code)]

use crate::dbm::Dbm;
use crate::zone::Zone;
use std::collections::BTreeSet;
use std::rc::Rc;

/// Errors raised while driving a [`Vcg`].
#[derive(Debug, thiserror::Error)]
pub enum VcgError {
    /// The two VCGs being compared disagree on their virtual-clock count.
    #[error("incompatible-systems: virtual clock counts differ ({left} vs {right})")]
    IncompatibleSystems {
        /// left side's virtual clock count
        left: usize,
        /// right side's virtual clock count
        right: usize,
    },
}

/// A process-local synchronization label. A transition's `symbol` is a set
/// of these (the synchronization vector selecting one edge per process).
pub type Symbol = String;

/// `vedge`: the tuple of per-process edge labels selected for a transition,
/// i.e. the event set under which it fires.
pub type EventSet = BTreeSet<Symbol>;

/// Opaque handle to a symbolic state within one VCG. Demo states are plain
/// indices; real VCGs would wrap `(vloc, intval, zone)`.
#[derive(Clone, Debug)]
pub struct SymbolicState {
    /// discrete location identifier (string for readability in DOT output)
    pub location: String,
    /// integer-variable valuation, rendered as-is in certificate attributes
    pub intval: Vec<i64>,
    /// the zone of clock valuations at this state
    pub zone: Zone,
    /// whether this is a VCG-wide initial state
    pub initial: bool,
}

/// A transition out of a [`SymbolicState`].
#[derive(Clone, Debug)]
pub struct Transition {
    /// the event set (vedge) selected
    pub event: EventSet,
    /// target state
    pub target: SymbolicState,
}

/// The interface the bisimulation core and the contradiction/witness
/// builders consume. One implementation exists per side of a comparison.
pub trait Vcg {
    /// Enumerate the initial symbolic states.
    fn initial(&self) -> Vec<SymbolicState>;

    /// Enumerate `(target, transition)` pairs reachable from `src` whose
    /// vedge is exactly `symbol`.
    fn next_with_symbol(&self, src: &SymbolicState, symbol: &EventSet) -> Vec<Transition>;

    /// The set of event sets for which at least one outgoing transition
    /// exists from `src`.
    fn avail_events(&self, src: &SymbolicState) -> BTreeSet<EventSet>;

    /// Deep-clone a symbolic state (cheap: zones are value-semantic).
    fn clone_state(&self, s: &SymbolicState) -> SymbolicState {
        s.clone()
    }

    /// Number of original (non-virtual) clocks on this side.
    fn get_no_of_original_clocks(&self) -> usize;

    /// Number of clocks total, including virtual clocks and the reference
    /// clock's slot (dimension minus one).
    fn get_no_of_virtual_clocks(&self) -> usize;

    /// The location's invariant DBM, used when future-closing a zone.
    fn invariant(&self, location: &str) -> Dbm;

    /// `delay_allowed`: whether urgent constraints at `location` forbid time
    /// progress.
    fn delay_allowed(&self, location: &str) -> bool;
}

/// A tiny concrete [`Vcg`] over an explicit location graph, for tests and as
/// the CLI demo model. Not a substitute for a real NTA parser.
#[derive(Clone, Debug)]
pub struct DemoVcg {
    no_original_clocks: usize,
    no_virtual_clocks: usize,
    locations: Vec<DemoLocation>,
}

#[derive(Clone, Debug)]
struct DemoLocation {
    name: String,
    urgent: bool,
    invariant: Rc<Dbm>,
    out: Vec<(EventSet, Dbm /* guard, as constraint applied */, Vec<usize> /* resets */, String /* target */)>,
}

impl DemoVcg {
    /// Build an empty demo model; original/virtual clock counts fixed at
    /// construction (dimension `1 + clocks`).
    pub fn new(no_original_clocks: usize, no_virtual_clocks: usize) -> DemoVcg {
        DemoVcg { no_original_clocks, no_virtual_clocks, locations: Vec::new() }
    }

    /// Add a location with its invariant DBM (already in the full
    /// `1 + no_virtual_clocks` dimension) and urgency flag.
    pub fn add_location(&mut self, name: &str, invariant: Dbm, urgent: bool) {
        self.locations.push(DemoLocation {
            name: name.to_string(),
            urgent,
            invariant: Rc::new(invariant),
            out: Vec::new(),
        });
    }

    /// Add a transition `from -> to` labelled by `event`, applying `guard`
    /// (a DBM intersected against the source zone) and resetting `resets`.
    pub fn add_transition(
        &mut self,
        from: &str,
        event: EventSet,
        guard: Dbm,
        resets: Vec<usize>,
        to: &str,
    ) {
        let idx = self.locations.iter().position(|l| l.name == from).expect("unknown source location");
        self.locations[idx].out.push((event, guard, resets, to.to_string()));
    }

    fn location(&self, name: &str) -> &DemoLocation {
        self.locations.iter().find(|l| l.name == name).expect("unknown location")
    }

    /// The initial state's zone: the invariant, future-closed from the
    /// all-zero valuation.
    fn initial_zone(&self, loc: &DemoLocation) -> Zone {
        let mut d = Dbm::universal(self.no_virtual_clocks + 1);
        let _ = d.intersect(&loc.invariant);
        let _ = d.delay(&loc.invariant);
        Zone::new(d)
    }
}

impl Vcg for DemoVcg {
    fn initial(&self) -> Vec<SymbolicState> {
        self.locations
            .iter()
            .take(1)
            .map(|l| SymbolicState {
                location: l.name.clone(),
                intval: Vec::new(),
                zone: self.initial_zone(l),
                initial: true,
            })
            .collect()
    }

    fn next_with_symbol(&self, src: &SymbolicState, symbol: &EventSet) -> Vec<Transition> {
        let loc = self.location(&src.location);
        let mut out = Vec::new();
        for (event, guard, resets, target) in &loc.out {
            if event != symbol {
                continue;
            }
            let mut z = src.zone.dbm().clone();
            if z.intersect(guard).is_err() {
                continue;
            }
            for &r in resets {
                z.reset(r);
            }
            let target_loc = self.location(target);
            if z.intersect(&target_loc.invariant).is_err() {
                continue;
            }
            out.push(Transition {
                event: event.clone(),
                target: SymbolicState {
                    location: target.clone(),
                    intval: src.intval.clone(),
                    zone: Zone::new(z),
                    initial: false,
                },
            });
        }
        out
    }

    fn avail_events(&self, src: &SymbolicState) -> BTreeSet<EventSet> {
        let loc = self.location(&src.location);
        loc.out.iter().map(|(e, ..)| e.clone()).collect()
    }

    fn get_no_of_original_clocks(&self) -> usize {
        self.no_original_clocks
    }

    fn get_no_of_virtual_clocks(&self) -> usize {
        self.no_virtual_clocks
    }

    fn invariant(&self, location: &str) -> Dbm {
        (*self.location(location).invariant).clone()
    }

    fn delay_allowed(&self, location: &str) -> bool {
        !self.location(location).urgent
    }
}

/// Check two VCGs share a virtual-clock count before exploring them
/// together.
pub fn check_compatible(a: &dyn Vcg, b: &dyn Vcg) -> Result<(), VcgError> {
    let left = a.get_no_of_virtual_clocks();
    let right = b.get_no_of_virtual_clocks();
    if left != right {
        return Err(VcgError::IncompatibleSystems { left, right });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dbm::Bound;

    fn one_clock_demo(guard_bound: i64) -> DemoVcg {
        let mut vcg = DemoVcg::new(1, 1);
        vcg.add_location("l0", Dbm::universal(2), false);
        vcg.add_location("l1", Dbm::universal(2), false);
        let mut guard = Dbm::universal(2);
        guard.constrain(0, 1, Bound::le(-guard_bound)).unwrap();
        let mut event = EventSet::new();
        event.insert("a".to_string());
        vcg.add_transition("l0", event, guard, vec![1], "l1");
        vcg
    }

    #[test]
    fn avail_events_reflects_outgoing_transitions() {
        let vcg = one_clock_demo(1);
        let init = &vcg.initial()[0];
        let events = vcg.avail_events(init);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn compatible_check_flags_mismatched_virtual_clocks() {
        let a = DemoVcg::new(1, 1);
        let b = DemoVcg::new(1, 2);
        assert!(check_compatible(&a, &b).is_err());
    }
}
