//! Crate root: public surface for the strong-timed-bisimilarity core
//!
//! This module is the single canonical entry point for downstream users.
//! It wires together the DBM/zone kernel, the virtual-clock transition
//! system interface, the bisimulation engine and the two certificate
//! builders (contradiction DAG / witness graph) behind one [`check`]
//! function, mirroring the way the teacher's `scheduler.rs` exposes a
//! `Prover`/`Verifier` pair as the crate's only orchestration surface.
//!
//! ## Invariants
//!
//! - **No unsafe.** Every module in this crate forbids `unsafe_code`.
//! - **Exact arithmetic.** Clock valuations and DBM bounds are rational
//!   (`num-rational::Ratio<i64>`), never floating point, so no comparison in
//!   the zone/DBM layer is subject to rounding.
//! - **Bounded exploration.** Both the bisimulation engine and the
//!   certificate builders take an explicit recursion bound and report
//!   [`CoreError::RecursionBound`] rather than overflowing the stack on a
//!   pathological or buggy `Vcg` implementation.
//! - **Failure mode.** Errors are always a precise [`CoreError`] variant,
//!   never a panic, outside of `debug_assert!`-guarded internal invariants.

#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms)]

/// Difference bound matrices: the canonical zone representation (C1).
pub mod dbm;
/// Exact rational clock values and valuations (C3).
pub mod clock;
/// Zones, virtual constraints and zone containers (C2).
pub mod zone;
/// The `Vcg` transition-system interface and a small demo implementation (C4).
pub mod vcg;
/// The non-bisimilarity cache (C5).
pub mod cache;
/// `max_delay`: the largest compatible delay under two zones (§4.8).
pub mod maxdelay;
/// The bisimulation exploration engine (C6).
pub mod bisim;
/// Shared certificate graph/node types used by both certificate builders.
pub mod certificate;
/// The contradiction DAG builder (C7).
pub mod contradiction;
/// The witness graph builder (C8).
pub mod witness;
/// DOT attribute rendering for certificate graphs (§6).
pub mod dot;
/// Run statistics, matching the reporting key-space of §6.
pub mod stats;
/// The crate's aggregating error type.
pub mod error;

pub use crate::error::CoreError;

use crate::bisim::{Answer as BisimAnswer, Engine};
use crate::certificate::graph::CertGraph;
use crate::contradiction::ContradictionBuilder;
use crate::stats::{ReportedAnswer, Statistics};
use crate::vcg::Vcg;
use crate::witness::WitnessBuilder;
use std::time::Instant;

/// Parameters controlling one `check` run.
#[derive(Clone, Copy, Debug)]
pub struct CheckParams {
    /// Maximum number of distinct discrete-pair visits/recursion depth
    /// before giving up with [`CoreError::RecursionBound`]. Corresponds to
    /// the `-n`/table-size tuning knobs named in §6.
    pub recursion_bound: usize,
    /// Upper bound on delay amounts considered while closing a
    /// contradiction leaf (passed to [`crate::maxdelay::max_delay`] via the
    /// contradiction builder).
    pub max_delay_bound: u64,
}

impl Default for CheckParams {
    fn default() -> CheckParams {
        CheckParams { recursion_bound: 10_000, max_delay_bound: 64 }
    }
}

/// The outcome of comparing two NTAs: the answer, a certificate graph (a
/// contradiction DAG when not bisimilar, a witness graph when bisimilar),
/// and the run's statistics.
pub struct Certificate {
    /// the decided answer
    pub answer: BisimAnswer,
    /// the produced certificate graph
    pub graph: CertGraph,
    /// run statistics, per §6's reporting key-space
    pub stats: Statistics,
}

/// Decide strong timed bisimilarity between `left` and `right`, producing a
/// certificate graph either way. This is the crate's single public
/// orchestration entry point, mirroring §0/§2's "one function, two
/// certificate shapes" framing.
pub fn check(left: &dyn Vcg, right: &dyn Vcg, params: CheckParams) -> Result<Certificate, CoreError> {
    let start = Instant::now();
    let mut engine = Engine::new(left, right, params.recursion_bound)?;
    let answer = engine.run()?;
    let visited_states = engine.visited_states();
    let cache = engine.into_cache();

    let graph = match answer {
        BisimAnswer::Bisimilar => {
            let init_left = left.initial().into_iter().next().expect("VCG has no initial state");
            let init_right = right.initial().into_iter().next().expect("VCG has no initial state");
            let mut builder = WitnessBuilder::new(left, right);
            builder.build(init_left, init_right, params.recursion_bound).clone()
        }
        BisimAnswer::NotBisimilar => {
            let init_left = left.initial().into_iter().next().expect("VCG has no initial state");
            let init_right = right.initial().into_iter().next().expect("VCG has no initial state");
            let invariant_left = left.invariant(&init_left.location);
            let invariant_right = right.invariant(&init_right.location);
            let mut builder = ContradictionBuilder::new(left, right, params.max_delay_bound);
            let built = builder.build(&cache, init_left, init_right, invariant_left, invariant_right)?;
            if !built {
                return Err(CoreError::Cycle);
            }
            builder.into_graph()
        }
    };

    let reported = match answer {
        BisimAnswer::Bisimilar => ReportedAnswer::Bisimilar,
        BisimAnswer::NotBisimilar => ReportedAnswer::NotBisimilar,
    };
    let stats = Statistics::new(reported, visited_states, cache.len(), start.elapsed());

    Ok(Certificate { answer, graph, stats })
}

/// Render a [`Certificate`]'s graph to DOT, per §6's attribute rules.
/// `no_orig_clocks_left`/`no_orig_clocks_right` drive the `_1`/`_2`
/// clock-naming scheme on contradiction-node valuations.
pub fn render_dot(cert: &Certificate, name: &str, no_orig_clocks_left: usize, no_orig_clocks_right: usize) -> String {
    crate::dot::dot_output(&cert.graph, name, no_orig_clocks_left, no_orig_clocks_right)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dbm::{Bound, Dbm};
    use crate::vcg::{DemoVcg, EventSet};

    fn one_clock_demo(guard_bound: i64, target_self: bool) -> DemoVcg {
        let mut vcg = DemoVcg::new(1, 1);
        vcg.add_location("l0", Dbm::universal(2), false);
        if !target_self {
            vcg.add_location("l1", Dbm::universal(2), false);
        }
        let mut guard = Dbm::universal(2);
        guard.constrain(0, 1, Bound::le(-guard_bound)).unwrap();
        let mut event = EventSet::new();
        event.insert("a".to_string());
        let target = if target_self { "l0" } else { "l1" };
        vcg.add_transition("l0", event, guard, vec![1], target);
        vcg
    }

    #[test]
    fn identical_automata_are_reported_bisimilar_with_a_witness_graph() {
        let a = one_clock_demo(1, true);
        let b = one_clock_demo(1, true);
        let cert = check(&a, &b, CheckParams::default()).unwrap();
        assert_eq!(cert.answer, BisimAnswer::Bisimilar);
        assert!(cert.graph.node_count() >= 1);
        assert_eq!(cert.stats.answer, ReportedAnswer::Bisimilar);
    }

    #[test]
    fn differing_guards_are_reported_not_bisimilar_with_a_contradiction_dag() {
        let a = one_clock_demo(1, false);
        let b = one_clock_demo(2, false);
        let cert = check(&a, &b, CheckParams::default()).unwrap();
        assert_eq!(cert.answer, BisimAnswer::NotBisimilar);
        assert!(cert.graph.node_count() >= 1);
        assert_eq!(cert.stats.answer, ReportedAnswer::NotBisimilar);
    }
}
