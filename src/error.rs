//! Aggregate error type for the public API surface.
//!
//! Each module defines its own focused `thiserror` enum; `CoreError` wraps
//! them so CLI binaries and top-level callers have one type to match on.

#![forbid(unsafe_code)]

use crate::bisim::BisimError;
use crate::contradiction::ContradictionError;
use crate::dbm::DbmError;
use crate::vcg::VcgError;

/// Top-level error returned by [`crate::check`] and the CLI binaries.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A DBM/zone operation was given inconsistent input.
    #[error(transparent)]
    Dbm(#[from] DbmError),
    /// The VCG pair could not be explored (missing synchronization, etc).
    #[error(transparent)]
    Vcg(#[from] VcgError),
    /// The bisimulation exploration itself failed.
    #[error(transparent)]
    Bisim(#[from] BisimError),
    /// Contradiction certificate construction itself failed (as opposed to
    /// "no certificate exists", which is [`CoreError::Cycle`]).
    #[error(transparent)]
    Contradiction(#[from] ContradictionError),
    /// The two NTAs differ, but the non-bisim cache produced a
    /// self-referential pair: no finite contradiction certificate exists.
    /// Non-fatal for the decision itself (§7: "surfaced as 'no certificate'"),
    /// fatal for certificate production.
    #[error("no finite certificate exists: a cycle was detected in the contradiction builder")]
    Cycle,
    /// The two systems being compared are not directly comparable (e.g.
    /// mismatched virtual clock counts surfaced outside a `Vcg` call).
    #[error("incompatible systems: {0}")]
    IncompatibleSystems(String),
    /// A configured resource bound (recursion depth, cache size) was
    /// exceeded before a decision could be reached.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),
    /// I/O failure while reading a model or writing a certificate.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
