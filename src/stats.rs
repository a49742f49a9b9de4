//! Run statistics (§6 supplement, ambient)
//!
//! Grounded on `spec.md` §6's reporting key-space; `max_resident_memory_bytes`
//! is read straight from `/proc/self/status` the way a systems-leaning crate
//! in this pack would, rather than pulling in a whole-process metrics crate
//! for a single best-effort read.

#![forbid(unsafe_code)]

use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Final answer of a bisimilarity check, serialized as a plain string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportedAnswer {
    /// the two NTAs are strongly timed bisimilar
    Bisimilar,
    /// the two NTAs are not; a contradiction certificate was produced
    NotBisimilar,
}

impl fmt::Display for ReportedAnswer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportedAnswer::Bisimilar => write!(f, "bisimilar"),
            ReportedAnswer::NotBisimilar => write!(f, "not-bisimilar"),
        }
    }
}

/// A run's reportable statistics, matching the key-space `spec.md` §6 names.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Statistics {
    /// the final answer
    pub answer: ReportedAnswer,
    /// number of distinct discrete-state pairs visited
    pub visited_states: usize,
    /// number of entries committed to the non-bisimilarity cache
    pub cached_non_bisim_entries: usize,
    /// wall/cpu time spent on the run, in seconds
    pub cpu_time_seconds: f64,
    /// best-effort peak resident set size in bytes, if it could be read
    pub max_resident_memory_bytes: Option<u64>,
}

impl Statistics {
    /// Build a statistics record, timing `elapsed` and reading current
    /// memory usage at call time (should be called once, at the end of a
    /// run).
    pub fn new(
        answer: ReportedAnswer,
        visited_states: usize,
        cached_non_bisim_entries: usize,
        elapsed: Duration,
    ) -> Statistics {
        Statistics {
            answer,
            visited_states,
            cached_non_bisim_entries,
            cpu_time_seconds: elapsed.as_secs_f64(),
            max_resident_memory_bytes: read_max_rss_bytes(),
        }
    }
}

/// Best-effort read of `VmHWM` (peak resident set size) from
/// `/proc/self/status`. Returns `None` on any non-Linux platform or parse
/// failure; never panics.
fn read_max_rss_bytes() -> Option<u64> {
    let text = std::fs::read_to_string("/proc/self/status").ok()?;
    for line in text.lines() {
        if let Some(rest) = line.strip_prefix("VmHWM:") {
            let digits: String = rest.chars().filter(|c| c.is_ascii_digit()).collect();
            let kib: u64 = digits.parse().ok()?;
            return Some(kib * 1024);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_kebab_case_answer() {
        let stats = Statistics::new(ReportedAnswer::Bisimilar, 3, 0, Duration::from_millis(10));
        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains("\"bisimilar\""));
        assert!(json.contains("\"visited-states\":3"));
    }

    #[test]
    fn memory_read_never_panics() {
        let _ = read_max_rss_bytes();
    }
}
