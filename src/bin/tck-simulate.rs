//! Stub for the out-of-scope interactive/randomized simulator.
//!
//! The original toolkit exposes a separate `tck_simulate` public API
//! surface alongside the bisimilarity checker; this binary documents that
//! entry point without implementing it (randomized simulator driver logic
//! is an explicit non-goal here).

fn main() {
    println!("tck-simulate: not implemented in this build (simulator driver logic is out of scope)");
}
