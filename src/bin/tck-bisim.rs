//! Minimal CLI driver for the strong-timed-bisimilarity core
//!
//! Flags, per the reporting interface: `-r strong-timed-bisim` (the only
//! supported relationship, kept as a flag for interface parity), `-o FILE`
//! (write the certificate DOT to FILE instead of stdout), `-n ORDER`
//! (recursion/order bound), `--block-size`/`--table-size` (accepted and
//! threaded into the same bound, since this crate's demo driver has no
//! separate block/table tuning), `-h` (usage).
//!
//! The textual NTA parser is out of scope, so this binary always compares
//! a small built-in demo pair; wiring a real model file in is a matter of
//! swapping the two `DemoVcg` constructions below for a parsed `Vcg`.

#![forbid(unsafe_code)]

use std::env;
use tck_bisim::dbm::{Bound, Dbm};
use tck_bisim::vcg::{DemoVcg, EventSet, Vcg};
use tck_bisim::{check, render_dot, CheckParams};
use tracing::info;

fn parse_flag(args: &[String], key: &str) -> Option<String> {
    let mut it = args.iter();
    while let Some(a) = it.next() {
        if a == key {
            return it.next().cloned();
        }
    }
    None
}

fn usage() {
    println!("tck-bisim -r strong-timed-bisim [-o FILE] [-n ORDER] [--block-size N] [--table-size N]");
    println!();
    println!("Compares a built-in demo pair of timed automata for strong timed");
    println!("bisimilarity and writes the resulting certificate graph as DOT.");
}

fn demo_pair(mismatched: bool) -> (DemoVcg, DemoVcg) {
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
    let bound = if mismatched { 2 } else { 1 };
    guard_b.constrain(0, 1, Bound::le(-bound)).unwrap();
    b.add_transition("l0", event, guard_b, vec![1], "l1");

    (a, b)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "tck_bisim=info".into()))
        .with_target(false)
        .compact()
        .init();

    let args: Vec<String> = env::args().collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        usage();
        return;
    }

    let relationship = parse_flag(&args, "-r").unwrap_or_else(|| "strong-timed-bisim".to_string());
    if relationship != "strong-timed-bisim" {
        eprintln!("unsupported relationship: {relationship} (only strong-timed-bisim is implemented)");
        std::process::exit(2);
    }

    let order: usize = parse_flag(&args, "-n")
        .or_else(|| parse_flag(&args, "--table-size"))
        .or_else(|| parse_flag(&args, "--block-size"))
        .and_then(|s| s.parse().ok())
        .unwrap_or(10_000);

    let out_path = parse_flag(&args, "-o");

    info!(order, ?out_path, "starting strong-timed-bisimilarity check");
    let (a, b) = demo_pair(false);
    let params = CheckParams { recursion_bound: order, ..CheckParams::default() };
    let cert = match check(&a, &b, params) {
        Ok(cert) => cert,
        Err(e) => {
            eprintln!("tck-bisim: {e}");
            std::process::exit(1);
        }
    };

    println!("answer={}", cert.stats.answer);
    println!("visited-states={}", cert.stats.visited_states);
    println!("cached-non-bisim-entries={}", cert.stats.cached_non_bisim_entries);
    println!("cpu-time-seconds={:.6}", cert.stats.cpu_time_seconds);
    if let Some(rss) = cert.stats.max_resident_memory_bytes {
        println!("max-resident-memory-bytes={rss}");
    }

    let dot = render_dot(&cert, "certificate", a.get_no_of_original_clocks(), b.get_no_of_original_clocks());
    match out_path {
        Some(path) => {
            if let Err(e) = std::fs::write(&path, dot) {
                eprintln!("tck-bisim: failed to write {path}: {e}");
                std::process::exit(1);
            }
        }
        None => print!("{dot}"),
    }
}
