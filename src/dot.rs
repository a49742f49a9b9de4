//! DOT output (§6 — attributes only; the generic printer's formatting
//! conventions are reproduced here since no external printer is wired in
//! this crate's scope)
//!
//! Grounded on `certificate_graph.hh::dot_output`/`dot_output_helper`: a
//! header `digraph NAME {`, nodes as `ID [key="value",...];`, edges as
//! `SRC -> TGT [key="value",...];`, footer `}`. Node/edge attribute keys are
//! emitted in lexical order within each record; nodes and edges themselves
//! are emitted in lexical order of their attribute maps, per spec.

#![forbid(unsafe_code)]

use crate::certificate::graph::{CertGraph, EdgeLabel};
use crate::certificate::node::{CertNode, FinalSide, LocationState, NodePayload};
use std::collections::BTreeMap;
use std::fmt::Write as _;

fn location_attrs(prefix: &str, loc: &LocationState, m: &mut BTreeMap<String, String>) {
    m.insert(format!("{prefix}_vloc"), loc.vloc.join(","));
    m.insert(
        format!("{prefix}_intval"),
        loc.intval.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(","),
    );
}

fn node_attrs(node: &CertNode, no_orig_clocks_left: usize, no_orig_clocks_right: usize) -> BTreeMap<String, String> {
    let mut m = BTreeMap::new();
    m.insert("initial".to_string(), node.initial().to_string());
    location_attrs("first", &node.location_pair().first, &mut m);
    location_attrs("second", &node.location_pair().second, &mut m);

    match &node.payload {
        NodePayload::Witness { .. } => {}
        NodePayload::Contradiction {
            left_valuation,
            right_valuation,
            finality,
            ..
        } => {
            m.insert("clockval_1".to_string(), render_valuation(left_valuation, no_orig_clocks_left, "_1"));
            m.insert("clockval_2".to_string(), render_valuation(right_valuation, no_orig_clocks_right, "_2"));
            if let Some(f) = finality {
                let side = match f.side {
                    FinalSide::First => "first",
                    FinalSide::Second => "second",
                };
                m.insert("final".to_string(), side.to_string());
                m.insert("final_symbol".to_string(), f.symbol.clone());
            }
        }
    }
    m
}

/// `clock_names(vcg, postfix)`'s id-to-name rule: index `0` is the reference
/// clock, index `no_orig_clocks + 1` is the urgent-clock slot, everything
/// else is an original clock suffixed with `postfix` (`_1`/`_2` per side).
/// The source's declared-clock-array indexing branch has no counterpart
/// here, since this crate's clock model has no per-declaration array sizes.
fn clock_name(id: usize, no_orig_clocks: usize, postfix: &str) -> String {
    if id == 0 {
        return "Ref Clock".to_string();
    }
    if id == no_orig_clocks + 1 {
        return "Urgent_Clock".to_string();
    }
    format!("c{id}{postfix}")
}

fn render_valuation(v: &crate::clock::Valuation, no_orig_clocks: usize, postfix: &str) -> String {
    v.values()
        .iter()
        .enumerate()
        .map(|(id, val)| format!("{}={}", clock_name(id, no_orig_clocks, postfix), val))
        .collect::<Vec<_>>()
        .join(",")
}

fn edge_attrs(label: &EdgeLabel) -> BTreeMap<String, String> {
    let mut m = BTreeMap::new();
    match label {
        EdgeLabel::Action { left, right } => {
            m.insert("vedge".to_string(), format!("{left},{right}"));
        }
        EdgeLabel::Delay { amount } => {
            m.insert("delay".to_string(), amount.clone());
        }
    }
    m
}

fn write_record(out: &mut String, head: &str, attrs: &BTreeMap<String, String>) {
    let _ = write!(out, "{head} [");
    let mut first = true;
    for (k, v) in attrs {
        if !first {
            out.push(',');
        }
        first = false;
        let _ = write!(out, "{k}=\"{v}\"");
    }
    out.push_str("];\n");
}

/// Render a certificate graph as DOT, nodes then edges, each block sorted
/// lexically by its attribute map (id order is otherwise preserved by the
/// `ID [...]` text itself, satisfying "node ids appear exactly as assigned").
pub fn dot_output(graph: &CertGraph, name: &str, no_orig_clocks_left: usize, no_orig_clocks_right: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "digraph {name} {{");

    let mut node_lines: Vec<(String, BTreeMap<String, String>)> = graph
        .nodes()
        .iter()
        .map(|n| (n.id().to_string(), node_attrs(n, no_orig_clocks_left, no_orig_clocks_right)))
        .collect();
    node_lines.sort_by(|a, b| a.1.cmp(&b.1));
    for (id, attrs) in &node_lines {
        write_record(&mut out, id, attrs);
    }

    let mut edge_lines: Vec<(String, String, BTreeMap<String, String>)> = graph
        .edges()
        .iter()
        .map(|e| {
            let src = graph.node(e.src).id().to_string();
            let tgt = graph.node(e.tgt).id().to_string();
            (src, tgt, edge_attrs(&e.label))
        })
        .collect();
    edge_lines.sort_by(|a, b| a.2.cmp(&b.2));
    for (src, tgt, attrs) in &edge_lines {
        write_record(&mut out, &format!("{src} -> {tgt}"), attrs);
    }

    out.push_str("}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificate::graph::AddNodeOutcome;
    use crate::certificate::node::LocationPair;
    use crate::zone::ZoneContainer;

    #[test]
    fn header_and_footer_present() {
        let g = CertGraph::new();
        let text = dot_output(&g, "empty", 0, 0);
        assert!(text.starts_with("digraph empty {\n"));
        assert!(text.trim_end().ends_with('}'));
    }

    #[test]
    fn node_attributes_include_initial_flag() {
        let mut g = CertGraph::new();
        let pair = LocationPair {
            first: LocationState { vloc: vec!["l0".to_string()], intval: Vec::new() },
            second: LocationState { vloc: vec!["m0".to_string()], intval: Vec::new() },
        };
        let node = CertNode::new(pair, true, NodePayload::Witness { regions: ZoneContainer::new() });
        match g.add_node(node) {
            AddNodeOutcome::Inserted(_) => {}
            _ => unreachable!(),
        }
        let text = dot_output(&g, "g", 0, 0);
        assert!(text.contains("initial=\"true\""));
    }
}
