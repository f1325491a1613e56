//! Graph document and spoiler emission
//!
//! The graph document is the canonical machine interface consumed by the
//! binary rewriter. Field order is fixed by the struct definitions and the
//! node map is a `BTreeMap`, so identical runs serialize byte for byte.

use super::balance::BalanceReport;
use super::paths::RunPath;
use super::{Dag, FogRef};
use crate::cluster::ClusterType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Schema version of the graph document.
pub const GRAPH_DOC_VERSION: &str = "2";

/// Event id the binary rewriter claims for run completion.
pub const FINISH_EVENT: u32 = 9801;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDoc {
    pub version: String,
    pub seed: u64,
    pub total_layers: usize,
    pub total_nodes: usize,
    pub total_zones: usize,
    pub total_paths: usize,
    pub path_weights: Vec<u32>,
    pub nodes: BTreeMap<String, NodeDoc>,
    pub edges: Vec<EdgeDoc>,
    pub start_id: String,
    pub end_id: String,
    /// Primary map of the end cluster; the finish event is injected there.
    pub event_map: String,
    /// Defeat flag of the end cluster, when its boss carries one.
    pub final_node_flag: Option<u32>,
    pub finish_event: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDoc {
    pub cluster_id: String,
    pub zones: Vec<String>,
    #[serde(rename = "type")]
    pub kind: ClusterType,
    pub weight: u32,
    pub layer: usize,
    pub tier: u8,
    pub entry_fogs: Vec<FogRef>,
    pub exit_fogs: Vec<FogRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeDoc {
    pub source: String,
    pub target: String,
    pub source_exit_fog: FogRef,
    pub target_entry_fog: FogRef,
}

/// Package a generated DAG and its enumerated paths as the canonical
/// document.
pub fn build_graph_doc(dag: &Dag, paths: &[RunPath]) -> GraphDoc {
    let nodes: BTreeMap<String, NodeDoc> = dag
        .nodes()
        .map(|node| {
            (
                node.id.clone(),
                NodeDoc {
                    cluster_id: node.cluster.id.clone(),
                    zones: node.cluster.zones.clone(),
                    kind: node.cluster.kind,
                    weight: node.cluster.weight,
                    layer: node.layer,
                    tier: node.tier,
                    entry_fogs: node.entry_fogs.clone(),
                    exit_fogs: node.exit_fogs.clone(),
                },
            )
        })
        .collect();

    let edges: Vec<EdgeDoc> = dag
        .edges
        .iter()
        .map(|edge| EdgeDoc {
            source: edge.source.clone(),
            target: edge.target.clone(),
            source_exit_fog: edge.source_exit_fog.clone(),
            target_entry_fog: edge.target_entry_fog.clone(),
        })
        .collect();

    let end = dag.node(&dag.end_id);
    GraphDoc {
        version: GRAPH_DOC_VERSION.to_string(),
        seed: dag.seed,
        total_layers: dag.max_layer().saturating_sub(1),
        total_nodes: dag.node_count(),
        total_zones: dag.total_zones(),
        total_paths: paths.len(),
        path_weights: paths.iter().map(|p| p.weight).collect(),
        nodes,
        edges,
        start_id: dag.start_id.clone(),
        end_id: dag.end_id.clone(),
        event_map: end
            .and_then(|n| n.cluster.primary_map())
            .unwrap_or_default()
            .to_string(),
        final_node_flag: end.and_then(|n| n.cluster.defeat_flag),
        finish_event: FINISH_EVENT,
    }
}

/// Serialize the graph document with stable formatting.
pub fn graph_doc_to_json(doc: &GraphDoc) -> String {
    let mut json = serde_json::to_string_pretty(doc).expect("graph doc serializes");
    json.push('\n');
    json
}

/// Human-readable spoiler: nodes grouped by layer (insertion order within
/// a layer), then every route with its weight.
pub fn render_spoiler(dag: &Dag, paths: &[RunPath], report: &BalanceReport) -> String {
    let mut out = String::new();
    writeln!(out, "seed: {}", dag.seed).ok();
    writeln!(out).ok();

    for layer in 0..=dag.max_layer() {
        let in_layer: Vec<_> = dag.nodes().filter(|n| n.layer == layer).collect();
        if in_layer.is_empty() {
            continue;
        }
        writeln!(out, "layer {layer}:").ok();
        for node in in_layer {
            writeln!(
                out,
                "  {} [{}] weight {} tier {}",
                node.id, node.cluster.kind, node.cluster.weight, node.tier
            )
            .ok();
            for entry in &node.entry_fogs {
                writeln!(out, "    in  <- {} ({})", entry.fog_id, entry.zone).ok();
            }
            for exit in &node.exit_fogs {
                writeln!(out, "    out -> {} ({})", exit.fog_id, exit.zone).ok();
            }
        }
    }

    writeln!(out).ok();
    writeln!(out, "paths:").ok();
    for (i, path) in paths.iter().enumerate() {
        writeln!(
            out,
            "  {}. {} (weight {})",
            i + 1,
            path.nodes.join(" -> "),
            path.weight
        )
        .ok();
    }

    writeln!(out).ok();
    writeln!(
        out,
        "balance: min {} max {} avg {:.1} spread {}",
        report.min, report.max, report.avg, report.spread
    )
    .ok();
    if !report.is_balanced() {
        writeln!(
            out,
            "  {} underweight, {} overweight",
            report.underweight_paths.len(),
            report.overweight_paths.len()
        )
        .ok();
    }
    out
}
