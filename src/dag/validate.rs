//! DAG validation
//!
//! Structural checks are fatal: broken reachability, non-forward edges, or
//! a reused zone mean the document must not reach the binary rewriter.
//! Balance and shape findings are warnings only.

use super::paths::RunPath;
use super::Dag;
use crate::cluster::ClusterType;
use crate::config::GenConfig;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, Reversed};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Fatal outcome: the errors list was non-empty.
#[derive(Debug, Error)]
#[error("dag validation failed with {} error(s)", .errors.len())]
pub struct ValidationError {
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn ensure_valid(&self) -> Result<(), ValidationError> {
        if self.is_valid {
            Ok(())
        } else {
            Err(ValidationError {
                errors: self.errors.clone(),
            })
        }
    }
}

/// Run all structural, requirement, and shape checks.
pub fn validate_dag(dag: &Dag, paths: &[RunPath], config: &GenConfig) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    check_forward_edges(dag, &mut errors);
    check_reachability(dag, &mut errors);
    check_zone_exclusivity(dag, &mut errors);
    check_requirements(dag, config, &mut errors);
    check_paths(paths, config, &mut errors, &mut warnings);
    check_layer_count(dag, config, &mut warnings);

    ValidationReport {
        is_valid: errors.is_empty(),
        errors,
        warnings,
    }
}

fn check_forward_edges(dag: &Dag, errors: &mut Vec<String>) {
    for edge in &dag.edges {
        let (Some(source), Some(target)) = (dag.node(&edge.source), dag.node(&edge.target))
        else {
            errors.push(format!(
                "edge references missing node: {} -> {}",
                edge.source, edge.target
            ));
            continue;
        };
        if source.layer >= target.layer {
            errors.push(format!(
                "edge {} -> {} is not strictly forward (layer {} -> {})",
                edge.source, edge.target, source.layer, target.layer
            ));
        }
    }
}

fn check_reachability(dag: &Dag, errors: &mut Vec<String>) {
    let mut graph: DiGraph<&str, ()> = DiGraph::new();
    let mut index: HashMap<&str, NodeIndex> = HashMap::new();
    for node in dag.nodes() {
        index.insert(&node.id, graph.add_node(&node.id));
    }
    for edge in &dag.edges {
        if let (Some(&a), Some(&b)) = (
            index.get(edge.source.as_str()),
            index.get(edge.target.as_str()),
        ) {
            graph.add_edge(a, b, ());
        }
    }

    let Some(&start) = index.get(dag.start_id.as_str()) else {
        errors.push("start node missing".to_string());
        return;
    };
    let Some(&end) = index.get(dag.end_id.as_str()) else {
        errors.push("end node missing".to_string());
        return;
    };

    let mut from_start = HashSet::new();
    let mut dfs = Dfs::new(&graph, start);
    while let Some(n) = dfs.next(&graph) {
        from_start.insert(n);
    }

    let reversed = Reversed(&graph);
    let mut to_end = HashSet::new();
    let mut dfs = Dfs::new(reversed, end);
    while let Some(n) = dfs.next(reversed) {
        to_end.insert(n);
    }

    for node in dag.nodes() {
        let idx = index[node.id.as_str()];
        if !from_start.contains(&idx) {
            errors.push(format!("node {} unreachable from start", node.id));
        }
        if !to_end.contains(&idx) {
            errors.push(format!("node {} cannot reach end", node.id));
        }
    }
}

fn check_zone_exclusivity(dag: &Dag, errors: &mut Vec<String>) {
    let mut owner: HashMap<&str, &str> = HashMap::new();
    for node in dag.nodes() {
        for zone in &node.cluster.zones {
            if let Some(previous) = owner.insert(zone, &node.id) {
                errors.push(format!(
                    "zone {} claimed by both {} and {}",
                    zone, previous, node.id
                ));
            }
        }
    }
}

fn check_requirements(dag: &Dag, config: &GenConfig, errors: &mut Vec<String>) {
    let count = |kinds: &[ClusterType]| {
        dag.nodes()
            .filter(|n| kinds.contains(&n.cluster.kind))
            .count()
    };

    let req = &config.requirements;
    let legacy = count(&[ClusterType::LegacyDungeon]);
    if legacy < req.legacy_dungeons {
        errors.push(format!(
            "requirement shortfall: {legacy} legacy dungeons, need {}",
            req.legacy_dungeons
        ));
    }
    let minis = count(&[ClusterType::MiniDungeon]);
    if minis < req.mini_dungeons {
        errors.push(format!(
            "requirement shortfall: {minis} mini dungeons, need {}",
            req.mini_dungeons
        ));
    }
    // Boss arenas and major bosses both satisfy the boss requirement.
    let bosses = count(&[ClusterType::BossArena, ClusterType::MajorBoss]);
    if bosses < req.bosses {
        errors.push(format!(
            "requirement shortfall: {bosses} bosses, need {}",
            req.bosses
        ));
    }
}

fn check_paths(
    paths: &[RunPath],
    config: &GenConfig,
    errors: &mut Vec<String>,
    warnings: &mut Vec<String>,
) {
    if paths.is_empty() {
        errors.push("no start-to-end path".to_string());
        return;
    }
    if paths.len() == 1 {
        warnings.push("single path: run has no route choice".to_string());
    }

    let min = config.budget.min_weight();
    let max = config.budget.max_weight();
    for (i, path) in paths.iter().enumerate() {
        if path.weight < min || path.weight > max {
            warnings.push(format!(
                "path {} weight {} outside budget [{min}, {max}]",
                i, path.weight
            ));
        }
    }
}

fn check_layer_count(dag: &Dag, config: &GenConfig, warnings: &mut Vec<String>) {
    // Intermediate layers sit between start (0) and the end layer.
    let intermediate = dag.max_layer().saturating_sub(1);
    if intermediate < config.structure.min_layers {
        warnings.push(format!(
            "only {intermediate} intermediate layers, wanted at least {}",
            config.structure.min_layers
        ));
    }
}
