//! Seeded DAG construction
//!
//! One generation attempt walks the planned layers with a set of live
//! branches, placing one cluster per branch (passant), widening a single
//! branch (split), or contracting several branches into one node (merge).
//! Zone exclusivity is global: every placed cluster retires its zones for
//! the rest of the attempt.
//!
//! RNG consumption follows a canonical traversal order: branches in
//! enqueued order, candidate lists in id order before a stable shuffle,
//! and the first compatible candidate wins. Two runs with the same pool,
//! config, and seed produce identical graphs.

use super::layers::plan_layers;
use super::{Dag, DagEdge, DagNode, FogRef, NodeId};
use crate::cluster::{Cluster, ClusterFog, ClusterPool, ClusterType};
use crate::config::GenConfig;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("no candidate {kind} cluster at layer {layer}")]
    NoCandidate { kind: ClusterType, layer: usize },

    #[error("no valid entry fog on cluster {cluster}")]
    NoValidEntry { cluster: String },

    #[error("all branches exhausted at layer {layer}")]
    BranchesExhausted { layer: usize },

    #[error("merge pool empty at layer {layer} ({inbound} inbound branches)")]
    MergePoolEmpty { layer: usize, inbound: usize },

    #[error("end cluster unavailable")]
    EndClusterUnavailable,
}

/// A pending connection: a placed node and the exit gate reserved for the
/// next layer.
#[derive(Debug, Clone)]
struct Branch {
    source: NodeId,
    exit: FogRef,
}

/// Per-attempt mutable state, dropped on failure.
#[derive(Debug, Default)]
struct GenerationState {
    used_zones: HashSet<String>,
    branches: Vec<Branch>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LayerAction {
    Passant,
    Split,
    Merge,
}

/// Tier scaling for an intermediate layer (0-based index over the plan).
fn tier_for(layer_idx: usize, total_layers: usize) -> u8 {
    let denom = total_layers.saturating_sub(1).max(1) as f64;
    let tier = 1.0 + (27.0 * layer_idx as f64 / denom).round();
    tier.clamp(1.0, 28.0) as u8
}

/// Candidates for a layer, in id order (shuffled later by the executor).
fn compatible_candidates<'a>(
    pool: &'a ClusterPool,
    kind: ClusterType,
    used: &HashSet<String>,
) -> Vec<&'a Cluster> {
    pool.of_type(kind)
        .into_iter()
        .filter(|c| c.zones_disjoint(used) && c.is_usable())
        .collect()
}

/// Whether some entry choice leaves at least two exits (split material).
fn cluster_can_split(cluster: &Cluster) -> bool {
    cluster
        .entry_fogs
        .iter()
        .any(|e| cluster.exits_after_entry(e).len() >= 2)
}

/// Merge eligibility for `num_in` inbound branches.
pub fn can_be_merge_node(cluster: &Cluster, num_in: usize) -> bool {
    if cluster.allow_shared_entrance {
        cluster.entry_fogs.len() >= 2 && !cluster.exit_fogs.is_empty()
    } else {
        cluster.entry_fogs.len() >= num_in
            && find_combination(&cluster.entry_fogs, cluster, num_in).is_some()
    }
}

/// First combination of `n` distinct entries (in list order) leaving
/// exactly one net exit.
fn find_combination(
    entries: &[ClusterFog],
    cluster: &Cluster,
    n: usize,
) -> Option<Vec<ClusterFog>> {
    fn search(
        entries: &[ClusterFog],
        cluster: &Cluster,
        n: usize,
        start: usize,
        picked: &mut Vec<ClusterFog>,
    ) -> Option<Vec<ClusterFog>> {
        if picked.len() == n {
            let refs: Vec<&ClusterFog> = picked.iter().collect();
            if cluster.net_exit_count(&refs) == 1 {
                return Some(picked.clone());
            }
            return None;
        }
        for i in start..entries.len() {
            picked.push(entries[i].clone());
            if let Some(found) = search(entries, cluster, n, i + 1, picked) {
                return Some(found);
            }
            picked.pop();
        }
        None
    }
    search(entries, cluster, n, 0, &mut Vec::with_capacity(n))
}

fn decide_action(
    branches: usize,
    candidates: &[&Cluster],
    layer_idx: usize,
    total_layers: usize,
    max_parallel: usize,
) -> LayerAction {
    if branches >= 2 && candidates.len() < branches {
        // Merge-pool bottleneck: the layer cannot feed every branch.
        return LayerAction::Merge;
    }
    if branches == 1
        && max_parallel > 1
        && layer_idx + 1 < total_layers
        && candidates.iter().any(|c| cluster_can_split(c))
    {
        return LayerAction::Split;
    }
    LayerAction::Passant
}

/// Shuffled entry choice leaving at least `min_exits` exits.
fn pick_entry(
    cluster: &Cluster,
    min_exits: usize,
    rng: &mut StdRng,
) -> Option<(ClusterFog, Vec<ClusterFog>)> {
    let mut entries = cluster.entry_fogs.clone();
    entries.shuffle(rng);
    for entry in entries {
        let exits = cluster.exits_after_entry(&entry);
        if exits.len() >= min_exits {
            return Some((entry, exits));
        }
    }
    None
}

fn commit_node(
    dag: &mut Dag,
    state: &mut GenerationState,
    cluster: &Cluster,
    layer: usize,
    tier: u8,
    entry_fogs: Vec<FogRef>,
    exit_fogs: Vec<FogRef>,
) -> NodeId {
    state
        .used_zones
        .extend(cluster.zones.iter().cloned());
    let id = cluster.id.clone();
    dag.insert_node(DagNode {
        id: id.clone(),
        cluster: cluster.clone(),
        layer,
        tier,
        entry_fogs,
        exit_fogs,
    });
    id
}

fn place_start(
    dag: &mut Dag,
    state: &mut GenerationState,
    pool: &ClusterPool,
    config: &GenConfig,
    rng: &mut StdRng,
) -> Result<(), GenerationError> {
    let mut candidates: Vec<&Cluster> = pool
        .of_type(ClusterType::Start)
        .into_iter()
        .filter(|c| c.zones_disjoint(&state.used_zones) && !c.exit_fogs.is_empty())
        .collect();
    candidates.shuffle(rng);
    let cluster = candidates.first().copied().ok_or(GenerationError::NoCandidate {
        kind: ClusterType::Start,
        layer: 0,
    })?;

    let mut exits = cluster.exit_fogs.clone();
    exits.shuffle(rng);
    let exit_refs: Vec<FogRef> = exits.iter().map(FogRef::from).collect();

    let id = commit_node(dag, state, cluster, 0, 1, Vec::new(), exit_refs.clone());
    dag.start_id = id.clone();

    let max_parallel = config.structure.max_parallel_paths;
    let mut branches: Vec<Branch> = exit_refs
        .into_iter()
        .take(max_parallel)
        .map(|exit| Branch {
            source: id.clone(),
            exit,
        })
        .collect();
    // A lone exit still splits a multi-path run: both branches leave
    // through the same gate and diverge at the next layer.
    if branches.len() == 1 && max_parallel >= 2 {
        branches.push(branches[0].clone());
    }
    state.branches = branches;
    Ok(())
}

fn run_passant(
    dag: &mut Dag,
    state: &mut GenerationState,
    pool: &ClusterPool,
    kind: ClusterType,
    layer: usize,
    tier: u8,
    rng: &mut StdRng,
) -> Result<(), GenerationError> {
    let branches = std::mem::take(&mut state.branches);
    let mut next = Vec::with_capacity(branches.len());

    for branch in branches {
        let mut candidates = compatible_candidates(pool, kind, &state.used_zones);
        candidates.shuffle(rng);

        let mut placed = None;
        for cluster in candidates {
            if let Some((entry, exits)) = pick_entry(cluster, 1, rng) {
                placed = Some((cluster, entry, exits));
                break;
            }
        }
        let (cluster, entry, mut exits) =
            placed.ok_or(GenerationError::NoCandidate { kind, layer })?;

        exits.shuffle(rng);
        let exit_refs: Vec<FogRef> = exits.iter().map(FogRef::from).collect();
        let entry_ref = FogRef::from(&entry);

        let id = commit_node(
            dag,
            state,
            cluster,
            layer,
            tier,
            vec![entry_ref.clone()],
            exit_refs.clone(),
        );
        dag.add_edge(DagEdge {
            source: branch.source,
            target: id.clone(),
            source_exit_fog: branch.exit,
            target_entry_fog: entry_ref,
        });
        next.push(Branch {
            source: id,
            exit: exit_refs[0].clone(),
        });
    }

    state.branches = next;
    Ok(())
}

fn run_split(
    dag: &mut Dag,
    state: &mut GenerationState,
    pool: &ClusterPool,
    kind: ClusterType,
    layer: usize,
    tier: u8,
    max_parallel: usize,
    rng: &mut StdRng,
) -> Result<(), GenerationError> {
    let branch = state.branches.pop().expect("split requires a live branch");

    let mut candidates = compatible_candidates(pool, kind, &state.used_zones);
    candidates.shuffle(rng);

    let mut placed = None;
    for cluster in candidates {
        if let Some((entry, exits)) = pick_entry(cluster, 2, rng) {
            placed = Some((cluster, entry, exits));
            break;
        }
    }
    let (cluster, entry, mut exits) =
        placed.ok_or(GenerationError::NoCandidate { kind, layer })?;

    exits.shuffle(rng);
    let exit_refs: Vec<FogRef> = exits.iter().map(FogRef::from).collect();
    let entry_ref = FogRef::from(&entry);

    let id = commit_node(
        dag,
        state,
        cluster,
        layer,
        tier,
        vec![entry_ref.clone()],
        exit_refs.clone(),
    );
    dag.add_edge(DagEdge {
        source: branch.source,
        target: id.clone(),
        source_exit_fog: branch.exit,
        target_entry_fog: entry_ref,
    });

    state.branches = exit_refs
        .into_iter()
        .take(max_parallel)
        .map(|exit| Branch {
            source: id.clone(),
            exit,
        })
        .collect();
    Ok(())
}

fn run_merge(
    dag: &mut Dag,
    state: &mut GenerationState,
    pool: &ClusterPool,
    kind: ClusterType,
    layer: usize,
    tier: u8,
    rng: &mut StdRng,
) -> Result<(), GenerationError> {
    let branches = std::mem::take(&mut state.branches);
    let num_in = branches.len();

    let mut candidates: Vec<&Cluster> = compatible_candidates(pool, kind, &state.used_zones)
        .into_iter()
        .filter(|c| can_be_merge_node(c, num_in))
        .collect();
    candidates.shuffle(rng);
    let cluster = candidates
        .first()
        .copied()
        .ok_or(GenerationError::MergePoolEmpty {
            layer,
            inbound: num_in,
        })?;

    if cluster.allow_shared_entrance {
        // Shared entrance: every inbound edge lands on the same gate.
        let (entry, mut exits) =
            pick_entry(cluster, 1, rng).ok_or_else(|| GenerationError::NoValidEntry {
                cluster: cluster.id.clone(),
            })?;
        exits.shuffle(rng);
        let exit_refs: Vec<FogRef> = exits.iter().map(FogRef::from).collect();
        let entry_ref = FogRef::from(&entry);

        let id = commit_node(
            dag,
            state,
            cluster,
            layer,
            tier,
            vec![entry_ref.clone()],
            exit_refs.clone(),
        );
        for branch in branches {
            dag.add_edge(DagEdge {
                source: branch.source,
                target: id.clone(),
                source_exit_fog: branch.exit,
                target_entry_fog: entry_ref.clone(),
            });
        }
        state.branches = vec![Branch {
            source: id,
            exit: exit_refs[0].clone(),
        }];
    } else {
        // Distinct entrances, classic contraction: exactly one net exit.
        let mut entries = cluster.entry_fogs.clone();
        entries.shuffle(rng);
        let selection = find_combination(&entries, cluster, num_in).ok_or_else(|| {
            GenerationError::NoValidEntry {
                cluster: cluster.id.clone(),
            }
        })?;

        let exit: Vec<ClusterFog> = cluster
            .exit_fogs
            .iter()
            .filter(|e| {
                !selection
                    .iter()
                    .any(|s| !s.unique && s.fog_id == e.fog_id)
            })
            .cloned()
            .collect();
        debug_assert_eq!(exit.len(), 1);
        let exit_ref = FogRef::from(&exit[0]);
        let entry_refs: Vec<FogRef> = selection.iter().map(FogRef::from).collect();

        let id = commit_node(
            dag,
            state,
            cluster,
            layer,
            tier,
            entry_refs.clone(),
            vec![exit_ref.clone()],
        );
        for (branch, entry_ref) in branches.into_iter().zip(entry_refs) {
            dag.add_edge(DagEdge {
                source: branch.source,
                target: id.clone(),
                source_exit_fog: branch.exit,
                target_entry_fog: entry_ref,
            });
        }
        state.branches = vec![Branch {
            source: id,
            exit: exit_ref,
        }];
    }
    Ok(())
}

fn place_end(
    dag: &mut Dag,
    state: &mut GenerationState,
    pool: &ClusterPool,
    config: &GenConfig,
    total_layers: usize,
    rng: &mut StdRng,
) -> Result<(), GenerationError> {
    let branches = std::mem::take(&mut state.branches);
    let num_in = branches.len();
    if num_in == 0 {
        return Err(GenerationError::BranchesExhausted {
            layer: total_layers + 1,
        });
    }

    let wanted = &config.structure.final_boss_candidates;
    let mut candidates: Vec<&Cluster> = if wanted.is_empty() {
        pool.of_type(ClusterType::FinalBoss)
    } else {
        let mut out: Vec<&Cluster> = Vec::new();
        for zone in wanted {
            for cluster in pool.clusters_with_zone(zone) {
                if matches!(
                    cluster.kind,
                    ClusterType::FinalBoss | ClusterType::MajorBoss
                ) && !out.iter().any(|c| c.id == cluster.id)
                {
                    out.push(cluster);
                }
            }
        }
        out
    };

    candidates.retain(|c| c.zones_disjoint(&state.used_zones) && !c.entry_fogs.is_empty());
    candidates.shuffle(rng);
    let cluster = candidates
        .into_iter()
        .find(|c| num_in == 1 || c.allow_shared_entrance || c.entry_fogs.len() >= num_in)
        .ok_or(GenerationError::EndClusterUnavailable)?;

    let layer = total_layers + 1;
    if num_in == 1 || cluster.allow_shared_entrance {
        let mut entries = cluster.entry_fogs.clone();
        entries.shuffle(rng);
        let entry_ref = FogRef::from(&entries[0]);
        let id = commit_node(
            dag,
            state,
            cluster,
            layer,
            28,
            vec![entry_ref.clone()],
            Vec::new(),
        );
        for branch in branches {
            dag.add_edge(DagEdge {
                source: branch.source,
                target: id.clone(),
                source_exit_fog: branch.exit,
                target_entry_fog: entry_ref.clone(),
            });
        }
        dag.end_id = id;
    } else {
        let mut entries = cluster.entry_fogs.clone();
        entries.shuffle(rng);
        let entry_refs: Vec<FogRef> = entries.iter().take(num_in).map(FogRef::from).collect();
        let id = commit_node(dag, state, cluster, layer, 28, entry_refs.clone(), Vec::new());
        for (branch, entry_ref) in branches.into_iter().zip(entry_refs) {
            dag.add_edge(DagEdge {
                source: branch.source,
                target: id.clone(),
                source_exit_fog: branch.exit,
                target_entry_fog: entry_ref,
            });
        }
        dag.end_id = id;
    }
    Ok(())
}

/// Build one DAG for the given seed. Deterministic: the seed fixes the
/// plan, every candidate choice, and every fog assignment.
pub fn generate_dag(
    config: &GenConfig,
    pool: &ClusterPool,
    seed: u64,
) -> Result<Dag, GenerationError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let plan = plan_layers(&config.requirements, &config.structure, &mut rng);
    let total_layers = plan.len();
    debug!(seed, layers = total_layers, "layer plan ready");

    let mut dag = Dag::new(seed);
    let mut state = GenerationState::default();
    let max_parallel = config.structure.max_parallel_paths;

    place_start(&mut dag, &mut state, pool, config, &mut rng)?;

    for (idx, &kind) in plan.iter().enumerate() {
        let layer = idx + 1;
        let tier = tier_for(idx, total_layers);
        if state.branches.is_empty() {
            return Err(GenerationError::BranchesExhausted { layer });
        }

        let candidates = compatible_candidates(pool, kind, &state.used_zones);
        let action = decide_action(
            state.branches.len(),
            &candidates,
            idx,
            total_layers,
            max_parallel,
        );
        debug!(layer, %kind, ?action, branches = state.branches.len(), "executing layer");

        match action {
            LayerAction::Passant => {
                run_passant(&mut dag, &mut state, pool, kind, layer, tier, &mut rng)?
            }
            LayerAction::Split => run_split(
                &mut dag,
                &mut state,
                pool,
                kind,
                layer,
                tier,
                max_parallel,
                &mut rng,
            )?,
            LayerAction::Merge => {
                run_merge(&mut dag, &mut state, pool, kind, layer, tier, &mut rng)?
            }
        }
    }

    place_end(&mut dag, &mut state, pool, config, total_layers, &mut rng)?;
    Ok(dag)
}

/// Generate with the configured seed, or keep rerolling fresh seeds when
/// the config asks for auto-reroll (`seed == 0`).
pub fn generate_with_retry(
    config: &GenConfig,
    pool: &ClusterPool,
    max_attempts: usize,
) -> Result<Dag, GenerationError> {
    if config.seed != 0 {
        return generate_dag(config, pool, config.seed);
    }

    let mut seeder = StdRng::from_entropy();
    let mut last_error = None;
    for attempt in 1..=max_attempts {
        let seed = loop {
            let s: u64 = seeder.gen();
            if s != 0 {
                break s;
            }
        };
        match generate_dag(config, pool, seed) {
            Ok(dag) => {
                info!(attempt, seed, "generation succeeded");
                return Ok(dag);
            }
            Err(err) => {
                debug!(attempt, seed, %err, "attempt failed");
                last_error = Some(err);
            }
        }
    }
    Err(last_error.unwrap_or(GenerationError::EndClusterUnavailable))
}
