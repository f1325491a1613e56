//! Cluster derivation from the fog database
//!
//! Builds the world-connection graph, computes guaranteed-reachability
//! closures per area, classifies entry/exit fogs, enriches clusters with
//! type/weight metadata, and rejects clusters the generator could never
//! use. The result is canonical: a given database and metadata document
//! always produce the same cluster set, bit for bit.

use super::{Cluster, ClusterDoc, ClusterFog, ClusterMetadata, ClusterType, MiniDungeonKind};
use crate::fogdb::{Area, FogDb};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Bfs;
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ClusterBuildError {
    #[error("fog database contains no areas")]
    EmptyDatabase,

    #[error("cannot infer cluster type for principal zone '{zone}'")]
    TypeInference { zone: String },
}

/// Guaranteed world edge. Drop edges are traversable but one-way, which
/// matters for entry-zone classification.
#[derive(Debug, Clone, Copy)]
struct WorldEdge {
    drop: bool,
}

/// The world-connection graph over area names (step A).
struct WorldGraph {
    graph: DiGraph<String, WorldEdge>,
    index: HashMap<String, NodeIndex>,
}

impl WorldGraph {
    fn build(db: &FogDb) -> Self {
        let mut graph = DiGraph::new();
        let mut index = HashMap::new();

        for name in db.areas.keys() {
            let idx = graph.add_node(name.clone());
            index.insert(name.clone(), idx);
        }

        for (name, area) in &db.areas {
            let from = index[name];
            for conn in &area.connections {
                if !conn.is_guaranteed() {
                    // Zone-conditioned and ungranted-item edges play no
                    // part in clustering.
                    continue;
                }
                let Some(&to) = index.get(&conn.to) else {
                    continue;
                };
                graph.add_edge(from, to, WorldEdge { drop: conn.is_drop() });
            }
        }

        WorldGraph { graph, index }
    }

    /// Closure of `area` under outgoing guaranteed edges, sorted.
    fn closure(&self, area: &str) -> Vec<String> {
        let start = self.index[area];
        let mut members = BTreeSet::new();
        let mut bfs = Bfs::new(&self.graph, start);
        while let Some(node) = bfs.next(&self.graph) {
            members.insert(self.graph[node].clone());
        }
        members.into_iter().collect()
    }

    /// Whether a drop edge `from -> to` exists.
    fn has_drop_edge(&self, from: &str, to: &str) -> bool {
        let (Some(&a), Some(&b)) = (self.index.get(from), self.index.get(to)) else {
            return false;
        };
        self.graph
            .edges_connecting(a, b)
            .any(|e| e.weight().drop)
    }
}

/// An area may seed a cluster unless it is filtered out (step B).
fn is_eligible(db: &FogDb, area: &Area) -> bool {
    for tag in ["overworld", "dlc", "unused", "crawlonly"] {
        if area.has_tag(tag) {
            return false;
        }
    }
    if area.has_tag("trivial") && !db.zone_has_fogs(&area.name) {
        return false;
    }
    true
}

/// Entry zones: members with no incoming drop edge from another member
/// (step C). A zone you can only fall into cannot host an entrance.
fn entry_zones(world: &WorldGraph, zones: &[String]) -> Vec<String> {
    zones
        .iter()
        .filter(|zone| {
            !zones
                .iter()
                .any(|other| other != *zone && world.has_drop_edge(other, zone))
        })
        .cloned()
        .collect()
}

/// Collect entry fogs for one zone: its bidirectional fogs and B-side
/// unique fogs, in fog-definition order.
fn zone_entry_fogs(db: &FogDb, zone: &str, out: &mut Vec<ClusterFog>) {
    for fog in &db.fogs {
        if fog.is_norandom() {
            continue;
        }
        if fog.is_unique() {
            if fog.b_side == zone {
                out.push(ClusterFog::unique(&fog.name, zone));
            }
        } else if fog.touches(zone) {
            out.push(ClusterFog::new(&fog.name, zone));
        }
    }
}

/// Collect exit fogs for one zone: its bidirectional fogs and A-side
/// unique fogs, in fog-definition order.
fn zone_exit_fogs(db: &FogDb, zone: &str, out: &mut Vec<ClusterFog>) {
    for fog in &db.fogs {
        if fog.is_norandom() {
            continue;
        }
        if fog.is_unique() {
            if fog.a_side == zone {
                out.push(ClusterFog::unique(&fog.name, zone));
            }
        } else if fog.touches(zone) {
            out.push(ClusterFog::new(&fog.name, zone));
        }
    }
}

fn mini_kind_for_map(map: &str) -> Option<MiniDungeonKind> {
    if map.starts_with("m30") {
        Some(MiniDungeonKind::Catacomb)
    } else if map.starts_with("m31") {
        Some(MiniDungeonKind::Cave)
    } else if map.starts_with("m32") {
        Some(MiniDungeonKind::Tunnel)
    } else if map.starts_with("m41") {
        Some(MiniDungeonKind::Gaol)
    } else {
        None
    }
}

/// Type derivation (step D).
fn derive_type(
    db: &FogDb,
    principal: &Area,
    zones: &[String],
) -> Result<(ClusterType, Option<MiniDungeonKind>), ClusterBuildError> {
    let any_legacy = zones
        .iter()
        .filter_map(|z| db.area(z))
        .any(|a| a.has_tag("legacy"));
    if any_legacy {
        return Ok((ClusterType::LegacyDungeon, None));
    }

    if let Some(kind) = principal.primary_map().and_then(mini_kind_for_map) {
        return Ok((ClusterType::MiniDungeon, Some(kind)));
    }

    // Explicit tags win over the bare defeat-flag check: tagged bosses and
    // final areas carry defeat flags too.
    if principal.has_tag("start") {
        return Ok((ClusterType::Start, None));
    }
    if principal.has_tag("final") {
        return Ok((ClusterType::FinalBoss, None));
    }
    if principal.has_tag("boss") {
        return Ok((ClusterType::MajorBoss, None));
    }

    if principal.defeat_flag.is_some() && !principal.has_tag("minidungeon") {
        return Ok((ClusterType::BossArena, None));
    }

    Err(ClusterBuildError::TypeInference {
        zone: principal.name.clone(),
    })
}

/// Four hex digits derived from the sorted zone set (step F).
fn short_hash(zones: &[String]) -> String {
    let mut hasher = Sha256::new();
    for zone in zones {
        hasher.update(zone.as_bytes());
        hasher.update(b"\n");
    }
    let digest = hasher.finalize();
    format!("{:02x}{:02x}", digest[0], digest[1])
}

/// Derive the canonical cluster set from a loaded fog database.
pub fn build_clusters(
    db: &FogDb,
    meta: &ClusterMetadata,
) -> Result<Vec<Cluster>, ClusterBuildError> {
    if db.areas.is_empty() {
        return Err(ClusterBuildError::EmptyDatabase);
    }

    // Metadata ships separately from the database; a stale zone entry is
    // worth a note but not a failure.
    for zone in meta.known_zones() {
        if !db.areas.contains_key(zone) {
            warn!(zone, "metadata references unknown zone");
        }
    }

    let world = WorldGraph::build(db);

    let mut seen_zone_sets: HashSet<Vec<String>> = HashSet::new();
    let mut clusters = Vec::new();
    let mut rejected = 0usize;

    // Areas iterate in sorted order, so the first principal to claim a zone
    // set is deterministic.
    for (name, area) in &db.areas {
        if !is_eligible(db, area) {
            continue;
        }

        let zones = world.closure(name);
        if !seen_zone_sets.insert(zones.clone()) {
            continue;
        }

        let principal_name = zones[0].clone();
        let principal = db.area(&principal_name).unwrap_or(area);

        let entries = entry_zones(&world, &zones);
        let mut entry_fogs = Vec::new();
        for zone in &entries {
            zone_entry_fogs(db, zone, &mut entry_fogs);
        }
        let mut exit_fogs = Vec::new();
        for zone in &zones {
            zone_exit_fogs(db, zone, &mut exit_fogs);
        }

        let (kind, subtype) = derive_type(db, principal, &zones)?;

        let weight: u32 = zones.iter().map(|z| meta.zone_weight(z, kind)).sum();

        let defeat_flag = zones
            .iter()
            .filter_map(|z| db.area(z))
            .find_map(|a| a.defeat_flag);

        let mut maps: Vec<String> = Vec::new();
        for zone in &zones {
            if let Some(a) = db.area(zone) {
                for map in &a.maps {
                    if !maps.contains(map) {
                        maps.push(map.clone());
                    }
                }
            }
        }

        let allow_shared_entrance = zones
            .iter()
            .find_map(|z| meta.shared_entrance_override(z))
            .unwrap_or(entry_fogs.len() >= 2);

        let id = format!("{}_{}", principal_name, short_hash(&zones));
        let cluster = Cluster {
            id,
            zones,
            kind,
            subtype,
            maps,
            weight,
            entry_fogs,
            exit_fogs,
            defeat_flag,
            allow_shared_entrance,
            allow_entry_as_exit: false,
        };

        // Step E: a cluster the generator can never traverse is dropped.
        if cluster.entry_fogs.is_empty() || cluster.exit_fogs.is_empty() || !cluster.is_usable() {
            debug!(id = %cluster.id, "rejected cluster with no usable traversal");
            rejected += 1;
            continue;
        }

        clusters.push(cluster);
    }

    info!(
        kept = clusters.len(),
        rejected,
        areas = db.areas.len(),
        "cluster derivation complete"
    );
    Ok(clusters)
}

/// Build and package the cluster document for emission.
pub fn build_cluster_doc(
    db: &FogDb,
    meta: &ClusterMetadata,
    generated_from: &str,
) -> Result<ClusterDoc, ClusterBuildError> {
    let clusters = build_clusters(db, meta)?;
    Ok(ClusterDoc::new(generated_from, clusters))
}
