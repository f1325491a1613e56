//! Cluster model and canonical cluster document
//!
//! A cluster is a maximal group of zones already joined by guaranteed world
//! geometry. Clusters are the atomic unit of DAG nodes: the generator picks
//! whole clusters, and zone exclusivity is enforced at cluster granularity.

pub mod builder;
pub mod metadata;
pub mod pool;

pub use builder::{build_cluster_doc, build_clusters, ClusterBuildError};
pub use metadata::ClusterMetadata;
pub use pool::ClusterPool;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Cluster classification.
///
/// Behavior differences between types are small enough to branch on the tag
/// directly; mini dungeons additionally carry a size/kind subdivision in
/// [`Cluster::subtype`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterType {
    Start,
    FinalBoss,
    MajorBoss,
    LegacyDungeon,
    BossArena,
    MiniDungeon,
}

impl ClusterType {
    pub fn label(&self) -> &'static str {
        match self {
            ClusterType::Start => "start",
            ClusterType::FinalBoss => "final_boss",
            ClusterType::MajorBoss => "major_boss",
            ClusterType::LegacyDungeon => "legacy_dungeon",
            ClusterType::BossArena => "boss_arena",
            ClusterType::MiniDungeon => "mini_dungeon",
        }
    }
}

impl fmt::Display for ClusterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Mini-dungeon subdivision, derived from the primary map-id prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MiniDungeonKind {
    Catacomb,
    Cave,
    Tunnel,
    Gaol,
}

/// One side of a fog gate as seen from a cluster.
///
/// The same physical fog can appear twice in a cluster's lists when both of
/// its sides are member zones; each occurrence is a distinct doorway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterFog {
    pub fog_id: String,
    pub zone: String,
    /// One-way gate: set on A-side exits and B-side entries of `unique`
    /// fogs. Emitted only when true.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unique: bool,
}

impl ClusterFog {
    pub fn new(fog_id: impl Into<String>, zone: impl Into<String>) -> Self {
        Self {
            fog_id: fog_id.into(),
            zone: zone.into(),
            unique: false,
        }
    }

    pub fn unique(fog_id: impl Into<String>, zone: impl Into<String>) -> Self {
        Self {
            fog_id: fog_id.into(),
            zone: zone.into(),
            unique: true,
        }
    }
}

/// A derived cluster: the zone-exclusivity unit the generator places.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    /// Principal zone plus a short deterministic hash of the zone set.
    pub id: String,
    /// Member zones, sorted; the first is the principal zone.
    pub zones: Vec<String>,
    #[serde(rename = "type")]
    pub kind: ClusterType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<MiniDungeonKind>,
    /// Map identifiers spanned by member zones; the first is the primary
    /// map of the principal zone. Downstream rewriters resolve fog
    /// positions through these.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub maps: Vec<String>,
    /// Estimated completion cost, summed over member zones.
    pub weight: u32,
    pub entry_fogs: Vec<ClusterFog>,
    pub exit_fogs: Vec<ClusterFog>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defeat_flag: Option<u32>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub allow_shared_entrance: bool,
    /// Reserved. Persisted but ignored by every consumer.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub allow_entry_as_exit: bool,
}

impl Cluster {
    pub fn principal_zone(&self) -> &str {
        &self.zones[0]
    }

    pub fn primary_map(&self) -> Option<&str> {
        self.maps.first().map(String::as_str)
    }

    pub fn contains_zone(&self, zone: &str) -> bool {
        self.zones.iter().any(|z| z == zone)
    }

    /// Exit fogs remaining once `entry` is consumed.
    ///
    /// A bidirectional entry removes every exit with the same fog id (the
    /// gate is occupied by the inbound edge); a unique entry removes
    /// nothing, since unique fogs never share an id with an exit doorway of
    /// the same direction.
    pub fn exits_after_entry(&self, entry: &ClusterFog) -> Vec<ClusterFog> {
        if entry.unique {
            return self.exit_fogs.clone();
        }
        self.exit_fogs
            .iter()
            .filter(|e| e.fog_id != entry.fog_id)
            .cloned()
            .collect()
    }

    /// Exit count remaining after consuming a set of distinct entries.
    pub fn net_exit_count(&self, entries: &[&ClusterFog]) -> usize {
        self.exit_fogs
            .iter()
            .filter(|exit| {
                !entries
                    .iter()
                    .any(|entry| !entry.unique && entry.fog_id == exit.fog_id)
            })
            .count()
    }

    /// The usable-exit rule: some entry choice must leave at least one exit.
    pub fn is_usable(&self) -> bool {
        !self.entry_fogs.is_empty()
            && self
                .entry_fogs
                .iter()
                .any(|entry| !self.exits_after_entry(entry).is_empty())
    }

    /// Whether the cluster is disjoint from an already-claimed zone set.
    pub fn zones_disjoint(&self, used: &std::collections::HashSet<String>) -> bool {
        self.zones.iter().all(|z| !used.contains(z))
    }
}

/// Schema version of the cluster document.
pub const CLUSTER_DOC_VERSION: &str = "2";

/// The canonical cluster document, ordered by cluster id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterDoc {
    pub version: String,
    pub generated_from: String,
    pub clusters: Vec<Cluster>,
}

impl ClusterDoc {
    pub fn new(generated_from: impl Into<String>, mut clusters: Vec<Cluster>) -> Self {
        clusters.sort_by(|a, b| a.id.cmp(&b.id));
        Self {
            version: CLUSTER_DOC_VERSION.to_string(),
            generated_from: generated_from.into(),
            clusters,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_fixtures::simple_cluster;
    use super::*;

    #[test]
    fn test_exits_after_bidirectional_entry() {
        let c = simple_cluster("liurnia_cave", ClusterType::MiniDungeon, 10, 3);
        let entry = c.entry_fogs[0].clone();
        let exits = c.exits_after_entry(&entry);
        assert_eq!(exits.len(), 2);
        assert!(exits.iter().all(|e| e.fog_id != entry.fog_id));
    }

    #[test]
    fn test_exits_after_unique_entry() {
        let mut c = simple_cluster("gaol_cell", ClusterType::MiniDungeon, 10, 1);
        c.entry_fogs = vec![ClusterFog::unique("gaol_door", "gaol_cell")];
        let exits = c.exits_after_entry(&c.entry_fogs[0]);
        assert_eq!(exits.len(), 1);
    }

    #[test]
    fn test_usable_exit_rule() {
        // One bidirectional gate: entering consumes the only exit.
        let single = simple_cluster("arena", ClusterType::BossArena, 10, 1);
        assert!(!single.is_usable());

        let double = simple_cluster("arena", ClusterType::BossArena, 10, 2);
        assert!(double.is_usable());
    }

    #[test]
    fn test_net_exit_count() {
        let c = simple_cluster("catacomb", ClusterType::MiniDungeon, 10, 3);
        let picked: Vec<&ClusterFog> = vec![&c.entry_fogs[0], &c.entry_fogs[1]];
        assert_eq!(c.net_exit_count(&picked), 1);
    }

    #[test]
    fn test_doc_sorted_by_id() {
        let doc = ClusterDoc::new(
            "fog.toml",
            vec![
                simple_cluster("zeta", ClusterType::MiniDungeon, 10, 2),
                simple_cluster("alpha", ClusterType::MiniDungeon, 10, 2),
            ],
        );
        assert_eq!(doc.clusters[0].id, "alpha_0000");
        assert_eq!(doc.clusters[1].id, "zeta_0000");
    }

    #[test]
    fn test_reuse_flags_emitted_only_when_true() {
        let mut c = simple_cluster("alpha", ClusterType::MiniDungeon, 10, 1);
        c.allow_shared_entrance = false;
        let json = serde_json::to_string(&c).unwrap();
        assert!(!json.contains("allow_shared_entrance"));
        assert!(!json.contains("allow_entry_as_exit"));
        assert!(!json.contains("unique"));

        c.allow_shared_entrance = true;
        let json = serde_json::to_string(&c).unwrap();
        assert!(json.contains("\"allow_shared_entrance\":true"));
    }
}
