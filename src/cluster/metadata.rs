//! Cluster metadata document
//!
//! Ships separately from the fog database: per-type default weights and
//! per-zone overrides (weight, shared-entrance policy).

use super::ClusterType;
use serde::Deserialize;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("malformed cluster metadata: {0}")]
    Parse(String),
}

/// Built-in weight defaults, used when the metadata document has no entry
/// for a type.
fn builtin_default(kind: ClusterType) -> u32 {
    match kind {
        ClusterType::Start => 0,
        ClusterType::FinalBoss => 0,
        ClusterType::MajorBoss => 15,
        ClusterType::LegacyDungeon => 25,
        ClusterType::BossArena => 8,
        ClusterType::MiniDungeon => 10,
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ZoneOverride {
    #[serde(default)]
    pub weight: Option<u32>,
    #[serde(default)]
    pub allow_shared_entrance: Option<bool>,
}

/// Parsed metadata: `defaults.<type> = weight` and `zones.<name>.*`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClusterMetadata {
    #[serde(default)]
    defaults: BTreeMap<String, u32>,
    #[serde(default)]
    zones: BTreeMap<String, ZoneOverride>,
}

impl ClusterMetadata {
    pub fn parse(text: &str) -> Result<Self, MetadataError> {
        toml::from_str(text).map_err(|e| MetadataError::Parse(e.to_string()))
    }

    /// Weight contribution of a single member zone.
    pub fn zone_weight(&self, zone: &str, kind: ClusterType) -> u32 {
        if let Some(w) = self.zones.get(zone).and_then(|z| z.weight) {
            return w;
        }
        self.defaults
            .get(kind.label())
            .copied()
            .unwrap_or_else(|| builtin_default(kind))
    }

    /// Per-zone shared-entrance override, if one is declared.
    pub fn shared_entrance_override(&self, zone: &str) -> Option<bool> {
        self.zones.get(zone).and_then(|z| z.allow_shared_entrance)
    }

    /// Zones named in the metadata, for unknown-zone diagnostics.
    pub fn known_zones(&self) -> impl Iterator<Item = &str> {
        self.zones.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[defaults]
mini_dungeon = 12
legacy_dungeon = 30

[zones.stormveil]
weight = 40

[zones.gaol_cell]
allow_shared_entrance = false
"#;

    #[test]
    fn test_zone_weight_override() {
        let meta = ClusterMetadata::parse(SAMPLE).unwrap();
        assert_eq!(meta.zone_weight("stormveil", ClusterType::LegacyDungeon), 40);
        assert_eq!(meta.zone_weight("other", ClusterType::LegacyDungeon), 30);
        assert_eq!(meta.zone_weight("other", ClusterType::MiniDungeon), 12);
    }

    #[test]
    fn test_builtin_defaults() {
        let meta = ClusterMetadata::default();
        assert_eq!(meta.zone_weight("anything", ClusterType::Start), 0);
        assert_eq!(meta.zone_weight("anything", ClusterType::MiniDungeon), 10);
    }

    #[test]
    fn test_shared_entrance_override() {
        let meta = ClusterMetadata::parse(SAMPLE).unwrap();
        assert_eq!(meta.shared_entrance_override("gaol_cell"), Some(false));
        assert_eq!(meta.shared_entrance_override("stormveil"), None);
    }

    #[test]
    fn test_malformed() {
        assert!(ClusterMetadata::parse("[defaults\nx=").is_err());
    }
}
