//! Generation configuration
//!
//! Explicit records for every knob the generator reads. Unknown fields are
//! rejected at parse time, and numeric ranges are validated before any
//! generation attempt runs.

use crate::cluster::{ClusterPool, ClusterType};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("malformed config: {0}")]
    Parse(String),

    #[error("invalid value for {field}: {detail}")]
    Range { field: &'static str, detail: String },

    #[error("major_boss_ratio must be within [0, 1], got {0}")]
    Ratio(f64),

    #[error("unknown zone '{0}' in final_boss_candidates")]
    UnknownZone(String),
}

/// Target path weight and allowed deviation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BudgetConfig {
    pub total_weight: u32,
    pub tolerance: u32,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            total_weight: 60,
            tolerance: 15,
        }
    }
}

impl BudgetConfig {
    pub fn min_weight(&self) -> u32 {
        self.total_weight.saturating_sub(self.tolerance)
    }

    pub fn max_weight(&self) -> u32 {
        self.total_weight + self.tolerance
    }
}

/// Minimum cluster counts the run must contain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RequirementsConfig {
    pub legacy_dungeons: usize,
    pub mini_dungeons: usize,
    pub bosses: usize,
}

impl Default for RequirementsConfig {
    fn default() -> Self {
        Self {
            legacy_dungeons: 1,
            mini_dungeons: 2,
            bosses: 1,
        }
    }
}

/// Forced type of the first intermediate layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FirstLayerType {
    LegacyDungeon,
    MiniDungeon,
    BossArena,
    MajorBoss,
}

impl FirstLayerType {
    pub fn cluster_type(&self) -> ClusterType {
        match self {
            FirstLayerType::LegacyDungeon => ClusterType::LegacyDungeon,
            FirstLayerType::MiniDungeon => ClusterType::MiniDungeon,
            FirstLayerType::BossArena => ClusterType::BossArena,
            FirstLayerType::MajorBoss => ClusterType::MajorBoss,
        }
    }
}

/// Layer structure of the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StructureConfig {
    pub min_layers: usize,
    pub max_layers: usize,
    pub max_parallel_paths: usize,
    pub major_boss_ratio: f64,
    pub first_layer_type: Option<FirstLayerType>,
    /// Zones whose clusters may host the end node. Empty means the default
    /// singleton: every final-boss cluster in the pool.
    pub final_boss_candidates: Vec<String>,
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            min_layers: 4,
            max_layers: 6,
            max_parallel_paths: 2,
            major_boss_ratio: 0.2,
            first_layer_type: None,
            final_boss_candidates: Vec::new(),
        }
    }
}

/// The full generation configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenConfig {
    /// 0 requests auto-reroll: the retry loop draws fresh seeds.
    pub seed: u64,
    pub budget: BudgetConfig,
    pub requirements: RequirementsConfig,
    pub structure: StructureConfig,
}

impl GenConfig {
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let config: GenConfig =
            toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Range checks that need no pool.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.structure;
        if s.min_layers == 0 {
            return Err(ConfigError::Range {
                field: "structure.min_layers",
                detail: "must be at least 1".to_string(),
            });
        }
        if s.max_layers < s.min_layers {
            return Err(ConfigError::Range {
                field: "structure.max_layers",
                detail: format!("{} is below min_layers {}", s.max_layers, s.min_layers),
            });
        }
        if s.max_parallel_paths == 0 {
            return Err(ConfigError::Range {
                field: "structure.max_parallel_paths",
                detail: "must be at least 1".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&s.major_boss_ratio) {
            return Err(ConfigError::Ratio(s.major_boss_ratio));
        }
        Ok(())
    }

    /// Checks that need the cluster pool.
    pub fn validate_against_pool(&self, pool: &ClusterPool) -> Result<(), ConfigError> {
        for zone in &self.structure.final_boss_candidates {
            if !pool.contains_zone(zone) {
                return Err(ConfigError::UnknownZone(zone.clone()));
            }
        }
        Ok(())
    }
}
