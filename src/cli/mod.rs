// CLI command definitions

pub mod cmds;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// SpeedFog - seeded fog-gate run generator
///
/// Derives zone clusters from a fog database, then builds a short,
/// balanced, randomized run as a layered DAG of fog-gate connections.
#[derive(Parser, Debug, Clone)]
#[command(name = "speedfog")]
#[command(author, version, about)]
pub struct Cli {
    /// Verbose logging (info level)
    #[arg(global = true, short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Derive the canonical cluster document from a fog database
    ClusterBuild(ClusterBuildArgs),

    /// Generate a run DAG from a cluster document
    Generate(GenerateArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct ClusterBuildArgs {
    /// Fog database (TOML)
    pub fog_db: PathBuf,

    /// Output cluster document (JSON)
    pub out: PathBuf,

    /// Cluster metadata document (TOML): weights and reuse overrides
    #[arg(long)]
    pub metadata: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct GenerateArgs {
    /// Generation config (TOML); defaults apply when omitted
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Cluster document to draw from
    #[arg(long, default_value = "clusters.json")]
    pub clusters: PathBuf,

    /// Override the configured seed (0 keeps auto-reroll)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Output directory
    #[arg(long, default_value = ".")]
    pub out: PathBuf,

    /// Also write the plain-text spoiler
    #[arg(long)]
    pub spoiler: bool,

    /// Attempt cap for auto-reroll
    #[arg(long, default_value_t = 200)]
    pub max_attempts: usize,
}
