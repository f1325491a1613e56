// SpeedFog: seeded fog-gate run generator
//
// Derives zone clusters from a fog database and constructs a short,
// balanced, randomized run as a layered DAG of fog-gate connections.
// A separate binary rewriter consumes the emitted graph document.

#![allow(dead_code)]

use anyhow::Result;
use clap::Parser;

mod cli;
mod cluster;
mod config;
mod dag;
mod fogdb;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::ClusterBuild(args) => cli::cmds::cluster_build(args),
        Commands::Generate(args) => cli::cmds::generate(args),
    }
}
