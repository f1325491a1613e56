//! Command implementations
//!
//! Thin glue over the library pipeline: read documents, run the stage,
//! write results. Warnings go to stderr and never change the exit code;
//! any error propagates and exits 1.

use super::{ClusterBuildArgs, GenerateArgs};
use crate::cluster::{build_cluster_doc, ClusterDoc, ClusterMetadata, ClusterPool};
use crate::config::GenConfig;
use crate::dag::{
    analyze_balance, build_graph_doc, emit::graph_doc_to_json, enumerate_paths,
    generate_with_retry, render_spoiler, validate_dag,
};
use crate::fogdb::load_fogdb;
use anyhow::{Context, Result};
use std::fs;
use tracing::info;

pub fn cluster_build(args: &ClusterBuildArgs) -> Result<()> {
    let text = fs::read_to_string(&args.fog_db)
        .with_context(|| format!("reading fog database {}", args.fog_db.display()))?;
    let db = load_fogdb(&text)?;

    let meta = match &args.metadata {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading metadata {}", path.display()))?;
            ClusterMetadata::parse(&text)?
        }
        None => ClusterMetadata::default(),
    };

    let generated_from = args
        .fog_db
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| args.fog_db.display().to_string());
    let doc = build_cluster_doc(&db, &meta, &generated_from)?;

    let mut json = serde_json::to_string_pretty(&doc)?;
    json.push('\n');
    fs::write(&args.out, json)
        .with_context(|| format!("writing cluster document {}", args.out.display()))?;

    println!(
        "{} clusters from {} areas -> {}",
        doc.clusters.len(),
        db.areas.len(),
        args.out.display()
    );
    Ok(())
}

pub fn generate(args: &GenerateArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            GenConfig::parse(&text)?
        }
        None => GenConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    let text = fs::read_to_string(&args.clusters)
        .with_context(|| format!("reading cluster document {}", args.clusters.display()))?;
    let cluster_doc: ClusterDoc =
        serde_json::from_str(&text).context("parsing cluster document")?;
    let pool = ClusterPool::from_doc(cluster_doc)?;

    config.validate()?;
    config.validate_against_pool(&pool)?;
    info!(clusters = pool.len(), seed = config.seed, "pool loaded");

    let dag = generate_with_retry(&config, &pool, args.max_attempts)?;
    let paths = enumerate_paths(&dag);

    let report = validate_dag(&dag, &paths, &config);
    for warning in &report.warnings {
        eprintln!("warning: {warning}");
    }
    for error in &report.errors {
        eprintln!("error: {error}");
    }
    report.ensure_valid()?;

    let balance = analyze_balance(&paths, &config.budget);

    fs::create_dir_all(&args.out)
        .with_context(|| format!("creating output directory {}", args.out.display()))?;
    let graph_doc = build_graph_doc(&dag, &paths);
    let graph_path = args.out.join("graph.json");
    fs::write(&graph_path, graph_doc_to_json(&graph_doc))
        .with_context(|| format!("writing {}", graph_path.display()))?;

    if args.spoiler {
        let spoiler_path = args.out.join("spoiler.txt");
        fs::write(&spoiler_path, render_spoiler(&dag, &paths, &balance))
            .with_context(|| format!("writing {}", spoiler_path.display()))?;
    }

    println!(
        "seed {} | {} layers | {} nodes | {} paths | weight {}..{} (avg {:.1})",
        dag.seed,
        graph_doc.total_layers,
        graph_doc.total_nodes,
        graph_doc.total_paths,
        balance.min,
        balance.max,
        balance.avg,
    );
    Ok(())
}
