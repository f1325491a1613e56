// SpeedFog: seeded fog-gate run generator
//
// Library surface for downstream tooling: load the fog database, derive
// clusters, generate and validate a run DAG, emit the graph document.

#![allow(dead_code)]

pub mod cluster;
pub mod config;
pub mod dag;
pub mod fogdb;

pub use cluster::{build_cluster_doc, build_clusters, ClusterDoc, ClusterMetadata, ClusterPool};
pub use config::GenConfig;
pub use dag::{
    analyze_balance, build_graph_doc, enumerate_paths, generate_dag, generate_with_retry,
    render_spoiler, validate_dag, Dag, GraphDoc,
};
pub use fogdb::{load_fogdb, FogDb};
