//! Run DAG model and construction pipeline
//!
//! A generated run is a directed acyclic graph of placed clusters: nodes
//! carry the cluster plus its layer/tier position, edges carry the exact
//! fog gates wired on both ends. Layers increase strictly along every
//! edge, so the graph is acyclic by construction.

pub mod balance;
pub mod emit;
pub mod generator;
pub mod layers;
pub mod paths;
pub mod validate;

pub use balance::{analyze_balance, BalanceReport};
pub use emit::{build_graph_doc, render_spoiler, GraphDoc};
pub use generator::{generate_dag, generate_with_retry, GenerationError};
pub use layers::plan_layers;
pub use paths::{enumerate_paths, RunPath};
pub use validate::{validate_dag, ValidationReport};

use crate::cluster::{Cluster, ClusterFog};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type NodeId = String;

/// One side of a fog gate as wired into the DAG.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FogRef {
    pub fog_id: String,
    pub zone: String,
}

impl From<&ClusterFog> for FogRef {
    fn from(fog: &ClusterFog) -> Self {
        Self {
            fog_id: fog.fog_id.clone(),
            zone: fog.zone.clone(),
        }
    }
}

/// A placed cluster.
///
/// `entry_fogs` has length 1 except on distinct-entrance merge nodes;
/// `exit_fogs` is the cluster's exit set minus consumed entries, in the
/// shuffle order fixed at placement time.
#[derive(Debug, Clone)]
pub struct DagNode {
    pub id: NodeId,
    pub cluster: Cluster,
    pub layer: usize,
    pub tier: u8,
    pub entry_fogs: Vec<FogRef>,
    pub exit_fogs: Vec<FogRef>,
}

/// A wired connection between two placed clusters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DagEdge {
    pub source: NodeId,
    pub target: NodeId,
    pub source_exit_fog: FogRef,
    pub target_entry_fog: FogRef,
}

/// The generated run graph. Nodes keep insertion order.
#[derive(Debug, Clone)]
pub struct Dag {
    pub seed: u64,
    nodes: Vec<DagNode>,
    index: HashMap<NodeId, usize>,
    pub edges: Vec<DagEdge>,
    pub start_id: NodeId,
    pub end_id: NodeId,
}

impl Dag {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            nodes: Vec::new(),
            index: HashMap::new(),
            edges: Vec::new(),
            start_id: NodeId::new(),
            end_id: NodeId::new(),
        }
    }

    /// Insert a node. Node ids are cluster ids, and zone exclusivity makes
    /// them unique per run; a duplicate is a generator bug.
    pub fn insert_node(&mut self, node: DagNode) {
        debug_assert!(!self.index.contains_key(&node.id));
        self.index.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
    }

    pub fn add_edge(&mut self, edge: DagEdge) {
        self.edges.push(edge);
    }

    pub fn node(&self, id: &str) -> Option<&DagNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &DagNode> {
        self.nodes.iter()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Successor node ids in edge insertion order, deduplicated (parallel
    /// edges from duplicated start exits would otherwise double-count
    /// paths).
    pub fn successors(&self, id: &str) -> Vec<&NodeId> {
        let mut out: Vec<&NodeId> = Vec::new();
        for edge in &self.edges {
            if edge.source == id && !out.contains(&&edge.target) {
                out.push(&edge.target);
            }
        }
        out
    }

    pub fn predecessors(&self, id: &str) -> Vec<&NodeId> {
        let mut out: Vec<&NodeId> = Vec::new();
        for edge in &self.edges {
            if edge.target == id && !out.contains(&&edge.source) {
                out.push(&edge.source);
            }
        }
        out
    }

    /// Incoming edges of a node, in insertion order.
    pub fn in_edges(&self, id: &str) -> Vec<&DagEdge> {
        self.edges.iter().filter(|e| e.target == id).collect()
    }

    /// Highest layer present (the end node's layer on a complete DAG).
    pub fn max_layer(&self) -> usize {
        self.nodes.iter().map(|n| n.layer).max().unwrap_or(0)
    }

    /// Total distinct zones claimed by placed clusters.
    pub fn total_zones(&self) -> usize {
        self.nodes.iter().map(|n| n.cluster.zones.len()).sum()
    }
}
