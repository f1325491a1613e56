//! Path enumeration over the generated DAG
//!
//! Depth-first search from the start node to the end node. Layers increase
//! strictly along every edge, so there are no cycles to guard against and
//! every traversal terminates.

use super::{Dag, NodeId};
use serde::Serialize;

/// One start-to-end route through the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunPath {
    /// Node ids in traversal order.
    pub nodes: Vec<NodeId>,
    /// Sum of member cluster weights.
    pub weight: u32,
}

impl RunPath {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Enumerate every start-to-end path, in successor insertion order.
pub fn enumerate_paths(dag: &Dag) -> Vec<RunPath> {
    let mut paths = Vec::new();
    if dag.node(&dag.start_id).is_none() || dag.node(&dag.end_id).is_none() {
        return paths;
    }
    let mut current = vec![dag.start_id.clone()];
    dfs(dag, &dag.start_id, &mut current, &mut paths);
    paths
}

fn dfs(dag: &Dag, at: &str, current: &mut Vec<NodeId>, paths: &mut Vec<RunPath>) {
    if at == dag.end_id {
        let weight = current
            .iter()
            .map(|id| dag.node(id).map(|n| n.cluster.weight).unwrap_or(0))
            .sum();
        paths.push(RunPath {
            nodes: current.clone(),
            weight,
        });
        return;
    }
    for succ in dag.successors(at) {
        current.push(succ.clone());
        dfs(dag, succ, current, paths);
        current.pop();
    }
}
