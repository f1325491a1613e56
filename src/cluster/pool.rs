//! In-memory cluster index
//!
//! Read-only view over built clusters: lookup by id, selection by type in
//! id order (the stable pre-shuffle order the generator relies on).

use super::{Cluster, ClusterDoc, ClusterType};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("duplicate cluster id '{0}'")]
    DuplicateId(String),
}

#[derive(Debug, Clone)]
pub struct ClusterPool {
    clusters: Vec<Cluster>,
    by_id: HashMap<String, usize>,
    by_type: HashMap<ClusterType, Vec<usize>>,
}

impl ClusterPool {
    pub fn new(mut clusters: Vec<Cluster>) -> Result<Self, PoolError> {
        clusters.sort_by(|a, b| a.id.cmp(&b.id));

        let mut by_id = HashMap::with_capacity(clusters.len());
        let mut by_type: HashMap<ClusterType, Vec<usize>> = HashMap::new();
        for (i, cluster) in clusters.iter().enumerate() {
            if by_id.insert(cluster.id.clone(), i).is_some() {
                return Err(PoolError::DuplicateId(cluster.id.clone()));
            }
            by_type.entry(cluster.kind).or_default().push(i);
        }

        Ok(Self {
            clusters,
            by_id,
            by_type,
        })
    }

    pub fn from_doc(doc: ClusterDoc) -> Result<Self, PoolError> {
        Self::new(doc.clusters)
    }

    /// Re-emit the canonical document. Round-trips exactly, modulo the
    /// schema version stamped at emission time.
    pub fn to_doc(&self, generated_from: &str) -> ClusterDoc {
        ClusterDoc::new(generated_from, self.clusters.clone())
    }

    pub fn get(&self, id: &str) -> Option<&Cluster> {
        self.by_id.get(id).map(|&i| &self.clusters[i])
    }

    /// Clusters of one type, in id order.
    pub fn of_type(&self, kind: ClusterType) -> Vec<&Cluster> {
        self.by_type
            .get(&kind)
            .map(|ids| ids.iter().map(|&i| &self.clusters[i]).collect())
            .unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cluster> {
        self.clusters.iter()
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Whether any cluster claims the given zone.
    pub fn contains_zone(&self, zone: &str) -> bool {
        self.clusters.iter().any(|c| c.contains_zone(zone))
    }

    /// Clusters containing the given zone (used to resolve final-boss
    /// candidate zone names).
    pub fn clusters_with_zone(&self, zone: &str) -> Vec<&Cluster> {
        self.clusters
            .iter()
            .filter(|c| c.contains_zone(zone))
            .collect()
    }
}
