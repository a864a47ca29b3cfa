use std::fmt::Debug;
use std::hash::Hash;

use tracing::info;

use super::greedy::{cluster_by_distance_centroid, cluster_by_distance_seed};
use super::neighborhood::cluster_by_neighborhood;
use super::point::{Cluster, PointTable};
use crate::error::Result;

/// Default clustering radius in kilometers
pub const MIN_CLUSTER_DISTANCE: f64 = 50.0;

/// Radius used when collapsing nodes of one AS into a single PoP
pub const NODE_GROUP_DISTANCE: f64 = 20.0;

/// Which clustering algorithm a caller wants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterStrategy {
    /// Greedy growth around a recomputed centroid
    Centroid,
    /// Single pass against fixed seed points
    Seed,
    /// kd-tree neighborhood growth for large inputs
    Neighborhood { min_points: usize },
}

impl ClusterStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            ClusterStrategy::Centroid => "centroid",
            ClusterStrategy::Seed => "seed",
            ClusterStrategy::Neighborhood { .. } => "neighborhood",
        }
    }
}

/// Runs the chosen strategy over `point_ids`
pub fn cluster_points<I>(
    strategy: ClusterStrategy,
    point_ids: &[I],
    point_table: &PointTable<I>,
    min_distance: f64,
) -> Result<Vec<Cluster<I>>>
where
    I: Clone + Eq + Hash + Debug,
{
    let clusters = match strategy {
        ClusterStrategy::Centroid => {
            cluster_by_distance_centroid(point_ids, point_table, min_distance)?
        }
        ClusterStrategy::Seed => cluster_by_distance_seed(point_ids, point_table, min_distance)?,
        ClusterStrategy::Neighborhood { min_points } => {
            cluster_by_neighborhood(point_ids, point_table, min_distance, min_points)?
        }
    };

    if point_ids.len() > 1 {
        info!(
            "{} clustering at {:.1} km: {} points -> {} clusters",
            strategy.name(),
            min_distance,
            point_ids.len(),
            clusters.len()
        );
    }
    Ok(clusters)
}
