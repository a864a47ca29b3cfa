use std::fmt::Debug;
use std::hash::Hash;

use bitvec::prelude::*;
use tracing::debug;

use super::distance::{DEGREE_RAD, EARTH_R, centroid_of, resolve_points};
use super::greedy::{check_min_distance, distinct_ids, member_points};
use super::kdtree::new_kd_tree;
use super::point::{Cluster, PointTable};
use crate::error::Result;

// Density growth (DBSCAN, <http://en.wikipedia.org/wiki/DBSCAN>) with one change:
// points left as noise are emitted as singleton clusters so every input point
// lands in exactly one cluster.
//
// for each unvisited point P
//    mark P as visited
//    NeighborPts = regionQuery(P, eps)
//    if sizeof(NeighborPts) >= MinPts
//       C = next cluster, add P
//       for each point P' in NeighborPts
//          if P' is not visited
//             mark P' as visited
//             NeighborPts' = regionQuery(P', eps)
//             if sizeof(NeighborPts') >= MinPts
//                NeighborPts = NeighborPts joined with NeighborPts'
//          if P' is not yet member of any cluster
//             add P' to cluster C
// every point that is still not a member becomes its own cluster

/// Clusters points by kd-tree accelerated neighborhood growth
///
/// # Arguments
///
/// * `point_ids` - Points to cluster
/// * `point_table` - Position of every id
/// * `min_distance` - Neighborhood radius in kilometers
/// * `min_points` - Neighbors (self included) needed for a point to extend a cluster
///
/// Unlike the centroid strategy this chains: two points far apart share a
/// cluster when a path of close neighbors links them. With `min_points = 1`
/// the clusters are the connected components of the "closer than
/// `min_distance`" graph.
pub fn cluster_by_neighborhood<I>(
    point_ids: &[I],
    point_table: &PointTable<I>,
    min_distance: f64,
    min_points: usize,
) -> Result<Vec<Cluster<I>>>
where
    I: Clone + Eq + Hash + Debug,
{
    check_min_distance(min_distance)?;
    let ids = distinct_ids(point_ids);
    let points = resolve_points(ids.iter(), point_table)?;
    let n = points.len();

    let mut visited = bitvec![0; n];
    let mut members = bitvec![0; n];
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let kd_tree = new_kd_tree(points.clone());

    // sq_dist is not multiplied by EarthR * DegreeRad, adjust eps accordingly
    let eps = min_distance / EARTH_R / DEGREE_RAD;

    let mut neighbor_unique = bitvec![0; n];

    for i in 0..n {
        if visited[i] {
            continue;
        }
        visited.set(i, true);

        let neighbor_pts = kd_tree.in_range(&points[i], eps, Vec::new());
        if neighbor_pts.len() < min_points {
            continue;
        }

        let mut group = vec![i];
        members.set(i, true);
        neighbor_unique.fill(false);
        for &j in &neighbor_pts {
            neighbor_unique.set(j, true);
        }

        let mut neighbor_pts = neighbor_pts;
        let mut j = 0;
        // neighbor_pts grows while it is being walked
        while j < neighbor_pts.len() {
            let k = neighbor_pts[j];
            if !visited[k] {
                visited.set(k, true);
                let more_neighbors = kd_tree.in_range(&points[k], eps, Vec::new());
                if more_neighbors.len() >= min_points {
                    for &p in &more_neighbors {
                        if !neighbor_unique[p] {
                            neighbor_pts.push(p);
                            neighbor_unique.set(p, true);
                        }
                    }
                }
            }

            if !members[k] {
                group.push(k);
                members.set(k, true);
            }
            j += 1;
        }
        groups.push(group);
    }

    let dense = groups.len();
    groups.extend(members.iter_zeros().map(|i| vec![i]));
    debug!(
        "neighborhood clustering: {} dense clusters, {} singletons",
        dense,
        groups.len() - dense
    );

    groups
        .into_iter()
        .map(|g| {
            Ok(Cluster {
                centroid: centroid_of(&member_points(&points, &g))?,
                members: g.into_iter().map(|j| ids[j].clone()).collect(),
            })
        })
        .collect()
}
