use std::collections::HashSet;
use std::fmt::Debug;
use std::hash::Hash;

use bitvec::prelude::*;
use tracing::debug;

use super::distance::{calc_point_distance, centroid_of, resolve_points};
use super::point::{Cluster, GeoPoint, PointTable};
use crate::error::{NetGeoError, Result};

// Greedy centroid growth:
//
//    while unassigned points remain
//       seed = next unassigned point (caller order)
//       repeat
//          center = mean(cluster)
//          absorb every unassigned point with dist(point, center) < min_distance
//       until a pass absorbs nothing
//
// The acceptance test runs against the centroid of the pass, so a chain of
// points spaced just under min_distance does not collapse into one cluster.
// Each pass rescans every unassigned point: O(n^2) per cluster in the worst case.

/// Clusters points by growing each cluster around its moving centroid
///
/// # Arguments
///
/// * `point_ids` - Points to cluster; iteration order decides seed order
/// * `point_table` - Position of every id
/// * `min_distance` - Acceptance radius in kilometers (strict)
///
/// # Returns
///
/// Clusters partitioning the distinct input ids, in seed order. Each
/// cluster's first member is its seed.
pub fn cluster_by_distance_centroid<I>(
    point_ids: &[I],
    point_table: &PointTable<I>,
    min_distance: f64,
) -> Result<Vec<Cluster<I>>>
where
    I: Clone + Eq + Hash + Debug,
{
    check_min_distance(min_distance)?;
    let ids = distinct_ids(point_ids);
    let points = resolve_points(ids.iter(), point_table)?;

    let mut assigned = bitvec![0; points.len()];
    let mut clusters = Vec::new();

    for seed in 0..points.len() {
        if assigned[seed] {
            continue;
        }
        assigned.set(seed, true);
        let mut members = vec![seed];
        let mut passes = 0;

        let centroid = loop {
            passes += 1;
            let center = centroid_of(&member_points(&points, &members))?;
            let absorbed: Vec<usize> = (0..points.len())
                .filter(|&j| !assigned[j] && calc_point_distance(&points[j], &center) < min_distance)
                .collect();
            if absorbed.is_empty() {
                break center;
            }
            for j in absorbed {
                assigned.set(j, true);
                members.push(j);
            }
        };

        debug!(
            "cluster {} seeded by {:?}: {} members after {} passes",
            clusters.len(),
            ids[seed],
            members.len(),
            passes
        );
        clusters.push(Cluster {
            members: members.iter().map(|&j| ids[j].clone()).collect(),
            centroid,
        });
    }

    Ok(clusters)
}

/// Clusters points in a single pass against each cluster's seed point
///
/// A point joins the first existing cluster whose seed lies strictly within
/// `min_distance`, otherwise it seeds a new cluster. Seeds never move, so the
/// result depends on input order. Costs O(n * k) for k clusters.
pub fn cluster_by_distance_seed<I>(
    point_ids: &[I],
    point_table: &PointTable<I>,
    min_distance: f64,
) -> Result<Vec<Cluster<I>>>
where
    I: Clone + Eq + Hash + Debug,
{
    check_min_distance(min_distance)?;
    let ids = distinct_ids(point_ids);
    let points = resolve_points(ids.iter(), point_table)?;

    let mut groups: Vec<Vec<usize>> = Vec::new();
    for (i, point) in points.iter().enumerate() {
        let home = groups
            .iter()
            .position(|g| calc_point_distance(point, &points[g[0]]) < min_distance);
        match home {
            Some(g) => groups[g].push(i),
            None => groups.push(vec![i]),
        }
    }

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

pub(crate) fn check_min_distance(min_distance: f64) -> Result<()> {
    if !min_distance.is_finite() || min_distance < 0.0 {
        return Err(NetGeoError::InvalidArgument(format!(
            "min_distance must be a non-negative number of kilometers, got {min_distance}"
        )));
    }
    Ok(())
}

/// Drops repeated ids, keeping first occurrences in order
pub(crate) fn distinct_ids<I: Clone + Eq + Hash>(point_ids: &[I]) -> Vec<I> {
    let mut seen = HashSet::with_capacity(point_ids.len());
    point_ids
        .iter()
        .filter(|id| seen.insert(*id))
        .cloned()
        .collect()
}

pub(crate) fn member_points(points: &[GeoPoint], members: &[usize]) -> Vec<GeoPoint> {
    members.iter().map(|&j| points[j]).collect()
}
