//! Distance summaries for mapping results and link degree statistics
use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use crate::cluster::calc_point_distance;
use crate::topology::{Asn, NodeGeo, NodeId, TopologyLink};

/// Links longer than this are assumed to cross an ocean
pub const SUBMARINE_DISTANCE_KM: f64 = 5000.0;

/// Percentile levels reported by [`DistanceSummary`]
pub const PERCENTILE_STEP: usize = 5;

pub const DEGREE_PERCENTILE_STEP: usize = 2;

/// Heaviest `(src AS, dst AS, node)` entries logged by [`log_as_pair_degrees`]
pub const TOP_DEGREES: usize = 100;

/// `(src AS, dst AS, node)` of one link endpoint
pub type AsPairNode = (Asn, Asn, NodeId);

#[derive(Debug, Clone, PartialEq)]
pub struct DistanceSummary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    /// Population standard deviation
    pub std: f64,
    /// `(level, value)` for levels 0, 5, ..., 100
    pub percentiles: Vec<(usize, f64)>,
}

/// Percentile with linear interpolation between closest ranks; `sorted` must be non-empty
fn percentile(sorted: &[f64], level: f64) -> f64 {
    let rank = level / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}

/// `(level, value)` for levels 0, step, ..., 100; `None` for no values
pub fn percentiles(values: &[f64], step: usize) -> Option<Vec<(usize, f64)>> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() || step == 0 {
        return None;
    }
    sorted.sort_by(f64::total_cmp);
    Some(
        (0..=100)
            .step_by(step)
            .map(|level| (level, percentile(&sorted, level as f64)))
            .collect(),
    )
}

impl DistanceSummary {
    /// `None` when there is nothing to summarize
    pub fn from_distances(distances: &[f64]) -> Option<Self> {
        let mut sorted: Vec<f64> = distances.iter().copied().filter(|d| !d.is_nan()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);

        let n = sorted.len() as f64;
        let mean = sorted.iter().sum::<f64>() / n;
        let var = sorted.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / n;

        Some(DistanceSummary {
            count: sorted.len(),
            mean,
            median: percentile(&sorted, 50.0),
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            std: var.sqrt(),
            percentiles: (0..=100)
                .step_by(PERCENTILE_STEP)
                .map(|level| (level, percentile(&sorted, level as f64)))
                .collect(),
        })
    }

    pub fn log(&self, title: &str) {
        info!("{} ({} distances)", title, self.count);
        info!("  mean {:.4} km, median {:.4} km", self.mean, self.median);
        info!("  min {:.4} km, max {:.4} km, std {:.4}", self.min, self.max, self.std);
        for (level, value) in &self.percentiles {
            info!("  percentile {:>3}: {:.4}", level, value);
        }
    }
}

/// Endpoints of links that cross continents or exceed [`SUBMARINE_DISTANCE_KM`]
///
/// Links with an endpoint lacking geolocation are ignored.
pub fn nodes_needing_submarine(
    links: &[TopologyLink],
    node_geo: &BTreeMap<NodeId, NodeGeo>,
) -> BTreeSet<NodeId> {
    let mut nodes = BTreeSet::new();
    for link in links {
        let (Some(a), Some(b)) = (node_geo.get(&link.src), node_geo.get(&link.dst)) else {
            continue;
        };
        if a.continent != b.continent
            || calc_point_distance(&a.point, &b.point) > SUBMARINE_DISTANCE_KM
        {
            nodes.insert(link.src);
            nodes.insert(link.dst);
        }
    }
    info!("{} nodes need submarine cables", nodes.len());
    nodes
}

/// How many links each node carries between one ordered AS pair
///
/// Both endpoints of a link count under the link's `(src AS, dst AS)`.
/// Links with an endpoint lacking an AS are skipped. Sorted by degree,
/// heaviest first, then by key.
pub fn as_pair_degrees(
    links: &[TopologyLink],
    node_as: &BTreeMap<NodeId, Asn>,
) -> Vec<(AsPairNode, usize)> {
    let mut degrees: BTreeMap<AsPairNode, usize> = BTreeMap::new();
    let mut skipped = 0usize;
    for link in links {
        let (Some(&src_as), Some(&dst_as)) = (node_as.get(&link.src), node_as.get(&link.dst))
        else {
            skipped += 1;
            continue;
        };
        *degrees.entry((src_as, dst_as, link.src)).or_default() += 1;
        *degrees.entry((src_as, dst_as, link.dst)).or_default() += 1;
    }
    if skipped > 0 {
        debug!("{} links without an AS on both ends", skipped);
    }
    let mut degrees: Vec<_> = degrees.into_iter().collect();
    degrees.sort_by(|a, b| b.1.cmp(&a.1));
    degrees
}

pub fn log_as_pair_degrees(degrees: &[(AsPairNode, usize)]) {
    for ((src_as, dst_as, node), degree) in degrees.iter().take(TOP_DEGREES) {
        info!("AS{} -> AS{}, node N{}, degree {}", src_as, dst_as, node, degree);
    }
    let values: Vec<f64> = degrees.iter().map(|(_, d)| *d as f64).collect();
    info!("{} (src AS, dst AS, node) entries", values.len());
    for (level, value) in percentiles(&values, DEGREE_PERCENTILE_STEP).unwrap_or_default() {
        info!("  percentile {:>3}: {}", level, value);
    }
}
