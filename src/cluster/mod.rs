//! Proximity clustering on (lat, lon) with Haversine distance and a K-D Tree
pub mod distance;
pub mod greedy;
pub mod kdtree;
pub mod neighborhood;
pub mod point;
pub mod strategy;

#[cfg(test)]
mod distance_test;
#[cfg(test)]
mod greedy_test;
#[cfg(test)]
mod neighborhood_test;
#[cfg(test)]
mod point_test;

pub use distance::{KEEP_DIGITS, calc_center_pos, calc_point_distance, round_to};
pub use kdtree::{KDTree, new_kd_tree};
pub use point::{Cluster, GeoPoint, Locality, PointList, PointTable};
pub use strategy::{ClusterStrategy, MIN_CLUSTER_DISTANCE, NODE_GROUP_DISTANCE, cluster_points};
