//! Geographic points, category keys and clusters

use std::collections::HashMap;

use super::distance::{distance_spherical_fast, round_to};

/// GeoPoint represents a geographic coordinate (latitude, longitude)
///
/// The point is stored as [latitude, longitude] where:
/// - `[0]` is latitude
/// - `[1]` is longitude
///
/// Range validation is left to callers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint(pub [f64; 2]);

/// PointList is a collection of GeoPoints addressed by position
pub type PointList = Vec<GeoPoint>;

/// Lookup table from an opaque identifier to its position
pub type PointTable<I> = HashMap<I, GeoPoint>;

impl GeoPoint {
    pub const fn new(lat: f64, lon: f64) -> Self {
        GeoPoint([lat, lon])
    }

    pub const fn lat(&self) -> f64 {
        self.0[0]
    }

    pub const fn lon(&self) -> f64 {
        self.0[1]
    }

    /// Both components are finite numbers
    pub fn is_finite(&self) -> bool {
        self.0[0].is_finite() && self.0[1].is_finite()
    }

    /// Returns the point with both components rounded to `digits` decimals
    pub fn rounded(&self, digits: u32) -> GeoPoint {
        GeoPoint([round_to(self.0[0], digits), round_to(self.0[1], digits)])
    }

    /// Returns squared (without sqrt & normalization) spherical distance between two points
    pub fn sq_dist(&self, b: &GeoPoint) -> f64 {
        distance_spherical_fast(self, b)
    }

    /// Returns squared Euclidean distance in raw degree space
    pub fn planar_sq_dist(&self, b: &GeoPoint) -> f64 {
        let dlat = self.0[0] - b.0[0];
        let dlon = self.0[1] - b.0[1];
        dlat * dlat + dlon * dlon
    }
}

/// City/state/country key used to compare reference entities
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Locality {
    pub city: String,
    pub state: String,
    pub country: String,
}

impl Locality {
    pub fn new(city: impl Into<String>, state: impl Into<String>, country: impl Into<String>) -> Self {
        Locality {
            city: city.into(),
            state: state.into(),
            country: country.into(),
        }
    }
}

/// Cluster represents one group emitted by a clustering run
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster<I> {
    /// Member identifiers; the first one is the seed for the greedy strategies
    pub members: Vec<I>,
    /// Mean position of the members
    pub centroid: GeoPoint,
}

impl<I> Cluster<I> {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// First member of the cluster
    pub fn seed(&self) -> Option<&I> {
        self.members.first()
    }
}
