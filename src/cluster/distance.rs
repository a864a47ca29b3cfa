use std::f64::consts::PI;
use std::fmt::Debug;
use std::hash::Hash;

use super::point::{GeoPoint, PointTable};
use crate::error::{NetGeoError, Result};

/// Coefficient to translate from degrees to radians
pub const DEGREE_RAD: f64 = PI / 180.0;

/// Earth radius in kilometers
pub const EARTH_R: f64 = 6371.0;

/// Decimal digits kept for distances and centroids
pub const KEEP_DIGITS: u32 = 4;

/// Rounds `value` to `digits` decimals, ties to even
pub fn round_to(value: f64, digits: u32) -> f64 {
    let factor = 10f64.powi(digits as i32);
    (value * factor).round_ties_even() / factor
}

/// Great-circle (Haversine) distance between two points, unrounded
///
/// # Returns
///
/// Distance in kilometers
pub fn haversine_km(p1: &GeoPoint, p2: &GeoPoint) -> f64 {
    let dlat = (p2.lat() - p1.lat()) * DEGREE_RAD;
    let dlon = (p2.lon() - p1.lon()) * DEGREE_RAD;

    let a = (dlat / 2.0).sin() * (dlat / 2.0).sin()
        + (p1.lat() * DEGREE_RAD).cos()
            * (p2.lat() * DEGREE_RAD).cos()
            * (dlon / 2.0).sin()
            * (dlon / 2.0).sin();
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_R * c
}

/// Haversine distance rounded to [`KEEP_DIGITS`] decimals
///
/// Symmetric, and zero for identical points.
pub fn calc_point_distance(p1: &GeoPoint, p2: &GeoPoint) -> f64 {
    round_to(haversine_km(p1, p2), KEEP_DIGITS)
}

/// Calculates spherical distance without sqrt and normalization to Earth radius/radians
///
/// To get real distance in km, take sqrt and multiply result by `EARTH_R * DEGREE_RAD`
///
/// Range queries adjust their radius instead, so neither sqrt nor multiplication
/// is needed per comparison.
pub fn distance_spherical_fast(p1: &GeoPoint, p2: &GeoPoint) -> f64 {
    let v1 = p1.lat() - p2.lat();
    let v2 = (p1.lon() - p2.lon()) * ((p1.lat() + p2.lat()) / 2.0 * DEGREE_RAD).cos();

    v1 * v1 + v2 * v2
}

/// Planar mean of a non-empty slice of points, rounded to [`KEEP_DIGITS`]
///
/// This is not a spherical centroid. At the tens-of-km spread seen at call
/// sites the difference is negligible.
pub fn centroid_of(points: &[GeoPoint]) -> Result<GeoPoint> {
    if points.is_empty() {
        return Err(NetGeoError::InvalidArgument(
            "cannot compute the center of an empty point set".to_string(),
        ));
    }

    let mut center = GeoPoint([0.0, 0.0]);
    for pt in points {
        center.0[0] += pt.0[0];
        center.0[1] += pt.0[1];
    }
    for j in 0..2 {
        center.0[j] /= points.len() as f64;
    }

    Ok(center.rounded(KEEP_DIGITS))
}

/// Centroid of the points referenced by `point_ids`
///
/// # Errors
///
/// [`NetGeoError::InvalidArgument`] when `point_ids` is empty or names a
/// point missing from `point_table`.
pub fn calc_center_pos<'a, I>(
    point_ids: impl IntoIterator<Item = &'a I>,
    point_table: &PointTable<I>,
) -> Result<GeoPoint>
where
    I: Eq + Hash + Debug + 'a,
{
    let points = resolve_points(point_ids, point_table)?;
    centroid_of(&points)
}

/// Looks up every id in the table, failing on the first unknown one
pub fn resolve_points<'a, I>(
    point_ids: impl IntoIterator<Item = &'a I>,
    point_table: &PointTable<I>,
) -> Result<Vec<GeoPoint>>
where
    I: Eq + Hash + Debug + 'a,
{
    point_ids
        .into_iter()
        .map(|id| {
            point_table.get(id).copied().ok_or_else(|| {
                NetGeoError::InvalidArgument(format!("point {id:?} has no position"))
            })
        })
        .collect()
}
