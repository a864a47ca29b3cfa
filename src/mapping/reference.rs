use crate::cluster::distance::calc_point_distance;
use crate::cluster::{GeoPoint, KDTree, Locality, PointList, new_kd_tree};
use crate::error::{NetGeoError, Result};

/// One nearest-neighbor candidate, re-scored with the true Haversine distance
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate<'a> {
    /// Position in the reference collection
    pub index: usize,
    /// Category of the reference entity, when the collection carries one
    pub locality: Option<&'a Locality>,
    /// Haversine distance in kilometers
    pub distance: f64,
}

/// Spatial index over one reference collection (facilities, cities or landing points)
///
/// Built once per batch and only read afterwards.
pub struct ReferenceIndex {
    tree: KDTree,
    localities: Option<Vec<Locality>>,
}

impl ReferenceIndex {
    /// # Errors
    ///
    /// [`NetGeoError::EmptyReferenceSet`] when `points` is empty.
    pub fn new(points: PointList) -> Result<Self> {
        if points.is_empty() {
            return Err(NetGeoError::EmptyReferenceSet);
        }
        Ok(ReferenceIndex {
            tree: new_kd_tree(points),
            localities: None,
        })
    }

    /// Index whose entries also carry a city/state/country category
    ///
    /// # Errors
    ///
    /// [`NetGeoError::EmptyReferenceSet`] when `points` is empty,
    /// [`NetGeoError::InvalidArgument`] when the two collections differ in length.
    pub fn with_localities(points: PointList, localities: Vec<Locality>) -> Result<Self> {
        if points.len() != localities.len() {
            return Err(NetGeoError::InvalidArgument(format!(
                "{} reference points but {} localities",
                points.len(),
                localities.len()
            )));
        }
        let mut index = Self::new(points)?;
        index.localities = Some(localities);
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn locality(&self, index: usize) -> Option<&Locality> {
        self.localities.as_ref().and_then(|l| l.get(index))
    }

    /// The `k` nearest reference entries around `point`, closest first
    ///
    /// The tree works in raw degree space, which is only good enough to pick
    /// candidates. Ranking uses the Haversine distance, ties broken by index.
    pub fn candidates(&self, point: &GeoPoint, k: usize) -> Vec<Candidate<'_>> {
        let mut found: Vec<Candidate<'_>> = self
            .tree
            .nearest(point, k.max(1))
            .into_iter()
            .map(|index| Candidate {
                index,
                locality: self.locality(index),
                distance: calc_point_distance(point, &self.tree.points[index]),
            })
            .collect();
        found.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| a.index.cmp(&b.index))
        });
        found
    }
}
