use std::fmt::Debug;

use tracing::{debug, info};

use super::reference::{Candidate, ReferenceIndex};
use crate::cluster::{GeoPoint, Locality, PointList};
use crate::error::Result;

/// Candidates fetched per query; more than one guards against index ties
pub const DEFAULT_K: usize = 3;

/// Acceptance radius for node -> facility
pub const FACILITY_ACCEPT_KM: f64 = 30.0;

/// Acceptance radius for node -> city
pub const CITY_ACCEPT_KM: f64 = 80.0;

/// Acceptance radius for node -> landing point
pub const LANDING_POINT_ACCEPT_KM: f64 = 20.0;

/// Candidates this close to the best one count as tied for category matching
pub const TIE_TOLERANCE_KM: f64 = 1.0;

/// Id written in place of a reference index when nothing was accepted
pub const UNMATCHED: i64 = -1;

/// Tunables for a single-collection mapping pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MappingConfig {
    pub k: usize,
    pub acceptance_km: f64,
}

impl MappingConfig {
    pub fn facility() -> Self {
        MappingConfig {
            k: DEFAULT_K,
            acceptance_km: FACILITY_ACCEPT_KM,
        }
    }

    pub fn city() -> Self {
        MappingConfig {
            k: DEFAULT_K,
            acceptance_km: CITY_ACCEPT_KM,
        }
    }
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self::facility()
    }
}

/// Tunables for the joint facility-then-city pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointMappingConfig {
    pub k: usize,
    pub facility_km: f64,
    pub city_km: f64,
    pub tie_tolerance_km: f64,
}

impl Default for JointMappingConfig {
    fn default() -> Self {
        JointMappingConfig {
            k: DEFAULT_K,
            facility_km: FACILITY_ACCEPT_KM,
            city_km: CITY_ACCEPT_KM,
            tie_tolerance_km: TIE_TOLERANCE_KM,
        }
    }
}

/// Result of mapping one subject against one reference collection
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchOutcome {
    Matched { reference: usize, distance: f64 },
    /// Nothing within the acceptance radius; `nearest_distance` is the best candidate seen
    Unmatched { nearest_distance: f64 },
}

impl MatchOutcome {
    /// Reference index, or [`UNMATCHED`]
    pub fn reference_id(&self) -> i64 {
        match self {
            MatchOutcome::Matched { reference, .. } => *reference as i64,
            MatchOutcome::Unmatched { .. } => UNMATCHED,
        }
    }
}

/// Result of the joint facility/city pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SiteMatch {
    Facility { index: usize, distance: f64 },
    City { index: usize, distance: f64 },
    Unmatched { nearest_distance: f64 },
}

/// Common view over mapping outcomes, used for reporting
pub trait Outcome {
    fn is_matched(&self) -> bool;
    fn distance(&self) -> f64;
}

impl Outcome for MatchOutcome {
    fn is_matched(&self) -> bool {
        matches!(self, MatchOutcome::Matched { .. })
    }

    fn distance(&self) -> f64 {
        match self {
            MatchOutcome::Matched { distance, .. } => *distance,
            MatchOutcome::Unmatched { nearest_distance } => *nearest_distance,
        }
    }
}

impl Outcome for SiteMatch {
    fn is_matched(&self) -> bool {
        !matches!(self, SiteMatch::Unmatched { .. })
    }

    fn distance(&self) -> f64 {
        match self {
            SiteMatch::Facility { distance, .. } | SiteMatch::City { distance, .. } => *distance,
            SiteMatch::Unmatched { nearest_distance } => *nearest_distance,
        }
    }
}

/// Outcome of one mapping pass: a result per usable subject, in input order
#[derive(Debug, Clone)]
pub struct MappingReport<I, M = MatchOutcome> {
    pub results: Vec<(I, M)>,
    /// Subjects dropped because their coordinates were missing or not finite
    pub skipped: Vec<I>,
}

impl<I, M: Outcome> MappingReport<I, M> {
    fn new() -> Self {
        MappingReport {
            results: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn matched_count(&self) -> usize {
        self.results.iter().filter(|(_, m)| m.is_matched()).count()
    }

    /// Distances of the accepted matches
    pub fn matched_distances(&self) -> Vec<f64> {
        self.results
            .iter()
            .filter(|(_, m)| m.is_matched())
            .map(|(_, m)| m.distance())
            .collect()
    }

    fn log_summary(&self, what: &str) {
        info!(
            "{}: matched {}/{} subjects, {} skipped without coordinates",
            what,
            self.matched_count(),
            self.results.len(),
            self.skipped.len()
        );
    }
}

fn usable(point: Option<GeoPoint>) -> Option<GeoPoint> {
    point.filter(GeoPoint::is_finite)
}

/// Attaches every subject to its nearest reference entity
///
/// Each subject queries `config.k` candidates from the index, keeps the one
/// with the smallest Haversine distance, and is left unmatched when that
/// distance exceeds `config.acceptance_km`. Subjects without usable
/// coordinates are listed in [`MappingReport::skipped`].
pub fn map_points<I, S>(
    subjects: S,
    reference: &ReferenceIndex,
    config: &MappingConfig,
) -> MappingReport<I>
where
    I: Debug,
    S: IntoIterator<Item = (I, Option<GeoPoint>)>,
{
    debug!("mapping against {} reference points", reference.len());
    let mut report = MappingReport::new();
    for (id, point) in subjects {
        let Some(point) = usable(point) else {
            debug!("skipping {:?}: no usable coordinates", id);
            report.skipped.push(id);
            continue;
        };

        let candidates = reference.candidates(&point, config.k);
        let outcome = match select_candidate(&candidates, None, 0.0) {
            Some(best) if best.distance <= config.acceptance_km => MatchOutcome::Matched {
                reference: best.index,
                distance: best.distance,
            },
            Some(best) => MatchOutcome::Unmatched {
                nearest_distance: best.distance,
            },
            None => MatchOutcome::Unmatched {
                nearest_distance: f64::INFINITY,
            },
        };
        report.results.push((id, outcome));
    }

    report.log_summary(&format!("mapping within {:.0} km", config.acceptance_km));
    report
}

/// Builds an index over `reference_points` and maps `subjects` against it
///
/// # Errors
///
/// [`crate::error::NetGeoError::EmptyReferenceSet`] when there are no reference points.
pub fn map_points_to_reference<I, S>(
    subjects: S,
    reference_points: PointList,
    config: &MappingConfig,
) -> Result<MappingReport<I>>
where
    I: Debug,
    S: IntoIterator<Item = (I, Option<GeoPoint>)>,
{
    let index = ReferenceIndex::new(reference_points)?;
    Ok(map_points(subjects, &index, config))
}

/// Picks the winner among candidates
///
/// The nearest candidate wins unless `prefer` is given and some candidate
/// within `tie_tolerance_km` of the nearest has that locality; then the
/// closest such candidate wins.
pub fn select_candidate<'c, 'a>(
    candidates: &'c [Candidate<'a>],
    prefer: Option<&Locality>,
    tie_tolerance_km: f64,
) -> Option<&'c Candidate<'a>> {
    let rank = |a: &&Candidate<'a>, b: &&Candidate<'a>| {
        a.distance
            .total_cmp(&b.distance)
            .then_with(|| a.index.cmp(&b.index))
    };
    let best = candidates.iter().min_by(rank)?;

    let Some(prefer) = prefer else {
        return Some(best);
    };
    candidates
        .iter()
        .filter(|c| c.distance <= best.distance + tie_tolerance_km && c.locality == Some(prefer))
        .min_by(rank)
        .or(Some(best))
}

/// Joint pass: facility first, then city, then unmatched
///
/// The nearest city's locality breaks near-ties between the facility
/// candidates within `facility_km`, so the preference never trades an
/// acceptable facility for one beyond the radius. A facility within
/// `facility_km` wins; otherwise the nearest city within `city_km`; otherwise
/// the subject is unmatched and keeps the smaller of the two distances.
pub fn map_to_facility_and_city<I, S>(
    subjects: S,
    facilities: &ReferenceIndex,
    cities: &ReferenceIndex,
    config: &JointMappingConfig,
) -> MappingReport<I, SiteMatch>
where
    I: Debug,
    S: IntoIterator<Item = (I, Option<GeoPoint>)>,
{
    let mut report = MappingReport::new();
    let mut category_wins = 0usize;

    for (id, point) in subjects {
        let Some(point) = usable(point) else {
            debug!("skipping {:?}: no usable coordinates", id);
            report.skipped.push(id);
            continue;
        };

        let city_candidates = cities.candidates(&point, config.k);
        let city = select_candidate(&city_candidates, None, 0.0);

        let facility_candidates = facilities.candidates(&point, config.k);
        let nearest_facility = select_candidate(&facility_candidates, None, 0.0);
        let acceptable: Vec<Candidate<'_>> = facility_candidates
            .iter()
            .filter(|c| c.distance <= config.facility_km)
            .cloned()
            .collect();
        let facility = select_candidate(
            &acceptable,
            city.and_then(|c| c.locality),
            config.tie_tolerance_km,
        );
        if let (Some(f), Some(nearest)) = (facility, nearest_facility) {
            if f.index != nearest.index {
                category_wins += 1;
            }
        }

        let outcome = match (facility, city) {
            (Some(f), _) => SiteMatch::Facility {
                index: f.index,
                distance: f.distance,
            },
            (None, Some(c)) if c.distance <= config.city_km => SiteMatch::City {
                index: c.index,
                distance: c.distance,
            },
            (_, c) => SiteMatch::Unmatched {
                nearest_distance: nearest_facility
                    .map_or(f64::INFINITY, |f| f.distance)
                    .min(c.map_or(f64::INFINITY, |c| c.distance)),
            },
        };
        report.results.push((id, outcome));
    }

    debug!("{} facilities chosen by locality over a nearer candidate", category_wins);
    report.log_summary("facility/city mapping");
    report
}
