//! Reference CSV tables and the artifacts written between pipeline stages
use std::collections::{BTreeMap, HashMap};
use std::io::{BufRead, Read, Write};

use csv::{ReaderBuilder, WriterBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cable::{AttributedLink, CityIndex, LandCableSegment, NodeSite, SubmarineCable};
use crate::cluster::{Cluster, GeoPoint, KEEP_DIGITS, Locality, PointList};
use crate::error::{NetGeoError, Result};
use crate::mapping::{
    MappingConfig, MappingReport, MatchOutcome, Outcome, ReferenceIndex, SiteMatch, UNMATCHED,
    map_points,
};
use crate::topology::{Asn, NodeGeo, NodeId, parse_node_id};

/// Decimals kept for distances in mapping files
pub const KEEP_DIGITS_DIS: usize = 2;

pub const FACILITY_MAPPING_TAG: &str = "node.Facility";
pub const LANDING_MAPPING_TAG: &str = "node.landing_points";

/// Deserializes every data row by position, skipping the ones that do not fit
fn read_rows<T, R>(reader: R, kind: &str) -> Result<Vec<T>>
where
    T: DeserializeOwned,
    R: Read,
{
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);
    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for (i, record) in rdr.records().enumerate() {
        match record.and_then(|r| r.deserialize::<T>(None)) {
            Ok(row) => rows.push(row),
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                warn!("{} row {}: {}, skipped", kind, i + 2, e);
                skipped += 1;
            }
        }
    }
    info!("read {} {} rows ({} skipped)", rows.len(), kind, skipped);
    Ok(rows)
}

/// Read by position, written under the facility file header
#[derive(Debug, Deserialize, Serialize)]
struct FacilityRow {
    #[serde(rename = "Organization")]
    organization: String,
    #[serde(rename = "Node Name")]
    name: String,
    #[serde(rename = "Latitude")]
    latitude: f64,
    #[serde(rename = "Longitude")]
    longitude: f64,
    #[serde(rename = "City")]
    city: String,
    #[serde(rename = "State")]
    state: String,
    #[serde(rename = "Country")]
    country: String,
    #[serde(rename = "Source")]
    source: String,
    #[serde(rename = "As of Date")]
    as_of_date: String,
}

/// A colocation facility; its index is its position among the kept rows
#[derive(Debug, Clone, PartialEq)]
pub struct Facility {
    pub organization: String,
    pub name: String,
    pub point: GeoPoint,
    pub locality: Locality,
    pub source: String,
    pub as_of_date: String,
}

pub fn read_facilities<R: Read>(reader: R) -> Result<Vec<Facility>> {
    let rows: Vec<FacilityRow> = read_rows(reader, "facility")?;
    Ok(rows
        .into_iter()
        .map(|r| Facility {
            organization: r.organization,
            name: r.name,
            point: GeoPoint::new(r.latitude, r.longitude),
            locality: Locality::new(r.city, r.state, r.country),
            source: r.source,
            as_of_date: r.as_of_date,
        })
        .collect())
}

pub fn write_facilities<W: Write>(w: W, facilities: &[Facility]) -> Result<()> {
    let mut wtr = WriterBuilder::new().from_writer(w);
    for f in facilities {
        wtr.serialize(FacilityRow {
            organization: f.organization.clone(),
            name: f.name.clone(),
            latitude: f.point.lat(),
            longitude: f.point.lon(),
            city: f.locality.city.clone(),
            state: f.locality.state.clone(),
            country: f.locality.country.clone(),
            source: f.source.clone(),
            as_of_date: f.as_of_date.clone(),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

#[derive(Debug, Deserialize)]
struct CityRow {
    city: String,
    state: String,
    country: String,
    lat: f64,
    lon: f64,
}

pub fn read_cities<R: Read>(reader: R) -> Result<CityIndex> {
    let rows: Vec<CityRow> = read_rows(reader, "city")?;
    Ok(CityIndex::new(rows.into_iter().map(|r| {
        (
            Locality::new(r.city, r.state, r.country),
            GeoPoint::new(r.lat, r.lon),
        )
    })))
}

#[derive(Debug, Deserialize)]
struct LandingPointRow {
    _city_name: String,
    _state_province: String,
    _country: String,
    latitude: f64,
    longitude: f64,
    _source: String,
    _asof_date: String,
    standard_city: String,
    standard_state: String,
    standard_country: String,
}

/// A submarine cable landing point, located by its standardized locality
#[derive(Debug, Clone, PartialEq)]
pub struct LandingPoint {
    pub point: GeoPoint,
    pub locality: Locality,
}

pub fn read_landing_points<R: Read>(reader: R) -> Result<Vec<LandingPoint>> {
    let rows: Vec<LandingPointRow> = read_rows(reader, "landing point")?;
    Ok(rows
        .into_iter()
        .map(|r| LandingPoint {
            point: GeoPoint::new(r.latitude, r.longitude),
            locality: Locality::new(r.standard_city, r.standard_state, r.standard_country),
        })
        .collect())
}

#[derive(Debug, Deserialize)]
struct LandCableRow {
    from_city: String,
    from_state: String,
    from_country: String,
    to_city: String,
    to_state: String,
    to_country: String,
    distance_km: f64,
    _path_wkt: String,
    _asof_date: String,
}

/// Reads terrestrial paths; the segment id is the data row position
///
/// Rows naming a city missing from `cities` are skipped.
pub fn read_land_cables<R: Read>(reader: R, cities: &CityIndex) -> Result<Vec<LandCableSegment>> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);
    let mut segments = Vec::new();
    for (pos, record) in rdr.records().enumerate() {
        let row: LandCableRow = match record.and_then(|r| r.deserialize(None)) {
            Ok(row) => row,
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                warn!("land cable row {}: {}, skipped", pos + 2, e);
                continue;
            }
        };
        let from = Locality::new(row.from_city, row.from_state, row.from_country);
        let to = Locality::new(row.to_city, row.to_state, row.to_country);
        match (cities.position(&from), cities.position(&to)) {
            (Some(from), Some(to)) => segments.push(LandCableSegment {
                segment_id: pos,
                from,
                to,
                length_km: row.distance_km,
            }),
            _ => warn!(
                "land cable {}: {:?} -> {:?} is not in the city table, skipped",
                pos, from, to
            ),
        }
    }
    info!("read {} land cable segments", segments.len());
    Ok(segments)
}

#[derive(Debug, Deserialize)]
struct SubmarineCableRow {
    cable_id: String,
    _name: String,
    length_km: f64,
    landing_points: String,
}

/// Reads `cable_id,name,length_km,landing_points` with `;`-separated landing point indices
pub fn read_submarine_cables<R: Read>(reader: R) -> Result<Vec<SubmarineCable>> {
    let rows: Vec<SubmarineCableRow> = read_rows(reader, "submarine cable")?;
    let mut cables = Vec::with_capacity(rows.len());
    for row in rows {
        let landing_points: std::result::Result<Vec<usize>, _> = row
            .landing_points
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse)
            .collect();
        match landing_points {
            Ok(landing_points) => cables.push(SubmarineCable {
                cable_id: row.cable_id,
                length_km: row.length_km,
                landing_points,
            }),
            Err(e) => warn!("submarine cable {}: {}, skipped", row.cable_id, e),
        }
    }
    Ok(cables)
}

/// City position of every item, in item order
///
/// An exact locality match wins; otherwise the nearest city within the city
/// acceptance radius. Positions always name the row owning their locality.
/// Also returns how many items matched by locality.
fn place_in_cities<'a>(
    items: impl IntoIterator<Item = (&'a Locality, GeoPoint)>,
    cities: &CityIndex,
) -> Result<(Vec<Option<usize>>, usize)> {
    let mut placed = Vec::new();
    let mut pending = Vec::new();
    for (idx, (locality, point)) in items.into_iter().enumerate() {
        let pos = cities.position(locality);
        if pos.is_none() {
            pending.push((idx, Some(point)));
        }
        placed.push(pos);
    }
    let exact = placed.len() - pending.len();

    if !pending.is_empty() {
        let index = ReferenceIndex::new(cities.points().to_vec())?;
        let report = map_points(pending, &index, &MappingConfig::city());
        for (idx, outcome) in report.results {
            if let MatchOutcome::Matched { reference, .. } = outcome {
                placed[idx] = cities.canonical(reference);
            }
        }
    }
    Ok((placed, exact))
}

/// Places each landing point in a city, keyed by landing point index
///
/// # Errors
///
/// [`NetGeoError::EmptyReferenceSet`] when a fallback is needed and `cities` is empty.
pub fn landing_points_to_cities(
    landing_points: &[LandingPoint],
    cities: &CityIndex,
) -> Result<HashMap<usize, usize>> {
    let (placed, exact) = place_in_cities(
        landing_points.iter().map(|lp| (&lp.locality, lp.point)),
        cities,
    )?;
    let lp_city: HashMap<usize, usize> = placed
        .into_iter()
        .enumerate()
        .filter_map(|(idx, pos)| pos.map(|pos| (idx, pos)))
        .collect();

    info!(
        "{} of {} landing points placed in one of {} cities ({} by locality)",
        lp_city.len(),
        landing_points.len(),
        cities.len(),
        exact
    );
    Ok(lp_city)
}

/// City position of every facility, indexed like `facilities`
///
/// Facility localities are free text and often miss the city table; those
/// facilities fall back to their nearest city.
///
/// # Errors
///
/// [`NetGeoError::EmptyReferenceSet`] when a fallback is needed and `cities` is empty.
pub fn place_facilities(
    facilities: &[Facility],
    cities: &CityIndex,
) -> Result<Vec<Option<usize>>> {
    let (placed, exact) =
        place_in_cities(facilities.iter().map(|f| (&f.locality, f.point)), cities)?;
    let unplaced = placed.iter().filter(|p| p.is_none()).count();
    info!(
        "facilities: {} placed by locality, {} by nearest city, {} without a city",
        exact,
        placed.len() - exact - unplaced,
        unplaced
    );
    Ok(placed)
}

/// Relabels every facility with the locality of the city it is placed in
///
/// Facilities without a city keep their own locality.
pub fn complete_facilities(facilities: &[Facility], cities: &CityIndex) -> Result<Vec<Facility>> {
    let placed = place_facilities(facilities, cities)?;
    // indexed by how many of city, state and country already agreed
    let mut agreeing_fields = [0usize; 4];
    let completed = facilities
        .iter()
        .zip(placed)
        .map(|(facility, pos)| {
            let mut facility = facility.clone();
            if let Some(locality) = pos.and_then(|pos| cities.locality(pos)) {
                let own = &facility.locality;
                let agree = usize::from(own.city == locality.city)
                    + usize::from(own.state == locality.state)
                    + usize::from(own.country == locality.country);
                agreeing_fields[agree] += 1;
                if agree < 3 {
                    debug!("facility {}: {:?} -> {:?}", facility.name, own, locality);
                    facility.locality = locality.clone();
                }
            }
            facility
        })
        .collect();
    info!(
        "{} facilities consistent with their city, {} relabelled",
        agreeing_fields[3],
        agreeing_fields[..3].iter().sum::<usize>()
    );
    info!(
        "relabelled facilities agreeing on 0/1/2 fields: {}/{}/{}",
        agreeing_fields[0], agreeing_fields[1], agreeing_fields[2]
    );
    Ok(completed)
}

/// Reads `latitude,longitude[,...]` rows; the header row is optional
///
/// Rows whose first two fields are not numbers are skipped.
pub fn read_points<R: Read>(reader: R) -> Result<PointList> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);
    let mut points = PointList::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        let coords = (
            record.get(0).map(|s| s.trim().parse::<f64>()),
            record.get(1).map(|s| s.trim().parse::<f64>()),
        );
        match coords {
            (Some(Ok(lat)), Some(Ok(lon))) => points.push(GeoPoint::new(lat, lon)),
            _ if i == 0 => debug!("treating first row as header"),
            _ => warn!("point row {}: no coordinates, skipped", i + 1),
        }
    }
    Ok(points)
}

#[derive(Debug, Serialize)]
struct ClusterRow {
    cluster_id: usize,
    size: usize,
    centroid_lat: f64,
    centroid_lon: f64,
    members: String,
}

pub fn write_clusters<W: Write>(w: W, clusters: &[Cluster<usize>]) -> Result<()> {
    let mut wtr = WriterBuilder::new().from_writer(w);
    for (cluster_id, cluster) in clusters.iter().enumerate() {
        wtr.serialize(ClusterRow {
            cluster_id,
            size: cluster.len(),
            centroid_lat: cluster.centroid.lat(),
            centroid_lon: cluster.centroid.lon(),
            members: cluster
                .members
                .iter()
                .map(|m| m.to_string())
                .collect::<Vec<_>>()
                .join(" "),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

fn format_distance(distance: f64) -> String {
    format!("{:.*}", KEEP_DIGITS_DIS, distance)
}

/// One line of a single-collection mapping file
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchRecord {
    pub node: NodeId,
    pub reference: Option<usize>,
    pub distance: f64,
}

/// Writes `<tag> N<id> <prefix><idx>|NULL <distance>` lines
pub fn write_match_mapping<W: Write>(
    mut w: W,
    tag: &str,
    prefix: char,
    report: &MappingReport<NodeId>,
) -> Result<()> {
    for (nid, outcome) in &report.results {
        let reference = match outcome.reference_id() {
            UNMATCHED => "NULL".to_string(),
            id => format!("{prefix}{id}"),
        };
        writeln!(
            w,
            "{} N{} {} {}",
            tag,
            nid,
            reference,
            format_distance(outcome.distance())
        )?;
    }
    Ok(())
}

/// Splits a mapping line into node, reference token and distance
fn parse_mapping_line<'l>(
    kind: &'static str,
    tag: &str,
    no: usize,
    line: &'l str,
) -> Result<(NodeId, &'l str, f64)> {
    let malformed = |reason: &str| NetGeoError::Malformed {
        kind,
        line: no,
        reason: reason.to_string(),
    };
    let items: Vec<&str> = line.split_whitespace().collect();
    if items.len() != 4 || items[0] != tag {
        return Err(malformed("expected `<tag> N<id> <ref> <distance>`"));
    }
    let node = parse_node_id(items[1]).ok_or_else(|| malformed("bad node id"))?;
    let distance = items[3].parse().map_err(|_| malformed("bad distance"))?;
    Ok((node, items[2], distance))
}

fn mapping_lines<R: BufRead>(reader: R) -> impl Iterator<Item = Result<(usize, String)>> {
    reader
        .lines()
        .enumerate()
        .filter_map(|(i, line)| match line {
            Ok(l) if l.trim().is_empty() => None,
            Ok(l) => Some(Ok((i + 1, l))),
            Err(e) => Some(Err(e.into())),
        })
}

pub fn read_match_mapping<R: BufRead>(reader: R, tag: &str, prefix: char) -> Result<Vec<MatchRecord>> {
    const KIND: &str = "mapping";
    let mut records = Vec::new();
    for line in mapping_lines(reader) {
        let (no, line) = line?;
        let (node, token, distance) = parse_mapping_line(KIND, tag, no, &line)?;
        let reference = if token == "NULL" {
            None
        } else {
            Some(
                token
                    .strip_prefix(prefix)
                    .and_then(|idx| idx.parse().ok())
                    .ok_or_else(|| NetGeoError::Malformed {
                        kind: KIND,
                        line: no,
                        reason: format!("bad reference {token:?}"),
                    })?,
            )
        };
        records.push(MatchRecord {
            node,
            reference,
            distance,
        });
    }
    Ok(records)
}

/// One line of the joint facility/city mapping file
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SiteRecord {
    pub node: NodeId,
    pub site: Option<NodeSite>,
    pub distance: f64,
}

/// Writes `node.Facility N<id> F<idx>|C<idx>|NULL <distance>` lines
pub fn write_site_mapping<W: Write>(mut w: W, report: &MappingReport<NodeId, SiteMatch>) -> Result<()> {
    for (nid, outcome) in &report.results {
        let (site, distance) = match outcome {
            SiteMatch::Facility { index, distance } => (format!("F{index}"), *distance),
            SiteMatch::City { index, distance } => (format!("C{index}"), *distance),
            SiteMatch::Unmatched { nearest_distance } => ("NULL".to_string(), *nearest_distance),
        };
        writeln!(
            w,
            "{} N{} {} {}",
            FACILITY_MAPPING_TAG,
            nid,
            site,
            format_distance(distance)
        )?;
    }
    Ok(())
}

pub fn read_site_mapping<R: BufRead>(reader: R) -> Result<Vec<SiteRecord>> {
    const KIND: &str = "site mapping";
    let mut records = Vec::new();
    for line in mapping_lines(reader) {
        let (no, line) = line?;
        let (node, token, distance) = parse_mapping_line(KIND, FACILITY_MAPPING_TAG, no, &line)?;
        let parse_idx = |s: &str| {
            s.parse::<usize>().map_err(|_| NetGeoError::Malformed {
                kind: KIND,
                line: no,
                reason: format!("bad site {token:?}"),
            })
        };
        let site = match token.split_at_checked(1) {
            _ if token == "NULL" => None,
            Some(("F", idx)) => Some(NodeSite::Facility(parse_idx(idx)?)),
            Some(("C", idx)) => Some(NodeSite::City(parse_idx(idx)?)),
            _ => {
                return Err(NetGeoError::Malformed {
                    kind: KIND,
                    line: no,
                    reason: format!("bad site {token:?}"),
                });
            }
        };
        records.push(SiteRecord {
            node,
            site,
            distance,
        });
    }
    Ok(records)
}

/// One row of the PoP file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopRow {
    pub idx: NodeId,
    pub asn: Asn,
    pub lat: f64,
    pub lon: f64,
    pub facility_id: i64,
    pub city_id: i64,
    pub landing_id: i64,
    pub distance: Option<f64>,
}

/// Joins topology nodes with their site and landing point mappings
///
/// Nodes without a geolocation are skipped; missing mappings become `-1`.
pub fn build_pop_rows(
    node_as: &BTreeMap<NodeId, Asn>,
    node_geo: &BTreeMap<NodeId, NodeGeo>,
    sites: &[SiteRecord],
    landing: &[MatchRecord],
) -> Vec<PopRow> {
    let sites: HashMap<NodeId, &SiteRecord> = sites.iter().map(|s| (s.node, s)).collect();
    let landing: HashMap<NodeId, usize> = landing
        .iter()
        .filter_map(|m| m.reference.map(|r| (m.node, r)))
        .collect();

    let mut rows = Vec::with_capacity(node_as.len());
    for (&nid, &asn) in node_as {
        let Some(geo) = node_geo.get(&nid) else {
            warn!("node N{} has no geolocation, left out of the PoP file", nid);
            continue;
        };
        let point = geo.point.rounded(KEEP_DIGITS);
        let site = sites.get(&nid);
        let (facility_id, city_id) = match site.and_then(|s| s.site) {
            Some(NodeSite::Facility(idx)) => (idx as i64, -1),
            Some(NodeSite::City(idx)) => (-1, idx as i64),
            None => (-1, -1),
        };
        rows.push(PopRow {
            idx: nid,
            asn,
            lat: point.lat(),
            lon: point.lon(),
            facility_id,
            city_id,
            landing_id: landing.get(&nid).map_or(-1, |&r| r as i64),
            distance: site.map(|s| s.distance),
        });
    }
    rows
}

pub fn write_pop_file<W: Write>(w: W, rows: &[PopRow]) -> Result<()> {
    let mut wtr = WriterBuilder::new().from_writer(w);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// One row of the attributed link file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkRow {
    pub link_id: String,
    pub src_nid: String,
    pub dst_nid: String,
    pub src_asn: Option<Asn>,
    pub dst_asn: Option<Asn>,
    #[serde(rename = "type")]
    pub link_type: String,
    pub cables: String,
}

impl LinkRow {
    pub fn new(link: &AttributedLink, node_as: &BTreeMap<NodeId, Asn>) -> Self {
        let topo = &link.link;
        LinkRow {
            link_id: topo.link_id.trim_start_matches('L').to_string(),
            src_nid: format!("N{}", topo.src),
            dst_nid: format!("N{}", topo.dst),
            src_asn: node_as.get(&topo.src).copied(),
            dst_asn: node_as.get(&topo.dst).copied(),
            link_type: link.link_type.to_string(),
            cables: link.path.cable_ids().join(","),
        }
    }
}

pub fn write_link_file<W: Write>(w: W, rows: &[LinkRow]) -> Result<()> {
    let mut wtr = WriterBuilder::new().from_writer(w);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}
