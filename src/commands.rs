//! Pipeline stages behind the CLI subcommands
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, ValueEnum};
use tracing::{debug, info, warn};

use crate::cable::{NodeCityResolver, attribute_links, build_cable_graph};
use crate::cluster::{
    ClusterStrategy, GeoPoint, MIN_CLUSTER_DISTANCE, NODE_GROUP_DISTANCE, PointTable,
    cluster_points,
};
use crate::dataset::{
    self, FACILITY_MAPPING_TAG, LANDING_MAPPING_TAG, LinkRow, MatchRecord, SiteRecord,
};
use crate::mapping::mapper::{
    CITY_ACCEPT_KM, DEFAULT_K, FACILITY_ACCEPT_KM, LANDING_POINT_ACCEPT_KM, TIE_TOLERANCE_KM,
};
use crate::mapping::{
    JointMappingConfig, MappingConfig, ReferenceIndex, map_points_to_reference,
    map_to_facility_and_city,
};
use crate::stats::{
    DistanceSummary, as_pair_degrees, log_as_pair_degrees, nodes_needing_submarine,
};
use crate::topology::{self, NodeGeo, NodeId, Topology};

fn open(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    Ok(BufReader::new(file))
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
    Ok(BufWriter::new(file))
}

/// Output file, or stdout when no path is given
fn create_or_stdout(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(create(path)?),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    })
}

/// `<out_dir>/<file name of input>`, refusing to overwrite the input itself
fn output_in(out_dir: &Path, input: &Path) -> Result<PathBuf> {
    let name = input
        .file_name()
        .with_context(|| format!("{} has no file name", input.display()))?;
    let out = out_dir.join(name);
    if out == input {
        bail!("output {} would overwrite its input", out.display());
    }
    Ok(out)
}

fn load_topology(node_as: &Path, node_geo: &Path, links: &Path) -> Result<Topology> {
    let topology = Topology {
        node_as: topology::read_node_as(open(node_as)?)
            .with_context(|| format!("reading {}", node_as.display()))?,
        node_geo: topology::read_node_geo(open(node_geo)?)
            .with_context(|| format!("reading {}", node_geo.display()))?,
        links: topology::read_links(open(links)?)
            .with_context(|| format!("reading {}", links.display()))?,
    };
    info!(
        "loaded {} AS nodes, {} geolocated nodes, {} links",
        topology.node_as.len(),
        topology.node_geo.len(),
        topology.links.len()
    );
    Ok(topology)
}

fn load_node_geo(path: &Path) -> Result<BTreeMap<NodeId, NodeGeo>> {
    topology::read_node_geo(open(path)?).with_context(|| format!("reading {}", path.display()))
}

fn subjects(
    node_geo: &BTreeMap<NodeId, NodeGeo>,
) -> impl Iterator<Item = (NodeId, Option<GeoPoint>)> + '_ {
    node_geo.iter().map(|(&nid, geo)| (nid, Some(geo.point)))
}

fn log_matched_distances(title: &str, distances: &[f64]) {
    match DistanceSummary::from_distances(distances) {
        Some(summary) => summary.log(title),
        None => warn!("{}: nothing matched", title),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    Centroid,
    Seed,
    Neighborhood,
}

impl StrategyArg {
    fn with_min_points(self, min_points: usize) -> ClusterStrategy {
        match self {
            StrategyArg::Centroid => ClusterStrategy::Centroid,
            StrategyArg::Seed => ClusterStrategy::Seed,
            StrategyArg::Neighborhood => ClusterStrategy::Neighborhood { min_points },
        }
    }
}

#[derive(Debug, Args)]
pub struct ClusterArgs {
    /// Input CSV file with latitude,longitude columns
    #[arg(short, long, default_value = "points.csv")]
    pub input: PathBuf,

    /// Output CSV file with one row per cluster (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Clustering radius in km
    #[arg(short = 'd', long, default_value_t = MIN_CLUSTER_DISTANCE)]
    pub min_distance: f64,

    #[arg(short, long, value_enum, default_value_t = StrategyArg::Centroid)]
    pub strategy: StrategyArg,

    /// Minimum neighbors for a core point (neighborhood strategy only)
    #[arg(short = 'm', long, default_value_t = 1)]
    pub min_points: usize,
}

pub fn run_cluster(args: &ClusterArgs) -> Result<()> {
    let points = dataset::read_points(open(&args.input)?)
        .with_context(|| format!("reading {}", args.input.display()))?;
    if points.is_empty() {
        bail!("no points found in {}", args.input.display());
    }
    info!("read {} points from {}", points.len(), args.input.display());

    let ids: Vec<usize> = (0..points.len()).collect();
    let table: PointTable<usize> = points.into_iter().enumerate().collect();
    let strategy = args.strategy.with_min_points(args.min_points);
    let clusters = cluster_points(strategy, &ids, &table, args.min_distance)?;

    dataset::write_clusters(create_or_stdout(args.output.as_deref())?, &clusters)?;
    Ok(())
}

#[derive(Debug, Args)]
pub struct TopologyArgs {
    #[arg(long)]
    pub node_as: PathBuf,

    #[arg(long)]
    pub node_geo: PathBuf,

    #[arg(long)]
    pub links: PathBuf,

    /// Directory receiving the filtered files under their original names
    #[arg(long)]
    pub out_dir: PathBuf,
}

impl TopologyArgs {
    fn write(&self, topology: &Topology) -> Result<()> {
        let node_as = output_in(&self.out_dir, &self.node_as)?;
        let node_geo = output_in(&self.out_dir, &self.node_geo)?;
        let links = output_in(&self.out_dir, &self.links)?;

        let mut w = create(&node_as)?;
        topology::write_node_as(&mut w, &topology.node_as)?;
        w.flush()?;
        let mut w = create(&node_geo)?;
        topology::write_node_geo(&mut w, &topology.node_geo)?;
        w.flush()?;
        let mut w = create(&links)?;
        topology::write_links(&mut w, &topology.links)?;
        w.flush()?;
        info!("topology written to {}", self.out_dir.display());
        Ok(())
    }
}

pub fn run_extract_links(args: &TopologyArgs) -> Result<()> {
    let topology = load_topology(&args.node_as, &args.node_geo, &args.links)?;
    let extracted =
        topology::extract_interdomain_links(&topology.node_as, &topology.node_geo, &topology.links);
    args.write(&extracted)
}

#[derive(Debug, Args)]
pub struct GroupNodesArgs {
    #[command(flatten)]
    pub topology: TopologyArgs,

    /// Grouping radius in km
    #[arg(short = 'd', long, default_value_t = NODE_GROUP_DISTANCE)]
    pub min_distance: f64,

    #[arg(short, long, value_enum, default_value_t = StrategyArg::Centroid)]
    pub strategy: StrategyArg,

    #[arg(short = 'm', long, default_value_t = 1)]
    pub min_points: usize,
}

pub fn run_group_nodes(args: &GroupNodesArgs) -> Result<()> {
    let t = &args.topology;
    let topology = load_topology(&t.node_as, &t.node_geo, &t.links)?;
    let grouped = topology::group_proximity_nodes(
        &topology,
        args.strategy.with_min_points(args.min_points),
        args.min_distance,
    )?;
    t.write(&grouped)
}

#[derive(Debug, Args)]
pub struct UniqueLinksArgs {
    #[arg(long)]
    pub links: PathBuf,

    #[arg(short, long)]
    pub output: PathBuf,
}

pub fn run_unique_links(args: &UniqueLinksArgs) -> Result<()> {
    let links = topology::read_links(open(&args.links)?)
        .with_context(|| format!("reading {}", args.links.display()))?;
    let unique = topology::unique_links(&links);
    let mut w = create(&args.output)?;
    topology::write_unique_links(&mut w, &unique)?;
    w.flush()?;
    Ok(())
}

#[derive(Debug, Args)]
pub struct MapFacilitiesArgs {
    #[arg(long)]
    pub node_geo: PathBuf,

    #[arg(long)]
    pub facilities: PathBuf,

    #[arg(short, long)]
    pub output: PathBuf,

    /// Nodes farther than this from every facility stay unmatched
    #[arg(long, default_value_t = FACILITY_ACCEPT_KM)]
    pub acceptance_km: f64,

    /// Candidates fetched per node
    #[arg(short, long, default_value_t = DEFAULT_K)]
    pub k: usize,
}

pub fn run_map_facilities(args: &MapFacilitiesArgs) -> Result<()> {
    let node_geo = load_node_geo(&args.node_geo)?;
    let facilities = dataset::read_facilities(open(&args.facilities)?)?;
    let config = MappingConfig {
        k: args.k,
        acceptance_km: args.acceptance_km,
    };
    let report = map_points_to_reference(
        subjects(&node_geo),
        facilities.iter().map(|f| f.point).collect(),
        &config,
    )
    .with_context(|| format!("no usable facility in {}", args.facilities.display()))?;
    log_matched_distances("node to facility", &report.matched_distances());

    let mut w = create(&args.output)?;
    dataset::write_match_mapping(&mut w, FACILITY_MAPPING_TAG, 'F', &report)?;
    w.flush()?;
    Ok(())
}

#[derive(Debug, Args)]
pub struct CompleteFacilitiesArgs {
    #[arg(long)]
    pub facilities: PathBuf,

    #[arg(long)]
    pub cities: PathBuf,

    /// Defaults to `<facilities>_complete.csv`
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn run_complete_facilities(args: &CompleteFacilitiesArgs) -> Result<()> {
    let facilities = dataset::read_facilities(open(&args.facilities)?)?;
    let cities = dataset::read_cities(open(&args.cities)?)?;
    let completed = dataset::complete_facilities(&facilities, &cities)
        .with_context(|| format!("no usable city in {}", args.cities.display()))?;

    let output = match &args.output {
        Some(path) => path.clone(),
        None => {
            let stem = args
                .facilities
                .file_stem()
                .with_context(|| format!("{} has no file name", args.facilities.display()))?;
            let mut name = stem.to_os_string();
            name.push("_complete.csv");
            args.facilities.with_file_name(name)
        }
    };
    if output == args.facilities {
        bail!("output {} would overwrite its input", output.display());
    }
    let mut w = create(&output)?;
    dataset::write_facilities(&mut w, &completed)?;
    w.flush()?;
    Ok(())
}

#[derive(Debug, Args)]
pub struct MapLandingPointsArgs {
    #[arg(long)]
    pub node_geo: PathBuf,

    #[arg(long)]
    pub landing_points: PathBuf,

    #[arg(short, long)]
    pub output: PathBuf,

    #[arg(long, default_value_t = LANDING_POINT_ACCEPT_KM)]
    pub acceptance_km: f64,

    #[arg(short, long, default_value_t = DEFAULT_K)]
    pub k: usize,
}

pub fn run_map_landing_points(args: &MapLandingPointsArgs) -> Result<()> {
    let node_geo = load_node_geo(&args.node_geo)?;
    let landing_points = dataset::read_landing_points(open(&args.landing_points)?)?;
    let config = MappingConfig {
        k: args.k,
        acceptance_km: args.acceptance_km,
    };
    let report = map_points_to_reference(
        subjects(&node_geo),
        landing_points.iter().map(|lp| lp.point).collect(),
        &config,
    )
    .with_context(|| format!("no usable landing point in {}", args.landing_points.display()))?;
    log_matched_distances("node to landing point", &report.matched_distances());

    let mut w = create(&args.output)?;
    dataset::write_match_mapping(&mut w, LANDING_MAPPING_TAG, 'P', &report)?;
    w.flush()?;
    Ok(())
}

#[derive(Debug, Args)]
pub struct MapSitesArgs {
    #[arg(long)]
    pub node_geo: PathBuf,

    #[arg(long)]
    pub facilities: PathBuf,

    #[arg(long)]
    pub cities: PathBuf,

    #[arg(short, long)]
    pub output: PathBuf,

    #[arg(long, default_value_t = FACILITY_ACCEPT_KM)]
    pub facility_km: f64,

    #[arg(long, default_value_t = CITY_ACCEPT_KM)]
    pub city_km: f64,

    /// Facilities this close to the nearest one compete on city match
    #[arg(long, default_value_t = TIE_TOLERANCE_KM)]
    pub tie_tolerance_km: f64,

    #[arg(short, long, default_value_t = DEFAULT_K)]
    pub k: usize,
}

pub fn run_map_sites(args: &MapSitesArgs) -> Result<()> {
    let node_geo = load_node_geo(&args.node_geo)?;
    let facilities = dataset::read_facilities(open(&args.facilities)?)?;
    let cities = dataset::read_cities(open(&args.cities)?)?;

    let facility_index = ReferenceIndex::with_localities(
        facilities.iter().map(|f| f.point).collect(),
        facilities.iter().map(|f| f.locality.clone()).collect(),
    )
    .with_context(|| format!("no usable facility in {}", args.facilities.display()))?;
    let city_index =
        ReferenceIndex::with_localities(cities.points().to_vec(), cities.localities().to_vec())
            .with_context(|| format!("no usable city in {}", args.cities.display()))?;

    let config = JointMappingConfig {
        k: args.k,
        facility_km: args.facility_km,
        city_km: args.city_km,
        tie_tolerance_km: args.tie_tolerance_km,
    };
    let report =
        map_to_facility_and_city(subjects(&node_geo), &facility_index, &city_index, &config);

    let mut w = create(&args.output)?;
    dataset::write_site_mapping(&mut w, &report)?;
    w.flush()?;
    Ok(())
}

fn load_site_mapping(path: &Path) -> Result<Vec<SiteRecord>> {
    dataset::read_site_mapping(open(path)?).with_context(|| format!("reading {}", path.display()))
}

fn load_landing_mapping(path: &Path) -> Result<Vec<MatchRecord>> {
    dataset::read_match_mapping(open(path)?, LANDING_MAPPING_TAG, 'P')
        .with_context(|| format!("reading {}", path.display()))
}

#[derive(Debug, Args)]
pub struct PopFileArgs {
    #[arg(long)]
    pub node_as: PathBuf,

    #[arg(long)]
    pub node_geo: PathBuf,

    /// Joint facility/city mapping file
    #[arg(long)]
    pub site_mapping: PathBuf,

    /// Landing point mapping file; `landing_id` stays -1 without it
    #[arg(long)]
    pub landing_mapping: Option<PathBuf>,

    #[arg(short, long)]
    pub output: PathBuf,
}

pub fn run_pop_file(args: &PopFileArgs) -> Result<()> {
    let node_as = topology::read_node_as(open(&args.node_as)?)
        .with_context(|| format!("reading {}", args.node_as.display()))?;
    let node_geo = load_node_geo(&args.node_geo)?;
    let sites = load_site_mapping(&args.site_mapping)?;
    let landing = match &args.landing_mapping {
        Some(path) => load_landing_mapping(path)?,
        None => Vec::new(),
    };

    let rows = dataset::build_pop_rows(&node_as, &node_geo, &sites, &landing);
    dataset::write_pop_file(create(&args.output)?, &rows)?;
    info!("wrote {} PoPs to {}", rows.len(), args.output.display());
    Ok(())
}

#[derive(Debug, Args)]
pub struct AttributeCablesArgs {
    /// Unique links file
    #[arg(long)]
    pub links: PathBuf,

    #[arg(long)]
    pub node_as: PathBuf,

    #[arg(long)]
    pub site_mapping: PathBuf,

    #[arg(long)]
    pub facilities: PathBuf,

    #[arg(long)]
    pub cities: PathBuf,

    #[arg(long)]
    pub land_cables: PathBuf,

    /// Submarine cable landings; requires --landing-points
    #[arg(long, requires = "landing_points")]
    pub submarine_cables: Option<PathBuf>,

    #[arg(long)]
    pub landing_points: Option<PathBuf>,

    #[arg(short, long)]
    pub output: PathBuf,
}

pub fn run_attribute_cables(args: &AttributeCablesArgs) -> Result<()> {
    let links = topology::read_unique_links(open(&args.links)?)
        .with_context(|| format!("reading {}", args.links.display()))?;
    let node_as = topology::read_node_as(open(&args.node_as)?)
        .with_context(|| format!("reading {}", args.node_as.display()))?;
    let sites = load_site_mapping(&args.site_mapping)?;
    let facilities = dataset::read_facilities(open(&args.facilities)?)?;
    let cities = dataset::read_cities(open(&args.cities)?)?;
    let land = dataset::read_land_cables(open(&args.land_cables)?, &cities)?;

    let (submarine, lp_city) = match (&args.submarine_cables, &args.landing_points) {
        (Some(cables), Some(landing_points)) => {
            let landing_points = dataset::read_landing_points(open(landing_points)?)?;
            (
                dataset::read_submarine_cables(open(cables)?)?,
                dataset::landing_points_to_cities(&landing_points, &cities)?,
            )
        }
        _ => Default::default(),
    };

    let graph = build_cable_graph(&land, &submarine, &lp_city)?;
    let facility_cities = dataset::place_facilities(&facilities, &cities)?;
    let resolver = NodeCityResolver::new(
        sites
            .iter()
            .filter_map(|s| s.site.map(|site| (s.node, site))),
        &facility_cities,
        &cities,
    );

    info!(
        "{} of {} mapped nodes placed in a city",
        resolver.len(),
        sites.len()
    );

    let report = attribute_links(&graph, &links, &resolver);
    if !report.unresolved.is_empty() {
        warn!("{} links left without cables", report.unresolved.len());
    }
    for link in report.attributed.iter().filter(|l| l.path.uses_submarine()) {
        debug!(
            "{} {:?} -> {:?}: land {:?} submarine {:?}",
            link.link.link_id,
            cities.locality(link.src_city),
            cities.locality(link.dst_city),
            link.path.land_cable_ids(),
            link.path.submarine_cable_ids()
        );
    }
    let rows: Vec<LinkRow> = report
        .attributed
        .iter()
        .map(|link| LinkRow::new(link, &node_as))
        .collect();
    dataset::write_link_file(create(&args.output)?, &rows)?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MappingKind {
    Facility,
    Landing,
}

#[derive(Debug, Args)]
pub struct StatsArgs {
    /// Mapping file to summarize
    #[arg(long)]
    pub mapping: PathBuf,

    #[arg(long, value_enum, default_value_t = MappingKind::Facility)]
    pub kind: MappingKind,

    /// Unique links; with --node-geo restricts the summary to nodes needing submarine cables
    #[arg(long, requires = "node_geo")]
    pub links: Option<PathBuf>,

    #[arg(long)]
    pub node_geo: Option<PathBuf>,
}

pub fn run_stats(args: &StatsArgs) -> Result<()> {
    let mut records: Vec<(NodeId, f64)> = match args.kind {
        MappingKind::Facility => load_site_mapping(&args.mapping)?
            .into_iter()
            .map(|s| (s.node, s.distance))
            .collect(),
        MappingKind::Landing => load_landing_mapping(&args.mapping)?
            .into_iter()
            .map(|m| (m.node, m.distance))
            .collect(),
    };

    if let (Some(links), Some(node_geo)) = (&args.links, &args.node_geo) {
        let links = topology::read_unique_links(open(links)?)
            .with_context(|| format!("reading {}", links.display()))?;
        let node_geo = load_node_geo(node_geo)?;
        let needed = nodes_needing_submarine(&links, &node_geo);
        records.retain(|(nid, _)| needed.contains(nid));
    }

    let distances: Vec<f64> = records.into_iter().map(|(_, d)| d).collect();
    match DistanceSummary::from_distances(&distances) {
        Some(summary) => summary.log(&args.mapping.display().to_string()),
        None => warn!("no distances in {}", args.mapping.display()),
    }
    Ok(())
}

#[derive(Debug, Args)]
pub struct LinkDegreeArgs {
    /// Unique links
    #[arg(long)]
    pub links: PathBuf,

    #[arg(long)]
    pub node_as: PathBuf,
}

pub fn run_link_degree(args: &LinkDegreeArgs) -> Result<()> {
    let links = topology::read_unique_links(open(&args.links)?)
        .with_context(|| format!("reading {}", args.links.display()))?;
    let node_as = topology::read_node_as(open(&args.node_as)?)
        .with_context(|| format!("reading {}", args.node_as.display()))?;
    log_as_pair_degrees(&as_pair_degrees(&links, &node_as));
    Ok(())
}
