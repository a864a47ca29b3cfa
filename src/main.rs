//! Network topology geo pre-processing tool
//!
//! Groups nearby router nodes into points of presence, maps them to colocation
//! facilities, cities and cable landing points, and attributes inter-domain
//! links to the land and submarine cables they most likely ride on.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cable;
mod cluster;
mod commands;
mod dataset;
mod error;
mod mapping;
mod stats;
mod topology;

#[cfg(test)]
mod stats_test;

#[derive(Parser)]
#[command(name = "rust_netgeo_prep")]
#[command(about = "Geospatial pre-processing of Internet topology data", long_about = None)]
struct Cli {
    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    /// Only report warnings and errors
    #[arg(long, global = true, conflicts_with = "debug")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Cluster a latitude,longitude CSV by proximity
    Cluster(commands::ClusterArgs),
    /// Keep nodes with AS and geolocation and the links spanning several ASes
    ExtractLinks(commands::TopologyArgs),
    /// Merge nearby nodes of each AS into one representative
    GroupNodes(commands::GroupNodesArgs),
    /// Expand links into unique node pairs tagged IXP or Others
    UniqueLinks(commands::UniqueLinksArgs),
    /// Map nodes to their nearest facility
    MapFacilities(commands::MapFacilitiesArgs),
    /// Relabel facilities with the locality of their city
    CompleteFacilities(commands::CompleteFacilitiesArgs),
    /// Map nodes to their nearest cable landing point
    MapLandingPoints(commands::MapLandingPointsArgs),
    /// Map nodes to a facility, falling back to a city
    MapSites(commands::MapSitesArgs),
    /// Write the PoP CSV from topology and mapping files
    PopFile(commands::PopFileArgs),
    /// Attribute unique links to land and submarine cables
    AttributeCables(commands::AttributeCablesArgs),
    /// Summarize the distances of a mapping file
    Stats(commands::StatsArgs),
    /// Count links per node and AS pair
    LinkDegree(commands::LinkDegreeArgs),
}

fn init_logging(cli: &Cli) {
    let level = if cli.debug {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    // RUST_LOG wins over the flags
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(command: &Command) -> anyhow::Result<()> {
    match command {
        Command::Cluster(args) => commands::run_cluster(args),
        Command::ExtractLinks(args) => commands::run_extract_links(args),
        Command::GroupNodes(args) => commands::run_group_nodes(args),
        Command::UniqueLinks(args) => commands::run_unique_links(args),
        Command::MapFacilities(args) => commands::run_map_facilities(args),
        Command::CompleteFacilities(args) => commands::run_complete_facilities(args),
        Command::MapLandingPoints(args) => commands::run_map_landing_points(args),
        Command::MapSites(args) => commands::run_map_sites(args),
        Command::PopFile(args) => commands::run_pop_file(args),
        Command::AttributeCables(args) => commands::run_attribute_cables(args),
        Command::Stats(args) => commands::run_stats(args),
        Command::LinkDegree(args) => commands::run_link_degree(args),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);
    run(&cli.command)
}
