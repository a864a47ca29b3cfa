use std::collections::HashMap;
use std::fmt;

use tracing::{debug, info};

use super::graph::{CableGraph, CityIndex};
use super::path::{AttributedPath, shortest_cable_path};
use crate::topology::{LinkTag, NodeId, TopologyLink};

/// Physical medium class of an attributed link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkType {
    Ixp,
    Direct,
    SubmarineCable,
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkType::Ixp => write!(f, "IXP"),
            LinkType::Direct => write!(f, "Direct"),
            LinkType::SubmarineCable => write!(f, "Submarine-cable"),
        }
    }
}

/// Submarine hops dominate; otherwise the topology tag decides
pub fn infer_link_type(tag: LinkTag, path: &AttributedPath) -> LinkType {
    if path.uses_submarine() {
        LinkType::SubmarineCable
    } else if tag == LinkTag::Ixp {
        LinkType::Ixp
    } else {
        LinkType::Direct
    }
}

/// Where a node was placed by the joint facility/city mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeSite {
    Facility(usize),
    City(usize),
}

/// Resolves topology nodes to city positions
///
/// Built once from the node site mapping and the city placement of every
/// facility (see `dataset::place_facilities`). Positions are normalized to
/// the row owning their locality, the same one land cables attach to.
/// Facilities without a city leave the node unresolved.
#[derive(Debug, Clone, Default)]
pub struct NodeCityResolver {
    node_city: HashMap<NodeId, usize>,
}

impl NodeCityResolver {
    pub fn new<S>(sites: S, facility_cities: &[Option<usize>], cities: &CityIndex) -> Self
    where
        S: IntoIterator<Item = (NodeId, NodeSite)>,
    {
        let mut node_city = HashMap::new();
        let mut dangling = 0usize;
        for (node, site) in sites {
            let city = match site {
                NodeSite::City(pos) => Some(pos),
                NodeSite::Facility(idx) => facility_cities.get(idx).copied().flatten(),
            }
            .and_then(|pos| cities.canonical(pos));
            match city {
                Some(pos) => {
                    node_city.insert(node, pos);
                }
                None => {
                    debug!("node N{} ({:?}) has no known city", node, site);
                    dangling += 1;
                }
            }
        }
        if dangling > 0 {
            info!("{} mapped nodes could not be resolved to a city", dangling);
        }
        NodeCityResolver { node_city }
    }

    pub fn resolve(&self, node: NodeId) -> Option<usize> {
        self.node_city.get(&node).copied()
    }

    pub fn len(&self) -> usize {
        self.node_city.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_city.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttributedLink {
    pub link: TopologyLink,
    pub src_city: usize,
    pub dst_city: usize,
    pub path: AttributedPath,
    pub link_type: LinkType,
}

/// Why a link could not be attributed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unresolved {
    UnmappedNode(NodeId),
    NoPath { src_city: usize, dst_city: usize },
}

#[derive(Debug, Clone, Default)]
pub struct AttributionReport {
    pub attributed: Vec<AttributedLink>,
    pub unresolved: Vec<(TopologyLink, Unresolved)>,
}

impl AttributionReport {
    pub fn submarine_count(&self) -> usize {
        self.attributed
            .iter()
            .filter(|l| l.link_type == LinkType::SubmarineCable)
            .count()
    }
}

fn attribute_one(
    graph: &CableGraph,
    link: &TopologyLink,
    resolver: &NodeCityResolver,
) -> Result<AttributedLink, Unresolved> {
    let src_city = resolver
        .resolve(link.src)
        .ok_or(Unresolved::UnmappedNode(link.src))?;
    let dst_city = resolver
        .resolve(link.dst)
        .ok_or(Unresolved::UnmappedNode(link.dst))?;

    let path = if src_city == dst_city {
        AttributedPath::default()
    } else {
        shortest_cable_path(graph, src_city, dst_city)
            .ok_or(Unresolved::NoPath { src_city, dst_city })?
    };

    Ok(AttributedLink {
        link: link.clone(),
        src_city,
        dst_city,
        link_type: infer_link_type(link.tag, &path),
        path,
    })
}

/// Attributes every link to the cables on its shortest city-level route
///
/// Links that cannot be resolved are collected in
/// [`AttributionReport::unresolved`]; they never abort the batch.
pub fn attribute_links(
    graph: &CableGraph,
    links: &[TopologyLink],
    resolver: &NodeCityResolver,
) -> AttributionReport {
    let mut report = AttributionReport::default();
    for link in links {
        match attribute_one(graph, link, resolver) {
            Ok(attributed) => report.attributed.push(attributed),
            Err(reason) => {
                debug!("link {} unresolved: {:?}", link.link_id, reason);
                report.unresolved.push((link.clone(), reason));
            }
        }
    }

    info!(
        "attributed {}/{} links ({} over submarine cables)",
        report.attributed.len(),
        links.len(),
        report.submarine_count()
    );
    report
}
