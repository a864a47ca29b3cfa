//! ITDK topology handling: node.AS, node.geo and link files
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::io::{BufRead, Write};
use std::str::FromStr;

use tracing::{info, warn};

use crate::cluster::{ClusterStrategy, GeoPoint, PointTable, cluster_points};
use crate::error::{NetGeoError, Result};

pub type NodeId = u64;
pub type Asn = u32;

/// Geolocation of a node, with the original line kept for rewriting
#[derive(Debug, Clone, PartialEq)]
pub struct NodeGeo {
    pub continent: String,
    pub point: GeoPoint,
    pub raw: String,
}

/// A (possibly multi-party) link as listed in the ITDK links file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub id: String,
    pub members: Vec<NodeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkTag {
    Ixp,
    Others,
}

impl fmt::Display for LinkTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkTag::Ixp => write!(f, "IXP"),
            LinkTag::Others => write!(f, "Others"),
        }
    }
}

impl FromStr for LinkTag {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "IXP" => Ok(LinkTag::Ixp),
            "Others" => Ok(LinkTag::Others),
            other => Err(format!("unknown link tag {other:?}")),
        }
    }
}

/// A unique node pair derived from a link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyLink {
    pub link_id: String,
    pub src: NodeId,
    pub dst: NodeId,
    pub tag: LinkTag,
}

/// Node and link tables of one topology snapshot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Topology {
    pub node_as: BTreeMap<NodeId, Asn>,
    pub node_geo: BTreeMap<NodeId, NodeGeo>,
    pub links: Vec<Link>,
}

impl Topology {
    /// Coordinates of every geolocated node
    pub fn point_table(&self) -> PointTable<NodeId> {
        self.node_geo
            .iter()
            .map(|(&nid, geo)| (nid, geo.point))
            .collect()
    }
}

fn malformed(kind: &'static str, line: usize, reason: impl Into<String>) -> NetGeoError {
    NetGeoError::Malformed {
        kind,
        line,
        reason: reason.into(),
    }
}

/// Parses `N123`, `N123:` or `N123:10.0.0.1`
pub fn parse_node_id(token: &str) -> Option<NodeId> {
    let token = token.split(':').next()?;
    token.strip_prefix('N')?.parse().ok()
}

/// Iterates over the meaningful lines of an ITDK file, numbered from 1
fn data_lines<R: BufRead>(reader: R) -> impl Iterator<Item = Result<(usize, String)>> {
    reader
        .lines()
        .enumerate()
        .filter_map(|(i, line)| match line {
            Ok(l) if l.trim().is_empty() || l.starts_with('#') => None,
            Ok(l) => Some(Ok((i + 1, l))),
            Err(e) => Some(Err(e.into())),
        })
}

/// Reads `node.AS N<id> <asn> [tag]` lines
pub fn read_node_as<R: BufRead>(reader: R) -> Result<BTreeMap<NodeId, Asn>> {
    const KIND: &str = "node.AS";
    let mut node_as = BTreeMap::new();
    for line in data_lines(reader) {
        let (no, line) = line?;
        let mut items = line.split_whitespace();
        if items.next() != Some(KIND) {
            return Err(malformed(KIND, no, "missing node.AS prefix"));
        }
        let nid = items
            .next()
            .and_then(parse_node_id)
            .ok_or_else(|| malformed(KIND, no, "bad node id"))?;
        let asn = items
            .next()
            .and_then(|a| a.parse().ok())
            .ok_or_else(|| malformed(KIND, no, "bad AS number"))?;
        node_as.insert(nid, asn);
    }
    Ok(node_as)
}

/// Reads tab-separated `node.geo N<id>:` lines; latitude and longitude are fields 5 and 6
pub fn read_node_geo<R: BufRead>(reader: R) -> Result<BTreeMap<NodeId, NodeGeo>> {
    const KIND: &str = "node.geo";
    let mut node_geo = BTreeMap::new();
    for line in data_lines(reader) {
        let (no, line) = line?;
        let items: Vec<&str> = line.split('\t').collect();
        let mut head = items[0].split_whitespace();
        if head.next() != Some(KIND) {
            return Err(malformed(KIND, no, "missing node.geo prefix"));
        }
        let nid = head
            .next()
            .and_then(parse_node_id)
            .ok_or_else(|| malformed(KIND, no, "bad node id"))?;
        if items.len() < 7 {
            return Err(malformed(KIND, no, format!("{} fields, need 7", items.len())));
        }
        let coord = |i: usize| -> Result<f64> {
            items[i]
                .trim()
                .parse()
                .map_err(|_| malformed(KIND, no, format!("bad coordinate {:?}", items[i])))
        };
        let point = GeoPoint::new(coord(5)?, coord(6)?);
        node_geo.insert(
            nid,
            NodeGeo {
                continent: items[1].trim().to_string(),
                point,
                raw: line.clone(),
            },
        );
    }
    Ok(node_geo)
}

/// Reads `link L<id>: N<a>[:ip] N<b>[:ip] ...` lines
///
/// A trailing `IXP`/`Others` tag, as written for unique links, is ignored.
pub fn read_links<R: BufRead>(reader: R) -> Result<Vec<Link>> {
    const KIND: &str = "link";
    let mut links = Vec::new();
    for line in data_lines(reader) {
        let (no, line) = line?;
        let mut items = line.split_whitespace();
        if items.next() != Some(KIND) {
            return Err(malformed(KIND, no, "missing link prefix"));
        }
        let id = items
            .next()
            .map(|id| id.trim_end_matches(':').to_string())
            .ok_or_else(|| malformed(KIND, no, "missing link id"))?;
        let mut members = Vec::new();
        for member in items {
            if member.parse::<LinkTag>().is_ok() {
                continue;
            }
            members.push(
                parse_node_id(member)
                    .ok_or_else(|| malformed(KIND, no, format!("bad member {member:?}")))?,
            );
        }
        links.push(Link { id, members });
    }
    Ok(links)
}

/// Reads `link L<n>: N<a> N<b> <tag>` lines
pub fn read_unique_links<R: BufRead>(reader: R) -> Result<Vec<TopologyLink>> {
    const KIND: &str = "unique link";
    let mut links = Vec::new();
    for line in data_lines(reader) {
        let (no, line) = line?;
        let items: Vec<&str> = line.split_whitespace().collect();
        if items.len() != 5 || items[0] != "link" {
            return Err(malformed(KIND, no, "expected `link L<n>: N<a> N<b> <tag>`"));
        }
        let node = |i: usize| {
            parse_node_id(items[i])
                .ok_or_else(|| malformed(KIND, no, format!("bad node id {:?}", items[i])))
        };
        links.push(TopologyLink {
            link_id: items[1].trim_end_matches(':').to_string(),
            src: node(2)?,
            dst: node(3)?,
            tag: items[4].parse().map_err(|e: String| malformed(KIND, no, e))?,
        });
    }
    Ok(links)
}

pub fn write_node_as<W: Write>(mut w: W, node_as: &BTreeMap<NodeId, Asn>) -> Result<()> {
    for (nid, asn) in node_as {
        writeln!(w, "node.AS N{} {}", nid, asn)?;
    }
    Ok(())
}

pub fn write_node_geo<W: Write>(mut w: W, node_geo: &BTreeMap<NodeId, NodeGeo>) -> Result<()> {
    for geo in node_geo.values() {
        writeln!(w, "{}", geo.raw)?;
    }
    Ok(())
}

fn join_members(members: &[NodeId]) -> String {
    members
        .iter()
        .map(|nid| format!("N{nid}"))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn write_links<W: Write>(mut w: W, links: &[Link]) -> Result<()> {
    for link in links {
        writeln!(w, "link {}: {}", link.id, join_members(&link.members))?;
    }
    Ok(())
}

pub fn write_unique_links<W: Write>(mut w: W, links: &[TopologyLink]) -> Result<()> {
    for link in links {
        writeln!(
            w,
            "link {}: N{} N{} {}",
            link.link_id, link.src, link.dst, link.tag
        )?;
    }
    Ok(())
}

/// Removes repeated members, keeping first occurrences
fn dedup_members(members: impl IntoIterator<Item = NodeId>) -> Vec<NodeId> {
    let mut seen = HashSet::new();
    members.into_iter().filter(|m| seen.insert(*m)).collect()
}

/// Keeps the inter-domain part of a topology
///
/// Nodes survive when they have both an AS and a geolocation. A link survives
/// when its surviving members belong to more than one AS; its member list is
/// restricted to those nodes.
pub fn extract_interdomain_links(
    node_as: &BTreeMap<NodeId, Asn>,
    node_geo: &BTreeMap<NodeId, NodeGeo>,
    links: &[Link],
) -> Topology {
    let node_as: BTreeMap<NodeId, Asn> = node_as
        .iter()
        .filter(|(nid, _)| node_geo.contains_key(nid))
        .map(|(&nid, &asn)| (nid, asn))
        .collect();
    let node_geo: BTreeMap<NodeId, NodeGeo> = node_geo
        .iter()
        .filter(|(nid, _)| node_as.contains_key(nid))
        .map(|(&nid, geo)| (nid, geo.clone()))
        .collect();

    let links: Vec<Link> = links
        .iter()
        .filter_map(|link| {
            let members = dedup_members(
                link.members
                    .iter()
                    .copied()
                    .filter(|m| node_as.contains_key(m)),
            );
            let ases: HashSet<Asn> = members.iter().map(|m| node_as[m]).collect();
            (ases.len() > 1).then(|| Link {
                id: link.id.clone(),
                members,
            })
        })
        .collect();

    info!(
        "extracted {} inter-domain links over {} nodes",
        links.len(),
        node_as.len()
    );
    Topology {
        node_as,
        node_geo,
        links,
    }
}

/// Merges nearby nodes of the same AS into one representative
///
/// Each AS's nodes are clustered with `strategy`; every node maps to its
/// cluster's seed. Only representatives are kept, links are relabelled to
/// them, links collapsing to a single node are dropped and the rest are
/// renumbered `L1..`.
///
/// # Errors
///
/// [`NetGeoError::InvalidArgument`] for an invalid `min_distance`.
pub fn group_proximity_nodes(
    topology: &Topology,
    strategy: ClusterStrategy,
    min_distance: f64,
) -> Result<Topology> {
    let table = topology.point_table();

    let mut nodes_per_as: BTreeMap<Asn, Vec<NodeId>> = BTreeMap::new();
    for (&nid, &asn) in &topology.node_as {
        if table.contains_key(&nid) {
            nodes_per_as.entry(asn).or_default().push(nid);
        } else {
            warn!("node N{} (AS{}) has no geolocation, dropped", nid, asn);
        }
    }

    let mut representative: HashMap<NodeId, NodeId> = HashMap::with_capacity(table.len());
    for (step, nids) in nodes_per_as.values().enumerate() {
        for cluster in cluster_points(strategy, nids, &table, min_distance)? {
            let Some(&seed) = cluster.seed() else {
                continue;
            };
            for &nid in &cluster.members {
                representative.insert(nid, seed);
            }
        }
        if (step + 1) % 100 == 0 {
            info!("processed {} ASes", step + 1);
        }
    }

    let is_representative = |nid: &NodeId| representative.get(nid) == Some(nid);
    let node_as: BTreeMap<NodeId, Asn> = topology
        .node_as
        .iter()
        .filter(|(nid, _)| is_representative(nid))
        .map(|(&nid, &asn)| (nid, asn))
        .collect();
    let node_geo: BTreeMap<NodeId, NodeGeo> = topology
        .node_geo
        .iter()
        .filter(|(nid, _)| is_representative(nid))
        .map(|(&nid, geo)| (nid, geo.clone()))
        .collect();

    let mut links = Vec::new();
    for link in &topology.links {
        let members = dedup_members(
            link.members
                .iter()
                .filter_map(|m| representative.get(m).copied()),
        );
        if members.len() > 1 {
            links.push(Link {
                id: format!("L{}", links.len() + 1),
                members,
            });
        }
    }

    info!(
        "grouped {} nodes into {} representatives, {} links kept",
        representative.len(),
        node_as.len(),
        links.len()
    );
    Ok(Topology {
        node_as,
        node_geo,
        links,
    })
}

/// Expands links into unique node pairs
///
/// Members are sorted by id and every unordered pair is emitted once, in
/// first-seen order, numbered `L1..`. Pairs from links with more than two
/// members are tagged IXP.
pub fn unique_links(links: &[Link]) -> Vec<TopologyLink> {
    let mut seen: HashSet<(NodeId, NodeId)> = HashSet::new();
    let mut out = Vec::new();
    for link in links {
        let mut members = dedup_members(link.members.iter().copied());
        members.sort_unstable();
        let tag = if members.len() > 2 {
            LinkTag::Ixp
        } else {
            LinkTag::Others
        };
        for (i, &src) in members.iter().enumerate() {
            for &dst in &members[i + 1..] {
                if seen.insert((src, dst)) {
                    out.push(TopologyLink {
                        link_id: format!("L{}", out.len() + 1),
                        src,
                        dst,
                        tag,
                    });
                }
            }
        }
    }
    info!("extracted {} unique links", out.len());
    out
}
