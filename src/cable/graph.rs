use std::collections::HashMap;

use petgraph::graph::{NodeIndex, UnGraph};
use tracing::{debug, info};

use crate::cluster::{GeoPoint, Locality, PointList};
use crate::error::{NetGeoError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CableKind {
    Land,
    Submarine,
}

/// Edge payload: which cable connects two cities and how long it is
#[derive(Debug, Clone, PartialEq)]
pub struct CableEdge {
    pub cable_id: String,
    pub kind: CableKind,
    pub length_km: f64,
}

/// A terrestrial path between two cities, identified by its row position
#[derive(Debug, Clone, PartialEq)]
pub struct LandCableSegment {
    pub segment_id: usize,
    pub from: usize,
    pub to: usize,
    pub length_km: f64,
}

/// A submarine cable and the landing points it touches
#[derive(Debug, Clone, PartialEq)]
pub struct SubmarineCable {
    pub cable_id: String,
    pub length_km: f64,
    pub landing_points: Vec<usize>,
}

/// Cities in file order, addressable by position or by locality
///
/// Positions are row numbers of the city table; when a locality repeats, the
/// first row owns it.
#[derive(Debug, Clone, Default)]
pub struct CityIndex {
    localities: Vec<Locality>,
    points: PointList,
    positions: HashMap<Locality, usize>,
}

impl CityIndex {
    pub fn new(rows: impl IntoIterator<Item = (Locality, GeoPoint)>) -> Self {
        let mut index = CityIndex::default();
        for (locality, point) in rows {
            let pos = index.localities.len();
            index.positions.entry(locality.clone()).or_insert(pos);
            index.localities.push(locality);
            index.points.push(point);
        }
        if index.positions.len() < index.localities.len() {
            debug!(
                "{} city rows repeat an earlier locality",
                index.localities.len() - index.positions.len()
            );
        }
        index
    }

    pub fn len(&self) -> usize {
        self.localities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.localities.is_empty()
    }

    pub fn position(&self, locality: &Locality) -> Option<usize> {
        self.positions.get(locality).copied()
    }

    pub fn locality(&self, pos: usize) -> Option<&Locality> {
        self.localities.get(pos)
    }

    /// Position owning the locality of row `pos`; later duplicate rows map to the first
    pub fn canonical(&self, pos: usize) -> Option<usize> {
        self.locality(pos).and_then(|l| self.position(l))
    }

    pub fn localities(&self) -> &[Locality] {
        &self.localities
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }
}

/// Undirected multigraph over city positions
///
/// Parallel edges are kept: two cities may be linked by several land
/// segments and several submarine cables at once.
#[derive(Debug, Default)]
pub struct CableGraph {
    graph: UnGraph<usize, CableEdge>,
    nodes: HashMap<usize, NodeIndex>,
}

impl CableGraph {
    fn node_or_insert(&mut self, city: usize) -> NodeIndex {
        let graph = &mut self.graph;
        *self
            .nodes
            .entry(city)
            .or_insert_with(|| graph.add_node(city))
    }

    fn add_cable(&mut self, from: usize, to: usize, edge: CableEdge) {
        let a = self.node_or_insert(from);
        let b = self.node_or_insert(to);
        self.graph.add_edge(a, b, edge);
    }

    pub fn node(&self, city: usize) -> Option<NodeIndex> {
        self.nodes.get(&city).copied()
    }

    pub fn city(&self, node: NodeIndex) -> Option<usize> {
        self.graph.node_weight(node).copied()
    }

    pub fn graph(&self) -> &UnGraph<usize, CableEdge> {
        &self.graph
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

fn check_length(cable_id: &str, length_km: f64) -> Result<()> {
    if !length_km.is_finite() || length_km < 0.0 {
        return Err(NetGeoError::InvalidArgument(format!(
            "cable {cable_id} has invalid length {length_km}"
        )));
    }
    Ok(())
}

/// Builds the city-level cable graph
///
/// Each land segment contributes one edge. Each submarine cable contributes a
/// clique over the distinct cities of its landing points, every edge carrying
/// the full cable length. Landing points missing from `landing_point_to_city`
/// are skipped.
///
/// # Errors
///
/// [`NetGeoError::InvalidArgument`] when a cable length is negative or not finite.
pub fn build_cable_graph(
    land_segments: &[LandCableSegment],
    submarine_cables: &[SubmarineCable],
    landing_point_to_city: &HashMap<usize, usize>,
) -> Result<CableGraph> {
    let mut cg = CableGraph::default();

    let mut self_loops = 0usize;
    for seg in land_segments {
        let cable_id = seg.segment_id.to_string();
        check_length(&cable_id, seg.length_km)?;
        if seg.from == seg.to {
            self_loops += 1;
            continue;
        }
        cg.add_cable(
            seg.from,
            seg.to,
            CableEdge {
                cable_id,
                kind: CableKind::Land,
                length_km: seg.length_km,
            },
        );
    }
    let land_edges = cg.edge_count();

    let mut unmapped = 0usize;
    for cable in submarine_cables {
        check_length(&cable.cable_id, cable.length_km)?;

        let mut cities: Vec<usize> = Vec::with_capacity(cable.landing_points.len());
        for lp in &cable.landing_points {
            match landing_point_to_city.get(lp) {
                Some(city) if !cities.contains(city) => cities.push(*city),
                Some(_) => {}
                None => {
                    debug!("cable {}: landing point {} has no city", cable.cable_id, lp);
                    unmapped += 1;
                }
            }
        }

        for (i, &a) in cities.iter().enumerate() {
            for &b in &cities[i + 1..] {
                cg.add_cable(
                    a,
                    b,
                    CableEdge {
                        cable_id: cable.cable_id.clone(),
                        kind: CableKind::Submarine,
                        length_km: cable.length_km,
                    },
                );
            }
        }
    }

    info!(
        "cable graph: {} cities, {} land edges ({} self-loops skipped), {} submarine edges ({} landing points unmapped)",
        cg.node_count(),
        land_edges,
        self_loops,
        cg.edge_count() - land_edges,
        unmapped
    );
    Ok(cg)
}
