use petgraph::algo::astar;
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;

use super::graph::{CableGraph, CableKind};

/// One traversed cable between two adjacent cities
#[derive(Debug, Clone, PartialEq)]
pub struct PathHop {
    pub from: usize,
    pub to: usize,
    pub cable_id: String,
    pub kind: CableKind,
    pub length_km: f64,
}

/// Minimum-length route between two cities, hop by hop
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AttributedPath {
    pub hops: Vec<PathHop>,
    pub total_km: f64,
}

impl AttributedPath {
    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }

    /// Cable ids in traversal order
    pub fn cable_ids(&self) -> Vec<&str> {
        self.hops.iter().map(|h| h.cable_id.as_str()).collect()
    }

    pub fn land_cable_ids(&self) -> Vec<&str> {
        self.ids_of(CableKind::Land)
    }

    pub fn submarine_cable_ids(&self) -> Vec<&str> {
        self.ids_of(CableKind::Submarine)
    }

    pub fn uses_submarine(&self) -> bool {
        self.hops.iter().any(|h| h.kind == CableKind::Submarine)
    }

    fn ids_of(&self, kind: CableKind) -> Vec<&str> {
        self.hops
            .iter()
            .filter(|h| h.kind == kind)
            .map(|h| h.cable_id.as_str())
            .collect()
    }
}

/// Shortest cable route between two cities
///
/// Returns `None` when either city has no cable or the two are disconnected.
/// The same city on both ends yields an empty path.
pub fn shortest_cable_path(
    graph: &CableGraph,
    src_city: usize,
    dst_city: usize,
) -> Option<AttributedPath> {
    let src = graph.node(src_city)?;
    let dst = graph.node(dst_city)?;

    // zero heuristic: plain Dijkstra with the node sequence kept
    let (total_km, nodes) = astar(
        graph.graph(),
        src,
        |n| n == dst,
        |e| e.weight().length_km,
        |_| 0.0,
    )?;

    let hops = nodes
        .windows(2)
        .map(|w| cheapest_hop(graph, w[0], w[1]))
        .collect::<Option<Vec<_>>>()?;
    Some(AttributedPath { hops, total_km })
}

/// Lightest of the parallel edges between `a` and `b`; the earliest one on ties
fn cheapest_hop(graph: &CableGraph, a: NodeIndex, b: NodeIndex) -> Option<PathHop> {
    let edge = graph.graph().edges_connecting(a, b).min_by(|x, y| {
        x.weight()
            .length_km
            .total_cmp(&y.weight().length_km)
            .then_with(|| x.id().cmp(&y.id()))
    })?;
    let cable = edge.weight();
    Some(PathHop {
        from: graph.city(a)?,
        to: graph.city(b)?,
        cable_id: cable.cable_id.clone(),
        kind: cable.kind,
        length_km: cable.length_km,
    })
}
