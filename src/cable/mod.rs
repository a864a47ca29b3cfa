//! City-level cable graph and attribution of topology links to cables
pub mod attribution;
pub mod graph;
pub mod path;

#[cfg(test)]
mod attribution_test;

pub use attribution::{
    AttributedLink, AttributionReport, LinkType, NodeCityResolver, NodeSite, Unresolved,
    attribute_links, infer_link_type,
};
pub use graph::{
    CableEdge, CableGraph, CableKind, CityIndex, LandCableSegment, SubmarineCable,
    build_cable_graph,
};
pub use path::{AttributedPath, PathHop, shortest_cable_path};
