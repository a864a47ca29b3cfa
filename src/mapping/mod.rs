//! Nearest facility / city / landing point mapping over a K-D Tree
pub mod mapper;
pub mod reference;


pub use mapper::{
    JointMappingConfig, MappingConfig, MappingReport, MatchOutcome, Outcome, SiteMatch,
    UNMATCHED, map_points, map_points_to_reference, map_to_facility_and_city,
};
pub use reference::ReferenceIndex;
