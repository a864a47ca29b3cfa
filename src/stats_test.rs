#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use crate::cluster::GeoPoint;
    use crate::stats::{
        DistanceSummary, as_pair_degrees, nodes_needing_submarine, percentiles,
    };
    use crate::topology::{LinkTag, NodeGeo, TopologyLink};

    #[test]
    fn test_summary_matches_linear_percentiles() {
        let summary = DistanceSummary::from_distances(&[4.0, 1.0, 3.0, 2.0]).unwrap();
        assert_eq!(summary.count, 4);
        assert_eq!(summary.mean, 2.5);
        assert_eq!(summary.median, 2.5);
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.max, 4.0);
        assert!((summary.std - 1.118033988749895).abs() < 1e-12);

        assert_eq!(summary.percentiles.len(), 21);
        assert_eq!(summary.percentiles[0], (0, 1.0));
        assert_eq!(summary.percentiles[5], (25, 1.75));
        assert_eq!(summary.percentiles[20], (100, 4.0));
    }

    #[test]
    fn test_summary_of_nothing() {
        assert!(DistanceSummary::from_distances(&[]).is_none());
        assert!(DistanceSummary::from_distances(&[f64::NAN]).is_none());

        let single = DistanceSummary::from_distances(&[7.5]).unwrap();
        assert_eq!(single.std, 0.0);
        assert!(single.percentiles.iter().all(|&(_, v)| v == 7.5));
    }

    fn geo(continent: &str, lat: f64, lon: f64) -> NodeGeo {
        NodeGeo {
            continent: continent.to_string(),
            point: GeoPoint::new(lat, lon),
            raw: String::new(),
        }
    }

    fn link(src: u64, dst: u64) -> TopologyLink {
        TopologyLink {
            link_id: format!("L{src}"),
            src,
            dst,
            tag: LinkTag::Others,
        }
    }

    #[test]
    fn test_nodes_needing_submarine() {
        let node_geo = BTreeMap::from([
            (1, geo("EU", 38.72, -9.14)),
            (2, geo("EU", 41.15, -8.61)),
            (3, geo("NA", 40.71, -74.0)),
            // same continent, ~7000 km apart
            (4, geo("AS", 35.68, 139.69)),
            (5, geo("AS", 25.2, 55.27)),
        ]);
        let links = vec![link(1, 2), link(2, 3), link(4, 5), link(1, 99)];
        assert_eq!(
            nodes_needing_submarine(&links, &node_geo),
            BTreeSet::from([2, 3, 4, 5])
        );
    }

    #[test]
    fn test_as_pair_degrees_counts_both_endpoints() {
        let node_as = BTreeMap::from([(1, 100), (2, 200), (3, 200), (4, 300)]);
        let links = vec![link(1, 2), link(1, 3), link(2, 1), link(4, 1), link(1, 99)];
        let degrees = as_pair_degrees(&links, &node_as);
        assert_eq!(
            degrees,
            vec![
                ((100, 200, 1), 2),
                ((100, 200, 2), 1),
                ((100, 200, 3), 1),
                ((200, 100, 1), 1),
                ((200, 100, 2), 1),
                ((300, 100, 1), 1),
                ((300, 100, 4), 1),
            ]
        );
    }

    #[test]
    fn test_degree_percentiles_in_steps_of_two() {
        let levels = percentiles(&[1.0, 1.0, 1.0, 2.0, 5.0], 2).unwrap();
        assert_eq!(levels.len(), 51);
        assert_eq!(levels[0], (0, 1.0));
        assert_eq!(levels[25], (50, 1.0));
        assert_eq!(levels[50], (100, 5.0));
        assert!(percentiles(&[], 2).is_none());
    }
}
