#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};

    use quickcheck::QuickCheck;

    use crate::cluster::greedy::{cluster_by_distance_centroid, cluster_by_distance_seed};
    use crate::cluster::{
        Cluster, ClusterStrategy, GeoPoint, PointTable, calc_point_distance, cluster_points,
    };
    use crate::error::NetGeoError;

    fn table(points: &[(u32, f64, f64)]) -> PointTable<u32> {
        points
            .iter()
            .map(|&(id, lat, lon)| (id, GeoPoint::new(lat, lon)))
            .collect()
    }

    fn member_sets(clusters: &[Cluster<u32>]) -> Vec<HashSet<u32>> {
        clusters
            .iter()
            .map(|c| c.members.iter().copied().collect())
            .collect()
    }

    /// Every distinct id shows up in exactly one cluster
    fn is_partition(ids: &[u32], clusters: &[Cluster<u32>]) -> bool {
        let mut seen = HashSet::new();
        for c in clusters {
            if c.is_empty() {
                return false;
            }
            for m in &c.members {
                if !seen.insert(*m) {
                    return false;
                }
            }
        }
        seen == ids.iter().copied().collect::<HashSet<_>>()
    }

    #[test]
    fn test_two_close_points_and_one_far() {
        let t = table(&[(1, 0.0, 0.0), (2, 0.0, 0.001), (3, 10.0, 10.0)]);
        let clusters = cluster_by_distance_centroid(&[1, 2, 3], &t, 50.0).unwrap();
        assert_eq!(
            member_sets(&clusters),
            vec![HashSet::from([1, 2]), HashSet::from([3])]
        );
        assert_eq!(clusters[0].seed(), Some(&1));
        assert_eq!(clusters[0].centroid, GeoPoint::new(0.0, 0.0005));
        assert_eq!(clusters[1].centroid, GeoPoint::new(10.0, 10.0));
    }

    #[test]
    fn test_single_point_is_singleton() {
        let t = table(&[(5, 45.0, 7.0)]);
        for strategy in [
            ClusterStrategy::Centroid,
            ClusterStrategy::Seed,
            ClusterStrategy::Neighborhood { min_points: 1 },
        ] {
            let clusters = cluster_points(strategy, &[5], &t, 50.0).unwrap();
            assert_eq!(clusters.len(), 1);
            assert_eq!(clusters[0].members, vec![5]);
        }
    }

    #[test]
    fn test_zero_distance_gives_singletons() {
        let t = table(&[(1, 0.0, 0.0), (2, 0.0, 0.0), (3, 0.0, 0.0001)]);
        for strategy in [
            ClusterStrategy::Centroid,
            ClusterStrategy::Seed,
            ClusterStrategy::Neighborhood { min_points: 1 },
        ] {
            let clusters = cluster_points(strategy, &[1, 2, 3], &t, 0.0).unwrap();
            assert_eq!(clusters.len(), 3, "{strategy:?}");
        }
    }

    #[test]
    fn test_coincident_points_always_merge() {
        let t = table(&[(1, 12.5, 40.1), (2, 12.5, 40.1), (3, 12.5, 40.1)]);
        for strategy in [
            ClusterStrategy::Centroid,
            ClusterStrategy::Seed,
            ClusterStrategy::Neighborhood { min_points: 1 },
        ] {
            let clusters = cluster_points(strategy, &[1, 2, 3], &t, 0.5).unwrap();
            assert_eq!(clusters.len(), 1, "{strategy:?}");
            assert_eq!(clusters[0].len(), 3);
        }
    }

    #[test]
    fn test_empty_input() {
        let t = table(&[]);
        let clusters = cluster_by_distance_centroid(&[], &t, 50.0).unwrap();
        assert!(clusters.is_empty());
    }

    #[test]
    fn test_duplicate_ids_are_collapsed() {
        let t = table(&[(1, 0.0, 0.0), (2, 5.0, 5.0)]);
        let clusters = cluster_by_distance_centroid(&[1, 2, 1, 2], &t, 10.0).unwrap();
        assert!(is_partition(&[1, 2], &clusters));
        assert_eq!(clusters.len(), 2);
    }

    #[test]
    fn test_invalid_arguments() {
        let t = table(&[(1, 0.0, 0.0)]);
        assert!(matches!(
            cluster_by_distance_centroid(&[1, 2], &t, 10.0),
            Err(NetGeoError::InvalidArgument(_))
        ));
        assert!(matches!(
            cluster_by_distance_seed(&[1], &t, -1.0),
            Err(NetGeoError::InvalidArgument(_))
        ));
        assert!(matches!(
            cluster_points(ClusterStrategy::Centroid, &[1], &t, f64::NAN),
            Err(NetGeoError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_centroid_strategy_resists_chaining() {
        // 0.4 degrees of longitude at the equator is ~44.5 km
        let t = table(&(0..8).map(|i| (i, 0.0, i as f64 * 0.4)).collect::<Vec<_>>());
        let ids: Vec<u32> = (0..8).collect();

        let centroid = cluster_by_distance_centroid(&ids, &t, 50.0).unwrap();
        assert_eq!(
            member_sets(&centroid),
            vec![
                HashSet::from([0, 1]),
                HashSet::from([2, 3]),
                HashSet::from([4, 5]),
                HashSet::from([6, 7]),
            ]
        );

        let chained =
            cluster_points(ClusterStrategy::Neighborhood { min_points: 1 }, &ids, &t, 50.0)
                .unwrap();
        assert_eq!(chained.len(), 1);
        assert_eq!(chained[0].len(), 8);
    }

    #[test]
    fn test_seed_strategy_depends_on_input_order() {
        let t = table(&[(1, 0.0, 0.0), (2, 0.0, 0.4), (3, 0.0, 0.8)]);

        let forward = cluster_by_distance_seed(&[1, 2, 3], &t, 50.0).unwrap();
        assert_eq!(
            member_sets(&forward),
            vec![HashSet::from([1, 2]), HashSet::from([3])]
        );

        let middle_first = cluster_by_distance_seed(&[2, 1, 3], &t, 50.0).unwrap();
        assert_eq!(member_sets(&middle_first), vec![HashSet::from([1, 2, 3])]);
        assert_eq!(middle_first[0].seed(), Some(&2));
        assert_eq!(middle_first[0].centroid, GeoPoint::new(0.0, 0.4));
    }

    #[test]
    fn test_centroid_threshold_on_separated_groups() {
        let groups = [(48.85, 2.35), (51.50, -0.12), (40.71, -74.00)];
        let mut points = Vec::new();
        let mut id = 0;
        for (lat, lon) in groups {
            for k in 0..6 {
                points.push((id, lat + k as f64 * 0.01, lon - k as f64 * 0.013));
                id += 1;
            }
        }
        let t = table(&points);
        let ids: Vec<u32> = (0..id).collect();
        let clusters = cluster_by_distance_centroid(&ids, &t, 30.0).unwrap();

        assert_eq!(clusters.len(), 3);
        for c in &clusters {
            for m in &c.members {
                assert!(calc_point_distance(&t[m], &c.centroid) < 30.0);
            }
        }
    }

    #[test]
    fn prop_every_strategy_partitions_input() {
        fn prop(raw: Vec<(u8, u8)>) -> bool {
            let points: HashMap<u32, GeoPoint> = raw
                .iter()
                .enumerate()
                .map(|(i, &(a, b))| {
                    // ~2 degrees square, so min_distance 50 forms mixed clusters
                    (i as u32, GeoPoint::new(a as f64 / 128.0, b as f64 / 128.0))
                })
                .collect();
            let ids: Vec<u32> = (0..raw.len() as u32).collect();
            [
                ClusterStrategy::Centroid,
                ClusterStrategy::Seed,
                ClusterStrategy::Neighborhood { min_points: 1 },
                ClusterStrategy::Neighborhood { min_points: 3 },
            ]
            .into_iter()
            .all(|s| {
                cluster_points(s, &ids, &points, 50.0)
                    .map(|clusters| is_partition(&ids, &clusters))
                    .unwrap_or(false)
            })
        }
        QuickCheck::new()
            .tests(200)
            .quickcheck(prop as fn(Vec<(u8, u8)>) -> bool);
    }
}
