#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use crate::cluster::neighborhood::cluster_by_neighborhood;
    use crate::cluster::{GeoPoint, PointTable};

    fn sample_table() -> PointTable<usize> {
        [
            GeoPoint::new(59.955982, 30.244759),
            GeoPoint::new(59.955975, 30.24472),
            GeoPoint::new(59.96698, 30.244358),
            GeoPoint::new(59.951557, 30.258387),
            GeoPoint::new(60.029499, 30.434124),
        ]
        .into_iter()
        .enumerate()
        .collect()
    }

    #[test]
    fn test_neighborhood_basic() {
        let table = sample_table();
        let ids: Vec<usize> = (0..5).collect();
        let clusters = cluster_by_neighborhood(&ids, &table, 0.8, 2).unwrap();

        // Verify that clusters cover whole set of points exactly once
        let mut all_points = vec![0; ids.len()];
        for cluster in &clusters {
            for &i in &cluster.members {
                all_points[i] += 1;
            }
        }
        assert!(all_points.iter().all(|&b| b == 1));

        // 0 and 1 are meters apart; 2 is ~1.2 km north, 3 ~0.9 km south-east, 4 far out
        let dense: HashSet<usize> = clusters[0].members.iter().copied().collect();
        assert_eq!(dense, HashSet::from([0, 1]));
        assert_eq!(clusters.len(), 4);
        assert!(clusters[1..].iter().all(|c| c.len() == 1));
    }

    #[test]
    fn test_neighborhood_min_points_turns_sparse_points_into_singletons() {
        let table = sample_table();
        let ids: Vec<usize> = (0..5).collect();
        let clusters = cluster_by_neighborhood(&ids, &table, 0.8, 10).unwrap();
        assert_eq!(clusters.len(), 5);
        assert!(clusters.iter().all(|c| c.len() == 1));
        assert_eq!(clusters[4].centroid, GeoPoint::new(60.0295, 30.4341));
    }

    #[test]
    fn test_neighborhood_wide_radius_merges_everything() {
        let table = sample_table();
        let ids: Vec<usize> = (0..5).collect();
        let clusters = cluster_by_neighborhood(&ids, &table, 15.0, 1).unwrap();
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].seed(), Some(&0));
    }
}
