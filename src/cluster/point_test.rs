#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::super::*;

    #[test]
    fn test_point_accessors_and_rounding() {
        let p = GeoPoint::new(59.955982, 30.244759);
        assert_eq!(p.lat(), 59.955982);
        assert_eq!(p.lon(), 30.244759);
        assert_eq!(p.rounded(4), GeoPoint::new(59.956, 30.2448));
        assert!(p.is_finite());
        assert!(!GeoPoint::new(f64::NAN, 0.0).is_finite());
    }

    #[test]
    fn test_planar_sq_dist() {
        let a = GeoPoint::new(1.0, 1.0);
        let b = GeoPoint::new(4.0, 5.0);
        assert_eq!(a.planar_sq_dist(&b), 25.0);
        assert_eq!(b.planar_sq_dist(&a), 25.0);
    }

    #[test]
    fn test_locality_is_a_structural_key() {
        let mut seen = HashSet::new();
        assert!(seen.insert(Locality::new("Paris", "Ile-de-France", "FR")));
        assert!(!seen.insert(Locality::new("Paris", "Ile-de-France", "FR")));
        assert!(seen.insert(Locality::new("Paris", "Texas", "US")));
    }

    #[test]
    fn test_cluster_accessors() {
        let c1 = Cluster {
            members: vec![4, 2, 9],
            centroid: GeoPoint::new(0.0, 0.0),
        };
        assert_eq!(c1.len(), 3);
        assert!(!c1.is_empty());
        assert_eq!(c1.seed(), Some(&4));
    }
}
