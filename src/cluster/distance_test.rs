#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use quickcheck::{QuickCheck, TestResult};

    use crate::cluster::distance::{
        DEGREE_RAD, EARTH_R, calc_center_pos, calc_point_distance, distance_spherical_fast,
        haversine_km, round_to,
    };
    use crate::cluster::{GeoPoint, PointTable};
    use crate::error::NetGeoError;

    /// Maps two arbitrary integers onto a valid coordinate
    fn coord(a: i16, b: i16) -> GeoPoint {
        GeoPoint::new(
            a as f64 / i16::MAX as f64 * 89.0,
            b as f64 / i16::MAX as f64 * 179.0,
        )
    }

    #[test]
    fn test_one_degree_longitude_at_equator() {
        let d = calc_point_distance(&GeoPoint::new(0.0, 0.0), &GeoPoint::new(0.0, 1.0));
        assert_eq!(d, 111.1949);
    }

    #[test]
    fn test_distance_spherical() {
        let p1 = GeoPoint::new(59.955982, 30.244759);
        let p2 = GeoPoint::new(59.955975, 30.24472);
        let d1 = haversine_km(&p1, &p2);
        let d2 = haversine_km(&p2, &p1);
        assert!((d1 - 0.0023064907653812116).abs() < 1e-6);
        assert_eq!(d1, d2);
        assert_eq!(calc_point_distance(&p1, &p1), 0.0);
        assert_eq!(calc_point_distance(&p1, &p2), 0.0023);
    }

    #[test]
    fn test_distance_spherical_fast_agrees_with_haversine() {
        let p1 = GeoPoint::new(59.955982, 30.244759);
        let p2 = GeoPoint::new(59.96698, 30.244358);
        let approx = distance_spherical_fast(&p1, &p2).sqrt() * DEGREE_RAD * EARTH_R;
        assert!((approx - haversine_km(&p1, &p2)).abs() < 0.001);
        assert_eq!(distance_spherical_fast(&p1, &p1), 0.0);
    }

    #[test]
    fn test_round_to_ties_even() {
        assert_eq!(round_to(1.23456, 4), 1.2346);
        assert_eq!(round_to(0.5, 0), 0.0);
        assert_eq!(round_to(1.5, 0), 2.0);
        assert_eq!(round_to(-2.71828, 2), -2.72);
    }

    #[test]
    fn prop_distance_symmetric_and_zero_on_self() {
        fn prop(a: i16, b: i16, c: i16, d: i16) -> bool {
            let p = coord(a, b);
            let q = coord(c, d);
            calc_point_distance(&p, &q) == calc_point_distance(&q, &p)
                && calc_point_distance(&p, &p) == 0.0
        }
        QuickCheck::new().quickcheck(prop as fn(i16, i16, i16, i16) -> bool);
    }

    #[test]
    fn prop_triangle_inequality() {
        fn prop(a: (i16, i16), b: (i16, i16), c: (i16, i16)) -> TestResult {
            let (pa, pb, pc) = (coord(a.0, a.1), coord(b.0, b.1), coord(c.0, c.1));
            let direct = calc_point_distance(&pa, &pc);
            let detour = calc_point_distance(&pa, &pb) + calc_point_distance(&pb, &pc);
            TestResult::from_bool(direct <= detour + 1e-3)
        }
        QuickCheck::new().quickcheck(prop as fn((i16, i16), (i16, i16), (i16, i16)) -> TestResult);
    }

    #[test]
    fn test_center_pos() {
        let table: PointTable<&str> = HashMap::from([
            ("a", GeoPoint::new(10.0, 20.0)),
            ("b", GeoPoint::new(12.0, 22.0)),
            ("c", GeoPoint::new(11.0, 24.0)),
        ]);
        let center = calc_center_pos(["a", "b", "c"].iter(), &table).unwrap();
        assert_eq!(center, GeoPoint::new(11.0, 22.0));
    }

    #[test]
    fn test_center_pos_single_point_is_idempotent() {
        let table: PointTable<u32> = HashMap::from([(7, GeoPoint::new(48.85661, 2.35222))]);
        let center = calc_center_pos([7u32].iter(), &table).unwrap();
        assert_eq!(center, GeoPoint::new(48.8566, 2.3522));
    }

    #[test]
    fn test_center_pos_rejects_empty_set() {
        let table: PointTable<u32> = HashMap::new();
        let res = calc_center_pos(std::iter::empty::<&u32>(), &table);
        assert!(matches!(res, Err(NetGeoError::InvalidArgument(_))));
    }

    #[test]
    fn test_center_pos_rejects_unknown_id() {
        let table: PointTable<u32> = HashMap::from([(1, GeoPoint::new(0.0, 0.0))]);
        let res = calc_center_pos([1u32, 2].iter(), &table);
        assert!(matches!(res, Err(NetGeoError::InvalidArgument(_))));
    }
}
