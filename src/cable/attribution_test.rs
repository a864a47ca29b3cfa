#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use crate::cable::{
        AttributedPath, CityIndex, LandCableSegment, LinkType, NodeCityResolver, NodeSite,
        SubmarineCable, Unresolved, attribute_links, build_cable_graph, infer_link_type,
    };
    use crate::cluster::{GeoPoint, Locality};
    use crate::topology::{LinkTag, TopologyLink};

    fn cities() -> CityIndex {
        CityIndex::new(vec![
            (Locality::new("Lisbon", "", "PT"), GeoPoint::new(38.72, -9.14)),
            (Locality::new("Porto", "", "PT"), GeoPoint::new(41.15, -8.61)),
            (Locality::new("New York", "NY", "US"), GeoPoint::new(40.71, -74.0)),
            (Locality::new("Lisbon", "", "PT"), GeoPoint::new(38.7, -9.1)),
            (Locality::new("Reykjavik", "", "IS"), GeoPoint::new(64.15, -21.94)),
        ])
    }

    fn link(n: usize, src: u64, dst: u64, tag: LinkTag) -> TopologyLink {
        TopologyLink {
            link_id: format!("L{n}"),
            src,
            dst,
            tag,
        }
    }

    #[test]
    fn test_city_index_first_locality_wins() {
        let cities = cities();
        assert_eq!(cities.len(), 5);
        assert_eq!(cities.position(&Locality::new("Lisbon", "", "PT")), Some(0));
        assert_eq!(cities.locality(3), Some(&Locality::new("Lisbon", "", "PT")));
        assert_eq!(cities.position(&Locality::new("Paris", "", "FR")), None);
    }

    #[test]
    fn test_resolver_goes_through_facility_city() {
        let cities = cities();
        // facility 2 was placed on the duplicate Lisbon row
        let facility_cities = vec![Some(1), None, Some(3)];
        let resolver = NodeCityResolver::new(
            vec![
                (1, NodeSite::Facility(0)),
                (2, NodeSite::City(2)),
                (3, NodeSite::Facility(1)),
                (4, NodeSite::Facility(99)),
                (5, NodeSite::Facility(2)),
            ],
            &facility_cities,
            &cities,
        );
        assert_eq!(resolver.resolve(1), Some(1));
        assert_eq!(resolver.resolve(2), Some(2));
        assert_eq!(resolver.resolve(3), None);
        assert_eq!(resolver.resolve(4), None);
        assert_eq!(resolver.resolve(5), Some(0));
        assert_eq!(resolver.len(), 3);
    }

    #[test]
    fn test_resolver_collapses_duplicate_city_rows() {
        let cities = cities();
        assert_eq!(cities.canonical(3), Some(0));
        assert_eq!(cities.canonical(4), Some(4));
        assert_eq!(cities.canonical(9), None);

        let resolver =
            NodeCityResolver::new(vec![(7, NodeSite::City(3)), (8, NodeSite::City(0))], &[], &cities);
        assert_eq!(resolver.resolve(7), Some(0));
        assert_eq!(resolver.resolve(7), resolver.resolve(8));
    }

    #[test]
    fn test_infer_link_type() {
        let empty = AttributedPath::default();
        assert_eq!(infer_link_type(LinkTag::Ixp, &empty), LinkType::Ixp);
        assert_eq!(infer_link_type(LinkTag::Others, &empty), LinkType::Direct);
        assert_eq!(LinkType::SubmarineCable.to_string(), "Submarine-cable");
        assert_eq!(LinkType::Ixp.to_string(), "IXP");
    }

    #[test]
    fn test_attribute_links() {
        let cities = cities();
        // landing points 0 and 1 sit in Lisbon and New York
        let lp_city = HashMap::from([(0, 0), (1, 2)]);
        let graph = build_cable_graph(
            &[LandCableSegment {
                segment_id: 0,
                from: 0,
                to: 1,
                length_km: 313.0,
            }],
            &[SubmarineCable {
                cable_id: "atlantic".to_string(),
                length_km: 6000.0,
                landing_points: vec![0, 1],
            }],
            &lp_city,
        )
        .unwrap();

        let resolver = NodeCityResolver::new(
            vec![
                (10, NodeSite::City(0)),
                (11, NodeSite::City(1)),
                (12, NodeSite::City(2)),
                (13, NodeSite::City(0)),
                (14, NodeSite::City(4)),
            ],
            &[],
            &cities,
        );

        let links = vec![
            link(1, 11, 12, LinkTag::Others),
            link(2, 10, 11, LinkTag::Ixp),
            link(3, 10, 13, LinkTag::Others),
            link(4, 10, 99, LinkTag::Others),
            link(5, 14, 12, LinkTag::Others),
        ];
        let report = attribute_links(&graph, &links, &resolver);

        assert_eq!(report.attributed.len(), 3);
        let porto_ny = &report.attributed[0];
        assert_eq!(porto_ny.link_type, LinkType::SubmarineCable);
        assert_eq!(porto_ny.path.cable_ids(), vec!["0", "atlantic"]);
        assert_eq!(porto_ny.path.total_km, 6313.0);

        let lisbon_porto = &report.attributed[1];
        assert_eq!(lisbon_porto.link_type, LinkType::Ixp);
        assert_eq!(lisbon_porto.path.land_cable_ids(), vec!["0"]);

        let same_city = &report.attributed[2];
        assert_eq!((same_city.src_city, same_city.dst_city), (0, 0));
        assert!(same_city.path.is_empty());
        assert_eq!(same_city.link_type, LinkType::Direct);

        assert_eq!(report.submarine_count(), 1);
        assert_eq!(
            report.unresolved,
            vec![
                (links[3].clone(), Unresolved::UnmappedNode(99)),
                (
                    links[4].clone(),
                    Unresolved::NoPath {
                        src_city: 4,
                        dst_city: 2
                    }
                ),
            ]
        );
    }
}
