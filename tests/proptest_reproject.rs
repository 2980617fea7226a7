use coordshift::crs::CrsRegistry;
use coordshift::reproject::{reproject, Proj4Service, ProjectionService};
use proptest::prelude::*;

mod proptest_helpers;

proptest! {
    #![proptest_config(proptest_helpers::proptest_config())]

    #[test]
    fn reprojecting_to_same_crs_is_identity(
        (lon, lat) in proptest_helpers::arb_colombia_lon_lat(),
        code in prop::sample::select(vec!["4326", "3116", "3115", "9377"]),
    ) {
        let registry = CrsRegistry::with_default_catalog();
        let service = Proj4Service::new();

        // feed projected systems a plausible projected value
        let start = if registry.is_geographic(code) {
            (lon, lat)
        } else {
            let wgs84 = registry.resolve("4326").expect("catalog");
            service
                .transform(wgs84, registry.resolve(code).expect("catalog"), (lon, lat))
                .expect("forward")
        };

        let mut store = proptest_helpers::store_from(&[start], code);
        let report = reproject(&mut store, &registry, &service, code, code).expect("pass");
        prop_assert!(report.is_complete());

        let target = store.all()[0].target.expect("transformed").as_tuple();
        let res = proptest_helpers::close(target, start, proptest_helpers::EPS_IDENTITY);
        prop_assert!(res.is_ok(), "{}", res.unwrap_err());
    }

    #[test]
    fn wgs84_round_trip_through_projection(
        points in prop::collection::vec(proptest_helpers::arb_colombia_lon_lat(), 1..10),
        code in prop::sample::select(vec!["3116", "3115", "9377"]),
    ) {
        let registry = CrsRegistry::with_default_catalog();
        let service = Proj4Service::new();

        let mut forward = proptest_helpers::store_from(&points, "4326");
        let report = reproject(&mut forward, &registry, &service, "4326", code).expect("forward pass");
        prop_assert_eq!(report.transformed, points.len());

        let projected: Vec<(f64, f64)> = forward
            .all()
            .iter()
            .map(|r| r.target.expect("transformed").as_tuple())
            .collect();
        let mut back = proptest_helpers::store_from(&projected, code);
        reproject(&mut back, &registry, &service, code, "4326").expect("backward pass");

        for (record, &original) in back.all().iter().zip(&points) {
            let recovered = record.target.expect("transformed").as_tuple();
            let res = proptest_helpers::close(recovered, original, proptest_helpers::EPS_ROUNDTRIP_DEG);
            prop_assert!(res.is_ok(), "{}", res.unwrap_err());
        }
    }

    #[test]
    fn reprojection_preserves_order_and_ids(points in proptest_helpers::arb_points(15)) {
        let registry = CrsRegistry::with_default_catalog();
        let service = Proj4Service::new();
        let mut store = proptest_helpers::store_from(&points, "3116");
        let ids: Vec<_> = store.all().iter().map(|r| r.id).collect();

        let report = reproject(&mut store, &registry, &service, "3116", "9377").expect("pass");

        prop_assert_eq!(report.total(), points.len());
        let after: Vec<_> = store.all().iter().map(|r| r.id).collect();
        prop_assert_eq!(after, ids);
        for (record, &(x, y)) in store.all().iter().zip(&points) {
            prop_assert_eq!(record.source.as_tuple(), (x, y));
            prop_assert!(record.target.is_some() != record.transform_error.is_some());
        }
    }
}
