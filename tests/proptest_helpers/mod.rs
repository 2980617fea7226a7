#![allow(dead_code)]

use coordshift::dataset::{Coord, DatasetStore, Source};
use proptest::prelude::*;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

/// Tolerance for same-CRS reprojection (identity).
pub const EPS_IDENTITY: f64 = 1e-6;
/// Tolerance, in degrees, for geographic round trips through a projection.
pub const EPS_ROUNDTRIP_DEG: f64 = 1e-5;

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// Longitude/latitude pairs around Colombia, where the MAGNA-SIRGAS
/// projections of the default catalog are meaningful.
pub fn arb_colombia_lon_lat() -> impl Strategy<Value = (f64, f64)> {
    (-79.0f64..-67.0, -4.0f64..12.0)
}

/// Any finite coordinate value, including large magnitudes.
pub fn arb_finite() -> impl Strategy<Value = f64> {
    prop_oneof![
        -1.0e6f64..1.0e6,
        -180.0f64..180.0,
        Just(0.0),
        Just(-0.0),
    ]
}

pub fn arb_points(max: usize) -> impl Strategy<Value = Vec<(f64, f64)>> {
    prop::collection::vec((arb_finite(), arb_finite()), 0..=max)
}

pub fn store_from(points: &[(f64, f64)], crs: &str) -> DatasetStore {
    let mut store = DatasetStore::new();
    for &(x, y) in points {
        store.append(Coord::<Source>::new(x, y), crs);
    }
    store
}

pub fn close(a: (f64, f64), b: (f64, f64), eps: f64) -> Result<(), String> {
    if (a.0 - b.0).abs() <= eps && (a.1 - b.1).abs() <= eps {
        Ok(())
    } else {
        Err(format!("{:?} and {:?} differ by more than {}", a, b, eps))
    }
}
