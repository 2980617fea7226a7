//! GeoJSON export of reprojected coordinates.
//!
//! The export is a single `FeatureCollection` with one `Point` feature per
//! record, in dataset order, using the record's target coordinate and empty
//! properties:
//!
//! ```json
//! {
//!   "type": "FeatureCollection",
//!   "features": [
//!     {
//!       "type": "Feature",
//!       "geometry": { "type": "Point", "coordinates": [1000000.0, 1000000.0] },
//!       "properties": {}
//!     }
//!   ]
//! }
//! ```
//!
//! Export refuses to run until every record has been reprojected: a partial
//! collection would silently drop points.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use super::model::{exportable_targets, CoordinateRecord};
use crate::error::CoordError;

/// File name offered when the caller does not choose one.
pub const DEFAULT_EXPORT_FILE_NAME: &str = "coordenadas_transformadas.geojson";

// ============================================================================
// GeoJSON Schema Types (internal to this module)
// ============================================================================

#[derive(Debug, Serialize)]
struct FeatureCollection {
    #[serde(rename = "type")]
    kind: &'static str,
    features: Vec<Feature>,
}

#[derive(Debug, Serialize)]
struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
    geometry: PointGeometry,
    properties: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct PointGeometry {
    #[serde(rename = "type")]
    kind: &'static str,
    coordinates: [f64; 2],
}

// ============================================================================
// Public API
// ============================================================================

/// Serializes the records to a pretty-printed GeoJSON string.
///
/// # Errors
/// [`CoordError::ExportNotReady`] if there are no records or any record has
/// no target coordinate.
pub fn to_geojson_string(records: &[CoordinateRecord]) -> Result<String, CoordError> {
    let collection = build_collection(records)?;
    serde_json::to_string_pretty(&collection).map_err(|source| CoordError::GeoJsonWrite {
        path: Path::new("<string>").to_path_buf(),
        source,
    })
}

/// Writes the records as GeoJSON to `path`.
///
/// Nothing is created on disk when the export precondition fails.
pub fn write_geojson(path: &Path, records: &[CoordinateRecord]) -> Result<(), CoordError> {
    let collection = build_collection(records)?;

    let file = File::create(path).map_err(CoordError::Io)?;
    let mut writer = BufWriter::new(file);

    serde_json::to_writer_pretty(&mut writer, &collection).map_err(|source| {
        CoordError::GeoJsonWrite {
            path: path.to_path_buf(),
            source,
        }
    })?;
    writer.flush().map_err(CoordError::Io)
}

fn build_collection(records: &[CoordinateRecord]) -> Result<FeatureCollection, CoordError> {
    let features = exportable_targets(records)?
        .into_iter()
        .map(|(_, target)| Feature {
            kind: "Feature",
            geometry: PointGeometry {
                kind: "Point",
                coordinates: [target.x, target.y],
            },
            properties: serde_json::Map::new(),
        })
        .collect();

    Ok(FeatureCollection {
        kind: "FeatureCollection",
        features,
    })
}
