//! Zipped ESRI shapefile export in MAGNA-SIRGAS / Origen-Nacional.
//!
//! Every record's target is carried from its `target_crs` to EPSG:9377
//! through the projection service, then written as a point layer named
//! `coordenadas` (`.shp`, `.shx`, `.dbf`, plus `.prj` when the definition can
//! be described). The layer files are staged in a temporary directory and
//! packed into one zip archive; nothing is written at the destination until
//! every point has converted.
//!
//! The attribute table has a single numeric `id` column holding the record
//! id.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io;
use std::path::Path;

use shapefile::dbase::{FieldName, FieldValue, Record, TableWriterBuilder};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::coord::Coord;
use super::model::{exportable_targets, CoordinateRecord};
use super::space::Target;
use crate::crs::CrsRegistry;
use crate::error::CoordError;
use crate::reproject::ProjectionService;

/// CRS code every shapefile export is written in.
pub const SHAPEFILE_CRS: &str = "9377";

/// Archive name offered when the caller does not choose one.
pub const DEFAULT_SHAPEFILE_ARCHIVE_NAME: &str = "coordenadas_9377.zip";

/// Base name of the files inside the archive.
pub const LAYER_NAME: &str = "coordenadas";

const LAYER_EXTENSIONS: [&str; 4] = ["shp", "shx", "dbf", "prj"];

/// Converts every target to EPSG:9377 and writes a zipped shapefile to `path`.
///
/// Returns the number of points written.
///
/// # Errors
/// - [`CoordError::ExportNotReady`] under the same conditions as the GeoJSON
///   export; nothing is created on disk.
/// - [`CoordError::UnknownCrs`] if a target CRS or `9377` is not registered.
/// - [`CoordError::Transform`] naming the first row that does not convert.
pub fn write_shapefile_zip<P: ProjectionService + ?Sized>(
    path: &Path,
    records: &[CoordinateRecord],
    registry: &CrsRegistry,
    service: &P,
) -> Result<usize, CoordError> {
    let targets = exportable_targets(records)?;
    let points = to_shapefile_crs(&targets, registry, service)?;

    let stage = tempfile::tempdir().map_err(CoordError::Io)?;
    let shp_path = stage.path().join(format!("{LAYER_NAME}.shp"));
    write_layer(&shp_path, &points)?;

    let prj = registry
        .get(SHAPEFILE_CRS)
        .and_then(|def| esri_wkt(&def.label, &def.proj));
    match prj {
        Some(wkt) => fs::write(stage.path().join(format!("{LAYER_NAME}.prj")), wkt)?,
        None => log::warn!(
            "no .prj written: the EPSG:{} definition is not a GRS80 transverse Mercator",
            SHAPEFILE_CRS
        ),
    }

    pack(path, stage.path())?;
    log::info!(
        "exported {} point(s) as EPSG:{} shapefile to {}",
        points.len(),
        SHAPEFILE_CRS,
        path.display()
    );
    Ok(points.len())
}

/// `(record id, coordinate in EPSG:9377)` for each target.
fn to_shapefile_crs<P: ProjectionService + ?Sized>(
    targets: &[(&CoordinateRecord, Coord<Target>)],
    registry: &CrsRegistry,
    service: &P,
) -> Result<Vec<(u64, Coord<Target>)>, CoordError> {
    let destination = registry.resolve(SHAPEFILE_CRS)?;

    targets
        .iter()
        .enumerate()
        .map(|(i, (record, target))| {
            let crs = record.target_crs.as_deref().unwrap_or(SHAPEFILE_CRS);
            let source = registry.resolve(crs)?;
            let (x, y) = service
                .transform(source, destination, target.as_tuple())
                .map_err(|e| row_error(i, &e.to_string()))?;

            let converted = Coord::<Target>::new(x, y);
            if !converted.is_finite() {
                return Err(row_error(i, "no finite result"));
            }
            Ok((record.id.0, converted))
        })
        .collect()
}

fn row_error(index: usize, message: &str) -> CoordError {
    CoordError::Transform(format!(
        "row {} cannot be converted to EPSG:{}: {}",
        index + 1,
        SHAPEFILE_CRS,
        message
    ))
}

fn write_layer(shp_path: &Path, points: &[(u64, Coord<Target>)]) -> Result<(), CoordError> {
    let shapefile_error = |source| CoordError::ShapefileWrite {
        path: shp_path.to_path_buf(),
        source,
    };

    let id_field = FieldName::try_from("id")
        .map_err(|_| CoordError::Io(io::Error::other("invalid dBase field name 'id'")))?;
    let table = TableWriterBuilder::new().add_numeric_field(id_field, 10, 0);

    // header sizes are finalized when the writer is dropped
    let mut writer = shapefile::Writer::from_path(shp_path, table).map_err(shapefile_error)?;
    for (id, point) in points {
        let mut record = Record::default();
        record.insert("id".to_string(), FieldValue::Numeric(Some(*id as f64)));
        writer
            .write_shape_and_record(&shapefile::Point::new(point.x, point.y), &record)
            .map_err(shapefile_error)?;
    }
    drop(writer);

    Ok(())
}

/// Zips the staged layer files into `path`.
fn pack(path: &Path, stage: &Path) -> Result<(), CoordError> {
    let archive_error = |source| CoordError::ArchiveWrite {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(CoordError::Io)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for ext in LAYER_EXTENSIONS {
        let name = format!("{LAYER_NAME}.{ext}");
        let staged = stage.join(&name);
        if !staged.exists() {
            continue;
        }
        zip.start_file(name, options).map_err(archive_error)?;
        io::copy(&mut File::open(&staged)?, &mut zip)?;
    }

    zip.finish().map_err(archive_error)?;
    Ok(())
}

/// ESRI WKT for a GRS80 transverse Mercator PROJ definition.
fn esri_wkt(label: &str, definition: &str) -> Option<String> {
    let params: HashMap<&str, &str> = definition
        .split_whitespace()
        .filter_map(|token| token.strip_prefix('+')?.split_once('='))
        .collect();
    if params.get("proj") != Some(&"tmerc") || params.get("ellps") != Some(&"GRS80") {
        return None;
    }
    let param = |key: &str, default: &'static str| params.get(key).copied().unwrap_or(default);

    Some(format!(
        "PROJCS[\"{}\",GEOGCS[\"GCS_MAGNA\",DATUM[\"D_MAGNA\",SPHEROID[\"GRS_1980\",6378137.0,298.257222101]],\
PRIMEM[\"Greenwich\",0.0],UNIT[\"Degree\",0.0174532925199433]],PROJECTION[\"Transverse_Mercator\"],\
PARAMETER[\"False_Easting\",{}],PARAMETER[\"False_Northing\",{}],PARAMETER[\"Central_Meridian\",{}],\
PARAMETER[\"Scale_Factor\",{}],PARAMETER[\"Latitude_Of_Origin\",{}],UNIT[\"Meter\",1.0]]",
        label
            .split([' ', '/'])
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("_"),
        param("x_0", "0"),
        param("y_0", "0"),
        param("lon_0", "0"),
        param("k", "1"),
        param("lat_0", "0"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::DatasetStore;
    use std::io::Read;

    /// Adds 10 to x whenever the definitions differ.
    struct Offset;

    impl ProjectionService for Offset {
        fn transform(
            &self,
            source: &str,
            destination: &str,
            (x, y): (f64, f64),
        ) -> Result<(f64, f64), CoordError> {
            if source == destination {
                return Ok((x, y));
            }
            if x.is_nan() {
                return Err(CoordError::Transform("outside domain".into()));
            }
            Ok((x + 10.0, y))
        }
    }

    fn store_with_targets(targets: &[((f64, f64), &str)]) -> DatasetStore {
        let mut store = DatasetStore::new();
        for _ in targets {
            store.append(Coord::new(0.0, 0.0), "4326");
        }
        for (record, &((x, y), crs)) in store.records_mut().zip(targets) {
            record.set_target(Coord::new(x, y), crs);
        }
        store
    }

    fn extract(archive: &Path, name: &str, dir: &Path) -> std::path::PathBuf {
        let mut zip = zip::ZipArchive::new(File::open(archive).unwrap()).unwrap();
        let mut entry = zip.by_name(name).unwrap();
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes).unwrap();
        let out = dir.join(name);
        fs::write(&out, bytes).unwrap();
        out
    }

    #[test]
    fn test_not_ready_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_SHAPEFILE_ARCHIVE_NAME);
        let registry = CrsRegistry::with_default_catalog();

        let err = write_shapefile_zip(&path, &[], &registry, &Offset).unwrap_err();
        assert!(matches!(err, CoordError::ExportNotReady(_)));

        let mut store = store_with_targets(&[((1.0, 2.0), "3116")]);
        store.append(Coord::new(3.0, 4.0), "4326");
        let err = write_shapefile_zip(&path, store.all(), &registry, &Offset).unwrap_err();
        assert!(err.to_string().contains("row 2"));
        assert!(!path.exists());
    }

    #[test]
    fn test_archive_holds_layer_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.zip");
        let registry = CrsRegistry::with_default_catalog();
        let store = store_with_targets(&[((1.0, 2.0), "9377"), ((3.0, 4.0), "9377")]);

        assert_eq!(write_shapefile_zip(&path, store.all(), &registry, &Offset).unwrap(), 2);

        let zip = zip::ZipArchive::new(File::open(&path).unwrap()).unwrap();
        let mut names: Vec<&str> = zip.file_names().collect();
        names.sort_unstable();
        assert_eq!(
            names,
            vec!["coordenadas.dbf", "coordenadas.prj", "coordenadas.shp", "coordenadas.shx"]
        );
    }

    #[test]
    fn test_points_are_converted_to_9377() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.zip");
        let registry = CrsRegistry::with_default_catalog();
        let store = store_with_targets(&[((1.0, 2.0), "3116"), ((5.0, 6.0), "9377")]);

        write_shapefile_zip(&path, store.all(), &registry, &Offset).unwrap();

        let shp = extract(&path, "coordenadas.shp", dir.path());
        let points = shapefile::read_shapes_as::<_, shapefile::Point>(&shp).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!((points[0].x, points[0].y), (11.0, 2.0));
        assert_eq!((points[1].x, points[1].y), (5.0, 6.0));
    }

    #[test]
    fn test_conversion_failure_names_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.zip");
        let registry = CrsRegistry::with_default_catalog();
        let store = store_with_targets(&[((1.0, 1.0), "3116"), ((f64::NAN, 1.0), "3116")]);

        let err = write_shapefile_zip(&path, store.all(), &registry, &Offset).unwrap_err();
        assert!(matches!(err, CoordError::Transform(ref m) if m.starts_with("row 2")));
        assert!(!path.exists());
    }

    #[test]
    fn test_prj_describes_catalog_definition() {
        let registry = CrsRegistry::with_default_catalog();
        let def = registry.get("9377").unwrap();
        let wkt = esri_wkt(&def.label, &def.proj).unwrap();

        assert!(wkt.starts_with("PROJCS[\"MAGNA-SIRGAS_Origen-Nacional\""));
        assert!(wkt.contains("PARAMETER[\"False_Easting\",1000000]"));
        assert!(wkt.contains("PARAMETER[\"Central_Meridian\",-74.0775079166667]"));
        assert!(esri_wkt("WGS 84", "+proj=longlat +datum=WGS84 +no_defs").is_none());
    }
}
