//! Reprojection of dataset records between coordinate reference systems.
//!
//! The actual math lives behind [`ProjectionService`]; the bundled
//! [`Proj4Service`] uses the pure-Rust `proj4rs` crate. [`reproject`] drives a
//! service over every record of a store:
//!
//! 1. Both CRS codes are resolved through the [`CrsRegistry`] and both
//!    definitions are checked by the service. Any failure here aborts the
//!    pass before a single record is touched.
//! 2. Each record is transformed independently. A failure, including a
//!    NaN or infinite result, is stored on the record and listed in the
//!    [`ReprojectionReport`]; the pass continues.
//!
//! Re-running always overwrites earlier results.

mod report;

pub use report::{ReprojectionReport, TransformFailure};

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use proj4rs::proj::Proj;

use crate::crs::{is_geographic_definition, CrsRegistry};
use crate::dataset::{Coord, DatasetStore, Target};
use crate::error::CoordError;

/// Converts a point between two CRS given their PROJ definitions.
///
/// Implementations must be deterministic for identical inputs.
pub trait ProjectionService {
    /// Transforms `(x, y)` from `source` to `destination`.
    ///
    /// Geographic coordinates are `(longitude, latitude)` in degrees.
    fn transform(
        &self,
        source: &str,
        destination: &str,
        point: (f64, f64),
    ) -> Result<(f64, f64), CoordError>;

    /// Checks that a definition is usable, returning a reason if not.
    fn check_definition(&self, _definition: &str) -> Result<(), String> {
        Ok(())
    }
}

/// [`ProjectionService`] backed by `proj4rs`.
///
/// Parsed projections are cached per definition string.
#[derive(Default)]
pub struct Proj4Service {
    cache: RefCell<HashMap<String, Rc<Proj>>>,
}

impl Proj4Service {
    pub fn new() -> Self {
        Self::default()
    }

    fn projection(&self, definition: &str) -> Result<Rc<Proj>, String> {
        if let Some(proj) = self.cache.borrow().get(definition) {
            return Ok(Rc::clone(proj));
        }
        let proj = Rc::new(Proj::from_proj_string(definition).map_err(|e| e.to_string())?);
        self.cache
            .borrow_mut()
            .insert(definition.to_string(), Rc::clone(&proj));
        Ok(proj)
    }
}

impl std::fmt::Debug for Proj4Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Proj4Service")
            .field("cached", &self.cache.borrow().len())
            .finish()
    }
}

impl ProjectionService for Proj4Service {
    fn transform(
        &self,
        source: &str,
        destination: &str,
        point: (f64, f64),
    ) -> Result<(f64, f64), CoordError> {
        if source == destination {
            return Ok(point);
        }

        let src = self.projection(source).map_err(CoordError::Transform)?;
        let dst = self.projection(destination).map_err(CoordError::Transform)?;

        // proj4rs works in radians for lat/long systems
        let (mut x, mut y) = point;
        if is_geographic_definition(source) {
            x = x.to_radians();
            y = y.to_radians();
        }

        let mut xyz = (x, y, 0.0);
        proj4rs::transform::transform(&src, &dst, &mut xyz)
            .map_err(|e| CoordError::Transform(e.to_string()))?;

        let (mut x, mut y) = (xyz.0, xyz.1);
        if is_geographic_definition(destination) {
            x = x.to_degrees();
            y = y.to_degrees();
        }

        Ok((x, y))
    }

    fn check_definition(&self, definition: &str) -> Result<(), String> {
        self.projection(definition).map(|_| ())
    }
}

/// Reprojects every record of `store` from `origin` to `destination`.
///
/// # Errors
/// [`CoordError::UnknownCrs`] or [`CoordError::InvalidProjection`] when an
/// endpoint cannot be used; the store is left unmodified in that case.
/// Per-record failures are not errors; see [`ReprojectionReport::failures`].
pub fn reproject<P: ProjectionService + ?Sized>(
    store: &mut DatasetStore,
    registry: &CrsRegistry,
    service: &P,
    origin: &str,
    destination: &str,
) -> Result<ReprojectionReport, CoordError> {
    let source_def = registry.resolve(origin)?;
    let destination_def = registry.resolve(destination)?;

    for (code, definition) in [(origin, source_def), (destination, destination_def)] {
        service
            .check_definition(definition)
            .map_err(|message| CoordError::InvalidProjection {
                code: code.to_string(),
                message,
            })?;
    }

    let origin = crate::crs::normalize_code(origin);
    let destination = crate::crs::normalize_code(destination);
    let mut report = ReprojectionReport::new(origin.as_str(), destination.as_str());

    for (index, record) in store.records_mut().enumerate() {
        let result = service
            .transform(source_def, destination_def, record.source.as_tuple())
            .map(|(x, y)| Coord::<Target>::new(x, y))
            .and_then(|target| {
                if target.is_finite() {
                    Ok(target)
                } else {
                    Err(CoordError::Transform(format!(
                        "no finite result for ({}, {})",
                        record.source.x, record.source.y
                    )))
                }
            });
        match result {
            Ok(target) => {
                record.set_target(target, &destination);
                report.transformed += 1;
            }
            Err(err) => {
                let message = match err {
                    CoordError::Transform(message) => message,
                    other => other.to_string(),
                };
                log::warn!("record {} (row {}): {}", record.id, index + 1, message);
                record.set_transform_error(message.clone());
                report.failures.push(TransformFailure {
                    index,
                    id: record.id,
                    message,
                });
            }
        }
    }

    log::info!(
        "reprojected {}/{} record(s) from {} to {}",
        report.transformed,
        report.total(),
        origin,
        destination
    );
    Ok(report)
}
