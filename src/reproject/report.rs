//! Reprojection report types.
//!
//! A reprojection pass never aborts because of a single bad point, so the
//! report is where per-record failures surface.

use serde::Serialize;
use std::fmt;

use crate::dataset::RecordId;

/// Summary of one reprojection pass.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ReprojectionReport {
    /// Origin CRS code.
    pub origin: String,
    /// Destination CRS code.
    pub destination: String,
    /// Records that received a target coordinate.
    pub transformed: usize,
    /// Records the projection service could not transform.
    pub failures: Vec<TransformFailure>,
}

/// A record whose transform failed during a pass.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TransformFailure {
    /// Row index at the time of the pass (0-based).
    pub index: usize,
    pub id: RecordId,
    pub message: String,
}

impl ReprojectionReport {
    pub fn new(origin: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            destination: destination.into(),
            ..Default::default()
        }
    }

    /// Number of records visited by the pass.
    pub fn total(&self) -> usize {
        self.transformed + self.failures.len()
    }

    /// True when every record was transformed.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for ReprojectionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Transformed {} of {} coordinate(s) from EPSG:{} to EPSG:{}",
            self.transformed,
            self.total(),
            self.origin,
            self.destination
        )?;

        if !self.failures.is_empty() {
            writeln!(f)?;
            writeln!(f, "Failures ({}):", self.failures.len())?;
            for failure in &self.failures {
                writeln!(f, "  - row {}: {}", failure.index + 1, failure.message)?;
            }
        }

        Ok(())
    }
}
