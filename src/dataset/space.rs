//! Coordinate set marker types.
//!
//! These are zero-sized types (ZSTs) used as type parameters to distinguish
//! a record's ingested coordinate from its reprojected one at compile time.

use std::fmt;

/// Marker type for source coordinates.
///
/// Source coordinates are the values as ingested, expressed in the CRS that
/// was declared as origin when the record was created.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {}

/// Marker type for target coordinates.
///
/// Target coordinates are produced by reprojection into the destination CRS.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {}

impl fmt::Debug for Source {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}
