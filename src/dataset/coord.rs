//! Coordinate pairs tagged with the set they belong to.

use std::fmt;
use std::marker::PhantomData;

use serde::ser::SerializeStruct;
use serde::Serialize;

/// An `(x, y)` pair marked as either an ingested [`Source`](super::Source)
/// value or a reprojected [`Target`](super::Target) value.
///
/// Geographic pairs are `(longitude, latitude)` in degrees.
#[derive(Clone, Copy, PartialEq)]
pub struct Coord<TSet> {
    pub x: f64,
    pub y: f64,
    _set: PhantomData<TSet>,
}

impl<TSet> Coord<TSet> {
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            _set: PhantomData,
        }
    }

    /// False if either component is NaN or infinite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    #[inline]
    pub fn as_tuple(&self) -> (f64, f64) {
        (self.x, self.y)
    }
}

impl<TSet> fmt::Debug for Coord<TSet> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Coord").field(&self.x).field(&self.y).finish()
    }
}

/// Renders `x,y`; a precision (`{:.7}`) applies to both components.
impl<TSet> fmt::Display for Coord<TSet> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match f.precision() {
            Some(decimals) => write!(f, "{:.*},{:.*}", decimals, self.x, decimals, self.y),
            None => write!(f, "{},{}", self.x, self.y),
        }
    }
}

/// `{"x": .., "y": ..}`, with no bound on the set marker.
impl<TSet> Serialize for Coord<TSet> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Coord", 2)?;
        state.serialize_field("x", &self.x)?;
        state.serialize_field("y", &self.y)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Source, Target};

    #[test]
    fn test_coord_is_finite() {
        let finite: Coord<Target> = Coord::new(1_000_000.0, 1_000_000.0);
        assert!(finite.is_finite());

        let nan: Coord<Target> = Coord::new(f64::NAN, 20.0);
        assert!(!nan.is_finite());

        let inf: Coord<Source> = Coord::new(10.0, f64::NEG_INFINITY);
        assert!(!inf.is_finite());
    }

    #[test]
    fn test_display_applies_precision_to_both_components() {
        let coord: Coord<Source> = Coord::new(-74.0775079166667, 4.6);
        assert_eq!(format!("{coord:.7}"), "-74.0775079,4.6000000");
        assert_eq!(coord.to_string(), "-74.0775079166667,4.6");
        assert_eq!(format!("{coord:?}"), "Coord(-74.0775079166667, 4.6)");
    }

    #[test]
    fn test_coord_serializes_as_xy_object() {
        let coord: Coord<Source> = Coord::new(1.5, -2.0);
        let json = serde_json::to_string(&coord).unwrap();
        assert_eq!(json, r#"{"x":1.5,"y":-2.0}"#);
    }
}
