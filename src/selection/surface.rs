//! Map rendering surface abstraction and an in-memory implementation.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::dataset::RecordId;

/// Where markers are drawn. Positions are WGS 84 latitude/longitude degrees.
///
/// Every marker is keyed by the id of the record it represents; the surface
/// reports user clicks back as that same id.
pub trait MapSurface {
    fn place_marker(&mut self, lat: f64, lng: f64, id: RecordId);
    fn remove_marker(&mut self, id: RecordId);
    fn set_highlight(&mut self, id: RecordId, highlighted: bool);
    /// Adjusts the view so every `(lat, lng)` point is visible.
    fn fit_to_bounds(&mut self, points: &[(f64, f64)]);
}

/// A marker held by [`MarkerLayer`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Marker {
    pub lat: f64,
    pub lng: f64,
    pub highlighted: bool,
}

/// Axis-aligned lat/lng box.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Bounds {
    /// Smallest box containing every `(lat, lng)` point; `None` if empty.
    pub fn from_points(points: &[(f64, f64)]) -> Option<Self> {
        let (&(lat, lng), rest) = points.split_first()?;
        let init = Bounds {
            south: lat,
            west: lng,
            north: lat,
            east: lng,
        };
        Some(rest.iter().fold(init, |b, &(lat, lng)| Bounds {
            south: b.south.min(lat),
            west: b.west.min(lng),
            north: b.north.max(lat),
            east: b.east.max(lng),
        }))
    }

    /// Centre as `(lat, lng)`.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.south + self.north) / 2.0,
            (self.west + self.east) / 2.0,
        )
    }
}

/// In-memory [`MapSurface`] that keeps markers and the fitted view.
///
/// Used by the CLI session and by tests to observe what a real map widget
/// would have been told to draw.
#[derive(Clone, Debug, Default)]
pub struct MarkerLayer {
    markers: BTreeMap<RecordId, Marker>,
    view: Option<Bounds>,
}

impl MarkerLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn marker(&self, id: RecordId) -> Option<&Marker> {
        self.markers.get(&id)
    }

    pub fn markers(&self) -> impl Iterator<Item = (RecordId, &Marker)> {
        self.markers.iter().map(|(id, m)| (*id, m))
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Ids of highlighted markers.
    pub fn highlighted(&self) -> Vec<RecordId> {
        self.markers
            .iter()
            .filter(|(_, m)| m.highlighted)
            .map(|(id, _)| *id)
            .collect()
    }

    /// The last fitted view.
    pub fn view(&self) -> Option<Bounds> {
        self.view
    }
}

impl MapSurface for MarkerLayer {
    fn place_marker(&mut self, lat: f64, lng: f64, id: RecordId) {
        self.markers.insert(
            id,
            Marker {
                lat,
                lng,
                highlighted: false,
            },
        );
    }

    fn remove_marker(&mut self, id: RecordId) {
        self.markers.remove(&id);
    }

    fn set_highlight(&mut self, id: RecordId, highlighted: bool) {
        if let Some(marker) = self.markers.get_mut(&id) {
            marker.highlighted = highlighted;
        }
    }

    fn fit_to_bounds(&mut self, points: &[(f64, f64)]) {
        if let Some(bounds) = Bounds::from_points(points) {
            self.view = Some(bounds);
        }
    }
}
