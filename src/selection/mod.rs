//! Table/map selection synchronization.
//!
//! At most one record is *active* at a time. Selecting a record, whether from
//! a table row or from its map marker, moves the highlight to it; removing
//! the active record or clearing the dataset returns to [`SelectionState::Idle`].
//!
//! Markers are tracked by [`RecordId`]. A record's table row is found through
//! the store's position lookup for that id, and its marker is the one placed
//! under that id, so duplicate or nearly equal coordinates can never be
//! confused with each other.

mod surface;

pub use surface::{Bounds, MapSurface, Marker, MarkerLayer};

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::dataset::{DatasetStore, RecordId};
use crate::error::CoordError;

/// Which record, if any, is highlighted in table and map.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SelectionState {
    #[default]
    Idle,
    Active(RecordId),
}

/// Which coordinate set the map shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MapLayer {
    Source,
    Target,
}

impl FromStr for MapLayer {
    type Err = CoordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "source" | "origin" => Ok(MapLayer::Source),
            "target" | "transformed" => Ok(MapLayer::Target),
            other => Err(CoordError::UnsupportedFormat(format!(
                "'{}' (expected source or target layer)",
                other
            ))),
        }
    }
}

impl fmt::Display for MapLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapLayer::Source => write!(f, "source"),
            MapLayer::Target => write!(f, "target"),
        }
    }
}

/// Owns the selection state and the set of markers currently on the map.
#[derive(Clone, Debug, Default)]
pub struct SelectionSynchronizer {
    state: SelectionState,
    markers: BTreeSet<RecordId>,
    layer: Option<MapLayer>,
}

impl SelectionSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SelectionState {
        self.state
    }

    pub fn active(&self) -> Option<RecordId> {
        match self.state {
            SelectionState::Active(id) => Some(id),
            SelectionState::Idle => None,
        }
    }

    pub fn is_active(&self, id: RecordId) -> bool {
        self.state == SelectionState::Active(id)
    }

    /// The layer last shown on the map.
    pub fn layer(&self) -> Option<MapLayer> {
        self.layer
    }

    pub fn has_marker(&self, id: RecordId) -> bool {
        self.markers.contains(&id)
    }

    /// Makes `id` the active record and moves the marker highlight to it.
    pub fn select<M: MapSurface + ?Sized>(
        &mut self,
        id: RecordId,
        store: &DatasetStore,
        surface: &mut M,
    ) -> Result<(), CoordError> {
        if store.find(id).is_none() {
            return Err(CoordError::UnknownRecord(id));
        }

        if let SelectionState::Active(previous) = self.state {
            if previous != id && self.markers.contains(&previous) {
                surface.set_highlight(previous, false);
            }
        }

        self.state = SelectionState::Active(id);
        if self.markers.contains(&id) {
            surface.set_highlight(id, true);
        }
        log::debug!("selected record {}", id);
        Ok(())
    }

    /// Selects the record displayed at row `index`.
    pub fn select_row<M: MapSurface + ?Sized>(
        &mut self,
        index: usize,
        store: &DatasetStore,
        surface: &mut M,
    ) -> Result<RecordId, CoordError> {
        let id = store
            .get(index)
            .map(|r| r.id)
            .ok_or(CoordError::IndexOutOfRange {
                index,
                len: store.len(),
            })?;
        self.select(id, store, surface)?;
        Ok(id)
    }

    /// Forgets a deleted record: drops its marker and, if it was active,
    /// returns to `Idle`.
    pub fn record_removed<M: MapSurface + ?Sized>(&mut self, id: RecordId, surface: &mut M) {
        if self.markers.remove(&id) {
            surface.remove_marker(id);
        }
        if self.is_active(id) {
            self.state = SelectionState::Idle;
        }
    }

    /// Drops every marker and returns to `Idle`.
    pub fn cleared<M: MapSurface + ?Sized>(&mut self, surface: &mut M) {
        for id in std::mem::take(&mut self.markers) {
            surface.remove_marker(id);
        }
        self.state = SelectionState::Idle;
    }

    /// Replaces the markers on the map with `placements` (`(id, lat, lng)`).
    ///
    /// The view is fitted to the new markers and the active record, if it has
    /// a marker in the new layer, is highlighted again.
    pub fn show_markers<M: MapSurface + ?Sized>(
        &mut self,
        layer: MapLayer,
        placements: &[(RecordId, f64, f64)],
        surface: &mut M,
    ) {
        for id in std::mem::take(&mut self.markers) {
            surface.remove_marker(id);
        }

        for &(id, lat, lng) in placements {
            surface.place_marker(lat, lng, id);
            self.markers.insert(id);
        }

        let points: Vec<(f64, f64)> = placements
            .iter()
            .map(|&(_, lat, lng)| (lat, lng))
            .collect();
        if !points.is_empty() {
            surface.fit_to_bounds(&points);
        }

        if let Some(active) = self.active() {
            if self.markers.contains(&active) {
                surface.set_highlight(active, true);
            }
        }
        self.layer = Some(layer);
    }
}
