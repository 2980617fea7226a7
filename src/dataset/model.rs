//! Core record model and the ordered store that owns it.
//!
//! The store is the single owner of every [`CoordinateRecord`] in a session.
//! Ingestion appends to it, reprojection enriches records in place, and
//! deletion is the only operation that reorders (by shifting later records
//! down one slot).

use super::coord::Coord;
use super::ids::RecordId;
use super::space::{Source, Target};
use crate::error::CoordError;

/// One point through its lifecycle: ingested source, optional target.
#[derive(Clone, Debug, PartialEq)]
pub struct CoordinateRecord {
    /// Stable identity, assigned by the store at creation time.
    pub id: RecordId,

    /// Coordinate as ingested.
    pub source: Coord<Source>,

    /// CRS code the source coordinate is expressed in.
    pub source_crs: String,

    /// Reprojected coordinate, present after a successful reprojection.
    pub target: Option<Coord<Target>>,

    /// CRS code of `target`, set together with it.
    pub target_crs: Option<String>,

    /// Message from the last failed reprojection of this record.
    pub transform_error: Option<String>,
}

impl CoordinateRecord {
    fn new(id: RecordId, source: Coord<Source>, source_crs: impl Into<String>) -> Self {
        Self {
            id,
            source,
            source_crs: source_crs.into(),
            target: None,
            target_crs: None,
            transform_error: None,
        }
    }

    /// Returns true if the record carries a reprojected coordinate.
    pub fn is_transformed(&self) -> bool {
        self.target.is_some()
    }

    /// Stores a successful reprojection result.
    pub(crate) fn set_target(&mut self, target: Coord<Target>, crs: &str) {
        self.target = Some(target);
        self.target_crs = Some(crs.to_string());
        self.transform_error = None;
    }

    /// Records a failed reprojection; any previous target is dropped.
    pub(crate) fn set_transform_error(&mut self, message: impl Into<String>) {
        self.target = None;
        self.target_crs = None;
        self.transform_error = Some(message.into());
    }

    /// Forgets any reprojection result (successful or not).
    pub(crate) fn clear_target(&mut self) {
        self.target = None;
        self.target_crs = None;
        self.transform_error = None;
    }
}

/// Pairs every record with its target coordinate, in store order.
///
/// Exports share this precondition: a partial export would silently drop
/// points.
///
/// # Errors
/// [`CoordError::ExportNotReady`] if there are no records or any record has
/// no target coordinate.
pub(crate) fn exportable_targets(
    records: &[CoordinateRecord],
) -> Result<Vec<(&CoordinateRecord, Coord<Target>)>, CoordError> {
    if records.is_empty() {
        return Err(CoordError::ExportNotReady(
            "the dataset is empty".to_string(),
        ));
    }

    records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let target = record.target.ok_or_else(|| {
                CoordError::ExportNotReady(format!(
                    "row {} has no transformed coordinate; run the transformation first",
                    i + 1
                ))
            })?;
            Ok((record, target))
        })
        .collect()
}

/// Ordered collection of coordinate records.
#[derive(Clone, Debug, Default)]
pub struct DatasetStore {
    records: Vec<CoordinateRecord>,
    next_id: u64,
}

impl DatasetStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a new record after all existing ones and returns its id.
    ///
    /// Ids are never reused within the lifetime of the store, not even after
    /// [`clear`](Self::clear).
    pub fn append(&mut self, source: Coord<Source>, source_crs: &str) -> RecordId {
        self.next_id += 1;
        let id = RecordId::new(self.next_id);
        self.records
            .push(CoordinateRecord::new(id, source, source_crs));
        id
    }

    /// Removes the record at `index`, shifting later records down by one.
    pub fn remove_at(&mut self, index: usize) -> Result<CoordinateRecord, CoordError> {
        if index >= self.records.len() {
            return Err(CoordError::IndexOutOfRange {
                index,
                len: self.records.len(),
            });
        }
        Ok(self.records.remove(index))
    }

    /// Removes every record and returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let count = self.records.len();
        self.records.clear();
        count
    }

    /// All records in display/export order.
    pub fn all(&self) -> &[CoordinateRecord] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&CoordinateRecord> {
        self.records.get(index)
    }

    /// Returns the current row index of the record with the given id.
    pub fn position(&self, id: RecordId) -> Option<usize> {
        self.records.iter().position(|r| r.id == id)
    }

    pub fn find(&self, id: RecordId) -> Option<&CoordinateRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Relabels every record's source CRS and drops their targets.
    ///
    /// Returns the number of records whose label actually changed.
    pub fn relabel_origin(&mut self, crs: &str) -> usize {
        let mut changed = 0;
        for record in &mut self.records {
            if record.source_crs != crs {
                record.source_crs = crs.to_string();
                record.clear_target();
                changed += 1;
            }
        }
        changed
    }

    pub(crate) fn records_mut(&mut self) -> std::slice::IterMut<'_, CoordinateRecord> {
        self.records.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(points: &[(f64, f64)]) -> DatasetStore {
        let mut store = DatasetStore::new();
        for &(x, y) in points {
            store.append(Coord::new(x, y), "4326");
        }
        store
    }

    #[test]
    fn test_append_assigns_increasing_ids() {
        let mut store = DatasetStore::new();
        let a = store.append(Coord::new(1.0, 2.0), "4326");
        let b = store.append(Coord::new(1.0, 2.0), "4326");
        assert!(a < b);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(1).unwrap().id, b);
        assert!(!store.get(0).unwrap().is_transformed());
    }

    #[test]
    fn test_remove_at_shifts_later_records() {
        let mut store = store_with(&[(1.0, 1.0), (2.0, 2.0), (3.0, 3.0)]);
        let third = store.get(2).unwrap().id;

        let removed = store.remove_at(1).unwrap();
        assert_eq!(removed.source.x, 2.0);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(1).unwrap().id, third);
        assert_eq!(store.position(third), Some(1));
    }

    #[test]
    fn test_remove_at_out_of_range() {
        let mut store = store_with(&[(1.0, 1.0)]);
        let err = store.remove_at(1).unwrap_err();
        assert!(matches!(err, CoordError::IndexOutOfRange { index: 1, len: 1 }));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_ids_not_reused_after_clear() {
        let mut store = store_with(&[(1.0, 1.0), (2.0, 2.0)]);
        let last = store.get(1).unwrap().id;
        assert_eq!(store.clear(), 2);
        assert!(store.is_empty());

        let fresh = store.append(Coord::new(0.0, 0.0), "4326");
        assert!(fresh > last);
    }

    #[test]
    fn test_relabel_origin_clears_targets() {
        let mut store = store_with(&[(1.0, 1.0), (2.0, 2.0)]);
        for record in store.records_mut() {
            record.set_target(Coord::new(10.0, 10.0), "3116");
        }

        assert_eq!(store.relabel_origin("4326"), 0);
        assert!(store.get(0).unwrap().is_transformed());

        assert_eq!(store.relabel_origin("3115"), 2);
        let record = store.get(0).unwrap();
        assert_eq!(record.source_crs, "3115");
        assert!(record.target.is_none());
        assert!(record.target_crs.is_none());
    }

    #[test]
    fn test_transform_error_drops_previous_target() {
        let mut store = store_with(&[(1.0, 1.0)]);
        let record = store.records_mut().next().unwrap();
        record.set_target(Coord::new(5.0, 5.0), "3116");
        record.set_transform_error("singular point");

        let record = store.get(0).unwrap();
        assert!(record.target.is_none());
        assert_eq!(record.transform_error.as_deref(), Some("singular point"));
    }
}
