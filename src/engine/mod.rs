//! The coordinate dataset engine: one object per session.
//!
//! [`Engine`] owns the record store, the CRS registry, the selection state,
//! the projection service and the map surface. Every user action goes
//! through one of its methods (or through [`Engine::dispatch`] for
//! table/map interactions), so there is no ambient state anywhere else.
//!
//! File ingestion may run on a worker thread. While it is pending, every
//! operation that would mutate the dataset fails with
//! [`CoordError::IngestionPending`]; selection and read-only queries keep
//! working.
//!
//! # Example
//!
//! ```
//! use coordshift::engine::{Engine, EngineConfig};
//!
//! let mut engine = Engine::new(EngineConfig::default());
//! engine.add_point("-74.0775079166667", "4.59620041666667")?;
//! let report = engine.reproject()?;
//! assert_eq!(report.transformed, 1);
//! assert!(engine.export_geojson()?.contains("FeatureCollection"));
//! # Ok::<(), coordshift::CoordError>(())
//! ```

mod events;
mod table;

pub use events::{ContextAction, Reaction, UserEvent};
pub use table::{render_table, TableRow};

use std::path::Path;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread::{self, JoinHandle};

use crate::crs::{normalize_code, CrsRegistry, WGS84};
use crate::dataset::{io_geojson, io_shapefile};
use crate::dataset::io_table::{self, points_from_rows, read_points_file};
use crate::dataset::io_text::{self, format_value};
use crate::dataset::{
    parse_delimited_text, parse_manual_pair, Coord, CoordSet, CoordinateRecord, DatasetStore,
    IngestReport, InputFormat, ParsedBatch, RecordId, Row, SpreadsheetDecoder, Target,
};
use crate::error::CoordError;
use crate::reproject::{self, Proj4Service, ProjectionService, ReprojectionReport};
use crate::selection::{MapLayer, MapSurface, MarkerLayer, SelectionState, SelectionSynchronizer};

/// Initial CRS selection for a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    pub origin_crs: String,
    pub destination_crs: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            origin_crs: WGS84.to_string(),
            destination_crs: "3116".to_string(),
        }
    }
}

type IngestionResult = Result<(ParsedBatch, InputFormat), CoordError>;

struct PendingIngestion {
    label: String,
    receiver: Receiver<IngestionResult>,
    handle: JoinHandle<()>,
}

/// A coordinate dataset session.
pub struct Engine<P: ProjectionService = Proj4Service, M: MapSurface = MarkerLayer> {
    registry: CrsRegistry,
    store: DatasetStore,
    selection: SelectionSynchronizer,
    projection: P,
    surface: M,
    origin: String,
    destination: String,
    pending: Option<PendingIngestion>,
}

impl Engine {
    /// Session with the default catalog, `proj4rs` and an in-memory map.
    pub fn new(config: EngineConfig) -> Self {
        Engine::with_services(
            config,
            CrsRegistry::with_default_catalog(),
            Proj4Service::new(),
            MarkerLayer::new(),
        )
    }
}

impl<P: ProjectionService, M: MapSurface> Engine<P, M> {
    pub fn with_services(config: EngineConfig, registry: CrsRegistry, projection: P, surface: M) -> Self {
        Self {
            registry,
            store: DatasetStore::new(),
            selection: SelectionSynchronizer::new(),
            projection,
            surface,
            origin: normalize_code(&config.origin_crs),
            destination: normalize_code(&config.destination_crs),
            pending: None,
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn registry(&self) -> &CrsRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut CrsRegistry {
        &mut self.registry
    }

    pub fn records(&self) -> &[CoordinateRecord] {
        self.store.all()
    }

    pub fn store(&self) -> &DatasetStore {
        &self.store
    }

    pub fn selection(&self) -> SelectionState {
        self.selection.state()
    }

    pub fn surface(&self) -> &M {
        &self.surface
    }

    pub fn origin_crs(&self) -> &str {
        &self.origin
    }

    pub fn destination_crs(&self) -> &str {
        &self.destination
    }

    pub fn is_ingestion_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Decimal digits used when rendering coordinates for the current pair.
    pub fn display_decimals(&self) -> usize {
        self.registry
            .display_decimals(&self.origin, &self.destination)
    }

    fn ensure_idle(&self) -> Result<(), CoordError> {
        if self.pending.is_some() {
            return Err(CoordError::IngestionPending);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // CRS selection
    // ------------------------------------------------------------------

    /// Changes the origin CRS.
    ///
    /// The origin is a property of the whole dataset: existing records are
    /// relabeled to the new code and their targets, computed from the old
    /// origin, are dropped.
    pub fn set_origin_crs(&mut self, code: &str) -> Result<(), CoordError> {
        self.ensure_idle()?;
        let code = normalize_code(code);
        if code == self.origin {
            return Ok(());
        }

        let relabeled = self.store.relabel_origin(&code);
        if relabeled > 0 {
            log::warn!(
                "origin changed from {} to {}: {} existing record(s) relabeled, transformed values cleared",
                self.origin,
                code,
                relabeled
            );
        }
        self.origin = code;
        self.refresh_map();
        Ok(())
    }

    /// Changes the destination CRS. Existing targets are kept but no longer
    /// count as exportable until the next reprojection.
    pub fn set_destination_crs(&mut self, code: &str) -> Result<(), CoordError> {
        self.ensure_idle()?;
        self.destination = normalize_code(code);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Ingestion
    // ------------------------------------------------------------------

    /// Appends one manually entered point.
    pub fn add_point(&mut self, x: &str, y: &str) -> Result<RecordId, CoordError> {
        self.ensure_idle()?;
        let point = parse_manual_pair(x, y)?;
        let id = self.store.append(point, &self.origin);
        log::debug!("manual entry appended as record {}", id);
        self.refresh_map();
        Ok(id)
    }

    /// Appends every pair found in delimited text.
    pub fn ingest_text(&mut self, text: &str) -> Result<IngestReport, CoordError> {
        self.ensure_idle()?;
        Ok(self.append_batch("text", parse_delimited_text(text)))
    }

    /// Appends every row carrying a recognised coordinate column pair.
    pub fn ingest_rows(&mut self, rows: &[Row]) -> Result<IngestReport, CoordError> {
        self.ensure_idle()?;
        Ok(self.append_batch("rows", points_from_rows(rows)))
    }

    /// Decodes spreadsheet bytes with `decoder` and appends the rows.
    pub fn ingest_spreadsheet<D: SpreadsheetDecoder + ?Sized>(
        &mut self,
        decoder: &D,
        bytes: &[u8],
    ) -> Result<IngestReport, CoordError> {
        self.ensure_idle()?;
        let rows = decoder.parse(bytes)?;
        Ok(self.append_batch("spreadsheet", points_from_rows(&rows)))
    }

    /// Starts reading and parsing a file on a worker thread.
    ///
    /// Fails with [`CoordError::IngestionPending`] if another ingestion has
    /// not completed yet.
    pub fn begin_file_ingestion(&mut self, path: &Path, format: InputFormat) -> Result<(), CoordError> {
        self.ensure_idle()?;

        let (sender, receiver) = mpsc::channel();
        let worker_path = path.to_path_buf();
        let handle = thread::spawn(move || {
            // The receiver may already be gone if the engine was dropped.
            let _ = sender.send(read_points_file(&worker_path, format));
        });

        log::debug!("ingestion of {} started", path.display());
        self.pending = Some(PendingIngestion {
            label: path.display().to_string(),
            receiver,
            handle,
        });
        Ok(())
    }

    /// Blocks until the pending ingestion finishes and appends its points.
    ///
    /// Returns `Ok(None)` when nothing was pending.
    pub fn complete_ingestion(&mut self) -> Result<Option<IngestReport>, CoordError> {
        let Some(pending) = self.pending.take() else {
            return Ok(None);
        };
        let received = pending.receiver.recv().map_err(|_| worker_lost());
        self.finish_ingestion(pending, received)
    }

    /// Appends the pending ingestion's points if the worker is done.
    ///
    /// Returns `Ok(None)` while the worker is still running (or when nothing
    /// was pending; see [`is_ingestion_pending`](Self::is_ingestion_pending)).
    pub fn poll_ingestion(&mut self) -> Result<Option<IngestReport>, CoordError> {
        let received = match &self.pending {
            None => return Ok(None),
            Some(pending) => pending.receiver.try_recv(),
        };
        let received = match received {
            Err(TryRecvError::Empty) => return Ok(None),
            Err(TryRecvError::Disconnected) => Err(worker_lost()),
            Ok(result) => Ok(result),
        };
        match self.pending.take() {
            Some(pending) => self.finish_ingestion(pending, received),
            None => Ok(None),
        }
    }

    /// Reads a file synchronously (begin + complete).
    pub fn load_file(&mut self, path: &Path, format: InputFormat) -> Result<IngestReport, CoordError> {
        self.begin_file_ingestion(path, format)?;
        Ok(self
            .complete_ingestion()?
            .unwrap_or_else(|| IngestReport::new(path.display().to_string())))
    }

    fn finish_ingestion(
        &mut self,
        pending: PendingIngestion,
        received: Result<IngestionResult, CoordError>,
    ) -> Result<Option<IngestReport>, CoordError> {
        if pending.handle.join().is_err() {
            log::warn!("ingestion worker for {} panicked", pending.label);
        }
        let (batch, format) = received??;
        let label = match format {
            InputFormat::Table => format!("{} (table)", pending.label),
            InputFormat::Workbook => format!("{} (workbook)", pending.label),
            _ => pending.label,
        };
        Ok(Some(self.append_batch(&label, batch)))
    }

    fn append_batch(&mut self, label: &str, batch: ParsedBatch) -> IngestReport {
        let mut report = IngestReport::new(label);
        report.skipped = batch.skipped;
        for point in batch.points {
            report.appended.push(self.store.append(point, &self.origin));
        }

        log::info!(
            "ingested {} record(s) from {} ({} skipped)",
            report.accepted(),
            label,
            report.skipped
        );
        if report.accepted() > 0 {
            self.refresh_map();
        }
        report
    }

    // ------------------------------------------------------------------
    // Reprojection
    // ------------------------------------------------------------------

    /// Reprojects every record from the origin to the destination CRS.
    pub fn reproject(&mut self) -> Result<ReprojectionReport, CoordError> {
        self.ensure_idle()?;
        let report = reproject::reproject(
            &mut self.store,
            &self.registry,
            &self.projection,
            &self.origin,
            &self.destination,
        )?;
        if self.selection.layer() == Some(MapLayer::Target) {
            self.refresh_map();
        }
        Ok(report)
    }

    // ------------------------------------------------------------------
    // Table / map interaction
    // ------------------------------------------------------------------

    /// Applies a user-intent event.
    pub fn dispatch(&mut self, event: UserEvent) -> Result<Reaction, CoordError> {
        match event {
            UserEvent::RowSelected(index) => {
                let id = self
                    .selection
                    .select_row(index, &self.store, &mut self.surface)?;
                Ok(Reaction::Selected(id))
            }
            UserEvent::MarkerClicked(id) => {
                self.selection.select(id, &self.store, &mut self.surface)?;
                Ok(Reaction::Selected(id))
            }
            UserEvent::RowContextRequested(index) => {
                let id = self
                    .selection
                    .select_row(index, &self.store, &mut self.surface)?;
                let mut actions = vec![ContextAction::CopySource];
                if self.store.get(index).is_some_and(CoordinateRecord::is_transformed) {
                    actions.push(ContextAction::CopyTarget);
                }
                actions.push(ContextAction::Delete);
                Ok(Reaction::ContextMenu { id, index, actions })
            }
            UserEvent::DeleteRequested(index) => self.delete_row(index).map(Reaction::Deleted),
            UserEvent::ClearRequested => self.clear().map(Reaction::Cleared),
        }
    }

    /// Removes the record at `index`.
    pub fn delete_row(&mut self, index: usize) -> Result<CoordinateRecord, CoordError> {
        self.ensure_idle()?;
        let record = self.store.remove_at(index)?;
        self.selection.record_removed(record.id, &mut self.surface);
        log::debug!("deleted record {} at row {}", record.id, index + 1);
        Ok(record)
    }

    /// Removes every record.
    pub fn clear(&mut self) -> Result<usize, CoordError> {
        self.ensure_idle()?;
        let count = self.store.clear();
        self.selection.cleared(&mut self.surface);
        log::debug!("cleared {} record(s)", count);
        Ok(count)
    }

    /// Shows one coordinate set on the map and returns the marker count.
    ///
    /// Points in projected systems are converted to WGS 84 for display;
    /// points that cannot be converted are left off the map.
    pub fn show_layer(&mut self, layer: MapLayer) -> usize {
        let mut placements = Vec::with_capacity(self.store.len());

        for record in self.store.all() {
            let point = match layer {
                MapLayer::Source => Some((record.source.as_tuple(), record.source_crs.as_str())),
                MapLayer::Target => record
                    .target
                    .zip(record.target_crs.as_deref())
                    .map(|(t, crs)| (t.as_tuple(), crs)),
            };
            let Some((xy, crs)) = point else {
                continue;
            };
            match self.marker_position(crs, xy) {
                Ok((lat, lng)) => placements.push((record.id, lat, lng)),
                Err(err) => log::warn!("record {} not shown on map: {}", record.id, err),
            }
        }

        self.selection
            .show_markers(layer, &placements, &mut self.surface);
        placements.len()
    }

    fn marker_position(&self, crs: &str, (x, y): (f64, f64)) -> Result<(f64, f64), CoordError> {
        if self.registry.is_geographic(crs) {
            return Ok((y, x));
        }
        let from = self.registry.resolve(crs)?;
        let to = self.registry.resolve(WGS84)?;
        let (lng, lat) = self.projection.transform(from, to, (x, y))?;
        if !Coord::<Target>::new(lng, lat).is_finite() {
            return Err(CoordError::Transform(format!(
                "no finite WGS 84 position for ({x}, {y})"
            )));
        }
        Ok((lat, lng))
    }

    fn refresh_map(&mut self) {
        if let Some(layer) = self.selection.layer() {
            self.show_layer(layer);
        }
    }

    /// The dataset as display rows.
    pub fn table(&self) -> Vec<TableRow> {
        let decimals = self.display_decimals();
        self.store
            .all()
            .iter()
            .enumerate()
            .map(|(i, r)| TableRow {
                number: i + 1,
                id: r.id,
                source: r.source,
                target: r.target,
                x: format_value(r.source.x, decimals),
                y: format_value(r.source.y, decimals),
                x_t: r
                    .target
                    .map(|t| format_value(t.x, decimals))
                    .unwrap_or_default(),
                y_t: r
                    .target
                    .map(|t| format_value(t.y, decimals))
                    .unwrap_or_default(),
                active: self.selection.is_active(r.id),
                error: r.transform_error.clone(),
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Export
    // ------------------------------------------------------------------

    /// Copies one row's coordinate pair as `x,y` text.
    pub fn copy_record(&self, index: usize, set: CoordSet) -> Result<String, CoordError> {
        let record = self.store.get(index).ok_or(CoordError::IndexOutOfRange {
            index,
            len: self.store.len(),
        })?;
        io_text::format_pair(record, set)
    }

    /// All pairs of one coordinate set, one `x,y` line each.
    pub fn bulk_text(&self, set: CoordSet) -> String {
        io_text::to_bulk_text(self.store.all(), set)
    }

    fn ensure_exportable(&self) -> Result<(), CoordError> {
        let stale = self
            .store
            .all()
            .iter()
            .position(|r| r.target.is_some() && r.target_crs.as_deref() != Some(self.destination.as_str()));
        if let Some(index) = stale {
            return Err(CoordError::ExportNotReady(format!(
                "row {} was transformed for a different destination; run the transformation to EPSG:{}",
                index + 1,
                self.destination
            )));
        }
        Ok(())
    }

    /// The dataset's targets as a GeoJSON document.
    pub fn export_geojson(&self) -> Result<String, CoordError> {
        self.ensure_exportable()?;
        io_geojson::to_geojson_string(self.store.all())
    }

    /// Writes the GeoJSON document to `path`.
    pub fn write_geojson(&self, path: &Path) -> Result<(), CoordError> {
        self.ensure_exportable()?;
        io_geojson::write_geojson(path, self.store.all())
    }

    /// Writes the targets, converted to EPSG:9377, as a zipped shapefile.
    ///
    /// Returns the number of points written.
    pub fn write_shapefile_zip(&self, path: &Path) -> Result<usize, CoordError> {
        self.ensure_exportable()?;
        io_shapefile::write_shapefile_zip(path, self.store.all(), &self.registry, &self.projection)
    }

    /// Writes the table as CSV with the current display precision.
    pub fn write_table_csv(&self, path: &Path) -> Result<(), CoordError> {
        io_table::write_table_csv(path, self.store.all(), self.display_decimals())
    }
}

fn worker_lost() -> CoordError {
    CoordError::Io(std::io::Error::other(
        "ingestion worker exited without a result",
    ))
}
