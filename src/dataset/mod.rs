//! Coordinate dataset model, ingestion and export.
//!
//! This module holds the session's ordered record store and every codec that
//! moves points in or out of it. Readers produce a [`ParsedBatch`] of source
//! coordinates; the engine appends the batch to the [`DatasetStore`], which
//! assigns each record its stable [`RecordId`]. Writers read records back in
//! store order.
//!
//! # Design Principles
//!
//! 1. **Stable identity**: records are addressed by id for every cross-view
//!    lookup; row indices are only a display position.
//!
//! 2. **Type Safety**: source and target coordinates are distinct types
//!    ([`Coord<Source>`] vs [`Coord<Target>`]) so they cannot be swapped.
//!
//! 3. **Best-effort input**: readers skip what they cannot parse and report
//!    the count instead of failing the batch.
//!
//! # Example
//!
//! ```
//! use coordshift::dataset::{parse_delimited_text, DatasetStore};
//!
//! let batch = parse_delimited_text("4.6,-74.07\nabc,123\n1.0 2.0");
//! let mut store = DatasetStore::new();
//! for point in batch.points {
//!     store.append(point, "4326");
//! }
//! assert_eq!(store.len(), 2);
//! assert_eq!(batch.skipped, 1);
//! ```

mod coord;
mod ids;
pub mod io_geojson;
pub mod io_shapefile;
pub mod io_table;
pub mod io_text;
pub mod io_xlsx;
mod model;
mod report;
mod space;

// Re-export core types for convenient access
pub use coord::Coord;
pub use ids::RecordId;
pub use io_table::{CellValue, CsvDecoder, InputFormat, Row, SpreadsheetDecoder};
pub use io_text::{parse_delimited_text, parse_manual_pair, CoordSet, ParsedBatch};
pub use io_xlsx::XlsxDecoder;
pub use model::{CoordinateRecord, DatasetStore};
pub use report::IngestReport;
pub use space::{Source, Target};
