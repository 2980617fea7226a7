use std::path::PathBuf;
use thiserror::Error;

use crate::dataset::RecordId;

/// The main error type for coordshift operations.
#[derive(Debug, Error)]
pub enum CoordError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid {field}: '{value}' is not a finite number")]
    Validation { field: &'static str, value: String },

    #[error("Unknown CRS: {0}")]
    UnknownCrs(String),

    #[error("Invalid projection definition for {code}: {message}")]
    InvalidProjection { code: String, message: String },

    #[error("Transform failed: {0}")]
    Transform(String),

    #[error("Row index {index} out of range (dataset has {len} record(s))")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("No record with id {0}")]
    UnknownRecord(RecordId),

    #[error("Export not ready: {0}")]
    ExportNotReady(String),

    #[error("A file ingestion is still pending; wait for it to complete")]
    IngestionPending,

    #[error("Failed to parse spreadsheet {path}: {source}")]
    SpreadsheetParse {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to read workbook {path}: {source}")]
    WorkbookParse {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    #[error("Failed to write GeoJSON to {path}: {source}")]
    GeoJsonWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write table CSV to {path}: {source}")]
    TableCsvWrite {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to write shapefile {path}: {source}")]
    ShapefileWrite {
        path: PathBuf,
        #[source]
        source: shapefile::Error,
    },

    #[error("Failed to write archive {path}: {source}")]
    ArchiveWrite {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Failed to serialize report: {0}")]
    ReportSerialize(#[from] serde_json::Error),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Line {line}: {message}")]
    Script { line: usize, message: String },

    #[error("Session finished with {errors} failed command(s)")]
    SessionFailed { errors: usize },
}

