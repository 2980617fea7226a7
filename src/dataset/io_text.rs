//! Delimited text ingestion and plain-text coordinate output.
//!
//! # Input
//!
//! Pasted or loaded text is read line by line. Each line is split on any run
//! of `;`, `,`, space or tab, and yields a point only if its first two tokens
//! are finite decimal numbers (scientific notation allowed). Anything else is
//! skipped: irregular input is expected, so a bad line never fails the batch.
//!
//! ```text
//! 4.6,-74.07
//! 1.0 2.0
//! -74.1;4.7;extra columns are ignored
//! ```
//!
//! # Output
//!
//! Bulk text is one `x,y` pair per line with 7 decimal digits, for either the
//! source or the target coordinate set.

use std::fmt;
use std::str::FromStr;

use super::coord::Coord;
use super::model::CoordinateRecord;
use super::space::Source;
use crate::error::CoordError;

/// Decimal digits used for copied/bulk coordinate text.
pub const COPY_DECIMALS: usize = 7;

/// Points recovered from an input, plus how many inputs were dropped.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParsedBatch {
    pub points: Vec<Coord<Source>>,
    pub skipped: usize,
}

/// Which coordinate set of a record to read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoordSet {
    Source,
    Target,
}

impl FromStr for CoordSet {
    type Err = CoordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "source" | "origin" => Ok(CoordSet::Source),
            "target" | "transformed" => Ok(CoordSet::Target),
            other => Err(CoordError::UnsupportedFormat(format!(
                "'{}' (expected source or target)",
                other
            ))),
        }
    }
}

impl fmt::Display for CoordSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordSet::Source => write!(f, "source"),
            CoordSet::Target => write!(f, "target"),
        }
    }
}

/// Parses delimited text into points, skipping malformed lines.
///
/// Blank lines are ignored and not counted as skipped.
pub fn parse_delimited_text(text: &str) -> ParsedBatch {
    let mut batch = ParsedBatch::default();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_line(line) {
            Some(point) => batch.points.push(point),
            None => batch.skipped += 1,
        }
    }

    batch
}

fn parse_line(line: &str) -> Option<Coord<Source>> {
    let mut tokens = line
        .split(|c: char| matches!(c, ';' | ',' | ' ' | '\t'))
        .filter(|t| !t.is_empty());

    let x = parse_finite(tokens.next()?)?;
    let y = parse_finite(tokens.next()?)?;
    Some(Coord::new(x, y))
}

/// Parses a finite `f64`; `inf`/`NaN` spellings are rejected.
pub(crate) fn parse_finite(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Validates a manually entered x/y pair.
pub fn parse_manual_pair(x: &str, y: &str) -> Result<Coord<Source>, CoordError> {
    let x = parse_finite(x).ok_or_else(|| CoordError::Validation {
        field: "x",
        value: x.to_string(),
    })?;
    let y = parse_finite(y).ok_or_else(|| CoordError::Validation {
        field: "y",
        value: y.to_string(),
    })?;
    Ok(Coord::new(x, y))
}

/// Formats a coordinate component with a fixed number of decimals.
pub fn format_value(value: f64, decimals: usize) -> String {
    format!("{:.*}", decimals, value)
}

/// Formats one record's coordinate pair as `x,y` with 7 decimals.
///
/// Fails with [`CoordError::ExportNotReady`] when the target set is asked
/// for and the record has not been reprojected.
pub fn format_pair(record: &CoordinateRecord, set: CoordSet) -> Result<String, CoordError> {
    match set {
        CoordSet::Source => Ok(format!("{:.*}", COPY_DECIMALS, record.source)),
        CoordSet::Target => record
            .target
            .map(|t| format!("{:.*}", COPY_DECIMALS, t))
            .ok_or_else(|| {
                CoordError::ExportNotReady(format!(
                    "record {} has no transformed coordinate",
                    record.id
                ))
            }),
    }
}

/// Renders every record's pair, one per line (each line newline-terminated).
///
/// The target set skips records that have not been reprojected.
pub fn to_bulk_text(records: &[CoordinateRecord], set: CoordSet) -> String {
    let mut out = String::new();
    for record in records {
        if let Ok(pair) = format_pair(record, set) {
            out.push_str(&pair);
            out.push('\n');
        }
    }
    out
}
