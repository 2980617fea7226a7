//! Tabular ingestion (spreadsheet rows) and table CSV output.
//!
//! A [`SpreadsheetDecoder`] turns file bytes into rows of named fields.
//! [`points_from_rows`] then looks for a coordinate column pair in each row,
//! matching names case-insensitively in priority order:
//!
//! 1. `x`, `y`
//! 2. `longitud`, `latitud`
//!
//! Rows without either pair, or whose values are not numeric, are skipped.
//!
//! [`CsvDecoder`] sniffs `,`, `;` or tab from the header line so that files
//! exported with a semicolon list separator load without configuration.
//! Binary workbooks go through [`XlsxDecoder`](super::io_xlsx::XlsxDecoder).

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;

use super::coord::Coord;
use super::io_text::{format_value, parse_delimited_text, parse_finite, ParsedBatch};
use super::io_xlsx::{is_workbook_path, looks_like_workbook, XlsxDecoder};
use super::model::CoordinateRecord;
use crate::error::CoordError;

/// Column pairs accepted as x/y, in priority order.
const COLUMN_PAIRS: [(&str, &str); 2] = [("x", "y"), ("longitud", "latitud")];

/// A raw cell value as delivered by a spreadsheet decoder.
#[derive(Clone, Debug, PartialEq)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Empty,
}

impl CellValue {
    /// Classifies a raw text cell.
    pub fn from_raw(raw: &str) -> Self {
        if raw.trim().is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(raw.to_string())
        }
    }

    /// Coerces the cell to a finite number, if possible.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(v) => Some(*v).filter(|v| v.is_finite()),
            CellValue::Text(s) => parse_finite(s),
            CellValue::Empty => None,
        }
    }
}

/// One decoded row: column name to raw value.
pub type Row = BTreeMap<String, CellValue>;

/// Parses tabular file bytes into rows of named fields.
pub trait SpreadsheetDecoder {
    fn parse(&self, bytes: &[u8]) -> Result<Vec<Row>, CoordError>;
}

/// Delimited-text spreadsheet decoder with a header row.
#[derive(Clone, Debug)]
pub struct CsvDecoder {
    path: PathBuf,
}

impl Default for CsvDecoder {
    fn default() -> Self {
        Self {
            path: PathBuf::from("<bytes>"),
        }
    }
}

impl CsvDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decoder whose errors name `path`.
    pub fn for_path(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

impl SpreadsheetDecoder for CsvDecoder {
    fn parse(&self, bytes: &[u8]) -> Result<Vec<Row>, CoordError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(sniff_delimiter(bytes))
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(bytes);

        let headers = reader
            .headers()
            .map_err(|source| CoordError::SpreadsheetParse {
                path: self.path.clone(),
                source,
            })?
            .clone();

        let mut rows = Vec::new();
        for (line, result) in reader.records().enumerate() {
            let record = match result {
                Ok(record) => record,
                Err(err) => {
                    log::debug!("skipping undecodable row {}: {}", line + 2, err);
                    continue;
                }
            };
            let row: Row = headers
                .iter()
                .zip(record.iter())
                .map(|(name, raw)| (name.to_string(), CellValue::from_raw(raw)))
                .collect();
            rows.push(row);
        }

        Ok(rows)
    }
}

fn sniff_delimiter(bytes: &[u8]) -> u8 {
    let header = bytes.split(|&b| b == b'\n').next().unwrap_or_default();
    if header.contains(&b',') {
        b','
    } else if header.contains(&b';') {
        b';'
    } else if header.contains(&b'\t') {
        b'\t'
    } else {
        b','
    }
}

/// Extracts one point per row that carries a recognised numeric column pair.
pub fn points_from_rows(rows: &[Row]) -> ParsedBatch {
    let mut batch = ParsedBatch::default();

    for row in rows {
        let fields: HashMap<String, &CellValue> = row
            .iter()
            .map(|(name, value)| (name.trim().to_lowercase(), value))
            .collect();

        let pair = COLUMN_PAIRS
            .iter()
            .find_map(|(xk, yk)| Some((*fields.get(*xk)?, *fields.get(*yk)?)));

        match pair.and_then(|(x, y)| Some(Coord::new(x.as_f64()?, y.as_f64()?))) {
            Some(point) => batch.points.push(point),
            None => batch.skipped += 1,
        }
    }

    batch
}

/// How a file's contents should be interpreted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InputFormat {
    /// Pick `Table` or `Text` from the file name and first line.
    #[default]
    Auto,
    /// Free-form delimited text, one pair per line.
    Text,
    /// Spreadsheet with a header row.
    Table,
    /// Binary workbook; the first sheet is read as a table.
    Workbook,
}

impl FromStr for InputFormat {
    type Err = CoordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(InputFormat::Auto),
            "text" | "txt" => Ok(InputFormat::Text),
            "table" | "csv" => Ok(InputFormat::Table),
            "workbook" | "xlsx" => Ok(InputFormat::Workbook),
            other => Err(CoordError::UnsupportedFormat(format!(
                "'{}' (supported: auto, text, table, workbook)",
                other
            ))),
        }
    }
}

/// Resolves `Auto` to a concrete format for the given file.
///
/// Workbook extensions, or zip/OLE2 magic bytes, select
/// [`InputFormat::Workbook`]; `.csv` and `.tsv` files whose first line is not
/// already a coordinate pair select [`InputFormat::Table`]; anything else is
/// read as text.
pub fn detect_format(
    path: &Path,
    bytes: &[u8],
    requested: InputFormat,
) -> Result<InputFormat, CoordError> {
    if requested != InputFormat::Auto {
        return Ok(requested);
    }

    if is_workbook_path(path) || looks_like_workbook(bytes) {
        return Ok(InputFormat::Workbook);
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    if ext != "csv" && ext != "tsv" {
        return Ok(InputFormat::Text);
    }

    let text = String::from_utf8_lossy(bytes);
    let starts_numeric = text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(|l| !parse_delimited_text(l).points.is_empty())
        .unwrap_or(false);

    Ok(if starts_numeric {
        InputFormat::Text
    } else {
        InputFormat::Table
    })
}

/// Reads and parses a coordinate file.
///
/// Returns the parsed batch and the concrete format that was used.
pub fn read_points_file(
    path: &Path,
    requested: InputFormat,
) -> Result<(ParsedBatch, InputFormat), CoordError> {
    let bytes = std::fs::read(path).map_err(CoordError::Io)?;
    let format = detect_format(path, &bytes, requested)?;

    let batch = match format {
        InputFormat::Table => {
            let rows = CsvDecoder::for_path(path).parse(&bytes)?;
            points_from_rows(&rows)
        }
        InputFormat::Workbook => {
            let rows = XlsxDecoder::for_path(path).parse(&bytes)?;
            points_from_rows(&rows)
        }
        _ => parse_delimited_text(&String::from_utf8_lossy(&bytes)),
    };

    Ok((batch, format))
}

// ============================================================================
// Table CSV output
// ============================================================================

#[derive(Debug, Serialize)]
struct TableCsvRow {
    n: usize,
    x: String,
    y: String,
    x_t: String,
    y_t: String,
}

fn table_rows(records: &[CoordinateRecord], decimals: usize) -> Vec<TableCsvRow> {
    records
        .iter()
        .enumerate()
        .map(|(i, r)| TableCsvRow {
            n: i + 1,
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
        })
        .collect()
}

/// Writes the coordinate table (`n,x,y,x_t,y_t`) to a CSV string.
pub fn to_table_csv_string(
    records: &[CoordinateRecord],
    decimals: usize,
) -> Result<String, CoordError> {
    let dummy_path = Path::new("<string>");
    let mut csv_writer = csv::Writer::from_writer(Vec::new());
    for row in table_rows(records, decimals) {
        csv_writer
            .serialize(&row)
            .map_err(|source| CoordError::TableCsvWrite {
                path: dummy_path.to_path_buf(),
                source,
            })?;
    }

    let bytes = csv_writer
        .into_inner()
        .map_err(|e| CoordError::Io(e.into_error()))?;

    String::from_utf8(bytes)
        .map_err(|e| CoordError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}

/// Writes the coordinate table to a CSV file.
pub fn write_table_csv(
    path: &Path,
    records: &[CoordinateRecord],
    decimals: usize,
) -> Result<(), CoordError> {
    let file = File::create(path).map_err(CoordError::Io)?;
    let writer = BufWriter::new(file);

    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in table_rows(records, decimals) {
        csv_writer
            .serialize(&row)
            .map_err(|source| CoordError::TableCsvWrite {
                path: path.to_path_buf(),
                source,
            })?;
    }

    csv_writer
        .into_inner()
        .map_err(|e| CoordError::Io(e.into_error()))?
        .flush()
        .map_err(CoordError::Io)?;

    Ok(())
}
