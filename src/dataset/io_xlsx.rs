//! Workbook ingestion (`.xlsx`, `.xls`, `.ods`) through `calamine`.
//!
//! Only the first worksheet is read. Its first row holds the column names;
//! every following row becomes one [`Row`] for
//! [`points_from_rows`](super::io_table::points_from_rows). Numeric cells
//! stay numbers, text cells go through the same coercion as CSV fields, and
//! rows with no content at all are dropped before extraction.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto_from_rs, Data, Reader};

use super::io_table::{CellValue, Row, SpreadsheetDecoder};
use crate::error::CoordError;

/// File extensions routed to [`XlsxDecoder`].
pub const WORKBOOK_EXTENSIONS: [&str; 4] = ["xlsx", "xlsm", "xls", "ods"];

/// Spreadsheet decoder for binary workbooks.
#[derive(Clone, Debug)]
pub struct XlsxDecoder {
    path: PathBuf,
}

impl Default for XlsxDecoder {
    fn default() -> Self {
        Self {
            path: PathBuf::from("<bytes>"),
        }
    }
}

impl XlsxDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decoder whose errors name `path`.
    pub fn for_path(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    fn parse_error(&self, source: calamine::Error) -> CoordError {
        CoordError::WorkbookParse {
            path: self.path.clone(),
            source,
        }
    }
}

impl SpreadsheetDecoder for XlsxDecoder {
    fn parse(&self, bytes: &[u8]) -> Result<Vec<Row>, CoordError> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
            .map_err(|e| self.parse_error(e))?;

        let range = workbook
            .worksheet_range_at(0)
            .unwrap_or(Err(calamine::Error::Msg("the workbook has no worksheets")))
            .map_err(|e| self.parse_error(e))?;

        let mut cells = range.rows();
        let Some(header) = cells.next() else {
            return Ok(Vec::new());
        };
        let names: Vec<String> = header.iter().map(header_name).collect();

        let rows = cells
            .filter(|row| row.iter().any(|cell| !matches!(cell, Data::Empty)))
            .map(|row| {
                names
                    .iter()
                    .zip(row)
                    .filter(|(name, _)| !name.is_empty())
                    .map(|(name, cell)| (name.clone(), cell_value(cell)))
                    .collect::<Row>()
            })
            .collect::<Vec<_>>();

        log::debug!(
            "decoded {} row(s) from the first worksheet of {}",
            rows.len(),
            self.path.display()
        );
        Ok(rows)
    }
}

/// Returns true if `path` has a workbook extension.
pub fn is_workbook_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| WORKBOOK_EXTENSIONS.iter().any(|w| e.eq_ignore_ascii_case(w)))
        .unwrap_or(false)
}

/// Returns true if `bytes` start like a zip container or an OLE2 compound file.
pub fn looks_like_workbook(bytes: &[u8]) -> bool {
    bytes.starts_with(b"PK\x03\x04") || bytes.starts_with(&[0xD0, 0xCF, 0x11, 0xE0])
}

fn header_name(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Float(v) => CellValue::Number(*v),
        Data::Int(v) => CellValue::Number(*v as f64),
        Data::String(s) => CellValue::from_raw(s),
        Data::Empty => CellValue::Empty,
        other => CellValue::Text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_mapping() {
        assert_eq!(cell_value(&Data::Float(4.6)), CellValue::Number(4.6));
        assert_eq!(cell_value(&Data::Int(-74)), CellValue::Number(-74.0));
        assert_eq!(
            cell_value(&Data::String("4.65".into())),
            CellValue::Text("4.65".into())
        );
        assert_eq!(cell_value(&Data::String("  ".into())), CellValue::Empty);
        assert_eq!(cell_value(&Data::Empty), CellValue::Empty);
        assert_eq!(cell_value(&Data::Bool(true)).as_f64(), None);
    }

    #[test]
    fn test_header_names_are_trimmed() {
        assert_eq!(header_name(&Data::String(" Longitud ".into())), "Longitud");
        assert_eq!(header_name(&Data::Empty), "");
    }

    #[test]
    fn test_workbook_detection() {
        assert!(is_workbook_path(Path::new("puntos.XLSX")));
        assert!(is_workbook_path(Path::new("puntos.xls")));
        assert!(!is_workbook_path(Path::new("puntos.csv")));
        assert!(looks_like_workbook(b"PK\x03\x04rest"));
        assert!(!looks_like_workbook(b"x,y\n1,2\n"));
    }

    #[test]
    fn test_garbage_bytes_are_a_parse_error() {
        let err = XlsxDecoder::for_path(Path::new("broken.xlsx"))
            .parse(b"not a workbook")
            .unwrap_err();
        assert!(matches!(err, CoordError::WorkbookParse { ref path, .. } if path == Path::new("broken.xlsx")));
    }
}
