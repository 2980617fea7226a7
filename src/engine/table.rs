//! Tabular view model of the dataset.

use std::fmt::Write;

use serde::Serialize;

use crate::dataset::{Coord, RecordId, Source, Target};

/// One display row.
///
/// The text columns are formatted with the display precision and are what
/// [`render_table`] prints; serialization carries the full-precision
/// coordinates instead.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TableRow {
    /// 1-based row number.
    pub number: usize,
    pub id: RecordId,
    pub source: Coord<Source>,
    /// `None` until the record is reprojected.
    pub target: Option<Coord<Target>>,
    #[serde(skip)]
    pub x: String,
    #[serde(skip)]
    pub y: String,
    /// Empty until the record is reprojected.
    #[serde(skip)]
    pub x_t: String,
    #[serde(skip)]
    pub y_t: String,
    /// True for the active record.
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Renders rows as an aligned plain-text table.
///
/// The active row is prefixed with `>`; rows whose last transform failed get
/// the failure message appended.
pub fn render_table(rows: &[TableRow]) -> String {
    let headers = ["N", "X", "Y", "X_T", "Y_T"];
    let cells: Vec<[&str; 5]> = rows
        .iter()
        .map(|r| ["", r.x.as_str(), r.y.as_str(), r.x_t.as_str(), r.y_t.as_str()])
        .collect();
    let numbers: Vec<String> = rows.iter().map(|r| r.number.to_string()).collect();

    let mut widths = headers.map(str::len);
    for (row, number) in cells.iter().zip(&numbers) {
        widths[0] = widths[0].max(number.len());
        for col in 1..5 {
            widths[col] = widths[col].max(row[col].len());
        }
    }

    let mut out = String::new();
    let _ = write!(out, "  {:>w$}", headers[0], w = widths[0]);
    for col in 1..5 {
        let _ = write!(out, "  {:>w$}", headers[col], w = widths[col]);
    }
    out.push('\n');

    for ((row, cell), number) in rows.iter().zip(&cells).zip(&numbers) {
        out.push(if row.active { '>' } else { ' ' });
        let _ = write!(out, " {:>w$}", number, w = widths[0]);
        for col in 1..5 {
            let _ = write!(out, "  {:>w$}", cell[col], w = widths[col]);
        }
        if let Some(error) = &row.error {
            let _ = write!(out, "  ! {}", error);
        }
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(number: usize, x_t: &str, active: bool) -> TableRow {
        TableRow {
            number,
            id: RecordId(number as u64),
            source: Coord::new(1.0, 2.0),
            target: None,
            x: "1.000".into(),
            y: "2.000".into(),
            x_t: x_t.into(),
            y_t: x_t.into(),
            active,
            error: None,
        }
    }

    #[test]
    fn test_render_marks_active_row() {
        let text = render_table(&[row(1, "", false), row(2, "10.000", true)]);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("X_T"));
        assert!(lines[1].starts_with("  1"));
        assert!(lines[2].starts_with("> 2"));
        assert!(lines[2].ends_with("10.000"));
    }

    #[test]
    fn test_render_appends_error() {
        let mut failed = row(1, "", false);
        failed.error = Some("latitude out of range".into());
        assert!(render_table(&[failed]).contains("! latitude out of range"));
    }

    #[test]
    fn test_serializes_full_precision_coordinates() {
        let mut transformed = row(1, "1000000.000", false);
        transformed.target = Some(Coord::new(1_000_000.123456, 999_999.5));

        let json = serde_json::to_value(&transformed).unwrap();
        assert_eq!(json["source"], serde_json::json!({"x": 1.0, "y": 2.0}));
        assert_eq!(json["target"]["x"], 1_000_000.123456);
        assert!(json.get("x_t").is_none());

        let pending = serde_json::to_value(row(2, "", false)).unwrap();
        assert!(pending["target"].is_null());
    }
}
