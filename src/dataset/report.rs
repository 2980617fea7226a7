//! Ingestion report types.
//!
//! Ingestion is best-effort, so the report is how callers learn that some
//! lines or rows were dropped.

use serde::Serialize;
use std::fmt;

use super::ids::RecordId;

/// Outcome of one ingestion batch.
#[derive(Clone, Debug, Default, Serialize)]
pub struct IngestReport {
    /// Where the batch came from (file path, "manual", "text", ...).
    pub source: String,
    /// Ids of the records appended, in order.
    pub appended: Vec<RecordId>,
    /// Lines or rows that could not be read as a coordinate pair.
    pub skipped: usize,
}

impl IngestReport {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Default::default()
        }
    }

    /// Number of records appended.
    pub fn accepted(&self) -> usize {
        self.appended.len()
    }
}

impl fmt::Display for IngestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Loaded {} coordinate(s) from {}",
            self.accepted(),
            self.source
        )?;
        if self.skipped > 0 {
            write!(f, " ({} line(s) skipped)", self.skipped)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_mentions_skipped_only_when_present() {
        let mut report = IngestReport::new("points.txt");
        report.appended = vec![RecordId(1), RecordId(2)];
        assert_eq!(report.to_string(), "Loaded 2 coordinate(s) from points.txt");

        report.skipped = 3;
        assert!(report.to_string().ends_with("(3 line(s) skipped)"));
    }
}
