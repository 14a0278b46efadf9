//! Data carried in and out of the assembly pipeline.

use crate::error::{DocumentError, Md2PdfError};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// An uploaded Markdown buffer and the file name it arrived under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl SourceDocument {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

/// A finished PDF and where it was written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderedDocument {
    /// Name offered to the user for retrieval.
    pub display_name: String,
    /// Where the PDF was persisted. Its file name may differ from
    /// `display_name` (combine mode adds a timestamp to avoid overwrites).
    pub path: PathBuf,
    /// Timestamp used for the header date and the file name.
    pub generated_at: NaiveDateTime,
    /// Size of `bytes`; kept for serialised reports.
    pub byte_len: usize,
    /// The PDF itself. Not serialised.
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

impl RenderedDocument {
    pub const MIME_TYPE: &'static str = "application/pdf";
}

/// Outcome of one assembler invocation within a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItem {
    /// Source file names that fed this item (several in combine mode).
    pub sources: Vec<String>,
    /// The rendered document; `None` on failure.
    pub document: Option<RenderedDocument>,
    /// Error if the item failed.
    pub error: Option<DocumentError>,
}

impl BatchItem {
    pub fn is_ok(&self) -> bool {
        self.error.is_none() && self.document.is_some()
    }
}

/// Aggregate counters for a batch run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchStats {
    /// Number of uploaded sources.
    pub total_sources: usize,
    /// Assembler invocations planned (1 in combine mode).
    pub planned: usize,
    /// PDFs produced.
    pub produced: usize,
    /// Items that failed.
    pub failed: usize,
    /// Items never attempted because of fail-fast.
    pub skipped: usize,
    /// Wall-clock time for the whole batch.
    pub total_duration_ms: u64,
}

/// Ordered per-item results of a batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    /// Items in upload order.
    pub items: Vec<BatchItem>,
    pub stats: BatchStats,
}

impl BatchReport {
    /// Successfully rendered documents, in order.
    pub fn documents(&self) -> impl Iterator<Item = &RenderedDocument> {
        self.items.iter().filter_map(|i| i.document.as_ref())
    }

    /// Errors, in order.
    pub fn errors(&self) -> impl Iterator<Item = &DocumentError> {
        self.items.iter().filter_map(|i| i.error.as_ref())
    }

    /// Treat any failed or skipped item as an error.
    pub fn into_result(self) -> Result<Vec<RenderedDocument>, Md2PdfError> {
        let stats = self.stats.clone();
        if stats.failed == 0 && stats.skipped == 0 {
            return Ok(self.items.into_iter().filter_map(|i| i.document).collect());
        }
        let first_error = self
            .errors()
            .next()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "Unknown error".to_string());
        Err(Md2PdfError::PartialFailure {
            produced: stats.produced,
            failed: stats.failed + stats.skipped,
            total: stats.planned,
            first_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    fn ok_item(name: &str) -> BatchItem {
        BatchItem {
            sources: vec![name.to_string()],
            document: Some(RenderedDocument {
                display_name: format!("{name}.pdf"),
                path: PathBuf::from(format!("{name}.pdf")),
                generated_at: at(),
                byte_len: 4,
                bytes: b"%PDF".to_vec(),
            }),
            error: None,
        }
    }

    #[test]
    fn into_result_all_ok() {
        let report = BatchReport {
            items: vec![ok_item("a"), ok_item("b")],
            stats: BatchStats {
                total_sources: 2,
                planned: 2,
                produced: 2,
                ..Default::default()
            },
        };
        let docs = report.into_result().unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].display_name, "a.pdf");
    }

    #[test]
    fn into_result_partial_failure() {
        let failed = BatchItem {
            sources: vec!["b.md".into()],
            document: None,
            error: Some(DocumentError::Render {
                document: "b.md".into(),
                detail: "boom".into(),
            }),
        };
        let report = BatchReport {
            items: vec![ok_item("a"), failed],
            stats: BatchStats {
                total_sources: 2,
                planned: 2,
                produced: 1,
                failed: 1,
                ..Default::default()
            },
        };
        assert_eq!(report.errors().count(), 1);
        assert_eq!(report.documents().count(), 1);
        let err = report.into_result().unwrap_err();
        assert!(err.to_string().contains("b.md"), "got: {err}");
    }

    #[test]
    fn report_json_omits_bytes() {
        let report = BatchReport {
            items: vec![ok_item("a")],
            stats: BatchStats::default(),
        };
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"byte_len\":4"));
        assert!(!json.contains("\"bytes\""));
    }
}
