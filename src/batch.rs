//! The batch controller: decide how many documents to assemble, name them,
//! and keep one document's failure from affecting the others.
//!
//! Two modes, chosen by a single flag:
//!
//! * **individual** — one assembler call per source, in upload order, each
//!   named `<base>_<YYYYmmdd_HHMMSS>.pdf`;
//! * **combine** — all sources joined by [`COMBINE_SEPARATOR`] and assembled
//!   once, offered as [`COMBINED_DISPLAY_NAME`] but written under a
//!   timestamped file name so repeated runs do not overwrite each other.

use crate::assemble::{Assembler, OutputName};
use crate::error::DocumentError;
use crate::output::{BatchItem, BatchReport, BatchStats, RenderedDocument, SourceDocument};
use crate::pipeline::normalize;
use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

/// Inserted between sources in combine mode. Renders as a horizontal rule.
pub const COMBINE_SEPARATOR: &str = "\n\n---\n\n";

/// Retrieval name of the combined document.
pub const COMBINED_DISPLAY_NAME: &str = "combined_output.pdf";

/// Timestamp appended to output file names.
pub const NAME_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

const COMBINED_STEM: &str = "combined_output";

/// Drives an [`Assembler`] over a set of uploaded sources.
pub struct BatchController {
    assembler: Assembler,
}

impl BatchController {
    pub fn new(assembler: Assembler) -> Self {
        Self { assembler }
    }

    pub fn assembler(&self) -> &Assembler {
        &self.assembler
    }

    /// Assemble `sources` either together or one by one.
    ///
    /// Never fails as a whole: every failure lands in its item of the
    /// returned report. With `fail_fast` configured the batch stops at the
    /// first failure and the remaining sources are counted as skipped.
    pub async fn run_batch(&self, sources: &[SourceDocument], combine: bool) -> BatchReport {
        let start = Instant::now();
        let planned = match (sources.is_empty(), combine) {
            (true, _) => 0,
            (false, true) => 1,
            (false, false) => sources.len(),
        };

        let mut report = BatchReport {
            items: Vec::with_capacity(planned),
            stats: BatchStats {
                total_sources: sources.len(),
                planned,
                ..Default::default()
            },
        };

        if sources.is_empty() {
            warn!("No sources to convert");
            return report;
        }

        info!(
            "Starting batch: {} source(s), {} mode",
            sources.len(),
            if combine { "combine" } else { "individual" }
        );
        let config = self.assembler.config();
        if let Some(ref cb) = config.progress_callback {
            cb.on_batch_start(planned);
        }

        let mut names = NameAllocator::new(&config.output_dir);
        if combine {
            let item = self.run_combined(sources, &mut names).await;
            self.record(&mut report, item, 1, COMBINED_DISPLAY_NAME);
        } else {
            for (i, source) in sources.iter().enumerate() {
                if config.fail_fast && report.stats.failed > 0 {
                    report.stats.skipped = sources.len() - i;
                    warn!(
                        "Fail-fast: skipping {} remaining source(s)",
                        report.stats.skipped
                    );
                    break;
                }
                let item = self.run_single(i + 1, planned, source, &mut names).await;
                self.record(&mut report, item, i + 1, &source.name);
            }
        }

        report.stats.total_duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Batch complete: {}/{} produced, {} failed, {} skipped, {}ms",
            report.stats.produced,
            planned,
            report.stats.failed,
            report.stats.skipped,
            report.stats.total_duration_ms
        );
        if let Some(ref cb) = config.progress_callback {
            cb.on_batch_complete(planned, report.stats.produced);
        }
        report
    }

    async fn run_single(
        &self,
        index: usize,
        total: usize,
        source: &SourceDocument,
        names: &mut NameAllocator<'_>,
    ) -> BatchItem {
        let config = self.assembler.config();
        if let Some(ref cb) = config.progress_callback {
            cb.on_document_start(index, total, &source.name);
        }

        let now = config.clock.now();
        let result = match normalize::decode_source(&source.bytes) {
            Ok(text) => {
                let file_name = names.allocate(&output_stem(&source.name), now);
                self.assembler
                    .assemble_at(&source.name, &text, OutputName::same(file_name), now)
                    .await
            }
            Err(detail) => Err(DocumentError::InputDecoding {
                document: source.name.clone(),
                detail,
            }),
        };
        item(vec![source.name.clone()], result)
    }

    async fn run_combined(&self, sources: &[SourceDocument], names: &mut NameAllocator<'_>) -> BatchItem {
        let config = self.assembler.config();
        if let Some(ref cb) = config.progress_callback {
            cb.on_document_start(1, 1, COMBINED_DISPLAY_NAME);
        }
        let source_names: Vec<String> = sources.iter().map(|s| s.name.clone()).collect();

        let combined = match combine_sources(sources) {
            Ok(text) => text,
            Err(e) => return item(source_names, Err(e)),
        };

        let now = config.clock.now();
        let output = OutputName {
            display_name: COMBINED_DISPLAY_NAME.to_string(),
            file_name: names.allocate(COMBINED_STEM, now),
        };
        let result = self
            .assembler
            .assemble_at(COMBINED_DISPLAY_NAME, &combined, output, now)
            .await;
        item(source_names, result)
    }

    fn record(&self, report: &mut BatchReport, item: BatchItem, index: usize, name: &str) {
        let cb = self.assembler.config().progress_callback.as_ref();
        let total = report.stats.planned;
        match (&item.document, &item.error) {
            (Some(doc), _) => {
                report.stats.produced += 1;
                if let Some(cb) = cb {
                    cb.on_document_complete(index, total, name, doc.byte_len);
                }
            }
            (None, Some(e)) => {
                report.stats.failed += 1;
                warn!("{}", e);
                if let Some(cb) = cb {
                    cb.on_document_error(index, total, name, &e.to_string());
                }
            }
            (None, None) => {}
        }
        report.items.push(item);
    }
}

fn item(sources: Vec<String>, result: Result<RenderedDocument, DocumentError>) -> BatchItem {
    match result {
        Ok(doc) => BatchItem {
            sources,
            document: Some(doc),
            error: None,
        },
        Err(e) => BatchItem {
            sources,
            document: None,
            error: Some(e),
        },
    }
}

/// Decode every source and join them, in order, with [`COMBINE_SEPARATOR`].
///
/// The first undecodable source fails the whole combination, since the
/// combined document would otherwise silently miss a part.
pub fn combine_sources(sources: &[SourceDocument]) -> Result<String, DocumentError> {
    let mut parts = Vec::with_capacity(sources.len());
    for source in sources {
        let text = normalize::decode_source(&source.bytes).map_err(|detail| {
            DocumentError::InputDecoding {
                document: source.name.clone(),
                detail,
            }
        })?;
        parts.push(text);
    }
    Ok(parts
        .iter()
        .map(|p| p.trim_end_matches('\n'))
        .collect::<Vec<_>>()
        .join(COMBINE_SEPARATOR))
}

// ── Naming ───────────────────────────────────────────────────────────────

static RE_UNSAFE_NAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[<>:"/\\|?*\x00-\x1F]"#).unwrap());

/// The text before the first `.` of the file name, safe to use on disk.
///
/// Directory components are dropped; an empty result becomes `document`.
pub fn output_stem(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name);
    let stem = base.split('.').next().unwrap_or("");
    let stem = RE_UNSAFE_NAME_CHARS.replace_all(stem.trim(), "_");
    if stem.is_empty() {
        "document".to_string()
    } else {
        stem.into_owned()
    }
}

/// Hands out `<stem>_<timestamp>.pdf` names that are unique within a batch
/// and do not clobber files already in the output directory.
struct NameAllocator<'a> {
    dir: &'a Path,
    used: HashSet<String>,
}

impl<'a> NameAllocator<'a> {
    fn new(dir: &'a Path) -> Self {
        Self {
            dir,
            used: HashSet::new(),
        }
    }

    fn allocate(&mut self, stem: &str, at: NaiveDateTime) -> String {
        let base = format!("{stem}_{}", at.format(NAME_TIMESTAMP_FORMAT));
        let mut candidate = format!("{base}.pdf");
        let mut n = 2;
        while self.used.contains(&candidate) || self.dir.join(&candidate).exists() {
            candidate = format!("{base}_{n}.pdf");
            n += 1;
        }
        self.used.insert(candidate.clone());
        candidate
    }
}
