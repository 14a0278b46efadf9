//! One-call entry points: files in, PDFs and a report out.
//!
//! These wire the pieces together the way the CLI needs them: read the
//! sources, launch Chromium once, run the batch, shut the browser down.
//! Library users who already have bytes in memory, or want their own
//! renderer, build an [`Assembler`] and [`BatchController`] directly.

use crate::assemble::Assembler;
use crate::batch::BatchController;
use crate::config::AssemblyConfig;
use crate::error::Md2PdfError;
use crate::output::{BatchReport, SourceDocument};
use crate::pipeline::input;
use crate::pipeline::render::ChromiumRenderer;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Convert Markdown files to PDF.
///
/// # Arguments
/// * `paths`   — Markdown files, in the order they should appear
/// * `combine` — produce one combined PDF instead of one per file
/// * `config`  — assembly configuration
///
/// # Returns
/// `Ok(BatchReport)` once every document was attempted, even if some
/// failed (check `report.stats.failed` or call
/// [`BatchReport::into_result`]).
///
/// # Errors
/// Returns `Err(Md2PdfError)` only for fatal errors:
/// - an input file is missing or unreadable
/// - the browser cannot be launched
pub async fn convert_files<P: AsRef<Path>>(
    paths: &[P],
    combine: bool,
    config: &AssemblyConfig,
) -> Result<BatchReport, Md2PdfError> {
    let sources = input::load_sources(paths).await?;
    convert_sources(&sources, combine, config).await
}

/// Convert in-memory sources to PDF with a freshly launched Chromium.
pub async fn convert_sources(
    sources: &[SourceDocument],
    combine: bool,
    config: &AssemblyConfig,
) -> Result<BatchReport, Md2PdfError> {
    if sources.is_empty() {
        info!("Nothing to convert");
        return Ok(BatchReport::default());
    }

    let renderer = Arc::new(ChromiumRenderer::launch(config).await?);
    let controller = BatchController::new(Assembler::new(config.clone(), renderer.clone())?);
    let report = controller.run_batch(sources, combine).await;

    // The controller holds the other reference; release it before shutdown.
    drop(controller);
    match Arc::try_unwrap(renderer) {
        Ok(renderer) => renderer.shutdown().await,
        Err(_) => warn!("Renderer still shared; browser will exit on drop"),
    }

    Ok(report)
}

/// Synchronous wrapper around [`convert_files`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_files_sync<P: AsRef<Path>>(
    paths: &[P],
    combine: bool,
    config: &AssemblyConfig,
) -> Result<BatchReport, Md2PdfError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Md2PdfError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert_files(paths, combine, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OrganizationIdentity;

    fn config() -> AssemblyConfig {
        AssemblyConfig::builder()
            .subject(OrganizationIdentity::new("Globex"))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn empty_input_needs_no_browser() {
        let report = convert_sources(&[], true, &config()).await.unwrap();
        assert!(report.items.is_empty());
        assert_eq!(report.stats.planned, 0);
    }

    #[test]
    fn missing_file_is_fatal_sync() {
        let err = convert_files_sync(&["/definitely/not/here.md"], false, &config()).unwrap_err();
        assert!(matches!(err, Md2PdfError::FileNotFound { .. }));
    }
}
