//! The document assembler: Markdown text in, persisted PDF out.
//!
//! One call runs the whole pipeline for one document:
//!
//! ```text
//! normalize ──▶ markup ──▶ template ──▶ render ──▶ write
//! ```
//!
//! Every failure is reported as a [`DocumentError`] naming the document, so
//! the batch controller can record it and move on to the next one.

use crate::config::AssemblyConfig;
use crate::error::{DocumentError, Md2PdfError};
use crate::output::RenderedDocument;
use crate::pipeline::markup;
use crate::pipeline::normalize;
use crate::pipeline::render::PdfRenderer;
use crate::pipeline::template::{FilledDocument, LogoAsset, PageTemplates, TemplateValues};
use chrono::NaiveDateTime;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Where an assembled document goes and what it is called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputName {
    /// Name offered for retrieval.
    pub display_name: String,
    /// File name inside the configured output directory.
    pub file_name: String,
}

impl OutputName {
    /// Use the same name for display and on disk.
    pub fn same(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            file_name: name,
        }
    }
}

/// Converts Markdown documents into branded PDFs.
///
/// Holds only immutable state (configuration, compiled templates, a shared
/// renderer handle); consecutive calls do not influence each other.
pub struct Assembler {
    config: AssemblyConfig,
    templates: PageTemplates,
    renderer: Arc<dyn PdfRenderer>,
}

impl Assembler {
    /// Create an assembler that renders through `renderer`.
    ///
    /// A missing logo is allowed but logged: the header then carries only the
    /// subject name and date.
    pub fn new(config: AssemblyConfig, renderer: Arc<dyn PdfRenderer>) -> Result<Self, Md2PdfError> {
        if config.logo_path.is_none() {
            warn!("No logo configured; page headers will have no logo");
        }
        Ok(Self {
            config,
            templates: PageTemplates::new()?,
            renderer,
        })
    }

    pub fn config(&self) -> &AssemblyConfig {
        &self.config
    }

    /// Normalise, convert and fill the template without rendering.
    ///
    /// `label` names the document in error messages.
    pub fn prepare(
        &self,
        label: &str,
        markup_text: &str,
        generated_at: NaiveDateTime,
    ) -> Result<FilledDocument, DocumentError> {
        let normalized = normalize::normalize_markup(markup_text);
        let content_html = markup::markdown_to_html(&normalized);

        let logo = match self.config.resolved_logo_path() {
            Some(path) => Some(LogoAsset::load(&path).map_err(|e| DocumentError::Render {
                document: label.to_string(),
                detail: e.to_string(),
            })?),
            None => None,
        };

        self.templates
            .fill(&TemplateValues {
                content_html: &content_html,
                subject: &self.config.subject,
                producer: &self.config.producer,
                generated_at,
                logo: logo.as_ref(),
            })
            .map_err(|detail| DocumentError::TemplateSubstitution {
                document: label.to_string(),
                detail,
            })
    }

    /// Assemble with a timestamp taken from the configured clock.
    pub async fn assemble(
        &self,
        label: &str,
        markup_text: &str,
        output: OutputName,
    ) -> Result<RenderedDocument, DocumentError> {
        let now = self.config.clock.now();
        self.assemble_at(label, markup_text, output, now).await
    }

    /// Run the full pipeline and persist the PDF.
    ///
    /// Writing the file is part of the contract: a successful return means
    /// the bytes are on disk at `RenderedDocument::path`.
    pub async fn assemble_at(
        &self,
        label: &str,
        markup_text: &str,
        output: OutputName,
        generated_at: NaiveDateTime,
    ) -> Result<RenderedDocument, DocumentError> {
        let start = Instant::now();
        info!("Assembling '{}' → {}", label, output.file_name);

        let filled = self.prepare(label, markup_text, generated_at)?;

        let bytes = self
            .renderer
            .render(&filled, &self.config.layout)
            .await
            .map_err(|e| DocumentError::Render {
                document: label.to_string(),
                detail: e.to_string(),
            })?;
        debug!("Rendered '{}': {} bytes", label, bytes.len());

        let path = self.config.output_dir.join(&output.file_name);
        write_atomic(&path, &bytes)
            .await
            .map_err(|e| DocumentError::Filesystem {
                document: label.to_string(),
                path: path.clone(),
                detail: e.to_string(),
            })?;

        info!(
            "Wrote {} ({} bytes) in {}ms",
            path.display(),
            bytes.len(),
            start.elapsed().as_millis()
        );

        Ok(RenderedDocument {
            display_name: output.display_name,
            path,
            generated_at,
            byte_len: bytes.len(),
            bytes,
        })
    }
}

/// Write to a sibling temp file, then rename, so readers never see a
/// partial PDF.
async fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    let tmp_path = path.with_extension("pdf.tmp");
    tokio::fs::write(&tmp_path, bytes).await?;
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OrganizationIdentity, PageLayout};
    use crate::error::RenderError;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::Mutex;

    /// Records what it was asked to render and returns a stub PDF.
    #[derive(Default)]
    struct RecordingRenderer {
        seen: Mutex<Vec<FilledDocument>>,
    }

    #[async_trait]
    impl PdfRenderer for RecordingRenderer {
        async fn render(
            &self,
            document: &FilledDocument,
            _layout: &PageLayout,
        ) -> Result<Vec<u8>, RenderError> {
            self.seen.lock().unwrap().push(document.clone());
            Ok(b"%PDF-1.7\n%stub\n".to_vec())
        }
    }

    struct FailingRenderer;

    #[async_trait]
    impl PdfRenderer for FailingRenderer {
        async fn render(&self, _: &FilledDocument, _: &PageLayout) -> Result<Vec<u8>, RenderError> {
            Err(RenderError::Browser("target crashed".into()))
        }
    }

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    fn config(out: &Path) -> AssemblyConfig {
        AssemblyConfig::builder()
            .subject(OrganizationIdentity::new("Globex"))
            .producer(OrganizationIdentity::new("Acme"))
            .output_dir(out)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn assemble_writes_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = Arc::new(RecordingRenderer::default());
        let assembler = Assembler::new(config(dir.path()), renderer.clone()).unwrap();

        let doc = assembler
            .assemble_at("a.md", "# Title\n\nHello", OutputName::same("a.pdf"), at())
            .await
            .unwrap();

        assert_eq!(doc.display_name, "a.pdf");
        assert_eq!(doc.path, dir.path().join("a.pdf"));
        assert!(doc.bytes.starts_with(b"%PDF"));
        assert_eq!(std::fs::read(&doc.path).unwrap(), doc.bytes);
        assert!(!dir.path().join("a.pdf.tmp").exists());

        let seen = renderer.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].html.contains("<h1>Title</h1>"));
        assert!(seen[0].html.contains("<p>Hello</p>"));
        assert!(seen[0].header_html.contains("05-03-2024"));
    }

    #[tokio::test]
    async fn render_failure_names_document() {
        let dir = tempfile::tempdir().unwrap();
        let assembler = Assembler::new(config(dir.path()), Arc::new(FailingRenderer)).unwrap();
        let err = assembler
            .assemble_at("broken.md", "# x", OutputName::same("broken.pdf"), at())
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::Render { .. }));
        assert!(err.to_string().contains("broken.md"));
        assert!(err.to_string().contains("target crashed"));
        assert!(!dir.path().join("broken.pdf").exists());
    }

    #[tokio::test]
    async fn missing_logo_is_render_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = AssemblyConfig::builder()
            .subject(OrganizationIdentity::new("Globex"))
            .output_dir(dir.path())
            .asset_dir(dir.path())
            .logo_path("missing-logo.png")
            .build()
            .unwrap();
        let assembler = Assembler::new(config, Arc::new(RecordingRenderer::default())).unwrap();
        let err = assembler
            .assemble_at("a.md", "# x", OutputName::same("a.pdf"), at())
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::Render { .. }), "got: {err}");
        assert!(err.to_string().contains("missing-logo.png"));
    }

    #[tokio::test]
    async fn unwritable_output_is_filesystem_error() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the output directory should be.
        let blocker = dir.path().join("out");
        std::fs::write(&blocker, "not a dir").unwrap();

        let assembler =
            Assembler::new(config(&blocker), Arc::new(RecordingRenderer::default())).unwrap();
        let err = assembler
            .assemble_at("a.md", "# x", OutputName::same("a.pdf"), at())
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::Filesystem { .. }), "got: {err}");
    }

    #[tokio::test]
    async fn output_dir_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("reports/2024");
        let assembler =
            Assembler::new(config(&nested), Arc::new(RecordingRenderer::default())).unwrap();
        let doc = assembler
            .assemble_at("a.md", "# x", OutputName::same("a.pdf"), at())
            .await
            .unwrap();
        assert!(doc.path.exists());
    }

    #[test]
    fn prepare_keeps_joiners_and_code_content() {
        let dir = tempfile::tempdir().unwrap();
        let assembler =
            Assembler::new(config(dir.path()), Arc::new(RecordingRenderer::default())).unwrap();
        let filled = assembler
            .prepare(
                "fa.md",
                "می\u{200C}خواهم 👨\u{200D}👩\u{200D}👧\n\n```\nx\u{200B}y\n```\n",
                at(),
            )
            .unwrap();
        assert!(filled.html.contains("می\u{200C}خواهم"));
        assert!(filled.html.contains("👨\u{200D}👩\u{200D}👧"));
        assert!(filled.html.contains("<pre><code>x\u{200B}y\n</code></pre>"));
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn logs_while(f: impl FnOnce()) -> String {
        let buf = LogBuffer::default();
        let writer = buf.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = buf.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn missing_logo_is_logged() {
        let dir = tempfile::tempdir().unwrap();
        let logs = logs_while(|| {
            Assembler::new(config(dir.path()), Arc::new(RecordingRenderer::default())).unwrap();
        });
        assert!(logs.contains("WARN"), "got: {logs}");
        assert!(logs.contains("No logo configured"), "got: {logs}");
    }

    #[test]
    fn configured_logo_is_not_logged() {
        let dir = tempfile::tempdir().unwrap();
        let config = AssemblyConfig::builder()
            .subject(OrganizationIdentity::new("Globex"))
            .output_dir(dir.path())
            .logo_path("logo.png")
            .build()
            .unwrap();
        let logs = logs_while(|| {
            Assembler::new(config, Arc::new(RecordingRenderer::default())).unwrap();
        });
        assert!(!logs.contains("No logo configured"), "got: {logs}");
    }

    #[test]
    fn prepare_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let assembler =
            Assembler::new(config(dir.path()), Arc::new(RecordingRenderer::default())).unwrap();
        let a = assembler.prepare("a.md", "# T\r\n\r\nbody", at()).unwrap();
        let b = assembler.prepare("a.md", "# T\n\nbody\n", at()).unwrap();
        assert_eq!(a, b);
    }
}
