//! Error types for the edgequake-md2pdf library.
//!
//! Three error types reflect three distinct failure scopes:
//!
//! * [`Md2PdfError`] — **Fatal**: the batch cannot proceed at all
//!   (input file missing, invalid configuration, browser not launchable).
//!   Returned as `Err(Md2PdfError)` from the top-level entry points.
//!
//! * [`DocumentError`] — **Per document**: one source failed to decode,
//!   fill or render, but every other document in the batch is unaffected.
//!   Stored inside [`crate::output::BatchItem`] so callers can inspect
//!   partial success rather than losing the whole batch to one bad file.
//!
//! * [`RenderError`] — what a [`crate::pipeline::render::PdfRenderer`]
//!   reports. The assembler folds it into [`DocumentError::Render`] together
//!   with the name of the document being rendered.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-md2pdf library.
///
/// Document-level failures use [`DocumentError`] and are stored in
/// [`crate::output::BatchItem`] rather than propagated here.
#[derive(Debug, Error)]
pub enum Md2PdfError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Markdown file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The built-in page templates failed to compile.
    #[error("Page template is invalid: {0}")]
    Template(String),

    // ── Renderer errors ───────────────────────────────────────────────────
    /// The headless browser could not be started.
    #[error(
        "Failed to start the PDF renderer: {0}\n\n\
A Chromium-based browser is required to render PDFs. You can:\n\
  • Install Chrome or Chromium and make sure it is on PATH.\n\
  • Point --chrome (or MD2PDF_CHROME) at an existing browser executable.\n\
  • Use --html-only to produce the filled HTML without rendering.\n"
    )]
    RendererUnavailable(String),

    // ── Batch errors ──────────────────────────────────────────────────────
    /// Some documents succeeded but at least one failed.
    ///
    /// Returned by [`crate::output::BatchReport::into_result`] when the
    /// caller wants to treat any document failure as an error.
    #[error("{failed}/{total} documents failed during conversion\nFirst error: {first_error}")]
    PartialFailure {
        produced: usize,
        failed: usize,
        total: usize,
        first_error: String,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single document of a batch.
///
/// Every variant names the document so the message alone tells the user
/// which input to fix.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum DocumentError {
    /// The uploaded bytes are not valid UTF-8 text.
    #[error("'{document}': input is not valid UTF-8 text: {detail}")]
    InputDecoding { document: String, detail: String },

    /// The page template could not be filled.
    #[error("'{document}': template substitution failed: {detail}")]
    TemplateSubstitution { document: String, detail: String },

    /// The renderer failed to produce a PDF.
    #[error("'{document}': rendering failed: {detail}")]
    Render { document: String, detail: String },

    /// The rendered PDF could not be written to disk.
    #[error("'{document}': failed to write '{path}': {detail}")]
    Filesystem {
        document: String,
        path: PathBuf,
        detail: String,
    },
}

impl DocumentError {
    /// Name of the document this error belongs to.
    pub fn document(&self) -> &str {
        match self {
            DocumentError::InputDecoding { document, .. }
            | DocumentError::TemplateSubstitution { document, .. }
            | DocumentError::Render { document, .. }
            | DocumentError::Filesystem { document, .. } => document,
        }
    }
}

/// Failure reported by a PDF renderer.
#[derive(Debug, Error)]
pub enum RenderError {
    /// An asset the page needs (the logo) does not exist.
    #[error("asset not found: '{path}'")]
    MissingAsset { path: PathBuf },

    /// The asset exists but is not an image format the header can embed.
    #[error("asset '{path}' is not a supported image (png, jpeg, gif, webp, svg)")]
    UnsupportedAsset { path: PathBuf },

    /// The transient HTML working file could not be created.
    #[error("could not create working file in '{dir}': {source}")]
    WorkingFile {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The browser rejected a navigation or print command.
    #[error("browser error: {0}")]
    Browser(String),

    /// Rendering exceeded the configured timeout.
    #[error("render timed out after {secs}s")]
    Timeout { secs: u64 },
}

impl From<chromiumoxide::error::CdpError> for RenderError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        RenderError::Browser(err.to_string())
    }
}
