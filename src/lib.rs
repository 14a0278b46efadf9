//! # edgequake-md2pdf
//!
//! Convert Markdown documents into branded, paginated PDF reports.
//!
//! Every page carries a running header (subject organisation, generation
//! date, producer logo) and a page counter; body text is set in a fixed
//! house style. Several inputs can be rendered one PDF each, or combined
//! into a single document.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Markdown files
//!  │
//!  ├─ 1. Input      read sources as raw bytes
//!  ├─ 2. Normalize  UTF-8 decode, leading BOM, line endings
//!  ├─ 3. Markup     Markdown → HTML (tables, fenced code)
//!  ├─ 4. Template   page / header / footer templates (Tera, autoescaped)
//!  ├─ 5. Render     headless Chromium prints to PDF (letter, fixed margins)
//!  └─ 6. Output     atomic write + per-document batch report
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_md2pdf::{convert_files, AssemblyConfig, OrganizationIdentity};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AssemblyConfig::builder()
//!         .producer(OrganizationIdentity::new("Acme Research").with_website("https://acme.example/"))
//!         .subject(OrganizationIdentity::new("Globex Corporation"))
//!         .logo_path("logo.png")
//!         .build()?;
//!
//!     let report = convert_files(&["q1.md", "q2.md"], false, &config).await?;
//!     for doc in report.documents() {
//!         println!("{} → {}", doc.display_name, doc.path.display());
//!     }
//!     for err in report.errors() {
//!         eprintln!("{err}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `md2pdf` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-md2pdf = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod assemble;
pub mod batch;
pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use assemble::{Assembler, OutputName};
pub use batch::{BatchController, COMBINED_DISPLAY_NAME, COMBINE_SEPARATOR};
pub use config::{
    AssemblyConfig, AssemblyConfigBuilder, Clock, FixedClock, Margins, OrganizationIdentity,
    Orientation, PageLayout, PaperSize, SystemClock,
};
pub use convert::{convert_files, convert_files_sync, convert_sources};
pub use error::{DocumentError, Md2PdfError, RenderError};
pub use output::{BatchItem, BatchReport, BatchStats, RenderedDocument, SourceDocument};
pub use pipeline::input::load_sources;
pub use pipeline::render::{ChromiumRenderer, DisabledRenderer, PdfRenderer};
pub use pipeline::template::FilledDocument;
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
