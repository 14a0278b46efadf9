//! Configuration types for Markdown-to-PDF assembly.
//!
//! All assembly behaviour is controlled through [`AssemblyConfig`], built via
//! its [`AssemblyConfigBuilder`]. The organisation identities and the logo
//! path are ordinary fields here rather than process-wide constants, so the
//! assembler can be exercised in isolation from the CLI.

use crate::error::Md2PdfError;
use crate::progress::ProgressCallback;
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Configuration for a batch of Markdown-to-PDF conversions.
///
/// Built via [`AssemblyConfig::builder()`]; a subject organisation name is
/// mandatory, everything else has a default.
///
/// # Example
/// ```rust
/// use edgequake_md2pdf::{AssemblyConfig, OrganizationIdentity};
///
/// let config = AssemblyConfig::builder()
///     .producer(OrganizationIdentity::new("Acme Research").with_website("https://acme.example/"))
///     .subject(OrganizationIdentity::new("Globex Corporation"))
///     .logo_path("logo.png")
///     .output_dir("out")
///     .build()
///     .unwrap();
/// assert_eq!(config.subject.name, "Globex Corporation");
/// ```
#[derive(Clone)]
pub struct AssemblyConfig {
    /// The organisation producing the report. Its website is the target of
    /// the header logo link.
    pub producer: OrganizationIdentity,

    /// The organisation the report is about. Its name heads every page.
    pub subject: OrganizationIdentity,

    /// Logo shown at the right of the running header. Relative paths are
    /// resolved against [`Self::asset_dir`]. `None` renders the header
    /// without a logo.
    pub logo_path: Option<PathBuf>,

    /// Base directory for relative assets: the logo and any images the
    /// Markdown links to. Default: the working directory.
    pub asset_dir: PathBuf,

    /// Directory rendered PDFs are written to. Default: the working directory.
    pub output_dir: PathBuf,

    /// Paper size, orientation and margins applied at render time.
    pub layout: PageLayout,

    /// Stop the batch at the first failed document. Default: false.
    ///
    /// When false every document is attempted and failures are reported per
    /// item in the [`crate::output::BatchReport`].
    pub fail_fast: bool,

    /// Per-document render timeout in seconds. Default: 60.
    pub render_timeout_secs: u64,

    /// Browser executable for the Chromium renderer. `None` lets
    /// chromiumoxide search the usual install locations.
    pub chrome_executable: Option<PathBuf>,

    /// Optional callback for batch progress events.
    pub progress_callback: Option<ProgressCallback>,

    /// Source of generation timestamps. Default: the process-local clock.
    pub clock: Arc<dyn Clock>,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            producer: OrganizationIdentity::default(),
            subject: OrganizationIdentity::default(),
            logo_path: None,
            asset_dir: PathBuf::from("."),
            output_dir: PathBuf::from("."),
            layout: PageLayout::default(),
            fail_fast: false,
            render_timeout_secs: 60,
            chrome_executable: None,
            progress_callback: None,
            clock: Arc::new(SystemClock),
        }
    }
}

impl fmt::Debug for AssemblyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssemblyConfig")
            .field("producer", &self.producer)
            .field("subject", &self.subject)
            .field("logo_path", &self.logo_path)
            .field("asset_dir", &self.asset_dir)
            .field("output_dir", &self.output_dir)
            .field("layout", &self.layout)
            .field("fail_fast", &self.fail_fast)
            .field("render_timeout_secs", &self.render_timeout_secs)
            .field("chrome_executable", &self.chrome_executable)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn BatchProgressCallback>"),
            )
            .finish()
    }
}

impl AssemblyConfig {
    /// Create a new builder for `AssemblyConfig`.
    pub fn builder() -> AssemblyConfigBuilder {
        AssemblyConfigBuilder {
            config: Self::default(),
        }
    }

    /// The logo path with relative paths resolved against `asset_dir`.
    pub fn resolved_logo_path(&self) -> Option<PathBuf> {
        self.logo_path.as_ref().map(|p| resolve_against(&self.asset_dir, p))
    }
}

fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Builder for [`AssemblyConfig`].
#[derive(Debug)]
pub struct AssemblyConfigBuilder {
    config: AssemblyConfig,
}

impl AssemblyConfigBuilder {
    pub fn producer(mut self, org: OrganizationIdentity) -> Self {
        self.config.producer = org;
        self
    }

    pub fn subject(mut self, org: OrganizationIdentity) -> Self {
        self.config.subject = org;
        self
    }

    pub fn logo_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.logo_path = Some(path.into());
        self
    }

    pub fn asset_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.asset_dir = dir.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn layout(mut self, layout: PageLayout) -> Self {
        self.config.layout = layout;
        self
    }

    pub fn fail_fast(mut self, v: bool) -> Self {
        self.config.fail_fast = v;
        self
    }

    pub fn render_timeout_secs(mut self, secs: u64) -> Self {
        self.config.render_timeout_secs = secs.max(1);
        self
    }

    pub fn chrome_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.chrome_executable = Some(path.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.config.clock = clock;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AssemblyConfig, Md2PdfError> {
        let c = &self.config;
        if c.subject.name.trim().is_empty() {
            return Err(Md2PdfError::InvalidConfig(
                "subject organisation name must not be empty".into(),
            ));
        }
        for org in [&c.producer, &c.subject] {
            if let Some(ref site) = org.website {
                validate_website(site)?;
            }
        }
        c.layout.margins.validate()?;
        Ok(self.config)
    }
}

fn validate_website(site: &str) -> Result<(), Md2PdfError> {
    let parsed = url::Url::parse(site)
        .map_err(|e| Md2PdfError::InvalidConfig(format!("website '{site}' is not a URL: {e}")))?;
    match parsed.scheme() {
        "http" | "https" | "mailto" => Ok(()),
        other => Err(Md2PdfError::InvalidConfig(format!(
            "website '{site}' uses unsupported scheme '{other}'"
        ))),
    }
}

// ── Identities ───────────────────────────────────────────────────────────

/// A named organisation with an optional website.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationIdentity {
    pub name: String,
    pub website: Option<String>,
}

impl OrganizationIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            website: None,
        }
    }

    pub fn with_website(mut self, website: impl Into<String>) -> Self {
        let website = website.into();
        self.website = if website.trim().is_empty() {
            None
        } else {
            Some(website)
        };
        self
    }
}

// ── Page layout ──────────────────────────────────────────────────────────

/// Physical page layout handed to the renderer.
///
/// The renderer applies this explicitly, overriding whatever `@page` rule
/// the template carries.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PageLayout {
    pub paper: PaperSize,
    pub orientation: Orientation,
    pub margins: Margins,
}

/// Supported paper sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PaperSize {
    /// US Letter, 8.5 × 11 in. (default)
    #[default]
    Letter,
    /// US Legal, 8.5 × 14 in.
    Legal,
    /// ISO A4, 210 × 297 mm.
    A4,
}

impl PaperSize {
    /// Portrait `(width, height)` in inches.
    pub fn inches(self) -> (f64, f64) {
        match self {
            PaperSize::Letter => (8.5, 11.0),
            PaperSize::Legal => (8.5, 14.0),
            PaperSize::A4 => (210.0 / 25.4, 297.0 / 25.4),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

/// Page margins in centimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub top_cm: f64,
    pub right_cm: f64,
    pub bottom_cm: f64,
    pub left_cm: f64,
}

impl Default for Margins {
    /// 2.5cm top, 1cm sides, 2cm bottom: room for the running header.
    fn default() -> Self {
        Self {
            top_cm: 2.5,
            right_cm: 1.0,
            bottom_cm: 2.0,
            left_cm: 1.0,
        }
    }
}

impl Margins {
    /// Convert a length in centimetres to inches (the DevTools unit).
    pub fn cm_to_inches(cm: f64) -> f64 {
        cm / 2.54
    }

    fn validate(&self) -> Result<(), Md2PdfError> {
        for (side, v) in [
            ("top", self.top_cm),
            ("right", self.right_cm),
            ("bottom", self.bottom_cm),
            ("left", self.left_cm),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(Md2PdfError::InvalidConfig(format!(
                    "{side} margin must be a non-negative length, got {v}"
                )));
            }
        }
        Ok(())
    }
}

// ── Clock ────────────────────────────────────────────────────────────────

/// Source of generation timestamps.
///
/// Timestamps are wall-clock local time with no timezone attached; they are
/// only ever formatted into the page header and output file names.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// The process-local clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock frozen at one instant. Handy for reproducible output.
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}
