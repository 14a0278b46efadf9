//! Template fill: wrap converted HTML in the branded page template.
//!
//! Three templates are compiled once per [`PageTemplates`]:
//!
//! | Template      | Becomes                                      |
//! |---------------|----------------------------------------------|
//! | `page.html`   | the body document (styles + content)         |
//! | `header.html` | the running header repeated on every page    |
//! | `footer.html` | the running footer (page counter)            |
//!
//! Every scalar value (organisation names, website, date) is HTML-escaped
//! by Tera's autoescaping. Only two values bypass it: the converted
//! Markdown and the logo `data:` URI, both produced by this crate.

use crate::config::OrganizationIdentity;
use crate::error::{Md2PdfError, RenderError};
use base64::Engine;
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};
use tera::{Context, Tera};
use tracing::debug;

const PAGE_TEMPLATE: &str = include_str!("../../templates/page.html");
const HEADER_TEMPLATE: &str = include_str!("../../templates/header.html");
const FOOTER_TEMPLATE: &str = include_str!("../../templates/footer.html");

/// Day-month-year, the format shown in the page header.
pub const GENERATION_DATE_FORMAT: &str = "%d-%m-%Y";

/// The filled template, ready for the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilledDocument {
    /// Complete HTML document for the page body.
    pub html: String,
    /// Running header markup.
    pub header_html: String,
    /// Running footer markup.
    pub footer_html: String,
}

/// Values substituted into the templates.
#[derive(Debug, Clone, Copy)]
pub struct TemplateValues<'a> {
    pub content_html: &'a str,
    pub subject: &'a OrganizationIdentity,
    pub producer: &'a OrganizationIdentity,
    pub generated_at: NaiveDateTime,
    pub logo: Option<&'a LogoAsset>,
}

/// Compiled page, header and footer templates.
pub struct PageTemplates {
    tera: Tera,
}

impl PageTemplates {
    /// Compile the built-in templates.
    pub fn new() -> Result<Self, Md2PdfError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            ("page.html", PAGE_TEMPLATE),
            ("header.html", HEADER_TEMPLATE),
            ("footer.html", FOOTER_TEMPLATE),
        ])
        .map_err(|e| Md2PdfError::Template(describe(&e)))?;
        Ok(Self { tera })
    }

    /// Fill all three templates.
    ///
    /// # Errors
    /// Returns the template engine's message when a placeholder cannot be
    /// resolved.
    pub fn fill(&self, values: &TemplateValues<'_>) -> Result<FilledDocument, String> {
        let context = build_context(values);
        let render = |name: &str| {
            self.tera
                .render(name, &context)
                .map_err(|e| describe(&e))
        };

        let doc = FilledDocument {
            html: render("page.html")?,
            header_html: render("header.html")?,
            footer_html: render("footer.html")?,
        };
        debug!(
            "Filled template: body {} bytes, header {} bytes",
            doc.html.len(),
            doc.header_html.len()
        );
        Ok(doc)
    }
}

fn build_context(values: &TemplateValues<'_>) -> Context {
    let mut context = Context::new();
    context.insert("content", values.content_html);
    context.insert("subject_name", &values.subject.name);
    context.insert("producer_name", &values.producer.name);
    context.insert("producer_website", &values.producer.website);
    context.insert(
        "generation_date",
        &values.generated_at.format(GENERATION_DATE_FORMAT).to_string(),
    );
    context.insert("logo_data_uri", &values.logo.map(|l| l.data_uri.as_str()));
    context
}

/// Flatten a Tera error and its causes into one line.
fn describe(err: &tera::Error) -> String {
    let mut msg = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}

// ── Logo ─────────────────────────────────────────────────────────────────

/// The header logo, read from disk and encoded for inline embedding.
///
/// Header templates are rendered in an isolated context that cannot fetch
/// files, so the image travels as a `data:` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoAsset {
    pub path: PathBuf,
    pub mime: &'static str,
    pub data_uri: String,
}

impl LogoAsset {
    /// Read and encode the logo at `path`.
    pub fn load(path: &Path) -> Result<Self, RenderError> {
        let bytes = std::fs::read(path).map_err(|_| RenderError::MissingAsset {
            path: path.to_path_buf(),
        })?;
        let mime = sniff_mime(path, &bytes).ok_or_else(|| RenderError::UnsupportedAsset {
            path: path.to_path_buf(),
        })?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
        Ok(Self {
            path: path.to_path_buf(),
            mime,
            data_uri: format!("data:{mime};base64,{encoded}"),
        })
    }
}

fn sniff_mime(path: &Path, bytes: &[u8]) -> Option<&'static str> {
    use image::ImageFormat;

    match image::guess_format(bytes) {
        Ok(ImageFormat::Png) => Some("image/png"),
        Ok(ImageFormat::Jpeg) => Some("image/jpeg"),
        Ok(ImageFormat::Gif) => Some("image/gif"),
        Ok(ImageFormat::WebP) => Some("image/webp"),
        // SVG is text; there are no magic bytes to sniff.
        _ => path
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| e.eq_ignore_ascii_case("svg"))
            .map(|_| "image/svg+xml"),
    }
}
