//! PDF rendering: hand the filled HTML to a paginating engine.
//!
//! [`PdfRenderer`] is the seam between the assembler and the engine. The
//! production implementation, [`ChromiumRenderer`], drives a headless
//! Chromium through the DevTools protocol (`Page.printToPDF`), which gives us
//! paper size, margins and a running header/footer without a layout engine
//! of our own.
//!
//! ## Why a working file?
//!
//! The body is loaded from a transient `.html` file inside the asset
//! directory instead of `about:blank`, so relative image links in the
//! Markdown resolve the same way they would next to the source. The file is
//! removed when the render returns, even on error.

use crate::config::{AssemblyConfig, Margins, Orientation, PageLayout};
use crate::error::{Md2PdfError, RenderError};
use crate::pipeline::template::FilledDocument;
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

const TAB_CLOSE_GRACE: Duration = Duration::from_secs(5);

/// Turns a filled document into PDF bytes.
///
/// `layout` is authoritative: implementations must apply it over any
/// `@page` rule embedded in the document.
#[async_trait]
pub trait PdfRenderer: Send + Sync {
    async fn render(
        &self,
        document: &FilledDocument,
        layout: &PageLayout,
    ) -> Result<Vec<u8>, RenderError>;
}

/// Map a [`PageLayout`] to DevTools print parameters.
///
/// `prefer_css_page_size` is forced off so the explicit paper size and
/// margins win over the template's `@page` rule.
pub fn print_params(document: &FilledDocument, layout: &PageLayout) -> PrintToPdfParams {
    let (width, height) = layout.paper.inches();
    let m = layout.margins;
    PrintToPdfParams {
        landscape: Some(layout.orientation == Orientation::Landscape),
        display_header_footer: Some(true),
        print_background: Some(true),
        paper_width: Some(width),
        paper_height: Some(height),
        margin_top: Some(Margins::cm_to_inches(m.top_cm)),
        margin_bottom: Some(Margins::cm_to_inches(m.bottom_cm)),
        margin_left: Some(Margins::cm_to_inches(m.left_cm)),
        margin_right: Some(Margins::cm_to_inches(m.right_cm)),
        header_template: Some(document.header_html.clone()),
        footer_template: Some(document.footer_html.clone()),
        prefer_css_page_size: Some(false),
        ..Default::default()
    }
}

/// Headless-Chromium renderer.
///
/// One browser process serves a whole batch; every document gets a fresh
/// tab that is closed after printing, also when the render times out.
pub struct ChromiumRenderer {
    browser: Browser,
    handler: JoinHandle<()>,
    work_dir: PathBuf,
    timeout: Duration,
}

impl ChromiumRenderer {
    /// Launch a headless browser configured from `config`.
    pub async fn launch(config: &AssemblyConfig) -> Result<Self, Md2PdfError> {
        info!("Launching headless browser");

        let mut builder = BrowserConfig::builder()
            .new_headless_mode()
            .no_sandbox()
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--allow-file-access-from-files");
        if let Some(ref exe) = config.chrome_executable {
            debug!("Using browser executable {}", exe.display());
            builder = builder.chrome_executable(exe);
        }
        let browser_config = builder.build().map_err(Md2PdfError::RendererUnavailable)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| Md2PdfError::RendererUnavailable(e.to_string()))?;

        // The CDP event loop must be polled for any command to complete.
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            browser,
            handler,
            work_dir: config.asset_dir.clone(),
            timeout: Duration::from_secs(config.render_timeout_secs),
        })
    }

    /// Close the browser and stop its event loop.
    pub async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("Browser did not close cleanly: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            warn!("Browser process wait failed: {}", e);
        }
        self.handler.abort();
    }

    async fn print(&self, document: &FilledDocument, layout: &PageLayout) -> Result<Vec<u8>, RenderError> {
        let deadline = Instant::now() + self.timeout;
        let secs = self.timeout.as_secs();

        let working = write_working_file(&self.work_dir, &document.html)?;
        let url = file_url(working.path())?;
        debug!("Rendering {}", url);

        let page = match tokio::time::timeout_at(deadline, self.browser.new_page(url.as_str())).await {
            Ok(page) => page?,
            Err(_) => return Err(RenderError::Timeout { secs }),
        };

        let tab = page.clone();
        let print = async {
            page.wait_for_navigation().await?;
            Ok::<_, RenderError>(page.pdf(print_params(document, layout)).await?)
        };
        // `working` is dropped on return, deleting the file.
        run_then_cleanup(deadline, secs, print, close_tab(tab)).await
    }
}

/// Close a render tab, giving up after a short grace period.
async fn close_tab(page: Page) {
    match tokio::time::timeout(TAB_CLOSE_GRACE, page.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Failed to close render tab: {}", e),
        Err(_) => warn!("Render tab did not close within {:?}", TAB_CLOSE_GRACE),
    }
}

/// Run `work` until `deadline`, then `cleanup` whether it finished, failed or
/// timed out.
async fn run_then_cleanup<T>(
    deadline: Instant,
    secs: u64,
    work: impl Future<Output = Result<T, RenderError>>,
    cleanup: impl Future<Output = ()>,
) -> Result<T, RenderError> {
    let result = match tokio::time::timeout_at(deadline, work).await {
        Ok(result) => result,
        Err(_) => Err(RenderError::Timeout { secs }),
    };
    cleanup.await;
    result
}

#[async_trait]
impl PdfRenderer for ChromiumRenderer {
    async fn render(
        &self,
        document: &FilledDocument,
        layout: &PageLayout,
    ) -> Result<Vec<u8>, RenderError> {
        self.print(document, layout).await
    }
}

/// Refuses every render. For assemblers that only ever call
/// [`Assembler::prepare`](crate::Assembler::prepare), such as HTML previews.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledRenderer;

#[async_trait]
impl PdfRenderer for DisabledRenderer {
    async fn render(&self, _: &FilledDocument, _: &PageLayout) -> Result<Vec<u8>, RenderError> {
        Err(RenderError::Browser("rendering is disabled".into()))
    }
}

/// Write the body HTML to a hidden temp file inside `dir`.
fn write_working_file(dir: &Path, html: &str) -> Result<tempfile::NamedTempFile, RenderError> {
    let to_err = |source| RenderError::WorkingFile {
        dir: dir.to_path_buf(),
        source,
    };
    let mut file = tempfile::Builder::new()
        .prefix(".md2pdf-")
        .suffix(".html")
        .tempfile_in(dir)
        .map_err(to_err)?;
    file.write_all(html.as_bytes()).map_err(to_err)?;
    file.flush().map_err(to_err)?;
    Ok(file)
}

fn file_url(path: &Path) -> Result<url::Url, RenderError> {
    let absolute = std::path::absolute(path).map_err(|e| RenderError::WorkingFile {
        dir: path.to_path_buf(),
        source: e,
    })?;
    url::Url::from_file_path(&absolute)
        .map_err(|_| RenderError::Browser(format!("cannot express {} as a file URL", absolute.display())))
}
