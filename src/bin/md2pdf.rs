//! CLI binary for edgequake-md2pdf.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `AssemblyConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_md2pdf::batch::{
    combine_sources, output_stem, COMBINED_DISPLAY_NAME, NAME_TIMESTAMP_FORMAT,
};
use edgequake_md2pdf::pipeline::normalize::decode_source;
use edgequake_md2pdf::{
    convert_sources, load_sources, Assembler, AssemblyConfig, BatchProgressCallback,
    BatchReport, DisabledRenderer, OrganizationIdentity, Orientation, PageLayout, PaperSize, ProgressCallback,
    SourceDocument,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar plus one log line per document.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Per-document wall-clock start times for elapsed reporting.
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_batch_start
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Starting browser…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn elapsed_secs(&self, index: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&index))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} documents  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Rendering");
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Rendering {total} document(s)…"))
        ));
    }

    fn on_document_start(&self, index: usize, _total: usize, name: &str) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(index, Instant::now());
        }
        self.bar.set_message(name.to_string());
    }

    fn on_document_complete(&self, index: usize, total: usize, name: &str, bytes: usize) {
        let secs = self.elapsed_secs(index);
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {:<32}  {}  {}",
            green("✓"),
            index,
            total,
            name,
            dim(&format!("{:>8} bytes", bytes)),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_document_error(&self, index: usize, total: usize, _name: &str, error: &str) {
        let secs = self.elapsed_secs(index);
        self.errors.fetch_add(1, Ordering::SeqCst);

        // Keep long browser errors on one line.
        let msg = if error.chars().count() > 100 {
            let cut: String = error.chars().take(99).collect();
            format!("{cut}\u{2026}")
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}",
            red("✗"),
            index,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total: usize, produced: usize) {
        let failed = total.saturating_sub(produced);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} document(s) rendered",
                green("✔"),
                bold(&produced.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} document(s) rendered  ({} failed or skipped)",
                if produced == 0 { red("✘") } else { cyan("⚠") },
                bold(&produced.to_string()),
                total,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # One PDF per file, written to the current directory
  md2pdf --subject-name "Globex Corporation" q1.md q2.md

  # One combined PDF
  md2pdf --subject-name "Globex Corporation" --combine q1.md q2.md -o reports/

  # Branded header with a linked logo
  md2pdf --subject-name "Globex Corporation" \
         --producer-name "Acme Research" --producer-website https://acme.example/ \
         --logo logo.png report.md

  # Inspect the filled HTML without launching a browser
  md2pdf --subject-name "Globex Corporation" --html-only report.md

  # Machine-readable report
  md2pdf --subject-name "Globex Corporation" --json *.md > report.json

OUTPUT NAMES:
  individual   <name before first dot>_<YYYYmmdd_HHMMSS>.pdf
  combined     combined_output_<YYYYmmdd_HHMMSS>.pdf (shown as combined_output.pdf)
  A _2, _3, … suffix is added when a name is already taken.

ENVIRONMENT VARIABLES:
  MD2PDF_SUBJECT_NAME     Organisation the report is about
  MD2PDF_PRODUCER_NAME    Organisation producing the report
  MD2PDF_LOGO             Header logo (png, jpeg, gif, webp, svg)
  MD2PDF_CHROME           Chrome / Chromium executable
  RUST_LOG                Override log filtering (e.g. edgequake_md2pdf=debug)

SETUP:
  A Chrome or Chromium browser must be installed. It is found automatically
  in the usual locations; otherwise pass --chrome /path/to/chrome.
"#;

/// Convert Markdown files to branded PDF reports.
#[derive(Parser, Debug)]
#[command(
    name = "md2pdf",
    version,
    about = "Convert Markdown files to branded, paginated PDF reports",
    long_about = "Convert Markdown documents into paginated PDF reports with a running \
header (subject organisation, generation date, logo) and page counter. Files are \
rendered one PDF each, or combined into a single PDF with --combine.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Markdown files, in output order.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Combine all inputs into one PDF.
    #[arg(long, env = "MD2PDF_COMBINE")]
    combine: bool,

    /// Directory to write PDFs into.
    #[arg(short, long, env = "MD2PDF_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Name of the organisation the report is about (shown on every page).
    #[arg(long, env = "MD2PDF_SUBJECT_NAME")]
    subject_name: String,

    /// Website of the subject organisation.
    #[arg(long, env = "MD2PDF_SUBJECT_WEBSITE")]
    subject_website: Option<String>,

    /// Name of the organisation producing the report.
    #[arg(long, env = "MD2PDF_PRODUCER_NAME", default_value = "")]
    producer_name: String,

    /// Website the header logo links to.
    #[arg(long, env = "MD2PDF_PRODUCER_WEBSITE")]
    producer_website: Option<String>,

    /// Header logo image; relative paths resolve against --asset-dir.
    #[arg(long, env = "MD2PDF_LOGO")]
    logo: Option<PathBuf>,

    /// Base directory for the logo and relative image links.
    #[arg(long, env = "MD2PDF_ASSET_DIR", default_value = ".")]
    asset_dir: PathBuf,

    /// Paper size.
    #[arg(long, env = "MD2PDF_PAPER", value_enum, default_value = "letter")]
    paper: PaperArg,

    /// Landscape orientation.
    #[arg(long, env = "MD2PDF_LANDSCAPE")]
    landscape: bool,

    /// Chrome / Chromium executable.
    #[arg(long, env = "MD2PDF_CHROME")]
    chrome: Option<PathBuf>,

    /// Per-document render timeout in seconds.
    #[arg(long, env = "MD2PDF_RENDER_TIMEOUT", default_value_t = 60)]
    render_timeout: u64,

    /// Stop at the first failed document.
    #[arg(long, env = "MD2PDF_FAIL_FAST")]
    fail_fast: bool,

    /// Write the filled HTML instead of rendering PDFs.
    #[arg(long, env = "MD2PDF_HTML_ONLY")]
    html_only: bool,

    /// Print the batch report as JSON on stdout.
    #[arg(long, env = "MD2PDF_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "MD2PDF_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "MD2PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "MD2PDF_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum PaperArg {
    Letter,
    Legal,
    A4,
}

impl From<PaperArg> for PaperSize {
    fn from(v: PaperArg) -> Self {
        match v {
            PaperArg::Letter => PaperSize::Letter,
            PaperArg::Legal => PaperSize::Legal,
            PaperArg::A4 => PaperSize::A4,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar carries the per-document feedback; library INFO logs
    // would only tear it.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.html_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn BatchProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    let sources = load_sources(&cli.inputs)
        .await
        .context("Failed to read input files")?;

    // ── HTML-only mode ───────────────────────────────────────────────────
    if cli.html_only {
        return write_html_previews(&sources, cli.combine, config, cli.quiet).await;
    }

    // ── Run conversion ───────────────────────────────────────────────────
    let report = convert_sources(&sources, cli.combine, &config)
        .await
        .context("Conversion failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&report, show_progress);
    }

    let not_produced = report.stats.failed + report.stats.skipped;
    if not_produced > 0 {
        anyhow::bail!(
            "{}/{} document(s) were not produced",
            not_produced,
            report.stats.planned
        );
    }
    Ok(())
}

/// Map CLI args to `AssemblyConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<AssemblyConfig> {
    let mut subject = OrganizationIdentity::new(cli.subject_name.clone());
    if let Some(ref site) = cli.subject_website {
        subject = subject.with_website(site.clone());
    }
    let mut producer = OrganizationIdentity::new(cli.producer_name.clone());
    if let Some(ref site) = cli.producer_website {
        producer = producer.with_website(site.clone());
    }

    let layout = PageLayout {
        paper: cli.paper.clone().into(),
        orientation: if cli.landscape {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        },
        ..PageLayout::default()
    };

    let mut builder = AssemblyConfig::builder()
        .subject(subject)
        .producer(producer)
        .asset_dir(cli.asset_dir.clone())
        .output_dir(cli.output_dir.clone())
        .layout(layout)
        .fail_fast(cli.fail_fast)
        .render_timeout_secs(cli.render_timeout);

    if let Some(ref logo) = cli.logo {
        builder = builder.logo_path(logo.clone());
    }
    if let Some(ref chrome) = cli.chrome {
        builder = builder.chrome_executable(chrome.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Print one line per produced document and one per failure.
fn print_summary(report: &BatchReport, progress_shown: bool) {
    for doc in report.documents() {
        println!("{}\t{}", doc.display_name, doc.path.display());
    }
    // The progress callback already printed errors inline.
    if !progress_shown {
        for err in report.errors() {
            eprintln!("{} {}", red("✗"), err);
        }
        eprintln!(
            "Rendered {}/{} document(s) in {}ms",
            report.stats.produced, report.stats.planned, report.stats.total_duration_ms
        );
    }
}

/// Fill the templates and write `.html` files instead of PDFs.
///
/// The running header is spliced in at the top of the body so the preview
/// shows it once; in the PDF it repeats on every page.
async fn write_html_previews(
    sources: &[SourceDocument],
    combine: bool,
    config: AssemblyConfig,
    quiet: bool,
) -> Result<()> {
    let output_dir = config.output_dir.clone();
    let now = config.clock.now();
    let stamp = now.format(NAME_TIMESTAMP_FORMAT);
    let assembler = Assembler::new(config, Arc::new(DisabledRenderer))
        .context("Failed to compile page templates")?;

    let jobs: Vec<(String, String, String)> = if combine {
        let text = combine_sources(sources)?;
        vec![(
            COMBINED_DISPLAY_NAME.to_string(),
            text,
            format!("combined_output_{stamp}.html"),
        )]
    } else {
        sources
            .iter()
            .map(|s| {
                let text = decode_source(&s.bytes)
                    .map_err(|detail| anyhow::anyhow!("'{}': {}", s.name, detail))?;
                Ok((s.name.clone(), text, format!("{}_{stamp}.html", output_stem(&s.name))))
            })
            .collect::<Result<Vec<_>>>()?
    };

    tokio::fs::create_dir_all(&output_dir)
        .await
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    for (label, text, file_name) in jobs {
        let filled = assembler.prepare(&label, &text, now)?;
        let preview = filled
            .html
            .replacen("<body>", &format!("<body>\n{}", filled.header_html), 1);
        let path = output_dir.join(file_name);
        tokio::fs::write(&path, preview)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        if !quiet {
            println!("{}\t{}", label, path.display());
        }
    }
    Ok(())
}
