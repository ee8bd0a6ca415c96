//! CLI binary for pagebox.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `AnalysisConfig` and prints one report per input.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pagebox::{
    analyze_many, AnalysisConfig, AnalysisProgressCallback, AnalysisReport, DocumentKind,
    PageBoxError, PdfBackend, ProgressCallback,
};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
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
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const SPINNER: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar plus one log line per input.
/// Inputs complete out of order, so start times are keyed by input.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<String, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} files  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(SPINNER);

        bar.set_style(style);
        bar.set_prefix("Analysing");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    /// Failures seen by `on_file_error`, or implied by the batch totals if higher.
    fn failed_count(&self, total_files: usize, success_count: usize) -> usize {
        self.errors
            .load(Ordering::SeqCst)
            .max(total_files.saturating_sub(success_count))
    }

    fn elapsed(&self, input: &str) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(input))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl AnalysisProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_files: usize) {
        self.bar.set_length(total_files as u64);
    }

    fn on_file_start(&self, input: &str) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(input.to_string(), Instant::now());
        }
        self.bar.set_message(input.to_string());
    }

    fn on_file_complete(&self, input: &str, report: &AnalysisReport) {
        let secs = self.elapsed(input);
        let mark = if report.raster_error.is_some() {
            yellow("⚠")
        } else {
            green("✓")
        };
        self.bar.println(format!(
            "  {} {}  {} x {} mm  {}",
            mark,
            input,
            report.dimensions.width_mm,
            report.dimensions.height_mm,
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_file_error(&self, input: &str, error: &str) {
        let secs = self.elapsed(input);
        self.errors.fetch_add(1, Ordering::SeqCst);

        let first_line = error.lines().next().unwrap_or(error);
        let msg = match first_line.char_indices().nth(80) {
            Some((cut, _)) => format!("{}\u{2026}", &first_line[..cut]),
            None => first_line.to_string(),
        };

        self.bar.println(format!(
            "  {} {}  {}  {}",
            red("✗"),
            input,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total_files: usize, success_count: usize) {
        self.bar.finish_and_clear();
        let failed = self.failed_count(total_files, success_count);
        if failed == 0 {
            eprintln!(
                "{} {} files analysed",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} files analysed  ({} failed)",
                if failed == total_files { red("✘") } else { yellow("⚠") },
                bold(&success_count.to_string()),
                total_files,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Dimensions of a PDF
  pagebox brochure.pdf

  # Add a 2 mm margin to an EPS, convert it to PDF, render a thumbnail
  pagebox logo.eps --out-dir out/

  # A wider margin, no Ghostscript
  pagebox --margin 5 --no-rasterize logo.eps

  # Dimensions only, as JSON
  pagebox --no-margin --json *.eps *.pdf > sizes.json

  # Read PDF boxes with qpdf instead of pdfium
  pagebox --backend qpdf brochure.pdf

  # Answer A4 for PDFs that carry no geometry at all
  pagebox --default-a4 scans/*.pdf

PDF SIZE SOURCES (first match wins):
  TrimBox    intended final trim size
  MediaBox   full physical medium
  PageSize   width/height reported by pdfium (--no-page-size to skip)
  Default    ISO A4, only with --default-a4

OUTPUT FILES (EPS with a margin):
  <out>/modified/<millis>_<name>_modified.eps
  <out>/pdfs/<millis>_<name>.pdf
  <out>/thumbnails/<millis>_<name>.png

ENVIRONMENT VARIABLES:
  Every flag has a PAGEBOX_* equivalent, e.g. PAGEBOX_MARGIN=3.
  RUST_LOG overrides the log filter.
"#;

/// Read page dimensions from EPS and PDF files and add print margins to EPS.
#[derive(Parser, Debug)]
#[command(
    name = "pagebox",
    version,
    about = "Read page dimensions from EPS and PDF files and add print margins to EPS",
    long_about = "Report the physical size of EPS and PDF documents (local files or URLs) in \
millimetres. For EPS, optionally write a copy whose %%BoundingBox carries a margin on every \
side, convert it to PDF with Ghostscript and render a PNG thumbnail.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local EPS/PDF file paths or HTTP/HTTPS URLs.
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Treat every input as this kind instead of detecting it.
    #[arg(long, env = "PAGEBOX_KIND", value_enum)]
    kind: Option<KindArg>,

    /// Margin added to each side of an EPS bounding box, in mm (0–50).
    #[arg(long, env = "PAGEBOX_MARGIN", default_value_t = 2.0)]
    margin: f64,

    /// Report dimensions only; do not write margined EPS files.
    #[arg(long, env = "PAGEBOX_NO_MARGIN")]
    no_margin: bool,

    /// Library used to read PDF page boxes.
    #[arg(long, env = "PAGEBOX_BACKEND", value_enum, default_value = "pdfium")]
    backend: BackendArg,

    /// Answer ISO A4 for PDFs with no box and no page size.
    #[arg(long, env = "PAGEBOX_DEFAULT_A4")]
    default_a4: bool,

    /// Skip the page-size fallback for PDFs.
    #[arg(long, env = "PAGEBOX_NO_PAGE_SIZE")]
    no_page_size: bool,

    /// Report the page-size and A4 fallbacks as MediaBox.
    #[arg(long, env = "PAGEBOX_COLLAPSE_LABELS")]
    collapse_labels: bool,

    /// Root for modified/, pdfs/ and thumbnails/.
    #[arg(short, long, env = "PAGEBOX_OUT_DIR", default_value = ".")]
    out_dir: PathBuf,

    /// Do not convert margined EPS files to PDF.
    #[arg(long, env = "PAGEBOX_NO_RASTERIZE")]
    no_rasterize: bool,

    /// Do not render PNG thumbnails.
    #[arg(long, env = "PAGEBOX_NO_THUMBNAIL")]
    no_thumbnail: bool,

    /// Embed thumbnails in JSON output as base64.
    #[arg(long, env = "PAGEBOX_INLINE_THUMBNAIL")]
    inline_thumbnail: bool,

    /// Longest thumbnail edge in pixels.
    #[arg(long, env = "PAGEBOX_THUMBNAIL_SIZE", default_value_t = 512)]
    thumbnail_size: u32,

    /// Ghostscript executable.
    #[arg(long, env = "PAGEBOX_GS", default_value = "gs")]
    gs: String,

    /// qpdf executable.
    #[arg(long, env = "PAGEBOX_QPDF", default_value = "qpdf")]
    qpdf: String,

    /// Path to an existing libpdfium.
    #[arg(long, env = "PAGEBOX_PDFIUM_LIB")]
    pdfium_lib: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PAGEBOX_PASSWORD")]
    password: Option<String>,

    /// Timeout for each gs/qpdf run, in seconds.
    #[arg(long, env = "PAGEBOX_TOOL_TIMEOUT", default_value_t = 60)]
    tool_timeout: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PAGEBOX_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Number of files analysed at once.
    #[arg(short, long, env = "PAGEBOX_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Output a JSON array of results instead of text.
    #[arg(long, env = "PAGEBOX_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PAGEBOX_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PAGEBOX_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PAGEBOX_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum KindArg {
    Eps,
    Pdf,
}

impl From<KindArg> for DocumentKind {
    fn from(v: KindArg) -> Self {
        match v {
            KindArg::Eps => DocumentKind::Eps,
            KindArg::Pdf => DocumentKind::Pdf,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum BackendArg {
    Pdfium,
    Qpdf,
}

impl From<BackendArg> for PdfBackend {
    fn from(v: BackendArg) -> Self {
        match v {
            BackendArg::Pdfium => PdfBackend::Pdfium,
            BackendArg::Qpdf => PdfBackend::Qpdf,
        }
    }
}

/// One entry of `--json` output.
#[derive(serde::Serialize)]
struct JsonResult<'a> {
    input: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<&'a AnalysisReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    invalid_file: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && cli.inputs.len() > 1;
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
        Some(CliProgressCallback::new() as Arc<dyn AnalysisProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Run analysis ─────────────────────────────────────────────────────
    let results = analyze_many(&cli.inputs[..], &config).await;
    let failed = results.iter().filter(|(_, r)| r.is_err()).count();

    if cli.json {
        let entries: Vec<JsonResult<'_>> = results
            .iter()
            .map(|(input, result)| match result {
                Ok(report) => JsonResult {
                    input,
                    report: Some(report),
                    message: Some(report.status_message()),
                    error: None,
                    invalid_file: false,
                },
                Err(e) => JsonResult {
                    input,
                    report: None,
                    message: None,
                    error: Some(e.to_string()),
                    invalid_file: e.is_invalid_file(),
                },
            })
            .collect();
        let json = serde_json::to_string_pretty(&entries).context("Failed to serialise output")?;
        println!("{json}");
    } else {
        // The progress bar is cleared by now; the per-input record always goes out.
        print_results(&mut io::stdout().lock(), &results, cli.quiet)
            .context("Failed to write results")?;
    }

    Ok(if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Map CLI args to `AnalysisConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<AnalysisConfig> {
    let margin = if cli.no_margin { 0.0 } else { cli.margin };

    let mut builder = AnalysisConfig::builder()
        .margin_mm(margin)
        .pdf_backend(cli.backend.into())
        .default_a4(cli.default_a4)
        .use_page_size(!cli.no_page_size)
        .distinct_labels(!cli.collapse_labels)
        .output_root(&cli.out_dir)
        .rasterize(!cli.no_rasterize)
        .thumbnail(!cli.no_thumbnail)
        .inline_thumbnail(cli.inline_thumbnail)
        .thumbnail_max_pixels(cli.thumbnail_size)
        .ghostscript(&cli.gs)
        .qpdf(&cli.qpdf)
        .tool_timeout_secs(cli.tool_timeout)
        .download_timeout_secs(cli.download_timeout)
        .concurrency(cli.concurrency);

    if let Some(kind) = cli.kind {
        builder = builder.kind(kind.into());
    }
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_library(lib);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// One line per input on `out`; artifact details and errors go to stderr.
fn print_results<W: Write>(
    out: &mut W,
    results: &[(String, Result<AnalysisReport, PageBoxError>)],
    quiet: bool,
) -> io::Result<()> {
    for (input, result) in results {
        match result {
            Ok(report) => print_report(out, input, report, quiet)?,
            Err(e) => print_error(input, e),
        }
    }
    Ok(())
}

fn print_report<W: Write>(
    out: &mut W,
    input: &str,
    report: &AnalysisReport,
    quiet: bool,
) -> io::Result<()> {
    writeln!(
        out,
        "{}  {}  {} x {} mm  ({})",
        input, report.kind, report.dimensions.width_mm, report.dimensions.height_mm, report.source
    )?;
    if quiet {
        return Ok(());
    }
    eprintln!("   {}", dim(report.status_message()));
    if let Some(ref p) = report.modified_path {
        eprintln!("   modified   {}", p.display());
    }
    if let Some(ref p) = report.pdf_path {
        eprintln!("   pdf        {}", p.display());
    }
    if let Some(ref p) = report.thumbnail_path {
        eprintln!("   thumbnail  {}", p.display());
    }
    if let Some(ref e) = report.raster_error {
        eprintln!("   {} {}", yellow("⚠"), e);
    }
    Ok(())
}

fn print_error(input: &str, e: &PageBoxError) {
    let label = if e.is_invalid_file() {
        "invalid file"
    } else {
        "error"
    };
    eprintln!("{} {}  {}: {}", red("✗"), input, label, e);
}
