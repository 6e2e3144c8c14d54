//! CLI binary for blueprint-report.
//!
//! A thin shim over the library crate: loads the detector and pdfium once,
//! processes one drawing, writes the preview and report, and optionally
//! mails the report through an HTTP mail relay.

use anyhow::{Context, Result};
use blueprint_report::{
    bind_pdfium, dispatch, load_backend, BackendKind, DetectorConfig, DirectorySink,
    DispatchError, MailRelaySink, Pipeline, PipelineConfig, PipelineProgressCallback, PreviewStore,
    ProgressCallback, ReportSink,
};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
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
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: one bar over the document's pages plus a line per page.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Decoding drawing…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }
}

impl PipelineProgressCallback for CliProgressCallback {
    fn on_document_start(&self, total_pages: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} pages  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ");

        self.bar.set_length(total_pages as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Detecting");
    }

    fn on_page_start(&self, page_num: usize, _total_pages: usize) {
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total_pages: usize, detections: usize) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            green("✓"),
            page_num,
            total_pages,
            dim(&format!("{detections} object(s)")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let msg: String = if error.chars().count() > 80 {
            error.chars().take(79).chain(['…']).collect()
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            red("✗"),
            page_num,
            total_pages,
            red(&msg),
        ));
        self.bar.abandon();
    }

    fn on_document_complete(&self, _total_pages: usize, _total_detections: usize) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Detect on a scanned plan, write report.pdf and preview.png to ./out
  blueprint-report plan.png --output-dir out

  # Multi-page PDF with a note on the summary page
  blueprint-report drawings.pdf --comment "Level 2, rev C"

  # Mail the report through a relay
  blueprint-report plan.jpg --recipient arch@example.com \
      --relay-url http://localhost:8025/send

  # ONNX Runtime backend (build with --features ort-backend)
  blueprint-report plan.png --backend ort --model models/best.onnx

ENVIRONMENT VARIABLES:
  BLUEPRINT_MODEL         Path to the detector weights
  BLUEPRINT_BACKEND       Detector runtime: rten, ort
  BLUEPRINT_DPI           Rendering DPI for PDF pages
  BLUEPRINT_OUTPUT_DIR    Where report.pdf and preview.png are written
  BLUEPRINT_RELAY_URL     HTTP mail relay endpoint
  BLUEPRINT_SENDER        From address for mailed reports
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory); needed for PDFs
  RUST_LOG                Override the log filter
"#;

/// Detect doors and windows on architectural drawings and build a PDF report.
#[derive(Parser, Debug)]
#[command(
    name = "blueprint-report",
    version,
    about = "Detect doors and windows on architectural drawings and build a PDF report",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Drawing to process: an image (PNG, JPEG, …) or a PDF.
    input: PathBuf,

    /// Free-text note printed on the report's summary page.
    #[arg(long)]
    comment: Option<String>,

    /// Mail the report to this address (needs --relay-url).
    #[arg(long)]
    recipient: Option<String>,

    /// Detector weights (.rten for rten, .onnx for ort).
    #[arg(long, env = "BLUEPRINT_MODEL", default_value = "models/best.rten")]
    model: PathBuf,

    /// Detector runtime.
    #[arg(long, env = "BLUEPRINT_BACKEND", value_enum, default_value = "rten")]
    backend: BackendArg,

    /// Rendering DPI for PDF pages (72–400).
    #[arg(long, env = "BLUEPRINT_DPI", default_value_t = 150,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// Directory for report.pdf and preview.png.
    #[arg(short, long, env = "BLUEPRINT_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// HTTP mail relay that accepts a JSON message.
    #[arg(long, env = "BLUEPRINT_RELAY_URL")]
    relay_url: Option<String>,

    /// From address for mailed reports.
    #[arg(long, env = "BLUEPRINT_SENDER", default_value = "blueprint-report@localhost")]
    sender: String,

    /// Path to libpdfium (file or directory). Defaults to PDFIUM_LIB_PATH, then the system library.
    #[arg(long)]
    pdfium_lib: Option<PathBuf>,

    /// Print the processing output as JSON.
    #[arg(long)]
    json: bool,

    /// Disable the progress bar.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum BackendArg {
    Rten,
    Ort,
}

impl From<BackendArg> for BackendKind {
    fn from(v: BackendArg) -> Self {
        match v {
            BackendArg::Rten => BackendKind::Rten,
            BackendArg::Ort => BackendKind::Ort,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
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

    // ── Load process-wide resources ──────────────────────────────────────
    let detector = DetectorConfig::new(cli.backend.into(), &cli.model);
    let backend = load_backend(&detector).context("Cannot start without a detector")?;

    let is_pdf = cli
        .input
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));

    let progress: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn PipelineProgressCallback>)
    } else {
        None
    };

    let mut builder = PipelineConfig::builder().dpi(cli.dpi);
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }
    let config = builder.build().context("Invalid configuration")?;

    let mut pipeline = Pipeline::new(backend, config);
    match bind_pdfium(cli.pdfium_lib.as_deref()) {
        Ok(pdfium) => pipeline = pipeline.with_pdf_engine(pdfium),
        Err(e) if is_pdf => return Err(e).context("PDF input needs pdfium"),
        Err(e) => debug!("pdfium not bound, image input only: {}", e),
    }

    // ── Process ──────────────────────────────────────────────────────────
    let bytes = tokio::fs::read(&cli.input)
        .await
        .with_context(|| format!("Failed to read {}", cli.input.display()))?;
    let filename = cli
        .input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let output = pipeline
        .process(bytes, &filename, cli.comment.as_deref())
        .await
        .context("Processing failed")?;

    // ── Dispatch ─────────────────────────────────────────────────────────
    let dir_sink = DirectorySink::new(&cli.output_dir);
    let mut setup_errors = Vec::new();
    let mail_sink = mail_sink(&cli).unwrap_or_else(|e| {
        setup_errors.push(e);
        None
    });
    if cli.recipient.is_some() && cli.relay_url.is_none() && !cli.quiet {
        eprintln!(
            "{} --recipient given without --relay-url; report not mailed",
            yellow("⚠")
        );
    }

    let mut sinks: Vec<&dyn ReportSink> = vec![&dir_sink];
    if let Some(ref mail) = mail_sink {
        sinks.push(mail);
    }
    let store: &dyn PreviewStore = &dir_sink;
    let mut dispatched = dispatch(&output, Some(store), &sinks).await;
    dispatched.errors.extend(setup_errors);

    // ── Report ───────────────────────────────────────────────────────────
    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if !cli.quiet {
        println!("Total Doors: {}", output.counts.door);
        println!("Total Windows: {}", output.counts.window);
    }

    if !cli.quiet {
        for err in &dispatched.errors {
            eprintln!("{} {}", yellow("⚠"), err);
        }
        for dest in &dispatched.delivered {
            eprintln!("{} report → {}", green("✔"), bold(dest));
        }
        if dispatched.preview_stored {
            eprintln!(
                "{} preview → {}",
                green("✔"),
                bold(&dir_sink.preview_path().display().to_string())
            );
        }
        eprintln!(
            "   {} page(s), {} detection(s), {}ms total",
            output.stats.total_pages,
            output.stats.total_detections,
            output.stats.total_duration_ms
        );
    }

    Ok(())
}

/// The mail sink named by `--recipient` and `--relay-url`, if both are set.
fn mail_sink(cli: &Cli) -> Result<Option<MailRelaySink>, DispatchError> {
    match (&cli.recipient, &cli.relay_url) {
        (Some(to), Some(url)) => MailRelaySink::new(url, &cli.sender, to).map(Some),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(["blueprint-report", "plan.png"].into_iter().chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn mail_sink_needs_recipient_and_relay() {
        assert!(mail_sink(&parse(&[])).unwrap().is_none());
        assert!(mail_sink(&parse(&["--recipient", "a@example.com"]))
            .unwrap()
            .is_none());
        let cli = parse(&[
            "--recipient",
            "a@example.com",
            "--relay-url",
            "http://127.0.0.1:8025/send",
        ]);
        assert!(mail_sink(&cli).unwrap().is_some());
    }

    #[test]
    fn bad_relay_url_is_a_dispatch_error() {
        let cli = parse(&["--recipient", "a@example.com", "--relay-url", "/send"]);
        assert!(matches!(mail_sink(&cli), Err(DispatchError::Http { .. })));
    }
}
