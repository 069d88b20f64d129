//! CLI binary for splitpdf.
//!
//! A thin shim over the library crate that maps CLI flags to `SplitConfig`
//! and prints results.
//!
//! Exit codes: 0 when every page was written, 1 on a fatal error (nothing or
//! nothing further was written), 2 when at least one page failed.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use splitpdf::{
    inspect, split, split_with_provider, summarize, DocumentProvider, ExecutionMode, PixelFormat,
    ProgressCallback, SceneFileProvider, SplitConfig, SplitOutput, SplitProgressCallback,
};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
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

/// Live progress bar plus one log line per page. Pages may finish out of
/// order in parallel mode.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
}

impl CliProgressCallback {
    /// Spinner until `on_run_start` tells us the page count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening document…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Splitting");
        self.bar.reset_eta();
    }

    /// Drop the bar when the run ends without `on_run_complete`.
    fn clear(&self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }

    fn elapsed_secs(&self, page_num: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&page_num))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl SplitProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Splitting {total_pages} pages…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(page_num, Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, png_bytes: usize) {
        let elapsed = self.elapsed_secs(page_num);
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<10}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{:>7} KiB", png_bytes.div_ceil(1024))),
            dim(&format!("{elapsed:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        let elapsed = self.elapsed_secs(page_num);

        let msg: String = if error.chars().count() > 80 {
            error.chars().take(79).chain(std::iter::once('…')).collect()
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg),
            dim(&format!("{elapsed:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_run_complete(&self, total_pages: usize, success_count: usize) {
        let failed = total_pages.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} pages written",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} pages written  ({} failed)",
                if failed == total_pages {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_pages,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # One PNG per page at 72 DPI, pages rendered in parallel
  splitpdf document.pdf out/

  # One page at a time
  splitpdf document.pdf out/ single

  # 300 DPI, four workers, no alpha channel
  splitpdf --dpi 300 --workers 4 --format rgb document.pdf out/

  # Page sizes and target pixel sizes, nothing rendered
  splitpdf --inspect-only --dpi 150 document.pdf out/

  # Synthetic document described as JSON
  splitpdf --input-format scene scene.json out/

OUTPUT:
  <OUTPUT_DIR>/page_1.png … page_N.png, each ceil(points × scale) pixels
  per side (sides swapped for pages rotated 90°/270°), on a white background.

EXIT CODES:
  0  every page written
  1  fatal error (input missing, undecodable, output directory unusable)
  2  one or more pages failed; the others were written

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH    Path to an existing libpdfium (file or directory)
  RUST_LOG           Overrides the log filter (e.g. splitpdf=debug)
  SPLITPDF_*         Defaults for the matching flags
"#;

/// Split a document into one PNG per page.
#[derive(Parser, Debug)]
#[command(
    name = "splitpdf",
    version,
    about = "Split a PDF into one PNG image per page",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Input document.
    input: PathBuf,

    /// Directory receiving page_<n>.png (created if missing).
    output_dir: PathBuf,

    /// Execution mode.
    #[arg(value_enum, default_value = "parallel", env = "SPLITPDF_MODE")]
    mode: ModeArg,

    /// Document units → pixels multiplier (1.0 = 72 DPI).
    #[arg(long, env = "SPLITPDF_SCALE", conflicts_with = "dpi")]
    scale: Option<f64>,

    /// Output resolution; sets scale = dpi / 72.
    #[arg(long, env = "SPLITPDF_DPI",
          value_parser = clap::value_parser!(u32).range(1..=2400))]
    dpi: Option<u32>,

    /// Maximum pages rendered at once in parallel mode.
    #[arg(short, long, env = "SPLITPDF_WORKERS")]
    workers: Option<usize>,

    /// Output pixel format.
    #[arg(long, env = "SPLITPDF_FORMAT", value_enum, default_value = "rgba")]
    format: FormatArg,

    /// How to decode the input.
    #[arg(long, env = "SPLITPDF_INPUT_FORMAT", value_enum, default_value = "pdf")]
    input_format: InputFormatArg,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "SPLITPDF_PASSWORD")]
    password: Option<String>,

    /// Output structured JSON (SplitOutput) on stdout.
    #[arg(long, env = "SPLITPDF_JSON")]
    json: bool,

    /// Print page geometry only; nothing is rendered or written.
    #[arg(long)]
    inspect_only: bool,

    /// Disable progress bar.
    #[arg(long, env = "SPLITPDF_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "SPLITPDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "SPLITPDF_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Parallel,
    Single,
}

impl From<ModeArg> for ExecutionMode {
    fn from(v: ModeArg) -> Self {
        match v {
            ModeArg::Parallel => ExecutionMode::Parallel,
            ModeArg::Single => ExecutionMode::Sequential,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Rgb,
    Rgba,
}

impl From<FormatArg> for PixelFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Rgb => PixelFormat::Rgb8,
            FormatArg::Rgba => PixelFormat::Rgba8,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum InputFormatArg {
    Pdf,
    /// JSON-serialized in-memory scene.
    Scene,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // INFO-level library logs would tear the progress bar apart.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only;
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
    let cli_progress = show_progress.then(CliProgressCallback::new_dynamic);
    let clear_progress = || {
        if let Some(ref cb) = cli_progress {
            cb.clear();
        }
    };
    let progress_cb: Option<ProgressCallback> = cli_progress
        .clone()
        .map(|cb| cb as Arc<dyn SplitProgressCallback>);
    let config = build_config(&cli, progress_cb).inspect_err(|_| clear_progress())?;

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let summary = match cli.input_format {
            InputFormatArg::Pdf => inspect(&cli.input, &config)
                .await
                .context("Failed to inspect PDF")?,
            InputFormatArg::Scene => {
                let document = SceneFileProvider
                    .open(&cli.input)
                    .context("Failed to open scene")?;
                summarize(document.as_ref(), &config)
            }
        };

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?
            );
        } else {
            println!("File:   {}", cli.input.display());
            println!("Pages:  {}", summary.page_count);
            println!("Scale:  {}", summary.scale);
            for page in &summary.pages {
                let target = page
                    .target
                    .map(|t| format!("{} x {} px", t.width, t.height))
                    .unwrap_or_else(|| "invalid geometry".to_string());
                println!(
                    "  page {:>4}  {:>8.2} x {:<8.2} pt  {:>4}  →  {}",
                    page.page_num, page.bounds.width, page.bounds.height, page.rotation, target
                );
            }
        }
        return Ok(());
    }

    // ── Run split ────────────────────────────────────────────────────────
    let output = match cli.input_format {
        InputFormatArg::Pdf => split(&cli.input, &cli.output_dir, &config).await,
        InputFormatArg::Scene => {
            split_with_provider(&cli.input, &cli.output_dir, Arc::new(SceneFileProvider), &config)
                .await
        }
    }
    .inspect_err(|_| clear_progress())
    .context("Split failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    }

    if !cli.quiet {
        print_summary(&output, show_progress);
    }

    if !output.all_succeeded() {
        std::process::exit(2);
    }
    Ok(())
}

/// Map CLI args to `SplitConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<SplitConfig> {
    let mut builder = SplitConfig::builder()
        .mode(cli.mode.into())
        .pixel_format(cli.format.into());

    if let Some(dpi) = cli.dpi {
        builder = builder.dpi(dpi);
    } else if let Some(scale) = cli.scale {
        builder = builder.scale(scale);
    }
    if let Some(workers) = cli.workers {
        builder = builder.workers(workers);
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_summary(output: &SplitOutput, progress_shown: bool) {
    // The progress callback already printed the per-page lines and tick.
    if !progress_shown {
        eprintln!(
            "Wrote {}/{} pages to {} in {}ms",
            output.stats.succeeded_pages,
            output.stats.total_pages,
            output.output_dir.display(),
            output.stats.total_duration_ms
        );
        for error in output.failures() {
            eprintln!("  {} {}", red("✗"), error);
        }
    } else {
        eprintln!(
            "   {}  —  {}ms total  →  {}",
            dim(&format!("{} mode, {} worker(s)", output.stats.mode, output.stats.workers)),
            output.stats.total_duration_ms,
            bold(&output.output_dir.display().to_string()),
        );
    }
}
