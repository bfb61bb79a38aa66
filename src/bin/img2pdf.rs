//! CLI binary for edgequake-img2pdf.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and reports results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_img2pdf::{
    convert_to_file, plan_layout, ConversionConfig, ConversionProgressCallback, ProgressCallback,
    DEFAULT_MARGIN, DEFAULT_OUTPUT_NAME, DEFAULT_PAGE_WIDTH, DEFAULT_SPACING,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner while images load, then a 0–100 %
/// bar while they are placed on the page.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(100);

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading images…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }

    /// Switch to the percentage bar once every image has been measured.
    fn activate_bar(&self) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}%  {msg}  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(100);
        self.bar.set_position(0);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Combining");
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_images: usize) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Combining {total_images} images…"))
        ));
    }

    fn on_images_loaded(&self, _total_images: usize) {
        self.activate_bar();
    }

    fn on_image_placed(&self, image_num: usize, total_images: usize, percent: u8) {
        self.bar
            .set_message(format!("image {image_num}/{total_images}"));
        self.bar.set_position(u64::from(percent));
    }

    fn on_conversion_complete(&self, total_images: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} images combined",
            green("✔"),
            bold(&total_images.to_string())
        );
    }

    fn on_conversion_failed(&self, error: &str) {
        self.bar.finish_and_clear();
        // Keep the line short; the full error is printed by main.
        let first_line = error.lines().next().unwrap_or(error);
        eprintln!("{} {}", red("✘"), red(first_line));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Combine images into combined-images.pdf
  img2pdf front.jpg back.jpg

  # Choose the output file
  img2pdf scans/*.png -o scans.pdf

  # US Letter width, tighter margins, no gap between images
  img2pdf --page-width 612 --margin 10 --spacing 0 *.png -o strip.pdf

  # Mix local files, URLs and data URIs
  img2pdf logo.png https://example.com/chart.png "data:image/png;base64,iVBOR..."

  # Preview the page geometry without writing a PDF
  img2pdf --layout-only --json a.png b.png

LAYOUT:
  Every image is scaled to (page width - 2 x margin), keeping its aspect
  ratio, and stacked top to bottom with --spacing points between images.
  The result is a single page whose height grows to fit all images.
  All lengths are PDF points (1/72 inch). A4 width is 595.28 pt.

ENVIRONMENT VARIABLES:
  IMG2PDF_OUTPUT            Default output path
  IMG2PDF_PAGE_WIDTH        Page width in points
  IMG2PDF_MARGIN            Margin in points
  IMG2PDF_SPACING           Gap between images in points
  RUST_LOG                  Override log filter (e.g. edgequake_img2pdf=debug)
"#;

/// Combine images into a single tall PDF page.
#[derive(Parser, Debug)]
#[command(
    name = "img2pdf",
    version,
    about = "Combine images into a single tall PDF page",
    long_about = "Combine images (local files, URLs or data URIs) into one PDF page. Each image \
is scaled to the usable page width and stacked vertically; the page grows to fit them all.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Image file paths, HTTP/HTTPS URLs or base64 data URIs, in page order.
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Write the PDF to this file.
    #[arg(short, long, env = "IMG2PDF_OUTPUT", default_value = DEFAULT_OUTPUT_NAME)]
    output: PathBuf,

    /// Page width in points.
    #[arg(long, env = "IMG2PDF_PAGE_WIDTH", default_value_t = DEFAULT_PAGE_WIDTH)]
    page_width: f64,

    /// Margin on every side, in points.
    #[arg(long, env = "IMG2PDF_MARGIN", default_value_t = DEFAULT_MARGIN)]
    margin: f64,

    /// Vertical gap between images, in points.
    #[arg(long, env = "IMG2PDF_SPACING", default_value_t = DEFAULT_SPACING)]
    spacing: f64,

    /// Title stored in the PDF metadata.
    #[arg(long, env = "IMG2PDF_TITLE")]
    title: Option<String>,

    /// Maximum images measured concurrently.
    #[arg(short, long, env = "IMG2PDF_CONCURRENCY", default_value_t = 8)]
    concurrency: usize,

    /// Per-image decode timeout in seconds.
    #[arg(long, env = "IMG2PDF_DECODE_TIMEOUT", default_value_t = 30)]
    decode_timeout: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "IMG2PDF_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Print the planned placements only; do not write a PDF.
    #[arg(long)]
    layout_only: bool,

    /// Print results as JSON.
    #[arg(long, env = "IMG2PDF_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "IMG2PDF_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "IMG2PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "IMG2PDF_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.layout_only;
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

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Layout-only mode ─────────────────────────────────────────────────
    if cli.layout_only {
        let planned = plan_layout(cli.inputs.as_slice(), &config)
            .await
            .context("Failed to plan layout")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&planned).context("Failed to serialise layout")?
            );
        } else {
            println!(
                "Page:  {:.2} x {:.2} pt  ({} images)",
                planned.page_width,
                planned.total_height,
                planned.len()
            );
            for p in &planned.placements {
                println!(
                    "  #{:<3} {:<40}  x={:>8.2}  y={:>10.2}  w={:>8.2}  h={:>10.2}  scale={:.4}",
                    p.index + 1,
                    cli.inputs[p.index].chars().take(40).collect::<String>(),
                    p.x,
                    p.y,
                    p.width,
                    p.height,
                    p.scale
                );
            }
        }
        return Ok(());
    }

    // ── Run conversion ───────────────────────────────────────────────────
    let stats = convert_to_file(cli.inputs.as_slice(), &cli.output, &config)
        .await
        .context("Conversion failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&stats).context("Failed to serialise stats")?
        );
    } else if !cli.quiet {
        eprintln!(
            "{}  {} images  {:.0} x {:.0} pt  {}ms  →  {}",
            green("✔"),
            stats.image_count,
            stats.page_width,
            stats.page_height,
            stats.total_duration_ms,
            bold(&cli.output.display().to_string()),
        );
        eprintln!(
            "   {} bytes written",
            dim(&stats.pdf_bytes.to_string()),
        );
    }

    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .page_width(cli.page_width)
        .margin(cli.margin)
        .spacing(cli.spacing)
        .concurrency(cli.concurrency)
        .decode_timeout_secs(cli.decode_timeout)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref title) = cli.title {
        builder = builder.title(title.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
