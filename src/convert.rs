//! Conversion entry points.
//!
//! Every entry point runs the same four steps: resolve the inputs, then
//! load, lay out, and assemble. A run either returns one finished PDF or an
//! error. On error no assembler call has been made, or the assembler's
//! partial state is dropped unread. Progress is reset to 0 either way.

use crate::config::ConversionConfig;
use crate::error::Img2PdfError;
use crate::output::{ConversionOutput, ConversionStats};
use crate::pipeline::assemble::{assemble, DocumentAssembler, PdfAssembler};
use crate::pipeline::input::{self, ImageSource};
use crate::pipeline::layout::{layout, ImageSize, LayoutResult};
use crate::pipeline::load;
use crate::progress::ProgressReporter;
use std::io::Write;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Combine the images at `inputs` into one PDF.
///
/// This is the primary entry point for the library.
///
/// # Arguments
/// * `inputs` — local file paths, HTTP/HTTPS URLs or base64 `data:` URIs,
///   in the order they should appear on the page
/// * `config` — conversion configuration
///
/// # Errors
/// Any failure aborts the run: missing files, non-image entries, undecodable
/// images, or a PDF generation error. Non-image paths and data URIs are
/// rejected before any file is read or URL fetched.
pub async fn convert<S: AsRef<str>>(
    inputs: &[S],
    config: &ConversionConfig,
) -> Result<ConversionOutput, Img2PdfError> {
    let mut reporter = ProgressReporter::new(config.progress_callback.clone());
    reporter.start(inputs.len());

    let sources = match resolve_checked(inputs, config).await {
        Ok(s) => s,
        Err(e) => {
            reporter.fail(&e.to_string());
            return Err(e);
        }
    };

    run(sources, config, PdfAssembler::new(config.title_or_default()), reporter).await
}

/// Combine images that are already in memory.
pub async fn convert_sources(
    sources: Vec<ImageSource>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Img2PdfError> {
    let assembler = PdfAssembler::new(config.title_or_default());
    convert_with_assembler(sources, config, assembler).await
}

/// Combine images using a caller-supplied [`DocumentAssembler`].
///
/// The assembler receives exactly one `begin_document`, one `place_image` per
/// image in input order, and one `finalize`, or no calls at all if loading
/// or layout fails.
pub async fn convert_with_assembler<A>(
    sources: Vec<ImageSource>,
    config: &ConversionConfig,
    assembler: A,
) -> Result<ConversionOutput, Img2PdfError>
where
    A: DocumentAssembler + 'static,
{
    let mut reporter = ProgressReporter::new(config.progress_callback.clone());
    reporter.start(sources.len());
    run(sources, config, assembler, reporter).await
}

/// Combine images and write the PDF to `output_path`.
///
/// The file is written to a temporary file in the same directory and then
/// renamed over the target, so readers never see a half-written PDF.
pub async fn convert_to_file<S: AsRef<str>>(
    inputs: &[S],
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionStats, Img2PdfError> {
    let output = convert(inputs, config).await?;
    let path = output_path.as_ref().to_path_buf();
    let pdf = output.pdf;

    let target = path.clone();
    tokio::task::spawn_blocking(move || write_atomic(&target, &pdf))
        .await
        .map_err(|e| Img2PdfError::Internal(format!("Write task panicked: {}", e)))??;

    info!("Wrote {}", path.display());
    Ok(output.stats)
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync<S: AsRef<str>>(
    inputs: &[S],
    config: &ConversionConfig,
) -> Result<ConversionOutput, Img2PdfError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Img2PdfError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(inputs, config))
}

/// Load and lay out `inputs` without producing a PDF.
///
/// Useful for previewing the page size before committing to a conversion.
/// Progress callbacks are not invoked.
pub async fn plan_layout<S: AsRef<str>>(
    inputs: &[S],
    config: &ConversionConfig,
) -> Result<LayoutResult, Img2PdfError> {
    let sources = resolve_checked(inputs, config).await?;
    let images = load::load_images(sources, config).await?;
    let sizes: Vec<ImageSize> = images.iter().map(|i| i.size()).collect();
    layout(&sizes, &config.layout)
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Reject non-image entries by declared type, then read and download.
async fn resolve_checked<S: AsRef<str>>(
    inputs: &[S],
    config: &ConversionConfig,
) -> Result<Vec<ImageSource>, Img2PdfError> {
    input::precheck_inputs(inputs)?;
    input::resolve_inputs(inputs, config.download_timeout_secs).await
}

/// Run load → layout → assemble, resetting progress on failure.
async fn run<A>(
    sources: Vec<ImageSource>,
    config: &ConversionConfig,
    assembler: A,
    reporter: ProgressReporter,
) -> Result<ConversionOutput, Img2PdfError>
where
    A: DocumentAssembler + 'static,
{
    match run_inner(sources, config, assembler, &reporter).await {
        Ok(output) => {
            reporter.complete();
            Ok(output)
        }
        Err(e) => {
            warn!("Conversion failed: {}", e);
            reporter.fail(&e.to_string());
            Err(e)
        }
    }
}

async fn run_inner<A>(
    sources: Vec<ImageSource>,
    config: &ConversionConfig,
    mut assembler: A,
    reporter: &ProgressReporter,
) -> Result<ConversionOutput, Img2PdfError>
where
    A: DocumentAssembler + 'static,
{
    let total_start = Instant::now();
    info!("Starting conversion of {} images", sources.len());

    // ── Step 1: Validate + measure ───────────────────────────────────────
    let load_start = Instant::now();
    let images = load::load_images(sources, config).await?;
    let load_duration_ms = load_start.elapsed().as_millis() as u64;
    reporter.loaded();

    // ── Step 2: Layout ───────────────────────────────────────────────────
    let layout_start = Instant::now();
    let sizes: Vec<ImageSize> = images.iter().map(|i| i.size()).collect();
    let layout_result = layout(&sizes, &config.layout)?;
    let layout_duration_ms = layout_start.elapsed().as_millis() as u64;
    debug!(
        "Page will be {:.2} x {:.2} pt",
        layout_result.page_width, layout_result.total_height
    );

    // ── Step 3: Assemble ─────────────────────────────────────────────────
    // Decoding pixel data and serialising the PDF are CPU-bound, so the
    // whole sequence runs on the blocking pool. It stays strictly in order.
    let assembly_start = Instant::now();
    let task_reporter = reporter.clone();
    let task_layout = layout_result.clone();
    let (pdf, images) = tokio::task::spawn_blocking(move || {
        let pdf = assemble(&mut assembler, &images, &task_layout, &task_reporter);
        (pdf, images)
    })
    .await
    .map_err(|e| Img2PdfError::Internal(format!("Assembly task panicked: {}", e)))?;
    let pdf = pdf?;
    let assembly_duration_ms = assembly_start.elapsed().as_millis() as u64;

    let stats = ConversionStats {
        image_count: images.len(),
        page_width: layout_result.page_width,
        page_height: layout_result.total_height,
        pdf_bytes: pdf.len(),
        load_duration_ms,
        layout_duration_ms,
        assembly_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Conversion complete: {} images, {} bytes, {}ms total",
        stats.image_count, stats.pdf_bytes, stats.total_duration_ms
    );

    Ok(ConversionOutput {
        pdf,
        layout: layout_result,
        images: images.iter().map(|i| i.info()).collect(),
        stats,
    })
}

/// Write `bytes` to `path` via a temp file in the same directory.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), Img2PdfError> {
    let write_err = |source: std::io::Error| Img2PdfError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(write_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_atomic_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out/combined-images.pdf");
        write_atomic(&path, b"%PDF-1.7").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.7");
    }

    #[test]
    fn write_atomic_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.pdf");
        std::fs::write(&path, b"old").unwrap();
        write_atomic(&path, b"new").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"new");
    }

    #[tokio::test]
    async fn empty_input_fails_fast() {
        let inputs: [&str; 0] = [];
        let err = convert(&inputs, &ConversionConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Img2PdfError::EmptyInput));
    }
}
