//! Loader: validate a batch and measure every image in it.
//!
//! ## Why validate before decoding anything?
//!
//! A batch with one non-image in it is rejected as a whole. Checking declared
//! MIME types costs nothing, so it happens before a single decode task is
//! spawned. Only then are images measured.
//!
//! ## Why spawn_blocking?
//!
//! Format sniffing and decoding are synchronous calls into the `image` crate.
//! They run on Tokio's blocking pool so a batch of large TIFFs cannot stall
//! the async workers. Each task is wrapped in a timeout.
//!
//! Every image is decoded in full, not just its header, so a truncated or
//! corrupt pixel stream fails here and never reaches the assembler. The
//! pixels are dropped right after; assemblers receive the encoded bytes.
//!
//! ## All or nothing
//!
//! Tasks are joined through `buffered(..).try_collect()`: results come back in
//! input order and the first error ends the join. The pending futures are
//! dropped with it, so no layout is ever computed from a partial batch.

use crate::config::ConversionConfig;
use crate::error::Img2PdfError;
use crate::output::ImageInfo;
use crate::pipeline::input::ImageSource;
use crate::pipeline::layout::ImageSize;
use futures::stream::{self, StreamExt, TryStreamExt};
use image::{ImageFormat, ImageReader};
use std::io::Cursor;
use std::time::Duration;
use tracing::{debug, info};

/// An input image whose format and pixel size are known.
///
/// Immutable once loaded; dropped after assembly.
#[derive(Clone)]
pub struct SourceImage {
    /// Position in the input batch.
    pub index: usize,
    pub name: String,
    pub mime_type: String,
    /// Encoded bytes, exactly as submitted.
    pub bytes: Vec<u8>,
    /// Format detected from the bytes.
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

impl std::fmt::Debug for SourceImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceImage")
            .field("index", &self.index)
            .field("name", &self.name)
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .finish()
    }
}

impl SourceImage {
    pub fn size(&self) -> ImageSize {
        ImageSize::new(self.width, self.height)
    }

    pub fn info(&self) -> ImageInfo {
        ImageInfo {
            name: self.name.clone(),
            mime_type: self.mime_type.clone(),
            format: format!("{:?}", self.format),
            width: self.width,
            height: self.height,
            byte_len: self.bytes.len(),
        }
    }
}

/// Reject empty batches and batches containing a non-image entry.
pub fn validate_sources(sources: &[ImageSource]) -> Result<(), Img2PdfError> {
    if sources.is_empty() {
        return Err(Img2PdfError::EmptyInput);
    }
    if let Some(bad) = sources.iter().find(|s| !s.is_image()) {
        return Err(Img2PdfError::InvalidFileType {
            name: bad.name.clone(),
            mime_type: bad.mime_type.clone(),
        });
    }
    Ok(())
}

/// Validate `sources`, then measure them all concurrently.
///
/// Returns one [`SourceImage`] per source, in input order.
pub async fn load_images(
    sources: Vec<ImageSource>,
    config: &ConversionConfig,
) -> Result<Vec<SourceImage>, Img2PdfError> {
    validate_sources(&sources)?;

    let total = sources.len();
    let timeout = Duration::from_secs(config.decode_timeout_secs);
    let timeout_secs = config.decode_timeout_secs;
    info!("Measuring {} images", total);

    let images: Vec<SourceImage> = stream::iter(sources.into_iter().enumerate())
        .map(|(index, source)| measure_with_timeout(index, source, timeout, timeout_secs))
        .buffered(config.concurrency.max(1))
        .try_collect()
        .await?;

    debug!("Measured {} images", images.len());
    Ok(images)
}

async fn measure_with_timeout(
    index: usize,
    source: ImageSource,
    timeout: Duration,
    timeout_secs: u64,
) -> Result<SourceImage, Img2PdfError> {
    let name = source.name.clone();
    // A blocking task cannot be cancelled. On timeout, or when another image
    // fails first, it is detached and runs to completion in the background;
    // its result is discarded.
    let task = tokio::task::spawn_blocking(move || measure(index, source));

    match tokio::time::timeout(timeout, task).await {
        Err(_) => Err(Img2PdfError::DecodeTimeout {
            name,
            secs: timeout_secs,
        }),
        Ok(Err(join_err)) => Err(Img2PdfError::Internal(format!(
            "Decode task for '{}' panicked: {}",
            name, join_err
        ))),
        Ok(Ok(result)) => result,
    }
}

/// Detect the format of `source`, read its pixel dimensions and check that
/// the whole image decodes.
pub fn measure(index: usize, source: ImageSource) -> Result<SourceImage, Img2PdfError> {
    let decode_err = |detail: String| Img2PdfError::Decode {
        name: source.name.clone(),
        detail,
    };

    let reader = ImageReader::new(Cursor::new(source.bytes.as_slice()))
        .with_guessed_format()
        .map_err(|e| decode_err(e.to_string()))?;
    let format = reader
        .format()
        .ok_or_else(|| decode_err("unrecognised image format".to_string()))?;
    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| decode_err(e.to_string()))?;

    if width == 0 || height == 0 {
        return Err(Img2PdfError::InvalidImage {
            index,
            width,
            height,
        });
    }

    image::load_from_memory_with_format(&source.bytes, format)
        .map_err(|e| decode_err(e.to_string()))?;

    debug!(
        "Measured '{}' → {:?} {}x{} px",
        source.name, format, width, height
    );

    Ok(SourceImage {
        index,
        name: source.name,
        mime_type: source.mime_type,
        bytes: source.bytes,
        format,
        width,
        height,
    })
}
