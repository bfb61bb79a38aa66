//! Result types returned by the conversion entry points.

use crate::pipeline::layout::LayoutResult;
use serde::{Deserialize, Serialize};

/// Everything a successful conversion produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// The finished PDF document.
    #[serde(skip)]
    pub pdf: Vec<u8>,
    /// Where each image ended up on the page.
    pub layout: LayoutResult,
    /// One entry per input image, in input order.
    pub images: Vec<ImageInfo>,
    pub stats: ConversionStats,
}

/// What the loader learned about one input image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    /// Display name: file name, URL segment, or caller-supplied identifier.
    pub name: String,
    /// MIME type declared by the input.
    pub mime_type: String,
    /// Format detected from the image bytes, e.g. "Png".
    pub format: String,
    /// Intrinsic width in pixels.
    pub width: u32,
    /// Intrinsic height in pixels.
    pub height: u32,
    /// Size of the encoded image in bytes.
    pub byte_len: usize,
}

/// Timing and size figures for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionStats {
    pub image_count: usize,
    /// Page width in points.
    pub page_width: f64,
    /// Page height in points.
    pub page_height: f64,
    /// Size of the produced PDF in bytes.
    pub pdf_bytes: usize,
    pub load_duration_ms: u64,
    pub layout_duration_ms: u64,
    pub assembly_duration_ms: u64,
    pub total_duration_ms: u64,
}
