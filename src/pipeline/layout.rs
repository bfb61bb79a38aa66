//! Layout engine: scale images to the usable page width and stack them.
//!
//! This is a pure function of its inputs. It never touches image bytes, only
//! the intrinsic pixel sizes, and it performs the same `f64` operations in the
//! same order on every call, so identical inputs give bit-identical output.
//!
//! Coordinates use a top-left origin: `y` grows downwards from the top edge
//! of the page. The assembler converts to PDF's bottom-left origin.
//!
//! ```text
//!  ┌──────────── page_width ────────────┐
//!  │            margin                  │
//!  │  ┌──────── usable width ───────┐   │
//!  │  │ image 0                     │   │
//!  │  └─────────────────────────────┘   │
//!  │            spacing                 │
//!  │  ┌─────────────────────────────┐   │
//!  │  │ image 1                     │   │
//!  │  └─────────────────────────────┘   │
//!  │            margin                  │
//!  └────────────────────────────────────┘
//! ```

use crate::config::LayoutConfig;
use crate::error::Img2PdfError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Intrinsic pixel size of one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl From<(u32, u32)> for ImageSize {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

/// Position and scaled size of one image on the page, in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    /// Index of the image in the input sequence.
    pub index: usize,
    /// Left edge.
    pub x: f64,
    /// Top edge, measured from the top of the page.
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Factor applied to both pixel dimensions.
    pub scale: f64,
}

/// Every placement plus the page size needed to hold them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutResult {
    /// One entry per input image, in input order.
    pub placements: Vec<Placement>,
    pub page_width: f64,
    /// `2 * margin + Σ height + spacing * (n - 1)`.
    pub total_height: f64,
}

impl LayoutResult {
    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }
}

/// Lay out `images` top to bottom on a single page.
///
/// Every image is scaled so its width equals the usable width
/// (`page_width - 2 * margin`), preserving aspect ratio, then placed below
/// the previous one with `spacing` points in between.
///
/// # Errors
/// * [`Img2PdfError::EmptyInput`] — `images` is empty
/// * [`Img2PdfError::InvalidImage`] — an image has a zero dimension
/// * [`Img2PdfError::InvalidConfig`] — `config` fails [`LayoutConfig::validate`]
pub fn layout(images: &[ImageSize], config: &LayoutConfig) -> Result<LayoutResult, Img2PdfError> {
    if images.is_empty() {
        return Err(Img2PdfError::EmptyInput);
    }
    config.validate()?;

    let usable = config.usable_width();
    let mut placements = Vec::with_capacity(images.len());
    let mut y = config.margin;

    for (index, size) in images.iter().enumerate() {
        if size.width == 0 || size.height == 0 {
            return Err(Img2PdfError::InvalidImage {
                index,
                width: size.width,
                height: size.height,
            });
        }

        let scale = usable / f64::from(size.width);
        let width = f64::from(size.width) * scale;
        let height = f64::from(size.height) * scale;
        // Centering is a no-op while width == usable; kept so narrower
        // placements stay centred if the scaling rule ever changes.
        let x = config.margin + (usable - width) / 2.0;

        if index > 0 {
            y += config.spacing;
        }
        placements.push(Placement {
            index,
            x,
            y,
            width,
            height,
            scale,
        });
        y += height;
    }

    let total_height = y + config.margin;

    debug!(
        images = placements.len(),
        page_width = config.page_width,
        total_height,
        "layout computed"
    );

    Ok(LayoutResult {
        placements,
        page_width: config.page_width,
        total_height,
    })
}
