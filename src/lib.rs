//! # edgequake-img2pdf
//!
//! Stack a batch of raster images into a single tall PDF page.
//!
//! Every image is scaled to the usable page width (page width minus both
//! margins), keeping its aspect ratio, and placed below the previous one. The
//! page is as tall as it needs to be: there is no pagination, so a photo
//! strip, a set of screenshots or a long receipt reads as one continuous
//! scroll.
//!
//! ## Pipeline Overview
//!
//! ```text
//! paths / URLs / data URIs
//!  │
//!  ├─ 1. Input     resolve each entry to bytes + declared MIME type
//!  ├─ 2. Load      reject non-images, then measure all images concurrently
//!  ├─ 3. Layout    pure geometry: scale to usable width, stack vertically
//!  ├─ 4. Assemble  sequential placement through a DocumentAssembler
//!  └─ 5. Output    PDF bytes + placements + stats
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_img2pdf::{convert_to_file, ConversionConfig, DEFAULT_OUTPUT_NAME};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::default();
//!     let stats = convert_to_file(&["front.jpg", "back.png"], DEFAULT_OUTPUT_NAME, &config).await?;
//!     eprintln!("{} images on a {:.0} x {:.0} pt page",
//!         stats.image_count, stats.page_width, stats.page_height);
//!     Ok(())
//! }
//! ```
//!
//! ## Layout only
//!
//! The layout engine is a plain function and needs no runtime:
//!
//! ```rust
//! use edgequake_img2pdf::{layout, ImageSize, LayoutConfig};
//!
//! let result = layout(&[ImageSize::new(100, 200)], &LayoutConfig::default()).unwrap();
//! assert!((result.total_height - 1150.56).abs() < 1e-9);
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `img2pdf` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-img2pdf = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    ConversionConfig, ConversionConfigBuilder, LayoutConfig, DEFAULT_MARGIN, DEFAULT_OUTPUT_NAME,
    DEFAULT_PAGE_WIDTH, DEFAULT_SPACING, DEFAULT_TITLE,
};
pub use convert::{
    convert, convert_sources, convert_sync, convert_to_file, convert_with_assembler, plan_layout,
};
pub use error::{ErrorClass, Img2PdfError};
pub use output::{ConversionOutput, ConversionStats, ImageInfo};
pub use pipeline::assemble::{DocumentAssembler, PdfAssembler};
pub use pipeline::input::ImageSource;
pub use pipeline::layout::{layout, ImageSize, LayoutResult, Placement};
pub use pipeline::load::SourceImage;
pub use progress::{
    ConversionProgressCallback, NoopProgressCallback, ProgressCallback, ProgressTracker,
};

/// `image::ImageFormat`, re-exported for [`DocumentAssembler`] implementors.
pub use image::ImageFormat;
