//! Configuration types for image-to-PDF conversion.
//!
//! Geometry lives in [`LayoutConfig`], which is all the pure layout engine
//! ever sees. Everything else a conversion needs (timeouts, concurrency,
//! document title, progress callback) sits next to it in
//! [`ConversionConfig`], built via [`ConversionConfigBuilder`].
//!
//! The defaults reproduce an A4-wide page with a 20 pt margin and 10 pt gap
//! between images.

use crate::error::Img2PdfError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A4 width in points.
pub const DEFAULT_PAGE_WIDTH: f64 = 595.28;

/// Margin on every side of the page, in points.
pub const DEFAULT_MARGIN: f64 = 20.0;

/// Vertical gap between consecutive images, in points.
pub const DEFAULT_SPACING: f64 = 10.0;

/// File name used when the caller does not choose one.
pub const DEFAULT_OUTPUT_NAME: &str = "combined-images.pdf";

/// Title written into the PDF metadata when none is configured.
pub const DEFAULT_TITLE: &str = "Combined Images";

/// Page geometry consumed by [`crate::pipeline::layout::layout`].
///
/// All values are in PDF points (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Page width. Must be positive and wider than `2 * margin`.
    pub page_width: f64,
    /// Margin applied to the left, right, top and bottom edges.
    pub margin: f64,
    /// Gap between two consecutive images.
    pub spacing: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            page_width: DEFAULT_PAGE_WIDTH,
            margin: DEFAULT_MARGIN,
            spacing: DEFAULT_SPACING,
        }
    }
}

impl LayoutConfig {
    pub fn new(page_width: f64, margin: f64, spacing: f64) -> Self {
        Self {
            page_width,
            margin,
            spacing,
        }
    }

    /// Horizontal space available for image content.
    pub fn usable_width(&self) -> f64 {
        self.page_width - 2.0 * self.margin
    }

    /// Check that the geometry can hold at least one image.
    pub fn validate(&self) -> Result<(), Img2PdfError> {
        if !self.page_width.is_finite() || self.page_width <= 0.0 {
            return Err(Img2PdfError::InvalidConfig(format!(
                "page width must be a positive number, got {}",
                self.page_width
            )));
        }
        if !self.margin.is_finite() || self.margin < 0.0 {
            return Err(Img2PdfError::InvalidConfig(format!(
                "margin must be ≥ 0, got {}",
                self.margin
            )));
        }
        if !self.spacing.is_finite() || self.spacing < 0.0 {
            return Err(Img2PdfError::InvalidConfig(format!(
                "spacing must be ≥ 0, got {}",
                self.spacing
            )));
        }
        if self.usable_width() <= 0.0 {
            return Err(Img2PdfError::InvalidConfig(format!(
                "margins ({} pt each) leave no usable width on a {} pt page",
                self.margin, self.page_width
            )));
        }
        Ok(())
    }
}

/// Configuration for one image-to-PDF conversion.
///
/// # Example
/// ```rust
/// use edgequake_img2pdf::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .margin(36.0)
///     .spacing(0.0)
///     .title("Scans")
///     .build()
///     .unwrap();
/// assert_eq!(config.layout.margin, 36.0);
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Page geometry. Default: A4 width, 20 pt margin, 10 pt spacing.
    pub layout: LayoutConfig,

    /// Title stored in the PDF /Info dictionary. Default: "Combined Images".
    pub title: Option<String>,

    /// Maximum number of images measured at the same time. Default: 8.
    ///
    /// Measuring only reads image headers, so this mostly bounds how many
    /// blocking-pool threads a large batch can occupy at once.
    pub concurrency: usize,

    /// Per-image decode timeout in seconds. Default: 30.
    pub decode_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Optional progress observer.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            layout: LayoutConfig::default(),
            title: None,
            concurrency: 8,
            decode_timeout_secs: 30,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("layout", &self.layout)
            .field("title", &self.title)
            .field("concurrency", &self.concurrency)
            .field("decode_timeout_secs", &self.decode_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// The document title, falling back to [`DEFAULT_TITLE`].
    pub fn title_or_default(&self) -> &str {
        self.title.as_deref().unwrap_or(DEFAULT_TITLE)
    }
}

/// Builder for [`ConversionConfig`].
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl fmt::Debug for ConversionConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl ConversionConfigBuilder {
    pub fn layout(mut self, layout: LayoutConfig) -> Self {
        self.config.layout = layout;
        self
    }

    pub fn page_width(mut self, width: f64) -> Self {
        self.config.layout.page_width = width;
        self
    }

    pub fn margin(mut self, margin: f64) -> Self {
        self.config.layout.margin = margin;
        self
    }

    pub fn spacing(mut self, spacing: f64) -> Self {
        self.config.layout.spacing = spacing;
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.config.title = Some(title.into());
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn decode_timeout_secs(mut self, secs: u64) -> Self {
        self.config.decode_timeout_secs = secs.max(1);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Img2PdfError> {
        self.config.layout.validate()?;
        if self.config.concurrency == 0 {
            return Err(Img2PdfError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}
