//! Progress reporting for a conversion run.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as the pipeline loads images and places them on the page.
//!
//! Progress is a percentage of images committed to the assembler. It stays at
//! 0 while images are being loaded and laid out, climbs to exactly 100 as the
//! last image is placed, and is reset to 0 when the run finishes or fails.
//!
//! [`ProgressTracker`] is a ready-made callback that publishes the current
//! percentage on a `tokio::sync::watch` channel, for callers that would
//! rather poll or await a value than implement the trait.
//!
//! # Example
//!
//! ```rust
//! use edgequake_img2pdf::{ConversionConfig, ConversionProgressCallback, ProgressTracker};
//! use std::sync::Arc;
//!
//! let tracker = ProgressTracker::new();
//! let config = ConversionConfig::builder()
//!     .progress_callback(Arc::new(tracker.clone()) as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! assert_eq!(tracker.current(), 0);
//! # let _ = config;
//! ```

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::debug;

/// Called by the conversion pipeline as it progresses.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Events for one run arrive in order from a single
/// task at a time, but implementations may be shared across concurrent
/// runs and must synchronise their own state.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once when a conversion starts, before any input is validated.
    ///
    /// # Arguments
    /// * `total_images` — number of images submitted
    fn on_conversion_start(&self, total_images: usize) {
        let _ = total_images;
    }

    /// Called once every image has been measured and layout can begin.
    fn on_images_loaded(&self, total_images: usize) {
        let _ = total_images;
    }

    /// Called after each image has been handed to the assembler.
    ///
    /// # Arguments
    /// * `image_num`    — 1-indexed position of the image in the stack
    /// * `total_images` — total images in the run
    /// * `percent`      — `round(100 * image_num / total_images)`
    fn on_image_placed(&self, image_num: usize, total_images: usize, percent: u8) {
        let _ = (image_num, total_images, percent);
    }

    /// Called once after the PDF has been produced.
    fn on_conversion_complete(&self, total_images: usize) {
        let _ = total_images;
    }

    /// Called once when the run aborts.
    ///
    /// # Arguments
    /// * `error` — human-readable error description
    fn on_conversion_failed(&self, error: &str) {
        let _ = error;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

/// Percentage of a run that is done once `placed` of `total` images are in.
///
/// Rounds half up using integer arithmetic so the value never depends on
/// floating-point formatting.
pub fn percent_complete(placed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let placed = placed.min(total) as u64;
    let total = total as u64;
    ((200 * placed + total) / (2 * total)) as u8
}

/// Drives a [`ConversionProgressCallback`] for one conversion run.
///
/// Owns the monotonic guarantee: percentages handed to the callback never
/// decrease within a run and never exceed 100.
#[derive(Clone)]
pub struct ProgressReporter {
    callback: Option<ProgressCallback>,
    total: usize,
    last: Arc<AtomicU8>,
}

impl ProgressReporter {
    pub fn new(callback: Option<ProgressCallback>) -> Self {
        Self {
            callback,
            total: 0,
            last: Arc::new(AtomicU8::new(0)),
        }
    }

    /// Reset to 0 and announce a run over `total_images` images.
    pub fn start(&mut self, total_images: usize) {
        self.total = total_images;
        self.last.store(0, Ordering::SeqCst);
        if let Some(ref cb) = self.callback {
            cb.on_conversion_start(total_images);
        }
    }

    pub fn loaded(&self) {
        if let Some(ref cb) = self.callback {
            cb.on_images_loaded(self.total);
        }
    }

    /// Record that the image at 0-based `index` has been placed.
    pub fn placed(&self, index: usize) {
        let percent = percent_complete(index + 1, self.total);
        let previous = self.last.fetch_max(percent, Ordering::SeqCst);
        let percent = percent.max(previous);
        debug!(image = index + 1, total = self.total, percent, "image placed");
        if let Some(ref cb) = self.callback {
            cb.on_image_placed(index + 1, self.total, percent);
        }
    }

    /// Last percentage reported in this run.
    pub fn percent(&self) -> u8 {
        self.last.load(Ordering::SeqCst)
    }

    pub fn complete(&self) {
        self.last.store(0, Ordering::SeqCst);
        if let Some(ref cb) = self.callback {
            cb.on_conversion_complete(self.total);
        }
    }

    pub fn fail(&self, error: &str) {
        self.last.store(0, Ordering::SeqCst);
        if let Some(ref cb) = self.callback {
            cb.on_conversion_failed(error);
        }
    }
}

/// Progress callback that publishes the current percentage on a watch channel.
///
/// Clones share the same channel. The value is 0 before and after a run,
/// intermediate while images are being placed, and 100 once the last image
/// is in.
#[derive(Clone)]
pub struct ProgressTracker {
    tx: Arc<watch::Sender<u8>>,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0u8);
        Self { tx: Arc::new(tx) }
    }

    /// Current percentage (0–100).
    pub fn current(&self) -> u8 {
        *self.tx.borrow()
    }

    /// A receiver that is notified on every change.
    pub fn subscribe(&self) -> watch::Receiver<u8> {
        self.tx.subscribe()
    }

    /// The percentage as a `Stream`, starting with the current value.
    pub fn stream(&self) -> WatchStream<u8> {
        WatchStream::new(self.subscribe())
    }

    fn publish(&self, percent: u8) {
        self.tx.send_replace(percent.min(100));
    }
}

impl ConversionProgressCallback for ProgressTracker {
    fn on_conversion_start(&self, _total_images: usize) {
        self.publish(0);
    }

    fn on_image_placed(&self, _image_num: usize, _total_images: usize, percent: u8) {
        self.publish(percent);
    }

    fn on_conversion_complete(&self, _total_images: usize) {
        self.publish(0);
    }

    fn on_conversion_failed(&self, _error: &str) {
        self.publish(0);
    }
}
