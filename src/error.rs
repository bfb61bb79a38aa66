//! Error types for the edgequake-img2pdf library.
//!
//! Every failure is fatal to the conversion it occurs in: a batch of images
//! either produces one complete PDF or nothing at all. There is no per-image
//! partial-success type, because a PDF with a silently missing image in the
//! middle of the stack is worse than no PDF.
//!
//! The `Display` text of each variant is the single user-facing message for
//! its failure class. Callers that need to branch on the class rather than
//! the exact variant use [`Img2PdfError::class`].

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the edgequake-img2pdf library.
#[derive(Debug, Error)]
pub enum Img2PdfError {
    // ── Batch validation ──────────────────────────────────────────────────
    /// The conversion was started without any images.
    #[error("No images selected.\nProvide at least one image to convert.")]
    EmptyInput,

    /// An entry in the batch does not declare an `image/*` MIME type.
    #[error("'{name}' is not an image (type: {mime_type}).\nOnly image files can be combined into a PDF.")]
    InvalidFileType { name: String, mime_type: String },

    // ── Decode errors ─────────────────────────────────────────────────────
    /// The image bytes could not be decoded or measured.
    #[error("Could not decode image '{name}': {detail}")]
    Decode { name: String, detail: String },

    /// Measuring the image took longer than the configured decode timeout.
    #[error("Decoding image '{name}' timed out after {secs}s")]
    DecodeTimeout { name: String, secs: u64 },

    /// The image reports a zero width or height.
    #[error("Image #{index} has invalid dimensions {width}x{height}")]
    InvalidImage { index: usize, width: u32, height: u32 },

    // ── Assembly errors ───────────────────────────────────────────────────
    /// The PDF assembler rejected a call or failed to produce output.
    #[error("PDF generation failed: {0}")]
    Assembly(String),

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Image file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a usable path, URL, or data URI.
    #[error("Invalid input '{input}': {reason}")]
    InvalidInput { input: String, reason: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write the output PDF file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder or layout validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse failure class of an [`Img2PdfError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    EmptyInput,
    InvalidFileType,
    Decode,
    InvalidImage,
    Assembly,
    Input,
    Output,
    Config,
    Internal,
}

impl Img2PdfError {
    /// The failure class this error belongs to.
    pub fn class(&self) -> ErrorClass {
        match self {
            Img2PdfError::EmptyInput => ErrorClass::EmptyInput,
            Img2PdfError::InvalidFileType { .. } => ErrorClass::InvalidFileType,
            Img2PdfError::Decode { .. } | Img2PdfError::DecodeTimeout { .. } => {
                ErrorClass::Decode
            }
            Img2PdfError::InvalidImage { .. } => ErrorClass::InvalidImage,
            Img2PdfError::Assembly(_) => ErrorClass::Assembly,
            Img2PdfError::FileNotFound { .. }
            | Img2PdfError::PermissionDenied { .. }
            | Img2PdfError::InvalidInput { .. }
            | Img2PdfError::DownloadFailed { .. }
            | Img2PdfError::DownloadTimeout { .. } => ErrorClass::Input,
            Img2PdfError::OutputWriteFailed { .. } => ErrorClass::Output,
            Img2PdfError::InvalidConfig(_) => ErrorClass::Config,
            Img2PdfError::Internal(_) => ErrorClass::Internal,
        }
    }
}
