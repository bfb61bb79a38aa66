//! Input resolution: turn a user-supplied path, URL or data URI into bytes.
//!
//! Every input ends up as an [`ImageSource`]: a display name, the MIME type
//! the input *declares*, and the raw bytes. The declared type is what batch
//! validation checks; the actual format is detected from the bytes later,
//! when the image is measured.
//!
//! Where the declared type comes from depends on the input kind:
//!
//! | Input | Declared MIME |
//! |-------|---------------|
//! | `https://…` | `Content-Type` header, else file extension |
//! | `data:image/png;base64,…` | the URI's media type |
//! | local path | file extension |
//!
//! Downloads are held in memory rather than written to a temp directory; the
//! assembler needs the bytes anyway and they are dropped with the source.

use crate::error::Img2PdfError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures::future::try_join_all;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// MIME type used when nothing better is known.
pub const UNKNOWN_MIME: &str = "application/octet-stream";

/// One image as submitted by the caller, before it has been decoded.
#[derive(Clone)]
pub struct ImageSource {
    /// Display name used in logs and error messages.
    pub name: String,
    /// MIME type declared by the input; must start with `image/`.
    pub mime_type: String,
    /// Encoded image bytes.
    pub bytes: Vec<u8>,
}

impl fmt::Debug for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageSource")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .finish()
    }
}

impl ImageSource {
    /// Wrap in-memory bytes with an explicit MIME type.
    pub fn from_bytes(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Whether the declared MIME type is an `image/*` type.
    pub fn is_image(&self) -> bool {
        is_image_mime(&self.mime_type)
    }
}

/// `true` when `mime` starts with `image/`, ignoring case.
pub fn is_image_mime(mime: &str) -> bool {
    mime.trim()
        .get(..6)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("image/"))
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Check if the input string is a `data:` URI.
pub fn is_data_uri(input: &str) -> bool {
    input.starts_with("data:")
}

/// Guess a MIME type from a file extension.
pub fn mime_from_extension(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg" | "jpe" | "jfif") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("webp") => "image/webp",
        Some("tif" | "tiff") => "image/tiff",
        Some("svg") => "image/svg+xml",
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain",
        _ => UNKNOWN_MIME,
    }
}

/// The MIME type `input` declares without being read, if that is knowable.
///
/// Local paths declare through their extension and data URIs through their
/// media type. URLs return `None`: only the response says what they hold.
/// Malformed data URIs also return `None` and are reported on resolution.
pub fn declared_mime(input: &str) -> Option<String> {
    if is_url(input) {
        None
    } else if is_data_uri(input) {
        RE_DATA_URI.captures(input).map(|caps| data_uri_mime(&caps))
    } else {
        Some(mime_from_extension(Path::new(input)).to_string())
    }
}

/// Reject a batch before anything is read, downloaded or decoded.
///
/// Fails with [`Img2PdfError::EmptyInput`] for an empty batch, or with
/// [`Img2PdfError::InvalidFileType`] naming the first entry whose declared
/// type is already known not to be an image. URLs pass; their type is checked
/// again once the response arrives.
pub fn precheck_inputs<S: AsRef<str>>(inputs: &[S]) -> Result<(), Img2PdfError> {
    if inputs.is_empty() {
        return Err(Img2PdfError::EmptyInput);
    }
    for input in inputs {
        let input = input.as_ref();
        if let Some(mime_type) = declared_mime(input) {
            if !is_image_mime(&mime_type) {
                return Err(Img2PdfError::InvalidFileType {
                    name: display_name(input),
                    mime_type,
                });
            }
        }
    }
    Ok(())
}

/// Resolve one input string to an [`ImageSource`].
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ImageSource, Img2PdfError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else if is_data_uri(input) {
        decode_data_uri(input)
    } else {
        resolve_local(input).await
    }
}

/// Resolve every input concurrently, keeping input order.
///
/// The first failure aborts the whole batch.
pub async fn resolve_inputs<S: AsRef<str>>(
    inputs: &[S],
    timeout_secs: u64,
) -> Result<Vec<ImageSource>, Img2PdfError> {
    try_join_all(
        inputs
            .iter()
            .map(|input| resolve_input(input.as_ref(), timeout_secs)),
    )
    .await
}

/// Read a local file, mapping I/O failures to input errors.
async fn resolve_local(path_str: &str) -> Result<ImageSource, Img2PdfError> {
    let path = PathBuf::from(path_str);

    let bytes = match tokio::fs::read(&path).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Img2PdfError::PermissionDenied { path });
        }
        Err(_) => return Err(Img2PdfError::FileNotFound { path }),
    };

    let name = display_name(path_str);
    let mime_type = mime_from_extension(&path).to_string();

    debug!("Resolved local image: {} ({})", path.display(), mime_type);
    Ok(ImageSource {
        name,
        mime_type,
        bytes,
    })
}

static RE_DATA_URI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^data:(?P<mime>[A-Za-z0-9][\w.+-]*/[\w.+-]+)?(?P<params>(?:;[^;,]+)*?)(?P<b64>;base64)?,")
        .unwrap()
});

/// Decode a base64 `data:` URI.
fn decode_data_uri(input: &str) -> Result<ImageSource, Img2PdfError> {
    let invalid = |reason: &str| Img2PdfError::InvalidInput {
        input: truncate(input, 48),
        reason: reason.to_string(),
    };

    let caps = RE_DATA_URI
        .captures(input)
        .ok_or_else(|| invalid("malformed data URI"))?;
    if caps.name("b64").is_none() {
        return Err(invalid("only base64 data URIs are supported"));
    }
    let mime_type = data_uri_mime(&caps);

    let payload = &input[caps.get(0).map(|m| m.end()).unwrap_or(0)..];
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| invalid(&format!("bad base64 payload: {e}")))?;

    debug!("Decoded data URI: {} bytes of {}", bytes.len(), mime_type);
    Ok(ImageSource {
        name: "inline image".to_string(),
        mime_type,
        bytes,
    })
}

/// Media type of a parsed data URI; RFC 2397 defaults to `text/plain`.
fn data_uri_mime(caps: &regex::Captures<'_>) -> String {
    caps.name("mime")
        .map(|m| m.as_str().to_ascii_lowercase())
        .unwrap_or_else(|| "text/plain".to_string())
}

/// Name used for `input` in logs and errors.
fn display_name(input: &str) -> String {
    if is_url(input) {
        extract_filename(input)
    } else if is_data_uri(input) {
        "inline image".to_string()
    } else {
        Path::new(input)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| input.to_string())
    }
}

/// Download a URL into memory.
async fn download_url(url: &str, timeout_secs: u64) -> Result<ImageSource, Img2PdfError> {
    info!("Downloading image from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| Img2PdfError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let map_send_err = |e: reqwest::Error| {
        if e.is_timeout() {
            Img2PdfError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            Img2PdfError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    };

    let response = client.get(url).send().await.map_err(map_send_err)?;

    if !response.status().is_success() {
        return Err(Img2PdfError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let name = extract_filename(url);
    let mime_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(essence)
        .filter(|m| !m.is_empty() && m != UNKNOWN_MIME)
        .unwrap_or_else(|| mime_from_extension(Path::new(&name)).to_string());

    let bytes = response.bytes().await.map_err(map_send_err)?.to_vec();

    info!("Downloaded {} ({} bytes, {})", name, bytes.len(), mime_type);
    Ok(ImageSource {
        name,
        mime_type,
        bytes,
    })
}

/// `image/png; charset=binary` → `image/png`.
fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

/// Extract a reasonable file name from the URL path.
fn extract_filename(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded-image".to_string()
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((i, _)) => format!("{}…", &s[..i]),
        None => s.to_string(),
    }
}
