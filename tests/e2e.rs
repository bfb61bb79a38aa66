//! End-to-end tests for edgequake-img2pdf.
//!
//! All images are generated in memory with the `image` crate, so these run
//! offline and need no fixtures.
//!
//! Run with:
//!   cargo test --test e2e -- --nocapture

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_img2pdf::{
    convert, convert_sources, convert_to_file, convert_with_assembler, plan_layout,
    ConversionConfig, ConversionProgressCallback, DocumentAssembler, ErrorClass, ImageFormat,
    ImageSource, Img2PdfError, ProgressCallback, ProgressTracker,
};
use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

// ── Test helpers ─────────────────────────────────────────────────────────────

fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), format)
        .expect("encode test image");
    buf
}

fn png(width: u32, height: u32) -> Vec<u8> {
    encode(
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([0, 128, 255, 128]))),
        ImageFormat::Png,
    )
}

fn jpeg(width: u32, height: u32) -> Vec<u8> {
    encode(
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([250, 200, 0]))),
        ImageFormat::Jpeg,
    )
}

/// A PNG that reports valid dimensions but whose pixel stream is damaged:
/// the tail is cut off and a run of bytes in the middle is flipped.
fn png_with_corrupt_pixels(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        let v = x.wrapping_mul(2_654_435_761) ^ y.wrapping_mul(40_503);
        Rgb([v as u8, (v >> 8) as u8, (v >> 16) as u8])
    });
    let mut buf = encode(DynamicImage::ImageRgb8(img), ImageFormat::Png);
    buf.truncate(buf.len() - 20);
    let mid = buf.len() / 2;
    for b in &mut buf[mid..mid + 8] {
        *b ^= 0xff;
    }
    buf
}

fn png_source(name: &str, width: u32, height: u32) -> ImageSource {
    ImageSource::from_bytes(name, "image/png", png(width, height))
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {expected}, got {actual}"
    );
}

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Begin { width: f64, height: f64 },
    Place { format: ImageFormat, x: f64, y: f64, width: f64, height: f64 },
    Finalize,
}

/// Assembler that records every call into a shared log.
#[derive(Clone, Default)]
struct RecordingAssembler {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl RecordingAssembler {
    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

impl DocumentAssembler for RecordingAssembler {
    fn begin_document(&mut self, width: f64, height: f64) -> Result<(), Img2PdfError> {
        self.calls.lock().unwrap().push(Call::Begin { width, height });
        Ok(())
    }

    fn place_image(
        &mut self,
        _bytes: &[u8],
        format: ImageFormat,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    ) -> Result<(), Img2PdfError> {
        self.calls.lock().unwrap().push(Call::Place {
            format,
            x,
            y,
            width,
            height,
        });
        Ok(())
    }

    fn finalize(&mut self) -> Result<Vec<u8>, Img2PdfError> {
        self.calls.lock().unwrap().push(Call::Finalize);
        Ok(b"%PDF-recorded".to_vec())
    }
}

/// Assembler whose `place_image` fails on the n-th call.
struct FailingAssembler {
    fail_at: usize,
    placed: usize,
}

impl DocumentAssembler for FailingAssembler {
    fn begin_document(&mut self, _w: f64, _h: f64) -> Result<(), Img2PdfError> {
        Ok(())
    }

    fn place_image(
        &mut self,
        _bytes: &[u8],
        _format: ImageFormat,
        _x: f64,
        _y: f64,
        _w: f64,
        _h: f64,
    ) -> Result<(), Img2PdfError> {
        if self.placed == self.fail_at {
            return Err(Img2PdfError::Assembly("disk full".into()));
        }
        self.placed += 1;
        Ok(())
    }

    fn finalize(&mut self) -> Result<Vec<u8>, Img2PdfError> {
        Ok(Vec::new())
    }
}

#[derive(Default)]
struct EventLog {
    events: Mutex<Vec<String>>,
    percents: Mutex<Vec<u8>>,
}

impl ConversionProgressCallback for EventLog {
    fn on_conversion_start(&self, total_images: usize) {
        self.events.lock().unwrap().push(format!("start {total_images}"));
    }

    fn on_images_loaded(&self, total_images: usize) {
        self.events.lock().unwrap().push(format!("loaded {total_images}"));
    }

    fn on_image_placed(&self, _image_num: usize, _total: usize, percent: u8) {
        self.percents.lock().unwrap().push(percent);
    }

    fn on_conversion_complete(&self, total_images: usize) {
        self.events.lock().unwrap().push(format!("complete {total_images}"));
    }

    fn on_conversion_failed(&self, _error: &str) {
        self.events.lock().unwrap().push("failed".to_string());
    }
}

fn config_with(cb: ProgressCallback) -> ConversionConfig {
    ConversionConfig::builder()
        .progress_callback(cb)
        .build()
        .expect("valid config")
}

// ── Layout through the full pipeline ─────────────────────────────────────────

#[tokio::test]
async fn two_images_are_stacked_with_spacing() {
    let recorder = RecordingAssembler::default();
    let sources = vec![png_source("tall.png", 100, 200), png_source("wide.png", 200, 100)];

    let output = convert_with_assembler(sources, &ConversionConfig::default(), recorder.clone())
        .await
        .expect("conversion should succeed");

    let calls = recorder.calls();
    assert_eq!(calls.len(), 4);
    match calls[0] {
        Call::Begin { width, height } => {
            assert_close(width, 595.28);
            assert_close(height, 20.0 + 1110.56 + 10.0 + 277.64 + 20.0);
        }
        ref other => panic!("expected Begin, got {other:?}"),
    }
    match calls[2] {
        Call::Place { x, y, width, .. } => {
            assert_close(x, 20.0);
            assert_close(y, 1140.56);
            assert_close(width, 555.28);
        }
        ref other => panic!("expected Place, got {other:?}"),
    }
    assert_eq!(calls[3], Call::Finalize);

    assert_eq!(output.pdf, b"%PDF-recorded");
    assert_eq!(output.images.len(), 2);
    assert_eq!(output.images[0].name, "tall.png");
    assert_eq!((output.images[1].width, output.images[1].height), (200, 100));
    assert_close(output.stats.page_height, output.layout.total_height);
}

#[tokio::test]
async fn detected_format_reaches_the_assembler() {
    let recorder = RecordingAssembler::default();
    let sources = vec![
        ImageSource::from_bytes("photo.jpg", "image/jpeg", jpeg(40, 30)),
        png_source("icon.png", 16, 16),
    ];

    convert_with_assembler(sources, &ConversionConfig::default(), recorder.clone())
        .await
        .unwrap();

    let formats: Vec<ImageFormat> = recorder
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            Call::Place { format, .. } => Some(format),
            _ => None,
        })
        .collect();
    assert_eq!(formats, vec![ImageFormat::Jpeg, ImageFormat::Png]);
}

#[tokio::test]
async fn pdf_assembler_writes_real_pdf() {
    let sources = vec![
        png_source("a.png", 64, 32),
        ImageSource::from_bytes("b.jpg", "image/jpeg", jpeg(32, 64)),
    ];
    let output = convert_sources(sources, &ConversionConfig::default())
        .await
        .expect("conversion should succeed");

    assert!(output.pdf.starts_with(b"%PDF"));
    assert_eq!(output.stats.image_count, 2);
    assert_eq!(output.stats.pdf_bytes, output.pdf.len());
    // 64x32 → 555.28 x 277.64; 32x64 → 555.28 x 1110.56
    assert_close(output.layout.total_height, 20.0 + 277.64 + 10.0 + 1110.56 + 20.0);
}

// ── Failure paths ────────────────────────────────────────────────────────────

#[tokio::test]
async fn empty_batch_never_reaches_assembler() {
    let recorder = RecordingAssembler::default();
    let err = convert_with_assembler(Vec::new(), &ConversionConfig::default(), recorder.clone())
        .await
        .unwrap_err();

    assert!(matches!(err, Img2PdfError::EmptyInput));
    assert_eq!(err.class(), ErrorClass::EmptyInput);
    assert!(recorder.calls().is_empty());
}

#[tokio::test]
async fn non_image_entry_rejects_batch_before_decoding() {
    let recorder = RecordingAssembler::default();
    // The first entry is undecodable; reaching the decoder would yield Decode.
    let sources = vec![
        ImageSource::from_bytes("corrupt.png", "image/png", vec![0xde, 0xad, 0xbe, 0xef]),
        ImageSource::from_bytes("readme.txt", "text/plain", b"hello".to_vec()),
    ];

    let err = convert_with_assembler(sources, &ConversionConfig::default(), recorder.clone())
        .await
        .unwrap_err();

    assert_eq!(err.class(), ErrorClass::InvalidFileType);
    assert!(err.to_string().contains("readme.txt"));
    assert!(recorder.calls().is_empty());
}

#[tokio::test]
async fn decode_failure_aborts_without_assembly_and_resets_progress() {
    let recorder = RecordingAssembler::default();
    let log = Arc::new(EventLog::default());
    let config = config_with(log.clone());
    let sources = vec![
        png_source("ok.png", 8, 8),
        ImageSource::from_bytes("broken.png", "image/png", b"not a png".to_vec()),
    ];

    let err = convert_with_assembler(sources, &config, recorder.clone())
        .await
        .unwrap_err();

    assert_eq!(err.class(), ErrorClass::Decode);
    assert!(recorder.calls().is_empty());
    assert!(log.percents.lock().unwrap().is_empty());
    assert_eq!(
        *log.events.lock().unwrap(),
        vec!["start 2".to_string(), "failed".to_string()]
    );
}

#[tokio::test]
async fn corrupt_pixel_data_fails_during_load() {
    let recorder = RecordingAssembler::default();
    let log = Arc::new(EventLog::default());
    let config = config_with(log.clone());
    let sources = vec![
        png_source("ok.png", 16, 16),
        ImageSource::from_bytes("damaged.png", "image/png", png_with_corrupt_pixels(64, 64)),
    ];

    let err = convert_with_assembler(sources, &config, recorder.clone())
        .await
        .unwrap_err();

    assert_eq!(err.class(), ErrorClass::Decode);
    assert!(err.to_string().contains("damaged.png"));
    assert!(recorder.calls().is_empty());
    assert!(log.percents.lock().unwrap().is_empty());
}

#[tokio::test]
async fn corrupt_pixel_data_fails_before_pdf_generation() {
    let sources = vec![
        png_source("ok.png", 16, 16),
        ImageSource::from_bytes("damaged.png", "image/png", png_with_corrupt_pixels(64, 64)),
    ];
    let err = convert_sources(sources, &ConversionConfig::default())
        .await
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::Decode);
}

#[tokio::test]
async fn assembly_failure_surfaces_and_resets_tracker() {
    let tracker = ProgressTracker::new();
    let config = config_with(Arc::new(tracker.clone()));
    let sources = (0..4).map(|i| png_source(&format!("{i}.png"), 4, 4)).collect();

    let err = convert_with_assembler(
        sources,
        &config,
        FailingAssembler {
            fail_at: 2,
            placed: 0,
        },
    )
    .await
    .unwrap_err();

    assert_eq!(err.class(), ErrorClass::Assembly);
    assert!(err.to_string().contains("disk full"));
    assert_eq!(tracker.current(), 0);
}

// ── Progress ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn progress_for_four_images_ends_at_100() {
    let log = Arc::new(EventLog::default());
    let config = config_with(log.clone());
    let sources = (0..4)
        .map(|i| png_source(&format!("{i}.png"), 10 + i, 20))
        .collect();

    convert_with_assembler(sources, &config, RecordingAssembler::default())
        .await
        .unwrap();

    let percents = log.percents.lock().unwrap().clone();
    assert_eq!(percents, vec![25, 50, 75, 100]);
    assert!(percents.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(
        *log.events.lock().unwrap(),
        vec![
            "start 4".to_string(),
            "loaded 4".to_string(),
            "complete 4".to_string()
        ]
    );
}

#[tokio::test]
async fn tracker_is_zero_before_and_after_a_run() {
    let tracker = ProgressTracker::new();
    let mut rx = tracker.subscribe();
    let config = config_with(Arc::new(tracker.clone()) as Arc<dyn ConversionProgressCallback>);
    assert_eq!(tracker.current(), 0);

    convert_with_assembler(
        vec![png_source("a.png", 3, 3), png_source("b.png", 3, 3)],
        &config,
        RecordingAssembler::default(),
    )
    .await
    .unwrap();

    assert_eq!(tracker.current(), 0);
    assert!(rx.has_changed().unwrap());
    assert_eq!(*rx.borrow_and_update(), 0);
}

// ── Inputs ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn convert_to_file_reads_paths_and_data_uris() {
    let dir = tempfile::tempdir().unwrap();
    let png_path = dir.path().join("first.png");
    std::fs::write(&png_path, png(20, 10)).unwrap();
    let data_uri = format!("data:image/jpeg;base64,{}", STANDARD.encode(jpeg(10, 20)));
    let out: PathBuf = dir.path().join("out/combined-images.pdf");

    let inputs = vec![png_path.to_string_lossy().into_owned(), data_uri];
    let stats = convert_to_file(&inputs, &out, &ConversionConfig::default())
        .await
        .expect("conversion should succeed");

    let written = std::fs::read(&out).unwrap();
    assert!(written.starts_with(b"%PDF"));
    assert_eq!(stats.pdf_bytes, written.len());
    assert_eq!(stats.image_count, 2);
}

#[tokio::test]
async fn text_file_on_disk_is_rejected_by_extension() {
    let dir = tempfile::tempdir().unwrap();
    let img = dir.path().join("a.png");
    let txt = dir.path().join("notes.txt");
    std::fs::write(&img, png(4, 4)).unwrap();
    std::fs::write(&txt, b"hello").unwrap();

    let inputs = [img.to_str().unwrap(), txt.to_str().unwrap()];
    let err = convert(&inputs, &ConversionConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Img2PdfError::InvalidFileType { ref name, .. } if name == "notes.txt"));
}

#[tokio::test]
async fn non_image_path_wins_over_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let txt = dir.path().join("notes.txt");
    std::fs::write(&txt, b"hello").unwrap();

    let inputs = [
        "/nope/missing.png".to_string(),
        txt.to_string_lossy().into_owned(),
    ];
    let err = convert(&inputs, &ConversionConfig::default())
        .await
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::InvalidFileType);
    assert!(matches!(err, Img2PdfError::InvalidFileType { ref name, .. } if name == "notes.txt"));

    let err = plan_layout(&inputs, &ConversionConfig::default())
        .await
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::InvalidFileType);
}

#[tokio::test]
async fn non_image_data_uri_is_rejected_before_reading_files() {
    let inputs = ["/nope/missing.png", "data:text/plain;base64,aGVsbG8="];
    let err = convert(&inputs, &ConversionConfig::default())
        .await
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::InvalidFileType);
}

#[tokio::test]
async fn missing_file_is_an_input_error() {
    let err = convert(&["/no/such/dir/x.png"], &ConversionConfig::default())
        .await
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::Input);
}

#[tokio::test]
async fn plan_layout_matches_documented_example() {
    let uri = format!("data:image/png;base64,{}", STANDARD.encode(png(100, 200)));
    let planned = plan_layout(&[uri], &ConversionConfig::default())
        .await
        .unwrap();

    assert_eq!(planned.len(), 1);
    let p = planned.placements[0];
    assert_close(p.scale, 5.5528);
    assert_close(p.height, 1110.56);
    assert_close(planned.total_height, 1150.56);
}

#[tokio::test]
async fn custom_geometry_is_respected() {
    let config = ConversionConfig::builder()
        .page_width(612.0)
        .margin(0.0)
        .spacing(0.0)
        .build()
        .unwrap();
    let recorder = RecordingAssembler::default();

    let output = convert_with_assembler(
        vec![png_source("a.png", 612, 100), png_source("b.png", 306, 50)],
        &config,
        recorder,
    )
    .await
    .unwrap();

    assert_close(output.layout.placements[1].y, 100.0);
    assert_close(output.layout.total_height, 200.0);
}

#[test]
fn layout_output_serialises_to_json() {
    let result = edgequake_img2pdf::layout(
        &[edgequake_img2pdf::ImageSize::new(10, 10)],
        &edgequake_img2pdf::LayoutConfig::default(),
    )
    .unwrap();
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["placements"][0]["index"], 0);
    assert!(json["total_height"].as_f64().unwrap() > 0.0);
}

#[test]
fn progress_tracker_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ProgressTracker>();
    assert_send_sync::<edgequake_img2pdf::NoopProgressCallback>();
}
