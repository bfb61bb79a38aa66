//! Document assembly: turn placements into PDF bytes.
//!
//! The PDF encoder sits behind the [`DocumentAssembler`] trait. The pipeline
//! only promises the call sequence: one `begin_document`, one `place_image`
//! per placement in input order, one `finalize`. How the bytes are encoded is
//! up to the implementation. [`PdfAssembler`] is the built-in one, backed by
//! `printpdf`.
//!
//! ## Image formats
//!
//! `place_image` receives the format detected from the bytes, never a guess.
//! `PdfAssembler` decodes every image with that format and embeds raw RGB
//! pixels, compositing any alpha channel onto white (the page colour). PNGs
//! with transparency therefore come out as they look on screen, and no source
//! is ever passed through as if it were a JPEG.

use crate::error::Img2PdfError;
use crate::pipeline::layout::LayoutResult;
use crate::pipeline::load::SourceImage;
use crate::progress::ProgressReporter;
use image::{DynamicImage, ImageFormat, RgbImage};
use printpdf::{
    Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Pt, RawImage, RawImageData,
    RawImageFormat, Rect, XObjectTransform,
};
use tracing::{debug, info, instrument, warn};

/// Receives the drawing commands for one single-page document.
///
/// Coordinates are in points with a top-left origin, exactly as produced by
/// [`crate::pipeline::layout::layout`].
pub trait DocumentAssembler: Send {
    /// Start a document with one page of the given size.
    fn begin_document(&mut self, page_width: f64, page_height: f64) -> Result<(), Img2PdfError>;

    /// Draw one encoded image into the rectangle `(x, y, width, height)`.
    fn place_image(
        &mut self,
        bytes: &[u8],
        format: ImageFormat,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    ) -> Result<(), Img2PdfError>;

    /// Finish the document and return its bytes.
    fn finalize(&mut self) -> Result<Vec<u8>, Img2PdfError>;
}

/// Feed `layout` to `assembler`, reporting progress after each image.
///
/// Images are looked up by [`crate::pipeline::layout::Placement::index`], so
/// `images` must be the batch the layout was computed from.
pub fn assemble<A: DocumentAssembler + ?Sized>(
    assembler: &mut A,
    images: &[SourceImage],
    layout: &LayoutResult,
    reporter: &ProgressReporter,
) -> Result<Vec<u8>, Img2PdfError> {
    if images.len() != layout.len() {
        return Err(Img2PdfError::Internal(format!(
            "layout has {} placements for {} images",
            layout.len(),
            images.len()
        )));
    }

    assembler.begin_document(layout.page_width, layout.total_height)?;

    for placement in &layout.placements {
        let image = images.get(placement.index).ok_or_else(|| {
            Img2PdfError::Internal(format!("no image for placement {}", placement.index))
        })?;
        assembler.place_image(
            &image.bytes,
            image.format,
            placement.x,
            placement.y,
            placement.width,
            placement.height,
        )?;
        reporter.placed(placement.index);
    }

    assembler.finalize()
}

/// Largest page side, in points, that PDF 1.x viewers are required to render.
///
/// Taller pages are still written; many viewers clip or refuse them.
pub const MAX_VIEWER_PAGE_POINTS: f64 = 14_400.0;

/// At 72 DPI one image pixel maps to one point, so the transform scale is
/// simply `target_points / pixels`.
const EMBED_DPI: f32 = 72.0;

struct PendingImage {
    raw: RawImage,
    pixel_width: u32,
    pixel_height: u32,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

/// [`DocumentAssembler`] that writes a PDF with `printpdf`.
///
/// Images are decoded as they are placed; the `printpdf` document itself is
/// only built in [`DocumentAssembler::finalize`].
pub struct PdfAssembler {
    title: String,
    page: Option<(f64, f64)>,
    pending: Vec<PendingImage>,
    finished: bool,
}

impl PdfAssembler {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            page: None,
            pending: Vec::new(),
            finished: false,
        }
    }

    fn page_size(&self) -> Result<(f64, f64), Img2PdfError> {
        if self.finished {
            return Err(Img2PdfError::Assembly(
                "document has already been finalized".into(),
            ));
        }
        self.page
            .ok_or_else(|| Img2PdfError::Assembly("begin_document was not called".into()))
    }
}

impl DocumentAssembler for PdfAssembler {
    fn begin_document(&mut self, page_width: f64, page_height: f64) -> Result<(), Img2PdfError> {
        if self.page.is_some() || self.finished {
            return Err(Img2PdfError::Assembly(
                "begin_document called twice".into(),
            ));
        }
        if !(page_width > 0.0 && page_height > 0.0) {
            return Err(Img2PdfError::Assembly(format!(
                "invalid page size {page_width}x{page_height} pt"
            )));
        }
        if page_width > MAX_VIEWER_PAGE_POINTS || page_height > MAX_VIEWER_PAGE_POINTS {
            warn!(
                page_width,
                page_height,
                limit = MAX_VIEWER_PAGE_POINTS,
                "Page exceeds the PDF viewer size limit; some viewers will clip it"
            );
        }
        info!(page_width, page_height, title = %self.title, "Creating PDF");
        self.page = Some((page_width, page_height));
        Ok(())
    }

    #[instrument(skip(self, bytes), fields(bytes_len = bytes.len()))]
    fn place_image(
        &mut self,
        bytes: &[u8],
        format: ImageFormat,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    ) -> Result<(), Img2PdfError> {
        self.page_size()?;

        let decoded = image::load_from_memory_with_format(bytes, format).map_err(|e| {
            Img2PdfError::Assembly(format!("failed to decode {format:?} image: {e}"))
        })?;
        let rgb = flatten_onto_white(decoded);
        let (pixel_width, pixel_height) = rgb.dimensions();

        let raw = RawImage {
            pixels: RawImageData::U8(rgb.into_raw()),
            width: pixel_width as usize,
            height: pixel_height as usize,
            data_format: RawImageFormat::RGB8,
            tag: Vec::new(),
        };

        self.pending.push(PendingImage {
            raw,
            pixel_width,
            pixel_height,
            x,
            y,
            width,
            height,
        });
        Ok(())
    }

    fn finalize(&mut self) -> Result<Vec<u8>, Img2PdfError> {
        let (page_width, page_height) = self.page_size()?;
        self.finished = true;

        let mut doc = PdfDocument::new(&self.title);
        let mut ops: Vec<Op> = Vec::with_capacity(self.pending.len());
        let media_height = serialized_extent(page_height);

        for img in self.pending.drain(..) {
            let xobject_id = doc.add_image(&img.raw);
            let bottom = pdf_bottom(media_height, img.y, img.height);
            ops.push(Op::UseXobject {
                id: xobject_id,
                transform: XObjectTransform {
                    translate_x: Some(Pt(img.x as f32)),
                    translate_y: Some(Pt(bottom as f32)),
                    scale_x: Some((img.width / f64::from(img.pixel_width)) as f32),
                    scale_y: Some((img.height / f64::from(img.pixel_height)) as f32),
                    dpi: Some(EMBED_DPI),
                    rotate: None,
                },
            });
        }

        let page = build_page(page_width, page_height, ops);
        doc.with_pages(vec![page]);

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let output = doc.save(&PdfSaveOptions::default(), &mut warnings);
        debug!(
            bytes = output.len(),
            warnings = warnings.len(),
            "PDF serialised"
        );

        if output.is_empty() {
            return Err(Img2PdfError::Assembly("printpdf produced no output".into()));
        }
        Ok(output)
    }
}

/// printpdf writes page boxes in whole points.
fn serialized_extent(points: f64) -> f64 {
    points.round()
}

/// Bottom-left y of a rectangle `y` points below the top of a page whose
/// written height is `media_height`. PDF user space starts at the bottom.
fn pdf_bottom(media_height: f64, y: f64, height: f64) -> f64 {
    media_height - y - height
}

/// The single page, with its boxes set in points rather than via millimetres.
fn build_page(page_width: f64, page_height: f64, ops: Vec<Op>) -> PdfPage {
    let mut page = PdfPage::new(Mm(0.0), Mm(0.0), ops);
    let bounds = Rect::from_wh(Pt(page_width as f32), Pt(page_height as f32));
    page.media_box = bounds.clone();
    page.trim_box = bounds.clone();
    page.crop_box = bounds;
    page
}

/// Convert to RGB8, blending any alpha channel over a white background.
fn flatten_onto_white(img: DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }
    let rgba = img.to_rgba8();
    let (w, h) = rgba.dimensions();
    RgbImage::from_fn(w, h, |px, py| {
        let [r, g, b, a] = rgba.get_pixel(px, py).0;
        let a = u16::from(a);
        let blend = |c: u8| ((u16::from(c) * a + 255 * (255 - a) + 127) / 255) as u8;
        image::Rgb([blend(r), blend(g), blend(b)])
    })
}
