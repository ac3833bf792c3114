//! Rendering service seam
//!
//! Composition talks to the output document only through
//! [`RenderBackend`], and template loading measures uploads only through
//! [`TemplateProbe`]. [`PdfBackend`] and [`PdfProbe`] implement both on
//! top of `pdf-core`.

use crate::template::DocumentInfo;
use crate::{Result, TemplateError};
use pdf_core::{BuiltinFont, Color, EmbeddedImage, ImageFormat, PdfDocument, PdfError};
use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

/// Handle to a page of the output document (1-indexed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageRef(pub usize);

/// Handle to an image embedded in the output document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageRef(pub usize);

/// Drawing and measuring operations the composition engine needs
///
/// Coordinates are PDF points with a bottom-left origin. Sizes are font
/// sizes in points. Colors are RGB channels in 0.0 - 1.0.
pub trait RenderBackend {
    /// Advance width of `text` at `size`
    fn measure_text_width(&self, text: &str, size: f64) -> Result<f64>;

    /// Line height (ascender to descender) at `size`
    fn measure_text_height(&self, size: f64) -> Result<f64>;

    /// Ascent at `size`
    fn measure_ascent(&self, size: f64) -> Result<f64>;

    /// Append a copy of page `page_index` (0-based) of a PDF
    fn copy_page_from(&mut self, source: &[u8], page_index: usize) -> Result<PageRef>;

    /// Embed a JPEG or PNG for later drawing
    fn embed_raster_image(&mut self, bytes: &[u8], format: ImageFormat) -> Result<ImageRef>;

    /// Append an empty page
    fn add_page(&mut self, width: f64, height: f64) -> Result<PageRef>;

    /// Paint an embedded image into a rectangle
    fn draw_image(
        &mut self,
        page: PageRef,
        image: ImageRef,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    ) -> Result<()>;

    /// Draw text with its baseline starting at `(x, y)`
    fn draw_text(
        &mut self,
        page: PageRef,
        text: &str,
        x: f64,
        y: f64,
        size: f64,
        color: [f32; 3],
    ) -> Result<()>;

    /// Pages in the output document so far
    fn page_count(&self) -> usize;

    /// Finish the output document
    fn serialize(&mut self) -> Result<Vec<u8>>;
}

/// Size measurements taken when a template is uploaded
pub trait TemplateProbe {
    /// Page count and first-page size of a PDF
    fn document_info(&self, bytes: &[u8]) -> Result<DocumentInfo>;

    /// Pixel width and height of an image
    fn image_size(&self, bytes: &[u8], format: ImageFormat) -> Result<(f64, f64)>;
}

/// Probe backed by `pdf-core`
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfProbe;

impl TemplateProbe for PdfProbe {
    fn document_info(&self, bytes: &[u8]) -> Result<DocumentInfo> {
        let doc = PdfDocument::open_from_bytes(bytes).map_err(decode_error)?;
        let page_count = doc.page_count();
        if page_count == 0 {
            return Ok(DocumentInfo {
                page_count,
                width: 0.0,
                height: 0.0,
            });
        }

        let (width, height) = doc.page_size(1).map_err(decode_error)?;
        Ok(DocumentInfo {
            page_count,
            width,
            height,
        })
    }

    fn image_size(&self, bytes: &[u8], format: ImageFormat) -> Result<(f64, f64)> {
        check_image_format(bytes, format)?;
        let dimensions = pdf_core::get_dimensions(bytes).map_err(decode_error)?;
        Ok((dimensions.width as f64, dimensions.height as f64))
    }
}

/// Rendering service writing a PDF with `pdf-core`
///
/// All text is set in Helvetica. Template documents are parsed once and
/// reused for every copied page.
pub struct PdfBackend {
    doc: PdfDocument,
    font: BuiltinFont,
    /// Parsed source documents by content hash
    sources: BTreeMap<u64, PdfDocument>,
    /// Embedded images, indexed by [`ImageRef`]
    images: Vec<EmbeddedImage>,
}

impl PdfBackend {
    /// Backend writing into a new, empty document
    pub fn new() -> Self {
        Self {
            doc: PdfDocument::new(),
            font: BuiltinFont::Helvetica,
            sources: BTreeMap::new(),
            images: Vec::new(),
        }
    }

    fn font_size(size: f64) -> Result<f64> {
        if size.is_finite() && size > 0.0 {
            Ok(size)
        } else {
            Err(TemplateError::MeasurementUnavailable(format!(
                "font size {size} is not positive"
            )))
        }
    }
}

impl Default for PdfBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderBackend for PdfBackend {
    fn measure_text_width(&self, text: &str, size: f64) -> Result<f64> {
        self.font
            .text_width_points(text, Self::font_size(size)?)
            .map_err(render_error)
    }

    fn measure_text_height(&self, size: f64) -> Result<f64> {
        Ok(self.font.height_at_size(Self::font_size(size)?))
    }

    fn measure_ascent(&self, size: f64) -> Result<f64> {
        Ok(self.font.ascent_at_size(Self::font_size(size)?))
    }

    fn copy_page_from(&mut self, source: &[u8], page_index: usize) -> Result<PageRef> {
        let mut hasher = DefaultHasher::new();
        source.hash(&mut hasher);
        let key = hasher.finish();

        if !self.sources.contains_key(&key) {
            let parsed = PdfDocument::open_from_bytes(source).map_err(decode_error)?;
            self.sources.insert(key, parsed);
        }

        let source_doc = self
            .sources
            .get(&key)
            .ok_or_else(|| TemplateError::TemplateDecode("source document missing".to_string()))?;
        let page = self
            .doc
            .import_page(source_doc, page_index + 1)
            .map_err(decode_error)?;
        Ok(PageRef(page))
    }

    fn embed_raster_image(&mut self, bytes: &[u8], format: ImageFormat) -> Result<ImageRef> {
        check_image_format(bytes, format)?;
        let image = self.doc.embed_image(bytes).map_err(decode_error)?;

        // Identical bytes come back as the same object; reuse its handle
        if let Some(index) = self.images.iter().position(|i| *i == image) {
            return Ok(ImageRef(index));
        }
        self.images.push(image);
        Ok(ImageRef(self.images.len() - 1))
    }

    fn add_page(&mut self, width: f64, height: f64) -> Result<PageRef> {
        let page = self.doc.add_page(width, height).map_err(render_error)?;
        Ok(PageRef(page))
    }

    fn draw_image(
        &mut self,
        page: PageRef,
        image: ImageRef,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    ) -> Result<()> {
        let embedded = *self
            .images
            .get(image.0)
            .ok_or_else(|| TemplateError::Render(format!("unknown image handle {}", image.0)))?;
        self.doc
            .place_image(&embedded, page.0, x, y, width, height)
            .map_err(render_error)
    }

    fn draw_text(
        &mut self,
        page: PageRef,
        text: &str,
        x: f64,
        y: f64,
        size: f64,
        color: [f32; 3],
    ) -> Result<()> {
        let [r, g, b] = color;
        self.doc.set_font(self.font, Self::font_size(size)? as f32);
        self.doc.set_text_color(Color::rgb(r, g, b));
        self.doc
            .insert_text(text, page.0, x, y)
            .map_err(render_error)
    }

    fn page_count(&self) -> usize {
        self.doc.page_count()
    }

    fn serialize(&mut self) -> Result<Vec<u8>> {
        let bytes = self
            .doc
            .to_bytes()
            .map_err(|e| TemplateError::Serialization(e.to_string()))?;
        log::debug!("Serialized {} pages into {} bytes", self.page_count(), bytes.len());
        Ok(bytes)
    }
}

/// Reject image bytes whose content does not match the declared format
fn check_image_format(bytes: &[u8], format: ImageFormat) -> Result<()> {
    let detected = pdf_core::detect_format(bytes).map_err(decode_error)?;
    if detected != format {
        return Err(TemplateError::TemplateDecode(format!(
            "declared {format:?} image contains {detected:?} data"
        )));
    }
    Ok(())
}

fn decode_error(err: PdfError) -> TemplateError {
    TemplateError::TemplateDecode(err.to_string())
}

fn render_error(err: PdfError) -> TemplateError {
    TemplateError::Render(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut buffer = Vec::new();
        image::DynamicImage::new_rgb8(width, height)
            .write_to(&mut std::io::Cursor::new(&mut buffer), image::ImageFormat::Png)
            .unwrap();
        buffer
    }

    #[test]
    fn test_image_size_read_from_header() {
        let size = PdfProbe.image_size(&png(200, 300), ImageFormat::Png).unwrap();
        assert_eq!(size, (200.0, 300.0));
    }

    #[test]
    fn test_mismatched_image_format_rejected() {
        let result = PdfProbe.image_size(&png(2, 2), ImageFormat::Jpeg);
        assert!(matches!(result, Err(TemplateError::TemplateDecode(_))));
    }

    #[test]
    fn test_corrupt_pdf_rejected() {
        let result = PdfProbe.document_info(b"%PDF-1.7 truncated");
        assert!(matches!(result, Err(TemplateError::TemplateDecode(_))));
    }

    #[test]
    fn test_measurements() {
        let backend = PdfBackend::new();
        assert!((backend.measure_text_height(20.0).unwrap() - 18.5).abs() < 1e-9);
        assert!((backend.measure_ascent(20.0).unwrap() - 14.36).abs() < 1e-9);
        assert!((backend.measure_text_width("Hello", 10.0).unwrap() - 22.78).abs() < 1e-9);
        // Single precision would be off by about 1e-6 here
        assert!((backend.measure_text_height(16.0).unwrap() - 14.8).abs() < 1e-12);
    }

    #[test]
    fn test_measure_unencodable_text_fails() {
        let backend = PdfBackend::new();
        assert!(matches!(
            backend.measure_text_width("你好", 12.0),
            Err(TemplateError::Render(_))
        ));
    }

    #[test]
    fn test_measure_invalid_size_fails() {
        let backend = PdfBackend::new();
        assert!(matches!(
            backend.measure_text_height(f64::NAN),
            Err(TemplateError::MeasurementUnavailable(_))
        ));
    }

    #[test]
    fn test_embed_same_image_reuses_handle() {
        let bytes = png(4, 4);
        let mut backend = PdfBackend::new();
        let first = backend.embed_raster_image(&bytes, ImageFormat::Png).unwrap();
        let second = backend.embed_raster_image(&bytes, ImageFormat::Png).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_add_page_and_serialize() {
        let mut backend = PdfBackend::new();
        let page = backend.add_page(200.0, 300.0).unwrap();
        backend
            .draw_text(page, "Hi", 10.0, 20.0, 12.0, [0.0, 0.0, 0.0])
            .unwrap();

        assert_eq!(page, PageRef(1));
        assert_eq!(backend.page_count(), 1);
        let bytes = backend.serialize().unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
    }
}
