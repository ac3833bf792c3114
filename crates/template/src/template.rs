//! Template classification

use crate::backend::TemplateProbe;
use crate::{Result, TemplateError};
use pdf_core::ImageFormat;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Media type of PDF templates
const PDF_MIME: &str = "application/pdf";

/// What kind of surface a template is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MediaKind {
    /// A PDF; its first page is copied for every record
    PagedDocument,
    /// A PNG or JPEG painted full-bleed on a page of its pixel size
    RasterImage,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::PagedDocument => write!(f, "PDF document"),
            MediaKind::RasterImage => write!(f, "image"),
        }
    }
}

/// Page count and first-page size of a PDF template
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DocumentInfo {
    pub page_count: usize,
    pub width: f64,
    pub height: f64,
}

/// An uploaded template, immutable once loaded
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    bytes: Vec<u8>,
    mime: String,
    kind: MediaKind,
    width: f64,
    height: f64,
}

impl Template {
    /// Classify uploaded bytes by their declared media type and probe
    /// their native size
    ///
    /// PDFs are measured by their first page; images by their pixels,
    /// one pixel per point.
    pub fn load(bytes: Vec<u8>, mime: &str, probe: &impl TemplateProbe) -> Result<Self> {
        let kind = classify(mime)?;

        let (width, height) = match kind {
            MediaKind::PagedDocument => {
                let info = probe.document_info(&bytes)?;
                if info.page_count == 0 {
                    return Err(TemplateError::TemplateDecode(
                        "PDF has no pages".to_string(),
                    ));
                }
                if info.page_count > 1 {
                    log::warn!(
                        "Template has {} pages; only the first page is used",
                        info.page_count
                    );
                }
                (info.width, info.height)
            }
            MediaKind::RasterImage => {
                let format = ImageFormat::from_mime(mime)
                    .ok_or_else(|| TemplateError::UnsupportedTemplateType(mime.to_string()))?;
                probe.image_size(&bytes, format)?
            }
        };

        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(width) || !positive(height) {
            return Err(TemplateError::TemplateDecode(format!(
                "template size {width} x {height} is not positive"
            )));
        }

        log::debug!("Loaded {kind} template ({mime}), {width} x {height}");

        Ok(Self {
            bytes,
            mime: mime.trim().to_ascii_lowercase(),
            kind,
            width,
            height,
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Declared media type, normalized to lowercase
    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    /// Raster format, for image templates
    pub fn image_format(&self) -> Option<ImageFormat> {
        match self.kind {
            MediaKind::PagedDocument => None,
            MediaKind::RasterImage => ImageFormat::from_mime(&self.mime),
        }
    }

    /// Native width in points (pixels for images)
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Native height in points (pixels for images)
    pub fn height(&self) -> f64 {
        self.height
    }
}

/// Map a declared media type to a template kind
fn classify(mime: &str) -> Result<MediaKind> {
    if mime.trim().eq_ignore_ascii_case(PDF_MIME) {
        Ok(MediaKind::PagedDocument)
    } else if ImageFormat::from_mime(mime).is_some() {
        Ok(MediaKind::RasterImage)
    } else {
        Err(TemplateError::UnsupportedTemplateType(mime.to_string()))
    }
}
