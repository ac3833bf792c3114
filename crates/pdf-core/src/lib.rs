//! PDF Core - Low-level PDF manipulation
//!
//! This crate provides functionality for:
//! - Creating output documents and opening template documents from bytes
//! - Importing a page from one document into another
//! - Adding sized pages and painting JPEG/PNG images on them
//! - Drawing and measuring text in the built-in Helvetica face
//!
//! # Example
//!
//! ```ignore
//! use pdf_core::{BuiltinFont, Color, PdfDocument};
//!
//! let template = PdfDocument::open_from_bytes(&template_bytes)?;
//! let mut doc = PdfDocument::new();
//! let page = doc.import_page(&template, 1)?;
//! doc.set_font(BuiltinFont::Helvetica, 16.0);
//! doc.set_text_color(Color::from_rgb(0, 0, 0));
//! doc.insert_text("Hello, World!", page, 100.0, 700.0)?;
//! let bytes = doc.to_bytes()?;
//! ```

mod copy;
mod document;
mod font;
mod image;
mod text;

pub use document::{Color, EmbeddedImage, PdfDocument};
pub use font::BuiltinFont;
pub use image::{detect_format, get_dimensions, ImageDimensions, ImageFormat};

use thiserror::Error;

/// Errors that can occur during PDF operations
#[derive(Debug, Error)]
pub enum PdfError {
    #[error("Failed to open PDF: {0}")]
    OpenError(String),

    #[error("Failed to save PDF: {0}")]
    SaveError(String),

    #[error("Invalid page number: {0} (document has {1} pages)")]
    InvalidPage(usize, usize),

    #[error("Image error: {0}")]
    ImageError(String),

    #[error("PDF parsing error: {0}")]
    ParseError(String),

    #[error("Character {0:?} cannot be encoded in WinAnsi")]
    UnencodableChar(char),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Lopdf error: {0}")]
    LopdfError(#[from] lopdf::Error),
}

/// Result type for PDF operations
pub type Result<T> = std::result::Result<T, PdfError>;
