//! Built-in (standard 14) font handling
//!
//! Output documents draw every field in one fixed face that PDF viewers
//! ship with, so no font program is embedded. Text is encoded with
//! WinAnsiEncoding and measured with the face's AFM advance widths.

use crate::{PdfError, Result};
use lopdf::{Dictionary, Object};

/// Code points for the WinAnsi bytes 0x80..=0x9F (0 = undefined)
const WIN_ANSI_HIGH: [u32; 32] = [
    0x20AC, 0, 0x201A, 0x0192, 0x201E, 0x2026, 0x2020, 0x2021, //
    0x02C6, 0x2030, 0x0160, 0x2039, 0x0152, 0, 0x017D, 0, //
    0, 0x2018, 0x2019, 0x201C, 0x201D, 0x2022, 0x2013, 0x2014, //
    0x02DC, 0x2122, 0x0161, 0x203A, 0x0153, 0, 0x017E, 0x0178,
];

/// Helvetica advance widths (1/1000 em) for WinAnsi bytes 0x20..=0xFF
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 224] = [
    // 0x20
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    // 0x30
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    // 0x40
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    // 0x50
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    // 0x60
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    // 0x70
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, 0,
    // 0x80
    556, 0, 222, 556, 333, 1000, 556, 556, 333, 1000, 667, 333, 1000, 0, 611, 0,
    // 0x90
    0, 222, 222, 333, 333, 350, 556, 1000, 333, 1000, 500, 333, 944, 0, 500, 667,
    // 0xA0
    278, 333, 556, 556, 556, 556, 260, 556, 333, 737, 370, 556, 584, 333, 737, 333,
    // 0xB0
    400, 584, 333, 333, 333, 556, 537, 278, 333, 333, 365, 556, 834, 834, 834, 611,
    // 0xC0
    667, 667, 667, 667, 667, 667, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278,
    // 0xD0
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611,
    // 0xE0
    556, 556, 556, 556, 556, 556, 889, 500, 556, 556, 556, 556, 278, 278, 278, 278,
    // 0xF0
    556, 556, 556, 556, 556, 556, 556, 584, 611, 556, 556, 556, 556, 500, 556, 500,
];

/// A standard font every conforming PDF reader provides
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum BuiltinFont {
    #[default]
    Helvetica,
}

impl BuiltinFont {
    /// PostScript name written as /BaseFont
    pub fn base_font(&self) -> &'static str {
        match self {
            BuiltinFont::Helvetica => "Helvetica",
        }
    }

    /// Ascender in font units (1/1000 em)
    pub fn ascender(&self) -> i16 {
        match self {
            BuiltinFont::Helvetica => 718,
        }
    }

    /// Descender in font units (1/1000 em)
    pub fn descender(&self) -> i16 {
        match self {
            BuiltinFont::Helvetica => -207,
        }
    }

    fn widths(&self) -> &'static [u16; 224] {
        match self {
            BuiltinFont::Helvetica => &HELVETICA_WIDTHS,
        }
    }

    /// Encode text as WinAnsi bytes
    ///
    /// Fails on the first character the encoding has no byte for.
    pub fn encode(&self, text: &str) -> Result<Vec<u8>> {
        text.chars()
            .map(|c| win_ansi_byte(c).ok_or(PdfError::UnencodableChar(c)))
            .collect()
    }

    /// Width of encoded bytes in font units
    fn encoded_width(&self, bytes: &[u8]) -> u32 {
        let widths = self.widths();
        bytes
            .iter()
            .map(|&b| {
                if b < 0x20 {
                    0
                } else {
                    widths[(b - 0x20) as usize] as u32
                }
            })
            .sum()
    }

    /// Calculate text width in points for a given font size
    pub fn text_width_points(&self, text: &str, font_size: f64) -> Result<f64> {
        let bytes = self.encode(text)?;
        Ok(self.encoded_width(&bytes) as f64 / 1000.0 * font_size)
    }

    /// Full line height (ascender to descender) at the given size
    pub fn height_at_size(&self, font_size: f64) -> f64 {
        (self.ascender() as f64 - self.descender() as f64) / 1000.0 * font_size
    }

    /// Distance from the top of the line box to the baseline at the given size
    pub fn ascent_at_size(&self, font_size: f64) -> f64 {
        self.ascender() as f64 / 1000.0 * font_size
    }

    /// Font dictionary referenced from page resources
    pub fn to_pdf_dictionary(&self) -> Dictionary {
        Dictionary::from_iter(vec![
            ("Type", "Font".into()),
            ("Subtype", "Type1".into()),
            ("BaseFont", Object::Name(self.base_font().as_bytes().to_vec())),
            ("Encoding", "WinAnsiEncoding".into()),
        ])
    }
}

/// Map a character to its WinAnsiEncoding byte
fn win_ansi_byte(c: char) -> Option<u8> {
    let code = c as u32;
    match code {
        0x20..=0x7E | 0xA0..=0xFF => Some(code as u8),
        _ => WIN_ANSI_HIGH
            .iter()
            .position(|&mapped| mapped != 0 && mapped == code)
            .map(|i| 0x80 + i as u8),
    }
}
