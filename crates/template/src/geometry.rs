//! Coordinate mapping between the editor and the template
//!
//! Field positions are stored in reference units: the template's own
//! width and height, measured from its top-left corner. The editor shows
//! the template scaled to fit its container, so positions are multiplied
//! by the scale factor on the way to the screen and divided by it on the
//! way back. Rendering flips the y axis to the bottom-left origin of a
//! PDF page and drops from the top of the text box to its baseline.

use crate::{Result, TemplateError};
use serde::{Deserialize, Serialize};

/// Approximate baseline drop as a fraction of the font's line height
pub const BASELINE_DIVISOR: f64 = 1.5;

/// A point in either coordinate space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// This point, or an error if either coordinate is NaN or infinite
    pub fn checked(self) -> Result<Self> {
        if self.is_finite() {
            Ok(self)
        } else {
            Err(TemplateError::InvalidPosition {
                x: self.x,
                y: self.y,
            })
        }
    }
}

/// How the baseline is placed below a field's top edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BaselineMode {
    /// Line height divided by [`BASELINE_DIVISOR`]; matches earlier output
    #[default]
    Approximate,
    /// The face's real ascent at the field's size
    Ascent,
}

/// A measured baseline drop, tagged with the metric it came from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Baseline {
    /// Full line height of the font at the field's size
    FontHeight(f64),
    /// Ascent of the font at the field's size
    Ascent(f64),
}

impl Baseline {
    /// Distance from the top of the text box down to the baseline
    ///
    /// Fails when the measurement is not a finite, non-negative number,
    /// since a defaulted value would shift every output page.
    pub fn offset(&self) -> Result<f64> {
        let (metric, value) = match *self {
            Baseline::FontHeight(height) => ("font height", height),
            Baseline::Ascent(ascent) => ("font ascent", ascent),
        };

        if !value.is_finite() || value < 0.0 {
            return Err(TemplateError::MeasurementUnavailable(format!(
                "{metric} is {value}"
            )));
        }

        Ok(match self {
            Baseline::FontHeight(_) => value / BASELINE_DIVISOR,
            Baseline::Ascent(_) => value,
        })
    }
}

/// Map a stored field position to the baseline origin on a PDF page
///
/// x is unchanged; y is flipped against the page height and lowered by
/// the baseline drop.
pub fn to_native(position: Point, page_height: f64, baseline: Baseline) -> Result<Point> {
    Point {
        x: position.x,
        y: page_height - position.y - baseline.offset()?,
    }
    .checked()
}

/// Ratio of the on-screen preview width to the template's native width
///
/// Returns `None` when either width is not a positive number.
pub fn scale_factor(preview_width: f64, native_width: f64) -> Option<f64> {
    let valid = |w: f64| w.is_finite() && w > 0.0;
    if valid(preview_width) && valid(native_width) {
        Some(preview_width / native_width)
    } else {
        None
    }
}

/// Stored position to on-screen pixels
pub fn to_display(point: Point, scale: f64) -> Point {
    Point {
        x: point.x * scale,
        y: point.y * scale,
    }
}

/// On-screen pixels to stored position
///
/// Drag handlers convert pointer positions with this before updating a
/// field, so stored positions never depend on the current viewport.
pub fn from_display(point: Point, scale: f64) -> Point {
    Point {
        x: point.x / scale,
        y: point.y / scale,
    }
}

/// Font size in on-screen pixels
pub fn display_font_size(font_size: u32, scale: f64) -> f64 {
    font_size as f64 * scale
}
