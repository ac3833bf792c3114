//! Field model

use crate::geometry::Point;
use crate::{FieldNameError, Result, TemplateError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Position of a newly added field
pub const DEFAULT_POSITION: Point = Point { x: 20.0, y: 20.0 };

/// Font size of a newly added field
pub const DEFAULT_FONT_SIZE: u32 = 16;

/// Prefix of auto-generated field names
const DEFAULT_NAME_PREFIX: &str = "new_field_";

/// Identifier of a field, unique within its set
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldId(u64);

impl FieldId {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl From<u64> for FieldId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 8-bit RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Black color
    pub fn black() -> Self {
        Self::default()
    }

    /// Parse `#rrggbb` (the leading `#` is optional)
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Self {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        })
    }

    /// Format as lowercase `#rrggbb`
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Channels scaled to 0.0 - 1.0
    pub fn to_unit(&self) -> [f32; 3] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        ]
    }
}

/// A named text placeholder placed on the template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub id: FieldId,
    /// Display name, also the column looked up in each record
    pub name: String,
    /// Top-left corner of the text box in reference units
    pub position: Point,
    pub font_size: u32,
    pub color: Rgb,
}

/// Partial update of a field; `None` leaves an attribute unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldUpdate {
    pub name: Option<String>,
    pub position: Option<Point>,
    pub font_size: Option<u32>,
    pub color: Option<Rgb>,
}

impl FieldUpdate {
    /// Update that only renames
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Update that only moves
    pub fn position(position: Point) -> Self {
        Self {
            position: Some(position),
            ..Self::default()
        }
    }

    pub fn with_position(mut self, position: Point) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_font_size(mut self, font_size: u32) -> Self {
        self.font_size = Some(font_size);
        self
    }

    pub fn with_color(mut self, color: Rgb) -> Self {
        self.color = Some(color);
        self
    }
}

/// The ordered set of fields placed on a template
///
/// Names are free-form while editing; [`FieldSet::validate`] enforces
/// that they are non-empty and unique before records are loaded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSet {
    fields: Vec<Field>,
    /// Next identifier to hand out; never decreases
    next_id: u64,
}

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field with default attributes and a fresh unused name
    pub fn add(&mut self) -> &Field {
        self.next_id += 1;
        let id = FieldId(self.next_id);

        let mut n = self.fields.len() + 1;
        let name = loop {
            let candidate = format!("{DEFAULT_NAME_PREFIX}{n}");
            if !self.fields.iter().any(|f| f.name == candidate) {
                break candidate;
            }
            n += 1;
        };

        let index = self.fields.len();
        self.fields.push(Field {
            id,
            name,
            position: DEFAULT_POSITION,
            font_size: DEFAULT_FONT_SIZE,
            color: Rgb::black(),
        });
        &self.fields[index]
    }

    /// Apply a partial update to one field
    pub fn update(&mut self, id: FieldId, update: FieldUpdate) -> Result<&Field> {
        if update.font_size == Some(0) {
            return Err(TemplateError::InvalidFontSize(0));
        }
        if let Some(position) = update.position {
            position.checked()?;
        }

        let field = self
            .fields
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or(TemplateError::UnknownField(id))?;

        if let Some(name) = update.name {
            field.name = name;
        }
        if let Some(position) = update.position {
            field.position = position;
        }
        if let Some(font_size) = update.font_size {
            field.font_size = font_size;
        }
        if let Some(color) = update.color {
            field.color = color;
        }

        Ok(field)
    }

    /// Remove one field, returning it
    pub fn remove(&mut self, id: FieldId) -> Result<Field> {
        let index = self
            .fields
            .iter()
            .position(|f| f.id == id)
            .ok_or(TemplateError::UnknownField(id))?;
        Ok(self.fields.remove(index))
    }

    pub fn get(&self, id: FieldId) -> Option<&Field> {
        self.fields.iter().find(|f| f.id == id)
    }

    /// Fields in the order they were added
    pub fn list(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field names in field order
    pub fn names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Check the set is ready for data upload
    ///
    /// Requires at least one field, no blank names and no name used
    /// twice (case-sensitive). Reports the first violation in field order.
    pub fn validate(&self) -> Result<()> {
        if self.fields.is_empty() {
            return Err(TemplateError::EmptyFieldSet);
        }

        let mut seen = BTreeSet::new();
        for field in &self.fields {
            if field.name.trim().is_empty() {
                return Err(FieldNameError::Empty { id: field.id }.into());
            }
            if !seen.insert(field.name.as_str()) {
                return Err(FieldNameError::Duplicate {
                    name: field.name.clone(),
                }
                .into());
            }
        }

        Ok(())
    }

    /// Export the layout as JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.fields)?)
    }

    /// Import a layout exported by [`FieldSet::to_json`]
    ///
    /// Fields keep their order but get fresh identifiers. Names are not
    /// validated here; a zero font size or a non-finite position is
    /// rejected.
    pub fn from_json(json: &str) -> Result<Self> {
        let imported: Vec<Field> = serde_json::from_str(json)?;

        let mut set = FieldSet::new();
        for mut field in imported {
            if field.font_size == 0 {
                return Err(TemplateError::InvalidFontSize(0));
            }
            field.position.checked()?;
            set.next_id += 1;
            field.id = FieldId(set.next_id);
            set.fields.push(field);
        }
        Ok(set)
    }
}
