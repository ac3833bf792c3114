//! Template Engine - field placement and batch composition
//!
//! This crate provides:
//! - Template classification (PDF page or raster image) and size probing
//! - The field model: named, positioned, colored text placeholders
//! - Record tables validated against the field names
//! - Per-record page composition and whole-batch generation
//! - A session state machine driving the upload-to-download wizard
//!
//! # Example
//!
//! ```ignore
//! use template::{FieldUpdate, PdfProbe, Point, Session, TabularSource};
//!
//! let mut session = Session::new();
//! session.upload_template(template_bytes, "application/pdf", &PdfProbe)?;
//!
//! let id = session.add_field()?.id;
//! session.update_field(id, FieldUpdate::name("name").with_position(Point::new(120.0, 340.0)))?;
//! session.confirm_fields()?;
//!
//! session.load_records(table)?;
//! let artifact = session.generate()?;
//! ```

pub mod backend;
mod batch;
mod compose;
mod field;
pub mod geometry;
mod options;
mod records;
mod session;
mod template;

pub use backend::{ImageRef, PageRef, PdfBackend, PdfProbe, RenderBackend, TemplateProbe};
pub use batch::{generate, generate_with_backend, generate_with_progress, Artifact, BatchEvent};
pub use compose::Composer;
pub use field::{Field, FieldId, FieldSet, FieldUpdate, Rgb};
pub use geometry::{BaselineMode, Point};
pub use options::GenerateOptions;
pub use records::{Record, RecordSet, TabularSource};
pub use session::{Session, Stage, Summary};
pub use template::{DocumentInfo, MediaKind, Template};

use thiserror::Error;

/// Why a field name was rejected at submission
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldNameError {
    #[error("field {id} has an empty name")]
    Empty { id: FieldId },

    #[error("field name '{name}' is used more than once")]
    Duplicate { name: String },
}

/// Errors that can occur during template processing
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Unsupported template type: {0}")]
    UnsupportedTemplateType(String),

    #[error("Failed to decode template: {0}")]
    TemplateDecode(String),

    #[error("Data is missing required columns: {}", .0.join(", "))]
    MissingRequiredColumns(Vec<String>),

    #[error("Data contains no records")]
    EmptyDataSet,

    #[error("Invalid field name: {0}")]
    InvalidFieldName(#[from] FieldNameError),

    #[error("At least one field must be placed")]
    EmptyFieldSet,

    /// `record` is the 1-based position of the record in its table
    #[error("Failed to compose record {record}: {cause}")]
    Composition { record: usize, cause: String },

    #[error("Failed to serialize output: {0}")]
    Serialization(String),

    #[error("No template has been uploaded")]
    MissingTemplate,

    #[error("Unknown field: {0}")]
    UnknownField(FieldId),

    #[error("Invalid font size: {0}")]
    InvalidFontSize(u32),

    #[error("Invalid field position: ({x}, {y})")]
    InvalidPosition { x: f64, y: f64 },

    #[error("Font measurement unavailable: {0}")]
    MeasurementUnavailable(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Operation requires stage {expected}, but the session is at {actual}")]
    InvalidStage { expected: Stage, actual: Stage },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for template operations
pub type Result<T> = std::result::Result<T, TemplateError>;
