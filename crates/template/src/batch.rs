//! Batch generation
//!
//! Composes one page per record, in record order, into a single document.
//! The first failing record aborts the run and nothing is returned.

use crate::backend::{PdfBackend, RenderBackend};
use crate::compose::Composer;
use crate::field::FieldSet;
use crate::options::GenerateOptions;
use crate::records::RecordSet;
use crate::template::Template;
use crate::{Result, TemplateError};
use serde::Serialize;

/// Progress notifications emitted during a run
///
/// A successful run is bracketed by `Started` and `Finished`; a caller is
/// busy between the two or until the run returns an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BatchEvent {
    Started { total: usize },
    /// Record `index` (0-based) has its page
    Composed { index: usize, total: usize },
    Serializing,
    Finished { pages: usize },
}

/// The generated document
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

/// Generate the document with the built-in PDF backend
pub fn generate(
    template: &Template,
    fields: &FieldSet,
    records: &RecordSet,
    options: &GenerateOptions,
) -> Result<Artifact> {
    generate_with_progress(template, fields, records, options, |_| {})
}

/// Like [`generate`], reporting progress to `on_event`
pub fn generate_with_progress<F>(
    template: &Template,
    fields: &FieldSet,
    records: &RecordSet,
    options: &GenerateOptions,
    on_event: F,
) -> Result<Artifact>
where
    F: FnMut(&BatchEvent),
{
    let mut backend = PdfBackend::new();
    generate_with_backend(&mut backend, template, fields, records, options, on_event)
}

/// Generate the document into a caller-supplied backend
pub fn generate_with_backend<B, F>(
    backend: &mut B,
    template: &Template,
    fields: &FieldSet,
    records: &RecordSet,
    options: &GenerateOptions,
    mut on_event: F,
) -> Result<Artifact>
where
    B: RenderBackend + ?Sized,
    F: FnMut(&BatchEvent),
{
    fields.validate()?;
    if records.is_empty() {
        return Err(TemplateError::EmptyDataSet);
    }
    let missing = records.missing(&fields.names());
    if !missing.is_empty() {
        return Err(TemplateError::MissingRequiredColumns(missing));
    }

    let total = records.len();
    log::info!(
        "Generating {total} pages from a {} template with {} fields",
        template.kind(),
        fields.len()
    );
    on_event(&BatchEvent::Started { total });

    let composer = Composer::new(template, fields, options);
    for (index, record) in records.records().iter().enumerate() {
        if let Err(err) = composer.compose_one(record, index + 1, backend) {
            log::error!("Generation aborted: {err}");
            return Err(err);
        }
        log::debug!("Composed record {} of {total}", index + 1);
        on_event(&BatchEvent::Composed { index, total });
    }

    on_event(&BatchEvent::Serializing);
    let bytes = backend.serialize()?;
    let page_count = backend.page_count();

    log::info!("Generated {page_count} pages ({} bytes)", bytes.len());
    on_event(&BatchEvent::Finished { pages: page_count });

    Ok(Artifact {
        file_name: options.output_file_name.clone(),
        bytes,
        page_count,
    })
}
