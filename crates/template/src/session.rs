//! Wizard session state
//!
//! A session walks one template through field placement, data upload and
//! review to a generated document. Each operation belongs to a stage and
//! fails with [`TemplateError::InvalidStage`] anywhere else.

use crate::backend::TemplateProbe;
use crate::batch::{self, Artifact, BatchEvent};
use crate::field::{Field, FieldId, FieldSet, FieldUpdate};
use crate::options::GenerateOptions;
use crate::records::{RecordSet, TabularSource};
use crate::template::{MediaKind, Template};
use crate::{Result, TemplateError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Wizard steps, in order
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    #[default]
    Upload,
    PlaceFields,
    UploadData,
    Review,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Upload => "upload",
            Stage::PlaceFields => "place fields",
            Stage::UploadData => "upload data",
            Stage::Review => "review",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// What the review step shows before generating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub template_kind: Option<MediaKind>,
    pub field_count: usize,
    pub record_count: usize,
}

/// One run of the wizard
#[derive(Debug, Default)]
pub struct Session {
    stage: Stage,
    template: Option<Template>,
    fields: FieldSet,
    records: Option<RecordSet>,
    options: GenerateOptions,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: GenerateOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn template(&self) -> Option<&Template> {
        self.template.as_ref()
    }

    pub fn fields(&self) -> &FieldSet {
        &self.fields
    }

    pub fn records(&self) -> Option<&RecordSet> {
        self.records.as_ref()
    }

    pub fn options(&self) -> &GenerateOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: GenerateOptions) {
        self.options = options;
    }

    /// Load the template and move on to field placement
    ///
    /// Replacing a template after revisiting the upload step keeps the
    /// placed fields.
    pub fn upload_template(
        &mut self,
        bytes: Vec<u8>,
        mime: &str,
        probe: &impl TemplateProbe,
    ) -> Result<&Template> {
        self.require(Stage::Upload)?;
        let template = Template::load(bytes, mime, probe)?;
        self.stage = Stage::PlaceFields;
        Ok(self.template.insert(template))
    }

    pub fn add_field(&mut self) -> Result<&Field> {
        self.require(Stage::PlaceFields)?;
        Ok(self.fields.add())
    }

    pub fn update_field(&mut self, id: FieldId, update: FieldUpdate) -> Result<&Field> {
        self.require(Stage::PlaceFields)?;
        self.fields.update(id, update)
    }

    pub fn remove_field(&mut self, id: FieldId) -> Result<Field> {
        self.require(Stage::PlaceFields)?;
        self.fields.remove(id)
    }

    /// Replace the whole layout, e.g. with one exported earlier
    pub fn import_fields(&mut self, json: &str) -> Result<()> {
        self.require(Stage::PlaceFields)?;
        self.fields = FieldSet::from_json(json)?;
        Ok(())
    }

    /// Submit the field layout
    ///
    /// Records loaded before a revisit survive only if they still have a
    /// column for every field; the session then goes straight to review.
    pub fn confirm_fields(&mut self) -> Result<Stage> {
        self.require(Stage::PlaceFields)?;
        self.fields.validate()?;

        let names = self.fields.names();
        let keep = self.records.as_ref().is_some_and(|r| r.covers(&names));
        if keep {
            self.stage = Stage::Review;
        } else {
            if self.records.take().is_some() {
                log::debug!("Dropping loaded records; they no longer cover every field");
            }
            self.stage = Stage::UploadData;
        }
        Ok(self.stage)
    }

    /// Validate a table against the fields and move on to review
    pub fn load_records(&mut self, source: TabularSource) -> Result<&RecordSet> {
        self.require(Stage::UploadData)?;
        let records = RecordSet::load(source, &self.fields.names())?;
        self.stage = Stage::Review;
        Ok(self.records.insert(records))
    }

    pub fn summary(&self) -> Summary {
        Summary {
            template_kind: self.template.as_ref().map(Template::kind),
            field_count: self.fields.len(),
            record_count: self.records.as_ref().map_or(0, RecordSet::len),
        }
    }

    pub fn generate(&mut self) -> Result<Artifact> {
        self.generate_with_progress(|_| {})
    }

    /// Run the batch; on success the session is done
    ///
    /// `on_event` sees [`BatchEvent::Started`] before the first page and
    /// [`BatchEvent::Finished`] once the bytes exist, which is the span a
    /// UI should treat as busy.
    pub fn generate_with_progress<F>(&mut self, on_event: F) -> Result<Artifact>
    where
        F: FnMut(&BatchEvent),
    {
        self.require(Stage::Review)?;
        let template = self.template.as_ref().ok_or(TemplateError::MissingTemplate)?;
        let records = self.records.as_ref().ok_or(TemplateError::EmptyDataSet)?;

        let artifact =
            batch::generate_with_progress(template, &self.fields, records, &self.options, on_event)?;
        self.stage = Stage::Done;
        Ok(artifact)
    }

    /// Go back to an earlier step, keeping everything entered so far
    pub fn revisit(&mut self, stage: Stage) -> Result<()> {
        if stage >= self.stage || stage == Stage::Done {
            return Err(TemplateError::InvalidStage {
                expected: stage,
                actual: self.stage,
            });
        }
        self.stage = stage;
        Ok(())
    }

    /// Discard everything and start over
    pub fn reset(&mut self) {
        let options = std::mem::take(&mut self.options);
        *self = Self::with_options(options);
    }

    fn require(&self, expected: Stage) -> Result<()> {
        if self.stage == expected {
            Ok(())
        } else {
            Err(TemplateError::InvalidStage {
                expected,
                actual: self.stage,
            })
        }
    }
}
