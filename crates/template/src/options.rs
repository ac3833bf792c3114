//! Generation options

use crate::geometry::BaselineMode;
use crate::{Result, TemplateError};
use serde::{Deserialize, Serialize};

/// File name given to the generated document
pub const DEFAULT_OUTPUT_FILE_NAME: &str = "generated-certificates.pdf";

/// Options for one batch run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerateOptions {
    /// How far below a field's top edge its baseline sits
    pub baseline: BaselineMode,
    /// Name under which the artifact is offered for download
    pub output_file_name: String,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            baseline: BaselineMode::default(),
            output_file_name: DEFAULT_OUTPUT_FILE_NAME.to_string(),
        }
    }
}

impl GenerateOptions {
    /// Parse options from JSON; missing keys take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self =
            serde_json::from_str(json).map_err(|e| TemplateError::Config(e.to_string()))?;

        if options.output_file_name.trim().is_empty() {
            return Err(TemplateError::Config(
                "outputFileName must not be empty".to_string(),
            ));
        }
        Ok(options)
    }
}
