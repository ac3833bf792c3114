//! WASM bindings for bulkdoc
//!
//! This crate provides a JavaScript-friendly session for:
//! - Uploading a PDF or image template
//! - Placing, editing and removing text fields
//! - Loading records from CSV text or an already-parsed table
//! - Generating one page per record into a single PDF
//!
//! # Example (JavaScript)
//!
//! ```javascript
//! import init, { BulkSession } from 'bulkdoc-wasm';
//!
//! await init();
//!
//! const session = new BulkSession();
//! session.uploadTemplate(pdfBytes, 'application/pdf');
//!
//! const field = session.addField();
//! session.updateField(field.id, { name: 'name', position: { x: 120, y: 340 } });
//! session.confirmFields();
//!
//! session.loadCsv(csvText);
//! const pdf = session.generate((event) => console.log(event.type));
//! download(pdf, session.outputFileName);
//! ```

mod csv_table;

pub use csv_table::{parse_csv, CsvTableError};

use serde::Serialize;
use template::geometry::{self, Point};
use template::{
    BatchEvent, FieldId, FieldUpdate, GenerateOptions, PdfProbe, Session, Stage, TabularSource,
};
use wasm_bindgen::prelude::*;

// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

fn js_error(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(js_error)
}

/// Hand a progress event to JS; a throwing callback does not abort the batch
fn notify(callback: &js_sys::Function, event: &BatchEvent) {
    let value = match serde_wasm_bindgen::to_value(event) {
        Ok(value) => value,
        Err(err) => {
            log::warn!("Progress event {event:?} could not be converted: {err}");
            return;
        }
    };
    if let Err(err) = callback.call1(&JsValue::NULL, &value) {
        log::warn!("Progress callback failed on {event:?}: {err:?}");
    }
}

/// Bulk document generation wizard
#[wasm_bindgen]
pub struct BulkSession {
    inner: Session,
}

#[wasm_bindgen]
impl BulkSession {
    /// Create a session with default options
    #[wasm_bindgen(constructor)]
    pub fn new() -> BulkSession {
        BulkSession {
            inner: Session::new(),
        }
    }

    /// Create a session from an options JSON document
    ///
    /// @param json - e.g. `{ "baseline": "ascent", "outputFileName": "out.pdf" }`
    #[wasm_bindgen(js_name = withOptions)]
    pub fn with_options(json: &str) -> Result<BulkSession, JsValue> {
        let options = GenerateOptions::from_json(json).map_err(js_error)?;
        Ok(BulkSession {
            inner: Session::with_options(options),
        })
    }

    /// Current wizard step ("upload", "placeFields", "uploadData", "review", "done")
    pub fn stage(&self) -> Result<JsValue, JsValue> {
        to_js(&self.inner.stage())
    }

    #[wasm_bindgen(getter, js_name = outputFileName)]
    pub fn output_file_name(&self) -> String {
        self.inner.options().output_file_name.clone()
    }

    /// Upload the template
    ///
    /// @param data - File bytes (Uint8Array)
    /// @param mime - Declared media type
    /// @returns `{ width, height }` in native units
    #[wasm_bindgen(js_name = uploadTemplate)]
    pub fn upload_template(&mut self, data: &[u8], mime: &str) -> Result<JsValue, JsValue> {
        let template = self
            .inner
            .upload_template(data.to_vec(), mime, &PdfProbe)
            .map_err(js_error)?;

        #[derive(Serialize)]
        struct Size {
            width: f64,
            height: f64,
        }
        to_js(&Size {
            width: template.width(),
            height: template.height(),
        })
    }

    /// Add a field with default attributes
    ///
    /// @returns The new field
    #[wasm_bindgen(js_name = addField)]
    pub fn add_field(&mut self) -> Result<JsValue, JsValue> {
        let field = self.inner.add_field().map_err(js_error)?;
        to_js(field)
    }

    /// Change some attributes of a field
    ///
    /// @param id - Field id
    /// @param update - `{ name?, position?, fontSize?, color? }`
    /// @returns The updated field
    #[wasm_bindgen(js_name = updateField)]
    pub fn update_field(&mut self, id: u32, update: JsValue) -> Result<JsValue, JsValue> {
        let update: FieldUpdate = serde_wasm_bindgen::from_value(update)?;
        let field = self
            .inner
            .update_field(FieldId::from(id as u64), update)
            .map_err(js_error)?;
        to_js(field)
    }

    /// Move a field to where it was dropped in the preview
    ///
    /// @param id - Field id
    /// @param x - Drop position in preview pixels
    /// @param y - Drop position in preview pixels
    /// @param previewWidth - Rendered width of the preview in pixels
    /// @returns The updated field
    #[wasm_bindgen(js_name = moveField)]
    pub fn move_field(
        &mut self,
        id: u32,
        x: f64,
        y: f64,
        preview_width: f64,
    ) -> Result<JsValue, JsValue> {
        let native_width = self.inner.template().map_or(0.0, |t| t.width());
        let scale = geometry::scale_factor(preview_width, native_width)
            .ok_or_else(|| js_error("No template preview to place fields on"))?;
        let position = geometry::from_display(Point::new(x, y), scale);

        let field = self
            .inner
            .update_field(FieldId::from(id as u64), FieldUpdate::position(position))
            .map_err(js_error)?;
        to_js(field)
    }

    /// Preview-space position and font size of every field
    ///
    /// @param previewWidth - Rendered width of the preview in pixels
    /// @returns `[{ id, x, y, fontSize }]`
    #[wasm_bindgen(js_name = displayLayout)]
    pub fn display_layout(&self, preview_width: f64) -> Result<JsValue, JsValue> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Placement {
            id: FieldId,
            x: f64,
            y: f64,
            font_size: f64,
        }

        let native_width = self.inner.template().map_or(0.0, |t| t.width());
        let scale = geometry::scale_factor(preview_width, native_width)
            .ok_or_else(|| js_error("No template preview to place fields on"))?;

        let layout: Vec<Placement> = self
            .inner
            .fields()
            .list()
            .iter()
            .map(|field| {
                let point = geometry::to_display(field.position, scale);
                Placement {
                    id: field.id,
                    x: point.x,
                    y: point.y,
                    font_size: geometry::display_font_size(field.font_size, scale),
                }
            })
            .collect();
        to_js(&layout)
    }

    #[wasm_bindgen(js_name = removeField)]
    pub fn remove_field(&mut self, id: u32) -> Result<(), JsValue> {
        self.inner
            .remove_field(FieldId::from(id as u64))
            .map_err(js_error)?;
        Ok(())
    }

    /// All fields, in creation order
    pub fn fields(&self) -> Result<JsValue, JsValue> {
        to_js(self.inner.fields().list())
    }

    /// Field layout as JSON, for reuse in another batch
    #[wasm_bindgen(js_name = exportFields)]
    pub fn export_fields(&self) -> Result<String, JsValue> {
        self.inner.fields().to_json().map_err(js_error)
    }

    #[wasm_bindgen(js_name = importFields)]
    pub fn import_fields(&mut self, json: &str) -> Result<(), JsValue> {
        self.inner.import_fields(json).map_err(js_error)
    }

    /// Submit the field layout
    ///
    /// @returns The stage the session moved to
    #[wasm_bindgen(js_name = confirmFields)]
    pub fn confirm_fields(&mut self) -> Result<JsValue, JsValue> {
        let stage = self.inner.confirm_fields().map_err(js_error)?;
        to_js(&stage)
    }

    /// Load records from CSV text
    ///
    /// @returns Number of records
    #[wasm_bindgen(js_name = loadCsv)]
    pub fn load_csv(&mut self, text: &str) -> Result<usize, JsValue> {
        let source = parse_csv(text).map_err(js_error)?;
        self.load(source)
    }

    /// Load records from a parsed table
    ///
    /// @param table - `{ headers: string[], rows: object[] }`
    /// @returns Number of records
    #[wasm_bindgen(js_name = loadTable)]
    pub fn load_table(&mut self, table: JsValue) -> Result<usize, JsValue> {
        let source: TabularSource = serde_wasm_bindgen::from_value(table)?;
        self.load(source)
    }

    /// Template kind, field count and record count
    pub fn summary(&self) -> Result<JsValue, JsValue> {
        to_js(&self.inner.summary())
    }

    /// Generate the document
    ///
    /// @param onProgress - Optional callback receiving `{ type, ... }` events
    /// @returns PDF bytes (Uint8Array)
    pub fn generate(&mut self, on_progress: Option<js_sys::Function>) -> Result<Vec<u8>, JsValue> {
        let artifact = self
            .inner
            .generate_with_progress(|event| {
                if let Some(callback) = &on_progress {
                    notify(callback, event);
                }
            })
            .map_err(js_error)?;
        Ok(artifact.bytes)
    }

    /// Go back to an earlier step
    ///
    /// @param stage - Stage name as reported by `stage`
    pub fn revisit(&mut self, stage: JsValue) -> Result<(), JsValue> {
        let stage: Stage = serde_wasm_bindgen::from_value(stage)?;
        self.inner.revisit(stage).map_err(js_error)
    }

    /// Discard everything and start over
    pub fn reset(&mut self) {
        self.inner.reset();
    }

    fn load(&mut self, source: TabularSource) -> Result<usize, JsValue> {
        let records = self.inner.load_records(source).map_err(js_error)?;
        Ok(records.len())
    }
}

impl Default for BulkSession {
    fn default() -> Self {
        Self::new()
    }
}
