//! Per-record page composition

use crate::backend::{PageRef, RenderBackend};
use crate::field::{Field, FieldSet};
use crate::geometry::{self, Baseline, BaselineMode};
use crate::options::GenerateOptions;
use crate::records::Record;
use crate::template::{MediaKind, Template};
use crate::{Result, TemplateError};

/// Composes one output page per record from a template and its fields
pub struct Composer<'a> {
    template: &'a Template,
    fields: &'a FieldSet,
    options: &'a GenerateOptions,
}

impl<'a> Composer<'a> {
    pub fn new(template: &'a Template, fields: &'a FieldSet, options: &'a GenerateOptions) -> Self {
        Self {
            template,
            fields,
            options,
        }
    }

    /// Append a page for one record to the backend's document
    ///
    /// `number` is the record's 1-based position, used in errors. Template
    /// decode failures are returned as they are, since no other record
    /// could succeed either; anything else becomes a composition error.
    pub fn compose_one<B: RenderBackend + ?Sized>(
        &self,
        record: &Record,
        number: usize,
        backend: &mut B,
    ) -> Result<PageRef> {
        let page = self
            .template_page(backend)
            .map_err(|e| in_record(number, e))?;

        for field in self.fields.list() {
            let text = record.get(&field.name);
            if text.is_empty() {
                continue;
            }
            self.draw_field(field, text, page, backend)
                .map_err(|e| in_record(number, e))?;
        }

        Ok(page)
    }

    /// A fresh page showing the template
    fn template_page<B: RenderBackend + ?Sized>(&self, backend: &mut B) -> Result<PageRef> {
        match self.template.kind() {
            MediaKind::PagedDocument => backend.copy_page_from(self.template.bytes(), 0),
            MediaKind::RasterImage => {
                let format = self.template.image_format().ok_or_else(|| {
                    TemplateError::UnsupportedTemplateType(self.template.mime().to_string())
                })?;
                let (width, height) = (self.template.width(), self.template.height());

                let image = backend.embed_raster_image(self.template.bytes(), format)?;
                let page = backend.add_page(width, height)?;
                backend.draw_image(page, image, 0.0, 0.0, width, height)?;
                Ok(page)
            }
        }
    }

    fn draw_field<B: RenderBackend + ?Sized>(
        &self,
        field: &Field,
        text: &str,
        page: PageRef,
        backend: &mut B,
    ) -> Result<()> {
        let size = field.font_size as f64;

        // Fails early on text the font cannot set
        let width = backend.measure_text_width(text, size)?;
        let baseline = match self.options.baseline {
            BaselineMode::Approximate => Baseline::FontHeight(backend.measure_text_height(size)?),
            BaselineMode::Ascent => Baseline::Ascent(backend.measure_ascent(size)?),
        };

        let origin = geometry::to_native(field.position, self.template.height(), baseline)?;
        log::debug!(
            "Field '{}' at ({}, {}), {width:.2} wide",
            field.name,
            origin.x,
            origin.y
        );

        backend.draw_text(page, text, origin.x, origin.y, size, field.color.to_unit())
    }
}

fn in_record(number: usize, err: TemplateError) -> TemplateError {
    match err {
        TemplateError::TemplateDecode(_) | TemplateError::UnsupportedTemplateType(_) => err,
        other => TemplateError::Composition {
            record: number,
            cause: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ImageRef;
    use crate::field::{FieldUpdate, Rgb};
    use crate::geometry::Point;
    use crate::template::DocumentInfo;
    use crate::TemplateProbe;
    use pdf_core::ImageFormat;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    struct SizeProbe;

    impl TemplateProbe for SizeProbe {
        fn document_info(&self, _bytes: &[u8]) -> Result<DocumentInfo> {
            Ok(DocumentInfo {
                page_count: 1,
                width: 200.0,
                height: 300.0,
            })
        }

        fn image_size(&self, _bytes: &[u8], _format: ImageFormat) -> Result<(f64, f64)> {
            Ok((200.0, 300.0))
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Copy(usize),
        Embed(ImageFormat),
        AddPage(f64, f64),
        Image(usize, f64, f64),
        Text(usize, String, f64, f64, f64, [f32; 3]),
    }

    #[derive(Default)]
    struct Recorder {
        calls: Vec<Call>,
        pages: usize,
    }

    impl RenderBackend for Recorder {
        fn measure_text_width(&self, text: &str, size: f64) -> Result<f64> {
            if text.contains('!') {
                return Err(TemplateError::Render("cannot encode '!'".to_string()));
            }
            Ok(text.len() as f64 * size * 0.5)
        }

        fn measure_text_height(&self, size: f64) -> Result<f64> {
            Ok(size * 0.75)
        }

        fn measure_ascent(&self, size: f64) -> Result<f64> {
            Ok(size * 0.25)
        }

        fn copy_page_from(&mut self, _source: &[u8], page_index: usize) -> Result<PageRef> {
            self.calls.push(Call::Copy(page_index));
            self.pages += 1;
            Ok(PageRef(self.pages))
        }

        fn embed_raster_image(&mut self, _bytes: &[u8], format: ImageFormat) -> Result<ImageRef> {
            self.calls.push(Call::Embed(format));
            Ok(ImageRef(0))
        }

        fn add_page(&mut self, width: f64, height: f64) -> Result<PageRef> {
            self.calls.push(Call::AddPage(width, height));
            self.pages += 1;
            Ok(PageRef(self.pages))
        }

        fn draw_image(
            &mut self,
            page: PageRef,
            _image: ImageRef,
            _x: f64,
            _y: f64,
            width: f64,
            height: f64,
        ) -> Result<()> {
            self.calls.push(Call::Image(page.0, width, height));
            Ok(())
        }

        fn draw_text(
            &mut self,
            page: PageRef,
            text: &str,
            x: f64,
            y: f64,
            size: f64,
            color: [f32; 3],
        ) -> Result<()> {
            self.calls
                .push(Call::Text(page.0, text.to_string(), x, y, size, color));
            Ok(())
        }

        fn page_count(&self) -> usize {
            self.pages
        }

        fn serialize(&mut self) -> Result<Vec<u8>> {
            Ok(Vec::new())
        }
    }

    fn record(pairs: &[(&str, &str)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<BTreeMap<_, _>>()
            .into()
    }

    fn title_fields() -> FieldSet {
        let mut fields = FieldSet::default();
        let id = fields.add().id;
        fields
            .update(
                id,
                FieldUpdate::name("title")
                    .with_position(Point::new(10.0, 10.0))
                    .with_font_size(20)
                    .with_color(Rgb::new(255, 0, 0)),
            )
            .unwrap();
        fields
    }

    #[test]
    fn test_raster_template_page() {
        let template = Template::load(vec![0], "image/png", &SizeProbe).unwrap();
        let fields = title_fields();
        let options = GenerateOptions::default();
        let mut backend = Recorder::default();

        let page = Composer::new(&template, &fields, &options)
            .compose_one(&record(&[("title", "Hello")]), 1, &mut backend)
            .unwrap();

        assert_eq!(page, PageRef(1));
        assert_eq!(
            backend.calls,
            vec![
                Call::Embed(ImageFormat::Png),
                Call::AddPage(200.0, 300.0),
                Call::Image(1, 200.0, 300.0),
                Call::Text(1, "Hello".to_string(), 10.0, 280.0, 20.0, [1.0, 0.0, 0.0]),
            ]
        );
    }

    #[test]
    fn test_pdf_template_copies_first_page() {
        let template = Template::load(vec![0], "application/pdf", &SizeProbe).unwrap();
        let fields = title_fields();
        let options = GenerateOptions {
            baseline: BaselineMode::Ascent,
            ..GenerateOptions::default()
        };
        let mut backend = Recorder::default();

        Composer::new(&template, &fields, &options)
            .compose_one(&record(&[("title", "Hi")]), 1, &mut backend)
            .unwrap();

        // 300 - 10 - 0.25 * 20
        assert_eq!(
            backend.calls,
            vec![
                Call::Copy(0),
                Call::Text(1, "Hi".to_string(), 10.0, 285.0, 20.0, [1.0, 0.0, 0.0]),
            ]
        );
    }

    #[test]
    fn test_empty_value_draws_nothing() {
        let template = Template::load(vec![0], "application/pdf", &SizeProbe).unwrap();
        let fields = title_fields();
        let options = GenerateOptions::default();
        let mut backend = Recorder::default();

        Composer::new(&template, &fields, &options)
            .compose_one(&record(&[("title", "")]), 1, &mut backend)
            .unwrap();

        assert_eq!(backend.calls, vec![Call::Copy(0)]);
    }

    #[test]
    fn test_failure_names_the_record() {
        let template = Template::load(vec![0], "application/pdf", &SizeProbe).unwrap();
        let fields = title_fields();
        let options = GenerateOptions::default();
        let mut backend = Recorder::default();

        let err = Composer::new(&template, &fields, &options)
            .compose_one(&record(&[("title", "Hey!")]), 4, &mut backend)
            .unwrap_err();

        match err {
            TemplateError::Composition { record, cause } => {
                assert_eq!(record, 4);
                assert!(cause.contains("cannot encode"), "{cause}");
            }
            other => panic!("expected composition error, got {other:?}"),
        }
    }
}
