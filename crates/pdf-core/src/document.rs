//! PDF Document wrapper

use crate::copy::ObjectCopier;
use crate::font::BuiltinFont;
use crate::image::{deflate, generate_image_operators, ImageXObject};
use crate::text::{encode_hex, generate_text_operators, TextRenderContext};
use crate::{PdfError, Result};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};

/// Page attributes a page may inherit from its ancestors in the page tree
const INHERITABLE_KEYS: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Fallback page size when no MediaBox can be found (A4)
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 595.28, 841.89];

/// RGB Color (values 0.0 - 1.0)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    /// Create a new RGB color (values 0.0 - 1.0)
    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Create color from RGB values (0-255)
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
        }
    }

    /// Black color
    pub fn black() -> Self {
        Self::rgb(0.0, 0.0, 0.0)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::black()
    }
}

/// An image XObject already added to a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbeddedImage {
    pub object_id: ObjectId,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

/// PDF Document wrapper providing high-level operations
///
/// Drawing calls only buffer operators; page content streams are written
/// once, when the document is serialized.
pub struct PdfDocument {
    /// The underlying lopdf document
    inner: Document,
    /// Current font face
    current_font: BuiltinFont,
    /// Current font size
    current_font_size: f32,
    /// Current text color
    current_text_color: Color,
    /// Font dictionaries added so far (face -> PDF object ID)
    font_objects: BTreeMap<BuiltinFont, ObjectId>,
    /// Embedded images (data hash -> image)
    embedded_images: HashMap<u64, EmbeddedImage>,
    /// Resource names registered per page (page number -> object ID -> name)
    page_resources: BTreeMap<usize, BTreeMap<ObjectId, String>>,
    /// Buffered content operators per page (page number -> operators)
    page_content_buffer: BTreeMap<usize, Vec<u8>>,
}

impl PdfDocument {
    /// Create an empty document with no pages
    pub fn new() -> Self {
        let mut inner = Document::with_version("1.7");

        let pages_id = inner.add_object(dictionary! {
            "Type" => "Pages",
            "Kids" => Vec::<Object>::new(),
            "Count" => 0,
        });
        let catalog_id = inner.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        inner.trailer.set("Root", catalog_id);

        Self::from_document(inner)
    }

    /// Open a PDF document from bytes
    ///
    /// # Arguments
    /// * `data` - PDF file bytes
    pub fn open_from_bytes(data: &[u8]) -> Result<Self> {
        let inner = Document::load_mem(data).map_err(|e| PdfError::OpenError(e.to_string()))?;
        Ok(Self::from_document(inner))
    }

    fn from_document(inner: Document) -> Self {
        Self {
            inner,
            current_font: BuiltinFont::default(),
            current_font_size: 12.0,
            current_text_color: Color::default(),
            font_objects: BTreeMap::new(),
            embedded_images: HashMap::new(),
            page_resources: BTreeMap::new(),
            page_content_buffer: BTreeMap::new(),
        }
    }

    /// Get the number of pages in the document
    pub fn page_count(&self) -> usize {
        self.inner.get_pages().len()
    }

    /// Object ID of a page (1-indexed)
    fn page_id(&self, page: usize) -> Result<ObjectId> {
        let pages = self.inner.get_pages();
        u32::try_from(page)
            .ok()
            .and_then(|number| pages.get(&number).copied())
            .ok_or(PdfError::InvalidPage(page, pages.len()))
    }

    /// Page width and height in points
    ///
    /// Reads the MediaBox, following the parent chain when the page
    /// inherits it. Pages without any MediaBox are treated as A4.
    pub fn page_size(&self, page: usize) -> Result<(f64, f64)> {
        let page_id = self.page_id(page)?;

        let media_box = match inherited_attribute(&self.inner, page_id, b"MediaBox") {
            Some(Object::Reference(id)) => self.inner.get_object(id)?.clone(),
            Some(value) => value,
            None => return media_box_size(&DEFAULT_MEDIA_BOX.map(Object::Real)),
        };

        let media_box = media_box
            .as_array()
            .map_err(|_| PdfError::ParseError("MediaBox is not an array".to_string()))?;
        media_box_size(media_box)
    }

    /// Import a page of another document as a new last page
    ///
    /// Everything the page references (content streams, fonts, images) is
    /// copied along with it, so the result is independent of `source`.
    ///
    /// # Returns
    /// New page number (1-indexed)
    pub fn import_page(&mut self, source: &PdfDocument, page: usize) -> Result<usize> {
        let source_page_id = source.page_id(page)?;
        let mut page_dict = source
            .inner
            .get_dictionary(source_page_id)
            .map_err(|_| PdfError::ParseError("Page object is not a dictionary".to_string()))?
            .clone();

        // Attributes inherited from the source page tree must be made explicit
        for key in INHERITABLE_KEYS {
            if !page_dict.has(key) {
                if let Some(value) = inherited_attribute(&source.inner, source_page_id, key) {
                    page_dict.set(key, value);
                }
            }
        }
        page_dict.remove(b"Parent");

        let mut page_object = Object::Dictionary(page_dict);
        let copied = ObjectCopier::new(&source.inner).copy_into(&mut page_object, &mut self.inner);
        log::debug!("Imported page {page} with {copied} referenced objects");

        let page_id = self.inner.add_object(page_object);
        self.append_page(page_id)
    }

    /// Add an empty page of the given size as a new last page
    ///
    /// # Returns
    /// New page number (1-indexed)
    pub fn add_page(&mut self, width: f64, height: f64) -> Result<usize> {
        // Contents is written on flush, only if something was drawn
        let page_dict = dictionary! {
            "Type" => "Page",
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(width as f32),
                Object::Real(height as f32),
            ],
            "Resources" => Dictionary::new(),
        };

        let page_id = self.inner.add_object(page_dict);
        self.append_page(page_id)
    }

    /// Root Pages node of the document
    fn pages_root_id(&self) -> Result<ObjectId> {
        let catalog_id = self
            .inner
            .trailer
            .get(b"Root")
            .and_then(Object::as_reference)
            .map_err(|_| PdfError::ParseError("Document trailer missing Root entry".to_string()))?;
        self.inner
            .get_dictionary(catalog_id)
            .and_then(|catalog| catalog.get(b"Pages"))
            .and_then(Object::as_reference)
            .map_err(|_| PdfError::ParseError("Catalog missing Pages entry".to_string()))
    }

    /// Hang a page object under the root Pages node
    fn append_page(&mut self, page_id: ObjectId) -> Result<usize> {
        let pages_id = self.pages_root_id()?;
        let page_count = self.page_count();

        let mut pages_dict = self
            .inner
            .get_dictionary(pages_id)
            .map_err(|_| PdfError::ParseError("Pages object is not a dictionary".to_string()))?
            .clone();

        let mut kids = pages_dict
            .get(b"Kids")
            .and_then(Object::as_array)
            .map_err(|_| PdfError::ParseError("Pages object missing Kids array".to_string()))?
            .clone();
        kids.push(Object::Reference(page_id));

        let count = pages_dict
            .get(b"Count")
            .and_then(Object::as_i64)
            .map_err(|_| PdfError::ParseError("Pages object missing Count".to_string()))?;

        pages_dict.set("Kids", Object::Array(kids));
        pages_dict.set("Count", Object::Integer(count + 1));
        self.inner.objects.insert(pages_id, pages_dict.into());

        if let Ok(Object::Dictionary(page_dict)) = self.inner.get_object_mut(page_id) {
            page_dict.set("Parent", Object::Reference(pages_id));
        }

        Ok(page_count + 1)
    }

    /// Set the font used by subsequent text operations
    pub fn set_font(&mut self, font: BuiltinFont, size: f32) {
        self.current_font = font;
        self.current_font_size = size;
    }

    /// Set the fill color used by subsequent text operations
    pub fn set_text_color(&mut self, color: Color) {
        self.current_text_color = color;
    }

    /// Insert text with its baseline starting at a position
    ///
    /// # Arguments
    /// * `text` - Text to insert
    /// * `page` - Page number (1-indexed)
    /// * `x` - X coordinate in points
    /// * `y` - Baseline Y coordinate in points (from bottom)
    pub fn insert_text(&mut self, text: &str, page: usize, x: f64, y: f64) -> Result<()> {
        self.page_id(page)?;

        // Encode first so an unencodable value leaves the page untouched
        let encoded = self.current_font.encode(text)?;
        if encoded.is_empty() {
            return Ok(());
        }

        let font_id = self.font_object_id(self.current_font);
        let font_name = self.resource_name(page, b"Font", "F", font_id)?;

        let ctx = TextRenderContext {
            font_name,
            font_size: self.current_font_size,
            color: self.current_text_color,
        };
        let operators = generate_text_operators(&encode_hex(&encoded), x, y, &ctx);
        self.buffer_content(page, &operators);

        Ok(())
    }

    /// Embed a JPEG or PNG image, reusing an earlier copy of identical data
    pub fn embed_image(&mut self, data: &[u8]) -> Result<EmbeddedImage> {
        let mut hasher = DefaultHasher::new();
        data.hash(&mut hasher);
        let data_hash = hasher.finish();

        if let Some(image) = self.embedded_images.get(&data_hash) {
            return Ok(*image);
        }

        let xobject = ImageXObject::from_bytes(data)
            .map_err(|e| PdfError::ImageError(format!("Failed to create image XObject: {e}")))?;

        let soft_mask = xobject
            .soft_mask_stream()
            .map(|mask| self.inner.add_object(mask));
        let object_id = self.inner.add_object(xobject.to_pdf_stream(soft_mask));

        let image = EmbeddedImage {
            object_id,
            width: xobject.width,
            height: xobject.height,
        };
        self.embedded_images.insert(data_hash, image);

        Ok(image)
    }

    /// Paint an embedded image into a rectangle
    ///
    /// # Arguments
    /// * `image` - Image returned by [`PdfDocument::embed_image`]
    /// * `page` - Page number (1-indexed)
    /// * `x`, `y` - Lower-left corner in points (from bottom)
    /// * `width`, `height` - Drawn size in points
    pub fn place_image(
        &mut self,
        image: &EmbeddedImage,
        page: usize,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    ) -> Result<()> {
        let name = self.resource_name(page, b"XObject", "Im", image.object_id)?;
        let operators = generate_image_operators(&name, x, y, width, height);
        self.buffer_content(page, &operators);
        Ok(())
    }

    /// Save the document to bytes
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        self.flush_content_buffers()?;

        let mut buffer = Vec::new();
        self.inner
            .save_to(&mut buffer)
            .map_err(|e| PdfError::SaveError(e.to_string()))?;

        Ok(buffer)
    }

    /// Font dictionary for a face, added on first use
    fn font_object_id(&mut self, font: BuiltinFont) -> ObjectId {
        if let Some(&id) = self.font_objects.get(&font) {
            return id;
        }
        let id = self.inner.add_object(font.to_pdf_dictionary());
        self.font_objects.insert(font, id);
        id
    }

    /// Resource name under which `object_id` is reachable from a page
    ///
    /// Registers the object in the page's Resources on first use, picking
    /// `{prefix}{n}` with the lowest n the page does not already use.
    fn resource_name(
        &mut self,
        page: usize,
        category: &[u8],
        prefix: &str,
        object_id: ObjectId,
    ) -> Result<String> {
        if let Some(name) = self
            .page_resources
            .get(&page)
            .and_then(|names| names.get(&object_id))
        {
            return Ok(name.clone());
        }

        let page_id = self.page_id(page)?;
        let mut page_dict = self
            .inner
            .get_dictionary(page_id)
            .map_err(|_| PdfError::ParseError("Page object is not a dictionary".to_string()))?
            .clone();

        // Resolve shared dictionaries into private copies before editing
        let mut resources = self.resolve_dict(page_dict.get(b"Resources").ok())?;
        let mut entries = self.resolve_dict(resources.get(category).ok())?;

        let name = (1..)
            .map(|n| format!("{prefix}{n}"))
            .find(|name| !entries.has(name.as_bytes()))
            .unwrap_or_else(|| prefix.to_string());

        entries.set(name.as_bytes(), Object::Reference(object_id));
        resources.set(category, Object::Dictionary(entries));
        page_dict.set("Resources", Object::Dictionary(resources));
        self.inner.objects.insert(page_id, page_dict.into());

        self.page_resources
            .entry(page)
            .or_default()
            .insert(object_id, name.clone());

        Ok(name)
    }

    /// Clone a dictionary given directly or by reference; absent means empty
    fn resolve_dict(&self, value: Option<&Object>) -> Result<Dictionary> {
        match value {
            None => Ok(Dictionary::new()),
            Some(Object::Dictionary(dict)) => Ok(dict.clone()),
            Some(Object::Reference(id)) => self
                .inner
                .get_dictionary(*id)
                .cloned()
                .map_err(|_| PdfError::ParseError("Resource entry is not a dictionary".to_string())),
            Some(_) => Err(PdfError::ParseError(
                "Resource entry is not a dictionary".to_string(),
            )),
        }
    }

    /// Buffer content operators for a page (written at save time)
    fn buffer_content(&mut self, page: usize, content: &[u8]) {
        self.page_content_buffer
            .entry(page)
            .or_default()
            .extend_from_slice(content);
    }

    /// Flush all buffered content to page streams, in page order
    fn flush_content_buffers(&mut self) -> Result<()> {
        let buffers = std::mem::take(&mut self.page_content_buffer);

        for (page, content) in buffers {
            if !content.is_empty() {
                self.append_to_content_stream(page, &content)?;
            }
        }

        Ok(())
    }

    /// Append content to a page's content stream
    ///
    /// Existing streams are kept as they are and bracketed by q/Q, so
    /// graphics state the page leaves behind cannot leak into new content.
    fn append_to_content_stream(&mut self, page: usize, content: &[u8]) -> Result<()> {
        let page_id = self.page_id(page)?;
        let mut page_dict = self
            .inner
            .get_dictionary(page_id)
            .map_err(|_| PdfError::ParseError("Page object is not a dictionary".to_string()))?
            .clone();

        let existing: Vec<Object> = match page_dict.get(b"Contents") {
            Ok(Object::Reference(id)) => vec![Object::Reference(*id)],
            Ok(Object::Array(streams)) => streams.clone(),
            Ok(Object::Stream(stream)) => {
                vec![Object::Reference(self.inner.add_object(stream.clone()))]
            }
            _ => Vec::new(),
        };

        let has_content = existing.iter().any(|object| match object {
            Object::Reference(id) => self
                .inner
                .get_object(*id)
                .and_then(Object::as_stream)
                .map(|stream| !stream.content.is_empty())
                .unwrap_or(false),
            _ => false,
        });

        let contents = if has_content {
            let prefix_id = self
                .inner
                .add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
            let mut suffix = b"\nQ\n".to_vec();
            suffix.extend_from_slice(content);
            let suffix_id = self.inner.add_object(compressed_stream(&suffix)?);

            let mut contents = Vec::with_capacity(existing.len() + 2);
            contents.push(Object::Reference(prefix_id));
            contents.extend(existing);
            contents.push(Object::Reference(suffix_id));
            Object::Array(contents)
        } else {
            Object::Reference(self.inner.add_object(compressed_stream(content)?))
        };

        page_dict.set("Contents", contents);
        self.inner.objects.insert(page_id, page_dict.into());

        Ok(())
    }
}

impl Default for PdfDocument {
    fn default() -> Self {
        Self::new()
    }
}

/// Flate-compressed content stream
fn compressed_stream(content: &[u8]) -> Result<Stream> {
    let dict = dictionary! { "Filter" => "FlateDecode" };
    Ok(Stream::new(dict, deflate(content)?))
}

/// Look up a page attribute, following the parent chain if needed
fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut current_id = page_id;

    // Follow parent chain up to 10 levels (safety limit)
    for _ in 0..10 {
        let dict = doc.get_dictionary(current_id).ok()?;

        if let Ok(value) = dict.get(key) {
            return Some(value.clone());
        }

        match dict.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => current_id = *parent_id,
            _ => break,
        }
    }

    None
}

/// Width and height from a MediaBox array [x1 y1 x2 y2]
fn media_box_size(media_box: &[Object]) -> Result<(f64, f64)> {
    if media_box.len() < 4 {
        return Err(PdfError::ParseError("Invalid MediaBox format".to_string()));
    }

    let coord = |index: usize| -> Result<f64> {
        match &media_box[index] {
            Object::Integer(value) => Ok(*value as f64),
            Object::Real(value) => Ok(*value as f64),
            _ => Err(PdfError::ParseError(format!("Invalid MediaBox entry {index}"))),
        }
    };

    let width = (coord(2)? - coord(0)?).abs();
    let height = (coord(3)? - coord(1)?).abs();
    Ok((width, height))
}
