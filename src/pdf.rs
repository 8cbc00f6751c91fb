use lopdf::{content::Operation, Object, StringFormat};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet},
    io::BufWriter,
    mem,
};
use time::OffsetDateTime;
use unicode_normalization::UnicodeNormalization as _;

use crate::color::Color;
use crate::error::{ContextError, ErrorKind};
use crate::fonts::{Font, FontBook};

/// The identifiers written into the trailer, kept constant so that equal input renders into
/// byte-identical files.
pub const DEFAULT_DOCUMENT_IDENTIFIER: &str = "rechnr-document";
pub const DEFAULT_INSTANCE_IDENTIFIER: &str = "rechnr-instance";

pub fn millimeters_to_points(millimeters: f32) -> f32 {
    millimeters * 2.834646
}

pub fn points_to_millimeters(points: f32) -> f32 {
    points / 2.834646
}

/// The information dictionary of the document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Metadata {
    pub title: String,
    pub author: String,
    pub subject: String,
    pub creator: String,
    /// An RFC 3339 timestamp, the Unix epoch is used when it is omitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<String>,
}

impl Metadata {
    fn creation_date(&self) -> Result<OffsetDateTime, ContextError> {
        match &self.creation_date {
            Some(creation_date) => OffsetDateTime::parse(
                creation_date,
                &time::format_description::well_known::Rfc3339,
            )
            .map_err(|error| {
                ContextError::with_error(
                    ErrorKind::Serialization,
                    format!("Unable to parse the creation date {:?}", creation_date),
                    &error,
                )
            }),
            None => Ok(OffsetDateTime::UNIX_EPOCH),
        }
    }
}

/// A single page, its size in millimeters and the operations of its content stream.
#[derive(Debug, Clone)]
pub struct PdfPage {
    pub width: f32,
    pub height: f32,
    pub(crate) operations: Vec<Operation>,
}

impl PdfPage {
    /// Converts a vertical position measured from the top edge into PDF user space, whose origin
    /// lies in the bottom-left corner.
    fn flip_y(&self, y: f32) -> f32 {
        millimeters_to_points(self.height - y)
    }
}

/// The low-level PDF document: pages of drawing operations in millimeters, measured from the
/// top-left corner, which are written into a `lopdf::Document` by `write_all`.
pub struct PdfDocument {
    pub inner_document: lopdf::Document,
    pub identifier: String,
    pub(crate) pages: Vec<PdfPage>,
    /// The characters shown with each font, keyed by the resource name of the font.
    used_characters: BTreeMap<String, BTreeSet<char>>,
    written: bool,
}

impl PdfDocument {
    pub fn new(pdf_document_identifier: String) -> Self {
        PdfDocument {
            inner_document: lopdf::Document::with_version("1.5"),
            identifier: pdf_document_identifier,
            pages: Vec::new(),
            used_characters: BTreeMap::new(),
            written: false,
        }
    }

    /// Appends a page of the given size in millimeters and returns its index.
    pub fn add_page(&mut self, page_width: f32, page_height: f32) -> usize {
        self.pages.push(PdfPage {
            width: page_width,
            height: page_height,
            operations: Vec::new(),
        });
        self.pages.len() - 1
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// The content stream operations of a page, mostly useful to inspect what has been drawn.
    pub fn page_operations(&self, page_index: usize) -> Option<&[Operation]> {
        self.pages
            .get(page_index)
            .map(|page| page.operations.as_slice())
    }

    /// Writes a run of text whose baseline starts at `position`.
    pub fn write_text(
        &mut self,
        page_index: usize,
        font: &Font,
        font_size: f32,
        color: Color,
        position: [f32; 2],
        text: &str,
    ) -> Result<(), ContextError> {
        let page = self.get_mut_page(page_index)?;
        let [x, y] = position;
        let [r, g, b] = color.to_unit_rgb();
        let text_position = vec![
            Object::Real(millimeters_to_points(x)),
            Object::Real(page.flip_y(y)),
        ];
        page.operations.extend([
            Operation::new("BT", vec![]), // Begin text section
            Operation::new(
                "Tf",
                vec![
                    Object::Name(font.resource_name().as_bytes().to_vec()),
                    Object::Real(font_size),
                ],
            ), // Set the font and the font size
            Operation::new("rg", vec![r.into(), g.into(), b.into()]),
            Operation::new("Td", text_position), // Set the position where the text begins to be written
            Operation::new("Tj", vec![Object::String(font.encode(text), font.string_format())]),
            Operation::new("ET", vec![]),
        ]);
        self.used_characters
            .entry(font.resource_name().to_string())
            .or_default()
            .extend(text.nfc());

        Ok(())
    }

    /// Strokes a straight line between two points.
    pub fn draw_line(
        &mut self,
        page_index: usize,
        from: [f32; 2],
        to: [f32; 2],
        line_width: f32,
        color: Color,
    ) -> Result<(), ContextError> {
        let page = self.get_mut_page(page_index)?;
        let [r, g, b] = color.to_unit_rgb();
        let start = [millimeters_to_points(from[0]), page.flip_y(from[1])];
        let end = [millimeters_to_points(to[0]), page.flip_y(to[1])];
        page.operations.extend([
            Operation::new("q", vec![]),
            Operation::new("RG", vec![r.into(), g.into(), b.into()]),
            Operation::new("w", vec![millimeters_to_points(line_width).into()]),
            Operation::new("m", vec![start[0].into(), start[1].into()]),
            Operation::new("l", vec![end[0].into(), end[1].into()]),
            Operation::new("S", vec![]),
            Operation::new("Q", vec![]),
        ]);

        Ok(())
    }

    /// Fills a rectangle whose top-left corner lies at `origin`.
    pub fn fill_rectangle(
        &mut self,
        page_index: usize,
        origin: [f32; 2],
        size: [f32; 2],
        color: Color,
    ) -> Result<(), ContextError> {
        let page = self.get_mut_page(page_index)?;
        let [r, g, b] = color.to_unit_rgb();
        let [width, height] = size;
        let bottom = page.flip_y(origin[1] + height);
        page.operations.extend([
            Operation::new("q", vec![]),
            Operation::new("rg", vec![r.into(), g.into(), b.into()]),
            Operation::new(
                "re",
                vec![
                    millimeters_to_points(origin[0]).into(),
                    bottom.into(),
                    millimeters_to_points(width).into(),
                    millimeters_to_points(height).into(),
                ],
            ),
            Operation::new("f", vec![]),
            Operation::new("Q", vec![]),
        ]);

        Ok(())
    }

    /// Assembles the catalog, the page tree, the fonts and the information dictionary. The
    /// document can only be written once.
    pub fn write_all(
        &mut self,
        fonts: &FontBook,
        metadata: &Metadata,
        instance_id: &str,
    ) -> Result<(), ContextError> {
        use lopdf::Object::*;

        if self.written {
            return Err(ContextError::with_context(
                "The PDF document has already been written",
            ));
        }
        if self.pages.is_empty() {
            return Err(ContextError::with_context(
                "Unable to write a PDF document without pages",
            ));
        }

        let creation_date = to_pdf_timestamp_format(&metadata.creation_date()?);
        let document_info = lopdf::Dictionary::from_iter(vec![
            ("Title", text_string(&metadata.title)),
            ("Author", text_string(&metadata.author)),
            ("Subject", text_string(&metadata.subject)),
            ("Creator", text_string(&metadata.creator)),
            ("Producer", text_string("rechnr")),
            (
                "CreationDate",
                String(creation_date.clone().into_bytes(), StringFormat::Literal),
            ),
            (
                "ModDate",
                String(creation_date.into_bytes(), StringFormat::Literal),
            ),
        ]);
        let document_info_id = self.inner_document.add_object(Dictionary(document_info));

        let fonts_dictionary = self.insert_fonts_into_document(fonts)?;
        let fonts_dictionary_id = self.inner_document.add_object(fonts_dictionary);

        let pages_id = self.inner_document.new_object_id();
        let mut page_ids = Vec::<Object>::with_capacity(self.pages.len());
        for page in self.pages.iter_mut() {
            let stream_content = lopdf::content::Content {
                operations: mem::take(&mut page.operations),
            };
            let page_stream = lopdf::Stream::new(
                lopdf::Dictionary::new(),
                stream_content.encode().map_err(|error| {
                    ContextError::with_error(
                        ErrorKind::Serialization,
                        "Failed to encode the page content",
                        &error,
                    )
                })?,
            )
            .with_compression(false);
            let page_content_id = self.inner_document.add_object(page_stream);

            let media_box: Vec<Object> = vec![
                0.into(),
                0.into(),
                millimeters_to_points(page.width).into(),
                millimeters_to_points(page.height).into(),
            ];
            let page_dictionary = lopdf::Dictionary::from_iter(vec![
                ("Type", Name("Page".into())),
                ("Parent", Reference(pages_id)),
                ("MediaBox", Array(media_box)),
                (
                    "Resources",
                    Dictionary(lopdf::Dictionary::from_iter(vec![(
                        "Font",
                        Reference(fonts_dictionary_id),
                    )])),
                ),
                ("Contents", Reference(page_content_id)),
            ]);
            page_ids.push(Reference(self.inner_document.add_object(page_dictionary)));
        }

        let pages = lopdf::Dictionary::from_iter(vec![
            ("Type", Name("Pages".into())),
            ("Count", Integer(page_ids.len() as i64)),
            ("Kids", Array(page_ids)),
        ]);
        self.inner_document
            .objects
            .insert(pages_id, Dictionary(pages));

        let catalog = lopdf::Dictionary::from_iter(vec![
            ("Type", Name("Catalog".into())),
            ("PageLayout", Name("OneColumn".into())),
            ("Pages", Reference(pages_id)),
        ]);
        let catalog_id = self.inner_document.add_object(catalog);

        self.inner_document
            .trailer
            .set("Root", Reference(catalog_id));
        self.inner_document
            .trailer
            .set("Info", Reference(document_info_id));
        self.inner_document.trailer.set(
            "ID",
            Array(vec![
                String(self.identifier.clone().into_bytes(), StringFormat::Literal),
                String(instance_id.as_bytes().to_vec(), StringFormat::Literal),
            ]),
        );
        self.written = true;

        Ok(())
    }

    /// Compresses the streams and drops unused objects, the output stays deterministic.
    pub fn optimize(&mut self) {
        self.inner_document.prune_objects();
        self.inner_document.delete_zero_length_streams();
        self.inner_document.renumber_objects();
        self.inner_document.compress();
    }

    pub fn save_to_bytes(&mut self) -> Result<Vec<u8>, ContextError> {
        if !self.written {
            return Err(ContextError::with_context(
                "The PDF document needs to be written before it can be saved",
            ));
        }
        let mut pdf_document_bytes = Vec::new();
        let mut writer = BufWriter::new(&mut pdf_document_bytes);
        self.inner_document.save_to(&mut writer).map_err(|error| {
            ContextError::with_error(
                ErrorKind::Io,
                "Error while saving the PDF document to bytes",
                &error,
            )
        })?;
        mem::drop(writer);

        Ok(pdf_document_bytes)
    }

    fn insert_fonts_into_document(
        &mut self,
        fonts: &FontBook,
    ) -> Result<lopdf::Dictionary, ContextError> {
        let mut fonts_dictionary = lopdf::Dictionary::new();

        for (resource_name, used_characters) in self.used_characters.iter() {
            let font = fonts.by_resource_name(resource_name).ok_or_else(|| {
                ContextError::of_kind(
                    ErrorKind::FontUnavailable,
                    format!("Failed to find the font {} in the font book", resource_name),
                )
            })?;
            let font_dictionary = font.insert_into_document(&mut self.inner_document, used_characters);
            let font_id = self
                .inner_document
                .add_object(lopdf::Object::Dictionary(font_dictionary));
            fonts_dictionary.set(resource_name.clone(), lopdf::Object::Reference(font_id));
        }

        Ok(fonts_dictionary)
    }

    fn get_mut_page(&mut self, page_index: usize) -> Result<&mut PdfPage, ContextError> {
        self.pages
            .get_mut(page_index)
            .ok_or(ContextError::with_context(format!(
                "Failed to find the page with index {}",
                page_index
            )))
    }
}

/// Encodes an information dictionary entry, as UTF-16 with a byte order mark unless it is ASCII.
fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::String(text.as_bytes().to_vec(), StringFormat::Literal);
    }
    let mut bytes = vec![0xFE, 0xFF];
    bytes.extend(text.encode_utf16().flat_map(|unit| unit.to_be_bytes()));
    Object::String(bytes, StringFormat::Hexadecimal)
}

fn to_pdf_timestamp_format(date: &OffsetDateTime) -> String {
    let offset = date.offset();
    let offset_sign = if offset.is_negative() { '-' } else { '+' };
    format!(
        "D:{:04}{:02}{:02}{:02}{:02}{:02}{offset_sign}{:02}'{:02}'",
        date.year(),
        u8::from(date.month()),
        date.day(),
        date.hour(),
        date.minute(),
        date.second(),
        offset.whole_hours().abs(),
        offset.minutes_past_hour().abs(),
    )
}
