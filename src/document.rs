use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::blocks::ContentBlock;
use crate::error::{ContextError, ErrorKind};
use crate::formats::Formats;
use crate::pdf::{Metadata, PdfDocument};
use crate::renderer::Renderer;

/// A complete invoice: its metadata, its appearance and the blocks to render in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formats: Option<Formats>,
    pub blocks: Vec<ContentBlock>,
}

/// The shape of a document file before the blocks are checked against their kinds.
#[derive(Deserialize)]
struct DocumentFile {
    #[serde(default)]
    metadata: Metadata,
    #[serde(default)]
    formats: Option<Formats>,
    blocks: Vec<serde_json::Value>,
}

impl Document {
    pub fn new(metadata: Metadata, blocks: Vec<ContentBlock>) -> Self {
        Document {
            metadata,
            formats: None,
            blocks,
        }
    }

    pub fn from_path(document_path: &Path) -> Result<Document, ContextError> {
        let document_content = std::fs::read_to_string(document_path).map_err(|error| {
            ContextError::with_error(
                ErrorKind::Io,
                format!("Unable to read the document {:?}", document_path),
                &error,
            )
        })?;
        Document::from_json_str(&document_content).map_err(|error| ContextError {
            context: format!("Unable to load the document {:?}: {}", document_path, error.context),
            ..error
        })
    }

    /// Parses a document, rejecting blocks of an unknown kind with `ErrorKind::UnknownBlockKind`.
    pub fn from_json_str(document_content: &str) -> Result<Document, ContextError> {
        let document_file: DocumentFile =
            serde_json::from_str(document_content).map_err(|error| {
                ContextError::with_error(ErrorKind::Serialization, "Unable to parse the document", &error)
            })?;
        let blocks = document_file
            .blocks
            .into_iter()
            .map(ContentBlock::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Document {
            metadata: document_file.metadata,
            formats: document_file.formats,
            blocks,
        })
    }

    /// Renders the blocks into a written PDF document, with the formats of the document unless
    /// others are given.
    pub fn to_pdf_document(&self, formats: Option<&Formats>) -> Result<PdfDocument, ContextError> {
        let formats = formats
            .or(self.formats.as_ref())
            .cloned()
            .unwrap_or_default();
        let mut renderer = Renderer::new(formats)?;
        renderer.render(&self.blocks)?;
        renderer.finish(&self.metadata)
    }

    pub fn save_to_bytes(&self, formats: Option<&Formats>, compress: bool) -> Result<Vec<u8>, ContextError> {
        let mut pdf_document = self.to_pdf_document(formats)?;
        if compress {
            pdf_document.optimize();
        }
        pdf_document.save_to_bytes()
    }

    /// Renders the document and writes it to the given path. Nothing is written when rendering
    /// fails.
    pub fn save_to_pdf_file(
        &self,
        pdf_file_path: &Path,
        formats: Option<&Formats>,
        compress: bool,
    ) -> Result<(), ContextError> {
        let pdf_document_bytes = self.save_to_bytes(formats, compress)?;
        std::fs::write(pdf_file_path, &pdf_document_bytes).map_err(|error| {
            ContextError::with_error(
                ErrorKind::Io,
                format!("Unable to write the PDF document to {:?}", pdf_file_path),
                &error,
            )
        })?;
        log::info!(
            "Saved {} bytes to {:?}",
            pdf_document_bytes.len(),
            pdf_file_path
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_parse_metadata_formats_and_blocks() {
        let document = Document::from_json_str(
            r#"{
                "metadata": { "title": "Rechnung", "author": "Max Mustermann" },
                "formats": { "mx": 20 },
                "blocks": [
                    { "type": "text", "args": { "lines": ["Hallo"] } },
                    { "type": "line", "args": { "x1": 3, "y1": 99 } }
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(document.metadata.title, "Rechnung");
        assert_eq!(document.formats.as_ref().map(|formats| formats.mx), Some(20.0));
        assert_eq!(document.blocks.len(), 2);
    }

    #[test]
    fn unknown_block_kinds_keep_their_error_kind() {
        let error = Document::from_json_str(
            r#"{ "blocks": [{ "type": "text", "args": { "lines": [] } }, { "type": "circle", "args": {} }] }"#,
        )
        .unwrap_err();
        assert_eq!(error.kind, ErrorKind::UnknownBlockKind);
    }

    #[test]
    fn missing_files_are_io_errors() {
        let error = Document::from_path(Path::new("does/not/exist.json")).unwrap_err();
        assert_eq!(error.kind, ErrorKind::Io);
    }

    #[test]
    fn rendering_produces_a_loadable_pdf() {
        let document = Document::new(
            Metadata::default(),
            vec![ContentBlock::Text(crate::blocks::TextBlockArgs::new(["Hallo Welt"]))],
        );
        let bytes = document.save_to_bytes(None, true).unwrap();
        let loaded = lopdf::Document::load_mem(&bytes).unwrap();
        assert_eq!(loaded.get_pages().len(), 1);
    }
}
