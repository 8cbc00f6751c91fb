//! rechnr renders invoices into paginated A4 PDF documents from an ordered list of declarative
//! content blocks: text, lines and tables. The blocks can be written in code or loaded from a
//! JSON document, which is specified by the `Document` struct.
//!
//! Every block starts where the previous one left the cursor and draws with the ambient style
//! of the canvas, which it may override for its own duration only. Tables are measured before
//! they are drawn, so that a table which must not be split across pages can be moved onto a new
//! page as a whole.

/// The module were the `Document` interface is presented.
///
/// # Introduction
///
/// A `Document` comprises of its metadata, optionally the formats which define its appearance,
/// and the content blocks. It can be loaded from a JSON file with `Document::from_path`, where
/// blocks of an unknown kind are rejected right away, and rendered with `to_pdf_document` or
/// `save_to_pdf_file`. The latter only writes the file once the whole document rendered
/// successfully.
pub mod document;

/// The content blocks, `ContentBlock`, and the argument record of each of their kinds.
pub mod blocks;

/// Walks the content blocks in order and dispatches each of them to its handler.
///
/// The `Renderer` also offers the signature area, which is not a block kind of its own, and the
/// estimation of the height of a table at the current cursor position.
pub mod renderer;

/// The drawing surface of a render pass.
///
/// The `Canvas` owns the pages, the cursor and the ambient style: typography, stroke and fill.
/// Overrides are applied through a `StyleScope`, which restores the previous style when it goes
/// out of scope, so that nothing a block changes leaks into the blocks drawn after it.
pub mod canvas;

/// Drawing and measuring of tables, sharing the same wrapping so that the estimate of a table
/// matches what is eventually drawn.
pub mod table;

/// Text wrapping based on font metrics only, which never touches a page.
pub mod measure;

/// The standard Type1 fonts with their metrics and TrueType fonts loaded from files.
pub mod fonts;

/// The appearance of a document: margins, paddings, the default typography, footer, fold marks
/// and additional font files.
pub mod formats;

/// Font styles, alignments and typographies.
pub mod style;

/// RGB colors and a small subset of the Tailwind palette.
pub mod color;

/// The sample invoice.
pub mod invoice;

/// This module contains the `ContextError` type which is the error type used throughout this library.
///
/// The reason why this type has been implemented is to uniform the error reporting without
/// delving too deep into specific error codes. Each error carries an `ErrorKind` for callers
/// that need to tell failures apart, a context explaining what went wrong and possibly the
/// message of the error it was propagated from.
pub mod error;

/// The module were the `PdfDocument` interface for working with PDF documents is presented.
///
/// # Disclaimer
///
/// The documents produced by this module are deterministic: the document and instance
/// identifiers are fixed and the creation date is the UNIX epoch unless one is given in the
/// metadata. Rendering the same blocks twice therefore yields byte-identical files, which is
/// what makes the output testable.
///
/// # Introduction
///
/// The main component of this module is the struct `PdfDocument`. Pages are added with
/// `add_page`, drawn onto with `write_text`, `draw_line` and `fill_rectangle`, and finally
/// assembled with `write_all` and serialized with `save_to_bytes`.
pub mod pdf;
