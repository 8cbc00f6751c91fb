use std::ops::{Deref, DerefMut};

use crate::color::{tailwind, Color};
use crate::error::ContextError;
use crate::fonts::FontBook;
use crate::formats::{Formats, PAGE_HEIGHT, PAGE_WIDTH};
use crate::measure::{TextMeasure as _, WrappedLine, CELL_MARGIN};
use crate::pdf::{points_to_millimeters, Metadata, PdfDocument, DEFAULT_DOCUMENT_IDENTIFIER, DEFAULT_INSTANCE_IDENTIFIER};
use crate::style::{Align, FontStyle, Typography, TypographyOverride};

/// Position on the current page in millimeters, measured from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cursor {
    pub x: f32,
    pub y: f32,
}

/// Everything the drawing primitives read implicitly when an argument is omitted.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleState {
    pub typography: Typography,
    pub draw_color: Color,
    pub line_width: f32,
    pub fill_color: Color,
}

/// The number of wrapped lines a text occupies and their total height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextExtent {
    pub lines: usize,
    pub height: f32,
}

/// The drawing surface of a render pass: a document of A4 pages together with the cursor and
/// the ambient style every primitive falls back to.
pub struct Canvas {
    pdf: PdfDocument,
    fonts: FontBook,
    formats: Formats,
    page_index: usize,
    cursor: Cursor,
    style: StyleState,
    auto_page_break: bool,
}

impl Canvas {
    /// Creates the canvas and its first page, loading the fonts the formats refer to.
    pub fn new(formats: Formats) -> Result<Self, ContextError> {
        formats.validate()?;

        let mut fonts = FontBook::with_standard_fonts();
        for font_association in &formats.font_associations {
            fonts.add_true_type_font(
                &font_association.family,
                font_association.style,
                &font_association.path,
            )?;
        }
        fonts.resolve(&formats.typography.family, formats.typography.style)?;

        let mut canvas = Canvas {
            pdf: PdfDocument::new(DEFAULT_DOCUMENT_IDENTIFIER.into()),
            fonts,
            cursor: Cursor {
                x: formats.left_margin(),
                y: formats.top_margin(),
            },
            style: StyleState {
                typography: formats.typography.clone(),
                draw_color: tailwind::BLACK,
                line_width: 0.2,
                fill_color: tailwind::WHITE,
            },
            formats,
            page_index: 0,
            auto_page_break: true,
        };
        canvas.add_page()?;

        Ok(canvas)
    }

    pub fn formats(&self) -> &Formats {
        &self.formats
    }

    pub fn fonts(&self) -> &FontBook {
        &self.fonts
    }

    pub fn pdf(&self) -> &PdfDocument {
        &self.pdf
    }

    pub fn page_count(&self) -> usize {
        self.pdf.page_count()
    }

    /// The 1-based number of the page currently drawn on.
    pub fn page_number(&self) -> usize {
        self.page_index + 1
    }

    /// Starts a new page, puts the cursor into its top-left corner and runs the header hook.
    pub fn add_page(&mut self) -> Result<(), ContextError> {
        self.page_index = self.pdf.add_page(PAGE_WIDTH, PAGE_HEIGHT);
        self.cursor = Cursor {
            x: self.formats.left_margin(),
            y: self.formats.top_margin(),
        };
        log::debug!("Started page {}", self.page_number());
        self.header()
    }

    /// Draws the fold marks into the left border of the first page.
    fn header(&mut self) -> Result<(), ContextError> {
        if self.page_index != 0 {
            return Ok(());
        }
        let fold_marks = self.formats.fold_marks.clone();
        let mut scope = self.scoped();
        scope.set_line_width(0.1);
        for fold_mark in fold_marks {
            scope.set_draw_color(fold_mark.color.unwrap_or(tailwind::SLATE_900));
            scope.draw_line(
                [fold_mark.pl, fold_mark.y],
                [fold_mark.pl + fold_mark.length, fold_mark.y],
            )?;
        }
        Ok(())
    }

    /// Writes the page numbers once the total number of pages is known.
    fn footer(&mut self) -> Result<(), ContextError> {
        let footer = self.formats.footer.clone();
        if !footer.show_page_number {
            return Ok(());
        }
        let page_count = self.pdf.page_count();
        let mut scope = self.scoped();
        scope.auto_page_break = false;
        for page_index in 0..page_count {
            if page_index == 0 && !footer.show_on_first_page {
                continue;
            }
            let cursor = Cursor {
                x: scope.formats.left_margin(),
                y: PAGE_HEIGHT - scope.formats.my,
            };
            scope.page_index = page_index;
            scope.cursor = cursor;
            scope.set_typography(&footer.typography)?;
            let line_height = scope.line_height();
            scope.draw_wrapped_text(
                &format!("Seite {} von {}", page_index + 1, page_count),
                0.0,
                line_height,
                footer.align,
            )?;
        }
        scope.auto_page_break = true;
        Ok(())
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn set_cursor(&mut self, x: f32, y: f32) -> Result<(), ContextError> {
        ContextError::check_length("x coordinate", x)?;
        ContextError::check_length("y coordinate", y)?;
        self.cursor = Cursor { x, y };
        Ok(())
    }

    pub fn set_x(&mut self, x: f32) -> Result<(), ContextError> {
        self.set_cursor(x, self.cursor.y)
    }

    pub fn set_y(&mut self, y: f32) -> Result<(), ContextError> {
        self.set_cursor(self.cursor.x, y)
    }

    /// Moves the cursor to the left margin of the next line, or of the line at `new_y`.
    pub fn next_line(&mut self, new_y: Option<f32>) -> Result<(), ContextError> {
        let y = new_y.unwrap_or(self.cursor.y + self.line_height());
        self.set_cursor(self.formats.left_margin(), y)
    }

    pub fn typography(&self) -> &Typography {
        &self.style.typography
    }

    /// Applies the given typography, every omitted field falling back to the document default
    /// and an omitted style to the regular face.
    pub fn set_typography(&mut self, typography: &TypographyOverride) -> Result<(), ContextError> {
        typography.validate()?;
        let typography = typography.resolve(&self.formats.typography);
        self.fonts.resolve(&typography.family, typography.style)?;
        self.style.typography = typography;
        Ok(())
    }

    /// Applies a fully resolved typography as it is.
    pub fn apply_typography(&mut self, typography: Typography) -> Result<(), ContextError> {
        self.set_font(&typography.family, typography.style, typography.size)?;
        self.set_text_color(typography.color);
        Ok(())
    }

    pub fn set_font(
        &mut self,
        family: &str,
        style: FontStyle,
        size: f32,
    ) -> Result<(), ContextError> {
        ContextError::check_length("font size", size)?;
        self.fonts.resolve(family, style)?;
        self.style.typography.family = family.to_string();
        self.style.typography.style = style;
        self.style.typography.size = size;
        Ok(())
    }

    pub fn set_text_color(&mut self, color: Color) {
        self.style.typography.color = color;
    }

    pub fn draw_color(&self) -> Color {
        self.style.draw_color
    }

    pub fn set_draw_color(&mut self, color: Color) {
        self.style.draw_color = color;
    }

    pub fn line_width(&self) -> f32 {
        self.style.line_width
    }

    pub fn set_line_width(&mut self, line_width: f32) {
        self.style.line_width = line_width;
    }

    pub fn fill_color(&self) -> Color {
        self.style.fill_color
    }

    pub fn set_fill_color(&mut self, color: Color) {
        self.style.fill_color = color;
    }

    pub fn style_state(&self) -> StyleState {
        self.style.clone()
    }

    /// Saves the ambient style, which is restored when the returned scope is dropped.
    pub fn scoped(&mut self) -> StyleScope<'_> {
        let saved = self.style.clone();
        StyleScope {
            canvas: self,
            saved: Some(saved),
        }
    }

    /// The height of one line of text in the current typography.
    pub fn line_height(&self) -> f32 {
        self.font_size() * self.formats.line_height
    }

    /// The current font size in millimeters.
    pub fn font_size(&self) -> f32 {
        points_to_millimeters(self.style.typography.size)
    }

    /// The y coordinate which triggers an automatic page break when crossed.
    pub fn page_break_trigger(&self) -> f32 {
        self.formats.page_break_trigger()
    }

    /// Whether drawing something of the given height at the cursor would cross the page break
    /// trigger on a page which already has content.
    pub fn needs_page_break(&self, height: f32) -> bool {
        self.auto_page_break
            && self.cursor.y + height > self.page_break_trigger()
            && self.cursor.y > self.formats.top_margin()
    }

    /// Resolves a width of zero to the space between the cursor and the right margin.
    pub fn resolve_width(&self, w: f32) -> Result<f32, ContextError> {
        ContextError::check_length("width", w)?;
        if w == 0.0 {
            Ok(PAGE_WIDTH - self.formats.right_margin() - self.cursor.x)
        } else {
            Ok(w)
        }
    }

    /// Wraps text in the current typography into a cell of width `w` without drawing anything.
    pub fn wrap_text(&self, text: &str, w: f32) -> Result<Vec<WrappedLine>, ContextError> {
        let width = self.resolve_width(w)?;
        self.fonts
            .wrap(text, &self.style.typography, width - 2.0 * CELL_MARGIN)
    }

    /// The dry-run counterpart of `draw_wrapped_text`.
    pub fn measure_wrapped_text(
        &self,
        text: &str,
        w: f32,
        line_height: f32,
    ) -> Result<TextExtent, ContextError> {
        ContextError::check_length("line height", line_height)?;
        let width = self.resolve_width(w)?;
        let lines = self
            .fonts
            .line_count(text, &self.style.typography, width - 2.0 * CELL_MARGIN)?;
        Ok(TextExtent {
            lines,
            height: lines as f32 * line_height,
        })
    }

    /// Draws text wrapped into a cell of width `w`, one line every `line_height`, breaking the
    /// page when a line would cross the trigger. Afterwards the cursor is at the left edge of the
    /// cell, right below the last line.
    pub fn draw_wrapped_text(
        &mut self,
        text: &str,
        w: f32,
        line_height: f32,
        align: Align,
    ) -> Result<Cursor, ContextError> {
        ContextError::check_length("line height", line_height)?;
        let width = self.resolve_width(w)?;
        let lines = self.wrap_text(text, width)?;
        let x = self.cursor.x;

        for line in &lines {
            if self.needs_page_break(line_height) {
                self.add_page()?;
                self.cursor.x = x;
            }
            let y = self.cursor.y;
            self.draw_text_line(line, [x, y], width, line_height, align)?;
            self.cursor.y = y + line_height;
        }

        Ok(self.cursor)
    }

    /// Draws a single already wrapped line into the cell whose top-left corner is `origin`.
    pub(crate) fn draw_text_line(
        &mut self,
        line: &WrappedLine,
        origin: [f32; 2],
        width: f32,
        line_height: f32,
        align: Align,
    ) -> Result<(), ContextError> {
        if line.text.is_empty() {
            return Ok(());
        }
        let [x, y] = origin;
        let typography = self.style.typography.clone();
        let font = self
            .fonts
            .resolve(&typography.family, typography.style)?
            .clone();
        let font_size = self.font_size();
        let baseline = y + 0.5 * line_height + 0.3 * font_size;
        let inner_width = width - 2.0 * CELL_MARGIN;

        let justify = align == Align::Justify && !line.ends_paragraph && line.text.contains(' ');
        if justify {
            let words: Vec<&str> = line.text.split(' ').collect();
            let words_width: f32 = words
                .iter()
                .map(|word| font.text_width(word, typography.size))
                .sum();
            let gap = (inner_width - words_width) / (words.len() - 1) as f32;
            let mut word_x = x + CELL_MARGIN;
            for word in words {
                self.pdf.write_text(
                    self.page_index,
                    &font,
                    typography.size,
                    typography.color,
                    [word_x, baseline],
                    word,
                )?;
                word_x += font.text_width(word, typography.size) + gap;
            }
        } else {
            let text_x = match align {
                Align::Left | Align::Justify => x + CELL_MARGIN,
                Align::Center => x + (width - line.width) / 2.0,
                Align::Right => x + width - CELL_MARGIN - line.width,
            };
            self.pdf.write_text(
                self.page_index,
                &font,
                typography.size,
                typography.color,
                [text_x, baseline],
                &line.text,
            )?;
        }

        if typography.style.underline {
            let underline_y = baseline + 0.1 * font_size;
            let (start, length) = if justify {
                (x + CELL_MARGIN, inner_width)
            } else {
                let start = match align {
                    Align::Left | Align::Justify => x + CELL_MARGIN,
                    Align::Center => x + (width - line.width) / 2.0,
                    Align::Right => x + width - CELL_MARGIN - line.width,
                };
                (start, line.width)
            };
            self.pdf.draw_line(
                self.page_index,
                [start, underline_y],
                [start + length, underline_y],
                0.05 * font_size,
                typography.color,
            )?;
        }

        Ok(())
    }

    /// Strokes a line with the ambient draw color and line width.
    pub fn draw_line(&mut self, from: [f32; 2], to: [f32; 2]) -> Result<(), ContextError> {
        for coordinate in from.iter().chain(to.iter()) {
            ContextError::check_length("line coordinate", *coordinate)?;
        }
        ContextError::check_length("line width", self.style.line_width)?;
        self.pdf.draw_line(
            self.page_index,
            from,
            to,
            self.style.line_width,
            self.style.draw_color,
        )
    }

    /// Fills a rectangle with the ambient fill color.
    pub fn fill_rect(&mut self, origin: [f32; 2], size: [f32; 2]) -> Result<(), ContextError> {
        self.pdf
            .fill_rectangle(self.page_index, origin, size, self.style.fill_color)
    }

    /// Runs the footer hook on every page and writes the document.
    pub fn finish(mut self, metadata: &Metadata) -> Result<PdfDocument, ContextError> {
        self.footer()?;
        let Canvas {
            mut pdf, fonts, ..
        } = self;
        pdf.write_all(&fonts, metadata, DEFAULT_INSTANCE_IDENTIFIER)?;
        log::debug!("Finished a document of {} pages", pdf.page_count());
        Ok(pdf)
    }
}

/// Restores the ambient style of its canvas when dropped, so overrides applied through it
/// never leak into whatever is drawn afterwards.
pub struct StyleScope<'a> {
    canvas: &'a mut Canvas,
    saved: Option<StyleState>,
}

impl Deref for StyleScope<'_> {
    type Target = Canvas;

    fn deref(&self) -> &Canvas {
        self.canvas
    }
}

impl DerefMut for StyleScope<'_> {
    fn deref_mut(&mut self) -> &mut Canvas {
        self.canvas
    }
}

impl Drop for StyleScope<'_> {
    fn drop(&mut self) {
        if let Some(saved) = self.saved.take() {
            self.canvas.style = saved;
        }
    }
}
