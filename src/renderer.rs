use serde::{Deserialize, Serialize};

use crate::blocks::{ContentBlock, LineBlockArgs, TableBlockArgs, TextBlockArgs};
use crate::canvas::Canvas;
use crate::color::Color;
use crate::error::ContextError;
use crate::formats::{Formats, PAGE_HEIGHT};
use crate::pdf::{Metadata, PdfDocument};
use crate::table::{self, TableEstimate, TableSummary};

/// A stroke to sign on with a caption below it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SignatureArgs {
    /// Length of the stroke.
    pub w: f32,
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub text: Option<String>,
    pub line_width: Option<f32>,
    pub line_color: Option<Color>,
}

impl Default for SignatureArgs {
    fn default() -> Self {
        SignatureArgs {
            w: 60.0,
            x: None,
            y: None,
            text: None,
            line_width: None,
            line_color: None,
        }
    }
}

/// Renders content blocks in order onto a canvas, each block starting where the previous one
/// left the cursor.
pub struct Renderer {
    canvas: Canvas,
}

impl Renderer {
    pub fn new(formats: Formats) -> Result<Self, ContextError> {
        Ok(Renderer {
            canvas: Canvas::new(formats)?,
        })
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut Canvas {
        &mut self.canvas
    }

    pub fn render(&mut self, blocks: &[ContentBlock]) -> Result<(), ContextError> {
        for (index, block) in blocks.iter().enumerate() {
            log::debug!(
                "Rendering {} block {} on page {}",
                block.kind(),
                index,
                self.canvas.page_number()
            );
            self.render_block(block)?;
        }
        Ok(())
    }

    pub fn render_block(&mut self, block: &ContentBlock) -> Result<(), ContextError> {
        match block {
            ContentBlock::Text(args) => self.render_text(args),
            ContentBlock::Line(args) => self.render_line(args),
            ContentBlock::Table(args) => self.render_table(args).map(|_| ()),
        }
    }

    /// Draws every line of the block as its own wrapped paragraph in the block's typography,
    /// which only lasts for the block.
    pub fn render_text(&mut self, args: &TextBlockArgs) -> Result<(), ContextError> {
        draw_text_block(&mut self.canvas, args)
    }

    /// Strokes the line with its own width and color, the ambient stroke is left untouched.
    pub fn render_line(&mut self, args: &LineBlockArgs) -> Result<(), ContextError> {
        args.validate()?;
        let mut scope = self.canvas.scoped();
        scope.set_draw_color(args.color());
        scope.set_line_width(args.line_width);
        scope.draw_line(args.start(), args.end())
    }

    /// Draws the table below the cursor, on a new page if the table is unbreakable and its
    /// estimated bottom edge reaches into the footer.
    pub fn render_table(&mut self, args: &TableBlockArgs) -> Result<TableSummary, ContextError> {
        args.validate()?;
        let y = self.canvas.cursor().y + args.pt;
        self.canvas.next_line(Some(y))?;

        let estimate = self.estimate_table_height(args)?;
        let formats = self.canvas.formats();
        let threshold = PAGE_HEIGHT - formats.my - formats.pf;
        let page_has_content = self.canvas.cursor().y > formats.top_margin();
        if args.unbreakable && page_has_content && estimate.height >= threshold {
            log::debug!(
                "Moving an unbreakable table ending at {:.1}mm onto a new page",
                estimate.height
            );
            self.canvas.add_page()?;
        }

        let summary = table::draw_table(&mut self.canvas, args)?;
        let y = self.canvas.cursor().y + args.pb;
        self.canvas.next_line(Some(y))?;

        Ok(summary)
    }

    /// Measures the table at the cursor position without drawing anything.
    pub fn estimate_table_height(&self, args: &TableBlockArgs) -> Result<TableEstimate, ContextError> {
        table::estimate_table(&self.canvas, args)
    }

    /// Strokes a signature line at the given or the current position and writes the caption
    /// below it, starting at the same x coordinate.
    pub fn render_signature_area(&mut self, args: &SignatureArgs) -> Result<(), ContextError> {
        ContextError::check_length("signature width", args.w)?;
        if args.x.is_some() || args.y.is_some() {
            let cursor = self.canvas.cursor();
            self.canvas
                .set_cursor(args.x.unwrap_or(cursor.x), args.y.unwrap_or(cursor.y))?;
        }

        let mut scope = self.canvas.scoped();
        if let Some(line_width) = args.line_width {
            ContextError::check_length("signature line width", line_width)?;
            scope.set_line_width(line_width);
        }
        if let Some(line_color) = args.line_color {
            scope.set_draw_color(line_color);
        }
        let cursor = scope.cursor();
        scope.draw_line([cursor.x, cursor.y], [cursor.x + args.w, cursor.y])?;

        let caption_y = cursor.y + scope.line_height() * 0.35;
        scope.next_line(Some(caption_y))?;
        let caption = TextBlockArgs {
            x: Some(cursor.x),
            ..TextBlockArgs::new(args.text.clone())
        };
        draw_text_block(&mut scope, &caption)
    }

    /// Runs the footer on every page and assembles the PDF document.
    pub fn finish(self, metadata: &Metadata) -> Result<PdfDocument, ContextError> {
        self.canvas.finish(metadata)
    }
}

fn draw_text_block(canvas: &mut Canvas, args: &TextBlockArgs) -> Result<(), ContextError> {
    args.validate()?;
    let mut scope = canvas.scoped();
    scope.set_typography(&args.typography())?;

    let cursor = scope.cursor();
    let x = args.x.unwrap_or(cursor.x);
    let y = args.y.unwrap_or(cursor.y) + args.pt;
    scope.set_cursor(x, y)?;

    let line_height = scope.line_height();
    for paragraph in args.paragraphs() {
        scope.draw_wrapped_text(&paragraph, args.w, line_height, args.align)?;
    }

    let y = scope.cursor().y + args.pb;
    scope.next_line(Some(y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::tailwind;
    use crate::error::ErrorKind;
    use crate::style::{Align, FontStyle};

    fn renderer() -> Renderer {
        Renderer::new(Formats::default()).unwrap()
    }

    fn written_strings(renderer: &Renderer) -> Vec<Vec<u8>> {
        let pdf = renderer.canvas().pdf();
        (0..pdf.page_count())
            .flat_map(|page| pdf.page_operations(page).unwrap_or_default())
            .filter(|operation| operation.operator == "Tj")
            .filter_map(|operation| operation.operands.first()?.as_str().ok().map(<[u8]>::to_vec))
            .collect()
    }

    #[test]
    fn text_blocks_restore_the_previous_typography() {
        let mut renderer = renderer();
        let before = renderer.canvas().style_state();
        let args = TextBlockArgs {
            style: Some(FontStyle::BOLD),
            size: Some(12.0),
            color: Some(tailwind::INDIGO_600),
            ..TextBlockArgs::new(["Rechnung 230282-287"])
        };
        renderer.render_text(&args).unwrap();
        assert_eq!(renderer.canvas().style_state(), before);
    }

    #[test]
    fn text_blocks_move_below_their_lines_and_padding() {
        let mut renderer = renderer();
        let args = TextBlockArgs {
            y: Some(92.0),
            pt: 2.0,
            pb: 5.0,
            ..TextBlockArgs::new(["Datum: 16.10.2024", "Bearbeiter: Max Mustermann"])
        };
        renderer.render_text(&args).unwrap();
        let line_height = renderer.canvas().line_height();
        let cursor = renderer.canvas().cursor();
        assert_eq!(cursor.x, 23.0);
        assert!((cursor.y - (92.0 + 2.0 + 2.0 * line_height + 5.0)).abs() < 1e-4);
    }

    #[test]
    fn one_line_blocks_render_a_single_joined_string() {
        let mut renderer = renderer();
        let args = TextBlockArgs {
            one_line: true,
            ..TextBlockArgs::new(["A", "B", "C"])
        };
        renderer.render_text(&args).unwrap();
        let strings = written_strings(&renderer);
        assert_eq!(strings, vec![b"A \x95 B \x95 C".to_vec()]);
    }

    #[test]
    fn lines_omitting_an_end_are_axis_aligned() {
        let mut renderer = renderer();
        let before = renderer.canvas().style_state();
        let args = LineBlockArgs {
            x2: Some(7.0),
            ..LineBlockArgs::new(3.0, 99.0)
        };
        assert_eq!(args.end(), [7.0, 99.0]);
        renderer.render_line(&args).unwrap();
        let vertical = LineBlockArgs {
            y2: Some(120.0),
            ..LineBlockArgs::new(50.0, 100.0)
        };
        assert_eq!(vertical.end(), [50.0, 120.0]);
        renderer.render_line(&vertical).unwrap();
        assert_eq!(renderer.canvas().style_state(), before);
    }

    #[test]
    fn negative_widths_are_invalid_geometry() {
        let mut renderer = renderer();
        let args = TextBlockArgs {
            w: -1.0,
            ..TextBlockArgs::new(["x"])
        };
        assert_eq!(
            renderer.render_text(&args).unwrap_err().kind,
            ErrorKind::InvalidGeometry
        );
    }

    #[test]
    fn too_narrow_text_fails_the_measurement() {
        let mut renderer = renderer();
        let args = TextBlockArgs {
            w: 2.5,
            ..TextBlockArgs::new(["Konzertflügel"])
        };
        assert_eq!(
            renderer.render_text(&args).unwrap_err().kind,
            ErrorKind::MeasurementFailure
        );
    }

    #[test]
    fn unbreakable_tables_move_to_a_new_page() {
        let mut renderer = renderer();
        renderer.canvas_mut().set_cursor(23.0, 250.0).unwrap();
        let args = TableBlockArgs {
            unbreakable: true,
            first_row_as_headings: false,
            ..TableBlockArgs::new(&[["a"], ["b"], ["c"], ["d"], ["e"], ["f"]])
        };
        let estimate = renderer.estimate_table_height(&args).unwrap();
        assert!(estimate.height >= 277.0);

        let summary = renderer.render_table(&args).unwrap();
        assert_eq!(summary.pages, 1);
        assert_eq!(renderer.canvas().page_count(), 2);
        assert_eq!(renderer.canvas().pdf().page_operations(0).unwrap().len(), 0);
    }

    #[test]
    fn unbreakable_tables_taller_than_a_page_start_on_the_current_one() {
        let mut renderer = renderer();
        let items: Vec<[String; 1]> = (0..70).map(|index| [format!("Position {index}")]).collect();
        let args = TableBlockArgs {
            unbreakable: true,
            first_row_as_headings: false,
            ..TableBlockArgs::new(&items)
        };
        assert!(renderer.estimate_table_height(&args).unwrap().height >= 277.0);

        let summary = renderer.render_table(&args).unwrap();
        assert_eq!(renderer.canvas().page_count(), summary.pages);
        assert!(!renderer.canvas().pdf().page_operations(0).unwrap().is_empty());
    }

    #[test]
    fn breakable_tables_split_across_pages() {
        let mut renderer = renderer();
        renderer.canvas_mut().set_cursor(23.0, 250.0).unwrap();
        let args = TableBlockArgs::new(&[["a"], ["b"], ["c"], ["d"], ["e"], ["f"], ["g"]]);
        let summary = renderer.render_table(&args).unwrap();
        assert_eq!(summary.pages, 2);
        assert_eq!(summary.repeated_headings, 1);
    }

    #[test]
    fn signature_areas_caption_below_the_stroke() {
        let mut renderer = renderer();
        let before = renderer.canvas().style_state();
        renderer
            .render_signature_area(&SignatureArgs {
                x: Some(120.0),
                y: Some(250.0),
                text: Some("Ort, Datum, Unterschrift".into()),
                line_width: Some(0.3),
                line_color: Some(tailwind::SLATE_600),
                ..SignatureArgs::default()
            })
            .unwrap();
        assert_eq!(renderer.canvas().style_state(), before);
        assert_eq!(written_strings(&renderer), vec![b"Ort, Datum, Unterschrift".to_vec()]);
        assert_eq!(renderer.canvas().cursor().x, 23.0);
        assert!(renderer.canvas().cursor().y > 250.0);
    }

    #[test]
    fn right_aligned_text_ends_at_the_right_margin() {
        let mut renderer = renderer();
        let args = TextBlockArgs {
            align: Align::Right,
            ..TextBlockArgs::new(["24118 Kiel"])
        };
        renderer.render_text(&args).unwrap();
        let pdf = renderer.canvas().pdf();
        let position = pdf
            .page_operations(0)
            .unwrap()
            .iter()
            .find(|operation| operation.operator == "Td")
            .and_then(|operation| operation.operands.first()?.as_float().ok())
            .unwrap();
        assert!(position > crate::pdf::millimeters_to_points(100.0));
    }
}
