use crate::blocks::{BordersLayout, CellFormat, TableBlockArgs};
use crate::canvas::Canvas;
use crate::color::Color;
use crate::error::{ContextError, ErrorKind};
use crate::measure::{TextMeasure as _, WrappedLine, CELL_MARGIN};
use crate::style::Typography;

/// The dry-run measurement of a table at the current cursor position.
#[derive(Debug, Clone, PartialEq)]
pub struct TableEstimate {
    /// The number of text lines of the tallest cell of each row.
    pub row_line_counts: Vec<usize>,
    pub row_heights: Vec<f32>,
    /// The y coordinate of the bottom edge of the table, counting a gutter below every row
    /// including the last one, so it exceeds the drawn bottom edge by one `gutter_height`.
    pub height: f32,
}

/// What has actually been drawn for a table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSummary {
    pub row_line_counts: Vec<usize>,
    pub row_heights: Vec<f32>,
    /// How often the heading row was repeated at the top of a new page.
    pub repeated_headings: usize,
    /// The number of pages the table was drawn onto.
    pub pages: usize,
}

/// The horizontal geometry of a table and the height of its text lines.
#[derive(Debug, Clone, PartialEq)]
struct TableLayout {
    column_offsets: Vec<f32>,
    column_widths: Vec<f32>,
    line_height: f32,
}

impl TableLayout {
    fn new(canvas: &Canvas, args: &TableBlockArgs) -> Result<Self, ContextError> {
        let formats = canvas.formats();
        let column_count = args.column_count();
        let table_width = args.width.unwrap_or_else(|| formats.effective_page_width());
        let gutters = args.gutter_width * column_count.saturating_sub(1) as f32;
        let available_width = table_width - gutters;
        if column_count > 0 && available_width <= 0.0 {
            return Err(ContextError::of_kind(
                ErrorKind::InvalidGeometry,
                format!("The gutters leave no space for the columns of a table {table_width}mm wide"),
            ));
        }

        let column_widths: Vec<f32> = match &args.col_widths {
            Some(weights) => {
                let total: f32 = weights.iter().sum();
                weights
                    .iter()
                    .map(|weight| weight / total * available_width)
                    .collect()
            }
            None => vec![available_width / column_count.max(1) as f32; column_count],
        };

        let left = formats.left_margin()
            + ((formats.effective_page_width() - table_width) / 2.0).max(0.0);
        let column_offsets = column_widths
            .iter()
            .scan(left, |x, width| {
                let offset = *x;
                *x += width + args.gutter_width;
                Some(offset)
            })
            .collect();

        Ok(TableLayout {
            column_offsets,
            column_widths,
            line_height: args.line_height.unwrap_or_else(|| canvas.line_height()),
        })
    }
}

#[derive(Debug, Clone)]
struct PreparedCell {
    typography: Typography,
    fill_color: Option<Color>,
    lines: Vec<WrappedLine>,
}

#[derive(Debug, Clone)]
struct PreparedRow {
    cells: Vec<PreparedCell>,
    line_count: usize,
    height: f32,
}

/// The typography of a cell: the ambient one, bold for heading cells, under the cell's format.
fn cell_typography(
    ambient: &Typography,
    heading: bool,
    cell_format: Option<&CellFormat>,
) -> Typography {
    let mut typography = ambient.clone();
    if heading {
        typography.style.bold = true;
    }
    if let Some(cell_format) = cell_format {
        if let Some(family) = &cell_format.family {
            typography.family = family.clone();
        }
        if let Some(style) = cell_format.style {
            typography.style = style;
        }
        if let Some(size) = cell_format.size {
            typography.size = size;
        }
        if let Some(color) = cell_format.color {
            typography.color = color;
        }
    }
    typography
}

/// Resolves the typography and the fill of every cell and wraps its text, which is all the
/// measuring and the drawing of a table need.
fn prepare_rows(
    canvas: &Canvas,
    args: &TableBlockArgs,
    layout: &TableLayout,
) -> Result<Vec<PreparedRow>, ContextError> {
    let cell_formats = args.parsed_cell_formats()?;
    let ambient = canvas.typography();

    let mut rows = Vec::with_capacity(args.table_items.len());
    for (row_index, items) in args.table_items.iter().enumerate() {
        let heading = row_index == 0 && args.has_heading();
        let mut cells = Vec::with_capacity(layout.column_widths.len());

        for (column_index, column_width) in layout.column_widths.iter().enumerate() {
            let cell_format = cell_formats.get(&(row_index, column_index)).copied();
            let typography = cell_typography(ambient, heading, cell_format);
            let text = items.get(column_index).map(String::as_str).unwrap_or("");
            let text_width = column_width - args.padding.horizontal() - 2.0 * CELL_MARGIN;
            let lines = canvas.fonts().wrap(text, &typography, text_width)?;

            let fill_color = cell_format.and_then(|cell_format| cell_format.bg_color).or_else(|| {
                (!heading && args.cell_fill_mode.fills(row_index, column_index))
                    .then(|| args.cell_fill_color.unwrap_or_else(|| canvas.fill_color()))
            });

            cells.push(PreparedCell {
                typography,
                fill_color,
                lines,
            });
        }

        let line_count = cells.iter().map(|cell| cell.lines.len()).max().unwrap_or(1);
        rows.push(PreparedRow {
            cells,
            line_count,
            height: line_count as f32 * layout.line_height + args.padding.vertical(),
        });
    }

    Ok(rows)
}

/// Measures the table as it would be drawn at the current cursor position, without drawing.
pub fn estimate_table(canvas: &Canvas, args: &TableBlockArgs) -> Result<TableEstimate, ContextError> {
    args.validate()?;
    let layout = TableLayout::new(canvas, args)?;
    let rows = prepare_rows(canvas, args, &layout)?;

    let row_heights: Vec<f32> = rows.iter().map(|row| row.height).collect();
    let height = canvas.cursor().y
        + row_heights.iter().sum::<f32>()
        + rows.len() as f32 * args.gutter_height;

    Ok(TableEstimate {
        row_line_counts: rows.iter().map(|row| row.line_count).collect(),
        row_heights,
        height,
    })
}

/// Draws the table row by row from the current cursor position, breaking the page between rows
/// and repeating the heading row on every new page. Afterwards the cursor is at the left margin
/// below the last row.
pub fn draw_table(canvas: &mut Canvas, args: &TableBlockArgs) -> Result<TableSummary, ContextError> {
    args.validate()?;
    let layout = TableLayout::new(canvas, args)?;
    let rows = prepare_rows(canvas, args, &layout)?;

    let mut scope = canvas.scoped();
    scope.set_draw_color(args.line_color);
    scope.set_line_width(args.line_width);

    let printable_height = scope.page_break_trigger() - scope.formats().top_margin();
    let mut summary = TableSummary {
        row_line_counts: Vec::with_capacity(rows.len()),
        row_heights: Vec::with_capacity(rows.len()),
        repeated_headings: 0,
        pages: 1,
    };
    let mut y = scope.cursor().y;

    for (row_index, row) in rows.iter().enumerate() {
        if row_index > 0 {
            y += args.gutter_height;
        }
        scope.set_y(y)?;

        if scope.needs_page_break(row.height) {
            scope.add_page()?;
            summary.pages += 1;
            y = scope.cursor().y;
            log::debug!("Table row {} continues on page {}", row_index, scope.page_number());

            if args.has_heading() && row_index > 0 {
                draw_row(&mut scope, args, &layout, 0, &rows[0], y, rows.len())?;
                y += rows[0].height + args.gutter_height;
                summary.repeated_headings += 1;
            }
        }
        if row.height > printable_height {
            log::warn!(
                "Table row {} is {:.1}mm tall and does not fit onto a single page",
                row_index,
                row.height
            );
        }

        draw_row(&mut scope, args, &layout, row_index, row, y, rows.len())?;
        y += row.height;
        summary.row_line_counts.push(row.line_count);
        summary.row_heights.push(row.height);
    }

    let left_margin = scope.formats().left_margin();
    scope.set_cursor(left_margin, y)?;

    Ok(summary)
}

fn draw_row(
    canvas: &mut Canvas,
    args: &TableBlockArgs,
    layout: &TableLayout,
    row_index: usize,
    row: &PreparedRow,
    y: f32,
    row_count: usize,
) -> Result<(), ContextError> {
    let cells = || {
        row.cells
            .iter()
            .zip(layout.column_offsets.iter().zip(&layout.column_widths))
            .enumerate()
    };

    for (_, (cell, (&x, &width))) in cells() {
        if let Some(fill_color) = cell.fill_color {
            let mut scope = canvas.scoped();
            scope.set_fill_color(fill_color);
            scope.fill_rect([x, y], [width, row.height])?;
        }
    }

    for (column_index, (cell, (&x, &width))) in cells() {
        let mut scope = canvas.scoped();
        scope.apply_typography(cell.typography.clone())?;
        let align = args.text_align.of_column(column_index);
        for (line_index, line) in cell.lines.iter().enumerate() {
            let line_y = y + args.padding.top + line_index as f32 * layout.line_height;
            scope.draw_text_line(
                line,
                [x + args.padding.left, line_y],
                width - args.padding.horizontal(),
                layout.line_height,
                align,
            )?;
        }
    }

    let column_count = layout.column_widths.len();
    for (column_index, (_, (&x, &width))) in cells() {
        let borders = Borders::of_cell(
            args.borders_layout,
            [row_index, column_index],
            [row_count, column_count],
            args.has_heading(),
        );
        let [left, top, right, bottom] = [x, y, x + width, y + row.height];
        if borders.top {
            canvas.draw_line([left, top], [right, top])?;
        }
        if borders.right {
            canvas.draw_line([right, top], [right, bottom])?;
        }
        if borders.bottom {
            canvas.draw_line([left, bottom], [right, bottom])?;
        }
        if borders.left {
            canvas.draw_line([left, top], [left, bottom])?;
        }
    }

    Ok(())
}

/// The stroked edges of a single cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Borders {
    top: bool,
    right: bool,
    bottom: bool,
    left: bool,
}

impl Borders {
    const ALL: Borders = Borders {
        top: true,
        right: true,
        bottom: true,
        left: true,
    };

    fn of_cell(
        layout: BordersLayout,
        [row, column]: [usize; 2],
        [rows, columns]: [usize; 2],
        has_heading: bool,
    ) -> Borders {
        let first_row = row == 0;
        let last_row = row + 1 == rows;
        let first_column = column == 0;
        let last_column = column + 1 == columns;
        let heading = first_row && has_heading;

        match layout {
            BordersLayout::All => Borders::ALL,
            BordersLayout::None => Borders::default(),
            BordersLayout::Internal => Borders {
                top: !first_row,
                right: !last_column,
                bottom: !last_row,
                left: !first_column,
            },
            BordersLayout::Minimal => Borders {
                top: row == 1 && has_heading,
                right: !last_column,
                bottom: heading,
                left: !first_column,
            },
            BordersLayout::HorizontalLines => Borders {
                top: !first_row,
                right: false,
                bottom: !last_row,
                left: false,
            },
            BordersLayout::NoHorizontalLines => Borders {
                top: first_row,
                right: true,
                bottom: last_row || heading,
                left: true,
            },
            BordersLayout::SingleTopLine => Borders {
                top: false,
                right: false,
                bottom: heading,
                left: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::{CellFillMode, Padding};
    use crate::color::tailwind;
    use crate::formats::Formats;
    use crate::style::FontStyle;

    fn canvas() -> Canvas {
        Canvas::new(Formats::default()).unwrap()
    }

    #[test]
    fn estimate_of_single_line_rows_adds_one_line_height_per_row() {
        let mut canvas = canvas();
        canvas.set_cursor(23.0, 40.0).unwrap();
        let args = TableBlockArgs {
            line_height: Some(5.0),
            ..TableBlockArgs::new(&[["a", "b"], ["c", "d"], ["e", "f"], ["g", "h"]])
        };
        let estimate = estimate_table(&canvas, &args).unwrap();
        assert_eq!(estimate.row_line_counts, vec![1, 1, 1, 1]);
        assert_eq!(estimate.height, 40.0 + 4.0 * 5.0);
    }

    #[test]
    fn estimate_adds_padding_and_gutters() {
        let canvas = canvas();
        let y = canvas.cursor().y;
        let args = TableBlockArgs {
            line_height: Some(5.0),
            padding: Padding::new(1.0, 0.0, 2.0, 0.0),
            gutter_height: 0.5,
            ..TableBlockArgs::new(&[["a"], ["b"]])
        };
        let estimate = estimate_table(&canvas, &args).unwrap();
        assert_eq!(estimate.row_heights, vec![8.0, 8.0]);
        assert!((estimate.height - (y + 16.0 + 1.0)).abs() < 1e-4);
    }

    #[test]
    fn estimate_counts_one_gutter_more_than_is_drawn() {
        let mut canvas = canvas();
        let args = TableBlockArgs {
            line_height: Some(5.0),
            padding: Padding::new(4.0, 0.0, 0.0, 0.0),
            gutter_height: 3.0,
            ..TableBlockArgs::new(&[["a"], ["b"], ["c"], ["d"]])
        };
        let estimate = estimate_table(&canvas, &args).unwrap();
        draw_table(&mut canvas, &args).unwrap();
        assert!((estimate.height - canvas.cursor().y - args.gutter_height).abs() < 1e-4);
    }

    #[test]
    fn estimate_and_drawing_agree_on_wrapped_rows() {
        let mut canvas = canvas();
        let args = TableBlockArgs {
            col_widths: Some(vec![3.0, 1.0]),
            ..TableBlockArgs::new(&[
                ["Beschreibung", "Summe"],
                [
                    "Anfertigung von maßgeschneiderten Notenständern mit eingebauter LED-Beleuchtung, ideal für Musiker, die bei schwachem Licht spielen.",
                    "189,00 €",
                ],
                ["Stimmen\n\nund Reinigen", "350,00 €"],
            ])
        };
        let estimate = estimate_table(&canvas, &args).unwrap();
        let summary = draw_table(&mut canvas, &args).unwrap();
        assert_eq!(estimate.row_line_counts, summary.row_line_counts);
        assert_eq!(summary.row_line_counts[2], 3);
        assert!(summary.row_line_counts[1] > 1);
        assert!((canvas.cursor().y - estimate.height).abs() < 1e-3);
    }

    #[test]
    fn drawing_restores_the_stroke_and_moves_below_the_table() {
        let mut canvas = canvas();
        let before = canvas.style_state();
        let args = TableBlockArgs {
            line_color: tailwind::PINK_400,
            line_width: 0.5,
            cell_fill_mode: CellFillMode::All,
            cell_fill_color: Some(tailwind::GRAY_50),
            ..TableBlockArgs::new(&[["a", "b"], ["c", "d"]])
        };
        let summary = draw_table(&mut canvas, &args).unwrap();
        assert_eq!(summary.pages, 1);
        assert_eq!(canvas.style_state(), before);
        assert_eq!(canvas.cursor().x, 23.0);
    }

    #[test]
    fn long_tables_repeat_their_heading_on_new_pages() {
        let mut canvas = canvas();
        let mut items = vec![vec!["Position".to_string(), "Betrag".to_string()]];
        for index in 0..80 {
            items.push(vec![format!("Position {index}"), "1,00 €".to_string()]);
        }
        let args = TableBlockArgs {
            table_items: items,
            ..TableBlockArgs::default()
        };
        let summary = draw_table(&mut canvas, &args).unwrap();
        assert!(summary.pages >= 2);
        assert_eq!(summary.repeated_headings, summary.pages - 1);
        assert_eq!(canvas.page_count(), summary.pages);
        assert_eq!(summary.row_line_counts.len(), 81);
    }

    #[test]
    fn heading_cells_are_bold_and_formats_override_them() {
        let ambient = Typography::default();
        let heading = cell_typography(&ambient, true, None);
        assert!(heading.style.bold);

        let cell_format = CellFormat {
            color: Some(tailwind::WHITE),
            style: Some(FontStyle::REGULAR),
            ..CellFormat::default()
        };
        let formatted = cell_typography(&ambient, true, Some(&cell_format));
        assert_eq!(formatted.style, FontStyle::REGULAR);
        assert_eq!(formatted.color, tailwind::WHITE);
        assert_eq!(formatted.size, ambient.size);
    }

    #[test]
    fn cell_formats_apply_to_their_cell_only() {
        let mut canvas = canvas();
        let args = TableBlockArgs {
            first_row_as_headings: false,
            cell_formats: std::collections::BTreeMap::from([(
                "0.1".to_string(),
                CellFormat {
                    bg_color: Some(tailwind::INDIGO_600),
                    color: Some(tailwind::WHITE),
                    ..CellFormat::default()
                },
            )]),
            ..TableBlockArgs::new(&[["a", "b"], ["c", "d"]])
        };
        draw_table(&mut canvas, &args).unwrap();

        let operations = canvas.pdf().page_operations(0).unwrap();
        let color_of = |operation: &lopdf::content::Operation| -> Vec<f32> {
            operation
                .operands
                .iter()
                .map(|operand| operand.as_float().unwrap())
                .collect()
        };
        let mut text_color = Vec::new();
        let mut shown = Vec::new();
        for operation in operations {
            match operation.operator.as_str() {
                "rg" => text_color = color_of(operation),
                "Tj" => shown.push((
                    operation.operands[0].as_str().unwrap().to_vec(),
                    text_color.clone(),
                )),
                _ => {}
            }
        }
        let white = tailwind::WHITE.to_unit_rgb().to_vec();
        let ambient = canvas.typography().color.to_unit_rgb().to_vec();
        assert_eq!(
            shown,
            vec![
                (b"a".to_vec(), ambient.clone()),
                (b"b".to_vec(), white),
                (b"c".to_vec(), ambient.clone()),
                (b"d".to_vec(), ambient),
            ]
        );

        let fills: Vec<_> = operations
            .iter()
            .filter(|operation| operation.operator == "re")
            .collect();
        assert_eq!(fills.len(), 1);
        let second_column_x = crate::pdf::millimeters_to_points(23.0 + 82.0);
        assert!((fills[0].operands[0].as_float().unwrap() - second_column_x).abs() < 1e-3);
        assert_eq!(canvas.typography().color, tailwind::SLATE_800);
    }

    #[test]
    fn column_widths_are_proportional_to_the_table_width() {
        let canvas = canvas();
        let args = TableBlockArgs {
            col_widths: Some(vec![85.0, 39.5, 39.5]),
            ..TableBlockArgs::new(&[["", "Zwischensumme", "2873,11 €"]])
        };
        let layout = TableLayout::new(&canvas, &args).unwrap();
        assert!((layout.column_widths[0] - 85.0).abs() < 1e-4);
        assert!((layout.column_offsets[2] - (23.0 + 85.0 + 39.5)).abs() < 1e-4);
    }

    #[test]
    fn horizontal_lines_separate_rows_only() {
        let borders = Borders::of_cell(BordersLayout::HorizontalLines, [0, 0], [3, 2], true);
        assert_eq!(
            borders,
            Borders {
                bottom: true,
                ..Borders::default()
            }
        );
        let borders = Borders::of_cell(BordersLayout::HorizontalLines, [2, 1], [3, 2], true);
        assert!(borders.top && !borders.bottom && !borders.left && !borders.right);
        assert_eq!(
            Borders::of_cell(BordersLayout::Internal, [0, 0], [1, 1], false),
            Borders::default()
        );
    }

    #[test]
    fn out_of_range_cell_formats_fail_before_drawing() {
        let mut canvas = canvas();
        let mut args = TableBlockArgs::new(&[["a"]]);
        args.cell_formats.insert("0.3".into(), CellFormat::default());
        let error = draw_table(&mut canvas, &args).unwrap_err();
        assert_eq!(error.kind, ErrorKind::InvalidCellFormat);
        assert!(canvas.pdf().page_operations(0).unwrap().is_empty());
    }
}
