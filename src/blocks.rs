use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::color::{tailwind, Color};
use crate::error::{ContextError, ErrorKind};
use crate::style::{Align, FontStyle, TypographyOverride};

/// One declarative unit of document content.
///
/// Blocks are serialized as `{ "type": "text", "args": { ... } }`. Any other `type` than
/// `text`, `line` or `table` is rejected when the block is constructed, so a sequence of blocks
/// which made it into memory can always be rendered as far as its kinds are concerned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "args",
    rename_all = "snake_case",
    try_from = "RawBlock"
)]
pub enum ContentBlock {
    Text(TextBlockArgs),
    Line(LineBlockArgs),
    Table(TableBlockArgs),
}

impl ContentBlock {
    pub fn kind(&self) -> &'static str {
        match self {
            ContentBlock::Text(_) => "text",
            ContentBlock::Line(_) => "line",
            ContentBlock::Table(_) => "table",
        }
    }
}

/// A block whose arguments have not been checked against its kind yet.
#[derive(Debug, Clone, Deserialize)]
pub struct RawBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    args: serde_json::Value,
}

impl TryFrom<RawBlock> for ContentBlock {
    type Error = ContextError;

    fn try_from(raw_block: RawBlock) -> Result<Self, Self::Error> {
        let RawBlock { kind, args } = raw_block;
        let args = match args {
            serde_json::Value::Null => serde_json::Value::Object(serde_json::Map::new()),
            args => args,
        };
        let parse_error = |error: serde_json::Error| {
            ContextError::with_error(
                ErrorKind::Serialization,
                format!("Unable to parse the arguments of a {kind:?} block"),
                &error,
            )
        };

        match kind.as_str() {
            "text" => Ok(ContentBlock::Text(
                serde_json::from_value(args).map_err(parse_error)?,
            )),
            "line" => Ok(ContentBlock::Line(
                serde_json::from_value(args).map_err(parse_error)?,
            )),
            "table" => Ok(ContentBlock::Table(
                serde_json::from_value(args).map_err(parse_error)?,
            )),
            _ => Err(ContextError::of_kind(
                ErrorKind::UnknownBlockKind,
                format!("Unknown content block kind {kind:?}, expected \"text\", \"line\" or \"table\""),
            )),
        }
    }
}

impl TryFrom<serde_json::Value> for ContentBlock {
    type Error = ContextError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        let raw_block: RawBlock = serde_json::from_value(value).map_err(|error| {
            ContextError::with_error(
                ErrorKind::Serialization,
                "A content block needs a \"type\" and its \"args\"",
                &error,
            )
        })?;
        ContentBlock::try_from(raw_block)
    }
}

/// Lines of text drawn one below the other, each wrapped into the width `w`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TextBlockArgs {
    pub lines: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f32>,
    /// Width of the text cell, zero extends it to the right margin.
    pub w: f32,
    pub align: Align,
    pub separator: String,
    /// Joins all lines into a single paragraph, separated by ` {separator} `.
    pub one_line: bool,
    pub pt: f32,
    pub pb: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<FontStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
}

impl Default for TextBlockArgs {
    fn default() -> Self {
        TextBlockArgs {
            lines: Vec::new(),
            x: None,
            y: None,
            w: 0.0,
            align: Align::Left,
            separator: "•".into(),
            one_line: false,
            pt: 0.0,
            pb: 0.0,
            family: None,
            style: None,
            size: None,
            color: None,
        }
    }
}

impl TextBlockArgs {
    pub fn new<S: Into<String>, I: IntoIterator<Item = S>>(lines: I) -> Self {
        TextBlockArgs {
            lines: lines.into_iter().map(Into::into).collect(),
            ..TextBlockArgs::default()
        }
    }

    pub fn typography(&self) -> TypographyOverride {
        TypographyOverride {
            family: self.family.clone(),
            style: self.style,
            size: self.size,
            color: self.color,
        }
    }

    /// The paragraphs to draw, which is a single one for `one_line` blocks.
    pub fn paragraphs(&self) -> Vec<String> {
        if self.one_line {
            vec![self.lines.join(&format!(" {} ", self.separator))]
        } else {
            self.lines.clone()
        }
    }

    pub fn validate(&self) -> Result<(), ContextError> {
        if let Some(x) = self.x {
            ContextError::check_length("x coordinate of the text", x)?;
        }
        if let Some(y) = self.y {
            ContextError::check_length("y coordinate of the text", y)?;
        }
        ContextError::check_length("width of the text", self.w)?;
        ContextError::check_length("top padding of the text", self.pt)?;
        ContextError::check_length("bottom padding of the text", self.pb)?;
        self.typography().validate()
    }
}

/// A straight stroke, horizontal or vertical when one end coordinate is omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LineBlockArgs {
    pub x1: f32,
    pub y1: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x2: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y2: Option<f32>,
    #[serde(default = "LineBlockArgs::default_line_width")]
    pub line_width: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
}

impl LineBlockArgs {
    fn default_line_width() -> f32 {
        0.1
    }

    pub fn new(x1: f32, y1: f32) -> Self {
        LineBlockArgs {
            x1,
            y1,
            x2: None,
            y2: None,
            line_width: LineBlockArgs::default_line_width(),
            color: None,
        }
    }

    pub fn start(&self) -> [f32; 2] {
        [self.x1, self.y1]
    }

    /// The end point, every omitted coordinate being the one of the start point.
    pub fn end(&self) -> [f32; 2] {
        [self.x2.unwrap_or(self.x1), self.y2.unwrap_or(self.y1)]
    }

    pub fn color(&self) -> Color {
        self.color.unwrap_or(tailwind::SLATE_900)
    }

    pub fn validate(&self) -> Result<(), ContextError> {
        for coordinate in self.start().into_iter().chain(self.end()) {
            ContextError::check_length("line coordinate", coordinate)?;
        }
        ContextError::check_length("line width", self.line_width)
    }
}

/// Which edges of the table cells are stroked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BordersLayout {
    #[default]
    All,
    None,
    Internal,
    Minimal,
    HorizontalLines,
    NoHorizontalLines,
    SingleTopLine,
}

/// Which cells are filled with the table's fill color.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CellFillMode {
    #[default]
    None,
    All,
    Rows,
    EvenRows,
    Columns,
    EvenColumns,
}

impl CellFillMode {
    pub fn fills(self, row: usize, column: usize) -> bool {
        match self {
            CellFillMode::None => false,
            CellFillMode::All => true,
            CellFillMode::Rows => row % 2 == 1,
            CellFillMode::EvenRows => row % 2 == 0,
            CellFillMode::Columns => column % 2 == 1,
            CellFillMode::EvenColumns => column % 2 == 0,
        }
    }
}

/// Space between the cell edges and the cell text, in the order top, right, bottom, left.
///
/// Like in CSS, a single number applies to all sides, two numbers are the vertical and the
/// horizontal padding and three numbers are top, horizontal and bottom.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PaddingValue", into = "[f32; 4]")]
pub struct Padding {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PaddingValue {
    Uniform(f32),
    Sides(Vec<f32>),
}

impl TryFrom<PaddingValue> for Padding {
    type Error = String;

    fn try_from(value: PaddingValue) -> Result<Self, Self::Error> {
        let sides = match value {
            PaddingValue::Uniform(padding) => vec![padding],
            PaddingValue::Sides(sides) => sides,
        };
        match sides[..] {
            [all] => Ok(Padding::uniform(all)),
            [vertical, horizontal] => Ok(Padding::new(vertical, horizontal, vertical, horizontal)),
            [top, horizontal, bottom] => Ok(Padding::new(top, horizontal, bottom, horizontal)),
            [top, right, bottom, left] => Ok(Padding::new(top, right, bottom, left)),
            _ => Err(format!(
                "a padding has between one and four sides, but {} were given",
                sides.len()
            )),
        }
    }
}

impl From<Padding> for [f32; 4] {
    fn from(padding: Padding) -> Self {
        [padding.top, padding.right, padding.bottom, padding.left]
    }
}

impl Padding {
    pub const fn new(top: f32, right: f32, bottom: f32, left: f32) -> Self {
        Padding {
            top,
            right,
            bottom,
            left,
        }
    }

    pub const fn uniform(padding: f32) -> Self {
        Padding::new(padding, padding, padding, padding)
    }

    pub fn vertical(&self) -> f32 {
        self.top + self.bottom
    }

    pub fn horizontal(&self) -> f32 {
        self.left + self.right
    }
}

/// The alignment of the text in every column, or one for each column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnAlign {
    Uniform(Align),
    PerColumn(Vec<Align>),
}

impl Default for ColumnAlign {
    fn default() -> Self {
        ColumnAlign::Uniform(Align::Left)
    }
}

impl ColumnAlign {
    pub fn of_column(&self, column: usize) -> Align {
        match self {
            ColumnAlign::Uniform(align) => *align,
            ColumnAlign::PerColumn(aligns) => aligns.get(column).copied().unwrap_or_default(),
        }
    }
}

/// Style applied to a single cell on top of the table's cell style.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CellFormat {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bg_color: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<FontStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
}

/// A grid of cells, the first row being the heading unless `first_row_as_headings` is unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TableBlockArgs {
    pub table_items: Vec<Vec<String>>,
    /// Relative widths of the columns, the columns share the table width evenly when omitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub col_widths: Option<Vec<f32>>,
    /// Width of the table, the effective page width when omitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
    pub padding: Padding,
    pub borders_layout: BordersLayout,
    pub text_align: ColumnAlign,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cell_fill_color: Option<Color>,
    pub cell_fill_mode: CellFillMode,
    /// Per-cell formats keyed by `"row.column"`, both zero-based.
    pub cell_formats: BTreeMap<String, CellFormat>,
    pub first_row_as_headings: bool,
    pub gutter_height: f32,
    pub gutter_width: f32,
    /// Height of one line of cell text, the ambient line height when omitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_height: Option<f32>,
    pub line_color: Color,
    pub line_width: f32,
    /// Moves the whole table onto a new page when it does not fit onto the current one.
    pub unbreakable: bool,
    pub pt: f32,
    pub pb: f32,
}

impl Default for TableBlockArgs {
    fn default() -> Self {
        TableBlockArgs {
            table_items: Vec::new(),
            col_widths: None,
            width: None,
            padding: Padding::default(),
            borders_layout: BordersLayout::default(),
            text_align: ColumnAlign::default(),
            cell_fill_color: None,
            cell_fill_mode: CellFillMode::default(),
            cell_formats: BTreeMap::new(),
            first_row_as_headings: true,
            gutter_height: 0.0,
            gutter_width: 0.0,
            line_height: None,
            line_color: tailwind::BLACK,
            line_width: 0.2,
            unbreakable: false,
            pt: 0.0,
            pb: 0.0,
        }
    }
}

impl TableBlockArgs {
    pub fn new<S: AsRef<str>, R: AsRef<[S]>>(table_items: &[R]) -> Self {
        TableBlockArgs {
            table_items: table_items
                .iter()
                .map(|row| row.as_ref().iter().map(|cell| cell.as_ref().to_string()).collect())
                .collect(),
            ..TableBlockArgs::default()
        }
    }

    /// The number of columns, which is the length of the longest row.
    pub fn column_count(&self) -> usize {
        self.table_items.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn has_heading(&self) -> bool {
        self.first_row_as_headings && !self.table_items.is_empty()
    }

    /// Parses the keys of `cell_formats` and checks that they point into the table.
    pub fn parsed_cell_formats(
        &self,
    ) -> Result<BTreeMap<(usize, usize), &CellFormat>, ContextError> {
        let mut cell_formats = BTreeMap::new();
        for (key, cell_format) in &self.cell_formats {
            let (row, column) = parse_cell_key(key)?;
            let in_range = self
                .table_items
                .get(row)
                .is_some_and(|cells| column < cells.len());
            if !in_range {
                return Err(ContextError::of_kind(
                    ErrorKind::InvalidCellFormat,
                    format!(
                        "The cell format {key:?} points outside of the table of {} rows and {} columns",
                        self.table_items.len(),
                        self.column_count()
                    ),
                ));
            }
            if let Some(size) = cell_format.size {
                ContextError::check_length("font size of a cell", size)?;
            }
            cell_formats.insert((row, column), cell_format);
        }
        Ok(cell_formats)
    }

    pub fn validate(&self) -> Result<(), ContextError> {
        if let Some(col_widths) = &self.col_widths {
            for col_width in col_widths {
                ContextError::check_length("column width", *col_width)?;
            }
            if col_widths.len() != self.column_count() {
                return Err(ContextError::of_kind(
                    ErrorKind::InvalidGeometry,
                    format!(
                        "The table has {} columns, but {} column widths were given",
                        self.column_count(),
                        col_widths.len()
                    ),
                ));
            }
            if !self.table_items.is_empty() && col_widths.iter().sum::<f32>() <= 0.0 {
                return Err(ContextError::of_kind(
                    ErrorKind::InvalidGeometry,
                    "The column widths of the table add up to zero",
                ));
            }
        }
        if let Some(width) = self.width {
            ContextError::check_length("table width", width)?;
        }
        if let Some(line_height) = self.line_height {
            ContextError::check_length("line height of the table", line_height)?;
        }
        let Padding {
            top,
            right,
            bottom,
            left,
        } = self.padding;
        for side in [top, right, bottom, left] {
            ContextError::check_length("cell padding", side)?;
        }
        ContextError::check_length("gutter height", self.gutter_height)?;
        ContextError::check_length("gutter width", self.gutter_width)?;
        ContextError::check_length("table line width", self.line_width)?;
        ContextError::check_length("top padding of the table", self.pt)?;
        ContextError::check_length("bottom padding of the table", self.pb)?;
        self.parsed_cell_formats().map(|_| ())
    }
}

fn parse_cell_key(key: &str) -> Result<(usize, usize), ContextError> {
    let malformed = || {
        ContextError::of_kind(
            ErrorKind::InvalidCellFormat,
            format!("The cell format key {key:?} is not of the form \"row.column\""),
        )
    };
    let (row, column) = key.split_once('.').ok_or_else(malformed)?;
    let row = row.trim().parse().map_err(|_| malformed())?;
    let column = column.trim().parse().map_err(|_| malformed())?;
    Ok((row, column))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_are_tagged_by_type() {
        let blocks: Vec<ContentBlock> = serde_json::from_str(
            r#"[
                { "type": "text", "args": { "lines": ["Hallo"], "style": "B" } },
                { "type": "line", "args": { "x1": 3, "x2": 7, "y1": 99 } },
                { "type": "table", "args": { "table_items": [["a", "b"]], "padding": [1, 0, 1, 0] } }
            ]"#,
        )
        .unwrap();
        let kinds: Vec<_> = blocks.iter().map(ContentBlock::kind).collect();
        assert_eq!(kinds, vec!["text", "line", "table"]);

        let ContentBlock::Line(line) = &blocks[1] else {
            panic!("expected a line block");
        };
        assert_eq!(line.end(), [7.0, 99.0]);
        assert_eq!(line.line_width, 0.1);
        assert_eq!(line.color(), tailwind::SLATE_900);
    }

    #[test]
    fn unknown_block_kinds_are_rejected() {
        let value = serde_json::json!({ "type": "image", "args": {} });
        let error = ContentBlock::try_from(value).unwrap_err();
        assert_eq!(error.kind, ErrorKind::UnknownBlockKind);

        let result: Result<ContentBlock, _> =
            serde_json::from_str(r#"{ "type": "image", "args": {} }"#);
        assert!(result.unwrap_err().to_string().contains("Unknown content block kind"));
    }

    #[test]
    fn unknown_arguments_are_rejected() {
        let value = serde_json::json!({ "type": "text", "args": { "lines": [], "colour": [0, 0, 0] } });
        let error = ContentBlock::try_from(value).unwrap_err();
        assert_eq!(error.kind, ErrorKind::Serialization);
    }

    #[test]
    fn blocks_serialize_back_into_their_tagged_form() {
        let block = ContentBlock::Line(LineBlockArgs::new(3.0, 99.0));
        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(value["type"], "line");
        assert_eq!(value["args"]["y1"], 99.0);
        assert_eq!(ContentBlock::try_from(value).unwrap(), block);
    }

    #[test]
    fn one_line_blocks_join_with_the_separator() {
        let args = TextBlockArgs {
            one_line: true,
            ..TextBlockArgs::new(["A", "B", "C"])
        };
        assert_eq!(args.paragraphs(), vec!["A • B • C".to_string()]);
        let args = TextBlockArgs::new(["A", "B"]);
        assert_eq!(args.paragraphs().len(), 2);
    }

    #[test]
    fn padding_expands_like_css() {
        let paddings: Vec<Padding> = serde_json::from_str("[2, [1, 3], [1, 2, 3], [1, 0, 1, 0]]").unwrap();
        assert_eq!(paddings[0], Padding::uniform(2.0));
        assert_eq!(paddings[1], Padding::new(1.0, 3.0, 1.0, 3.0));
        assert_eq!(paddings[2], Padding::new(1.0, 2.0, 3.0, 2.0));
        assert_eq!(paddings[3], Padding::new(1.0, 0.0, 1.0, 0.0));
        assert!(serde_json::from_str::<Padding>("[1, 2, 3, 4, 5]").is_err());
    }

    #[test]
    fn table_defaults_follow_the_common_layout() {
        let table: TableBlockArgs =
            serde_json::from_str(r#"{ "table_items": [["a"]], "text_align": ["LEFT", "RIGHT"] }"#).unwrap();
        assert!(table.first_row_as_headings);
        assert_eq!(table.borders_layout, BordersLayout::All);
        assert_eq!(table.line_color, tailwind::BLACK);
        assert_eq!(table.line_width, 0.2);
        assert_eq!(table.text_align.of_column(1), Align::Right);
        assert_eq!(table.text_align.of_column(7), Align::Left);
    }

    #[test]
    fn cell_format_keys_must_point_into_the_table() {
        let mut table = TableBlockArgs::new(&[["a", "b"], ["c", "d"]]);
        table
            .cell_formats
            .insert("1.1".into(), CellFormat::default());
        assert_eq!(table.parsed_cell_formats().unwrap().len(), 1);

        table.cell_formats.insert("2.0".into(), CellFormat::default());
        assert_eq!(table.validate().unwrap_err().kind, ErrorKind::InvalidCellFormat);

        table.cell_formats.remove("2.0");
        table.cell_formats.insert("first".into(), CellFormat::default());
        assert_eq!(table.validate().unwrap_err().kind, ErrorKind::InvalidCellFormat);
    }

    #[test]
    fn column_widths_must_match_the_columns() {
        let table = TableBlockArgs {
            col_widths: Some(vec![1.0]),
            ..TableBlockArgs::new(&[["a", "b"]])
        };
        assert_eq!(table.validate().unwrap_err().kind, ErrorKind::InvalidGeometry);
    }

    #[test]
    fn fill_modes_select_rows_and_columns() {
        assert!(CellFillMode::Rows.fills(1, 0));
        assert!(!CellFillMode::Rows.fills(2, 1));
        assert!(CellFillMode::EvenColumns.fills(3, 2));
        assert!(!CellFillMode::None.fills(0, 0));
    }
}
