use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::color::{tailwind, Color};
use crate::error::{ContextError, ErrorKind};
use crate::style::{Align, FontStyle, Typography, TypographyOverride};

/// Width of an ISO A4 page in millimeters.
pub const PAGE_WIDTH: f32 = 210.0;
/// Height of an ISO A4 page in millimeters.
pub const PAGE_HEIGHT: f32 = 297.0;

/// The appearance of a document, applied once when the canvas is created.
///
/// Every field has a default, so a JSON file only needs to contain the values it changes and
/// is merged over the defaults when it is deserialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Formats {
    /// Left and right margin.
    pub mx: f32,
    /// Top and bottom margin.
    pub my: f32,
    /// Padding between the top margin and the content.
    pub ph: f32,
    /// Padding between the content and the bottom margin, where the footer lives.
    pub pf: f32,
    /// Multiplier applied to the font size to obtain the line height.
    pub line_height: f32,
    pub primary_color: Color,
    pub secondary_color: Color,
    pub primary_contrast_color: Color,
    /// The ambient typography every primitive falls back to.
    pub typography: Typography,
    pub footer: FooterFormat,
    /// Marks drawn into the left border of the first page to help folding the letter.
    pub fold_marks: Vec<FoldMark>,
    /// TrueType files registered as font families in addition to the standard fonts.
    pub font_associations: Vec<FontAssociation>,
}

impl Default for Formats {
    fn default() -> Self {
        Formats {
            mx: 23.0,
            my: 10.0,
            ph: 10.0,
            pf: 10.0,
            line_height: 1.4,
            primary_color: tailwind::INDIGO_600,
            secondary_color: tailwind::SLATE_600,
            primary_contrast_color: tailwind::WHITE,
            typography: Typography::default(),
            footer: FooterFormat::default(),
            fold_marks: Vec::new(),
            font_associations: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FooterFormat {
    pub show_page_number: bool,
    pub align: Align,
    pub show_on_first_page: bool,
    pub typography: TypographyOverride,
}

impl Default for FooterFormat {
    fn default() -> Self {
        FooterFormat {
            show_page_number: true,
            align: Align::Right,
            show_on_first_page: true,
            typography: TypographyOverride {
                style: Some(FontStyle::BOLD),
                size: Some(8.0),
                ..TypographyOverride::default()
            },
        }
    }
}

/// A short horizontal stroke starting `pl` millimeters from the left page edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FoldMark {
    pub y: f32,
    #[serde(default = "FoldMark::default_padding_left")]
    pub pl: f32,
    #[serde(default = "FoldMark::default_length")]
    pub length: f32,
    #[serde(default)]
    pub color: Option<Color>,
}

impl FoldMark {
    fn default_padding_left() -> f32 {
        3.0
    }

    fn default_length() -> f32 {
        5.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FontAssociation {
    pub family: String,
    #[serde(default)]
    pub style: FontStyle,
    pub path: PathBuf,
}

impl Formats {
    pub fn from_path(formats_file_path: &Path) -> Result<Self, ContextError> {
        let formats_file_contents = std::fs::read_to_string(formats_file_path).map_err(|error| {
            ContextError::with_error(
                ErrorKind::Io,
                format!("Failed to read the formats file {:?}", formats_file_path),
                &error,
            )
        })?;
        let formats: Formats = serde_json::from_str(&formats_file_contents).map_err(|error| {
            ContextError::with_error(
                ErrorKind::Serialization,
                format!("Failed to parse the formats file {:?}", formats_file_path),
                &error,
            )
        })?;
        formats.validate()?;

        Ok(formats)
    }

    pub fn validate(&self) -> Result<(), ContextError> {
        ContextError::check_length("horizontal margin", self.mx)?;
        ContextError::check_length("vertical margin", self.my)?;
        ContextError::check_length("header padding", self.ph)?;
        ContextError::check_length("footer padding", self.pf)?;
        ContextError::check_length("line height factor", self.line_height)?;
        ContextError::check_length("default font size", self.typography.size)?;
        self.footer.typography.validate()?;
        for fold_mark in &self.fold_marks {
            ContextError::check_length("fold mark position", fold_mark.y)?;
            ContextError::check_length("fold mark padding", fold_mark.pl)?;
            ContextError::check_length("fold mark length", fold_mark.length)?;
        }
        if 2.0 * self.mx >= PAGE_WIDTH || self.top_margin() + self.bottom_margin() >= PAGE_HEIGHT {
            return Err(ContextError::of_kind(
                ErrorKind::InvalidGeometry,
                "The margins leave no printable area on the page",
            ));
        }
        Ok(())
    }

    pub fn left_margin(&self) -> f32 {
        self.mx
    }

    pub fn right_margin(&self) -> f32 {
        self.mx
    }

    pub fn top_margin(&self) -> f32 {
        self.my + self.ph
    }

    pub fn bottom_margin(&self) -> f32 {
        self.my + self.pf
    }

    /// The y coordinate below which nothing but the footer is drawn.
    pub fn page_break_trigger(&self) -> f32 {
        PAGE_HEIGHT - self.bottom_margin()
    }

    pub fn effective_page_width(&self) -> f32 {
        PAGE_WIDTH - self.left_margin() - self.right_margin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_margins_match_the_invoice_layout() {
        let formats = Formats::default();
        assert_eq!(formats.top_margin(), 20.0);
        assert_eq!(formats.bottom_margin(), 20.0);
        assert_eq!(formats.left_margin(), 23.0);
        assert_eq!(formats.right_margin(), 23.0);
        assert_eq!(formats.effective_page_width(), 164.0);
        assert_eq!(formats.page_break_trigger(), 277.0);
    }

    #[test]
    fn partial_formats_are_merged_over_defaults() {
        let formats: Formats = serde_json::from_str(
            r#"{ "mx": 15, "typography": { "size": 12 }, "footer": { "align": "C" } }"#,
        )
        .unwrap();
        assert_eq!(formats.mx, 15.0);
        assert_eq!(formats.my, 10.0);
        assert_eq!(formats.typography.size, 12.0);
        assert_eq!(formats.typography.family, "Helvetica");
        assert_eq!(formats.footer.align, Align::Center);
        assert!(formats.footer.show_page_number);
        assert_eq!(formats.footer.typography.style, Some(FontStyle::BOLD));
    }

    #[test]
    fn fold_marks_take_default_padding_and_length() {
        let formats: Formats = serde_json::from_str(r#"{ "fold_marks": [{ "y": 99 }] }"#).unwrap();
        assert_eq!(
            formats.fold_marks,
            vec![FoldMark {
                y: 99.0,
                pl: 3.0,
                length: 5.0,
                color: None
            }]
        );
    }

    #[test]
    fn negative_margins_are_rejected() {
        let formats = Formats {
            mx: -1.0,
            ..Formats::default()
        };
        assert_eq!(formats.validate().unwrap_err().kind, ErrorKind::InvalidGeometry);

        let formats = Formats {
            my: 150.0,
            ..Formats::default()
        };
        assert_eq!(formats.validate().unwrap_err().kind, ErrorKind::InvalidGeometry);
    }
}
