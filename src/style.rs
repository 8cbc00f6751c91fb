use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::error::{ContextError, ErrorKind};

/// The emphasis of a font, written the way the content dictionaries write it: any combination
/// of `B` (bold), `I` (italic) and `U` (underline), the empty string being the regular style.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FontStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

impl FontStyle {
    pub const REGULAR: FontStyle = FontStyle {
        bold: false,
        italic: false,
        underline: false,
    };
    pub const BOLD: FontStyle = FontStyle {
        bold: true,
        italic: false,
        underline: false,
    };

    /// The same style without underline, which is a decoration rather than a font face.
    pub fn face(self) -> FontStyle {
        FontStyle {
            underline: false,
            ..self
        }
    }
}

impl std::str::FromStr for FontStyle {
    type Err = ContextError;

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        let mut style = FontStyle::REGULAR;
        for character in string.chars() {
            match character.to_ascii_uppercase() {
                'B' => style.bold = true,
                'I' => style.italic = true,
                'U' => style.underline = true,
                other => {
                    return Err(ContextError::of_kind(
                        ErrorKind::Serialization,
                        format!("Unknown font style {other:?} in {string:?}, expected a combination of B, I and U"),
                    ))
                }
            }
        }
        Ok(style)
    }
}

impl TryFrom<String> for FontStyle {
    type Error = ContextError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FontStyle> for String {
    fn from(style: FontStyle) -> Self {
        style.to_string()
    }
}

impl std::fmt::Display for FontStyle {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.bold {
            write!(formatter, "B")?;
        }
        if self.italic {
            write!(formatter, "I")?;
        }
        if self.underline {
            write!(formatter, "U")?;
        }
        Ok(())
    }
}

/// Horizontal alignment of text inside its cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Align {
    #[default]
    #[serde(rename = "L", alias = "LEFT", alias = "left")]
    Left,
    #[serde(rename = "C", alias = "CENTER", alias = "center")]
    Center,
    #[serde(rename = "R", alias = "RIGHT", alias = "right")]
    Right,
    #[serde(rename = "J", alias = "JUSTIFY", alias = "justify")]
    Justify,
}

/// A fully resolved set of text properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Typography {
    pub family: String,
    pub style: FontStyle,
    /// The font size in points.
    pub size: f32,
    pub color: Color,
}

impl Default for Typography {
    fn default() -> Self {
        Typography {
            family: "Helvetica".into(),
            style: FontStyle::REGULAR,
            size: 10.0,
            color: crate::color::tailwind::SLATE_800,
        }
    }
}

/// Text properties where every field may be omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TypographyOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<FontStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
}

impl TypographyOverride {
    /// Resolves the omitted fields from the defaults, except for the style which always falls
    /// back to the regular face.
    pub fn resolve(&self, defaults: &Typography) -> Typography {
        Typography {
            family: self.family.clone().unwrap_or_else(|| defaults.family.clone()),
            style: self.style.unwrap_or(FontStyle::REGULAR),
            size: self.size.unwrap_or(defaults.size),
            color: self.color.unwrap_or(defaults.color),
        }
    }

    pub fn validate(&self) -> Result<(), ContextError> {
        if let Some(size) = self.size {
            ContextError::check_length("font size", size)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn font_styles_parse_from_letters() {
        assert_eq!("".parse::<FontStyle>().unwrap(), FontStyle::REGULAR);
        assert_eq!("B".parse::<FontStyle>().unwrap(), FontStyle::BOLD);
        let style: FontStyle = "ib".parse().unwrap();
        assert!(style.bold && style.italic && !style.underline);
        assert_eq!(style.to_string(), "BI");
        assert!("X".parse::<FontStyle>().is_err());
    }

    #[test]
    fn alignments_accept_letters_and_words() {
        let alignments: Vec<Align> = serde_json::from_str(r#"["L", "RIGHT", "CENTER", "J"]"#).unwrap();
        assert_eq!(
            alignments,
            vec![Align::Left, Align::Right, Align::Center, Align::Justify]
        );
    }

    #[test]
    fn omitted_style_resolves_to_regular() {
        let defaults = Typography {
            style: FontStyle::BOLD,
            ..Typography::default()
        };
        let typography = TypographyOverride {
            size: Some(7.0),
            ..TypographyOverride::default()
        }
        .resolve(&defaults);
        assert_eq!(typography.style, FontStyle::REGULAR);
        assert_eq!(typography.size, 7.0);
        assert_eq!(typography.family, defaults.family);
    }
}
