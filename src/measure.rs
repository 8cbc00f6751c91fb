use unicode_normalization::UnicodeNormalization as _;

use crate::error::{ContextError, ErrorKind};
use crate::fonts::{Font, FontBook};
use crate::style::Typography;

/// Horizontal space kept free on both sides of wrapped text inside its cell.
pub const CELL_MARGIN: f32 = 1.0;

const WIDTH_TOLERANCE: f32 = 1e-4;

/// One line of wrapped text and its width in millimeters.
#[derive(Debug, Clone, PartialEq)]
pub struct WrappedLine {
    pub text: String,
    pub width: f32,
    /// Whether the line is the last one of its paragraph, justified text leaves those alone.
    pub ends_paragraph: bool,
}

/// Measures wrapped text without drawing it.
pub trait TextMeasure {
    /// Wraps `text` into lines no wider than `max_width` millimeters.
    fn wrap(
        &self,
        text: &str,
        typography: &Typography,
        max_width: f32,
    ) -> Result<Vec<WrappedLine>, ContextError>;

    fn line_count(
        &self,
        text: &str,
        typography: &Typography,
        max_width: f32,
    ) -> Result<usize, ContextError> {
        Ok(self.wrap(text, typography, max_width)?.len())
    }
}

impl TextMeasure for FontBook {
    fn wrap(
        &self,
        text: &str,
        typography: &Typography,
        max_width: f32,
    ) -> Result<Vec<WrappedLine>, ContextError> {
        let font = self.resolve(&typography.family, typography.style)?;
        wrap_text(font, typography.size, text, max_width)
    }
}

/// Greedily wraps text at spaces, every `\n` starting a new paragraph. Words wider than a line
/// are broken between characters.
pub fn wrap_text(
    font: &Font,
    font_size: f32,
    text: &str,
    max_width: f32,
) -> Result<Vec<WrappedLine>, ContextError> {
    if !max_width.is_finite() {
        return Err(ContextError::of_kind(
            ErrorKind::InvalidGeometry,
            format!("Unable to wrap text into the width {}", max_width),
        ));
    }
    if max_width <= 0.0 {
        return Err(ContextError::of_kind(
            ErrorKind::MeasurementFailure,
            format!("Not enough horizontal space ({max_width}mm) to wrap {text:?}"),
        ));
    }

    let space_width = font.text_width(" ", font_size);
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let paragraph: String = paragraph.trim_end_matches('\r').nfc().collect();
        let mut current = String::new();
        let mut current_width = 0.0;

        for word in paragraph.split_whitespace() {
            let word_width = font.text_width(word, font_size);
            if !current.is_empty() {
                if current_width + space_width + word_width <= max_width + WIDTH_TOLERANCE {
                    current.push(' ');
                    current.push_str(word);
                    current_width += space_width + word_width;
                    continue;
                }
                lines.push(WrappedLine {
                    text: std::mem::take(&mut current),
                    width: current_width,
                    ends_paragraph: false,
                });
                current_width = 0.0;
            }

            if word_width <= max_width + WIDTH_TOLERANCE {
                current.push_str(word);
                current_width = word_width;
                continue;
            }

            for character in word.chars() {
                let character_width = font.character_width(character) * font_size / 1000.0;
                let character_width = crate::pdf::points_to_millimeters(character_width);
                if character_width > max_width + WIDTH_TOLERANCE {
                    return Err(ContextError::of_kind(
                        ErrorKind::MeasurementFailure,
                        format!(
                            "Not enough horizontal space ({max_width}mm) to render the single character {character:?}"
                        ),
                    ));
                }
                if current_width + character_width > max_width + WIDTH_TOLERANCE {
                    lines.push(WrappedLine {
                        text: std::mem::take(&mut current),
                        width: current_width,
                        ends_paragraph: false,
                    });
                    current_width = 0.0;
                }
                current.push(character);
                current_width += character_width;
            }
        }

        lines.push(WrappedLine {
            text: current,
            width: current_width,
            ends_paragraph: true,
        });
    }

    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::points_to_millimeters;
    use crate::style::FontStyle;

    fn courier() -> Font {
        FontBook::with_standard_fonts()
            .resolve("Courier", FontStyle::REGULAR)
            .unwrap()
            .clone()
    }

    /// The width of `count` Courier characters at 10pt.
    fn characters(count: usize) -> f32 {
        points_to_millimeters(6.0 * count as f32)
    }

    #[test]
    fn short_text_stays_on_one_line() {
        let lines = wrap_text(&courier(), 10.0, "Summe", characters(20)).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "Summe");
        assert!(lines[0].ends_paragraph);
    }

    #[test]
    fn words_wrap_at_spaces() {
        let lines = wrap_text(&courier(), 10.0, "aaaa bbbb cccc", characters(9)).unwrap();
        let texts: Vec<_> = lines.iter().map(|line| line.text.as_str()).collect();
        assert_eq!(texts, vec!["aaaa bbbb", "cccc"]);
        assert!(!lines[0].ends_paragraph);
        assert!(lines[1].ends_paragraph);
    }

    #[test]
    fn newlines_start_paragraphs_and_empty_ones_take_a_line() {
        let lines = wrap_text(&courier(), 10.0, "Flügel\n\nGarantie", characters(20)).unwrap();
        let texts: Vec<_> = lines.iter().map(|line| line.text.as_str()).collect();
        assert_eq!(texts, vec!["Flügel", "", "Garantie"]);
        assert!(lines.iter().all(|line| line.ends_paragraph));
    }

    #[test]
    fn long_words_break_between_characters() {
        let lines = wrap_text(&courier(), 10.0, "abcdefghij", characters(4)).unwrap();
        let texts: Vec<_> = lines.iter().map(|line| line.text.as_str()).collect();
        assert_eq!(texts, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn empty_text_is_a_single_empty_line() {
        let lines = wrap_text(&courier(), 10.0, "", characters(4)).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "");
    }

    #[test]
    fn too_narrow_widths_fail_the_measurement() {
        let error = wrap_text(&courier(), 10.0, "abc", characters(1) / 2.0).unwrap_err();
        assert_eq!(error.kind, ErrorKind::MeasurementFailure);
        let error = wrap_text(&courier(), 10.0, "abc", 0.0).unwrap_err();
        assert_eq!(error.kind, ErrorKind::MeasurementFailure);
        let error = wrap_text(&courier(), 10.0, "abc", f32::NAN).unwrap_err();
        assert_eq!(error.kind, ErrorKind::InvalidGeometry);
    }

    #[test]
    fn font_book_measures_with_the_resolved_font() {
        let font_book = FontBook::with_standard_fonts();
        let typography = Typography {
            family: "Courier".into(),
            ..Typography::default()
        };
        let count = font_book
            .line_count("aaaa bbbb cccc", &typography, characters(9))
            .unwrap();
        assert_eq!(count, 2);
    }
}
