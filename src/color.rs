use serde::{Deserialize, Serialize};

/// An RGB color with one byte per channel, (de)serialized as `[r, g, b]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[u8; 3]", into = "[u8; 3]")]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Color {
    pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Color { red, green, blue }
    }

    /// The channels scaled into the `0.0..=1.0` range expected by the PDF color operators.
    pub fn to_unit_rgb(self) -> [f32; 3] {
        [
            self.red as f32 / 255.0,
            self.green as f32 / 255.0,
            self.blue as f32 / 255.0,
        ]
    }
}

impl From<[u8; 3]> for Color {
    fn from([red, green, blue]: [u8; 3]) -> Self {
        Color { red, green, blue }
    }
}

impl From<Color> for [u8; 3] {
    fn from(color: Color) -> Self {
        [color.red, color.green, color.blue]
    }
}

/// The subset of the Tailwind palette the invoice templates draw with.
pub mod tailwind {
    use super::Color;

    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const GRAY_50: Color = Color::rgb(249, 250, 251);
    pub const GRAY_200: Color = Color::rgb(229, 231, 235);
    pub const GRAY_500: Color = Color::rgb(107, 114, 128);
    pub const SLATE_600: Color = Color::rgb(71, 85, 105);
    pub const SLATE_700: Color = Color::rgb(51, 65, 85);
    pub const SLATE_800: Color = Color::rgb(30, 41, 59);
    pub const SLATE_900: Color = Color::rgb(15, 23, 42);
    pub const INDIGO_600: Color = Color::rgb(79, 70, 229);
    pub const PINK_400: Color = Color::rgb(244, 114, 182);
    pub const PINK_600: Color = Color::rgb(219, 39, 119);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colors_are_arrays_in_json() {
        let color: Color = serde_json::from_str("[79, 70, 229]").unwrap();
        assert_eq!(color, tailwind::INDIGO_600);
        assert_eq!(serde_json::to_string(&tailwind::WHITE).unwrap(), "[255,255,255]");
    }

    #[test]
    fn unit_rgb_spans_zero_to_one() {
        assert_eq!(tailwind::WHITE.to_unit_rgb(), [1.0, 1.0, 1.0]);
        assert_eq!(tailwind::BLACK.to_unit_rgb(), [0.0, 0.0, 0.0]);
    }
}
