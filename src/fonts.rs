use owned_ttf_parser::{AsFaceRef as _, Face, OwnedFace};
use std::{
    collections::{BTreeMap, BTreeSet},
    path::Path,
    sync::Arc,
};
use unicode_normalization::UnicodeNormalization as _;

use crate::error::{ContextError, ErrorKind};
use crate::pdf::points_to_millimeters;
use crate::style::FontStyle;

/// Advance widths of the ASCII range `32..=126` of Helvetica, in 1/1000 of the font size.
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    278, 278, 584, 584, 584, 556, 1015,
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    278, 278, 278, 469, 556, 333,
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833,
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500,
    334, 260, 334, 584,
];

/// Advance widths of the ASCII range `32..=126` of Helvetica-Bold, in 1/1000 of the font size.
#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    333, 333, 584, 584, 584, 611, 975,
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    333, 278, 333, 584, 556, 333,
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889,
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500,
    389, 280, 389, 584,
];

/// One of the base fonts every PDF reader ships, which therefore need no embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardFamily {
    Helvetica,
    Courier,
}

impl StandardFamily {
    fn base_font(self, style: FontStyle) -> &'static str {
        match (self, style.bold, style.italic) {
            (StandardFamily::Helvetica, false, false) => "Helvetica",
            (StandardFamily::Helvetica, true, false) => "Helvetica-Bold",
            (StandardFamily::Helvetica, false, true) => "Helvetica-Oblique",
            (StandardFamily::Helvetica, true, true) => "Helvetica-BoldOblique",
            (StandardFamily::Courier, false, false) => "Courier",
            (StandardFamily::Courier, true, false) => "Courier-Bold",
            (StandardFamily::Courier, false, true) => "Courier-Oblique",
            (StandardFamily::Courier, true, true) => "Courier-BoldOblique",
        }
    }

    /// The width of a character in 1/1000 of the font size.
    fn character_width(self, bold: bool, character: char) -> f32 {
        if self == StandardFamily::Courier {
            return 600.0;
        }
        let widths = if bold {
            &HELVETICA_BOLD_WIDTHS
        } else {
            &HELVETICA_WIDTHS
        };
        let width = match character {
            ' '..='~' => widths[character as usize - 32],
            '\u{a0}' => widths[0],
            'ß' => 611,
            '€' | '§' | 'µ' => 556,
            '•' => 350,
            '°' => 400,
            '×' => 584,
            '–' => 556,
            '—' | '…' | '‰' => 1000,
            '©' | '®' => 737,
            '„' | '“' | '”' => {
                if bold {
                    500
                } else {
                    333
                }
            }
            '‚' | '‘' | '’' => {
                if bold {
                    278
                } else {
                    222
                }
            }
            other => {
                // Accented letters are as wide as their base letter
                match std::iter::once(other).nfd().next() {
                    Some(base @ ' '..='~') => widths[base as usize - 32],
                    _ => 556,
                }
            }
        };
        f32::from(width)
    }
}

/// A font face loaded from a TTF font, together with its measure of units per em.
#[derive(Clone, Debug)]
struct TtfFontFace {
    /// The underlying font face which is represented through the `ttf_parser` crate.
    inner: Arc<OwnedFace>,
    /// The number of units per em of the font face.
    units_per_em: u16,
}

impl TtfFontFace {
    /// Constructs a font face from the underlying raw data extracted from the TTF font file.
    fn from_bytes(data: Vec<u8>) -> Result<Self, ContextError> {
        let face = OwnedFace::from_vec(data, 0).map_err(|error| {
            ContextError::with_error(ErrorKind::FontUnavailable, "Failed to parse font", &error)
        })?;
        let units_per_em = face.as_face_ref().units_per_em();

        Ok(Self {
            inner: Arc::new(face),
            units_per_em,
        })
    }

    fn face(&self) -> &Face<'_> {
        self.inner.as_face_ref()
    }

    fn glyph_id(&self, codepoint: char) -> Option<u16> {
        self.face()
            .glyph_index(codepoint)
            .map(|glyph_id| glyph_id.0)
    }

    /// Scales a value in font units to 1/1000 of the font size.
    fn scaled(&self, value: i32) -> f32 {
        value as f32 * 1000.0 / f32::from(self.units_per_em)
    }

    /// The advance width of a glyph in 1/1000 of the font size, zero for unknown glyphs.
    fn glyph_width(&self, glyph_id: u16) -> f32 {
        self.face()
            .glyph_hor_advance(owned_ttf_parser::GlyphId(glyph_id))
            .map(|advance| self.scaled(i32::from(advance)))
            .unwrap_or(0.0)
    }
}

#[derive(Clone, Debug)]
enum FontKind {
    Standard(StandardFamily),
    TrueType { bytes: Arc<Vec<u8>>, face: TtfFontFace },
}

/// A font usable on the canvas, identified in the page resources by its resource name.
#[derive(Clone, Debug)]
pub struct Font {
    resource_name: String,
    base_font: String,
    style: FontStyle,
    kind: FontKind,
}

impl Font {
    pub fn resource_name(&self) -> &str {
        &self.resource_name
    }

    pub fn base_font(&self) -> &str {
        &self.base_font
    }

    /// Text shown with an embedded font is a sequence of glyph IDs and is written in hexadecimal.
    pub(crate) fn string_format(&self) -> lopdf::StringFormat {
        match self.kind {
            FontKind::Standard(_) => lopdf::StringFormat::Literal,
            FontKind::TrueType { .. } => lopdf::StringFormat::Hexadecimal,
        }
    }

    /// The width of a single character in 1/1000 of the font size.
    pub fn character_width(&self, character: char) -> f32 {
        match &self.kind {
            FontKind::Standard(family) => family.character_width(self.style.bold, character),
            FontKind::TrueType { face, .. } => face
                .glyph_id(character)
                .map(|glyph_id| face.glyph_width(glyph_id))
                .unwrap_or(0.0),
        }
    }

    /// The width of a string in millimeters when set at `font_size` points.
    pub fn text_width(&self, text: &str, font_size: f32) -> f32 {
        let width_in_thousandths: f32 = text
            .nfc()
            .map(|character| self.character_width(character))
            .sum();
        points_to_millimeters(width_in_thousandths * font_size / 1000.0)
    }

    /// Encodes a string into the bytes of a `Tj` operand, which is WinAnsi for the standard
    /// fonts and big-endian glyph IDs for the embedded ones.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        match &self.kind {
            FontKind::Standard(_) => text
                .nfc()
                .map(|character| {
                    character_to_winansi(character).unwrap_or_else(|| {
                        log::warn!(
                            "Unable to encode the character {:?} with the font {:?}, replacing it",
                            character,
                            self.base_font()
                        );
                        b'?'
                    })
                })
                .collect(),
            FontKind::TrueType { face, .. } => text
                .nfc()
                .flat_map(|character| {
                    let glyph_id = face.glyph_id(character).unwrap_or_else(|| {
                        log::warn!(
                            "Unable to find the character {:?} in the font {:?}",
                            character,
                            self.base_font()
                        );
                        0
                    });
                    glyph_id.to_be_bytes()
                })
                .collect(),
        }
    }

    /// Builds the font dictionary for the page resources, embedding the font program and the
    /// widths of `used_characters` when the font is not one of the standard fonts.
    pub(crate) fn insert_into_document(
        &self,
        inner_document: &mut lopdf::Document,
        used_characters: &BTreeSet<char>,
    ) -> lopdf::Dictionary {
        use lopdf::Object::*;

        let (bytes, face) = match &self.kind {
            FontKind::Standard(_) => {
                return lopdf::Dictionary::from_iter(vec![
                    ("Type", Name("Font".into())),
                    ("Subtype", Name("Type1".into())),
                    ("BaseFont", Name(self.base_font().as_bytes().to_vec())),
                    ("Encoding", Name("WinAnsiEncoding".into())),
                ]);
            }
            FontKind::TrueType { bytes, face } => (bytes, face),
        };

        let font_stream = lopdf::Stream::new(
            lopdf::Dictionary::from_iter(vec![("Length1", Integer(bytes.len() as i64))]),
            bytes.as_ref().clone(),
        );
        let font_stream_id = inner_document.add_object(font_stream);

        let bounding_box = face.face().global_bounding_box();
        let ascent = face.scaled(i32::from(face.face().ascender()));
        let descent = face.scaled(i32::from(face.face().descender()));
        let font_descriptor = lopdf::Dictionary::from_iter(vec![
            ("Type", Name("FontDescriptor".into())),
            ("FontName", Name(self.base_font.clone().into_bytes())),
            // Nonsymbolic, the glyphs are addressed through the Identity-H encoding
            ("Flags", Integer(32)),
            (
                "FontBBox",
                Array(
                    [
                        bounding_box.x_min,
                        bounding_box.y_min,
                        bounding_box.x_max,
                        bounding_box.y_max,
                    ]
                    .into_iter()
                    .map(|value| Integer(face.scaled(i32::from(value)) as i64))
                    .collect(),
                ),
            ),
            ("ItalicAngle", Integer(if self.style.italic { -12 } else { 0 })),
            ("Ascent", Integer(ascent as i64)),
            ("Descent", Integer(descent as i64)),
            ("CapHeight", Integer(ascent as i64)),
            ("StemV", Integer(80)),
            ("FontFile2", Reference(font_stream_id)),
        ]);
        let font_descriptor_id = inner_document.add_object(font_descriptor);

        let glyphs: BTreeMap<u16, char> = used_characters
            .iter()
            .filter_map(|character| face.glyph_id(*character).map(|glyph_id| (glyph_id, *character)))
            .collect();

        let mut widths = Vec::with_capacity(glyphs.len() * 2);
        for glyph_id in glyphs.keys() {
            widths.push(Integer(i64::from(*glyph_id)));
            widths.push(Array(vec![Integer(face.glyph_width(*glyph_id) as i64)]));
        }

        let descendant_font = lopdf::Dictionary::from_iter(vec![
            ("Type", Name("Font".into())),
            ("Subtype", Name("CIDFontType2".into())),
            ("BaseFont", Name(self.base_font().as_bytes().to_vec())),
            (
                "CIDSystemInfo",
                Dictionary(lopdf::Dictionary::from_iter(vec![
                    ("Registry", String("Adobe".into(), lopdf::StringFormat::Literal)),
                    ("Ordering", String("Identity".into(), lopdf::StringFormat::Literal)),
                    ("Supplement", Integer(0)),
                ])),
            ),
            ("FontDescriptor", Reference(font_descriptor_id)),
            ("CIDToGIDMap", Name("Identity".into())),
            ("DW", Integer(1000)),
            ("W", Array(widths)),
        ]);
        let descendant_font_id = inner_document.add_object(descendant_font);

        let to_unicode_stream = lopdf::Stream::new(
            lopdf::Dictionary::new(),
            generate_to_unicode_cmap(&glyphs).into_bytes(),
        );
        let to_unicode_stream_id = inner_document.add_object(to_unicode_stream);

        lopdf::Dictionary::from_iter(vec![
            ("Type", Name("Font".into())),
            ("Subtype", Name("Type0".into())),
            ("BaseFont", Name(self.base_font().as_bytes().to_vec())),
            ("Encoding", Name("Identity-H".into())),
            ("DescendantFonts", Array(vec![Reference(descendant_font_id)])),
            ("ToUnicode", Reference(to_unicode_stream_id)),
        ])
    }
}

/// All fonts available to a canvas, keyed by their lowercase family name and face.
#[derive(Clone, Debug)]
pub struct FontBook {
    fonts: BTreeMap<(String, FontStyle), Font>,
}

impl Default for FontBook {
    fn default() -> Self {
        FontBook::with_standard_fonts()
    }
}

impl FontBook {
    /// A font book containing the Helvetica and Courier families in all four faces, Arial
    /// being an alias of Helvetica.
    pub fn with_standard_fonts() -> Self {
        let mut font_book = FontBook {
            fonts: BTreeMap::new(),
        };
        let families = [
            ("helvetica", StandardFamily::Helvetica),
            ("arial", StandardFamily::Helvetica),
            ("courier", StandardFamily::Courier),
        ];
        for (family_name, family) in families {
            for (bold, italic) in [(false, false), (true, false), (false, true), (true, true)] {
                let style = FontStyle {
                    bold,
                    italic,
                    underline: false,
                };
                font_book.insert(
                    family_name,
                    style,
                    family.base_font(style).to_string(),
                    FontKind::Standard(family),
                );
            }
        }
        font_book
    }

    fn insert(&mut self, family: &str, style: FontStyle, base_font: String, kind: FontKind) {
        let resource_name = format!("F{}", self.fonts.len() + 1);
        let key = (family.to_lowercase(), style.face());
        let resource_name = self
            .fonts
            .get(&key)
            .map(|font| font.resource_name.clone())
            .unwrap_or(resource_name);
        self.fonts.insert(
            key,
            Font {
                resource_name,
                base_font,
                style: style.face(),
                kind,
            },
        );
    }

    /// Registers the TrueType font at `font_path` as the given face of a family.
    pub fn add_true_type_font(
        &mut self,
        family: &str,
        style: FontStyle,
        font_path: &Path,
    ) -> Result<(), ContextError> {
        let font_bytes = std::fs::read(font_path).map_err(|error| {
            ContextError::with_error(
                ErrorKind::FontUnavailable,
                format!("Failed to read the font {:?}, probably the path is wrong", font_path),
                &error,
            )
        })?;
        self.add_true_type_font_bytes(family, style, font_bytes)
    }

    pub fn add_true_type_font_bytes(
        &mut self,
        family: &str,
        style: FontStyle,
        font_bytes: Vec<u8>,
    ) -> Result<(), ContextError> {
        let face = TtfFontFace::from_bytes(font_bytes.clone())?;
        let base_font = match style.face().to_string().as_str() {
            "" => family.replace(' ', ""),
            suffix => format!("{}-{}", family.replace(' ', ""), suffix),
        };
        log::debug!("Registered the font {:?} for the family {:?}", base_font, family);
        self.insert(
            family,
            style,
            base_font,
            FontKind::TrueType {
                bytes: Arc::new(font_bytes),
                face,
            },
        );
        Ok(())
    }

    /// Finds the font of a family in the given style, falling back to the regular face of the
    /// family when the requested face has not been registered.
    pub fn resolve(&self, family: &str, style: FontStyle) -> Result<&Font, ContextError> {
        let family_key = family.to_lowercase();
        if let Some(font) = self.fonts.get(&(family_key.clone(), style.face())) {
            return Ok(font);
        }
        match self.fonts.get(&(family_key, FontStyle::REGULAR)) {
            Some(font) => {
                log::debug!(
                    "The family {:?} has no {:?} face, using the regular one",
                    family,
                    style.face().to_string()
                );
                Ok(font)
            }
            None => Err(ContextError::of_kind(
                ErrorKind::FontUnavailable,
                format!("Unable to find the font family {:?}", family),
            )),
        }
    }

    pub fn by_resource_name(&self, resource_name: &str) -> Option<&Font> {
        self.fonts
            .values()
            .find(|font| font.resource_name == resource_name)
    }
}

/// Map a single Unicode character to its WinAnsi (Windows-1252) byte.
fn character_to_winansi(character: char) -> Option<u8> {
    match character as u32 {
        0x0020..=0x007E | 0x00A0..=0x00FF => Some(character as u8),
        0x20AC => Some(0x80),
        0x201A => Some(0x82),
        0x0192 => Some(0x83),
        0x201E => Some(0x84),
        0x2026 => Some(0x85),
        0x2020 => Some(0x86),
        0x2021 => Some(0x87),
        0x02C6 => Some(0x88),
        0x2030 => Some(0x89),
        0x0160 => Some(0x8A),
        0x2039 => Some(0x8B),
        0x0152 => Some(0x8C),
        0x017D => Some(0x8E),
        0x2018 => Some(0x91),
        0x2019 => Some(0x92),
        0x201C => Some(0x93),
        0x201D => Some(0x94),
        0x2022 => Some(0x95),
        0x2013 => Some(0x96),
        0x2014 => Some(0x97),
        0x02DC => Some(0x98),
        0x2122 => Some(0x99),
        0x0161 => Some(0x9A),
        0x203A => Some(0x9B),
        0x0153 => Some(0x9C),
        0x017E => Some(0x9E),
        0x0178 => Some(0x9F),
        _ => None,
    }
}

/// Generates the CMap which maps the glyph IDs back to Unicode, so that text can be copied.
/// Glyph IDs are written in blocks of at most 100 entries.
fn generate_to_unicode_cmap(glyphs: &BTreeMap<u16, char>) -> String {
    let mut cmap = String::from(
        "/CIDInit /ProcSet findresource begin\n12 dict begin\nbegincmap\n\
         /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
         /CMapName /Adobe-Identity-UCS def\n/CMapType 2 def\n\
         1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n",
    );

    let entries: Vec<(&u16, &char)> = glyphs.iter().collect();
    for block in entries.chunks(100) {
        cmap.push_str(&format!("{} beginbfchar\n", block.len()));
        for (glyph_id, character) in block {
            let mut units = [0u16; 2];
            let utf16: String = character
                .encode_utf16(&mut units)
                .iter()
                .map(|unit| format!("{unit:04X}"))
                .collect();
            cmap.push_str(&format!("<{glyph_id:04X}> <{utf16}>\n"));
        }
        cmap.push_str("endbfchar\n");
    }

    cmap.push_str(
        "endcmap\nCMapName currentdict /CMap defineresource pop\nend\nend\n",
    );
    cmap
}
