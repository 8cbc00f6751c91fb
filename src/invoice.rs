//! A complete sample invoice, which is what `rechnr --sample` renders.

use std::collections::BTreeMap;

use crate::blocks::{
    BordersLayout, CellFormat, ColumnAlign, ContentBlock, LineBlockArgs, Padding, TableBlockArgs,
    TextBlockArgs,
};
use crate::color::tailwind;
use crate::document::Document;
use crate::formats::Formats;
use crate::pdf::Metadata;
use crate::style::{Align, FontStyle};

const SENDER: [&str; 4] = [
    "Musterstudio",
    "Max Mustermann",
    "Holtenauer Str. 11",
    "24105 Kiel",
];

const LINE_ITEMS: [[&str; 5]; 12] = [
    ["Beschreibung", "Einzelpreis", "Menge", "Einheit", "Summe"],
    [
        "Yamaha CFX Konzertflügel\n\nBitte registrieren Sie Ihr Instrument innerhalb von 6 Monaten nach dem Kaufdatum und Sie erhalten eine Garantieverlängerung von 2 auf 5 Jahre. https://de.yamaha.com/de/support/warranty/index.",
        "150000,00 €",
        "1",
        "Stk.",
        "150000,00 €",
    ],
    [
        "Yamaha Clavinova Digitalpiano Modell: CLP - 775 Ausführung: Rosenholz",
        "3249,00 €",
        "1,00",
        "Stk.",
        "3249,00 €",
    ],
    ["Hochwertige Sitzbank Ausführung: Rosenholz", "170,00 €", "1,00", "Stk.", "170,00 €"],
    ["Notenständer - Verstellbar und klappbar", "45,00 €", "2,00", "Stk.", "90,00 €"],
    [
        "Anfertigung von maßgeschneiderten Notenständern mit eingebauter LED-Beleuchtung, ideal für Musiker, die bei schwachem Licht spielen. Inklusive 2 Jahre Garantie auf alle Teile.",
        "189,00 €",
        "1,00",
        "Stk.",
        "189,00 €",
    ],
    [
        "Premium Klavierpflege-Set mit Reinigungsmittel, Tuch und Bürste",
        "30,00 €",
        "1,00",
        "Set",
        "30,00 €",
    ],
    ["Konzertflügel-Service (Stimmen und Reinigen)", "350,00 €", "1,00", "Service", "350,00 €"],
    [
        "Handgefertigter Flügelhocker aus Mahagoni-Holz, gepolstert mit hochwertigem Lederbezug, für höchsten Sitzkomfort. Perfekt für lange Übungsstunden und Auftritte.",
        "299,00 €",
        "1,00",
        "Stk.",
        "299,00 €",
    ],
    ["Transport eines Konzertflügels innerhalb Deutschlands", "500,00 €", "1,00", "Psch.", "500,00 €"],
    ["Leihgabe eines Digitalpianos für 3 Monate", "600,00 €", "1,00", "Psch.", "600,00 €"],
    ["Mietservice für Klavierbänke (6 Monate)", "180,00 €", "6,00", "Monat", "180,00 €"],
];

const TOTALS: [[&str; 3]; 4] = [
    ["", "Zwischensumme (EUR)", "2873,11 €"],
    ["", "19% MWSt.", "545,89 €"],
    ["", "Individueller Rabatt", "-341,99 €"],
    ["", "Gesamtsumme (EUR)", "3419,89 €"],
];

pub fn sample_metadata() -> Metadata {
    Metadata {
        title: "Rechnung 230282-287".into(),
        author: "Max Mustermann".into(),
        subject: "Rechnung".into(),
        creator: "rechnr".into(),
        creation_date: Some("2024-10-16T09:00:00+02:00".into()),
    }
}

pub fn sample_invoice() -> Vec<ContentBlock> {
    sample_invoice_in(&Formats::default())
}

/// The sample invoice, its title and totals highlighted in the colors of `formats`.
pub fn sample_invoice_in(formats: &Formats) -> Vec<ContentBlock> {
    let highlighted = CellFormat {
        bg_color: Some(formats.primary_color),
        color: Some(formats.primary_contrast_color),
        ..CellFormat::default()
    };

    vec![
        ContentBlock::Line(LineBlockArgs {
            x2: Some(7.0),
            ..LineBlockArgs::new(3.0, 99.0)
        }),
        ContentBlock::Text(TextBlockArgs {
            one_line: true,
            w: 80.0,
            y: Some(50.0),
            size: Some(7.0),
            color: Some(formats.secondary_color),
            ..TextBlockArgs::new(SENDER)
        }),
        ContentBlock::Text(TextBlockArgs {
            x: Some(23.0),
            y: Some(10.0),
            align: Align::Right,
            size: Some(9.0),
            ..TextBlockArgs::new(SENDER.into_iter().chain([
                "Tel: +49 (0) 431 0000000",
                "kontakt@musterstudio.example",
                "www.musterstudio.example",
                "St.-Nr.: 20/054/03217",
            ]))
        }),
        ContentBlock::Text(TextBlockArgs {
            y: Some(60.0),
            w: 80.0,
            ..TextBlockArgs::new([
                "Klavierhaus Nord GmbH",
                "Erika Musterfrau",
                "Lindenallee 4",
                "24119 Kronshagen",
            ])
        }),
        ContentBlock::Text(TextBlockArgs {
            x: Some(23.0),
            y: Some(92.0),
            size: Some(12.0),
            color: Some(formats.primary_color),
            style: Some(FontStyle::BOLD),
            pb: 5.0,
            ..TextBlockArgs::new(["Rechnung 230282-287"])
        }),
        ContentBlock::Text(TextBlockArgs {
            x: Some(23.0),
            y: Some(92.0),
            align: Align::Right,
            pb: 5.0,
            ..TextBlockArgs::new(["Datum: 16.10.2024", "Bearbeiter: Max Mustermann"])
        }),
        ContentBlock::Text(TextBlockArgs {
            pb: 5.0,
            ..TextBlockArgs::new([
                "Vielen Dank für Ihr Vertrauen in unsere Leistungen.",
                "Wir erlauben uns folgendes in Rechnung zu stellen:",
            ])
        }),
        ContentBlock::Table(TableBlockArgs {
            col_widths: Some(vec![85.0, 25.0, 15.0, 15.0, 24.0]),
            padding: Padding::new(1.0, 0.0, 1.0, 0.0),
            borders_layout: BordersLayout::HorizontalLines,
            text_align: ColumnAlign::PerColumn(vec![
                Align::Left,
                Align::Right,
                Align::Center,
                Align::Center,
                Align::Right,
            ]),
            cell_fill_color: Some(tailwind::GRAY_50),
            line_color: tailwind::PINK_400,
            pb: 5.0,
            ..TableBlockArgs::new(&LINE_ITEMS)
        }),
        ContentBlock::Table(TableBlockArgs {
            unbreakable: true,
            borders_layout: BordersLayout::None,
            first_row_as_headings: false,
            col_widths: Some(vec![85.0, 39.5, 39.5]),
            text_align: ColumnAlign::PerColumn(vec![Align::Left, Align::Left, Align::Right]),
            padding: Padding::new(1.0, 0.0, 1.0, 0.0),
            cell_formats: BTreeMap::from([
                ("3.1".to_string(), highlighted.clone()),
                ("3.2".to_string(), highlighted),
            ]),
            pb: 10.0,
            ..TableBlockArgs::new(&TOTALS)
        }),
        ContentBlock::Text(TextBlockArgs {
            pb: 20.0,
            ..TextBlockArgs::new([
                "Vielen Dank für Ihren Auftrag!",
                "In dieser Rechnung ist gemäß §19(1) UStG keine Umsatzsteuer enthalten.",
            ])
        }),
        ContentBlock::Text(TextBlockArgs {
            y: Some(240.0),
            style: Some(FontStyle::BOLD),
            ..TextBlockArgs::new(["Bitte nutzen Sie für die Überweisung folgende Daten:"])
        }),
        ContentBlock::Text(TextBlockArgs::new([
            "Institut: Musterbank Kiel",
            "IBAN: DE89 3704 0044 0532 0130 00",
            "Inhaber: Max Mustermann",
            "BIC: COBADEFFXXX",
        ])),
    ]
}

pub fn sample_document() -> Document {
    Document::new(sample_metadata(), sample_invoice())
}

/// The sample document rendered with `formats`.
pub fn sample_document_in(formats: Formats) -> Document {
    Document {
        blocks: sample_invoice_in(&formats),
        formats: Some(formats),
        ..sample_document()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_blocks_are_valid() {
        let blocks = sample_invoice();
        assert_eq!(blocks.len(), 12);
        for block in &blocks {
            match block {
                ContentBlock::Text(args) => args.validate().unwrap(),
                ContentBlock::Line(args) => args.validate().unwrap(),
                ContentBlock::Table(args) => args.validate().unwrap(),
            }
        }
    }

    #[test]
    fn highlights_follow_the_formats() {
        let formats = Formats {
            primary_color: tailwind::PINK_600,
            primary_contrast_color: tailwind::BLACK,
            secondary_color: tailwind::GRAY_500,
            ..Formats::default()
        };
        let document = sample_document_in(formats.clone());
        assert_eq!(document.formats.as_ref(), Some(&formats));

        let ContentBlock::Table(totals) = &document.blocks[8] else {
            panic!("the totals are not a table: {:?}", document.blocks[8]);
        };
        let highlighted = &totals.cell_formats["3.2"];
        assert_eq!(highlighted.bg_color, Some(tailwind::PINK_600));
        assert_eq!(highlighted.color, Some(tailwind::BLACK));

        let ContentBlock::Text(title) = &document.blocks[4] else {
            panic!("the title is not a text: {:?}", document.blocks[4]);
        };
        assert_eq!(title.paragraphs(), vec!["Rechnung 230282-287".to_string()]);
        assert_eq!(title.color, Some(tailwind::PINK_600));
        assert_eq!(sample_invoice(), sample_invoice_in(&Formats::default()));
    }

    #[test]
    fn sample_survives_a_json_round_trip() {
        let document = sample_document();
        let json = serde_json::to_string_pretty(&document).unwrap();
        let parsed = Document::from_json_str(&json).unwrap();
        assert_eq!(parsed, document);
    }
}
