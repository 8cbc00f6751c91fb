use std::path::PathBuf;

use clap::Parser;
use rechnr::{document::Document, error::ContextError, formats::Formats};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct CliArguments {
    /// The JSON document containing the content blocks to render.
    #[arg(
        short = 'd',
        long = "document",
        value_name = "json_file",
        required_unless_present = "sample",
        conflicts_with = "sample"
    )]
    document_path: Option<PathBuf>,
    /// Renders the built-in sample invoice instead of a document.
    #[arg(long = "sample")]
    sample: bool,
    #[arg(short = 'o', long = "output", value_name = "pdf_file")]
    output_file_path: PathBuf,
    /// Formats replacing the ones of the document.
    #[arg(short = 'f', long = "formats", value_name = "json_file")]
    formats_path: Option<PathBuf>,
    /// Compresses the content streams of the PDF document.
    #[arg(short = 'c', long = "compress")]
    compress: bool,
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
    #[arg(long = "title")]
    title: Option<String>,
    #[arg(long = "author")]
    author: Option<String>,
    #[arg(long = "subject")]
    subject: Option<String>,
    #[arg(long = "creator")]
    creator: Option<String>,
}

fn main() {
    if let Err(error) = fallible_main() {
        log::error!("{}", error);
        std::process::exit(1);
    }
}

fn fallible_main() -> Result<(), ContextError> {
    let arguments = CliArguments::parse();
    env_logger::builder()
        .filter_level(if arguments.verbose {
            log::LevelFilter::Trace
        } else {
            log::LevelFilter::Info
        })
        .init();
    log::debug!("{:?}", arguments);

    let formats = arguments
        .formats_path
        .as_deref()
        .map(Formats::from_path)
        .transpose()?;
    let mut document = match (&arguments.document_path, &formats) {
        (Some(document_path), _) => Document::from_path(document_path)?,
        (None, Some(formats)) => rechnr::invoice::sample_document_in(formats.clone()),
        (None, None) => rechnr::invoice::sample_document(),
    };
    let metadata = &mut document.metadata;
    for (field, value) in [
        (&mut metadata.title, &arguments.title),
        (&mut metadata.author, &arguments.author),
        (&mut metadata.subject, &arguments.subject),
        (&mut metadata.creator, &arguments.creator),
    ] {
        if let Some(value) = value {
            field.clone_from(value);
        }
    }

    document.save_to_pdf_file(
        &arguments.output_file_path,
        formats.as_ref(),
        arguments.compress,
    )
}
