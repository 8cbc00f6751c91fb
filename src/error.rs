use serde::{Deserialize, Serialize};

/// The category of a `ContextError`, every category is fatal to the render pass it occurs in.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// A content block carries a `type` tag which is not `text`, `line` or `table`.
    UnknownBlockKind,
    /// A width, coordinate, padding or size is negative or not finite.
    InvalidGeometry,
    /// The dry-run measurement of wrapped text could not be completed.
    MeasurementFailure,
    /// A per-cell format key is malformed or points outside of the table.
    InvalidCellFormat,
    /// A font family or style is not registered, or a font file could not be loaded.
    FontUnavailable,
    /// Reading or writing a file failed.
    Io,
    /// Parsing or writing JSON or PDF data failed.
    Serialization,
    /// Anything else, mostly internal inconsistencies of the PDF document.
    Other,
}

/// A struct that represents an error with a context and possibly the propagated source error.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ContextError {
    pub kind: ErrorKind,
    pub context: String,
    pub source_error: Option<String>,
}

impl std::fmt::Display for ContextError {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.source_error {
            Some(source_error) => write!(
                formatter,
                "{}: {}",
                self.context,
                minimize_first_letter(source_error.to_string()),
            ),
            None => write!(formatter, "{}", self.context),
        }
    }
}

impl std::error::Error for ContextError {}

impl ContextError {
    /// Create a new `ContextError` of the kind `Other` with the given context.
    pub fn with_context<S: Into<String>>(context: S) -> ContextError {
        ContextError::of_kind(ErrorKind::Other, context)
    }

    /// Create a new `ContextError` of the given kind with the given context.
    pub fn of_kind<S: Into<String>>(kind: ErrorKind, context: S) -> ContextError {
        ContextError {
            kind,
            context: context.into(),
            source_error: None,
        }
    }

    /// Create a new `ContextError` with the given context and source error.
    pub fn with_error<S: Into<String>>(
        kind: ErrorKind,
        context: S,
        error: &dyn std::error::Error,
    ) -> ContextError {
        ContextError {
            kind,
            context: context.into(),
            source_error: Some(error.to_string()),
        }
    }

    /// Checks that a length is finite and not negative, the name is only used for the error message.
    pub fn check_length(name: &str, value: f32) -> Result<(), ContextError> {
        if value.is_finite() && value >= 0.0 {
            Ok(())
        } else {
            Err(ContextError::of_kind(
                ErrorKind::InvalidGeometry,
                format!("The {name} must be finite and not negative, but it is {value}"),
            ))
        }
    }
}

/// Minimizes the first letter of a string, it is used for standardizing the error message.
fn minimize_first_letter(string: String) -> String {
    let mut characters = string.chars();
    match characters.next() {
        None => String::new(),
        Some(character) => character.to_lowercase().chain(characters).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_errors_are_appended_in_lowercase() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let error = ContextError::with_error(ErrorKind::Io, "Unable to read the document", &io_error);
        assert_eq!(error.to_string(), "Unable to read the document: file not found");
        assert_eq!(error.kind, ErrorKind::Io);
    }

    #[test]
    fn lengths_must_be_finite_and_positive() {
        assert!(ContextError::check_length("width", 0.0).is_ok());
        assert!(ContextError::check_length("width", 12.5).is_ok());
        for value in [-1.0, f32::NAN, f32::INFINITY] {
            let error = ContextError::check_length("width", value).unwrap_err();
            assert_eq!(error.kind, ErrorKind::InvalidGeometry);
        }
    }
}
