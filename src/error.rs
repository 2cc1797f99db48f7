use std::num::{ParseFloatError, ParseIntError};

use thiserror::Error;

/// Errors raised while loading a document or reading properties from it.
///
/// Absence is never an error: a missing text node or attribute reads as
/// `None` and an empty collection as an empty `Vec`.
#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("XML parse error: {0}")]
    XmlParse(#[from] quick_xml::Error),

    #[error("XML escape error: {0}")]
    Escape(#[from] quick_xml::escape::EscapeError),

    #[error("Invalid UTF-8 in document: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Document has no root element")]
    NoRootElement,

    #[error("Extra content after root element <{first}>: <{extra}>")]
    MultipleRootElements { first: String, extra: String },

    #[error("Unsupported document encoding '{0}'")]
    UnknownEncoding(String),

    #[error("Document is not valid {encoding}")]
    Decode { encoding: &'static str },

    #[error("Element <{0}> is never closed")]
    UnclosedElement(String),

    /// A wrapper was handed a node that is not an element.
    #[error("Expected an XML element, not a {actual} node")]
    NotAnElement { actual: &'static str },

    /// A wrapper was handed an element with the wrong tag.
    #[error("Expected element with \"{expected}\" tag, not \"{actual}\"")]
    TagMismatch {
        expected: &'static str,
        actual: String,
    },

    #[error("No property '{name}' declared for <{tag}>")]
    UnknownProperty { tag: &'static str, name: String },

    #[error("Sum of lap {property} overflows")]
    SumOverflow { property: &'static str },

    #[error("Unknown time zone '{0}'")]
    UnknownTimeZone(String),

    #[error("Invalid integer '{value}': {source}")]
    InvalidInteger {
        value: String,
        #[source]
        source: ParseIntError,
    },

    #[error("Invalid float '{value}': {source}")]
    InvalidFloat {
        value: String,
        #[source]
        source: ParseFloatError,
    },

    #[error("Invalid timestamp '{value}': {source}")]
    InvalidTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

impl ReaderError {
    /// True for wrapper construction failures (wrong node kind or tag).
    pub fn is_construction_error(&self) -> bool {
        matches!(self, Self::NotAnElement { .. } | Self::TagMismatch { .. })
    }

    /// True when text present in the document could not be converted.
    pub fn is_conversion_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidInteger { .. } | Self::InvalidFloat { .. } | Self::InvalidTimestamp { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ReaderError>;

#[cfg(feature = "wasm")]
impl From<ReaderError> for wasm_bindgen::JsValue {
    fn from(e: ReaderError) -> Self {
        wasm_bindgen::JsValue::from_str(&e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_mismatch_names_both_tags() {
        let err = ReaderError::TagMismatch {
            expected: "trkpt",
            actual: "rtept".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("\"trkpt\""));
        assert!(msg.contains("\"rtept\""));
        assert!(err.is_construction_error());
        assert!(!err.is_conversion_error());
    }

    #[test]
    fn test_conversion_classification() {
        let source = "4x".parse::<i64>().unwrap_err();
        let err = ReaderError::InvalidInteger {
            value: "4x".to_string(),
            source,
        };
        assert!(err.is_conversion_error());
        assert!(err.to_string().contains("'4x'"));
    }
}
