//! Error types shared by the pipeline engine.
//!
//! Only [`InputError`] is fatal for a run. The others are scoped to one document,
//! one selector application or one record and end up on the error channel
//! through [`Report`](crate::diagnostics::Report).

use std::io;

use thiserror::Error;

/// The input unit could not be turned into a document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        ParseError {
            message: message.into(),
        }
    }
}

/// A selector could not be compiled or evaluated by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("xpath '{selector}': {message}")]
pub struct SelectorError {
    /// The selector string as handed to the backend.
    pub selector: String,
    pub message: String,
}

impl SelectorError {
    pub fn new(selector: impl Into<String>, message: impl Into<String>) -> Self {
        SelectorError {
            selector: selector.into(),
            message: message.into(),
        }
    }
}

/// A CSS selector that has no XPath translation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at position {position}")]
pub struct CssError {
    pub message: String,
    pub position: usize,
}

impl CssError {
    pub fn new(message: impl Into<String>, position: usize) -> Self {
        CssError {
            message: message.into(),
            position,
        }
    }
}

/// Building one output record failed; the record is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("cannot serialize node: {0}")]
    Serialize(String),

    #[error("field '_' collides with pass-through data")]
    ReservedField,
}

/// Fatal input framing failures.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("line {line}: invalid JSON: {source}")]
    MalformedJson {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("line {line}: expected a JSON object, got {found}")]
    NotAnObject { line: usize, found: &'static str },

    #[error(transparent)]
    Io(#[from] io::Error),
}
