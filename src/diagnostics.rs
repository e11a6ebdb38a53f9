//! The error channel.
//!
//! Non-fatal failures are turned into [`Diagnostic`]s and handed to a
//! [`Report`] sink. The binary writes them to stderr, one line each; tests
//! collect them in a `Vec`.

use std::{
    fmt,
    io::{self, Write},
};

use crate::error::{ParseError, RecordError, SelectorError};

#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// A document could not be parsed and yields no records.
    Parse(ParseError),
    /// A selector failed on one input item.
    Selector(SelectorError),
    /// One record was dropped.
    Record(RecordError),
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::Parse(e) => write!(f, "Err: {e}"),
            Diagnostic::Selector(e) => write!(f, "{e}"),
            Diagnostic::Record(e) => write!(f, "ERR: {e}"),
        }
    }
}

impl From<ParseError> for Diagnostic {
    fn from(e: ParseError) -> Self {
        Diagnostic::Parse(e)
    }
}

impl From<SelectorError> for Diagnostic {
    fn from(e: SelectorError) -> Self {
        Diagnostic::Selector(e)
    }
}

impl From<RecordError> for Diagnostic {
    fn from(e: RecordError) -> Self {
        Diagnostic::Record(e)
    }
}

/// Sink for non-fatal diagnostics.
pub trait Report {
    fn report(&mut self, diagnostic: Diagnostic);
}

impl Report for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

/// Writes each diagnostic as one line to a writer, stderr by default.
pub struct StderrReporter<W = io::Stderr> {
    writer: W,
    count: usize,
}

impl StderrReporter {
    pub fn new() -> Self {
        StderrReporter::with_writer(io::stderr())
    }
}

impl Default for StderrReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> StderrReporter<W> {
    pub fn with_writer(writer: W) -> Self {
        StderrReporter { writer, count: 0 }
    }

    /// Number of diagnostics reported so far.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Report for StderrReporter<W> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.count += 1;
        // Nowhere left to report a failing error channel.
        let _ = writeln!(self.writer, "{diagnostic}").and_then(|()| self.writer.flush());
    }
}
