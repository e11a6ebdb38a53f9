//! CLI support for htqq
//!
//! Everything the binary does apart from argument parsing, so the same run can
//! be driven from tests or embedded in other tools.

mod docs;
mod extract;

pub use docs::query_syntax;
pub use extract::{ExtractOptions, execute};

use std::io;

use thiserror::Error;

use crate::error::InputError;

/// Exit code for unexpected failures (I/O, nothing to read).
pub const EXIT_FAILURE: i32 = 1;
/// Exit code for a JSON-lines line that is not valid JSON.
pub const EXIT_MALFORMED_JSON: i32 = 3;
/// Exit code for a JSON-lines line that is valid JSON but not an object.
pub const EXIT_NOT_AN_OBJECT: i32 = 4;
/// Exit code when the run was interrupted.
pub const EXIT_INTERRUPTED: i32 = 130;

/// Errors that end a run.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Input(InputError),

    #[error("Interrupted")]
    Interrupted,

    #[error("No input provided. Pipe HTML to stdin.")]
    NoInput,
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Input(InputError::MalformedJson { .. }) => EXIT_MALFORMED_JSON,
            CliError::Input(InputError::NotAnObject { .. }) => EXIT_NOT_AN_OBJECT,
            CliError::Interrupted => EXIT_INTERRUPTED,
            _ => EXIT_FAILURE,
        }
    }

    /// `true` when stdout was closed by the reader, e.g. `htqq ... | head`.
    pub fn is_broken_pipe(&self) -> bool {
        matches!(self, CliError::Input(InputError::Io(e)) if e.kind() == io::ErrorKind::BrokenPipe)
    }
}

impl From<InputError> for CliError {
    fn from(e: InputError) -> Self {
        match e {
            InputError::Io(e) if e.kind() == io::ErrorKind::Interrupted => CliError::Interrupted,
            other => CliError::Input(other),
        }
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        CliError::from(InputError::Io(e))
    }
}
