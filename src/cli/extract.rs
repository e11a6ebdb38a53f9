//! Run an extraction over stdin-like input

use std::io::{BufRead, Write};

use log::debug;

use super::CliError;
use crate::{
    config::Config,
    diagnostics::Report,
    framing::{self, Framing, Summary},
    html::HtmlEngine,
    output::OutputOptions,
};

/// Options for an extraction run
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Query tokens, in order
    pub query: Vec<String>,
    /// One document per input line
    pub lines: bool,
    /// JSON-lines input, naming the column that holds the HTML
    pub jsonl: Option<String>,
    /// Write bare values as JSON strings
    pub json: bool,
    /// Pretty-print serialized markup
    pub pretty: bool,
}

impl ExtractOptions {
    pub fn framing(&self) -> Framing {
        match (&self.jsonl, self.lines) {
            (Some(column), _) => Framing::JsonLines {
                column: column.clone(),
            },
            (None, true) => Framing::PerLine,
            (None, false) => Framing::Blob,
        }
    }

    pub fn config(&self, engine: &HtmlEngine) -> Config {
        let output = OutputOptions {
            json: self.json,
            pretty: self.pretty,
        };
        Config::new(engine, &self.query, self.framing(), output)
    }
}

/// Execute an extraction with the HTML engine
pub fn execute<I, W, R>(
    options: &ExtractOptions,
    input: I,
    output: &mut W,
    reporter: &mut R,
) -> Result<Summary, CliError>
where
    I: BufRead,
    W: Write + ?Sized,
    R: Report + ?Sized,
{
    let engine = HtmlEngine::new();
    let config = options.config(&engine);
    debug!("pipeline: {:?}", config.pipeline);

    let summary = framing::run(&engine, &config, input, output, reporter)?;
    debug!(
        "{} documents, {} records, {} skipped",
        summary.documents, summary.records, summary.skipped
    );
    Ok(summary)
}
