//! Input framing: how standard input is cut into documents.

use std::io::{BufRead, Write};

use log::debug;
use serde_json::{Map, Value};

use crate::{
    config::Config,
    diagnostics::Report,
    engine::Engine,
    error::InputError,
    output::Record,
    record::RecordBuilder,
};

/// How the input stream maps to documents.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Framing {
    /// The whole input is one document.
    #[default]
    Blob,
    /// Every line is a document.
    PerLine,
    /// Every line is a JSON object; `column` holds the HTML and the other
    /// keys are passed through under `_`.
    JsonLines { column: String },
}

/// Counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    /// Input units handed to the parser.
    pub documents: usize,
    /// Records written.
    pub records: usize,
    /// Units skipped without parsing (blank, or no HTML in the column).
    pub skipped: usize,
}

/// Reads `input` according to `config.framing` and writes one line per record
/// to `output`, flushing after each.
///
/// Only I/O failures and malformed JSON-lines input are returned as errors;
/// everything else is reported to `reporter` and skipped.
pub fn run<E, I, W, R>(
    engine: &E,
    config: &Config,
    mut input: I,
    output: &mut W,
    reporter: &mut R,
) -> Result<Summary, InputError>
where
    E: Engine + ?Sized,
    I: BufRead,
    W: Write + ?Sized,
    R: Report + ?Sized,
{
    let mut framer = Framer {
        engine,
        config,
        output,
        reporter,
        summary: Summary::default(),
    };

    match &config.framing {
        Framing::Blob => {
            let mut source = Vec::new();
            input.read_to_end(&mut source)?;
            framer.document(&source, None)?;
        }
        Framing::PerLine => {
            for line in input.split(b'\n') {
                framer.document(strip_cr(&line?), None)?;
            }
        }
        Framing::JsonLines { column } => {
            for (index, line) in input.split(b'\n').enumerate() {
                framer.json_line(index + 1, strip_cr(&line?), column)?;
            }
        }
    }

    Ok(framer.summary)
}

struct Framer<'a, E: ?Sized, W: ?Sized, R: ?Sized> {
    engine: &'a E,
    config: &'a Config,
    output: &'a mut W,
    reporter: &'a mut R,
    summary: Summary,
}

impl<E, W, R> Framer<'_, E, W, R>
where
    E: Engine + ?Sized,
    W: Write + ?Sized,
    R: Report + ?Sized,
{
    fn json_line(&mut self, line: usize, source: &[u8], column: &str) -> Result<(), InputError> {
        if is_blank(source) {
            self.summary.skipped += 1;
            return Ok(());
        }

        let value: Value = serde_json::from_slice(source)
            .map_err(|source| InputError::MalformedJson { line, source })?;
        let Value::Object(object) = value else {
            return Err(InputError::NotAnObject {
                line,
                found: json_type(&value),
            });
        };

        let html = match object.get(column) {
            Some(Value::String(html)) => html.clone(),
            other => {
                debug!("line {line}: no HTML in column '{column}' ({other:?}), skipping");
                self.summary.skipped += 1;
                return Ok(());
            }
        };
        let passthrough: Map<String, Value> = object
            .into_iter()
            .filter(|(key, _)| key != column)
            .collect();

        self.document(html.as_bytes(), Some(&passthrough))?;
        Ok(())
    }

    fn document(
        &mut self,
        source: &[u8],
        passthrough: Option<&Map<String, Value>>,
    ) -> Result<(), InputError> {
        if is_blank(source) {
            self.summary.skipped += 1;
            return Ok(());
        }

        self.summary.documents += 1;
        let document = match self.engine.parse(source) {
            Ok(document) => document,
            Err(e) => {
                self.reporter.report(e.into());
                return Ok(());
            }
        };

        let options = self.config.output;
        let output = &mut *self.output;
        let written = RecordBuilder::new(&self.config.pipeline, options.pretty).build(
            &document,
            passthrough,
            &mut *self.reporter,
            |record: Record| {
                let mut line = record.to_line(&options);
                line.push('\n');
                output.write_all(line.as_bytes())?;
                output.flush()
            },
        )?;

        self.summary.records += written;
        Ok(())
    }
}

fn strip_cr(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn is_blank(source: &[u8]) -> bool {
    source.iter().all(u8::is_ascii_whitespace)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{diagnostics::Diagnostic, html::HtmlEngine, output::OutputOptions};

    fn extract(framing: Framing, query: &[&str], input: &str) -> (String, Vec<Diagnostic>, Result<Summary, InputError>) {
        let engine = HtmlEngine;
        let config = Config::new(&engine, query, framing, OutputOptions::default());
        let mut output = Vec::new();
        let mut reports: Vec<Diagnostic> = Vec::new();
        let result = run(&engine, &config, input.as_bytes(), &mut output, &mut reports);
        (String::from_utf8(output).unwrap(), reports, result)
    }

    #[test]
    fn test_blob_is_one_document() {
        let (out, _, result) = extract(Framing::Blob, &["//li/text()"], "<li>a</li>\n<li>b</li>\n");
        assert_eq!(out, "a\nb\n");
        assert_eq!(result.unwrap().documents, 1);
    }

    #[test]
    fn test_empty_blob_yields_nothing() {
        let (out, reports, result) = extract(Framing::Blob, &[], "");
        assert_eq!(out, "");
        assert!(reports.is_empty());
        assert_eq!(result.unwrap().documents, 0);
    }

    #[test]
    fn test_per_line_documents() {
        let (out, reports, result) = extract(
            Framing::PerLine,
            &["count(//li)"],
            "<li>a</li><li>b</li>\r\n\n   \n<li>c</li>",
        );
        assert_eq!(out, "2\n1\n");
        assert!(reports.is_empty());
        let summary = result.unwrap();
        assert_eq!(summary.documents, 2);
        assert_eq!(summary.skipped, 2);
    }

    #[test]
    fn test_per_line_parse_failure_is_isolated() {
        let engine = HtmlEngine;
        let config = Config::new(&engine, &["//p/text()"], Framing::PerLine, OutputOptions::default());
        let mut input = b"<p>one</p>\n<p>\xff</p>\n<p>two</p>\n".to_vec();
        input.push(b'\n');
        let mut output = Vec::new();
        let mut reports: Vec<Diagnostic> = Vec::new();

        let summary = run(&engine, &config, input.as_slice(), &mut output, &mut reports).unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "one\ntwo\n");
        assert_eq!(reports.len(), 1);
        assert!(matches!(reports[0], Diagnostic::Parse(_)));
        assert_eq!(summary.records, 2);
    }

    #[test]
    fn test_json_lines_passthrough() {
        let (out, _, result) = extract(
            Framing::JsonLines { column: "html".into() },
            &["text::", "//p/text()"],
            "{\"html\": \"<p>hi</p>\", \"id\": 7}\n",
        );
        assert_eq!(out, "{\"text\":[\"hi\"],\"_\":{\"id\":7}}\n");
        assert_eq!(result.unwrap().records, 1);
    }

    #[test]
    fn test_json_lines_keep_key_order() {
        let (out, _, _) = extract(
            Framing::JsonLines { column: "body".into() },
            &["t:", "//b/text()"],
            r#"{"z": 1, "body": "<b>x</b>", "a": 2}"#,
        );
        assert_eq!(out, "{\"t\":\"x\",\"_\":{\"z\":1,\"a\":2}}\n");
    }

    #[test]
    fn test_json_lines_without_html_are_skipped() {
        let (out, reports, result) = extract(
            Framing::JsonLines { column: "html".into() },
            &["t:", "//p"],
            "{\"id\": 1}\n{\"html\": \"\"}\n{\"html\": null}\n\n",
        );
        assert_eq!(out, "");
        assert!(reports.is_empty());
        assert_eq!(result.unwrap().skipped, 4);
    }

    #[test]
    fn test_malformed_json_is_fatal() {
        let (out, _, result) = extract(
            Framing::JsonLines { column: "html".into() },
            &["t:", "//p/text()"],
            "{\"html\": \"<p>a</p>\"}\n{not json}\n{\"html\": \"<p>b</p>\"}\n",
        );
        assert_eq!(out, "{\"t\":\"a\"}\n");
        assert!(matches!(result, Err(InputError::MalformedJson { line: 2, .. })));
    }

    #[test]
    fn test_non_object_json_is_fatal() {
        let (_, _, result) = extract(
            Framing::JsonLines { column: "html".into() },
            &["t:", "//p"],
            "[1, 2]\n",
        );
        assert!(matches!(
            result,
            Err(InputError::NotAnObject { line: 1, found: "array" })
        ));
    }
}
