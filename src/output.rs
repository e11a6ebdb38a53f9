//! Output records and their text rendering.
//!
//! Every record becomes exactly one line:
//!
//! - a bare value is written as-is, or as a JSON string with `--json`;
//! - an object record is compact JSON with keys in declaration order and the
//!   pass-through `_` key last.
//!
//! Markup spanning several lines (pretty-printed or from the input) stays on
//! several lines for bare values without `--json`.

use serde_json::{Map, Value};

use crate::{
    engine::{Document, Item},
    error::RecordError,
};

/// Reserved key holding pass-through data in JSON-lines mode.
pub const PASSTHROUGH_KEY: &str = "_";

/// Rendering switches, fixed for the whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OutputOptions {
    /// Write bare values as JSON strings.
    pub json: bool,
    /// Pretty-print serialized markup.
    pub pretty: bool,
}

/// One unit of output.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Scalar(String),
    Object(Map<String, Value>),
}

impl Record {
    /// Renders the record as a single output line, without the newline.
    pub fn to_line(&self, options: &OutputOptions) -> String {
        match self {
            Record::Scalar(text) if options.json => Value::String(text.clone()).to_string(),
            Record::Scalar(text) => text.clone(),
            Record::Object(map) => Value::Object(map.clone()).to_string(),
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Record::Scalar(text) => Value::String(text),
            Record::Object(map) => Value::Object(map),
        }
    }
}

/// Turns a selected item into its final text: trimmed text, or the markup of
/// the node.
pub fn postprocess<D: Document + ?Sized>(
    document: &D,
    item: &Item<D::Node<'_>>,
    pretty: bool,
) -> Result<String, RecordError> {
    match item {
        Item::Text(text) => Ok(text.trim().to_string()),
        Item::Element(node) => document
            .serialize(node, pretty)
            .map_err(|e| RecordError::Serialize(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        engine::Engine,
        html::HtmlEngine,
    };

    #[test]
    fn test_scalar_lines() {
        let record = Record::Scalar("say \"hi\"".to_string());
        assert_eq!(record.to_line(&OutputOptions::default()), "say \"hi\"");
        assert_eq!(
            record.to_line(&OutputOptions { json: true, pretty: false }),
            r#""say \"hi\"""#
        );
    }

    #[test]
    fn test_object_keeps_declaration_order() {
        let mut map = Map::new();
        map.insert("zeta".into(), json!("z"));
        map.insert("alpha".into(), json!(["a"]));
        map.insert(PASSTHROUGH_KEY.into(), json!({"id": 7}));

        assert_eq!(
            Record::Object(map).to_line(&OutputOptions::default()),
            r#"{"zeta":"z","alpha":["a"],"_":{"id":7}}"#
        );
    }

    #[test]
    fn test_postprocess() {
        let document = HtmlEngine.parse(b"<p><b>x</b></p>").unwrap();
        let root = document.root();
        let bold = document.select(&root, "//b").unwrap().remove(0);

        assert_eq!(postprocess(&document, &bold, false).unwrap(), "<b>x</b>");
        assert_eq!(
            postprocess(&document, &Item::Text("  padded \n".to_string()), false).unwrap(),
            "padded"
        );
    }
}
