//! The boundary between the pipeline and the HTML/XPath backend.
//!
//! The pipeline never looks inside a document. It asks an [`Engine`] to parse
//! input and translate CSS, and asks the resulting [`Document`] to run selectors
//! and serialize nodes. [`HtmlEngine`](crate::html::HtmlEngine) is the backend
//! the binary uses; tests may plug in anything else.

use std::fmt;

use crate::error::{CssError, ParseError, SelectorError};

/// A value flowing between pipeline stages.
///
/// Selectors either produce markup nodes (elements, comments, the document
/// root) or plain strings (text nodes, attribute values, XPath string and
/// number results).
#[derive(Debug, Clone, PartialEq)]
pub enum Item<N> {
    Text(String),
    Element(N),
}

impl<N> Item<N> {
    pub fn is_text(&self) -> bool {
        matches!(self, Item::Text(_))
    }
}

/// Parsing and CSS translation capability.
pub trait Engine {
    type Document: Document;

    /// Parses one input unit.
    fn parse(&self, source: &[u8]) -> Result<Self::Document, ParseError>;

    /// Translates a CSS selector into the backend's selector language.
    fn css_to_xpath(&self, css: &str) -> Result<String, CssError>;
}

/// A parsed document that can evaluate selectors against its own nodes.
pub trait Document {
    /// Node handle borrowed from the document.
    type Node<'a>: Clone + fmt::Debug
    where
        Self: 'a;

    /// The document node itself, the starting point of every pipeline.
    fn root(&self) -> Self::Node<'_>;

    /// Evaluates `selector` with `context` as the context node.
    ///
    /// An element context is a document of its own: absolute paths such as
    /// `//p` only see its subtree. Text results are returned as produced;
    /// trimming is the caller's job.
    fn select<'a>(
        &'a self,
        context: &Self::Node<'a>,
        selector: &str,
    ) -> Result<Vec<Item<Self::Node<'a>>>, SelectorError>;

    /// Parses `text` as a markup fragment and evaluates `selector` inside it.
    /// Selected nodes come back serialized.
    fn select_text(&self, text: &str, selector: &str) -> Result<Vec<String>, SelectorError>;

    /// Serializes a node as standalone markup, without trailing sibling text.
    fn serialize(&self, node: &Self::Node<'_>, pretty: bool) -> Result<String, fmt::Error>;
}
