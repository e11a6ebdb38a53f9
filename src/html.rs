//! HTML backend: `scraper` parses, `sxd-xpath` selects.
//!
//! The html5ever tree produced by `scraper` is copied into an `sxd-document`
//! package so XPath 1.0 can run over it. Elements are created without a
//! namespace, which keeps plain name tests like `//p` working on HTML input.

use std::{
    cell::RefCell,
    collections::HashMap,
    fmt::{self, Write as _},
};

use log::debug;
use scraper::{ElementRef, Html, Node as HtmlNode};
use sxd_document::{Package, dom};
use sxd_xpath::{Context, Factory, Value, XPath, nodeset::Node};

use crate::{
    css,
    engine::{Document, Engine, Item},
    error::{CssError, ParseError, SelectorError},
};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// The default engine: lenient HTML5 parsing, XPath 1.0 selection.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlEngine;

impl HtmlEngine {
    pub fn new() -> Self {
        HtmlEngine
    }
}

impl Engine for HtmlEngine {
    type Document = HtmlDocument;

    fn parse(&self, source: &[u8]) -> Result<HtmlDocument, ParseError> {
        let text = std::str::from_utf8(source)
            .map_err(|e| ParseError::new(format!("invalid UTF-8: {e}")))?;
        if text.trim().is_empty() {
            return Err(ParseError::new("Document is empty"));
        }

        let html = Html::parse_document(text);
        if !html.errors.is_empty() {
            debug!("recovered from {} HTML parse errors", html.errors.len());
        }
        Ok(HtmlDocument::from_html(&html))
    }

    fn css_to_xpath(&self, selector: &str) -> Result<String, CssError> {
        css::css_to_xpath(selector)
    }
}

/// A parsed HTML document backed by an `sxd-document` package.
pub struct HtmlDocument {
    package: Package,
    compiled: RefCell<HashMap<String, Result<XPath, String>>>,
}

impl HtmlDocument {
    fn from_html(html: &Html) -> Self {
        let package = Package::new();
        {
            let document = package.as_document();
            let root = document.root();
            for child in html.tree.root().children() {
                match child.value() {
                    HtmlNode::Element(_) => {
                        if let Some(element) = ElementRef::wrap(child) {
                            root.append_child(copy_element(&document, element));
                        }
                    }
                    HtmlNode::Comment(comment) => {
                        root.append_child(document.create_comment(&comment.comment));
                    }
                    _ => {}
                }
            }
        }
        HtmlDocument {
            package,
            compiled: RefCell::new(HashMap::new()),
        }
    }
}

fn copy_element<'d>(document: &dom::Document<'d>, source: ElementRef<'_>) -> dom::Element<'d> {
    let element = document.create_element(source.value().name());
    for (name, value) in source.value().attrs() {
        element.set_attribute_value(name, value);
    }

    for child in source.children() {
        match child.value() {
            HtmlNode::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    element.append_child(copy_element(document, child_element));
                }
            }
            HtmlNode::Text(text) => {
                element.append_child(document.create_text(&text.text));
            }
            HtmlNode::Comment(comment) => {
                element.append_child(document.create_comment(&comment.comment));
            }
            _ => {}
        }
    }
    element
}

impl Document for HtmlDocument {
    type Node<'a>
        = Node<'a>
    where
        Self: 'a;

    fn root(&self) -> Node<'_> {
        Node::Root(self.package.as_document().root())
    }

    fn select<'a>(
        &'a self,
        context: &Node<'a>,
        selector: &str,
    ) -> Result<Vec<Item<Node<'a>>>, SelectorError> {
        match *context {
            Node::Element(element) => self.select_within(element, selector),
            other => {
                let value = self.evaluate(selector, other)?;
                Ok(into_items(value, Some))
            }
        }
    }

    fn select_text(&self, text: &str, selector: &str) -> Result<Vec<String>, SelectorError> {
        let fragment = Html::parse_fragment(text);
        let container = fragment.root_element();
        let top = sole_element(container).unwrap_or(container);

        let package = Package::new();
        let scope = package.as_document();
        let context = copy_element(&scope, top);
        scope.root().append_child(context);

        let value = self.evaluate(selector, Node::Element(context))?;
        let selected = into_items(value, Some)
            .into_iter()
            .map(|item| match item {
                Item::Text(text) => Ok(text),
                Item::Element(node) => write_markup(node, false)
                    .map_err(|e| SelectorError::new(selector, e.to_string())),
            })
            .collect();
        selected
    }

    fn serialize(&self, node: &Node<'_>, pretty: bool) -> Result<String, fmt::Error> {
        write_markup(*node, pretty)
    }
}

impl HtmlDocument {
    /// Runs `selector` over a copy of `element`'s subtree in which `element` is
    /// the document element, so `//` and `/` stay inside it. Selected nodes are
    /// mapped back to this document.
    fn select_within<'a>(
        &'a self,
        element: dom::Element<'a>,
        selector: &str,
    ) -> Result<Vec<Item<Node<'a>>>, SelectorError> {
        let package = Package::new();
        let scope = package.as_document();
        let mut origins = HashMap::new();

        let context = copy_subtree(&scope, element, &mut origins);
        scope.root().append_child(context);
        origins.insert(Node::Root(scope.root()), Node::Element(element));

        let value = self.evaluate(selector, Node::Element(context))?;
        Ok(into_items(value, |node| origins.get(&node).copied()))
    }

    /// Evaluates `selector` with `context` as the context node, compiling it
    /// at most once per document.
    fn evaluate<'n>(&self, selector: &str, context: Node<'n>) -> Result<Value<'n>, SelectorError> {
        let mut compiled = self.compiled.borrow_mut();
        let xpath = compiled
            .entry(selector.to_string())
            .or_insert_with(|| compile(selector))
            .as_ref()
            .map_err(|message| SelectorError::new(selector, message.clone()))?;

        xpath
            .evaluate(&Context::new(), context)
            .map_err(|e| SelectorError::new(selector, e.to_string()))
    }
}

fn compile(selector: &str) -> Result<XPath, String> {
    Factory::new()
        .build(selector)
        .map_err(|e| e.to_string())?
        .ok_or_else(|| "empty expression".to_string())
}

/// The single element of a fragment, when it has no other content.
fn sole_element(container: ElementRef<'_>) -> Option<ElementRef<'_>> {
    let mut elements = container.children().filter_map(ElementRef::wrap);
    let element = elements.next()?;
    let only_markup = elements.next().is_none()
        && container.children().all(|child| match child.value() {
            HtmlNode::Text(text) => text.trim().is_empty(),
            _ => true,
        });
    only_markup.then_some(element)
}

fn copy_subtree<'s, 'a>(
    scope: &dom::Document<'s>,
    source: dom::Element<'a>,
    origins: &mut HashMap<Node<'s>, Node<'a>>,
) -> dom::Element<'s> {
    let element = scope.create_element(source.name());
    for attribute in source.attributes() {
        element.set_attribute_value(attribute.name(), attribute.value());
    }
    origins.insert(Node::Element(element), Node::Element(source));

    for child in source.children() {
        match child {
            dom::ChildOfElement::Element(child_element) => {
                element.append_child(copy_subtree(scope, child_element, origins));
            }
            dom::ChildOfElement::Text(text) => {
                element.append_child(scope.create_text(text.text()));
            }
            dom::ChildOfElement::Comment(comment) => {
                let copy = scope.create_comment(comment.text());
                origins.insert(Node::Comment(copy), Node::Comment(comment));
                element.append_child(copy);
            }
            dom::ChildOfElement::ProcessingInstruction(pi) => {
                let copy = scope.create_processing_instruction(pi.target(), pi.value());
                origins.insert(
                    Node::ProcessingInstruction(copy),
                    Node::ProcessingInstruction(pi),
                );
                element.append_child(copy);
            }
        }
    }
    element
}

/// Attribute values and text nodes are plain strings; other nodes go through
/// `origin`, which drops the ones it cannot place.
fn into_items<'s, 'a>(
    value: Value<'s>,
    origin: impl Fn(Node<'s>) -> Option<Node<'a>>,
) -> Vec<Item<Node<'a>>> {
    match value {
        Value::Nodeset(nodes) => nodes
            .document_order()
            .into_iter()
            .filter_map(|node| match node {
                Node::Attribute(_) | Node::Text(_) | Node::Namespace(_) => {
                    Some(Item::Text(node.string_value()))
                }
                other => origin(other).map(Item::Element),
            })
            .collect(),
        Value::String(text) => vec![Item::Text(text)],
        Value::Number(number) => vec![Item::Text(format_number(number))],
        Value::Boolean(flag) => vec![Item::Text(flag.to_string())],
    }
}

/// XPath number to string, `string()` style: integral values have no fraction.
fn format_number(number: f64) -> String {
    if number.is_nan() {
        "NaN".to_string()
    } else if number.is_infinite() {
        let infinity = if number > 0.0 { "Infinity" } else { "-Infinity" };
        infinity.to_string()
    } else if number.fract() == 0.0 && number.abs() < 1e15 {
        format!("{}", number as i64)
    } else {
        number.to_string()
    }
}

fn write_markup(node: Node<'_>, pretty: bool) -> Result<String, fmt::Error> {
    let mut out = String::new();
    MarkupWriter {
        out: &mut out,
        pretty,
    }
    .write_node(node)?;
    Ok(out)
}

struct MarkupWriter<'w> {
    out: &'w mut String,
    pretty: bool,
}

impl MarkupWriter<'_> {
    fn write_node(&mut self, node: Node<'_>) -> fmt::Result {
        match node {
            Node::Root(root) => {
                for (index, child) in root.children().into_iter().enumerate() {
                    if self.pretty && index > 0 {
                        self.out.push('\n');
                    }
                    match child {
                        dom::ChildOfRoot::Element(element) => self.write_element(element, 0)?,
                        dom::ChildOfRoot::Comment(comment) => self.write_comment(comment)?,
                        dom::ChildOfRoot::ProcessingInstruction(pi) => {
                            self.write_processing_instruction(pi)?
                        }
                    }
                }
                Ok(())
            }
            Node::Element(element) => self.write_element(element, 0),
            Node::Comment(comment) => self.write_comment(comment),
            Node::ProcessingInstruction(pi) => self.write_processing_instruction(pi),
            other => {
                self.out.push_str(&escape_text(&other.string_value()));
                Ok(())
            }
        }
    }

    fn write_element(&mut self, element: dom::Element<'_>, depth: usize) -> fmt::Result {
        let name = element.name().local_part();
        write!(self.out, "<{name}")?;
        for attribute in element.attributes() {
            write!(
                self.out,
                " {}=\"{}\"",
                attribute.name().local_part(),
                escape_attribute(attribute.value())
            )?;
        }
        self.out.push('>');

        let children = element.children();
        if children.is_empty() && VOID_ELEMENTS.contains(&name) {
            return Ok(());
        }

        let raw_text = RAW_TEXT_ELEMENTS.contains(&name);
        let block = self.pretty && is_block_content(&children);

        for child in children {
            match child {
                dom::ChildOfElement::Element(child_element) => {
                    self.break_line(block, depth + 1);
                    self.write_element(child_element, depth + 1)?;
                }
                dom::ChildOfElement::Text(text) => {
                    if block {
                        continue;
                    }
                    if raw_text {
                        self.out.push_str(text.text());
                    } else {
                        self.out.push_str(&escape_text(text.text()));
                    }
                }
                dom::ChildOfElement::Comment(comment) => {
                    self.break_line(block, depth + 1);
                    self.write_comment(comment)?;
                }
                dom::ChildOfElement::ProcessingInstruction(pi) => {
                    self.break_line(block, depth + 1);
                    self.write_processing_instruction(pi)?;
                }
            }
        }

        self.break_line(block, depth);
        write!(self.out, "</{name}>")
    }

    fn write_comment(&mut self, comment: dom::Comment<'_>) -> fmt::Result {
        write!(self.out, "<!--{}-->", comment.text())
    }

    fn write_processing_instruction(&mut self, pi: dom::ProcessingInstruction<'_>) -> fmt::Result {
        match pi.value() {
            Some(value) => write!(self.out, "<?{} {}?>", pi.target(), value),
            None => write!(self.out, "<?{}?>", pi.target()),
        }
    }

    fn break_line(&mut self, block: bool, depth: usize) {
        if block {
            self.out.push('\n');
            self.out.push_str(&"  ".repeat(depth));
        }
    }
}

/// Pretty printing only re-indents elements whose text children are all
/// whitespace; anything else would change the text content.
fn is_block_content(children: &[dom::ChildOfElement<'_>]) -> bool {
    let mut has_markup = false;
    for child in children {
        match child {
            dom::ChildOfElement::Text(text) if !text.text().trim().is_empty() => return false,
            dom::ChildOfElement::Text(_) => {}
            _ => has_markup = true,
        }
    }
    has_markup
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(html: &str) -> HtmlDocument {
        HtmlEngine.parse(html.as_bytes()).unwrap()
    }

    fn select_texts(document: &HtmlDocument, selector: &str) -> Vec<String> {
        let root = document.root();
        document
            .select(&root, selector)
            .unwrap()
            .into_iter()
            .map(|item| match item {
                Item::Text(text) => text,
                Item::Element(node) => document.serialize(&node, false).unwrap(),
            })
            .collect()
    }

    #[test]
    fn test_select_elements() {
        let document = parse("<ul><li>a</li><li>b</li></ul>");
        assert_eq!(select_texts(&document, "//li"), vec!["<li>a</li>", "<li>b</li>"]);
    }

    #[test]
    fn test_text_and_attribute_results_are_strings() {
        let document = parse(r#"<a href="/x">link</a><a href="/y">other</a>"#);
        let root = document.root();
        let items = document.select(&root, "//a/@href").unwrap();
        assert_eq!(items, vec![Item::Text("/x".into()), Item::Text("/y".into())]);

        let items = document.select(&root, "//a/text()").unwrap();
        assert!(items.iter().all(Item::is_text));
    }

    #[test]
    fn test_scalar_results() {
        let document = parse("<ul><li>a</li><li>b</li></ul>");
        assert_eq!(select_texts(&document, "count(//li)"), vec!["2"]);
        assert_eq!(select_texts(&document, "count(//li) div 4"), vec!["0.5"]);
        assert_eq!(select_texts(&document, "boolean(//ul)"), vec!["true"]);
        assert_eq!(select_texts(&document, "string(//li)"), vec!["a"]);
    }

    #[test]
    fn test_invalid_selector() {
        let document = parse("<p>x</p>");
        let root = document.root();
        let err = document.select(&root, "//p[").unwrap_err();
        assert_eq!(err.selector, "//p[");
    }

    #[test]
    fn test_relative_selection() {
        let document = parse("<div><p>one</p></div><div><p>two</p></div>");
        let root = document.root();
        let divs = document.select(&root, "//div").unwrap();
        let Item::Element(second) = &divs[1] else {
            panic!("expected element");
        };
        assert_eq!(
            document.select(second, "p/text()").unwrap(),
            vec![Item::Text("two".into())]
        );
    }

    #[test]
    fn test_element_context_scopes_absolute_paths() {
        let document = parse("<div><h2>A</h2></div><div><h2>B</h2></div>");
        let root = document.root();
        let divs = document.select(&root, "//div").unwrap();
        let Item::Element(second) = &divs[1] else {
            panic!("expected element");
        };

        assert_eq!(
            document.select(second, "//h2/text()").unwrap(),
            vec![Item::Text("B".into())]
        );
        assert_eq!(
            document.select(second, "count(//h2)").unwrap(),
            vec![Item::Text("1".into())]
        );
        assert_eq!(document.select(second, "/").unwrap(), vec![divs[1].clone()]);
    }

    #[test]
    fn test_scoped_results_are_document_nodes() {
        let document = parse("<div><p>one</p></div><div><p>two</p></div>");
        let root = document.root();
        let all = document.select(&root, "//p").unwrap();
        let divs = document.select(&root, "//div").unwrap();
        let Item::Element(first) = &divs[0] else {
            panic!("expected element");
        };

        assert_eq!(document.select(first, "//p").unwrap(), vec![all[0].clone()]);
    }

    #[test]
    fn test_select_text() {
        let document = parse("<p>x</p>");
        assert_eq!(
            document.select_text("<ul><li>a</li><li>b</li></ul>", "li/text()").unwrap(),
            vec!["a", "b"]
        );
        assert_eq!(
            document.select_text("<b>x</b> and <i>y</i>", "//i").unwrap(),
            vec!["<i>y</i>"]
        );
        assert!(document.select_text("plain", "//a").unwrap().is_empty());
        assert!(document.select_text("<a>x</a>", "//a[").is_err());
    }

    #[test]
    fn test_invalid_selector_stays_invalid() {
        let document = parse("<p>x</p>");
        let root = document.root();
        assert!(document.select(&root, "//p[").is_err());
        assert!(document.select(&root, "//p[").is_err());
        assert_eq!(document.compiled.borrow().len(), 1);
    }

    #[test]
    fn test_serialize_void_and_escaped() {
        let document = parse(r#"<p title="a&quot;b">1 &lt; 2<br>x</p>"#);
        assert_eq!(
            select_texts(&document, "//p"),
            vec![r#"<p title="a&quot;b">1 &lt; 2<br>x</p>"#]
        );
    }

    #[test]
    fn test_serialize_excludes_tail() {
        let document = parse("<div><b>bold</b> tail</div>");
        assert_eq!(select_texts(&document, "//b"), vec!["<b>bold</b>"]);
    }

    #[test]
    fn test_serialize_pretty() {
        let document = parse("<ul><li>a</li><li>b</li></ul>");
        let root = document.root();
        let items = document.select(&root, "//ul").unwrap();
        let Item::Element(ul) = &items[0] else {
            panic!("expected element");
        };
        assert_eq!(
            document.serialize(ul, true).unwrap(),
            "<ul>\n  <li>a</li>\n  <li>b</li>\n</ul>"
        );
    }

    #[test]
    fn test_document_root_serializes_children() {
        let document = parse("<p>hi</p>");
        let root = document.root();
        assert_eq!(
            document.serialize(&root, false).unwrap(),
            "<html><head></head><body><p>hi</p></body></html>"
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            HtmlEngine.parse(b"  \n").err(),
            Some(ParseError::new("Document is empty"))
        );
        assert!(HtmlEngine.parse(&[0x3c, 0x70, 0x3e, 0xff]).is_err());
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-0.25), "-0.25");
        assert_eq!(format_number(f64::NAN), "NaN");
    }
}
