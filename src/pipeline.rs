//! Query pipelines.
//!
//! A pipeline is written as a flat list of tokens on the command line:
//!
//! ```text
//! htqq 'div.product'  name: h2/text()  price: '.price'  tags:: '.tag'
//! ```
//!
//! Tokens up to the first stage marker form the initial stage, applied to the
//! whole document. A token ending in `:` opens a named stage (`name:` keeps one
//! value, `name::` keeps a list); the following tokens are its selectors. Every
//! stage applies its selectors one after another, each to the previous one's
//! output.

use crate::{engine::Engine, selector::Selector};

/// Initial pipeline used when no query tokens are given: the document's
/// top-level element.
pub const DEFAULT_QUERY: &str = "/*";

/// One segment of a pipeline as written by the user.
#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    /// `None` for the initial stage.
    pub name: Option<String>,
    /// `true` for `name::` stages.
    pub multi: bool,
    pub selectors: Vec<String>,
}

impl Stage {
    fn initial() -> Self {
        Stage {
            name: None,
            multi: false,
            selectors: Vec::new(),
        }
    }

    fn named(marker: &str) -> Self {
        let name = &marker[..marker.len() - 1];
        match name.strip_suffix(':') {
            Some(list_name) => Stage {
                name: Some(list_name.to_string()),
                multi: true,
                selectors: Vec::new(),
            },
            None => Stage {
                name: Some(name.to_string()),
                multi: false,
                selectors: Vec::new(),
            },
        }
    }
}

/// Splits query tokens into stages.
///
/// The first stage is always the unnamed initial stage, even when the very
/// first token is a stage marker.
pub fn split_pipeline<I, T>(tokens: I) -> Vec<Stage>
where
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    let mut stages = Vec::new();
    let mut current = Stage::initial();

    for token in tokens {
        let token = token.as_ref();
        if token.ends_with(':') {
            stages.push(std::mem::replace(&mut current, Stage::named(token)));
        } else {
            current.selectors.push(token.to_string());
        }
    }

    stages.push(current);
    stages
}

/// A named sub-extraction producing one field of an object record.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub multi: bool,
    pub selectors: Vec<Selector>,
}

/// A compiled pipeline, built once and shared by every document.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    /// Selectors of the initial stage, applied in sequence from the document.
    pub initial: Vec<Selector>,
    /// Named stages, in declaration order.
    pub fields: Vec<Field>,
}

impl Pipeline {
    /// Splits and compiles query tokens. No tokens at all means
    /// [`DEFAULT_QUERY`].
    pub fn compile<E, T>(tokens: &[T], engine: &E) -> Self
    where
        E: Engine + ?Sized,
        T: AsRef<str>,
    {
        if tokens.is_empty() {
            return Pipeline {
                initial: vec![Selector::from_xpath([DEFAULT_QUERY])],
                fields: Vec::new(),
            };
        }

        let mut stages = split_pipeline(tokens).into_iter();
        let compile_all = |selectors: Vec<String>| -> Vec<Selector> {
            selectors
                .iter()
                .map(|raw| Selector::compile(raw, engine))
                .collect()
        };

        let initial = stages
            .next()
            .map(|stage| compile_all(stage.selectors))
            .unwrap_or_default();
        let fields = stages
            .map(|stage| Field {
                name: stage.name.unwrap_or_default(),
                multi: stage.multi,
                selectors: compile_all(stage.selectors),
            })
            .collect();

        Pipeline { initial, fields }
    }

    /// `true` when records are bare values rather than objects.
    pub fn is_scalar(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(name: Option<&str>, multi: bool, selectors: &[&str]) -> Stage {
        Stage {
            name: name.map(str::to_string),
            multi,
            selectors: selectors.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_initial_only() {
        assert_eq!(
            split_pipeline(["//div", "p"]),
            vec![stage(None, false, &["//div", "p"])]
        );
    }

    #[test]
    fn test_named_stages() {
        assert_eq!(
            split_pipeline(["//li", "text:", "text()", "links::", "a", "@href"]),
            vec![
                stage(None, false, &["//li"]),
                stage(Some("text"), false, &["text()"]),
                stage(Some("links"), true, &["a", "@href"]),
            ]
        );
    }

    #[test]
    fn test_leading_marker_keeps_empty_initial_stage() {
        assert_eq!(
            split_pipeline(["title:", "//title/text()"]),
            vec![
                stage(None, false, &[]),
                stage(Some("title"), false, &["//title/text()"]),
            ]
        );
    }

    #[test]
    fn test_marker_edge_cases() {
        let stages = split_pipeline([":", "::", "a:::"]);
        assert_eq!(stages[1], stage(Some(""), false, &[]));
        assert_eq!(stages[2], stage(Some(""), true, &[]));
        assert_eq!(stages[3], stage(Some("a:"), true, &[]));
    }

    #[test]
    fn test_empty_tokens() {
        assert_eq!(
            split_pipeline(Vec::<String>::new()),
            vec![stage(None, false, &[])]
        );
    }
}
