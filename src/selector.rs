//! Selector preprocessing: raw query tokens to canonical XPath strings.

use log::debug;

use crate::engine::Engine;

/// A query token compiled into the selectors the backend will evaluate.
///
/// A token may hold several `|`-separated alternatives. Each one is either
/// XPath already (`//...`, `@...`), CSS that translates to XPath, or something
/// that is passed through untouched and left for the backend to judge.
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    source: String,
    alternatives: Vec<String>,
}

impl Selector {
    pub fn compile<E: Engine + ?Sized>(source: &str, engine: &E) -> Self {
        let alternatives = split_alternatives(source)
            .into_iter()
            .map(|candidate| canonicalize(candidate, engine))
            .collect();

        Selector {
            source: source.to_string(),
            alternatives,
        }
    }

    /// Builds a selector from already canonical XPath alternatives.
    pub fn from_xpath<I, S>(alternatives: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let alternatives: Vec<String> = alternatives.into_iter().map(Into::into).collect();
        Selector {
            source: alternatives.join(" | "),
            alternatives,
        }
    }

    /// The token as the user wrote it.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn alternatives(&self) -> &[String] {
        &self.alternatives
    }
}

fn canonicalize<E: Engine + ?Sized>(candidate: &str, engine: &E) -> String {
    if candidate.starts_with("//") || candidate.starts_with('@') {
        return candidate.to_string();
    }

    match engine.css_to_xpath(candidate) {
        Ok(xpath) => {
            debug!("css '{candidate}' -> xpath '{xpath}'");
            xpath
        }
        Err(e) => {
            debug!("'{candidate}' is not CSS ({e}), using it as xpath");
            candidate.to_string()
        }
    }
}

/// Splits on `|` outside quotes, brackets and parentheses, trimming each part
/// and dropping empty ones.
fn split_alternatives(source: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (index, ch) in source.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '[' | '(') => depth += 1,
            (None, ']' | ')') => depth = depth.saturating_sub(1),
            (None, '|') if depth == 0 => {
                parts.push(&source[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    parts.push(&source[start..]);

    parts
        .into_iter()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect()
}
