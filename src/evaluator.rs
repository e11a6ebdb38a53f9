//! Selection evaluation.
//!
//! Runs compiled selectors against document nodes, reporting selector
//! failures per input item instead of aborting.

use log::debug;

use crate::{
    diagnostics::{Diagnostic, Report},
    engine::{Document, Item},
    selector::Selector,
};

/// Evaluates selectors against one document.
pub struct Evaluator<'d, 'r, D: ?Sized, R: ?Sized> {
    document: &'d D,
    reporter: &'r mut R,
}

impl<'d, 'r, D, R> Evaluator<'d, 'r, D, R>
where
    D: Document + ?Sized + 'd,
    R: Report + ?Sized,
{
    pub fn new(document: &'d D, reporter: &'r mut R) -> Self {
        Evaluator { document, reporter }
    }

    pub fn document(&self) -> &'d D {
        self.document
    }

    /// Forwards a diagnostic raised outside selector evaluation.
    pub fn report(&mut self, diagnostic: Diagnostic) {
        self.reporter.report(diagnostic);
    }

    /// Applies one selector to every input item and flattens the results.
    ///
    /// Element inputs scope the selector to their subtree; text inputs are
    /// parsed as markup fragments first. Text results are trimmed and dropped
    /// when empty. Element results are kept as they are. A failing alternative
    /// is reported and contributes nothing for that input; the remaining
    /// inputs are still evaluated.
    pub fn apply(
        &mut self,
        selector: &Selector,
        inputs: Vec<Item<D::Node<'d>>>,
    ) -> Vec<Item<D::Node<'d>>> {
        let mut output = Vec::new();

        for input in inputs {
            for alternative in selector.alternatives() {
                let selected = match &input {
                    Item::Element(node) => self.document.select(node, alternative),
                    Item::Text(text) => {
                        debug!("'{alternative}' parses text input as a fragment");
                        self.document
                            .select_text(text, alternative)
                            .map(|found| found.into_iter().map(Item::Text).collect())
                    }
                };

                match selected {
                    Ok(items) => output.extend(items.into_iter().filter_map(normalize)),
                    Err(e) => self.reporter.report(e.into()),
                }
            }
        }

        output
    }

    /// Applies `selectors` in sequence starting from `start`: each selector
    /// runs on the output of the previous one.
    pub fn chain(
        &mut self,
        selectors: &[Selector],
        start: Item<D::Node<'d>>,
    ) -> Vec<Item<D::Node<'d>>> {
        selectors
            .iter()
            .fold(vec![start], |items, selector| self.apply(selector, items))
    }
}

fn normalize<N>(item: Item<N>) -> Option<Item<N>> {
    match item {
        Item::Text(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                None
            } else if trimmed.len() == text.len() {
                Some(Item::Text(text))
            } else {
                Some(Item::Text(trimmed.to_string()))
            }
        }
        element => Some(element),
    }
}
