pub mod cli;
pub mod config;
pub mod css;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod framing;
pub mod html;
pub mod output;
pub mod pipeline;
pub mod record;
pub mod selector;

pub use config::Config;
pub use css::css_to_xpath;
pub use diagnostics::{Diagnostic, Report, StderrReporter};
pub use engine::{Document, Engine, Item};
pub use error::{CssError, InputError, ParseError, RecordError, SelectorError};
pub use evaluator::Evaluator;
pub use framing::{Framing, Summary, run};
pub use html::{HtmlDocument, HtmlEngine};
pub use output::{OutputOptions, Record};
pub use pipeline::{Field, Pipeline, Stage, split_pipeline};
pub use record::RecordBuilder;
pub use selector::Selector;
