//! Run configuration, built once from the command line.

use crate::{engine::Engine, framing::Framing, output::OutputOptions, pipeline::Pipeline};

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub framing: Framing,
    pub pipeline: Pipeline,
    pub output: OutputOptions,
}

impl Config {
    /// Compiles `query` with `engine` and bundles it with the framing and
    /// output settings.
    pub fn new<E, T>(engine: &E, query: &[T], framing: Framing, output: OutputOptions) -> Self
    where
        E: Engine + ?Sized,
        T: AsRef<str>,
    {
        Config {
            framing,
            pipeline: Pipeline::compile(query, engine),
            output,
        }
    }
}
