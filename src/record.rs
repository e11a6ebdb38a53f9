//! Record building: one document in, zero or more records out.

use log::debug;
use serde_json::{Map, Value};

use crate::{
    diagnostics::Report,
    engine::{Document, Item},
    error::RecordError,
    evaluator::Evaluator,
    output::{PASSTHROUGH_KEY, Record, postprocess},
    pipeline::{Field, Pipeline},
};

/// Drives a [`Pipeline`] over documents.
pub struct RecordBuilder<'p> {
    pipeline: &'p Pipeline,
    pretty: bool,
}

impl<'p> RecordBuilder<'p> {
    pub fn new(pipeline: &'p Pipeline, pretty: bool) -> Self {
        RecordBuilder { pipeline, pretty }
    }

    /// Builds one record per root node of `document` and hands each to `emit`
    /// as soon as it is ready.
    ///
    /// A record that fails to build is reported and skipped. Errors returned
    /// by `emit` stop the document and are returned as-is.
    ///
    /// Returns the number of records emitted.
    pub fn build<D, R, F, E>(
        &self,
        document: &D,
        passthrough: Option<&Map<String, Value>>,
        reporter: &mut R,
        mut emit: F,
    ) -> Result<usize, E>
    where
        D: Document + ?Sized,
        R: Report + ?Sized,
        F: FnMut(Record) -> Result<(), E>,
    {
        let mut evaluator = Evaluator::new(document, reporter);
        let roots = evaluator.chain(&self.pipeline.initial, Item::Element(document.root()));
        debug!("{} root nodes", roots.len());

        let mut emitted = 0;
        for root in roots {
            match self.build_record(&mut evaluator, root, passthrough) {
                Ok(record) => {
                    emit(record)?;
                    emitted += 1;
                }
                Err(e) => evaluator.report(e.into()),
            }
        }
        Ok(emitted)
    }

    fn build_record<'d, D, R>(
        &self,
        evaluator: &mut Evaluator<'d, '_, D, R>,
        root: Item<D::Node<'d>>,
        passthrough: Option<&Map<String, Value>>,
    ) -> Result<Record, RecordError>
    where
        D: Document + ?Sized + 'd,
        R: Report + ?Sized,
    {
        if self.pipeline.is_scalar() {
            return postprocess(evaluator.document(), &root, self.pretty).map(Record::Scalar);
        }

        let mut map = Map::new();
        for field in &self.pipeline.fields {
            let value = self.build_field(evaluator, field, root.clone())?;
            map.insert(field.name.clone(), value);
        }

        if let Some(data) = passthrough {
            if map.contains_key(PASSTHROUGH_KEY) {
                return Err(RecordError::ReservedField);
            }
            map.insert(PASSTHROUGH_KEY.to_string(), Value::Object(data.clone()));
        }

        Ok(Record::Object(map))
    }

    fn build_field<'d, D, R>(
        &self,
        evaluator: &mut Evaluator<'d, '_, D, R>,
        field: &Field,
        root: Item<D::Node<'d>>,
    ) -> Result<Value, RecordError>
    where
        D: Document + ?Sized + 'd,
        R: Report + ?Sized,
    {
        let values = evaluator
            .chain(&field.selectors, root)
            .iter()
            .map(|item| postprocess(evaluator.document(), item, self.pretty).map(Value::String))
            .collect::<Result<Vec<_>, _>>()?;

        if field.multi {
            return Ok(Value::Array(values));
        }
        // Singular fields collapse to the first match.
        Ok(values.into_iter().next().unwrap_or(Value::Null))
    }
}
