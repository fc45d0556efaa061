use super::{FetchNext, OpIterator, OpLifecycle};
use common::{CrustyError, TableSchema, Tuple};

/// Iterator over a Vec of tuples. Serves as an in-memory child relation and as the
/// result cursor of the aggregators.
pub struct TupleIterator {
    /// Tuples to iterate over.
    tuples: Vec<Tuple>,
    /// Schema of the output.
    schema: TableSchema,
    /// Index of the next tuple to hand out.
    index: usize,
    lifecycle: OpLifecycle,
}

impl TupleIterator {
    /// Create a new tuple iterator over a set of results.
    ///
    /// # Arguments
    ///
    /// * `tuples` - Tuples to iterate over.
    /// * `schema` - Schema of the output results.
    pub fn new(tuples: Vec<Tuple>, schema: TableSchema) -> Self {
        Self {
            index: 0,
            tuples,
            schema,
            lifecycle: OpLifecycle::new("TupleIterator"),
        }
    }

    /// Number of tuples the iterator holds.
    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }
}

impl FetchNext for TupleIterator {
    fn lifecycle(&mut self) -> &mut OpLifecycle {
        &mut self.lifecycle
    }

    fn fetch_next(&mut self) -> Result<Option<Tuple>, CrustyError> {
        let tuple = self.tuples.get(self.index).cloned();
        if tuple.is_some() {
            self.index += 1;
        }
        Ok(tuple)
    }
}

impl OpIterator for TupleIterator {
    /// Opens the iterator without returning a tuple.
    fn open(&mut self) -> Result<(), CrustyError> {
        self.lifecycle.ensure_closed()?;
        self.index = 0;
        self.lifecycle.open()
    }

    fn has_next(&mut self) -> Result<bool, CrustyError> {
        OpLifecycle::has_next(self)
    }

    /// Retrieves the next tuple in the iterator.
    fn next(&mut self) -> Result<Option<Tuple>, CrustyError> {
        OpLifecycle::next(self)
    }

    /// Closes the tuple iterator.
    fn close(&mut self) -> Result<(), CrustyError> {
        self.lifecycle.close();
        self.index = 0;
        Ok(())
    }

    /// Make iterator point to the first tuple again.
    fn rewind(&mut self) -> Result<(), CrustyError> {
        self.lifecycle.rewind()?;
        self.index = 0;
        Ok(())
    }

    /// Returns the schema of the tuples.
    fn get_schema(&self) -> &TableSchema {
        &self.schema
    }
}
