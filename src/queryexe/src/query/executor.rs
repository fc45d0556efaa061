use crate::opiterator::OpIterator;
use common::prelude::*;
use common::{QueryResult, QueryResultType, QUERY_RESULT_TYPE};

/// Manages the execution of queries: runs a configured tree of OpIterators and renders its output.
#[derive(Default)]
pub struct Executor {
    /// Executor state
    pub plan: Option<Box<dyn OpIterator>>,
}

impl Executor {
    pub fn new() -> Self {
        Self { plan: None }
    }

    pub fn configure_query(&mut self, opiterator: Box<dyn OpIterator>) {
        self.plan = Some(opiterator);
    }

    fn plan_mut(&mut self) -> Result<&mut Box<dyn OpIterator>, CrustyError> {
        self.plan
            .as_mut()
            .ok_or_else(|| CrustyError::ExecutionError("no query configured".to_string()))
    }

    /// Opens the configured plan to begin execution.
    pub fn start(&mut self) -> Result<(), CrustyError> {
        self.plan_mut()?.open()
    }

    /// Returns the next tuple or None if there is no such tuple.
    ///
    /// # Errors
    ///
    /// `ExecutionError` without a configured plan, `ProtocolError` if it was not started.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<Option<Tuple>, CrustyError> {
        self.plan_mut()?.next()
    }

    /// Closes the op iterator.
    pub fn close(&mut self) -> Result<(), CrustyError> {
        match self.plan.as_mut() {
            Some(plan) => plan.close(),
            None => Ok(()),
        }
    }

    /// Consumes the opiterator and stores the result in a QueryResult.
    pub fn execute(&mut self) -> Result<QueryResult, CrustyError> {
        self.execute_with(QUERY_RESULT_TYPE)
    }

    /// Runs the plan to completion and renders it as `result_type`.
    ///
    /// If the plan fails, it is closed and the error returned; no partial result is produced.
    pub fn execute_with(&mut self, result_type: QueryResultType) -> Result<QueryResult, CrustyError> {
        let schema = self.plan_mut()?.get_schema().clone();
        let tuples = match self.drain() {
            Ok(tuples) => tuples,
            Err(e) => {
                if let Err(close_err) = self.close() {
                    warn!("Executor: close after failed query also failed: {}", close_err);
                }
                return Err(e);
            }
        };
        self.close()?;
        debug!("Executor: query produced {} tuples", tuples.len());

        match result_type {
            QueryResultType::WIDTH(header, default_width) => {
                let width = schema
                    .attributes()
                    .map(|a| a.name().len())
                    .filter(|len| *len > 0)
                    .max()
                    .unwrap_or(default_width)
                    + 2;
                let mut res = String::new();
                if header {
                    for attr in schema.attributes() {
                        let s = format!("{:width$}", attr.name(), width = width);
                        res.push_str(&s);
                    }
                    res.push('\n');
                }
                for t in &tuples {
                    for f in t.field_vals() {
                        let s = format!("{:width$}", f.to_string(), width = width);
                        res.push_str(&s);
                    }
                    res.push('\n');
                }
                Ok(QueryResult::new(&res))
            }
            QueryResultType::CSV(header) => {
                let mut lines = Vec::with_capacity(tuples.len() + 1);
                if header {
                    let names: Vec<&str> = schema.attributes().map(|a| a.name()).collect();
                    lines.push(names.join(","));
                }
                lines.extend(tuples.iter().map(Tuple::to_csv));
                Ok(QueryResult::new(&lines.join("\n")))
            }
        }
    }

    fn drain(&mut self) -> Result<Vec<Tuple>, CrustyError> {
        self.start()?;
        let mut tuples = Vec::new();
        while let Some(t) = self.next()? {
            tuples.push(t);
        }
        Ok(tuples)
    }
}
