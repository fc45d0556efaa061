use super::{Aggregator, FetchNext, OpIterator, OpLifecycle, TupleIterator};
use common::{AggOp, Attribute, CrustyError, DataType, TableSchema, Tuple};

/// Aggregate operator. Computes one aggregate over a child, optionally grouped by one field.
///
/// The child is read completely on `open`; `rewind` replays the built result.
pub struct Aggregate {
    /// Index of the field being aggregated.
    agg_field: usize,
    /// Declared type of the aggregated field in the child.
    agg_dtype: DataType,
    /// Index of the field to group by, None when ungrouped.
    group_field: Option<usize>,
    /// Aggregate operation to aggregate the column with.
    op: AggOp,
    /// Output schema of the form [group by attribute, aggregate attribute].
    schema: TableSchema,
    /// Child operator to get the data from.
    child: Box<dyn OpIterator>,
    /// Built on open, dropped on close.
    aggregator: Option<Aggregator>,
    /// Cursor over the aggregator's results.
    results: Option<TupleIterator>,
    lifecycle: OpLifecycle,
}

impl Aggregate {
    /// Aggregate constructor.
    ///
    /// # Arguments
    ///
    /// * `agg_field` - Index of the field to aggregate.
    /// * `group_field` - Index of the field to group by, if any.
    /// * `op` - Aggregate operation.
    /// * `child` - Child operator to get the input data from.
    ///
    /// # Errors
    ///
    /// `ValidationError` if an index is outside the child's schema or `op` cannot be
    /// computed over the aggregated field's type.
    pub fn new(
        agg_field: usize,
        group_field: Option<usize>,
        op: AggOp,
        child: Box<dyn OpIterator>,
    ) -> Result<Self, CrustyError> {
        let child_schema = child.get_schema();
        let agg_attr = child_schema.get_attribute(agg_field).ok_or_else(|| {
            CrustyError::ValidationError(format!(
                "aggregate field {} out of range for schema of width {}",
                agg_field,
                child_schema.size()
            ))
        })?;
        let agg_dtype = agg_attr.dtype().clone();
        Aggregator::check_op(&agg_dtype, op)?;

        let mut attributes = Vec::with_capacity(2);
        if let Some(g) = group_field {
            let group_attr = child_schema.get_attribute(g).ok_or_else(|| {
                CrustyError::ValidationError(format!(
                    "group field {} out of range for schema of width {}",
                    g,
                    child_schema.size()
                ))
            })?;
            attributes.push(group_attr.clone());
        }
        attributes.push(Attribute::new(
            format!("{}({})", op, agg_attr.name()),
            Self::agg_attribute_type(&agg_dtype, op),
        ));
        let schema = TableSchema::new(attributes);

        Ok(Self {
            agg_field,
            agg_dtype,
            group_field,
            op,
            schema,
            child,
            aggregator: None,
            results: None,
            lifecycle: OpLifecycle::new("Aggregate"),
        })
    }

    fn agg_attribute_type(child_dtype: &DataType, op: AggOp) -> DataType {
        match op {
            AggOp::Avg | AggOp::Count | AggOp::Sum => DataType::Int,
            AggOp::Max | AggOp::Min => child_dtype.clone(),
        }
    }

    pub fn group_field(&self) -> Option<usize> {
        self.group_field
    }

    /// Name of the group by attribute in the output schema.
    pub fn group_field_name(&self) -> Option<&str> {
        self.group_field?;
        self.schema.get_attribute(0).map(|attr| attr.name())
    }

    pub fn aggregate_field(&self) -> usize {
        self.agg_field
    }

    /// Name of the aggregate attribute in the output schema, e.g. `sum(price)`.
    pub fn aggregate_field_name(&self) -> &str {
        self.schema
            .attributes()
            .last()
            .map(|attr| attr.name())
            .unwrap_or_default()
    }

    pub fn aggregate_op(&self) -> AggOp {
        self.op
    }

    pub fn aggregate_op_name(&self) -> String {
        AggOp::name_of(self.op)
    }

    /// Pulls every child tuple into a new aggregator.
    fn build(&mut self) -> Result<Aggregator, CrustyError> {
        let mut aggregator = Aggregator::for_field(
            &self.agg_dtype,
            self.agg_field,
            self.group_field,
            self.op,
            self.schema.clone(),
        )?;
        let mut merged = 0;
        while let Some(tuple) = self.child.next()? {
            aggregator.merge_tuple_into_group(&tuple)?;
            merged += 1;
        }
        debug!(
            "Aggregate: merged {} tuples into {} groups",
            merged,
            aggregator.num_groups()
        );
        Ok(aggregator)
    }
}

impl FetchNext for Aggregate {
    fn lifecycle(&mut self) -> &mut OpLifecycle {
        &mut self.lifecycle
    }

    fn fetch_next(&mut self) -> Result<Option<Tuple>, CrustyError> {
        match self.results.as_mut() {
            Some(results) => results.next(),
            None => Ok(None),
        }
    }
}

impl OpIterator for Aggregate {
    fn open(&mut self) -> Result<(), CrustyError> {
        self.lifecycle.ensure_closed()?;
        self.child.open()?;
        let aggregator = self.build()?;
        let mut results = aggregator.iterator()?;
        results.open()?;
        self.aggregator = Some(aggregator);
        self.results = Some(results);
        self.lifecycle.open()
    }

    fn has_next(&mut self) -> Result<bool, CrustyError> {
        OpLifecycle::has_next(self)
    }

    fn next(&mut self) -> Result<Option<Tuple>, CrustyError> {
        OpLifecycle::next(self)
    }

    fn close(&mut self) -> Result<(), CrustyError> {
        self.lifecycle.close();
        if let Some(mut results) = self.results.take() {
            results.close()?;
        }
        self.aggregator = None;
        self.child.close()
    }

    /// Restarts the result cursor. The child is not read again.
    fn rewind(&mut self) -> Result<(), CrustyError> {
        self.lifecycle.ensure_open("rewind")?;
        let mut results = match &self.aggregator {
            Some(aggregator) => aggregator.iterator()?,
            None => {
                return Err(CrustyError::ProtocolError(
                    "rewind called on Aggregate without results".to_string(),
                ))
            }
        };
        results.open()?;
        self.results = Some(results);
        self.lifecycle.rewind()
    }

    fn get_schema(&self) -> &TableSchema {
        &self.schema
    }
}
