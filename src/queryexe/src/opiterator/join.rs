use super::{FetchNext, OpIterator, OpLifecycle};
use common::{CrustyError, SimplePredicateOp, TableSchema, Tuple};

/// Compares the fields of two tuples using a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinPredicate {
    /// Operation to compare the fields with.
    op: SimplePredicateOp,
    /// Index of the field of the left table (tuple).
    left_index: usize,
    /// Index of the field of the right table (tuple).
    right_index: usize,
}

impl JoinPredicate {
    /// Constructor that determines if two tuples satisfy the join condition.
    ///
    /// # Arguments
    ///
    /// * `op` - Operation to compare the two fields with.
    /// * `left_index` - Index of the field to compare in the left tuple.
    /// * `right_index` - Index of the field to compare in the right tuple.
    pub fn new(op: SimplePredicateOp, left_index: usize, right_index: usize) -> Self {
        Self {
            op,
            left_index,
            right_index,
        }
    }

    pub fn op(&self) -> SimplePredicateOp {
        self.op
    }

    pub fn left_index(&self) -> usize {
        self.left_index
    }

    pub fn right_index(&self) -> usize {
        self.right_index
    }

    /// Applies the predicate to a pair of tuples. A missing field never matches.
    pub fn filter(&self, left_tuple: &Tuple, right_tuple: &Tuple) -> bool {
        match (
            left_tuple.get_field(self.left_index),
            right_tuple.get_field(self.right_index),
        ) {
            (Some(left_field), Some(right_field)) => self.op.compare(left_field, right_field),
            _ => false,
        }
    }
}

/// Position of the join in its outer relation.
#[derive(Debug)]
enum LeftCursor {
    /// Left tuple currently probed against the right relation.
    Current(Tuple),
    /// The left relation has no more tuples.
    Exhausted,
}

/// Nested loop join implementation.
pub struct Join {
    /// Join condition.
    predicate: JoinPredicate,
    /// Left child node.
    left_child: Box<dyn OpIterator>,
    /// Right child node.
    right_child: Box<dyn OpIterator>,
    /// Schema of the result.
    schema: TableSchema,
    cursor: LeftCursor,
    /// Set by `rewind` until the left child is rewound and the cursor refilled.
    rewind_left: bool,
    /// Set once the left cursor has advanced and the right child still needs a rewind.
    rewind_right: bool,
    lifecycle: OpLifecycle,
}

impl Join {
    /// Join constructor. Creates a new node for a nested-loop join.
    ///
    /// # Arguments
    ///
    /// * `op` - Operation in join condition.
    /// * `left_index` - Index of the left field in join condition.
    /// * `right_index` - Index of the right field in join condition.
    /// * `left_child` - Left (outer) child of join operator.
    /// * `right_child` - Right (inner) child of join operator.
    pub fn new(
        op: SimplePredicateOp,
        left_index: usize,
        right_index: usize,
        left_child: Box<dyn OpIterator>,
        right_child: Box<dyn OpIterator>,
    ) -> Result<Self, CrustyError> {
        Self::with_predicate(
            JoinPredicate::new(op, left_index, right_index),
            left_child,
            right_child,
        )
    }

    /// Creates a join from an existing predicate.
    ///
    /// # Errors
    ///
    /// `ValidationError` if a predicate index is outside its child's schema.
    pub fn with_predicate(
        predicate: JoinPredicate,
        left_child: Box<dyn OpIterator>,
        right_child: Box<dyn OpIterator>,
    ) -> Result<Self, CrustyError> {
        let left_schema = left_child.get_schema();
        let right_schema = right_child.get_schema();
        if predicate.left_index >= left_schema.size() {
            return Err(CrustyError::ValidationError(format!(
                "join field {} out of range for left schema of width {}",
                predicate.left_index,
                left_schema.size()
            )));
        }
        if predicate.right_index >= right_schema.size() {
            return Err(CrustyError::ValidationError(format!(
                "join field {} out of range for right schema of width {}",
                predicate.right_index,
                right_schema.size()
            )));
        }
        let schema = left_schema.merge(right_schema);
        Ok(Self {
            predicate,
            left_child,
            right_child,
            schema,
            cursor: LeftCursor::Exhausted,
            rewind_left: false,
            rewind_right: false,
            lifecycle: OpLifecycle::new("Join"),
        })
    }

    pub fn join_predicate(&self) -> &JoinPredicate {
        &self.predicate
    }

    /// Name of the left join field, as stored in the left child's schema.
    pub fn left_join_field_name(&self) -> Option<&str> {
        self.left_child
            .get_schema()
            .get_attribute(self.predicate.left_index)
            .map(|attr| attr.name())
    }

    /// Name of the right join field, as stored in the right child's schema.
    pub fn right_join_field_name(&self) -> Option<&str> {
        self.right_child
            .get_schema()
            .get_attribute(self.predicate.right_index)
            .map(|attr| attr.name())
    }

    /// Pulls the first left tuple into the cursor.
    fn reset_cursor(&mut self) -> Result<(), CrustyError> {
        self.cursor = match self.left_child.next()? {
            Some(tuple) => LeftCursor::Current(tuple),
            None => LeftCursor::Exhausted,
        };
        Ok(())
    }

    /// Performs the pending child rewinds. A flag is cleared only once its step
    /// succeeded, so a failure is retried by the next call.
    fn catch_up(&mut self) -> Result<(), CrustyError> {
        if self.rewind_left {
            self.left_child.rewind()?;
            self.reset_cursor()?;
            self.rewind_left = false;
        }
        if self.rewind_right {
            self.right_child.rewind()?;
            self.rewind_right = false;
        }
        Ok(())
    }
}

impl FetchNext for Join {
    fn lifecycle(&mut self) -> &mut OpLifecycle {
        &mut self.lifecycle
    }

    /// Calculates the next tuple for a nested loop join.
    fn fetch_next(&mut self) -> Result<Option<Tuple>, CrustyError> {
        loop {
            self.catch_up()?;
            let left = match &self.cursor {
                LeftCursor::Current(tuple) => tuple,
                LeftCursor::Exhausted => return Ok(None),
            };
            while let Some(right) = self.right_child.next()? {
                if self.predicate.filter(left, &right) {
                    trace!("Join: match {} with {}", left, right);
                    return Ok(Some(left.merge(&right)));
                }
            }
            match self.left_child.next()? {
                Some(tuple) => {
                    self.cursor = LeftCursor::Current(tuple);
                    self.rewind_right = true;
                }
                None => {
                    debug!("Join: left child exhausted");
                    self.cursor = LeftCursor::Exhausted;
                    return Ok(None);
                }
            }
        }
    }
}

impl OpIterator for Join {
    fn open(&mut self) -> Result<(), CrustyError> {
        self.lifecycle.ensure_closed()?;
        self.left_child.open()?;
        self.right_child.open()?;
        self.reset_cursor()?;
        self.rewind_left = false;
        self.rewind_right = false;
        self.lifecycle.open()
    }

    fn has_next(&mut self) -> Result<bool, CrustyError> {
        OpLifecycle::has_next(self)
    }

    fn next(&mut self) -> Result<Option<Tuple>, CrustyError> {
        OpLifecycle::next(self)
    }

    /// Closes both children, even if closing the left one fails.
    fn close(&mut self) -> Result<(), CrustyError> {
        self.lifecycle.close();
        self.cursor = LeftCursor::Exhausted;
        self.rewind_left = false;
        self.rewind_right = false;
        let left = self.left_child.close();
        let right = self.right_child.close();
        left.and(right)
    }

    /// Rewinds both children. If a child fails, the join stays rewound from the
    /// caller's view and the failed step is retried by the next `has_next` or `next`.
    fn rewind(&mut self) -> Result<(), CrustyError> {
        self.lifecycle.rewind()?;
        self.rewind_left = true;
        self.rewind_right = true;
        self.catch_up()
    }

    /// return schema of the result
    fn get_schema(&self) -> &TableSchema {
        &self.schema
    }
}
