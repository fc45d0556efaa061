//! Helpers for operator tests: tuple counting, result comparison and a scripted child.

use crate::opiterator::{FetchNext, OpIterator, OpLifecycle};
use common::{CrustyError, DataType, Field, TableSchema, Tuple};
use std::cell::Cell;
use std::rc::Rc;

/// Returns the count of the number of tuples in an OpIterator.
///
/// This function consumes the iterator.
///
/// # Arguments
///
/// * `iter` - Iterator to count.
pub fn num_tuples(iter: &mut dyn OpIterator) -> Result<u32, CrustyError> {
    let mut counter = 0;
    while iter.next()?.is_some() {
        counter += 1;
    }
    Ok(counter)
}

/// Asserts that iter1 and iter2 contain all the same tuples, in the same order.
pub fn match_all_tuples(
    mut iter1: Box<dyn OpIterator>,
    mut iter2: Box<dyn OpIterator>,
) -> Result<(), CrustyError> {
    while let Some(t1) = iter1.next()? {
        let t2 = iter2.next()?;
        assert_eq!(Some(t1), t2);
    }
    assert!(iter2.next()?.is_none());
    Ok(())
}

/// Drains an open iterator into a Vec.
pub fn collect_tuples(iter: &mut dyn OpIterator) -> Result<Vec<Tuple>, CrustyError> {
    let mut tuples = Vec::new();
    while let Some(t) = iter.next()? {
        tuples.push(t);
    }
    Ok(tuples)
}

/// Opens, drains and closes an iterator, returning its rows as field vectors.
pub fn iter_to_vec(iter: &mut dyn OpIterator) -> Result<Vec<Vec<Field>>, CrustyError> {
    iter.open()?;
    let rows = collect_tuples(iter)?
        .into_iter()
        .map(|t| t.field_vals)
        .collect();
    iter.close()?;
    Ok(rows)
}

/// Creates a vector of tuples to create the following table:
///
/// 1 1 3 E
/// 2 1 3 G
/// 3 1 4 A
/// 4 2 4 G
/// 5 2 5 G
/// 6 2 5 G
pub fn aggregate_tuples() -> Vec<Tuple> {
    let rows = vec![
        (1, 1, 3, "E"),
        (2, 1, 3, "G"),
        (3, 1, 4, "A"),
        (4, 2, 4, "G"),
        (5, 2, 5, "G"),
        (6, 2, 5, "G"),
    ];
    rows.into_iter()
        .map(|(a, b, c, d)| {
            Tuple::new(vec![
                Field::IntField(a),
                Field::IntField(b),
                Field::IntField(c),
                Field::StringField(d.to_string()),
            ])
        })
        .collect()
}

/// Schema of `aggregate_tuples`.
pub fn aggregate_schema() -> TableSchema {
    TableSchema::from_vecs(
        vec!["id", "grp", "val", "tag"],
        vec![DataType::Int, DataType::Int, DataType::Int, DataType::String],
    )
}

/// Calls made on a `ChildStub`, readable after the stub was boxed into an operator.
#[derive(Debug, Default)]
pub struct CallCounts {
    pub opens: Cell<usize>,
    pub rewinds: Cell<usize>,
    pub pulls: Cell<usize>,
    pub closes: Cell<usize>,
}

/// Child producer whose content and failures are scripted by the test.
///
/// Every `open` or `rewind` starts a new scan; scan `n` yields `versions[n]` (the last
/// version once they run out), so a parent that re-reads its child sees different data.
pub struct ChildStub {
    versions: Vec<Vec<Tuple>>,
    scan: usize,
    index: usize,
    schema: TableSchema,
    lifecycle: OpLifecycle,
    counts: Rc<CallCounts>,
    fail_on_pull: Option<(usize, CrustyError)>,
    fail_on_rewind: Option<CrustyError>,
    fail_on_open: Option<CrustyError>,
}

impl ChildStub {
    pub fn new(tuples: Vec<Tuple>, schema: TableSchema) -> Self {
        Self::with_versions(vec![tuples], schema)
    }

    pub fn with_versions(versions: Vec<Vec<Tuple>>, schema: TableSchema) -> Self {
        Self {
            versions,
            scan: 0,
            index: 0,
            schema,
            lifecycle: OpLifecycle::new("ChildStub"),
            counts: Rc::new(CallCounts::default()),
            fail_on_pull: None,
            fail_on_rewind: None,
            fail_on_open: None,
        }
    }

    /// The `pull`-th successful or failed fetch (1-based, counted over the stub's
    /// lifetime) returns `err` instead of a tuple. Fails once.
    pub fn fail_on_pull(mut self, pull: usize, err: CrustyError) -> Self {
        self.fail_on_pull = Some((pull, err));
        self
    }

    /// The next rewind returns `err`. Fails once.
    pub fn fail_on_rewind(mut self, err: CrustyError) -> Self {
        self.fail_on_rewind = Some(err);
        self
    }

    /// The next open returns `err`. Fails once.
    pub fn fail_on_open(mut self, err: CrustyError) -> Self {
        self.fail_on_open = Some(err);
        self
    }

    pub fn counts(&self) -> Rc<CallCounts> {
        Rc::clone(&self.counts)
    }

    fn start_scan(&mut self) {
        self.scan += 1;
        self.index = 0;
    }

    fn current_version(&self) -> &[Tuple] {
        let last = self.versions.len().saturating_sub(1);
        let version = (self.scan.saturating_sub(1)).min(last);
        self.versions.get(version).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl FetchNext for ChildStub {
    fn lifecycle(&mut self) -> &mut OpLifecycle {
        &mut self.lifecycle
    }

    fn fetch_next(&mut self) -> Result<Option<Tuple>, CrustyError> {
        let pulls = self.counts.pulls.get() + 1;
        self.counts.pulls.set(pulls);
        if matches!(&self.fail_on_pull, Some((at, _)) if *at == pulls) {
            if let Some((_, err)) = self.fail_on_pull.take() {
                return Err(err);
            }
        }
        let tuple = self.current_version().get(self.index).cloned();
        if tuple.is_some() {
            self.index += 1;
        }
        Ok(tuple)
    }
}

impl OpIterator for ChildStub {
    fn open(&mut self) -> Result<(), CrustyError> {
        self.counts.opens.set(self.counts.opens.get() + 1);
        if let Some(err) = self.fail_on_open.take() {
            return Err(err);
        }
        self.lifecycle.ensure_closed()?;
        self.start_scan();
        self.lifecycle.open()
    }

    fn has_next(&mut self) -> Result<bool, CrustyError> {
        OpLifecycle::has_next(self)
    }

    fn next(&mut self) -> Result<Option<Tuple>, CrustyError> {
        OpLifecycle::next(self)
    }

    fn close(&mut self) -> Result<(), CrustyError> {
        self.counts.closes.set(self.counts.closes.get() + 1);
        self.lifecycle.close();
        Ok(())
    }

    fn rewind(&mut self) -> Result<(), CrustyError> {
        self.counts.rewinds.set(self.counts.rewinds.get() + 1);
        self.lifecycle.ensure_open("rewind")?;
        if let Some(err) = self.fail_on_rewind.take() {
            return Err(err);
        }
        self.start_scan();
        self.lifecycle.rewind()
    }

    fn get_schema(&self) -> &TableSchema {
        &self.schema
    }
}
