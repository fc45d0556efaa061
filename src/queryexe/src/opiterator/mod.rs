pub use self::aggregate::Aggregate;
pub use self::aggregator::{Aggregator, IntegerAggregator, StringAggregator};
pub use self::join::{Join, JoinPredicate};
pub use self::lifecycle::{FetchNext, OpLifecycle, OpState};
pub use self::tuple_iterator::TupleIterator;
use common::{CrustyError, TableSchema, Tuple};

mod aggregate;
mod aggregator;
mod join;
mod lifecycle;
#[cfg(test)]
pub(crate) mod testutil;
mod tuple_iterator;

pub trait OpIterator {
    /// Opens the iterator. This must be called before any of the other methods
    /// except `close` and `get_schema`.
    fn open(&mut self) -> Result<(), CrustyError>;

    /// Reports whether another tuple is available without consuming it.
    ///
    /// Keeps returning false once the iterator is exhausted, until `rewind` or `open`.
    ///
    /// # Errors
    ///
    /// `ProtocolError` if the iterator is not open.
    fn has_next(&mut self) -> Result<bool, CrustyError>;

    /// Advances the iterator and returns the next tuple from the operator.
    ///
    /// Returns None when iteration is finished, and on every call after that
    /// until the iterator is rewound.
    ///
    /// # Errors
    ///
    /// `ProtocolError` if the iterator is not open.
    fn next(&mut self) -> Result<Option<Tuple>, CrustyError>;

    /// Closes the iterator. Safe to call on an iterator that is not open.
    fn close(&mut self) -> Result<(), CrustyError>;

    /// Returns the iterator to the start.
    ///
    /// # Errors
    ///
    /// `ProtocolError` if the iterator is not open.
    fn rewind(&mut self) -> Result<(), CrustyError>;

    /// Returns the schema associated with this OpIterator.
    fn get_schema(&self) -> &TableSchema;
}
