#[macro_use]
extern crate log;

pub mod opiterator;
pub mod query;

pub use opiterator::OpIterator;
pub use query::Executor;
