mod aggregate;
mod delete;
mod filter;
mod insert;
mod op_iterator;
mod predicate;
mod seq_scan;

pub use aggregate::{Aggregate, AggregateOp, Aggregator};
pub use delete::Delete;
pub use filter::Filter;
pub use insert::Insert;
pub use op_iterator::{BoxedOp, OpIterator};
pub use predicate::{Op, Predicate};
pub use seq_scan::SeqScan;
