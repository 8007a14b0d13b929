use crate::{
    error::SmallError,
    storage::{schema::Schema, tuple::Tuple},
    types::SmallResult,
};

pub type BoxedOp = Box<dyn OpIterator>;

/// The pull-based operator interface. Operators form a tree and control
/// flows from the root: `open`, then `has_next`/`next` until the stream
/// dries up, with `rewind` restarting it.
///
/// `next` must only be called after `has_next` returned true.
pub trait OpIterator {
    fn open(&mut self) -> SmallResult;

    fn has_next(&mut self) -> Result<bool, SmallError>;

    fn next(&mut self) -> Result<Tuple, SmallError>;

    fn rewind(&mut self) -> SmallResult;

    fn close(&mut self);

    fn get_schema(&self) -> &Schema;

    fn children(&mut self) -> Vec<&mut BoxedOp>;

    fn set_children(&mut self, children: Vec<BoxedOp>);
}
