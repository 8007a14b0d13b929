use crate::{
    error::SmallError,
    execution::{
        op_iterator::{BoxedOp, OpIterator},
        predicate::Predicate,
    },
    storage::{schema::Schema, tuple::Tuple},
    types::SmallResult,
};

/// Yields the child tuples that satisfy the predicate. The predicate is
/// evaluated exactly once per child tuple.
pub struct Filter {
    predicate: Predicate,
    child: BoxedOp,
    next_tuple: Option<Tuple>,
    opened: bool,
}

impl Filter {
    pub fn new(predicate: Predicate, child: BoxedOp) -> Self {
        Self {
            predicate,
            child,
            next_tuple: None,
            opened: false,
        }
    }
}

impl OpIterator for Filter {
    fn open(&mut self) -> SmallResult {
        self.child.open()?;
        self.next_tuple = None;
        self.opened = true;
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool, SmallError> {
        if !self.opened {
            return Ok(false);
        }

        while self.next_tuple.is_none() {
            if !self.child.has_next()? {
                return Ok(false);
            }

            let tuple = self.child.next()?;
            if self.predicate.matches(&tuple.get_cell(self.predicate.field_index)) {
                self.next_tuple = Some(tuple);
            }
        }
        Ok(true)
    }

    fn next(&mut self) -> Result<Tuple, SmallError> {
        if !self.has_next()? {
            panic!("next() called on an exhausted operator");
        }
        Ok(self.next_tuple.take().unwrap())
    }

    fn rewind(&mut self) -> SmallResult {
        self.child.rewind()?;
        self.next_tuple = None;
        Ok(())
    }

    fn close(&mut self) {
        self.child.close();
        self.next_tuple = None;
        self.opened = false;
    }

    fn get_schema(&self) -> &Schema {
        self.child.get_schema()
    }

    fn children(&mut self) -> Vec<&mut BoxedOp> {
        vec![&mut self.child]
    }

    fn set_children(&mut self, mut children: Vec<BoxedOp>) {
        self.child = children.remove(0);
    }
}
