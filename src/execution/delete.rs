use std::sync::Arc;

use crate::{
    database::Database,
    error::SmallError,
    execution::op_iterator::{BoxedOp, OpIterator},
    storage::{
        schema::{FieldItem, Schema, Type},
        tuple::{Cell, Tuple},
    },
    transaction::Transaction,
    types::SmallResult,
};

/// Drains the child and removes each of its tuples from the table the
/// tuple's record id points into, then yields the deletion count once.
pub struct Delete {
    db: Arc<Database>,
    tx: Transaction,
    child: BoxedOp,
    schema: Schema,
    done: bool,
    opened: bool,
}

impl Delete {
    pub fn new(db: Arc<Database>, tx: &Transaction, child: BoxedOp) -> Self {
        Self {
            db,
            tx: *tx,
            child,
            schema: Schema::new(vec![FieldItem::new("count", Type::Int32)]),
            done: false,
            opened: false,
        }
    }
}

impl OpIterator for Delete {
    fn open(&mut self) -> SmallResult {
        self.child.open()?;
        self.done = false;
        self.opened = true;
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool, SmallError> {
        Ok(self.opened && !self.done)
    }

    fn next(&mut self) -> Result<Tuple, SmallError> {
        if !self.has_next()? {
            panic!("next() called on an exhausted operator");
        }

        let mut count = 0;
        while self.child.has_next()? {
            let tuple = self.child.next()?;
            self.db
                .buffer_pool()
                .delete_tuple(&self.db, &self.tx, &tuple)?;
            count += 1;
        }

        self.done = true;
        Ok(Tuple::new_from_cells(&[Cell::Int32(count)]))
    }

    fn rewind(&mut self) -> SmallResult {
        self.child.rewind()?;
        self.done = false;
        Ok(())
    }

    fn close(&mut self) {
        self.child.close();
        self.done = false;
        self.opened = false;
    }

    fn get_schema(&self) -> &Schema {
        &self.schema
    }

    fn children(&mut self) -> Vec<&mut BoxedOp> {
        vec![&mut self.child]
    }

    fn set_children(&mut self, mut children: Vec<BoxedOp>) {
        self.child = children.remove(0);
    }
}
