use std::sync::Arc;

use crate::{
    database::Database,
    error::SmallError,
    execution::op_iterator::{BoxedOp, OpIterator},
    storage::{
        heap_table::{HeapTable, HeapTableIterator},
        schema::Schema,
        tuple::Tuple,
    },
    transaction::Transaction,
    types::SmallResult,
    utils::HandyRwLock,
};

/// Sequential scan over one table, the leaf of every operator tree.
pub struct SeqScan {
    schema: Schema,
    iter: HeapTableIterator,
    next_tuple: Option<Tuple>,
    opened: bool,
}

impl SeqScan {
    pub fn new(db: Arc<Database>, tx: &Transaction, table_id: u32) -> Self {
        let table_rc = db
            .catalog()
            .get_table(&table_id)
            .expect(&format!("table {} not found", table_id));
        let schema = table_rc.rl().get_schema().clone();

        let iter = HeapTable::iter(&table_rc, &db, tx);

        Self {
            schema,
            iter,
            next_tuple: None,
            opened: false,
        }
    }
}

impl OpIterator for SeqScan {
    fn open(&mut self) -> SmallResult {
        self.iter.rewind();
        self.next_tuple = None;
        self.opened = true;
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool, SmallError> {
        if !self.opened {
            return Ok(false);
        }

        if self.next_tuple.is_none() {
            self.next_tuple = self.iter.fetch_next()?;
        }
        Ok(self.next_tuple.is_some())
    }

    fn next(&mut self) -> Result<Tuple, SmallError> {
        if !self.has_next()? {
            panic!("next() called on an exhausted operator");
        }
        Ok(self.next_tuple.take().unwrap())
    }

    fn rewind(&mut self) -> SmallResult {
        self.iter.rewind();
        self.next_tuple = None;
        Ok(())
    }

    fn close(&mut self) {
        self.iter.close();
        self.next_tuple = None;
        self.opened = false;
    }

    fn get_schema(&self) -> &Schema {
        &self.schema
    }

    fn children(&mut self) -> Vec<&mut BoxedOp> {
        Vec::new()
    }

    fn set_children(&mut self, _children: Vec<BoxedOp>) {}
}
