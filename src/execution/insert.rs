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

/// Routes every child tuple into the table through the buffer pool, then
/// yields a single one-field tuple holding the insertion count.
pub struct Insert {
    db: Arc<Database>,
    tx: Transaction,
    child: BoxedOp,
    table_id: u32,
    schema: Schema,
    done: bool,
    opened: bool,
}

impl Insert {
    pub fn new(
        db: Arc<Database>,
        tx: &Transaction,
        child: BoxedOp,
        table_id: u32,
    ) -> Result<Self, SmallError> {
        let table_schema = db
            .catalog()
            .get_schema(&table_id)
            .expect(&format!("table {} not found", table_id));

        if child.get_schema() != &table_schema {
            return Err(SmallError::SchemaMismatch(format!(
                "child schema {} does not match table schema {}",
                child.get_schema(),
                table_schema
            )));
        }

        Ok(Self {
            db,
            tx: *tx,
            child,
            table_id,
            schema: Schema::new(vec![FieldItem::new("count", Type::Int32)]),
            done: false,
            opened: false,
        })
    }
}

impl OpIterator for Insert {
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
            let mut tuple = self.child.next()?;
            self.db
                .buffer_pool()
                .insert_tuple(&self.db, &self.tx, self.table_id, &mut tuple)?;
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
