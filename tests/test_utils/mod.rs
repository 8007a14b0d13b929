use std::sync::{Arc, RwLock};

use log::debug;
use rand::prelude::*;
use small_heap::{
    catalog::TableRC,
    small_int_schema,
    storage::{
        buffer_pool::{BufferPool, DEFAULT_PAGE_SIZE},
        schema::Schema,
        tuple::Tuple,
    },
    transaction::Transaction,
    utils::{self, HandyRwLock},
    Database, HeapTable,
};

/// # Conduct the initialization
///
/// - Setting up log configurations.
/// - Reset page size.
pub fn setup() {
    utils::init_log();
    BufferPool::set_page_size(DEFAULT_PAGE_SIZE);
}

/// Create an empty table backed by a fresh file and register it in the
/// catalog under its path.
pub fn new_empty_table(db: &Arc<Database>, path: &str, schema: Schema) -> TableRC {
    // wipe leftovers of a previous run
    let _ = std::fs::remove_file(path);

    let table = HeapTable::new(path, schema).unwrap();
    let table_rc = Arc::new(RwLock::new(table));
    db.add_table(Arc::clone(&table_rc), path);
    table_rc
}

pub fn new_empty_heap_table(db: &Arc<Database>, path: &str, columns: usize) -> TableRC {
    new_empty_table(db, path, small_int_schema(columns, ""))
}

/// Create a table with the given number of rows and columns, filled with
/// random data through the insertion path and committed.
///
/// # Arguments:
///
/// - int_tuples: This is a reference used to return all inserted data.
///   Only works when it's not None.
pub fn new_random_heap_table(
    db: &Arc<Database>,
    path: &str,
    columns: usize,
    rows: usize,
    max_value: i32,
    int_tuples: Option<&mut Vec<Vec<i32>>>,
) -> TableRC {
    let table_rc = new_empty_heap_table(db, path, columns);
    let table_id = table_rc.rl().get_id();

    let mut rng = rand::thread_rng();
    let write_tx = Transaction::new();

    let mut inserted: Vec<Vec<i32>> = Vec::new();
    for _ in 0..rows {
        let insert_value = rng.gen_range(1, max_value);
        let mut tuple = Tuple::new_int_tuples(insert_value, columns);

        db.buffer_pool()
            .insert_tuple(db, &write_tx, table_id, &mut tuple)
            .unwrap();
        inserted.push(vec![insert_value; columns]);
    }

    write_tx.commit(db).unwrap();
    debug!("table construction finished, insert {} rows in total", rows);

    if let Some(int_tuples) = int_tuples {
        *int_tuples = inserted;
    }

    table_rc
}
