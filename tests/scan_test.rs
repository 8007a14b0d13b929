mod test_utils;

use std::sync::Arc;

use log::info;
use small_heap::{
    execution::{OpIterator, SeqScan},
    storage::tuple::Tuple,
    transaction::Transaction,
    utils::HandyRwLock,
    Database,
};
use test_utils::{new_empty_heap_table, new_random_heap_table, setup};

// A committed insertion is observed by a later scan exactly once.
#[test]
fn test_insert_scan() {
    setup();
    let db = Arc::new(Database::new());

    let table_rc = new_empty_heap_table(&db, "./scan_insert_scan.db", 1);
    let table_id = table_rc.rl().get_id();

    let t1 = Transaction::new();
    for v in 1..=3 {
        let mut tuple = Tuple::new_int_tuples(v, 1);
        db.buffer_pool()
            .insert_tuple(&db, &t1, table_id, &mut tuple)
            .unwrap();
    }
    t1.commit(&db).unwrap();

    let t2 = Transaction::new();
    let mut scan = SeqScan::new(Arc::clone(&db), &t2, table_id);
    scan.open().unwrap();

    let mut values: Vec<i32> = Vec::new();
    while scan.has_next().unwrap() {
        let tuple = scan.next().unwrap();
        values.push(tuple.get_cell(0).get_int32().unwrap());
    }
    scan.close();
    t2.commit(&db).unwrap();

    values.sort();
    assert_eq!(values, vec![1, 2, 3]);
}

#[test]
fn test_scan_matches_inserted_data() {
    setup();
    let db = Arc::new(Database::new());

    let rows = 1000;
    let mut cells: Vec<Vec<i32>> = Vec::new();
    let table_rc = new_random_heap_table(
        &db,
        "./scan_small.db",
        2,
        rows,
        10000,
        Some(&mut cells),
    );
    let table_id = table_rc.rl().get_id();

    let tx = Transaction::new();
    let mut scan = SeqScan::new(Arc::clone(&db), &tx, table_id);
    scan.open().unwrap();

    let mut row_index = 0;
    while scan.has_next().unwrap() {
        let actual_row = scan.next().unwrap();
        assert!(actual_row.equal_cells(&cells[row_index]));
        row_index += 1;
    }
    tx.commit(&db).unwrap();

    info!(
        "scanned: {}, origin dataset length: {}",
        row_index,
        cells.len()
    );
    assert_eq!(row_index, cells.len());
}

// Test that rewinding a scan works.
#[test]
fn test_rewind() {
    setup();
    let db = Arc::new(Database::new());

    let rows = 1000;
    let mut cells: Vec<Vec<i32>> = Vec::new();
    let table_rc =
        new_random_heap_table(&db, "./scan_rewind.db", 2, rows, 10000, Some(&mut cells));
    let table_id = table_rc.rl().get_id();

    let tx = Transaction::new();
    let mut scan = SeqScan::new(Arc::clone(&db), &tx, table_id);
    scan.open().unwrap();

    let mut row_index = 0;
    while scan.has_next().unwrap() && row_index < 100 {
        let actual_row = scan.next().unwrap();
        assert!(actual_row.equal_cells(&cells[row_index]));
        row_index += 1;
    }

    scan.rewind().unwrap();

    let mut row_index = 0;
    while scan.has_next().unwrap() {
        let actual_row = scan.next().unwrap();
        assert!(actual_row.equal_cells(&cells[row_index]));
        row_index += 1;
    }
    tx.commit(&db).unwrap();

    assert_eq!(row_index, rows);
}

// Verifies that the buffer pool is actually caching data: a second scan
// must not touch the disk again.
#[test]
fn test_cache() {
    setup();
    let db = Arc::new(Database::new());

    let rows = 1000;
    let table_rc = new_random_heap_table(&db, "./scan_cache.db", 2, rows, 10000, None);
    let table_id = table_rc.rl().get_id();

    let tx = Transaction::new();
    let mut scan = SeqScan::new(Arc::clone(&db), &tx, table_id);
    scan.open().unwrap();

    let mut count = 0;
    while scan.has_next().unwrap() {
        scan.next().unwrap();
        count += 1;
    }
    assert_eq!(count, rows);

    let read_count_after_first = table_rc.rl().read_count();

    scan.rewind().unwrap();
    let mut count = 0;
    while scan.has_next().unwrap() {
        scan.next().unwrap();
        count += 1;
    }
    assert_eq!(count, rows);
    tx.commit(&db).unwrap();

    assert_eq!(table_rc.rl().read_count(), read_count_after_first);
}

// A closed scan yields nothing until it is reopened.
#[test]
fn test_closed_scan_stops() {
    setup();
    let db = Arc::new(Database::new());

    let table_rc = new_random_heap_table(&db, "./scan_close.db", 1, 10, 100, None);
    let table_id = table_rc.rl().get_id();

    let tx = Transaction::new();
    let mut scan = SeqScan::new(Arc::clone(&db), &tx, table_id);
    scan.open().unwrap();
    assert!(scan.has_next().unwrap());

    scan.close();
    assert!(!scan.has_next().unwrap());

    scan.open().unwrap();
    assert!(scan.has_next().unwrap());
    tx.commit(&db).unwrap();
}
