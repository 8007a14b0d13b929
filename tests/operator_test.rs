mod test_utils;

use std::sync::Arc;

use small_heap::{
    error::SmallError,
    execution::{Delete, Filter, Insert, Op, OpIterator, Predicate, SeqScan},
    storage::tuple::Cell,
    transaction::Transaction,
    utils::HandyRwLock,
    Database,
};
use test_utils::{new_empty_heap_table, new_random_heap_table, setup};

#[test]
fn test_filter() {
    setup();
    let db = Arc::new(Database::new());

    let mut cells: Vec<Vec<i32>> = Vec::new();
    let table_rc = new_random_heap_table(&db, "./op_filter.db", 2, 500, 100, Some(&mut cells));
    let table_id = table_rc.rl().get_id();

    let tx = Transaction::new();
    let scan = SeqScan::new(Arc::clone(&db), &tx, table_id);
    let predicate = Predicate::new(0, Op::GreaterThan, &Cell::Int32(50));
    let mut filter = Filter::new(predicate, Box::new(scan));

    filter.open().unwrap();
    let mut count = 0;
    while filter.has_next().unwrap() {
        let tuple = filter.next().unwrap();
        assert!(tuple.get_cell(0).get_int32().unwrap() > 50);
        count += 1;
    }
    filter.close();
    tx.commit(&db).unwrap();

    let expected = cells.iter().filter(|row| row[0] > 50).count();
    assert_eq!(count, expected);
}

#[test]
fn test_insert_operator() {
    setup();
    let db = Arc::new(Database::new());

    let rows = 100;
    let source_rc = new_random_heap_table(&db, "./op_insert_src.db", 2, rows, 1000, None);
    let target_rc = new_empty_heap_table(&db, "./op_insert_dst.db", 2);
    let source_id = source_rc.rl().get_id();
    let target_id = target_rc.rl().get_id();

    let tx = Transaction::new();
    let scan = SeqScan::new(Arc::clone(&db), &tx, source_id);
    let mut insert = Insert::new(Arc::clone(&db), &tx, Box::new(scan), target_id).unwrap();

    insert.open().unwrap();
    assert!(insert.has_next().unwrap());
    let result = insert.next().unwrap();
    assert_eq!(result.get_cell(0), Cell::Int32(rows as i32));

    // the count row comes exactly once
    assert!(!insert.has_next().unwrap());
    insert.close();
    tx.commit(&db).unwrap();

    let verify_tx = Transaction::new();
    let mut scan = SeqScan::new(Arc::clone(&db), &verify_tx, target_id);
    scan.open().unwrap();
    let mut count = 0;
    while scan.has_next().unwrap() {
        scan.next().unwrap();
        count += 1;
    }
    verify_tx.commit(&db).unwrap();
    assert_eq!(count, rows);
}

#[test]
fn test_insert_schema_mismatch() {
    setup();
    let db = Arc::new(Database::new());

    let source_rc = new_random_heap_table(&db, "./op_mismatch_src.db", 2, 10, 100, None);
    let target_rc = new_empty_heap_table(&db, "./op_mismatch_dst.db", 1);
    let source_id = source_rc.rl().get_id();
    let target_id = target_rc.rl().get_id();

    let tx = Transaction::new();
    let scan = SeqScan::new(Arc::clone(&db), &tx, source_id);
    match Insert::new(Arc::clone(&db), &tx, Box::new(scan), target_id) {
        Err(SmallError::SchemaMismatch(_)) => {}
        other => panic!("unexpected result: {:?}", other.err()),
    }
    tx.commit(&db).unwrap();
}

#[test]
fn test_delete_operator() {
    setup();
    let db = Arc::new(Database::new());

    let mut cells: Vec<Vec<i32>> = Vec::new();
    let table_rc = new_random_heap_table(&db, "./op_delete.db", 2, 500, 100, Some(&mut cells));
    let table_id = table_rc.rl().get_id();

    let tx = Transaction::new();
    let scan = SeqScan::new(Arc::clone(&db), &tx, table_id);
    let predicate = Predicate::new(0, Op::LessThanOrEq, &Cell::Int32(50));
    let filter = Filter::new(predicate, Box::new(scan));
    let mut delete = Delete::new(Arc::clone(&db), &tx, Box::new(filter));

    let doomed = cells.iter().filter(|row| row[0] <= 50).count();

    delete.open().unwrap();
    let result = delete.next().unwrap();
    assert_eq!(result.get_cell(0), Cell::Int32(doomed as i32));
    assert!(!delete.has_next().unwrap());
    delete.close();
    tx.commit(&db).unwrap();

    // the survivors are exactly the rows above the cutoff
    let verify_tx = Transaction::new();
    let mut scan = SeqScan::new(Arc::clone(&db), &verify_tx, table_id);
    scan.open().unwrap();
    let mut count = 0;
    while scan.has_next().unwrap() {
        let tuple = scan.next().unwrap();
        assert!(tuple.get_cell(0).get_int32().unwrap() > 50);
        count += 1;
    }
    verify_tx.commit(&db).unwrap();
    assert_eq!(count, cells.len() - doomed);
}

#[test]
fn test_set_children_swaps_input() {
    setup();
    let db = Arc::new(Database::new());

    let small_rc = new_random_heap_table(&db, "./op_children_a.db", 1, 10, 100, None);
    let big_rc = new_random_heap_table(&db, "./op_children_b.db", 1, 20, 100, None);
    let small_id = small_rc.rl().get_id();
    let big_id = big_rc.rl().get_id();

    let tx = Transaction::new();
    let scan = SeqScan::new(Arc::clone(&db), &tx, small_id);
    let predicate = Predicate::new(0, Op::GreaterThan, &Cell::Int32(0));
    let mut filter = Filter::new(predicate, Box::new(scan));
    assert_eq!(filter.children().len(), 1);

    let other_scan = SeqScan::new(Arc::clone(&db), &tx, big_id);
    filter.set_children(vec![Box::new(other_scan)]);

    filter.open().unwrap();
    let mut count = 0;
    while filter.has_next().unwrap() {
        filter.next().unwrap();
        count += 1;
    }
    filter.close();
    tx.commit(&db).unwrap();

    assert_eq!(count, 20);
}
