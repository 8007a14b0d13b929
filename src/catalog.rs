use std::collections::HashMap;

use crate::{
    storage::{heap_table::HeapTable, schema::Schema},
    types::Pod,
    utils::HandyRwLock,
};

pub type TableRC = Pod<HeapTable>;

/// Directory of the tables the engine knows about. Table ids come from
/// the tables themselves (a hash of the backing file path).
pub struct Catalog {
    tables: HashMap<u32, TableRC>,
    names: HashMap<u32, String>,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            tables: HashMap::new(),
            names: HashMap::new(),
        }
    }

    pub fn add_table(&mut self, table_rc: TableRC, name: &str) {
        let table_id = table_rc.rl().get_id();
        self.tables.insert(table_id, table_rc);
        self.names.insert(table_id, name.to_string());
    }

    pub fn get_table(&self, table_id: &u32) -> Option<TableRC> {
        self.tables.get(table_id).cloned()
    }

    pub fn get_table_name(&self, table_id: &u32) -> Option<&str> {
        self.names.get(table_id).map(|name| name.as_str())
    }

    pub fn get_schema(&self, table_id: &u32) -> Option<Schema> {
        self.tables
            .get(table_id)
            .map(|table| table.rl().get_schema().clone())
    }

    pub fn table_ids(&self) -> Vec<u32> {
        self.tables.keys().cloned().collect()
    }
}
