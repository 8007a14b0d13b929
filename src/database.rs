use std::{
    collections::HashMap,
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::{
    catalog::{Catalog, TableRC},
    optimizer::table_stats::TableStats,
    storage::buffer_pool::{BufferPool, DEFAULT_PAGES},
    transaction::ConcurrentStatus,
    types::Pod,
    utils::HandyRwLock,
};

/// The engine's shared state: catalog, page cache, lock tables and the
/// statistics registry.
///
/// There is deliberately no process-wide instance. Every caller gets an
/// explicit handle (usually behind an `Arc`), and tests construct a fresh
/// one per case.
pub struct Database {
    catalog: Pod<Catalog>,
    buffer_pool: BufferPool,
    concurrent_status: ConcurrentStatus,
    table_stats: RwLock<HashMap<String, TableStats>>,
}

impl Database {
    pub fn new() -> Self {
        Self::with_buffer_capacity(DEFAULT_PAGES)
    }

    pub fn with_buffer_capacity(capacity: usize) -> Self {
        Self {
            catalog: Arc::new(RwLock::new(Catalog::new())),
            buffer_pool: BufferPool::with_capacity(capacity),
            concurrent_status: ConcurrentStatus::new(),
            table_stats: RwLock::new(HashMap::new()),
        }
    }

    pub fn catalog(&self) -> RwLockReadGuard<'_, Catalog> {
        self.catalog.rl()
    }

    pub fn mut_catalog(&self) -> RwLockWriteGuard<'_, Catalog> {
        self.catalog.wl()
    }

    pub fn buffer_pool(&self) -> &BufferPool {
        &self.buffer_pool
    }

    pub fn concurrent_status(&self) -> &ConcurrentStatus {
        &self.concurrent_status
    }

    pub fn table_stats(&self) -> RwLockReadGuard<'_, HashMap<String, TableStats>> {
        self.table_stats.rl()
    }

    pub fn mut_table_stats(&self) -> RwLockWriteGuard<'_, HashMap<String, TableStats>> {
        self.table_stats.wl()
    }

    pub fn add_table(&self, table_rc: TableRC, name: &str) {
        self.mut_catalog().add_table(table_rc, name);
    }
}
