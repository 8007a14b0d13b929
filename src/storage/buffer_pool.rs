use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, RwLock,
    },
};

use log::debug;

use crate::{
    database::Database,
    error::SmallError,
    storage::{heap_page::{HeapPage, HeapPageID}, tuple::Tuple},
    transaction::{Permission, Transaction},
    types::{Pod, ResultPod, SmallResult},
    utils::HandyRwLock,
};

pub const DEFAULT_PAGE_SIZE: usize = 4096;
pub const DEFAULT_PAGES: usize = 50;

static PAGE_SIZE: AtomicUsize = AtomicUsize::new(DEFAULT_PAGE_SIZE);

/// A bounded cache of heap pages, keyed by page id.
///
/// Cache bookkeeping (insertion, eviction, dirty scans) is serialized by
/// one coarse mutex. Callers must not hold a page guard when entering the
/// pool, the page locks taken here would deadlock against them otherwise.
///
/// Eviction is STEAL: any resident page can go, and a dirty image is
/// flushed to disk first even when its transaction is still running.
/// Abort compensates by discarding the aborted transaction's pages from
/// the cache, forcing re-reads from disk.
pub struct BufferPool {
    buffer: Mutex<HashMap<HeapPageID, Pod<HeapPage>>>,
    capacity: usize,
}

impl BufferPool {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_PAGES)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Mutex::new(HashMap::new()),
            capacity,
        }
    }

    pub fn set_page_size(page_size: usize) {
        PAGE_SIZE.store(page_size, Ordering::Relaxed);
    }

    pub fn get_page_size() -> usize {
        PAGE_SIZE.load(Ordering::Relaxed)
    }

    /// Retrieve the page with the given permission. Blocks inside the
    /// lock manager if the page is held by another transaction. A cache
    /// miss loads the page from the owning table, evicting a resident
    /// page first when the pool is full.
    pub fn get_page(
        &self,
        db: &Database,
        tx: &Transaction,
        pid: &HeapPageID,
        perm: Permission,
    ) -> ResultPod<HeapPage> {
        db.concurrent_status()
            .acquire_latch(tx, &perm.to_lock(), pid)?;

        let mut buffer = self.buffer.lock().unwrap();

        if let Some(page_rc) = buffer.get(pid) {
            return Ok(Arc::clone(page_rc));
        }

        if buffer.len() >= self.capacity {
            self.evict_page(db, &mut buffer)?;
        }

        let table_rc = db
            .catalog()
            .get_table(&pid.table_id)
            .expect(&format!("table {} not found", pid.table_id));
        let page = table_rc.rl().read_page(pid)?;

        let page_rc = Arc::new(RwLock::new(page));
        buffer.insert(*pid, Arc::clone(&page_rc));
        Ok(page_rc)
    }

    /// Add the tuple to the table on behalf of the transaction. The pages
    /// the table reports as modified are marked dirty and reinstated in
    /// the cache so that future requests see them.
    pub fn insert_tuple(
        &self,
        db: &Database,
        tx: &Transaction,
        table_id: u32,
        tuple: &mut Tuple,
    ) -> SmallResult {
        let table_rc = db
            .catalog()
            .get_table(&table_id)
            .expect(&format!("table {} not found", table_id));

        let dirtied = table_rc.rl().insert_tuple(db, tx, tuple)?;
        self.reinstate_pages(db, tx, dirtied)
    }

    /// Remove the tuple from the table its record id points into.
    pub fn delete_tuple(&self, db: &Database, tx: &Transaction, tuple: &Tuple) -> SmallResult {
        let record_id = tuple.get_record_id().ok_or_else(|| {
            SmallError::TupleNotOnPage(format!("tuple {} has no record id", tuple))
        })?;

        let table_rc = db
            .catalog()
            .get_table(&record_id.pid.table_id)
            .expect(&format!("table {} not found", record_id.pid.table_id));

        let dirtied = table_rc.rl().delete_tuple(db, tx, tuple)?;
        self.reinstate_pages(db, tx, dirtied)
    }

    fn reinstate_pages(
        &self,
        db: &Database,
        tx: &Transaction,
        pages: Vec<Pod<HeapPage>>,
    ) -> SmallResult {
        let mut buffer = self.buffer.lock().unwrap();

        for page_rc in pages {
            let pid = {
                let mut page = page_rc.wl();
                page.mark_dirty(Some(*tx));
                page.get_pid()
            };

            if !buffer.contains_key(&pid) && buffer.len() >= self.capacity {
                self.evict_page(db, &mut buffer)?;
            }
            buffer.insert(pid, Arc::clone(&page_rc));
        }

        Ok(())
    }

    /// Throw out an arbitrary resident page, flushing its image first if
    /// it is dirty.
    fn evict_page(
        &self,
        db: &Database,
        buffer: &mut HashMap<HeapPageID, Pod<HeapPage>>,
    ) -> SmallResult {
        let victim = match buffer.keys().next() {
            Some(pid) => *pid,
            None => return Ok(()),
        };

        let page_rc = buffer.remove(&victim).unwrap();

        let mut page = page_rc.wl();
        if page.is_dirty().is_some() {
            let table_rc = db
                .catalog()
                .get_table(&victim.table_id)
                .expect(&format!("table {} not found", victim.table_id));
            table_rc.rl().write_page(&page)?;
            page.mark_dirty(None);
        }

        debug!("page {} evicted", victim);
        Ok(())
    }

    /// Write the page to disk if it is resident and dirty. The page stays
    /// in the cache.
    pub fn flush_page(&self, db: &Database, pid: &HeapPageID) -> SmallResult {
        let page_rc = {
            let buffer = self.buffer.lock().unwrap();
            match buffer.get(pid) {
                Some(page_rc) => Arc::clone(page_rc),
                None => return Ok(()),
            }
        };

        let mut page = page_rc.wl();
        if page.is_dirty().is_some() {
            let table_rc = db
                .catalog()
                .get_table(&pid.table_id)
                .expect(&format!("table {} not found", pid.table_id));
            table_rc.rl().write_page(&page)?;
            page.mark_dirty(None);
            debug!("page {} flushed", pid);
        }

        Ok(())
    }

    pub fn flush_all_pages(&self, db: &Database) -> SmallResult {
        for pid in self.all_keys() {
            self.flush_page(db, &pid)?;
        }
        Ok(())
    }

    /// Write every cached page the transaction dirtied. Commit goes
    /// through here, so this must actually write.
    pub fn flush_pages(&self, db: &Database, tx: &Transaction) -> SmallResult {
        for pid in self.dirty_pages_of(tx) {
            self.flush_page(db, &pid)?;
        }
        Ok(())
    }

    /// Drop the page from the cache without flushing. Rollback uses this
    /// to force a re-read from disk.
    pub fn discard_page(&self, pid: &HeapPageID) {
        self.buffer.lock().unwrap().remove(pid);
    }

    /// Release one page lock before the transaction completes. Dangerous:
    /// the caller is responsible for not breaking two-phase locking.
    pub fn release_page(&self, db: &Database, tx: &Transaction, pid: &HeapPageID) {
        db.concurrent_status().release_latch(tx, pid);
    }

    /// Commit or roll back the transaction's footprint in the cache:
    /// commit flushes its dirty pages, abort discards them.
    pub fn tx_complete(&self, db: &Database, tx: &Transaction, commit: bool) -> SmallResult {
        if commit {
            return self.flush_pages(db, tx);
        }

        for pid in self.dirty_pages_of(tx) {
            self.discard_page(&pid);
        }
        Ok(())
    }

    fn dirty_pages_of(&self, tx: &Transaction) -> Vec<HeapPageID> {
        let buffer = self.buffer.lock().unwrap();
        buffer
            .iter()
            .filter(|(_, page_rc)| page_rc.rl().is_dirty() == Some(*tx))
            .map(|(pid, _)| *pid)
            .collect()
    }

    fn all_keys(&self) -> Vec<HeapPageID> {
        self.buffer.lock().unwrap().keys().cloned().collect()
    }

    pub fn resident_count(&self) -> usize {
        self.buffer.lock().unwrap().len()
    }

    pub fn is_resident(&self, pid: &HeapPageID) -> bool {
        self.buffer.lock().unwrap().contains_key(pid)
    }

    pub fn clear(&self) {
        self.buffer.lock().unwrap().clear();
    }
}
