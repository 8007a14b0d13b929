use std::{
    collections::hash_map::DefaultHasher,
    fmt,
    hash::{Hash, Hasher},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use log::debug;

use crate::{
    database::Database,
    error::SmallError,
    io::SmallFile,
    storage::{
        buffer_pool::BufferPool,
        heap_page::{HeapPage, HeapPageID},
        schema::Schema,
        tuple::Tuple,
    },
    transaction::{Permission, Transaction},
    types::{Pod, SmallResult},
    utils::HandyRwLock,
};

/// An on-disk table: a sequential array of heap pages. Page `i` lives at
/// byte offset `i * page_size`, and the file length stays a multiple of
/// the page size.
pub struct HeapTable {
    file_path: PathBuf,
    file: SmallFile,
    schema: Schema,
    table_id: u32,

    // how often pages were read from disk, tests use this to check that
    // the buffer pool actually caches
    read_count: AtomicUsize,
}

impl HeapTable {
    pub fn new<P: AsRef<Path>>(file_path: P, schema: Schema) -> Result<Self, SmallError> {
        let file = SmallFile::new(&file_path)?;

        // The table id is a stable hash of the absolute path, so two
        // handles on the same file agree on the id.
        let absolute = file_path
            .as_ref()
            .canonicalize()
            .map_err(SmallError::io)?;
        let mut hasher = DefaultHasher::new();
        absolute.hash(&mut hasher);
        let table_id = hasher.finish() as u32;

        Ok(HeapTable {
            file_path: absolute,
            file,
            schema,
            table_id,
            read_count: AtomicUsize::new(0),
        })
    }

    pub fn get_id(&self) -> u32 {
        self.table_id
    }

    pub fn get_schema(&self) -> &Schema {
        &self.schema
    }

    pub fn read_count(&self) -> usize {
        self.read_count.load(Ordering::Relaxed)
    }

    pub fn num_pages(&self) -> Result<usize, SmallError> {
        let page_size = BufferPool::get_page_size();
        let file_len = self.file.get_size()? as usize;
        Ok((file_len + page_size - 1) / page_size)
    }

    pub fn read_page(&self, pid: &HeapPageID) -> Result<HeapPage, SmallError> {
        let page_size = BufferPool::get_page_size();
        let offset = pid.page_index * page_size;

        let file_len = self.file.get_size()? as usize;
        if offset + page_size > file_len {
            return Err(SmallError::InvalidPage(format!(
                "{} is beyond the file length {}",
                pid, file_len
            )));
        }

        let buf = self.file.read_exact_at(offset as u64, page_size)?;
        self.read_count.fetch_add(1, Ordering::Relaxed);
        debug!("read page {} from disk", pid);

        HeapPage::new(*pid, &buf, &self.schema)
    }

    pub fn write_page(&self, page: &HeapPage) -> SmallResult {
        let page_size = BufferPool::get_page_size();
        let pid = page.get_pid();
        let offset = pid.page_index * page_size;

        self.file.write_all_at(offset as u64, &page.get_page_data())
    }

    /// Insert the tuple into the first page with a free slot, appending a
    /// fresh page when the table is packed. Returns the pages whose image
    /// was modified; the buffer pool marks them dirty and reinstates them.
    pub fn insert_tuple(
        &self,
        db: &Database,
        tx: &Transaction,
        tuple: &mut Tuple,
    ) -> Result<Vec<Pod<HeapPage>>, SmallError> {
        let buffer_pool = db.buffer_pool();

        for i in 0..self.num_pages()? {
            let pid = HeapPageID::new(self.table_id, i);
            let page_rc = buffer_pool.get_page(db, tx, &pid, Permission::ReadWrite)?;

            let has_room = page_rc.rl().empty_slots_count() > 0;
            if has_room {
                page_rc.wl().insert_tuple(tuple)?;
                return Ok(vec![page_rc]);
            }
        }

        // every existing page is packed, extend the file
        let pid = HeapPageID::new(self.table_id, self.num_pages()?);
        let empty = HeapPage::new(pid, &HeapPage::empty_page_data(), &self.schema)?;
        self.write_page(&empty)?;
        debug!("table {} extended with {}", self.table_id, pid);

        let page_rc = buffer_pool.get_page(db, tx, &pid, Permission::ReadWrite)?;
        page_rc.wl().insert_tuple(tuple)?;
        Ok(vec![page_rc])
    }

    /// Delete the tuple from the page its record id points at.
    pub fn delete_tuple(
        &self,
        db: &Database,
        tx: &Transaction,
        tuple: &Tuple,
    ) -> Result<Vec<Pod<HeapPage>>, SmallError> {
        let record_id = tuple.get_record_id().ok_or_else(|| {
            SmallError::TupleNotOnPage(format!("tuple {} has no record id", tuple))
        })?;

        if record_id.pid.table_id != self.table_id {
            return Err(SmallError::TupleNotOnPage(format!(
                "tuple {} belongs to table {}, not {}",
                tuple, record_id.pid.table_id, self.table_id
            )));
        }

        let page_rc = db
            .buffer_pool()
            .get_page(db, tx, &record_id.pid, Permission::ReadWrite)?;
        page_rc.wl().delete_tuple(tuple)?;
        Ok(vec![page_rc])
    }

    /// A lazy scan over the whole table. Pages are acquired READ_ONLY one
    /// at a time as the iterator advances.
    pub fn iter(self_rc: &Pod<HeapTable>, db: &Arc<Database>, tx: &Transaction) -> HeapTableIterator {
        HeapTableIterator::new(Arc::clone(db), *tx, Arc::clone(self_rc))
    }
}

impl fmt::Display for HeapTable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "<HeapTable, file: {:?}, id: {}>",
            self.file_path, self.table_id
        )
    }
}

pub struct HeapTableIterator {
    db: Arc<Database>,
    tx: Transaction,
    table: Pod<HeapTable>,
    table_id: u32,

    page_index: usize,
    tuples: Vec<Tuple>,
    cursor: usize,
    closed: bool,
}

impl HeapTableIterator {
    pub fn new(db: Arc<Database>, tx: Transaction, table: Pod<HeapTable>) -> Self {
        let table_id = table.rl().get_id();
        Self {
            db,
            tx,
            table,
            table_id,
            page_index: 0,
            tuples: Vec::new(),
            cursor: 0,
            closed: false,
        }
    }

    pub fn fetch_next(&mut self) -> Result<Option<Tuple>, SmallError> {
        if self.closed {
            return Ok(None);
        }

        loop {
            if self.cursor < self.tuples.len() {
                let tuple = self.tuples[self.cursor].clone();
                self.cursor += 1;
                return Ok(Some(tuple));
            }

            if self.page_index >= self.table.rl().num_pages()? {
                return Ok(None);
            }

            let pid = HeapPageID::new(self.table_id, self.page_index);
            let page_rc =
                self.db
                    .buffer_pool()
                    .get_page(&self.db, &self.tx, &pid, Permission::ReadOnly)?;

            self.tuples = page_rc.rl().iterator().collect();
            self.cursor = 0;
            self.page_index += 1;
        }
    }

    /// Reopen the scan at page 0.
    pub fn rewind(&mut self) {
        self.page_index = 0;
        self.tuples.clear();
        self.cursor = 0;
        self.closed = false;
    }

    /// A closed iterator yields no more tuples.
    pub fn close(&mut self) {
        self.tuples.clear();
        self.cursor = 0;
        self.closed = true;
    }
}
