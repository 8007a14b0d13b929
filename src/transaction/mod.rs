mod concurrent_status;
mod wait_for_graph;

pub use concurrent_status::{ConcurrentStatus, Lock, Permission, ACQUIRE_TIMEOUT};

use core::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::{database::Database, types::SmallResult};

static TRANSACTION_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Eq, Hash, PartialEq, Clone, Copy)]
pub struct Transaction {
    // increase monotonically by 1
    uuid: u64,
}

impl Transaction {
    pub fn new() -> Self {
        Self {
            uuid: TRANSACTION_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn get_id(&self) -> u64 {
        self.uuid
    }

    pub fn commit(&self, db: &Database) -> SmallResult {
        self.complete(db, true)
    }

    pub fn abort(&self, db: &Database) -> SmallResult {
        self.complete(db, false)
    }

    fn complete(&self, db: &Database, commit: bool) -> SmallResult {
        // Flush (commit) or discard (abort) the pages this transaction
        // dirtied, then release its locks.
        db.buffer_pool().tx_complete(db, self, commit)?;
        db.concurrent_status().release_all(self);
        Ok(())
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "tx_{}", self.uuid)
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}
