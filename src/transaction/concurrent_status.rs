use core::fmt;
use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
    thread::sleep,
    time::{Duration, Instant},
};

use itertools::Itertools;
use log::debug;

use super::wait_for_graph::WaitForGraph;
use crate::{
    error::SmallError, storage::heap_page::HeapPageID, transaction::Transaction,
    types::SmallResult,
};

pub const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(3);
const RETRY_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Lock {
    XLock,
    SLock,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Permission {
    ReadOnly,
    ReadWrite,
}

impl Permission {
    pub fn to_lock(&self) -> Lock {
        match self {
            Permission::ReadOnly => Lock::SLock,
            Permission::ReadWrite => Lock::XLock,
        }
    }
}

struct LockTables {
    s_latch_map: HashMap<HeapPageID, HashSet<Transaction>>,
    x_latch_map: HashMap<HeapPageID, Transaction>,

    hold_pages: HashMap<Transaction, HashSet<HeapPageID>>,

    wait_for_graph: WaitForGraph,
}

impl LockTables {
    fn new() -> Self {
        Self {
            s_latch_map: HashMap::new(),
            x_latch_map: HashMap::new(),
            hold_pages: HashMap::new(),
            wait_for_graph: WaitForGraph::new(),
        }
    }

    // Try to grant the lock. This is the whole grant matrix:
    //
    // 1. no holders -> grant
    // 2. the transaction already holds the page:
    //    - same mode -> grant (idempotent)
    //    - holds X, asks S -> grant (X subsumes S)
    //    - holds S, asks X -> upgrade iff it is the sole holder
    // 3. other holders present:
    //    - asks S while all holders hold S -> grant
    //    - anything else -> blocked
    fn add_latch(&mut self, tx: &Transaction, lock: &Lock, page_id: &HeapPageID) -> bool {
        if let Some(x_holder) = self.x_latch_map.get(page_id) {
            if x_holder != tx {
                return false;
            }

            // The transaction already holds the X latch, which covers
            // both requested modes.
            return true;
        }

        match lock {
            Lock::SLock => {
                self.s_latch_map
                    .entry(*page_id)
                    .or_insert_with(HashSet::new)
                    .insert(*tx);
            }
            Lock::XLock => {
                if let Some(s_holders) = self.s_latch_map.get(page_id) {
                    if s_holders.iter().any(|holder| holder != tx) {
                        return false;
                    }
                }

                // Sole holder (or no holder at all): upgrade the S latch
                // to an X latch.
                self.s_latch_map.remove(page_id);
                self.x_latch_map.insert(*page_id, *tx);
            }
        }

        self.hold_pages
            .entry(*tx)
            .or_insert_with(HashSet::new)
            .insert(*page_id);
        true
    }

    // All transactions wait for the X holder; an X request additionally
    // waits for every S holder.
    fn update_wait_for_graph(&mut self, tx: &Transaction, lock: &Lock, page_id: &HeapPageID) {
        if let Some(x_holder) = self.x_latch_map.get(page_id) {
            if x_holder != tx {
                self.wait_for_graph.add_edge(tx.get_id(), x_holder.get_id());
            }
        }

        if lock == &Lock::XLock {
            if let Some(s_holders) = self.s_latch_map.get(page_id) {
                for holder in s_holders {
                    if holder != tx {
                        self.wait_for_graph.add_edge(tx.get_id(), holder.get_id());
                    }
                }
            }
        }
    }

    fn release_latch(&mut self, tx: &Transaction, page_id: &HeapPageID) {
        if let Some(s_holders) = self.s_latch_map.get_mut(page_id) {
            s_holders.remove(tx);
            if s_holders.is_empty() {
                self.s_latch_map.remove(page_id);
            }
        }

        if self.x_latch_map.get(page_id) == Some(tx) {
            self.x_latch_map.remove(page_id);
        }

        if let Some(pages) = self.hold_pages.get_mut(tx) {
            pages.remove(page_id);
            if pages.is_empty() {
                self.hold_pages.remove(tx);
            }
        }
    }
}

/// Page-level S/X lock manager.
///
/// Blocked acquisitions poll the lock tables every few milliseconds and
/// give up after `ACQUIRE_TIMEOUT`; a wait-for-graph check surfaces
/// deadlocks before the requester starts waiting. Both failure paths
/// return `TransactionAborted`, and the caller is expected to abort.
/// Fairness between waiters is not guaranteed.
pub struct ConcurrentStatus {
    inner: Mutex<LockTables>,
}

impl ConcurrentStatus {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(LockTables::new()),
        }
    }

    /// Request a lock on the given page. Blocks until the lock is
    /// granted, a deadlock is detected, or the acquisition times out.
    pub fn acquire_latch(
        &self,
        tx: &Transaction,
        lock: &Lock,
        page_id: &HeapPageID,
    ) -> SmallResult {
        {
            let mut inner = self.inner.lock().unwrap();
            if inner.add_latch(tx, lock, page_id) {
                return Ok(());
            }

            inner.update_wait_for_graph(tx, lock, page_id);
            if inner.wait_for_graph.exists_cycle() {
                inner.wait_for_graph.remove_waiter(tx.get_id());
                return Err(SmallError::TransactionAborted(format!(
                    "deadlock detected, args: {:?}, {:?}, {}",
                    tx, lock, page_id
                )));
            }
        }

        debug!("{} blocked on {:?} of {}", tx, lock, page_id);

        let start_time = Instant::now();
        while start_time.elapsed() < ACQUIRE_TIMEOUT {
            {
                let mut inner = self.inner.lock().unwrap();
                if inner.add_latch(tx, lock, page_id) {
                    inner.wait_for_graph.remove_waiter(tx.get_id());
                    return Ok(());
                }
            }

            sleep(RETRY_INTERVAL);
        }

        self.inner
            .lock()
            .unwrap()
            .wait_for_graph
            .remove_waiter(tx.get_id());
        Err(SmallError::TransactionAborted(format!(
            "acquire lock timeout, args: {:?}, {:?}, {}, concurrent status: {}",
            tx, lock, page_id, self
        )))
    }

    /// Release one page held by the transaction. No-op if it holds
    /// nothing on that page.
    pub fn release_latch(&self, tx: &Transaction, page_id: &HeapPageID) {
        self.inner.lock().unwrap().release_latch(tx, page_id);
    }

    /// Release every page the transaction holds.
    pub fn release_all(&self, tx: &Transaction) {
        let mut inner = self.inner.lock().unwrap();

        if let Some(pages) = inner.hold_pages.remove(tx) {
            for page_id in pages {
                if let Some(s_holders) = inner.s_latch_map.get_mut(&page_id) {
                    s_holders.remove(tx);
                    if s_holders.is_empty() {
                        inner.s_latch_map.remove(&page_id);
                    }
                }

                if inner.x_latch_map.get(&page_id) == Some(tx) {
                    inner.x_latch_map.remove(&page_id);
                }
            }
        }

        inner.wait_for_graph.remove_waiter(tx.get_id());
    }

    pub fn holds_latch(&self, tx: &Transaction, page_id: &HeapPageID) -> bool {
        self.inner
            .lock()
            .unwrap()
            .hold_pages
            .get(tx)
            .map_or(false, |pages| pages.contains(page_id))
    }

    pub fn hold_pages(&self, tx: &Transaction) -> HashSet<HeapPageID> {
        self.inner
            .lock()
            .unwrap()
            .hold_pages
            .get(tx)
            .cloned()
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.s_latch_map.clear();
        inner.x_latch_map.clear();
        inner.hold_pages.clear();
        inner.wait_for_graph.clear();
    }
}

impl fmt::Display for ConcurrentStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let inner = self.inner.lock().unwrap();

        let mut depiction = "\n".to_string();

        depiction.push_str("s_latch_map: {");
        for (page_id, holders) in inner.s_latch_map.iter() {
            depiction.push_str(&format!("\n\t{} -> {:?},", page_id, holders));
        }
        depiction.push_str("\n}\n");

        depiction.push_str("x_latch_map: {");
        for (page_id, holder) in inner.x_latch_map.iter() {
            depiction.push_str(&format!("\n\t{} -> {:?},", page_id, holder));
        }
        depiction.push_str("\n}\n");

        depiction.push_str("hold_pages: {");
        for (tx, pages) in inner.hold_pages.iter() {
            let pages = pages.iter().map(|page_id| format!("{}", page_id)).join(", ");
            depiction.push_str(&format!("\n\t{:?} -> [{}],", tx, pages));
        }
        depiction.push_str("\n}\n");

        write!(f, "{}", depiction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(i: usize) -> HeapPageID {
        HeapPageID::new(1, i)
    }

    #[test]
    fn test_sole_holder_upgrade() {
        let status = ConcurrentStatus::new();
        let t1 = Transaction::new();

        status.acquire_latch(&t1, &Lock::SLock, &pid(0)).unwrap();
        status.acquire_latch(&t1, &Lock::XLock, &pid(0)).unwrap();

        // upgraded, so another reader cannot sneak in
        let inner = status.inner.lock().unwrap();
        assert_eq!(inner.x_latch_map.get(&pid(0)), Some(&t1));
        assert!(inner.s_latch_map.get(&pid(0)).is_none());
    }

    #[test]
    fn test_x_subsumes_s() {
        let status = ConcurrentStatus::new();
        let t1 = Transaction::new();

        status.acquire_latch(&t1, &Lock::XLock, &pid(0)).unwrap();
        status.acquire_latch(&t1, &Lock::SLock, &pid(0)).unwrap();

        let inner = status.inner.lock().unwrap();
        assert_eq!(inner.x_latch_map.get(&pid(0)), Some(&t1));
    }

    #[test]
    fn test_shared_readers() {
        let status = ConcurrentStatus::new();
        let t1 = Transaction::new();
        let t2 = Transaction::new();

        status.acquire_latch(&t1, &Lock::SLock, &pid(0)).unwrap();
        status.acquire_latch(&t2, &Lock::SLock, &pid(0)).unwrap();

        assert!(status.holds_latch(&t1, &pid(0)));
        assert!(status.holds_latch(&t2, &pid(0)));

        // an upgrade is not possible while another reader holds the page
        let mut inner = status.inner.lock().unwrap();
        assert!(!inner.add_latch(&t1, &Lock::XLock, &pid(0)));
    }

    #[test]
    fn test_writer_excludes() {
        let status = ConcurrentStatus::new();
        let t1 = Transaction::new();
        let t2 = Transaction::new();

        status.acquire_latch(&t1, &Lock::XLock, &pid(0)).unwrap();

        let mut inner = status.inner.lock().unwrap();
        assert!(!inner.add_latch(&t2, &Lock::SLock, &pid(0)));
        assert!(!inner.add_latch(&t2, &Lock::XLock, &pid(0)));
    }

    #[test]
    fn test_release_all() {
        let status = ConcurrentStatus::new();
        let t1 = Transaction::new();
        let t2 = Transaction::new();

        status.acquire_latch(&t1, &Lock::SLock, &pid(0)).unwrap();
        status.acquire_latch(&t1, &Lock::XLock, &pid(1)).unwrap();
        status.release_all(&t1);

        assert!(!status.holds_latch(&t1, &pid(0)));
        assert!(!status.holds_latch(&t1, &pid(1)));

        // both pages are free again
        status.acquire_latch(&t2, &Lock::XLock, &pid(0)).unwrap();
        status.acquire_latch(&t2, &Lock::XLock, &pid(1)).unwrap();
    }

    #[test]
    fn test_deadlock_detected() {
        let status = ConcurrentStatus::new();
        let t1 = Transaction::new();
        let t2 = Transaction::new();

        status.acquire_latch(&t1, &Lock::XLock, &pid(0)).unwrap();
        status.acquire_latch(&t2, &Lock::XLock, &pid(1)).unwrap();

        // t1 starts waiting for page 1
        {
            let mut inner = status.inner.lock().unwrap();
            assert!(!inner.add_latch(&t1, &Lock::XLock, &pid(1)));
            inner.update_wait_for_graph(&t1, &Lock::XLock, &pid(1));
        }

        // t2 now closes the cycle and must be aborted
        match status.acquire_latch(&t2, &Lock::XLock, &pid(0)) {
            Err(SmallError::TransactionAborted(_)) => {}
            other => panic!("unexpected result: {:?}", other.err()),
        }
    }
}
