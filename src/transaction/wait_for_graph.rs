use std::collections::{HashMap, HashSet};

/// Wait-for graph over transaction ids. An edge `a -> b` means `a` is
/// waiting for a lock that `b` holds; a cycle means deadlock.
pub(crate) struct WaitForGraph {
    graph: HashMap<u64, HashSet<u64>>,
}

impl WaitForGraph {
    pub(crate) fn new() -> Self {
        Self {
            graph: HashMap::new(),
        }
    }

    pub(crate) fn add_edge(&mut self, from: u64, to: u64) {
        self.graph.entry(from).or_insert_with(HashSet::new).insert(to);
    }

    /// Drop every edge originating from the transaction, called once it
    /// stops waiting (granted, timed out, or aborted).
    pub(crate) fn remove_waiter(&mut self, tid: u64) {
        self.graph.remove(&tid);
    }

    pub(crate) fn exists_cycle(&self) -> bool {
        let mut visited = HashSet::new();
        let mut rec_stack = HashSet::new();

        for &tid in self.graph.keys() {
            if self.is_cyclic(tid, &mut visited, &mut rec_stack) {
                return true;
            }
        }

        false
    }

    fn is_cyclic(&self, tid: u64, visited: &mut HashSet<u64>, rec_stack: &mut HashSet<u64>) -> bool {
        if !visited.contains(&tid) {
            visited.insert(tid);
            rec_stack.insert(tid);

            if let Some(transactions) = self.graph.get(&tid) {
                for &t in transactions {
                    if !visited.contains(&t) && self.is_cyclic(t, visited, rec_stack) {
                        return true;
                    } else if rec_stack.contains(&t) {
                        return true;
                    }
                }
            }
        }

        rec_stack.remove(&tid);
        false
    }

    pub(crate) fn clear(&mut self) {
        self.graph.clear();
    }
}
