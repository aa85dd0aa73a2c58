use std::collections::HashSet;

use crate::address::Address;

/// Addresses already handled during the current scan. Lives only as long as
/// one scan and is never persisted.
#[derive(Debug, Default)]
pub struct DedupTracker {
    seen: HashSet<Address>,
}

impl DedupTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seen(&self, addr: &Address) -> bool {
        self.seen.contains(addr)
    }

    pub fn mark_seen(&mut self, addr: Address) {
        self.seen.insert(addr);
    }

    /// Number of distinct addresses seen so far.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
