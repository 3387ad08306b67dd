//! Buffer lists held by an adapter.

use crate::config::MAX_IN_FLIGHT;
use crate::types::NetBufferListId;

/// Fixed table of opaque buffer-list handles the adapter currently holds.
///
/// Lists are never looked inside; the table only answers "do we still owe
/// the host this one".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InFlightTable {
    entries: [Option<NetBufferListId>; MAX_IN_FLIGHT],
    count: usize,
}

impl InFlightTable {
    pub const fn new() -> Self {
        Self { entries: [None; MAX_IN_FLIGHT], count: 0 }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count == MAX_IN_FLIGHT
    }

    pub fn contains(&self, list: NetBufferListId) -> bool {
        self.entries.iter().any(|e| *e == Some(list))
    }

    /// Record a list. Returns false when the table is full or the list is
    /// already held.
    pub fn insert(&mut self, list: NetBufferListId) -> bool {
        if self.is_full() || self.contains(list) {
            return false;
        }
        match self.entries.iter_mut().find(|e| e.is_none()) {
            Some(entry) => {
                *entry = Some(list);
                self.count += 1;
                true
            }
            None => false,
        }
    }

    /// Forget a list. Returns false when it was not held.
    pub fn remove(&mut self, list: NetBufferListId) -> bool {
        match self.entries.iter_mut().find(|e| **e == Some(list)) {
            Some(entry) => {
                *entry = None;
                self.count -= 1;
                true
            }
            None => false,
        }
    }

    /// Take the next held list, if any.
    pub fn pop(&mut self) -> Option<NetBufferListId> {
        let list = self.entries.iter_mut().find_map(|e| e.take())?;
        self.count -= 1;
        Some(list)
    }
}

impl Default for InFlightTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_remove() {
        let mut table = InFlightTable::new();
        assert!(table.insert(NetBufferListId(1)));
        assert!(table.insert(NetBufferListId(2)));
        assert!(!table.insert(NetBufferListId(1)));
        assert_eq!(table.len(), 2);
        assert!(table.remove(NetBufferListId(1)));
        assert!(!table.remove(NetBufferListId(1)));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_full_table_refuses() {
        let mut table = InFlightTable::new();
        for i in 0..MAX_IN_FLIGHT as u64 {
            assert!(table.insert(NetBufferListId(i)));
        }
        assert!(table.is_full());
        assert!(!table.insert(NetBufferListId(999)));
    }

    #[test]
    fn test_pop_drains() {
        let mut table = InFlightTable::new();
        table.insert(NetBufferListId(7));
        table.insert(NetBufferListId(8));
        let mut drained = 0;
        while table.pop().is_some() {
            drained += 1;
        }
        assert_eq!(drained, 2);
        assert!(table.is_empty());
    }
}
