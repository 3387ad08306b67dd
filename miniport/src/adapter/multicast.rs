//! Joined multicast groups.

use crate::config::MAX_MULTICAST_GROUPS;
use crate::error::{MiniportError, Result};
use crate::types::Ax25Address;

/// Fixed table of joined groups. An unused entry holds
/// [`Ax25Address::UNUSED`]; used entries are packed at the front.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MulticastTable {
    groups: [Ax25Address; MAX_MULTICAST_GROUPS],
    count: usize,
}

impl MulticastTable {
    pub const fn new() -> Self {
        Self {
            groups: [Ax25Address::UNUSED; MAX_MULTICAST_GROUPS],
            count: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Joined groups in the order they were set.
    pub fn groups(&self) -> &[Ax25Address] {
        &self.groups[..self.count]
    }

    pub fn contains(&self, address: Ax25Address) -> bool {
        !address.is_unused() && self.groups().contains(&address)
    }

    /// Replace the whole list. On error the table is unchanged.
    pub fn replace(&mut self, groups: &[Ax25Address]) -> Result<()> {
        if groups.len() > MAX_MULTICAST_GROUPS {
            return Err(MiniportError::MulticastFull);
        }
        if groups.iter().any(|g| g.is_unused()) {
            return Err(MiniportError::InvalidData);
        }

        self.clear();
        self.groups[..groups.len()].copy_from_slice(groups);
        self.count = groups.len();
        Ok(())
    }

    fn clear(&mut self) {
        self.groups = [Ax25Address::UNUSED; MAX_MULTICAST_GROUPS];
        self.count = 0;
    }
}

impl Default for MulticastTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(n: u8) -> Ax25Address {
        Ax25Address::new("QST", n).unwrap()
    }

    #[test]
    fn test_starts_empty() {
        let table = MulticastTable::new();
        assert!(table.is_empty());
        assert!(!table.contains(Ax25Address::UNUSED));
    }

    #[test]
    fn test_replace_and_clear() {
        let mut table = MulticastTable::new();
        table.replace(&[group(1), group(2)]).unwrap();
        assert_eq!(table.len(), 2);
        assert!(table.contains(group(2)));
        table.replace(&[group(3)]).unwrap();
        assert_eq!(table.groups(), &[group(3)]);
        table.replace(&[]).unwrap();
        assert!(table.is_empty());
        assert!(!table.contains(group(3)));
    }

    #[test]
    fn test_overflow_leaves_table_unchanged() {
        let mut table = MulticastTable::new();
        table.replace(&[group(1)]).unwrap();
        let too_many = [group(0); MAX_MULTICAST_GROUPS + 1];
        assert_eq!(table.replace(&too_many), Err(MiniportError::MulticastFull));
        assert_eq!(table.groups(), &[group(1)]);
    }

    #[test]
    fn test_unused_entry_rejected() {
        let mut table = MulticastTable::new();
        assert_eq!(
            table.replace(&[group(1), Ax25Address::UNUSED]),
            Err(MiniportError::InvalidData)
        );
        assert!(table.is_empty());
    }
}
