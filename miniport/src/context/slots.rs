//! Fixed table of adapter slots.
//!
//! The table is its own arena of indices: a slot's position is the adapter's
//! identity, and free slots are found by a lowest-index-first scan so reuse
//! order is deterministic.

use tagged_pool::PoolBox;

use crate::adapter::AdapterInstance;
use crate::config::MAX_ADAPTERS;
use crate::error::{MiniportError, Result};
use crate::types::{AdapterHandle, InterfaceId};

/// One table entry. In use exactly when it holds an instance.
#[derive(Default)]
pub struct AdapterSlot {
    instance: PoolBox<AdapterInstance>,
    interface: Option<InterfaceId>,
    generation: u32,
}

impl AdapterSlot {
    pub fn in_use(&self) -> bool {
        !self.instance.is_empty()
    }

    pub fn interface(&self) -> Option<InterfaceId> {
        self.interface
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn instance(&self) -> Option<&AdapterInstance> {
        self.instance.get()
    }
}

/// Slot table owned by a driver context.
pub struct SlotTable {
    slots: [AdapterSlot; MAX_ADAPTERS],
}

impl SlotTable {
    pub fn new() -> Self {
        Self { slots: core::array::from_fn(|_| AdapterSlot::default()) }
    }

    pub const fn capacity(&self) -> usize {
        MAX_ADAPTERS
    }

    pub fn in_use_count(&self) -> usize {
        self.slots.iter().filter(|s| s.in_use()).count()
    }

    pub fn slot(&self, index: usize) -> Option<&AdapterSlot> {
        self.slots.get(index)
    }

    /// Lowest-index free slot.
    pub fn first_free(&self) -> Option<usize> {
        self.slots.iter().position(|s| !s.in_use())
    }

    /// Slot holding the adapter for `interface`.
    pub fn find_by_interface(&self, interface: InterfaceId) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| s.in_use() && s.interface == Some(interface))
    }

    /// Handle the next occupant of `index` will get.
    pub fn next_handle(&self, index: usize) -> Option<AdapterHandle> {
        let slot = self.slots.get(index)?;
        Some(AdapterHandle::new(index as u8, slot.generation.wrapping_add(1)))
    }

    /// Index of the live slot `handle` names.
    pub fn resolve(&self, handle: AdapterHandle) -> Result<usize> {
        let slot = self.slots.get(handle.slot()).ok_or(MiniportError::InvalidHandle)?;
        if !slot.in_use() || slot.generation != handle.generation() {
            return Err(MiniportError::StaleAdapter);
        }
        Ok(handle.slot())
    }

    pub fn get(&self, handle: AdapterHandle) -> Result<&AdapterInstance> {
        let index = self.resolve(handle)?;
        self.slots[index].instance.get().ok_or(MiniportError::StaleAdapter)
    }

    pub fn get_mut(&mut self, handle: AdapterHandle) -> Result<&mut AdapterInstance> {
        let index = self.resolve(handle)?;
        self.slots[index].instance.get_mut().ok_or(MiniportError::StaleAdapter)
    }

    /// Move `instance` into the free slot `index`, advancing its generation.
    pub fn occupy(
        &mut self,
        index: usize,
        interface: InterfaceId,
        instance: PoolBox<AdapterInstance>,
    ) -> Result<AdapterHandle> {
        let slot = self.slots.get_mut(index).ok_or(MiniportError::InvalidHandle)?;
        if slot.in_use() {
            return Err(MiniportError::SlotsExhausted);
        }
        slot.generation = slot.generation.wrapping_add(1);
        slot.interface = Some(interface);
        slot.instance = instance;
        Ok(AdapterHandle::new(index as u8, slot.generation))
    }

    /// Empty slot `index`, handing back whatever it held.
    pub fn release(&mut self, index: usize) -> PoolBox<AdapterInstance> {
        match self.slots.get_mut(index) {
            Some(slot) => {
                slot.interface = None;
                slot.instance.take()
            }
            None => PoolBox::empty(),
        }
    }
}

impl Default for SlotTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdapterConfig;
    use std::boxed::Box;
    use std::vec;
    use tagged_pool::TaggedArena;

    fn arena() -> &'static TaggedArena {
        let region: &'static mut [u8] = Box::leak(vec![0u8; 64 * 1024].into_boxed_slice());
        Box::leak(Box::new(TaggedArena::new(region).unwrap()))
    }

    fn fill(table: &mut SlotTable, arena: &'static TaggedArena, interface: u32) -> AdapterHandle {
        let index = table.first_free().unwrap();
        let handle = table.next_handle(index).unwrap();
        let instance =
            AdapterInstance::create(arena, handle, InterfaceId(interface), &AdapterConfig::default())
                .unwrap();
        table.occupy(index, InterfaceId(interface), instance).unwrap()
    }

    #[test]
    fn test_empty_table() {
        let table = SlotTable::new();
        assert_eq!(table.in_use_count(), 0);
        assert_eq!(table.first_free(), Some(0));
        assert_eq!(table.capacity(), 16);
    }

    #[test]
    fn test_occupy_and_resolve() {
        let arena = arena();
        let mut table = SlotTable::new();
        let handle = fill(&mut table, arena, 5);
        assert_eq!(handle.slot(), 0);
        assert_eq!(handle.generation(), 1);
        assert_eq!(table.find_by_interface(InterfaceId(5)), Some(0));
        assert_eq!(table.get(handle).unwrap().interface(), InterfaceId(5));
        assert_eq!(table.first_free(), Some(1));
    }

    #[test]
    fn test_release_makes_handle_stale() {
        let arena = arena();
        let mut table = SlotTable::new();
        let handle = fill(&mut table, arena, 5);
        let released = table.release(handle.slot());
        assert!(!released.is_empty());
        drop(released);

        assert_eq!(table.resolve(handle), Err(MiniportError::StaleAdapter));
        assert_eq!(table.find_by_interface(InterfaceId(5)), None);

        let again = fill(&mut table, arena, 6);
        assert_eq!(again.slot(), 0);
        assert_ne!(again, handle);
        assert_eq!(table.resolve(handle), Err(MiniportError::StaleAdapter));
    }

    #[test]
    fn test_out_of_range_handle() {
        let table = SlotTable::new();
        assert_eq!(table.resolve(AdapterHandle::new(200, 1)), Err(MiniportError::InvalidHandle));
    }

    #[test]
    fn test_release_free_slot_is_empty() {
        let mut table = SlotTable::new();
        assert!(table.release(3).is_empty());
        assert!(table.release(99).is_empty());
    }
}
