//! Opaque identifiers exchanged with the host.

use core::fmt;

/// Host-assigned interface index of an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InterfaceId(pub u32);

impl fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "if{}", self.0)
    }
}

/// Weak reference to an adapter, handed to the host in place of a pointer.
///
/// Resolved back to the owned instance on every callback. The generation
/// changes each time a slot is reused, so a handle that outlived its adapter
/// never resolves to the next occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AdapterHandle {
    slot: u8,
    generation: u32,
}

impl AdapterHandle {
    pub const fn new(slot: u8, generation: u32) -> Self {
        Self { slot, generation }
    }

    pub const fn slot(self) -> usize {
        self.slot as usize
    }

    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for AdapterHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot {}#{}", self.slot, self.generation)
    }
}

/// Opaque buffer-list handle. Never inspected, only held and returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NetBufferListId(pub u64);

/// Handle the host returns from driver registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DriverHandle(pub u64);

/// Host's object for the loaded driver image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DriverObject(pub u64);
