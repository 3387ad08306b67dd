//! Host status vocabulary.

use core::fmt;

/// Status codes understood by the host framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum NdisStatus {
    Success = 0x0000_0000,
    /// Operation will complete later through a notification.
    Pending = 0x0000_0103,
    Failure = 0xC000_0001,
    InvalidParameter = 0xC000_000D,
    Resources = 0xC000_009A,
    NotSupported = 0xC000_00BB,
    BadCharacteristics = 0xC001_0005,
    AdapterNotFound = 0xC001_0006,
    MulticastFull = 0xC001_0009,
    AdapterNotReady = 0xC001_0011,
    InvalidLength = 0xC001_0014,
    InvalidData = 0xC001_0015,
    BufferTooShort = 0xC001_0016,
    InvalidOid = 0xC001_0017,
    /// Adapter is paused; data-path requests are refused.
    Paused = 0xC001_0029,
}

impl NdisStatus {
    /// Raw 32-bit code.
    pub const fn raw(self) -> u32 {
        self as u32
    }

    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    /// True for codes with the error severity bits set.
    pub const fn is_error(self) -> bool {
        self.raw() & 0xC000_0000 == 0xC000_0000
    }
}

impl fmt::Display for NdisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({:#010x})", self, self.raw())
    }
}

/// Entries the driver writes to the host's error log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorLogCode {
    /// Memory for an adapter could not be obtained.
    OutOfResources = 0x0000_0001,
    /// Every adapter slot is occupied.
    AdapterLimitReached = 0x0000_0002,
    /// Buffer lists were returned for an adapter that no longer exists.
    LeakBufferLists = 0x0000_1000,
}

impl ErrorLogCode {
    pub const fn raw(self) -> u32 {
        self as u32
    }
}
