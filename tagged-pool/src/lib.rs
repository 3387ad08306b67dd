//! Tagged, non-relocatable memory arena.
//!
//! Every long-lived driver object lives in memory the host framework may
//! dereference at any time, from any execution level. That memory must never
//! move and never be paged out, so objects are carved out of a fixed region
//! handed to a [`TaggedArena`] once at load time.
//!
//! # Design
//!
//! - **Exact-size allocations**: a request whose size differs from the
//!   declared type size is refused outright, never rounded.
//! - **Tagged**: each block records a 4-byte [`PoolTag`] for leak and
//!   corruption tracing; frees are checked against it.
//! - **Single owner**: [`PoolBox`] destroys then frees its block exactly once.
//! - **Non-blocking**: bookkeeping sits behind a short spin lock, so every
//!   path here is usable at the elevated execution level.
//!
//! # Usage
//!
//! ```ignore
//! use tagged_pool::{PoolBox, PoolTag, Tagged, TaggedArena};
//!
//! struct Counter(u32);
//! impl Tagged for Counter {
//!     const TAG: PoolTag = PoolTag::new(b"axCT");
//! }
//!
//! static mut REGION: [u8; 64 * 1024] = [0; 64 * 1024];
//! let arena: &'static TaggedArena = /* leaked or static */;
//! let counter = PoolBox::try_new(arena, Counter(0)).ok()?;
//! ```

#![no_std]

#[cfg(test)]
extern crate std;

mod arena;
mod boxed;
mod tag;

pub use arena::{ArenaStats, Block, TaggedArena, MAX_BLOCKS, MIN_REGION_SIZE};
pub use boxed::{InitError, PoolBox};
pub use tag::{PoolTag, Tagged, GENERIC_TAG};

use core::fmt;

// ============================================================================
// Error types
// ============================================================================

/// Arena errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    /// Requested size differs from the declared type size.
    SizeMismatch {
        /// Size the caller asked for.
        requested: usize,
        /// Size of the type being allocated.
        expected: usize,
    },
    /// Zero-sized types have no storage to pin.
    ZeroSize,
    /// Backing region has no hole large enough.
    OutOfMemory,
    /// Block tracking table is full.
    TrackingFull,
    /// Backing region is too small to manage.
    InvalidRegion,
    /// Block is not live in this arena (double free or forged address).
    UnknownBlock {
        /// Address that was presented for release.
        address: usize,
    },
    /// Free was presented with a different tag than the allocation.
    TagMismatch {
        /// Tag recorded at allocation time.
        expected: PoolTag,
        /// Tag presented at release time.
        found: PoolTag,
    },
    /// Block belongs to a different arena.
    ForeignArena,
}

impl PoolError {
    /// True for failures that mean the caller should retry later.
    pub fn is_exhaustion(&self) -> bool {
        matches!(self, Self::OutOfMemory | Self::TrackingFull)
    }
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SizeMismatch { requested, expected } => {
                write!(f, "invalid allocation size {} (expected {})", requested, expected)
            }
            Self::ZeroSize => write!(f, "zero-sized allocation"),
            Self::OutOfMemory => write!(f, "arena out of memory"),
            Self::TrackingFull => write!(f, "block tracking table full"),
            Self::InvalidRegion => write!(f, "backing region too small"),
            Self::UnknownBlock { address } => write!(f, "no live block at {:#x}", address),
            Self::TagMismatch { expected, found } => {
                write!(f, "tag mismatch: block is {} but freed as {}", expected, found)
            }
            Self::ForeignArena => write!(f, "block belongs to another arena"),
        }
    }
}

/// Result type for arena operations.
pub type Result<T> = core::result::Result<T, PoolError>;
