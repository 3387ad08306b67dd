//! Fixed-region arena with allocation tracking.
//!
//! # Block lifecycle
//! ```text
//!     FREE ──allocate()──> LIVE ──deallocate(tag)──> FREE
//!                           │
//!                           └── wrong tag / unknown address: stays LIVE,
//!                               error returned, nothing released
//! ```

use core::alloc::Layout;
use core::marker::PhantomData;
use core::ptr::NonNull;
use core::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use linked_list_allocator::Heap;
use spin::Mutex;

use crate::tag::PoolTag;
use crate::{PoolError, Result};

/// Maximum number of simultaneously live blocks per arena.
pub const MAX_BLOCKS: usize = 64;

/// Smallest backing region an arena will manage.
pub const MIN_REGION_SIZE: usize = 256;

static NEXT_ARENA_ID: AtomicU32 = AtomicU32::new(1);

// ============================================================================
// Allocation tracking
// ============================================================================

#[derive(Clone, Copy)]
struct BlockRecord {
    addr: usize,
    layout: Layout,
    tag: PoolTag,
    in_use: bool,
}

impl BlockRecord {
    const fn empty() -> Self {
        Self {
            addr: 0,
            layout: Layout::new::<u8>(),
            tag: PoolTag::from_raw(0),
            in_use: false,
        }
    }
}

struct ArenaInner {
    heap: Heap,
    records: [BlockRecord; MAX_BLOCKS],
    live_blocks: usize,
    live_bytes: usize,
}

// SAFETY: the heap only ever touches the 'static region it was built over,
// and all access goes through the arena's lock.
unsafe impl Send for ArenaInner {}

/// Snapshot of arena activity, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArenaStats {
    /// Successful allocations.
    pub allocations: usize,
    /// Successful releases.
    pub deallocations: usize,
    /// Allocation requests that returned nothing.
    pub failed_allocations: usize,
    /// Releases refused because the block failed validation.
    pub rejected_frees: usize,
    /// Blocks currently live.
    pub live_blocks: usize,
    /// Bytes currently live.
    pub live_bytes: usize,
}

// ============================================================================
// Block
// ============================================================================

/// A live allocation of exactly `size_of::<T>()` bytes.
///
/// Only [`TaggedArena::allocate`] makes these, and releasing one consumes
/// it, so a block cannot be freed twice through this type. The memory is
/// uninitialized until the owner writes it.
pub struct Block<T> {
    ptr: NonNull<T>,
    arena_id: u32,
    _owns: PhantomData<T>,
}

impl<T> Block<T> {
    /// Raw pointer to the (possibly uninitialized) storage.
    pub fn as_ptr(&self) -> *mut T {
        self.ptr.as_ptr()
    }

    /// Address of the block; stable for the block's lifetime.
    pub fn address(&self) -> usize {
        self.ptr.as_ptr() as usize
    }
}

// SAFETY: a block is a uniquely owned allocation, like a Box.
unsafe impl<T: Send> Send for Block<T> {}
unsafe impl<T: Sync> Sync for Block<T> {}

impl<T> core::fmt::Debug for Block<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Block")
            .field("address", &format_args!("{:#x}", self.address()))
            .field("arena", &self.arena_id)
            .finish()
    }
}

// ============================================================================
// TaggedArena
// ============================================================================

/// Non-relocatable, non-growing block arena.
pub struct TaggedArena {
    id: u32,
    base: usize,
    size: usize,
    inner: Mutex<ArenaInner>,
    allocations: AtomicUsize,
    deallocations: AtomicUsize,
    failed_allocations: AtomicUsize,
    rejected_frees: AtomicUsize,
}

impl TaggedArena {
    /// Build an arena over a region that lives for the rest of the program.
    pub fn new(region: &'static mut [u8]) -> Result<Self> {
        if region.len() < MIN_REGION_SIZE {
            return Err(PoolError::InvalidRegion);
        }

        let base = region.as_mut_ptr();
        let size = region.len();

        // SAFETY: the region is 'static and borrowed mutably for good, so the
        // heap is its only user and the memory never moves.
        let heap = unsafe { Heap::new(base, size) };

        let id = NEXT_ARENA_ID.fetch_add(1, Ordering::Relaxed);
        log::debug!("arena {}: {} bytes at {:#x}", id, size, base as usize);

        Ok(Self {
            id,
            base: base as usize,
            size,
            inner: Mutex::new(ArenaInner {
                heap,
                records: [BlockRecord::empty(); MAX_BLOCKS],
                live_blocks: 0,
                live_bytes: 0,
            }),
            allocations: AtomicUsize::new(0),
            deallocations: AtomicUsize::new(0),
            failed_allocations: AtomicUsize::new(0),
            rejected_frees: AtomicUsize::new(0),
        })
    }

    /// Arena identifier, unique per process.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Size of the backing region.
    pub fn capacity(&self) -> usize {
        self.size
    }

    /// Check whether an address lies inside the backing region.
    pub fn contains(&self, address: usize) -> bool {
        address >= self.base && address < self.base + self.size
    }

    /// Allocate a block for one `T`.
    ///
    /// `size` must equal `size_of::<T>()`; anything else is a caller bug and
    /// yields `None` without touching the region.
    pub fn allocate<T>(&self, size: usize, tag: PoolTag) -> Option<Block<T>> {
        self.try_allocate(size, tag).ok()
    }

    /// [`allocate`](Self::allocate), reporting why it failed.
    pub fn try_allocate<T>(&self, size: usize, tag: PoolTag) -> Result<Block<T>> {
        let expected = core::mem::size_of::<T>();
        if size != expected {
            log::error!(
                "pool {}: refusing allocation of {} bytes (expected {})",
                tag,
                size,
                expected
            );
            return Err(self.fail(PoolError::SizeMismatch { requested: size, expected }));
        }
        if size == 0 {
            log::error!("pool {}: refusing zero-sized allocation", tag);
            return Err(self.fail(PoolError::ZeroSize));
        }

        let layout = Layout::new::<T>();
        let mut inner = self.inner.lock();

        let Some(index) = inner.records.iter().position(|r| !r.in_use) else {
            drop(inner);
            log::error!("pool {}: block tracking table full", tag);
            return Err(self.fail(PoolError::TrackingFull));
        };

        let ptr = match inner.heap.allocate_first_fit(layout) {
            Ok(ptr) => ptr,
            Err(()) => {
                drop(inner);
                log::error!("pool {}: no room for {} bytes", tag, size);
                return Err(self.fail(PoolError::OutOfMemory));
            }
        };

        let addr = ptr.as_ptr() as usize;
        inner.records[index] = BlockRecord { addr, layout, tag, in_use: true };
        inner.live_blocks += 1;
        inner.live_bytes += size;
        drop(inner);

        self.allocations.fetch_add(1, Ordering::Relaxed);
        log::trace!("pool {}: allocated {} bytes at {:#x}", tag, size, addr);

        Ok(Block {
            ptr: ptr.cast(),
            arena_id: self.id,
            _owns: PhantomData,
        })
    }

    /// Release a block.
    ///
    /// `None` is a no-op. A block that fails validation (other arena, not
    /// live, wrong tag) is left allocated and the error returned; the
    /// region is never touched on that path.
    pub fn deallocate<T>(&self, block: Option<Block<T>>, tag: PoolTag) -> Result<()> {
        let Some(block) = block else {
            return Ok(());
        };

        if block.arena_id != self.id {
            log::error!(
                "pool {}: block {:#x} belongs to arena {}, not {}",
                tag,
                block.address(),
                block.arena_id,
                self.id
            );
            return Err(self.reject(PoolError::ForeignArena));
        }

        let addr = block.address();
        let mut inner = self.inner.lock();

        let Some(index) = inner.records.iter().position(|r| r.in_use && r.addr == addr) else {
            drop(inner);
            log::error!("pool {}: no live block at {:#x}", tag, addr);
            return Err(self.reject(PoolError::UnknownBlock { address: addr }));
        };

        let record = inner.records[index];
        if record.tag != tag {
            drop(inner);
            log::error!(
                "pool {}: block {:#x} was allocated as {}",
                tag,
                addr,
                record.tag
            );
            return Err(self.reject(PoolError::TagMismatch { expected: record.tag, found: tag }));
        }

        // SAFETY: the live record proves the pointer came from this heap with
        // exactly this layout and has not been released yet.
        unsafe {
            inner.heap.deallocate(block.ptr.cast(), record.layout);
        }
        inner.records[index] = BlockRecord::empty();
        inner.live_blocks -= 1;
        inner.live_bytes -= record.layout.size();
        drop(inner);

        self.deallocations.fetch_add(1, Ordering::Relaxed);
        log::trace!("pool {}: released {} bytes at {:#x}", tag, record.layout.size(), addr);
        Ok(())
    }

    /// Current counters.
    pub fn stats(&self) -> ArenaStats {
        let inner = self.inner.lock();
        ArenaStats {
            allocations: self.allocations.load(Ordering::Relaxed),
            deallocations: self.deallocations.load(Ordering::Relaxed),
            failed_allocations: self.failed_allocations.load(Ordering::Relaxed),
            rejected_frees: self.rejected_frees.load(Ordering::Relaxed),
            live_blocks: inner.live_blocks,
            live_bytes: inner.live_bytes,
        }
    }

    fn fail(&self, err: PoolError) -> PoolError {
        self.failed_allocations.fetch_add(1, Ordering::Relaxed);
        err
    }

    fn reject(&self, err: PoolError) -> PoolError {
        self.rejected_frees.fetch_add(1, Ordering::Relaxed);
        err
    }
}

impl core::fmt::Debug for TaggedArena {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TaggedArena")
            .field("id", &self.id)
            .field("base", &format_args!("{:#x}", self.base))
            .field("size", &self.size)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
