//! Single-owner handle over an arena block.

use core::fmt;
use core::mem::size_of;
use core::ops::{Deref, DerefMut};
use core::ptr;

use crate::arena::{Block, TaggedArena};
use crate::tag::Tagged;
use crate::PoolError;

struct Owned<T> {
    block: Block<T>,
    arena: &'static TaggedArena,
}

/// Owning handle to one `T` living in a [`TaggedArena`].
///
/// Either empty or holding exactly one live, initialized value. Dropping or
/// [`reset`](Self::reset)ting a full handle runs `T`'s destructor and then
/// returns the block under `T::TAG`. The value's address never changes while
/// the handle owns it, even when the handle itself is moved.
///
/// Not `Clone`: there is never more than one owner.
pub struct PoolBox<T: Tagged> {
    slot: Option<Owned<T>>,
}

/// Failure of [`PoolBox::try_new_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitError<E> {
    /// No block could be obtained.
    Pool(PoolError),
    /// Block was obtained but the initializer failed; the block was freed.
    Init(E),
}

impl<E: fmt::Display> fmt::Display for InitError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pool(err) => write!(f, "allocation failed: {}", err),
            Self::Init(err) => write!(f, "initialization failed: {}", err),
        }
    }
}

impl<T: Tagged> PoolBox<T> {
    /// Handle that owns nothing.
    pub const fn empty() -> Self {
        Self { slot: None }
    }

    /// Move `value` into a fresh block. Hands the value back if the arena
    /// cannot supply one.
    pub fn try_new(arena: &'static TaggedArena, value: T) -> Result<Self, T> {
        match arena.try_allocate::<T>(size_of::<T>(), T::TAG) {
            Ok(block) => {
                // SAFETY: fresh, exclusively owned, correctly sized and aligned.
                unsafe { block.as_ptr().write(value) };
                Ok(Self { slot: Some(Owned { block, arena }) })
            }
            Err(_) => Err(value),
        }
    }

    /// Obtain a block first, then build the value and move it in. If `init`
    /// fails the block is released before returning.
    ///
    /// `init` returns the value by move, so it is built in the caller's
    /// frame before landing in the block.
    pub fn try_new_with<E>(
        arena: &'static TaggedArena,
        init: impl FnOnce() -> Result<T, E>,
    ) -> Result<Self, InitError<E>> {
        let block = arena
            .try_allocate::<T>(size_of::<T>(), T::TAG)
            .map_err(InitError::Pool)?;

        match init() {
            Ok(value) => {
                // SAFETY: fresh, exclusively owned, correctly sized and aligned.
                unsafe { block.as_ptr().write(value) };
                Ok(Self { slot: Some(Owned { block, arena }) })
            }
            Err(err) => {
                if let Err(pool_err) = arena.deallocate(Some(block), T::TAG) {
                    release_failed(T::TAG, pool_err);
                }
                Err(InitError::Init(err))
            }
        }
    }

    /// True when the handle owns nothing.
    pub fn is_empty(&self) -> bool {
        self.slot.is_none()
    }

    /// Shared access, or `None` when empty.
    pub fn get(&self) -> Option<&T> {
        // SAFETY: a full handle always points at an initialized, live value.
        self.slot.as_ref().map(|owned| unsafe { &*owned.block.as_ptr() })
    }

    /// Exclusive access, or `None` when empty.
    pub fn get_mut(&mut self) -> Option<&mut T> {
        // SAFETY: as for `get`, and `&mut self` guarantees exclusivity.
        self.slot.as_mut().map(|owned| unsafe { &mut *owned.block.as_ptr() })
    }

    /// Address of the owned value.
    pub fn address(&self) -> Option<usize> {
        self.slot.as_ref().map(|owned| owned.block.address())
    }

    /// Arena the value lives in.
    pub fn arena(&self) -> Option<&'static TaggedArena> {
        self.slot.as_ref().map(|owned| owned.arena)
    }

    /// Move ownership out, leaving this handle empty.
    pub fn take(&mut self) -> Self {
        Self { slot: self.slot.take() }
    }

    /// Destroy the value and release its block now. No-op when empty.
    pub fn reset(&mut self) {
        if let Some(owned) = self.slot.take() {
            // SAFETY: the value is initialized and this is its only owner;
            // the slot was taken, so it cannot be dropped again.
            unsafe { ptr::drop_in_place(owned.block.as_ptr()) };
            if let Err(err) = owned.arena.deallocate(Some(owned.block), T::TAG) {
                release_failed(T::TAG, err);
            }
        }
    }
}

/// A handle's own block failed validation on release: the arena's records
/// no longer match reality (double free or corruption). Not recoverable.
#[cold]
fn release_failed(tag: crate::PoolTag, err: PoolError) -> ! {
    log::error!("pool {}: release of owned block failed: {}", tag, err);
    panic!("pool {}: release of owned block failed: {}", tag, err);
}

#[cold]
fn empty_deref(tag: crate::PoolTag) -> ! {
    log::error!("pool {}: dereferenced an empty handle", tag);
    panic!("pool {}: dereferenced an empty handle", tag);
}

impl<T: Tagged> Drop for PoolBox<T> {
    fn drop(&mut self) {
        self.reset();
    }
}

impl<T: Tagged> Default for PoolBox<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: Tagged> Deref for PoolBox<T> {
    type Target = T;

    fn deref(&self) -> &T {
        match self.get() {
            Some(value) => value,
            None => empty_deref(T::TAG),
        }
    }
}

impl<T: Tagged> DerefMut for PoolBox<T> {
    fn deref_mut(&mut self) -> &mut T {
        match self.get_mut() {
            Some(value) => value,
            None => empty_deref(T::TAG),
        }
    }
}

impl<T: Tagged + fmt::Debug> fmt::Debug for PoolBox<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(value) => f.debug_tuple("PoolBox").field(value).finish(),
            None => f.write_str("PoolBox(<empty>)"),
        }
    }
}

// SAFETY: PoolBox owns its value exactly like Box does.
unsafe impl<T: Tagged + Send> Send for PoolBox<T> {}
unsafe impl<T: Tagged + Sync> Sync for PoolBox<T> {}
