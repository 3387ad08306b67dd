//! System-wide "one active driver context" record.

use core::sync::atomic::{AtomicU32, Ordering};

use crate::error::{MiniportError, Result};

/// Id of the context currently receiving host callbacks; 0 when none.
static ACTIVE_CONTEXT: AtomicU32 = AtomicU32::new(0);

static NEXT_CONTEXT_ID: AtomicU32 = AtomicU32::new(1);

/// Proof that its holder is the active context. Releasing it clears the
/// record.
#[derive(Debug)]
pub(crate) struct ActiveClaim {
    id: u32,
}

impl ActiveClaim {
    /// Become the active context, unless another one already is. The
    /// existing record is never overwritten.
    pub(crate) fn acquire() -> Result<Self> {
        let id = NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed);
        match ACTIVE_CONTEXT.compare_exchange(0, id, Ordering::AcqRel, Ordering::Acquire) {
            Ok(_) => Ok(Self { id }),
            Err(current) => {
                log::error!(
                    "driver context {} refused: context {} is still active",
                    id,
                    current
                );
                Err(MiniportError::ContextAlreadyActive)
            }
        }
    }

    pub(crate) fn id(&self) -> u32 {
        self.id
    }
}

impl Drop for ActiveClaim {
    fn drop(&mut self) {
        if let Err(current) =
            ACTIVE_CONTEXT.compare_exchange(self.id, 0, Ordering::AcqRel, Ordering::Acquire)
        {
            // Leave the record alone; clearing someone else's would alias them.
            log::error!(
                "driver context {} released while context {} is recorded active",
                self.id,
                current
            );
        }
    }
}

/// Id of the active context, if there is one.
pub fn active_context_id() -> Option<u32> {
    match ACTIVE_CONTEXT.load(Ordering::Acquire) {
        0 => None,
        id => Some(id),
    }
}
