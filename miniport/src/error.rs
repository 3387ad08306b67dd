//! Miniport error types

use core::fmt;

use tagged_pool::PoolError;

use crate::adapter::AdapterState;
use crate::types::{AdapterHandle, DriverHandle, NdisStatus};

pub type Result<T> = core::result::Result<T, MiniportError>;

/// Broad classes of failure, used to decide how loudly to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Out of slots or memory. Caller may retry later.
    ResourceExhaustion,
    /// Caller handed in something invalid. Nothing was changed.
    Precondition,
    /// This layer's own bookkeeping disagrees with reality.
    Consistency,
    /// Request is outside what this driver does.
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiniportError {
    /// All adapter slots are occupied.
    SlotsExhausted,
    /// Arena could not supply memory.
    OutOfMemory,
    /// Arena rejected a request for a reason other than exhaustion. Its
    /// records disagree with the caller; retrying will not help.
    Arena(PoolError),
    /// Handle does not name a slot.
    InvalidHandle,
    /// Handle names a slot whose adapter has since been halted.
    StaleAdapter,
    /// Operation needs a registered driver.
    NotRegistered,
    /// Driver is already registered with the host.
    AlreadyRegistered,
    /// Host presented a registration handle other than the one it issued.
    RegistrationMismatch {
        expected: DriverHandle,
        found: DriverHandle,
    },
    /// Transition not allowed from the adapter's current state.
    InvalidState {
        state: AdapterState,
        operation: &'static str,
    },
    /// Another driver context is already the active one.
    ContextAlreadyActive,
    /// An adapter for this interface index already exists.
    InterfaceInUse,
    /// Request outside this driver's scope.
    NotSupported,
    /// Host refused a driver or adapter registration.
    Registration(NdisStatus),
    /// Configuration values out of range.
    InvalidConfig,
    /// Request buffer has the wrong length.
    InvalidLength,
    /// Request buffer too small for the answer.
    BufferTooShort {
        /// Bytes the answer needs.
        needed: usize,
    },
    /// Request carries a value this adapter cannot accept.
    InvalidData,
    /// Multicast list longer than the adapter supports.
    MulticastFull,
    /// Buffer list is not held by this adapter.
    UnknownBufferList,
}

impl MiniportError {
    /// Taxonomy class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SlotsExhausted | Self::OutOfMemory => ErrorKind::ResourceExhaustion,
            Self::Arena(_) | Self::ContextAlreadyActive | Self::UnknownBufferList => {
                ErrorKind::Consistency
            }
            Self::NotSupported => ErrorKind::Unsupported,
            Self::InvalidHandle
            | Self::StaleAdapter
            | Self::NotRegistered
            | Self::AlreadyRegistered
            | Self::RegistrationMismatch { .. }
            | Self::InvalidState { .. }
            | Self::InterfaceInUse
            | Self::Registration(_)
            | Self::InvalidConfig
            | Self::InvalidLength
            | Self::BufferTooShort { .. }
            | Self::InvalidData
            | Self::MulticastFull => ErrorKind::Precondition,
        }
    }

    /// Status reported to the host for this error.
    pub fn status(&self) -> NdisStatus {
        match self {
            Self::SlotsExhausted | Self::OutOfMemory => NdisStatus::Resources,
            Self::Arena(_) => NdisStatus::Failure,
            Self::InvalidHandle => NdisStatus::InvalidParameter,
            Self::StaleAdapter => NdisStatus::AdapterNotReady,
            Self::NotRegistered => NdisStatus::AdapterNotFound,
            Self::AlreadyRegistered | Self::ContextAlreadyActive => NdisStatus::Failure,
            Self::RegistrationMismatch { .. } => NdisStatus::InvalidParameter,
            Self::InvalidState { .. } => NdisStatus::Failure,
            Self::InterfaceInUse => NdisStatus::InvalidParameter,
            Self::NotSupported => NdisStatus::NotSupported,
            Self::Registration(status) => *status,
            Self::InvalidConfig => NdisStatus::BadCharacteristics,
            Self::InvalidLength => NdisStatus::InvalidLength,
            Self::BufferTooShort { .. } => NdisStatus::BufferTooShort,
            Self::InvalidData => NdisStatus::InvalidData,
            Self::MulticastFull => NdisStatus::MulticastFull,
            Self::UnknownBufferList => NdisStatus::InvalidParameter,
        }
    }
}

impl From<PoolError> for MiniportError {
    fn from(err: PoolError) -> Self {
        if err.is_exhaustion() {
            Self::OutOfMemory
        } else {
            Self::Arena(err)
        }
    }
}

impl fmt::Display for MiniportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SlotsExhausted => write!(f, "All adapter slots in use"),
            Self::OutOfMemory => write!(f, "Out of memory"),
            Self::Arena(err) => write!(f, "Arena failure: {}", err),
            Self::InvalidHandle => write!(f, "Invalid adapter handle"),
            Self::StaleAdapter => write!(f, "Adapter has been halted"),
            Self::NotRegistered => write!(f, "Driver not registered"),
            Self::AlreadyRegistered => write!(f, "Driver already registered"),
            Self::RegistrationMismatch { expected, found } => {
                write!(f, "Registration handle {:?} does not match {:?}", found, expected)
            }
            Self::InvalidState { state, operation } => {
                write!(f, "Cannot {} adapter in state {:?}", operation, state)
            }
            Self::ContextAlreadyActive => write!(f, "Another driver context is active"),
            Self::InterfaceInUse => write!(f, "Interface already has an adapter"),
            Self::NotSupported => write!(f, "Operation not supported"),
            Self::Registration(status) => write!(f, "Host refused registration: {}", status),
            Self::InvalidConfig => write!(f, "Invalid configuration"),
            Self::InvalidLength => write!(f, "Invalid request length"),
            Self::BufferTooShort { needed } => write!(f, "Buffer too short, need {} bytes", needed),
            Self::InvalidData => write!(f, "Invalid request data"),
            Self::MulticastFull => write!(f, "Multicast list full"),
            Self::UnknownBufferList => write!(f, "Unknown buffer list"),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Non-recoverable conditions
// ═══════════════════════════════════════════════════════════════════════════

/// Conditions that stop the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BugCheck {
    /// Halt named an adapter that was already destroyed.
    HaltOfStaleAdapter(AdapterHandle),
    /// Halt named something that was never an adapter.
    HaltOfInvalidAdapter(AdapterHandle),
}

impl BugCheck {
    pub const fn code(&self) -> u32 {
        match self {
            Self::HaltOfStaleAdapter(_) => 0x0A25_0001,
            Self::HaltOfInvalidAdapter(_) => 0x0A25_0002,
        }
    }
}

impl fmt::Display for BugCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HaltOfStaleAdapter(handle) => write!(f, "halt of destroyed adapter ({})", handle),
            Self::HaltOfInvalidAdapter(handle) => write!(f, "halt of unknown adapter ({})", handle),
        }
    }
}

/// Stop the driver: log, then panic.
#[cold]
pub fn bug_check(check: BugCheck) -> ! {
    log::error!("BUG CHECK {:#010x}: {}", check.code(), check);
    panic!("bug check {:#010x}: {}", check.code(), check);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::string::ToString;

    #[test]
    fn test_exhaustion_vs_out_of_memory() {
        assert_eq!(MiniportError::SlotsExhausted.kind(), ErrorKind::ResourceExhaustion);
        assert_eq!(MiniportError::OutOfMemory.kind(), ErrorKind::ResourceExhaustion);
        assert_ne!(MiniportError::SlotsExhausted, MiniportError::OutOfMemory);
        assert_eq!(MiniportError::SlotsExhausted.status(), NdisStatus::Resources);
    }

    #[test]
    fn test_boundary_statuses() {
        assert_eq!(MiniportError::StaleAdapter.status(), NdisStatus::AdapterNotReady);
        assert_eq!(MiniportError::InvalidHandle.status(), NdisStatus::InvalidParameter);
        assert_eq!(MiniportError::NotSupported.status(), NdisStatus::NotSupported);
        assert_eq!(MiniportError::NotSupported.kind(), ErrorKind::Unsupported);
        assert_eq!(
            MiniportError::Registration(NdisStatus::BadCharacteristics).status(),
            NdisStatus::BadCharacteristics
        );
        let invalid = MiniportError::InvalidState { state: AdapterState::Paused, operation: "pause" };
        assert_eq!(invalid.kind(), ErrorKind::Precondition);
        assert_eq!(invalid.status(), NdisStatus::Failure);
    }

    #[test]
    fn test_pool_exhaustion_is_retryable() {
        for err in [PoolError::OutOfMemory, PoolError::TrackingFull] {
            let converted = MiniportError::from(err);
            assert_eq!(converted, MiniportError::OutOfMemory);
            assert_eq!(converted.kind(), ErrorKind::ResourceExhaustion);
            assert_eq!(converted.status(), NdisStatus::Resources);
        }
    }

    #[test]
    fn test_pool_corruption_is_consistency() {
        let tag = tagged_pool::PoolTag::new(b"axAX");
        let other = tagged_pool::PoolTag::new(b"axMP");
        for err in [
            PoolError::UnknownBlock { address: 0x1000 },
            PoolError::TagMismatch { expected: tag, found: other },
            PoolError::ForeignArena,
            PoolError::SizeMismatch { requested: 8, expected: 16 },
            PoolError::ZeroSize,
        ] {
            let converted = MiniportError::from(err);
            assert_eq!(converted, MiniportError::Arena(err));
            assert_eq!(converted.kind(), ErrorKind::Consistency);
            assert_eq!(converted.status(), NdisStatus::Failure);
        }
    }

    #[test]
    fn test_multicast_overflow_is_caller_fault() {
        assert_eq!(MiniportError::MulticastFull.kind(), ErrorKind::Precondition);
        assert_eq!(MiniportError::MulticastFull.status(), NdisStatus::MulticastFull);
    }

    #[test]
    fn test_registration_mismatch_is_precondition() {
        let err = MiniportError::RegistrationMismatch {
            expected: DriverHandle(1),
            found: DriverHandle(2),
        };
        assert_eq!(err.kind(), ErrorKind::Precondition);
        assert_eq!(err.status(), NdisStatus::InvalidParameter);
    }

    #[test]
    fn test_bug_check_codes() {
        let handle = AdapterHandle::new(2, 7);
        assert_eq!(BugCheck::HaltOfStaleAdapter(handle).code(), 0x0A25_0001);
        assert!(BugCheck::HaltOfInvalidAdapter(handle)
            .to_string()
            .starts_with("halt of unknown adapter"));
    }

    #[test]
    #[should_panic(expected = "halt of destroyed adapter")]
    fn test_bug_check_panics() {
        bug_check(BugCheck::HaltOfStaleAdapter(AdapterHandle::new(0, 1)));
    }
}
