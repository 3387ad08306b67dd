//! Virtual AX.25 Miniport
//!
//! Control plane of a virtual network adapter driver: one driver context
//! registered with the host network framework, a fixed table of adapter
//! slots, and a lifecycle state machine per adapter. Frame encoding and
//! radio I/O sit below this crate; buffer lists pass through it opaquely.
//!
//! Every long-lived object lives in a [`tagged_pool::TaggedArena`] so its
//! address stays fixed while the host holds references into it.

#![no_std]

#[cfg(test)]
extern crate std;

pub mod adapter;
pub mod config;
pub mod context;
pub mod entry;
pub mod error;
pub mod host;
pub mod irql;
pub mod types;

pub use adapter::{AdapterInstance, AdapterState, OidKind, OidRequest, PauseOutcome, RestartOutcome};
pub use config::{AdapterConfig, DriverConfig};
pub use context::{DriverContext, Registration};
pub use entry::driver_entry;
pub use error::{bug_check, BugCheck, ErrorKind, MiniportError, Result};
pub use host::{HostFramework, InitParameters, MiniportDriverCharacteristics, MiniportHandlers};
pub use irql::{Dispatch, ExecutionLevel, Passive};
pub use types::{
    AdapterHandle, Ax25Address, DriverHandle, DriverObject, ErrorLogCode, InterfaceId,
    NdisStatus, NetBufferListId,
};
