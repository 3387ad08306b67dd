//! Shared data types module.
//!
//! Plain values that cross the host boundary: addresses, status codes and
//! opaque handles.

pub mod address;
pub mod ids;
pub mod status;

// Re-exports
pub use address::{AddressError, Ax25Address, AX25_ADDRESS_BITS, AX25_ADDRESS_LEN, CALLSIGN_LEN, MAX_SSID};
pub use ids::{AdapterHandle, DriverHandle, DriverObject, InterfaceId, NetBufferListId};
pub use status::{ErrorLogCode, NdisStatus};
