//! Host framework boundary.
//!
//! [`HostFramework`] is everything the driver calls out to. The inbound half
//! lives on [`DriverContext`](crate::DriverContext) as one method per
//! registered handler. A real build implements the trait over the host's
//! exported functions; tests implement it with a recording mock.

use bitflags::bitflags;

use crate::adapter::{GeneralAttributes, RegistrationAttributes};
use crate::config::DriverConfig;
use crate::types::{
    AdapterHandle, Ax25Address, DriverHandle, DriverObject, ErrorLogCode, InterfaceId,
    NdisStatus, NetBufferListId,
};

// ═══════════════════════════════════════════════════════════════════════════
// Outbound interface
// ═══════════════════════════════════════════════════════════════════════════

/// Calls from the driver into the host.
///
/// Methods that are only ever made at passive level are marked so; the rest
/// must be callable from the elevated level.
pub trait HostFramework {
    /// Register the driver and its handler table. Passive level, once.
    fn register_miniport_driver(
        &mut self,
        driver: DriverObject,
        registry_path: &str,
        characteristics: &MiniportDriverCharacteristics,
    ) -> Result<DriverHandle, NdisStatus>;

    /// Undo a successful registration. Passive level.
    fn deregister_miniport_driver(&mut self, handle: DriverHandle);

    /// Hand the host an adapter descriptor. Passive level, during
    /// initialize. The host reads the descriptor again later without
    /// notice, so it must stay unchanged while the adapter lives.
    fn set_miniport_attributes(
        &mut self,
        adapter: AdapterHandle,
        attributes: AdapterAttributes<'_>,
    ) -> NdisStatus;

    /// A pause that returned pending has finished. Any level.
    fn notify_pause_complete(&mut self, adapter: AdapterHandle);

    /// A restart that returned pending has finished. Any level.
    fn notify_restart_complete(&mut self, adapter: AdapterHandle, status: NdisStatus);

    /// Give sent buffer lists back to the host. Any level.
    fn send_complete(&mut self, adapter: AdapterHandle, list: NetBufferListId, status: NdisStatus);

    /// Pass received buffer lists up. Any level.
    fn indicate_receive(&mut self, adapter: AdapterHandle, list: NetBufferListId);

    /// Append an entry to the host's error log. Any level.
    fn write_error_log(&mut self, adapter: Option<AdapterHandle>, code: ErrorLogCode);
}

/// Descriptor passed to [`HostFramework::set_miniport_attributes`].
#[derive(Debug, Clone, Copy)]
pub enum AdapterAttributes<'a> {
    Registration(&'a RegistrationAttributes),
    General(&'a GeneralAttributes),
}

// ═══════════════════════════════════════════════════════════════════════════
// Registration
// ═══════════════════════════════════════════════════════════════════════════

bitflags! {
    /// Handlers the driver provides to the host.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MiniportHandlers: u32 {
        const INITIALIZE = 1 << 0;
        const HALT = 1 << 1;
        const UNLOAD = 1 << 2;
        const PAUSE = 1 << 3;
        const RESTART = 1 << 4;
        const OID_REQUEST = 1 << 5;
        const SEND_NET_BUFFER_LISTS = 1 << 6;
        const RETURN_NET_BUFFER_LISTS = 1 << 7;
        const CANCEL_SEND = 1 << 8;
        const CHECK_FOR_HANG = 1 << 9;
        const RESET = 1 << 10;
        const DEVICE_PNP_EVENT_NOTIFY = 1 << 11;
        const SHUTDOWN = 1 << 12;
        const CANCEL_OID_REQUEST = 1 << 13;
        const DIRECT_OID_REQUEST = 1 << 14;
        const CANCEL_DIRECT_OID_REQUEST = 1 << 15;
    }
}

impl MiniportHandlers {
    /// Handler set this driver registers. Direct OID requests are not taken.
    pub const PROVIDED: Self = Self::INITIALIZE
        .union(Self::HALT)
        .union(Self::UNLOAD)
        .union(Self::PAUSE)
        .union(Self::RESTART)
        .union(Self::OID_REQUEST)
        .union(Self::SEND_NET_BUFFER_LISTS)
        .union(Self::RETURN_NET_BUFFER_LISTS)
        .union(Self::CANCEL_SEND)
        .union(Self::CHECK_FOR_HANG)
        .union(Self::RESET)
        .union(Self::DEVICE_PNP_EVENT_NOTIFY)
        .union(Self::SHUTDOWN)
        .union(Self::CANCEL_OID_REQUEST);
}

/// Capability descriptor handed over at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MiniportDriverCharacteristics {
    pub ndis_version: (u8, u8),
    pub driver_version: (u8, u8),
    pub handlers: MiniportHandlers,
}

impl MiniportDriverCharacteristics {
    pub fn new(config: &DriverConfig) -> Self {
        Self {
            ndis_version: config.ndis_version,
            driver_version: config.driver_version,
            handlers: MiniportHandlers::PROVIDED,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Inbound parameters
// ═══════════════════════════════════════════════════════════════════════════

/// Parameters of an initialize request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitParameters {
    pub interface_index: InterfaceId,
    /// Administrator-configured address, if any.
    pub network_address: Option<Ax25Address>,
}

impl InitParameters {
    pub fn new(interface_index: InterfaceId) -> Self {
        Self { interface_index, network_address: None }
    }
}

/// Parameters of a restart request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RestartParameters {
    pub flags: u32,
}

/// Why the host is halting an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltAction {
    Unspecified,
    DeviceDisabled,
    DeviceInstanceRemoved,
    DevicePoweredDown,
    DeviceSurpriseRemoved,
    DevicePnpFailed,
}

/// Why the system is shutting down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownAction {
    Unspecified,
    PowerOff,
    BugCheck,
}

/// Plug-and-play notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PnpEvent {
    SurpriseRemoved,
    PowerProfileChanged,
    Other(u32),
}

bitflags! {
    /// Flags on a send request.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SendFlags: u32 {
        const DISPATCH_LEVEL = 0x0000_0001;
        const CHECK_FOR_LOOPBACK = 0x0000_0002;
    }
}

bitflags! {
    /// Flags on a return request.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ReturnFlags: u32 {
        const DISPATCH_LEVEL = 0x0000_0001;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provided_handlers() {
        let handlers = MiniportHandlers::PROVIDED;
        assert_eq!(handlers.bits().count_ones(), 14);
        assert!(handlers.contains(MiniportHandlers::UNLOAD | MiniportHandlers::CANCEL_OID_REQUEST));
        assert!(!handlers.intersects(
            MiniportHandlers::DIRECT_OID_REQUEST | MiniportHandlers::CANCEL_DIRECT_OID_REQUEST
        ));
    }

    #[test]
    fn test_characteristics_from_config() {
        let chars = MiniportDriverCharacteristics::new(&DriverConfig::default());
        assert_eq!(chars.ndis_version, (6, 20));
        assert_eq!(chars.driver_version, (0, 1));
        assert_eq!(chars.handlers, MiniportHandlers::PROVIDED);
    }
}
