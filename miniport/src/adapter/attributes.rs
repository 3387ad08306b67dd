//! Adapter descriptors read by the host.
//!
//! Both descriptors are filled once while the adapter initializes and then
//! left alone. The host keeps reading them for the adapter's lifetime
//! without being told about changes.

use bitflags::bitflags;

use super::oid::SUPPORTED_OIDS;
use crate::config::{AdapterConfig, MAX_MULTICAST_GROUPS};
use crate::types::{AdapterHandle, Ax25Address, AX25_ADDRESS_LEN};

bitflags! {
    /// Packet types the host may ask the adapter to deliver.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PacketFilter: u32 {
        const DIRECTED = 0x0000_0001;
        const MULTICAST = 0x0000_0002;
        const ALL_MULTICAST = 0x0000_0004;
        const BROADCAST = 0x0000_0008;
        const PROMISCUOUS = 0x0000_0020;
    }
}

impl PacketFilter {
    /// Filters this adapter can honour.
    pub const SUPPORTED: Self = Self::DIRECTED
        .union(Self::MULTICAST)
        .union(Self::ALL_MULTICAST)
        .union(Self::BROADCAST);
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MacOptions: u32 {
        const COPY_LOOKAHEAD_DATA = 0x0000_0001;
        const RECEIVE_SERIALIZED = 0x0000_0002;
        const TRANSFERS_NOT_PEND = 0x0000_0004;
        const NO_LOOPBACK = 0x0000_0008;
    }
}

bitflags! {
    /// Registration attribute flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct AttributeFlags: u32 {
        const HARDWARE_DEVICE = 0x0000_0001;
        const SURPRISE_REMOVE_OK = 0x0000_0004;
        const NO_HALT_ON_SUSPEND = 0x0000_0020;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Medium {
    Ieee8023,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhysicalMedium {
    Unspecified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectState {
    Unknown,
    Connected,
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplexState {
    Half,
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceType {
    /// No bus; the adapter is purely software.
    Internal,
}

/// General attributes of one adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneralAttributes {
    pub medium: Medium,
    pub physical_medium: PhysicalMedium,
    pub mtu: u32,
    pub max_xmit_link_speed: u64,
    pub xmit_link_speed: u64,
    pub max_rcv_link_speed: u64,
    pub rcv_link_speed: u64,
    pub media_connect_state: ConnectState,
    pub media_duplex_state: DuplexState,
    pub lookahead_size: u32,
    pub supported_packet_filters: PacketFilter,
    pub mac_options: MacOptions,
    pub max_multicast_list_size: u32,
    pub mac_address_length: u16,
    pub permanent_address: Ax25Address,
    pub current_address: Ax25Address,
    pub supported_oids: &'static [u32],
}

impl GeneralAttributes {
    pub fn new(config: &AdapterConfig) -> Self {
        Self {
            medium: Medium::Ieee8023,
            physical_medium: PhysicalMedium::Unspecified,
            mtu: config.mtu,
            max_xmit_link_speed: config.max_xmit_link_speed,
            xmit_link_speed: config.xmit_link_speed,
            max_rcv_link_speed: config.max_rcv_link_speed,
            rcv_link_speed: config.rcv_link_speed,
            media_connect_state: ConnectState::Connected,
            media_duplex_state: DuplexState::Half,
            lookahead_size: config.mtu,
            supported_packet_filters: PacketFilter::SUPPORTED,
            mac_options: MacOptions::COPY_LOOKAHEAD_DATA | MacOptions::NO_LOOPBACK,
            max_multicast_list_size: MAX_MULTICAST_GROUPS as u32,
            mac_address_length: AX25_ADDRESS_LEN as u16,
            permanent_address: config.permanent_address,
            current_address: config.current_address,
            supported_oids: SUPPORTED_OIDS,
        }
    }
}

/// Registration attributes of one adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrationAttributes {
    pub adapter: AdapterHandle,
    pub check_for_hang_secs: u32,
    pub interface_type: InterfaceType,
    pub flags: AttributeFlags,
}

impl RegistrationAttributes {
    pub fn new(adapter: AdapterHandle, config: &AdapterConfig) -> Self {
        Self {
            adapter,
            check_for_hang_secs: config.check_for_hang_secs,
            interface_type: InterfaceType::Internal,
            flags: AttributeFlags::SURPRISE_REMOVE_OK | AttributeFlags::NO_HALT_ON_SUSPEND,
        }
    }
}
