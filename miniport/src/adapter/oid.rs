//! Attribute (OID) query and set requests.
//!
//! # Reference
//! Values follow the host's general (`OID_GEN_*`) and 802.3 (`OID_802_3_*`)
//! object identifier tables. Addresses are seven bytes instead of six.

use super::attributes::PacketFilter;
use super::AdapterInstance;
use crate::config::MAX_MULTICAST_GROUPS;
use crate::error::{MiniportError, Result};
use crate::types::{Ax25Address, AX25_ADDRESS_LEN};

pub const OID_GEN_SUPPORTED_LIST: u32 = 0x0001_0101;
pub const OID_GEN_MAXIMUM_FRAME_SIZE: u32 = 0x0001_0106;
pub const OID_GEN_LINK_SPEED: u32 = 0x0001_0107;
pub const OID_GEN_CURRENT_PACKET_FILTER: u32 = 0x0001_010E;
pub const OID_GEN_MEDIA_CONNECT_STATUS: u32 = 0x0001_0114;
pub const OID_GEN_VLAN_ID: u32 = 0x0001_021C;
pub const OID_802_3_PERMANENT_ADDRESS: u32 = 0x0101_0101;
pub const OID_802_3_CURRENT_ADDRESS: u32 = 0x0101_0102;
pub const OID_802_3_MULTICAST_LIST: u32 = 0x0101_0103;
pub const OID_802_3_MAXIMUM_LIST_SIZE: u32 = 0x0101_0104;

/// OIDs every adapter answers.
pub static SUPPORTED_OIDS: &[u32] = &[
    OID_GEN_SUPPORTED_LIST,
    OID_GEN_MAXIMUM_FRAME_SIZE,
    OID_GEN_LINK_SPEED,
    OID_GEN_CURRENT_PACKET_FILTER,
    OID_GEN_MEDIA_CONNECT_STATUS,
    OID_GEN_VLAN_ID,
    OID_802_3_PERMANENT_ADDRESS,
    OID_802_3_CURRENT_ADDRESS,
    OID_802_3_MULTICAST_LIST,
    OID_802_3_MAXIMUM_LIST_SIZE,
];

/// Highest VLAN identifier.
pub const MAX_VLAN_ID: u32 = 4095;

/// Link speed is reported in units of 100 bit/s.
const LINK_SPEED_UNIT: u64 = 100;

/// Media connect status value for "connected".
const MEDIA_STATE_CONNECTED: u32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OidKind {
    Query,
    Set,
}

/// One attribute request.
///
/// For a query the adapter writes its answer into `buffer`; for a set it
/// reads the new value from it. `bytes_written` (or bytes read, for a set)
/// and `bytes_needed` are filled in either way.
#[derive(Debug)]
pub struct OidRequest<'a> {
    pub oid: u32,
    pub kind: OidKind,
    pub buffer: &'a mut [u8],
    pub bytes_written: usize,
    pub bytes_needed: usize,
}

impl<'a> OidRequest<'a> {
    pub fn query(oid: u32, buffer: &'a mut [u8]) -> Self {
        Self { oid, kind: OidKind::Query, buffer, bytes_written: 0, bytes_needed: 0 }
    }

    pub fn set(oid: u32, buffer: &'a mut [u8]) -> Self {
        Self { oid, kind: OidKind::Set, buffer, bytes_written: 0, bytes_needed: 0 }
    }

    fn answer(&mut self, bytes: &[u8]) -> Result<()> {
        self.bytes_needed = bytes.len();
        if self.buffer.len() < bytes.len() {
            return Err(MiniportError::BufferTooShort { needed: bytes.len() });
        }
        self.buffer[..bytes.len()].copy_from_slice(bytes);
        self.bytes_written = bytes.len();
        Ok(())
    }

    fn answer_u32(&mut self, value: u32) -> Result<()> {
        self.answer(&value.to_le_bytes())
    }

    /// Answer with a sequence of fixed-size items, refusing partial output.
    fn answer_items<const N: usize>(&mut self, items: impl ExactSizeIterator<Item = [u8; N]>) -> Result<()> {
        let needed = items.len() * N;
        self.bytes_needed = needed;
        if self.buffer.len() < needed {
            return Err(MiniportError::BufferTooShort { needed });
        }
        for (chunk, item) in self.buffer.chunks_exact_mut(N).zip(items) {
            chunk.copy_from_slice(&item);
        }
        self.bytes_written = needed;
        Ok(())
    }

    fn read_u32(&mut self) -> Result<u32> {
        self.bytes_needed = 4;
        let bytes: [u8; 4] = (&*self.buffer)
            .try_into()
            .map_err(|_| MiniportError::InvalidLength)?;
        self.bytes_written = 4;
        Ok(u32::from_le_bytes(bytes))
    }
}

impl AdapterInstance {
    /// Answer or apply an attribute request.
    pub fn oid_request(&mut self, request: &mut OidRequest<'_>) -> Result<()> {
        match request.kind {
            OidKind::Query => self.query(request),
            OidKind::Set => self.set(request),
        }
    }

    fn query(&self, request: &mut OidRequest<'_>) -> Result<()> {
        let general = &self.general;
        match request.oid {
            OID_GEN_SUPPORTED_LIST => {
                request.answer_items(general.supported_oids.iter().map(|oid| oid.to_le_bytes()))
            }
            OID_GEN_MAXIMUM_FRAME_SIZE => request.answer_u32(general.mtu),
            OID_GEN_LINK_SPEED => {
                let units = general.xmit_link_speed / LINK_SPEED_UNIT;
                request.answer_u32(u32::try_from(units).unwrap_or(u32::MAX))
            }
            OID_GEN_CURRENT_PACKET_FILTER => request.answer_u32(self.packet_filter.bits()),
            OID_GEN_MEDIA_CONNECT_STATUS => request.answer_u32(MEDIA_STATE_CONNECTED),
            OID_GEN_VLAN_ID => request.answer_u32(self.vlan_id),
            OID_802_3_PERMANENT_ADDRESS => request.answer(&general.permanent_address.to_bytes()),
            OID_802_3_CURRENT_ADDRESS => request.answer(&general.current_address.to_bytes()),
            OID_802_3_MULTICAST_LIST => {
                request.answer_items(self.multicast.groups().iter().map(|g| g.to_bytes()))
            }
            OID_802_3_MAXIMUM_LIST_SIZE => request.answer_u32(MAX_MULTICAST_GROUPS as u32),
            other => {
                log::debug!("adapter {}: query of unsupported OID {:#010x}", self.handle, other);
                Err(MiniportError::NotSupported)
            }
        }
    }

    fn set(&mut self, request: &mut OidRequest<'_>) -> Result<()> {
        match request.oid {
            OID_GEN_CURRENT_PACKET_FILTER => {
                let raw = request.read_u32()?;
                let filter = PacketFilter::from_bits(raw)
                    .filter(|f| PacketFilter::SUPPORTED.contains(*f))
                    .ok_or(MiniportError::NotSupported)?;
                log::debug!("adapter {}: packet filter {:?}", self.handle, filter);
                self.packet_filter = filter;
                Ok(())
            }
            OID_GEN_VLAN_ID => {
                let vlan = request.read_u32()?;
                if vlan > MAX_VLAN_ID {
                    return Err(MiniportError::InvalidData);
                }
                self.vlan_id = vlan;
                Ok(())
            }
            OID_802_3_MULTICAST_LIST => {
                if request.buffer.len() % AX25_ADDRESS_LEN != 0 {
                    request.bytes_needed = AX25_ADDRESS_LEN;
                    return Err(MiniportError::InvalidLength);
                }
                let count = request.buffer.len() / AX25_ADDRESS_LEN;
                if count > MAX_MULTICAST_GROUPS {
                    return Err(MiniportError::MulticastFull);
                }

                let mut groups = [Ax25Address::UNUSED; MAX_MULTICAST_GROUPS];
                for (slot, chunk) in groups.iter_mut().zip(request.buffer.chunks_exact(AX25_ADDRESS_LEN)) {
                    let mut bytes = [0u8; AX25_ADDRESS_LEN];
                    bytes.copy_from_slice(chunk);
                    *slot = Ax25Address::from_bytes(bytes);
                }
                self.multicast.replace(&groups[..count])?;
                request.bytes_written = request.buffer.len();
                Ok(())
            }
            other => {
                log::debug!("adapter {}: set of unsupported OID {:#010x}", self.handle, other);
                Err(MiniportError::NotSupported)
            }
        }
    }
}
