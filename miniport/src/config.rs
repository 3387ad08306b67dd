//! Driver and adapter configuration.
//!
//! Defaults describe a single VHF packet link. Per-adapter overrides come
//! from the host's initialize parameters.

use crate::error::{MiniportError, Result};
use crate::host::InitParameters;
use crate::types::Ax25Address;

// ═══════════════════════════════════════════════════════════════════════════
// DEFAULTS
// ═══════════════════════════════════════════════════════════════════════════

/// Size of each adapter's inbound and outbound buffer.
pub const BUFFER_SIZE: usize = 512;

/// Default MTU for an AX.25 link.
pub const DEFAULT_MTU: u32 = BUFFER_SIZE as u32;

/// Default link speed on VHF.
pub const DEFAULT_LINK_SPEED_BPS: u64 = 1200;

/// Fastest link this driver advertises.
pub const MAX_LINK_SPEED_BPS: u64 = 9600;

/// Multicast groups an adapter can join at once.
pub const MAX_MULTICAST_GROUPS: usize = 16;

/// Adapter slots per driver context.
pub const MAX_ADAPTERS: usize = 16;

/// Buffer lists an adapter holds per direction.
pub const MAX_IN_FLIGHT: usize = 16;

/// Seconds between host check-for-hang calls.
pub const DEFAULT_CHECK_FOR_HANG_SECS: u32 = 2;

/// Host interface version this driver is written against.
pub const NDIS_VERSION: (u8, u8) = (6, 20);

/// Driver version.
pub const DRIVER_VERSION: (u8, u8) = (0, 1);

// ═══════════════════════════════════════════════════════════════════════════
// CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════

/// Per-adapter settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterConfig {
    pub mtu: u32,
    pub xmit_link_speed: u64,
    pub rcv_link_speed: u64,
    pub max_xmit_link_speed: u64,
    pub max_rcv_link_speed: u64,
    /// Burned-in address. The current address starts out equal to it.
    pub permanent_address: Ax25Address,
    /// Address in use, after any override.
    pub current_address: Ax25Address,
    pub check_for_hang_secs: u32,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            mtu: DEFAULT_MTU,
            xmit_link_speed: DEFAULT_LINK_SPEED_BPS,
            rcv_link_speed: DEFAULT_LINK_SPEED_BPS,
            max_xmit_link_speed: MAX_LINK_SPEED_BPS,
            max_rcv_link_speed: MAX_LINK_SPEED_BPS,
            permanent_address: Ax25Address::DEFAULT,
            current_address: Ax25Address::DEFAULT,
            check_for_hang_secs: DEFAULT_CHECK_FOR_HANG_SECS,
        }
    }
}

impl AdapterConfig {
    /// Check every value is something an adapter can actually run with.
    pub fn validate(&self) -> Result<()> {
        if self.mtu == 0 || self.mtu as usize > BUFFER_SIZE {
            log::warn!("adapter config: MTU {} outside 1..={}", self.mtu, BUFFER_SIZE);
            return Err(MiniportError::InvalidConfig);
        }
        if self.xmit_link_speed == 0
            || self.rcv_link_speed == 0
            || self.xmit_link_speed > self.max_xmit_link_speed
            || self.rcv_link_speed > self.max_rcv_link_speed
        {
            log::warn!(
                "adapter config: link speed {}/{} exceeds {}/{}",
                self.xmit_link_speed,
                self.rcv_link_speed,
                self.max_xmit_link_speed,
                self.max_rcv_link_speed
            );
            return Err(MiniportError::InvalidConfig);
        }
        if self.permanent_address.is_unused() || self.current_address.is_unused() {
            log::warn!("adapter config: address must be set");
            return Err(MiniportError::InvalidConfig);
        }
        Ok(())
    }

    /// Apply the host's per-adapter overrides.
    pub fn with_overrides(mut self, params: &InitParameters) -> Self {
        if let Some(address) = params.network_address {
            self.current_address = address;
        }
        self
    }
}

/// Driver-wide settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverConfig {
    /// Template for every adapter.
    pub adapter: AdapterConfig,
    pub driver_version: (u8, u8),
    pub ndis_version: (u8, u8),
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            adapter: AdapterConfig::default(),
            driver_version: DRIVER_VERSION,
            ndis_version: NDIS_VERSION,
        }
    }
}

impl DriverConfig {
    pub fn validate(&self) -> Result<()> {
        if self.ndis_version.0 < 6 {
            log::warn!(
                "driver config: interface version {}.{} too old",
                self.ndis_version.0,
                self.ndis_version.1
            );
            return Err(MiniportError::InvalidConfig);
        }
        self.adapter.validate()
    }
}
