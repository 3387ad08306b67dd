//! One virtual adapter.
//!
//! An [`AdapterInstance`] always lives in a [`TaggedArena`] behind a
//! [`PoolBox`]: the host reads its descriptors at any time between
//! initialize and halt, so it must never move.
//!
//! # Concurrency
//!
//! The host serializes lifecycle callbacks per adapter. Nothing here locks;
//! callers hold `&mut` only for the duration of one callback.

pub mod attributes;
pub mod inflight;
pub mod multicast;
pub mod oid;
pub mod state;

pub use attributes::{
    AttributeFlags, ConnectState, DuplexState, GeneralAttributes, InterfaceType, MacOptions,
    Medium, PacketFilter, PhysicalMedium, RegistrationAttributes,
};
pub use inflight::InFlightTable;
pub use multicast::MulticastTable;
pub use oid::{OidKind, OidRequest, SUPPORTED_OIDS};
pub use state::{AdapterState, StateEvent};

use tagged_pool::{InitError, PoolBox, PoolTag, Tagged, TaggedArena};

use crate::config::{AdapterConfig, BUFFER_SIZE};
use crate::error::{MiniportError, Result};
use crate::host::RestartParameters;
use crate::types::{AdapterHandle, Ax25Address, InterfaceId, NdisStatus, NetBufferListId};

/// Result of a pause request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseOutcome {
    /// Adapter is paused now.
    Completed,
    /// Work is still outstanding. The adapter finishes pausing when the
    /// last of it drains, and the host is notified then.
    Pending,
}

/// Result of a restart request.
///
/// Restart currently always finishes synchronously. An asynchronous
/// restart (waiting for the radio link) would add a pending variant here,
/// completed later through `HostFramework::notify_restart_complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum RestartOutcome {
    Completed,
}

/// Per-adapter state, buffers and descriptors.
pub struct AdapterInstance {
    handle: AdapterHandle,
    interface: InterfaceId,
    state: AdapterState,
    vlan_id: u32,
    packet_filter: PacketFilter,
    multicast: MulticastTable,
    inbound: [u8; BUFFER_SIZE],
    outbound: [u8; BUFFER_SIZE],
    general: GeneralAttributes,
    registration: RegistrationAttributes,
    sends: InFlightTable,
    receives: InFlightTable,
}

impl Tagged for AdapterInstance {
    const TAG: PoolTag = PoolTag::new(b"axAX");
}

impl AdapterInstance {
    /// Build an adapter in the arena and take it through first-stage setup.
    ///
    /// Runs at passive level. The returned adapter is `Paused`. Fails with
    /// [`MiniportError::OutOfMemory`] when the arena is exhausted, which the
    /// caller should treat as a transient resource shortage; any other arena
    /// refusal comes back as [`MiniportError::Arena`].
    pub fn create(
        arena: &'static TaggedArena,
        handle: AdapterHandle,
        interface: InterfaceId,
        config: &AdapterConfig,
    ) -> Result<PoolBox<Self>> {
        let mut adapter = PoolBox::try_new_with(arena, || {
            config.validate()?;
            Ok::<_, MiniportError>(Self::new(handle, interface, config))
        })
        .map_err(|err| match err {
            InitError::Pool(pool) => {
                log::error!("adapter {}: no block for {}: {}", handle, interface, pool);
                MiniportError::from(pool)
            }
            InitError::Init(err) => err,
        })?;

        adapter.transition(StateEvent::InitComplete, "initialize")?;
        log::info!(
            "adapter {}: created for {} as {}",
            handle,
            interface,
            adapter.general.current_address
        );
        Ok(adapter)
    }

    fn new(handle: AdapterHandle, interface: InterfaceId, config: &AdapterConfig) -> Self {
        Self {
            handle,
            interface,
            state: AdapterState::Initializing,
            vlan_id: 0,
            packet_filter: PacketFilter::empty(),
            multicast: MulticastTable::new(),
            inbound: [0; BUFFER_SIZE],
            outbound: [0; BUFFER_SIZE],
            general: GeneralAttributes::new(config),
            registration: RegistrationAttributes::new(handle, config),
            sends: InFlightTable::new(),
            receives: InFlightTable::new(),
        }
    }

    fn transition(&mut self, event: StateEvent, operation: &'static str) -> Result<AdapterState> {
        match self.state.next(event) {
            Some(next) => {
                debug_assert!(next.is_live());
                log::debug!("adapter {}: {:?} -> {:?}", self.handle, self.state, next);
                self.state = next;
                Ok(next)
            }
            None => {
                log::warn!(
                    "adapter {}: cannot {} while {:?}",
                    self.handle,
                    operation,
                    self.state
                );
                Err(MiniportError::InvalidState { state: self.state, operation })
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Accessors
    // ═══════════════════════════════════════════════════════════════════════

    pub fn handle(&self) -> AdapterHandle {
        self.handle
    }

    pub fn interface(&self) -> InterfaceId {
        self.interface
    }

    pub fn state(&self) -> AdapterState {
        self.state
    }

    pub fn mtu(&self) -> u32 {
        self.general.mtu
    }

    pub fn vlan_id(&self) -> u32 {
        self.vlan_id
    }

    pub fn packet_filter(&self) -> PacketFilter {
        self.packet_filter
    }

    pub fn multicast_groups(&self) -> &[Ax25Address] {
        self.multicast.groups()
    }

    pub fn current_address(&self) -> Ax25Address {
        self.general.current_address
    }

    pub fn general_attributes(&self) -> &GeneralAttributes {
        &self.general
    }

    pub fn registration_attributes(&self) -> &RegistrationAttributes {
        &self.registration
    }

    /// Frame staging area for traffic from the radio.
    pub fn inbound_buffer(&mut self) -> &mut [u8; BUFFER_SIZE] {
        &mut self.inbound
    }

    /// Frame staging area for traffic to the radio.
    pub fn outbound_buffer(&mut self) -> &mut [u8; BUFFER_SIZE] {
        &mut self.outbound
    }

    /// Buffer lists still owed to the host in either direction.
    pub fn outstanding(&self) -> usize {
        self.sends.len() + self.receives.len()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Lifecycle
    // ═══════════════════════════════════════════════════════════════════════

    /// Stop traffic. Passive level, only from `Running`.
    pub fn pause(&mut self) -> Result<PauseOutcome> {
        let busy = self.outstanding() > 0;
        match self.transition(StateEvent::Pause { busy }, "pause")? {
            AdapterState::Pausing => {
                log::info!(
                    "adapter {}: pause pending on {} buffer lists",
                    self.handle,
                    self.outstanding()
                );
                Ok(PauseOutcome::Pending)
            }
            _ => {
                log::info!("adapter {}: paused", self.handle);
                Ok(PauseOutcome::Completed)
            }
        }
    }

    /// Resume traffic. Passive level, only from `Paused`.
    pub fn restart(&mut self, params: &RestartParameters) -> Result<RestartOutcome> {
        self.transition(StateEvent::Restart, "restart")?;
        log::trace!("adapter {}: restart flags {:#x}", self.handle, params.flags);
        self.transition(StateEvent::RestartComplete, "restart")?;
        log::info!("adapter {}: running", self.handle);
        Ok(RestartOutcome::Completed)
    }

    fn settle_pause(&mut self) -> bool {
        if self.state == AdapterState::Pausing && self.outstanding() == 0 {
            self.transition(StateEvent::PauseComplete, "complete pause").is_ok()
        } else {
            false
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Data path bookkeeping
    // ═══════════════════════════════════════════════════════════════════════

    /// Accept a buffer list for transmission. Any level.
    ///
    /// On refusal the status to complete the list back with is returned.
    pub fn send(&mut self, list: NetBufferListId) -> core::result::Result<(), NdisStatus> {
        if !self.state.accepts_traffic() {
            return Err(NdisStatus::Paused);
        }
        if !self.sends.insert(list) {
            return Err(NdisStatus::Resources);
        }
        Ok(())
    }

    /// Radio finished with a send. Returns true when this completion
    /// finished a pending pause, which happens exactly once per pause.
    pub fn complete_transmit(&mut self, list: NetBufferListId) -> Result<bool> {
        if !self.sends.remove(list) {
            return Err(MiniportError::UnknownBufferList);
        }
        Ok(self.settle_pause())
    }

    /// Record a received buffer list before indicating it. Any level.
    pub fn indicate_receive(&mut self, list: NetBufferListId) -> core::result::Result<(), NdisStatus> {
        if !self.state.accepts_traffic() {
            return Err(NdisStatus::Paused);
        }
        if !self.receives.insert(list) {
            return Err(NdisStatus::Resources);
        }
        Ok(())
    }

    /// Host gave back a received list. Same pause semantics as
    /// [`complete_transmit`](Self::complete_transmit).
    pub fn return_receive(&mut self, list: NetBufferListId) -> Result<bool> {
        if !self.receives.remove(list) {
            return Err(MiniportError::UnknownBufferList);
        }
        Ok(self.settle_pause())
    }

    /// Hand back one held send without transmitting it.
    pub fn take_pending_send(&mut self) -> Option<NetBufferListId> {
        let list = self.sends.pop()?;
        self.settle_pause();
        Some(list)
    }
}

impl Drop for AdapterInstance {
    fn drop(&mut self) {
        if self.outstanding() > 0 {
            log::warn!(
                "adapter {}: destroyed holding {} sends and {} receives",
                self.handle,
                self.sends.len(),
                self.receives.len()
            );
        }
        log::info!("adapter {}: destroyed in state {:?}", self.handle, self.state);
    }
}

impl core::fmt::Debug for AdapterInstance {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AdapterInstance")
            .field("handle", &self.handle)
            .field("interface", &self.interface)
            .field("state", &self.state)
            .field("outstanding", &self.outstanding())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::oid::*;
    use std::boxed::Box;
    use std::vec;

    fn arena() -> &'static TaggedArena {
        let region: &'static mut [u8] = Box::leak(vec![0u8; 32 * 1024].into_boxed_slice());
        Box::leak(Box::new(TaggedArena::new(region).unwrap()))
    }

    fn adapter() -> PoolBox<AdapterInstance> {
        AdapterInstance::create(
            arena(),
            AdapterHandle::new(0, 1),
            InterfaceId(5),
            &AdapterConfig::default(),
        )
        .unwrap()
    }

    fn running() -> PoolBox<AdapterInstance> {
        let mut adapter = adapter();
        adapter.restart(&RestartParameters::default()).unwrap();
        adapter
    }

    #[test]
    fn test_create_lands_paused() {
        let adapter = adapter();
        assert_eq!(adapter.state(), AdapterState::Paused);
        assert_eq!(adapter.vlan_id(), 0);
        assert!(adapter.packet_filter().is_empty());
        assert!(adapter.multicast_groups().is_empty());
        assert_eq!(adapter.mtu(), 512);
    }

    #[test]
    fn test_create_rejects_bad_config() {
        let mut config = AdapterConfig::default();
        config.mtu = 4096;
        let result = AdapterInstance::create(arena(), AdapterHandle::new(0, 1), InterfaceId(1), &config);
        assert_eq!(result.err(), Some(MiniportError::InvalidConfig));
    }

    #[test]
    fn test_create_out_of_memory() {
        let region: &'static mut [u8] = Box::leak(vec![0u8; 512].into_boxed_slice());
        let tiny = Box::leak(Box::new(TaggedArena::new(region).unwrap()));
        let result =
            AdapterInstance::create(tiny, AdapterHandle::new(0, 1), InterfaceId(1), &AdapterConfig::default());
        assert_eq!(result.err(), Some(MiniportError::OutOfMemory));
        assert_eq!(tiny.stats().live_blocks, 0);
    }

    #[test]
    fn test_pause_rejected_when_paused() {
        let mut adapter = adapter();
        let err = adapter.pause().unwrap_err();
        assert_eq!(err, MiniportError::InvalidState { state: AdapterState::Paused, operation: "pause" });
        assert_eq!(adapter.state(), AdapterState::Paused);
    }

    #[test]
    fn test_restart_rejected_when_running() {
        let mut adapter = running();
        assert!(adapter.restart(&RestartParameters::default()).is_err());
        assert_eq!(adapter.state(), AdapterState::Running);
    }

    #[test]
    fn test_idle_pause_completes() {
        let mut adapter = running();
        assert_eq!(adapter.pause().unwrap(), PauseOutcome::Completed);
        assert_eq!(adapter.state(), AdapterState::Paused);
    }

    #[test]
    fn test_busy_pause_completes_once() {
        let mut adapter = running();
        adapter.send(NetBufferListId(1)).unwrap();
        adapter.indicate_receive(NetBufferListId(2)).unwrap();

        assert_eq!(adapter.pause().unwrap(), PauseOutcome::Pending);
        assert_eq!(adapter.state(), AdapterState::Pausing);
        assert_eq!(adapter.send(NetBufferListId(3)), Err(NdisStatus::Paused));

        assert!(!adapter.complete_transmit(NetBufferListId(1)).unwrap());
        assert_eq!(adapter.state(), AdapterState::Pausing);
        assert!(adapter.return_receive(NetBufferListId(2)).unwrap());
        assert_eq!(adapter.state(), AdapterState::Paused);

        assert_eq!(
            adapter.complete_transmit(NetBufferListId(1)),
            Err(MiniportError::UnknownBufferList)
        );
    }

    #[test]
    fn test_send_refused_while_paused() {
        let mut adapter = adapter();
        assert_eq!(adapter.send(NetBufferListId(1)), Err(NdisStatus::Paused));
        assert_eq!(adapter.indicate_receive(NetBufferListId(1)), Err(NdisStatus::Paused));
    }

    #[test]
    fn test_send_refused_when_full() {
        let mut adapter = running();
        for i in 0..crate::config::MAX_IN_FLIGHT as u64 {
            adapter.send(NetBufferListId(i)).unwrap();
        }
        assert_eq!(adapter.send(NetBufferListId(100)), Err(NdisStatus::Resources));
    }

    #[test]
    fn test_take_pending_send_settles_pause() {
        let mut adapter = running();
        adapter.send(NetBufferListId(9)).unwrap();
        assert_eq!(adapter.pause().unwrap(), PauseOutcome::Pending);
        assert_eq!(adapter.take_pending_send(), Some(NetBufferListId(9)));
        assert_eq!(adapter.state(), AdapterState::Paused);
        assert_eq!(adapter.take_pending_send(), None);
    }

    #[test]
    fn test_oid_query_frame_size() {
        let mut adapter = adapter();
        let mut buf = [0u8; 4];
        let mut req = OidRequest::query(OID_GEN_MAXIMUM_FRAME_SIZE, &mut buf);
        adapter.oid_request(&mut req).unwrap();
        assert_eq!(req.bytes_written, 4);
        assert_eq!(u32::from_le_bytes(buf), 512);
    }

    #[test]
    fn test_oid_query_link_speed_units() {
        let mut adapter = adapter();
        let mut buf = [0u8; 4];
        adapter.oid_request(&mut OidRequest::query(OID_GEN_LINK_SPEED, &mut buf)).unwrap();
        assert_eq!(u32::from_le_bytes(buf), 12);
    }

    #[test]
    fn test_oid_query_address() {
        let mut adapter = adapter();
        let mut buf = [0u8; 7];
        adapter.oid_request(&mut OidRequest::query(OID_802_3_CURRENT_ADDRESS, &mut buf)).unwrap();
        assert_eq!(&buf[..6], b"KG7UDH");
        assert_eq!(buf[6], 0);
    }

    #[test]
    fn test_oid_query_short_buffer() {
        let mut adapter = adapter();
        let mut buf = [0u8; 8];
        let mut req = OidRequest::query(OID_GEN_SUPPORTED_LIST, &mut buf);
        let err = adapter.oid_request(&mut req).unwrap_err();
        assert_eq!(err, MiniportError::BufferTooShort { needed: SUPPORTED_OIDS.len() * 4 });
        assert_eq!(req.bytes_needed, SUPPORTED_OIDS.len() * 4);
        assert_eq!(req.bytes_written, 0);
    }

    #[test]
    fn test_oid_set_packet_filter() {
        let mut adapter = adapter();
        let wanted = PacketFilter::DIRECTED | PacketFilter::BROADCAST;
        let mut buf = wanted.bits().to_le_bytes();
        adapter.oid_request(&mut OidRequest::set(OID_GEN_CURRENT_PACKET_FILTER, &mut buf)).unwrap();
        assert_eq!(adapter.packet_filter(), wanted);

        let mut promiscuous = PacketFilter::PROMISCUOUS.bits().to_le_bytes();
        let err = adapter
            .oid_request(&mut OidRequest::set(OID_GEN_CURRENT_PACKET_FILTER, &mut promiscuous))
            .unwrap_err();
        assert_eq!(err, MiniportError::NotSupported);
        assert_eq!(adapter.packet_filter(), wanted);
    }

    #[test]
    fn test_oid_set_wrong_length() {
        let mut adapter = adapter();
        let mut buf = [0u8; 3];
        let mut req = OidRequest::set(OID_GEN_VLAN_ID, &mut buf);
        assert_eq!(adapter.oid_request(&mut req), Err(MiniportError::InvalidLength));
        assert_eq!(req.bytes_needed, 4);
    }

    #[test]
    fn test_oid_set_vlan_bounds() {
        let mut adapter = adapter();
        let mut ok = 42u32.to_le_bytes();
        adapter.oid_request(&mut OidRequest::set(OID_GEN_VLAN_ID, &mut ok)).unwrap();
        assert_eq!(adapter.vlan_id(), 42);
        let mut bad = 4096u32.to_le_bytes();
        assert_eq!(
            adapter.oid_request(&mut OidRequest::set(OID_GEN_VLAN_ID, &mut bad)),
            Err(MiniportError::InvalidData)
        );
        assert_eq!(adapter.vlan_id(), 42);
    }

    #[test]
    fn test_oid_multicast_round_trip() {
        let mut adapter = adapter();
        let a = Ax25Address::new("QST", 1).unwrap();
        let b = Ax25Address::new("CQ", 0).unwrap();
        let mut list = [0u8; 14];
        list[..7].copy_from_slice(&a.to_bytes());
        list[7..].copy_from_slice(&b.to_bytes());
        adapter.oid_request(&mut OidRequest::set(OID_802_3_MULTICAST_LIST, &mut list)).unwrap();
        assert_eq!(adapter.multicast_groups(), &[a, b]);

        let mut out = [0u8; 32];
        let mut req = OidRequest::query(OID_802_3_MULTICAST_LIST, &mut out);
        adapter.oid_request(&mut req).unwrap();
        assert_eq!(req.bytes_written, 14);
        assert_eq!(&out[..14], &list);
    }

    #[test]
    fn test_oid_multicast_limits() {
        let mut adapter = adapter();
        let mut ragged = [1u8; 10];
        assert_eq!(
            adapter.oid_request(&mut OidRequest::set(OID_802_3_MULTICAST_LIST, &mut ragged)),
            Err(MiniportError::InvalidLength)
        );
        let mut too_many = [1u8; 7 * 17];
        assert_eq!(
            adapter.oid_request(&mut OidRequest::set(OID_802_3_MULTICAST_LIST, &mut too_many)),
            Err(MiniportError::MulticastFull)
        );
        let mut zero = [0u8; 7];
        assert_eq!(
            adapter.oid_request(&mut OidRequest::set(OID_802_3_MULTICAST_LIST, &mut zero)),
            Err(MiniportError::InvalidData)
        );
    }

    #[test]
    fn test_oid_unknown_not_supported() {
        let mut adapter = adapter();
        let mut buf = [0u8; 4];
        assert_eq!(
            adapter.oid_request(&mut OidRequest::query(0xDEAD_BEEF, &mut buf)),
            Err(MiniportError::NotSupported)
        );
        assert_eq!(
            adapter.oid_request(&mut OidRequest::set(OID_GEN_LINK_SPEED, &mut buf)),
            Err(MiniportError::NotSupported)
        );
    }
}
