//! Driver-wide context.
//!
//! One [`DriverContext`] exists per loaded driver. It owns the host
//! registration and a fixed table of adapter slots, and every host callback
//! is routed through it: callbacks name an adapter by [`AdapterHandle`],
//! which the context resolves back to the instance it owns.
//!
//! # Architecture
//!
//! ```text
//! Host framework
//!     │
//!     ├── DriverEntry ──────────> driver_entry() ──> DriverContext::create + register
//!     │
//!     ├── Initialize(params) ───> initialize() ──> first free slot ──> AdapterInstance::create
//!     ├── Pause/Restart(h) ─────> resolve(h) ──> AdapterInstance state machine
//!     ├── Send/Return(h, nbl) ──> resolve(h) ──> in-flight bookkeeping
//!     ├── Halt(h) ──────────────> resolve(h) ──> destroy instance, free slot
//!     │
//!     └── Unload ───────────────> DriverContext::unload ──> deregister, drop
//! ```
//!
//! # Preconditions
//!
//! The host serializes lifecycle callbacks per adapter and issues
//! initialize/halt serially with respect to each other. Those are not
//! re-checked here.

mod active;
pub mod slots;

pub use active::active_context_id;
pub use slots::{AdapterSlot, SlotTable};

use core::convert::Infallible;

use tagged_pool::{InitError, PoolBox, PoolTag, Tagged, TaggedArena};

use crate::adapter::{AdapterInstance, OidRequest, PauseOutcome, RestartOutcome};
use crate::config::DriverConfig;
use crate::error::{bug_check, BugCheck, MiniportError, Result};
use crate::host::{
    AdapterAttributes, HaltAction, HostFramework, InitParameters, MiniportDriverCharacteristics,
    PnpEvent, RestartParameters, ReturnFlags, SendFlags, ShutdownAction,
};
use crate::irql::{ExecutionLevel, Passive};
use crate::types::{
    AdapterHandle, DriverHandle, DriverObject, ErrorLogCode, InterfaceId, NdisStatus,
    NetBufferListId,
};
use active::ActiveClaim;

/// Host registration state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Unregistered,
    Registered {
        handle: DriverHandle,
        driver: DriverObject,
    },
}

/// The driver-wide singleton.
pub struct DriverContext<H: HostFramework> {
    host: H,
    arena: &'static TaggedArena,
    config: DriverConfig,
    registration: Registration,
    slots: SlotTable,
    claim: ActiveClaim,
}

impl<H: HostFramework> Tagged for DriverContext<H> {
    const TAG: PoolTag = PoolTag::new(b"axMP");
}

impl<H: HostFramework> DriverContext<H> {
    /// Build the context in `arena` and make it the active one.
    ///
    /// Fails with [`MiniportError::ContextAlreadyActive`] while another
    /// context is active; that context is left untouched.
    pub fn create(
        _level: &Passive,
        arena: &'static TaggedArena,
        host: H,
        config: DriverConfig,
    ) -> Result<PoolBox<Self>> {
        config.validate()?;
        let claim = ActiveClaim::acquire()?;
        let id = claim.id();

        let context = Self {
            host,
            arena,
            config,
            registration: Registration::Unregistered,
            slots: SlotTable::new(),
            claim,
        };

        match PoolBox::try_new_with(arena, move || Ok::<_, Infallible>(context)) {
            Ok(context) => {
                log::info!("driver context {} created", id);
                Ok(context)
            }
            Err(InitError::Pool(err)) => {
                log::error!("driver context {}: no block in arena {}: {}", id, arena.id(), err);
                Err(MiniportError::from(err))
            }
            Err(InitError::Init(never)) => match never {},
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Registration
    // ═══════════════════════════════════════════════════════════════════════

    /// Register with the host. On failure the context is left unregistered
    /// so a later attempt starts clean.
    pub fn register(
        &mut self,
        _level: &Passive,
        driver: DriverObject,
        registry_path: &str,
    ) -> Result<DriverHandle> {
        if let Registration::Registered { .. } = self.registration {
            log::warn!("driver context {}: already registered", self.claim.id());
            return Err(MiniportError::AlreadyRegistered);
        }

        let characteristics = MiniportDriverCharacteristics::new(&self.config);
        match self
            .host
            .register_miniport_driver(driver, registry_path, &characteristics)
        {
            Ok(handle) => {
                self.registration = Registration::Registered { handle, driver };
                log::info!(
                    "driver registered: version {}.{}, interface {}.{}",
                    characteristics.driver_version.0,
                    characteristics.driver_version.1,
                    characteristics.ndis_version.0,
                    characteristics.ndis_version.1
                );
                Ok(handle)
            }
            Err(status) => {
                self.registration = Registration::Unregistered;
                log::error!("driver registration failed: {}", status);
                Err(MiniportError::Registration(status))
            }
        }
    }

    /// Undo registration. `handle` must be the one the host issued; any
    /// other is refused and the registration stays in place.
    pub fn deregister(&mut self, _level: &Passive, handle: DriverHandle) -> Result<()> {
        match self.registration {
            Registration::Unregistered => {
                log::warn!("driver context {}: deregister while unregistered", self.claim.id());
                Err(MiniportError::NotRegistered)
            }
            Registration::Registered { handle: expected, .. } if expected != handle => {
                log::warn!(
                    "driver context {}: deregister with {:?}, registered as {:?}",
                    self.claim.id(),
                    handle,
                    expected
                );
                Err(MiniportError::RegistrationMismatch { expected, found: handle })
            }
            Registration::Registered { .. } => {
                self.release_registration();
                Ok(())
            }
        }
    }

    fn release_registration(&mut self) {
        if let Registration::Registered { handle, .. } = self.registration {
            self.host.deregister_miniport_driver(handle);
            self.registration = Registration::Unregistered;
            log::info!("driver deregistered");
        }
    }

    /// Tear the driver down: deregister, destroy every adapter, free the
    /// context.
    pub fn unload(mut context: PoolBox<Self>, _level: &Passive) {
        if let Some(ctx) = context.get_mut() {
            log::info!("driver context {}: unloading", ctx.claim.id());
            ctx.release_registration();
        }
        context.reset();
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Adapter lifecycle
    // ═══════════════════════════════════════════════════════════════════════

    /// Create an adapter for `params.interface_index` in the lowest free
    /// slot.
    ///
    /// Full table gives [`MiniportError::SlotsExhausted`], an empty arena
    /// [`MiniportError::OutOfMemory`]; neither changes any slot.
    pub fn create_adapter(
        &mut self,
        _level: &Passive,
        params: &InitParameters,
    ) -> Result<&AdapterInstance> {
        let interface = params.interface_index;

        if self.registration == Registration::Unregistered {
            log::warn!("adapter for {} requested before registration", interface);
            return Err(MiniportError::NotRegistered);
        }
        if let Some(index) = self.slots.find_by_interface(interface) {
            log::warn!("adapter for {} already exists in slot {}", interface, index);
            return Err(MiniportError::InterfaceInUse);
        }

        let Some(index) = self.slots.first_free() else {
            log::warn!(
                "no free adapter slot for {} ({} in use)",
                interface,
                self.slots.in_use_count()
            );
            self.host.write_error_log(None, ErrorLogCode::AdapterLimitReached);
            return Err(MiniportError::SlotsExhausted);
        };
        let handle = self
            .slots
            .next_handle(index)
            .ok_or(MiniportError::SlotsExhausted)?;

        let config = self.config.adapter.with_overrides(params);
        let instance = match AdapterInstance::create(self.arena, handle, interface, &config) {
            Ok(instance) => instance,
            Err(err) => {
                if err == MiniportError::OutOfMemory {
                    self.host.write_error_log(None, ErrorLogCode::OutOfResources);
                }
                return Err(err);
            }
        };

        let Some(adapter) = instance.get() else {
            return Err(MiniportError::OutOfMemory);
        };
        for attributes in [
            AdapterAttributes::Registration(adapter.registration_attributes()),
            AdapterAttributes::General(adapter.general_attributes()),
        ] {
            let status = self.host.set_miniport_attributes(handle, attributes);
            if !status.is_success() {
                log::error!("adapter {}: host refused attributes: {}", handle, status);
                return Err(MiniportError::Registration(status));
            }
        }

        let occupied = self.slots.occupy(index, interface, instance)?;
        debug_assert_eq!(occupied, handle);
        self.slots.get(occupied)
    }

    /// Destroy the adapter `handle` names and free its slot.
    ///
    /// The host never halts an adapter twice or one it did not create; a
    /// handle that does not resolve is a bug check.
    pub fn halt_adapter(&mut self, _level: &Passive, handle: AdapterHandle, action: HaltAction) {
        let index = match self.slots.resolve(handle) {
            Ok(index) => index,
            Err(MiniportError::InvalidHandle) => bug_check(BugCheck::HaltOfInvalidAdapter(handle)),
            Err(_) => bug_check(BugCheck::HaltOfStaleAdapter(handle)),
        };

        let mut instance = self.slots.release(index);
        if let Some(adapter) = instance.get_mut() {
            Self::flush_sends(&mut self.host, adapter);
        }
        log::info!("adapter {}: halting ({:?})", handle, action);
        instance.reset();
    }

    fn flush_sends(host: &mut H, adapter: &mut AdapterInstance) {
        let handle = adapter.handle();
        while let Some(list) = adapter.take_pending_send() {
            host.send_complete(handle, list, NdisStatus::Failure);
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Host entry points
    // ═══════════════════════════════════════════════════════════════════════

    /// Initialize handler.
    pub fn initialize(
        &mut self,
        level: &Passive,
        params: &InitParameters,
    ) -> core::result::Result<AdapterHandle, NdisStatus> {
        self.create_adapter(level, params)
            .map(|adapter| adapter.handle())
            .map_err(|err| err.status())
    }

    /// Halt handler. A missing adapter reference is ignored.
    pub fn halt(&mut self, level: &Passive, adapter: Option<AdapterHandle>, action: HaltAction) {
        match adapter {
            Some(handle) => self.halt_adapter(level, handle, action),
            None => log::debug!("halt without adapter ignored"),
        }
    }

    /// Pause handler.
    pub fn pause(&mut self, _level: &Passive, handle: AdapterHandle) -> NdisStatus {
        match self.slots.get_mut(handle).and_then(|adapter| adapter.pause()) {
            Ok(PauseOutcome::Completed) => NdisStatus::Success,
            Ok(PauseOutcome::Pending) => NdisStatus::Pending,
            Err(err) => err.status(),
        }
    }

    /// Restart handler.
    pub fn restart(
        &mut self,
        _level: &Passive,
        handle: AdapterHandle,
        params: &RestartParameters,
    ) -> NdisStatus {
        match self.slots.get_mut(handle).and_then(|adapter| adapter.restart(params)) {
            Ok(RestartOutcome::Completed) => NdisStatus::Success,
            Err(err) => err.status(),
        }
    }

    /// OID request handler.
    pub fn oid_request(
        &mut self,
        _level: &Passive,
        handle: AdapterHandle,
        request: &mut OidRequest<'_>,
    ) -> NdisStatus {
        match self
            .slots
            .get_mut(handle)
            .and_then(|adapter| adapter.oid_request(request))
        {
            Ok(()) => NdisStatus::Success,
            Err(err) => err.status(),
        }
    }

    /// Send handler. Lists the adapter cannot take are completed back
    /// immediately.
    pub fn send_net_buffer_lists<L: ExecutionLevel>(
        &mut self,
        _level: &L,
        handle: AdapterHandle,
        lists: &[NetBufferListId],
        flags: SendFlags,
    ) {
        if flags.contains(SendFlags::DISPATCH_LEVEL) == L::MAY_BLOCK {
            log::warn!("adapter {}: send flags {:?} at {} level", handle, flags, L::NAME);
        }

        let mut adapter = self.slots.get_mut(handle);
        for &list in lists {
            let refused = match adapter.as_mut() {
                Ok(adapter) => adapter.send(list).err(),
                Err(err) => Some(err.status()),
            };
            if let Some(status) = refused {
                log::trace!("adapter {}: send {:?} refused: {}", handle, list, status);
                self.host.send_complete(handle, list, status);
            }
        }
    }

    /// Return handler for received lists.
    pub fn return_net_buffer_lists<L: ExecutionLevel>(
        &mut self,
        _level: &L,
        handle: AdapterHandle,
        lists: &[NetBufferListId],
        flags: ReturnFlags,
    ) {
        if flags.contains(ReturnFlags::DISPATCH_LEVEL) == L::MAY_BLOCK {
            log::warn!("adapter {}: return flags {:?} at {} level", handle, flags, L::NAME);
        }

        let adapter = match self.slots.get_mut(handle) {
            Ok(adapter) => adapter,
            Err(err) => {
                log::error!(
                    "adapter {}: {} buffer lists returned to missing adapter: {}",
                    handle,
                    lists.len(),
                    err
                );
                self.host.write_error_log(Some(handle), ErrorLogCode::LeakBufferLists);
                return;
            }
        };

        for &list in lists {
            match adapter.return_receive(list) {
                Ok(true) => self.host.notify_pause_complete(handle),
                Ok(false) => {}
                Err(err) => log::warn!("adapter {}: return of {:?}: {}", handle, list, err),
            }
        }
    }

    /// Cancel-send handler. Sends are never queued past the radio, so
    /// there is nothing to pull back.
    pub fn cancel_send<L: ExecutionLevel>(&mut self, _level: &L, handle: AdapterHandle, cancel_id: u64) {
        log::debug!("adapter {}: cancel send {:#x} ignored", handle, cancel_id);
    }

    /// Check-for-hang handler. A virtual adapter never hangs.
    pub fn check_for_hang(&self, _level: &Passive, handle: AdapterHandle) -> bool {
        if let Err(err) = self.slots.resolve(handle) {
            log::warn!("adapter {}: hang check: {}", handle, err);
        }
        false
    }

    /// Reset handler.
    pub fn reset<L: ExecutionLevel>(&mut self, _level: &L, handle: AdapterHandle) -> NdisStatus {
        log::debug!("adapter {}: reset not supported", handle);
        MiniportError::NotSupported.status()
    }

    /// Plug-and-play notification handler.
    pub fn device_pnp_event_notify(&mut self, _level: &Passive, handle: AdapterHandle, event: PnpEvent) {
        match self.slots.resolve(handle) {
            Ok(_) => log::info!("adapter {}: pnp event {:?}", handle, event),
            Err(err) => log::warn!("adapter {}: pnp event {:?}: {}", handle, event, err),
        }
    }

    /// Shutdown handler. May run at any level, so only logs.
    pub fn shutdown<L: ExecutionLevel>(&mut self, _level: &L, handle: AdapterHandle, action: ShutdownAction) {
        log::info!("adapter {}: shutdown ({:?}) at {}", handle, action, L::NAME);
    }

    /// Cancel-OID handler. Requests complete synchronously, so none is ever
    /// outstanding.
    pub fn cancel_oid_request<L: ExecutionLevel>(&mut self, _level: &L, handle: AdapterHandle, request_id: u64) {
        log::debug!("adapter {}: cancel OID request {:#x} ignored", handle, request_id);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Radio side
    // ═══════════════════════════════════════════════════════════════════════

    /// The radio finished with a send; give the list back to the host.
    pub fn complete_transmit<L: ExecutionLevel>(
        &mut self,
        _level: &L,
        handle: AdapterHandle,
        list: NetBufferListId,
        status: NdisStatus,
    ) -> Result<()> {
        let adapter = self.slots.get_mut(handle)?;
        let pause_settled = adapter.complete_transmit(list)?;
        self.host.send_complete(handle, list, status);
        if pause_settled {
            log::info!("adapter {}: pause complete", handle);
            self.host.notify_pause_complete(handle);
        }
        Ok(())
    }

    /// The radio produced a frame; indicate its list to the host.
    pub fn indicate_receive<L: ExecutionLevel>(
        &mut self,
        _level: &L,
        handle: AdapterHandle,
        list: NetBufferListId,
    ) -> NdisStatus {
        let accepted = match self.slots.get_mut(handle) {
            Ok(adapter) => adapter.indicate_receive(list),
            Err(err) => Err(err.status()),
        };
        match accepted {
            Ok(()) => {
                self.host.indicate_receive(handle, list);
                NdisStatus::Success
            }
            Err(status) => status,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Accessors
    // ═══════════════════════════════════════════════════════════════════════

    pub fn id(&self) -> u32 {
        self.claim.id()
    }

    pub fn registration(&self) -> Registration {
        self.registration
    }

    pub fn is_registered(&self) -> bool {
        matches!(self.registration, Registration::Registered { .. })
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn arena(&self) -> &'static TaggedArena {
        self.arena
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn slots(&self) -> &SlotTable {
        &self.slots
    }

    pub fn in_use_count(&self) -> usize {
        self.slots.in_use_count()
    }

    pub fn adapter(&self, handle: AdapterHandle) -> Result<&AdapterInstance> {
        self.slots.get(handle)
    }

    pub fn adapter_for_interface(&self, interface: InterfaceId) -> Option<&AdapterInstance> {
        let index = self.slots.find_by_interface(interface)?;
        self.slots.slot(index)?.instance()
    }
}

impl<H: HostFramework> Drop for DriverContext<H> {
    fn drop(&mut self) {
        let mut destroyed = 0;
        for index in 0..self.slots.capacity() {
            let mut instance = self.slots.release(index);
            if let Some(adapter) = instance.get_mut() {
                log::warn!(
                    "driver context {}: force-destroying adapter {} ({:?})",
                    self.claim.id(),
                    adapter.handle(),
                    adapter.state()
                );
                Self::flush_sends(&mut self.host, adapter);
                instance.reset();
                destroyed += 1;
            }
        }

        self.release_registration();
        log::info!(
            "driver context {} destroyed ({} adapters torn down)",
            self.claim.id(),
            destroyed
        );
    }
}

impl<H: HostFramework> core::fmt::Debug for DriverContext<H> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DriverContext")
            .field("id", &self.claim.id())
            .field("registration", &self.registration)
            .field("adapters", &self.slots.in_use_count())
            .finish()
    }
}
