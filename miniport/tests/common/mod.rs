//! Common test utilities and a recording mock host

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use ax25_miniport::host::AdapterAttributes;
use ax25_miniport::{
    AdapterHandle, Dispatch, DriverConfig, DriverContext, DriverHandle, DriverObject,
    ErrorLogCode, HostFramework, InitParameters, InterfaceId, MiniportDriverCharacteristics,
    NdisStatus, NetBufferListId, Passive,
};
use tagged_pool::{PoolBox, TaggedArena};

pub const REGISTRY_PATH: &str = "\\Registry\\Machine\\System\\CurrentControlSet\\Services\\VirtualAx25";
pub const DRIVER_OBJECT: DriverObject = DriverObject(0xD0);

/// Everything the driver told the host, in call order per kind.
#[derive(Debug, Default)]
pub struct HostLog {
    pub registrations: Vec<MiniportDriverCharacteristics>,
    pub registry_paths: Vec<String>,
    pub deregistrations: Vec<DriverHandle>,
    pub registration_attributes: Vec<AdapterHandle>,
    pub general_attributes: Vec<AdapterHandle>,
    pub pause_completes: Vec<AdapterHandle>,
    pub restart_completes: Vec<(AdapterHandle, NdisStatus)>,
    pub send_completes: Vec<(AdapterHandle, NetBufferListId, NdisStatus)>,
    pub receive_indications: Vec<(AdapterHandle, NetBufferListId)>,
    pub error_log: Vec<(Option<AdapterHandle>, ErrorLogCode)>,
    /// Status returned by the next registration attempt, if it should fail.
    pub fail_registration: Option<NdisStatus>,
    /// Status returned by attribute calls, if they should fail.
    pub fail_attributes: Option<NdisStatus>,
}

/// Host framework mock. Clones share one log, so a test keeps a clone to
/// inspect after the driver context is gone.
#[derive(Debug, Clone, Default)]
pub struct RecordingHost {
    pub log: Rc<RefCell<HostLog>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HostFramework for RecordingHost {
    fn register_miniport_driver(
        &mut self,
        _driver: DriverObject,
        registry_path: &str,
        characteristics: &MiniportDriverCharacteristics,
    ) -> Result<DriverHandle, NdisStatus> {
        let mut log = self.log.borrow_mut();
        log.registrations.push(*characteristics);
        log.registry_paths.push(registry_path.to_string());
        match log.fail_registration.take() {
            Some(status) => Err(status),
            None => Ok(DriverHandle(0x1000 + log.registrations.len() as u64)),
        }
    }

    fn deregister_miniport_driver(&mut self, handle: DriverHandle) {
        self.log.borrow_mut().deregistrations.push(handle);
    }

    fn set_miniport_attributes(
        &mut self,
        adapter: AdapterHandle,
        attributes: AdapterAttributes<'_>,
    ) -> NdisStatus {
        let mut log = self.log.borrow_mut();
        if let Some(status) = log.fail_attributes {
            return status;
        }
        match attributes {
            AdapterAttributes::Registration(attrs) => {
                assert_eq!(attrs.adapter, adapter);
                log.registration_attributes.push(adapter);
            }
            AdapterAttributes::General(_) => log.general_attributes.push(adapter),
        }
        NdisStatus::Success
    }

    fn notify_pause_complete(&mut self, adapter: AdapterHandle) {
        self.log.borrow_mut().pause_completes.push(adapter);
    }

    fn notify_restart_complete(&mut self, adapter: AdapterHandle, status: NdisStatus) {
        self.log.borrow_mut().restart_completes.push((adapter, status));
    }

    fn send_complete(&mut self, adapter: AdapterHandle, list: NetBufferListId, status: NdisStatus) {
        self.log.borrow_mut().send_completes.push((adapter, list, status));
    }

    fn indicate_receive(&mut self, adapter: AdapterHandle, list: NetBufferListId) {
        self.log.borrow_mut().receive_indications.push((adapter, list));
    }

    fn write_error_log(&mut self, adapter: Option<AdapterHandle>, code: ErrorLogCode) {
        self.log.borrow_mut().error_log.push((adapter, code));
    }
}

pub type TestContext = PoolBox<DriverContext<RecordingHost>>;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Arena over a leaked region.
pub fn arena(bytes: usize) -> &'static TaggedArena {
    let region: &'static mut [u8] = Box::leak(vec![0u8; bytes].into_boxed_slice());
    Box::leak(Box::new(TaggedArena::new(region).unwrap()))
}

/// Arena large enough for a context and a full slot table.
pub fn roomy_arena() -> &'static TaggedArena {
    arena(256 * 1024)
}

pub fn passive() -> Passive {
    // SAFETY: test threads have no execution level; passive is the model.
    unsafe { Passive::new_unchecked() }
}

pub fn dispatch() -> Dispatch {
    // SAFETY: as above.
    unsafe { Dispatch::new_unchecked() }
}

pub fn params(interface: u32) -> InitParameters {
    InitParameters::new(InterfaceId(interface))
}

/// Unregistered context plus a handle on its host log.
pub fn new_context(arena: &'static TaggedArena) -> (TestContext, Rc<RefCell<HostLog>>) {
    init_logging();
    let host = RecordingHost::new();
    let log = Rc::clone(&host.log);
    let context = DriverContext::create(&passive(), arena, host, DriverConfig::default()).unwrap();
    (context, log)
}

/// Registered context plus a handle on its host log.
pub fn registered_context() -> (TestContext, Rc<RefCell<HostLog>>) {
    let (mut context, log) = new_context(roomy_arena());
    context.register(&passive(), DRIVER_OBJECT, REGISTRY_PATH).unwrap();
    (context, log)
}

/// Create an adapter and return its handle.
pub fn add_adapter(context: &mut TestContext, interface: u32) -> AdapterHandle {
    context.initialize(&passive(), &params(interface)).unwrap()
}
