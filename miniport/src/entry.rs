//! Driver load entry point.
//!
//! The host shim calls [`driver_entry`] ONCE when the driver image is
//! loaded, and [`DriverContext::unload`] when it is unloaded.
//!
//! # Usage
//!
//! ```ignore
//! // In the host shim, at passive level:
//! let level = unsafe { Passive::new_unchecked() };
//! let context = ax25_miniport::driver_entry(
//!     &level,
//!     arena,
//!     shim,
//!     driver_object,
//!     registry_path,
//!     DriverConfig::default(),
//! )?;
//! // ... host callbacks are routed to `context` ...
//! DriverContext::unload(context, &level);
//! ```

use tagged_pool::{PoolBox, TaggedArena};

use crate::config::DriverConfig;
use crate::context::DriverContext;
use crate::error::Result;
use crate::host::HostFramework;
use crate::irql::Passive;
use crate::types::DriverObject;

/// Create the driver context and register it with the host.
///
/// On any failure nothing is left behind: the context is destroyed and the
/// active-context record cleared, so the host may load the driver again.
pub fn driver_entry<H: HostFramework>(
    level: &Passive,
    arena: &'static TaggedArena,
    host: H,
    driver: DriverObject,
    registry_path: &str,
    config: DriverConfig,
) -> Result<PoolBox<DriverContext<H>>> {
    log::info!("driver entry: {}", registry_path);

    let mut context = DriverContext::create(level, arena, host, config)?;
    if let Err(err) = context.register(level, driver, registry_path) {
        log::error!("driver entry failed: {}", err);
        context.reset();
        return Err(err);
    }
    Ok(context)
}
