//! Execution-level capability tokens.
//!
//! The host calls in at one of two levels. At [`Passive`] level code may
//! block, page and ask the host for resources. At [`Dispatch`] level it may
//! do none of those. Operations that need the ordinary level take a
//! `&Passive`; operations legal anywhere are generic over
//! [`ExecutionLevel`]. Calling a passive-only operation from a dispatch
//! callback is then a type error rather than a runtime fault.
//!
//! Tokens are created only by the host shim, which knows the level it was
//! entered at. They cannot leave the thread they were made on.

use core::fmt;
use core::marker::PhantomData;

mod sealed {
    pub trait Sealed {}
}

/// A level some code is currently running at.
pub trait ExecutionLevel: sealed::Sealed + fmt::Debug {
    /// Name used in diagnostics.
    const NAME: &'static str;

    /// True when blocking and pageable code are allowed.
    const MAY_BLOCK: bool;
}

/// Ordinary level: allocation, blocking and pageable code allowed.
pub struct Passive {
    _not_send: PhantomData<*const ()>,
}

/// Elevated, non-preemptible level.
pub struct Dispatch {
    _not_send: PhantomData<*const ()>,
}

impl Passive {
    /// # Safety
    /// The calling thread must actually be running at passive level, and
    /// stay there for as long as the token lives.
    pub unsafe fn new_unchecked() -> Self {
        Self { _not_send: PhantomData }
    }
}

impl Dispatch {
    /// # Safety
    /// The calling thread must be running at or below dispatch level for as
    /// long as the token lives.
    pub unsafe fn new_unchecked() -> Self {
        Self { _not_send: PhantomData }
    }
}

impl sealed::Sealed for Passive {}
impl sealed::Sealed for Dispatch {}

impl ExecutionLevel for Passive {
    const NAME: &'static str = "PASSIVE";
    const MAY_BLOCK: bool = true;
}

impl ExecutionLevel for Dispatch {
    const NAME: &'static str = "DISPATCH";
    const MAY_BLOCK: bool = false;
}

impl fmt::Debug for Passive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(Self::NAME)
    }
}

impl fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(Self::NAME)
    }
}
