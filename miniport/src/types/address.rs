//! AX.25 station addresses.
//!
//! # Layout
//!
//! ```text
//!  bit 56      48      40      32      24      16       8       0
//!      │ SSID  │ call5 │ call4 │ call3 │ call2 │ call1 │ call0 │
//! ```
//!
//! Six callsign characters (space padded) and a 4-bit SSID packed into the
//! low 56 bits of a `u64`. An all-zero value marks an unused table entry.

use core::fmt;

/// Number of bytes in an address on the host boundary.
pub const AX25_ADDRESS_LEN: usize = 7;

/// Number of significant bits in an address.
pub const AX25_ADDRESS_BITS: u32 = 8 * AX25_ADDRESS_LEN as u32;

/// Characters in a callsign.
pub const CALLSIGN_LEN: usize = 6;

/// Highest valid secondary station identifier.
pub const MAX_SSID: u8 = 15;

const ADDRESS_MASK: u64 = (1u64 << AX25_ADDRESS_BITS) - 1;

/// A 56-bit AX.25 station address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Ax25Address(u64);

/// Reasons a callsign/SSID pair cannot form an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressError {
    /// Empty or longer than six characters.
    CallsignLength,
    /// Only uppercase ASCII letters and digits are allowed.
    CallsignCharacter,
    /// SSID above 15.
    Ssid,
}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CallsignLength => write!(f, "callsign must be 1 to 6 characters"),
            Self::CallsignCharacter => write!(f, "callsign must be uppercase letters and digits"),
            Self::Ssid => write!(f, "SSID must be 0 to 15"),
        }
    }
}

impl Ax25Address {
    /// Marker for an unused table entry.
    pub const UNUSED: Self = Self(0);

    /// Address assigned to new adapters unless overridden: `KG7UDH-0`.
    pub const DEFAULT: Self = Self::from_parts(*b"KG7UDH", 0);

    const fn from_parts(callsign: [u8; CALLSIGN_LEN], ssid: u8) -> Self {
        let mut raw = 0u64;
        let mut i = 0;
        while i < CALLSIGN_LEN {
            raw |= (callsign[i] as u64) << (8 * i);
            i += 1;
        }
        Self(raw | ((ssid as u64) << (8 * CALLSIGN_LEN)))
    }

    /// Build an address from a callsign and SSID. Short callsigns are
    /// padded with spaces.
    pub fn new(callsign: &str, ssid: u8) -> Result<Self, AddressError> {
        let bytes = callsign.as_bytes();
        if bytes.is_empty() || bytes.len() > CALLSIGN_LEN {
            return Err(AddressError::CallsignLength);
        }
        if !bytes.iter().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()) {
            return Err(AddressError::CallsignCharacter);
        }
        if ssid > MAX_SSID {
            return Err(AddressError::Ssid);
        }

        let mut padded = [b' '; CALLSIGN_LEN];
        padded[..bytes.len()].copy_from_slice(bytes);
        Ok(Self::from_parts(padded, ssid))
    }

    /// Reinterpret a raw value; bits above 56 are discarded.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw & ADDRESS_MASK)
    }

    /// Packed value.
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// True for the unused marker.
    pub const fn is_unused(self) -> bool {
        self.0 == 0
    }

    /// Callsign characters, space padded.
    pub fn callsign(self) -> [u8; CALLSIGN_LEN] {
        let mut out = [0u8; CALLSIGN_LEN];
        out.copy_from_slice(&self.to_bytes()[..CALLSIGN_LEN]);
        out
    }

    /// Secondary station identifier.
    pub fn ssid(self) -> u8 {
        (self.0 >> (8 * CALLSIGN_LEN)) as u8
    }

    /// Boundary representation: the seven low bytes, least significant first.
    pub fn to_bytes(self) -> [u8; AX25_ADDRESS_LEN] {
        let mut out = [0u8; AX25_ADDRESS_LEN];
        out.copy_from_slice(&self.0.to_le_bytes()[..AX25_ADDRESS_LEN]);
        out
    }

    /// Inverse of [`to_bytes`](Self::to_bytes).
    pub fn from_bytes(bytes: [u8; AX25_ADDRESS_LEN]) -> Self {
        let mut wide = [0u8; 8];
        wide[..AX25_ADDRESS_LEN].copy_from_slice(&bytes);
        Self(u64::from_le_bytes(wide))
    }
}

impl fmt::Display for Ax25Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unused() {
            return write!(f, "<unused>");
        }
        for b in self.callsign() {
            if b == b' ' {
                break;
            }
            let c = if b.is_ascii_graphic() { b as char } else { '?' };
            write!(f, "{}", c)?;
        }
        write!(f, "-{}", self.ssid())
    }
}
