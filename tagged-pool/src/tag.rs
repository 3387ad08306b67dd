//! Four-character allocation tags.

use core::fmt;

/// Diagnostic tag recorded with every arena block.
///
/// Packed little-endian, so the four characters read in order when the
/// block header region is inspected byte by byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolTag(u32);

impl PoolTag {
    /// Build a tag from four ASCII characters.
    pub const fn new(tag: &[u8; 4]) -> Self {
        Self(
            (tag[0] as u32)
                | (tag[1] as u32) << 8
                | (tag[2] as u32) << 16
                | (tag[3] as u32) << 24,
        )
    }

    /// Wrap an already-packed tag value.
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Packed value, as a host pool API expects it.
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Tag characters in memory order.
    pub const fn bytes(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }
}

impl fmt::Display for PoolTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.bytes() {
            let c = if b.is_ascii_graphic() { b as char } else { '.' };
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

/// Tag for owning handles whose type does not pick its own.
pub const GENERIC_TAG: PoolTag = PoolTag::new(b"axUP");

/// Types that can live in a [`TaggedArena`](crate::TaggedArena) behind a
/// [`PoolBox`](crate::PoolBox).
pub trait Tagged {
    /// Tag recorded for every block holding this type.
    const TAG: PoolTag;
}
