//! Word access contract between the core and its memory backend.

use thiserror::Error;

/// Width of a single memory access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum AccessWidth {
    /// 1-byte access.
    Byte,
    /// 2-byte access.
    Half,
    /// 4-byte access.
    Word,
}

impl AccessWidth {
    /// Number of bytes covered by this access.
    #[must_use]
    pub const fn bytes(self) -> usize {
        match self {
            Self::Byte => 1,
            Self::Half => 2,
            Self::Word => 4,
        }
    }

    /// Converts a byte count (`1`, `2` or `4`) into an access width.
    #[must_use]
    pub const fn from_bytes(len: usize) -> Option<Self> {
        match len {
            1 => Some(Self::Byte),
            2 => Some(Self::Half),
            4 => Some(Self::Word),
            _ => None,
        }
    }

    /// Mask selecting the low bits a value keeps at this width.
    #[must_use]
    pub const fn mask(self) -> u32 {
        match self {
            Self::Byte => 0xFF,
            Self::Half => 0xFFFF,
            Self::Word => 0xFFFF_FFFF,
        }
    }
}

/// Failure reported by a memory backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum MemoryError {
    /// The access does not fit inside the mapped range.
    #[error("address {addr:#010x} ({} bytes) is out of bound of physical memory", .width.bytes())]
    OutOfBounds {
        /// First byte of the access.
        addr: u32,
        /// Access width.
        width: AccessWidth,
    },
    /// An image does not fit at the requested load address.
    #[error("image of {len} bytes does not fit at {addr:#010x}")]
    ImageTooLarge {
        /// Requested load address.
        addr: u32,
        /// Image length in bytes.
        len: usize,
    },
}

/// Memory access layer: `read(addr, width)` and `write(addr, width, value)`.
///
/// Values are zero-extended on read and truncated to `width` on write.
pub trait Memory {
    /// Reads `width` bytes starting at `addr`.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::OutOfBounds`] when the access is not mapped.
    fn read(&self, addr: u32, width: AccessWidth) -> Result<u32, MemoryError>;

    /// Writes the low `width` bytes of `value` starting at `addr`.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::OutOfBounds`] when the access is not mapped.
    fn write(&mut self, addr: u32, width: AccessWidth, value: u32) -> Result<(), MemoryError>;
}
