//! Flat physical memory mapped at a fixed base address.

use crate::memory::{AccessWidth, Memory, MemoryError};

/// Default physical memory base, also the reset vector.
pub const DEFAULT_MEMORY_BASE: u32 = 0x8000_0000;
/// Default physical memory size (128 MiB).
pub const DEFAULT_MEMORY_SIZE: usize = 0x0800_0000;

/// Zero-initialised little-endian RAM covering `[base, base + size)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalMemory {
    base: u32,
    bytes: Box<[u8]>,
}

impl PhysicalMemory {
    /// Allocates `size` zeroed bytes mapped at `base`.
    #[must_use]
    pub fn new(base: u32, size: usize) -> Self {
        Self {
            base,
            bytes: vec![0; size].into_boxed_slice(),
        }
    }

    /// First mapped address.
    #[must_use]
    pub const fn base(&self) -> u32 {
        self.base
    }

    /// Number of mapped bytes.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` when `[addr, addr + len)` lies inside the mapping.
    #[must_use]
    pub fn contains(&self, addr: u32, len: usize) -> bool {
        self.offset(addr, len).is_some()
    }

    /// Raw view of the backing store.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Copies `image` into memory starting at `addr`.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::ImageTooLarge`] when the image does not fit.
    pub fn load(&mut self, addr: u32, image: &[u8]) -> Result<(), MemoryError> {
        let offset = self
            .offset(addr, image.len())
            .ok_or(MemoryError::ImageTooLarge {
                addr,
                len: image.len(),
            })?;
        self.bytes[offset..offset + image.len()].copy_from_slice(image);
        Ok(())
    }

    fn offset(&self, addr: u32, len: usize) -> Option<usize> {
        let offset = usize::try_from(addr.checked_sub(self.base)?).ok()?;
        let end = offset.checked_add(len)?;
        (end <= self.bytes.len()).then_some(offset)
    }

    fn checked_offset(&self, addr: u32, width: AccessWidth) -> Result<usize, MemoryError> {
        self.offset(addr, width.bytes())
            .ok_or(MemoryError::OutOfBounds { addr, width })
    }
}

impl Memory for PhysicalMemory {
    fn read(&self, addr: u32, width: AccessWidth) -> Result<u32, MemoryError> {
        let offset = self.checked_offset(addr, width)?;
        let value = self.bytes[offset..offset + width.bytes()]
            .iter()
            .rev()
            .fold(0u32, |acc, byte| (acc << 8) | u32::from(*byte));
        Ok(value)
    }

    fn write(&mut self, addr: u32, width: AccessWidth, value: u32) -> Result<(), MemoryError> {
        let offset = self.checked_offset(addr, width)?;
        let bytes = value.to_le_bytes();
        self.bytes[offset..offset + width.bytes()].copy_from_slice(&bytes[..width.bytes()]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{PhysicalMemory, DEFAULT_MEMORY_BASE};
    use crate::memory::{AccessWidth, Memory, MemoryError};

    fn small() -> PhysicalMemory {
        PhysicalMemory::new(DEFAULT_MEMORY_BASE, 0x100)
    }

    #[test]
    fn fresh_memory_is_zeroed() {
        let memory = small();
        assert_eq!(memory.size(), 0x100);
        assert!(memory.as_bytes().iter().all(|byte| *byte == 0));
    }

    #[test]
    fn accesses_are_little_endian() {
        let mut memory = small();
        memory
            .write(DEFAULT_MEMORY_BASE, AccessWidth::Word, 0x1234_5678)
            .unwrap();

        assert_eq!(memory.as_bytes()[..4], [0x78, 0x56, 0x34, 0x12]);
        assert_eq!(
            memory.read(DEFAULT_MEMORY_BASE, AccessWidth::Half).unwrap(),
            0x5678
        );
        assert_eq!(
            memory
                .read(DEFAULT_MEMORY_BASE + 3, AccessWidth::Byte)
                .unwrap(),
            0x12
        );
    }

    #[test]
    fn narrow_writes_only_touch_their_bytes() {
        let mut memory = small();
        memory
            .write(DEFAULT_MEMORY_BASE, AccessWidth::Word, 0xFFFF_FFFF)
            .unwrap();
        memory
            .write(DEFAULT_MEMORY_BASE + 1, AccessWidth::Byte, 0xAB00)
            .unwrap();

        assert_eq!(
            memory.read(DEFAULT_MEMORY_BASE, AccessWidth::Word).unwrap(),
            0xFFFF_00FF
        );
    }

    #[test]
    fn out_of_bounds_accesses_are_rejected() {
        let mut memory = small();
        let last = DEFAULT_MEMORY_BASE + 0xFF;

        assert!(memory.read(last, AccessWidth::Byte).is_ok());
        assert_eq!(
            memory.read(last, AccessWidth::Half),
            Err(MemoryError::OutOfBounds {
                addr: last,
                width: AccessWidth::Half
            })
        );
        assert!(memory.write(0x100, AccessWidth::Word, 0).is_err());
        assert!(memory.read(u32::MAX, AccessWidth::Word).is_err());
    }

    #[test]
    fn load_copies_image_and_rejects_overflow() {
        let mut memory = small();
        memory.load(DEFAULT_MEMORY_BASE + 4, &[1, 2, 3]).unwrap();
        assert_eq!(memory.as_bytes()[4..7], [1, 2, 3]);

        assert_eq!(
            memory.load(DEFAULT_MEMORY_BASE + 0xFE, &[0; 4]),
            Err(MemoryError::ImageTooLarge {
                addr: DEFAULT_MEMORY_BASE + 0xFE,
                len: 4
            })
        );
        assert!(memory.contains(DEFAULT_MEMORY_BASE, 0x100));
        assert!(!memory.contains(DEFAULT_MEMORY_BASE, 0x101));
    }
}
