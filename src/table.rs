//! Bounded buffer for one generated table

use heapless::Vec;
use zerocopy::{Immutable, IntoBytes};

use crate::config::TABLE_CAPACITY;
use crate::error::CmError;

/// Byte image of one table under construction
///
/// Every append fails with `BufferTooSmall` once the table would exceed
/// [`TABLE_CAPACITY`]; the caller then discards the table.
#[derive(Debug, Clone, Default)]
pub struct TableBuffer {
    bytes: Vec<u8, TABLE_CAPACITY>,
}

impl TableBuffer {
    pub const fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    /// Drop everything after the first `len` bytes
    pub fn truncate(&mut self, len: usize) {
        self.bytes.truncate(len);
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_mut_bytes(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Append the bytes of a fixed-layout structure
    pub fn push<T: IntoBytes + Immutable + ?Sized>(&mut self, value: &T) -> Result<(), CmError> {
        self.push_bytes(value.as_bytes())
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) -> Result<(), CmError> {
        self.bytes
            .extend_from_slice(bytes)
            .map_err(|_| CmError::BufferTooSmall)
    }

    pub fn push_u8(&mut self, value: u8) -> Result<(), CmError> {
        self.bytes.push(value).map_err(|_| CmError::BufferTooSmall)
    }

    pub fn push_u16(&mut self, value: u16) -> Result<(), CmError> {
        self.push_bytes(&value.to_le_bytes())
    }

    pub fn push_u32(&mut self, value: u32) -> Result<(), CmError> {
        self.push_bytes(&value.to_le_bytes())
    }

    pub fn push_u64(&mut self, value: u64) -> Result<(), CmError> {
        self.push_bytes(&value.to_le_bytes())
    }

    /// Append zero bytes until the length is a multiple of `align`
    pub fn pad_to(&mut self, align: usize) -> Result<(), CmError> {
        while self.bytes.len() % align != 0 {
            self.push_u8(0)?;
        }
        Ok(())
    }

    /// Overwrite a little-endian `u32` already in the buffer
    pub fn patch_u32(&mut self, offset: usize, value: u32) -> Result<(), CmError> {
        self.patch(offset, &value.to_le_bytes())
    }

    /// Overwrite a little-endian `u16` already in the buffer
    pub fn patch_u16(&mut self, offset: usize, value: u16) -> Result<(), CmError> {
        self.patch(offset, &value.to_le_bytes())
    }

    pub fn patch_u8(&mut self, offset: usize, value: u8) -> Result<(), CmError> {
        self.patch(offset, &[value])
    }

    fn patch(&mut self, offset: usize, bytes: &[u8]) -> Result<(), CmError> {
        let end = offset.checked_add(bytes.len()).ok_or(CmError::InvalidParameter)?;
        self.bytes
            .get_mut(offset..end)
            .ok_or(CmError::InvalidParameter)?
            .copy_from_slice(bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_patch() {
        let mut table = TableBuffer::new();
        table.push_bytes(b"MCFG").unwrap();
        table.push_u32(0).unwrap();
        table.push_u16(0x1234).unwrap();
        table.pad_to(4).unwrap();
        assert_eq!(table.len(), 12);

        table.patch_u32(4, 12).unwrap();
        assert_eq!(&table.as_bytes()[4..8], &[12, 0, 0, 0]);
        assert_eq!(&table.as_bytes()[8..10], &[0x34, 0x12]);
        assert_eq!(table.patch_u32(10, 0), Err(CmError::InvalidParameter));
    }

    #[test]
    fn test_overflow() {
        let mut table = TableBuffer::new();
        let chunk = [0u8; 1024];
        for _ in 0..TABLE_CAPACITY / chunk.len() {
            table.push_bytes(&chunk).unwrap();
        }
        assert_eq!(table.push_u8(1), Err(CmError::BufferTooSmall));
        assert_eq!(table.len(), TABLE_CAPACITY);
    }
}
