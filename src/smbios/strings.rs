//! String set trailing each SMBIOS structure

use heapless::Vec;

use crate::config::field_str;
use crate::error::CmError;
use crate::table::TableBuffer;

/// Most strings any structure carries
const MAX_STRINGS: usize = 8;

/// Strings of one structure, numbered from 1 in insertion order
#[derive(Debug, Default)]
pub struct StringSet<'a> {
    strings: Vec<&'a [u8], MAX_STRINGS>,
}

impl<'a> StringSet<'a> {
    pub const fn new() -> Self {
        Self {
            strings: Vec::new(),
        }
    }

    /// Add a NUL-padded field and return its string number
    ///
    /// An empty field is not stored and yields string number 0.
    pub fn add(&mut self, field: &'a [u8]) -> Result<u8, CmError> {
        let s = field_str(field);
        if s.is_empty() {
            return Ok(0);
        }
        self.strings
            .push(s)
            .map_err(|_| CmError::OutOfResources)?;
        Ok(self.strings.len() as u8)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Append the string area: each string NUL-terminated, then one more
    /// NUL; a structure without strings gets two NULs
    pub fn write(&self, out: &mut TableBuffer) -> Result<(), CmError> {
        if self.strings.is_empty() {
            return out.push_bytes(&[0, 0]);
        }
        for s in &self.strings {
            out.push_bytes(s)?;
            out.push_u8(0)?;
        }
        out.push_u8(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::fixed_str;

    #[test]
    fn test_numbering_skips_empty_fields() {
        let vendor: [u8; 16] = fixed_str("NXP");
        let empty = [0u8; 16];
        let version: [u8; 16] = fixed_str("2.0");

        let mut set = StringSet::new();
        assert_eq!(set.add(&vendor), Ok(1));
        assert_eq!(set.add(&empty), Ok(0));
        assert_eq!(set.add(&version), Ok(2));
        assert_eq!(set.len(), 2);

        let mut out = TableBuffer::new();
        set.write(&mut out).unwrap();
        assert_eq!(out.as_bytes(), b"NXP\x002.0\x00\x00");
    }

    #[test]
    fn test_empty_set_is_double_nul() {
        let mut out = TableBuffer::new();
        StringSet::new().write(&mut out).unwrap();
        assert_eq!(out.as_bytes(), &[0, 0]);
    }

    #[test]
    fn test_too_many_strings() {
        let field: [u8; 4] = fixed_str("x");
        let mut set = StringSet::new();
        for _ in 0..MAX_STRINGS {
            set.add(&field).unwrap();
        }
        assert_eq!(set.add(&field), Err(CmError::OutOfResources));
    }
}
