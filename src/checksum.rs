//! 8-bit table checksums
//!
//! ACPI tables and the SMBIOS entry point are valid when all their bytes sum
//! to zero modulo 256.

use crate::error::CmError;

/// Wrapping byte sum
pub fn sum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// Compute and store the checksum byte at `offset`
///
/// The byte is zeroed before summing, so finalizing twice gives the same
/// result. Returns the stored value.
pub fn finalize(bytes: &mut [u8], offset: usize) -> Result<u8, CmError> {
    let slot = bytes.get_mut(offset).ok_or(CmError::InvalidParameter)?;
    *slot = 0;
    let checksum = sum(bytes).wrapping_neg();
    bytes[offset] = checksum;
    Ok(checksum)
}

/// Whether `bytes` sum to zero
pub fn verify(bytes: &[u8]) -> bool {
    sum(bytes) == 0
}
