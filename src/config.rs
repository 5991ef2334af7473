//! Build-time configuration
//!
//! Capacities of the repository categories and identity values stamped into
//! generated tables. Every capacity must be at least the number of records
//! the platform initializer populates.

/// Maximum number of CPU cores (LX2160A: 8 clusters of 2 Cortex-A72)
pub const MAX_CPUS: usize = 16;

/// Maximum number of ACPI tables in the platform table list
pub const MAX_ACPI_TABLES: usize = 16;

/// Maximum number of SMBIOS structure types in the platform table list
pub const MAX_SMBIOS_TABLES: usize = 16;

/// GIC redistributor discovery ranges
pub const MAX_GIC_REDISTRIBUTORS: usize = 4;

/// GIC interrupt translation services
pub const MAX_GIC_ITS: usize = 4;

/// Memory-mapped generic timer blocks
pub const MAX_GT_BLOCKS: usize = 4;

/// Timer frames over all GT blocks (at most 8 per block)
pub const MAX_GT_FRAMES: usize = 16;

/// SBSA generic watchdogs
pub const MAX_WATCHDOGS: usize = 4;

/// PCI segments with an ECAM window
pub const MAX_PCI_SEGMENTS: usize = 8;

/// IORT ITS group nodes
pub const MAX_ITS_GROUPS: usize = 4;

/// ITS identifiers over all ITS groups
pub const MAX_ITS_IDENTIFIERS: usize = 16;

/// IORT named component nodes
pub const MAX_NAMED_COMPONENTS: usize = 16;

/// IORT root complex nodes
pub const MAX_ROOT_COMPLEXES: usize = 8;

/// SMMUv1/v2 nodes
pub const MAX_SMMUS: usize = 2;

/// ID mappings over all IORT nodes
pub const MAX_ID_MAPPINGS: usize = 64;

/// SMMU context and PMU interrupts over all SMMU nodes
pub const MAX_SMMU_INTERRUPTS: usize = 128;

/// Processor hierarchy nodes (package, clusters, cores)
pub const MAX_PROC_NODES: usize = 32;

/// PPTT cache descriptions
pub const MAX_CACHES: usize = 64;

/// Private resource references over all processor nodes
pub const MAX_PRIVATE_RESOURCES: usize = 128;

/// Bytes of AML in the DSDT definition block
pub const DEFINITION_BLOCK_CAPACITY: usize = 8 * 1024;

/// SMBIOS processor sockets
pub const MAX_SMBIOS_PROCESSORS: usize = 4;

/// SMBIOS cache structures
pub const MAX_SMBIOS_CACHES: usize = 16;

/// SMBIOS system slots
pub const MAX_SYSTEM_SLOTS: usize = 8;

/// SMBIOS physical memory arrays
pub const MAX_MEMORY_ARRAYS: usize = 2;

/// SMBIOS memory devices
pub const MAX_MEMORY_DEVICES: usize = 8;

/// SMBIOS memory array mapped address ranges
pub const MAX_MAPPED_ADDRESSES: usize = 8;

/// Categories in the dispatch map (power of two)
pub const DISPATCH_CAPACITY: usize = 64;

/// Largest table a generator may emit
pub const TABLE_CAPACITY: usize = 16 * 1024;

/// Length of fixed-size name and string fields in records
pub const NAME_LEN: usize = 32;

/// Configuration manager revision (1.0)
pub const CM_REVISION: u32 = 0x0001_0000;

/// Default OEM ID for generated ACPI tables
pub const OEM_ID: [u8; 6] = *b"NXP   ";

/// ACPI creator ID ("NXP ")
pub const CREATOR_ID: u32 = u32::from_le_bytes(*b"NXP ");

/// ACPI creator revision
pub const CREATOR_REVISION: u32 = 0x0000_0001;

/// SMBIOS version emitted in the entry point
pub const SMBIOS_MAJOR_VERSION: u8 = 3;

/// SMBIOS minor version emitted in the entry point
pub const SMBIOS_MINOR_VERSION: u8 = 3;

/// Copy a string into a fixed, NUL-padded field
///
/// The string is truncated so the field always ends with a NUL byte.
pub const fn fixed_str<const N: usize>(s: &str) -> [u8; N] {
    let bytes = s.as_bytes();
    let mut out = [0u8; N];
    let mut i = 0;
    while i < bytes.len() && i + 1 < N {
        out[i] = bytes[i];
        i += 1;
    }
    out
}

/// Bytes of a fixed field up to the first NUL
pub fn field_str(field: &[u8]) -> &[u8] {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    &field[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_str() {
        let field: [u8; 8] = fixed_str("NXP");
        assert_eq!(&field, b"NXP\0\0\0\0\0");
        assert_eq!(field_str(&field), b"NXP");

        // Truncated so the last byte stays NUL
        let field: [u8; 4] = fixed_str("LX2160A");
        assert_eq!(&field, b"LX2\0");
    }

    #[test]
    fn test_dispatch_capacity_is_power_of_two() {
        assert!(DISPATCH_CAPACITY.is_power_of_two());
    }
}
