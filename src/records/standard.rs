//! Standard-namespace records

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Configuration manager information
#[repr(C, packed)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
pub struct CmInfo {
    /// Configuration manager revision
    pub revision: u32,
    /// OEM ID stamped into every ACPI table header
    pub oem_id: [u8; 6],
}

/// One entry of the platform's ACPI table list
#[repr(C, packed)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
pub struct AcpiTableInfo {
    /// Table signature, must match the generator
    pub signature: [u8; 4],
    /// Table revision, 0 selects the generator's revision
    pub revision: u8,
    /// Generator to run (`acpi::AcpiTableId`)
    pub generator_id: u32,
    /// OEM table ID for the header
    pub oem_table_id: u64,
    /// OEM revision for the header
    pub oem_revision: u32,
}

/// One entry of the platform's SMBIOS table list
#[repr(C, packed)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
pub struct SmbiosTableInfo {
    /// SMBIOS structure type to generate
    pub structure_type: u8,
}
