//! ARM-namespace records
//!
//! Interrupt controller, timer, PCI, IO remapping and processor topology
//! descriptions. Field meanings follow the ACPI structures they feed.

use bitflags::bitflags;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::category::{Owned, Tokened};
use crate::config::NAME_LEN;
use crate::token::TokenRef;

bitflags! {
    /// GIC CPU interface flags (MADT GICC)
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct GiccFlags: u32 {
        const ENABLED = 1 << 0;
        const PERFORMANCE_INTERRUPT_EDGE = 1 << 1;
        const VGIC_MAINTENANCE_EDGE = 1 << 2;
    }
}

bitflags! {
    /// Generic timer interrupt flags (GTDT)
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TimerFlags: u32 {
        const EDGE_TRIGGERED = 1 << 0;
        const ACTIVE_LOW = 1 << 1;
        const ALWAYS_ON = 1 << 2;
    }
}

bitflags! {
    /// Processor hierarchy node flags (PPTT)
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ProcessorFlags: u32 {
        const PHYSICAL_PACKAGE = 1 << 0;
        const ACPI_PROCESSOR_ID_VALID = 1 << 1;
        const PROCESSOR_IS_THREAD = 1 << 2;
        const NODE_IS_LEAF = 1 << 3;
        const IDENTICAL_IMPLEMENTATION = 1 << 4;
    }
}

bitflags! {
    /// IORT ID mapping flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct IdMappingFlags: u32 {
        const SINGLE_MAPPING = 1 << 0;
    }
}

/// PPTT cache attribute encodings
pub mod cache_attributes {
    pub const ALLOCATE_READ: u8 = 0x0;
    pub const ALLOCATE_WRITE: u8 = 0x1;
    pub const ALLOCATE_READ_WRITE: u8 = 0x3;
    pub const TYPE_DATA: u8 = 0x0 << 2;
    pub const TYPE_INSTRUCTION: u8 = 0x1 << 2;
    pub const TYPE_UNIFIED: u8 = 0x2 << 2;
    pub const WRITE_BACK: u8 = 0x0 << 4;
    pub const WRITE_THROUGH: u8 = 0x1 << 4;
}

/// SPCR interface subtypes used on Layerscape parts
pub mod serial_subtype {
    /// 16550-compatible with parameters in the generic address structure
    pub const NS16550_GAS: u16 = 0x12;
    /// ARM PL011 UART
    pub const PL011: u16 = 0x03;
}

/// Value stored in optional timer base addresses when not implemented
pub const ADDRESS_NOT_IMPLEMENTED: u64 = u64::MAX;

/// GIC CPU interface
#[repr(C, packed)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
pub struct GicCInfo {
    pub cpu_interface_number: u32,
    pub acpi_processor_uid: u32,
    /// [`GiccFlags`]
    pub flags: u32,
    pub parking_protocol_version: u32,
    pub performance_interrupt_gsiv: u32,
    pub parked_address: u64,
    pub physical_base_address: u64,
    pub gicv: u64,
    pub gich: u64,
    pub vgic_maintenance_interrupt: u32,
    pub gicr_base_address: u64,
    pub mpidr: u64,
    pub processor_power_efficiency_class: u8,
    pub spe_overflow_interrupt: u16,
}

/// GIC distributor
#[repr(C, packed)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
pub struct GicDInfo {
    pub physical_base_address: u64,
    pub system_vector_base: u32,
    pub gic_version: u8,
}

/// GIC redistributor discovery range
#[repr(C, packed)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
pub struct GicRedistributorInfo {
    pub discovery_range_base_address: u64,
    pub discovery_range_length: u32,
}

/// GIC interrupt translation service
#[repr(C, packed)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
pub struct GicItsInfo {
    pub its_id: u32,
    pub physical_base_address: u64,
}

/// Serial port used as the OS console
#[repr(C, packed)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
pub struct SerialPortInfo {
    pub base_address: u64,
    pub base_address_length: u64,
    pub interrupt: u32,
    pub baud_rate: u64,
    pub clock: u32,
    /// See [`serial_subtype`]
    pub port_subtype: u16,
}

/// Architected generic timer
#[repr(C, packed)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
pub struct GenericTimerInfo {
    pub counter_control_base: u64,
    pub counter_read_base: u64,
    pub secure_pl1_gsiv: u32,
    /// [`TimerFlags`]
    pub secure_pl1_flags: u32,
    pub non_secure_pl1_gsiv: u32,
    pub non_secure_pl1_flags: u32,
    pub virtual_timer_gsiv: u32,
    pub virtual_timer_flags: u32,
    pub non_secure_pl2_gsiv: u32,
    pub non_secure_pl2_flags: u32,
    pub virtual_pl2_gsiv: u32,
    pub virtual_pl2_flags: u32,
}

/// Memory-mapped generic timer block; its frames name it as owner
#[repr(C, packed)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
pub struct GtBlockInfo {
    pub token: TokenRef,
    pub physical_address: u64,
}

/// One frame of a generic timer block
#[repr(C, packed)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
pub struct GtBlockTimerFrameInfo {
    pub owner: TokenRef,
    pub frame_number: u8,
    pub physical_address: u64,
    pub el0_physical_address: u64,
    pub physical_timer_gsiv: u32,
    pub physical_timer_flags: u32,
    pub virtual_timer_gsiv: u32,
    pub virtual_timer_flags: u32,
    pub common_flags: u32,
}

/// SBSA generic watchdog
#[repr(C, packed)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
pub struct GenericWatchdogInfo {
    pub refresh_frame_address: u64,
    pub control_frame_address: u64,
    pub timer_gsiv: u32,
    pub flags: u32,
}

/// ECAM window of one PCI segment
#[repr(C, packed)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
pub struct PciConfigSpaceInfo {
    pub base_address: u64,
    pub pci_segment_group: u16,
    pub start_bus: u8,
    pub end_bus: u8,
}

/// IORT ITS group; identifiers name it as owner
#[repr(C, packed)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
pub struct ItsGroupNode {
    pub token: TokenRef,
}

/// IORT named component
#[repr(C, packed)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
pub struct NamedComponentNode {
    pub token: TokenRef,
    pub flags: u32,
    pub cache_coherent: u32,
    pub allocation_hints: u8,
    pub memory_access_flags: u8,
    pub address_size_limit: u8,
    /// Full ACPI namespace path, NUL-terminated
    pub object_name: [u8; NAME_LEN],
}

/// IORT PCI root complex
#[repr(C, packed)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
pub struct RootComplexNode {
    pub token: TokenRef,
    pub cache_coherent: u32,
    pub allocation_hints: u8,
    pub memory_access_flags: u8,
    pub ats_attribute: u32,
    pub pci_segment_number: u32,
}

/// IORT SMMUv1/SMMUv2 node
#[repr(C, packed)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
pub struct SmmuV2Node {
    pub token: TokenRef,
    pub base_address: u64,
    pub span: u64,
    pub model: u32,
    pub flags: u32,
    pub global_interrupt_gsiv: u32,
    pub global_interrupt_flags: u32,
    pub global_config_interrupt_gsiv: u32,
    pub global_config_interrupt_flags: u32,
}

/// Kind of an SMMU interrupt
pub mod smmu_interrupt_kind {
    pub const CONTEXT: u8 = 0;
    pub const PMU: u8 = 1;
}

/// Context or PMU interrupt of an SMMU
#[repr(C, packed)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
pub struct SmmuInterrupt {
    pub owner: TokenRef,
    /// See [`smmu_interrupt_kind`]
    pub kind: u8,
    pub gsiv: u32,
    pub flags: u32,
}

/// ITS identifier of an ITS group
#[repr(C, packed)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
pub struct ItsIdentifier {
    pub owner: TokenRef,
    pub its_id: u32,
}

/// ID mapping of an IORT node
#[repr(C, packed)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
pub struct IdMapping {
    pub owner: TokenRef,
    pub input_base: u32,
    /// Number of IDs in the range (at least one)
    pub id_count: u32,
    pub output_base: u32,
    /// ITS group or SMMU receiving the output IDs
    pub output_reference: TokenRef,
    /// [`IdMappingFlags`]
    pub flags: u32,
}

/// Processor hierarchy node (package, cluster, core or thread)
#[repr(C, packed)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
pub struct ProcHierarchyInfo {
    pub token: TokenRef,
    /// [`ProcessorFlags`]
    pub flags: u32,
    pub parent: TokenRef,
    /// GIC CPU interface of a leaf node; its UID becomes the processor ID
    pub gicc: TokenRef,
    /// Processor ID used when `gicc` is not set
    pub acpi_processor_id: u32,
}

/// Cache description
#[repr(C, packed)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
pub struct CacheInfo {
    pub token: TokenRef,
    pub next_level: TokenRef,
    /// Size in bytes
    pub size: u32,
    pub number_of_sets: u32,
    pub associativity: u32,
    /// See [`cache_attributes`]
    pub attributes: u8,
    pub line_size: u16,
}

/// Private resource (cache) of a processor hierarchy node
#[repr(C, packed)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
pub struct PrivateResource {
    pub owner: TokenRef,
    pub resource: TokenRef,
}

macro_rules! tokened {
    ($($record:ty),* $(,)?) => {
        $(impl Tokened for $record {
            fn token(&self) -> TokenRef {
                self.token
            }

            fn set_token(&mut self, token: TokenRef) {
                self.token = token;
            }
        })*
    };
}

macro_rules! owned {
    ($($record:ty),* $(,)?) => {
        $(impl Owned for $record {
            fn owner(&self) -> TokenRef {
                self.owner
            }
        })*
    };
}

tokened!(
    GtBlockInfo,
    ItsGroupNode,
    NamedComponentNode,
    RootComplexNode,
    SmmuV2Node,
    ProcHierarchyInfo,
    CacheInfo,
);

owned!(
    GtBlockTimerFrameInfo,
    SmmuInterrupt,
    ItsIdentifier,
    IdMapping,
    PrivateResource,
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Token;

    #[test]
    fn test_record_sizes_have_no_padding() {
        assert_eq!(core::mem::size_of::<GicCInfo>(), 75);
        assert_eq!(core::mem::size_of::<PciConfigSpaceInfo>(), 12);
        assert_eq!(core::mem::align_of::<CacheInfo>(), 1);
    }

    #[test]
    fn test_tokened_and_owned() {
        let mut cache = CacheInfo::default();
        let token = TokenRef::from(Token::from_index(9));
        cache.set_token(token);
        assert_eq!(cache.token(), token);

        let mapping = IdMapping {
            owner: token,
            ..Default::default()
        };
        assert_eq!(mapping.owner(), token);
    }
}
