//! SMBIOS-namespace records
//!
//! System facts for the SMBIOS structures. Strings are fixed NUL-padded
//! fields; an empty field is emitted as string number 0.

use bitflags::bitflags;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::category::Tokened;
use crate::config::NAME_LEN;
use crate::token::TokenRef;

/// Fixed-size SMBIOS string field
pub type SmbiosString = [u8; NAME_LEN];

bitflags! {
    /// BIOS characteristics (type 0, offset 0x0A)
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BiosCharacteristics: u64 {
        const NOT_SUPPORTED = 1 << 3;
        const PCI_SUPPORTED = 1 << 7;
        const UPGRADEABLE = 1 << 11;
        const SHADOWING_ALLOWED = 1 << 12;
        const BOOT_FROM_CD = 1 << 15;
        const SELECTABLE_BOOT = 1 << 16;
    }
}

bitflags! {
    /// BIOS characteristics extension byte 2 (type 0, offset 0x13)
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BiosCharacteristicsExt2: u8 {
        const BOOT_SPECIFICATION = 1 << 0;
        const NETWORK_SERVICE_BOOT = 1 << 1;
        const TARGETED_CONTENT_DISTRIBUTION = 1 << 2;
        const UEFI_SUPPORTED = 1 << 3;
        const VIRTUAL_MACHINE = 1 << 4;
    }
}

bitflags! {
    /// Processor characteristics (type 4, offset 0x26)
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ProcessorCharacteristics: u16 {
        const CAPABLE_64BIT = 1 << 2;
        const MULTI_CORE = 1 << 3;
        const HARDWARE_THREAD = 1 << 4;
        const EXECUTE_PROTECTION = 1 << 5;
        const ENHANCED_VIRTUALIZATION = 1 << 6;
        const POWER_PERFORMANCE_CONTROL = 1 << 7;
        const ARM64_SOC_ID = 1 << 9;
    }
}

/// Processor family value meaning "see family 2"
pub const PROCESSOR_FAMILY_INDICATOR: u8 = 0xFE;

/// Family 2 value of ARMv8 processors
pub const PROCESSOR_FAMILY_ARMV8: u16 = 0x0101;

/// BIOS information (type 0)
#[repr(C, packed)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
pub struct BiosInfo {
    pub vendor: SmbiosString,
    pub version: SmbiosString,
    /// `mm/dd/yyyy`
    pub release_date: SmbiosString,
    pub starting_segment: u16,
    /// ROM size in KiB
    pub rom_size_kb: u32,
    /// [`BiosCharacteristics`]
    pub characteristics: u64,
    pub characteristics_ext1: u8,
    /// [`BiosCharacteristicsExt2`]
    pub characteristics_ext2: u8,
    pub major_release: u8,
    pub minor_release: u8,
    pub ec_major_release: u8,
    pub ec_minor_release: u8,
}

/// System information (type 1)
#[repr(C, packed)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
pub struct SystemInfo {
    pub manufacturer: SmbiosString,
    pub product_name: SmbiosString,
    pub version: SmbiosString,
    pub serial_number: SmbiosString,
    /// UUID in SMBIOS wire order
    pub uuid: [u8; 16],
    pub wakeup_type: u8,
    pub sku_number: SmbiosString,
    pub family: SmbiosString,
}

/// System enclosure (type 3)
#[repr(C, packed)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
pub struct ChassisInfo {
    pub manufacturer: SmbiosString,
    pub chassis_type: u8,
    pub version: SmbiosString,
    pub serial_number: SmbiosString,
    pub asset_tag: SmbiosString,
    pub bootup_state: u8,
    pub power_supply_state: u8,
    pub thermal_state: u8,
    pub security_status: u8,
    pub oem_defined: u32,
    pub height: u8,
    pub power_cords: u8,
    pub sku_number: SmbiosString,
}

/// Processor socket (type 4)
#[repr(C, packed)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
pub struct ProcessorInfo {
    pub socket: SmbiosString,
    pub processor_type: u8,
    pub manufacturer: SmbiosString,
    /// MIDR in the low word, SoC ID in the high word
    pub processor_id: u64,
    pub version: SmbiosString,
    pub voltage: u8,
    /// MHz
    pub external_clock: u16,
    pub max_speed: u16,
    pub current_speed: u16,
    pub status: u8,
    pub upgrade: u8,
    /// SMBIOS cache records; unset encodes as handle 0xFFFF
    pub l1_cache: TokenRef,
    pub l2_cache: TokenRef,
    pub l3_cache: TokenRef,
    pub serial_number: SmbiosString,
    pub asset_tag: SmbiosString,
    pub part_number: SmbiosString,
    pub core_count: u16,
    pub cores_enabled: u16,
    pub thread_count: u16,
    /// [`ProcessorCharacteristics`]
    pub characteristics: u16,
    pub family2: u16,
}

/// Cache (type 7)
#[repr(C, packed)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
pub struct SmbiosCacheInfo {
    pub token: TokenRef,
    pub designation: SmbiosString,
    /// Level in bits 2:0 (0 = L1), enabled bit 7, operational mode bits 9:8
    pub configuration: u16,
    pub max_size_kb: u32,
    pub installed_size_kb: u32,
    pub supported_sram_type: u16,
    pub current_sram_type: u16,
    pub speed: u8,
    pub error_correction: u8,
    pub system_cache_type: u8,
    pub associativity: u8,
}

/// System slot (type 9)
#[repr(C, packed)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
pub struct SystemSlotInfo {
    pub designation: SmbiosString,
    pub slot_type: u8,
    pub data_bus_width: u8,
    pub current_usage: u8,
    pub slot_length: u8,
    pub slot_id: u16,
    pub characteristics1: u8,
    pub characteristics2: u8,
    pub segment_group: u16,
    pub bus: u8,
    pub device_function: u8,
}

/// Physical memory array (type 16)
#[repr(C, packed)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
pub struct MemoryArrayInfo {
    pub token: TokenRef,
    pub location: u8,
    pub memory_use: u8,
    pub error_correction: u8,
    pub maximum_capacity_kb: u64,
    pub number_of_devices: u16,
}

/// Memory device (type 17)
#[repr(C, packed)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
pub struct MemoryDeviceInfo {
    /// Physical memory array holding this device
    pub array: TokenRef,
    pub total_width: u16,
    pub data_width: u16,
    /// Size in MiB, 0 for an empty socket
    pub size_mb: u32,
    pub form_factor: u8,
    pub device_locator: SmbiosString,
    pub bank_locator: SmbiosString,
    pub memory_type: u8,
    pub type_detail: u16,
    /// MT/s
    pub speed: u16,
    pub manufacturer: SmbiosString,
    pub serial_number: SmbiosString,
    pub part_number: SmbiosString,
    pub rank: u8,
    pub configured_speed: u16,
    /// Millivolts
    pub minimum_voltage: u16,
    pub maximum_voltage: u16,
    pub configured_voltage: u16,
}

/// Memory array mapped address (type 19)
#[repr(C, packed)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
pub struct MemoryMappedAddressInfo {
    pub array: TokenRef,
    /// First byte of the range
    pub starting_address: u64,
    /// Last byte of the range (inclusive)
    pub ending_address: u64,
    pub partition_width: u8,
}

/// System boot status (type 32)
#[repr(C, packed)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
pub struct SystemBootInfo {
    /// 0 = no errors detected
    pub boot_status: u8,
}

impl Tokened for SmbiosCacheInfo {
    fn token(&self) -> TokenRef {
        self.token
    }

    fn set_token(&mut self, token: TokenRef) {
        self.token = token;
    }
}

impl Tokened for MemoryArrayInfo {
    fn token(&self) -> TokenRef {
        self.token
    }

    fn set_token(&mut self, token: TokenRef) {
        self.token = token;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_fields_are_fixed_width() {
        let info = SystemInfo::default();
        assert_eq!(info.manufacturer.len(), NAME_LEN);
        assert_eq!(
            core::mem::size_of::<SystemInfo>(),
            6 * NAME_LEN + 16 + 1
        );
    }

    #[test]
    fn test_processor_characteristics_bits() {
        let flags = ProcessorCharacteristics::CAPABLE_64BIT | ProcessorCharacteristics::MULTI_CORE;
        assert_eq!(flags.bits(), 0x000C);
    }
}
