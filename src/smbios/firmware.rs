//! Platform firmware, system, enclosure and boot status structures
//! (types 0, 1, 3 and 32)

use zerocopy::{Immutable, IntoBytes};

use super::{SmbiosBuilder, SmbiosGenerator, SmbiosHeader, SmbiosType, StringSet};
use crate::dispatch::ConfigurationManager;
use crate::error::CmError;
use crate::repository;
use crate::table::TableBuffer;

/// Largest ROM size the one-byte field can express
const ROM_SIZE_BYTE_LIMIT_KB: u32 = 16 * 1024;

#[repr(C, packed)]
#[derive(Debug, Clone, Copy, IntoBytes, Immutable)]
struct Type0 {
    header: SmbiosHeader,
    vendor: u8,
    version: u8,
    starting_segment: u16,
    release_date: u8,
    rom_size: u8,
    characteristics: u64,
    characteristics_ext1: u8,
    characteristics_ext2: u8,
    major_release: u8,
    minor_release: u8,
    ec_major_release: u8,
    ec_minor_release: u8,
    extended_rom_size: u16,
}

#[repr(C, packed)]
#[derive(Debug, Clone, Copy, IntoBytes, Immutable)]
struct Type1 {
    header: SmbiosHeader,
    manufacturer: u8,
    product_name: u8,
    version: u8,
    serial_number: u8,
    uuid: [u8; 16],
    wakeup_type: u8,
    sku_number: u8,
    family: u8,
}

#[repr(C, packed)]
#[derive(Debug, Clone, Copy, IntoBytes, Immutable)]
struct Type3 {
    header: SmbiosHeader,
    manufacturer: u8,
    chassis_type: u8,
    version: u8,
    serial_number: u8,
    asset_tag: u8,
    bootup_state: u8,
    power_supply_state: u8,
    thermal_state: u8,
    security_status: u8,
    oem_defined: u32,
    height: u8,
    power_cords: u8,
    contained_element_count: u8,
    contained_element_length: u8,
    sku_number: u8,
}

#[repr(C, packed)]
#[derive(Debug, Clone, Copy, IntoBytes, Immutable)]
struct Type32 {
    header: SmbiosHeader,
    reserved: [u8; 6],
    boot_status: u8,
}

const _: () = assert!(size_of::<Type0>() == 26);
const _: () = assert!(size_of::<Type1>() == 27);
const _: () = assert!(size_of::<Type3>() == 22);
const _: () = assert!(size_of::<Type32>() == 11);

/// ROM size byte (64 KiB units minus one) and extended ROM size
///
/// From 16 MiB up the byte reads 0xFF and the extended field carries the
/// size in MiB, or in GiB (bits 15:14 = 01) once MiB no longer fit.
fn encode_rom_size(kb: u32) -> (u8, u16) {
    if kb < ROM_SIZE_BYTE_LIMIT_KB {
        let units = kb.div_ceil(64).max(1);
        return ((units - 1) as u8, 0);
    }
    let mb = kb / 1024;
    if mb < 0x4000 {
        (0xFF, mb as u16)
    } else {
        (0xFF, 0x4000 | (mb / 1024).min(0x3FFF) as u16)
    }
}

pub struct Bios;

impl SmbiosGenerator for Bios {
    const TYPE: SmbiosType = SmbiosType::Bios;

    fn emit(
        cm: &ConfigurationManager<'_>,
        builder: &mut SmbiosBuilder,
        out: &mut TableBuffer,
    ) -> Result<usize, CmError> {
        let records = cm.resolve_all::<repository::Bios>()?;
        for bios in records.iter() {
            let mut strings = StringSet::new();
            let (rom_size, extended_rom_size) = encode_rom_size(bios.rom_size_kb);
            let structure = Type0 {
                header: builder.header::<Type0>(Self::TYPE as u8)?,
                vendor: strings.add(&bios.vendor)?,
                version: strings.add(&bios.version)?,
                starting_segment: bios.starting_segment,
                release_date: strings.add(&bios.release_date)?,
                rom_size,
                characteristics: bios.characteristics,
                characteristics_ext1: bios.characteristics_ext1,
                characteristics_ext2: bios.characteristics_ext2,
                major_release: bios.major_release,
                minor_release: bios.minor_release,
                ec_major_release: bios.ec_major_release,
                ec_minor_release: bios.ec_minor_release,
                extended_rom_size,
            };
            builder.emit(out, &structure, &strings)?;
        }
        Ok(records.count())
    }
}

pub struct System;

impl SmbiosGenerator for System {
    const TYPE: SmbiosType = SmbiosType::System;

    fn emit(
        cm: &ConfigurationManager<'_>,
        builder: &mut SmbiosBuilder,
        out: &mut TableBuffer,
    ) -> Result<usize, CmError> {
        let records = cm.resolve_all::<repository::System>()?;
        for system in records.iter() {
            let mut strings = StringSet::new();
            let structure = Type1 {
                header: builder.header::<Type1>(Self::TYPE as u8)?,
                manufacturer: strings.add(&system.manufacturer)?,
                product_name: strings.add(&system.product_name)?,
                version: strings.add(&system.version)?,
                serial_number: strings.add(&system.serial_number)?,
                uuid: system.uuid,
                wakeup_type: system.wakeup_type,
                sku_number: strings.add(&system.sku_number)?,
                family: strings.add(&system.family)?,
            };
            builder.emit(out, &structure, &strings)?;
        }
        Ok(records.count())
    }
}

pub struct Chassis;

impl SmbiosGenerator for Chassis {
    const TYPE: SmbiosType = SmbiosType::Chassis;

    fn emit(
        cm: &ConfigurationManager<'_>,
        builder: &mut SmbiosBuilder,
        out: &mut TableBuffer,
    ) -> Result<usize, CmError> {
        let records = cm.resolve_all::<repository::Chassis>()?;
        for chassis in records.iter() {
            let mut strings = StringSet::new();
            let structure = Type3 {
                header: builder.header::<Type3>(Self::TYPE as u8)?,
                manufacturer: strings.add(&chassis.manufacturer)?,
                chassis_type: chassis.chassis_type,
                version: strings.add(&chassis.version)?,
                serial_number: strings.add(&chassis.serial_number)?,
                asset_tag: strings.add(&chassis.asset_tag)?,
                bootup_state: chassis.bootup_state,
                power_supply_state: chassis.power_supply_state,
                thermal_state: chassis.thermal_state,
                security_status: chassis.security_status,
                oem_defined: chassis.oem_defined,
                height: chassis.height,
                power_cords: chassis.power_cords,
                contained_element_count: 0,
                contained_element_length: 0,
                sku_number: strings.add(&chassis.sku_number)?,
            };
            builder.emit(out, &structure, &strings)?;
        }
        Ok(records.count())
    }
}

pub struct SystemBoot;

impl SmbiosGenerator for SystemBoot {
    const TYPE: SmbiosType = SmbiosType::SystemBoot;

    fn emit(
        cm: &ConfigurationManager<'_>,
        builder: &mut SmbiosBuilder,
        out: &mut TableBuffer,
    ) -> Result<usize, CmError> {
        let records = cm.resolve_all::<repository::SystemBoot>()?;
        for boot in records.iter() {
            let structure = Type32 {
                header: builder.header::<Type32>(Self::TYPE as u8)?,
                reserved: [0; 6],
                boot_status: boot.boot_status,
            };
            builder.emit(out, &structure, &StringSet::new())?;
        }
        Ok(records.count())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_util::*;
    use super::*;
    use crate::acpi::test_util::{board, read_u16, read_u64};
    use crate::config::fixed_str;
    use crate::records::{BiosInfo, SmbiosTableInfo, SystemInfo};
    use crate::repository::Repository;

    fn build(cm: &ConfigurationManager<'_>, kind: SmbiosType) -> TableBuffer {
        let mut builder = SmbiosBuilder::new();
        let mut out = TableBuffer::new();
        let info = SmbiosTableInfo {
            structure_type: kind as u8,
        };
        builder.build(cm, &info, &mut out).unwrap();
        out
    }

    #[test]
    fn test_rom_size_encoding() {
        assert_eq!(encode_rom_size(64), (0, 0));
        assert_eq!(encode_rom_size(4096), (63, 0));
        assert_eq!(encode_rom_size(100), (1, 0));
        assert_eq!(encode_rom_size(64 * 1024), (0xFF, 64));
        assert_eq!(encode_rom_size(u32::MAX), (0xFF, 0x4000 | 4095));
    }

    #[test]
    fn test_bios_layout() {
        let mut repo = Repository::new();
        repo.add::<repository::Bios>(BiosInfo {
            vendor: fixed_str("NXP"),
            version: fixed_str("2.0"),
            release_date: fixed_str("10/01/2026"),
            rom_size_kb: 4096,
            characteristics: 0x0000_0000_0001_0880,
            major_release: 2,
            ..Default::default()
        })
        .unwrap();
        let cm = repo.freeze().unwrap();
        let out = build(&cm, SmbiosType::Bios);
        let bytes = out.as_bytes();

        assert_eq!(bytes[0], 0);
        assert_eq!(bytes[1], 26);
        assert_eq!(bytes[4], 1);
        assert_eq!(bytes[5], 2);
        assert_eq!(bytes[8], 3);
        assert_eq!(bytes[9], 63);
        assert_eq!(read_u64(bytes, 0x0A), 0x0001_0880);
        assert_eq!(bytes[0x14], 2);
        assert_eq!(string_at(bytes, 0, 3), b"10/01/2026");
        assert_eq!(next_structure(bytes, 0), bytes.len());
    }

    #[test]
    fn test_system_empty_strings() {
        let mut repo = Repository::new();
        repo.add::<repository::System>(SystemInfo {
            product_name: fixed_str("LX2160A-RDB"),
            uuid: [0xAB; 16],
            ..Default::default()
        })
        .unwrap();
        let cm = repo.freeze().unwrap();
        let out = build(&cm, SmbiosType::System);
        let bytes = out.as_bytes();

        assert_eq!(bytes[1], 27);
        // Manufacturer empty, product is string 1
        assert_eq!(bytes[4], 0);
        assert_eq!(bytes[5], 1);
        assert_eq!(&bytes[8..24], &[0xAB; 16]);
        assert_eq!(&bytes[27..], b"LX2160A-RDB\x00\x00");
    }

    #[test]
    fn test_board_chassis_and_boot() {
        let repo = board();
        let cm = repo.freeze().unwrap();

        let out = build(&cm, SmbiosType::Chassis);
        let bytes = out.as_bytes();
        assert_eq!(bytes[0], 3);
        assert_eq!(bytes[1], 22);
        assert_eq!(bytes[0x13], 0);

        let out = build(&cm, SmbiosType::SystemBoot);
        let bytes = out.as_bytes();
        assert_eq!(bytes.len(), 11 + 2);
        assert_eq!(bytes[10], 0);
        assert_eq!(read_u16(bytes, 2), 0);
    }
}
