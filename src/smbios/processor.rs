//! Processor and cache structures (types 4 and 7)

use zerocopy::{Immutable, IntoBytes};

use super::{SmbiosBuilder, SmbiosGenerator, SmbiosHeader, SmbiosType, StringSet, count_u8};
use crate::dispatch::ConfigurationManager;
use crate::error::CmError;
use crate::records::PROCESSOR_FAMILY_INDICATOR;
use crate::repository::{self, SmbiosCache};
use crate::table::TableBuffer;

#[repr(C, packed)]
#[derive(Debug, Clone, Copy, IntoBytes, Immutable)]
struct Type4 {
    header: SmbiosHeader,
    socket: u8,
    processor_type: u8,
    family: u8,
    manufacturer: u8,
    processor_id: u64,
    version: u8,
    voltage: u8,
    external_clock: u16,
    max_speed: u16,
    current_speed: u16,
    status: u8,
    upgrade: u8,
    l1_cache_handle: u16,
    l2_cache_handle: u16,
    l3_cache_handle: u16,
    serial_number: u8,
    asset_tag: u8,
    part_number: u8,
    core_count: u8,
    cores_enabled: u8,
    thread_count: u8,
    characteristics: u16,
    family2: u16,
    core_count2: u16,
    cores_enabled2: u16,
    thread_count2: u16,
}

#[repr(C, packed)]
#[derive(Debug, Clone, Copy, IntoBytes, Immutable)]
struct Type7 {
    header: SmbiosHeader,
    designation: u8,
    configuration: u16,
    max_size: u16,
    installed_size: u16,
    supported_sram_type: u16,
    current_sram_type: u16,
    speed: u8,
    error_correction: u8,
    system_cache_type: u8,
    associativity: u8,
    max_size2: u32,
    installed_size2: u32,
}

const _: () = assert!(size_of::<Type4>() == 48);
const _: () = assert!(size_of::<Type7>() == 27);

/// 16-bit and 32-bit cache size fields for a size in KiB
///
/// Bit 15 (bit 31 in the wide field) selects 64 KiB granularity. Both
/// fields use the same granularity; sizes beyond the 16-bit range leave
/// the narrow field at 0xFFFF.
fn encode_cache_size(kb: u32) -> (u16, u32) {
    if kb < 0x8000 {
        return (kb as u16, kb);
    }
    let units = kb / 64;
    let wide = 0x8000_0000 | units;
    if units < 0x8000 {
        (0x8000 | units as u16, wide)
    } else {
        (0xFFFF, wide)
    }
}

pub struct Processor;

impl SmbiosGenerator for Processor {
    const TYPE: SmbiosType = SmbiosType::Processor;

    fn emit(
        cm: &ConfigurationManager<'_>,
        builder: &mut SmbiosBuilder,
        out: &mut TableBuffer,
    ) -> Result<usize, CmError> {
        let records = cm.resolve_all::<repository::Processor>()?;
        for cpu in records.iter() {
            let family2 = cpu.family2;
            let family = u8::try_from(family2)
                .ok()
                .filter(|&family| family < PROCESSOR_FAMILY_INDICATOR)
                .unwrap_or(PROCESSOR_FAMILY_INDICATOR);
            let mut strings = StringSet::new();
            let structure = Type4 {
                header: builder.header::<Type4>(Self::TYPE as u8)?,
                socket: strings.add(&cpu.socket)?,
                processor_type: cpu.processor_type,
                family,
                manufacturer: strings.add(&cpu.manufacturer)?,
                processor_id: cpu.processor_id,
                version: strings.add(&cpu.version)?,
                voltage: cpu.voltage,
                external_clock: cpu.external_clock,
                max_speed: cpu.max_speed,
                current_speed: cpu.current_speed,
                status: cpu.status,
                upgrade: cpu.upgrade,
                l1_cache_handle: builder.cache_handle(cm, cpu.l1_cache)?,
                l2_cache_handle: builder.cache_handle(cm, cpu.l2_cache)?,
                l3_cache_handle: builder.cache_handle(cm, cpu.l3_cache)?,
                serial_number: strings.add(&cpu.serial_number)?,
                asset_tag: strings.add(&cpu.asset_tag)?,
                part_number: strings.add(&cpu.part_number)?,
                core_count: count_u8(cpu.core_count),
                cores_enabled: count_u8(cpu.cores_enabled),
                thread_count: count_u8(cpu.thread_count),
                characteristics: cpu.characteristics,
                family2,
                core_count2: cpu.core_count,
                cores_enabled2: cpu.cores_enabled,
                thread_count2: cpu.thread_count,
            };
            builder.emit(out, &structure, &strings)?;
        }
        Ok(records.count())
    }
}

pub struct Cache;

impl SmbiosGenerator for Cache {
    const TYPE: SmbiosType = SmbiosType::Cache;

    fn emit(
        cm: &ConfigurationManager<'_>,
        builder: &mut SmbiosBuilder,
        out: &mut TableBuffer,
    ) -> Result<usize, CmError> {
        let records = cm.resolve_all::<SmbiosCache>()?;
        for cache in records.iter() {
            let (max_size, max_size2) = encode_cache_size(cache.max_size_kb);
            let (installed_size, installed_size2) = encode_cache_size(cache.installed_size_kb);
            let header = builder.header::<Type7>(Self::TYPE as u8)?;
            builder.bind_cache(cache.token, header.handle)?;

            let mut strings = StringSet::new();
            let structure = Type7 {
                header,
                designation: strings.add(&cache.designation)?,
                configuration: cache.configuration,
                max_size,
                installed_size,
                supported_sram_type: cache.supported_sram_type,
                current_sram_type: cache.current_sram_type,
                speed: cache.speed,
                error_correction: cache.error_correction,
                system_cache_type: cache.system_cache_type,
                associativity: cache.associativity,
                max_size2,
                installed_size2,
            };
            builder.emit(out, &structure, &strings)?;
        }
        Ok(records.count())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_util::*;
    use super::super::HANDLE_NONE;
    use super::*;
    use crate::acpi::test_util::{read_u16, read_u32};
    use crate::config::fixed_str;
    use crate::records::{
        PROCESSOR_FAMILY_ARMV8, ProcessorInfo, SmbiosCacheInfo, SmbiosTableInfo,
    };
    use crate::repository::Repository;
    use crate::token::{Token, TokenRef};

    fn table(kind: SmbiosType) -> SmbiosTableInfo {
        SmbiosTableInfo {
            structure_type: kind as u8,
        }
    }

    #[test]
    fn test_cache_size_encoding() {
        assert_eq!(encode_cache_size(32), (32, 32));
        assert_eq!(encode_cache_size(0x7FFF), (0x7FFF, 0x7FFF));
        assert_eq!(encode_cache_size(8 * 1024), (8 * 1024, 8 * 1024));
        assert_eq!(encode_cache_size(32 * 1024), (0x8000 | 512, 0x8000_0200));
        assert_eq!(encode_cache_size(4 * 1024 * 1024), (0xFFFF, 0x8001_0000));
    }

    /// L1 and L2 caches and one 16-core processor using them
    fn repo_with_caches() -> Repository {
        let mut repo = Repository::new();
        let l1 = repo
            .add::<SmbiosCache>(SmbiosCacheInfo {
                designation: fixed_str("L1 Data"),
                configuration: 0x0180,
                max_size_kb: 32,
                installed_size_kb: 32,
                ..Default::default()
            })
            .unwrap();
        let l2 = repo
            .add::<SmbiosCache>(SmbiosCacheInfo {
                designation: fixed_str("L2"),
                configuration: 0x0181,
                max_size_kb: 1024,
                installed_size_kb: 1024,
                ..Default::default()
            })
            .unwrap();
        repo.add::<repository::Processor>(ProcessorInfo {
            socket: fixed_str("CPU0"),
            manufacturer: fixed_str("NXP"),
            processor_id: 0x0000_8736_410F_D083,
            l1_cache: l1.into(),
            l2_cache: l2.into(),
            core_count: 16,
            cores_enabled: 16,
            thread_count: 16,
            family2: PROCESSOR_FAMILY_ARMV8,
            ..Default::default()
        })
        .unwrap();
        repo
    }

    #[test]
    fn test_processor_references_caches() {
        let repo = repo_with_caches();
        let cm = repo.freeze().unwrap();
        let mut builder = SmbiosBuilder::new();
        let mut out = TableBuffer::new();
        builder.build(&cm, &table(SmbiosType::Cache), &mut out).unwrap();
        builder.build(&cm, &table(SmbiosType::Processor), &mut out).unwrap();
        let bytes = out.as_bytes();

        let l1 = 0;
        let l2 = structure_offset(bytes, 1);
        let cpu = structure_offset(bytes, 2);
        assert_eq!(bytes[l1 + 1], 27);
        assert_eq!(string_at(bytes, l1, 1), b"L1 Data");
        assert_eq!(read_u16(bytes, l2 + 7), 1024);
        assert_eq!(read_u32(bytes, l2 + 0x13), 1024);

        assert_eq!(bytes[cpu], 4);
        assert_eq!(bytes[cpu + 1], 48);
        assert_eq!(bytes[cpu + 6], PROCESSOR_FAMILY_INDICATOR);
        assert_eq!(read_u16(bytes, cpu + 0x1A), handle_of(bytes, l1));
        assert_eq!(read_u16(bytes, cpu + 0x1C), handle_of(bytes, l2));
        assert_eq!(read_u16(bytes, cpu + 0x1E), HANDLE_NONE);
        assert_eq!(bytes[cpu + 0x23], 16);
        assert_eq!(read_u16(bytes, cpu + 0x28), PROCESSOR_FAMILY_ARMV8);
        assert_eq!(read_u16(bytes, cpu + 0x2A), 16);
        assert_eq!(string_at(bytes, cpu, 2), b"NXP");
    }

    #[test]
    fn test_cache_not_built_is_none() {
        let repo = repo_with_caches();
        let cm = repo.freeze().unwrap();
        let mut builder = SmbiosBuilder::new();
        let mut out = TableBuffer::new();
        builder.build(&cm, &table(SmbiosType::Processor), &mut out).unwrap();
        assert_eq!(read_u16(out.as_bytes(), 0x1A), HANDLE_NONE);
        assert_eq!(read_u16(out.as_bytes(), 0x1C), HANDLE_NONE);
    }

    #[test]
    fn test_unknown_cache_token() {
        let mut repo = Repository::new();
        repo.add::<repository::Processor>(ProcessorInfo {
            l1_cache: TokenRef::from(Token::from_index(41)),
            ..Default::default()
        })
        .unwrap();
        let cm = repo.freeze().unwrap();
        let mut builder = SmbiosBuilder::new();
        let mut out = TableBuffer::new();
        assert_eq!(
            builder.build(&cm, &table(SmbiosType::Processor), &mut out),
            Err(CmError::NotFound)
        );
        assert!(out.is_empty());
    }

    #[test]
    fn test_many_cores() {
        let mut repo = Repository::new();
        repo.add::<repository::Processor>(ProcessorInfo {
            core_count: 300,
            thread_count: 255,
            ..Default::default()
        })
        .unwrap();
        let cm = repo.freeze().unwrap();
        let mut builder = SmbiosBuilder::new();
        let mut out = TableBuffer::new();
        builder.build(&cm, &table(SmbiosType::Processor), &mut out).unwrap();
        let bytes = out.as_bytes();
        assert_eq!(bytes[0x23], 0xFF);
        assert_eq!(read_u16(bytes, 0x2A), 300);
        assert_eq!(bytes[0x25], 255);
    }
}
