//! Memory structures (types 16, 17 and 19)
//!
//! Devices and mapped ranges carry the handle of their physical memory
//! array, so arrays are built first.

use zerocopy::{Immutable, IntoBytes};

use super::{
    HANDLE_NOT_PROVIDED, SmbiosBuilder, SmbiosGenerator, SmbiosHeader, SmbiosType, StringSet,
};
use crate::dispatch::ConfigurationManager;
use crate::error::CmError;
use crate::repository::{self, MemoryMappedAddress};
use crate::table::TableBuffer;

/// Capacity and address fields that defer to their extended counterpart
const EXTENDED_U32: u32 = 0x8000_0000;

/// Size field value that defers to the extended size
const EXTENDED_SIZE: u16 = 0x7FFF;

/// Address field value that defers to the extended address
const EXTENDED_ADDRESS: u32 = 0xFFFF_FFFF;

#[repr(C, packed)]
#[derive(Debug, Clone, Copy, IntoBytes, Immutable)]
struct Type16 {
    header: SmbiosHeader,
    location: u8,
    memory_use: u8,
    error_correction: u8,
    maximum_capacity: u32,
    error_information_handle: u16,
    number_of_devices: u16,
    extended_maximum_capacity: u64,
}

#[repr(C, packed)]
#[derive(Debug, Clone, Copy, IntoBytes, Immutable)]
struct Type17 {
    header: SmbiosHeader,
    array_handle: u16,
    error_information_handle: u16,
    total_width: u16,
    data_width: u16,
    size: u16,
    form_factor: u8,
    device_set: u8,
    device_locator: u8,
    bank_locator: u8,
    memory_type: u8,
    type_detail: u16,
    speed: u16,
    manufacturer: u8,
    serial_number: u8,
    asset_tag: u8,
    part_number: u8,
    attributes: u8,
    extended_size: u32,
    configured_speed: u16,
    minimum_voltage: u16,
    maximum_voltage: u16,
    configured_voltage: u16,
}

#[repr(C, packed)]
#[derive(Debug, Clone, Copy, IntoBytes, Immutable)]
struct Type19 {
    header: SmbiosHeader,
    starting_address: u32,
    ending_address: u32,
    array_handle: u16,
    partition_width: u8,
    extended_starting_address: u64,
    extended_ending_address: u64,
}

const _: () = assert!(size_of::<Type16>() == 23);
const _: () = assert!(size_of::<Type17>() == 40);
const _: () = assert!(size_of::<Type19>() == 31);

/// Maximum capacity in KiB and the extended capacity in bytes
fn encode_capacity(kb: u64) -> (u32, u64) {
    match u32::try_from(kb) {
        Ok(kb) if kb < EXTENDED_U32 => (kb, 0),
        _ => (EXTENDED_U32, kb.saturating_mul(1024)),
    }
}

/// Size field (MiB, granularity bit clear) and extended size
fn encode_device_size(mb: u32) -> (u16, u32) {
    if mb < u32::from(EXTENDED_SIZE) {
        (mb as u16, 0)
    } else {
        (EXTENDED_SIZE, mb & 0x7FFF_FFFF)
    }
}

/// Start and end fields in KiB, plus extended byte addresses when the
/// range reaches beyond 4 TiB
fn encode_range(start: u64, end: u64) -> Result<(u32, u32, u64, u64), CmError> {
    if start > end {
        return Err(CmError::InvalidParameter);
    }
    match u32::try_from(end >> 10) {
        Ok(end_kb) if end_kb != EXTENDED_ADDRESS => Ok(((start >> 10) as u32, end_kb, 0, 0)),
        _ => Ok((EXTENDED_ADDRESS, EXTENDED_ADDRESS, start, end)),
    }
}

pub struct MemoryArray;

impl SmbiosGenerator for MemoryArray {
    const TYPE: SmbiosType = SmbiosType::MemoryArray;

    fn emit(
        cm: &ConfigurationManager<'_>,
        builder: &mut SmbiosBuilder,
        out: &mut TableBuffer,
    ) -> Result<usize, CmError> {
        let records = cm.resolve_all::<repository::MemoryArray>()?;
        for array in records.iter() {
            let (maximum_capacity, extended_maximum_capacity) =
                encode_capacity(array.maximum_capacity_kb);
            let header = builder.header::<Type16>(Self::TYPE as u8)?;
            builder.bind_array(array.token, header.handle)?;
            let structure = Type16 {
                header,
                location: array.location,
                memory_use: array.memory_use,
                error_correction: array.error_correction,
                maximum_capacity,
                error_information_handle: HANDLE_NOT_PROVIDED,
                number_of_devices: array.number_of_devices,
                extended_maximum_capacity,
            };
            builder.emit(out, &structure, &StringSet::new())?;
        }
        Ok(records.count())
    }
}

pub struct MemoryDevice;

impl SmbiosGenerator for MemoryDevice {
    const TYPE: SmbiosType = SmbiosType::MemoryDevice;

    fn emit(
        cm: &ConfigurationManager<'_>,
        builder: &mut SmbiosBuilder,
        out: &mut TableBuffer,
    ) -> Result<usize, CmError> {
        let records = cm.resolve_all::<repository::MemoryDevice>()?;
        for device in records.iter() {
            let array_handle = builder.array_handle(cm, device.array)?;
            let (size, extended_size) = encode_device_size(device.size_mb);
            let mut strings = StringSet::new();
            let structure = Type17 {
                header: builder.header::<Type17>(Self::TYPE as u8)?,
                array_handle,
                error_information_handle: HANDLE_NOT_PROVIDED,
                total_width: device.total_width,
                data_width: device.data_width,
                size,
                form_factor: device.form_factor,
                device_set: 0,
                device_locator: strings.add(&device.device_locator)?,
                bank_locator: strings.add(&device.bank_locator)?,
                memory_type: device.memory_type,
                type_detail: device.type_detail,
                speed: device.speed,
                manufacturer: strings.add(&device.manufacturer)?,
                serial_number: strings.add(&device.serial_number)?,
                asset_tag: 0,
                part_number: strings.add(&device.part_number)?,
                attributes: device.rank & 0x0F,
                extended_size,
                configured_speed: device.configured_speed,
                minimum_voltage: device.minimum_voltage,
                maximum_voltage: device.maximum_voltage,
                configured_voltage: device.configured_voltage,
            };
            builder.emit(out, &structure, &strings)?;
        }
        Ok(records.count())
    }
}

pub struct MappedAddress;

impl SmbiosGenerator for MappedAddress {
    const TYPE: SmbiosType = SmbiosType::MappedAddress;

    fn emit(
        cm: &ConfigurationManager<'_>,
        builder: &mut SmbiosBuilder,
        out: &mut TableBuffer,
    ) -> Result<usize, CmError> {
        let records = cm.resolve_all::<MemoryMappedAddress>()?;
        for range in records.iter() {
            let array_handle = builder.array_handle(cm, range.array)?;
            let (starting_address, ending_address, extended_start, extended_end) =
                encode_range(range.starting_address, range.ending_address)?;
            let structure = Type19 {
                header: builder.header::<Type19>(Self::TYPE as u8)?,
                starting_address,
                ending_address,
                array_handle,
                partition_width: range.partition_width,
                extended_starting_address: extended_start,
                extended_ending_address: extended_end,
            };
            builder.emit(out, &structure, &StringSet::new())?;
        }
        Ok(records.count())
    }
}
