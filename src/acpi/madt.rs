//! Multiple APIC Description Table (MADT, signature `APIC`)
//!
//! GIC CPU interfaces first, then the distributor, redistributor ranges and
//! ITS units.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use super::AcpiTableGenerator;
use crate::dispatch::ConfigurationManager;
use crate::error::CmError;
use crate::repository::{GicC, GicD, GicIts, GicRedistributor};
use crate::table::TableBuffer;

const GICC_TYPE: u8 = 0x0B;
const GICD_TYPE: u8 = 0x0C;
const GICR_TYPE: u8 = 0x0E;
const ITS_TYPE: u8 = 0x0F;

#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
struct MadtFixed {
    local_interrupt_controller_address: u32,
    flags: u32,
}

/// GIC CPU interface structure
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct GiccEntry {
    pub kind: u8,
    pub length: u8,
    pub reserved: u16,
    pub cpu_interface_number: u32,
    pub acpi_processor_uid: u32,
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
    pub reserved2: u8,
    pub spe_overflow_interrupt: u16,
}

/// GIC distributor structure
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct GicdEntry {
    pub kind: u8,
    pub length: u8,
    pub reserved: u16,
    pub gic_id: u32,
    pub physical_base_address: u64,
    pub system_vector_base: u32,
    pub gic_version: u8,
    pub reserved2: [u8; 3],
}

/// GIC redistributor structure
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct GicrEntry {
    pub kind: u8,
    pub length: u8,
    pub reserved: u16,
    pub discovery_range_base_address: u64,
    pub discovery_range_length: u32,
}

/// GIC ITS structure
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct ItsEntry {
    pub kind: u8,
    pub length: u8,
    pub reserved: u16,
    pub its_id: u32,
    pub physical_base_address: u64,
    pub reserved2: u32,
}

const _: () = assert!(size_of::<GiccEntry>() == 80);
const _: () = assert!(size_of::<GicdEntry>() == 24);
const _: () = assert!(size_of::<GicrEntry>() == 16);
const _: () = assert!(size_of::<ItsEntry>() == 20);

pub struct Madt;

impl AcpiTableGenerator for Madt {
    const SIGNATURE: [u8; 4] = *b"APIC";
    const REVISION: u8 = 5;

    fn build_body(cm: &ConfigurationManager<'_>, out: &mut TableBuffer) -> Result<(), CmError> {
        out.push(&MadtFixed::default())?;

        let cpus = cm.resolve_all::<GicC>()?;
        if cpus.is_empty() {
            return Err(CmError::NotFound);
        }
        for cpu in cpus.iter() {
            out.push(&GiccEntry {
                kind: GICC_TYPE,
                length: size_of::<GiccEntry>() as u8,
                cpu_interface_number: cpu.cpu_interface_number,
                acpi_processor_uid: cpu.acpi_processor_uid,
                flags: cpu.flags,
                parking_protocol_version: cpu.parking_protocol_version,
                performance_interrupt_gsiv: cpu.performance_interrupt_gsiv,
                parked_address: cpu.parked_address,
                physical_base_address: cpu.physical_base_address,
                gicv: cpu.gicv,
                gich: cpu.gich,
                vgic_maintenance_interrupt: cpu.vgic_maintenance_interrupt,
                gicr_base_address: cpu.gicr_base_address,
                mpidr: cpu.mpidr,
                processor_power_efficiency_class: cpu.processor_power_efficiency_class,
                spe_overflow_interrupt: cpu.spe_overflow_interrupt,
                ..Default::default()
            })?;
        }

        let gicd = cm.single::<GicD>()?;
        out.push(&GicdEntry {
            kind: GICD_TYPE,
            length: size_of::<GicdEntry>() as u8,
            physical_base_address: gicd.physical_base_address,
            system_vector_base: gicd.system_vector_base,
            gic_version: gicd.gic_version,
            ..Default::default()
        })?;

        for gicr in cm.resolve_all::<GicRedistributor>()?.iter() {
            out.push(&GicrEntry {
                kind: GICR_TYPE,
                length: size_of::<GicrEntry>() as u8,
                discovery_range_base_address: gicr.discovery_range_base_address,
                discovery_range_length: gicr.discovery_range_length,
                ..Default::default()
            })?;
        }

        for its in cm.resolve_all::<GicIts>()?.iter() {
            out.push(&ItsEntry {
                kind: ITS_TYPE,
                length: size_of::<ItsEntry>() as u8,
                its_id: its.its_id,
                physical_base_address: its.physical_base_address,
                ..Default::default()
            })?;
        }

        log::debug!("MADT: {} GICC", cpus.count());
        Ok(())
    }
}
