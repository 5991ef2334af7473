//! NXP LX2160A Reference Design Board
//!
//! Populates the repository with everything the table generators need:
//! 16 Cortex-A72 cores in 8 clusters, a GICv3 with one ITS, a PL011
//! console, two enabled PCIe controllers behind an MMU-500 and the SMBIOS
//! system description.

use super::dcfg::{self, DCFG_BASE, Endianness, SocVersion};
use crate::acpi::AcpiTableId;
use crate::config::{CM_REVISION, MAX_CPUS, OEM_ID, fixed_str};
use crate::error::CmError;
use crate::records::*;
use crate::repository::{self, Repository};
use crate::smbios::SmbiosType;
use crate::token::{Token, TokenRef};

/// OEM table ID stamped into every ACPI table
const OEM_TABLE_ID: u64 = u64::from_le_bytes(*b"LX2160A ");

const ACPI_TABLES: [AcpiTableId; 7] = [
    AcpiTableId::Dsdt,
    AcpiTableId::Madt,
    AcpiTableId::Gtdt,
    AcpiTableId::Spcr,
    AcpiTableId::Mcfg,
    AcpiTableId::Iort,
    AcpiTableId::Pptt,
];

const SMBIOS_TYPES: [SmbiosType; 10] = [
    SmbiosType::Bios,
    SmbiosType::System,
    SmbiosType::Chassis,
    SmbiosType::Processor,
    SmbiosType::Cache,
    SmbiosType::SystemSlot,
    SmbiosType::MemoryArray,
    SmbiosType::MemoryDevice,
    SmbiosType::MappedAddress,
    SmbiosType::SystemBoot,
];

const CLUSTERS: usize = 8;
const CORES_PER_CLUSTER: usize = 2;

const _: () = assert!(CLUSTERS * CORES_PER_CLUSTER <= MAX_CPUS);

/// Cortex-A72 r0p3
const MIDR_A72: u32 = 0x410F_D083;

const GICD_BASE: u64 = 0x0600_0000;
const GITS_BASE: u64 = 0x0602_0000;
const GICR_BASE: u64 = 0x0620_0000;
/// One 128 KiB redistributor frame per core
const GICR_LENGTH: u32 = 0x2_0000 * (CLUSTERS * CORES_PER_CLUSTER) as u32;

const UART1_BASE: u64 = 0x021C_0000;
const UART1_GSIV: u32 = 64;

const PMU_GSIV: u32 = 23;
const VGIC_MAINTENANCE_GSIV: u32 = 25;

const SMMU_BASE: u64 = 0x0500_0000;
const SMMU_SPAN: u64 = 0x80_0000;
const SMMU_MODEL_MMU500: u32 = 3;
const SMMU_GLOBAL_GSIV: u32 = 45;
const SMMU_CONTEXT_GSIV: u32 = 178;
const SMMU_CONTEXT_INTERRUPTS: u32 = 8;
const SMMU_PMU_GSIV: u32 = 211;

/// PCIe controllers wired to slots on the RDB: (segment, ECAM base)
const PCIE_SEGMENTS: [(u16, u64); 2] = [(2, 0x90_0000_0000), (4, 0xA0_0000_0000)];

/// PCIe requester IDs fold into stream IDs above this base
const PCIE_STREAM_BASE: u32 = 0x1000;
const USB0_STREAM_ID: u32 = 0x4;

/// AML body: `Scope (\_SB) { Device (COM0) { Name (_HID, "ARMH0011") } }`
const DEFINITION_BLOCK: [u8; 29] = [
    0x10, 0x1C, b'\\', b'_', b'S', b'B', b'_', // Scope (\_SB_)
    0x5B, 0x82, 0x14, b'C', b'O', b'M', b'0', // Device (COM0)
    0x08, b'_', b'H', b'I', b'D', // Name (_HID,
    0x0D, b'A', b'R', b'M', b'H', b'0', b'0', b'1', b'1', 0x00,
];

/// Describe the board running on `soc`
pub fn populate(repo: &mut Repository, soc: SocVersion) -> Result<(), CmError> {
    add_identity(repo, soc)?;
    let gicc = add_interrupt_controller(repo)?;
    add_timer_and_console(repo)?;
    add_pci(repo)?;
    add_io_remapping(repo)?;
    add_topology(repo, &gicc)?;
    repo.load_definition_block(&DEFINITION_BLOCK)?;
    add_smbios(repo, soc)?;

    log::info!(
        "{}: {} ACPI tables, {} SMBIOS types",
        soc,
        ACPI_TABLES.len(),
        SMBIOS_TYPES.len()
    );
    Ok(())
}

/// Describe the running board, identifying the SoC through DCFG
///
/// # Safety
///
/// The DCFG block must be mapped at [`DCFG_BASE`].
pub unsafe fn populate_from_hardware(repo: &mut Repository) -> Result<(), CmError> {
    let soc = unsafe { dcfg::read_soc_version(DCFG_BASE, Endianness::Little) };
    if soc.soc_id != SocVersion::LX2160A_ID {
        log::warn!("LX2160A-RDB description used on {}", soc);
    }
    populate(repo, soc)
}

fn add_identity(repo: &mut Repository, soc: SocVersion) -> Result<(), CmError> {
    repo.add::<repository::CfgMgrInfo>(CmInfo {
        revision: CM_REVISION,
        oem_id: OEM_ID,
    })?;
    for id in ACPI_TABLES {
        repo.add::<repository::AcpiTableList>(AcpiTableInfo {
            signature: id.signature(),
            revision: 0,
            generator_id: id as u32,
            oem_table_id: OEM_TABLE_ID,
            oem_revision: soc.svr(),
        })?;
    }
    for kind in SMBIOS_TYPES {
        repo.add::<repository::SmbiosTableList>(SmbiosTableInfo {
            structure_type: kind as u8,
        })?;
    }
    Ok(())
}

/// MPIDR of a core: cluster in Aff1, core in Aff0
fn mpidr(cluster: usize, core: usize) -> u64 {
    ((cluster as u64) << 8) | core as u64
}

/// GIC CPU interfaces in core order, returning their tokens
fn add_interrupt_controller(
    repo: &mut Repository,
) -> Result<heapless::Vec<Token, MAX_CPUS>, CmError> {
    let mut gicc = heapless::Vec::new();
    for cluster in 0..CLUSTERS {
        for core in 0..CORES_PER_CLUSTER {
            let index = (cluster * CORES_PER_CLUSTER + core) as u32;
            let token = repo.add::<repository::GicC>(GicCInfo {
                cpu_interface_number: index,
                acpi_processor_uid: index,
                flags: GiccFlags::ENABLED.bits(),
                performance_interrupt_gsiv: PMU_GSIV,
                vgic_maintenance_interrupt: VGIC_MAINTENANCE_GSIV,
                mpidr: mpidr(cluster, core),
                ..Default::default()
            })?;
            gicc.push(token).map_err(|_| CmError::OutOfResources)?;
        }
    }

    repo.add::<repository::GicD>(GicDInfo {
        physical_base_address: GICD_BASE,
        system_vector_base: 0,
        gic_version: 3,
    })?;
    repo.add::<repository::GicRedistributor>(GicRedistributorInfo {
        discovery_range_base_address: GICR_BASE,
        discovery_range_length: GICR_LENGTH,
    })?;
    repo.add::<repository::GicIts>(GicItsInfo {
        its_id: 0,
        physical_base_address: GITS_BASE,
    })?;
    Ok(gicc)
}

fn add_timer_and_console(repo: &mut Repository) -> Result<(), CmError> {
    let flags = TimerFlags::ACTIVE_LOW.bits();
    repo.add::<repository::GenericTimer>(GenericTimerInfo {
        counter_control_base: ADDRESS_NOT_IMPLEMENTED,
        counter_read_base: ADDRESS_NOT_IMPLEMENTED,
        secure_pl1_gsiv: 29,
        secure_pl1_flags: flags,
        non_secure_pl1_gsiv: 30,
        non_secure_pl1_flags: flags,
        virtual_timer_gsiv: 27,
        virtual_timer_flags: flags,
        non_secure_pl2_gsiv: 26,
        non_secure_pl2_flags: flags,
        virtual_pl2_gsiv: 28,
        virtual_pl2_flags: flags,
    })?;

    repo.add::<repository::SerialConsolePort>(SerialPortInfo {
        base_address: UART1_BASE,
        base_address_length: 0x1000,
        interrupt: UART1_GSIV,
        baud_rate: 115_200,
        clock: 175_000_000,
        port_subtype: serial_subtype::PL011,
    })?;
    Ok(())
}

fn add_pci(repo: &mut Repository) -> Result<(), CmError> {
    for (segment, base_address) in PCIE_SEGMENTS {
        repo.add::<repository::PciConfigSpace>(PciConfigSpaceInfo {
            base_address,
            pci_segment_group: segment,
            start_bus: 0,
            end_bus: 0xFF,
        })?;
    }
    Ok(())
}

fn add_io_remapping(repo: &mut Repository) -> Result<(), CmError> {
    let its_group: TokenRef = repo.add::<repository::ItsGroup>(ItsGroupNode::default())?.into();
    repo.add::<repository::ItsIdentifierArray>(ItsIdentifier {
        owner: its_group,
        its_id: 0,
    })?;

    let smmu: TokenRef = repo
        .add::<repository::SmmuV2>(SmmuV2Node {
            base_address: SMMU_BASE,
            span: SMMU_SPAN,
            model: SMMU_MODEL_MMU500,
            global_interrupt_gsiv: SMMU_GLOBAL_GSIV,
            global_interrupt_flags: 1,
            ..Default::default()
        })?
        .into();
    for gsiv in SMMU_CONTEXT_GSIV..SMMU_CONTEXT_GSIV + SMMU_CONTEXT_INTERRUPTS {
        repo.add::<repository::SmmuInterruptArray>(SmmuInterrupt {
            owner: smmu,
            kind: smmu_interrupt_kind::CONTEXT,
            gsiv,
            flags: 1,
        })?;
    }
    repo.add::<repository::SmmuInterruptArray>(SmmuInterrupt {
        owner: smmu,
        kind: smmu_interrupt_kind::PMU,
        gsiv: SMMU_PMU_GSIV,
        flags: 1,
    })?;
    repo.add::<repository::IdMappingArray>(IdMapping {
        owner: smmu,
        input_base: 0,
        id_count: 0x1_0000,
        output_base: 0,
        output_reference: its_group,
        flags: 0,
    })?;

    for (n, (segment, _)) in PCIE_SEGMENTS.iter().enumerate() {
        let rc: TokenRef = repo
            .add::<repository::RootComplex>(RootComplexNode {
                cache_coherent: 1,
                memory_access_flags: 0x3,
                pci_segment_number: u32::from(*segment),
                ..Default::default()
            })?
            .into();
        repo.add::<repository::IdMappingArray>(IdMapping {
            owner: rc,
            input_base: 0,
            id_count: 0x100,
            output_base: PCIE_STREAM_BASE + 0x100 * n as u32,
            output_reference: smmu,
            flags: 0,
        })?;
    }

    let usb: TokenRef = repo
        .add::<repository::NamedComponent>(NamedComponentNode {
            cache_coherent: 1,
            memory_access_flags: 0x3,
            address_size_limit: 40,
            object_name: fixed_str("\\_SB_.USB0"),
            ..Default::default()
        })?
        .into();
    repo.add::<repository::IdMappingArray>(IdMapping {
        owner: usb,
        input_base: 0,
        id_count: 1,
        output_base: USB0_STREAM_ID,
        output_reference: smmu,
        flags: IdMappingFlags::SINGLE_MAPPING.bits(),
    })?;
    Ok(())
}

fn cache(size: u32, associativity: u32, attributes: u8, next_level: TokenRef) -> CacheInfo {
    const LINE_SIZE: u16 = 64;
    CacheInfo {
        token: TokenRef::NONE,
        next_level,
        size,
        number_of_sets: size / (associativity * u32::from(LINE_SIZE)),
        associativity,
        attributes,
        line_size: LINE_SIZE,
    }
}

/// Package, clusters and cores with their caches
fn add_topology(repo: &mut Repository, gicc: &[Token]) -> Result<(), CmError> {
    use cache_attributes::*;

    let l3: TokenRef = repo
        .add::<repository::Cache>(cache(
            8 << 20,
            16,
            ALLOCATE_READ_WRITE | TYPE_UNIFIED | WRITE_BACK,
            TokenRef::NONE,
        ))?
        .into();
    let l2: TokenRef = repo
        .add::<repository::Cache>(cache(
            1 << 20,
            16,
            ALLOCATE_READ_WRITE | TYPE_UNIFIED | WRITE_BACK,
            l3,
        ))?
        .into();
    let l1i: TokenRef = repo
        .add::<repository::Cache>(cache(48 << 10, 3, ALLOCATE_READ | TYPE_INSTRUCTION, l2))?
        .into();
    let l1d: TokenRef = repo
        .add::<repository::Cache>(cache(
            32 << 10,
            2,
            ALLOCATE_READ_WRITE | TYPE_DATA | WRITE_BACK,
            l2,
        ))?
        .into();

    let package: TokenRef = repo
        .add::<repository::ProcHierarchy>(ProcHierarchyInfo {
            flags: ProcessorFlags::PHYSICAL_PACKAGE.bits(),
            ..Default::default()
        })?
        .into();
    private_resources(repo, package, &[l3])?;

    for cluster in 0..CLUSTERS {
        let node: TokenRef = repo
            .add::<repository::ProcHierarchy>(ProcHierarchyInfo {
                flags: (ProcessorFlags::ACPI_PROCESSOR_ID_VALID
                    | ProcessorFlags::IDENTICAL_IMPLEMENTATION)
                    .bits(),
                parent: package,
                acpi_processor_id: cluster as u32,
                ..Default::default()
            })?
            .into();
        private_resources(repo, node, &[l2])?;

        for core in 0..CORES_PER_CLUSTER {
            let interface = gicc
                .get(cluster * CORES_PER_CLUSTER + core)
                .copied()
                .ok_or(CmError::NotFound)?;
            let leaf: TokenRef = repo
                .add::<repository::ProcHierarchy>(ProcHierarchyInfo {
                    flags: (ProcessorFlags::ACPI_PROCESSOR_ID_VALID
                        | ProcessorFlags::NODE_IS_LEAF)
                        .bits(),
                    parent: node,
                    gicc: interface.into(),
                    ..Default::default()
                })?
                .into();
            private_resources(repo, leaf, &[l1i, l1d])?;
        }
    }
    Ok(())
}

fn private_resources(
    repo: &mut Repository,
    owner: TokenRef,
    resources: &[TokenRef],
) -> Result<(), CmError> {
    for &resource in resources {
        repo.add::<repository::PrivateResources>(PrivateResource { owner, resource })?;
    }
    Ok(())
}

fn add_smbios(repo: &mut Repository, soc: SocVersion) -> Result<(), CmError> {
    repo.add::<repository::Bios>(BiosInfo {
        vendor: fixed_str("NXP"),
        version: fixed_str("2.0"),
        release_date: fixed_str("06/01/2024"),
        rom_size_kb: 4096,
        characteristics: (BiosCharacteristics::PCI_SUPPORTED
            | BiosCharacteristics::UPGRADEABLE
            | BiosCharacteristics::SELECTABLE_BOOT)
            .bits(),
        characteristics_ext2: BiosCharacteristicsExt2::UEFI_SUPPORTED.bits(),
        major_release: 2,
        minor_release: 0,
        ec_major_release: 0xFF,
        ec_minor_release: 0xFF,
        ..Default::default()
    })?;
    repo.add::<repository::System>(SystemInfo {
        manufacturer: fixed_str("NXP"),
        product_name: fixed_str("LX2160A-RDB"),
        version: fixed_str("Rev C"),
        wakeup_type: 0x06,
        sku_number: fixed_str("LX2160A-RDB"),
        family: fixed_str("QorIQ Layerscape"),
        ..Default::default()
    })?;
    repo.add::<repository::Chassis>(ChassisInfo {
        manufacturer: fixed_str("NXP"),
        chassis_type: 0x03,
        bootup_state: 0x03,
        power_supply_state: 0x03,
        thermal_state: 0x03,
        security_status: 0x03,
        power_cords: 1,
        ..Default::default()
    })?;

    let cores = (CLUSTERS * CORES_PER_CLUSTER) as u32;
    smbios_cache(repo, "L1 Instruction Cache", 0x0180, 48 * cores, 4, 0x01)?;
    let l1d = smbios_cache(repo, "L1 Data Cache", 0x0180, 32 * cores, 3, 0x04)?;
    let l2 = smbios_cache(repo, "L2 Cache", 0x0181, 1024 * CLUSTERS as u32, 5, 0x08)?;
    let l3 = smbios_cache(repo, "L3 Cache", 0x0182, 8 * 1024, 5, 0x08)?;

    repo.add::<repository::Processor>(ProcessorInfo {
        socket: fixed_str("CPU0"),
        processor_type: 0x03,
        manufacturer: fixed_str("NXP"),
        processor_id: (u64::from(soc.svr()) << 32) | u64::from(MIDR_A72),
        version: fixed_str(soc.name()),
        voltage: 0x80 | 8,
        external_clock: 100,
        max_speed: 2200,
        current_speed: 2000,
        status: 0x41,
        upgrade: 0x06,
        l1_cache: l1d,
        l2_cache: l2,
        l3_cache: l3,
        core_count: cores as u16,
        cores_enabled: cores as u16,
        thread_count: cores as u16,
        characteristics: (ProcessorCharacteristics::CAPABLE_64BIT
            | ProcessorCharacteristics::MULTI_CORE
            | ProcessorCharacteristics::EXECUTE_PROTECTION
            | ProcessorCharacteristics::ENHANCED_VIRTUALIZATION
            | ProcessorCharacteristics::ARM64_SOC_ID)
            .bits(),
        family2: PROCESSOR_FAMILY_ARMV8,
        ..Default::default()
    })?;

    for (slot_id, (designation, slot_type, width, segment)) in [
        ("PCIe3 x8", 0xA6, 0x0B, PCIE_SEGMENTS[0].0),
        ("PCIe5 x16", 0xA8, 0x0D, PCIE_SEGMENTS[1].0),
    ]
    .into_iter()
    .enumerate()
    {
        repo.add::<repository::SystemSlot>(SystemSlotInfo {
            designation: fixed_str(designation),
            slot_type,
            data_bus_width: width,
            current_usage: 0x03,
            slot_length: 0x04,
            slot_id: slot_id as u16,
            characteristics1: 0x04,
            characteristics2: 0x01,
            segment_group: segment,
            ..Default::default()
        })?;
    }

    add_memory(repo)?;

    repo.add::<repository::SystemBoot>(SystemBootInfo { boot_status: 0 })?;
    Ok(())
}

/// SMBIOS cache structure; sizes in KiB over all instances
fn smbios_cache(
    repo: &mut Repository,
    designation: &str,
    configuration: u16,
    size_kb: u32,
    system_cache_type: u8,
    associativity: u8,
) -> Result<TokenRef, CmError> {
    let token = repo.add::<repository::SmbiosCache>(SmbiosCacheInfo {
        designation: fixed_str(designation),
        configuration,
        max_size_kb: size_kb,
        installed_size_kb: size_kb,
        supported_sram_type: 0x0002,
        current_sram_type: 0x0002,
        speed: 0,
        error_correction: 0x05,
        system_cache_type,
        associativity,
        ..Default::default()
    })?;
    Ok(token.into())
}

/// Two 16 GiB DDR4 DIMMs, one per controller
fn add_memory(repo: &mut Repository) -> Result<(), CmError> {
    const DIMM_MB: u32 = 16 * 1024;

    let array: TokenRef = repo
        .add::<repository::MemoryArray>(MemoryArrayInfo {
            location: 0x03,
            memory_use: 0x03,
            error_correction: 0x06,
            maximum_capacity_kb: 256 * 1024 * 1024,
            number_of_devices: 2,
            ..Default::default()
        })?
        .into();

    for (locator, bank) in [("DIMM0", "Controller 0"), ("DIMM1", "Controller 1")] {
        repo.add::<repository::MemoryDevice>(MemoryDeviceInfo {
            array,
            total_width: 72,
            data_width: 64,
            size_mb: DIMM_MB,
            form_factor: 0x09,
            device_locator: fixed_str(locator),
            bank_locator: fixed_str(bank),
            memory_type: 0x1A,
            type_detail: 0x2080,
            speed: 3200,
            manufacturer: fixed_str("Micron"),
            part_number: fixed_str("MTA18ASF2G72PZ-3G2"),
            rank: 2,
            configured_speed: 2900,
            minimum_voltage: 1200,
            maximum_voltage: 1200,
            configured_voltage: 1200,
            ..Default::default()
        })?;
    }

    // 2 GiB below 4 GiB, the rest in the high DRAM window
    let total = (2 * u64::from(DIMM_MB)) << 20;
    let low = 0x8000_0000u64;
    let high = 0x20_8000_0000u64;
    for (start, size) in [(low, 0x8000_0000u64), (high, total - 0x8000_0000)] {
        repo.add::<repository::MemoryMappedAddress>(MemoryMappedAddressInfo {
            array,
            starting_address: start,
            ending_address: start + size - 1,
            partition_width: 2,
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{AcpiTableList, GicC, ProcHierarchy, SmbiosTableList};

    fn board() -> Repository {
        let mut repo = Repository::new();
        populate(&mut repo, SocVersion::LX2160A_REV2).unwrap();
        repo
    }

    #[test]
    fn test_table_lists() {
        let repo = board();
        let acpi = repo.records::<AcpiTableList>();
        assert_eq!(acpi.len(), ACPI_TABLES.len());
        assert_eq!(acpi[0].signature, *b"DSDT");
        assert!(acpi.iter().all(|info| {
            let id = info.oem_table_id;
            id == OEM_TABLE_ID
        }));
        assert_eq!({ acpi[1].oem_revision }, 0x8736_0020);

        let smbios = repo.records::<SmbiosTableList>();
        assert_eq!(smbios.len(), SMBIOS_TYPES.len());
    }

    #[test]
    fn test_every_listed_smbios_type_has_records() {
        let repo = board();
        let cm = repo.freeze().unwrap();
        for kind in SMBIOS_TYPES {
            let count = match kind {
                SmbiosType::Bios => cm.resolve_all::<repository::Bios>().unwrap().count(),
                SmbiosType::System => cm.resolve_all::<repository::System>().unwrap().count(),
                SmbiosType::Chassis => cm.resolve_all::<repository::Chassis>().unwrap().count(),
                SmbiosType::Processor => cm.resolve_all::<repository::Processor>().unwrap().count(),
                SmbiosType::Cache => cm.resolve_all::<repository::SmbiosCache>().unwrap().count(),
                SmbiosType::SystemSlot => {
                    cm.resolve_all::<repository::SystemSlot>().unwrap().count()
                }
                SmbiosType::MemoryArray => {
                    cm.resolve_all::<repository::MemoryArray>().unwrap().count()
                }
                SmbiosType::MemoryDevice => {
                    cm.resolve_all::<repository::MemoryDevice>().unwrap().count()
                }
                SmbiosType::MappedAddress => {
                    cm.resolve_all::<repository::MemoryMappedAddress>().unwrap().count()
                }
                SmbiosType::SystemBoot => {
                    cm.resolve_all::<repository::SystemBoot>().unwrap().count()
                }
            };
            assert!(count > 0, "type {} has no records", kind as u8);
        }
        assert_eq!({ repo.records::<repository::SystemBoot>()[0].boot_status }, 0);
    }

    #[test]
    fn test_cpu_interfaces() {
        let repo = board();
        let gicc = repo.records::<GicC>();
        assert_eq!(gicc.len(), 16);
        for (n, cpu) in gicc.iter().enumerate() {
            assert_eq!({ cpu.cpu_interface_number }, n as u32);
        }
        assert_eq!({ gicc[3].mpidr }, 0x101);
        assert_eq!({ gicc[15].mpidr }, 0x701);
    }

    #[test]
    fn test_topology_shape() {
        let repo = board();
        let nodes = repo.records::<ProcHierarchy>();
        assert_eq!(nodes.len(), 1 + CLUSTERS + CLUSTERS * CORES_PER_CLUSTER);
        assert_eq!({ nodes[0].parent }, TokenRef::NONE);
        let leaves = nodes
            .iter()
            .filter(|node| {
                let flags = node.flags;
                flags & ProcessorFlags::NODE_IS_LEAF.bits() != 0
            })
            .count();
        assert_eq!(leaves, 16);
        assert!(nodes.iter().skip(1).all(|node| {
            let parent = node.parent;
            parent.is_some()
        }));
    }

    #[test]
    fn test_processor_id_carries_soc() {
        let mut repo = Repository::new();
        let soc = SocVersion::from_svr(0x8736_0011);
        populate(&mut repo, soc).unwrap();
        let cpu = repo.records::<repository::Processor>()[0];
        assert_eq!({ cpu.processor_id } >> 32, 0x8736_0011);
        assert_eq!({ cpu.processor_id } as u32, MIDR_A72);
        assert_eq!(crate::config::field_str(&cpu.version), b"LX2160A");
    }

    #[test]
    fn test_mapped_memory() {
        let repo = board();
        let ranges = repo.records::<repository::MemoryMappedAddress>();
        assert_eq!(ranges.len(), 2);
        assert_eq!({ ranges[0].ending_address }, 0xFFFF_FFFF);
        assert_eq!({ ranges[1].ending_address }, 0x27_FFFF_FFFF);
    }

    #[test]
    fn test_populate_from_registers() {
        let mut block = [0u32; dcfg::DCFG_SVR / 4 + 1];
        block[dcfg::DCFG_SVR / 4] = 0x8736_0020;
        let soc = unsafe { dcfg::read_soc_version(block.as_ptr() as usize, Endianness::Little) };
        let mut repo = Repository::new();
        populate(&mut repo, soc).unwrap();
        assert!(repo.freeze().is_ok());
    }
}
