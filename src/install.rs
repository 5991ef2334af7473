//! Table installation
//!
//! Walks the platform's ACPI and SMBIOS table lists, runs the generator for
//! each entry and hands the result to the firmware through a [`TableSink`].
//! A failing table is logged and recorded in the [`InstallReport`]; the
//! remaining tables are still installed.

use core::fmt;

use heapless::Vec;
use r_efi::efi::{self, Guid};
use zerocopy::IntoBytes;

use crate::acpi;
use crate::config::{MAX_ACPI_TABLES, MAX_SMBIOS_TABLES};
use crate::dispatch::ConfigurationManager;
use crate::error::CmError;
use crate::repository::{AcpiTableList, SmbiosTableList};
use crate::smbios::{self, SmbiosBuilder};
use crate::table::TableBuffer;

/// SMBIOS 3.0 Table GUID
pub const SMBIOS3_TABLE_GUID: Guid = Guid::from_fields(
    0xf2fd1544,
    0x9794,
    0x4a2c,
    0x99,
    0x2e,
    &[0xe5, 0xbb, 0xcf, 0x20, 0xe3, 0x94],
);

const MAX_FAILURES: usize = MAX_ACPI_TABLES + MAX_SMBIOS_TABLES + 1;

/// Firmware services that take over finished tables
pub trait TableSink {
    /// Publish one complete ACPI table
    fn install_acpi_table(&mut self, table: &[u8]) -> Result<(), efi::Status>;

    /// Copy the SMBIOS structure table into firmware memory and return its
    /// physical address
    fn store_smbios_structures(&mut self, structures: &[u8]) -> Result<u64, efi::Status>;

    /// Register `table` in the system table under `guid`
    fn install_configuration_table(&mut self, guid: &Guid, table: &[u8]) -> Result<(), efi::Status>;
}

/// Why a table did not get installed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallError {
    /// The generator failed
    Build(CmError),
    /// The firmware refused the table
    Firmware(efi::Status),
}

impl fmt::Display for InstallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Build(err) => write!(f, "generation failed: {}", err),
            Self::Firmware(status) => write!(f, "firmware error {:#x}", status.as_usize()),
        }
    }
}

impl From<CmError> for InstallError {
    fn from(err: CmError) -> Self {
        Self::Build(err)
    }
}

/// Table a failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Acpi([u8; 4]),
    Smbios(u8),
    SmbiosEntryPoint,
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Acpi(signature) => {
                f.write_str(core::str::from_utf8(signature).unwrap_or("????"))
            }
            Self::Smbios(kind) => write!(f, "SMBIOS type {}", kind),
            Self::SmbiosEntryPoint => f.write_str("SMBIOS entry point"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Failure {
    pub table: TableKind,
    pub error: InstallError,
}

/// Outcome of [`install_tables`]
#[derive(Debug, Clone, Default)]
pub struct InstallReport {
    /// ACPI tables handed to the firmware
    pub acpi_installed: usize,
    /// SMBIOS structures in the published table, end-of-table included
    pub smbios_structures: usize,
    /// Whether the SMBIOS entry point was published
    pub smbios_installed: bool,
    pub failures: Vec<Failure, MAX_FAILURES>,
}

impl InstallReport {
    fn fail(&mut self, table: TableKind, error: InstallError) {
        log::error!("{}: {}", table, error);
        if self.failures.push(Failure { table, error }).is_err() {
            log::warn!("install report full");
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Generate and install every listed table
pub fn install_tables<S: TableSink>(cm: &ConfigurationManager<'_>, sink: &mut S) -> InstallReport {
    let mut report = InstallReport::default();
    let mut buffer = TableBuffer::new();
    install_acpi(cm, sink, &mut buffer, &mut report);
    install_smbios(cm, sink, &mut buffer, &mut report);
    log::info!(
        "installed {} ACPI tables, {} SMBIOS structures, {} failures",
        report.acpi_installed,
        report.smbios_structures,
        report.failures.len()
    );
    report
}

fn install_acpi<S: TableSink>(
    cm: &ConfigurationManager<'_>,
    sink: &mut S,
    buffer: &mut TableBuffer,
    report: &mut InstallReport,
) {
    let list = match cm.resolve_all::<AcpiTableList>() {
        Ok(list) => list,
        Err(err) => {
            log::error!("ACPI table list: {}", err);
            return;
        }
    };

    for info in list.iter() {
        let table = TableKind::Acpi(info.signature);
        if let Err(err) = acpi::build_table(cm, info, buffer) {
            report.fail(table, err.into());
            continue;
        }
        match sink.install_acpi_table(buffer.as_bytes()) {
            Ok(()) => {
                log::info!("{}: installed, {} bytes", table, buffer.len());
                report.acpi_installed += 1;
            }
            Err(status) => report.fail(table, InstallError::Firmware(status)),
        }
    }
}

fn install_smbios<S: TableSink>(
    cm: &ConfigurationManager<'_>,
    sink: &mut S,
    buffer: &mut TableBuffer,
    report: &mut InstallReport,
) {
    let list = match cm.resolve_all::<SmbiosTableList>() {
        Ok(list) => list,
        Err(err) => {
            log::error!("SMBIOS table list: {}", err);
            return;
        }
    };
    if list.is_empty() {
        log::debug!("no SMBIOS structures listed");
        return;
    }

    buffer.clear();
    let mut builder = SmbiosBuilder::new();
    for info in smbios::generation_order(list.records()).iter() {
        if let Err(err) = builder.build(cm, info, buffer) {
            report.fail(TableKind::Smbios(info.structure_type), err.into());
        }
    }
    if builder.structure_count() == 0 {
        return;
    }
    if let Err(err) = builder.finish(buffer) {
        report.fail(TableKind::Smbios(smbios::END_OF_TABLE), err.into());
        return;
    }

    let published = sink
        .store_smbios_structures(buffer.as_bytes())
        .map_err(InstallError::Firmware)
        .and_then(|address| {
            smbios::entry_point(buffer.len(), address).map_err(InstallError::from)
        })
        .and_then(|entry| {
            sink.install_configuration_table(&SMBIOS3_TABLE_GUID, entry.as_bytes())
                .map_err(InstallError::Firmware)
        });
    match published {
        Ok(()) => {
            log::info!(
                "SMBIOS: {} structures, {} bytes",
                builder.structure_count(),
                buffer.len()
            );
            report.smbios_structures = builder.structure_count();
            report.smbios_installed = true;
        }
        Err(err) => report.fail(TableKind::SmbiosEntryPoint, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acpi::AcpiTableId;
    use crate::acpi::test_util::{board, entry, read_u32, read_u64};
    use crate::checksum;
    use crate::records::{PciConfigSpaceInfo, SmbiosTableInfo, SystemBootInfo};
    use crate::repository::{CfgMgrInfo, PciConfigSpace, Repository, SystemBoot};

    const STRUCTURES_ADDRESS: u64 = 0x8_FFF0_0000;

    #[derive(Default)]
    struct MockSink {
        acpi: std::vec::Vec<std::vec::Vec<u8>>,
        smbios: std::vec::Vec<u8>,
        config_tables: std::vec::Vec<(Guid, std::vec::Vec<u8>)>,
        refuse: Option<[u8; 4]>,
    }

    impl TableSink for MockSink {
        fn install_acpi_table(&mut self, table: &[u8]) -> Result<(), efi::Status> {
            if self.refuse.is_some_and(|signature| table[0..4] == signature) {
                return Err(efi::Status::OUT_OF_RESOURCES);
            }
            self.acpi.push(table.to_vec());
            Ok(())
        }

        fn store_smbios_structures(&mut self, structures: &[u8]) -> Result<u64, efi::Status> {
            self.smbios = structures.to_vec();
            Ok(STRUCTURES_ADDRESS)
        }

        fn install_configuration_table(
            &mut self,
            guid: &Guid,
            table: &[u8],
        ) -> Result<(), efi::Status> {
            self.config_tables.push((*guid, table.to_vec()));
            Ok(())
        }
    }

    #[test]
    fn test_board_install() {
        let repo = board();
        let cm = repo.freeze().unwrap();
        let mut sink = MockSink::default();
        let report = install_tables(&cm, &mut sink);

        assert!(report.is_complete(), "{:?}", report.failures);
        let listed = cm.resolve_all::<AcpiTableList>().unwrap().count();
        assert_eq!(report.acpi_installed, listed);
        assert_eq!(sink.acpi.len(), listed);
        for table in &sink.acpi {
            assert_eq!(read_u32(table, 4) as usize, table.len());
            assert!(checksum::verify(table));
        }

        assert!(report.smbios_installed);
        assert_eq!(sink.config_tables.len(), 1);
        let (guid, entry_point) = &sink.config_tables[0];
        assert_eq!(guid.as_bytes(), SMBIOS3_TABLE_GUID.as_bytes());
        assert_eq!(&entry_point[0..5], b"_SM3_");
        assert!(checksum::verify(entry_point));
        assert_eq!(read_u32(entry_point, 12) as usize, sink.smbios.len());
        assert_eq!(read_u64(entry_point, 16), STRUCTURES_ADDRESS);
        let tail = &sink.smbios[sink.smbios.len() - 6..];
        assert_eq!(tail[0], smbios::END_OF_TABLE);
        assert_eq!(tail[1], 4);
        assert_eq!(&tail[4..], &[0, 0]);
    }

    /// MCFG and SMBIOS type 32 succeed, DSDT and type 0 have no data
    fn partial_repo() -> Repository {
        let mut repo = Repository::new();
        repo.add::<CfgMgrInfo>(Default::default()).unwrap();
        repo.add::<AcpiTableList>(entry(AcpiTableId::Dsdt)).unwrap();
        repo.add::<AcpiTableList>(entry(AcpiTableId::Mcfg)).unwrap();
        repo.add::<PciConfigSpace>(PciConfigSpaceInfo {
            base_address: 0x90_0000_0000,
            pci_segment_group: 0,
            start_bus: 0,
            end_bus: 0xFF,
        })
        .unwrap();
        for structure_type in [0, 32] {
            repo.add::<SmbiosTableList>(SmbiosTableInfo { structure_type })
                .unwrap();
        }
        repo.add::<SystemBoot>(SystemBootInfo::default()).unwrap();
        repo
    }

    #[test]
    fn test_failures_do_not_stop_installation() {
        let repo = partial_repo();
        let cm = repo.freeze().unwrap();
        let mut sink = MockSink::default();
        let report = install_tables(&cm, &mut sink);

        assert_eq!(report.acpi_installed, 1);
        assert_eq!(&sink.acpi[0][0..4], b"MCFG");
        assert_eq!(
            report.failures[0],
            Failure {
                table: TableKind::Acpi(*b"DSDT"),
                error: InstallError::Build(CmError::NotFound),
            }
        );
        assert_eq!(report.failures[1].table, TableKind::Smbios(0));
        assert_eq!(report.failures.len(), 2);

        // Type 32 and the end-of-table marker
        assert!(report.smbios_installed);
        assert_eq!(report.smbios_structures, 2);
        assert_eq!(sink.smbios.len(), 11 + 2 + 4 + 2);
        assert_eq!(sink.smbios[0], 32);
    }

    #[test]
    fn test_firmware_refusal() {
        let repo = partial_repo();
        let cm = repo.freeze().unwrap();
        let mut sink = MockSink {
            refuse: Some(*b"MCFG"),
            ..Default::default()
        };
        let report = install_tables(&cm, &mut sink);
        assert_eq!(report.acpi_installed, 0);
        assert!(report.failures.iter().any(|failure| failure
            == &Failure {
                table: TableKind::Acpi(*b"MCFG"),
                error: InstallError::Firmware(efi::Status::OUT_OF_RESOURCES),
            }));
        assert!(report.smbios_installed);
    }

    #[test]
    fn test_nothing_listed() {
        let repo = Repository::new();
        let cm = repo.freeze().unwrap();
        let mut sink = MockSink::default();
        let report = install_tables(&cm, &mut sink);
        assert!(report.is_complete());
        assert_eq!(report.acpi_installed, 0);
        assert!(!report.smbios_installed);
        assert!(sink.config_tables.is_empty());
    }
}
