//! PCI Express memory-mapped configuration space table (MCFG)

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use super::AcpiTableGenerator;
use crate::dispatch::ConfigurationManager;
use crate::error::CmError;
use crate::repository::PciConfigSpace;
use crate::table::TableBuffer;

/// One ECAM allocation
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct McfgAllocation {
    pub base_address: u64,
    pub pci_segment_group: u16,
    pub start_bus: u8,
    pub end_bus: u8,
    pub reserved: u32,
}

const _: () = assert!(size_of::<McfgAllocation>() == 16);

pub struct Mcfg;

impl AcpiTableGenerator for Mcfg {
    const SIGNATURE: [u8; 4] = *b"MCFG";
    const REVISION: u8 = 1;

    fn build_body(cm: &ConfigurationManager<'_>, out: &mut TableBuffer) -> Result<(), CmError> {
        // Reserved
        out.push_u64(0)?;

        for segment in cm.resolve_all::<PciConfigSpace>()?.iter() {
            if segment.start_bus > segment.end_bus {
                return Err(CmError::InvalidParameter);
            }
            out.push(&McfgAllocation {
                base_address: segment.base_address,
                pci_segment_group: segment.pci_segment_group,
                start_bus: segment.start_bus,
                end_bus: segment.end_bus,
                reserved: 0,
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_util::*;
    use super::super::{AcpiTableId, build_table};
    use super::*;
    use crate::checksum;
    use crate::records::PciConfigSpaceInfo;
    use crate::repository::{CfgMgrInfo, Repository};

    #[test]
    fn test_board_mcfg() {
        let repo = board();
        let cm = repo.freeze().unwrap();
        let mut out = TableBuffer::new();
        build_table(&cm, &entry(AcpiTableId::Mcfg), &mut out).unwrap();
        let bytes = out.as_bytes();

        let segments = cm.resolve_all::<PciConfigSpace>().unwrap().count();
        assert_eq!(bytes.len(), 44 + 16 * segments);
        assert_eq!(read_u64(bytes, 44), 0x90_0000_0000);
        assert_eq!(read_u16(bytes, 52), 2);
        assert_eq!(bytes[55], 0xFF);
        assert!(checksum::verify(bytes));
    }

    #[test]
    fn test_empty_and_invalid_segments() {
        let mut repo = Repository::new();
        repo.add::<CfgMgrInfo>(Default::default()).unwrap();
        let cm = repo.freeze().unwrap();
        let mut out = TableBuffer::new();
        build_table(&cm, &entry(AcpiTableId::Mcfg), &mut out).unwrap();
        assert_eq!(out.len(), 44);

        let mut repo = Repository::new();
        repo.add::<CfgMgrInfo>(Default::default()).unwrap();
        repo.add::<PciConfigSpace>(PciConfigSpaceInfo {
            base_address: 0x90_0000_0000,
            pci_segment_group: 0,
            start_bus: 4,
            end_bus: 1,
        })
        .unwrap();
        let cm = repo.freeze().unwrap();
        assert_eq!(
            build_table(&cm, &entry(AcpiTableId::Mcfg), &mut out),
            Err(CmError::InvalidParameter)
        );
    }
}
