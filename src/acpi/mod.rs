//! ACPI table generators
//!
//! Each generator builds one table from repository data. The common path
//! (header, length, checksum) lives in [`build_table`]; a generator only
//! emits the body that follows the 36-byte header.

pub mod dsdt;
pub mod gtdt;
pub mod iort;
pub mod madt;
pub mod mcfg;
pub mod pptt;
pub mod spcr;

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::checksum;
use crate::config::{CREATOR_ID, CREATOR_REVISION};
use crate::dispatch::ConfigurationManager;
use crate::error::CmError;
use crate::records::AcpiTableInfo;
use crate::repository::CfgMgrInfo;
use crate::table::TableBuffer;

/// Offset of the length field in the table header
pub const LENGTH_OFFSET: usize = 4;

/// Offset of the checksum byte in the table header
pub const CHECKSUM_OFFSET: usize = 9;

/// ACPI System Description Table header
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct AcpiHeader {
    pub signature: [u8; 4],
    /// Length of the whole table including this header
    pub length: u32,
    pub revision: u8,
    pub checksum: u8,
    pub oem_id: [u8; 6],
    pub oem_table_id: [u8; 8],
    pub oem_revision: u32,
    pub creator_id: u32,
    pub creator_revision: u32,
}

const _: () = assert!(size_of::<AcpiHeader>() == 36);

/// Generic Address Structure
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct GenericAddress {
    pub address_space_id: u8,
    pub register_bit_width: u8,
    pub register_bit_offset: u8,
    pub access_size: u8,
    pub address: u64,
}

const _: () = assert!(size_of::<GenericAddress>() == 12);

impl GenericAddress {
    /// System memory space
    pub const SYSTEM_MEMORY: u8 = 0;
    /// Double-word access
    pub const ACCESS_DWORD: u8 = 3;

    /// 32-bit wide register block in system memory
    pub const fn mmio32(address: u64) -> Self {
        Self {
            address_space_id: Self::SYSTEM_MEMORY,
            register_bit_width: 32,
            register_bit_offset: 0,
            access_size: Self::ACCESS_DWORD,
            address,
        }
    }
}

/// Generator selector stored in the ACPI table list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum AcpiTableId {
    Dsdt = 1,
    Madt = 2,
    Gtdt = 3,
    Spcr = 4,
    Mcfg = 5,
    Iort = 6,
    Pptt = 7,
}

impl AcpiTableId {
    pub const fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::Dsdt),
            2 => Some(Self::Madt),
            3 => Some(Self::Gtdt),
            4 => Some(Self::Spcr),
            5 => Some(Self::Mcfg),
            6 => Some(Self::Iort),
            7 => Some(Self::Pptt),
            _ => None,
        }
    }

    /// Signature the generator emits
    pub const fn signature(self) -> [u8; 4] {
        match self {
            Self::Dsdt => dsdt::Dsdt::SIGNATURE,
            Self::Madt => madt::Madt::SIGNATURE,
            Self::Gtdt => gtdt::Gtdt::SIGNATURE,
            Self::Spcr => spcr::Spcr::SIGNATURE,
            Self::Mcfg => mcfg::Mcfg::SIGNATURE,
            Self::Iort => iort::Iort::SIGNATURE,
            Self::Pptt => pptt::Pptt::SIGNATURE,
        }
    }
}

/// One ACPI table generator
pub trait AcpiTableGenerator {
    const SIGNATURE: [u8; 4];
    /// Revision emitted when the table list asks for revision 0
    const REVISION: u8;

    /// Append the table body after the header
    fn build_body(cm: &ConfigurationManager<'_>, out: &mut TableBuffer) -> Result<(), CmError>;
}

/// Build the table described by `info` into `out`
///
/// On failure `out` is left empty.
pub fn build_table(
    cm: &ConfigurationManager<'_>,
    info: &AcpiTableInfo,
    out: &mut TableBuffer,
) -> Result<(), CmError> {
    out.clear();
    let generator_id = info.generator_id;
    let id = AcpiTableId::from_u32(generator_id).ok_or(CmError::Unsupported)?;
    let result = match id {
        AcpiTableId::Dsdt => generate::<dsdt::Dsdt>(cm, info, out),
        AcpiTableId::Madt => generate::<madt::Madt>(cm, info, out),
        AcpiTableId::Gtdt => generate::<gtdt::Gtdt>(cm, info, out),
        AcpiTableId::Spcr => generate::<spcr::Spcr>(cm, info, out),
        AcpiTableId::Mcfg => generate::<mcfg::Mcfg>(cm, info, out),
        AcpiTableId::Iort => generate::<iort::Iort>(cm, info, out),
        AcpiTableId::Pptt => generate::<pptt::Pptt>(cm, info, out),
    };
    if result.is_err() {
        out.clear();
    }
    result
}

fn generate<G: AcpiTableGenerator>(
    cm: &ConfigurationManager<'_>,
    info: &AcpiTableInfo,
    out: &mut TableBuffer,
) -> Result<(), CmError> {
    if info.signature != G::SIGNATURE {
        return Err(CmError::InvalidParameter);
    }
    let revision = match info.revision {
        0 => G::REVISION,
        r if r == G::REVISION => r,
        _ => return Err(CmError::Unsupported),
    };

    let cm_info = cm.single::<CfgMgrInfo>()?;
    let header = AcpiHeader {
        signature: G::SIGNATURE,
        length: 0,
        revision,
        checksum: 0,
        oem_id: cm_info.oem_id,
        oem_table_id: info.oem_table_id.to_le_bytes(),
        oem_revision: info.oem_revision,
        creator_id: CREATOR_ID,
        creator_revision: CREATOR_REVISION,
    };
    out.push(&header)?;
    G::build_body(cm, out)?;

    let length = u32::try_from(out.len()).map_err(|_| CmError::BufferTooSmall)?;
    out.patch_u32(LENGTH_OFFSET, length)?;
    checksum::finalize(out.as_mut_bytes(), CHECKSUM_OFFSET)?;

    log::debug!(
        "{}: {} bytes, revision {}",
        core::str::from_utf8(&G::SIGNATURE).unwrap_or("????"),
        length,
        revision
    );
    Ok(())
}

/// Narrow a length or offset to a 32-bit table field
pub(crate) fn field_u32(value: usize) -> Result<u32, CmError> {
    u32::try_from(value).map_err(|_| CmError::BufferTooSmall)
}


#[cfg(test)]
mod tests {
    use super::test_util::*;
    use super::*;
    use crate::repository::Repository;

    #[test]
    fn test_header_fields() {
        let repo = board();
        let cm = repo.freeze().unwrap();
        let mut out = TableBuffer::new();
        build_table(&cm, &entry(AcpiTableId::Mcfg), &mut out).unwrap();

        let bytes = out.as_bytes();
        assert_eq!(&bytes[0..4], b"MCFG");
        assert_eq!(read_u32(bytes, LENGTH_OFFSET) as usize, bytes.len());
        assert_eq!(bytes[8], mcfg::Mcfg::REVISION);
        assert_eq!(&bytes[10..16], b"NXP   ");
        assert_eq!(&bytes[16..24], b"LX2160A ");
        assert_eq!(read_u32(bytes, 28), CREATOR_ID);
        assert!(checksum::verify(bytes));
    }

    #[test]
    fn test_generator_selection() {
        let repo = board();
        let cm = repo.freeze().unwrap();
        let mut out = TableBuffer::new();

        let mut info = entry(AcpiTableId::Madt);
        info.generator_id = 0x99;
        assert_eq!(build_table(&cm, &info, &mut out), Err(CmError::Unsupported));

        let mut info = entry(AcpiTableId::Madt);
        info.signature = *b"GTDT";
        assert_eq!(build_table(&cm, &info, &mut out), Err(CmError::InvalidParameter));

        let mut info = entry(AcpiTableId::Madt);
        info.revision = 1;
        assert_eq!(build_table(&cm, &info, &mut out), Err(CmError::Unsupported));
        assert!(out.is_empty());
    }

    #[test]
    fn test_missing_manager_info_aborts() {
        let repo = Repository::new();
        let cm = repo.freeze().unwrap();
        let mut out = TableBuffer::new();
        assert_eq!(
            build_table(&cm, &entry(AcpiTableId::Dsdt), &mut out),
            Err(CmError::NotFound)
        );
        assert!(out.is_empty());
    }
}
