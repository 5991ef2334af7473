//! Differentiated System Description Table (DSDT)
//!
//! The body is the platform's AML definition block, copied as-is.

use super::AcpiTableGenerator;
use crate::dispatch::ConfigurationManager;
use crate::error::CmError;
use crate::repository::DefinitionBlock;
use crate::table::TableBuffer;

pub struct Dsdt;

impl AcpiTableGenerator for Dsdt {
    const SIGNATURE: [u8; 4] = *b"DSDT";
    const REVISION: u8 = 2;

    fn build_body(cm: &ConfigurationManager<'_>, out: &mut TableBuffer) -> Result<(), CmError> {
        let aml = cm.resolve_all::<DefinitionBlock>()?;
        if aml.is_empty() {
            return Err(CmError::NotFound);
        }
        out.push_bytes(aml.records())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_util::*;
    use super::super::{AcpiTableId, build_table};
    use super::*;
    use crate::checksum;
    use crate::repository::{CfgMgrInfo, Repository};

    #[test]
    fn test_board_dsdt() {
        let repo = board();
        let cm = repo.freeze().unwrap();
        let mut out = TableBuffer::new();
        build_table(&cm, &entry(AcpiTableId::Dsdt), &mut out).unwrap();
        let bytes = out.as_bytes();

        let aml = repo.records::<DefinitionBlock>();
        assert_eq!(bytes.len(), 36 + aml.len());
        assert_eq!(&bytes[36..], aml);
        assert!(checksum::verify(bytes));
    }

    #[test]
    fn test_empty_definition_block() {
        let mut repo = Repository::new();
        repo.add::<CfgMgrInfo>(Default::default()).unwrap();
        let cm = repo.freeze().unwrap();
        let mut out = TableBuffer::new();
        assert_eq!(
            build_table(&cm, &entry(AcpiTableId::Dsdt), &mut out),
            Err(CmError::NotFound)
        );
    }
}
