//! Serial Port Console Redirection table (SPCR)

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use super::{AcpiTableGenerator, GenericAddress};
use crate::dispatch::ConfigurationManager;
use crate::error::CmError;
use crate::repository::SerialConsolePort;
use crate::table::TableBuffer;

/// Interrupt routed through the GIC
const INTERRUPT_TYPE_GIC: u8 = 1 << 3;

/// ANSI terminal
const TERMINAL_TYPE_ANSI: u8 = 3;

#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
struct SpcrBody {
    interface_type: u8,
    reserved: [u8; 3],
    base_address: GenericAddress,
    interrupt_type: u8,
    irq: u8,
    global_system_interrupt: u32,
    baud_rate: u8,
    parity: u8,
    stop_bits: u8,
    flow_control: u8,
    terminal_type: u8,
    language: u8,
    pci_device_id: u16,
    pci_vendor_id: u16,
    pci_bus: u8,
    pci_device: u8,
    pci_function: u8,
    pci_flags: u32,
    pci_segment: u8,
    reserved2: u32,
}

const _: () = assert!(36 + size_of::<SpcrBody>() == 80);

/// SPCR encoding of a baud rate
fn baud_rate_code(baud_rate: u64) -> Result<u8, CmError> {
    match baud_rate {
        9600 => Ok(3),
        19200 => Ok(4),
        57600 => Ok(6),
        115200 => Ok(7),
        _ => Err(CmError::InvalidParameter),
    }
}

pub struct Spcr;

impl AcpiTableGenerator for Spcr {
    const SIGNATURE: [u8; 4] = *b"SPCR";
    const REVISION: u8 = 2;

    fn build_body(cm: &ConfigurationManager<'_>, out: &mut TableBuffer) -> Result<(), CmError> {
        let port = cm.single::<SerialConsolePort>()?;
        let subtype = port.port_subtype;
        let interface_type = u8::try_from(subtype).map_err(|_| CmError::InvalidParameter)?;

        out.push(&SpcrBody {
            interface_type,
            base_address: GenericAddress::mmio32(port.base_address),
            interrupt_type: INTERRUPT_TYPE_GIC,
            global_system_interrupt: port.interrupt,
            baud_rate: baud_rate_code(port.baud_rate)?,
            stop_bits: 1,
            terminal_type: TERMINAL_TYPE_ANSI,
            pci_device_id: 0xFFFF,
            pci_vendor_id: 0xFFFF,
            ..Default::default()
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_util::*;
    use super::super::{AcpiTableId, build_table};
    use super::*;
    use crate::checksum;
    use crate::records::{SerialPortInfo, serial_subtype};
    use crate::repository::{CfgMgrInfo, Repository};

    #[test]
    fn test_board_spcr() {
        let repo = board();
        let cm = repo.freeze().unwrap();
        let mut out = TableBuffer::new();
        build_table(&cm, &entry(AcpiTableId::Spcr), &mut out).unwrap();
        let bytes = out.as_bytes();

        assert_eq!(bytes.len(), 80);
        assert_eq!(bytes[36], serial_subtype::PL011 as u8);
        assert_eq!(read_u64(bytes, 44), 0x021C_0000);
        assert_eq!(bytes[52], INTERRUPT_TYPE_GIC);
        assert_eq!(read_u32(bytes, 54), 64);
        assert_eq!(bytes[58], 7);
        assert_eq!(read_u16(bytes, 64), 0xFFFF);
        assert!(checksum::verify(bytes));
    }

    #[test]
    fn test_unsupported_baud_rate() {
        let mut repo = Repository::new();
        repo.add::<CfgMgrInfo>(Default::default()).unwrap();
        repo.add::<SerialConsolePort>(SerialPortInfo {
            base_address: 0x021C_0000,
            baud_rate: 38400,
            port_subtype: serial_subtype::PL011,
            ..Default::default()
        })
        .unwrap();
        let cm = repo.freeze().unwrap();
        let mut out = TableBuffer::new();
        assert_eq!(
            build_table(&cm, &entry(AcpiTableId::Spcr), &mut out),
            Err(CmError::InvalidParameter)
        );
    }

    #[test]
    fn test_baud_rate_codes() {
        assert_eq!(baud_rate_code(9600), Ok(3));
        assert_eq!(baud_rate_code(115200), Ok(7));
        assert_eq!(baud_rate_code(0), Err(CmError::InvalidParameter));
    }
}
