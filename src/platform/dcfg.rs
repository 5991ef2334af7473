//! Device Configuration (DCFG) block
//!
//! Only the System Version Register is used: it identifies the SoC and its
//! silicon revision. Some Layerscape parts expose the block big-endian.

use core::fmt;

use tock_registers::interfaces::Readable;
use tock_registers::registers::ReadOnly;
use tock_registers::{LocalRegisterCopy, register_bitfields};

/// DCFG base address on LX2160A
pub const DCFG_BASE: usize = 0x01E0_0000;

/// SVR register offset
pub const DCFG_SVR: usize = 0xA4;

register_bitfields! [
    u32,
    /// System Version Register
    pub SVR [
        /// Minor silicon revision
        MINOR OFFSET(0) NUMBITS(4) [],
        /// Major silicon revision
        MAJOR OFFSET(4) NUMBITS(4) [],
        /// Personality variant
        VARIANT OFFSET(8) NUMBITS(8) [],
        /// SoC identifier
        SOC_ID OFFSET(16) NUMBITS(16) []
    ]
];

/// DCFG registers up to the SVR
#[repr(C)]
pub struct DcfgRegisters {
    _reserved: [u32; DCFG_SVR / 4],
    /// System Version Register
    pub svr: ReadOnly<u32, SVR::Register>,
}

const _: () = assert!(core::mem::offset_of!(DcfgRegisters, svr) == DCFG_SVR);

/// Byte order of the register block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
}

/// SoC identity decoded from the SVR
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocVersion {
    pub soc_id: u16,
    pub variant: u8,
    pub major: u8,
    pub minor: u8,
}

impl SocVersion {
    pub const LX2160A_ID: u16 = 0x8736;
    pub const LS1046A_ID: u16 = 0x8707;

    /// LX2160A silicon revision 2.0
    pub const LX2160A_REV2: Self = Self {
        soc_id: Self::LX2160A_ID,
        variant: 0,
        major: 2,
        minor: 0,
    };

    /// Decode a raw SVR value
    pub fn from_svr(raw: u32) -> Self {
        let svr = LocalRegisterCopy::<u32, SVR::Register>::new(raw);
        Self {
            soc_id: svr.read(SVR::SOC_ID) as u16,
            variant: svr.read(SVR::VARIANT) as u8,
            major: svr.read(SVR::MAJOR) as u8,
            minor: svr.read(SVR::MINOR) as u8,
        }
    }

    /// The SVR value this version decodes from
    pub fn svr(self) -> u32 {
        (u32::from(self.soc_id) << 16)
            | (u32::from(self.variant) << 8)
            | (u32::from(self.major & 0xF) << 4)
            | u32::from(self.minor & 0xF)
    }

    pub fn name(self) -> &'static str {
        match self.soc_id {
            Self::LX2160A_ID => "LX2160A",
            Self::LS1046A_ID => "LS1046A",
            _ => "unknown",
        }
    }
}

impl fmt::Display for SocVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} rev {}.{}", self.name(), self.major, self.minor)
    }
}

/// Read the SoC version from the DCFG block at `base`
///
/// # Safety
///
/// `base` must point at a mapped DCFG register block (or memory laid out
/// like one) that stays valid for the duration of the call.
pub unsafe fn read_soc_version(base: usize, endianness: Endianness) -> SocVersion {
    let regs = unsafe { &*(base as *const DcfgRegisters) };
    let raw = regs.svr.get();
    let raw = match endianness {
        Endianness::Little => raw,
        Endianness::Big => u32::from_be(raw),
    };
    let version = SocVersion::from_svr(raw);
    log::info!("SoC: {} (SVR {:#010x})", version, raw);
    version
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_svr() {
        let version = SocVersion::from_svr(0x8736_0020);
        assert_eq!(version, SocVersion::LX2160A_REV2);
        assert_eq!(version.name(), "LX2160A");
        assert_eq!(version.svr(), 0x8736_0020);

        let version = SocVersion::from_svr(0x8707_0111);
        assert_eq!(version.name(), "LS1046A");
        assert_eq!(version.variant, 1);
        assert_eq!((version.major, version.minor), (1, 1));
    }

    #[test]
    fn test_display() {
        assert_eq!(SocVersion::LX2160A_REV2.to_string(), "LX2160A rev 2.0");
        assert_eq!(SocVersion::from_svr(0x1234_0010).to_string(), "unknown rev 1.0");
    }

    #[test]
    fn test_read_register_block() {
        let mut block = [0u32; DCFG_SVR / 4 + 1];
        block[DCFG_SVR / 4] = 0x8736_0020;
        let version = unsafe { read_soc_version(block.as_ptr() as usize, Endianness::Little) };
        assert_eq!(version, SocVersion::LX2160A_REV2);

        block[DCFG_SVR / 4] = 0x8707_0010u32.to_be();
        let version = unsafe { read_soc_version(block.as_ptr() as usize, Endianness::Big) };
        assert_eq!(version.soc_id, SocVersion::LS1046A_ID);
    }
}
