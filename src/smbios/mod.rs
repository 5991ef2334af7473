//! SMBIOS structure generators
//!
//! The platform's SMBIOS table list names the structure types to build.
//! [`SmbiosBuilder`] appends every structure of one type per call, hands
//! out handles, and remembers the handles of caches and memory arrays so
//! processors and memory devices can reference them. Types that others
//! point at are built first (see [`generation_order`]).
//!
//! A failing type leaves neither bytes nor handles behind, so the rest of
//! the table set is still consistent.

pub mod firmware;
pub mod memory;
pub mod processor;
pub mod slot;
pub mod strings;

use heapless::Vec;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

pub use strings::StringSet;

use crate::checksum;
use crate::config::{
    MAX_MEMORY_ARRAYS, MAX_SMBIOS_CACHES, MAX_SMBIOS_TABLES, SMBIOS_MAJOR_VERSION,
    SMBIOS_MINOR_VERSION,
};
use crate::dispatch::ConfigurationManager;
use crate::error::CmError;
use crate::records::SmbiosTableInfo;
use crate::repository::{MemoryArray, SmbiosCache};
use crate::table::TableBuffer;
use crate::token::TokenRef;

/// Handle of a reference that is not present
pub const HANDLE_NONE: u16 = 0xFFFF;

/// Handle of an optional structure that is not provided
pub const HANDLE_NOT_PROVIDED: u16 = 0xFFFE;

/// Highest handle a structure may carry
pub const MAX_HANDLE: u16 = 0xFEFF;

/// Type of the end-of-table marker
pub const END_OF_TABLE: u8 = 127;

/// Offset of the checksum in the SMBIOS 3.0 entry point
pub const ENTRY_POINT_CHECKSUM_OFFSET: usize = 5;

/// Header of every SMBIOS structure
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct SmbiosHeader {
    pub kind: u8,
    /// Length of the formatted area, strings excluded
    pub length: u8,
    pub handle: u16,
}

const _: () = assert!(size_of::<SmbiosHeader>() == 4);

/// SMBIOS 3.0 (64-bit) entry point
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct EntryPoint {
    pub anchor: [u8; 5],
    pub checksum: u8,
    pub length: u8,
    pub major_version: u8,
    pub minor_version: u8,
    pub docrev: u8,
    pub revision: u8,
    pub reserved: u8,
    /// Byte length of all structures, end-of-table included
    pub max_size: u32,
    pub table_address: u64,
}

const _: () = assert!(size_of::<EntryPoint>() == 24);

/// Structure types the builder can generate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SmbiosType {
    Bios = 0,
    System = 1,
    Chassis = 3,
    Processor = 4,
    Cache = 7,
    SystemSlot = 9,
    MemoryArray = 16,
    MemoryDevice = 17,
    MappedAddress = 19,
    SystemBoot = 32,
}

impl SmbiosType {
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Bios),
            1 => Some(Self::System),
            3 => Some(Self::Chassis),
            4 => Some(Self::Processor),
            7 => Some(Self::Cache),
            9 => Some(Self::SystemSlot),
            16 => Some(Self::MemoryArray),
            17 => Some(Self::MemoryDevice),
            19 => Some(Self::MappedAddress),
            32 => Some(Self::SystemBoot),
            _ => None,
        }
    }

    /// Types other structures hold handles of
    const fn is_referenced(self) -> bool {
        matches!(self, Self::Cache | Self::MemoryArray)
    }
}

/// Generator for one structure type
pub trait SmbiosGenerator {
    const TYPE: SmbiosType;

    /// Append every structure of this type, returning how many were written
    fn emit(
        cm: &ConfigurationManager<'_>,
        builder: &mut SmbiosBuilder,
        out: &mut TableBuffer,
    ) -> Result<usize, CmError>;
}

/// Handle minted for a token-carrying record
#[derive(Debug, Clone, Copy)]
struct HandleRef {
    token: TokenRef,
    handle: u16,
}

/// Handle allocation and cross-reference state of one table set
#[derive(Debug, Clone)]
pub struct SmbiosBuilder {
    next_handle: u16,
    caches: Vec<HandleRef, MAX_SMBIOS_CACHES>,
    arrays: Vec<HandleRef, MAX_MEMORY_ARRAYS>,
    structures: usize,
}

impl Default for SmbiosBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SmbiosBuilder {
    pub const fn new() -> Self {
        Self {
            next_handle: 0,
            caches: Vec::new(),
            arrays: Vec::new(),
            structures: 0,
        }
    }

    /// Structures appended so far
    pub fn structure_count(&self) -> usize {
        self.structures
    }

    /// Append all structures the table list entry asks for
    ///
    /// On failure `out` and the handle state are rolled back to where they
    /// were before the call.
    pub fn build(
        &mut self,
        cm: &ConfigurationManager<'_>,
        info: &SmbiosTableInfo,
        out: &mut TableBuffer,
    ) -> Result<usize, CmError> {
        let kind = SmbiosType::from_u8(info.structure_type).ok_or(CmError::Unsupported)?;
        let snapshot = self.clone();
        let start = out.len();

        let result = match kind {
            SmbiosType::Bios => firmware::Bios::emit(cm, self, out),
            SmbiosType::System => firmware::System::emit(cm, self, out),
            SmbiosType::Chassis => firmware::Chassis::emit(cm, self, out),
            SmbiosType::SystemBoot => firmware::SystemBoot::emit(cm, self, out),
            SmbiosType::Processor => processor::Processor::emit(cm, self, out),
            SmbiosType::Cache => processor::Cache::emit(cm, self, out),
            SmbiosType::SystemSlot => slot::SystemSlot::emit(cm, self, out),
            SmbiosType::MemoryArray => memory::MemoryArray::emit(cm, self, out),
            SmbiosType::MemoryDevice => memory::MemoryDevice::emit(cm, self, out),
            SmbiosType::MappedAddress => memory::MappedAddress::emit(cm, self, out),
        };
        let result = match result {
            Ok(0) => Err(CmError::NotFound),
            other => other,
        };

        match result {
            Ok(count) => {
                log::debug!("SMBIOS type {}: {} structures", kind as u8, count);
                Ok(count)
            }
            Err(err) => {
                *self = snapshot;
                out.truncate(start);
                Err(err)
            }
        }
    }

    /// Append the end-of-table marker
    pub fn finish(&mut self, out: &mut TableBuffer) -> Result<(), CmError> {
        let header = self.header::<SmbiosHeader>(END_OF_TABLE)?;
        self.emit(out, &header, &StringSet::new())
    }

    /// Next free structure handle
    pub fn allocate_handle(&mut self) -> Result<u16, CmError> {
        let handle = self.next_handle;
        if handle > MAX_HANDLE {
            return Err(CmError::OutOfResources);
        }
        self.next_handle = handle + 1;
        Ok(handle)
    }

    /// Header for a structure whose formatted area is a `T`
    pub fn header<T>(&mut self, kind: u8) -> Result<SmbiosHeader, CmError> {
        let length = u8::try_from(size_of::<T>()).map_err(|_| CmError::InvalidParameter)?;
        Ok(SmbiosHeader {
            kind,
            length,
            handle: self.allocate_handle()?,
        })
    }

    /// Append one formatted area and its strings
    pub fn emit<T: IntoBytes + Immutable>(
        &mut self,
        out: &mut TableBuffer,
        structure: &T,
        strings: &StringSet<'_>,
    ) -> Result<(), CmError> {
        out.push(structure)?;
        strings.write(out)?;
        self.structures += 1;
        Ok(())
    }

    pub(crate) fn bind_cache(&mut self, token: TokenRef, handle: u16) -> Result<(), CmError> {
        self.caches
            .push(HandleRef { token, handle })
            .map_err(|_| CmError::OutOfResources)
    }

    pub(crate) fn bind_array(&mut self, token: TokenRef, handle: u16) -> Result<(), CmError> {
        self.arrays
            .push(HandleRef { token, handle })
            .map_err(|_| CmError::OutOfResources)
    }

    /// Handle of a processor's cache reference
    ///
    /// An unset reference, or a cache whose structure was not built, is
    /// [`HANDLE_NONE`]. A token that names no cache is an error.
    pub fn cache_handle(
        &self,
        cm: &ConfigurationManager<'_>,
        reference: TokenRef,
    ) -> Result<u16, CmError> {
        let Some(token) = reference.token() else {
            return Ok(HANDLE_NONE);
        };
        cm.lookup::<SmbiosCache>(token)?;
        let handle = find(&self.caches, reference);
        if handle.is_none() {
            log::debug!("SMBIOS: cache {:#x} has no structure", token.get());
        }
        Ok(handle.unwrap_or(HANDLE_NONE))
    }

    /// Handle of the memory array a device or address range belongs to
    ///
    /// The array is mandatory and must already have been built.
    pub fn array_handle(
        &self,
        cm: &ConfigurationManager<'_>,
        reference: TokenRef,
    ) -> Result<u16, CmError> {
        let token = reference.token().ok_or(CmError::InvalidParameter)?;
        cm.lookup::<MemoryArray>(token)?;
        find(&self.arrays, reference).ok_or(CmError::NotFound)
    }
}

fn find(bindings: &[HandleRef], token: TokenRef) -> Option<u16> {
    bindings
        .iter()
        .find(|binding| binding.token == token)
        .map(|binding| binding.handle)
}

/// Table list entries reordered so referenced types come first
///
/// Relative order within each group is kept.
pub fn generation_order(list: &[SmbiosTableInfo]) -> Vec<SmbiosTableInfo, MAX_SMBIOS_TABLES> {
    let referenced = |info: &SmbiosTableInfo| {
        SmbiosType::from_u8(info.structure_type).is_some_and(SmbiosType::is_referenced)
    };
    list.iter()
        .filter(|info| referenced(info))
        .chain(list.iter().filter(|info| !referenced(info)))
        .take(MAX_SMBIOS_TABLES)
        .copied()
        .collect()
}

/// Entry point for a structure table of `max_size` bytes at `table_address`
pub fn entry_point(max_size: usize, table_address: u64) -> Result<EntryPoint, CmError> {
    let mut entry = EntryPoint {
        anchor: *b"_SM3_",
        checksum: 0,
        length: size_of::<EntryPoint>() as u8,
        major_version: SMBIOS_MAJOR_VERSION,
        minor_version: SMBIOS_MINOR_VERSION,
        docrev: 0,
        revision: 1,
        reserved: 0,
        max_size: u32::try_from(max_size).map_err(|_| CmError::BufferTooSmall)?,
        table_address,
    };
    checksum::finalize(entry.as_mut_bytes(), ENTRY_POINT_CHECKSUM_OFFSET)?;
    Ok(entry)
}

/// Number of a processor or core count, saturating at the 0xFF escape
pub(crate) fn count_u8(count: u16) -> u8 {
    u8::try_from(count).unwrap_or(0xFF)
}


#[cfg(test)]
mod tests {
    use super::test_util::*;
    use super::*;
    use crate::acpi::test_util::{board, read_u32, read_u64};
    use crate::repository::Repository;

    fn table(kind: u8) -> SmbiosTableInfo {
        SmbiosTableInfo {
            structure_type: kind,
        }
    }

    #[test]
    fn test_generation_order() {
        let list = [table(0), table(4), table(7), table(17), table(16), table(1)];
        let order: std::vec::Vec<u8> = generation_order(&list)
            .iter()
            .map(|info| info.structure_type)
            .collect();
        assert_eq!(order, [7, 16, 0, 4, 17, 1]);
    }

    #[test]
    fn test_handles_are_sequential() {
        let mut builder = SmbiosBuilder::new();
        assert_eq!(builder.allocate_handle(), Ok(0));
        assert_eq!(builder.allocate_handle(), Ok(1));

        builder.next_handle = MAX_HANDLE;
        assert_eq!(builder.allocate_handle(), Ok(MAX_HANDLE));
        assert_eq!(builder.allocate_handle(), Err(CmError::OutOfResources));
    }

    #[test]
    fn test_end_of_table() {
        let mut builder = SmbiosBuilder::new();
        let mut out = TableBuffer::new();
        builder.finish(&mut out).unwrap();
        assert_eq!(out.as_bytes(), &[END_OF_TABLE, 4, 0, 0, 0, 0]);
        assert_eq!(builder.structure_count(), 1);
    }

    #[test]
    fn test_entry_point() {
        let entry = entry_point(0x1234, 0x8_0000_0000).unwrap();
        let bytes = entry.as_bytes();
        assert_eq!(&bytes[0..5], b"_SM3_");
        assert_eq!(bytes[6], 24);
        assert_eq!(bytes[7], 3);
        assert_eq!(bytes[8], 3);
        assert_eq!(bytes[10], 1);
        assert_eq!(read_u32(bytes, 12), 0x1234);
        assert_eq!(read_u64(bytes, 16), 0x8_0000_0000);
        assert!(checksum::verify(bytes));
    }

    #[test]
    fn test_unknown_and_empty_types() {
        let repo = Repository::new();
        let cm = repo.freeze().unwrap();
        let mut builder = SmbiosBuilder::new();
        let mut out = TableBuffer::new();
        assert_eq!(
            builder.build(&cm, &table(2), &mut out),
            Err(CmError::Unsupported)
        );
        assert_eq!(
            builder.build(&cm, &table(0), &mut out),
            Err(CmError::NotFound)
        );
        assert!(out.is_empty());
    }

    #[test]
    fn test_board_table_set() {
        let repo = board();
        let cm = repo.freeze().unwrap();
        let list = cm.resolve_all::<crate::repository::SmbiosTableList>().unwrap();

        let mut builder = SmbiosBuilder::new();
        let mut out = TableBuffer::new();
        for info in generation_order(list.records()).iter() {
            builder.build(&cm, info, &mut out).unwrap();
        }
        builder.finish(&mut out).unwrap();
        let bytes = out.as_bytes();

        // Walk every structure; handles are unique and increasing
        let mut offset = 0;
        let mut handles = std::vec::Vec::new();
        while offset < bytes.len() {
            handles.push(handle_of(bytes, offset));
            offset = next_structure(bytes, offset);
        }
        assert_eq!(offset, bytes.len());
        assert_eq!(handles.len(), builder.structure_count());
        assert!(handles.windows(2).all(|pair| pair[0] < pair[1]));

        // Caches come first, the marker last
        assert_eq!(bytes[0], SmbiosType::Cache as u8);
        let last = structure_offset(bytes, handles.len() - 1);
        assert_eq!(bytes[last], END_OF_TABLE);
    }

    #[test]
    fn test_failed_type_rolls_back() {
        use crate::records::{MemoryDeviceInfo, SystemBootInfo};
        use crate::repository::{MemoryDevice, SystemBoot};

        let mut repo = Repository::new();
        repo.add::<SystemBoot>(SystemBootInfo::default()).unwrap();
        // Device without its array
        repo.add::<MemoryDevice>(MemoryDeviceInfo::default()).unwrap();
        let cm = repo.freeze().unwrap();

        let mut builder = SmbiosBuilder::new();
        let mut out = TableBuffer::new();
        builder.build(&cm, &table(32), &mut out).unwrap();
        let len = out.len();
        assert_eq!(
            builder.build(&cm, &table(17), &mut out),
            Err(CmError::InvalidParameter)
        );
        assert_eq!(out.len(), len);
        assert_eq!(builder.structure_count(), 1);
        assert_eq!(builder.allocate_handle(), Ok(1));
    }
}
