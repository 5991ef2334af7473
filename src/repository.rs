//! Object repository
//!
//! One aggregate holding a bounded array per category. The platform
//! initializer populates it once; [`Repository::freeze`] then hands out a
//! [`ConfigurationManager`] that borrows it immutably, so no record can change
//! while descriptors are alive.
//!
//! Each category is a zero-sized marker type implementing [`Category`]. The
//! marker carries the category key, the policy, and the storage accessors, and
//! its trait impls ([`WholeCategory`], [`TokenSearch`]) decide which typed
//! queries compile.

use heapless::Vec;

use crate::category::{
    ArmObject, Category, CategoryId, Policy, SmbiosObject, StandardObject, TokenSearch, Tokened,
    WholeCategory,
};
use crate::config::*;
use crate::dispatch::{ConfigurationManager, DispatchMap, SearchFn, register, search_one};
use crate::error::CmError;
use crate::records::*;
use crate::token::{Token, TokenRef};

macro_rules! repository {
    (@policy direct) => { Policy::Direct };
    (@policy by_index) => { Policy::OptionalToken };
    (@policy by_token) => { Policy::OptionalToken };

    (@mints by_token) => { true };
    (@mints $kind:ident) => { false };

    (@stamp by_token $record:ty) => {
        fn stamp(record: &mut $record, token: Token) {
            record.set_token(TokenRef::from(token));
        }
    };
    (@stamp $kind:ident $record:ty) => {};

    (@search direct $marker:ident) => { None };
    (@search $kind:ident $marker:ident) => { Some(search_one::<$marker> as SearchFn) };

    (@search_impl by_index $marker:ident) => {
        impl TokenSearch for $marker {
            fn search(records: &[Self::Record], token: Token) -> Option<usize> {
                let index = token.index();
                (index < records.len()).then_some(index)
            }
        }
    };
    (@search_impl by_token $marker:ident) => {
        impl TokenSearch for $marker {
            fn search(records: &[Self::Record], token: Token) -> Option<usize> {
                let token = TokenRef::from(token);
                records.iter().position(|record| record.token() == token)
            }
        }
    };
    (@search_impl direct $marker:ident) => {};

    (
        $(
            $(#[$doc:meta])*
            $marker:ident => $field:ident: [$record:ty; $capacity:expr], $id:expr, $kind:ident;
        )*
    ) => {
        /// Storage for every category of this platform build
        pub struct Repository {
            /// Last token minted for a token-carrying record
            last_token: usize,
            $($field: Vec<$record, { $capacity }>,)*
        }

        impl Repository {
            /// Empty repository, usable in a `static`
            pub const fn new() -> Self {
                Self {
                    last_token: 0,
                    $($field: Vec::new(),)*
                }
            }

            pub(crate) fn register_all<'r>(
                &'r self,
                map: &mut DispatchMap<'r>,
            ) -> Result<(), CmError> {
                $(register::<$marker>(self, map)?;)*
                Ok(())
            }
        }

        $(
            $(#[$doc])*
            pub enum $marker {}

            impl Category for $marker {
                const ID: CategoryId = $id;
                const POLICY: Policy = repository!(@policy $kind);
                const MINTS_TOKEN: bool = repository!(@mints $kind);

                type Record = $record;

                fn records(repo: &Repository) -> &[$record] {
                    &repo.$field
                }

                fn push(repo: &mut Repository, record: $record) -> Result<(), CmError> {
                    repo.$field.push(record).map_err(|_| CmError::OutOfResources)
                }

                repository!(@stamp $kind $record);

                fn search_fn() -> Option<SearchFn> {
                    repository!(@search $kind $marker)
                }
            }

            impl WholeCategory for $marker {}

            repository!(@search_impl $kind $marker);
        )*
    };
}

repository! {
    /// Configuration manager revision and OEM identity
    CfgMgrInfo => cm_info: [CmInfo; 1],
        CategoryId::standard(StandardObject::CfgMgrInfo), direct;
    /// ACPI tables to generate and install
    AcpiTableList => acpi_tables: [AcpiTableInfo; MAX_ACPI_TABLES],
        CategoryId::standard(StandardObject::AcpiTableList), direct;
    /// SMBIOS structure types to generate
    SmbiosTableList => smbios_tables: [SmbiosTableInfo; MAX_SMBIOS_TABLES],
        CategoryId::standard(StandardObject::SmbiosTableList), direct;

    /// GIC CPU interfaces, addressed by index
    GicC => gicc: [GicCInfo; MAX_CPUS],
        CategoryId::arm(ArmObject::GicCInfo), by_index;
    GicD => gicd: [GicDInfo; 1],
        CategoryId::arm(ArmObject::GicDInfo), direct;
    GicRedistributor => gicr: [GicRedistributorInfo; MAX_GIC_REDISTRIBUTORS],
        CategoryId::arm(ArmObject::GicRedistributorInfo), direct;
    GicIts => gic_its: [GicItsInfo; MAX_GIC_ITS],
        CategoryId::arm(ArmObject::GicItsInfo), direct;
    SerialConsolePort => serial_console: [SerialPortInfo; 1],
        CategoryId::arm(ArmObject::SerialConsolePortInfo), direct;
    GenericTimer => generic_timer: [GenericTimerInfo; 1],
        CategoryId::arm(ArmObject::GenericTimerInfo), direct;
    GtBlock => gt_blocks: [GtBlockInfo; MAX_GT_BLOCKS],
        CategoryId::arm(ArmObject::PlatformGtBlockInfo), by_token;
    /// Timer frames, grouped by their GT block
    GtBlockTimerFrame => gt_frames: [GtBlockTimerFrameInfo; MAX_GT_FRAMES],
        CategoryId::arm(ArmObject::GtBlockTimerFrameInfo), direct;
    GenericWatchdog => watchdogs: [GenericWatchdogInfo; MAX_WATCHDOGS],
        CategoryId::arm(ArmObject::PlatformGenericWatchdogInfo), direct;
    PciConfigSpace => pci_config: [PciConfigSpaceInfo; MAX_PCI_SEGMENTS],
        CategoryId::arm(ArmObject::PciConfigSpaceInfo), direct;
    ItsGroup => its_groups: [ItsGroupNode; MAX_ITS_GROUPS],
        CategoryId::arm(ArmObject::ItsGroup), by_token;
    NamedComponent => named_components: [NamedComponentNode; MAX_NAMED_COMPONENTS],
        CategoryId::arm(ArmObject::NamedComponent), by_token;
    RootComplex => root_complexes: [RootComplexNode; MAX_ROOT_COMPLEXES],
        CategoryId::arm(ArmObject::RootComplex), by_token;
    SmmuV2 => smmus: [SmmuV2Node; MAX_SMMUS],
        CategoryId::arm(ArmObject::SmmuV1SmmuV2), by_token;
    /// ITS identifiers, grouped by ITS group
    ItsIdentifierArray => its_identifiers: [ItsIdentifier; MAX_ITS_IDENTIFIERS],
        CategoryId::arm(ArmObject::GicItsIdentifierArray), direct;
    /// ID mappings, grouped by IORT node
    IdMappingArray => id_mappings: [IdMapping; MAX_ID_MAPPINGS],
        CategoryId::arm(ArmObject::IdMappingArray), direct;
    /// SMMU context and PMU interrupts, grouped by SMMU
    SmmuInterruptArray => smmu_interrupts: [SmmuInterrupt; MAX_SMMU_INTERRUPTS],
        CategoryId::arm(ArmObject::SmmuInterruptArray), direct;
    ProcHierarchy => proc_nodes: [ProcHierarchyInfo; MAX_PROC_NODES],
        CategoryId::arm(ArmObject::ProcHierarchyInfo), by_token;
    Cache => caches: [CacheInfo; MAX_CACHES],
        CategoryId::arm(ArmObject::CacheInfo), by_token;
    /// Private resources, grouped by processor hierarchy node
    PrivateResources => private_resources: [PrivateResource; MAX_PRIVATE_RESOURCES],
        CategoryId::arm(ArmObject::PrivateResource), direct;
    /// AML body of the DSDT
    DefinitionBlock => definition_block: [u8; DEFINITION_BLOCK_CAPACITY],
        CategoryId::arm(ArmObject::DefinitionBlock), direct;

    Bios => bios: [BiosInfo; 1],
        CategoryId::smbios(SmbiosObject::BiosInfo), direct;
    System => system: [SystemInfo; 1],
        CategoryId::smbios(SmbiosObject::SystemInfo), direct;
    Chassis => chassis: [ChassisInfo; 1],
        CategoryId::smbios(SmbiosObject::ChassisInfo), direct;
    Processor => processors: [ProcessorInfo; MAX_SMBIOS_PROCESSORS],
        CategoryId::smbios(SmbiosObject::ProcessorInfo), direct;
    SmbiosCache => smbios_caches: [SmbiosCacheInfo; MAX_SMBIOS_CACHES],
        CategoryId::smbios(SmbiosObject::CacheInfo), by_token;
    SystemSlot => system_slots: [SystemSlotInfo; MAX_SYSTEM_SLOTS],
        CategoryId::smbios(SmbiosObject::SystemSlot), direct;
    MemoryArray => memory_arrays: [MemoryArrayInfo; MAX_MEMORY_ARRAYS],
        CategoryId::smbios(SmbiosObject::PhysicalMemoryArray), by_token;
    MemoryDevice => memory_devices: [MemoryDeviceInfo; MAX_MEMORY_DEVICES],
        CategoryId::smbios(SmbiosObject::MemoryDevice), direct;
    MemoryMappedAddress => mapped_addresses: [MemoryMappedAddressInfo; MAX_MAPPED_ADDRESSES],
        CategoryId::smbios(SmbiosObject::MemoryArrayMappedAddress), direct;
    SystemBoot => system_boot: [SystemBootInfo; 1],
        CategoryId::smbios(SmbiosObject::SystemBootInfo), direct;
}

impl Repository {
    /// Append one record to category `C`
    ///
    /// Returns the record's token. For token-carrying categories a fresh
    /// token is minted and written into the record; index-addressed
    /// categories return `index + 1`. Direct categories return the same
    /// index form, which is only meaningful as a cross-reference.
    pub fn add<C: Category>(&mut self, mut record: C::Record) -> Result<Token, CmError> {
        let token = if C::MINTS_TOKEN {
            let token = Token::new(self.last_token.wrapping_add(1)).ok_or(CmError::OutOfResources)?;
            C::stamp(&mut record, token);
            token
        } else {
            Token::from_index(C::records(self).len())
        };

        if let Err(err) = C::push(self, record) {
            log::warn!("{}: category full", C::ID);
            return Err(err);
        }
        if C::MINTS_TOKEN {
            self.last_token = token.get();
        }

        log::trace!("{}: added record, token {:#x}", C::ID, token.get());
        Ok(token)
    }

    /// Append AML bytes to the DSDT definition block
    pub fn load_definition_block(&mut self, aml: &[u8]) -> Result<(), CmError> {
        self.definition_block
            .extend_from_slice(aml)
            .map_err(|_| CmError::OutOfResources)?;
        log::debug!("definition block: {} bytes of AML", self.definition_block.len());
        Ok(())
    }

    /// Populated records of category `C`
    pub fn records<C: Category>(&self) -> &[C::Record] {
        C::records(self)
    }

    /// End population and build the query interface
    pub fn freeze(&self) -> Result<ConfigurationManager<'_>, CmError> {
        ConfigurationManager::new(self)
    }
}

impl Default for Repository {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_tokens() {
        let mut repo = Repository::new();
        let first = repo.add::<GicC>(GicCInfo::default()).unwrap();
        let second = repo.add::<GicC>(GicCInfo::default()).unwrap();
        assert_eq!(first.get(), 1);
        assert_eq!(second.get(), 2);
        assert_eq!(GicC::search(repo.records::<GicC>(), second), Some(1));
        assert_eq!(GicC::search(repo.records::<GicC>(), Token::from_index(2)), None);
    }

    #[test]
    fn test_minted_tokens_are_unique_across_categories() {
        let mut repo = Repository::new();
        let node = repo.add::<ProcHierarchy>(ProcHierarchyInfo::default()).unwrap();
        let cache = repo.add::<Cache>(CacheInfo::default()).unwrap();
        assert_ne!(node, cache);

        let stored = repo.records::<Cache>()[0];
        assert_eq!({ stored.token }, TokenRef::from(cache));
        assert_eq!(Cache::search(repo.records::<Cache>(), cache), Some(0));
        assert_eq!(Cache::search(repo.records::<Cache>(), node), None);
    }

    #[test]
    fn test_full_category() {
        let mut repo = Repository::new();
        repo.add::<GicD>(GicDInfo::default()).unwrap();
        assert_eq!(repo.add::<GicD>(GicDInfo::default()), Err(CmError::OutOfResources));
        assert_eq!(repo.records::<GicD>().len(), 1);
    }

    #[test]
    fn test_full_category_does_not_consume_tokens() {
        let mut repo = Repository::new();
        for _ in 0..MAX_SMMUS {
            repo.add::<SmmuV2>(SmmuV2Node::default()).unwrap();
        }
        assert!(repo.add::<SmmuV2>(SmmuV2Node::default()).is_err());
        let next = repo.add::<ItsGroup>(ItsGroupNode::default()).unwrap();
        assert_eq!(next.get(), MAX_SMMUS + 1);
    }

    #[test]
    fn test_definition_block() {
        let mut repo = Repository::new();
        repo.load_definition_block(&[0x10, 0x05]).unwrap();
        repo.load_definition_block(&[0x5C]).unwrap();
        assert_eq!(repo.records::<DefinitionBlock>(), &[0x10, 0x05, 0x5C]);

        let too_big = [0u8; DEFINITION_BLOCK_CAPACITY];
        assert_eq!(
            repo.load_definition_block(&too_big),
            Err(CmError::OutOfResources)
        );
        assert_eq!(repo.records::<DefinitionBlock>().len(), 3);
    }

    #[test]
    fn test_policies() {
        assert_eq!(GicC::POLICY, Policy::OptionalToken);
        assert_eq!(IdMappingArray::POLICY, Policy::Direct);
        assert_eq!(Cache::POLICY, Policy::OptionalToken);
        assert!(Cache::MINTS_TOKEN);
        assert!(!GicC::MINTS_TOKEN);
        assert!(GicD::search_fn().is_none());
        assert!(GicC::search_fn().is_some());
    }
}
