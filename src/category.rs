//! Category identifiers and resolution policies
//!
//! A [`CategoryId`] is the 32-bit key of one class of hardware-description
//! record. Layout of the key:
//!
//! ```text
//!  31      28 27                     8 7          0
//! +----------+------------------------+------------+
//! | namespace|   reserved (zero)      | object id  |
//! +----------+------------------------+------------+
//! ```
//!
//! The namespace is part of the key, so object ids of different namespaces
//! never collide.
//!
//! Each category declares exactly one [`Policy`]. The policy is also encoded
//! in the trait bounds of the category's marker type, so the typed query API
//! rejects forbidden access patterns at compile time.

use core::fmt;

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::dispatch::SearchFn;
use crate::error::CmError;
use crate::repository::Repository;
use crate::token::{Token, TokenRef};

/// Bit position of the namespace inside a category key
const NAMESPACE_SHIFT: u32 = 28;

/// Reserved bits of a category key
const RESERVED_MASK: u32 = 0x0FFF_FF00;

macro_rules! object_ids {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($(#[$variant_meta:meta])* $variant:ident = $value:literal,)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum $name {
            $($(#[$variant_meta])* $variant = $value,)*
        }

        impl $name {
            /// Decode an object id
            pub const fn from_u8(value: u8) -> Option<Self> {
                match value {
                    $($value => Some(Self::$variant),)*
                    _ => None,
                }
            }

            /// Object name for log output
            pub const fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($variant),)*
                }
            }
        }
    };
}

/// Namespace part of a category key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Namespace {
    /// Architecture-independent objects (table lists, manager info)
    Standard = 0x0,
    /// ARM architecture objects
    Arm = 0x1,
    /// SMBIOS system facts
    Smbios = 0x2,
}

impl Namespace {
    const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x0 => Some(Self::Standard),
            0x1 => Some(Self::Arm),
            0x2 => Some(Self::Smbios),
            _ => None,
        }
    }
}

object_ids! {
    /// Objects of the standard namespace
    pub enum StandardObject {
        CfgMgrInfo = 0,
        AcpiTableList = 1,
        SmbiosTableList = 2,
    }
}

object_ids! {
    /// Objects of the ARM namespace
    pub enum ArmObject {
        BootArchInfo = 1,
        PowerManagementProfileInfo = 3,
        GicCInfo = 5,
        GicDInfo = 6,
        GicMsiFrameInfo = 7,
        GicRedistributorInfo = 8,
        GicItsInfo = 9,
        SerialConsolePortInfo = 10,
        SerialDebugPortInfo = 11,
        GenericTimerInfo = 12,
        PlatformGtBlockInfo = 13,
        GtBlockTimerFrameInfo = 14,
        PlatformGenericWatchdogInfo = 15,
        PciConfigSpaceInfo = 16,
        HypervisorVendorIdentity = 17,
        FixedFeatureFlags = 18,
        ItsGroup = 19,
        NamedComponent = 20,
        RootComplex = 21,
        SmmuV1SmmuV2 = 22,
        SmmuV3 = 23,
        PmcgInfo = 24,
        GicItsIdentifierArray = 25,
        IdMappingArray = 26,
        SmmuInterruptArray = 27,
        ProcHierarchyInfo = 28,
        CacheInfo = 29,
        ProcNodeIdInfo = 30,
        CmRef = 31,
        PrivateResource = 32,
        DefinitionBlock = 33,
    }
}

object_ids! {
    /// Objects of the SMBIOS namespace, numbered after their structure type
    pub enum SmbiosObject {
        BiosInfo = 0,
        SystemInfo = 1,
        ChassisInfo = 3,
        ProcessorInfo = 4,
        CacheInfo = 7,
        SystemSlot = 9,
        PhysicalMemoryArray = 16,
        MemoryDevice = 17,
        MemoryArrayMappedAddress = 19,
        SystemBootInfo = 32,
    }
}

/// Key identifying one category of records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CategoryId(u32);

impl CategoryId {
    const fn new(namespace: Namespace, object: u8) -> Self {
        Self(((namespace as u32) << NAMESPACE_SHIFT) | object as u32)
    }

    /// Key of a standard-namespace object
    pub const fn standard(object: StandardObject) -> Self {
        Self::new(Namespace::Standard, object as u8)
    }

    /// Key of an ARM-namespace object
    pub const fn arm(object: ArmObject) -> Self {
        Self::new(Namespace::Arm, object as u8)
    }

    /// Key of an SMBIOS-namespace object
    pub const fn smbios(object: SmbiosObject) -> Self {
        Self::new(Namespace::Smbios, object as u8)
    }

    /// Decode a raw key received at the protocol boundary
    ///
    /// Returns `CmError::Unsupported` for keys the schema does not know:
    /// reserved bits set, unknown namespace, or unknown object id.
    pub const fn from_raw(raw: u32) -> Result<Self, CmError> {
        if raw & RESERVED_MASK != 0 {
            return Err(CmError::Unsupported);
        }
        let object = (raw & 0xFF) as u8;
        let known = match Namespace::from_u8((raw >> NAMESPACE_SHIFT) as u8) {
            Some(Namespace::Standard) => StandardObject::from_u8(object).is_some(),
            Some(Namespace::Arm) => ArmObject::from_u8(object).is_some(),
            Some(Namespace::Smbios) => SmbiosObject::from_u8(object).is_some(),
            None => false,
        };
        if known {
            Ok(Self(raw))
        } else {
            Err(CmError::Unsupported)
        }
    }

    /// Raw 32-bit key
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Namespace of this key
    pub const fn namespace(self) -> Option<Namespace> {
        Namespace::from_u8((self.0 >> NAMESPACE_SHIFT) as u8)
    }

    /// Object id inside the namespace
    pub const fn object(self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    /// Human-readable object name
    pub const fn name(self) -> &'static str {
        let object = self.object();
        let name = match self.namespace() {
            Some(Namespace::Standard) => match StandardObject::from_u8(object) {
                Some(o) => Some(o.name()),
                None => None,
            },
            Some(Namespace::Arm) => match ArmObject::from_u8(object) {
                Some(o) => Some(o.name()),
                None => None,
            },
            Some(Namespace::Smbios) => match SmbiosObject::from_u8(object) {
                Some(o) => Some(o.name()),
                None => None,
            },
            None => None,
        };
        match name {
            Some(name) => name,
            None => "Unknown",
        }
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let namespace = match self.namespace() {
            Some(Namespace::Standard) => "Std",
            Some(Namespace::Arm) => "Arm",
            Some(Namespace::Smbios) => "Smbios",
            None => "?",
        };
        write!(f, "{}::{} ({:#010x})", namespace, self.name(), self.0)
    }
}

/// How a category resolves tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Token must be absent; always the whole category
    Direct,
    /// Absent token: whole category. Present token: one record of this
    /// category found by its search function
    OptionalToken,
    /// Token must be present; the search may land in several categories
    MandatoryToken,
}

/// Fixed-layout record stored in the repository
///
/// Records are plain bytes: the raw view of a category is exactly
/// `count * size_of::<Record>()` bytes.
pub trait Record: FromBytes + IntoBytes + Immutable + KnownLayout + Copy + fmt::Debug + 'static {}

impl<T> Record for T where T: FromBytes + IntoBytes + Immutable + KnownLayout + Copy + fmt::Debug + 'static
{}

/// Record carrying its own token
pub trait Tokened {
    /// Token of this record
    fn token(&self) -> TokenRef;
    /// Stamp the token minted by the repository
    fn set_token(&mut self, token: TokenRef);
}

/// Record that belongs to the group of an owning node
pub trait Owned {
    /// Token of the owning node
    fn owner(&self) -> TokenRef;
}

/// One category with storage in the repository
pub trait Category {
    /// Category key
    const ID: CategoryId;
    /// Resolution policy
    const POLICY: Policy;
    /// Whether adding a record mints a fresh token into the record
    const MINTS_TOKEN: bool = false;

    /// Record type of this category
    type Record: Record;

    /// Populated records
    fn records(repo: &Repository) -> &[Self::Record];

    /// Append one record
    fn push(repo: &mut Repository, record: Self::Record) -> Result<(), CmError>;

    /// Write a minted token into a record before it is stored
    fn stamp(_record: &mut Self::Record, _token: Token) {}

    /// Type-erased token search for the dispatch map
    fn search_fn() -> Option<SearchFn> {
        None
    }
}

/// Category whose whole array may be requested (Direct and optional-token)
pub trait WholeCategory: Category {}

/// Category with a token search over its own records (optional-token)
pub trait TokenSearch: WholeCategory {
    /// Index of the record matching `token`
    fn search(records: &[Self::Record], token: Token) -> Option<usize>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespaces_do_not_collide() {
        let arm = CategoryId::arm(ArmObject::BootArchInfo);
        let smbios = CategoryId::smbios(SmbiosObject::SystemInfo);
        assert_eq!(arm.object(), smbios.object());
        assert_ne!(arm, smbios);
        assert_eq!(arm.raw(), 0x1000_0001);
        assert_eq!(smbios.raw(), 0x2000_0001);
    }

    #[test]
    fn test_from_raw() {
        let gicc = CategoryId::arm(ArmObject::GicCInfo);
        assert_eq!(CategoryId::from_raw(gicc.raw()), Ok(gicc));
        assert_eq!(gicc.name(), "GicCInfo");
        assert_eq!(gicc.namespace(), Some(Namespace::Arm));

        // Reserved bits, unknown namespace, unknown object
        assert_eq!(CategoryId::from_raw(0x1000_0105), Err(CmError::Unsupported));
        assert_eq!(CategoryId::from_raw(0x7000_0001), Err(CmError::Unsupported));
        assert_eq!(CategoryId::from_raw(0x1000_00FE), Err(CmError::Unsupported));
        assert_eq!(CategoryId::from_raw(0x2000_0002), Err(CmError::Unsupported));
    }

    #[test]
    fn test_display() {
        extern crate std;
        use std::format;

        let id = CategoryId::standard(StandardObject::AcpiTableList);
        assert_eq!(format!("{}", id), "Std::AcpiTableList (0x00000001)");
    }
}
