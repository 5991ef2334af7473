//! EFI Configuration Manager Protocol
//!
//! C-ABI surface of the dispatcher, for table generators that call in through
//! a protocol interface. `GetObject` resolves one `(object id, token)` pair;
//! `SetObject` is refused because the repository is frozen.

use core::ffi::c_void;
use core::marker::PhantomData;
use core::ptr;

use r_efi::efi::{Guid, Status};

use crate::config::CM_REVISION;
use crate::dispatch::{ConfigurationManager, RawDescriptor};
use crate::error::CmError;

/// Configuration Manager Protocol GUID
pub const CONFIGURATION_MANAGER_PROTOCOL_GUID: Guid = Guid::from_fields(
    0xd85a4835,
    0x5a82,
    0x4894,
    0xac,
    0x02,
    &[0x70, 0x6f, 0x43, 0xd5, 0x97, 0x8e],
);

/// Descriptor filled by `GetObject`
///
/// `size` is the byte size of one element; `data` is null when `count` is 0.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CmObjDescriptor {
    pub object_id: u32,
    pub size: u32,
    pub data: *mut c_void,
    pub count: u32,
}

impl Default for CmObjDescriptor {
    fn default() -> Self {
        Self {
            object_id: 0,
            size: 0,
            data: ptr::null_mut(),
            count: 0,
        }
    }
}

impl CmObjDescriptor {
    fn fill(&mut self, desc: &RawDescriptor<'_>) -> Result<(), CmError> {
        let size = u32::try_from(desc.size()).map_err(|_| CmError::BufferTooSmall)?;
        let count = u32::try_from(desc.count()).map_err(|_| CmError::BufferTooSmall)?;
        self.object_id = desc.id().raw();
        self.size = size;
        self.count = count;
        self.data = if count == 0 {
            ptr::null_mut()
        } else {
            desc.data().as_ptr() as *mut c_void
        };
        Ok(())
    }
}

pub type GetObject = extern "efiapi" fn(
    this: *const ConfigurationManagerProtocol,
    object_id: u32,
    token: usize,
    descriptor: *mut CmObjDescriptor,
) -> Status;

pub type SetObject = extern "efiapi" fn(
    this: *const ConfigurationManagerProtocol,
    object_id: u32,
    token: usize,
    descriptor: *mut CmObjDescriptor,
) -> Status;

/// Protocol interface structure
#[repr(C)]
pub struct ConfigurationManagerProtocol {
    pub revision: u32,
    pub get_object: GetObject,
    pub set_object: SetObject,
    /// Points at the frozen [`ConfigurationManager`]
    pub plat_repo_info: *mut c_void,
}

/// Protocol interface bound to a frozen configuration manager
///
/// The interface must stay at a fixed address while installed; the borrow of
/// the manager keeps the repository alive for as long.
pub struct ProtocolInstance<'a, 'r> {
    interface: ConfigurationManagerProtocol,
    manager: PhantomData<&'a ConfigurationManager<'r>>,
}

impl<'a, 'r> ProtocolInstance<'a, 'r> {
    pub fn new(manager: &'a ConfigurationManager<'r>) -> Self {
        Self {
            interface: ConfigurationManagerProtocol {
                revision: CM_REVISION,
                get_object,
                set_object,
                plat_repo_info: manager as *const ConfigurationManager<'r> as *mut c_void,
            },
            manager: PhantomData,
        }
    }

    /// Interface pointer to install under [`CONFIGURATION_MANAGER_PROTOCOL_GUID`]
    pub fn interface(&self) -> *const ConfigurationManagerProtocol {
        &self.interface
    }
}

impl<'r> ConfigurationManager<'r> {
    /// Protocol interface for this manager
    pub fn protocol(&self) -> ProtocolInstance<'_, 'r> {
        ProtocolInstance::new(self)
    }
}

extern "efiapi" fn get_object(
    this: *const ConfigurationManagerProtocol,
    object_id: u32,
    token: usize,
    descriptor: *mut CmObjDescriptor,
) -> Status {
    if this.is_null() || descriptor.is_null() {
        return Status::INVALID_PARAMETER;
    }

    let manager = unsafe { (*this).plat_repo_info } as *const ConfigurationManager<'_>;
    if manager.is_null() {
        return Status::INVALID_PARAMETER;
    }
    let manager = unsafe { &*manager };
    let descriptor = unsafe { &mut *descriptor };

    let result = manager
        .query_raw(object_id, token)
        .and_then(|desc| descriptor.fill(&desc));
    match result {
        Ok(()) => Status::SUCCESS,
        Err(err) => Status::from(err),
    }
}

extern "efiapi" fn set_object(
    _this: *const ConfigurationManagerProtocol,
    object_id: u32,
    _token: usize,
    _descriptor: *mut CmObjDescriptor,
) -> Status {
    log::warn!("SetObject({:#010x}): repository is frozen", object_id);
    Status::UNSUPPORTED
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Category;
    use crate::records::GicCInfo;
    use crate::repository::{GicC, GicD, Repository};
    use crate::token::Token;

    fn call(
        protocol: *const ConfigurationManagerProtocol,
        object_id: u32,
        token: usize,
    ) -> (Status, CmObjDescriptor) {
        let mut desc = CmObjDescriptor::default();
        let status = unsafe { ((*protocol).get_object)(protocol, object_id, token, &mut desc) };
        (status, desc)
    }

    #[test]
    fn test_get_object() {
        let mut repo = Repository::new();
        for cpu in 0..2u32 {
            repo.add::<GicC>(GicCInfo {
                cpu_interface_number: cpu,
                ..Default::default()
            })
            .unwrap();
        }
        let cm = repo.freeze().unwrap();
        let instance = cm.protocol();
        let protocol = instance.interface();

        let (status, desc) = call(protocol, GicC::ID.raw(), 0);
        assert_eq!(status, Status::SUCCESS);
        assert_eq!(desc.object_id, GicC::ID.raw());
        assert_eq!(desc.count, 2);
        assert_eq!(desc.size as usize, core::mem::size_of::<GicCInfo>());
        assert!(!desc.data.is_null());

        let second = Token::from_index(1).get();
        let (status, desc) = call(protocol, GicC::ID.raw(), second);
        assert_eq!(status, Status::SUCCESS);
        assert_eq!(desc.count, 1);
        let record = unsafe { ptr::read_unaligned(desc.data as *const GicCInfo) };
        assert_eq!({ record.cpu_interface_number }, 1);
    }

    #[test]
    fn test_get_object_errors() {
        let repo = Repository::new();
        let cm = repo.freeze().unwrap();
        let instance = cm.protocol();
        let protocol = instance.interface();

        // Defined but empty
        let (status, desc) = call(protocol, GicD::ID.raw(), 0);
        assert_eq!(status, Status::SUCCESS);
        assert_eq!(desc.count, 0);
        assert!(desc.data.is_null());

        assert_eq!(call(protocol, GicD::ID.raw(), 1).0, Status::INVALID_PARAMETER);
        assert_eq!(call(protocol, 0x1000_00FE, 0).0, Status::UNSUPPORTED);

        let status = unsafe {
            ((*protocol).get_object)(protocol, GicD::ID.raw(), 0, ptr::null_mut())
        };
        assert_eq!(status, Status::INVALID_PARAMETER);

        let mut desc = CmObjDescriptor::default();
        let status = unsafe { ((*protocol).set_object)(protocol, GicD::ID.raw(), 0, &mut desc) };
        assert_eq!(status, Status::UNSUPPORTED);
        assert_eq!(unsafe { (*protocol).revision }, CM_REVISION);
    }

    #[test]
    fn test_copied_interface_reaches_manager() {
        let mut repo = Repository::new();
        repo.add::<GicC>(GicCInfo::default()).unwrap();
        let cm = repo.freeze().unwrap();
        let instance = cm.protocol();

        // A caller may hold its own copy of the interface table
        let original = unsafe { &*instance.interface() };
        let copy = ConfigurationManagerProtocol {
            revision: original.revision,
            get_object: original.get_object,
            set_object: original.set_object,
            plat_repo_info: original.plat_repo_info,
        };
        let (status, desc) = call(&copy, GicC::ID.raw(), 0);
        assert_eq!(status, Status::SUCCESS);
        assert_eq!(desc.count, 1);

        let detached = ConfigurationManagerProtocol {
            plat_repo_info: ptr::null_mut(),
            ..copy
        };
        assert_eq!(call(&detached, GicC::ID.raw(), 0).0, Status::INVALID_PARAMETER);
    }
}
