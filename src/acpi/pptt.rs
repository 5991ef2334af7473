//! Processor Properties Topology Table (PPTT)
//!
//! All processor hierarchy nodes are emitted first, in population order,
//! followed by all caches. Parent, private resource and next-level
//! references are topology references resolved through the configuration
//! manager and encoded as byte offsets into the table.

use heapless::Vec;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use super::{AcpiTableGenerator, field_u32};
use crate::category::TokenSearch;
use crate::config::{MAX_CACHES, MAX_PROC_NODES};
use crate::dispatch::{ConfigurationManager, TopologyNode};
use crate::error::CmError;
use crate::repository::{Cache, GicC, PrivateResources, ProcHierarchy};
use crate::table::TableBuffer;
use crate::token::TokenRef;

const PROCESSOR_TYPE: u8 = 0;
const CACHE_TYPE: u8 = 1;

/// Size of the PPTT header
const FIXED_SIZE: usize = 36;

/// Size of a processor node without private resources
const PROCESSOR_FIXED: usize = 20;

/// Every cache property field is valid
const CACHE_FLAGS_ALL_VALID: u32 = 0x7F;

#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
struct ProcessorEntry {
    kind: u8,
    length: u8,
    reserved: u16,
    flags: u32,
    parent: u32,
    acpi_processor_id: u32,
    private_resource_count: u32,
}

/// Cache type structure
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct CacheEntry {
    pub kind: u8,
    pub length: u8,
    pub reserved: u16,
    pub flags: u32,
    pub next_level: u32,
    pub size: u32,
    pub number_of_sets: u32,
    pub associativity: u8,
    pub attributes: u8,
    pub line_size: u16,
}

const _: () = assert!(size_of::<ProcessorEntry>() == PROCESSOR_FIXED);
const _: () = assert!(size_of::<CacheEntry>() == 24);

/// Byte offsets of every node, indexed like the category records
struct Layout {
    processors: Vec<u32, MAX_PROC_NODES>,
    caches: Vec<u32, MAX_CACHES>,
}

impl Layout {
    /// Offset of the node a topology reference names, checked against the
    /// kind the field requires
    fn offset(
        &self,
        cm: &ConfigurationManager<'_>,
        reference: TokenRef,
        want_cache: bool,
    ) -> Result<u32, CmError> {
        let Some(token) = reference.token() else {
            return Ok(0);
        };
        let repo = cm.repository();
        let offset = match cm.resolve_reference(token)? {
            TopologyNode::Processor(_) if !want_cache => {
                ProcHierarchy::search(repo.records::<ProcHierarchy>(), token)
                    .and_then(|index| self.processors.get(index))
            }
            TopologyNode::Cache(_) if want_cache => {
                Cache::search(repo.records::<Cache>(), token).and_then(|index| self.caches.get(index))
            }
            other => {
                log::warn!("PPTT: reference {:#x} names {:?}", token.get(), other);
                return Err(CmError::InvalidParameter);
            }
        };
        offset.copied().ok_or(CmError::NotFound)
    }
}

pub struct Pptt;

impl AcpiTableGenerator for Pptt {
    const SIGNATURE: [u8; 4] = *b"PPTT";
    const REVISION: u8 = 2;

    fn build_body(cm: &ConfigurationManager<'_>, out: &mut TableBuffer) -> Result<(), CmError> {
        let nodes = cm.resolve_all::<ProcHierarchy>()?;
        let caches = cm.resolve_all::<Cache>()?;
        let resources = cm.resolve_all::<PrivateResources>()?;

        let mut layout = Layout {
            processors: Vec::new(),
            caches: Vec::new(),
        };
        let mut end = FIXED_SIZE;
        for node in nodes.iter() {
            layout
                .processors
                .push(field_u32(end)?)
                .map_err(|_| CmError::OutOfResources)?;
            end += PROCESSOR_FIXED + 4 * resources.owned_by(node.token).count();
        }
        for _ in caches.iter() {
            layout
                .caches
                .push(field_u32(end)?)
                .map_err(|_| CmError::OutOfResources)?;
            end += size_of::<CacheEntry>();
        }

        for node in nodes.iter() {
            let count = resources.owned_by(node.token).count();
            let length = u8::try_from(PROCESSOR_FIXED + 4 * count)
                .map_err(|_| CmError::InvalidParameter)?;
            let acpi_processor_id = match node.gicc.token() {
                Some(gicc) => cm.lookup::<GicC>(gicc)?.acpi_processor_uid,
                None => node.acpi_processor_id,
            };
            out.push(&ProcessorEntry {
                kind: PROCESSOR_TYPE,
                length,
                reserved: 0,
                flags: node.flags,
                parent: layout.offset(cm, node.parent, false)?,
                acpi_processor_id,
                private_resource_count: field_u32(count)?,
            })?;
            for resource in resources.owned_by(node.token) {
                out.push_u32(layout.offset(cm, resource.resource, true)?)?;
            }
        }

        for cache in caches.iter() {
            let associativity =
                u8::try_from(cache.associativity).map_err(|_| CmError::InvalidParameter)?;
            out.push(&CacheEntry {
                kind: CACHE_TYPE,
                length: size_of::<CacheEntry>() as u8,
                reserved: 0,
                flags: CACHE_FLAGS_ALL_VALID,
                next_level: layout.offset(cm, cache.next_level, true)?,
                size: cache.size,
                number_of_sets: cache.number_of_sets,
                associativity,
                attributes: cache.attributes,
                line_size: cache.line_size,
            })?;
        }

        log::debug!("PPTT: {} nodes, {} caches", nodes.count(), caches.count());
        Ok(())
    }
}
