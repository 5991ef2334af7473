//! IO Remapping Table (IORT)
//!
//! Nodes are laid out ITS groups first, then named components, root
//! complexes and SMMUs. ID mappings reference their output node by byte
//! offset, so the layout is computed in a first pass and the table is
//! emitted in a second.

use heapless::Vec;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use super::{AcpiTableGenerator, field_u32};
use crate::config::{
    MAX_ITS_GROUPS, MAX_NAMED_COMPONENTS, MAX_ROOT_COMPLEXES, MAX_SMMUS, field_str,
};
use crate::dispatch::{ConfigurationManager, Descriptor};
use crate::error::CmError;
use crate::records::{IdMapping, smmu_interrupt_kind};
use crate::repository::{
    IdMappingArray, ItsGroup, ItsIdentifierArray, NamedComponent, RootComplex, SmmuInterruptArray,
    SmmuV2,
};
use crate::table::TableBuffer;
use crate::token::TokenRef;

const ITS_GROUP_TYPE: u8 = 0;
const NAMED_COMPONENT_TYPE: u8 = 1;
const ROOT_COMPLEX_TYPE: u8 = 2;
const SMMU_V1_V2_TYPE: u8 = 3;

/// Size of the IORT up to the first node
const FIXED_SIZE: usize = 48;

/// Size of a named component up to the object name
const NAMED_COMPONENT_FIXED: usize = 29;

/// Size of an SMMUv1/v2 node up to the global interrupt array
const SMMU_FIXED: usize = 60;

/// Global interrupt array of an SMMUv1/v2 node (two GSIV/flags pairs)
const SMMU_GLOBAL_INTERRUPTS: usize = 16;

/// Bytes of one interrupt entry
const INTERRUPT_SIZE: usize = 8;

const MAX_NODES: usize = MAX_ITS_GROUPS + MAX_NAMED_COMPONENTS + MAX_ROOT_COMPLEXES + MAX_SMMUS;

#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
struct IortFixed {
    node_count: u32,
    node_offset: u32,
    reserved: u32,
}

/// Header shared by all IORT nodes
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct NodeHeader {
    pub kind: u8,
    pub length: u16,
    pub revision: u8,
    pub reserved: u32,
    pub id_mapping_count: u32,
    pub id_mapping_offset: u32,
}

/// Memory access properties of named components and root complexes
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct MemoryAccess {
    pub cache_coherent: u32,
    pub allocation_hints: u8,
    pub reserved: u16,
    pub memory_access_flags: u8,
}

#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
struct SmmuFixed {
    base_address: u64,
    span: u64,
    model: u32,
    flags: u32,
    global_interrupt_offset: u32,
    context_interrupt_count: u32,
    context_interrupt_offset: u32,
    pmu_interrupt_count: u32,
    pmu_interrupt_offset: u32,
}

/// ID mapping entry
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct IdMappingEntry {
    pub input_base: u32,
    /// Number of IDs minus one
    pub id_count: u32,
    pub output_base: u32,
    /// Byte offset of the output node from the start of the table
    pub output_reference: u32,
    pub flags: u32,
}

const _: () = assert!(36 + size_of::<IortFixed>() == FIXED_SIZE);
const _: () = assert!(size_of::<NodeHeader>() == 16);
const _: () =
    assert!(size_of::<NodeHeader>() + 4 + size_of::<MemoryAccess>() + 1 == NAMED_COMPONENT_FIXED);
const _: () = assert!(size_of::<NodeHeader>() + size_of::<SmmuFixed>() == SMMU_FIXED);
const _: () = assert!(size_of::<IdMappingEntry>() == 20);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeKind {
    ItsGroup,
    NamedComponent,
    RootComplex,
    Smmu,
}

#[derive(Debug, Clone, Copy)]
struct NodeSlot {
    token: TokenRef,
    kind: NodeKind,
    offset: u32,
}

/// Node offsets computed by the layout pass
struct Layout {
    nodes: Vec<NodeSlot, MAX_NODES>,
    end: usize,
}

impl Layout {
    fn new() -> Self {
        Self {
            nodes: Vec::new(),
            end: FIXED_SIZE,
        }
    }

    fn place(&mut self, token: TokenRef, kind: NodeKind, size: usize) -> Result<(), CmError> {
        let offset = field_u32(self.end)?;
        self.nodes
            .push(NodeSlot {
                token,
                kind,
                offset,
            })
            .map_err(|_| CmError::OutOfResources)?;
        self.end += size;
        Ok(())
    }

    /// Offset of the node an ID mapping may output to
    fn output_offset(&self, reference: TokenRef) -> Result<u32, CmError> {
        let slot = self
            .nodes
            .iter()
            .find(|slot| slot.token == reference)
            .ok_or(CmError::NotFound)?;
        match slot.kind {
            NodeKind::ItsGroup | NodeKind::Smmu => Ok(slot.offset),
            NodeKind::NamedComponent | NodeKind::RootComplex => {
                log::warn!("IORT: ID mapping outputs to a {:?} node", slot.kind);
                Err(CmError::InvalidParameter)
            }
        }
    }
}

/// Object name with its terminating NUL, padded so the node stays 4-byte aligned
fn named_component_size(name: &[u8]) -> usize {
    (NAMED_COMPONENT_FIXED + name.len() + 1).next_multiple_of(4)
}

fn smmu_size(interrupts: usize) -> usize {
    SMMU_FIXED + SMMU_GLOBAL_INTERRUPTS + INTERRUPT_SIZE * interrupts
}

fn mapping_count(mappings: Descriptor<'_, IdMapping>, owner: TokenRef) -> usize {
    mappings.owned_by(owner).count()
}

fn node_header(
    kind: u8,
    size: usize,
    mappings: usize,
    mapping_offset: usize,
) -> Result<NodeHeader, CmError> {
    let length = u16::try_from(size).map_err(|_| CmError::BufferTooSmall)?;
    Ok(NodeHeader {
        kind,
        length,
        revision: 0,
        reserved: 0,
        id_mapping_count: field_u32(mappings)?,
        id_mapping_offset: if mappings == 0 {
            0
        } else {
            field_u32(mapping_offset)?
        },
    })
}

fn emit_mappings(
    out: &mut TableBuffer,
    layout: &Layout,
    mappings: Descriptor<'_, IdMapping>,
    owner: TokenRef,
) -> Result<(), CmError> {
    for mapping in mappings.owned_by(owner) {
        let id_count = mapping.id_count;
        if id_count == 0 {
            return Err(CmError::InvalidParameter);
        }
        out.push(&IdMappingEntry {
            input_base: mapping.input_base,
            id_count: id_count - 1,
            output_base: mapping.output_base,
            output_reference: layout.output_offset(mapping.output_reference)?,
            flags: mapping.flags,
        })?;
    }
    Ok(())
}

pub struct Iort;

impl AcpiTableGenerator for Iort {
    const SIGNATURE: [u8; 4] = *b"IORT";
    const REVISION: u8 = 0;

    fn build_body(cm: &ConfigurationManager<'_>, out: &mut TableBuffer) -> Result<(), CmError> {
        let its_groups = cm.resolve_all::<ItsGroup>()?;
        let its_ids = cm.resolve_all::<ItsIdentifierArray>()?;
        let named = cm.resolve_all::<NamedComponent>()?;
        let root_complexes = cm.resolve_all::<RootComplex>()?;
        let smmus = cm.resolve_all::<SmmuV2>()?;
        let interrupts = cm.resolve_all::<SmmuInterruptArray>()?;
        let mappings = cm.resolve_all::<IdMappingArray>()?;

        let mut layout = Layout::new();
        for group in its_groups.iter() {
            let ids = its_ids.owned_by(group.token).count();
            layout.place(group.token, NodeKind::ItsGroup, 20 + 4 * ids)?;
        }
        for node in named.iter() {
            let size = named_component_size(field_str(&node.object_name));
            let ids = mapping_count(mappings, node.token);
            layout.place(node.token, NodeKind::NamedComponent, size + 20 * ids)?;
        }
        for node in root_complexes.iter() {
            let ids = mapping_count(mappings, node.token);
            layout.place(node.token, NodeKind::RootComplex, 32 + 20 * ids)?;
        }
        for node in smmus.iter() {
            let mut irqs = 0;
            for irq in interrupts.owned_by(node.token) {
                if !matches!(irq.kind, smmu_interrupt_kind::CONTEXT | smmu_interrupt_kind::PMU) {
                    log::warn!(
                        "IORT: SMMU interrupt {} has unknown kind {}",
                        { irq.gsiv },
                        irq.kind
                    );
                    return Err(CmError::InvalidParameter);
                }
                irqs += 1;
            }
            let ids = mapping_count(mappings, node.token);
            layout.place(node.token, NodeKind::Smmu, smmu_size(irqs) + 20 * ids)?;
        }

        out.push(&IortFixed {
            node_count: field_u32(layout.nodes.len())?,
            node_offset: field_u32(FIXED_SIZE)?,
            reserved: 0,
        })?;

        for group in its_groups.iter() {
            let ids = its_ids.owned_by(group.token).count();
            out.push(&node_header(ITS_GROUP_TYPE, 20 + 4 * ids, 0, 0)?)?;
            out.push_u32(field_u32(ids)?)?;
            for id in its_ids.owned_by(group.token) {
                out.push_u32(id.its_id)?;
            }
        }

        for node in named.iter() {
            let name = field_str(&node.object_name);
            let size = named_component_size(name);
            let ids = mapping_count(mappings, node.token);
            out.push(&node_header(NAMED_COMPONENT_TYPE, size + 20 * ids, ids, size)?)?;
            out.push_u32(node.flags)?;
            out.push(&MemoryAccess {
                cache_coherent: node.cache_coherent,
                allocation_hints: node.allocation_hints,
                reserved: 0,
                memory_access_flags: node.memory_access_flags,
            })?;
            out.push_u8(node.address_size_limit)?;
            out.push_bytes(name)?;
            out.push_u8(0)?;
            out.pad_to(4)?;
            emit_mappings(out, &layout, mappings, node.token)?;
        }

        for node in root_complexes.iter() {
            let ids = mapping_count(mappings, node.token);
            out.push(&node_header(ROOT_COMPLEX_TYPE, 32 + 20 * ids, ids, 32)?)?;
            out.push(&MemoryAccess {
                cache_coherent: node.cache_coherent,
                allocation_hints: node.allocation_hints,
                reserved: 0,
                memory_access_flags: node.memory_access_flags,
            })?;
            out.push_u32(node.ats_attribute)?;
            out.push_u32(node.pci_segment_number)?;
            emit_mappings(out, &layout, mappings, node.token)?;
        }

        for node in smmus.iter() {
            let count_kind = |kind: u8| {
                interrupts
                    .owned_by(node.token)
                    .filter(|irq| irq.kind == kind)
                    .count()
            };
            let context = count_kind(smmu_interrupt_kind::CONTEXT);
            let pmu = count_kind(smmu_interrupt_kind::PMU);
            let size = smmu_size(context + pmu);
            let ids = mapping_count(mappings, node.token);

            let context_offset = SMMU_FIXED + SMMU_GLOBAL_INTERRUPTS;
            let pmu_offset = context_offset + INTERRUPT_SIZE * context;
            out.push(&node_header(SMMU_V1_V2_TYPE, size + 20 * ids, ids, size)?)?;
            out.push(&SmmuFixed {
                base_address: node.base_address,
                span: node.span,
                model: node.model,
                flags: node.flags,
                global_interrupt_offset: field_u32(SMMU_FIXED)?,
                context_interrupt_count: field_u32(context)?,
                context_interrupt_offset: field_u32(context_offset)?,
                pmu_interrupt_count: field_u32(pmu)?,
                pmu_interrupt_offset: if pmu == 0 { 0 } else { field_u32(pmu_offset)? },
            })?;
            out.push_u32(node.global_interrupt_gsiv)?;
            out.push_u32(node.global_interrupt_flags)?;
            out.push_u32(node.global_config_interrupt_gsiv)?;
            out.push_u32(node.global_config_interrupt_flags)?;
            for kind in [smmu_interrupt_kind::CONTEXT, smmu_interrupt_kind::PMU] {
                for irq in interrupts.owned_by(node.token).filter(|irq| irq.kind == kind) {
                    out.push_u32(irq.gsiv)?;
                    out.push_u32(irq.flags)?;
                }
            }
            emit_mappings(out, &layout, mappings, node.token)?;
        }

        log::debug!("IORT: {} nodes", layout.nodes.len());
        Ok(())
    }
}
