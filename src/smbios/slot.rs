//! System slot structures (type 9)

use zerocopy::{Immutable, IntoBytes};

use super::{SmbiosBuilder, SmbiosGenerator, SmbiosHeader, SmbiosType, StringSet};
use crate::dispatch::ConfigurationManager;
use crate::error::CmError;
use crate::repository;
use crate::table::TableBuffer;

/// Type 9 without peer groups
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, IntoBytes, Immutable)]
struct Type9 {
    header: SmbiosHeader,
    designation: u8,
    slot_type: u8,
    data_bus_width: u8,
    current_usage: u8,
    slot_length: u8,
    slot_id: u16,
    characteristics1: u8,
    characteristics2: u8,
    segment_group: u16,
    bus: u8,
    device_function: u8,
    base_data_bus_width: u8,
    peer_grouping_count: u8,
}

const _: () = assert!(size_of::<Type9>() == 19);

pub struct SystemSlot;

impl SmbiosGenerator for SystemSlot {
    const TYPE: SmbiosType = SmbiosType::SystemSlot;

    fn emit(
        cm: &ConfigurationManager<'_>,
        builder: &mut SmbiosBuilder,
        out: &mut TableBuffer,
    ) -> Result<usize, CmError> {
        let records = cm.resolve_all::<repository::SystemSlot>()?;
        for slot in records.iter() {
            let mut strings = StringSet::new();
            let structure = Type9 {
                header: builder.header::<Type9>(Self::TYPE as u8)?,
                designation: strings.add(&slot.designation)?,
                slot_type: slot.slot_type,
                data_bus_width: slot.data_bus_width,
                current_usage: slot.current_usage,
                slot_length: slot.slot_length,
                slot_id: slot.slot_id,
                characteristics1: slot.characteristics1,
                characteristics2: slot.characteristics2,
                segment_group: slot.segment_group,
                bus: slot.bus,
                device_function: slot.device_function,
                base_data_bus_width: 0,
                peer_grouping_count: 0,
            };
            builder.emit(out, &structure, &strings)?;
        }
        Ok(records.count())
    }
}
