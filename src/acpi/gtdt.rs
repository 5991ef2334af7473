//! Generic Timer Description Table (GTDT)
//!
//! The architected timer in the fixed part, then platform timers: GT blocks
//! with their frames, followed by SBSA watchdogs.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use super::{AcpiTableGenerator, field_u32};
use crate::dispatch::ConfigurationManager;
use crate::error::CmError;
use crate::repository::{GenericTimer, GenericWatchdog, GtBlock, GtBlockTimerFrame};
use crate::table::TableBuffer;

const GT_BLOCK_TYPE: u8 = 0;
const WATCHDOG_TYPE: u8 = 1;

/// Frames a single GT block can describe
pub const MAX_FRAMES_PER_BLOCK: usize = 8;

/// Size of the GTDT up to the platform timer structures
const FIXED_SIZE: usize = 104;

#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
struct GtdtFixed {
    counter_control_base: u64,
    reserved: u32,
    secure_el1_gsiv: u32,
    secure_el1_flags: u32,
    non_secure_el1_gsiv: u32,
    non_secure_el1_flags: u32,
    virtual_el1_gsiv: u32,
    virtual_el1_flags: u32,
    el2_gsiv: u32,
    el2_flags: u32,
    counter_read_base: u64,
    platform_timer_count: u32,
    platform_timer_offset: u32,
    virtual_el2_gsiv: u32,
    virtual_el2_flags: u32,
}

/// GT block structure, followed by its frames
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct GtBlockEntry {
    pub kind: u8,
    pub length: u16,
    pub reserved: u8,
    pub counter_control_base: u64,
    pub timer_count: u32,
    pub timer_offset: u32,
}

/// GT block timer frame
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct GtFrameEntry {
    pub frame_number: u8,
    pub reserved: [u8; 3],
    pub counter_base: u64,
    pub counter_el0_base: u64,
    pub physical_timer_gsiv: u32,
    pub physical_timer_flags: u32,
    pub virtual_timer_gsiv: u32,
    pub virtual_timer_flags: u32,
    pub common_flags: u32,
}

/// SBSA generic watchdog structure
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct WatchdogEntry {
    pub kind: u8,
    pub length: u16,
    pub reserved: u8,
    pub refresh_frame_address: u64,
    pub control_frame_address: u64,
    pub timer_gsiv: u32,
    pub flags: u32,
}

const _: () = assert!(36 + size_of::<GtdtFixed>() == FIXED_SIZE);
const _: () = assert!(size_of::<GtBlockEntry>() == 20);
const _: () = assert!(size_of::<GtFrameEntry>() == 40);
const _: () = assert!(size_of::<WatchdogEntry>() == 28);

pub struct Gtdt;

impl AcpiTableGenerator for Gtdt {
    const SIGNATURE: [u8; 4] = *b"GTDT";
    const REVISION: u8 = 3;

    fn build_body(cm: &ConfigurationManager<'_>, out: &mut TableBuffer) -> Result<(), CmError> {
        let timer = cm.single::<GenericTimer>()?;
        let blocks = cm.resolve_all::<GtBlock>()?;
        let frames = cm.resolve_all::<GtBlockTimerFrame>()?;
        let watchdogs = cm.resolve_all::<GenericWatchdog>()?;

        let platform_timers = blocks.count() + watchdogs.count();
        out.push(&GtdtFixed {
            counter_control_base: timer.counter_control_base,
            secure_el1_gsiv: timer.secure_pl1_gsiv,
            secure_el1_flags: timer.secure_pl1_flags,
            non_secure_el1_gsiv: timer.non_secure_pl1_gsiv,
            non_secure_el1_flags: timer.non_secure_pl1_flags,
            virtual_el1_gsiv: timer.virtual_timer_gsiv,
            virtual_el1_flags: timer.virtual_timer_flags,
            el2_gsiv: timer.non_secure_pl2_gsiv,
            el2_flags: timer.non_secure_pl2_flags,
            counter_read_base: timer.counter_read_base,
            platform_timer_count: field_u32(platform_timers)?,
            platform_timer_offset: if platform_timers == 0 {
                0
            } else {
                field_u32(FIXED_SIZE)?
            },
            virtual_el2_gsiv: timer.virtual_pl2_gsiv,
            virtual_el2_flags: timer.virtual_pl2_flags,
            ..Default::default()
        })?;

        for block in blocks.iter() {
            let owner = block.token;
            let count = frames.owned_by(owner).count();
            if count > MAX_FRAMES_PER_BLOCK {
                log::warn!("GTDT: GT block with {} frames", count);
                return Err(CmError::InvalidParameter);
            }
            out.push(&GtBlockEntry {
                kind: GT_BLOCK_TYPE,
                length: (size_of::<GtBlockEntry>() + count * size_of::<GtFrameEntry>()) as u16,
                counter_control_base: block.physical_address,
                timer_count: count as u32,
                timer_offset: if count == 0 {
                    0
                } else {
                    size_of::<GtBlockEntry>() as u32
                },
                ..Default::default()
            })?;
            for frame in frames.owned_by(owner) {
                out.push(&GtFrameEntry {
                    frame_number: frame.frame_number,
                    counter_base: frame.physical_address,
                    counter_el0_base: frame.el0_physical_address,
                    physical_timer_gsiv: frame.physical_timer_gsiv,
                    physical_timer_flags: frame.physical_timer_flags,
                    virtual_timer_gsiv: frame.virtual_timer_gsiv,
                    virtual_timer_flags: frame.virtual_timer_flags,
                    common_flags: frame.common_flags,
                    ..Default::default()
                })?;
            }
        }

        for watchdog in watchdogs.iter() {
            out.push(&WatchdogEntry {
                kind: WATCHDOG_TYPE,
                length: size_of::<WatchdogEntry>() as u16,
                refresh_frame_address: watchdog.refresh_frame_address,
                control_frame_address: watchdog.control_frame_address,
                timer_gsiv: watchdog.timer_gsiv,
                flags: watchdog.flags,
                ..Default::default()
            })?;
        }

        Ok(())
    }
}
