//! Repository record layouts
//!
//! All records are `#[repr(C, packed)]` plain-byte structures so a category
//! can be handed out either as a typed slice or as its raw bytes. Read
//! multi-byte fields by value; references into packed fields are not allowed.

pub mod arm;
pub mod smbios;
pub mod standard;

pub use arm::*;
pub use smbios::*;
pub use standard::*;
