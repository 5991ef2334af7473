//! Layerscape Configuration Manager
//!
//! Holds the hardware description of an NXP Layerscape board in a typed
//! object repository and answers the queries of the ACPI and SMBIOS table
//! generators. Generated tables are handed to the firmware through a
//! [`TableSink`](install::TableSink).
//!
//! The flow is populate, freeze, generate:
//!
//! ```ignore
//! let mut repo = Repository::new();
//! platform::lx2160a_rdb::populate(&mut repo, SocVersion::LX2160A_REV2)?;
//! let cm = repo.freeze()?;
//! let report = install::install_tables(&cm, &mut sink);
//! ```

#![cfg_attr(not(test), no_std)]

pub mod acpi;
pub mod arch;
pub mod category;
pub mod checksum;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod install;
pub mod logger;
pub mod platform;
pub mod protocol;
pub mod records;
pub mod repository;
pub mod smbios;
pub mod table;
pub mod token;

pub use category::CategoryId;
pub use dispatch::ConfigurationManager;
pub use error::CmError;
pub use install::{InstallReport, TableSink};
pub use repository::Repository;
pub use token::{Token, TokenRef};

/// Describe the running LX2160A-RDB and install its tables
///
/// # Safety
///
/// The DCFG block must be mapped at [`platform::dcfg::DCFG_BASE`].
pub unsafe fn run<S: TableSink>(sink: &mut S) -> Result<InstallReport, CmError> {
    log::info!(
        "Layerscape configuration manager v{}",
        env!("CARGO_PKG_VERSION")
    );

    let mut repo = Repository::new();
    unsafe { platform::lx2160a_rdb::populate_from_hardware(&mut repo)? };
    let cm = repo.freeze()?;
    let report = install::install_tables(&cm, sink);

    if report.is_complete() {
        log::info!("All platform tables installed");
    } else {
        log::warn!("{} tables failed to install", report.failures.len());
    }
    Ok(report)
}
