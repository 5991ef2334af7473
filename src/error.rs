//! Error types for configuration manager operations
//!
//! Every failure in the repository, the dispatcher, and the table generators
//! is reported as a [`CmError`]. At the firmware protocol boundary the error
//! is converted to an EFI status code.

use core::fmt;

use r_efi::efi;

/// Configuration manager error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmError {
    /// The category is not defined for this platform build, or no record
    /// matches the token
    NotFound,
    /// Token omitted where mandatory or supplied where forbidden, null output
    /// pointer, or record contents a generator cannot encode
    InvalidParameter,
    /// The category or generator is not part of the repository schema
    Unsupported,
    /// A fixed-capacity store is full
    OutOfResources,
    /// A generated table does not fit the table buffer
    BufferTooSmall,
}

impl fmt::Display for CmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::NotFound => "not found",
            Self::InvalidParameter => "invalid parameter",
            Self::Unsupported => "unsupported",
            Self::OutOfResources => "out of resources",
            Self::BufferTooSmall => "buffer too small",
        };
        f.write_str(text)
    }
}

impl From<CmError> for efi::Status {
    fn from(err: CmError) -> Self {
        match err {
            CmError::NotFound => efi::Status::NOT_FOUND,
            CmError::InvalidParameter => efi::Status::INVALID_PARAMETER,
            CmError::Unsupported => efi::Status::UNSUPPORTED,
            CmError::OutOfResources => efi::Status::OUT_OF_RESOURCES,
            CmError::BufferTooSmall => efi::Status::BUFFER_TOO_SMALL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    extern crate std;
    use std::string::ToString;

    #[test]
    fn test_status_mapping() {
        assert_eq!(efi::Status::from(CmError::NotFound), efi::Status::NOT_FOUND);
        assert_eq!(
            efi::Status::from(CmError::InvalidParameter),
            efi::Status::INVALID_PARAMETER
        );
        assert_eq!(efi::Status::from(CmError::Unsupported), efi::Status::UNSUPPORTED);
        assert_eq!(
            efi::Status::from(CmError::OutOfResources),
            efi::Status::OUT_OF_RESOURCES
        );
        assert_eq!(
            efi::Status::from(CmError::BufferTooSmall),
            efi::Status::BUFFER_TOO_SMALL
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(CmError::NotFound.to_string(), "not found");
        assert_eq!(CmError::InvalidParameter.to_string(), "invalid parameter");
    }
}
