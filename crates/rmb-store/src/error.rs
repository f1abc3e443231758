use rmb_types::ObjectLocator;

use crate::errno::{self, ReturnCode};

/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested object was not found.
    #[error("object not found: {0}")]
    NotFound(ObjectLocator),

    /// The requested pool does not exist.
    #[error("pool not found: {0}")]
    PoolNotFound(String),

    /// The cluster handle has not been initialized or was shut down.
    #[error("not connected to cluster")]
    NotConnected,

    /// A configuration option is not known to the cluster.
    #[error("unknown configuration option: {0}")]
    UnknownConfigOption(String),

    /// A single write exceeds the store's maximum write size.
    #[error("write of {len} bytes exceeds maximum write size {max}")]
    WriteTooLarge { len: u64, max: u64 },

    /// The operation could not be queued for execution.
    #[error("submission rejected for {locator}: {reason}")]
    SubmissionRejected {
        locator: ObjectLocator,
        reason: String,
    },

    /// Copy source changed since its version token was taken.
    #[error("version mismatch for {locator}: expected {expected}, found {actual}")]
    VersionMismatch {
        locator: ObjectLocator,
        expected: u64,
        actual: u64,
    },

    /// Object filter could not be encoded or decoded.
    #[error("invalid object filter: {0}")]
    InvalidFilter(String),
}

impl StoreError {
    /// The negative errno equivalent of this error.
    pub fn errno(&self) -> ReturnCode {
        match self {
            Self::NotFound(_) | Self::PoolNotFound(_) | Self::UnknownConfigOption(_) => {
                -errno::ENOENT
            }
            Self::NotConnected => -errno::ENOTCONN,
            Self::WriteTooLarge { .. } => -errno::EFBIG,
            Self::SubmissionRejected { .. } => -errno::EIO,
            Self::VersionMismatch { .. } => -errno::ERANGE,
            Self::InvalidFilter(_) => -errno::EINVAL,
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
