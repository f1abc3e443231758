use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("not connected: call open_connection first")]
    NotConnected,

    #[error("object id must not be empty")]
    EmptyObjectId,

    #[error("invalid maximum write size: {0:?}")]
    InvalidMaxWriteSize(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[from] rmb_store::StoreError),

    #[error("type error: {0}")]
    Type(#[from] rmb_types::TypeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// The negative errno equivalent, for callers that report integer codes.
    pub fn errno(&self) -> rmb_store::ReturnCode {
        use rmb_store::errno;
        match self {
            Self::NotConnected => -errno::ENOTCONN,
            Self::Store(e) => e.errno(),
            Self::Io(_) => -errno::EIO,
            Self::EmptyObjectId
            | Self::InvalidMaxWriteSize(_)
            | Self::Config(_)
            | Self::Type(_) => -errno::EINVAL,
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;
