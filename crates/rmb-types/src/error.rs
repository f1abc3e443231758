use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("maximum write size must be greater than zero")]
    ZeroWriteSize,

    #[error("write range {offset}+{length} exceeds buffer of {buffer_len} bytes")]
    RangeOutOfBounds {
        offset: u64,
        length: u64,
        buffer_len: usize,
    },
}

/// Result alias for type operations.
pub type TypeResult<T> = Result<T, TypeError>;
