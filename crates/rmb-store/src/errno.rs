//! Return codes shared by completions and synchronous errors.
//!
//! A completion yields an integer code: zero or positive on success,
//! negative errno on failure.

/// Integer result of a completed operation.
pub type ReturnCode = i32;

pub const OK: ReturnCode = 0;
pub const ENOENT: ReturnCode = 2;
pub const EIO: ReturnCode = 5;
pub const EINVAL: ReturnCode = 22;
pub const EFBIG: ReturnCode = 27;
pub const ERANGE: ReturnCode = 34;
pub const ENOTCONN: ReturnCode = 107;

/// Returns `true` for codes the store treats as failures.
pub fn is_failure(code: ReturnCode) -> bool {
    code < 0
}
