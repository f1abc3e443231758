//! Chunked write and copy/move engine for RMB.
//!
//! Sits on top of a namespace-partitioned object store (`rmb-store`) and
//! gives mail storage a small set of operations: write a payload of any size
//! as bounded-size pieces, wait for all of them, rewrite attributes, and
//! copy or move objects between namespaces.
//!
//! # Key Types
//!
//! - [`RadosStorage`] -- caller facing session: connection, reads, writes,
//!   relocation, enumeration
//! - [`IoContext`] -- a pool session bound to one namespace
//! - [`MailObject`] -- object id, staged metadata and in-flight writes
//! - [`OperationHandle`] / [`WriteBatch`] -- owned completions, drained with
//!   [`wait_all`]
//! - [`NamespaceScope`] -- restores the default namespace on drop
//!
//! # Design Rules
//!
//! 1. Submission fails fast; completion failures are collected, never raised.
//! 2. Every completion token is waited on and released exactly once.
//! 3. A scoped namespace binding is undone on every exit path.
//! 4. Copy, mtime refresh and attribute rewrite are one atomic operation.

pub mod aggregate;
pub mod config;
pub mod context;
pub mod error;
pub mod find;
pub mod handle;
pub mod metadata;
pub mod namespace;
pub mod object;
pub mod relocate;
pub mod split;
pub mod storage;

// Re-export primary types at crate root for ergonomic imports.
pub use aggregate::{wait_all, wait_all_detailed, WriteBatch};
pub use config::{parse_max_write_size, StorageConfig};
pub use context::IoContext;
pub use error::{StorageError, StorageResult};
pub use find::{ObjectIterator, LIST_PAGE_SIZE};
pub use handle::OperationHandle;
pub use metadata::apply_attributes;
pub use namespace::{NamespaceScope, DEFAULT_NAMESPACE};
pub use object::MailObject;
pub use relocate::bind_contexts;
pub use split::split_and_write;
pub use storage::{RadosStorage, MAX_READ_SIZE};
