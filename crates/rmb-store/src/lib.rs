//! Remote object store boundary for RMB.
//!
//! The engine in `rmb-storage` talks to a distributed, namespace-partitioned
//! object store only through the traits in this crate. An operation is a
//! batch of instructions ([`WriteOperation`]) submitted without blocking;
//! its outcome arrives later through a [`Completion`] as an integer return
//! code, negative on failure.
//!
//! # Backends
//!
//! - [`InMemoryCluster`] / [`InMemoryBackend`] -- `HashMap`-based pools for
//!   tests and embedding
//!
//! # Design Rules
//!
//! 1. An operation is applied atomically or not at all.
//! 2. Submission never blocks; waiting happens only on a `Completion`.
//! 3. Namespaces are explicit on every call ([`rmb_types::ObjectLocator`]).
//! 4. Filters and return codes are opaque at the boundary.

pub mod completion;
pub mod errno;
pub mod error;
pub mod filter;
pub mod memory;
pub mod op;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use completion::{Completion, CompletionNotifier, CompletionTracker};
pub use errno::ReturnCode;
pub use error::{StoreError, StoreResult};
pub use filter::{ObjectFilter, PLAIN_FILTER_NAME};
pub use memory::{
    ClientIdentity, InMemoryBackend, InMemoryCluster, StoredObject, DEFAULT_OSD_MAX_WRITE_SIZE_MB,
};
pub use op::{Instruction, WriteOperation};
pub use traits::{Cluster, ObjectBackend, ObjectStat, OSD_MAX_WRITE_SIZE};
