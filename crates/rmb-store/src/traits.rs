use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use rmb_types::{MetadataSet, ObjectLocator};

use crate::completion::Completion;
use crate::error::StoreResult;
use crate::op::WriteOperation;

/// Size, modification time and version of a stored object.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ObjectStat {
    pub size: u64,
    pub mtime: DateTime<Utc>,
    /// Bumped on every applied mutation.
    pub version: u64,
}

/// One pool of a namespace-partitioned object store.
///
/// Every call names its target with an explicit [`ObjectLocator`]; the
/// backend holds no per-session namespace state.
///
/// Implementations must satisfy these invariants:
/// - A submitted [`WriteOperation`] is applied atomically: all of its
///   instructions or none of them.
/// - A single write instruction larger than the pool's maximum write size
///   fails its operation with `-EFBIG`.
/// - `aio_operate` never blocks; the returned [`Completion`] fires exactly
///   once with the operation's return code.
#[async_trait]
pub trait ObjectBackend: Send + Sync {
    /// Queue `op` against `locator` and return its completion token.
    ///
    /// An `Err` means the operation was never queued and no token exists.
    fn aio_operate(&self, locator: &ObjectLocator, op: &WriteOperation) -> StoreResult<Completion>;

    /// Read up to `len` bytes starting at `offset`.
    async fn read(&self, locator: &ObjectLocator, len: usize, offset: u64) -> StoreResult<Bytes>;

    /// Remove an object.
    async fn remove(&self, locator: &ObjectLocator) -> StoreResult<()>;

    async fn stat(&self, locator: &ObjectLocator) -> StoreResult<ObjectStat>;

    /// Fetch every attribute of an object.
    async fn getxattrs(&self, locator: &ObjectLocator) -> StoreResult<MetadataSet>;

    /// Set one attribute, creating the object if it does not exist.
    async fn setxattr(&self, locator: &ObjectLocator, key: &str, value: &[u8]) -> StoreResult<()>;

    /// List object ids in `namespace` in ascending order, strictly after
    /// `after`, at most `limit` of them. `filter` is an encoded
    /// [`ObjectFilter`](crate::ObjectFilter).
    async fn list_objects(
        &self,
        namespace: &str,
        filter: Option<&[u8]>,
        after: Option<&str>,
        limit: usize,
    ) -> StoreResult<Vec<String>>;
}

/// Cluster option holding the largest single write a pool accepts, in MiB.
pub const OSD_MAX_WRITE_SIZE: &str = "osd_max_write_size";

/// Connection to a cluster of pools.
pub trait Cluster: Send + Sync {
    /// Connect to the cluster named `cluster_name` as client `user_name`.
    /// Calling it on a connected cluster is a no-op.
    fn init(&self, cluster_name: &str, user_name: &str) -> StoreResult<()>;

    /// Disconnect. Backends opened earlier stay usable by their holders.
    fn shutdown(&self);

    fn is_connected(&self) -> bool;

    /// Open an existing pool.
    fn open_pool(&self, pool: &str) -> StoreResult<Arc<dyn ObjectBackend>>;

    /// Read a cluster configuration option as its raw string value.
    fn config_option(&self, name: &str) -> StoreResult<String>;
}
