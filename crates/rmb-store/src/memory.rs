use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use rmb_types::{MetadataSet, ObjectLocator};
use tracing::debug;

use crate::completion::{Completion, CompletionTracker};
use crate::errno::{self, ReturnCode};
use crate::error::{StoreError, StoreResult};
use crate::filter::ObjectFilter;
use crate::op::{Instruction, WriteOperation};
use crate::traits::{Cluster, ObjectBackend, ObjectStat, OSD_MAX_WRITE_SIZE};

/// Default value of [`OSD_MAX_WRITE_SIZE`], in MiB.
pub const DEFAULT_OSD_MAX_WRITE_SIZE_MB: u64 = 90;

const MIB: u64 = 1024 * 1024;

/// An object as held by the in-memory backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub xattrs: MetadataSet,
    pub mtime: DateTime<Utc>,
    pub version: u64,
}

impl StoredObject {
    fn empty() -> Self {
        Self {
            data: Vec::new(),
            xattrs: MetadataSet::new(),
            mtime: Utc::now(),
            version: 0,
        }
    }

    fn stat(&self) -> ObjectStat {
        ObjectStat {
            size: self.data.len() as u64,
            mtime: self.mtime,
            version: self.version,
        }
    }
}

type ObjectMap = HashMap<ObjectLocator, StoredObject>;

#[derive(Debug, Default)]
struct FaultPlan {
    reject_from: Option<usize>,
    /// Return code to report instead of the real outcome, by submission
    /// index.
    forced_codes: HashMap<usize, ReturnCode>,
}

/// In-memory, HashMap-based pool.
///
/// Intended for tests and embedding. Submitted operations run on the ambient
/// tokio runtime, so completions fire asynchronously and in no particular
/// order. Submission and completion failures can be injected by submission
/// index.
pub struct InMemoryBackend {
    pool: String,
    objects: Arc<RwLock<ObjectMap>>,
    max_write_size: u64,
    version: Arc<AtomicU64>,
    submissions: AtomicUsize,
    faults: RwLock<FaultPlan>,
    tracker: Arc<CompletionTracker>,
}

impl InMemoryBackend {
    /// Create an empty pool accepting single writes of up to
    /// `max_write_size` bytes.
    pub fn new(pool: impl Into<String>, max_write_size: u64) -> Self {
        Self {
            pool: pool.into(),
            objects: Arc::new(RwLock::new(HashMap::new())),
            max_write_size,
            version: Arc::new(AtomicU64::new(0)),
            submissions: AtomicUsize::new(0),
            faults: RwLock::new(FaultPlan::default()),
            tracker: Arc::new(CompletionTracker::new()),
        }
    }

    pub fn pool(&self) -> &str {
        &self.pool
    }

    pub fn max_write_size(&self) -> u64 {
        self.max_write_size
    }

    /// Completion tokens created and released against this pool.
    pub fn tracker(&self) -> &Arc<CompletionTracker> {
        &self.tracker
    }

    /// Number of `aio_operate` calls so far, rejected ones included.
    pub fn submissions(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }

    /// Reject every submission whose index is `index` or later.
    pub fn reject_submissions_from(&self, index: usize) {
        self.faults.write().expect("lock poisoned").reject_from = Some(index);
    }

    /// Make the operation submitted at `index` complete with `-EIO`
    /// without being applied.
    pub fn fail_completion_at(&self, index: usize) {
        self.complete_with_code_at(index, -errno::EIO);
    }

    /// Make the operation submitted at `index` complete with `code`.
    ///
    /// A non-negative `code` still applies the operation if it would have
    /// succeeded; a negative one skips it.
    pub fn complete_with_code_at(&self, index: usize, code: ReturnCode) {
        self.faults
            .write()
            .expect("lock poisoned")
            .forced_codes
            .insert(index, code);
    }

    pub fn clear_faults(&self) {
        *self.faults.write().expect("lock poisoned") = FaultPlan::default();
    }

    /// Snapshot of one object.
    pub fn object(&self, locator: &ObjectLocator) -> Option<StoredObject> {
        self.objects
            .read()
            .expect("lock poisoned")
            .get(locator)
            .cloned()
    }

    /// Store `data` under `locator`, replacing any existing content.
    pub fn put_object(&self, locator: &ObjectLocator, data: &[u8]) {
        let mut map = self.objects.write().expect("lock poisoned");
        let obj = map.entry(locator.clone()).or_insert_with(StoredObject::empty);
        obj.data = data.to_vec();
        obj.mtime = Utc::now();
        obj.version = next_version(&self.version);
    }

    /// Number of objects across all namespaces.
    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }
}

impl std::fmt::Debug for InMemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBackend")
            .field("pool", &self.pool)
            .field("object_count", &self.len())
            .field("max_write_size", &self.max_write_size)
            .finish()
    }
}

fn next_version(counter: &AtomicU64) -> u64 {
    counter.fetch_add(1, Ordering::SeqCst) + 1
}

/// Apply every instruction of `op` to `locator`, or none of them.
fn apply_operation(
    objects: &RwLock<ObjectMap>,
    version: &AtomicU64,
    locator: &ObjectLocator,
    op: &WriteOperation,
    max_write_size: u64,
) -> StoreResult<()> {
    let mut map = objects.write().expect("lock poisoned");
    let mut staged = map.get(locator).cloned();
    let mut mtime = None;

    for instruction in op.instructions() {
        match instruction {
            Instruction::Write { offset, data } => {
                let len = data.len() as u64;
                if len > max_write_size {
                    return Err(StoreError::WriteTooLarge {
                        len,
                        max: max_write_size,
                    });
                }
                let target = staged.get_or_insert_with(StoredObject::empty);
                let start = *offset as usize;
                let end = start + data.len();
                if target.data.len() < end {
                    target.data.resize(end, 0);
                }
                target.data[start..end].copy_from_slice(data);
            }
            Instruction::SetXattr { key, value } => {
                staged
                    .get_or_insert_with(StoredObject::empty)
                    .xattrs
                    .insert(key.clone(), value.clone());
            }
            Instruction::Mtime(t) => {
                staged.get_or_insert_with(StoredObject::empty);
                mtime = Some(*t);
            }
            Instruction::CopyFrom {
                source,
                version: expected,
            } => {
                let src = map
                    .get(source)
                    .ok_or_else(|| StoreError::NotFound(source.clone()))?;
                if src.version != *expected {
                    return Err(StoreError::VersionMismatch {
                        locator: source.clone(),
                        expected: *expected,
                        actual: src.version,
                    });
                }
                let target = staged.get_or_insert_with(StoredObject::empty);
                target.data = src.data.clone();
                target.xattrs = src.xattrs.clone();
            }
        }
    }

    if let Some(mut obj) = staged {
        obj.mtime = mtime.unwrap_or_else(Utc::now);
        obj.version = next_version(version);
        map.insert(locator.clone(), obj);
    }
    Ok(())
}

#[async_trait]
impl ObjectBackend for InMemoryBackend {
    fn aio_operate(&self, locator: &ObjectLocator, op: &WriteOperation) -> StoreResult<Completion> {
        let index = self.submissions.fetch_add(1, Ordering::SeqCst);
        let forced_code = {
            let faults = self.faults.read().expect("lock poisoned");
            if faults.reject_from.is_some_and(|from| index >= from) {
                return Err(StoreError::SubmissionRejected {
                    locator: locator.clone(),
                    reason: format!("injected rejection of submission {index}"),
                });
            }
            faults.forced_codes.get(&index).copied()
        };
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|e| StoreError::SubmissionRejected {
                locator: locator.clone(),
                reason: e.to_string(),
            })?;

        let (notifier, completion) = Completion::pair(&self.tracker);
        let objects = Arc::clone(&self.objects);
        let version = Arc::clone(&self.version);
        let locator = locator.clone();
        let op = op.clone();
        let max_write_size = self.max_write_size;

        runtime.spawn(async move {
            let code = match forced_code {
                Some(code) if errno::is_failure(code) => code,
                forced => match apply_operation(&objects, &version, &locator, &op, max_write_size) {
                    Ok(()) => forced.unwrap_or(errno::OK),
                    Err(e) => {
                        debug!(%locator, error = %e, "operation failed");
                        e.errno()
                    }
                },
            };
            notifier.complete(code);
        });
        Ok(completion)
    }

    async fn read(&self, locator: &ObjectLocator, len: usize, offset: u64) -> StoreResult<Bytes> {
        let map = self.objects.read().expect("lock poisoned");
        let obj = map
            .get(locator)
            .ok_or_else(|| StoreError::NotFound(locator.clone()))?;
        let start = (offset as usize).min(obj.data.len());
        let end = start.saturating_add(len).min(obj.data.len());
        Ok(Bytes::copy_from_slice(&obj.data[start..end]))
    }

    async fn remove(&self, locator: &ObjectLocator) -> StoreResult<()> {
        let mut map = self.objects.write().expect("lock poisoned");
        map.remove(locator)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(locator.clone()))
    }

    async fn stat(&self, locator: &ObjectLocator) -> StoreResult<ObjectStat> {
        let map = self.objects.read().expect("lock poisoned");
        map.get(locator)
            .map(StoredObject::stat)
            .ok_or_else(|| StoreError::NotFound(locator.clone()))
    }

    async fn getxattrs(&self, locator: &ObjectLocator) -> StoreResult<MetadataSet> {
        let map = self.objects.read().expect("lock poisoned");
        map.get(locator)
            .map(|obj| obj.xattrs.clone())
            .ok_or_else(|| StoreError::NotFound(locator.clone()))
    }

    async fn setxattr(&self, locator: &ObjectLocator, key: &str, value: &[u8]) -> StoreResult<()> {
        let mut map = self.objects.write().expect("lock poisoned");
        let obj = map.entry(locator.clone()).or_insert_with(StoredObject::empty);
        obj.xattrs.insert(key, value);
        obj.mtime = Utc::now();
        obj.version = next_version(&self.version);
        Ok(())
    }

    async fn list_objects(
        &self,
        namespace: &str,
        filter: Option<&[u8]>,
        after: Option<&str>,
        limit: usize,
    ) -> StoreResult<Vec<String>> {
        let filter = filter.map(ObjectFilter::decode).transpose()?;
        let map = self.objects.read().expect("lock poisoned");
        let mut oids = Vec::new();
        for (locator, obj) in map.iter() {
            if locator.namespace != namespace {
                continue;
            }
            if after.is_some_and(|after| locator.oid.as_str() <= after) {
                continue;
            }
            if let Some(ref filter) = filter {
                if !filter.matches(&obj.xattrs)? {
                    continue;
                }
            }
            oids.push(locator.oid.clone());
        }
        oids.sort();
        oids.truncate(limit);
        Ok(oids)
    }
}

/// In-memory cluster: a set of named [`InMemoryBackend`] pools plus a
/// configuration map.
pub struct InMemoryCluster {
    pools: RwLock<HashMap<String, Arc<InMemoryBackend>>>,
    config: RwLock<HashMap<String, String>>,
    client: RwLock<Option<ClientIdentity>>,
    connected: AtomicBool,
}

/// Cluster and user name a cluster handle was initialised with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientIdentity {
    pub cluster_name: String,
    pub user_name: String,
}

impl InMemoryCluster {
    /// Create a disconnected cluster with no pools and default options.
    pub fn new() -> Self {
        let mut config = HashMap::new();
        config.insert(
            OSD_MAX_WRITE_SIZE.to_string(),
            DEFAULT_OSD_MAX_WRITE_SIZE_MB.to_string(),
        );
        Self {
            pools: RwLock::new(HashMap::new()),
            config: RwLock::new(config),
            client: RwLock::new(None),
            connected: AtomicBool::new(false),
        }
    }

    pub fn set_config_option(&self, name: impl Into<String>, value: impl Into<String>) {
        self.config
            .write()
            .expect("lock poisoned")
            .insert(name.into(), value.into());
    }

    /// Create (or return the existing) pool. Its write limit is taken from
    /// the current [`OSD_MAX_WRITE_SIZE`] option, falling back to the
    /// default when the option does not parse.
    pub fn create_pool(&self, name: &str) -> Arc<InMemoryBackend> {
        let max_mb = self
            .config
            .read()
            .expect("lock poisoned")
            .get(OSD_MAX_WRITE_SIZE)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|mb| *mb > 0)
            .unwrap_or(DEFAULT_OSD_MAX_WRITE_SIZE_MB);
        let mut pools = self.pools.write().expect("lock poisoned");
        Arc::clone(
            pools
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(InMemoryBackend::new(name, max_mb * MIB))),
        )
    }

    /// The identity the current or most recent connection was made with.
    pub fn client(&self) -> Option<ClientIdentity> {
        self.client.read().expect("lock poisoned").clone()
    }

    pub fn pool(&self, name: &str) -> Option<Arc<InMemoryBackend>> {
        self.pools.read().expect("lock poisoned").get(name).cloned()
    }
}

impl Default for InMemoryCluster {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryCluster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pools = self.pools.read().expect("lock poisoned").len();
        f.debug_struct("InMemoryCluster")
            .field("pool_count", &pools)
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl Cluster for InMemoryCluster {
    fn init(&self, cluster_name: &str, user_name: &str) -> StoreResult<()> {
        if self.is_connected() {
            return Ok(());
        }
        *self.client.write().expect("lock poisoned") = Some(ClientIdentity {
            cluster_name: cluster_name.to_string(),
            user_name: user_name.to_string(),
        });
        self.connected.store(true, Ordering::SeqCst);
        debug!(cluster_name, user_name, "cluster connected");
        Ok(())
    }

    fn shutdown(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn open_pool(&self, pool: &str) -> StoreResult<Arc<dyn ObjectBackend>> {
        if !self.is_connected() {
            return Err(StoreError::NotConnected);
        }
        let backend: Arc<dyn ObjectBackend> = self
            .pool(pool)
            .ok_or_else(|| StoreError::PoolNotFound(pool.to_string()))?;
        Ok(backend)
    }

    fn config_option(&self, name: &str) -> StoreResult<String> {
        self.config
            .read()
            .expect("lock poisoned")
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::UnknownConfigOption(name.to_string()))
    }
}
