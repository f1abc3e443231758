use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use rmb_store::{Cluster, Completion, ObjectFilter, WriteOperation, OSD_MAX_WRITE_SIZE};
use rmb_types::Metadata;
use tracing::{debug, info, warn};

use crate::aggregate::{wait_all, WriteBatch};
use crate::config::{parse_max_write_size, StorageConfig};
use crate::context::IoContext;
use crate::error::{StorageError, StorageResult};
use crate::find::ObjectIterator;
use crate::metadata::apply_attributes;
use crate::object::MailObject;
use crate::split::split_and_write;

/// Upper bound on a single whole-object read.
pub const MAX_READ_SIZE: usize = i32::MAX as usize;

/// A storage session: one cluster connection, one pool, one namespace
/// binding.
///
/// Operations that rebind the namespace take `&mut self`; a session is not
/// meant to be shared between concurrent operations.
pub struct RadosStorage {
    cluster: Arc<dyn Cluster>,
    config: StorageConfig,
    io_ctx: Option<IoContext>,
    max_write_size: u64,
}

impl RadosStorage {
    pub fn new(cluster: Arc<dyn Cluster>) -> Self {
        Self::with_config(cluster, StorageConfig::default())
    }

    pub fn with_config(cluster: Arc<dyn Cluster>, config: StorageConfig) -> Self {
        Self {
            cluster,
            config,
            io_ctx: None,
            max_write_size: 0,
        }
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Connect to the cluster as the configured client, open `pool` and
    /// bind to `namespace`.
    ///
    /// The session's maximum write size comes from the configured override,
    /// or else from the cluster's `osd_max_write_size` option.
    pub fn open_connection(&mut self, pool: &str, namespace: &str) -> StorageResult<()> {
        self.cluster
            .init(&self.config.cluster_name, &self.config.user_name)?;
        let backend = self.cluster.open_pool(pool)?;
        let max_write_size = match self.config.max_write_size_override {
            Some(0) => return Err(StorageError::InvalidMaxWriteSize("0".into())),
            Some(bytes) => bytes,
            None => parse_max_write_size(&self.cluster.config_option(OSD_MAX_WRITE_SIZE)?)?,
        };

        self.io_ctx = Some(IoContext::new(backend, namespace));
        self.max_write_size = max_write_size;
        info!(pool, namespace, max_write_size, "storage connection opened");
        Ok(())
    }

    /// [`open_connection`](Self::open_connection) with the configured pool
    /// and namespace.
    pub fn connect(&mut self) -> StorageResult<()> {
        let pool = self.config.pool_name.clone();
        let namespace = self.config.namespace.clone();
        self.open_connection(&pool, &namespace)
    }

    /// Drop the pool session and shut the cluster handle down.
    pub fn close_connection(&mut self) {
        if self.io_ctx.take().is_some() {
            info!("storage connection closed");
        }
        self.max_write_size = 0;
        self.cluster.shutdown();
    }

    pub fn is_connected(&self) -> bool {
        self.io_ctx.is_some()
    }

    pub fn io_ctx(&self) -> StorageResult<&IoContext> {
        self.io_ctx.as_ref().ok_or(StorageError::NotConnected)
    }

    pub fn io_ctx_mut(&mut self) -> StorageResult<&mut IoContext> {
        self.io_ctx.as_mut().ok_or(StorageError::NotConnected)
    }

    pub fn namespace(&self) -> StorageResult<&str> {
        Ok(self.io_ctx()?.namespace())
    }

    pub fn set_namespace(&mut self, namespace: &str) -> StorageResult<()> {
        self.io_ctx_mut()?.set_namespace(namespace);
        Ok(())
    }

    /// Largest single write, in bytes. Zero while disconnected.
    pub fn max_write_size(&self) -> u64 {
        self.max_write_size
    }

    /// Split `buffer` into writes of at most [`max_write_size`](Self::max_write_size)
    /// bytes and submit them against the current namespace.
    pub fn split_and_write(
        &self,
        buffer: &Bytes,
        target: &mut MailObject,
        base_op: WriteOperation,
    ) -> StorageResult<usize> {
        split_and_write(self.io_ctx()?, buffer, target, base_op, self.max_write_size)
    }

    /// Write `buffer` as the content of `object`, together with the
    /// object's staged metadata. The writes stay pending on `object`.
    pub fn save(&self, object: &mut MailObject, buffer: &Bytes) -> StorageResult<usize> {
        let mut base_op = WriteOperation::new();
        for (key, value) in object.metadata().iter() {
            base_op.setxattr(key, value);
        }
        self.split_and_write(buffer, object, base_op)
    }

    /// Drain `batch`. Returns `true` if any write failed.
    pub async fn wait_for_write_operations_complete(&self, batch: WriteBatch) -> bool {
        wait_all(batch).await
    }

    /// Submit `op` for `oid` against `ctx`, or the session's own context.
    pub fn aio_operate_in(
        &self,
        ctx: Option<&IoContext>,
        oid: &str,
        op: &WriteOperation,
    ) -> StorageResult<Completion> {
        let ctx = match ctx {
            Some(ctx) => ctx,
            None => self.io_ctx()?,
        };
        Ok(ctx.aio_operate(oid, op)?)
    }

    /// Read a whole object from the current namespace.
    pub async fn read(&self, oid: &str) -> StorageResult<Bytes> {
        Ok(self.io_ctx()?.read(oid, MAX_READ_SIZE, 0).await?)
    }

    /// Apply `attributes` to `oid` in one operation. Returns `true` on
    /// success.
    pub async fn update_metadata(&self, oid: &str, attributes: &[Metadata]) -> bool {
        match self.io_ctx() {
            Ok(ctx) => apply_attributes(ctx, oid, attributes).await,
            Err(e) => {
                warn!(oid, error = %e, "metadata update skipped");
                false
            }
        }
    }

    /// Fetch `object`'s attributes unless some are already loaded.
    pub async fn load_metadata(&self, object: &mut MailObject) -> StorageResult<()> {
        if !object.metadata().is_empty() {
            return Ok(());
        }
        let attributes = self.io_ctx()?.getxattrs(object.oid()).await?;
        debug!(oid = object.oid(), count = attributes.len(), "metadata loaded");
        *object.metadata_mut() = attributes;
        Ok(())
    }

    /// Write one attribute and wait for it.
    pub async fn set_metadata(&self, oid: &str, attribute: &Metadata) -> StorageResult<()> {
        self.io_ctx()?
            .setxattr(oid, &attribute.key, &attribute.value)
            .await?;
        Ok(())
    }

    pub async fn delete(&self, oid: &str) -> StorageResult<()> {
        if oid.is_empty() {
            return Err(StorageError::EmptyObjectId);
        }
        self.io_ctx()?.remove(oid).await?;
        debug!(oid, "object deleted");
        Ok(())
    }

    pub async fn delete_object(&self, object: &MailObject) -> StorageResult<()> {
        self.delete(object.oid()).await
    }

    /// Size and modification time of `oid`.
    pub async fn stat(&self, oid: &str) -> StorageResult<(u64, DateTime<Utc>)> {
        let stat = self.io_ctx()?.stat(oid).await?;
        Ok((stat.size, stat.mtime))
    }

    /// Enumerate the current namespace, optionally keeping only objects
    /// whose attribute equals `filter`.
    pub fn find(&self, filter: Option<&Metadata>) -> StorageResult<ObjectIterator> {
        let ctx = self.io_ctx()?.clone();
        let blob = filter.map(|f| ObjectFilter::plain(f).encode()).transpose()?;
        Ok(ObjectIterator::new(ctx, blob))
    }
}

impl std::fmt::Debug for RadosStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RadosStorage")
            .field("config", &self.config)
            .field("io_ctx", &self.io_ctx)
            .field("max_write_size", &self.max_write_size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rmb_store::{errno, InMemoryBackend, InMemoryCluster, StoreError};
    use rmb_types::ObjectLocator;

    const MIB: u64 = 1024 * 1024;

    fn connected(pool: &str) -> (Arc<InMemoryCluster>, Arc<InMemoryBackend>, RadosStorage) {
        let cluster = Arc::new(InMemoryCluster::new());
        let backend = cluster.create_pool(pool);
        let mut storage = RadosStorage::new(cluster.clone());
        storage.open_connection(pool, "").unwrap();
        (cluster, backend, storage)
    }

    // --- connection ---------------------------------------------------------

    #[test]
    fn open_connection_reads_cluster_limit() {
        let cluster = Arc::new(InMemoryCluster::new());
        cluster.set_config_option(OSD_MAX_WRITE_SIZE, "4");
        cluster.create_pool("mails");
        let mut storage = RadosStorage::new(cluster);
        storage.open_connection("mails", "user-1").unwrap();
        assert_eq!(storage.max_write_size(), 4 * MIB);
        assert_eq!(storage.namespace().unwrap(), "user-1");
    }

    #[test]
    fn override_wins_over_cluster_limit() {
        let cluster = Arc::new(InMemoryCluster::new());
        cluster.create_pool("mails");
        let config = StorageConfig {
            max_write_size_override: Some(512),
            ..Default::default()
        };
        let mut storage = RadosStorage::with_config(cluster, config);
        storage.open_connection("mails", "").unwrap();
        assert_eq!(storage.max_write_size(), 512);
    }

    #[test]
    fn non_positive_cluster_limit_is_rejected() {
        let cluster = Arc::new(InMemoryCluster::new());
        cluster.create_pool("mails");
        cluster.set_config_option(OSD_MAX_WRITE_SIZE, "0");
        let mut storage = RadosStorage::new(cluster);
        assert!(matches!(
            storage.open_connection("mails", ""),
            Err(StorageError::InvalidMaxWriteSize(_))
        ));
        assert!(!storage.is_connected());
    }

    #[test]
    fn connects_as_configured_client() {
        let cluster = Arc::new(InMemoryCluster::new());
        cluster.create_pool("mails");
        let config = StorageConfig {
            cluster_name: "backup".into(),
            user_name: "client.mail".into(),
            ..Default::default()
        };
        let mut storage = RadosStorage::with_config(cluster.clone(), config);
        storage.open_connection("mails", "").unwrap();
        let client = cluster.client().unwrap();
        assert_eq!(client.cluster_name, "backup");
        assert_eq!(client.user_name, "client.mail");
    }

    #[test]
    fn missing_pool_fails() {
        let mut storage = RadosStorage::new(Arc::new(InMemoryCluster::new()));
        assert!(matches!(
            storage.open_connection("absent", ""),
            Err(StorageError::Store(StoreError::PoolNotFound(_)))
        ));
    }

    #[test]
    fn connect_uses_configured_pool() {
        let cluster = Arc::new(InMemoryCluster::new());
        cluster.create_pool("mail_storage");
        let mut storage = RadosStorage::new(cluster);
        storage.connect().unwrap();
        assert!(storage.is_connected());
    }

    #[tokio::test]
    async fn closed_session_is_not_connected() {
        let (cluster, _, mut storage) = connected("mails");
        storage.close_connection();
        assert!(!cluster.is_connected());
        assert!(matches!(storage.read("a").await, Err(StorageError::NotConnected)));
        assert!(matches!(storage.namespace(), Err(StorageError::NotConnected)));
        assert!(!storage.update_metadata("a", &[]).await);
        assert_eq!(storage.max_write_size(), 0);
    }

    // --- writes -------------------------------------------------------------

    #[tokio::test]
    async fn save_writes_content_and_metadata() {
        let (_, backend, storage) = connected("mails");
        let mut obj = MailObject::new("mail-1");
        obj.add_metadata(Metadata::new("M", "inbox"));
        obj.add_metadata(Metadata::new("R", "1700000000"));

        let n = storage.save(&mut obj, &Bytes::from_static(b"hello")).unwrap();
        assert_eq!(n, 1);
        let failed = storage
            .wait_for_write_operations_complete(obj.take_pending_writes())
            .await;
        assert!(!failed);

        assert_eq!(&storage.read("mail-1").await.unwrap()[..], b"hello");
        let stored = backend.object(&ObjectLocator::in_default("mail-1")).unwrap();
        assert_eq!(stored.xattrs.get("M"), Some(&b"inbox"[..]));
        assert_eq!(stored.xattrs.len(), 2);
    }

    #[tokio::test]
    async fn split_uses_session_limit() {
        let cluster = Arc::new(InMemoryCluster::new());
        cluster.set_config_option(OSD_MAX_WRITE_SIZE, "1");
        cluster.create_pool("mails");
        let mut storage = RadosStorage::new(cluster);
        storage.open_connection("mails", "").unwrap();

        let buffer = Bytes::from(vec![7u8; (2 * MIB + 1) as usize]);
        let mut obj = MailObject::new("big");
        let n = storage
            .split_and_write(&buffer, &mut obj, WriteOperation::new())
            .unwrap();
        assert_eq!(n, 3);
        assert!(!wait_all(obj.take_pending_writes()).await);
        assert_eq!(storage.stat("big").await.unwrap().0, 2 * MIB + 1);
    }

    #[tokio::test]
    async fn aio_operate_in_explicit_context() {
        let (_, backend, storage) = connected("mails");
        let other = storage.io_ctx().unwrap().dup("other");
        let mut op = WriteOperation::new();
        op.setxattr("k", "v");

        let mut completion = storage.aio_operate_in(Some(&other), "a", &op).unwrap();
        assert_eq!(completion.wait().await, errno::OK);
        let mut completion = storage.aio_operate_in(None, "b", &op).unwrap();
        assert_eq!(completion.wait().await, errno::OK);

        assert!(backend.object(&ObjectLocator::new("other", "a")).is_some());
        assert!(backend.object(&ObjectLocator::in_default("b")).is_some());
    }

    // --- primitives ---------------------------------------------------------

    #[tokio::test]
    async fn delete_rejects_empty_oid() {
        let (_, backend, storage) = connected("mails");
        assert!(matches!(storage.delete("").await, Err(StorageError::EmptyObjectId)));
        assert!(matches!(
            storage.delete_object(&MailObject::new("")).await,
            Err(StorageError::EmptyObjectId)
        ));

        backend.put_object(&ObjectLocator::in_default("a"), b"x");
        storage.delete("a").await.unwrap();
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn delete_missing_object_maps_to_enoent() {
        let (_, _, storage) = connected("mails");
        let err = storage.delete("absent").await.unwrap_err();
        assert_eq!(err.errno(), -errno::ENOENT);
    }

    #[tokio::test]
    async fn stat_reports_size_and_mtime() {
        let (_, backend, storage) = connected("mails");
        backend.put_object(&ObjectLocator::in_default("a"), b"abcd");
        let (size, mtime) = storage.stat("a").await.unwrap();
        assert_eq!(size, 4);
        assert!(mtime <= Utc::now());
    }

    #[tokio::test]
    async fn load_metadata_only_when_empty() {
        let (_, _, storage) = connected("mails");
        storage
            .set_metadata("a", &Metadata::new("k", "stored"))
            .await
            .unwrap();

        let mut fresh = MailObject::new("a");
        storage.load_metadata(&mut fresh).await.unwrap();
        assert_eq!(fresh.metadata().get("k"), Some(&b"stored"[..]));

        let mut staged = MailObject::new("a");
        staged.add_metadata(Metadata::new("k", "local"));
        storage.load_metadata(&mut staged).await.unwrap();
        assert_eq!(staged.metadata().get("k"), Some(&b"local"[..]));
    }

    #[tokio::test]
    async fn update_metadata_applies_all() {
        let (_, backend, storage) = connected("mails");
        let attrs = [Metadata::new("a", "1"), Metadata::new("b", "2")];
        assert!(storage.update_metadata("mail-1", &attrs).await);
        let stored = backend.object(&ObjectLocator::in_default("mail-1")).unwrap();
        assert_eq!(stored.xattrs.len(), 2);
        assert_eq!(backend.tracker().outstanding(), 0);
    }

    #[tokio::test]
    async fn update_metadata_accepts_positive_code() {
        let (_, backend, storage) = connected("mails");
        backend.complete_with_code_at(0, 1);
        assert!(storage.update_metadata("mail-1", &[Metadata::new("k", "v")]).await);
    }

    #[tokio::test]
    async fn find_with_and_without_filter() {
        let (_, _, storage) = connected("mails");
        storage.set_metadata("a", &Metadata::new("M", "inbox")).await.unwrap();
        storage.set_metadata("b", &Metadata::new("M", "sent")).await.unwrap();

        let all = storage.find(None).unwrap().collect_all().await.unwrap();
        assert_eq!(all, vec!["a", "b"]);
        let inbox = storage
            .find(Some(&Metadata::new("M", "inbox")))
            .unwrap()
            .collect_all()
            .await
            .unwrap();
        assert_eq!(inbox, vec!["a"]);
    }
}
