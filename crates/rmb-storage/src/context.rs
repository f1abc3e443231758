use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use rmb_store::{Completion, ObjectBackend, ObjectStat, StoreResult, WriteOperation};
use rmb_types::{MetadataSet, ObjectLocator};

/// A session on one pool, bound to one namespace at a time.
///
/// The binding lives here, not in the backend: every call resolves the oid
/// against the current namespace and passes an explicit [`ObjectLocator`].
/// Cloning (or [`IoContext::dup`]) yields an independent session on the same
/// pool.
#[derive(Clone)]
pub struct IoContext {
    backend: Arc<dyn ObjectBackend>,
    namespace: String,
}

impl IoContext {
    pub fn new(backend: Arc<dyn ObjectBackend>, namespace: impl Into<String>) -> Self {
        Self {
            backend,
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn set_namespace(&mut self, namespace: &str) {
        namespace.clone_into(&mut self.namespace);
    }

    /// An independent session on the same pool, bound to `namespace`.
    pub fn dup(&self, namespace: &str) -> IoContext {
        IoContext::new(Arc::clone(&self.backend), namespace)
    }

    pub fn backend(&self) -> &Arc<dyn ObjectBackend> {
        &self.backend
    }

    /// Resolve `oid` against the current namespace.
    pub fn locator(&self, oid: &str) -> ObjectLocator {
        ObjectLocator::new(self.namespace.clone(), oid)
    }

    pub fn aio_operate(&self, oid: &str, op: &WriteOperation) -> StoreResult<Completion> {
        self.backend.aio_operate(&self.locator(oid), op)
    }

    pub async fn read(&self, oid: &str, len: usize, offset: u64) -> StoreResult<Bytes> {
        self.backend.read(&self.locator(oid), len, offset).await
    }

    pub async fn remove(&self, oid: &str) -> StoreResult<()> {
        self.backend.remove(&self.locator(oid)).await
    }

    pub async fn stat(&self, oid: &str) -> StoreResult<ObjectStat> {
        self.backend.stat(&self.locator(oid)).await
    }

    pub async fn getxattrs(&self, oid: &str) -> StoreResult<MetadataSet> {
        self.backend.getxattrs(&self.locator(oid)).await
    }

    pub async fn setxattr(&self, oid: &str, key: &str, value: &[u8]) -> StoreResult<()> {
        self.backend.setxattr(&self.locator(oid), key, value).await
    }

    pub async fn list_objects(
        &self,
        filter: Option<&[u8]>,
        after: Option<&str>,
        limit: usize,
    ) -> StoreResult<Vec<String>> {
        self.backend
            .list_objects(&self.namespace, filter, after, limit)
            .await
    }
}

impl fmt::Debug for IoContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IoContext")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmb_store::InMemoryBackend;

    fn ctx(namespace: &str) -> (Arc<InMemoryBackend>, IoContext) {
        let backend = Arc::new(InMemoryBackend::new("pool", 1024));
        let ctx = IoContext::new(backend.clone(), namespace);
        (backend, ctx)
    }

    #[test]
    fn locator_uses_current_namespace() {
        let (_, mut ctx) = ctx("ns1");
        assert_eq!(ctx.locator("a"), ObjectLocator::new("ns1", "a"));
        ctx.set_namespace("");
        assert!(ctx.locator("a").is_default_namespace());
    }

    #[test]
    fn dup_is_independent() {
        let (_, ctx) = ctx("dest");
        let mut src = ctx.dup("src");
        assert_eq!(src.namespace(), "src");
        src.set_namespace("other");
        assert_eq!(ctx.namespace(), "dest");
    }

    #[tokio::test]
    async fn calls_target_bound_namespace() {
        let (backend, ctx) = ctx("ns1");
        ctx.setxattr("a", "k", b"v").await.unwrap();
        assert!(backend.object(&ObjectLocator::new("ns1", "a")).is_some());
        assert!(backend.object(&ObjectLocator::in_default("a")).is_none());
        assert_eq!(ctx.list_objects(None, None, 10).await.unwrap(), vec!["a"]);
    }
}
