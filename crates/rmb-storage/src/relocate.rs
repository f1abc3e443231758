//! Namespace-aware copy and move.
//!
//! A relocation is one write operation against the destination: copy the
//! source's content and attributes, refresh the modification time, then
//! apply the caller's attribute updates. The store applies it atomically.
//! Removing the source after a cross-namespace move is a second, separate
//! call and is not atomic with the copy.

use chrono::Utc;
use rmb_store::{errno, WriteOperation};
use rmb_types::Metadata;
use tracing::{debug, info, warn};

use crate::context::IoContext;
use crate::handle::OperationHandle;
use crate::storage::RadosStorage;

/// Bind `primary` to `dest_ns` and, when the source lives elsewhere, return
/// an independent context bound to `src_ns`.
///
/// `None` means source and destination share `primary`.
pub fn bind_contexts(primary: &mut IoContext, src_ns: &str, dest_ns: &str) -> Option<IoContext> {
    primary.set_namespace(dest_ns);
    if src_ns == dest_ns {
        None
    } else {
        Some(primary.dup(src_ns))
    }
}

impl RadosStorage {
    /// Copy `src_oid` in `src_ns` to `dest_oid` in `dest_ns`, applying
    /// `attributes` on top of the copied ones.
    ///
    /// With `delete_source`, the source is removed after a successful copy,
    /// but only when the namespaces differ. Returns `true` if the copy
    /// completed with code 0. The session is left bound to `dest_ns`.
    pub async fn move_object(
        &mut self,
        src_oid: &str,
        src_ns: &str,
        dest_oid: &str,
        dest_ns: &str,
        attributes: &[Metadata],
        delete_source: bool,
    ) -> bool {
        let primary = match self.io_ctx_mut() {
            Ok(ctx) => ctx,
            Err(e) => {
                warn!(src_oid, dest_oid, error = %e, "relocation skipped");
                return false;
            }
        };
        let src_ctx = bind_contexts(primary, src_ns, dest_ns);
        let source = src_ctx.as_ref().unwrap_or(&*primary);

        let version = match source.stat(src_oid).await {
            Ok(stat) => stat.version,
            Err(e) => {
                warn!(src_oid, src_ns, error = %e, "relocation source unavailable");
                return false;
            }
        };

        let mut op = WriteOperation::new();
        op.copy_from(source.locator(src_oid), version)
            .mtime(Utc::now())
            .set_metadata(attributes);

        let completion = match primary.aio_operate(dest_oid, &op) {
            Ok(c) => c,
            Err(e) => {
                warn!(dest_oid, dest_ns, error = %e, "relocation not submitted");
                return false;
            }
        };
        let code = OperationHandle::new(dest_oid, completion, op).finish().await;
        if code != errno::OK {
            warn!(src_oid, src_ns, dest_oid, dest_ns, code, "relocation failed");
            return false;
        }

        match (&src_ctx, delete_source) {
            (Some(src_ctx), true) => {
                if let Err(e) = src_ctx.remove(src_oid).await {
                    warn!(src_oid, src_ns, error = %e, "relocated source not removed");
                }
                info!(src_oid, src_ns, dest_oid, dest_ns, "object moved");
            }
            (None, true) => {
                debug!(src_oid, dest_oid, "same namespace, source kept");
            }
            _ => {
                debug!(src_oid, src_ns, dest_oid, dest_ns, "object copied");
            }
        }
        true
    }

    /// [`move_object`](Self::move_object) without removing the source.
    pub async fn copy_object(
        &mut self,
        src_oid: &str,
        src_ns: &str,
        dest_oid: &str,
        dest_ns: &str,
        attributes: &[Metadata],
    ) -> bool {
        self.move_object(src_oid, src_ns, dest_oid, dest_ns, attributes, false)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use rmb_store::{InMemoryBackend, InMemoryCluster, Instruction};
    use rmb_types::ObjectLocator;

    async fn connected() -> (Arc<InMemoryBackend>, RadosStorage) {
        let cluster = Arc::new(InMemoryCluster::new());
        let backend = cluster.create_pool("mails");
        let mut storage = RadosStorage::new(cluster);
        storage.open_connection("mails", "").unwrap();
        (backend, storage)
    }

    fn seed(backend: &InMemoryBackend, ns: &str, oid: &str) -> ObjectLocator {
        let loc = ObjectLocator::new(ns, oid);
        backend.put_object(&loc, b"message body");
        loc
    }

    // --- context binding ----------------------------------------------------

    #[test]
    fn same_namespace_shares_primary() {
        let backend = Arc::new(InMemoryBackend::new("pool", 16));
        let mut primary = IoContext::new(backend, "");
        assert!(bind_contexts(&mut primary, "ns1", "ns1").is_none());
        assert_eq!(primary.namespace(), "ns1");
    }

    #[test]
    fn different_namespaces_dup_source() {
        let backend = Arc::new(InMemoryBackend::new("pool", 16));
        let mut primary = IoContext::new(backend, "");
        let src = bind_contexts(&mut primary, "src", "dest").unwrap();
        assert_eq!(src.namespace(), "src");
        assert_eq!(primary.namespace(), "dest");
    }

    // --- copy ---------------------------------------------------------------

    #[tokio::test]
    async fn same_namespace_copy_refreshes_mtime_and_applies_attributes() {
        let (backend, mut storage) = connected().await;
        let src = seed(&backend, "ns1", "A");
        let src_mtime = backend.object(&src).unwrap().mtime;
        tokio::time::sleep(Duration::from_millis(5)).await;

        assert!(
            storage
                .copy_object("A", "ns1", "B", "ns1", &[Metadata::new("k", "v")])
                .await
        );
        assert_eq!(backend.submissions(), 1);

        let dest = backend.object(&ObjectLocator::new("ns1", "B")).unwrap();
        assert_eq!(dest.data, b"message body");
        assert_eq!(dest.xattrs.get("k"), Some(&b"v"[..]));
        assert!(dest.mtime > src_mtime);
        assert!(backend.object(&src).is_some());
        assert_eq!(storage.namespace().unwrap(), "ns1");
    }

    #[tokio::test]
    async fn copy_over_existing_destination_in_default_namespace() {
        let (backend, mut storage) = connected().await;
        seed(&backend, "", "a");
        let dest = seed(&backend, "", "b");
        let prior = backend.object(&dest).unwrap().mtime;
        tokio::time::sleep(Duration::from_millis(5)).await;

        assert!(
            storage
                .copy_object("a", "", "b", "", &[Metadata::new("k", "v")])
                .await
        );
        assert_eq!(backend.submissions(), 1);
        let stored = backend.object(&dest).unwrap();
        assert_eq!(stored.xattrs.get("k"), Some(&b"v"[..]));
        assert!(stored.mtime > prior);
    }

    #[tokio::test]
    async fn copy_carries_source_attributes() {
        let (backend, mut storage) = connected().await;
        let src = ObjectLocator::new("a", "A");
        storage.set_namespace("a").unwrap();
        storage.set_metadata("A", &Metadata::new("M", "inbox")).await.unwrap();
        storage.set_metadata("A", &Metadata::new("k", "old")).await.unwrap();
        assert!(backend.object(&src).is_some());

        assert!(
            storage
                .copy_object("A", "a", "B", "b", &[Metadata::new("k", "new")])
                .await
        );
        let dest = backend.object(&ObjectLocator::new("b", "B")).unwrap();
        assert_eq!(dest.xattrs.get("M"), Some(&b"inbox"[..]));
        assert_eq!(dest.xattrs.get("k"), Some(&b"new"[..]));
        assert!(backend.object(&src).is_some());
    }

    #[tokio::test]
    async fn relocation_is_one_operation() {
        let (backend, mut storage) = connected().await;
        seed(&backend, "a", "A");
        assert!(
            storage
                .move_object("A", "a", "B", "b", &[Metadata::new("x", "1")], true)
                .await
        );
        // removal is not a submitted operation
        assert_eq!(backend.submissions(), 1);
        assert_eq!(backend.tracker().created(), 1);
        assert_eq!(backend.tracker().waited(), 1);
    }

    #[tokio::test]
    async fn missing_source_fails_without_submitting() {
        let (backend, mut storage) = connected().await;
        assert!(!storage.copy_object("absent", "a", "B", "b", &[]).await);
        assert_eq!(backend.submissions(), 0);
        assert_eq!(storage.namespace().unwrap(), "b");
    }

    // --- move ---------------------------------------------------------------

    #[tokio::test]
    async fn same_namespace_move_never_deletes() {
        let (backend, mut storage) = connected().await;
        let src = seed(&backend, "ns1", "A");
        assert!(storage.move_object("A", "ns1", "B", "ns1", &[], true).await);
        assert!(backend.object(&src).is_some());
        assert!(backend.object(&ObjectLocator::new("ns1", "B")).is_some());
    }

    #[tokio::test]
    async fn cross_namespace_move_deletes_source() {
        let (backend, mut storage) = connected().await;
        let src = seed(&backend, "old", "A");
        assert!(
            storage
                .move_object("A", "old", "A", "new", &[Metadata::new("M", "moved")], true)
                .await
        );
        assert!(backend.object(&src).is_none());
        let dest = backend.object(&ObjectLocator::new("new", "A")).unwrap();
        assert_eq!(dest.data, b"message body");
        assert_eq!(storage.namespace().unwrap(), "new");
    }

    #[tokio::test]
    async fn failed_move_keeps_source() {
        let (backend, mut storage) = connected().await;
        let src = seed(&backend, "old", "A");
        backend.fail_completion_at(0);
        assert!(!storage.move_object("A", "old", "A", "new", &[], true).await);
        assert!(backend.object(&src).is_some());
        assert!(backend.object(&ObjectLocator::new("new", "A")).is_none());
        assert_eq!(backend.tracker().outstanding(), 0);
    }

    #[tokio::test]
    async fn positive_completion_code_is_not_success() {
        let (backend, mut storage) = connected().await;
        let src = seed(&backend, "old", "A");
        backend.complete_with_code_at(0, 1);
        assert!(!storage.move_object("A", "old", "A", "new", &[], true).await);
        assert!(backend.object(&src).is_some());
        assert_eq!(backend.tracker().waited(), 1);
    }

    #[tokio::test]
    async fn cross_namespace_move_without_delete_keeps_source() {
        let (backend, mut storage) = connected().await;
        let src = seed(&backend, "old", "A");
        assert!(storage.move_object("A", "old", "A", "new", &[], false).await);
        assert!(backend.object(&src).is_some());
    }

    #[tokio::test]
    async fn move_while_disconnected_is_false() {
        let (_, mut storage) = connected().await;
        storage.close_connection();
        assert!(!storage.move_object("A", "a", "B", "b", &[], true).await);
    }

    #[test]
    fn relocation_operation_shape() {
        let mut op = WriteOperation::new();
        op.copy_from(ObjectLocator::new("a", "A"), 3)
            .mtime(Utc::now())
            .set_metadata(&[Metadata::new("k", "v")]);
        assert!(matches!(op.instructions()[0], Instruction::CopyFrom { version: 3, .. }));
        assert!(matches!(op.instructions()[1], Instruction::Mtime(_)));
        assert!(matches!(op.instructions()[2], Instruction::SetXattr { .. }));
    }
}
