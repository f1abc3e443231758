use std::mem;

use rmb_store::{errno, ReturnCode};
use tracing::{debug, warn};

use crate::handle::OperationHandle;

/// The in-flight writes issued for one object.
///
/// A batch owns its handles until drained by [`wait_all`] or
/// [`wait_all_detailed`], both of which consume it. Dropping a batch that
/// still holds handles abandons their writes and logs a warning.
#[derive(Debug, Default)]
#[must_use = "submitted writes must be drained with wait_all"]
pub struct WriteBatch {
    handles: Vec<OperationHandle>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, handle: OperationHandle) {
        self.handles.push(handle);
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OperationHandle> {
        self.handles.iter()
    }
}

impl Drop for WriteBatch {
    fn drop(&mut self) {
        if !self.handles.is_empty() {
            warn!(
                pending = self.handles.len(),
                oid = self.handles[0].oid(),
                "write batch dropped without being drained"
            );
        }
    }
}

/// Wait for every handle in `batch` and report whether any failed.
///
/// Every handle is waited on and released, including those after a
/// failure. Completion order does not matter. Per-handle codes are not
/// reported; see [`wait_all_detailed`].
pub async fn wait_all(batch: WriteBatch) -> bool {
    let codes = wait_all_detailed(batch).await;
    let failures = codes.iter().filter(|c| errno::is_failure(**c)).count();
    if failures > 0 {
        warn!(failures, total = codes.len(), "write batch failed");
    }
    failures > 0
}

/// Like [`wait_all`], but returns each handle's return code in submission
/// order.
pub async fn wait_all_detailed(mut batch: WriteBatch) -> Vec<ReturnCode> {
    let handles = mem::take(&mut batch.handles);
    let mut codes = Vec::with_capacity(handles.len());
    for handle in handles {
        let oid = handle.oid().to_string();
        let code = handle.finish().await;
        if errno::is_failure(code) {
            debug!(%oid, code, "write completed with error");
        }
        codes.push(code);
    }
    codes
}
