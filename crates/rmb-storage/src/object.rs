use std::mem;

use rmb_types::{Metadata, MetadataSet};

use crate::aggregate::WriteBatch;
use crate::handle::OperationHandle;

/// A stored mail object as seen by the engine: its id, the attributes
/// loaded or staged for it, and the writes still in flight for it.
#[derive(Debug)]
pub struct MailObject {
    oid: String,
    metadata: MetadataSet,
    pending: WriteBatch,
}

impl MailObject {
    pub fn new(oid: impl Into<String>) -> Self {
        Self {
            oid: oid.into(),
            metadata: MetadataSet::new(),
            pending: WriteBatch::new(),
        }
    }

    pub fn oid(&self) -> &str {
        &self.oid
    }

    pub fn metadata(&self) -> &MetadataSet {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut MetadataSet {
        &mut self.metadata
    }

    /// Stage one attribute to be written with the object.
    pub fn add_metadata(&mut self, attr: Metadata) {
        self.metadata.insert(attr.key, attr.value);
    }

    pub(crate) fn track(&mut self, handle: OperationHandle) {
        self.pending.push(handle);
    }

    pub fn pending_writes(&self) -> &WriteBatch {
        &self.pending
    }

    pub fn has_pending_writes(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Take the in-flight writes, leaving an empty batch behind.
    pub fn take_pending_writes(&mut self) -> WriteBatch {
        mem::take(&mut self.pending)
    }
}
