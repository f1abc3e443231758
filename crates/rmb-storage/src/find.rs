use std::collections::VecDeque;

use tracing::trace;

use crate::context::IoContext;
use crate::error::StorageResult;

/// Object ids fetched from the backend per listing call.
pub const LIST_PAGE_SIZE: usize = 1024;

/// Lazy enumeration of the object ids in one namespace.
///
/// Pages through the backend [`LIST_PAGE_SIZE`] ids at a time, in ascending
/// id order. The namespace is fixed when the iterator is created; later
/// changes to the session it came from do not affect it.
#[derive(Debug)]
pub struct ObjectIterator {
    ctx: IoContext,
    filter: Option<Vec<u8>>,
    page: VecDeque<String>,
    last: Option<String>,
    exhausted: bool,
}

impl ObjectIterator {
    /// Iterate over `ctx`'s current namespace. `filter` is an encoded
    /// [`ObjectFilter`](rmb_store::ObjectFilter) blob.
    pub fn new(ctx: IoContext, filter: Option<Vec<u8>>) -> Self {
        Self {
            ctx,
            filter,
            page: VecDeque::new(),
            last: None,
            exhausted: false,
        }
    }

    pub fn namespace(&self) -> &str {
        self.ctx.namespace()
    }

    pub fn is_filtered(&self) -> bool {
        self.filter.is_some()
    }

    /// The next object id, or `None` once the namespace is exhausted.
    pub async fn next_oid(&mut self) -> StorageResult<Option<String>> {
        if self.page.is_empty() && !self.exhausted {
            self.fetch_page().await?;
        }
        let next = self.page.pop_front();
        if let Some(ref oid) = next {
            self.last = Some(oid.clone());
        }
        Ok(next)
    }

    /// Drain the remaining ids.
    pub async fn collect_all(mut self) -> StorageResult<Vec<String>> {
        let mut oids = Vec::new();
        while let Some(oid) = self.next_oid().await? {
            oids.push(oid);
        }
        Ok(oids)
    }

    /// Restart from the first object id.
    pub fn rewind(&mut self) {
        self.page.clear();
        self.last = None;
        self.exhausted = false;
    }

    async fn fetch_page(&mut self) -> StorageResult<()> {
        let oids = self
            .ctx
            .list_objects(self.filter.as_deref(), self.last.as_deref(), LIST_PAGE_SIZE)
            .await?;
        trace!(
            namespace = self.ctx.namespace(),
            fetched = oids.len(),
            "listed object page"
        );
        if oids.len() < LIST_PAGE_SIZE {
            self.exhausted = true;
        }
        self.page.extend(oids);
        Ok(())
    }
}
