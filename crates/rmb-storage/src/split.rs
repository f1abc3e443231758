use bytes::Bytes;
use rmb_store::WriteOperation;
use rmb_types::{TypeError, WritePlan};
use tracing::{debug, warn};

use crate::context::IoContext;
use crate::error::{StorageError, StorageResult};
use crate::handle::OperationHandle;
use crate::object::MailObject;

/// Write `buffer` to `target` in pieces of at most `max_write_size` bytes.
///
/// The first piece rides on `base_op`, so attribute updates already staged
/// there travel with it; every further piece gets its own operation. Each
/// submitted piece is tracked in `target`'s pending writes and must later be
/// drained with [`wait_all`](crate::wait_all).
///
/// Stops at the first submission that fails and returns its error. Pieces
/// already submitted stay pending on `target`; later pieces are not
/// attempted. A zero `max_write_size` is rejected before anything is
/// submitted. Returns the number of pieces submitted.
pub fn split_and_write(
    ctx: &IoContext,
    buffer: &Bytes,
    target: &mut MailObject,
    base_op: WriteOperation,
    max_write_size: u64,
) -> StorageResult<usize> {
    let plan = WritePlan::new(buffer.len() as u64, max_write_size).map_err(|e| match e {
        TypeError::ZeroWriteSize => StorageError::InvalidMaxWriteSize(max_write_size.to_string()),
        other => StorageError::Type(other),
    })?;
    debug!(
        oid = target.oid(),
        namespace = ctx.namespace(),
        len = buffer.len(),
        chunks = plan.len(),
        "splitting write"
    );

    let mut base_op = Some(base_op);
    let mut submitted = 0;
    for range in &plan {
        let mut op = base_op.take().unwrap_or_default();
        op.write(range.offset, buffer.slice(range.checked_range(buffer.len())?));

        let completion = ctx.aio_operate(target.oid(), &op).map_err(|e| {
            warn!(
                oid = target.oid(),
                offset = range.offset,
                submitted,
                error = %e,
                "chunk submission failed"
            );
            e
        })?;
        target.track(OperationHandle::new(target.oid(), completion, op));
        submitted += 1;
    }
    Ok(submitted)
}
