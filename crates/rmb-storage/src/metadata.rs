use rmb_store::{errno, WriteOperation};
use rmb_types::Metadata;
use tracing::{debug, warn};

use crate::context::IoContext;
use crate::handle::OperationHandle;

/// Apply `attributes` to `oid` as one write operation and wait for it.
///
/// Entries are staged in order, so a repeated key ends up with its last
/// value. Returns `true` if the operation completed with a non-negative
/// code.
pub async fn apply_attributes(ctx: &IoContext, oid: &str, attributes: &[Metadata]) -> bool {
    let mut op = WriteOperation::new();
    op.set_metadata(attributes);

    let completion = match ctx.aio_operate(oid, &op) {
        Ok(c) => c,
        Err(e) => {
            warn!(oid, error = %e, "metadata update not submitted");
            return false;
        }
    };
    let code = OperationHandle::new(oid, completion, op).finish().await;
    debug!(oid, count = attributes.len(), code, "metadata updated");
    !errno::is_failure(code)
}
