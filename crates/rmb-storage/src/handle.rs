use rmb_store::{Completion, ReturnCode, WriteOperation};

/// An in-flight write: its completion token paired with the operation it
/// was submitted for.
///
/// [`OperationHandle::finish`] consumes the handle, so it is waited on and
/// released exactly once.
#[derive(Debug)]
#[must_use = "an operation handle must be finished to observe its result"]
pub struct OperationHandle {
    oid: String,
    completion: Completion,
    op: WriteOperation,
}

impl OperationHandle {
    pub fn new(oid: impl Into<String>, completion: Completion, op: WriteOperation) -> Self {
        Self {
            oid: oid.into(),
            completion,
            op,
        }
    }

    /// The object the operation targets.
    pub fn oid(&self) -> &str {
        &self.oid
    }

    pub fn operation(&self) -> &WriteOperation {
        &self.op
    }

    /// Wait for completion, release the token and the operation, and return
    /// the operation's return code.
    pub async fn finish(mut self) -> ReturnCode {
        let code = self.completion.wait().await;
        let Self { completion, op, .. } = self;
        completion.release();
        drop(op);
        code
    }
}
