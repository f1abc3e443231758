use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::oneshot;

use crate::errno::{self, ReturnCode};

/// Counts completion tokens created and released by a backend.
///
/// A release is either waited (the code was observed first) or abandoned
/// (the token was dropped while the operation's outcome was still unseen).
#[derive(Debug, Default)]
pub struct CompletionTracker {
    created: AtomicUsize,
    released: AtomicUsize,
    waited: AtomicUsize,
}

impl CompletionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tokens handed out so far.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Tokens released so far.
    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// Tokens released after their return code was observed.
    pub fn waited(&self) -> usize {
        self.waited.load(Ordering::SeqCst)
    }

    /// Tokens released without ever being waited on.
    pub fn abandoned(&self) -> usize {
        self.released().saturating_sub(self.waited())
    }

    /// Tokens handed out and not yet released.
    pub fn outstanding(&self) -> usize {
        self.created().saturating_sub(self.released())
    }
}

/// Backend side of a completion: fires the return code exactly once.
#[derive(Debug)]
pub struct CompletionNotifier {
    tx: oneshot::Sender<ReturnCode>,
}

impl CompletionNotifier {
    /// Deliver the return code. A waiter that already went away is ignored.
    pub fn complete(self, code: ReturnCode) {
        let _ = self.tx.send(code);
    }
}

/// Caller side of an in-flight operation.
///
/// Waiting yields the operation's return code (negative on failure). The
/// token is released when it is dropped or passed to [`Completion::release`];
/// ownership makes a second release impossible.
#[derive(Debug)]
pub struct Completion {
    rx: Option<oneshot::Receiver<ReturnCode>>,
    code: Option<ReturnCode>,
    tracker: Arc<CompletionTracker>,
}

impl Completion {
    /// Create a linked notifier/completion pair, counted by `tracker`.
    pub fn pair(tracker: &Arc<CompletionTracker>) -> (CompletionNotifier, Completion) {
        let (tx, rx) = oneshot::channel();
        tracker.created.fetch_add(1, Ordering::SeqCst);
        (
            CompletionNotifier { tx },
            Completion {
                rx: Some(rx),
                code: None,
                tracker: Arc::clone(tracker),
            },
        )
    }

    /// Suspend until the operation completes and return its code.
    ///
    /// Waiting again returns the cached code. If the backend dropped the
    /// notifier without firing it, the code is `-EIO`. There is no timeout.
    pub async fn wait(&mut self) -> ReturnCode {
        if let Some(code) = self.code {
            return code;
        }
        let code = match self.rx.take() {
            Some(rx) => rx.await.unwrap_or(-errno::EIO),
            None => -errno::EIO,
        };
        self.code = Some(code);
        code
    }

    /// Release the token.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if self.code.is_some() {
            self.tracker.waited.fetch_add(1, Ordering::SeqCst);
        }
        self.tracker.released.fetch_add(1, Ordering::SeqCst);
    }
}
