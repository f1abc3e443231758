//! Scoped namespace binding.
//!
//! A session is temporarily bound to a non-default namespace for a lookup or
//! write and must return to the default namespace afterwards, whichever way
//! the body exits. [`NamespaceScope`] restores it on drop, so early returns,
//! `?` and unwinding panics are all covered.

use std::ops::{Deref, DerefMut};

use tracing::trace;

use crate::context::IoContext;

/// The default namespace.
pub const DEFAULT_NAMESPACE: &str = "";

/// Guard binding an [`IoContext`] to a namespace until dropped.
#[must_use = "the namespace is restored as soon as the scope is dropped"]
pub struct NamespaceScope<'a> {
    ctx: &'a mut IoContext,
}

impl<'a> NamespaceScope<'a> {
    pub fn new(ctx: &'a mut IoContext, namespace: &str) -> Self {
        trace!(from = ctx.namespace(), to = namespace, "entering namespace scope");
        ctx.set_namespace(namespace);
        Self { ctx }
    }
}

impl Deref for NamespaceScope<'_> {
    type Target = IoContext;

    fn deref(&self) -> &IoContext {
        self.ctx
    }
}

impl DerefMut for NamespaceScope<'_> {
    fn deref_mut(&mut self) -> &mut IoContext {
        self.ctx
    }
}

impl Drop for NamespaceScope<'_> {
    fn drop(&mut self) {
        self.ctx.set_namespace(DEFAULT_NAMESPACE);
    }
}

impl IoContext {
    /// Bind to `namespace` until the returned guard is dropped.
    ///
    /// Usable across `.await` points.
    pub fn scoped_namespace(&mut self, namespace: &str) -> NamespaceScope<'_> {
        NamespaceScope::new(self, namespace)
    }

    /// Run `body` bound to `namespace`, then restore the default namespace.
    pub fn with_namespace<R, F>(&mut self, namespace: &str, body: F) -> R
    where
        F: FnOnce(&mut IoContext) -> R,
    {
        let mut scope = self.scoped_namespace(namespace);
        body(&mut scope)
    }
}
