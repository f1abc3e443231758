use std::fmt;

use serde::{Deserialize, Serialize};

/// An object identifier qualified by the namespace it lives in.
///
/// The empty namespace is the pool's default namespace. Two locators with
/// the same `oid` in different namespaces name different objects.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectLocator {
    pub namespace: String,
    pub oid: String,
}

impl ObjectLocator {
    /// Create a locator for `oid` inside `namespace`.
    pub fn new(namespace: impl Into<String>, oid: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            oid: oid.into(),
        }
    }

    /// Create a locator in the default (empty) namespace.
    pub fn in_default(oid: impl Into<String>) -> Self {
        Self::new(String::new(), oid)
    }

    /// Returns `true` if the locator targets the default namespace.
    pub fn is_default_namespace(&self) -> bool {
        self.namespace.is_empty()
    }
}

impl fmt::Display for ObjectLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.oid)
        } else {
            write!(f, "{}/{}", self.namespace, self.oid)
        }
    }
}
