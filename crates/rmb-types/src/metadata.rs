use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single object attribute: string key, arbitrary byte-string value.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Metadata {
    pub key: String,
    pub value: Vec<u8>,
}

impl Metadata {
    /// Create an attribute from a key and any byte-like value.
    pub fn new(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// The value as UTF-8, if it is valid UTF-8.
    pub fn value_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.value).ok()
    }
}

impl fmt::Debug for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Metadata({self})")
    }
}

impl fmt::Display for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value_str() {
            Some(s) => write!(f, "{}={}", self.key, s),
            None => write!(f, "{}=0x{}", self.key, hex::encode(&self.value)),
        }
    }
}

/// The attribute set attached to an object.
///
/// Keys are unique. Inserting an existing key overwrites its value; there
/// are no partial-key writes. Callers must not rely on iteration order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataSet {
    entries: BTreeMap<String, Vec<u8>>,
}

impl MetadataSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite one attribute. Returns the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Option<Vec<u8>> {
        self.entries.insert(key.into(), value.into())
    }

    /// Apply a sequence of attributes in order; later entries win.
    pub fn apply<'a, I>(&mut self, attributes: I)
    where
        I: IntoIterator<Item = &'a Metadata>,
    {
        for attr in attributes {
            self.entries.insert(attr.key.clone(), attr.value.clone());
        }
    }

    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    pub fn remove(&mut self, key: &str) -> Option<Vec<u8>> {
        self.entries.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterate over `(key, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Materialize the set as a list of attributes.
    pub fn to_vec(&self) -> Vec<Metadata> {
        self.iter().map(|(k, v)| Metadata::new(k, v)).collect()
    }
}

impl FromIterator<Metadata> for MetadataSet {
    fn from_iter<T: IntoIterator<Item = Metadata>>(iter: T) -> Self {
        let mut set = MetadataSet::new();
        for attr in iter {
            set.entries.insert(attr.key, attr.value);
        }
        set
    }
}

impl Extend<Metadata> for MetadataSet {
    fn extend<T: IntoIterator<Item = Metadata>>(&mut self, iter: T) {
        for attr in iter {
            self.entries.insert(attr.key, attr.value);
        }
    }
}
