use rmb_types::{Metadata, MetadataSet};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Name of the equality filter understood by the object listing.
pub const PLAIN_FILTER_NAME: &str = "plain";

/// Prefix the store puts in front of user attribute names.
pub const XATTR_PREFIX: char = '_';

/// Server-side filter for object enumeration.
///
/// Travels across the backend boundary as an opaque encoded blob; only the
/// backend decodes it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectFilter {
    pub name: String,
    pub xattr: String,
    pub value: Vec<u8>,
}

impl ObjectFilter {
    /// An equality filter on one user attribute.
    pub fn plain(attr: &Metadata) -> Self {
        Self {
            name: PLAIN_FILTER_NAME.to_string(),
            xattr: format!("{XATTR_PREFIX}{}", attr.key),
            value: attr.value.clone(),
        }
    }

    pub fn encode(&self) -> StoreResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| StoreError::InvalidFilter(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> StoreResult<Self> {
        bincode::deserialize(bytes).map_err(|e| StoreError::InvalidFilter(e.to_string()))
    }

    /// Evaluate the filter against an object's attribute set.
    pub fn matches(&self, attributes: &MetadataSet) -> StoreResult<bool> {
        if self.name != PLAIN_FILTER_NAME {
            return Err(StoreError::InvalidFilter(format!(
                "unsupported filter: {}",
                self.name
            )));
        }
        let key = self.xattr.strip_prefix(XATTR_PREFIX).unwrap_or(&self.xattr);
        Ok(attributes.get(key) == Some(self.value.as_slice()))
    }
}
