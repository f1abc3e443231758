use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{StorageError, StorageResult};

pub const DEFAULT_POOL_NAME: &str = "mail_storage";
pub const DEFAULT_CLUSTER_NAME: &str = "ceph";
pub const DEFAULT_USER_NAME: &str = "client.admin";

const MIB: u64 = 1024 * 1024;

/// Connection settings for [`RadosStorage`](crate::RadosStorage).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub pool_name: String,
    /// Namespace the session is bound to after connecting. Empty is the
    /// pool's default namespace.
    pub namespace: String,
    /// Cluster and client the session connects as.
    pub cluster_name: String,
    pub user_name: String,
    /// Maximum single write in bytes. When unset, the cluster's
    /// `osd_max_write_size` is used.
    pub max_write_size_override: Option<u64>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            pool_name: DEFAULT_POOL_NAME.into(),
            namespace: String::new(),
            cluster_name: DEFAULT_CLUSTER_NAME.into(),
            user_name: DEFAULT_USER_NAME.into(),
            max_write_size_override: None,
        }
    }
}

impl StorageConfig {
    pub fn from_toml_str(s: &str) -> StorageResult<Self> {
        toml::from_str(s).map_err(|e| StorageError::Config(e.to_string()))
    }

    pub fn from_file(path: &Path) -> StorageResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn to_toml_string(&self) -> StorageResult<String> {
        toml::to_string(self).map_err(|e| StorageError::Config(e.to_string()))
    }
}

/// Parse the cluster's `osd_max_write_size` (MiB) into bytes.
///
/// Unparseable and non-positive values are configuration faults.
pub fn parse_max_write_size(raw: &str) -> StorageResult<u64> {
    let mb: i64 = raw
        .trim()
        .parse()
        .map_err(|_| StorageError::InvalidMaxWriteSize(raw.to_string()))?;
    if mb <= 0 {
        return Err(StorageError::InvalidMaxWriteSize(raw.to_string()));
    }
    (mb as u64)
        .checked_mul(MIB)
        .ok_or_else(|| StorageError::InvalidMaxWriteSize(raw.to_string()))
}
