//! S3 types returned by the storage operations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Bucket listed by ListBuckets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketEntry {
    /// Bucket name
    pub name: String,
    /// Creation timestamp, when the server reports one
    pub creation_date: Option<DateTime<Utc>>,
}

impl BucketEntry {
    /// Create a new BucketEntry
    pub fn new(name: impl Into<String>, creation_date: Option<DateTime<Utc>>) -> Self {
        Self {
            name: name.into(),
            creation_date,
        }
    }
}

/// Object listed by ListObjectsV2
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectEntry {
    /// Object key
    pub key: String,
    /// Object size in bytes
    pub size: u64,
}

impl ObjectEntry {
    /// Create a new ObjectEntry
    pub fn new(key: impl Into<String>, size: u64) -> Self {
        Self {
            key: key.into(),
            size,
        }
    }
}
