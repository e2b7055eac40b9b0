use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

use super::client::Result;
use super::types::{BucketEntry, ObjectEntry};

/// The storage operations exercised by the smoke test
///
/// Implemented by [`super::S3Storage`] for real endpoints. Each call is a
/// single request to the service; callers await one before issuing the next.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// List all buckets owned by the caller
    async fn list_buckets(&self) -> Result<Vec<BucketEntry>>;

    /// Create `bucket`
    ///
    /// Returns [`super::StorageError::BucketAlreadyExists`] when the service
    /// reports the bucket as already present.
    async fn create_bucket(&self, bucket: &str) -> Result<()>;

    /// Store `body` under `bucket/key`
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<()>;

    /// List every object in `bucket`, in key order
    async fn list_objects(&self, bucket: &str) -> Result<Vec<ObjectEntry>>;

    /// Fetch the full body of `bucket/key`
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes>;

    /// Build a presigned GET URL for `bucket/key` valid for `expires_in`
    async fn presign_get_object(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String>;
}
