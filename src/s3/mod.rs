//! S3 storage module
//!
//! This module provides:
//! - The [`ObjectStorage`] trait covering the smoke test operations
//! - [`S3Storage`], its implementation on top of the AWS SDK
//! - Plain result types decoupled from the SDK's output shapes

pub mod client;
pub mod storage;
pub mod types;

// Re-export main types for convenience
pub use client::{Result, S3Storage, StorageError};
pub use storage::ObjectStorage;
pub use types::{BucketEntry, ObjectEntry};
