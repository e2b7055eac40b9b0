use bytes::Bytes;
use std::io::Write;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use super::report::{SmokeReport, Step, StepStatus};
use crate::config::SmokeConfig;
use crate::s3::{BucketEntry, ObjectEntry, ObjectStorage, StorageError};

/// Failures that abort the checklist
#[derive(Error, Debug)]
pub enum SmokeError {
    #[error("{step} failed: {error}")]
    Storage { step: Step, error: StorageError },

    #[error("downloaded content differs from upload ({actual} bytes received, {expected} bytes sent)")]
    RoundTripMismatch { expected: usize, actual: usize },

    #[error("presigned URL does not reference {bucket}/{key}: '{url}'")]
    InvalidPresignedUrl {
        url: String,
        bucket: String,
        key: String,
    },

    #[error("failed to write output")]
    Output(#[from] std::io::Error),
}

impl SmokeError {
    fn storage(step: Step) -> impl FnOnce(StorageError) -> SmokeError {
        move |error| SmokeError::Storage { step, error }
    }
}

pub type Result<T> = std::result::Result<T, SmokeError>;

/// Run the full checklist in order, stopping at the first failure
///
/// Progress is written to `out` as it happens; every step's outcome is
/// recorded in `report`, including the one that failed.
pub async fn run_checklist<S>(
    storage: &S,
    settings: &SmokeConfig,
    out: &mut dyn Write,
    report: &mut SmokeReport,
) -> Result<()>
where
    S: ObjectStorage + ?Sized,
{
    for step in Step::ALL {
        let result = match step {
            Step::ListBuckets => cmd_list_buckets(storage, out, report).await,
            Step::CreateBucket => cmd_create_bucket(storage, settings, out).await,
            Step::PutObject => cmd_put_object(storage, settings, out).await,
            Step::ListObjects => cmd_list_objects(storage, settings, out, report).await,
            Step::GetObject => cmd_get_object(storage, settings, out, report).await,
            Step::PresignUrl => cmd_presign_url(storage, settings, out, report).await,
        };

        match result {
            Ok(status) => report.record(step, status, None),
            Err(err) => {
                report.record(step, StepStatus::Failed, Some(err.to_string()));
                return Err(err);
            }
        }
        writeln!(out)?;
    }

    Ok(())
}

/// Step 1: list buckets
pub async fn cmd_list_buckets<S>(
    storage: &S,
    out: &mut dyn Write,
    report: &mut SmokeReport,
) -> Result<StepStatus>
where
    S: ObjectStorage + ?Sized,
{
    writeln!(out, "=== {}. List all buckets ===", Step::ListBuckets.number())?;

    let buckets = storage
        .list_buckets()
        .await
        .map_err(SmokeError::storage(Step::ListBuckets))?;

    if buckets.is_empty() {
        writeln!(out, "  No buckets found")?;
    }
    for bucket in &buckets {
        writeln!(out, "  - {} (created: {})", bucket.name, format_creation_date(bucket))?;
    }

    report.buckets = buckets;
    Ok(StepStatus::Passed)
}

/// Step 2: create the bucket, accepting one that already exists
pub async fn cmd_create_bucket<S>(
    storage: &S,
    settings: &SmokeConfig,
    out: &mut dyn Write,
) -> Result<StepStatus>
where
    S: ObjectStorage + ?Sized,
{
    let bucket = &settings.bucket;
    writeln!(out, "=== {}. Create bucket: {} ===", Step::CreateBucket.number(), bucket)?;

    match storage.create_bucket(bucket).await {
        Ok(()) => {
            writeln!(out, "OK: Bucket '{}' created", bucket)?;
            Ok(StepStatus::Passed)
        }
        Err(err) if err.is_bucket_already_exists() => {
            info!(bucket = %bucket, error = %err, "bucket already exists");
            writeln!(out, "INFO: Bucket '{}' already exists, continuing", bucket)?;
            Ok(StepStatus::Tolerated)
        }
        Err(error) => Err(SmokeError::Storage {
            step: Step::CreateBucket,
            error,
        }),
    }
}

/// Step 3: upload the test payload
pub async fn cmd_put_object<S>(
    storage: &S,
    settings: &SmokeConfig,
    out: &mut dyn Write,
) -> Result<StepStatus>
where
    S: ObjectStorage + ?Sized,
{
    writeln!(out, "=== {}. Upload test object ===", Step::PutObject.number())?;

    let body = Bytes::from(settings.payload.clone().into_bytes());
    let size = body.len();
    storage
        .put_object(&settings.bucket, &settings.object_key, body, &settings.content_type)
        .await
        .map_err(SmokeError::storage(Step::PutObject))?;

    writeln!(out, "OK: Object '{}' uploaded ({} bytes)", settings.object_key, size)?;
    Ok(StepStatus::Passed)
}

/// Step 4: list the bucket's objects
pub async fn cmd_list_objects<S>(
    storage: &S,
    settings: &SmokeConfig,
    out: &mut dyn Write,
    report: &mut SmokeReport,
) -> Result<StepStatus>
where
    S: ObjectStorage + ?Sized,
{
    writeln!(
        out,
        "=== {}. List objects in bucket '{}' ===",
        Step::ListObjects.number(),
        settings.bucket
    )?;

    let objects = storage
        .list_objects(&settings.bucket)
        .await
        .map_err(SmokeError::storage(Step::ListObjects))?;

    if objects.is_empty() {
        writeln!(out, "  Bucket is empty")?;
    }
    for obj in &objects {
        writeln!(out, "  - {} ({} bytes)", obj.key, obj.size)?;
    }

    // Listings may lag behind writes on some servers; report, don't abort
    if !lists_uploaded_object(&objects, &settings.object_key, settings.payload.len() as u64) {
        warn!(
            bucket = %settings.bucket,
            key = %settings.object_key,
            expected_size = settings.payload.len(),
            "uploaded object missing from listing or size differs"
        );
    }

    report.objects = objects;
    Ok(StepStatus::Passed)
}

/// Step 5: download the object and compare it with the upload
pub async fn cmd_get_object<S>(
    storage: &S,
    settings: &SmokeConfig,
    out: &mut dyn Write,
    report: &mut SmokeReport,
) -> Result<StepStatus>
where
    S: ObjectStorage + ?Sized,
{
    writeln!(
        out,
        "=== {}. Download object '{}' ===",
        Step::GetObject.number(),
        settings.object_key
    )?;

    let body = storage
        .get_object(&settings.bucket, &settings.object_key)
        .await
        .map_err(SmokeError::storage(Step::GetObject))?;

    let content = String::from_utf8_lossy(&body).into_owned();
    writeln!(out, "Content:")?;
    writeln!(out, "{}", content)?;
    report.content = Some(content);

    if &body[..] != settings.payload.as_bytes() {
        return Err(SmokeError::RoundTripMismatch {
            expected: settings.payload.len(),
            actual: body.len(),
        });
    }

    Ok(StepStatus::Passed)
}

/// Step 6: presign a GET for the object
pub async fn cmd_presign_url<S>(
    storage: &S,
    settings: &SmokeConfig,
    out: &mut dyn Write,
    report: &mut SmokeReport,
) -> Result<StepStatus>
where
    S: ObjectStorage + ?Sized,
{
    writeln!(
        out,
        "=== {}. Generate presigned URL (expires in {}s) ===",
        Step::PresignUrl.number(),
        settings.presign_expiry_secs
    )?;

    let url = storage
        .presign_get_object(
            &settings.bucket,
            &settings.object_key,
            Duration::from_secs(settings.presign_expiry_secs),
        )
        .await
        .map_err(SmokeError::storage(Step::PresignUrl))?;

    writeln!(out, "Presigned URL: {}", url)?;

    if !presigned_url_targets(&url, &settings.bucket, &settings.object_key) {
        return Err(SmokeError::InvalidPresignedUrl {
            url,
            bucket: settings.bucket.clone(),
            key: settings.object_key.clone(),
        });
    }

    report.presigned_url = Some(url);
    Ok(StepStatus::Passed)
}

// ============================================================================
// Utility functions
// ============================================================================

/// Format a bucket creation date as [YYYY-MM-DD HH:MM:SS UTC]
pub fn format_creation_date(bucket: &BucketEntry) -> String {
    bucket
        .creation_date
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Whether `objects` holds exactly one entry for `key`, of `size` bytes
pub fn lists_uploaded_object(objects: &[ObjectEntry], key: &str, size: u64) -> bool {
    let mut matching = objects.iter().filter(|obj| obj.key == key);
    matches!((matching.next(), matching.next()), (Some(obj), None) if obj.size == size)
}

/// Whether `url` addresses `bucket/key`, path-style or virtual-hosted
///
/// The endpoint may carry a path prefix, so only the path suffix is compared.
/// The path is taken from the raw string; `Url` would collapse dot segments
/// that are part of the key.
pub fn presigned_url_targets(url: &str, bucket: &str, key: &str) -> bool {
    let Ok(parsed) = url::Url::parse(url) else {
        return false;
    };
    let Some(path) = raw_path(url) else {
        return false;
    };
    let Ok(path) = urlencoding::decode(path) else {
        return false;
    };

    if path.ends_with(&format!("/{}/{}", bucket, key)) {
        return true;
    }

    let host = parsed.host_str().unwrap_or_default();
    host.starts_with(&format!("{}.", bucket)) && path.ends_with(&format!("/{}", key))
}

/// Path component of an absolute URL, exactly as written
fn raw_path(url: &str) -> Option<&str> {
    let (_, rest) = url.split_once("://")?;
    let rest = rest.split(['?', '#']).next().unwrap_or_default();
    rest.find('/').map(|start| &rest[start..])
}
