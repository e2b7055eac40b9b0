use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::operation::create_bucket::CreateBucketError;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use aws_sdk_s3::Client;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::storage::ObjectStorage;
use super::types::{BucketEntry, ObjectEntry};
use crate::config::Profile;

/// Region that takes CreateBucket without a location constraint
const DEFAULT_REGION: &str = "us-east-1";

/// Provider name attached to the static credentials
const CREDENTIALS_PROVIDER: &str = "s3smoke-profile";

/// S3 client errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("bucket '{bucket}' already exists ({code})")]
    BucketAlreadyExists { bucket: String, code: String },

    #[error("S3 error: {code} - {message}")]
    Service { code: String, message: String },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("response body error: {0}")]
    Body(String),

    #[error("presigning error: {0}")]
    Presign(String),
}

impl StorageError {
    /// Whether this is the bucket-already-exists outcome of CreateBucket
    pub fn is_bucket_already_exists(&self) -> bool {
        matches!(self, StorageError::BucketAlreadyExists { .. })
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Classify an SDK failure by its structured error metadata
fn from_sdk<E, R>(err: SdkError<E, R>) -> StorageError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    if let Some(service) = err.as_service_error() {
        return StorageError::Service {
            code: service.code().unwrap_or("Unknown").to_string(),
            message: service.message().unwrap_or_default().to_string(),
        };
    }
    StorageError::Transport(DisplayErrorContext(&err).to_string())
}

fn is_already_exists(err: &CreateBucketError) -> bool {
    err.is_bucket_already_owned_by_you() || err.is_bucket_already_exists()
}

/// S3 storage backed by the AWS SDK
///
/// Clone is cheap - the SDK client uses Arc internally.
#[derive(Clone, Debug)]
pub struct S3Storage {
    client: Client,
    region: String,
}

impl S3Storage {
    /// Build a client for `profile`
    ///
    /// Credentials and region come from the profile only; nothing is read
    /// from the ambient AWS provider chain for them.
    pub async fn new(profile: &Profile) -> Self {
        let shared_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(profile.region.clone()))
            .endpoint_url(profile.endpoint.clone())
            .credentials_provider(Credentials::new(
                profile.access_key.clone(),
                profile.secret_key.clone(),
                None,
                None,
                CREDENTIALS_PROVIDER,
            ))
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared_config);
        if profile.force_path_style {
            builder = builder.force_path_style(true);
        }

        Self {
            client: Client::from_conf(builder.build()),
            region: profile.region.clone(),
        }
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    async fn list_buckets(&self) -> Result<Vec<BucketEntry>> {
        let output = self.client.list_buckets().send().await.map_err(from_sdk)?;

        let buckets = output
            .buckets()
            .iter()
            .map(|bucket| {
                let created = bucket
                    .creation_date()
                    .and_then(|dt| DateTime::<Utc>::from_timestamp(dt.secs(), dt.subsec_nanos()));
                BucketEntry::new(bucket.name().unwrap_or_default(), created)
            })
            .collect::<Vec<_>>();

        debug!(count = buckets.len(), "list_buckets");
        Ok(buckets)
    }

    async fn create_bucket(&self, bucket: &str) -> Result<()> {
        let mut request = self.client.create_bucket().bucket(bucket);
        if self.region != DEFAULT_REGION {
            let constraint = CreateBucketConfiguration::builder()
                .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                .build();
            request = request.create_bucket_configuration(constraint);
        }

        match request.send().await {
            Ok(_) => {
                debug!(bucket = %bucket, "create_bucket");
                Ok(())
            }
            Err(err) => match err.as_service_error() {
                Some(service) if is_already_exists(service) => {
                    Err(StorageError::BucketAlreadyExists {
                        bucket: bucket.to_string(),
                        code: service.code().unwrap_or("BucketAlreadyExists").to_string(),
                    })
                }
                _ => Err(from_sdk(err)),
            },
        }
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<()> {
        let size = body.len();
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(from_sdk)?;

        debug!(bucket = %bucket, key = %key, size, "put_object");
        Ok(())
    }

    async fn list_objects(&self, bucket: &str) -> Result<Vec<ObjectEntry>> {
        let mut objects = Vec::new();
        let mut continuation_token = None;

        loop {
            let output = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .set_continuation_token(continuation_token.take())
                .send()
                .await
                .map_err(from_sdk)?;

            objects.extend(output.contents().iter().map(|obj| {
                ObjectEntry::new(
                    obj.key().unwrap_or_default(),
                    obj.size().unwrap_or_default().max(0) as u64,
                )
            }));

            match output.next_continuation_token() {
                Some(token) if output.is_truncated().unwrap_or(false) => {
                    continuation_token = Some(token.to_string());
                }
                _ => break,
            }
        }

        debug!(bucket = %bucket, count = objects.len(), "list_objects");
        Ok(objects)
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(from_sdk)?;

        let body = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Body(e.to_string()))?
            .into_bytes();

        debug!(bucket = %bucket, key = %key, size = body.len(), "get_object");
        Ok(body)
    }

    async fn presign_get_object(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String> {
        let presigning =
            PresigningConfig::expires_in(expires_in).map_err(|e| StorageError::Presign(e.to_string()))?;

        let request = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(from_sdk)?;

        Ok(request.uri().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::config::retry::RetryConfig;
    use aws_smithy_runtime::client::http::test_util::{ReplayEvent, StaticReplayClient};
    use aws_smithy_types::body::SdkBody;

    fn local_profile() -> Profile {
        Profile {
            endpoint: "http://localhost:9000".to_string(),
            access_key: "AKIATEST".to_string(),
            secret_key: "secrettest".to_string(),
            ..Profile::default()
        }
    }

    #[tokio::test]
    async fn test_presign_is_local() {
        let storage = S3Storage::new(&local_profile()).await;

        let url = storage
            .presign_get_object("smoke-bucket", "probe.txt", Duration::from_secs(3600))
            .await
            .unwrap();

        assert!(url.starts_with("http://localhost:9000/smoke-bucket/probe.txt?"));
        assert!(url.contains("X-Amz-Algorithm=AWS4-HMAC-SHA256"));
        assert!(url.contains("X-Amz-Expires=3600"));
        assert!(url.contains("X-Amz-Credential=AKIATEST"));
    }

    #[tokio::test]
    async fn test_presign_rejects_excessive_expiry() {
        let storage = S3Storage::new(&local_profile()).await;

        // SigV4 caps presigned URLs at one week
        let err = storage
            .presign_get_object("b", "k", Duration::from_secs(8 * 24 * 3600))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Presign(_)));
    }

    /// Storage whose HTTP layer answers with canned `(status, body)` pairs
    fn replay_storage(region: &str, responses: Vec<(u16, &str)>) -> S3Storage {
        let events = responses
            .into_iter()
            .map(|(status, body)| {
                ReplayEvent::new(
                    http::Request::builder()
                        .uri("http://localhost:9000/")
                        .body(SdkBody::empty())
                        .unwrap(),
                    http::Response::builder()
                        .status(status)
                        .body(SdkBody::from(body.to_string()))
                        .unwrap(),
                )
            })
            .collect();

        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .endpoint_url("http://localhost:9000")
            .force_path_style(true)
            .credentials_provider(Credentials::new("AKIATEST", "secrettest", None, None, "test"))
            .retry_config(RetryConfig::disabled())
            .http_client(StaticReplayClient::new(events))
            .build();

        S3Storage {
            client: Client::from_conf(config),
            region: region.to_string(),
        }
    }

    fn error_xml(code: &str, message: &str) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <Error><Code>{}</Code><Message>{}</Message>\
             <BucketName>smoke-bucket</BucketName><RequestId>4442587FB7D0A2F9</RequestId></Error>",
            code, message
        )
    }

    #[tokio::test]
    async fn test_create_bucket_owned_by_you() {
        let body = error_xml(
            "BucketAlreadyOwnedByYou",
            "Your previous request to create the named bucket succeeded and you already own it.",
        );
        let storage = replay_storage(DEFAULT_REGION, vec![(409, body.as_str())]);

        let err = storage.create_bucket("smoke-bucket").await.unwrap_err();
        match err {
            StorageError::BucketAlreadyExists { bucket, code } => {
                assert_eq!(bucket, "smoke-bucket");
                assert_eq!(code, "BucketAlreadyOwnedByYou");
            }
            other => panic!("expected BucketAlreadyExists, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_bucket_taken_by_another_account() {
        let body = error_xml(
            "BucketAlreadyExists",
            "The requested bucket name is not available.",
        );
        let storage = replay_storage("eu-west-1", vec![(409, body.as_str())]);

        let err = storage.create_bucket("smoke-bucket").await.unwrap_err();
        assert!(err.is_bucket_already_exists());
    }

    #[tokio::test]
    async fn test_create_bucket_other_code_is_not_tolerated() {
        let body = error_xml("AccessDenied", "BucketAlreadyExists is not what happened here");
        let storage = replay_storage(DEFAULT_REGION, vec![(403, body.as_str())]);

        let err = storage.create_bucket("smoke-bucket").await.unwrap_err();
        assert!(!err.is_bucket_already_exists());
        match err {
            StorageError::Service { code, message } => {
                assert_eq!(code, "AccessDenied");
                assert!(message.contains("BucketAlreadyExists"));
            }
            other => panic!("expected Service, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_list_objects_follows_continuation_token() {
        let first = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Name>smoke-bucket</Name><Prefix></Prefix><KeyCount>2</KeyCount><MaxKeys>2</MaxKeys>
  <IsTruncated>true</IsTruncated>
  <NextContinuationToken>page-2</NextContinuationToken>
  <Contents><Key>a.txt</Key><Size>3</Size></Contents>
  <Contents><Key>b.txt</Key><Size>5</Size></Contents>
</ListBucketResult>"#;
        let second = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Name>smoke-bucket</Name><Prefix></Prefix><KeyCount>1</KeyCount><MaxKeys>2</MaxKeys>
  <IsTruncated>false</IsTruncated>
  <Contents><Key>test-file.txt</Key><Size>40</Size></Contents>
</ListBucketResult>"#;
        let storage = replay_storage(DEFAULT_REGION, vec![(200, first), (200, second)]);

        let objects = storage.list_objects("smoke-bucket").await.unwrap();
        assert_eq!(
            objects,
            vec![
                ObjectEntry::new("a.txt", 3),
                ObjectEntry::new("b.txt", 5),
                ObjectEntry::new("test-file.txt", 40),
            ]
        );
    }

    #[tokio::test]
    async fn test_connection_failure_is_transport() {
        let storage = replay_storage(DEFAULT_REGION, vec![]);

        let err = storage.list_buckets().await.unwrap_err();
        assert!(matches!(err, StorageError::Transport(_)), "got {:?}", err);
    }
}
