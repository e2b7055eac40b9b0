use anyhow::{Context, Result};
use std::sync::Arc;

use crate::config::{Config, Profile};
use crate::s3::S3Storage;

/// Resolved configuration plus the storage client built from it
///
/// The client is created once; clones share the SDK's HTTP connection pool.
#[derive(Clone)]
pub struct Core {
    pub config: Arc<Config>,
    profile: Profile,
    storage: S3Storage,
}

impl Core {
    pub async fn new(config: Config) -> Result<Self> {
        let profile = config
            .get_profile(None)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("No profile found in configuration"))?;

        profile
            .validate()
            .context("Invalid connection profile")?;

        tracing::info!(
            endpoint = %profile.endpoint,
            region = %profile.region,
            path_style = profile.force_path_style,
            "connecting"
        );

        let storage = S3Storage::new(&profile).await;

        Ok(Self {
            config: Arc::new(config),
            profile,
            storage,
        })
    }

    /// Profile the client was built from
    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Shared storage client
    pub fn storage(&self) -> &S3Storage {
        &self.storage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_core_rejects_unsupported_signature() {
        let mut config = Config::new();
        config.active_profile_mut().signature_version = "s3".to_string();

        let err = Core::new(config).await.err().unwrap();
        assert!(format!("{:#}", err).contains("Unsupported signature version"));
    }

    #[tokio::test]
    async fn test_core_uses_default_profile() {
        let core = Core::new(Config::new()).await.unwrap();
        assert_eq!(core.profile().endpoint, "http://localhost:9000");
        assert_eq!(core.config.smoke.bucket, "test-bucket-remote");
    }
}
