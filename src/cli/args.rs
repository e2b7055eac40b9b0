use clap::Parser;

use crate::config::Config;

/// s3smoke - smoke test checklist for S3-compatible object storage
#[derive(Parser, Debug)]
#[command(name = "s3smoke")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path (YAML)
    #[arg(long, env = "S3SMOKE_CONFIG")]
    pub config: Option<String>,

    /// Profile to use from config
    #[arg(long)]
    pub profile: Option<String>,

    /// S3 endpoint URL
    #[arg(long)]
    pub endpoint: Option<String>,

    /// AWS Access Key ID
    #[arg(long)]
    pub access_key: Option<String>,

    /// AWS Secret Access Key
    #[arg(long)]
    pub secret_key: Option<String>,

    /// AWS Region
    #[arg(long)]
    pub region: Option<String>,

    /// Bucket to create and use
    #[arg(long)]
    pub bucket: Option<String>,

    /// Key of the test object
    #[arg(long)]
    pub key: Option<String>,

    /// Output format (text, json)
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Flags take precedence over environment and config file values
    pub fn apply_overrides(&self, config: &mut Config) {
        let profile = config.active_profile_mut();
        if let Some(endpoint) = &self.endpoint {
            profile.endpoint = endpoint.clone();
        }
        if let Some(access_key) = &self.access_key {
            profile.access_key = access_key.clone();
        }
        if let Some(secret_key) = &self.secret_key {
            profile.secret_key = secret_key.clone();
        }
        if let Some(region) = &self.region {
            profile.region = region.clone();
        }

        if let Some(bucket) = &self.bucket {
            config.smoke.bucket = bucket.clone();
        }
        if let Some(key) = &self.key {
            config.smoke.object_key = key.clone();
        }
    }
}
