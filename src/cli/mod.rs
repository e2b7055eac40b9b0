//! CLI module for s3smoke
//!
//! Runs a fixed checklist against an S3-compatible endpoint and reports the
//! outcome of each step:
//!
//! 1. list buckets
//! 2. create the test bucket (an existing bucket is accepted)
//! 3. upload the test object
//! 4. list the bucket's objects
//! 5. download the object and compare it with the upload
//! 6. generate a presigned GET URL
//!
//! # Usage
//!
//! ```bash
//! # Local MinIO with default credentials
//! s3smoke
//!
//! # Remote endpoint, machine-readable report
//! s3smoke --endpoint https://oss.example.com:19000 --format json
//!
//! # Named profile from a config file
//! s3smoke --config smoke.yaml --profile staging
//! ```

pub mod args;
pub mod commands;
pub mod report;

use anyhow::{Context, Result};
use std::io::Write;
use tracing::{debug, error};

pub use args::{Cli, OutputFormat};
use report::SmokeReport;

use crate::config;
use crate::core::Core;

/// Run the checklist described by `cli`, writing results to `out`
///
/// Returns whether every step passed. Failures are reported on `out` (as a
/// `Test failed:` line, or inside the JSON report) and never propagated.
pub async fn execute<W: Write>(cli: &Cli, out: &mut W) -> bool {
    let mut report = SmokeReport::default();
    let mut sink = std::io::sink();

    let progress: &mut dyn Write = match cli.format {
        OutputFormat::Text => &mut *out,
        OutputFormat::Json => &mut sink,
    };
    let result = run_smoke(cli, progress, &mut report).await;

    conclude(&mut report, &result);

    let printed = match cli.format {
        OutputFormat::Text => match &result {
            Ok(()) => writeln!(out, "All tests passed! Object storage service is working."),
            Err(err) => writeln!(out, "Test failed: {:#}", err),
        },
        OutputFormat::Json => serde_json::to_writer_pretty(&mut *out, &report)
            .map_err(std::io::Error::from)
            .and_then(|()| writeln!(out)),
    };
    if let Err(err) = printed {
        error!(error = %err, "failed to write report");
        return false;
    }

    report.success
}

/// Settle the report's verdict from the recorded steps and the run result
fn conclude(report: &mut SmokeReport, result: &Result<()>) {
    report.success = result.is_ok() && report.all_passed();
    if let Err(err) = result {
        error!(error = %format!("{:#}", err), "smoke test failed");
        report.error = Some(format!("{:#}", err));
    }
}

async fn run_smoke(cli: &Cli, out: &mut dyn Write, report: &mut SmokeReport) -> Result<()> {
    // Priority: CLI args > environment variables > config file > defaults
    let mut config = config::load_config(cli.config.as_deref(), cli.profile.as_deref())
        .context("Failed to load configuration")?;
    config::apply_env(&mut config);
    cli.apply_overrides(&mut config);
    debug!("Configuration: {:?}", config.smoke);

    let endpoint = config
        .get_profile(None)
        .map(|p| p.endpoint.clone())
        .unwrap_or_default();
    *report = SmokeReport::new(&endpoint, &config.smoke.bucket, &config.smoke.object_key);

    let core = Core::new(config)
        .await
        .context("Failed to initialize storage client")?;
    let profile = core.profile();

    writeln!(out, "=== Connecting to object storage ===")?;
    writeln!(out, "Endpoint: {}", profile.endpoint)?;
    writeln!(out, "Access Key: {}", profile.access_key)?;
    writeln!(out)?;

    commands::run_checklist(core.storage(), &core.config.smoke, out, report).await?;

    Ok(())
}

/// Initialize logging on stderr; `RUST_LOG` takes precedence over `level`
pub fn init_logging(level: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}
