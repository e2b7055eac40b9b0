//! s3smoke - smoke test checklist for S3-compatible object storage

pub mod cli;
pub mod config;
pub mod core;
pub mod s3;

pub use config::Config;
pub use core::Core;
