//! Per-step outcomes of a smoke test run

use serde::Serialize;
use std::fmt;

use crate::s3::{BucketEntry, ObjectEntry};

/// Checklist steps, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    ListBuckets,
    CreateBucket,
    PutObject,
    ListObjects,
    GetObject,
    PresignUrl,
}

impl Step {
    pub const ALL: [Step; 6] = [
        Step::ListBuckets,
        Step::CreateBucket,
        Step::PutObject,
        Step::ListObjects,
        Step::GetObject,
        Step::PresignUrl,
    ];

    /// 1-based position in the checklist
    pub fn number(self) -> usize {
        Self::ALL.iter().position(|s| *s == self).unwrap_or(0) + 1
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::ListBuckets => write!(f, "list buckets"),
            Step::CreateBucket => write!(f, "create bucket"),
            Step::PutObject => write!(f, "upload object"),
            Step::ListObjects => write!(f, "list objects"),
            Step::GetObject => write!(f, "download object"),
            Step::PresignUrl => write!(f, "presign URL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Passed,
    /// Failed in a way the checklist accepts (bucket already exists)
    Tolerated,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub step: Step,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Everything a run observed, rendered as JSON with `--format json`
#[derive(Debug, Clone, Default, Serialize)]
pub struct SmokeReport {
    pub endpoint: String,
    pub bucket: String,
    pub object_key: String,
    pub steps: Vec<StepOutcome>,
    pub buckets: Vec<BucketEntry>,
    pub objects: Vec<ObjectEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presigned_url: Option<String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SmokeReport {
    pub fn new(endpoint: &str, bucket: &str, object_key: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            bucket: bucket.to_string(),
            object_key: object_key.to_string(),
            ..Self::default()
        }
    }

    pub fn record(&mut self, step: Step, status: StepStatus, detail: Option<String>) {
        self.steps.push(StepOutcome {
            step,
            status,
            detail,
        });
    }

    /// Status of `step`, if it ran
    pub fn status(&self, step: Step) -> Option<StepStatus> {
        self.steps.iter().find(|o| o.step == step).map(|o| o.status)
    }

    /// Whether every step ran and none failed
    pub fn all_passed(&self) -> bool {
        self.steps.len() == Step::ALL.len()
            && self.steps.iter().all(|o| o.status != StepStatus::Failed)
    }
}
