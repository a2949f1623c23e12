//! Event schema for job progress.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const EVENT_JOB_STARTED: &str = "job_started";
pub const EVENT_PROGRESS: &str = "progress";
pub const EVENT_JOB_ENDED: &str = "job_ended";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub ts: String,
    pub job: String,
    pub seq: u64,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: Value,
}

impl ProgressEvent {
    pub fn new(job: impl Into<String>, seq: u64, event_type: impl Into<String>, data: Value) -> Self {
        Self {
            ts: crate::progress::job::now_millis().to_string(),
            job: job.into(),
            seq,
            event_type: event_type.into(),
            data,
        }
    }
}

/// Payload of a `progress` event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressData {
    pub label: String,
    pub percentage: u8,
}
