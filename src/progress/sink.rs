//! Progress sinks handed to geometry engines.

use parking_lot::Mutex;
use serde_json::json;

use crate::progress::event::{ProgressData, EVENT_PROGRESS};
use crate::progress::job::ProgressRuntime;

/// Receives percentage updates from a running engine
///
/// Implementations must not fail the run: reporting is best-effort.
pub trait ProgressSink {
    fn update_progress(&self, label: &str, percentage: u8);
}

/// Discards all updates
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn update_progress(&self, _label: &str, _percentage: u8) {}
}

/// Forwards updates to a job's event log
pub struct JobProgressSink<'a> {
    runtime: &'a ProgressRuntime,
    job_id: &'a str,
    last: Mutex<Option<u8>>,
}

impl<'a> JobProgressSink<'a> {
    pub fn new(runtime: &'a ProgressRuntime, job_id: &'a str) -> Self {
        Self {
            runtime,
            job_id,
            last: Mutex::new(None),
        }
    }
}

impl ProgressSink for JobProgressSink<'_> {
    fn update_progress(&self, label: &str, percentage: u8) {
        let percentage = percentage.min(100);
        {
            let mut last = self.last.lock();
            if *last == Some(percentage) {
                return;
            }
            *last = Some(percentage);
        }
        self.runtime.emit_event_best_effort(
            self.job_id,
            EVENT_PROGRESS,
            json!({ "label": label, "percentage": percentage }),
        );
    }
}

/// Keeps every update in memory
#[derive(Debug, Default)]
pub struct RecordingProgress {
    updates: Mutex<Vec<ProgressData>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates(&self) -> Vec<ProgressData> {
        self.updates.lock().clone()
    }
}

impl ProgressSink for RecordingProgress {
    fn update_progress(&self, label: &str, percentage: u8) {
        self.updates.lock().push(ProgressData {
            label: label.to_string(),
            percentage,
        });
    }
}
