//! Long-running job tracking and progress reporting.

pub mod event;
pub mod job;
pub mod sink;
pub mod store;

pub use event::{ProgressData, ProgressEvent};
pub use job::{new_job_id, now_millis, JobStatus, ProgressRuntime, PrunePolicy};
pub use sink::{JobProgressSink, NullProgress, ProgressSink, RecordingProgress};
pub use store::{JobMeta, JobRecord, JobStore};
