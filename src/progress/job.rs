//! Job lifecycle helpers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use crate::error::StorageError;
use crate::progress::event::{ProgressEvent, EVENT_JOB_ENDED, EVENT_JOB_STARTED, EVENT_PROGRESS};
use crate::progress::store::{JobMeta, JobRecord, JobStore};
use crate::types::Roid;

static JOB_COUNTER: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Active,
    Completed,
    Failed,
    Interrupted,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Active => "active",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Interrupted => "interrupted",
        }
    }

    /// Finished one way or another; eligible for pruning
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::Active)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PrunePolicy {
    pub max_finished: usize,
    pub max_age_ms: u64,
}

impl Default for PrunePolicy {
    fn default() -> Self {
        Self {
            max_finished: 500,
            max_age_ms: 1000 * 60 * 60 * 24 * 14,
        }
    }
}

/// Records jobs and their ordered progress events
#[derive(Clone)]
pub struct ProgressRuntime {
    store: Arc<JobStore>,
    // serializes sequence allocation within the process
    seq_lock: Arc<Mutex<()>>,
}

impl ProgressRuntime {
    pub fn new(db: sled::Db) -> Result<Self, StorageError> {
        Ok(Self {
            store: JobStore::shared(db)?,
            seq_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn start_job(&self, kind: &str, roid: Roid, engine: &str) -> Result<String, StorageError> {
        let job_id = new_job_id();
        let started = now_millis();
        let record = JobRecord {
            job_id: job_id.clone(),
            kind: kind.to_string(),
            roid,
            engine: engine.to_string(),
            started_at_ms: started,
            ended_at_ms: None,
            status: JobStatus::Active,
            message: None,
            error: None,
        };
        self.store.put_job(&record)?;
        self.store.put_meta(
            &job_id,
            &JobMeta {
                next_seq: 1,
                latest_status: JobStatus::Active,
                updated_at_ms: started,
                percentage: 0,
            },
        )?;
        self.emit_event(
            &job_id,
            EVENT_JOB_STARTED,
            json!({ "kind": kind, "roid": roid, "engine": engine }),
        )?;
        Ok(job_id)
    }

    /// Close a job with its terminal status and done/error message
    pub fn finish_job(
        &self,
        job_id: &str,
        success: bool,
        message: Option<String>,
        error: Option<String>,
    ) -> Result<(), StorageError> {
        let status = if success {
            JobStatus::Completed
        } else {
            JobStatus::Failed
        };
        self.emit_event(
            job_id,
            EVENT_JOB_ENDED,
            json!({ "status": status.as_str(), "message": message, "error": error }),
        )?;
        let mut record = self.store.get_job(job_id)?.ok_or_else(|| {
            StorageError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("job record missing: {}", job_id),
            ))
        })?;
        record.status = status;
        record.ended_at_ms = Some(now_millis());
        record.message = message;
        record.error = error;
        self.store.put_job(&record)?;
        if let Some(mut meta) = self.store.get_meta(job_id)? {
            meta.latest_status = status;
            meta.updated_at_ms = now_millis();
            if success {
                meta.percentage = 100;
            }
            self.store.put_meta(job_id, &meta)?;
        }
        self.store.flush()
    }

    pub fn emit_event(&self, job_id: &str, event_type: &str, data: Value) -> Result<(), StorageError> {
        let _guard = self.seq_lock.lock();
        let mut meta = self.store.get_meta(job_id)?.unwrap_or(JobMeta {
            next_seq: 1,
            latest_status: JobStatus::Active,
            updated_at_ms: now_millis(),
            percentage: 0,
        });
        let event = ProgressEvent::new(job_id, meta.next_seq, event_type, data);
        self.store.append_event(&event)?;

        meta.next_seq += 1;
        meta.updated_at_ms = now_millis();
        if event_type == EVENT_PROGRESS {
            if let Some(pct) = event.data.get("percentage").and_then(Value::as_u64) {
                meta.percentage = pct.min(100) as u8;
            }
        }
        self.store.put_meta(job_id, &meta)?;
        self.store.flush()
    }

    pub fn emit_event_best_effort(&self, job_id: &str, event_type: &str, data: Value) {
        if let Err(err) = self.emit_event(job_id, event_type, data) {
            warn!(
                job_id = %job_id,
                event_type = %event_type,
                error = %err,
                "failed to emit progress event"
            );
        }
    }

    pub fn mark_interrupted_jobs(&self) -> Result<usize, StorageError> {
        let changed = self.store.mark_interrupted_jobs()?;
        self.store.flush()?;
        Ok(changed)
    }

    pub fn prune(&self, policy: PrunePolicy) -> Result<usize, StorageError> {
        let pruned = self
            .store
            .prune_finished(policy.max_finished, policy.max_age_ms, now_millis())?;
        self.store.flush()?;
        Ok(pruned)
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }
}

pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

pub fn new_job_id() -> String {
    let ts = now_millis();
    let pid = std::process::id();
    let seq = JOB_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("job-{ts}-{pid}-{seq}")
}
