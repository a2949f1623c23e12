//! Durable sled-backed job and progress event store.

use std::io;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sled::{Db, Tree};

use crate::error::StorageError;
use crate::progress::event::ProgressEvent;
use crate::progress::job::{now_millis, JobStatus};
use crate::store::persistence::to_storage_io;

const TREE_JOBS: &str = "jobs";
const TREE_EVENTS: &str = "job_events";
const TREE_META: &str = "job_meta";
const EVENT_KEY_PAD: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: String,
    /// e.g. `regenerate_geometry`
    pub kind: String,
    pub roid: u64,
    pub engine: String,
    pub started_at_ms: u64,
    pub ended_at_ms: Option<u64>,
    pub status: JobStatus,
    pub message: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobMeta {
    pub next_seq: u64,
    pub latest_status: JobStatus,
    pub updated_at_ms: u64,
    /// Last reported completion percentage
    pub percentage: u8,
}

#[derive(Clone)]
pub struct JobStore {
    db: Db,
    jobs: Tree,
    events: Tree,
    meta: Tree,
}

impl JobStore {
    pub fn new(db: Db) -> Result<Self, StorageError> {
        let jobs = db.open_tree(TREE_JOBS).map_err(to_storage_io)?;
        let events = db.open_tree(TREE_EVENTS).map_err(to_storage_io)?;
        let meta = db.open_tree(TREE_META).map_err(to_storage_io)?;
        Ok(Self {
            db,
            jobs,
            events,
            meta,
        })
    }

    pub fn shared(db: Db) -> Result<Arc<Self>, StorageError> {
        Ok(Arc::new(Self::new(db)?))
    }

    pub fn put_job(&self, record: &JobRecord) -> Result<(), StorageError> {
        let value = serde_json::to_vec(record).map_err(to_storage_data)?;
        self.jobs
            .insert(record.job_id.as_bytes(), value)
            .map_err(to_storage_io)?;
        Ok(())
    }

    pub fn get_job(&self, job_id: &str) -> Result<Option<JobRecord>, StorageError> {
        let Some(raw) = self.jobs.get(job_id.as_bytes()).map_err(to_storage_io)? else {
            return Ok(None);
        };
        let parsed = serde_json::from_slice(&raw).map_err(to_storage_data)?;
        Ok(Some(parsed))
    }

    /// All jobs, newest first
    pub fn list_jobs(&self) -> Result<Vec<JobRecord>, StorageError> {
        let mut out = Vec::new();
        for result in self.jobs.iter() {
            let (_, value) = result.map_err(to_storage_io)?;
            let rec: JobRecord = serde_json::from_slice(&value).map_err(to_storage_data)?;
            out.push(rec);
        }
        out.sort_by_key(|j| std::cmp::Reverse(j.started_at_ms));
        Ok(out)
    }

    pub fn put_meta(&self, job_id: &str, meta: &JobMeta) -> Result<(), StorageError> {
        let value = serde_json::to_vec(meta).map_err(to_storage_data)?;
        self.meta
            .insert(job_id.as_bytes(), value)
            .map_err(to_storage_io)?;
        Ok(())
    }

    pub fn get_meta(&self, job_id: &str) -> Result<Option<JobMeta>, StorageError> {
        let Some(raw) = self.meta.get(job_id.as_bytes()).map_err(to_storage_io)? else {
            return Ok(None);
        };
        let parsed = serde_json::from_slice(&raw).map_err(to_storage_data)?;
        Ok(Some(parsed))
    }

    pub fn append_event(&self, event: &ProgressEvent) -> Result<(), StorageError> {
        let key = encode_event_key(&event.job, event.seq);
        let value = serde_json::to_vec(event).map_err(to_storage_data)?;
        self.events
            .insert(key.as_bytes(), value)
            .map_err(to_storage_io)?;
        Ok(())
    }

    pub fn read_events(&self, job_id: &str) -> Result<Vec<ProgressEvent>, StorageError> {
        self.read_events_after(job_id, 0)
    }

    pub fn read_events_after(
        &self,
        job_id: &str,
        after_seq: u64,
    ) -> Result<Vec<ProgressEvent>, StorageError> {
        let prefix = format!("{job_id}:");
        let mut out = Vec::new();
        for result in self.events.scan_prefix(prefix.as_bytes()) {
            let (_, value) = result.map_err(to_storage_io)?;
            let parsed: ProgressEvent = serde_json::from_slice(&value).map_err(to_storage_data)?;
            if parsed.seq > after_seq {
                out.push(parsed);
            }
        }
        out.sort_by_key(|e| e.seq);
        Ok(out)
    }

    /// Mark jobs left `Active` by a previous process as interrupted
    pub fn mark_interrupted_jobs(&self) -> Result<usize, StorageError> {
        let mut changed = 0usize;
        for mut job in self.list_jobs()? {
            if job.status == JobStatus::Active {
                job.status = JobStatus::Interrupted;
                self.put_job(&job)?;
                if let Some(mut meta) = self.get_meta(&job.job_id)? {
                    meta.latest_status = JobStatus::Interrupted;
                    meta.updated_at_ms = now_millis();
                    self.put_meta(&job.job_id, &meta)?;
                }
                changed += 1;
            }
        }
        Ok(changed)
    }

    pub fn prune_finished(
        &self,
        max_finished: usize,
        max_age_ms: u64,
        now_ms: u64,
    ) -> Result<usize, StorageError> {
        // list order is newest first
        let finished: Vec<JobRecord> = self
            .list_jobs()?
            .into_iter()
            .filter(|j| j.status.is_terminal())
            .collect();
        let (expired, kept): (Vec<JobRecord>, Vec<JobRecord>) =
            finished.into_iter().partition(|job| {
                let ended = job.ended_at_ms.unwrap_or(job.started_at_ms);
                now_ms.saturating_sub(ended) > max_age_ms
            });

        let mut removed = 0usize;
        for job in expired.iter().chain(kept.iter().skip(max_finished)) {
            self.delete_job(&job.job_id)?;
            removed += 1;
        }

        Ok(removed)
    }

    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush().map_err(to_storage_io)?;
        Ok(())
    }

    pub fn encode_event_key(job_id: &str, seq: u64) -> String {
        encode_event_key(job_id, seq)
    }

    pub fn delete_job(&self, job_id: &str) -> Result<(), StorageError> {
        self.jobs.remove(job_id.as_bytes()).map_err(to_storage_io)?;
        self.meta.remove(job_id.as_bytes()).map_err(to_storage_io)?;
        let prefix = format!("{job_id}:");
        let mut keys = Vec::new();
        for result in self.events.scan_prefix(prefix.as_bytes()) {
            let (key, _) = result.map_err(to_storage_io)?;
            keys.push(key);
        }
        for key in keys {
            self.events.remove(key).map_err(to_storage_io)?;
        }
        Ok(())
    }
}

fn encode_event_key(job_id: &str, seq: u64) -> String {
    format!("{job_id}:{seq:0EVENT_KEY_PAD$}")
}

fn to_storage_data(err: serde_json::Error) -> StorageError {
    StorageError::IoError(io::Error::new(io::ErrorKind::InvalidData, err.to_string()))
}
