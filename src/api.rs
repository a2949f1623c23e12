//! Geometry Service API
//!
//! Entry points for callers: regenerate geometry for a revision, check in revisions
//! and read back what a revision currently reports. Each call owns one
//! [`DatabaseSession`], which is the transaction boundary: it is committed when the
//! call succeeds and dropped otherwise.

use crate::config::RevgeomConfig;
use crate::error::{GeometryGenerationError, RegenError};
use crate::geometry::{EngineRegistry, GeometryEngine, RenderEngineSelector};
use crate::history::{self, ModelFile, ShapeChange};
use crate::model::{ConcreteRevision, ExtendedData, Project, Revision};
use crate::progress::{JobProgressSink, JobRecord, ProgressEvent, ProgressRuntime, PrunePolicy};
use crate::regeneration::{regenerate_revision, RegenerationDeps, RegenerationStatus};
use crate::report::{ReportRenderer, StandardReportRenderer};
use crate::schema::{SchemaRegistry, StoredSchemaRegistry};
use crate::snapshot::resolve_snapshot;
use crate::store::SledObjectStore;
use crate::types::{Oid, Poid, Rid, Roid, Uoid};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

const JOB_KIND_REGENERATE: &str = "regenerate_geometry";

/// Which objects a regeneration covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetObject {
    WholeModel,
    Product(Oid),
}

impl TargetObject {
    /// Negative values select the whole model
    pub fn from_raw(raw: i64) -> Self {
        if raw < 0 {
            TargetObject::WholeModel
        } else {
            TargetObject::Product(raw as Oid)
        }
    }

    pub fn oid(self) -> Option<Oid> {
        match self {
            TargetObject::WholeModel => None,
            TargetObject::Product(oid) => Some(oid),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegenerationRequest {
    pub roid: Roid,
    pub acting_user: Uoid,
    pub engine: RenderEngineSelector,
    pub target: Option<Oid>,
}

/// Result of a regeneration call that reached the engine
#[derive(Debug, Clone)]
pub struct RegenerationOutcome {
    pub engine_name: String,
    pub job_id: String,
    pub status: RegenerationStatus,
}

impl RegenerationOutcome {
    pub fn is_success(&self) -> bool {
        self.status.is_ok()
    }

    pub fn done_message(&self) -> String {
        format!("Geometry successfully regenerated using {}", self.engine_name)
    }

    pub fn error(&self) -> Option<&GeometryGenerationError> {
        self.status.as_ref().err()
    }
}

/// Committed state of a revision, as `show` presents it
#[derive(Debug, Clone, Serialize)]
pub struct RevisionView {
    pub revision: Revision,
    pub concrete_revision: ConcreteRevision,
    pub highest_stop_id: Rid,
    pub attachments: Vec<ExtendedData>,
}

/// Geometry regeneration service
///
/// Owns the object store, the engine registry and the injected report collaborators.
/// Job status lives in the same sled database as the objects.
pub struct GeometryService {
    store: SledObjectStore,
    engines: EngineRegistry,
    renderer: Arc<dyn ReportRenderer>,
    schemas: Arc<dyn SchemaRegistry>,
    config: RevgeomConfig,
    progress: ProgressRuntime,
}

impl GeometryService {
    pub fn new(
        store: SledObjectStore,
        engines: EngineRegistry,
        renderer: Arc<dyn ReportRenderer>,
        schemas: Arc<dyn SchemaRegistry>,
        config: RevgeomConfig,
    ) -> Result<Self, RegenError> {
        let progress = ProgressRuntime::new(store.db().clone())?;
        Ok(Self {
            store,
            engines,
            renderer,
            schemas,
            config,
            progress,
        })
    }

    /// Open the configured store under `workspace_root` with the built-in collaborators
    pub fn open(workspace_root: &Path, config: RevgeomConfig) -> Result<Self, RegenError> {
        let store_path = config.store.resolve(workspace_root);
        std::fs::create_dir_all(&store_path)
            .map_err(|e| RegenError::Store(crate::error::StorageError::IoError(e)))?;
        let store = SledObjectStore::open(&store_path)?;
        let engines = EngineRegistry::with_builtin(config.regeneration.default_engine.clone());
        Self::new(
            store,
            engines,
            Arc::new(StandardReportRenderer::new()),
            Arc::new(StoredSchemaRegistry::new()),
            config,
        )
    }

    pub fn store(&self) -> &SledObjectStore {
        &self.store
    }

    pub fn engines(&self) -> &EngineRegistry {
        &self.engines
    }

    pub fn progress(&self) -> &ProgressRuntime {
        &self.progress
    }

    pub fn config(&self) -> &RevgeomConfig {
        &self.config
    }

    /// Regenerate geometry for a revision and record the outcome as a job
    ///
    /// A geometry failure is reported in the outcome and leaves the store untouched.
    /// Any other failure is returned as `Err`; both mark the job failed.
    pub fn regenerate_revision_geometry(
        &self,
        request: RegenerationRequest,
    ) -> Result<RegenerationOutcome, RegenError> {
        let engine = self.engines.resolve(&request.engine)?;
        let job_id = self
            .progress
            .start_job(JOB_KIND_REGENERATE, request.roid, engine.name())?;

        let result = self.run_regeneration(engine.as_ref(), &request, &job_id);
        let engine_name = engine.name().to_string();

        let finished = match &result {
            Ok(Ok(_)) => self.progress.finish_job(
                &job_id,
                true,
                Some(format!(
                    "Geometry successfully regenerated using {}",
                    engine_name
                )),
                None,
            ),
            Ok(Err(err)) => self
                .progress
                .finish_job(&job_id, false, None, Some(err.to_string())),
            Err(err) => self
                .progress
                .finish_job(&job_id, false, None, Some(err.to_string())),
        };
        if let Err(err) = finished {
            warn!(job_id = %job_id, error = %err, "Failed to record job status");
        }

        let status = result?;
        Ok(RegenerationOutcome {
            engine_name,
            job_id,
            status,
        })
    }

    fn run_regeneration(
        &self,
        engine: &dyn GeometryEngine,
        request: &RegenerationRequest,
        job_id: &str,
    ) -> Result<RegenerationStatus, RegenError> {
        let mut session = self.store.session();
        let sink = JobProgressSink::new(&self.progress, job_id);
        let deps = RegenerationDeps {
            engine,
            renderer: self.renderer.as_ref(),
            schemas: self.schemas.as_ref(),
            report_schemas: &self.config.regeneration.report_schemas,
            batch_size: self.config.regeneration.batch_size,
        };

        let status = regenerate_revision(
            &mut session,
            deps,
            request.roid,
            request.acting_user,
            request.target,
            &sink,
        )?;
        match status {
            Ok(summary) => {
                session.commit()?;
                info!(
                    roid = summary.roid,
                    engine = engine.name(),
                    revisions = summary.updated_revisions.len(),
                    "Geometry regenerated"
                );
                Ok(Ok(summary))
            }
            Err(err) => {
                session.rollback();
                Ok(Err(err))
            }
        }
    }

    pub fn create_project(&self, name: &str, length_unit_to_mm: f64) -> Result<Project, RegenError> {
        let mut session = self.store.session();
        let project = history::create_project(&mut session, name, length_unit_to_mm)?;
        session.commit()?;
        Ok(project)
    }

    /// Create a project from a model file and check in its first revision
    pub fn import_model(
        &self,
        model: ModelFile,
        user: Uoid,
    ) -> Result<(Project, Revision), RegenError> {
        let mut session = self.store.session();
        let imported = history::import_model(&mut session, model, user)?;
        session.commit()?;
        Ok(imported)
    }

    /// Check in a revision; empty `changes` share the previous revision's snapshot
    pub fn checkin(
        &self,
        poid: Poid,
        comment: &str,
        user: Uoid,
        changes: Vec<ShapeChange>,
    ) -> Result<Revision, RegenError> {
        let mut session = self.store.session();
        let revision = history::checkin(&mut session, poid, comment, user, changes)?;
        session.commit()?;
        Ok(revision)
    }

    pub fn revision(&self, roid: Roid) -> Result<RevisionView, RegenError> {
        let mut session = self.store.session();
        let snapshot = resolve_snapshot(&mut session, roid)?;
        let mut attachments = Vec::with_capacity(snapshot.revision.extended_data.len());
        for oid in &snapshot.revision.extended_data {
            attachments.push(session.require::<ExtendedData>(*oid)?);
        }
        Ok(RevisionView {
            revision: snapshot.revision,
            concrete_revision: snapshot.concrete_revision,
            highest_stop_id: snapshot.highest_stop_id,
            attachments,
        })
    }

    pub fn jobs(&self) -> Result<Vec<JobRecord>, RegenError> {
        Ok(self.progress.store().list_jobs()?)
    }

    pub fn job_events(&self, job_id: &str) -> Result<Vec<ProgressEvent>, RegenError> {
        Ok(self.progress.store().read_events(job_id)?)
    }

    /// Mark jobs left active by a previous process and drop old finished ones
    pub fn recover_jobs(&self, policy: PrunePolicy) -> Result<(usize, usize), RegenError> {
        let interrupted = self.progress.mark_interrupted_jobs()?;
        let pruned = self.progress.prune(policy)?;
        Ok((interrupted, pruned))
    }
}
