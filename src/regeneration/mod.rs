//! Revision Geometry Regeneration
//!
//! Recomputes derived geometry for a logical revision, for the whole model or for a
//! single product, and records the result. One run moves through fixed phases:
//!
//! `Start -> Resolved -> ContextBuilt -> Regenerating -> Aggregated -> StateUpdated
//! -> ArtifactsRecorded -> Done`, with `Failed` reachable from `Regenerating`.
//!
//! All reads and writes go through the caller's [`DatabaseSession`]. A run that ends
//! in `Failed` may have staged engine writes; the caller must discard the session.

pub mod aggregate;
pub mod artifacts;
pub mod state;

pub use aggregate::{aggregate_bounds, union_of};
pub use artifacts::ArtifactRecorder;
pub use state::{update_revision_state, StateUpdate};

use crate::config::ReportSchemaConfig;
use crate::error::{GeometryGenerationError, RegenError};
use crate::geometry::{GenerationRequest, GeometryEngine};
use crate::model::Bounds;
use crate::progress::ProgressSink;
use crate::report::{GenerationReport, ReportRenderer};
use crate::schema::SchemaRegistry;
use crate::snapshot::resolve_snapshot;
use crate::store::DatabaseSession;
use crate::types::{Oid, Rid, Roid, Uoid};
use chrono::Utc;
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum RegenerationPhase {
    Start,
    Resolved,
    ContextBuilt,
    Regenerating,
    Aggregated,
    StateUpdated,
    ArtifactsRecorded,
    Done,
    Failed,
}

impl RegenerationPhase {
    pub fn can_advance_to(self, next: RegenerationPhase) -> bool {
        use RegenerationPhase::*;
        matches!(
            (self, next),
            (Start, Resolved)
                | (Resolved, ContextBuilt)
                | (ContextBuilt, Regenerating)
                | (Regenerating, Aggregated)
                | (Regenerating, Failed)
                | (Aggregated, StateUpdated)
                | (StateUpdated, ArtifactsRecorded)
                | (ArtifactsRecorded, Done)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RegenerationPhase::Done | RegenerationPhase::Failed)
    }
}

struct PhaseTracker {
    roid: Roid,
    phase: RegenerationPhase,
}

impl PhaseTracker {
    fn new(roid: Roid) -> Self {
        Self {
            roid,
            phase: RegenerationPhase::Start,
        }
    }

    fn advance(&mut self, next: RegenerationPhase) -> Result<(), RegenError> {
        if !self.phase.can_advance_to(next) {
            return Err(RegenError::Precondition(format!(
                "invalid regeneration transition {:?} -> {:?}",
                self.phase, next
            )));
        }
        debug!(roid = self.roid, from = ?self.phase, to = ?next, "Regeneration phase");
        self.phase = next;
        Ok(())
    }
}

/// Collaborators of one regeneration run
#[derive(Clone, Copy)]
pub struct RegenerationDeps<'a> {
    pub engine: &'a dyn GeometryEngine,
    pub renderer: &'a dyn ReportRenderer,
    pub schemas: &'a dyn SchemaRegistry,
    pub report_schemas: &'a ReportSchemaConfig,
    pub batch_size: usize,
}

/// What a successful run changed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegenerationSummary {
    pub roid: Roid,
    pub concrete_revision: Oid,
    pub highest_stop_id: Rid,
    pub target: Option<Oid>,
    pub multiplier_to_mm: f64,
    pub bounds: Bounds,
    pub bounds_untransformed: Bounds,
    pub nr_primitives: u64,
    pub regenerated_objects: usize,
    pub updated_revisions: Vec<Roid>,
    pub extended_data: Vec<Oid>,
    pub time_to_generate_ms: u64,
}

/// Outcome of the engine phase: success, or an engine failure for the caller to report
pub type RegenerationStatus = Result<RegenerationSummary, GeometryGenerationError>;

/// Regenerate geometry for `roid` inside the caller's session
///
/// Engine failures come back as `Ok(Err(..))`; every other error aborts the run and
/// must abort the caller's transaction.
pub fn regenerate_revision(
    session: &mut DatabaseSession<'_>,
    deps: RegenerationDeps<'_>,
    roid: Roid,
    acting_user: Uoid,
    target: Option<Oid>,
    progress: &dyn ProgressSink,
) -> Result<RegenerationStatus, RegenError> {
    let mut tracker = PhaseTracker::new(roid);

    let snapshot = resolve_snapshot(session, roid)?;
    tracker.advance(RegenerationPhase::Resolved)?;

    let context = snapshot.query_context()?;
    tracker.advance(RegenerationPhase::ContextBuilt)?;

    tracker.advance(RegenerationPhase::Regenerating)?;
    let started_at = Utc::now();
    let timer = Instant::now();
    let request = GenerationRequest {
        acting_user,
        context: &context,
        batch_size: deps.batch_size,
        target,
    };
    let result = match deps.engine.generate_geometry(request, session, progress) {
        Ok(result) => result,
        Err(RegenError::GeometryGeneration(err)) => {
            tracker.advance(RegenerationPhase::Failed)?;
            error!(
                roid,
                engine = deps.engine.name(),
                product = ?err.product_oid,
                error = %err,
                "Geometry generation failed"
            );
            return Ok(Err(err));
        }
        Err(other) => return Err(other),
    };
    let time_to_generate_ms = timer.elapsed().as_millis() as u64;
    let regenerated_objects = result.objects.len();

    let stored = match target {
        Some(_) => session.geometry_as_of(&context)?,
        None => Vec::new(),
    };
    let aggregated = aggregate_bounds(result, &stored, target);
    tracker.advance(RegenerationPhase::Aggregated)?;

    let StateUpdate {
        mut revision,
        concrete_revision,
        updated_revisions,
    } = update_revision_state(session, &snapshot, &aggregated)?;
    tracker.advance(RegenerationPhase::StateUpdated)?;

    let report = GenerationReport::for_regeneration(
        deps.engine.name(),
        roid,
        target,
        started_at,
        time_to_generate_ms,
        &aggregated,
    );
    let recorder = ArtifactRecorder::new(deps.renderer, deps.schemas, deps.report_schemas);
    let recorded = recorder.record(session, &mut revision, &report, acting_user)?;
    tracker.advance(RegenerationPhase::ArtifactsRecorded)?;

    tracker.advance(RegenerationPhase::Done)?;
    info!(
        roid,
        concrete_revision = concrete_revision.oid,
        highest_stop_id = context.highest_stop_id(),
        engine = deps.engine.name(),
        target = ?target,
        objects = regenerated_objects,
        revisions = updated_revisions.len(),
        duration_ms = time_to_generate_ms,
        "Regeneration staged"
    );

    Ok(Ok(RegenerationSummary {
        roid,
        concrete_revision: concrete_revision.oid,
        highest_stop_id: context.highest_stop_id(),
        target,
        multiplier_to_mm: aggregated.multiplier_to_mm,
        bounds: aggregated.bounds,
        bounds_untransformed: aggregated.bounds_untransformed,
        nr_primitives: aggregated.nr_primitives,
        regenerated_objects,
        updated_revisions,
        extended_data: recorded.iter().map(|data| data.oid).collect(),
        time_to_generate_ms,
    }))
}
