//! Snapshot resolution: logical revision -> concrete revision + watermark.

use crate::error::RegenError;
use crate::model::{ConcreteRevision, Project, Revision};
use crate::snapshot::context::QueryContext;
use crate::store::DatabaseSession;
use crate::types::{Rid, Roid};
use tracing::debug;

/// Everything a regeneration run needs to know about its target revision
#[derive(Debug, Clone)]
pub struct ResolvedSnapshot {
    pub project: Project,
    pub revision: Revision,
    pub concrete_revision: ConcreteRevision,
    pub highest_stop_id: Rid,
}

impl ResolvedSnapshot {
    pub fn query_context(&self) -> Result<QueryContext, RegenError> {
        QueryContext::new(
            self.project.oid,
            self.revision.id,
            self.revision.oid,
            self.concrete_revision.oid,
            self.highest_stop_id,
        )
    }
}

/// Resolve a logical revision to its snapshot and consistency watermark
pub fn resolve_snapshot(
    session: &mut DatabaseSession<'_>,
    roid: Roid,
) -> Result<ResolvedSnapshot, RegenError> {
    let revision: Revision = session.require(roid)?;
    let concrete_revision: ConcreteRevision = session.require(revision.concrete_revision)?;
    let project: Project = session.require(concrete_revision.project)?;

    if !concrete_revision.revisions.contains(&roid) {
        return Err(RegenError::Precondition(format!(
            "snapshot {} has no back-reference to revision {}",
            concrete_revision.oid, roid
        )));
    }

    let highest_stop_id = find_highest_stop_rid(session, &project, &concrete_revision)?;
    debug!(
        roid,
        concrete_revision = concrete_revision.oid,
        highest_stop_id,
        "Resolved snapshot"
    );

    Ok(ResolvedSnapshot {
        project,
        revision,
        concrete_revision,
        highest_stop_id,
    })
}

/// Highest revision number at which the snapshot's objects are still live
///
/// Walks the project history in check-in order. Revisions sharing the snapshot extend
/// the watermark; the first later revision with a different snapshot is the
/// superseding write and ends the scan.
pub fn find_highest_stop_rid(
    session: &mut DatabaseSession<'_>,
    project: &Project,
    concrete_revision: &ConcreteRevision,
) -> Result<Rid, RegenError> {
    let mut highest = concrete_revision.id;
    for roid in &project.revisions {
        let revision: Revision = session.require(*roid)?;
        if revision.concrete_revision == concrete_revision.oid {
            highest = highest.max(revision.id);
        } else if revision.id > concrete_revision.id {
            break;
        }
    }
    Ok(highest)
}
