//! Revision state updates after a successful run.

use crate::error::RegenError;
use crate::geometry::GenerateGeometryResult;
use crate::model::{ConcreteRevision, Revision};
use crate::snapshot::ResolvedSnapshot;
use crate::store::DatabaseSession;
use crate::types::Roid;
use tracing::debug;

/// Entities written by [`update_revision_state`]
#[derive(Debug, Clone)]
pub struct StateUpdate {
    /// The revision the run was invoked for
    pub revision: Revision,
    pub concrete_revision: ConcreteRevision,
    /// Every revision sharing the snapshot, the invoked one included
    pub updated_revisions: Vec<Roid>,
}

/// Write the aggregated geometry state onto the snapshot and all of its revisions
///
/// Siblings are found through the snapshot's back-reference set. A sibling that
/// cannot be loaded fails the whole update.
pub fn update_revision_state(
    session: &mut DatabaseSession<'_>,
    snapshot: &ResolvedSnapshot,
    aggregated: &GenerateGeometryResult,
) -> Result<StateUpdate, RegenError> {
    let mut concrete_revision: ConcreteRevision =
        session.require(snapshot.concrete_revision.oid)?;
    concrete_revision.multiplier_to_mm = aggregated.multiplier_to_mm;
    concrete_revision.bounds = aggregated.bounds;
    concrete_revision.bounds_untransformed = aggregated.bounds_untransformed;

    let mut target = None;
    let mut updated_revisions = Vec::with_capacity(concrete_revision.revisions.len());
    for roid in &concrete_revision.revisions {
        let mut revision: Revision = session.require(*roid)?;
        revision.has_geometry = true;
        revision.nr_primitives = aggregated.nr_primitives;
        revision.bounds = aggregated.bounds;
        revision.bounds_untransformed = aggregated.bounds_untransformed;
        session.store(&revision)?;
        updated_revisions.push(*roid);
        if *roid == snapshot.revision.oid {
            target = Some(revision);
        }
    }
    session.store(&concrete_revision)?;

    let revision = target.ok_or_else(|| {
        RegenError::Precondition(format!(
            "revision {} left snapshot {} during regeneration",
            snapshot.revision.oid, concrete_revision.oid
        ))
    })?;
    debug!(
        concrete_revision = concrete_revision.oid,
        revisions = updated_revisions.len(),
        "Revision state updated"
    );
    Ok(StateUpdate {
        revision,
        concrete_revision,
        updated_revisions,
    })
}
