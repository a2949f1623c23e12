//! Point-in-time query context.

use crate::error::RegenError;
use crate::types::{Oid, Poid, Rid, Roid};
use serde::Serialize;

/// Immutable read context for one regeneration run
///
/// Every read performed on behalf of a run goes through the same context, so all of
/// them observe the same consistency watermark (`highest_stop_id`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryContext {
    project_id: Poid,
    revision_id: Rid,
    roid: Roid,
    concrete_revision_oid: Oid,
    highest_stop_id: Rid,
}

impl QueryContext {
    pub fn new(
        project_id: Poid,
        revision_id: Rid,
        roid: Roid,
        concrete_revision_oid: Oid,
        highest_stop_id: Rid,
    ) -> Result<Self, RegenError> {
        if project_id == 0 || roid == 0 || concrete_revision_oid == 0 {
            return Err(RegenError::Precondition(format!(
                "query context requires non-zero identifiers (project {}, revision {}, snapshot {})",
                project_id, roid, concrete_revision_oid
            )));
        }
        if revision_id == 0 {
            return Err(RegenError::Precondition(
                "revision numbers start at 1".to_string(),
            ));
        }
        if highest_stop_id < revision_id {
            return Err(RegenError::Precondition(format!(
                "watermark {} precedes revision {}",
                highest_stop_id, revision_id
            )));
        }
        Ok(Self {
            project_id,
            revision_id,
            roid,
            concrete_revision_oid,
            highest_stop_id,
        })
    }

    pub fn project_id(&self) -> Poid {
        self.project_id
    }

    pub fn revision_id(&self) -> Rid {
        self.revision_id
    }

    pub fn roid(&self) -> Roid {
        self.roid
    }

    pub fn concrete_revision_oid(&self) -> Oid {
        self.concrete_revision_oid
    }

    pub fn highest_stop_id(&self) -> Rid {
        self.highest_stop_id
    }

    /// Whether an object introduced in revision `rid` is visible
    pub fn admits(&self, rid: Rid) -> bool {
        rid <= self.highest_stop_id
    }
}
