//! Geometry generation reports.
//!
//! A report describes one regeneration run. It is rendered into one or more
//! encodings that are attached to the revision as extended data.

pub mod render;

pub use render::{RenderedReport, ReportEncoding, ReportRenderer, StandardReportRenderer};

use crate::geometry::GenerateGeometryResult;
use crate::model::Bounds;
use crate::types::{Oid, Roid};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Placeholder for the original-file fields: a regeneration run has no source upload
pub const RERUN: &str = "rerun";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectReport {
    pub product_oid: Oid,
    pub name: String,
    pub primitives: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationReport {
    pub original_file_name: String,
    pub original_file_size: i64,
    pub original_deserializer: String,
    pub engine: String,
    pub roid: Roid,
    /// `None` for a whole-model run
    pub target_object: Option<Oid>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub time_to_generate_ms: u64,
    pub success: bool,
    /// Primitives in the whole revision after the run
    pub total_primitives: u64,
    /// Placed bounds of the revision after the run; `None` when empty
    pub bounds: Option<Bounds>,
    /// Products regenerated by this run
    pub objects: Vec<ObjectReport>,
}

impl GenerationReport {
    /// Report for a successful regeneration run
    pub fn for_regeneration(
        engine: &str,
        roid: Roid,
        target_object: Option<Oid>,
        started_at: DateTime<Utc>,
        time_to_generate_ms: u64,
        aggregated: &GenerateGeometryResult,
    ) -> Self {
        Self {
            original_file_name: RERUN.to_string(),
            original_file_size: -1,
            original_deserializer: RERUN.to_string(),
            engine: engine.to_string(),
            roid,
            target_object,
            started_at,
            finished_at: Utc::now(),
            time_to_generate_ms,
            success: true,
            total_primitives: aggregated.nr_primitives,
            bounds: (!aggregated.bounds.is_empty()).then_some(aggregated.bounds),
            objects: aggregated
                .objects
                .iter()
                .map(|object| ObjectReport {
                    product_oid: object.product_oid,
                    name: object.name.clone(),
                    primitives: object.primitives,
                })
                .collect(),
        }
    }
}
