//! Geometry Engines
//!
//! A geometry engine turns the product shapes visible in one snapshot into derived
//! geometry: one GeometryInfo record per product, written at the snapshot's revision
//! number, plus the aggregate bounds of everything it processed. Engines are plugins
//! selected per run through the [`EngineRegistry`].

pub mod registry;
pub mod vertex_engine;

pub use registry::{EngineRegistry, RenderEngineSelector};
pub use vertex_engine::{VertexBoundsEngine, VERTEX_BOUNDS_ENGINE};

use crate::error::RegenError;
use crate::model::Bounds;
use crate::progress::ProgressSink;
use crate::snapshot::QueryContext;
use crate::store::DatabaseSession;
use crate::types::{Oid, Uoid};
use serde::Serialize;

/// Label reported while an engine is processing batches
pub const GENERATING_GEOMETRY_LABEL: &str = "Generating geometry...";

/// Inputs of one engine invocation
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub acting_user: Uoid,
    pub context: &'a QueryContext,
    /// Number of products processed between progress reports
    pub batch_size: usize,
    /// Restrict the run to one product; `None` regenerates the whole model
    pub target: Option<Oid>,
}

/// Per-product outcome, used for the generation report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectOutcome {
    pub product_oid: Oid,
    pub name: String,
    pub primitives: u64,
    pub bounds: Bounds,
}

/// Aggregate of everything an engine processed in one run
///
/// In targeted mode the bounds cover only the target product.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateGeometryResult {
    pub multiplier_to_mm: f64,
    pub bounds: Bounds,
    pub bounds_untransformed: Bounds,
    pub nr_primitives: u64,
    pub objects: Vec<ObjectOutcome>,
}

impl GenerateGeometryResult {
    pub fn empty(multiplier_to_mm: f64) -> Self {
        Self {
            multiplier_to_mm,
            bounds: Bounds::empty(),
            bounds_untransformed: Bounds::empty(),
            nr_primitives: 0,
            objects: Vec::new(),
        }
    }
}

/// Geometry engine plugin
///
/// Engines read through the session so every read observes the context's watermark,
/// and write their GeometryInfo records into the same session. Engine-specific
/// failures are reported as [`RegenError::GeometryGeneration`]; storage failures
/// propagate unchanged.
pub trait GeometryEngine: Send + Sync {
    fn name(&self) -> &str;

    fn generate_geometry(
        &self,
        request: GenerationRequest<'_>,
        session: &mut DatabaseSession<'_>,
        progress: &dyn ProgressSink,
    ) -> Result<GenerateGeometryResult, RegenError>;
}
