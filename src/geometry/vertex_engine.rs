//! Reference engine: derives per-product bounds directly from shape vertices.

use crate::error::{GeometryGenerationError, RegenError};
use crate::geometry::{
    GenerateGeometryResult, GenerationRequest, GeometryEngine, ObjectOutcome,
    GENERATING_GEOMETRY_LABEL,
};
use crate::model::{Bounds, ConcreteRevision, GeometryInfo, ProductShape, Project, Vector3};
use crate::progress::ProgressSink;
use crate::store::DatabaseSession;
use crate::types::Oid;
use std::collections::HashMap;
use tracing::{debug, info};

pub const VERTEX_BOUNDS_ENGINE: &str = "vertex-bounds";

/// Treats every three consecutive vertices as one triangle primitive
#[derive(Debug, Default, Clone, Copy)]
pub struct VertexBoundsEngine;

impl VertexBoundsEngine {
    pub fn new() -> Self {
        Self
    }
}

/// Placed bounds, untransformed bounds and primitive count of one shape
fn measure(shape: &ProductShape) -> Result<(Bounds, Bounds, u64), GeometryGenerationError> {
    if shape.vertices.is_empty() {
        return Err(GeometryGenerationError::for_product(
            shape.product_oid,
            "shape has no vertices",
        ));
    }
    if shape.vertices.len() % 3 != 0 {
        return Err(GeometryGenerationError::for_product(
            shape.product_oid,
            format!(
                "shape has {} vertices, not a whole number of triangles",
                shape.vertices.len()
            ),
        ));
    }
    let placement = &shape.placement;
    if !placement.scale.is_finite() || placement.translation.iter().any(|v| !v.is_finite()) {
        return Err(GeometryGenerationError::for_product(
            shape.product_oid,
            "placement is not finite",
        ));
    }

    let mut untransformed = Bounds::empty();
    let mut placed = Bounds::empty();
    for raw in &shape.vertices {
        if raw.iter().any(|v| !v.is_finite()) {
            return Err(GeometryGenerationError::for_product(
                shape.product_oid,
                "shape has a non-finite vertex",
            ));
        }
        let point = Vector3::from_array(*raw);
        untransformed.include_point(point);
        placed.include_point(placement.apply(point));
    }
    Ok((placed, untransformed, (shape.vertices.len() / 3) as u64))
}

impl GeometryEngine for VertexBoundsEngine {
    fn name(&self) -> &str {
        VERTEX_BOUNDS_ENGINE
    }

    fn generate_geometry(
        &self,
        request: GenerationRequest<'_>,
        session: &mut DatabaseSession<'_>,
        progress: &dyn ProgressSink,
    ) -> Result<GenerateGeometryResult, RegenError> {
        let context = request.context;
        let project: Project = session.require(context.project_id())?;
        // Derived records belong to the snapshot, so every sibling sees them
        let snapshot_rid = session
            .require::<ConcreteRevision>(context.concrete_revision_oid())?
            .id;

        let mut shapes = session.shapes_as_of(context)?;
        if let Some(target) = request.target {
            shapes.retain(|shape| shape.product_oid == target);
            if shapes.is_empty() {
                return Err(GeometryGenerationError::for_product(
                    target,
                    format!("not visible in revision {}", context.roid()),
                )
                .into());
            }
        }

        // Rewrites at the same revision number keep their oid
        let existing: HashMap<Oid, GeometryInfo> = session
            .geometry_as_of(context)?
            .into_iter()
            .filter(|info| info.rid == snapshot_rid)
            .map(|info| (info.ifc_product_oid, info))
            .collect();

        let mut result = GenerateGeometryResult::empty(project.length_unit_to_mm);
        let total = shapes.len();
        let batch_size = request.batch_size.max(1);
        let mut done = 0usize;

        for batch in shapes.chunks(batch_size) {
            for shape in batch {
                let (bounds, bounds_untransformed, primitives) = measure(shape)?;
                let oid = match existing.get(&shape.product_oid) {
                    Some(info) => info.oid,
                    None => session.allocate_oid()?,
                };
                session.store_geometry(&GeometryInfo {
                    oid,
                    ifc_product_oid: shape.product_oid,
                    project: project.oid,
                    rid: snapshot_rid,
                    bounds,
                    bounds_untransformed,
                    primitive_count: primitives,
                    deleted: false,
                })?;

                result.bounds.expand(&bounds);
                result.bounds_untransformed.expand(&bounds_untransformed);
                result.nr_primitives += primitives;
                result.objects.push(ObjectOutcome {
                    product_oid: shape.product_oid,
                    name: shape.name.clone(),
                    primitives,
                    bounds,
                });
            }
            done += batch.len();
            progress.update_progress(GENERATING_GEOMETRY_LABEL, ((done * 100) / total) as u8);
            debug!(done, total, "Geometry batch processed");
        }
        if total == 0 {
            progress.update_progress(GENERATING_GEOMETRY_LABEL, 100);
        }

        info!(
            engine = VERTEX_BOUNDS_ENGINE,
            user = request.acting_user,
            products = total,
            primitives = result.nr_primitives,
            "Geometry generated"
        );
        Ok(result)
    }
}
