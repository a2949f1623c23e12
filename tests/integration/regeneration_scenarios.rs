//! End-to-end regeneration through the service: whole model, single product,
//! sibling revisions, failures and snapshot isolation.

use revgeom::api::RegenerationRequest;
use revgeom::error::{GeometryGenerationError, RegenError};
use revgeom::geometry::{
    GenerateGeometryResult, GenerationRequest, GeometryEngine, RenderEngineSelector,
    VertexBoundsEngine, GENERATING_GEOMETRY_LABEL,
};
use revgeom::history::ShapeChange;
use revgeom::model::{Bounds, ConcreteRevision, GeometryInfo, Revision};
use revgeom::progress::{JobStatus, ProgressSink};
use revgeom::store::DatabaseSession;
use std::sync::Arc;

use crate::integration::{place, regenerate, test_service, test_service_with, visible_geometry};

/// Stages a geometry write, then fails the way a triangulation error would
struct FailingEngine;

impl GeometryEngine for FailingEngine {
    fn name(&self) -> &str {
        "failing"
    }

    fn generate_geometry(
        &self,
        request: GenerationRequest<'_>,
        session: &mut DatabaseSession<'_>,
        progress: &dyn ProgressSink,
    ) -> Result<GenerateGeometryResult, RegenError> {
        let oid = session.allocate_oid()?;
        session.store_geometry(&GeometryInfo {
            oid,
            ifc_product_oid: 100,
            project: request.context.project_id(),
            rid: request.context.revision_id(),
            bounds: Bounds::planar(-500.0, -500.0, 500.0, 500.0),
            bounds_untransformed: Bounds::planar(-500.0, -500.0, 500.0, 500.0),
            primitive_count: 1,
            deleted: false,
        })?;
        progress.update_progress(GENERATING_GEOMETRY_LABEL, 50);
        Err(GeometryGenerationError::for_product(100, "triangulation failed").into())
    }
}

/// Fails outside the engine's own error domain
struct BrokenEngine;

impl GeometryEngine for BrokenEngine {
    fn name(&self) -> &str {
        "broken"
    }

    fn generate_geometry(
        &self,
        _request: GenerationRequest<'_>,
        _session: &mut DatabaseSession<'_>,
        _progress: &dyn ProgressSink,
    ) -> Result<GenerateGeometryResult, RegenError> {
        Err(RegenError::Precondition("engine backend unavailable".to_string()))
    }
}

/// Regenerates the next product along with the target, like an opening that cuts its wall
struct DependentEngine;

impl GeometryEngine for DependentEngine {
    fn name(&self) -> &str {
        "dependent"
    }

    fn generate_geometry(
        &self,
        request: GenerationRequest<'_>,
        session: &mut DatabaseSession<'_>,
        progress: &dyn ProgressSink,
    ) -> Result<GenerateGeometryResult, RegenError> {
        let inner = VertexBoundsEngine::new();
        let mut result = inner.generate_geometry(request, session, progress)?;
        if let Some(target) = request.target {
            let dependent = inner.generate_geometry(
                GenerationRequest {
                    target: Some(target + 1),
                    ..request
                },
                session,
                progress,
            )?;
            result.bounds.expand(&dependent.bounds);
            result.bounds_untransformed.expand(&dependent.bounds_untransformed);
            result.nr_primitives += dependent.nr_primitives;
            result.objects.extend(dependent.objects);
        }
        Ok(result)
    }
}

fn revision(service: &revgeom::api::GeometryService, roid: u64) -> Revision {
    service.store().load(roid).unwrap().unwrap()
}

#[test]
fn whole_model_regeneration_updates_revision_and_snapshot() {
    let svc = test_service();
    let project = svc.create_project("tower", 1.0).unwrap();
    let r1 = svc
        .checkin(
            project.oid,
            "initial",
            1,
            vec![place(100, 10.0, 0.0, 0.0), place(101, 10.0, 20.0, 20.0)],
        )
        .unwrap();
    assert!(!r1.has_geometry);

    let outcome = regenerate(&svc, r1.oid, None);
    assert_eq!(
        outcome.done_message(),
        "Geometry successfully regenerated using vertex-bounds"
    );
    let summary = outcome.status.as_ref().unwrap();
    assert_eq!(summary.bounds, Bounds::planar(0.0, 0.0, 30.0, 30.0));
    assert_eq!(summary.bounds_untransformed, Bounds::planar(0.0, 0.0, 10.0, 10.0));
    assert_eq!(summary.nr_primitives, 4);
    assert_eq!(summary.regenerated_objects, 2);
    assert_eq!(summary.highest_stop_id, 1);

    let stored = revision(&svc, r1.oid);
    assert!(stored.has_geometry);
    assert_eq!(stored.nr_primitives, 4);
    assert_eq!(stored.bounds, Bounds::planar(0.0, 0.0, 30.0, 30.0));
    assert_eq!(stored.extended_data.len(), 2);

    let concrete: ConcreteRevision = svc.store().load(r1.concrete_revision).unwrap().unwrap();
    assert_eq!(concrete.bounds, stored.bounds);
    assert_eq!(concrete.multiplier_to_mm, 1.0);
    assert_eq!(visible_geometry(&svc, r1.oid).len(), 2);
}

#[test]
fn single_product_regeneration_merges_untouched_products() {
    let svc = test_service();
    let project = svc.create_project("tower", 1.0).unwrap();
    let r1 = svc
        .checkin(
            project.oid,
            "initial",
            1,
            vec![place(100, 10.0, 0.0, 0.0), place(101, 10.0, 20.0, 20.0)],
        )
        .unwrap();
    assert!(regenerate(&svc, r1.oid, None).is_success());

    let r2 = svc
        .checkin(project.oid, "move A", 1, vec![place(100, 10.0, 2.0, 2.0)])
        .unwrap();
    let outcome = regenerate(&svc, r2.oid, Some(100));
    let summary = outcome.status.as_ref().unwrap();
    assert_eq!(summary.target, Some(100));
    assert_eq!(summary.regenerated_objects, 1);
    assert_eq!(summary.bounds, Bounds::planar(2.0, 2.0, 30.0, 30.0));
    assert_eq!(summary.nr_primitives, 4);

    let geometry = visible_geometry(&svc, r2.oid);
    assert_eq!(geometry.len(), 2);
    let moved = geometry.iter().find(|g| g.ifc_product_oid == 100).unwrap();
    assert_eq!(moved.rid, r2.id);
    assert_eq!(moved.bounds, Bounds::planar(2.0, 2.0, 12.0, 12.0));
    let untouched = geometry.iter().find(|g| g.ifc_product_oid == 101).unwrap();
    assert_eq!(untouched.rid, r1.id);

    // The earlier snapshot keeps its own geometry
    assert_eq!(
        revision(&svc, r1.oid).bounds,
        Bounds::planar(0.0, 0.0, 30.0, 30.0)
    );
    let old = visible_geometry(&svc, r1.oid);
    let original = old.iter().find(|g| g.ifc_product_oid == 100).unwrap();
    assert_eq!(original.bounds, Bounds::planar(0.0, 0.0, 10.0, 10.0));
}

#[test]
fn regenerating_an_older_revision_ignores_later_writes() {
    let svc = test_service();
    let project = svc.create_project("tower", 1.0).unwrap();
    let r1 = svc
        .checkin(
            project.oid,
            "initial",
            1,
            vec![place(100, 10.0, 0.0, 0.0), place(101, 10.0, 20.0, 20.0)],
        )
        .unwrap();
    let r2 = svc
        .checkin(project.oid, "grow", 1, vec![place(102, 10.0, 90.0, 90.0)])
        .unwrap();
    assert!(regenerate(&svc, r2.oid, None).is_success());
    assert_eq!(
        revision(&svc, r2.oid).bounds,
        Bounds::planar(0.0, 0.0, 100.0, 100.0)
    );

    let outcome = regenerate(&svc, r1.oid, None);
    let summary = outcome.status.as_ref().unwrap();
    assert_eq!(summary.highest_stop_id, 1);
    assert_eq!(summary.bounds, Bounds::planar(0.0, 0.0, 30.0, 30.0));
    assert_eq!(summary.nr_primitives, 4);
    assert_eq!(
        revision(&svc, r2.oid).bounds,
        Bounds::planar(0.0, 0.0, 100.0, 100.0)
    );
}

#[test]
fn sibling_revisions_share_regenerated_state() {
    let svc = test_service();
    let project = svc.create_project("tower", 1.0).unwrap();
    let r1 = svc
        .checkin(
            project.oid,
            "initial",
            1,
            vec![place(100, 10.0, 0.0, 0.0), place(101, 10.0, 20.0, 20.0)],
        )
        .unwrap();
    let r2 = svc.checkin(project.oid, "metadata only", 1, vec![]).unwrap();
    let r3 = svc.checkin(project.oid, "metadata only", 1, vec![]).unwrap();
    assert_eq!(r2.concrete_revision, r1.concrete_revision);

    let outcome = regenerate(&svc, r2.oid, None);
    let summary = outcome.status.as_ref().unwrap();
    assert_eq!(summary.highest_stop_id, 3);
    let mut updated = summary.updated_revisions.clone();
    updated.sort_unstable();
    assert_eq!(updated, vec![r1.oid, r2.oid, r3.oid]);

    for roid in [r1.oid, r2.oid, r3.oid] {
        let stored = revision(&svc, roid);
        assert!(stored.has_geometry, "revision {} should have geometry", roid);
        assert_eq!(stored.nr_primitives, 4);
        assert_eq!(stored.bounds, Bounds::planar(0.0, 0.0, 30.0, 30.0));
    }
    // Reports attach only to the revision the run was invoked for
    assert_eq!(revision(&svc, r1.oid).extended_data.len(), 0);
    assert_eq!(revision(&svc, r2.oid).extended_data.len(), 2);
    assert_eq!(revision(&svc, r3.oid).extended_data.len(), 0);

    // A sibling checked in afterwards inherits the shared state
    let r4 = svc.checkin(project.oid, "later", 1, vec![]).unwrap();
    assert!(r4.has_geometry);
    assert_eq!(r4.bounds, Bounds::planar(0.0, 0.0, 30.0, 30.0));
}

#[test]
fn removed_products_drop_out_of_aggregation() {
    let svc = test_service();
    let project = svc.create_project("tower", 1.0).unwrap();
    let r1 = svc
        .checkin(
            project.oid,
            "initial",
            1,
            vec![place(100, 10.0, 0.0, 0.0), place(101, 10.0, 20.0, 20.0)],
        )
        .unwrap();
    assert!(regenerate(&svc, r1.oid, None).is_success());

    let r2 = svc
        .checkin(
            project.oid,
            "demolish",
            1,
            vec![
                ShapeChange::Remove { product_oid: 101 },
                place(100, 10.0, 1.0, 1.0),
            ],
        )
        .unwrap();
    let outcome = regenerate(&svc, r2.oid, Some(100));
    let summary = outcome.status.as_ref().unwrap();
    assert_eq!(summary.bounds, Bounds::planar(1.0, 1.0, 11.0, 11.0));
    assert_eq!(summary.nr_primitives, 2);
    assert_eq!(visible_geometry(&svc, r2.oid).len(), 1);
    assert_eq!(visible_geometry(&svc, r1.oid).len(), 2);
}

#[test]
fn regeneration_is_repeatable() {
    let svc = test_service();
    let project = svc.create_project("tower", 1.0).unwrap();
    let r1 = svc
        .checkin(
            project.oid,
            "initial",
            1,
            vec![place(100, 10.0, 0.0, 0.0), place(101, 10.0, 20.0, 20.0)],
        )
        .unwrap();

    let first = regenerate(&svc, r1.oid, None);
    let geometry_first = visible_geometry(&svc, r1.oid);
    let second = regenerate(&svc, r1.oid, None);
    let geometry_second = visible_geometry(&svc, r1.oid);

    let (a, b) = (first.status.unwrap(), second.status.unwrap());
    assert_eq!(a.bounds, b.bounds);
    assert_eq!(a.nr_primitives, b.nr_primitives);
    assert_eq!(
        geometry_first.iter().map(|g| g.oid).collect::<Vec<_>>(),
        geometry_second.iter().map(|g| g.oid).collect::<Vec<_>>()
    );
    // Each run adds its own pair of reports
    assert_eq!(revision(&svc, r1.oid).extended_data.len(), 4);
}

#[test]
fn single_product_regeneration_is_repeatable() {
    let svc = test_service();
    let project = svc.create_project("tower", 1.0).unwrap();
    let r1 = svc
        .checkin(
            project.oid,
            "initial",
            1,
            vec![place(100, 10.0, 0.0, 0.0), place(101, 10.0, 20.0, 20.0)],
        )
        .unwrap();
    assert!(regenerate(&svc, r1.oid, None).is_success());
    let r2 = svc
        .checkin(project.oid, "move A", 1, vec![place(100, 10.0, 2.0, 2.0)])
        .unwrap();

    let first = regenerate(&svc, r2.oid, Some(100)).status.unwrap();
    let second = regenerate(&svc, r2.oid, Some(100)).status.unwrap();
    assert_eq!(first.bounds, Bounds::planar(2.0, 2.0, 30.0, 30.0));
    assert_eq!(first.bounds, second.bounds);
    assert_eq!(first.bounds_untransformed, second.bounds_untransformed);
    assert_eq!(first.nr_primitives, second.nr_primitives);
    assert_eq!(revision(&svc, r2.oid).nr_primitives, 4);
}

#[test]
fn regenerated_dependents_are_not_counted_twice() {
    let svc = test_service_with(vec![Arc::new(DependentEngine)]);
    let project = svc.create_project("tower", 1.0).unwrap();
    let r1 = svc
        .checkin(
            project.oid,
            "initial",
            1,
            vec![
                place(100, 10.0, 0.0, 0.0),
                place(101, 10.0, 20.0, 20.0),
                place(102, 10.0, 40.0, 40.0),
            ],
        )
        .unwrap();
    assert!(regenerate(&svc, r1.oid, None).is_success());
    let r2 = svc
        .checkin(project.oid, "move A", 1, vec![place(100, 10.0, 2.0, 2.0)])
        .unwrap();

    let outcome = svc
        .regenerate_revision_geometry(RegenerationRequest {
            roid: r2.oid,
            acting_user: 1,
            engine: RenderEngineSelector::Named("dependent".to_string()),
            target: Some(100),
        })
        .unwrap();
    let summary = outcome.status.as_ref().unwrap();
    assert_eq!(summary.regenerated_objects, 2);
    assert_eq!(summary.nr_primitives, 6);
    assert_eq!(summary.bounds, Bounds::planar(2.0, 2.0, 50.0, 50.0));

    let stored = revision(&svc, r2.oid);
    assert_eq!(stored.nr_primitives, 6);
    assert_eq!(stored.bounds, Bounds::planar(2.0, 2.0, 50.0, 50.0));
}

#[test]
fn engine_failure_leaves_store_untouched() {
    let svc = test_service_with(vec![Arc::new(FailingEngine)]);
    let project = svc.create_project("tower", 1.0).unwrap();
    let r1 = svc
        .checkin(project.oid, "initial", 1, vec![place(100, 10.0, 0.0, 0.0)])
        .unwrap();

    let outcome = svc
        .regenerate_revision_geometry(RegenerationRequest {
            roid: r1.oid,
            acting_user: 1,
            engine: RenderEngineSelector::Named("failing".to_string()),
            target: None,
        })
        .unwrap();
    assert_eq!(outcome.engine_name, "failing");
    let err = outcome.error().unwrap();
    assert_eq!(err.product_oid, Some(100));
    assert_eq!(err.message, "triangulation failed");

    let stored = revision(&svc, r1.oid);
    assert!(!stored.has_geometry);
    assert!(stored.extended_data.is_empty());
    assert!(visible_geometry(&svc, r1.oid).is_empty());

    let job = svc.progress().store().get_job(&outcome.job_id).unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error.as_deref(), Some("product 100: triangulation failed"));
}

#[test]
fn non_engine_errors_propagate_and_fail_the_job() {
    let svc = test_service_with(vec![Arc::new(BrokenEngine)]);
    let project = svc.create_project("tower", 1.0).unwrap();
    let r1 = svc
        .checkin(project.oid, "initial", 1, vec![place(100, 10.0, 0.0, 0.0)])
        .unwrap();

    let err = svc
        .regenerate_revision_geometry(RegenerationRequest {
            roid: r1.oid,
            acting_user: 1,
            engine: RenderEngineSelector::Named("broken".to_string()),
            target: None,
        })
        .unwrap_err();
    assert!(matches!(err, RegenError::Precondition(_)));

    let jobs = svc.jobs().unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].status, JobStatus::Failed);
    assert!(!revision(&svc, r1.oid).has_geometry);
}

#[test]
fn invisible_target_fails_generation() {
    let svc = test_service();
    let project = svc.create_project("tower", 1.0).unwrap();
    let r1 = svc
        .checkin(project.oid, "initial", 1, vec![place(100, 10.0, 0.0, 0.0)])
        .unwrap();

    let outcome = regenerate(&svc, r1.oid, Some(999));
    assert_eq!(outcome.error().unwrap().product_oid, Some(999));
    assert!(!revision(&svc, r1.oid).has_geometry);
}

#[test]
fn unknown_revision_and_engine_are_not_found() {
    let svc = test_service();

    let err = svc
        .regenerate_revision_geometry(RegenerationRequest {
            roid: 424242,
            acting_user: 1,
            engine: RenderEngineSelector::Default,
            target: None,
        })
        .unwrap_err();
    assert!(matches!(err, RegenError::NotFound(_)));
    assert_eq!(svc.jobs().unwrap()[0].status, JobStatus::Failed);

    let err = svc
        .regenerate_revision_geometry(RegenerationRequest {
            roid: 424242,
            acting_user: 1,
            engine: RenderEngineSelector::Named("nope".to_string()),
            target: None,
        })
        .unwrap_err();
    assert!(matches!(err, RegenError::NotFound(ref m) if m.contains("vertex-bounds")));
    // No job is started for an engine that does not exist
    assert_eq!(svc.jobs().unwrap().len(), 1);
}
