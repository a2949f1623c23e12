//! Optimistic concurrency: a run whose reads changed underneath it must not commit.

use revgeom::error::{RegenError, StorageError};
use revgeom::geometry::VertexBoundsEngine;
use revgeom::model::Revision;
use revgeom::progress::NullProgress;
use revgeom::regeneration::{regenerate_revision, RegenerationDeps};
use revgeom::report::StandardReportRenderer;
use revgeom::schema::StoredSchemaRegistry;

use crate::integration::{place, regenerate, test_service};

#[test]
fn concurrent_checkin_aborts_the_regeneration() {
    let svc = test_service();
    let project = svc.create_project("tower", 1.0).unwrap();
    let r1 = svc
        .checkin(project.oid, "initial", 1, vec![place(100, 10.0, 0.0, 0.0)])
        .unwrap();

    let engine = VertexBoundsEngine::new();
    let renderer = StandardReportRenderer::new();
    let schemas = StoredSchemaRegistry::new();
    let deps = RegenerationDeps {
        engine: &engine,
        renderer: &renderer,
        schemas: &schemas,
        report_schemas: &svc.config().regeneration.report_schemas,
        batch_size: 10,
    };

    let mut session = svc.store().session();
    let status = regenerate_revision(&mut session, deps, r1.oid, 1, None, &NullProgress).unwrap();
    assert!(status.is_ok());

    // A sibling lands while the run is still uncommitted
    svc.checkin(project.oid, "concurrent", 1, vec![]).unwrap();

    let err = session.commit().unwrap_err();
    assert!(matches!(err, StorageError::LockConflict { .. }));
    assert!(RegenError::from(err).is_retryable());

    let stored: Revision = svc.store().load(r1.oid).unwrap().unwrap();
    assert!(!stored.has_geometry);
    assert!(stored.extended_data.is_empty());

    // Rerunning picks up the new sibling
    let outcome = regenerate(&svc, r1.oid, None);
    assert_eq!(outcome.status.unwrap().updated_revisions.len(), 2);
}

#[test]
fn writes_to_another_project_do_not_conflict() {
    let svc = test_service();
    let tower = svc.create_project("tower", 1.0).unwrap();
    let annex = svc.create_project("annex", 1.0).unwrap();
    let r1 = svc
        .checkin(tower.oid, "initial", 1, vec![place(100, 10.0, 0.0, 0.0)])
        .unwrap();

    let engine = VertexBoundsEngine::new();
    let renderer = StandardReportRenderer::new();
    let schemas = StoredSchemaRegistry::new();
    let deps = RegenerationDeps {
        engine: &engine,
        renderer: &renderer,
        schemas: &schemas,
        report_schemas: &svc.config().regeneration.report_schemas,
        batch_size: 10,
    };

    let mut session = svc.store().session();
    regenerate_revision(&mut session, deps, r1.oid, 1, None, &NullProgress)
        .unwrap()
        .unwrap();
    svc.checkin(annex.oid, "elsewhere", 1, vec![place(200, 1.0, 0.0, 0.0)])
        .unwrap();
    session.commit().unwrap();

    let stored: Revision = svc.store().load(r1.oid).unwrap().unwrap();
    assert!(stored.has_geometry);
}
