//! Shared test utilities for integration tests
//!
//! Service fixtures over a temporary store, shape builders, and XDG isolation for
//! tests that go through config loading.

use revgeom::api::{GeometryService, RegenerationOutcome, RegenerationRequest};
use revgeom::config::RevgeomConfig;
use revgeom::geometry::{EngineRegistry, GeometryEngine, RenderEngineSelector, VERTEX_BOUNDS_ENGINE};
use revgeom::history::ShapeChange;
use revgeom::model::{GeometryInfo, Placement};
use revgeom::report::StandardReportRenderer;
use revgeom::schema::StoredSchemaRegistry;
use revgeom::snapshot::resolve_snapshot;
use revgeom::store::SledObjectStore;
use revgeom::types::{Oid, Roid};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Global mutex to serialize XDG environment variable access across all tests
static XDG_ENV_MUTEX: Mutex<()> = Mutex::new(());

/// A service over a store that lives as long as the fixture
pub struct TestService {
    pub service: GeometryService,
    _dir: TempDir,
}

impl std::ops::Deref for TestService {
    type Target = GeometryService;

    fn deref(&self) -> &GeometryService {
        &self.service
    }
}

pub fn test_service() -> TestService {
    test_service_with(Vec::new())
}

/// Service with the built-in engines plus `extra`
pub fn test_service_with(extra: Vec<Arc<dyn GeometryEngine>>) -> TestService {
    let dir = TempDir::new().unwrap();
    let store = SledObjectStore::open(dir.path().join("store")).unwrap();
    let mut engines = EngineRegistry::with_builtin(VERTEX_BOUNDS_ENGINE);
    for engine in extra {
        engines.register(engine);
    }
    let mut config = RevgeomConfig::default();
    config.regeneration.batch_size = 1;
    let service = GeometryService::new(
        store,
        engines,
        Arc::new(StandardReportRenderer::new()),
        Arc::new(StoredSchemaRegistry::new()),
        config,
    )
    .unwrap();
    TestService { service, _dir: dir }
}

/// Two triangles covering `[0, size]^2` at z = 0
pub fn square(size: f64) -> Vec<[f64; 3]> {
    vec![
        [0.0, 0.0, 0.0],
        [size, 0.0, 0.0],
        [size, size, 0.0],
        [0.0, 0.0, 0.0],
        [size, size, 0.0],
        [0.0, size, 0.0],
    ]
}

pub fn place(product_oid: Oid, size: f64, x: f64, y: f64) -> ShapeChange {
    ShapeChange::Upsert {
        product_oid,
        name: format!("product-{}", product_oid),
        vertices: square(size),
        placement: Placement {
            translation: [x, y, 0.0],
            scale: 1.0,
        },
    }
}

pub fn regenerate(
    service: &GeometryService,
    roid: Roid,
    target: Option<Oid>,
) -> RegenerationOutcome {
    service
        .regenerate_revision_geometry(RegenerationRequest {
            roid,
            acting_user: 1,
            engine: RenderEngineSelector::Default,
            target,
        })
        .unwrap()
}

/// Committed GeometryInfo visible to `roid`, ordered by product
pub fn visible_geometry(service: &GeometryService, roid: Roid) -> Vec<GeometryInfo> {
    let mut session = service.store().session();
    let context = resolve_snapshot(&mut session, roid)
        .unwrap()
        .query_context()
        .unwrap();
    session.geometry_as_of(&context).unwrap()
}

/// Environment variable state to restore after test
struct EnvState {
    home: Option<String>,
    xdg_config_home: Option<String>,
    revgeom_env: Option<String>,
}

impl EnvState {
    fn capture() -> Self {
        Self {
            home: std::env::var("HOME").ok(),
            xdg_config_home: std::env::var("XDG_CONFIG_HOME").ok(),
            revgeom_env: std::env::var("REVGEOM_ENV").ok(),
        }
    }

    fn restore(self) {
        restore_var("HOME", self.home);
        restore_var("XDG_CONFIG_HOME", self.xdg_config_home);
        restore_var("REVGEOM_ENV", self.revgeom_env);
    }
}

fn restore_var(key: &str, value: Option<String>) {
    match value {
        Some(orig) => std::env::set_var(key, orig),
        None => std::env::remove_var(key),
    }
}

/// Run `f` with HOME and XDG_CONFIG_HOME pointing into `test_dir`
pub fn with_xdg_env<F, R>(test_dir: &TempDir, f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = XDG_ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let env_state = EnvState::capture();

    let test_config_home = test_dir.path().join("config");
    let test_home = test_dir.path().join("home");
    std::fs::create_dir_all(&test_config_home).unwrap();
    std::fs::create_dir_all(&test_home).unwrap();

    std::env::set_var("HOME", test_home.to_str().unwrap());
    std::env::set_var("XDG_CONFIG_HOME", test_config_home.to_str().unwrap());
    std::env::remove_var("REVGEOM_ENV");

    let result = f();

    env_state.restore();
    result
}
