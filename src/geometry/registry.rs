//! Engine registry: named geometry engines and the default selection.

use crate::error::RegenError;
use crate::geometry::{GeometryEngine, VertexBoundsEngine, VERTEX_BOUNDS_ENGINE};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Which engine a run should use
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RenderEngineSelector {
    #[default]
    Default,
    Named(String),
}

impl RenderEngineSelector {
    pub fn from_option(name: Option<String>) -> Self {
        match name {
            Some(name) if !name.trim().is_empty() => RenderEngineSelector::Named(name),
            _ => RenderEngineSelector::Default,
        }
    }
}

pub struct EngineRegistry {
    engines: BTreeMap<String, Arc<dyn GeometryEngine>>,
    default_engine: String,
}

impl EngineRegistry {
    /// Empty registry; `default_engine` must be registered before it is resolved
    pub fn new(default_engine: impl Into<String>) -> Self {
        Self {
            engines: BTreeMap::new(),
            default_engine: default_engine.into(),
        }
    }

    /// Registry holding the built-in engines
    pub fn with_builtin(default_engine: impl Into<String>) -> Self {
        let mut registry = Self::new(default_engine);
        registry.register(Arc::new(VertexBoundsEngine::new()));
        registry
    }

    pub fn register(&mut self, engine: Arc<dyn GeometryEngine>) {
        self.engines.insert(engine.name().to_string(), engine);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn GeometryEngine>> {
        self.engines.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        self.engines.keys().map(String::as_str).collect()
    }

    pub fn default_engine(&self) -> &str {
        &self.default_engine
    }

    pub fn resolve(
        &self,
        selector: &RenderEngineSelector,
    ) -> Result<Arc<dyn GeometryEngine>, RegenError> {
        let name = match selector {
            RenderEngineSelector::Default => self.default_engine.as_str(),
            RenderEngineSelector::Named(name) => name.as_str(),
        };
        self.get(name).ok_or_else(|| {
            RegenError::NotFound(format!(
                "geometry engine '{}' (available: {})",
                name,
                self.names().join(", ")
            ))
        })
    }
}

impl Default for EngineRegistry {
    fn default() -> Self {
        Self::with_builtin(VERTEX_BOUNDS_ENGINE)
    }
}
