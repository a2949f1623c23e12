//! Configuration System
//!
//! Layered configuration: built-in defaults, the user's global file, the workspace's
//! `config/` directory and finally `REVGEOM__*` environment variables. Tests included.

use crate::logging::LoggingConfig;
use crate::report::ReportEncoding;
use crate::schema::{GEOMETRY_GENERATION_REPORT_HTML, GEOMETRY_GENERATION_REPORT_JSON};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;
pub use sources::global_file::global_config_path;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RevgeomConfig {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub regeneration: RegenerationConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Object store location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Relative paths resolve against the workspace root
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

fn default_store_path() -> PathBuf {
    PathBuf::from(".revgeom/store")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

impl StoreConfig {
    pub fn resolve(&self, workspace_root: &Path) -> PathBuf {
        if self.path.is_absolute() {
            self.path.clone()
        } else {
            workspace_root.join(&self.path)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegenerationConfig {
    /// Products per engine batch (one progress report per batch)
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Engine used when a request does not name one
    #[serde(default = "default_engine")]
    pub default_engine: String,

    #[serde(default)]
    pub report_schemas: ReportSchemaConfig,
}

fn default_batch_size() -> usize {
    1000
}

fn default_engine() -> String {
    crate::geometry::VERTEX_BOUNDS_ENGINE.to_string()
}

impl Default for RegenerationConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            default_engine: default_engine(),
            report_schemas: ReportSchemaConfig::default(),
        }
    }
}

/// Schema names attached to each report encoding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSchemaConfig {
    #[serde(default = "default_json_schema")]
    pub json: String,
    #[serde(default = "default_html_schema")]
    pub html: String,
}

fn default_json_schema() -> String {
    GEOMETRY_GENERATION_REPORT_JSON.to_string()
}

fn default_html_schema() -> String {
    GEOMETRY_GENERATION_REPORT_HTML.to_string()
}

impl Default for ReportSchemaConfig {
    fn default() -> Self {
        Self {
            json: default_json_schema(),
            html: default_html_schema(),
        }
    }
}

impl ReportSchemaConfig {
    pub fn name_for(&self, encoding: ReportEncoding) -> &str {
        match encoding {
            ReportEncoding::Json => &self.json,
            ReportEncoding::Html => &self.html,
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    Store(String),
    Regeneration(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Store(msg) => write!(f, "Store: {}", msg),
            ValidationError::Regeneration(msg) => write!(f, "Regeneration: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl RevgeomConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.store.path.as_os_str().is_empty() {
            errors.push(ValidationError::Store(
                "Store path cannot be empty".to_string(),
            ));
        }

        let regeneration = &self.regeneration;
        if regeneration.batch_size == 0 {
            errors.push(ValidationError::Regeneration(
                "batch_size must be greater than zero".to_string(),
            ));
        }
        if regeneration.default_engine.trim().is_empty() {
            errors.push(ValidationError::Regeneration(
                "default_engine cannot be empty".to_string(),
            ));
        }
        for (encoding, name) in [
            ("json", &regeneration.report_schemas.json),
            ("html", &regeneration.report_schemas.html),
        ] {
            if name.trim().is_empty() {
                errors.push(ValidationError::Regeneration(format!(
                    "report schema for {} cannot be empty",
                    encoding
                )));
            }
        }

        if !LoggingConfig::is_known_level(&self.logging.level) {
            errors.push(ValidationError::Logging(format!(
                "Invalid log level: {}",
                self.logging.level
            )));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
