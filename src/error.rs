//! Error types for the geometry regeneration subsystem.

use crate::types::Oid;
use thiserror::Error;

/// Storage-related errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{kind} not found: {oid}")]
    NotFound { kind: &'static str, oid: Oid },

    #[error("Serialization failed: {0}")]
    Serialization(String),

    #[error("Lock conflict on {key}: the object was modified by a concurrent transaction")]
    LockConflict { key: String },

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Failure reported by a geometry engine.
///
/// Carries the product that failed when the engine can attribute the failure to one.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{}{message}", product_prefix(.product_oid))]
pub struct GeometryGenerationError {
    pub message: String,
    pub product_oid: Option<Oid>,
}

fn product_prefix(product_oid: &Option<Oid>) -> String {
    product_oid
        .map(|oid| format!("product {}: ", oid))
        .unwrap_or_default()
}

impl GeometryGenerationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            product_oid: None,
        }
    }

    pub fn for_product(product_oid: Oid, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            product_oid: Some(product_oid),
        }
    }
}

/// Errors surfaced by the regeneration service
#[derive(Debug, Error)]
pub enum RegenError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Lock conflict: {0}")]
    LockConflict(String),

    #[error("Geometry generation failed: {0}")]
    GeometryGeneration(#[from] GeometryGenerationError),

    #[error("Storage error: {0}")]
    Store(StorageError),

    #[error("Precondition violated: {0}")]
    Precondition(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl RegenError {
    /// Whether the caller should re-resolve the snapshot and rerun the whole operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RegenError::LockConflict(_))
    }
}

impl From<StorageError> for RegenError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { .. } => RegenError::NotFound(err.to_string()),
            StorageError::LockConflict { .. } => RegenError::LockConflict(err.to_string()),
            other => RegenError::Store(other),
        }
    }
}

impl From<config::ConfigError> for RegenError {
    fn from(err: config::ConfigError) -> Self {
        RegenError::Config(err.to_string())
    }
}
