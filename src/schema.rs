//! Extended-data schema lookup.

use crate::error::RegenError;
use crate::model::ExtendedDataSchema;
use crate::store::DatabaseSession;

pub const GEOMETRY_GENERATION_REPORT_JSON: &str = "GEOMETRY_GENERATION_REPORT_JSON_1_1";
pub const GEOMETRY_GENERATION_REPORT_HTML: &str = "GEOMETRY_GENERATION_REPORT_HTML_1_1";

/// A schema plus whether it already exists in the store
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaHandle {
    pub schema: ExtendedDataSchema,
    /// `false` when the schema was synthesized and the caller must store it
    pub persisted: bool,
}

/// Resolves schema names to schema records
pub trait SchemaRegistry: Send + Sync {
    fn lookup(
        &self,
        session: &mut DatabaseSession<'_>,
        name: &str,
    ) -> Result<SchemaHandle, RegenError>;
}

/// Looks schemas up in the store, falling back to the built-in report schemas
#[derive(Debug, Default, Clone, Copy)]
pub struct StoredSchemaRegistry;

impl StoredSchemaRegistry {
    pub fn new() -> Self {
        Self
    }

    fn builtin(name: &str) -> Option<(&'static str, &'static str)> {
        match name {
            GEOMETRY_GENERATION_REPORT_JSON => Some((
                "application/json",
                "Geometry generation report, JSON encoding",
            )),
            GEOMETRY_GENERATION_REPORT_HTML => {
                Some(("text/html", "Geometry generation report, HTML encoding"))
            }
            _ => None,
        }
    }
}

impl SchemaRegistry for StoredSchemaRegistry {
    fn lookup(
        &self,
        session: &mut DatabaseSession<'_>,
        name: &str,
    ) -> Result<SchemaHandle, RegenError> {
        if let Some(schema) = session.schema_by_name(name)? {
            return Ok(SchemaHandle {
                schema,
                persisted: true,
            });
        }
        let (content_type, description) = Self::builtin(name)
            .ok_or_else(|| RegenError::NotFound(format!("extended data schema '{}'", name)))?;
        Ok(SchemaHandle {
            schema: ExtendedDataSchema {
                oid: session.allocate_oid()?,
                name: name.to_string(),
                content_type: content_type.to_string(),
                description: description.to_string(),
            },
            persisted: false,
        })
    }
}
