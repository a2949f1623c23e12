//! Merge rules: defaults, override order, conflict handling.

use crate::geometry::VERTEX_BOUNDS_ENGINE;
use crate::schema::{GEOMETRY_GENERATION_REPORT_HTML, GEOMETRY_GENERATION_REPORT_JSON};
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
///
/// Later sources replace individual keys; tables are merged key by key.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("store.path", ".revgeom/store")?
        .set_default("regeneration.batch_size", 1000_i64)?
        .set_default("regeneration.default_engine", VERTEX_BOUNDS_ENGINE)?
        .set_default(
            "regeneration.report_schemas.json",
            GEOMETRY_GENERATION_REPORT_JSON,
        )?
        .set_default(
            "regeneration.report_schemas.html",
            GEOMETRY_GENERATION_REPORT_HTML,
        )
}
