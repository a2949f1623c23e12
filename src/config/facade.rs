//! Configuration loading entry point.

use crate::config::merge::builder_with_defaults;
use crate::config::sources::{environment, global_file, workspace_file};
use crate::config::RevgeomConfig;
use crate::error::RegenError;
use config::File;
use std::path::Path;
use tracing::debug;

/// Loads [`RevgeomConfig`] from its layered sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Defaults, then global file, workspace files and environment
    pub fn load(workspace_root: &Path) -> Result<RevgeomConfig, RegenError> {
        Self::load_with_override(workspace_root, None)
    }

    /// Like [`ConfigLoader::load`], with an explicit file layered above the workspace files
    pub fn load_with_override(
        workspace_root: &Path,
        explicit: Option<&Path>,
    ) -> Result<RevgeomConfig, RegenError> {
        let mut builder = builder_with_defaults()?;
        builder = global_file::add_to_builder(builder)?;
        builder = workspace_file::add_to_builder(builder, workspace_root)?;
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(RegenError::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            builder = builder.add_source(File::from(path));
        }
        builder = environment::add_to_builder(builder);

        let config: RevgeomConfig = builder.build()?.try_deserialize()?;
        debug!(workspace = %workspace_root.display(), "Configuration loaded");
        Ok(config)
    }

    /// Load a single file on top of the defaults, ignoring every other source
    pub fn load_from_file(path: &Path) -> Result<RevgeomConfig, RegenError> {
        let config = builder_with_defaults()?
            .add_source(File::from(path))
            .build()?
            .try_deserialize()?;
        Ok(config)
    }
}
