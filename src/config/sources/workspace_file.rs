//! Workspace config files under `<workspace>/config/`.

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::File;
use std::path::{Path, PathBuf};

const ENV_VAR: &str = "REVGEOM_ENV";
const DEFAULT_ENV: &str = "development";

/// Active deployment name, selecting `config/<name>.toml`
pub fn active_env() -> String {
    std::env::var(ENV_VAR)
        .ok()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_ENV.to_string())
}

/// Workspace files in increasing precedence: shared base, then the env-specific file
pub fn workspace_config_paths(workspace_root: &Path, env_name: &str) -> [PathBuf; 2] {
    let dir = workspace_root.join("config");
    [dir.join("config.toml"), dir.join(format!("{}.toml", env_name))]
}

pub fn add_to_builder(
    mut builder: ConfigBuilder<DefaultState>,
    workspace_root: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    for path in workspace_config_paths(workspace_root, &active_env()) {
        if path.exists() {
            builder = builder.add_source(File::from(path).required(false));
        }
    }
    Ok(builder)
}
