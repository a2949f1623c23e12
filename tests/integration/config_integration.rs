//! Layered configuration: workspace files, explicit file and environment overrides.

use revgeom::config::{global_config_path, ConfigLoader};
use revgeom::error::RegenError;
use std::fs;
use tempfile::TempDir;

use crate::integration::with_xdg_env;

#[test]
fn global_config_path_follows_xdg_config_home() {
    let temp_dir = TempDir::new().unwrap();
    with_xdg_env(&temp_dir, || {
        assert_eq!(
            global_config_path().unwrap(),
            temp_dir.path().join("config").join("revgeom").join("config.toml")
        );
    });
}

#[test]
fn explicit_file_and_environment_layer_over_workspace() {
    let temp_dir = TempDir::new().unwrap();
    with_xdg_env(&temp_dir, || {
        let workspace = temp_dir.path().join("ws");
        fs::create_dir_all(workspace.join("config")).unwrap();
        fs::write(
            workspace.join("config").join("config.toml"),
            "[regeneration]\nbatch_size = 20\ndefault_engine = \"workspace-engine\"\n",
        )
        .unwrap();
        let explicit = temp_dir.path().join("explicit.toml");
        fs::write(&explicit, "[regeneration]\ndefault_engine = \"explicit-engine\"\n").unwrap();

        let config = ConfigLoader::load_with_override(&workspace, Some(&explicit)).unwrap();
        assert_eq!(config.regeneration.batch_size, 20);
        assert_eq!(config.regeneration.default_engine, "explicit-engine");

        std::env::set_var("REVGEOM__REGENERATION__BATCH_SIZE", "3");
        let config = ConfigLoader::load(&workspace);
        std::env::remove_var("REVGEOM__REGENERATION__BATCH_SIZE");
        assert_eq!(config.unwrap().regeneration.batch_size, 3);
    });
}

#[test]
fn missing_explicit_file_is_a_config_error() {
    let temp_dir = TempDir::new().unwrap();
    with_xdg_env(&temp_dir, || {
        let err = ConfigLoader::load_with_override(
            temp_dir.path(),
            Some(&temp_dir.path().join("absent.toml")),
        )
        .unwrap_err();
        assert!(matches!(err, RegenError::Config(ref m) if m.contains("absent.toml")));
    });
}
