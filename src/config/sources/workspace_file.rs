//! Workspace config files: `config/config.toml`, then `config/<env>.toml`.

use crate::config::merge::merge_policy;
use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, File};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Workspace files in increasing precedence. Missing files are left out.
pub fn workspace_config_paths(workspace_root: &Path) -> Vec<PathBuf> {
    let config_dir = workspace_root.join("config");
    let env_file = format!("{}.toml", merge_policy::environment_name());
    [config_dir.join("config.toml"), config_dir.join(env_file)]
        .into_iter()
        .filter(|path| path.is_file())
        .collect()
}

pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    workspace_root: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let paths = workspace_config_paths(workspace_root);
    if paths.is_empty() {
        debug!(workspace = %workspace_root.display(), "No workspace configuration files");
    }
    Ok(paths.iter().fold(builder, |builder, path| {
        builder.add_source(File::from(path.as_path()))
    }))
}
