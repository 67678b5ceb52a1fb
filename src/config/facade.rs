//! Config loading entry points.

use super::merge::merge_policy;
use super::sources::{global_file, workspace_file};
use super::UpdraftConfig;
use config::{ConfigError, File};
use std::path::Path;
use tracing::debug;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Discover and merge every source for `workspace_root`.
    ///
    /// Relative paths in the result are resolved against `workspace_root`.
    pub fn load(workspace_root: &Path) -> Result<UpdraftConfig, ConfigError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = builder.add_source(merge_policy::environment());

        let mut config: UpdraftConfig = builder.build()?.try_deserialize()?;
        config.resolve_paths(workspace_root);
        debug!(workspace = %workspace_root.display(), "Configuration loaded");
        Ok(config)
    }

    /// Load a single file (plus environment overrides), skipping discovery.
    ///
    /// Relative paths resolve against the file's directory.
    pub fn load_from_file(path: &Path) -> Result<UpdraftConfig, ConfigError> {
        let builder = merge_policy::builder_with_defaults()?
            .add_source(File::from(path))
            .add_source(merge_policy::environment());

        let mut config: UpdraftConfig = builder.build()?.try_deserialize()?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        config.resolve_paths(base);
        Ok(config)
    }
}
