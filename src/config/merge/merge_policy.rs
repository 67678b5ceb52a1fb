//! Merge rules: defaults, override order, conflict handling.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;
use config::Environment;

/// Prefix of environment overrides, e.g. `UPDRAFT__CLIENT__SERVER_URL`.
pub const ENV_PREFIX: &str = "UPDRAFT";
pub const ENV_SEPARATOR: &str = "__";

/// Selects the `config/<name>.toml` overlay in a workspace.
pub const ENV_NAME_VAR: &str = "UPDRAFT_ENV";
pub const DEFAULT_ENV_NAME: &str = "development";

/// Active environment name; blank values count as unset.
pub fn environment_name() -> String {
    std::env::var(ENV_NAME_VAR)
        .ok()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_ENV_NAME.to_string())
}

/// Create a Config builder with scalar defaults applied.
///
/// Path defaults depend on the platform data dir and are filled in by serde.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("client.request_timeout_secs", 120)?
        .set_default("manifest.max_concurrent_io", 64)?
        .set_default("logging.level", "info")?
        .set_default("logging.format", "text")?
        .set_default("logging.output", "stderr")
}

/// Environment source; highest precedence.
pub fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator(ENV_SEPARATOR)
        .separator(ENV_SEPARATOR)
        .try_parsing(true)
}
