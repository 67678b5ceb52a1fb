//! Integration tests for layered configuration loading

use super::test_utils::with_env;
use std::fs;
use tempfile::TempDir;
use updraft::config::ConfigLoader;

fn write_config(root: &std::path::Path, name: &str, body: &str) {
    let dir = root.join("config");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(name), body).unwrap();
}

#[test]
fn test_workspace_config_resolves_relative_paths() {
    let workspace = TempDir::new().unwrap();
    let xdg = TempDir::new().unwrap();
    write_config(
        workspace.path(),
        "config.toml",
        r#"
[server]
masters_dir = "masters"
store_path = "state/store"

[client]
app_id = "editor"
install_root = "install"
"#,
    );

    let config = with_env(&[("XDG_CONFIG_HOME", xdg.path().to_str().unwrap())], || {
        ConfigLoader::load(workspace.path()).unwrap()
    });
    assert_eq!(config.server.masters_dir, workspace.path().join("masters"));
    assert_eq!(config.server.store_path, workspace.path().join("state/store"));
    assert_eq!(config.client.install_root, Some(workspace.path().join("install")));
    assert!(config.validate().is_ok());
}

#[test]
fn test_environment_file_overrides_base_file() {
    let workspace = TempDir::new().unwrap();
    let xdg = TempDir::new().unwrap();
    write_config(
        workspace.path(),
        "config.toml",
        "[manifest]\nmax_concurrent_io = 32\n\n[client]\napp_id = \"editor\"\n",
    );
    write_config(workspace.path(), "staging.toml", "[manifest]\nmax_concurrent_io = 4\n");

    let config = with_env(
        &[
            ("XDG_CONFIG_HOME", xdg.path().to_str().unwrap()),
            ("UPDRAFT_ENV", "staging"),
        ],
        || ConfigLoader::load(workspace.path()).unwrap(),
    );
    assert_eq!(config.manifest.max_concurrent_io, 4);
    assert_eq!(config.client.app_id.as_deref(), Some("editor"));
}

#[test]
fn test_environment_variables_take_precedence() {
    let workspace = TempDir::new().unwrap();
    let xdg = TempDir::new().unwrap();
    write_config(workspace.path(), "config.toml", "[manifest]\nmax_concurrent_io = 32\n");

    let config = with_env(
        &[
            ("XDG_CONFIG_HOME", xdg.path().to_str().unwrap()),
            ("UPDRAFT__MANIFEST__MAX_CONCURRENT_IO", "8"),
            ("UPDRAFT__CLIENT__SERVER_URL", "http://updates.local:8080"),
        ],
        || ConfigLoader::load(workspace.path()).unwrap(),
    );
    assert_eq!(config.manifest.max_concurrent_io, 8);
    assert_eq!(config.client.server_url.as_deref(), Some("http://updates.local:8080"));
}

#[test]
fn test_global_file_is_lowest_file_layer() {
    let workspace = TempDir::new().unwrap();
    let xdg = TempDir::new().unwrap();
    let global_dir = xdg.path().join("updraft");
    fs::create_dir_all(&global_dir).unwrap();
    fs::write(
        global_dir.join("config.toml"),
        "[client]\nrequest_timeout_secs = 15\napp_id = \"global-app\"\n",
    )
    .unwrap();
    write_config(workspace.path(), "config.toml", "[client]\napp_id = \"editor\"\n");

    let config = with_env(&[("XDG_CONFIG_HOME", xdg.path().to_str().unwrap())], || {
        ConfigLoader::load(workspace.path()).unwrap()
    });
    assert_eq!(config.client.request_timeout_secs, 15);
    assert_eq!(config.client.app_id.as_deref(), Some("editor"));
}

#[test]
fn test_invalid_values_fail_validation() {
    let workspace = TempDir::new().unwrap();
    let config_file = workspace.path().join("updraft.toml");
    fs::write(
        &config_file,
        "[client]\nserver_url = \"updates.local\"\n\n[logging]\nlevel = \"chatty\"\n",
    )
    .unwrap();

    let config = with_env(&[], || ConfigLoader::load_from_file(&config_file).unwrap());
    let errors = config.validate().unwrap_err();
    assert_eq!(errors.len(), 2);
}
