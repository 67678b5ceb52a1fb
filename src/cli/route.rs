//! CLI route: single route table and run context. Dispatches to domain services and presentation.

use crate::archive::{apply_archive, ArchiveBuilder, ArchiveHandle};
use crate::client::{HttpTransport, LocalTransport, SyncOrchestrator, UpdateTransport};
use crate::config::{ConfigLoader, UpdraftConfig};
use crate::error::{ApiError, StorageError};
use crate::progress::ProgressBus;
use crate::service::UpdateService;
use crate::tree::node::{DiffTree, Manifest};
use crate::tree::{diff, ManifestBuilder};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::cli::command_name;
use crate::cli::parse::{Commands, ConfigCommands, ServerCommands};
use crate::cli::presentation::{
    format_apply_summary, format_diff_json, format_diff_text, format_manifest_summary,
    format_pack_summary, format_progress_line, format_recompute_summary, format_record_table,
    format_sync_outcome,
};

/// Runtime context for CLI execution: workspace and the effective configuration.
/// Built from workspace path and optional config path using ConfigLoader only.
pub struct RunContext {
    workspace_root: PathBuf,
    config: UpdraftConfig,
}

impl RunContext {
    /// Create run context from workspace root and optional config path.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = if let Some(ref cfg_path) = config_path {
            ConfigLoader::load_from_file(cfg_path)?
        } else {
            ConfigLoader::load(&workspace_root)?
        };

        config.validate().map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ApiError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                messages.join("\n")
            ))
        })?;

        Ok(Self {
            workspace_root,
            config,
        })
    }

    pub fn from_config(workspace_root: PathBuf, config: UpdraftConfig) -> Self {
        Self {
            workspace_root,
            config,
        }
    }

    pub fn config(&self) -> &UpdraftConfig {
        &self.config
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        let started = Instant::now();
        let name = command_name(command);
        info!(command = %name, "Executing command");
        let result = self.execute_inner(command);
        debug!(
            command = %name,
            ok = result.is_ok(),
            duration_ms = started.elapsed().as_millis(),
            "Command finished"
        );
        result
    }

    fn execute_inner(&self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::Manifest { dir, out } => self.handle_manifest(dir, out.as_deref()),
            Commands::Diff {
                master,
                local,
                format,
            } => {
                let master = read_manifest(&self.resolve(master))?;
                let local = read_manifest(&self.resolve(local))?;
                render_diff(&diff(&master, &local), format)
            }
            Commands::Pack { diff, source, out } => {
                let diff = read_diff(&self.resolve(diff))?;
                let out = self.resolve(out);
                let staging = staging_dir_for(&out);
                let builder = ArchiveBuilder::new(self.resolve(source), staging)
                    .with_exclusions(self.config.manifest.exclusions());
                let archive = block_on(builder.build(&diff))??;
                let archive = archive.persist(&out)?;
                Ok(format_pack_summary(&archive))
            }
            Commands::Apply { archive, target } => {
                let archive = ArchiveHandle::open(self.resolve(archive))?;
                let target = self.resolve(target);
                let exclusions = self.config.manifest.exclusions();
                let summary = block_on(apply_archive(&archive, &target, &exclusions))??;
                Ok(format_apply_summary(&target, &summary))
            }
            Commands::Server { command } => self.handle_server_command(command),
            Commands::Sync { check, app, root } => {
                self.handle_sync(*check, app.as_deref(), root.as_deref())
            }
            Commands::Config { command } => match command {
                ConfigCommands::Show => self
                    .config
                    .to_toml()
                    .map_err(|e| ApiError::ConfigError(format!("Failed to render config: {}", e))),
                // Invalid configs never reach this point
                ConfigCommands::Validate => Ok("Configuration is valid.".to_string()),
            },
        }
    }

    fn handle_manifest(&self, dir: &Path, out: Option<&Path>) -> Result<String, ApiError> {
        let builder = ManifestBuilder::new(self.resolve(dir))
            .with_exclusions(self.config.manifest.exclusions())
            .with_max_concurrent_io(self.config.manifest.max_concurrent_io);
        let manifest = block_on(builder.build())??;
        let json = serde_json::to_string_pretty(&manifest)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        match out {
            Some(out) => {
                let out = self.resolve(out);
                std::fs::write(&out, json).map_err(|e| StorageError::fs(&out, e))?;
                Ok(format_manifest_summary(&out, manifest.file_count(), &manifest.digest()?))
            }
            None => Ok(json),
        }
    }

    fn handle_server_command(&self, command: &ServerCommands) -> Result<String, ApiError> {
        let service = UpdateService::from_config(&self.config)?;
        match command {
            ServerCommands::Recompute { app } => {
                let summary = block_on(service.recompute_manifest(app))??;
                Ok(format_recompute_summary(&summary))
            }
            ServerCommands::Compare {
                app,
                manifest,
                format,
            } => {
                let local = read_manifest(&self.resolve(manifest))?;
                let result = block_on(service.compare_manifest(app, &local))??;
                render_diff(&result, format)
            }
            ServerCommands::Fetch { app, diff, out } => {
                let diff = read_diff(&self.resolve(diff))?;
                let archive = block_on(service.fetch_diff_archive(app, &diff))??;
                let archive = archive.persist(&self.resolve(out))?;
                Ok(format_pack_summary(&archive))
            }
            ServerCommands::Digest { app } => {
                let digest = block_on(service.manifest_digest(app))??;
                Ok(digest.to_hex())
            }
            ServerCommands::List => {
                let records = service
                    .list_applications()?
                    .iter()
                    .map(|app_id| service.manifest_record(app_id))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(format_record_table(&records))
            }
        }
    }

    fn handle_sync(&self, check: bool, app: Option<&str>, root: Option<&Path>) -> Result<String, ApiError> {
        let client = &self.config.client;
        let app_id = app
            .map(str::to_string)
            .or_else(|| client.app_id.clone())
            .ok_or_else(|| {
                ApiError::ConfigError("No application id: pass --app or set client.app_id".to_string())
            })?;
        let install_root = root
            .map(|r| self.resolve(r))
            .or_else(|| client.install_root.clone())
            .ok_or_else(|| {
                ApiError::ConfigError(
                    "No install root: pass --root or set client.install_root".to_string(),
                )
            })?;

        let transport: Arc<dyn UpdateTransport> = match &client.server_url {
            Some(url) => Arc::new(HttpTransport::new(
                url.clone(),
                Duration::from_secs(client.request_timeout_secs),
                &client.download_dir,
            )?),
            None => Arc::new(LocalTransport::new(Arc::new(UpdateService::from_config(&self.config)?))),
        };

        let (bus, updates) = ProgressBus::new_pair();
        let printer = std::thread::spawn(move || {
            for update in updates {
                println!("{}", format_progress_line(&update));
            }
        });

        let outcome = {
            let orchestrator = SyncOrchestrator::new(transport, app_id, install_root)
                .with_progress(bus)
                .with_exclusions(self.config.manifest.exclusions())
                .with_max_concurrent_io(self.config.manifest.max_concurrent_io);
            if check {
                block_on(orchestrator.check())
            } else {
                block_on(orchestrator.update())
            }
        };
        // The bus is gone with the orchestrator, so the printer drains and exits
        if printer.join().is_err() {
            debug!("Progress printer panicked");
        }

        Ok(format_sync_outcome(&outcome??))
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace_root.join(path)
        }
    }
}

/// Run a future to completion on a fresh multi-threaded runtime.
fn block_on<F: Future>(future: F) -> Result<F::Output, ApiError> {
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| ApiError::ConfigError(format!("Failed to start async runtime: {}", e)))?;
    Ok(runtime.block_on(future))
}

fn read_manifest(path: &Path) -> Result<Manifest, ApiError> {
    let json = std::fs::read_to_string(path).map_err(|e| StorageError::fs(path, e))?;
    Manifest::from_json(&json).map_err(|e| ApiError::InvalidManifest(format!("{}: {}", path.display(), e)))
}

fn read_diff(path: &Path) -> Result<DiffTree, ApiError> {
    let json = std::fs::read_to_string(path).map_err(|e| StorageError::fs(path, e))?;
    DiffTree::from_json(&json).map_err(|e| ApiError::InvalidManifest(format!("{}: {}", path.display(), e)))
}

fn render_diff(diff: &DiffTree, format: &str) -> Result<String, ApiError> {
    match format {
        "json" => format_diff_json(diff),
        "text" => Ok(format_diff_text(diff)),
        other => Err(ApiError::ConfigError(format!(
            "Unknown format '{}' (expected text or json)",
            other
        ))),
    }
}

/// Build archives beside their destination so persisting is a rename.
fn staging_dir_for(out: &Path) -> PathBuf {
    match out.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
