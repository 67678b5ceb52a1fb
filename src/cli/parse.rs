//! CLI parse: clap types for updraft. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Updraft CLI - incremental application updates
#[derive(Parser)]
#[command(name = "updraft")]
#[command(about = "Incremental application updates from content-hash manifests")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory (config discovery and relative paths)
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Disable logging entirely
    #[arg(long, default_value = "false")]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build a manifest of a directory
    Manifest {
        /// Directory to snapshot
        dir: PathBuf,
        /// Write the manifest JSON here instead of printing it
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Diff two manifest files (master first)
    Diff {
        master: PathBuf,
        local: PathBuf,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Package the files named by a diff into an archive
    Pack {
        /// Diff JSON file
        #[arg(long)]
        diff: PathBuf,
        /// Root the diff's files are read from
        #[arg(long)]
        source: PathBuf,
        /// Archive output path
        #[arg(long)]
        out: PathBuf,
    },
    /// Overlay an archive onto a directory
    Apply {
        archive: PathBuf,
        #[arg(long)]
        target: PathBuf,
    },
    /// Update service operations against the configured store
    Server {
        #[command(subcommand)]
        command: ServerCommands,
    },
    /// Check for or apply an update to an installed application
    Sync {
        /// Only report whether an update is available
        #[arg(long)]
        check: bool,
        /// Application id (defaults to client.app_id)
        #[arg(long)]
        app: Option<String>,
        /// Install root (defaults to client.install_root)
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Configuration commands
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ServerCommands {
    /// Rebuild and store the master manifest of an application
    Recompute { app: String },
    /// Diff the stored master manifest against a local manifest file
    Compare {
        app: String,
        /// Local manifest JSON file
        manifest: PathBuf,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Build an archive of a diff from the master root
    Fetch {
        app: String,
        /// Diff JSON file
        #[arg(long)]
        diff: PathBuf,
        /// Archive output path
        #[arg(long)]
        out: PathBuf,
    },
    /// Print the digest of the stored master manifest
    Digest { app: String },
    /// List applications with a stored manifest
    List,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show,
    /// Validate the effective configuration
    Validate,
}
