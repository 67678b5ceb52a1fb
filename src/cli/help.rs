//! CLI help and command-name contract for logging.

use crate::cli::parse::{Commands, ConfigCommands, ServerCommands};

/// Command name string for log spans (e.g. "server.recompute", "config.show").
pub fn command_name(command: &Commands) -> String {
    match command {
        Commands::Manifest { .. } => "manifest".to_string(),
        Commands::Diff { .. } => "diff".to_string(),
        Commands::Pack { .. } => "pack".to_string(),
        Commands::Apply { .. } => "apply".to_string(),
        Commands::Server { command } => format!("server.{}", server_command_name(command)),
        Commands::Sync { check: true, .. } => "sync.check".to_string(),
        Commands::Sync { .. } => "sync".to_string(),
        Commands::Config { command } => format!("config.{}", config_command_name(command)),
    }
}

pub fn server_command_name(command: &ServerCommands) -> &'static str {
    match command {
        ServerCommands::Recompute { .. } => "recompute",
        ServerCommands::Compare { .. } => "compare",
        ServerCommands::Fetch { .. } => "fetch",
        ServerCommands::Digest { .. } => "digest",
        ServerCommands::List => "list",
    }
}

pub fn config_command_name(command: &ConfigCommands) -> &'static str {
    match command {
        ConfigCommands::Show => "show",
        ConfigCommands::Validate => "validate",
    }
}
