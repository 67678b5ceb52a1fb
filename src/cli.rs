//! CLI domain: parse, route, help, output, and presentation only.
//! No domain orchestration; single route table dispatches to domain services.

mod help;
mod output;
mod parse;
mod presentation;
mod route;

pub use help::command_name;
pub use output::map_error;
pub use parse::{Cli, Commands, ConfigCommands, ServerCommands};
pub use presentation::{
    format_apply_summary, format_diff_json, format_diff_text, format_manifest_summary,
    format_pack_summary, format_progress_line, format_recompute_summary, format_record_table,
    format_sync_outcome,
};
pub use route::RunContext;
