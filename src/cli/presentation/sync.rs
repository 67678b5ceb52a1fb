//! Sync presentation: progress lines and final outcome.

use crate::client::SyncOutcome;
use crate::progress::ProgressUpdate;
use owo_colors::OwoColorize;

pub fn format_progress_line(update: &ProgressUpdate) -> String {
    let percent = format!("[{:>3}%]", update.percent);
    if update.is_error() {
        format!("{} {}", percent.red(), update.label)
    } else {
        format!("{} {}", percent.dimmed(), update.label)
    }
}

pub fn format_sync_outcome(outcome: &SyncOutcome) -> String {
    match outcome {
        SyncOutcome::UpToDate => "Up to date.".to_string(),
        SyncOutcome::UpdateAvailable(diff) => {
            let mut out = format!("Update available: {} file(s)", diff.file_count());
            for path in diff.file_paths() {
                out.push_str(&format!("\n  {}", path));
            }
            out
        }
        SyncOutcome::Updated(summary) => format!(
            "Update applied: {} file(s), {} director(ies)",
            summary.files, summary.directories
        ),
    }
}
