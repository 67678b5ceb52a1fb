//! CLI presentation: text and json formatters per command family.

mod archive;
mod diff;
mod manifest;
mod shared;
mod sync;

pub use archive::{format_apply_summary, format_pack_summary};
pub use diff::{format_diff_json, format_diff_text};
pub use manifest::{format_manifest_summary, format_recompute_summary, format_record_table};
pub use sync::{format_progress_line, format_sync_outcome};
