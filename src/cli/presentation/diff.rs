//! Diff presentation.

use crate::error::{ApiError, StorageError};
use crate::tree::node::DiffTree;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;

pub fn format_diff_text(diff: &DiffTree) -> String {
    if diff.is_empty() {
        return "Up to date.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Needs update"]);
    for path in diff.file_paths() {
        table.add_row(vec![path]);
    }
    format!("{}\n{} file(s) differ", table, diff.file_count())
}

pub fn format_diff_json(diff: &DiffTree) -> Result<String, ApiError> {
    serde_json::to_string_pretty(diff)
        .map_err(|e| ApiError::StorageError(StorageError::Serialization(e.to_string())))
}
