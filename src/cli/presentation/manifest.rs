//! Manifest presentation: build summaries and stored record listings.

use super::shared::{format_section_heading, format_timestamp_ms};
use crate::service::ManifestSummary;
use crate::store::ManifestRecord;
use crate::types::ContentHash;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use std::path::Path;

pub fn format_manifest_summary(out: &Path, file_count: usize, digest: &ContentHash) -> String {
    format!(
        "Wrote manifest of {} files to {}\n  Digest: {}",
        file_count,
        out.display(),
        digest
    )
}

pub fn format_recompute_summary(summary: &ManifestSummary) -> String {
    format!(
        "Recomputed master manifest for '{}'\n  Files: {}\n  Digest: {}\n  Computed at: {}",
        summary.app_id,
        summary.file_count,
        summary.digest,
        format_timestamp_ms(summary.computed_at_ms)
    )
}

pub fn format_record_table(records: &[ManifestRecord]) -> String {
    if records.is_empty() {
        return "No master manifests stored.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Application", "Files", "Digest", "Computed at"]);
    for record in records {
        let digest = record.digest.to_hex();
        table.add_row(vec![
            record.app_id.clone(),
            record.file_count.to_string(),
            format!("{}...", &digest[..12]),
            format_timestamp_ms(record.computed_at_ms),
        ]);
    }
    format!("{}\n\n{}", format_section_heading("Master manifests"), table)
}
