//! Archive presentation: pack and apply summaries.

use crate::archive::{ApplySummary, ArchiveHandle};
use std::path::Path;

pub fn format_pack_summary(archive: &ArchiveHandle) -> String {
    let mut out = format!(
        "Wrote archive {} ({} bytes)",
        archive.path().display(),
        archive.size_bytes()
    );
    if let Some(stats) = archive.stats() {
        out.push_str(&format!(
            "\n  Files: {}\n  Directories: {}",
            stats.files, stats.directories
        ));
    }
    out
}

pub fn format_apply_summary(target: &Path, summary: &ApplySummary) -> String {
    format!(
        "Applied archive to {}\n  Files written: {}\n  Directories: {}",
        target.display(),
        summary.files,
        summary.directories
    )
}
