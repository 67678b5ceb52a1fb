//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::ApiError;

/// Map domain/service errors to a string for CLI output.
pub fn map_error(e: &ApiError) -> String {
    match e {
        ApiError::NotFound(app_id) => format!(
            "No master manifest for '{}'. Run `updraft server recompute {}` first.",
            app_id, app_id
        ),
        other => other.to_string(),
    }
}
