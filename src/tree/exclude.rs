//! Name-based exclusion rules for manifests, diffs and archives.
//!
//! An excluded name never enters a tree: it is not hashed, not recursed into,
//! and can never be named by a diff or carried by an archive.

use serde::{Deserialize, Serialize};

/// Packaged-resource suffix excluded by default.
pub const DEFAULT_EXCLUDED_SUFFIX: &str = ".asar";

/// Exclusion rules matched against a single entry name (never a full path).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionRules {
    /// Names ending with any of these suffixes are excluded
    #[serde(default)]
    pub suffixes: Vec<String>,
    /// Names equal to any of these are excluded
    #[serde(default)]
    pub names: Vec<String>,
}

impl Default for ExclusionRules {
    fn default() -> Self {
        Self {
            suffixes: vec![DEFAULT_EXCLUDED_SUFFIX.to_string()],
            names: Vec::new(),
        }
    }
}

impl ExclusionRules {
    /// Rules that exclude nothing.
    pub fn none() -> Self {
        Self {
            suffixes: Vec::new(),
            names: Vec::new(),
        }
    }

    pub fn new(suffixes: Vec<String>, names: Vec<String>) -> Self {
        Self { suffixes, names }
    }

    pub fn is_excluded(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
            || self
                .suffixes
                .iter()
                .any(|suffix| !suffix.is_empty() && name.ends_with(suffix.as_str()))
    }

    /// True when any segment of a relative path is excluded.
    pub fn excludes_any<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> bool {
        segments.into_iter().any(|s| self.is_excluded(s))
    }
}
