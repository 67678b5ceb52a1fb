//! Content-hash trees
//!
//! Represents an install directory as a tree of BLAKE3 file digests and
//! computes one-directional diffs between two such trees.

pub mod builder;
pub mod diff;
pub mod exclude;
pub mod hasher;
pub mod node;
pub mod path;

pub use builder::{build_manifest, ManifestBuilder};
pub use diff::diff;
pub use exclude::ExclusionRules;
pub use node::{Children, DiffTree, HashNode, Manifest};
