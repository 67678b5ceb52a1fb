//! Hash tree node types: manifests and sparse diff trees

use crate::error::StorageError;
use crate::tree::hasher;
use crate::tree::path::validate_entry_name;
use crate::types::{ContentHash, Hash};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Children of a directory node, keyed by entry name.
pub type Children = BTreeMap<String, HashNode>;

/// A node in a content-hash tree.
///
/// A node's name is its key in the parent's children map. On the wire a file is
/// its hex digest and a directory is an object of its children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HashNode {
    File(ContentHash),
    Directory(Children),
}

impl HashNode {
    pub fn file(hash: impl Into<ContentHash>) -> Self {
        HashNode::File(hash.into())
    }

    pub fn directory(children: Children) -> Self {
        HashNode::Directory(children)
    }

    pub fn is_file(&self) -> bool {
        matches!(self, HashNode::File(_))
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, HashNode::Directory(_))
    }

    /// Number of file leaves at or below this node.
    pub fn file_count(&self) -> usize {
        match self {
            HashNode::File(_) => 1,
            HashNode::Directory(children) => children.values().map(HashNode::file_count).sum(),
        }
    }
}

/// Snapshot of an install directory: the children of its root directory node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    entries: Children,
}

impl Manifest {
    pub fn new(entries: Children) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &Children {
        &self.entries
    }

    pub fn into_entries(self) -> Children {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a node by its `/`-separated relative path.
    pub fn get(&self, relative_path: &str) -> Option<&HashNode> {
        lookup(&self.entries, relative_path)
    }

    pub fn file_count(&self) -> usize {
        self.entries.values().map(HashNode::file_count).sum()
    }

    /// Digest of the canonical JSON form. Equal manifests have equal digests.
    pub fn digest(&self) -> Result<ContentHash, StorageError> {
        let json = serde_json::to_vec(&self.entries)
            .map_err(|e| StorageError::Serialization(format!("Failed to encode manifest: {}", e)))?;
        Ok(ContentHash(hasher::compute_hash(&json)))
    }

    pub fn to_json(&self) -> Result<String, StorageError> {
        serde_json::to_string(self)
            .map_err(|e| StorageError::Serialization(format!("Failed to encode manifest: {}", e)))
    }

    /// Parse a manifest received from elsewhere, rejecting unsafe entry names.
    pub fn from_json(json: &str) -> Result<Self, StorageError> {
        let manifest: Manifest = serde_json::from_str(json)
            .map_err(|e| StorageError::Serialization(format!("Failed to decode manifest: {}", e)))?;
        validate_children(&manifest.entries)?;
        Ok(manifest)
    }
}

/// Sparse tree of the entries that must be fetched from the base tree.
///
/// Same shape as a manifest; a directory appears only when something below it differs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiffTree {
    entries: Children,
}

impl DiffTree {
    pub fn new(entries: Children) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &Children {
        &self.entries
    }

    /// Empty means the comparison tree is up to date with the base tree.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, relative_path: &str) -> Option<&HashNode> {
        lookup(&self.entries, relative_path)
    }

    pub fn file_count(&self) -> usize {
        self.entries.values().map(HashNode::file_count).sum()
    }

    /// Relative paths of every file entry, `/`-separated, in sorted order.
    pub fn file_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        collect_file_paths(&self.entries, "", &mut paths);
        paths
    }

    pub fn to_json(&self) -> Result<String, StorageError> {
        serde_json::to_string(self)
            .map_err(|e| StorageError::Serialization(format!("Failed to encode diff: {}", e)))
    }

    /// Parse a diff received from elsewhere, rejecting unsafe entry names.
    pub fn from_json(json: &str) -> Result<Self, StorageError> {
        let diff: DiffTree = serde_json::from_str(json)
            .map_err(|e| StorageError::Serialization(format!("Failed to decode diff: {}", e)))?;
        validate_children(&diff.entries)?;
        Ok(diff)
    }
}

/// Check every name in a tree with [`validate_entry_name`].
pub fn validate_children(children: &Children) -> Result<(), StorageError> {
    for (name, node) in children {
        validate_entry_name(name)?;
        if let HashNode::Directory(grandchildren) = node {
            validate_children(grandchildren)?;
        }
    }
    Ok(())
}

fn lookup<'a>(children: &'a Children, relative_path: &str) -> Option<&'a HashNode> {
    let mut parts = relative_path.split('/').filter(|p| !p.is_empty());
    let mut node = children.get(parts.next()?)?;
    for part in parts {
        match node {
            HashNode::Directory(children) => node = children.get(part)?,
            HashNode::File(_) => return None,
        }
    }
    Some(node)
}

fn collect_file_paths(children: &Children, prefix: &str, out: &mut Vec<String>) {
    for (name, node) in children {
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{}/{}", prefix, name)
        };
        match node {
            HashNode::File(_) => out.push(path),
            HashNode::Directory(grandchildren) => collect_file_paths(grandchildren, &path, out),
        }
    }
}

/// Convenience for tests and fixtures: a file node from raw digest bytes.
pub fn file_node(hash: Hash) -> HashNode {
    HashNode::File(ContentHash(hash))
}
