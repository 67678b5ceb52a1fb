//! Updraft: Incremental Application Updates
//!
//! Describes an install directory as a tree of content digests, diffs it
//! against a master tree, and ships only the differing files as an overlay
//! archive.

pub mod archive;
pub mod cli;
pub mod client;
pub mod concurrency;
pub mod config;
pub mod error;
pub mod logging;
pub mod progress;
pub mod service;
pub mod store;
pub mod tree;
pub mod types;
