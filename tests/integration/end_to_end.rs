//! Integration tests for manifest, diff, archive and apply working together

use super::test_utils::{read, write_tree};
use std::collections::BTreeSet;
use tempfile::TempDir;
use updraft::archive::{apply_archive, build_archive};
use updraft::tree::hasher::hash_file;
use updraft::tree::{build_manifest, diff, ExclusionRules, HashNode};
use walkdir::WalkDir;

/// Every non-excluded file under `master` hashes the same under `local`.
fn assert_master_files_match(master: &std::path::Path, local: &std::path::Path, rules: &ExclusionRules) {
    for entry in WalkDir::new(master)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !rules.is_excluded(&e.file_name().to_string_lossy()))
    {
        let entry = entry.unwrap();
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(master).unwrap();
        assert_eq!(
            hash_file(entry.path()).unwrap(),
            hash_file(&local.join(relative)).unwrap(),
            "{} differs after apply",
            relative.display()
        );
    }
}

/// Every file path inside an archive, as written by the builder.
fn archive_paths(path: &std::path::Path) -> BTreeSet<String> {
    let file = std::fs::File::open(path).unwrap();
    let mut archive = tar::Archive::new(flate2::read::GzDecoder::new(file));
    archive
        .entries()
        .unwrap()
        .map(|entry| entry.unwrap())
        .filter(|entry| entry.header().entry_type().is_file())
        .map(|entry| entry.path().unwrap().to_string_lossy().into_owned())
        .collect()
}

#[tokio::test]
async fn test_changed_nested_file_is_the_only_update() {
    let master = TempDir::new().unwrap();
    let local = TempDir::new().unwrap();
    let staging = TempDir::new().unwrap();
    write_tree(master.path(), &[("a.txt", "one"), ("sub/b.txt", "two")]);
    write_tree(local.path(), &[("a.txt", "one"), ("sub/b.txt", "stale")]);

    let rules = ExclusionRules::default();
    let master_manifest = build_manifest(master.path(), &rules).await.unwrap();
    let local_manifest = build_manifest(local.path(), &rules).await.unwrap();

    let result = diff(&master_manifest, &local_manifest);
    assert_eq!(result.file_paths(), vec!["sub/b.txt".to_string()]);
    match result.get("sub") {
        Some(HashNode::Directory(children)) => {
            assert_eq!(children.get("b.txt"), master_manifest.get("sub/b.txt"));
        }
        other => panic!("expected directory node, got {:?}", other),
    }

    let archive = build_archive(&result, master.path(), staging.path(), &rules)
        .await
        .unwrap();
    let paths = archive_paths(archive.path());
    assert_eq!(paths, BTreeSet::from(["sub/b.txt".to_string()]));

    apply_archive(&archive, local.path(), &rules).await.unwrap();
    assert_eq!(read(local.path(), "sub/b.txt"), "two");
    assert_eq!(read(local.path(), "a.txt"), "one");

    let refreshed = build_manifest(local.path(), &rules).await.unwrap();
    assert!(diff(&master_manifest, &refreshed).is_empty());
}

#[tokio::test]
async fn test_local_only_files_survive_update() {
    let master = TempDir::new().unwrap();
    let local = TempDir::new().unwrap();
    let staging = TempDir::new().unwrap();
    write_tree(master.path(), &[("app/main.js", "v2")]);
    write_tree(local.path(), &[("app/main.js", "v1"), ("app/user.json", "prefs")]);

    let rules = ExclusionRules::default();
    let result = diff(
        &build_manifest(master.path(), &rules).await.unwrap(),
        &build_manifest(local.path(), &rules).await.unwrap(),
    );
    let archive = build_archive(&result, master.path(), staging.path(), &rules)
        .await
        .unwrap();
    apply_archive(&archive, local.path(), &rules).await.unwrap();

    assert_eq!(read(local.path(), "app/main.js"), "v2");
    assert_eq!(read(local.path(), "app/user.json"), "prefs");
}

#[tokio::test]
async fn test_applying_twice_is_idempotent() {
    let master = TempDir::new().unwrap();
    let local = TempDir::new().unwrap();
    let staging = TempDir::new().unwrap();
    write_tree(master.path(), &[("x/y/z.txt", "deep"), ("top.txt", "top")]);

    let rules = ExclusionRules::default();
    let master_manifest = build_manifest(master.path(), &rules).await.unwrap();
    let result = diff(&master_manifest, &build_manifest(local.path(), &rules).await.unwrap());
    let archive = build_archive(&result, master.path(), staging.path(), &rules)
        .await
        .unwrap();

    apply_archive(&archive, local.path(), &rules).await.unwrap();
    let first = build_manifest(local.path(), &rules).await.unwrap();
    apply_archive(&archive, local.path(), &rules).await.unwrap();
    let second = build_manifest(local.path(), &rules).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first, master_manifest);
    assert_master_files_match(master.path(), local.path(), &rules);
}

#[tokio::test]
async fn test_excluded_resources_never_travel() {
    let master = TempDir::new().unwrap();
    let local = TempDir::new().unwrap();
    let staging = TempDir::new().unwrap();
    write_tree(
        master.path(),
        &[
            ("resources/app.asar", "packed"),
            ("resources/deep/inner.asar", "packed"),
            ("resources/readme.txt", "docs"),
        ],
    );

    let rules = ExclusionRules::default();
    let master_manifest = build_manifest(master.path(), &rules).await.unwrap();
    assert!(master_manifest.get("resources/app.asar").is_none());
    assert!(master_manifest.get("resources/deep/inner.asar").is_none());

    let result = diff(&master_manifest, &build_manifest(local.path(), &rules).await.unwrap());
    let archive = build_archive(&result, master.path(), staging.path(), &rules)
        .await
        .unwrap();
    assert_eq!(
        archive_paths(archive.path()),
        BTreeSet::from(["resources/readme.txt".to_string()])
    );

    apply_archive(&archive, local.path(), &rules).await.unwrap();
    assert!(!local.path().join("resources/app.asar").exists());
    assert_eq!(read(local.path(), "resources/readme.txt"), "docs");
}

#[tokio::test]
async fn test_manifest_json_matches_wire_shape() {
    let root = TempDir::new().unwrap();
    write_tree(root.path(), &[("a.txt", "one"), ("sub/b.txt", "two")]);

    let manifest = build_manifest(root.path(), &ExclusionRules::default()).await.unwrap();
    let value: serde_json::Value = serde_json::from_str(&manifest.to_json().unwrap()).unwrap();

    let expected = blake3::hash(b"one").to_hex().to_string();
    assert_eq!(value["a.txt"], serde_json::Value::String(expected));
    assert!(value["sub"].is_object());
    assert!(value["sub"]["b.txt"].is_string());
}

#[cfg(unix)]
#[tokio::test]
async fn test_symlinked_master_file_is_delivered() {
    let master = TempDir::new().unwrap();
    let local = TempDir::new().unwrap();
    let staging = TempDir::new().unwrap();
    write_tree(master.path(), &[("real.txt", "payload")]);
    std::os::unix::fs::symlink(master.path().join("real.txt"), master.path().join("alias.txt")).unwrap();

    let rules = ExclusionRules::default();
    let master_manifest = build_manifest(master.path(), &rules).await.unwrap();
    assert_eq!(master_manifest.file_count(), 2);

    let result = diff(&master_manifest, &build_manifest(local.path(), &rules).await.unwrap());
    let archive = build_archive(&result, master.path(), staging.path(), &rules)
        .await
        .unwrap();
    apply_archive(&archive, local.path(), &rules).await.unwrap();

    assert_eq!(read(local.path(), "alias.txt"), "payload");
    assert!(!std::fs::symlink_metadata(local.path().join("alias.txt"))
        .unwrap()
        .file_type()
        .is_symlink());
    let refreshed = build_manifest(local.path(), &rules).await.unwrap();
    assert!(diff(&master_manifest, &refreshed).is_empty());
}
