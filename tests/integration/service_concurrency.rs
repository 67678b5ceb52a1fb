//! Integration tests for the update service under concurrent use

use super::test_utils::write_tree;
use std::sync::Arc;
use tempfile::TempDir;
use updraft::error::ApiError;
use updraft::service::{MasterRoots, UpdateService};
use updraft::store::SledManifestStore;
use updraft::tree::{build_manifest, ExclusionRules, Manifest};

fn service(masters: &TempDir, staging: &TempDir) -> Arc<UpdateService> {
    let store = SledManifestStore::temporary().unwrap();
    Arc::new(UpdateService::new(
        Arc::new(store),
        MasterRoots::new(masters.path()),
        staging.path(),
    ))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_recomputes_for_distinct_apps() {
    let masters = TempDir::new().unwrap();
    let staging = TempDir::new().unwrap();
    for app in ["alpha", "beta", "gamma", "delta"] {
        write_tree(
            &masters.path().join(app),
            &[("main.js", app), ("lib/util.js", "shared")],
        );
    }
    let service = service(&masters, &staging);

    let handles: Vec<_> = ["alpha", "beta", "gamma", "delta"]
        .into_iter()
        .map(|app| {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.recompute_manifest(app).await })
        })
        .collect();
    for handle in handles {
        let summary = handle.await.unwrap().unwrap();
        assert_eq!(summary.file_count, 2);
    }

    let mut apps = service.list_applications().unwrap();
    apps.sort();
    assert_eq!(apps, vec!["alpha", "beta", "delta", "gamma"]);

    // Each application keeps its own snapshot
    let alpha = service.manifest_digest("alpha").await.unwrap();
    let beta = service.manifest_digest("beta").await.unwrap();
    assert_ne!(alpha, beta);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_recomputes_for_one_app_agree() {
    let masters = TempDir::new().unwrap();
    let staging = TempDir::new().unwrap();
    write_tree(&masters.path().join("editor"), &[("a.txt", "a"), ("b/c.txt", "c")]);
    let service = service(&masters, &staging);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.recompute_manifest("editor").await })
        })
        .collect();
    let mut digests = Vec::new();
    for handle in handles {
        digests.push(handle.await.unwrap().unwrap().digest);
    }
    digests.dedup();
    assert_eq!(digests.len(), 1);

    let expected = build_manifest(&masters.path().join("editor"), &ExclusionRules::default())
        .await
        .unwrap()
        .digest()
        .unwrap();
    assert_eq!(service.manifest_digest("editor").await.unwrap(), expected);
}

#[tokio::test]
async fn test_compare_before_recompute_is_not_found() {
    let masters = TempDir::new().unwrap();
    let staging = TempDir::new().unwrap();
    write_tree(&masters.path().join("editor"), &[("a.txt", "a")]);
    let service = service(&masters, &staging);

    let err = service
        .compare_manifest("editor", &Manifest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(app) if app == "editor"));
}

#[tokio::test]
async fn test_unknown_application_is_rejected() {
    let masters = TempDir::new().unwrap();
    let staging = TempDir::new().unwrap();
    let service = service(&masters, &staging);

    assert!(matches!(
        service.recompute_manifest("missing").await,
        Err(ApiError::UnknownApplication(_))
    ));
    assert!(matches!(
        service.recompute_manifest("../escape").await,
        Err(ApiError::UnknownApplication(_))
    ));
}

#[tokio::test]
async fn test_compare_uses_snapshot_not_live_tree() {
    let masters = TempDir::new().unwrap();
    let staging = TempDir::new().unwrap();
    let root = masters.path().join("editor");
    write_tree(&root, &[("a.txt", "v1")]);
    let service = service(&masters, &staging);

    service.recompute_manifest("editor").await.unwrap();
    let local = build_manifest(&root, &ExclusionRules::default()).await.unwrap();
    write_tree(&root, &[("a.txt", "v2")]);

    assert!(service.compare_manifest("editor", &local).await.unwrap().is_empty());

    service.recompute_manifest("editor").await.unwrap();
    let after = service.compare_manifest("editor", &local).await.unwrap();
    assert_eq!(after.file_paths(), vec!["a.txt".to_string()]);
}
