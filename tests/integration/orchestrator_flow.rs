//! Integration tests for the client sync workflow over an in-process service

use super::test_utils::{read, write_tree};
use std::sync::Arc;
use tempfile::TempDir;
use updraft::client::{LocalTransport, SyncOrchestrator, SyncOutcome, SyncState, UpdateTransport};
use updraft::error::ApiError;
use updraft::progress::ProgressBus;
use updraft::service::{MasterRoots, UpdateService};
use updraft::store::SledManifestStore;

struct Fixture {
    masters: TempDir,
    install: TempDir,
    _staging: TempDir,
    transport: Arc<dyn UpdateTransport>,
}

fn fixture() -> Fixture {
    let masters = TempDir::new().unwrap();
    let install = TempDir::new().unwrap();
    let staging = TempDir::new().unwrap();
    let service = UpdateService::new(
        Arc::new(SledManifestStore::temporary().unwrap()),
        MasterRoots::new(masters.path()),
        staging.path(),
    );
    Fixture {
        masters,
        install,
        _staging: staging,
        transport: Arc::new(LocalTransport::new(Arc::new(service))),
    }
}

#[tokio::test]
async fn test_full_update_brings_install_in_line() {
    let fx = fixture();
    write_tree(
        &fx.masters.path().join("editor"),
        &[("main.js", "v2"), ("lib/core.js", "core"), ("app.asar", "packed")],
    );
    write_tree(fx.install.path(), &[("main.js", "v1"), ("settings.json", "{}")]);

    let (bus, updates) = ProgressBus::new_pair();
    let orchestrator =
        SyncOrchestrator::new(Arc::clone(&fx.transport), "editor", fx.install.path()).with_progress(bus);

    match orchestrator.update().await.unwrap() {
        SyncOutcome::Updated(summary) => assert_eq!(summary.files, 2),
        other => panic!("expected an applied update, got {:?}", other),
    }
    assert_eq!(orchestrator.state(), SyncState::Restarting);

    assert_eq!(read(fx.install.path(), "main.js"), "v2");
    assert_eq!(read(fx.install.path(), "lib/core.js"), "core");
    assert_eq!(read(fx.install.path(), "settings.json"), "{}");
    assert!(!fx.install.path().join("app.asar").exists());

    let percents: Vec<u8> = updates.try_iter().map(|u| u.percent).collect();
    assert_eq!(percents, vec![10, 25, 50, 50, 75, 90, 100]);

    // A second run finds nothing to do
    assert_eq!(orchestrator.update().await.unwrap(), SyncOutcome::UpToDate);
}

#[tokio::test]
async fn test_check_leaves_install_untouched() {
    let fx = fixture();
    write_tree(&fx.masters.path().join("editor"), &[("main.js", "v2")]);
    write_tree(fx.install.path(), &[("main.js", "v1")]);

    let orchestrator = SyncOrchestrator::new(Arc::clone(&fx.transport), "editor", fx.install.path());
    match orchestrator.check().await.unwrap() {
        SyncOutcome::UpdateAvailable(diff) => assert_eq!(diff.file_paths(), vec!["main.js".to_string()]),
        other => panic!("expected an available update, got {:?}", other),
    }
    assert_eq!(read(fx.install.path(), "main.js"), "v1");
}

#[tokio::test]
async fn test_unknown_application_surfaces_as_error_state() {
    let fx = fixture();
    let (bus, updates) = ProgressBus::new_pair();
    let orchestrator =
        SyncOrchestrator::new(Arc::clone(&fx.transport), "ghost", fx.install.path()).with_progress(bus);

    let err = orchestrator.update().await.unwrap_err();
    assert!(matches!(err, ApiError::UnknownApplication(_)));
    assert!(matches!(orchestrator.state(), SyncState::Error(_)));

    let last = updates.try_iter().last().unwrap();
    assert_eq!(last.percent, 0);
    assert!(last.is_error());
}
