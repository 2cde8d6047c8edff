//! Full mirror passes against the in-memory remote

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use drimesync_codec::{EncryptionKey, PathCodec};
use drimesync_core::config::SNAPSHOT_FILE_NAME;
use drimesync_core::domain::{ConfidentialityMode, MirrorPhase, PassStatus};
use drimesync_core::ports::{ISyncObserver, NullObserver};
use drimesync_sync::{MirrorOrchestrator, PassOptions, SyncError};
use tempfile::TempDir;

use crate::common::{config_for, fast_settings, MemoryRemote, Mirror};

fn orchestrator(mirror: &Mirror, remote: &MemoryRemote, codec: PathCodec) -> MirrorOrchestrator {
    orchestrator_with(mirror, remote, codec, 4, Arc::new(NullObserver))
}

fn orchestrator_with(
    mirror: &Mirror,
    remote: &MemoryRemote,
    codec: PathCodec,
    workers: usize,
    observer: Arc<dyn ISyncObserver>,
) -> MirrorOrchestrator {
    let config = mirror.config(codec.mode());
    let settings = fast_settings(&config, workers);
    MirrorOrchestrator::new(config, Arc::new(remote.clone()), Arc::new(codec), observer)
        .with_settings(settings)
}

fn example_mirror() -> Mirror {
    let mirror = Mirror::new();
    mirror.write("a.txt", &[b'a'; 10]);
    mirror.write("dir/b.txt", &[b'b'; 20]);
    mirror
}

fn set(paths: &[&str]) -> BTreeSet<String> {
    paths.iter().map(|p| p.to_string()).collect()
}

#[derive(Default)]
struct PhaseRecorder {
    phases: Mutex<Vec<MirrorPhase>>,
}

impl ISyncObserver for PhaseRecorder {
    fn phase(&self, phase: &MirrorPhase) {
        self.phases.lock().unwrap().push(phase.clone());
    }
}

#[tokio::test]
async fn test_second_pass_is_empty() {
    let mirror = example_mirror();
    let remote = MemoryRemote::new();
    let mut orch = orchestrator(&mirror, &remote, PathCodec::plain());

    let first = orch.run(PassOptions::default()).await.unwrap();
    assert_eq!(first.status, PassStatus::Completed);
    assert_eq!(first.planned, 3);
    assert_eq!(first.succeeded, 3);
    assert_eq!(orch.phase(), &MirrorPhase::Done);
    assert!(mirror
        .config(ConfidentialityMode::Plain)
        .snapshot_path()
        .exists());
    assert!(remote
        .file_paths()
        .contains(".SyncStateFiles/00_drime_cloud_tree.json"));
    assert_eq!(remote.mirrored_files(), set(&["a.txt", "dir/b.txt"]));

    let second = orch.run(PassOptions::default()).await.unwrap();
    assert_eq!(second.planned, 0);
    assert_eq!(second.failed, 0);
    assert_eq!(orch.phase(), &MirrorPhase::Done);
}

#[tokio::test]
async fn test_phases_are_reported_in_order() {
    let mirror = example_mirror();
    let remote = MemoryRemote::new();
    let recorder = Arc::new(PhaseRecorder::default());
    let mut orch = orchestrator_with(
        &mirror,
        &remote,
        PathCodec::plain(),
        2,
        Arc::clone(&recorder) as Arc<dyn ISyncObserver>,
    );

    orch.run(PassOptions::default()).await.unwrap();

    assert_eq!(
        *recorder.phases.lock().unwrap(),
        vec![
            MirrorPhase::Scanning,
            MirrorPhase::Diffing,
            MirrorPhase::Transferring,
            MirrorPhase::Checkpointing,
            MirrorPhase::Publishing,
            MirrorPhase::Done,
        ]
    );
}

#[tokio::test]
async fn test_rename_between_passes() {
    let mirror = example_mirror();
    let remote = MemoryRemote::new();
    let mut orch = orchestrator(&mirror, &remote, PathCodec::plain());
    orch.run(PassOptions::default()).await.unwrap();

    mirror.rename("dir/b.txt", "dir/renamed.txt");
    let report = orch.run(PassOptions::default()).await.unwrap();

    assert_eq!(report.planned, 1);
    assert_eq!(report.renamed, 1);
    assert_eq!(report.succeeded, 0);
    assert_eq!(remote.mirrored_files(), set(&["a.txt", "dir/renamed.txt"]));
}

#[tokio::test]
async fn test_force_resync_wipes_unrelated_entries() {
    let mirror = example_mirror();
    let remote = MemoryRemote::new();
    remote.seed_file("unrelated-1.txt", b"1");
    remote.seed_file("unrelated-2.txt", b"2");
    remote.seed_folder("unrelated-3");
    let mut orch = orchestrator(&mirror, &remote, PathCodec::plain());

    let report = orch
        .run(PassOptions {
            force_resync: true,
            ..PassOptions::default()
        })
        .await
        .unwrap();

    assert_eq!(remote.delete_batches()[0], 3);
    assert_eq!(report.planned, 3);
    assert_eq!(report.succeeded, 3);
    assert_eq!(remote.mirrored_files(), set(&["a.txt", "dir/b.txt"]));
    assert!(!remote.folder_paths().contains("unrelated-3"));
}

#[tokio::test]
async fn test_force_resync_discards_known_state() {
    let mirror = example_mirror();
    let remote = MemoryRemote::new();
    let mut orch = orchestrator(&mirror, &remote, PathCodec::plain());
    orch.run(PassOptions::default()).await.unwrap();

    let report = orch
        .run(PassOptions {
            force_resync: true,
            ..PassOptions::default()
        })
        .await
        .unwrap();

    assert_eq!(report.planned, 3);
    assert_eq!(report.succeeded, 3);
    assert_eq!(remote.mirrored_files(), set(&["a.txt", "dir/b.txt"]));
}

#[tokio::test]
async fn test_dry_run_changes_nothing() {
    let mirror = example_mirror();
    let remote = MemoryRemote::new();
    let recorder = Arc::new(PhaseRecorder::default());
    let mut orch = orchestrator_with(
        &mirror,
        &remote,
        PathCodec::plain(),
        4,
        Arc::clone(&recorder) as Arc<dyn ISyncObserver>,
    );

    let report = orch
        .run(PassOptions {
            dry_run: true,
            ..PassOptions::default()
        })
        .await
        .unwrap();

    assert_eq!(report.status, PassStatus::DryRun);
    assert_eq!(report.planned, 3);
    assert_eq!(report.succeeded, 3);
    assert_eq!(report.bytes_transferred, 30);
    assert_eq!(remote.mutations(), 0);
    assert_eq!(remote.entry_count(), 0);
    assert!(!mirror
        .config(ConfidentialityMode::Plain)
        .snapshot_path()
        .exists());
    assert_eq!(
        *recorder.phases.lock().unwrap(),
        vec![MirrorPhase::Scanning, MirrorPhase::Diffing, MirrorPhase::Done]
    );
}

#[tokio::test]
async fn test_dry_run_force_resync_keeps_remote() {
    let mirror = example_mirror();
    let remote = MemoryRemote::new();
    remote.seed_file("unrelated-1.txt", b"1");
    remote.seed_file("unrelated-2.txt", b"2");
    remote.seed_folder("unrelated-3");
    let recorder = Arc::new(PhaseRecorder::default());
    let mut orch = orchestrator_with(
        &mirror,
        &remote,
        PathCodec::plain(),
        4,
        Arc::clone(&recorder) as Arc<dyn ISyncObserver>,
    );

    let report = orch
        .run(PassOptions {
            dry_run: true,
            force_resync: true,
        })
        .await
        .unwrap();

    assert_eq!(report.status, PassStatus::DryRun);
    assert_eq!(report.planned, 3);
    assert_eq!(remote.entry_count(), 3);
    assert_eq!(remote.mutations(), 0);
    assert!(remote.delete_batches().is_empty());
    assert!(!recorder
        .phases
        .lock()
        .unwrap()
        .contains(&MirrorPhase::ForceResync));
}

#[tokio::test]
async fn test_dry_run_force_resync_keeps_local_snapshot() {
    let mirror = example_mirror();
    let remote = MemoryRemote::new();
    let mut orch = orchestrator(&mirror, &remote, PathCodec::plain());
    orch.run(PassOptions::default()).await.unwrap();
    let entries = remote.entry_count();

    let report = orch
        .run(PassOptions {
            dry_run: true,
            force_resync: true,
        })
        .await
        .unwrap();

    // planned against an empty tree, as the real resync would be
    assert_eq!(report.planned, 3);
    assert_eq!(remote.entry_count(), entries);
    let saved = orch.state_store().load_local().unwrap().unwrap();
    assert_eq!(saved.files.len(), 2);

    let next = orch.run(PassOptions::default()).await.unwrap();
    assert_eq!(next.planned, 0);
}

#[tokio::test]
async fn test_mode_switch_starts_from_empty_state() {
    let mirror = example_mirror();
    let remote = MemoryRemote::new();
    let plain = orchestrator(&mirror, &remote, PathCodec::plain())
        .run(PassOptions::default())
        .await
        .unwrap();
    assert_eq!(plain.succeeded, 3);

    let before = remote.file_paths();

    let key = EncryptionKey::from_bytes([9u8; 32]);
    let codec = PathCodec::new(ConfidentialityMode::Full, Some(key)).unwrap();
    let mut full = orchestrator(&mirror, &remote, codec.clone());
    let report = full.run(PassOptions::default()).await.unwrap();

    assert!(report.planned > 0);
    assert_eq!(report.failed, 0);
    let decoded: BTreeSet<String> = remote
        .file_paths()
        .difference(&before)
        .map(|p| codec.decode_path(p, false))
        .collect();
    assert!(decoded.contains("a.txt"));
    assert!(decoded.contains("dir/b.txt"));
    assert_ne!(
        mirror.config(ConfidentialityMode::Plain).snapshot_path(),
        mirror.config(ConfidentialityMode::Full).snapshot_path()
    );

    // the plain snapshot is still valid for plain passes
    let again = orchestrator(&mirror, &remote, PathCodec::plain())
        .run(PassOptions::default())
        .await
        .unwrap();
    assert_eq!(again.planned, 0);
}

#[tokio::test]
async fn test_workspace_switch_starts_from_empty_state() {
    let mirror = example_mirror();
    let first_workspace = MemoryRemote::new();
    orchestrator(&mirror, &first_workspace, PathCodec::plain())
        .run(PassOptions::default())
        .await
        .unwrap();

    let other_workspace = MemoryRemote::new();
    let mut config = mirror.config(ConfidentialityMode::Plain);
    config.mirror.workspace_id = "7".into();
    let settings = fast_settings(&config, 2);
    let mut orch = MirrorOrchestrator::new(
        config,
        Arc::new(other_workspace.clone()),
        Arc::new(PathCodec::plain()),
        Arc::new(NullObserver),
    )
    .with_settings(settings);

    let report = orch.run(PassOptions::default()).await.unwrap();

    assert_eq!(report.planned, 3);
    assert_eq!(report.succeeded, 3);
    assert_eq!(other_workspace.mirrored_files(), set(&["a.txt", "dir/b.txt"]));
}

#[tokio::test]
async fn test_cancelled_pass_saves_progress_without_publishing() {
    let mirror = Mirror::new();
    for i in 0..5 {
        mirror.write(&format!("file-{i}.txt"), format!("content {i}").as_bytes());
    }
    let remote = MemoryRemote::new();
    let mut orch = orchestrator_with(&mirror, &remote, PathCodec::plain(), 1, Arc::new(NullObserver));
    remote.cancel_after_files(2, orch.control());

    let report = orch.run(PassOptions::default()).await.unwrap();

    assert_eq!(report.status, PassStatus::Cancelled);
    assert_eq!(report.succeeded, 2);
    assert_eq!(orch.phase(), &MirrorPhase::Cancelled);
    assert!(!remote
        .file_paths()
        .iter()
        .any(|p| p.starts_with(".SyncStateFiles")));
    let saved = orch.state_store().load_local().unwrap().unwrap();
    assert_eq!(saved.files.len(), 2);

    // A new pass picks up where the cancelled one stopped
    let mut resumed = orchestrator(&mirror, &remote, PathCodec::plain());
    let report = resumed.run(PassOptions::default()).await.unwrap();
    assert_eq!(report.status, PassStatus::Completed);
    assert_eq!(report.planned, 3);
    assert_eq!(remote.mirrored_files().len(), 5);
}

#[tokio::test]
async fn test_new_device_recovers_published_snapshot() {
    let mirror = example_mirror();
    let remote = MemoryRemote::new();
    orchestrator(&mirror, &remote, PathCodec::plain())
        .run(PassOptions::default())
        .await
        .unwrap();

    let fresh_state = TempDir::new().unwrap();
    let config = config_for(mirror.root.path(), fresh_state.path(), ConfidentialityMode::Plain);
    let snapshot = config.snapshot_path();
    let settings = fast_settings(&config, 2);
    let mut orch = MirrorOrchestrator::new(
        config,
        Arc::new(remote.clone()),
        Arc::new(PathCodec::plain()),
        Arc::new(NullObserver),
    )
    .with_settings(settings);

    let report = orch.run(PassOptions::default()).await.unwrap();

    assert_eq!(report.planned, 0);
    assert!(snapshot.exists());
    assert_eq!(snapshot.file_name().unwrap(), SNAPSHOT_FILE_NAME);
}

#[tokio::test]
async fn test_full_mode_snapshot_recovery() {
    let mirror = example_mirror();
    let remote = MemoryRemote::new();
    let key = EncryptionKey::from_bytes([9u8; 32]);
    let codec = PathCodec::new(ConfidentialityMode::Full, Some(key.clone())).unwrap();

    let first = orchestrator(&mirror, &remote, codec.clone())
        .run(PassOptions::default())
        .await
        .unwrap();
    assert_eq!(first.succeeded, 3);
    assert!(!remote
        .file_paths()
        .iter()
        .any(|p| p.contains("SyncStateFiles") || p.contains("a.txt")));

    let fresh_state = TempDir::new().unwrap();
    let config = config_for(mirror.root.path(), fresh_state.path(), ConfidentialityMode::Full);
    let settings = fast_settings(&config, 2);
    let mut orch = MirrorOrchestrator::new(
        config,
        Arc::new(remote.clone()),
        Arc::new(codec),
        Arc::new(NullObserver),
    )
    .with_settings(settings);

    let report = orch.run(PassOptions::default()).await.unwrap();
    assert_eq!(report.planned, 0);
}

#[tokio::test]
async fn test_missing_local_root_fails_the_pass() {
    let mirror = Mirror::new();
    let missing = mirror.root.path().join("does-not-exist");
    let config = config_for(&missing, mirror.state.path(), ConfidentialityMode::Plain);
    let remote = MemoryRemote::new();
    let mut orch = MirrorOrchestrator::new(
        config,
        Arc::new(remote.clone()),
        Arc::new(PathCodec::plain()),
        Arc::new(NullObserver),
    );

    let err = orch.run(PassOptions::default()).await.unwrap_err();

    assert!(matches!(err, SyncError::LocalRootUnreadable(_)));
    assert!(matches!(orch.phase(), MirrorPhase::Failed(_)));
    assert_eq!(remote.mutations(), 0);
}
