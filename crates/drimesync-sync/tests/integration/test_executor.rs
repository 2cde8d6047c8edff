//! Transfer executor scenarios against the in-memory remote

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use drimesync_codec::{decrypt_bytes, EncryptionKey, PathCodec};
use drimesync_core::config::Config;
use drimesync_core::domain::{
    ConfidentialityMode, EntryId, FailureKind, LocalTree, PassStatus, RemoteError,
    RemoteFileEntry, RemoteTree,
};
use drimesync_core::ports::NullObserver;
use drimesync_sync::diff::diff;
use drimesync_sync::exclusions::ExclusionSet;
use drimesync_sync::scanner::scan;
use drimesync_sync::state_store::NoCheckpoint;
use drimesync_sync::{Checkpoint, TransferControl, TransferExecutor, TransferSettings};

use tempfile::TempDir;

use crate::common::{fast_settings, MemoryRemote, Mirror};

fn executor(remote: &MemoryRemote, codec: PathCodec, settings: TransferSettings) -> TransferExecutor {
    TransferExecutor::new(
        Arc::new(remote.clone()),
        Arc::new(codec),
        settings,
        Arc::new(TransferControl::new()),
        Arc::new(NullObserver),
    )
}

fn executor_with_control(
    remote: &MemoryRemote,
    settings: TransferSettings,
    control: Arc<TransferControl>,
) -> TransferExecutor {
    TransferExecutor::new(
        Arc::new(remote.clone()),
        Arc::new(PathCodec::plain()),
        settings,
        control,
        Arc::new(NullObserver),
    )
}

fn scan_mirror(mirror: &Mirror) -> LocalTree {
    scan(mirror.root.path(), &ExclusionSet::none()).unwrap()
}

fn plain_config(mirror: &Mirror) -> Config {
    mirror.config(ConfidentialityMode::Plain)
}

/// Tree content without remote ids
fn shape(tree: &RemoteTree) -> (BTreeSet<String>, BTreeMap<String, (u64, String)>) {
    (
        tree.folders.keys().cloned().collect(),
        tree.files
            .iter()
            .map(|(path, e)| (path.clone(), (e.size, e.fingerprint.clone())))
            .collect(),
    )
}

#[derive(Default)]
struct CountingCheckpoint {
    calls: AtomicUsize,
}

impl Checkpoint for CountingCheckpoint {
    fn checkpoint(&self, _tree: &RemoteTree) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn test_first_run_uploads_everything_and_converges() {
    let mirror = Mirror::new();
    mirror.write("a.txt", &[b'a'; 10]);
    mirror.write("dir/b.txt", &[b'b'; 20]);
    let config = plain_config(&mirror);
    let remote = MemoryRemote::new();

    let local = scan_mirror(&mirror);
    let mut tree = RemoteTree::new();
    let plan = diff(&local, &tree);
    assert_eq!(plan.len(), 3);

    let report = executor(&remote, PathCodec::plain(), fast_settings(&config, 4))
        .execute(&plan, &mut tree, &NoCheckpoint)
        .await;

    assert_eq!(report.status, PassStatus::Completed);
    assert_eq!(report.succeeded, 3);
    assert_eq!(report.failed, 0);
    assert_eq!(report.bytes_transferred, 30);
    assert!(tree.folders.contains_key("dir"));
    assert_eq!(tree.files["a.txt"].size, 10);
    assert_eq!(tree.files["dir/b.txt"].fingerprint, local.files["dir/b.txt"].fingerprint);
    assert_eq!(
        remote.mirrored_files(),
        BTreeSet::from(["a.txt".to_string(), "dir/b.txt".to_string()])
    );
    assert_eq!(remote.content("dir/b.txt").unwrap(), vec![b'b'; 20]);

    assert!(diff(&local, &tree).is_empty());
}

#[tokio::test]
async fn test_worker_count_does_not_change_result() {
    let mirror = Mirror::new();
    for folder in ["alpha", "beta", "beta/deep", "gamma"] {
        for i in 0..10 {
            mirror.write(&format!("{folder}/file-{i}.bin"), format!("{folder}-{i}").as_bytes());
        }
    }
    let config = plain_config(&mirror);
    let local = scan_mirror(&mirror);
    let plan = diff(&local, &RemoteTree::new());

    let serial_remote = MemoryRemote::new();
    let mut serial_tree = RemoteTree::new();
    executor(&serial_remote, PathCodec::plain(), fast_settings(&config, 1))
        .execute(&plan, &mut serial_tree, &NoCheckpoint)
        .await;

    let parallel_remote = MemoryRemote::new();
    let mut parallel_tree = RemoteTree::new();
    let report = executor(&parallel_remote, PathCodec::plain(), fast_settings(&config, 16))
        .execute(&plan, &mut parallel_tree, &NoCheckpoint)
        .await;

    assert_eq!(report.failed, 0);
    assert_eq!(parallel_tree.files.len(), 40);
    assert_eq!(shape(&serial_tree), shape(&parallel_tree));
    assert_eq!(serial_remote.file_paths(), parallel_remote.file_paths());
}

#[tokio::test]
async fn test_rename_keeps_remote_entry() {
    let mirror = Mirror::new();
    mirror.write("dir/b.txt", b"same bytes");
    let config = plain_config(&mirror);
    let remote = MemoryRemote::new();
    let run = executor(&remote, PathCodec::plain(), fast_settings(&config, 2));

    let mut tree = RemoteTree::new();
    run.execute(&diff(&scan_mirror(&mirror), &tree), &mut tree, &NoCheckpoint)
        .await;
    let id = remote.id_of("dir/b.txt").unwrap();

    mirror.rename("dir/b.txt", "dir/c.txt");
    let plan = diff(&scan_mirror(&mirror), &tree);
    assert_eq!(plan.renames.len(), 1);
    assert_eq!(plan.len(), 1);

    let report = run.execute(&plan, &mut tree, &NoCheckpoint).await;

    assert_eq!(report.renamed, 1);
    assert_eq!(report.succeeded, 0);
    assert_eq!(remote.id_of("dir/c.txt").unwrap(), id);
    assert_eq!(remote.mirrored_files(), BTreeSet::from(["dir/c.txt".to_string()]));
    assert!(tree.files.contains_key("dir/c.txt"));
    assert!(!tree.files.contains_key("dir/b.txt"));
}

#[tokio::test]
async fn test_rejected_rename_falls_back_to_upload_and_delete() {
    let mirror = Mirror::new();
    mirror.write("dir/b.txt", b"same bytes");
    let config = plain_config(&mirror);
    let remote = MemoryRemote::new();
    let run = executor(&remote, PathCodec::plain(), fast_settings(&config, 2));

    let mut tree = RemoteTree::new();
    run.execute(&diff(&scan_mirror(&mirror), &tree), &mut tree, &NoCheckpoint)
        .await;
    remote.reject_renames();

    mirror.rename("dir/b.txt", "dir/c.txt");
    let plan = diff(&scan_mirror(&mirror), &tree);
    let report = run.execute(&plan, &mut tree, &NoCheckpoint).await;

    assert_eq!(remote.rename_calls(), 1);
    assert_eq!(report.renamed, 0);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.deleted, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(remote.mirrored_files(), BTreeSet::from(["dir/c.txt".to_string()]));
    assert_eq!(tree.files.keys().collect::<Vec<_>>(), vec!["dir/c.txt"]);
}

#[tokio::test]
async fn test_large_file_goes_through_multipart() {
    let mirror = Mirror::new();
    let content: Vec<u8> = (0..1500u32).map(|i| (i % 251) as u8).collect();
    mirror.write("big.bin", &content);
    mirror.write("small.txt", b"tiny");
    let config = plain_config(&mirror);
    let remote = MemoryRemote::new();

    let mut settings = fast_settings(&config, 2);
    settings.multipart_threshold = 1000;
    settings.multipart.chunk_size = 256;
    settings.multipart.sign_batch_size = 2;

    let mut tree = RemoteTree::new();
    let plan = diff(&scan_mirror(&mirror), &tree);
    let report = executor(&remote, PathCodec::plain(), settings)
        .execute(&plan, &mut tree, &NoCheckpoint)
        .await;

    assert_eq!(report.failed, 0);
    assert_eq!(report.bytes_transferred, 1504);
    // 6 parts signed two at a time
    assert_eq!(remote.sign_calls(), 3);
    assert_eq!(remote.content("big.bin").unwrap(), content);
    assert_eq!(tree.files["big.bin"].size, 1500);
}

fn multipart_settings(config: &Config) -> TransferSettings {
    let mut settings = fast_settings(config, 1);
    settings.multipart_threshold = 1000;
    settings.multipart.chunk_size = 256;
    settings.multipart.sign_batch_size = 2;
    settings
}

fn full_codec() -> PathCodec {
    PathCodec::new(ConfidentialityMode::Full, Some(EncryptionKey::from_bytes([7u8; 32]))).unwrap()
}

fn leftover_files(dir: &TempDir) -> usize {
    std::fs::read_dir(dir.path()).unwrap().count()
}

#[tokio::test]
async fn test_sign_failure_retries_whole_file() {
    let mirror = Mirror::new();
    let content: Vec<u8> = (0..1500u32).map(|i| (i % 251) as u8).collect();
    mirror.write("big.bin", &content);
    let config = plain_config(&mirror);
    let remote = MemoryRemote::new();
    remote.fail_signs(vec![RemoteError::Server {
        status: 503,
        message: "busy".into(),
    }]);

    let mut tree = RemoteTree::new();
    let plan = diff(&scan_mirror(&mirror), &tree);
    let report = executor(&remote, PathCodec::plain(), multipart_settings(&config))
        .execute(&plan, &mut tree, &NoCheckpoint)
        .await;

    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 0);
    // one failed signing call, then three batches on the second attempt
    assert_eq!(remote.sign_calls(), 4);
    assert_eq!(remote.part_calls(), 6);
    assert_eq!(remote.upload_calls(), 1);
    assert_eq!(remote.content("big.bin").unwrap(), content);
}

#[tokio::test]
async fn test_sign_failure_exhausts_file_attempts() {
    let mirror = Mirror::new();
    mirror.write("big.bin", &[1u8; 1500]);
    let config = plain_config(&mirror);
    let remote = MemoryRemote::new();
    remote.fail_signs(
        (0..3)
            .map(|_| RemoteError::Network("connection reset".into()))
            .collect(),
    );

    let mut settings = multipart_settings(&config);
    settings.file_attempts = 3;
    let mut tree = RemoteTree::new();
    let plan = diff(&scan_mirror(&mirror), &tree);
    let report = executor(&remote, PathCodec::plain(), settings)
        .execute(&plan, &mut tree, &NoCheckpoint)
        .await;

    assert_eq!(report.failed, 1);
    assert_eq!(report.failures[0].kind, FailureKind::Network);
    assert_eq!(remote.sign_calls(), 3);
    assert_eq!(remote.part_calls(), 0);
    assert!(remote.mirrored_files().is_empty());
    assert!(!tree.files.contains_key("big.bin"));
}

#[tokio::test]
async fn test_cancel_between_parts_stops_upload() {
    let mirror = Mirror::new();
    mirror.write("big.bin", &[3u8; 1500]);
    let config = plain_config(&mirror);
    let remote = MemoryRemote::new();
    let control = Arc::new(TransferControl::new());
    remote.cancel_after_parts(3, Arc::clone(&control));

    let mut tree = RemoteTree::new();
    let plan = diff(&scan_mirror(&mirror), &tree);
    let report = executor_with_control(&remote, multipart_settings(&config), control)
        .execute(&plan, &mut tree, &NoCheckpoint)
        .await;

    assert_eq!(report.status, PassStatus::Cancelled);
    assert_eq!(report.failed, 1);
    assert_eq!(report.failures[0].path, "big.bin");
    assert_eq!(report.failures[0].kind, FailureKind::Cancelled);
    // part 4 shares a signing batch with part 3 but is never sent
    assert_eq!(remote.part_calls(), 3);
    assert_eq!(remote.sign_calls(), 2);
    assert_eq!(remote.upload_calls(), 0);
    assert_eq!(remote.open_uploads(), 1);
    assert!(!tree.files.contains_key("big.bin"));
}

#[tokio::test]
async fn test_sealed_copy_removed_after_cancel() {
    let mirror = Mirror::new();
    mirror.write("big.bin", &[5u8; 1500]);
    let config = mirror.config(ConfidentialityMode::Full);
    let scratch = TempDir::new().unwrap();
    let remote = MemoryRemote::new();
    let control = Arc::new(TransferControl::new());
    remote.cancel_after_parts(1, Arc::clone(&control));

    let mut settings = multipart_settings(&config);
    settings.temp_dir = Some(scratch.path().to_path_buf());
    let mut tree = RemoteTree::new();
    let plan = diff(&scan_mirror(&mirror), &tree);
    let report = TransferExecutor::new(
        Arc::new(remote.clone()),
        Arc::new(full_codec()),
        settings,
        control,
        Arc::new(NullObserver),
    )
    .execute(&plan, &mut tree, &NoCheckpoint)
    .await;

    assert_eq!(report.failures[0].kind, FailureKind::Cancelled);
    assert_eq!(remote.part_calls(), 1);
    assert_eq!(leftover_files(&scratch), 0);
}

#[tokio::test]
async fn test_sealed_copy_removed_after_failure() {
    let mirror = Mirror::new();
    mirror.write("big.bin", &[5u8; 1500]);
    mirror.write("small.txt", b"tiny");
    let config = mirror.config(ConfidentialityMode::Full);
    let scratch = TempDir::new().unwrap();
    let remote = MemoryRemote::new();
    remote.fail_signs(vec![RemoteError::Auth {
        status: 401,
        message: "expired".into(),
    }]);

    let mut settings = multipart_settings(&config);
    settings.temp_dir = Some(scratch.path().to_path_buf());
    let mut tree = RemoteTree::new();
    let plan = diff(&scan_mirror(&mirror), &tree);
    let report = executor(&remote, full_codec(), settings)
        .execute(&plan, &mut tree, &NoCheckpoint)
        .await;

    assert_eq!(report.failed, 1);
    assert_eq!(report.failures[0].kind, FailureKind::Auth);
    assert_eq!(report.succeeded, 1);
    assert_eq!(leftover_files(&scratch), 0);
}

#[tokio::test]
async fn test_transient_upload_errors_are_retried() {
    let mirror = Mirror::new();
    mirror.write("a.txt", b"payload");
    let config = plain_config(&mirror);
    let remote = MemoryRemote::new();
    remote.fail_uploads(vec![
        RemoteError::Server {
            status: 503,
            message: "busy".into(),
        },
        RemoteError::Network("connection reset".into()),
    ]);

    let mut tree = RemoteTree::new();
    let plan = diff(&scan_mirror(&mirror), &tree);
    let report = executor(&remote, PathCodec::plain(), fast_settings(&config, 1))
        .execute(&plan, &mut tree, &NoCheckpoint)
        .await;

    assert_eq!(remote.upload_calls(), 3);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 0);
    assert!(tree.files.contains_key("a.txt"));
}

#[tokio::test]
async fn test_auth_failure_is_final_and_reported() {
    let mirror = Mirror::new();
    mirror.write("a.txt", b"payload");
    mirror.write("b.txt", b"other");
    let config = plain_config(&mirror);
    let remote = MemoryRemote::new();
    remote.fail_uploads(vec![RemoteError::Auth {
        status: 401,
        message: "expired".into(),
    }]);

    let mut tree = RemoteTree::new();
    let plan = diff(&scan_mirror(&mirror), &tree);
    let report = executor(&remote, PathCodec::plain(), fast_settings(&config, 1))
        .execute(&plan, &mut tree, &NoCheckpoint)
        .await;

    assert_eq!(remote.upload_calls(), 2);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.failures[0].path, "a.txt");
    assert_eq!(report.failures[0].kind, FailureKind::Auth);
    assert!(!tree.files.contains_key("a.txt"));
    assert!(tree.files.contains_key("b.txt"));
}

#[tokio::test]
async fn test_deletes_are_batched() {
    let mirror = Mirror::new();
    let config = plain_config(&mirror);
    let remote = MemoryRemote::new();

    let mut tree = RemoteTree::new();
    for i in 0..120 {
        tree.record_file(
            format!("gone-{i:03}.txt"),
            RemoteFileEntry {
                id: EntryId::new(format!("x{i}")).unwrap(),
                size: 1,
                fingerprint: "f".into(),
                modified: 0.0,
            },
        );
    }

    let plan = diff(&scan_mirror(&mirror), &tree);
    assert_eq!(plan.file_deletes.len(), 120);
    let report = executor(&remote, PathCodec::plain(), fast_settings(&config, 4))
        .execute(&plan, &mut tree, &NoCheckpoint)
        .await;

    assert_eq!(remote.delete_batches(), vec![50, 50, 20]);
    assert_eq!(report.deleted, 120);
    assert!(tree.files.is_empty());
}

#[tokio::test]
async fn test_existing_remote_folder_is_adopted() {
    let mirror = Mirror::new();
    mirror.write("dir/b.txt", b"content");
    let config = plain_config(&mirror);
    let remote = MemoryRemote::new();
    let existing = remote.seed_folder("dir");

    let mut tree = RemoteTree::new();
    let plan = diff(&scan_mirror(&mirror), &tree);
    let report = executor(&remote, PathCodec::plain(), fast_settings(&config, 1))
        .execute(&plan, &mut tree, &NoCheckpoint)
        .await;

    assert_eq!(report.failed, 0);
    assert_eq!(tree.folder_id("dir"), Some(&existing));
    assert_eq!(remote.folder_paths(), BTreeSet::from(["dir".to_string()]));
    assert_eq!(remote.mirrored_files(), BTreeSet::from(["dir/b.txt".to_string()]));
}

#[tokio::test]
async fn test_full_mode_encrypts_names_and_content() {
    let mirror = Mirror::new();
    mirror.write("dir/secret.txt", b"top secret");
    let config = mirror.config(ConfidentialityMode::Full);
    let key = EncryptionKey::from_bytes([7u8; 32]);
    let codec = PathCodec::new(ConfidentialityMode::Full, Some(key.clone())).unwrap();
    let remote = MemoryRemote::new();

    let mut tree = RemoteTree::new();
    let plan = diff(&scan_mirror(&mirror), &tree);
    let report = executor(&remote, codec.clone(), fast_settings(&config, 2))
        .execute(&plan, &mut tree, &NoCheckpoint)
        .await;
    assert_eq!(report.failed, 0);

    let stored: Vec<String> = remote.file_paths().into_iter().collect();
    assert_eq!(stored.len(), 1);
    assert!(!stored[0].contains("secret"));
    assert!(!stored[0].starts_with("dir/"));
    assert_eq!(codec.decode_path(&stored[0], false), "dir/secret.txt");

    let ciphertext = remote.content(&stored[0]).unwrap();
    assert_ne!(ciphertext, b"top secret".to_vec());
    assert_eq!(decrypt_bytes(&ciphertext, &key).unwrap(), b"top secret".to_vec());
    // progress and report count plaintext bytes
    assert_eq!(report.bytes_transferred, 10);
}

#[tokio::test]
async fn test_checkpoint_every_five_successes() {
    let mirror = Mirror::new();
    for i in 0..12 {
        mirror.write(&format!("f{i:02}.txt"), format!("file {i}").as_bytes());
    }
    let config = plain_config(&mirror);
    let remote = MemoryRemote::new();
    let checkpoint = CountingCheckpoint::default();

    let mut tree = RemoteTree::new();
    let plan = diff(&scan_mirror(&mirror), &tree);
    executor(&remote, PathCodec::plain(), fast_settings(&config, 3))
        .execute(&plan, &mut tree, &checkpoint)
        .await;

    assert_eq!(checkpoint.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_cancelled_before_start_touches_nothing() {
    let mirror = Mirror::new();
    mirror.write("dir/a.txt", b"a");
    mirror.write("b.txt", b"b");
    let config = plain_config(&mirror);
    let remote = MemoryRemote::new();
    let control = Arc::new(TransferControl::new());
    control.cancel();

    let mut tree = RemoteTree::new();
    let plan = diff(&scan_mirror(&mirror), &tree);
    let report = executor_with_control(&remote, fast_settings(&config, 2), control)
        .execute(&plan, &mut tree, &NoCheckpoint)
        .await;

    assert_eq!(report.status, PassStatus::Cancelled);
    assert_eq!(report.failed as usize, plan.len());
    assert!(report
        .failures
        .iter()
        .all(|f| f.kind == FailureKind::Cancelled));
    assert_eq!(remote.mutations(), 0);
    assert!(tree.is_empty());
}

#[tokio::test]
async fn test_pause_holds_workers_until_resume() {
    let mirror = Mirror::new();
    mirror.write("a.txt", b"a");
    let config = plain_config(&mirror);
    let remote = MemoryRemote::new();
    let control = Arc::new(TransferControl::new());
    control.pause();

    let plan = diff(&scan_mirror(&mirror), &RemoteTree::new());
    let run = executor_with_control(&remote, fast_settings(&config, 1), Arc::clone(&control));
    let handle = tokio::spawn(async move {
        let mut tree = RemoteTree::new();
        let report = run.execute(&plan, &mut tree, &NoCheckpoint).await;
        (report, tree)
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(remote.upload_calls(), 0);

    control.resume();
    let (report, tree) = handle.await.unwrap();
    assert_eq!(report.succeeded, 1);
    assert!(tree.files.contains_key("a.txt"));
}
