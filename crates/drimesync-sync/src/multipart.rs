//! Multipart upload loop
//!
//! `init → sign(batch) → PUT part … → complete`. Parts are read
//! sequentially from the payload file, so memory use is bounded by one part.
//! Cancellation is checked before each signing batch and before each part;
//! an in-flight PUT always runs to completion.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use drimesync_core::domain::RemoteError;
use drimesync_core::ports::{CompletedPart, IRemoteApi, RemoteEntry, UploadTarget};
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};

use crate::control::TransferControl;
use crate::progress::ProgressTracker;
use crate::SyncError;

/// Chunking and retry parameters
#[derive(Debug, Clone)]
pub struct MultipartSettings {
    /// Bytes per part (the last part may be shorter)
    pub chunk_size: u64,
    /// Part URLs requested per signing call
    pub sign_batch_size: usize,
    /// Retries for a single part PUT after the first attempt
    pub part_retries: u32,
    /// Backoff unit; attempt `n` waits `n + 1` units
    pub retry_unit: Duration,
}

impl Default for MultipartSettings {
    fn default() -> Self {
        Self {
            chunk_size: 25 * 1024 * 1024,
            sign_batch_size: 10,
            part_retries: 3,
            retry_unit: Duration::from_secs(1),
        }
    }
}

/// Number of parts needed for `size` bytes
pub fn part_count(size: u64, chunk_size: u64) -> u32 {
    if size == 0 {
        return 1;
    }
    size.div_ceil(chunk_size.max(1)) as u32
}

/// Bytes the caller reports for progress
///
/// Progress is counted in plaintext bytes while the payload may be the
/// slightly larger ciphertext.
struct ProgressBudget<'a> {
    tracker: &'a ProgressTracker,
    path: &'a str,
    remaining: u64,
}

impl ProgressBudget<'_> {
    fn consume(&mut self, bytes: u64) {
        let step = bytes.min(self.remaining);
        self.remaining -= step;
        if step > 0 {
            self.tracker.add_bytes(self.path, step);
        }
    }
}

/// Uploads the file at `source` in parts
///
/// # Arguments
/// * `target` - Remote name and location of the file
/// * `source` - Payload on disk (plaintext or ciphertext)
/// * `plain_size` - Plaintext size, used for progress accounting
/// * `report_path` - Local relative path, used for progress and logs
///
/// # Errors
/// [`SyncError::Cancelled`] when cancellation is observed between parts;
/// the remote error of a failed signing call, of a part that exhausted its
/// retries, or of the complete call otherwise.
#[allow(clippy::too_many_arguments)]
pub async fn upload_multipart(
    remote: &dyn IRemoteApi,
    target: &UploadTarget,
    source: &Path,
    plain_size: u64,
    settings: &MultipartSettings,
    control: &TransferControl,
    progress: &ProgressTracker,
    report_path: &str,
) -> Result<RemoteEntry, SyncError> {
    let size = tokio::fs::metadata(source).await?.len();
    let chunk_size = settings.chunk_size.max(1);
    let parts = part_count(size, chunk_size);
    info!(path = %report_path, size, parts, "Starting multipart upload");

    let session = remote.multipart_init(target, size).await?;
    let mut file = tokio::fs::File::open(source).await?;
    let mut budget = ProgressBudget {
        tracker: progress,
        path: report_path,
        remaining: plain_size,
    };

    let numbers: Vec<u32> = (1..=parts).collect();
    let mut completed = Vec::with_capacity(numbers.len());
    let mut offset = 0u64;

    for batch in numbers.chunks(settings.sign_batch_size.max(1)) {
        if control.is_cancelled() {
            return Err(SyncError::Cancelled);
        }
        let urls: HashMap<u32, String> = remote
            .multipart_sign(&session, batch)
            .await?
            .into_iter()
            .map(|signed| (signed.part_number, signed.url))
            .collect();

        for &part_number in batch {
            if !control.wait_if_paused().await {
                return Err(SyncError::Cancelled);
            }
            let url = urls.get(&part_number).ok_or_else(|| {
                RemoteError::InvalidResponse(format!("no signed URL for part {part_number}"))
            })?;

            let len = chunk_size.min(size - offset) as usize;
            let mut buffer = vec![0u8; len];
            file.read_exact(&mut buffer).await?;
            offset += len as u64;

            let etag = put_with_retry(remote, url, buffer, part_number, settings, control).await?;
            completed.push(CompletedPart { part_number, etag });
            budget.consume(len as u64);
            debug!(path = %report_path, part_number, parts, "Part uploaded");
        }
    }

    let entry = remote
        .multipart_complete(&session, target, size, &completed)
        .await?;
    budget.consume(u64::MAX);
    info!(path = %report_path, id = %entry.id, "Multipart upload complete");
    Ok(entry)
}

async fn put_with_retry(
    remote: &dyn IRemoteApi,
    url: &str,
    data: Vec<u8>,
    part_number: u32,
    settings: &MultipartSettings,
    control: &TransferControl,
) -> Result<String, SyncError> {
    let mut attempt = 0u32;
    loop {
        match remote.put_part(url, data.clone()).await {
            Ok(etag) => return Ok(etag),
            Err(err) if attempt < settings.part_retries && !control.is_cancelled() => {
                let delay = settings.retry_unit * (attempt + 1);
                warn!(part_number, attempt, error = %err, "Part upload failed, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err.into()),
        }
    }
}
