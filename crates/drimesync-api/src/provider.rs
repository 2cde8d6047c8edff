//! DrimeRemote - IRemoteApi implementation for the Drime REST API
//!
//! Wraps the [`DrimeClient`] and delegates to the entries and upload
//! modules to fulfil the [`IRemoteApi`] port contract.
//!
//! ## Design Notes
//!
//! - No retries happen here; the transfer executor owns retry policy.
//! - Every [`ApiError`](crate::ApiError) is converted into a classified
//!   [`RemoteError`] at this boundary.

use async_trait::async_trait;
use tracing::debug;

use drimesync_core::domain::{EntryId, RemoteError};
use drimesync_core::ports::{
    CompletedPart, EntryPage, IRemoteApi, ListQuery, MultipartSession, RemoteEntry, SignedPart,
    UploadTarget,
};

use crate::client::DrimeClient;
use crate::{entries, upload};

/// Remote workspace backed by the Drime API
#[derive(Debug, Clone)]
pub struct DrimeRemote {
    client: DrimeClient,
}

impl DrimeRemote {
    /// Creates a provider around an existing client
    pub fn new(client: DrimeClient) -> Self {
        Self { client }
    }

    /// Returns the underlying client
    pub fn client(&self) -> &DrimeClient {
        &self.client
    }
}

#[async_trait]
impl IRemoteApi for DrimeRemote {
    async fn list_entries(&self, query: &ListQuery) -> Result<EntryPage, RemoteError> {
        Ok(entries::list_entries(&self.client, query).await?)
    }

    async fn create_folder(
        &self,
        name: &str,
        parent_id: Option<&EntryId>,
        workspace_id: &str,
    ) -> Result<RemoteEntry, RemoteError> {
        Ok(entries::create_folder(&self.client, name, parent_id, workspace_id).await?)
    }

    async fn rename_entry(&self, id: &EntryId, new_name: &str) -> Result<RemoteEntry, RemoteError> {
        Ok(entries::rename_entry(&self.client, id, new_name).await?)
    }

    async fn delete_entries(&self, ids: &[EntryId], permanent: bool) -> Result<(), RemoteError> {
        if ids.is_empty() {
            return Ok(());
        }
        Ok(entries::delete_entries(&self.client, ids, permanent).await?)
    }

    async fn upload_simple(
        &self,
        target: &UploadTarget,
        data: Vec<u8>,
    ) -> Result<RemoteEntry, RemoteError> {
        Ok(upload::upload_simple(&self.client, target, data).await?)
    }

    async fn multipart_init(
        &self,
        target: &UploadTarget,
        size: u64,
    ) -> Result<MultipartSession, RemoteError> {
        Ok(upload::multipart_create(&self.client, target, size).await?)
    }

    async fn multipart_sign(
        &self,
        session: &MultipartSession,
        part_numbers: &[u32],
    ) -> Result<Vec<SignedPart>, RemoteError> {
        Ok(upload::multipart_sign(&self.client, session, part_numbers).await?)
    }

    async fn put_part(&self, url: &str, data: Vec<u8>) -> Result<String, RemoteError> {
        Ok(self.client.put_presigned(url, data).await?)
    }

    async fn multipart_complete(
        &self,
        session: &MultipartSession,
        target: &UploadTarget,
        size: u64,
        parts: &[CompletedPart],
    ) -> Result<RemoteEntry, RemoteError> {
        Ok(upload::multipart_complete(&self.client, session, target, size, parts).await?)
    }

    async fn download(&self, entry: &RemoteEntry) -> Result<Vec<u8>, RemoteError> {
        let hash = entry.hash.as_deref().ok_or_else(|| {
            RemoteError::InvalidResponse(format!("entry {} has no content hash", entry.id))
        })?;
        debug!(id = %entry.id, "Downloading entry");
        Ok(self.client.download(&entries::download_path(hash)).await?)
    }
}
