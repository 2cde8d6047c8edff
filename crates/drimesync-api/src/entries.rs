//! File entry operations
//!
//! Listing, folder creation, rename and delete against
//! `/drive/file-entries`, `/folders` and `/file-entries`.

use drimesync_core::domain::EntryId;
use drimesync_core::ports::{EntryPage, EntryType, ListQuery, RemoteEntry};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::client::DrimeClient;
use crate::ApiError;

// ============================================================================
// Response types
// ============================================================================

/// A file entry as returned by the API
#[derive(Debug, Deserialize)]
pub(crate) struct ApiEntry {
    id: EntryId,
    #[serde(default)]
    name: String,
    #[serde(rename = "type", default)]
    entry_type: Option<String>,
    #[serde(default)]
    hash: Option<String>,
    #[serde(default)]
    parent_id: Option<EntryId>,
    #[serde(default, alias = "fileSize")]
    file_size: Option<u64>,
}

impl From<ApiEntry> for RemoteEntry {
    fn from(entry: ApiEntry) -> Self {
        let entry_type = match entry.entry_type.as_deref() {
            Some("folder") => EntryType::Folder,
            _ => EntryType::File,
        };
        RemoteEntry {
            id: entry.id,
            name: entry.name,
            entry_type,
            hash: entry.hash,
            parent_id: entry.parent_id,
            size: entry.file_size,
        }
    }
}

/// Paginated listing response
#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    data: Vec<ApiEntry>,
    #[serde(default, alias = "currentPage")]
    current_page: Option<u32>,
    #[serde(default, alias = "lastPage")]
    last_page: Option<u32>,
}

/// Extracts an entry from a response that may wrap it under one of `keys`
pub(crate) fn parse_entry(value: Value, keys: &[&str]) -> Result<RemoteEntry, ApiError> {
    let inner = keys
        .iter()
        .find_map(|k| value.get(*k).filter(|v| v.is_object()).cloned())
        .unwrap_or(value);
    serde_json::from_value::<ApiEntry>(inner)
        .map(RemoteEntry::from)
        .map_err(|e| ApiError::InvalidResponse(format!("entry without id: {}", e)))
}

// ============================================================================
// Operations
// ============================================================================

/// Lists one page of entries
///
/// `GET /drive/file-entries?folderId=&workspaceId=&query=&page=`
#[instrument(skip(client), fields(page = query.page))]
pub async fn list_entries(client: &DrimeClient, query: &ListQuery) -> Result<EntryPage, ApiError> {
    let mut params: Vec<(&str, String)> = vec![
        ("workspaceId", query.workspace_id.clone()),
        ("page", query.page.max(1).to_string()),
    ];
    if let Some(folder_id) = &query.folder_id {
        params.push(("folderId", folder_id.to_string()));
    }
    if let Some(name) = &query.query {
        params.push(("query", name.clone()));
    }

    let response: ListResponse = client
        .send_json(
            client
                .request(Method::GET, "/drive/file-entries")
                .query(&params),
        )
        .await?;

    let page = EntryPage {
        entries: response.data.into_iter().map(RemoteEntry::from).collect(),
        current_page: response.current_page.unwrap_or(query.page.max(1)),
        last_page: response.last_page,
    };
    debug!(count = page.entries.len(), "Listed entries");
    Ok(page)
}

/// Creates a folder
///
/// `POST /folders {name, parentId, workspaceId}`; `parentId` is null at the root.
#[instrument(skip(client))]
pub async fn create_folder(
    client: &DrimeClient,
    name: &str,
    parent_id: Option<&EntryId>,
    workspace_id: &str,
) -> Result<RemoteEntry, ApiError> {
    let body = json!({
        "name": name,
        "parentId": parent_id.map(|id| id.as_str()),
        "workspaceId": workspace_id,
    });
    let value: Value = client
        .send_json(client.request(Method::POST, "/folders").json(&body))
        .await?;
    parse_entry(value, &["folder", "fileEntry"])
}

/// Renames an entry
///
/// `PUT /file-entries/{id} {name}`
#[instrument(skip(client))]
pub async fn rename_entry(
    client: &DrimeClient,
    id: &EntryId,
    new_name: &str,
) -> Result<RemoteEntry, ApiError> {
    let path = format!("/file-entries/{}", id.as_str());
    let value: Value = client
        .send_json(
            client
                .request(Method::PUT, &path)
                .json(&json!({ "name": new_name })),
        )
        .await?;
    match parse_entry(value, &["fileEntry", "folder"]) {
        Ok(entry) => Ok(entry),
        // Some deployments answer with a bare status object
        Err(_) => Ok(RemoteEntry {
            id: id.clone(),
            name: new_name.to_string(),
            entry_type: EntryType::File,
            hash: None,
            parent_id: None,
            size: None,
        }),
    }
}

/// Deletes entries
///
/// `POST /file-entries/delete {entryIds, deleteForever}`
#[instrument(skip(client, ids), fields(count = ids.len()))]
pub async fn delete_entries(
    client: &DrimeClient,
    ids: &[EntryId],
    permanent: bool,
) -> Result<(), ApiError> {
    let entry_ids: Vec<&str> = ids.iter().map(EntryId::as_str).collect();
    client
        .send_void(
            client
                .request(Method::POST, "/file-entries/delete")
                .json(&json!({ "entryIds": entry_ids, "deleteForever": permanent })),
        )
        .await
}

/// Path of the download endpoint for a content hash
pub fn download_path(hash: &str) -> String {
    format!("/file-entries/download/{}", hash)
}
