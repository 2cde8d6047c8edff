//! Upload operations for the Drime API
//!
//! Provides functions for uploading files:
//! - [`upload_simple`] - Single multipart/form-data request to `/uploads`
//! - [`multipart_create`] - Starts an S3 multipart upload
//! - [`multipart_sign`] - Requests pre-signed URLs for a batch of parts
//! - [`multipart_complete`] - Assembles the parts and returns the file entry
//!
//! Parts themselves are sent with [`DrimeClient::put_presigned`]. The part
//! loop lives with the caller so that cancellation can be observed between
//! parts.

use drimesync_core::ports::{CompletedPart, MultipartSession, RemoteEntry, SignedPart, UploadTarget};
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, instrument};

use crate::client::DrimeClient;
use crate::entries::parse_entry;
use crate::ApiError;

/// MIME type sent for every upload (content may be ciphertext)
const UPLOAD_MIME: &str = "application/octet-stream";

// ============================================================================
// Response types
// ============================================================================

/// Response from `/s3/multipart/create`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateMultipartResponse {
    upload_id: String,
    key: String,
}

/// Response from `/s3/multipart/batch-sign-part-urls`
#[derive(Debug, Deserialize)]
struct SignResponse {
    urls: Vec<SignedUrl>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignedUrl {
    part_number: u32,
    url: String,
}

/// Extension without the dot, using the same rule as the path codec
fn extension_of(name: &str) -> &str {
    match name.rfind('.') {
        Some(dot) if name[..dot].bytes().any(|b| b != b'.') => &name[dot + 1..],
        _ => "",
    }
}

/// Returns true when a response body already describes the created file
fn describes_entry(value: &Value) -> bool {
    value.get("fileEntry").is_some() || (value.get("id").is_some() && value.get("name").is_some())
}

// ============================================================================
// Simple upload
// ============================================================================

/// Uploads a file in a single request
///
/// `POST /uploads` with form fields `file`, `relativePath`, `workspaceId`.
#[instrument(skip(client, data), fields(path = %target.relative_path, size = data.len()))]
pub async fn upload_simple(
    client: &DrimeClient,
    target: &UploadTarget,
    data: Vec<u8>,
) -> Result<RemoteEntry, ApiError> {
    let size = data.len();
    let part = Part::bytes(data)
        .file_name(target.file_name.clone())
        .mime_str(UPLOAD_MIME)?;
    let form = Form::new()
        .part("file", part)
        .text("relativePath", target.relative_path.clone())
        .text("workspaceId", target.workspace_id.clone());

    let value: Value = client
        .send_json(
            client
                .request(Method::POST, "/uploads")
                .timeout(client.timeout() * 2)
                .multipart(form),
        )
        .await?;

    let entry = parse_entry(value, &["fileEntry"])?;
    debug!(id = %entry.id, size, "Simple upload complete");
    Ok(entry)
}

// ============================================================================
// Multipart upload
// ============================================================================

/// Starts a multipart upload
///
/// `POST /s3/multipart/create {filename, mime, size, extension, relativePath, workspaceId}`
#[instrument(skip(client), fields(path = %target.relative_path))]
pub async fn multipart_create(
    client: &DrimeClient,
    target: &UploadTarget,
    size: u64,
) -> Result<MultipartSession, ApiError> {
    let body = json!({
        "filename": target.file_name,
        "mime": UPLOAD_MIME,
        "size": size,
        "extension": extension_of(&target.file_name),
        "relativePath": target.relative_path,
        "workspaceId": target.workspace_id,
    });
    let response: CreateMultipartResponse = client
        .send_json(client.request(Method::POST, "/s3/multipart/create").json(&body))
        .await?;
    info!(key = %response.key, "Multipart upload started");
    Ok(MultipartSession {
        upload_id: response.upload_id,
        key: response.key,
    })
}

/// Requests pre-signed URLs for `part_numbers`
///
/// `POST /s3/multipart/batch-sign-part-urls {key, uploadId, partNumbers}`
#[instrument(skip(client, session), fields(key = %session.key, parts = part_numbers.len()))]
pub async fn multipart_sign(
    client: &DrimeClient,
    session: &MultipartSession,
    part_numbers: &[u32],
) -> Result<Vec<SignedPart>, ApiError> {
    let body = json!({
        "key": session.key,
        "uploadId": session.upload_id,
        "partNumbers": part_numbers,
    });
    let response: SignResponse = client
        .send_json(
            client
                .request(Method::POST, "/s3/multipart/batch-sign-part-urls")
                .json(&body),
        )
        .await?;
    Ok(response
        .urls
        .into_iter()
        .map(|u| SignedPart {
            part_number: u.part_number,
            url: u.url,
        })
        .collect())
}

/// Completes a multipart upload
///
/// `POST /s3/multipart/complete {key, uploadId, parts}`. When the response
/// does not describe the created file, the entry is registered explicitly
/// through `POST /s3/entries`.
#[instrument(skip(client, session, parts), fields(key = %session.key, parts = parts.len()))]
pub async fn multipart_complete(
    client: &DrimeClient,
    session: &MultipartSession,
    target: &UploadTarget,
    size: u64,
    parts: &[CompletedPart],
) -> Result<RemoteEntry, ApiError> {
    let body = json!({
        "key": session.key,
        "uploadId": session.upload_id,
        "parts": parts,
    });
    let value: Value = client
        .send_json(client.request(Method::POST, "/s3/multipart/complete").json(&body))
        .await?;
    if describes_entry(&value) {
        return parse_entry(value, &["fileEntry"]);
    }

    debug!("Complete response carries no entry, creating it");
    let stored_name = session.key.rsplit('/').next().unwrap_or(&session.key);
    let entry_body = json!({
        "clientMime": UPLOAD_MIME,
        "clientName": target.file_name,
        "filename": stored_name,
        "size": size,
        "clientExtension": extension_of(&target.file_name),
        "relativePath": target.relative_path,
        "workspaceId": target.workspace_id,
    });
    let value: Value = client
        .send_json(client.request(Method::POST, "/s3/entries").json(&entry_body))
        .await?;
    parse_entry(value, &["fileEntry"])
}
