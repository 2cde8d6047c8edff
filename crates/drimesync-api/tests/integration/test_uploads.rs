//! Integration tests for uploads and downloads

use drimesync_core::domain::{EntryId, RemoteError};
use drimesync_core::ports::{CompletedPart, EntryType, IRemoteApi, RemoteEntry, UploadTarget};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{file_entry_json, setup_drime_mock, NoAuthorization};

fn target() -> UploadTarget {
    UploadTarget::new("Docs/report.pdf", "0")
}

#[tokio::test]
async fn test_simple_upload_returns_file_entry() {
    let (server, remote) = setup_drime_mock().await;

    Mock::given(method("POST"))
        .and(path("/uploads"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "success",
            "fileEntry": file_entry_json(50, "report.pdf", Some(20))
        })))
        .expect(1)
        .mount(&server)
        .await;

    let entry = remote
        .upload_simple(&target(), b"pdf bytes".to_vec())
        .await
        .unwrap();
    assert_eq!(entry.id.as_str(), "50");
    assert_eq!(entry.entry_type, EntryType::File);
}

#[tokio::test]
async fn test_simple_upload_without_entry_is_invalid_response() {
    let (server, remote) = setup_drime_mock().await;

    Mock::given(method("POST"))
        .and(path("/uploads"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "queued"
        })))
        .mount(&server)
        .await;

    let err = remote
        .upload_simple(&target(), vec![1, 2, 3])
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_multipart_flow_with_entry_fallback() {
    let (server, remote) = setup_drime_mock().await;

    Mock::given(method("POST"))
        .and(path("/s3/multipart/create"))
        .and(body_partial_json(serde_json::json!({
            "filename": "report.pdf",
            "mime": "application/octet-stream",
            "extension": "pdf",
            "relativePath": "Docs/report.pdf",
            "workspaceId": "0"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "uploadId": "up-1",
            "key": "uploads/abc/stored-name.pdf"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/s3/multipart/batch-sign-part-urls"))
        .and(body_partial_json(serde_json::json!({
            "uploadId": "up-1",
            "partNumbers": [1, 2]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "urls": [
                {"partNumber": 1, "url": format!("{}/storage/part/1", server.uri())},
                {"partNumber": 2, "url": format!("{}/storage/part/2", server.uri())}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    for n in 1..=2 {
        Mock::given(method("PUT"))
            .and(path(format!("/storage/part/{}", n)))
            .and(header("content-type", "application/octet-stream"))
            .and(NoAuthorization)
            .respond_with(ResponseTemplate::new(200).insert_header("ETag", format!("\"etag-{}\"", n)))
            .expect(1)
            .mount(&server)
            .await;
    }

    Mock::given(method("POST"))
        .and(path("/s3/multipart/complete"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "location": "https://bucket/uploads/abc/stored-name.pdf"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/s3/entries"))
        .and(body_partial_json(serde_json::json!({
            "clientName": "report.pdf",
            "filename": "stored-name.pdf",
            "size": 10,
            "clientExtension": "pdf"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "fileEntry": file_entry_json(77, "report.pdf", Some(20))
        })))
        .expect(1)
        .mount(&server)
        .await;

    let session = remote.multipart_init(&target(), 10).await.unwrap();
    assert_eq!(session.upload_id, "up-1");

    let signed = remote.multipart_sign(&session, &[1, 2]).await.unwrap();
    assert_eq!(signed.len(), 2);

    let mut parts = Vec::new();
    for part in &signed {
        let etag = remote.put_part(&part.url, vec![0u8; 5]).await.unwrap();
        parts.push(CompletedPart {
            part_number: part.part_number,
            etag,
        });
    }
    assert_eq!(parts[0].etag, "etag-1");
    assert_eq!(parts[1].etag, "etag-2");

    let entry = remote
        .multipart_complete(&session, &target(), 10, &parts)
        .await
        .unwrap();
    assert_eq!(entry.id.as_str(), "77");
}

#[tokio::test]
async fn test_multipart_complete_with_entry_skips_fallback() {
    let (server, remote) = setup_drime_mock().await;

    Mock::given(method("POST"))
        .and(path("/s3/multipart/complete"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "fileEntry": file_entry_json(78, "report.pdf", None)
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/s3/entries"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let session = drimesync_core::ports::MultipartSession {
        upload_id: "up-2".into(),
        key: "uploads/x/y.pdf".into(),
    };
    let entry = remote
        .multipart_complete(&session, &target(), 1, &[])
        .await
        .unwrap();
    assert_eq!(entry.id.as_str(), "78");
}

#[tokio::test]
async fn test_download_follows_redirect_without_credentials() {
    let (server, remote) = setup_drime_mock().await;

    Mock::given(method("GET"))
        .and(path("/file-entries/download/hash-9"))
        .and(header("authorization", "Bearer test-api-key"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("Location", format!("{}/storage/blob/9", server.uri())),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/storage/blob/9"))
        .and(NoAuthorization)
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"snapshot-bytes".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let entry = RemoteEntry {
        id: EntryId::new("9").unwrap(),
        name: "00_drime_cloud_tree.json".into(),
        entry_type: EntryType::File,
        hash: Some("hash-9".into()),
        parent_id: None,
        size: Some(14),
    };
    let bytes = remote.download(&entry).await.unwrap();
    assert_eq!(bytes, b"snapshot-bytes");
}

#[tokio::test]
async fn test_download_without_hash_fails() {
    let (_server, remote) = setup_drime_mock().await;

    let entry = RemoteEntry {
        id: EntryId::new("9").unwrap(),
        name: "x".into(),
        entry_type: EntryType::File,
        hash: None,
        parent_id: None,
        size: None,
    };
    let err = remote.download(&entry).await.unwrap_err();
    assert!(matches!(err, RemoteError::InvalidResponse(_)));
}
