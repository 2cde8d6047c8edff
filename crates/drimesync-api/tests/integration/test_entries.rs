//! Integration tests for entry listing and folder operations

use drimesync_core::domain::{EntryId, RemoteError};
use drimesync_core::ports::{EntryType, IRemoteApi, ListQuery};
use wiremock::matchers::{body_json, body_partial_json, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{file_entry_json, folder_entry_json, mount_error, setup_drime_mock};

#[tokio::test]
async fn test_list_root_sends_workspace_and_page() {
    let (server, remote) = setup_drime_mock().await;

    Mock::given(method("GET"))
        .and(path("/drive/file-entries"))
        .and(query_param("workspaceId", "7"))
        .and(query_param("page", "1"))
        .and(header("authorization", "Bearer test-api-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [
                folder_entry_json(10, "Photos", None),
                file_entry_json(11, "notes.txt", None)
            ],
            "current_page": 1,
            "last_page": 2
        })))
        .expect(1)
        .mount(&server)
        .await;

    let page = remote.list_entries(&ListQuery::root("7")).await.unwrap();

    assert_eq!(page.entries.len(), 2);
    assert_eq!(page.entries[0].entry_type, EntryType::Folder);
    assert_eq!(page.entries[0].id.as_str(), "10");
    assert_eq!(page.entries[1].hash.as_deref(), Some("hash-11"));
    assert!(page.has_more());
}

#[tokio::test]
async fn test_list_folder_and_search_parameters() {
    let (server, remote) = setup_drime_mock().await;

    Mock::given(method("GET"))
        .and(path("/drive/file-entries"))
        .and(query_param("folderId", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [file_entry_json(12, "a.jpg", Some(10))]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/drive/file-entries"))
        .and(query_param("query", ".SyncStateFiles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let folder_id = EntryId::new("10").unwrap();
    let page = remote
        .list_entries(&ListQuery::folder("0", Some(folder_id.clone())))
        .await
        .unwrap();
    assert_eq!(page.entries[0].parent_id.as_ref(), Some(&folder_id));
    assert!(!page.has_more());

    let found = remote
        .list_entries(&ListQuery::search("0", ".SyncStateFiles"))
        .await
        .unwrap();
    assert!(found.entries.is_empty());
}

#[tokio::test]
async fn test_create_folder_unwraps_folder_key() {
    let (server, remote) = setup_drime_mock().await;

    Mock::given(method("POST"))
        .and(path("/folders"))
        .and(body_json(serde_json::json!({
            "name": "Docs",
            "parentId": null,
            "workspaceId": "0"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "success",
            "folder": folder_entry_json(20, "Docs", None)
        })))
        .expect(1)
        .mount(&server)
        .await;

    let entry = remote.create_folder("Docs", None, "0").await.unwrap();
    assert_eq!(entry.id.as_str(), "20");
    assert!(entry.is_folder());
}

#[tokio::test]
async fn test_create_folder_conflict_is_client_error() {
    let (server, remote) = setup_drime_mock().await;
    mount_error(&server, "POST", "/folders", 422).await;

    let parent = EntryId::new("5").unwrap();
    let err = remote
        .create_folder("Docs", Some(&parent), "0")
        .await
        .unwrap_err();

    assert!(matches!(err, RemoteError::Client { status: 422, .. }));
    assert!(!err.is_retryable());
    assert!(err.to_string().contains("status 422"));
}

#[tokio::test]
async fn test_auth_and_server_errors_are_classified() {
    let (server, remote) = setup_drime_mock().await;
    mount_error(&server, "GET", "/drive/file-entries", 401).await;
    mount_error(&server, "POST", "/file-entries/delete", 500).await;

    let err = remote.list_entries(&ListQuery::root("0")).await.unwrap_err();
    assert!(matches!(err, RemoteError::Auth { status: 401, .. }));

    let ids = vec![EntryId::new("1").unwrap()];
    let err = remote.delete_entries(&ids, true).await.unwrap_err();
    assert!(matches!(err, RemoteError::Server { status: 500, .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_rename_sends_new_name() {
    let (server, remote) = setup_drime_mock().await;

    Mock::given(method("PUT"))
        .and(path("/file-entries/33"))
        .and(body_json(serde_json::json!({"name": "renamed.txt"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "fileEntry": file_entry_json(33, "renamed.txt", None)
        })))
        .expect(1)
        .mount(&server)
        .await;

    let id = EntryId::new("33").unwrap();
    let entry = remote.rename_entry(&id, "renamed.txt").await.unwrap();
    assert_eq!(entry.name, "renamed.txt");
}

#[tokio::test]
async fn test_delete_sends_ids_and_flag() {
    let (server, remote) = setup_drime_mock().await;

    Mock::given(method("POST"))
        .and(path("/file-entries/delete"))
        .and(body_partial_json(serde_json::json!({
            "entryIds": ["1", "2", "3"],
            "deleteForever": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "success"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let ids: Vec<EntryId> = ["1", "2", "3"]
        .iter()
        .map(|id| EntryId::new(*id).unwrap())
        .collect();
    remote.delete_entries(&ids, true).await.unwrap();
}

#[tokio::test]
async fn test_delete_empty_batch_makes_no_request() {
    let (server, remote) = setup_drime_mock().await;

    Mock::given(method("POST"))
        .and(path("/file-entries/delete"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    remote.delete_entries(&[], true).await.unwrap();
}
