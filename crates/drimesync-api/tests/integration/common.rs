//! Shared test helpers for Drime API integration tests
//!
//! Provides wiremock-based mock server setup. Each helper mounts the
//! necessary endpoints and returns a provider pointing at the mock server.

use wiremock::matchers::{method, path};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

use drimesync_api::{DrimeClient, DrimeRemote};

/// API key used by every test client
pub const TEST_API_KEY: &str = "test-api-key";

/// Starts a mock server and returns a (MockServer, DrimeRemote) tuple
pub async fn setup_drime_mock() -> (MockServer, DrimeRemote) {
    let server = MockServer::start().await;
    let client = DrimeClient::with_base_url(TEST_API_KEY, server.uri())
        .expect("client should build");
    (server, DrimeRemote::new(client))
}

/// Builds a file entry JSON object as the API returns it
pub fn file_entry_json(id: u64, name: &str, parent_id: Option<u64>) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": name,
        "type": "text",
        "hash": format!("hash-{}", id),
        "parent_id": parent_id,
        "file_size": 42
    })
}

/// Builds a folder entry JSON object as the API returns it
pub fn folder_entry_json(id: u64, name: &str, parent_id: Option<u64>) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": name,
        "type": "folder",
        "hash": null,
        "parent_id": parent_id
    })
}

/// Mounts an endpoint that always answers with an error status and message
#[allow(dead_code)]
pub async fn mount_error(server: &MockServer, http_method: &str, endpoint: &str, status: u16) {
    Mock::given(method(http_method))
        .and(path(endpoint))
        .respond_with(ResponseTemplate::new(status).set_body_json(serde_json::json!({
            "message": format!("status {}", status)
        })))
        .mount(server)
        .await;
}

/// Matches requests that carry no Authorization header
pub struct NoAuthorization;

impl Match for NoAuthorization {
    fn matches(&self, request: &Request) -> bool {
        !request.headers.contains_key("authorization")
    }
}
