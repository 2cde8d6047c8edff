//! Drime API client
//!
//! Provides a typed HTTP client for the Drime REST API. Handles the bearer
//! header, timeouts, status-to-error mapping and endpoint construction.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use drimesync_api::client::DrimeClient;
//! use drimesync_api::entries;
//! use drimesync_core::ports::ListQuery;
//!
//! # async fn example() -> Result<(), drimesync_api::ApiError> {
//! let client = DrimeClient::new("api-key-here")?;
//! let page = entries::list_entries(&client, &ListQuery::root("0")).await?;
//! println!("{} entries at the root", page.entries.len());
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use reqwest::header::{ETAG, LOCATION};
use reqwest::{redirect, Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::ApiError;

/// Base URL for the Drime API v1
pub const DRIME_BASE_URL: &str = "https://app.drime.cloud/api/v1";

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("drimesync/", env!("CARGO_PKG_VERSION"));

/// Error body returned by the API on failure
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

// ============================================================================
// DrimeClient
// ============================================================================

/// HTTP client for Drime API calls
///
/// Holds two `reqwest` clients: one for authenticated API calls, with
/// redirects disabled so downloads can be redirected by hand, and one for
/// pre-signed storage URLs, which never receives the API key.
#[derive(Debug, Clone)]
pub struct DrimeClient {
    /// Client for API endpoints
    client: Client,
    /// Client for pre-signed storage URLs
    storage: Client,
    /// Base URL for API requests
    base_url: String,
    /// API key sent as a bearer token
    api_key: String,
    /// Per-request timeout
    timeout: Duration,
}

impl DrimeClient {
    /// Creates a client for the production API
    ///
    /// # Arguments
    /// * `api_key` - A Drime API key
    pub fn new(api_key: impl Into<String>) -> Result<Self, ApiError> {
        Self::with_options(api_key, DRIME_BASE_URL, DEFAULT_TIMEOUT)
    }

    /// Creates a client with a custom base URL (useful for testing)
    ///
    /// # Arguments
    /// * `api_key` - A Drime API key
    /// * `base_url` - Custom base URL for API requests
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, ApiError> {
        Self::with_options(api_key, base_url, DEFAULT_TIMEOUT)
    }

    /// Creates a client with a custom base URL and timeout
    pub fn with_options(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(redirect::Policy::none())
            .user_agent(USER_AGENT)
            .build()?;
        let storage = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        let base_url: String = base_url.into();
        Ok(Self {
            client,
            storage,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout,
        })
    }

    /// Returns the base URL for API requests
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the per-request timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Creates an authenticated request builder for the given method and path
    ///
    /// # Arguments
    /// * `method` - HTTP method
    /// * `path` - API path relative to the base URL (e.g. "/folders")
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .request(method, &url)
            .bearer_auth(&self.api_key)
            .header("Accept", "application/json")
    }

    /// Sends a request and decodes a JSON body, mapping error statuses
    pub async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = check_status(request.send().await?).await?;
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }

    /// Sends a request and discards the body, mapping error statuses
    pub async fn send_void(&self, request: RequestBuilder) -> Result<(), ApiError> {
        check_status(request.send().await?).await?;
        Ok(())
    }

    /// Downloads the body behind an API URL
    ///
    /// A redirect to object storage is followed manually so that the
    /// `Authorization` header is not forwarded to the storage host.
    pub async fn download(&self, path: &str) -> Result<Vec<u8>, ApiError> {
        let response = self.request(Method::GET, path).send().await?;

        let response = if response.status().is_redirection() {
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
                .ok_or_else(|| ApiError::InvalidResponse("redirect without Location".into()))?;
            debug!(path, "Following download redirect to storage");
            self.storage
                .get(&location)
                .header("Accept", "*/*")
                .send()
                .await?
        } else {
            response
        };

        let bytes = check_status(response).await?.bytes().await?;
        debug!(path, size = bytes.len(), "Downloaded");
        Ok(bytes.to_vec())
    }

    /// Uploads bytes to a pre-signed URL and returns the ETag (quotes stripped)
    pub async fn put_presigned(&self, url: &str, data: Vec<u8>) -> Result<String, ApiError> {
        let response = self
            .storage
            .put(url)
            .header("Content-Type", "application/octet-stream")
            .body(data)
            .send()
            .await?;
        let response = check_status(response).await?;
        let etag = response
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .trim_matches('"')
            .to_string();
        if etag.is_empty() {
            warn!("Storage accepted a part without returning an ETag");
        }
        Ok(etag)
    }
}

/// Maps a non-success response to [`ApiError::Http`]
///
/// The JSON `message` field, when present, is used as the error text.
pub async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string()
        });
    debug!(status = status.as_u16(), %message, "API returned error status");
    Err(ApiError::Http {
        status: status.as_u16(),
        message,
    })
}
