//! ScribeSync server HTTP client
//!
//! Provides a thin typed wrapper over `reqwest` for talking to the note
//! server. Handles endpoint construction, per-request timeouts, and the
//! mapping from HTTP failures onto the [`RemoteError`] taxonomy.
//!
//! Authentication headers are added by the caller (see [`crate::provider`]):
//! the access token can change between two attempts of the same logical
//! request, so the client itself stays token-free.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use scribesync_core::ports::remote_store::RemoteError;
use serde::Deserialize;
use tracing::debug;

/// Default per-request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Error body shape the server uses for non-2xx responses
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// HTTP client for the ScribeSync server
///
/// Wraps `reqwest::Client` with base URL construction and a configured
/// request timeout.
#[derive(Debug, Clone)]
pub struct ApiClient {
    /// The underlying HTTP client
    client: Client,
    /// Base URL for API requests, without a trailing slash
    base_url: String,
}

impl ApiClient {
    /// Creates a new client for the given server
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Creates a new client with a custom request timeout
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { client, base_url }
    }

    /// Returns the base URL for API requests
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Creates a request builder for the given method and path
    ///
    /// Automatically prepends the base URL.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client.request(method, &url)
    }

    /// Maps a transport-level failure onto [`RemoteError`]
    pub fn map_transport_error(err: reqwest::Error) -> RemoteError {
        if err.is_timeout() {
            RemoteError::Timeout
        } else {
            RemoteError::Network(err.to_string())
        }
    }

    /// Converts a non-2xx response into the matching [`RemoteError`]
    ///
    /// Consumes the response body to extract the server's error message.
    pub async fn map_status_error(response: Response) -> RemoteError {
        let status = response.status();
        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|b| b.error.or(b.message))
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());

        debug!(status = status.as_u16(), %message, "Request failed");

        match status {
            StatusCode::UNAUTHORIZED => RemoteError::Unauthorized(message),
            StatusCode::FORBIDDEN => RemoteError::Forbidden(message),
            StatusCode::NOT_FOUND => RemoteError::NotFound(message),
            StatusCode::CONFLICT => RemoteError::Conflict(message),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY | StatusCode::PAYLOAD_TOO_LARGE => {
                RemoteError::Validation(message)
            }
            s if s.is_server_error() => RemoteError::Server {
                status: s.as_u16(),
                message,
            },
            s => RemoteError::InvalidResponse(format!("unexpected status {s}: {message}")),
        }
    }
}
