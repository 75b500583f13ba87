//! REST client for the storefront account API.
//!
//! # Architecture
//!
//! - Plain JSON over HTTP with `reqwest`; bearer token from the [`Session`]
//! - The catalog is NOT fetched here; callers hand products to the stores
//! - Only the account wishlist endpoints are consumed (see [`wishlist`])
//!
//! [`Session`]: crate::models::Session

pub mod wishlist;

use std::sync::Arc;

use thiserror::Error;
use url::Url;

use crate::config::ApiConfig;

pub use wishlist::{AddWishlistItem, WishlistEntry};

/// Errors that can occur when calling the account API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Session token rejected.
    #[error("session is not authorized")]
    Unauthorized,

    /// Response body did not match the expected shape.
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Base URL cannot carry path segments (e.g. `mailto:`).
    #[error("invalid API base URL: {0}")]
    InvalidBaseUrl(String),
}

/// Account API client.
///
/// Cheaply cloneable; clones share the connection pool.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidBaseUrl` if the base URL cannot have path
    /// segments, or `ApiError::Http` if the HTTP client fails to build.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        if config.base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidBaseUrl(config.base_url.to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("bazaar-storefront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.base_url.clone(),
            }),
        })
    }

    /// Build an endpoint URL by appending path segments to the base URL.
    ///
    /// Segments are percent-encoded, so product IDs containing `/` stay in
    /// a single segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidBaseUrl(self.inner.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn http(&self) -> &reqwest::Client {
        &self.inner.client
    }
}

/// Turn a non-success response into an `ApiError`.
async fn error_for_status(response: reqwest::Response) -> ApiError {
    let status = response.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return ApiError::Unauthorized;
    }

    let message = response.text().await.unwrap_or_default();
    tracing::warn!(
        status = %status,
        body = %message.chars().take(200).collect::<String>(),
        "Account API returned non-success status"
    );
    ApiError::Api {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn client(base: &str) -> ApiClient {
        ApiClient::new(&ApiConfig {
            base_url: Url::parse(base).unwrap(),
            timeout: Duration::from_secs(1),
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_appends_segments() {
        let api = client("http://127.0.0.1:3000/api");
        assert_eq!(
            api.endpoint(&["wishlist"]).unwrap().as_str(),
            "http://127.0.0.1:3000/api/wishlist"
        );

        let api = client("http://127.0.0.1:3000/api/");
        assert_eq!(
            api.endpoint(&["wishlist", "tee-1"]).unwrap().as_str(),
            "http://127.0.0.1:3000/api/wishlist/tee-1"
        );
    }

    #[test]
    fn test_endpoint_encodes_ids() {
        let api = client("https://shop.example");
        assert_eq!(
            api.endpoint(&["wishlist", "gid/Product 1"]).unwrap().as_str(),
            "https://shop.example/wishlist/gid%2FProduct%201"
        );
    }

    #[test]
    fn test_rejects_non_base_url() {
        let result = ApiClient::new(&ApiConfig {
            base_url: Url::parse("mailto:shop@example.com").unwrap(),
            timeout: Duration::from_secs(1),
        });
        assert!(matches!(result, Err(ApiError::InvalidBaseUrl(_))));
    }
}
