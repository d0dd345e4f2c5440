//! Access tokens for the secret-storage API.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

/// Default metadata server reachable from GCE, Cloud Run, and Cloud
/// Functions runtimes.
pub const DEFAULT_METADATA_URL: &str = "http://metadata.google.internal";

const TOKEN_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/token";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors fetching an access token.
#[derive(Debug, Clone, Error)]
pub enum TokenError {
    #[error("token endpoint error: {message}")]
    Endpoint { message: String },
}

/// Where bearer tokens for the secret-storage API come from.
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String, TokenError>;
}

/// Fixed token, for tests and local development.
///
/// `Debug` renders `[REDACTED]`; the raw value only leaves through
/// [`access_token()`](AccessTokenSource::access_token).
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }
}

impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StaticToken").field(&"[REDACTED]").finish()
    }
}

#[async_trait]
impl AccessTokenSource for StaticToken {
    async fn access_token(&self) -> Result<String, TokenError> {
        Ok(self.0.clone())
    }
}

/// Fetches service-account tokens from the instance metadata server.
///
/// No caching: each invocation is short-lived and independent, and caching
/// would keep credential state alive across invocations.
#[derive(Debug, Clone)]
pub struct MetadataServerTokens {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl MetadataServerTokens {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_METADATA_URL)
    }

    /// Point at a different metadata endpoint (tests).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

impl Default for MetadataServerTokens {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccessTokenSource for MetadataServerTokens {
    async fn access_token(&self) -> Result<String, TokenError> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, TOKEN_PATH))
            .header("Metadata-Flavor", "Google")
            .timeout(DEFAULT_TIMEOUT)
            .send()
            .await
            .map_err(|e| TokenError::Endpoint {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TokenError::Endpoint {
                message: format!("HTTP {status}"),
            });
        }

        let parsed: TokenResponse =
            response.json().await.map_err(|e| TokenError::Endpoint {
                message: format!("unparseable token response: {e}"),
            })?;
        Ok(parsed.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn static_token_returns_value_but_redacts_debug() {
        let source = StaticToken::new("ya29.secret");
        assert_eq!(source.access_token().await.unwrap(), "ya29.secret");
        assert!(!format!("{source:?}").contains("ya29"));
    }

    #[tokio::test]
    async fn metadata_server_token_fetched_with_flavor_header() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(
                "/computeMetadata/v1/instance/service-accounts/default/token",
            ))
            .and(header("Metadata-Flavor", "Google"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "ya29.fetched",
                "expires_in": 3599,
                "token_type": "Bearer",
            })))
            .mount(&server)
            .await;

        let source = MetadataServerTokens::with_base_url(server.uri());
        assert_eq!(source.access_token().await.unwrap(), "ya29.fetched");
    }

    #[tokio::test]
    async fn metadata_server_failure_is_an_endpoint_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let source = MetadataServerTokens::with_base_url(server.uri());
        let err = source.access_token().await.unwrap_err();
        assert!(matches!(err, TokenError::Endpoint { .. }));
    }
}
