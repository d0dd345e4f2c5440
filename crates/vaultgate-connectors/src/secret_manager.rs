//! Secret Manager label lookups.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use vaultgate_handler::{LabelResolver, LabelSet, ResolveError, SecretName};

use crate::token::AccessTokenSource;

/// Default API endpoint for Google Secret Manager.
pub const DEFAULT_SECRET_MANAGER_URL: &str = "https://secretmanager.googleapis.com";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Resolves secret labels through the Secret Manager REST API.
///
/// `GET {base}/v1/{projects/p/secrets/s}` with a bearer token from the
/// configured [`AccessTokenSource`]. The handler only calls this for
/// non-destructive events, with the versionless resource path.
#[derive(Clone)]
pub struct SecretManagerResolver {
    client: Client,
    base_url: String,
    tokens: Arc<dyn AccessTokenSource>,
    timeout: Duration,
}

/// The subset of the secret resource we read.
#[derive(Debug, Deserialize)]
struct SecretResource {
    #[serde(default)]
    labels: LabelSet,
}

impl SecretManagerResolver {
    pub fn new(tokens: Arc<dyn AccessTokenSource>) -> Self {
        Self::with_base_url(DEFAULT_SECRET_MANAGER_URL, tokens)
    }

    /// Point at a different endpoint (tests, emulators).
    pub fn with_base_url(base_url: impl Into<String>, tokens: Arc<dyn AccessTokenSource>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Override the per-request timeout. Default: 30 seconds.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl LabelResolver for SecretManagerResolver {
    async fn labels(&self, secret: &SecretName) -> Result<LabelSet, ResolveError> {
        let token = self
            .tokens
            .access_token()
            .await
            .map_err(|e| ResolveError::Lookup {
                message: format!("token source: {e}"),
            })?;

        let response = self
            .client
            .get(format!("{}/v1/{}", self.base_url, secret.as_str()))
            .bearer_auth(token)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ResolveError::Lookup {
                message: e.to_string(),
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            // Possible under race with rapid deletion.
            return Err(ResolveError::NotFound {
                name: secret.as_str().to_string(),
            });
        }
        if !status.is_success() {
            return Err(ResolveError::Lookup {
                message: format!("HTTP {status}"),
            });
        }

        let resource: SecretResource =
            response.json().await.map_err(|e| ResolveError::Lookup {
                message: format!("unparseable secret resource: {e}"),
            })?;
        Ok(resource.labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::StaticToken;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn resolver(base: String) -> SecretManagerResolver {
        SecretManagerResolver::with_base_url(base, Arc::new(StaticToken::new("ya29.test")))
    }

    fn name(raw: &str) -> SecretName {
        SecretName::parse(raw).expect("valid resource path")
    }

    #[tokio::test]
    async fn labels_are_returned() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/projects/p/secrets/db-password"))
            .and(header("authorization", "Bearer ya29.test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "projects/p/secrets/db-password",
                "labels": { "env": "prod", "trigger-gitlab": "true" },
            })))
            .mount(&server)
            .await;

        let labels = resolver(server.uri())
            .labels(&name("projects/p/secrets/db-password"))
            .await
            .expect("should resolve");
        assert_eq!(labels.get("env").map(String::as_str), Some("prod"));
        assert_eq!(labels.len(), 2);
    }

    #[tokio::test]
    async fn missing_labels_field_is_empty_set() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "projects/p/secrets/unlabeled",
            })))
            .mount(&server)
            .await;

        let labels = resolver(server.uri())
            .labels(&name("projects/p/secrets/unlabeled"))
            .await
            .expect("should resolve");
        assert!(labels.is_empty());
    }

    #[tokio::test]
    async fn not_found_is_distinguished() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = resolver(server.uri())
            .labels(&name("projects/p/secrets/gone"))
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::NotFound { .. }));
    }

    #[tokio::test]
    async fn server_error_is_lookup_failure() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = resolver(server.uri())
            .labels(&name("projects/p/secrets/s"))
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::Lookup { .. }));
    }
}
