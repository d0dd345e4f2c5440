//! GitLab pipeline trigger client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use vaultgate_handler::{PipelineRun, PipelineTrigger, TriggerError, TriggerRequest};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// How much of a failure body to carry into diagnostics.
const BODY_SNIPPET_LEN: usize = 200;

/// Client for the GitLab pipeline trigger API.
///
/// Makes exactly one
/// `POST {base}/api/v4/projects/{project}/trigger/pipeline` per
/// [`trigger()`](PipelineTrigger::trigger) call, form-encoded per the API:
/// `token`, `ref`, and one `variables[KEY]=VALUE` entry per pipeline
/// variable. No retries; redelivery is the event router's concern.
#[derive(Debug, Clone)]
pub struct GitLabPipelineClient {
    client: Client,
    base_url: String,
    project_id: String,
    timeout: Duration,
}

/// Error body GitLab returns for rejected triggers:
/// `{"message": {"base": ["..."]}}`. Auth failures use a plain string
/// message instead; those fall back to [`Default`].
#[derive(Debug, Default, Deserialize)]
struct TriggerErrorBody {
    #[serde(default)]
    message: ErrorMessage,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorMessage {
    #[serde(default)]
    base: Vec<String>,
}

impl GitLabPipelineClient {
    /// `base_url` is the GitLab instance URL (e.g. `https://gitlab.com`),
    /// `project_id` the numeric or URL-encoded project identifier.
    pub fn new(base_url: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            project_id: project_id.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Override the per-request timeout. Default: 30 seconds.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn trigger_url(&self) -> String {
        format!(
            "{}/api/v4/projects/{}/trigger/pipeline",
            self.base_url, self.project_id
        )
    }
}

#[async_trait]
impl PipelineTrigger for GitLabPipelineClient {
    async fn trigger(&self, request: &TriggerRequest) -> Result<PipelineRun, TriggerError> {
        let mut form: Vec<(&str, String)> = vec![
            ("token", request.token.expose().to_string()),
            ("ref", request.ref_name.clone()),
        ];
        form.extend(request.variables.as_form_fields());

        let response = self
            .client
            .post(self.trigger_url())
            .timeout(self.timeout)
            .form(&form)
            .send()
            .await
            .map_err(|e| TriggerError::Network {
                message: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| TriggerError::Network {
            message: format!("failed to read response body: {e}"),
        })?;

        if status.is_success() {
            return serde_json::from_str::<PipelineRun>(&body).map_err(|e| TriggerError::Http {
                status: status.as_u16(),
                message: format!("unparseable trigger response: {e}"),
            });
        }

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(TriggerError::Auth),
            StatusCode::BAD_REQUEST => {
                let parsed: TriggerErrorBody = serde_json::from_str(&body).unwrap_or_default();
                match parsed
                    .message
                    .base
                    .into_iter()
                    .find(|m| m.to_ascii_lowercase().contains("empty"))
                {
                    Some(message) => Err(TriggerError::EmptyPipeline { message }),
                    None => Err(TriggerError::Http {
                        status: status.as_u16(),
                        message: snippet(&body),
                    }),
                }
            }
            _ => Err(TriggerError::Http {
                status: status.as_u16(),
                message: snippet(&body),
            }),
        }
    }
}

fn snippet(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(BODY_SNIPPET_LEN) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vaultgate_handler::{OperationKind, TriggerToken, TriggerVariables};
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> TriggerRequest {
        TriggerRequest {
            ref_name: "main".into(),
            token: TriggerToken::new("glptt-abc123"),
            variables: TriggerVariables {
                event_kind: OperationKind::VersionAdded,
                secret_name: "db-password".into(),
                secret_resource: "projects/p/secrets/db-password".into(),
                gcp_project_id: "p".into(),
                triggered_by: "vaultgate".into(),
            },
        }
    }

    #[tokio::test]
    async fn created_pipeline_is_returned() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v4/projects/42/trigger/pipeline"))
            .and(header(
                "content-type",
                "application/x-www-form-urlencoded",
            ))
            .and(body_string_contains("token=glptt-abc123"))
            .and(body_string_contains("ref=main"))
            // Form encoding turns the brackets in variables[...] into %5B/%5D.
            .and(body_string_contains(
                "variables%5BSECRET_EVENT_TYPE%5D=version_added",
            ))
            .and(body_string_contains("variables%5BSECRET_NAME%5D=db-password"))
            .and(body_string_contains("variables%5BTRIGGERED_BY%5D=vaultgate"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": 9001,
                "web_url": "https://gitlab.example.com/g/p/-/pipelines/9001",
                "status": "created",
            })))
            .mount(&server)
            .await;

        let client = GitLabPipelineClient::new(server.uri(), "42");
        let run = client.trigger(&request()).await.expect("should trigger");
        assert_eq!(run.id, 9001);
        assert_eq!(run.web_url, "https://gitlab.example.com/g/p/-/pipelines/9001");
    }

    #[tokio::test]
    async fn empty_pipeline_is_distinguished() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v4/projects/42/trigger/pipeline"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "message": { "base": ["The pipeline failed due to the user not being verified, or the pipeline is empty"] }
            })))
            .mount(&server)
            .await;

        let client = GitLabPipelineClient::new(server.uri(), "42");
        let err = client.trigger(&request()).await.unwrap_err();
        assert!(matches!(err, TriggerError::EmptyPipeline { .. }));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn other_bad_request_is_generic() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v4/projects/42/trigger/pipeline"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "message": { "base": ["Reference not found"] }
            })))
            .mount(&server)
            .await;

        let client = GitLabPipelineClient::new(server.uri(), "42");
        let err = client.trigger(&request()).await.unwrap_err();
        assert!(matches!(err, TriggerError::Http { status: 400, .. }));
    }

    #[tokio::test]
    async fn unauthorized_maps_to_auth() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v4/projects/42/trigger/pipeline"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "message": "401 Unauthorized"
            })))
            .mount(&server)
            .await;

        let client = GitLabPipelineClient::new(server.uri(), "42");
        let err = client.trigger(&request()).await.unwrap_err();
        assert!(matches!(err, TriggerError::Auth));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn forbidden_maps_to_auth() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v4/projects/42/trigger/pipeline"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let client = GitLabPipelineClient::new(server.uri(), "42");
        let err = client.trigger(&request()).await.unwrap_err();
        assert!(matches!(err, TriggerError::Auth));
    }

    #[tokio::test]
    async fn server_error_is_transient() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v4/projects/42/trigger/pipeline"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream maintenance"))
            .mount(&server)
            .await;

        let client = GitLabPipelineClient::new(server.uri(), "42");
        let err = client.trigger(&request()).await.unwrap_err();
        match err {
            TriggerError::Http { status, ref message } => {
                assert_eq!(status, 503);
                assert!(message.contains("upstream maintenance"));
            }
            other => panic!("expected Http, got {other:?}"),
        }
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn trailing_slash_in_base_url_is_tolerated() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v4/projects/42/trigger/pipeline"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": 1, "web_url": "https://x/1"
            })))
            .mount(&server)
            .await;

        let client = GitLabPipelineClient::new(format!("{}/", server.uri()), "42");
        client.trigger(&request()).await.expect("should trigger");
    }

    #[test]
    fn snippet_caps_long_bodies() {
        let long = "x".repeat(500);
        let s = snippet(&long);
        assert!(s.len() < 500);
        assert!(s.ends_with("..."));
        assert_eq!(snippet("short"), "short");
    }
}
