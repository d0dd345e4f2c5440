//! Event intake routes.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use vaultgate_handler::{Decision, TriggerHandler};

/// Build the router: event intake plus a health probe.
pub fn build_router(handler: Arc<TriggerHandler>) -> Router {
    Router::new()
        .route("/", post(receive_event))
        .route("/healthz", get(healthz))
        .with_state(handler)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

/// Receive one pushed audit event.
///
/// 200 for every handled event, including skips and non-transient trigger
/// failures that redelivery cannot fix; 400 for malformed payloads; 502
/// when a transient trigger failure should be redelivered by the router.
/// Redelivery of a matching event produces a second pipeline — accepted
/// at-least-once semantics.
async fn receive_event(
    State(handler): State<Arc<TriggerHandler>>,
    Json(payload): Json<Value>,
) -> Response {
    match handler.handle(&payload).await {
        Ok(decision) => decision_response(&decision),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

fn decision_response(decision: &Decision) -> Response {
    match decision {
        Decision::Triggered { run, .. } => (
            StatusCode::OK,
            Json(json!({
                "decision": "triggered",
                "pipeline_id": run.id,
                "pipeline_url": run.web_url,
            })),
        )
            .into_response(),
        Decision::TriggerFailed { error, .. } => {
            let status = if error.is_transient() {
                StatusCode::BAD_GATEWAY
            } else {
                StatusCode::OK
            };
            (
                status,
                Json(json!({
                    "decision": "trigger_failed",
                    "transient": error.is_transient(),
                    "error": error.to_string(),
                })),
            )
                .into_response()
        }
        Decision::Skipped { reason, .. } => (
            StatusCode::OK,
            Json(json!({ "decision": "skipped", "reason": reason.as_str() })),
        )
            .into_response(),
        Decision::Ignored { method } => (
            StatusCode::OK,
            Json(json!({ "decision": "ignored", "method": method })),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::json;
    use tower::ServiceExt;
    use vaultgate_handler::test_support::{RecordingTrigger, StaticLabelResolver};
    use vaultgate_handler::{
        HandlerConfig, OperationKind, PipelineRun, RequiredLabels, TriggerError, TriggerToken,
    };

    fn app(trigger: Arc<RecordingTrigger>) -> Router {
        let config = HandlerConfig::builder()
            .trigger_token(TriggerToken::new("glptt-test"))
            .required_labels(RequiredLabels::parse("env=prod"))
            .enabled_kinds([OperationKind::VersionAdded])
            .build()
            .expect("valid config");
        let resolver = Arc::new(StaticLabelResolver::from_pairs(&[("env", "prod")]));
        build_router(Arc::new(TriggerHandler::new(config, resolver, trigger)))
    }

    fn event_body() -> Body {
        Body::from(
            json!({
                "protoPayload": {
                    "methodName": "google.cloud.secretmanager.v1.SecretManagerService.AddSecretVersion",
                    "resourceName": "projects/p/secrets/s",
                }
            })
            .to_string(),
        )
    }

    fn post_event(body: Body) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(body)
            .expect("request")
    }

    #[tokio::test]
    async fn triggered_event_returns_ok() {
        let trigger = Arc::new(RecordingTrigger::succeeding(PipelineRun {
            id: 7,
            web_url: "https://gitlab.example.com/g/p/-/pipelines/7".into(),
        }));
        let response = app(Arc::clone(&trigger))
            .oneshot(post_event(event_body()))
            .await
            .expect("infallible");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(trigger.call_count(), 1);
    }

    #[tokio::test]
    async fn malformed_payload_returns_bad_request() {
        let trigger = Arc::new(RecordingTrigger::succeeding(PipelineRun {
            id: 7,
            web_url: "https://x/7".into(),
        }));
        let response = app(Arc::clone(&trigger))
            .oneshot(post_event(Body::from(r#"{"not":"an event"}"#)))
            .await
            .expect("infallible");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(trigger.call_count(), 0);
    }

    #[tokio::test]
    async fn transient_trigger_failure_returns_bad_gateway() {
        let trigger = Arc::new(RecordingTrigger::failing(TriggerError::Network {
            message: "connect timeout".into(),
        }));
        let response = app(trigger)
            .oneshot(post_event(event_body()))
            .await
            .expect("infallible");
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn permanent_trigger_failure_returns_ok() {
        // Redelivery cannot fix a bad token; do not ask the router to retry.
        let trigger = Arc::new(RecordingTrigger::failing(TriggerError::Auth));
        let response = app(trigger)
            .oneshot(post_event(event_body()))
            .await
            .expect("infallible");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn healthz_is_ok() {
        let trigger = Arc::new(RecordingTrigger::succeeding(PipelineRun {
            id: 1,
            web_url: "https://x/1".into(),
        }));
        let response = app(trigger)
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/healthz")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("infallible");
        assert_eq!(response.status(), StatusCode::OK);
    }
}
