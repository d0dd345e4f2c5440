//! Invocation orchestration: decode, resolve, evaluate, trigger.

use std::sync::Arc;

use serde_json::Value;

use crate::config::{DestructivePolicy, HandlerConfig};
use crate::decode::decode_event;
use crate::errors::{DecodeError, HandlerError};
use crate::traits::{LabelResolver, PipelineTrigger};
use crate::types::{Decision, SecretEvent, SkipReason, TriggerRequest, TriggerVariables};

/// Outcome of the label-filter evaluation step.
enum Evaluation {
    Proceed,
    Skip(SkipReason),
}

/// The stateless decision-and-action component.
///
/// One instance serves all invocations. It holds only immutable
/// configuration and shared connectors, so concurrent invocations need no
/// coordination; within one invocation the steps run strictly sequentially
/// because each depends on the previous step's result.
pub struct TriggerHandler {
    config: HandlerConfig,
    resolver: Arc<dyn LabelResolver>,
    trigger: Arc<dyn PipelineTrigger>,
}

impl TriggerHandler {
    pub fn new(
        config: HandlerConfig,
        resolver: Arc<dyn LabelResolver>,
        trigger: Arc<dyn PipelineTrigger>,
    ) -> Self {
        Self {
            config,
            resolver,
            trigger,
        }
    }

    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    /// Handle one delivered audit event.
    ///
    /// Returns the terminal [`Decision`], or [`HandlerError::Malformed`]
    /// when the payload cannot be decoded. At most one outbound trigger
    /// call is made, and exactly one summary log event is emitted, per
    /// invocation. Redelivered events are handled independently — no
    /// deduplication is performed, so an identical redelivery produces a
    /// second pipeline.
    pub async fn handle(&self, payload: &Value) -> Result<Decision, HandlerError> {
        let event = match decode_event(payload) {
            Ok(event) => event,
            Err(DecodeError::UnsupportedMethod { method }) => {
                tracing::debug!(method = %method, "ignoring unhandled audit method");
                return Ok(Decision::Ignored { method });
            }
            Err(e) => {
                tracing::error!(error = %e, "malformed event payload");
                return Err(HandlerError::Malformed(e));
            }
        };

        if !self.config.enabled_kinds.contains(&event.kind) {
            tracing::info!(
                kind = %event.kind,
                resource = %event.resource,
                decision = "skipped",
                reason = SkipReason::KindDisabled.as_str(),
                "event kind not enabled"
            );
            return Ok(Decision::Skipped {
                event,
                reason: SkipReason::KindDisabled,
            });
        }

        match self.evaluate(&event).await {
            Evaluation::Proceed => {}
            Evaluation::Skip(reason) => return Ok(Decision::Skipped { event, reason }),
        }

        let request = TriggerRequest {
            ref_name: self.config.gitlab_ref.clone(),
            token: self.config.trigger_token.clone(),
            variables: TriggerVariables {
                event_kind: event.kind,
                secret_name: event.resource.secret_id().to_string(),
                secret_resource: event.resource.as_str().to_string(),
                gcp_project_id: self.config.gcp_project_id.clone(),
                triggered_by: self.config.triggered_by.clone(),
            },
        };

        match self.trigger.trigger(&request).await {
            Ok(run) => {
                tracing::info!(
                    kind = %event.kind,
                    resource = %event.resource,
                    decision = "triggered",
                    pipeline_id = run.id,
                    pipeline_url = %run.web_url,
                    "pipeline triggered"
                );
                Ok(Decision::Triggered { event, run })
            }
            Err(error) => {
                tracing::error!(
                    kind = %event.kind,
                    resource = %event.resource,
                    decision = "trigger_failed",
                    transient = error.is_transient(),
                    error = %error,
                    "pipeline trigger failed"
                );
                Ok(Decision::TriggerFailed { event, error })
            }
        }
    }

    /// Evaluate the label filter for `event`.
    ///
    /// Destructive kinds never reach the resolver: the resource is gone, so
    /// the configured policy decides. With an empty filter there is nothing
    /// to verify and no lookup is made for any kind.
    async fn evaluate(&self, event: &SecretEvent) -> Evaluation {
        let required = &self.config.required_labels;
        if required.is_empty() {
            return Evaluation::Proceed;
        }

        if event.kind.is_destructive() {
            return match self.config.destructive_policy {
                DestructivePolicy::AlwaysTrigger => {
                    tracing::debug!(
                        kind = %event.kind,
                        resource = %event.resource,
                        "labels unverifiable for destructive event, triggering per policy"
                    );
                    Evaluation::Proceed
                }
                DestructivePolicy::NeverTrigger => {
                    tracing::info!(
                        kind = %event.kind,
                        resource = %event.resource,
                        decision = "skipped",
                        reason = SkipReason::DestructiveSuppressed.as_str(),
                        "labels unverifiable for destructive event, skipping per policy"
                    );
                    Evaluation::Skip(SkipReason::DestructiveSuppressed)
                }
            };
        }

        match self.resolver.labels(&event.resource.without_version()).await {
            Ok(labels) => {
                if required.matches(&labels) {
                    Evaluation::Proceed
                } else {
                    tracing::info!(
                        kind = %event.kind,
                        resource = %event.resource,
                        decision = "skipped",
                        reason = SkipReason::NoMatch { labels: labels.clone() }.as_str(),
                        labels = ?labels,
                        required = ?required,
                        "labels do not match required set"
                    );
                    Evaluation::Skip(SkipReason::NoMatch { labels })
                }
            }
            Err(e) => {
                tracing::warn!(
                    kind = %event.kind,
                    resource = %event.resource,
                    decision = "skipped",
                    reason = "lookup_failed",
                    error = %e,
                    "label lookup failed, cannot evaluate filter"
                );
                Evaluation::Skip(SkipReason::LookupFailed {
                    message: e.to_string(),
                })
            }
        }
    }
}
