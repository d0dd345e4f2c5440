//! Vaultgate — conditional CI pipeline triggering from secret audit events.
//!
//! This crate holds the decision core: decode a delivered audit-log entry
//! into a [`SecretEvent`], resolve the affected secret's labels (skipped for
//! destructive events, whose resource is gone), evaluate the configured
//! label filter, and on a match issue exactly one pipeline-trigger call
//! through the [`PipelineTrigger`] seam.
//!
//! The handler is stateless between invocations; delivery is at-least-once
//! and no deduplication is performed. Outbound integrations live in
//! `vaultgate-connectors`, the HTTP intake binary in `vaultgate-server`.

pub mod config;
pub mod decode;
pub mod errors;
pub mod handler;
pub mod labels;
pub mod traits;
pub mod types;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use config::{DestructivePolicy, HandlerConfig, HandlerConfigBuilder};
pub use decode::decode_event;
pub use errors::{ConfigError, DecodeError, HandlerError, ResolveError, TriggerError};
pub use handler::TriggerHandler;
pub use labels::RequiredLabels;
pub use traits::{LabelResolver, PipelineTrigger};
pub use types::{
    Decision, LabelSet, OperationKind, PipelineRun, SecretEvent, SecretName, SkipReason,
    TriggerRequest, TriggerToken, TriggerVariables, DEFAULT_TRIGGERED_BY,
};

#[cfg(any(test, feature = "test-support"))]
pub use test_support::{FailingLabelResolver, RecordingTrigger, StaticLabelResolver};
