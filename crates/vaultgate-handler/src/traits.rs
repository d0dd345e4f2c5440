//! Async seams between the handler and the outside world.

use async_trait::async_trait;

use crate::errors::{ResolveError, TriggerError};
use crate::types::{LabelSet, PipelineRun, SecretName, TriggerRequest};

/// Where secret labels come from.
///
/// The production implementation queries the secret-storage service over
/// HTTP; tests use the in-memory resolvers from `test_support`.
#[async_trait]
pub trait LabelResolver: Send + Sync {
    /// Fetch the current labels of `secret`. The handler always passes a
    /// versionless resource path.
    async fn labels(&self, secret: &SecretName) -> Result<LabelSet, ResolveError>;
}

/// The CI system's pipeline-trigger endpoint.
///
/// Implementations make exactly one attempt per call; redelivery, if any,
/// is the event router's concern.
#[async_trait]
pub trait PipelineTrigger: Send + Sync {
    async fn trigger(&self, request: &TriggerRequest) -> Result<PipelineRun, TriggerError>;
}
