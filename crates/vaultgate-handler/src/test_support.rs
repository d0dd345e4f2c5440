//! Test doubles for the handler seams.
//!
//! ```ignore
//! let resolver = Arc::new(StaticLabelResolver::from_pairs(&[("env", "prod")]));
//! let trigger = Arc::new(RecordingTrigger::succeeding(run));
//!
//! handler.handle(&payload).await?;
//!
//! assert_eq!(resolver.call_count(), 1);
//! assert_eq!(trigger.requests().len(), 1);
//! ```

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::errors::{ResolveError, TriggerError};
use crate::traits::{LabelResolver, PipelineTrigger};
use crate::types::{LabelSet, PipelineRun, SecretName, TriggerRequest};

/// Resolver backed by a fixed label map. Records every lookup so tests can
/// assert on call counts and the exact resource paths queried.
pub struct StaticLabelResolver {
    labels: LabelSet,
    lookups: Mutex<Vec<String>>,
}

impl StaticLabelResolver {
    pub fn new(labels: LabelSet) -> Self {
        Self {
            labels,
            lookups: Mutex::new(Vec::new()),
        }
    }

    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    /// Resource paths looked up so far, in order.
    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.lookups.lock().len()
    }
}

#[async_trait]
impl LabelResolver for StaticLabelResolver {
    async fn labels(&self, secret: &SecretName) -> Result<LabelSet, ResolveError> {
        self.lookups.lock().push(secret.as_str().to_string());
        Ok(self.labels.clone())
    }
}

/// Resolver whose every lookup fails, for exercising the skip-on-failure
/// path.
pub struct FailingLabelResolver;

#[async_trait]
impl LabelResolver for FailingLabelResolver {
    async fn labels(&self, secret: &SecretName) -> Result<LabelSet, ResolveError> {
        Err(ResolveError::Lookup {
            message: format!("injected lookup failure for {secret}"),
        })
    }
}

/// Trigger double that records every request and returns a canned outcome.
pub struct RecordingTrigger {
    requests: Mutex<Vec<TriggerRequest>>,
    response: Result<PipelineRun, TriggerError>,
}

impl RecordingTrigger {
    pub fn succeeding(run: PipelineRun) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            response: Ok(run),
        }
    }

    pub fn failing(error: TriggerError) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            response: Err(error),
        }
    }

    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<TriggerRequest> {
        self.requests.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl PipelineTrigger for RecordingTrigger {
    async fn trigger(&self, request: &TriggerRequest) -> Result<PipelineRun, TriggerError> {
        self.requests.lock().push(request.clone());
        self.response.clone()
    }
}
