//! Handler configuration.

use std::collections::BTreeSet;

use crate::errors::ConfigError;
use crate::labels::RequiredLabels;
use crate::types::{OperationKind, TriggerToken, DEFAULT_TRIGGERED_BY};

/// What to do with destructive events (secret deletion, version
/// destruction) when a label filter is configured.
///
/// Labels cannot be fetched after the resource is gone, so the filter is
/// unresolvable for these events; this flag makes the choice explicit
/// instead of hard-coding it. With an empty filter the question does not
/// arise and destructive events trigger under either policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DestructivePolicy {
    /// Trigger without label verification. May fire for secrets that never
    /// carried the required labels.
    #[default]
    AlwaysTrigger,
    /// Skip. May miss cleanup pipelines for secrets that did carry them.
    NeverTrigger,
}

impl DestructivePolicy {
    /// Stable wire name, used for the configuration surface.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::AlwaysTrigger => "always_trigger",
            Self::NeverTrigger => "never_trigger",
        }
    }

    pub fn from_wire_name(name: &str) -> Option<Self> {
        match name {
            "always_trigger" => Some(Self::AlwaysTrigger),
            "never_trigger" => Some(Self::NeverTrigger),
            _ => None,
        }
    }
}

/// Immutable configuration for [`TriggerHandler`](crate::handler::TriggerHandler).
///
/// Built once at startup through [`builder()`](Self::builder) and passed in
/// at construction — never ambient global state, so tests can vary
/// configurations freely.
#[derive(Debug, Clone)]
pub struct HandlerConfig {
    /// Git ref (branch or tag) the triggered pipeline runs on.
    pub gitlab_ref: String,
    /// Trigger credential forwarded to the CI endpoint.
    pub trigger_token: TriggerToken,
    /// Labels a secret must carry for non-destructive events to trigger.
    pub required_labels: RequiredLabels,
    /// Operation kinds that may trigger at all.
    pub enabled_kinds: BTreeSet<OperationKind>,
    /// Policy for destructive events under a non-empty label filter.
    pub destructive_policy: DestructivePolicy,
    /// Forwarded as the `GCP_PROJECT_ID` pipeline variable.
    pub gcp_project_id: String,
    /// Forwarded as the `TRIGGERED_BY` pipeline variable.
    pub triggered_by: String,
}

impl HandlerConfig {
    pub fn builder() -> HandlerConfigBuilder {
        HandlerConfigBuilder::new()
    }

    /// The three kinds enabled when no explicit set is configured:
    /// creation, version addition, and deletion.
    pub fn default_enabled_kinds() -> BTreeSet<OperationKind> {
        [
            OperationKind::Created,
            OperationKind::VersionAdded,
            OperationKind::Deleted,
        ]
        .into_iter()
        .collect()
    }
}

/// Fluent builder for [`HandlerConfig`]. Defaults are applied at
/// [`build()`](Self::build); only the trigger token is mandatory.
pub struct HandlerConfigBuilder {
    gitlab_ref: Option<String>,
    trigger_token: Option<TriggerToken>,
    required_labels: RequiredLabels,
    enabled_kinds: Option<BTreeSet<OperationKind>>,
    destructive_policy: DestructivePolicy,
    gcp_project_id: String,
    triggered_by: Option<String>,
}

impl HandlerConfigBuilder {
    fn new() -> Self {
        Self {
            gitlab_ref: None,
            trigger_token: None,
            required_labels: RequiredLabels::default(),
            enabled_kinds: None,
            destructive_policy: DestructivePolicy::default(),
            gcp_project_id: String::new(),
            triggered_by: None,
        }
    }

    /// Set the target ref. Default: `main`.
    pub fn gitlab_ref(mut self, ref_name: impl Into<String>) -> Self {
        self.gitlab_ref = Some(ref_name.into());
        self
    }

    pub fn trigger_token(mut self, token: TriggerToken) -> Self {
        self.trigger_token = Some(token);
        self
    }

    /// Set the label filter. Default: empty (every secret matches).
    pub fn required_labels(mut self, labels: RequiredLabels) -> Self {
        self.required_labels = labels;
        self
    }

    /// Set the enabled kinds. Default: [`HandlerConfig::default_enabled_kinds`].
    pub fn enabled_kinds(mut self, kinds: impl IntoIterator<Item = OperationKind>) -> Self {
        self.enabled_kinds = Some(kinds.into_iter().collect());
        self
    }

    pub fn destructive_policy(mut self, policy: DestructivePolicy) -> Self {
        self.destructive_policy = policy;
        self
    }

    pub fn gcp_project_id(mut self, project: impl Into<String>) -> Self {
        self.gcp_project_id = project.into();
        self
    }

    /// Override the `TRIGGERED_BY` variable. Default: `vaultgate`.
    pub fn triggered_by(mut self, source: impl Into<String>) -> Self {
        self.triggered_by = Some(source.into());
        self
    }

    pub fn build(self) -> Result<HandlerConfig, ConfigError> {
        let trigger_token = self.trigger_token.ok_or(ConfigError::Missing {
            key: "trigger_token",
        })?;
        Ok(HandlerConfig {
            gitlab_ref: self.gitlab_ref.unwrap_or_else(|| "main".to_string()),
            trigger_token,
            required_labels: self.required_labels,
            enabled_kinds: self
                .enabled_kinds
                .unwrap_or_else(HandlerConfig::default_enabled_kinds),
            destructive_policy: self.destructive_policy,
            gcp_project_id: self.gcp_project_id,
            triggered_by: self
                .triggered_by
                .unwrap_or_else(|| DEFAULT_TRIGGERED_BY.to_string()),
        })
    }
}
