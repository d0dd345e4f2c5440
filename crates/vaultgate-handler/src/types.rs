//! Core event and trigger types.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{DecodeError, TriggerError};

/// Default value of the `TRIGGERED_BY` pipeline variable, identifying this
/// system as the trigger source.
pub const DEFAULT_TRIGGERED_BY: &str = "vaultgate";

/// Labels attached to a secret, keyed by label name.
pub type LabelSet = BTreeMap<String, String>;

/// The secret mutation kinds this system understands.
///
/// Each kind corresponds to one audit-log `methodName` and has a stable wire
/// name used both for the `SECRET_EVENT_TYPE` pipeline variable and for the
/// `ENABLED_EVENTS` configuration list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    /// `CreateSecret` — a new secret resource was created.
    #[serde(rename = "secret_created")]
    Created,
    /// `AddSecretVersion` — a new version was added to an existing secret.
    #[serde(rename = "version_added")]
    VersionAdded,
    /// `EnableSecretVersion`
    #[serde(rename = "version_enabled")]
    VersionEnabled,
    /// `DisableSecretVersion`
    #[serde(rename = "version_disabled")]
    VersionDisabled,
    /// `DestroySecretVersion` — the version payload is gone.
    #[serde(rename = "version_destroyed")]
    VersionDestroyed,
    /// `DeleteSecret` — the secret resource is gone.
    #[serde(rename = "secret_deleted")]
    Deleted,
}

impl OperationKind {
    /// Map an audit-log `methodName` to a kind.
    ///
    /// Returns `None` for methods outside the six mutations (access, list,
    /// IAM changes, ...), which the handler ignores rather than rejects.
    pub fn from_method_name(method: &str) -> Option<Self> {
        if method.ends_with("CreateSecret") {
            Some(Self::Created)
        } else if method.ends_with("AddSecretVersion") {
            Some(Self::VersionAdded)
        } else if method.ends_with("EnableSecretVersion") {
            Some(Self::VersionEnabled)
        } else if method.ends_with("DisableSecretVersion") {
            Some(Self::VersionDisabled)
        } else if method.ends_with("DestroySecretVersion") {
            Some(Self::VersionDestroyed)
        } else if method.ends_with("DeleteSecret") {
            Some(Self::Deleted)
        } else {
            None
        }
    }

    /// Stable wire name for this kind.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::Created => "secret_created",
            Self::VersionAdded => "version_added",
            Self::VersionEnabled => "version_enabled",
            Self::VersionDisabled => "version_disabled",
            Self::VersionDestroyed => "version_destroyed",
            Self::Deleted => "secret_deleted",
        }
    }

    /// Inverse of [`wire_name()`](Self::wire_name).
    pub fn from_wire_name(name: &str) -> Option<Self> {
        match name {
            "secret_created" => Some(Self::Created),
            "version_added" => Some(Self::VersionAdded),
            "version_enabled" => Some(Self::VersionEnabled),
            "version_disabled" => Some(Self::VersionDisabled),
            "version_destroyed" => Some(Self::VersionDestroyed),
            "secret_deleted" => Some(Self::Deleted),
            _ => None,
        }
    }

    /// True when the affected resource (or its payload) no longer exists
    /// and its labels can no longer be fetched.
    pub fn is_destructive(&self) -> bool {
        matches!(self, Self::Deleted | Self::VersionDestroyed)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Fully-qualified secret resource path:
/// `projects/{project}/secrets/{secret}[/versions/{version}]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SecretName(String);

impl SecretName {
    /// Validate and wrap a resource path.
    pub fn parse(raw: &str) -> Result<Self, DecodeError> {
        let parts: Vec<&str> = raw.split('/').collect();
        let shape_ok = (parts.len() == 4 || (parts.len() == 6 && parts[4] == "versions"))
            && parts[0] == "projects"
            && parts[2] == "secrets"
            && parts.iter().all(|p| !p.is_empty());
        if !shape_ok {
            return Err(DecodeError::InvalidResourceName {
                name: raw.to_string(),
            });
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `{project}` segment.
    pub fn project_id(&self) -> &str {
        self.0.split('/').nth(1).unwrap_or("")
    }

    /// The short `{secret}` segment.
    pub fn secret_id(&self) -> &str {
        self.0.split('/').nth(3).unwrap_or("")
    }

    /// The `{version}` segment, if the path names a version.
    pub fn version(&self) -> Option<&str> {
        self.0.split('/').nth(5)
    }

    /// The path with any `/versions/{version}` suffix stripped. Label
    /// lookups address the secret itself, never a version.
    pub fn without_version(&self) -> SecretName {
        match self.0.find("/versions/") {
            Some(idx) => SecretName(self.0[..idx].to_string()),
            None => self.clone(),
        }
    }
}

impl fmt::Display for SecretName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One observed secret mutation, decoded from an audit-log entry.
///
/// Constructed by [`decode_event`](crate::decode::decode_event), consumed by
/// exactly one handler invocation, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct SecretEvent {
    pub kind: OperationKind,
    pub resource: SecretName,
    pub timestamp: DateTime<Utc>,
}

/// A CI pipeline trigger credential.
///
/// The raw value is only reachable through [`expose()`](Self::expose);
/// `Debug` and `Display` render `[REDACTED]` so the token cannot leak
/// through logs or error text.
#[derive(Clone, PartialEq, Eq)]
pub struct TriggerToken(String);

impl TriggerToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The raw credential, for building the outbound request body.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for TriggerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TriggerToken").field(&"[REDACTED]").finish()
    }
}

impl fmt::Display for TriggerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// The fixed variable set forwarded to the triggered pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerVariables {
    pub event_kind: OperationKind,
    pub secret_name: String,
    pub secret_resource: String,
    pub gcp_project_id: String,
    pub triggered_by: String,
}

impl TriggerVariables {
    /// The `variables[...]` form entries, in wire order.
    pub fn as_form_fields(&self) -> [(&'static str, String); 5] {
        [
            (
                "variables[SECRET_EVENT_TYPE]",
                self.event_kind.wire_name().to_string(),
            ),
            ("variables[SECRET_NAME]", self.secret_name.clone()),
            ("variables[SECRET_RESOURCE]", self.secret_resource.clone()),
            ("variables[GCP_PROJECT_ID]", self.gcp_project_id.clone()),
            ("variables[TRIGGERED_BY]", self.triggered_by.clone()),
        ]
    }
}

/// One pipeline trigger call, built fresh per matching event and discarded
/// after the call completes.
#[derive(Debug, Clone)]
pub struct TriggerRequest {
    /// Branch or tag the pipeline runs on.
    pub ref_name: String,
    pub token: TriggerToken,
    pub variables: TriggerVariables,
}

/// A successfully created pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineRun {
    pub id: u64,
    pub web_url: String,
}

/// Terminal outcome of one handler invocation.
#[derive(Debug, Clone)]
pub enum Decision {
    /// The filter passed and the pipeline was created.
    Triggered { event: SecretEvent, run: PipelineRun },
    /// The filter passed but the single trigger attempt failed.
    TriggerFailed {
        event: SecretEvent,
        error: TriggerError,
    },
    /// No trigger call was made.
    Skipped {
        event: SecretEvent,
        reason: SkipReason,
    },
    /// The entry was well-formed but its method is not a secret mutation.
    Ignored { method: String },
}

/// Why an invocation ended without a trigger call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The operation kind is not in the enabled set.
    KindDisabled,
    /// The secret's labels did not match the required set.
    NoMatch { labels: LabelSet },
    /// The label lookup failed; the filter could not be evaluated.
    LookupFailed { message: String },
    /// Destructive event suppressed by the configured policy.
    DestructiveSuppressed,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KindDisabled => "kind_disabled",
            Self::NoMatch { .. } => "no_match",
            Self::LookupFailed { .. } => "lookup_failed",
            Self::DestructiveSuppressed => "destructive_suppressed",
        }
    }
}
