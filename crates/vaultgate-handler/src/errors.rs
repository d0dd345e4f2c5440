//! Error types for the handler seams.

use thiserror::Error;

/// Errors from [`decode_event`](crate::decode::decode_event).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("missing field: {field}")]
    MissingField { field: &'static str },
    #[error("field {field} has the wrong shape: {message}")]
    InvalidField {
        field: &'static str,
        message: String,
    },
    #[error("invalid secret resource name: {name}")]
    InvalidResourceName { name: String },
    /// A well-formed entry whose method is not one of the six secret
    /// mutations. The handler treats this as a skip, not a failure.
    #[error("unsupported audit method: {method}")]
    UnsupportedMethod { method: String },
}

/// Errors from [`LabelResolver`](crate::traits::LabelResolver).
///
/// Always recoverable: the handler cannot evaluate the label filter, so it
/// skips the trigger and logs a warning.
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    /// The secret no longer exists (possible under race with deletion).
    #[error("secret not found: {name}")]
    NotFound { name: String },
    #[error("label lookup failed: {message}")]
    Lookup { message: String },
}

/// Errors from [`PipelineTrigger`](crate::traits::PipelineTrigger).
#[derive(Debug, Clone, Error)]
pub enum TriggerError {
    /// Invalid or expired trigger token.
    #[error("pipeline trigger rejected: invalid or expired trigger token")]
    Auth,
    /// The trigger was accepted but no CI job matched. The target CI
    /// configuration needs at least one job whose run condition accepts
    /// triggered pipelines.
    #[error("pipeline would be empty: {message}")]
    EmptyPipeline { message: String },
    #[error("pipeline trigger failed: HTTP {status}: {message}")]
    Http { status: u16, message: String },
    #[error("pipeline trigger failed: {message}")]
    Network { message: String },
}

impl TriggerError {
    /// Whether redelivering the event could plausibly succeed. Auth and
    /// CI-configuration failures will not self-heal on redelivery; network
    /// faults and server errors might.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network { .. } => true,
            Self::Http { status, .. } => *status >= 500,
            Self::Auth | Self::EmptyPipeline { .. } => false,
        }
    }
}

/// Startup-time configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration: {key}")]
    Missing { key: &'static str },
    #[error("invalid value for {key}: {message}")]
    Invalid {
        key: &'static str,
        message: String,
    },
}

/// Invocation-boundary error: the delivered payload could not be decoded.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("malformed payload: {0}")]
    Malformed(#[from] DecodeError),
}
