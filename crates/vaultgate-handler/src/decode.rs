//! Audit-log entry decoding.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::errors::DecodeError;
use crate::types::{OperationKind, SecretEvent, SecretName};

/// Decode one delivered audit-log entry into a [`SecretEvent`].
///
/// Accepts the entry at the top level or nested under `data` (structured
/// CloudEvent bodies wrap the entry that way). Requires
/// `protoPayload.methodName` and `protoPayload.resourceName`; `timestamp`
/// is optional RFC 3339 and defaults to the current time. No side effects.
pub fn decode_event(payload: &Value) -> Result<SecretEvent, DecodeError> {
    let entry = if payload.get("protoPayload").is_some() {
        payload
    } else if let Some(data) = payload.get("data") {
        data
    } else {
        return Err(DecodeError::MissingField {
            field: "protoPayload",
        });
    };

    let proto = entry
        .get("protoPayload")
        .ok_or(DecodeError::MissingField {
            field: "protoPayload",
        })?;

    let method = str_field(proto, "methodName")?;
    let resource = str_field(proto, "resourceName")?;

    let kind = OperationKind::from_method_name(method).ok_or_else(|| {
        DecodeError::UnsupportedMethod {
            method: method.to_string(),
        }
    })?;

    let resource = SecretName::parse(resource)?;

    let timestamp = entry
        .get("timestamp")
        .and_then(|v| v.as_str())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);

    Ok(SecretEvent {
        kind,
        resource,
        timestamp,
    })
}

fn str_field<'a>(proto: &'a Value, field: &'static str) -> Result<&'a str, DecodeError> {
    match proto.get(field) {
        None | Some(Value::Null) => Err(DecodeError::MissingField { field }),
        Some(Value::String(s)) if !s.is_empty() => Ok(s),
        Some(Value::String(_)) => Err(DecodeError::InvalidField {
            field,
            message: "empty string".into(),
        }),
        Some(other) => Err(DecodeError::InvalidField {
            field,
            message: format!("expected string, got {other}"),
        }),
    }
}
