//! Environment configuration for the server binary.

use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::time::Duration;

use vaultgate_handler::{
    ConfigError, DestructivePolicy, HandlerConfig, OperationKind, RequiredLabels, TriggerToken,
};

/// Everything the binary needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub gitlab_url: String,
    pub gitlab_project_id: String,
    pub request_timeout: Duration,
    pub handler: HandlerConfig,
}

impl ServerConfig {
    /// Read from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Core loader, parameterized over the variable source so tests never
    /// mutate the process environment.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let gitlab_url = get("GITLAB_URL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "https://gitlab.com".to_string());
        let gitlab_project_id = get("GITLAB_PROJECT_ID")
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing {
                key: "GITLAB_PROJECT_ID",
            })?;
        let trigger_token = get("GITLAB_TRIGGER_TOKEN")
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing {
                key: "GITLAB_TRIGGER_TOKEN",
            })?;
        let gitlab_ref = get("GITLAB_REF")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "main".to_string());

        let required_labels = RequiredLabels::parse(&get("REQUIRED_LABELS").unwrap_or_default());

        let enabled_kinds = match get("ENABLED_EVENTS") {
            Some(raw) => parse_enabled_events(&raw)?,
            None => HandlerConfig::default_enabled_kinds(),
        };

        let destructive_policy = match get("DESTRUCTIVE_EVENT_POLICY") {
            None => DestructivePolicy::default(),
            Some(raw) => DestructivePolicy::from_wire_name(raw.trim()).ok_or_else(|| {
                ConfigError::Invalid {
                    key: "DESTRUCTIVE_EVENT_POLICY",
                    message: format!("unknown policy: {raw}"),
                }
            })?,
        };

        let request_timeout = match get("REQUEST_TIMEOUT_SECS") {
            None => Duration::from_secs(30),
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::Invalid {
                    key: "REQUEST_TIMEOUT_SECS",
                    message: format!("not a number of seconds: {raw}"),
                })?;
                Duration::from_secs(secs)
            }
        };

        let listen_addr = get("LISTEN_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8080".to_string())
            .parse()
            .map_err(|e| ConfigError::Invalid {
                key: "LISTEN_ADDR",
                message: format!("{e}"),
            })?;

        let handler = HandlerConfig::builder()
            .trigger_token(TriggerToken::new(trigger_token))
            .gitlab_ref(gitlab_ref)
            .required_labels(required_labels)
            .enabled_kinds(enabled_kinds)
            .destructive_policy(destructive_policy)
            .gcp_project_id(get("GCP_PROJECT_ID").unwrap_or_default())
            .build()?;

        Ok(Self {
            listen_addr,
            gitlab_url,
            gitlab_project_id,
            request_timeout,
            handler,
        })
    }
}

fn parse_enabled_events(raw: &str) -> Result<BTreeSet<OperationKind>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| {
            OperationKind::from_wire_name(name).ok_or_else(|| ConfigError::Invalid {
                key: "ENABLED_EVENTS",
                message: format!("unknown event kind: {name}"),
            })
        })
        .collect()
}
