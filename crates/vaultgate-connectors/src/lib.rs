//! Outbound integrations for vaultgate.
//!
//! Each module wraps one external service behind the corresponding seam
//! from `vaultgate-handler`: the GitLab pipeline-trigger API
//! ([`GitLabPipelineClient`]) and the Secret Manager label lookup
//! ([`SecretManagerResolver`]). Clients are cheap to clone, hold no
//! event-specific state, and are shared across concurrent invocations.

pub mod gitlab;
pub mod secret_manager;
pub mod token;

pub use gitlab::GitLabPipelineClient;
pub use secret_manager::{SecretManagerResolver, DEFAULT_SECRET_MANAGER_URL};
pub use token::{AccessTokenSource, MetadataServerTokens, StaticToken, TokenError};
