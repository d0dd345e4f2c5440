//! Vaultgate server — audit-event intake entry point.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use vaultgate_connectors::{GitLabPipelineClient, MetadataServerTokens, SecretManagerResolver};
use vaultgate_handler::TriggerHandler;

mod config;
mod http;

use config::ServerConfig;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("vaultgate=info".parse().unwrap()),
        )
        .json()
        .init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "configuration error, refusing to start");
            std::process::exit(1);
        }
    };

    let trigger = GitLabPipelineClient::new(&config.gitlab_url, &config.gitlab_project_id)
        .with_timeout(config.request_timeout);
    let resolver = SecretManagerResolver::new(Arc::new(MetadataServerTokens::new()))
        .with_timeout(config.request_timeout);
    let handler = Arc::new(TriggerHandler::new(
        config.handler.clone(),
        Arc::new(resolver),
        Arc::new(trigger),
    ));

    let app = http::build_router(handler);

    tracing::info!(
        addr = %config.listen_addr,
        gitlab_project = %config.gitlab_project_id,
        "vaultgate listening"
    );

    let listener = match tokio::net::TcpListener::bind(config.listen_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(addr = %config.listen_addr, error = %e, "failed to bind");
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "server error");
        std::process::exit(1);
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
