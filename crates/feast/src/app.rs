//! Wiring from [`FeastConfig`] to a running [`FeastService`].

use std::sync::Arc;
use std::time::Duration;

use feast_api::{build_dispatcher, DomainStore};
use feast_config::FeastConfig;
use feast_router::PatternError;
use feast_server::{AuthGate, FeastService, ServerConfig, StaticCredentials};

/// Runtime server settings from the `[server]` and `[api]` sections.
///
/// `max_connections = 0` means no limit.
#[must_use]
pub fn server_config(config: &FeastConfig) -> ServerConfig {
    let server = &config.server;
    let api = &config.api;
    ServerConfig::builder()
        .http_addr(server.http_addr.clone())
        .shutdown_timeout(Duration::from_secs(server.shutdown_timeout_secs))
        .request_timeout(Duration::from_millis(server.request_timeout_ms))
        .max_connections((server.max_connections > 0).then_some(server.max_connections))
        .max_body_size(server.max_body_size)
        .api_enabled(api.enabled)
        .jsonp_enabled(api.jsonp_enabled)
        .route_prefix(api.route_prefix.clone())
        .charset(api.charset.clone())
        .build()
}

/// Basic credentials from `[[auth.users]]`.
#[must_use]
pub fn credentials(config: &FeastConfig) -> StaticCredentials {
    config
        .auth
        .users
        .iter()
        .fold(StaticCredentials::new(), |creds, user| {
            creds.with_user(&user.username, &user.password, user.roles.iter().cloned())
        })
}

/// The authentication gate.
///
/// Without configured users there is no verifier, so any Basic credentials
/// are rejected as `unauthenticated`.
#[must_use]
pub fn auth_gate(config: &FeastConfig) -> AuthGate {
    let creds = credentials(config);
    if creds.is_empty() {
        AuthGate::new()
    } else {
        AuthGate::new().with_verifier(creds)
    }
}

/// Builds the full service over `store`.
pub fn build_service(
    config: &FeastConfig,
    store: Arc<dyn DomainStore>,
) -> Result<FeastService, PatternError> {
    let dispatcher = build_dispatcher(store, [], |_| {})?;
    Ok(FeastService::builder()
        .config(server_config(config))
        .dispatcher(dispatcher)
        .auth(auth_gate(config))
        .build())
}
