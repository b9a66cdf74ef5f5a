//! Courtside Server
//!
//! Serves the auth REST APIs:
//! - Auth APIs: login, refresh, register, current principal
//! - Admin APIs: principal lookup, organization members
//! - Health and OpenAPI documentation
//!
//! ## Configuration
//!
//! Read from `config.toml` (or the file named by `COURTSIDE_CONFIG`), then
//! overridden by environment variables:
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `COURTSIDE_HTTP_PORT` / `PORT` | `8080` | HTTP port |
//! | `COURTSIDE_DATABASE_URL` / `DATABASE_URL` | - | PostgreSQL URL; unset uses in-memory storage |
//! | `COURTSIDE_JWT_SECRET` / `JWT_SECRET` | placeholder | HMAC signing secret |
//! | `COURTSIDE_ACCESS_TOKEN_TTL` / `JWT_EXPIRATION` | `15m` | Access token lifetime |
//! | `COURTSIDE_REFRESH_TOKEN_TTL` / `JWT_REFRESH_EXPIRATION` | `168h` | Refresh token lifetime |
//! | `COURTSIDE_CORS_ORIGINS` / `CORS_ALLOWED_ORIGINS` | `*` | Comma-separated origins |
//! | `COURTSIDE_BOOTSTRAP_ADMIN_ENABLED` | `false` | Create a super admin when none exists |
//! | `COURTSIDE_DEV_MODE` | `false` | Allow the placeholder secret |
//! | `LOG_FORMAT` | `text` | `json` for structured output |
//! | `RUST_LOG` | `info` | Log level |
//!
//! Run with `--example-config` to print a sample configuration file.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::http::{header, HeaderValue, Method};
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tokio::{net::TcpListener, signal};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use utoipa_swagger_ui::SwaggerUi;

use cs_auth::{
    api_router, AdminSeeder, AppState, Argon2Config, CredentialStore, InMemoryPrincipalStore,
    PasswordPolicy, PgPrincipalRepository, PrincipalStore, TokenConfig, TokenService,
};
use cs_config::{AppConfig, PLACEHOLDER_JWT_SECRET};

#[tokio::main]
async fn main() -> Result<()> {
    if std::env::args().any(|arg| arg == "--example-config") {
        print!("{}", AppConfig::example_toml());
        return Ok(());
    }

    cs_common::logging::init_logging("cs-server");

    info!("Starting Courtside Server");

    let config = AppConfig::load()?;
    config.validate()?;

    if config.auth.jwt_secret == PLACEHOLDER_JWT_SECRET {
        warn!("Using the placeholder JWT secret (dev mode); never do this in production");
    }

    let credentials = Arc::new(CredentialStore::new(
        Argon2Config::default(),
        PasswordPolicy::with_min_length(config.auth.password_min_length),
    )?);
    let tokens = Arc::new(TokenService::new(TokenConfig {
        secret: config.auth.jwt_secret.clone(),
        issuer: config.auth.issuer.clone(),
        access_ttl: chrono::Duration::seconds(config.auth.access_token_ttl_secs),
        refresh_ttl: chrono::Duration::seconds(config.auth.refresh_token_ttl_secs),
    })?);

    let state = if config.database.url.is_empty() {
        warn!("No database URL configured; principals are kept in memory and lost on restart");
        let store = Arc::new(InMemoryPrincipalStore::new());
        build_state(&config, store, credentials, tokens).await?
    } else {
        info!(max_connections = config.database.max_connections, "Connecting to PostgreSQL");
        let pool = PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .connect(&config.database.url)
            .await?;
        let store = Arc::new(PgPrincipalRepository::new(pool));
        store.init_schema().await?;
        build_state(&config, store, credentials, tokens).await?
    };

    let (router, openapi) = api_router(state);

    let app = Router::new()
        .merge(router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.http.cors_origins));

    let addr = format!("{}:{}", config.http.host, config.http.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("API server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Courtside Server shutdown complete");
    Ok(())
}

/// Seed the bootstrap admin if enabled, then wire the request state.
async fn build_state<S>(
    config: &AppConfig,
    store: Arc<S>,
    credentials: Arc<CredentialStore>,
    tokens: Arc<TokenService>,
) -> Result<AppState>
where
    S: PrincipalStore + 'static,
{
    if config.bootstrap_admin.enabled {
        let seeder = AdminSeeder::new(store.clone(), credentials.clone());
        let admin = &config.bootstrap_admin;
        if seeder.seed(&admin.email, &admin.password, &admin.full_name).await?.is_some() {
            warn!(email = %admin.email, "Bootstrap admin created; change its password");
        }
    }

    let lookup_timeout = Duration::from_millis(config.auth.principal_lookup_timeout_ms);
    Ok(AppState::new(store, credentials, tokens, lookup_timeout))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() || origins.iter().any(|origin| origin == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::ORIGIN, header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION])
        .allow_credentials(true)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
