use auth_service::{
    build_router,
    config::AuthConfig,
    services::{AuthService, EntitlementService, RedisSessionStore, TokenService},
    AppState,
};
use service_core::observability::logging::init_tracing;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), service_core::error::AppError> {
    // Load configuration - fail fast if invalid (including a missing
    // signing secret in production).
    let config = AuthConfig::from_env()?;

    init_tracing(&config.service_name, &config.log_level);

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting authentication service"
    );

    let db = auth_service::db::create_pool(&config.database).await?;
    auth_service::db::run_migrations(&db)
        .await
        .map_err(|e| service_core::error::AppError::InternalError(anyhow::Error::new(e)))?;
    tracing::info!("Database initialized successfully");

    let sessions = Arc::new(RedisSessionStore::new(&config.redis).await?);
    tracing::info!("Session store initialized");

    let tokens = TokenService::new(&config.session);
    let auth_service = AuthService::new(db.clone(), tokens, sessions);
    let entitlements = EntitlementService::new(db.clone());

    let state = AppState {
        config: config.clone(),
        db,
        auth_service,
        entitlements,
    };

    let app = build_router(state).await?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
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
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
