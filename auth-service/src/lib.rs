pub mod config;
pub mod db;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use axum::{
    extract::State,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Json, Router,
};
use service_core::error::AppError;
use service_core::middleware::security_headers_middleware;
use sqlx::PgPool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AuthConfig;
use crate::middleware::{role_guard_middleware, RoleGuard, ADMIN_TIER_ROLES, SUPER_ADMIN_ONLY};
use crate::services::{AuthService, EntitlementService};

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        handlers::auth::login,
        handlers::auth::session,
        handlers::auth::logout,
        handlers::entitlements::get_entitlements,
        handlers::entitlements::upsert_grant,
    ),
    components(
        schemas(
            dtos::ErrorResponse,
            dtos::auth::LoginRequest,
            dtos::auth::LoginResponse,
            dtos::auth::SessionResponse,
            dtos::auth::SessionUserResponse,
            dtos::auth::LogoutResponse,
            dtos::entitlements::EntitlementsResponse,
            dtos::entitlements::FeatureResponse,
            dtos::entitlements::UpsertGrantRequest,
            dtos::entitlements::GrantResponse,
            models::Role,
        )
    ),
    tags(
        (name = "Authentication", description = "Sign-in, session resolution, sign-out"),
        (name = "Entitlements", description = "Admin feature and subscription-plan entitlements"),
        (name = "Observability", description = "Service health"),
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub config: AuthConfig,
    pub db: PgPool,
    pub auth_service: AuthService,
    pub entitlements: EntitlementService,
}

pub async fn build_router(state: AppState) -> Result<Router, AppError> {
    // Entitlement routes carry their required roles declaratively; the
    // guard distinguishes 401 (no session) from 403 (wrong role).
    let entitlement_routes = Router::new()
        .route(
            "/auth/entitlements",
            get(handlers::entitlements::get_entitlements),
        )
        .layer(from_fn_with_state(
            RoleGuard::new(state.clone(), ADMIN_TIER_ROLES),
            role_guard_middleware,
        ));

    let grant_routes = Router::new()
        .route(
            "/auth/admin/grants",
            post(handlers::entitlements::upsert_grant),
        )
        .layer(from_fn_with_state(
            RoleGuard::new(state.clone(), SUPER_ADMIN_ONLY),
            role_guard_middleware,
        ));

    let mut app = Router::new().route("/health", get(health_check));

    let swagger_enabled = match state.config.environment {
        crate::config::Environment::Dev => true,
        crate::config::Environment::Prod => match state.config.swagger.enabled {
            crate::config::SwaggerMode::Public | crate::config::SwaggerMode::Authenticated => true,
            crate::config::SwaggerMode::Disabled => false,
        },
    };

    if swagger_enabled {
        app =
            app.merge(SwaggerUi::new("/docs").url("/.well-known/openapi.json", ApiDoc::openapi()));
    } else {
        // Keep the OpenAPI JSON available for programmatic access.
        app = app.route(
            "/.well-known/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        );
    }

    let cors_origins: Vec<axum::http::HeaderValue> = state
        .config
        .security
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!("Ignoring invalid CORS origin '{}': {}", origin, e);
                None
            }
        })
        .collect();

    let app = app
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/session", get(handlers::auth::session))
        .route("/auth/logout", post(handlers::auth::logout))
        .merge(entitlement_routes)
        .merge(grant_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            },
        ))
        .layer(from_fn(security_headers_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(cors_origins)
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([
                    axum::http::header::AUTHORIZATION,
                    axum::http::header::CONTENT_TYPE,
                ])
                .allow_credentials(true),
        );

    Ok(app)
}

/// Service health check
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
        (status = 500, description = "Service is unhealthy")
    ),
    tag = "Observability"
)]
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    db::health_check(&state.db).await.map_err(|e| {
        tracing::error!(error = %e, "PostgreSQL health check failed");
        AppError::DatabaseError(e)
    })?;

    state.auth_service.session_store_health().await.map_err(|e| {
        tracing::error!(error = %e, "Session store health check failed");
        AppError::InternalError(e)
    })?;

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "environment": format!("{:?}", state.config.environment),
        "checks": {
            "postgres": "up",
            "redis": "up"
        }
    })))
}
