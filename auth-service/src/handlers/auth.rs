use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use service_core::error::AppError;

use crate::{
    dtos::auth::{LoginRequest, LoginResponse, LogoutResponse, SessionResponse},
    middleware::{extract_carriers, is_session_cookie, AUTH_TOKEN_COOKIE, OPAQUE_SESSION_COOKIE},
    utils::ValidatedJson,
    AppState,
};

/// Sign in with an email-or-phone identifier and password
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Sign-in successful, session cookies set", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 404, description = "Account not found or inactive", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state.auth_service.login(req).await?;

    let max_age = time::Duration::days(state.config.session.ttl_days);
    let secure = state.config.cookie_secure();

    let token_cookie = Cookie::build((AUTH_TOKEN_COOKIE, outcome.token))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .path("/")
        .max_age(max_age)
        .build();
    let session_cookie = Cookie::build((OPAQUE_SESSION_COOKIE, outcome.session_id))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .path("/")
        .max_age(max_age)
        .build();

    let jar = jar.add(token_cookie).add(session_cookie);

    Ok((
        StatusCode::OK,
        jar,
        Json(LoginResponse {
            success: true,
            user: outcome.identity.into(),
        }),
    ))
}

/// Resolve the current session
#[utoipa::path(
    get,
    path = "/auth/session",
    responses(
        (status = 200, description = "Resolved session; user is null when unauthenticated", body = SessionResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let carriers = extract_carriers(&headers);
    let user = state.auth_service.resolve_session(&carriers).await?;

    Ok(Json(SessionResponse {
        user: user.map(Into::into),
    }))
}

/// Sign out, clearing every session cookie on the request
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Signed out (idempotent)", body = LogoutResponse)
    ),
    tag = "Authentication"
)]
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    // Best-effort: drop the opaque record, but never fail the sign-out.
    if let Some(sid) = jar.get(OPAQUE_SESSION_COOKIE).map(|c| c.value().to_string()) {
        if let Err(e) = state.auth_service.invalidate_opaque(&sid).await {
            tracing::warn!(error = %e, "Failed to drop opaque session record during sign-out");
        }
    }

    let carrier_names: Vec<String> = jar
        .iter()
        .filter(|cookie| is_session_cookie(cookie.name()))
        .map(|cookie| cookie.name().to_string())
        .collect();

    let mut jar = jar;
    for name in carrier_names {
        let removal = Cookie::build((name, "")).path("/").build();
        jar = jar.remove(removal);
    }

    // The now-unauthenticated state must not be served from any cache.
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store, no-cache, must-revalidate"),
    );
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));

    (
        StatusCode::OK,
        headers,
        jar,
        Json(LogoutResponse { success: true }),
    )
}
