use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use service_core::error::AppError;

use crate::{
    models::{ResolvedIdentity, Role},
    services::SessionCarriers,
    AppState,
};

/// Cookie carrying the self-contained signed token.
pub const AUTH_TOKEN_COOKIE: &str = "auth-token";
/// Cookie carrying the opaque session reference.
pub const OPAQUE_SESSION_COOKIE: &str = "session";

pub const ADMIN_TIER_ROLES: &[Role] = &[Role::Admin, Role::SuperAdmin];
pub const SUPER_ADMIN_ONLY: &[Role] = &[Role::SuperAdmin];

/// Whether a cookie name belongs to the session-carrier convention.
/// Covers chunked continuations (`auth-token.0`, `auth-token.1`, ...) so
/// sign-out clears every carrier actually present on the request.
pub fn is_session_cookie(name: &str) -> bool {
    name == AUTH_TOKEN_COOKIE
        || name == OPAQUE_SESSION_COOKIE
        || name
            .strip_prefix("auth-token.")
            .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
}

/// Pull both credential carriers out of the request headers. The token may
/// arrive in the `auth-token` cookie or as a bearer header.
pub fn extract_carriers(headers: &HeaderMap) -> SessionCarriers {
    let jar = CookieJar::from_headers(headers);

    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string);

    SessionCarriers {
        token: jar
            .get(AUTH_TOKEN_COOKIE)
            .map(|c| c.value().to_string())
            .or(bearer),
        opaque_sid: jar.get(OPAQUE_SESSION_COOKIE).map(|c| c.value().to_string()),
    }
}

/// Per-route authorization guard: required roles are declared where the
/// route is mounted instead of re-checked inside each handler.
#[derive(Clone)]
pub struct RoleGuard {
    state: AppState,
    allowed: &'static [Role],
}

impl RoleGuard {
    pub fn new(state: AppState, allowed: &'static [Role]) -> Self {
        Self { state, allowed }
    }
}

/// Resolve the caller and gate on role.
///
/// No resolvable identity is 401; a resolved identity outside the accepted
/// set is 403. The two are never conflated.
pub async fn role_guard_middleware(
    State(guard): State<RoleGuard>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let carriers = extract_carriers(req.headers());

    let resolved = guard
        .state
        .auth_service
        .resolve_session(&carriers)
        .await
        .map_err(AppError::from)?;

    let Some(identity) = resolved else {
        return Err(AppError::Unauthorized(anyhow::anyhow!(
            "Authentication required"
        )));
    };

    if !guard.allowed.contains(&identity.role) {
        tracing::debug!(
            identity_id = %identity.id,
            role = %identity.role,
            "Role not accepted for route"
        );
        return Err(AppError::Forbidden(anyhow::anyhow!("Insufficient role")));
    }

    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

/// Extractor handing guarded handlers the resolved identity.
pub struct CurrentIdentity(pub ResolvedIdentity);

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ResolvedIdentity>()
            .cloned()
            .map(CurrentIdentity)
            .ok_or_else(|| {
                AppError::InternalError(anyhow::anyhow!(
                    "Resolved identity missing from request extensions"
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn session_cookie_convention_matches_all_carriers() {
        assert!(is_session_cookie("auth-token"));
        assert!(is_session_cookie("session"));
        assert!(is_session_cookie("auth-token.0"));
        assert!(is_session_cookie("auth-token.12"));
    }

    #[test]
    fn unrelated_cookies_are_left_alone() {
        assert!(!is_session_cookie("theme"));
        assert!(!is_session_cookie("auth-token-extra"));
        assert!(!is_session_cookie("auth-token."));
        assert!(!is_session_cookie("auth-token.abc"));
    }

    #[test]
    fn carriers_come_from_cookies_and_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("auth-token=tok123; session=sid456; theme=dark"),
        );

        let carriers = extract_carriers(&headers);
        assert_eq!(carriers.token.as_deref(), Some("tok123"));
        assert_eq!(carriers.opaque_sid.as_deref(), Some("sid456"));
    }

    #[test]
    fn bearer_header_supplies_token_when_cookie_is_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer tok789"),
        );

        let carriers = extract_carriers(&headers);
        assert_eq!(carriers.token.as_deref(), Some("tok789"));
        assert_eq!(carriers.opaque_sid, None);
    }

    #[test]
    fn empty_request_has_no_carriers() {
        let carriers = extract_carriers(&HeaderMap::new());
        assert_eq!(carriers.token, None);
        assert_eq!(carriers.opaque_sid, None);
    }
}
