pub mod auth;

pub use auth::{
    extract_carriers, is_session_cookie, role_guard_middleware, CurrentIdentity, RoleGuard,
    ADMIN_TIER_ROLES, AUTH_TOKEN_COOKIE, OPAQUE_SESSION_COOKIE, SUPER_ADMIN_ONLY,
};
