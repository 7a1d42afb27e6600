pub mod auth;
pub mod entitlements;
pub mod error;
pub mod session_store;
pub mod token;

pub use auth::{AuthService, LoginOutcome, SessionCarriers};
pub use entitlements::{resolve_entitlements, EntitlementService};
pub use error::ServiceError;
pub use session_store::{
    generate_session_id, MockSessionStore, OpaqueSession, RedisSessionStore, SessionStore,
};
pub use token::{SessionClaims, TokenService};
