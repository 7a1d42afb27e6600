#![allow(dead_code)]

use auth_service::config::{
    AuthConfig, DatabaseConfig, Environment, RedisConfig, SecurityConfig, SessionConfig,
    SwaggerConfig, SwaggerMode,
};
use auth_service::models::{ResolvedIdentity, Role};
use auth_service::services::{
    AuthService, EntitlementService, MockSessionStore, SessionStore, TokenService,
};
use auth_service::AppState;
use std::sync::Arc;
use uuid::Uuid;

pub const TEST_SIGNING_SECRET: &str = "integration-test-signing-secret";

pub fn test_config() -> AuthConfig {
    AuthConfig {
        common: service_core::config::Config { port: 8080 },
        environment: Environment::Dev,
        service_name: "auth-service".to_string(),
        service_version: "test".to_string(),
        log_level: "error".to_string(),
        database: DatabaseConfig {
            // Never connected: tests use a lazy pool and only exercise
            // paths with no database round-trip.
            url: "postgres://localhost:5432/auth_test".to_string(),
            max_connections: 2,
            min_connections: 0,
        },
        redis: RedisConfig {
            url: "redis://localhost:6379".to_string(),
        },
        session: SessionConfig {
            signing_secret: TEST_SIGNING_SECRET.to_string(),
            ttl_days: 30,
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
        swagger: SwaggerConfig {
            enabled: SwaggerMode::Disabled,
        },
    }
}

/// Application state backed by an in-memory session store and a lazy
/// database pool.
pub fn test_state() -> (AppState, Arc<MockSessionStore>) {
    let config = test_config();
    let db = auth_service::db::create_lazy_pool(&config.database).expect("lazy pool");

    let sessions = Arc::new(MockSessionStore::new());
    let store: Arc<dyn SessionStore> = sessions.clone();
    let tokens = TokenService::new(&config.session);
    let auth_service = AuthService::new(db.clone(), tokens, store);
    let entitlements = EntitlementService::new(db.clone());

    let state = AppState {
        config,
        db,
        auth_service,
        entitlements,
    };

    (state, sessions)
}

pub fn identity_with_role(role: Role) -> ResolvedIdentity {
    ResolvedIdentity {
        id: Uuid::new_v4(),
        email: "doc@x.com".to_string(),
        name: Some("Dr. Example".to_string()),
        role,
    }
}

/// Mint a valid signed session token for the given identity.
pub fn issue_token(identity: &ResolvedIdentity) -> String {
    let tokens = TokenService::new(&test_config().session);
    tokens.issue(identity).expect("token issuance")
}

/// Mint a token that expired well outside any validation leeway.
pub fn issue_expired_token(identity: &ResolvedIdentity) -> String {
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};

    let now = chrono::Utc::now();
    let claims = auth_service::services::SessionClaims {
        sub: identity.id.to_string(),
        email: identity.email.clone(),
        name: identity.name.clone(),
        role: identity.role.as_str().to_string(),
        iat: (now - chrono::Duration::days(31)).timestamp(),
        exp: (now - chrono::Duration::days(1)).timestamp(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(TEST_SIGNING_SECRET.as_bytes()),
    )
    .expect("expired token encoding")
}

/// Mint a token signed with a key the service does not trust.
pub fn issue_tampered_token(identity: &ResolvedIdentity) -> String {
    let tokens = TokenService::new(&SessionConfig {
        signing_secret: "not-the-service-signing-secret".to_string(),
        ttl_days: 30,
    });
    tokens.issue(identity).expect("token issuance")
}
