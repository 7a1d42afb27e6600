use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    dtos::auth::LoginRequest,
    models::{Identity, ResolvedIdentity},
    services::{
        generate_session_id, OpaqueSession, ServiceError, SessionStore, TokenService,
    },
    utils::verify_password,
};

/// Credential carriers presented on a request: a self-contained signed
/// token and/or an opaque session reference. Resolution is a pure function
/// of these plus current time.
#[derive(Debug, Default, Clone)]
pub struct SessionCarriers {
    pub token: Option<String>,
    pub opaque_sid: Option<String>,
}

/// Everything a successful sign-in produces. The handler turns this into
/// cookies and the response body.
pub struct LoginOutcome {
    pub identity: ResolvedIdentity,
    pub token: String,
    pub session_id: String,
}

#[derive(Clone)]
pub struct AuthService {
    db: PgPool,
    tokens: TokenService,
    sessions: Arc<dyn SessionStore>,
}

impl AuthService {
    pub fn new(db: PgPool, tokens: TokenService, sessions: Arc<dyn SessionStore>) -> Self {
        Self {
            db,
            tokens,
            sessions,
        }
    }

    /// Verify credentials and mint both session carriers.
    ///
    /// No state is written until verification has fully succeeded, so an
    /// abandoned request leaves nothing behind.
    pub async fn login(&self, req: LoginRequest) -> Result<LoginOutcome, ServiceError> {
        let identity = self.find_identity_by_identifier(&req.identifier).await?;
        let resolved = check_credentials(identity, &req.password)?;

        let token = self.tokens.issue(&resolved)?;

        let session_id = generate_session_id();
        let record = OpaqueSession {
            identity_id: resolved.id,
            issued_utc: chrono::Utc::now(),
        };
        self.sessions
            .put(&session_id, &record, self.tokens.ttl().num_seconds())
            .await
            .map_err(ServiceError::SessionStore)?;

        tracing::info!(identity_id = %resolved.id, role = %resolved.role, "Sign-in succeeded");

        Ok(LoginOutcome {
            identity: resolved,
            token,
            session_id,
        })
    }

    /// Recover the caller's identity from whichever carrier is present.
    ///
    /// Self-contained token first (no database round-trip); an invalid or
    /// expired token falls through to the opaque carrier, never to an
    /// error. Neither carrier resolving means unauthenticated, returned as
    /// an explicit `None`.
    pub async fn resolve_session(
        &self,
        carriers: &SessionCarriers,
    ) -> Result<Option<ResolvedIdentity>, ServiceError> {
        if let Some(token) = &carriers.token {
            match self.tokens.verify(token) {
                Ok(claims) => match claims.resolved() {
                    Some(resolved) => return Ok(Some(resolved)),
                    // Claims outside the closed role enumeration: fail closed.
                    None => tracing::debug!("Rejected token with unparseable claims"),
                },
                Err(ServiceError::ExpiredOrTamperedToken) => {}
                Err(e) => return Err(e),
            }
        }

        if let Some(sid) = &carriers.opaque_sid {
            return self.resolve_opaque(sid).await;
        }

        Ok(None)
    }

    /// Resolve an opaque session reference through the store, re-checking
    /// `is_active` against the live identity row.
    async fn resolve_opaque(&self, sid: &str) -> Result<Option<ResolvedIdentity>, ServiceError> {
        let record = self
            .sessions
            .get(sid)
            .await
            .map_err(ServiceError::SessionStore)?;

        let Some(record) = record else {
            return Ok(None);
        };

        let identity = self.find_identity_by_id(record.identity_id).await?;

        let Some(identity) = identity else {
            return Ok(None);
        };
        if !identity.is_active {
            return Ok(None);
        }

        let resolved = ResolvedIdentity::from_identity(&identity).ok_or_else(|| {
            ServiceError::Internal(anyhow::anyhow!(
                "Identity {} carries role code '{}' outside the closed enumeration",
                identity.identity_id,
                identity.role_code
            ))
        })?;

        Ok(Some(resolved))
    }

    /// Drop an opaque session record. Best-effort on the sign-out path:
    /// the caller logs a failure but still clears cookies and succeeds.
    pub async fn invalidate_opaque(&self, sid: &str) -> Result<(), ServiceError> {
        self.sessions
            .delete(sid)
            .await
            .map_err(ServiceError::SessionStore)
    }

    pub async fn session_store_health(&self) -> Result<(), anyhow::Error> {
        self.sessions.health_check().await
    }

    async fn find_identity_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<Identity>, ServiceError> {
        let identity = sqlx::query_as::<_, Identity>(
            "SELECT identity_id, email, phone, password_hash, display_name, role_code, is_active, created_utc \
             FROM identities WHERE email = $1 OR phone = $1",
        )
        .bind(identifier)
        .fetch_optional(&self.db)
        .await?;

        Ok(identity)
    }

    async fn find_identity_by_id(&self, id: Uuid) -> Result<Option<Identity>, ServiceError> {
        let identity = sqlx::query_as::<_, Identity>(
            "SELECT identity_id, email, phone, password_hash, display_name, role_code, is_active, created_utc \
             FROM identities WHERE identity_id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(identity)
    }
}

/// Credential decision rules, in order: absent-or-inactive first (one
/// indistinguishable failure), then the hash comparison. Returns the
/// identity with the password hash stripped.
pub(crate) fn check_credentials(
    identity: Option<Identity>,
    password: &str,
) -> Result<ResolvedIdentity, ServiceError> {
    let identity = match identity {
        Some(identity) if identity.is_active => identity,
        _ => return Err(ServiceError::NotFoundOrInactive),
    };

    match verify_password(password, &identity.password_hash) {
        Ok(true) => {}
        Ok(false) => return Err(ServiceError::InvalidCredentials),
        Err(e) => return Err(ServiceError::Internal(e)),
    }

    ResolvedIdentity::from_identity(&identity).ok_or_else(|| {
        ServiceError::Internal(anyhow::anyhow!(
            "Identity {} carries role code '{}' outside the closed enumeration",
            identity.identity_id,
            identity.role_code
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::utils::hash_password;
    use chrono::Utc;

    fn identity_with(password: &str, role_code: &str, is_active: bool) -> Identity {
        Identity {
            identity_id: Uuid::new_v4(),
            email: "doc@x.com".to_string(),
            phone: Some("+15550100".to_string()),
            password_hash: hash_password(password).unwrap(),
            display_name: Some("Dr. Example".to_string()),
            role_code: role_code.to_string(),
            is_active,
            created_utc: Utc::now(),
        }
    }

    #[test]
    fn correct_password_resolves_identity_without_hash() {
        let identity = identity_with("hunter2!", "DOCTOR", true);
        let id = identity.identity_id;

        let resolved = check_credentials(Some(identity), "hunter2!").unwrap();

        assert_eq!(resolved.id, id);
        assert_eq!(resolved.role, Role::Doctor);
    }

    #[test]
    fn wrong_password_is_invalid_credentials() {
        let identity = identity_with("hunter2!", "DOCTOR", true);

        assert!(matches!(
            check_credentials(Some(identity), "wrong"),
            Err(ServiceError::InvalidCredentials)
        ));
    }

    #[test]
    fn missing_and_inactive_accounts_fail_identically() {
        let inactive = identity_with("hunter2!", "DOCTOR", false);

        // Correct password, deactivated account: same variant as unknown
        // identifier, so the two are indistinguishable to callers.
        let inactive_err = check_credentials(Some(inactive), "hunter2!").unwrap_err();
        let missing_err = check_credentials(None, "hunter2!").unwrap_err();

        assert!(matches!(inactive_err, ServiceError::NotFoundOrInactive));
        assert!(matches!(missing_err, ServiceError::NotFoundOrInactive));
    }

    #[test]
    fn unknown_role_code_is_an_internal_fault() {
        let identity = identity_with("hunter2!", "JANITOR", true);

        assert!(matches!(
            check_credentials(Some(identity), "hunter2!"),
            Err(ServiceError::Internal(_))
        ));
    }
}
