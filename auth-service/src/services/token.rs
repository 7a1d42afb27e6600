use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::models::{ResolvedIdentity, Role};
use crate::services::ServiceError;

/// Signed self-contained session credential service.
///
/// Tokens are HS256 over the process-wide signing secret; the secret is
/// configuration, never part of the credential.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_days: i64,
}

/// Claims embedded in the session credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (identity ID)
    pub sub: String,
    pub email: String,
    pub name: Option<String>,
    /// Wire-exact role code
    pub role: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl SessionClaims {
    /// Decode into the shared resolved-identity shape. `None` means the
    /// embedded subject or role does not parse; the resolver fails closed.
    pub fn resolved(&self) -> Option<ResolvedIdentity> {
        Some(ResolvedIdentity {
            id: Uuid::parse_str(&self.sub).ok()?,
            email: self.email.clone(),
            name: self.name.clone(),
            role: Role::from_code(&self.role)?,
        })
    }
}

impl TokenService {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.signing_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.signing_secret.as_bytes()),
            ttl_days: config.ttl_days,
        }
    }

    /// Validity window of issued credentials.
    pub fn ttl(&self) -> Duration {
        Duration::days(self.ttl_days)
    }

    /// Mint a signed credential for a verified identity.
    pub fn issue(&self, identity: &ResolvedIdentity) -> Result<String, ServiceError> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: identity.id.to_string(),
            email: identity.email.clone(),
            name: identity.name.clone(),
            role: identity.role.as_str().to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl()).timestamp(),
        };
        self.sign(&claims)
    }

    fn sign(&self, claims: &SessionClaims) -> Result<String, ServiceError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Failed to encode token: {}", e)))
    }

    /// Validate signature and expiry, returning the embedded claims.
    ///
    /// Any failure is `ExpiredOrTamperedToken`; the caller must not learn
    /// which check failed.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, ServiceError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|_| ServiceError::ExpiredOrTamperedToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_service() -> TokenService {
        TokenService::new(&SessionConfig {
            signing_secret: "unit-test-signing-secret".to_string(),
            ttl_days: 30,
        })
    }

    fn doctor_identity() -> ResolvedIdentity {
        ResolvedIdentity {
            id: Uuid::new_v4(),
            email: "doc@x.com".to_string(),
            name: Some("Dr. Example".to_string()),
            role: Role::Doctor,
        }
    }

    #[test]
    fn issue_then_verify_round_trips_identity() {
        let service = test_service();
        let identity = doctor_identity();

        let token = service.issue(&identity).unwrap();
        let claims = service.verify(&token).unwrap();
        let resolved = claims.resolved().unwrap();

        assert_eq!(resolved.id, identity.id);
        assert_eq!(resolved.email, identity.email);
        assert_eq!(resolved.role, Role::Doctor);
    }

    #[test]
    fn expired_token_is_rejected() {
        let service = test_service();
        let identity = doctor_identity();
        let now = Utc::now();

        let claims = SessionClaims {
            sub: identity.id.to_string(),
            email: identity.email.clone(),
            name: None,
            role: identity.role.as_str().to_string(),
            iat: (now - Duration::days(31)).timestamp(),
            exp: (now - Duration::days(1)).timestamp(),
        };
        let token = service.sign(&claims).unwrap();

        assert!(matches!(
            service.verify(&token),
            Err(ServiceError::ExpiredOrTamperedToken)
        ));
    }

    #[test]
    fn token_signed_with_other_key_is_rejected() {
        let service = test_service();
        let other = TokenService::new(&SessionConfig {
            signing_secret: "a-different-secret".to_string(),
            ttl_days: 30,
        });

        let token = other.issue(&doctor_identity()).unwrap();

        assert!(matches!(
            service.verify(&token),
            Err(ServiceError::ExpiredOrTamperedToken)
        ));
    }

    #[test]
    fn garbage_token_is_rejected() {
        let service = test_service();
        assert!(matches!(
            service.verify("not-a-token"),
            Err(ServiceError::ExpiredOrTamperedToken)
        ));
    }

    #[test]
    fn claims_with_unknown_role_fail_closed() {
        let claims = SessionClaims {
            sub: Uuid::new_v4().to_string(),
            email: "doc@x.com".to_string(),
            name: None,
            role: "doctor".to_string(),
            iat: 0,
            exp: 0,
        };
        assert!(claims.resolved().is_none());
    }
}
