use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::{ResolvedIdentity, Role};

/// Sign-in payload. The identifier matches the stored email or phone.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Identifier is required"))]
    #[schema(example = "doc@x.com")]
    pub identifier: String,

    #[validate(length(min = 1, message = "Password is required"))]
    #[schema(example = "password123")]
    pub password: String,
}

/// Resolved identity as exposed on the wire.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionUserResponse {
    pub id: Uuid,
    #[schema(example = "doc@x.com")]
    pub email: String,
    #[schema(example = "Dr. Example")]
    pub name: Option<String>,
    #[schema(example = "DOCTOR")]
    pub role: Role,
}

impl From<ResolvedIdentity> for SessionUserResponse {
    fn from(identity: ResolvedIdentity) -> Self {
        Self {
            id: identity.id,
            email: identity.email,
            name: identity.name,
            role: identity.role,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    #[schema(example = true)]
    pub success: bool,
    pub user: SessionUserResponse,
}

/// Session query result. Always returned with HTTP 200; an absent session
/// is `user: null`, not an error.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub user: Option<SessionUserResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LogoutResponse {
    #[schema(example = true)]
    pub success: bool,
}
