//! Identity model - the account record every authentication decision is
//! made against.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Closed role enumeration. Wire representation is the SCREAMING_SNAKE_CASE
/// code stored in `identities.role_code`; decoding is case-exact so `admin`
/// never passes for `ADMIN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    SuperAdmin,
    Admin,
    Doctor,
    Attendant,
    ControlRoom,
    Patient,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "SUPER_ADMIN",
            Role::Admin => "ADMIN",
            Role::Doctor => "DOCTOR",
            Role::Attendant => "ATTENDANT",
            Role::ControlRoom => "CONTROL_ROOM",
            Role::Patient => "PATIENT",
        }
    }

    /// Case-exact decode of a stored or transmitted role code.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "SUPER_ADMIN" => Some(Role::SuperAdmin),
            "ADMIN" => Some(Role::Admin),
            "DOCTOR" => Some(Role::Doctor),
            "ATTENDANT" => Some(Role::Attendant),
            "CONTROL_ROOM" => Some(Role::ControlRoom),
            "PATIENT" => Some(Role::Patient),
            _ => None,
        }
    }

    /// Roles allowed to hold entitlements.
    pub fn is_admin_tier(&self) -> bool {
        matches!(self, Role::SuperAdmin | Role::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity entity as stored. The password hash never leaves this type;
/// responses go through [`ResolvedIdentity`] or the sanitized DTOs.
#[derive(Debug, Clone, FromRow)]
pub struct Identity {
    pub identity_id: Uuid,
    pub email: String,
    pub phone: Option<String>,
    pub password_hash: String,
    pub display_name: Option<String>,
    pub role_code: String,
    pub is_active: bool,
    pub created_utc: DateTime<Utc>,
}

impl Identity {
    pub fn role(&self) -> Option<Role> {
        Role::from_code(&self.role_code)
    }
}

/// Identity fields sufficient for authorization decisions, with the
/// password hash stripped. Both credential carriers resolve to this shape.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ResolvedIdentity {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
}

impl ResolvedIdentity {
    /// Build from a freshly loaded identity row. Fails on a role code
    /// outside the closed enumeration (data fault, not a caller error).
    pub fn from_identity(identity: &Identity) -> Option<Self> {
        Some(Self {
            id: identity.identity_id,
            email: identity.email.clone(),
            name: identity.display_name.clone(),
            role: identity.role()?,
        })
    }
}
