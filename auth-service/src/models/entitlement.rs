//! Entitlement entities: admin profiles, the shared feature catalog, direct
//! grants, and subscription plans.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Admin profile, owned 1:1 by an ADMIN identity.
#[derive(Debug, Clone, FromRow)]
pub struct AdminProfile {
    pub admin_id: Uuid,
    pub identity_id: Uuid,
    pub created_by: Uuid,
    pub permission_notes: Option<String>,
    pub created_utc: DateTime<Utc>,
}

/// Catalog feature. Deactivating a feature removes it from every admin's
/// effective entitlements without touching any grant row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Feature {
    pub feature_id: Uuid,
    pub feature_name: String,
    pub category: String,
    pub is_active: bool,
    pub created_utc: DateTime<Utc>,
}

/// Direct admin -> feature grant, unique on `(admin_id, feature_id)`.
#[derive(Debug, Clone, FromRow)]
pub struct AdminFeatureGrant {
    pub admin_id: Uuid,
    pub feature_id: Uuid,
    pub is_active: bool,
    pub granted_by: Uuid,
    pub granted_utc: DateTime<Utc>,
}

/// Subscription plan; `admin_id = None` marks a global plan that applies
/// to every admin.
#[derive(Debug, Clone, FromRow)]
pub struct SubscriptionPlan {
    pub plan_id: Uuid,
    pub admin_id: Option<Uuid>,
    pub plan_name: String,
    pub is_active: bool,
    pub created_utc: DateTime<Utc>,
}

/// Plan -> feature association.
#[derive(Debug, Clone, FromRow)]
pub struct PlanFeature {
    pub plan_id: Uuid,
    pub feature_id: Uuid,
}
