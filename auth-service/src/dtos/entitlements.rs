use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::{AdminFeatureGrant, Feature};

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FeatureResponse {
    pub id: Uuid,
    #[schema(example = "appointment-scheduling")]
    pub name: String,
    #[schema(example = "clinical")]
    pub category: String,
}

impl From<Feature> for FeatureResponse {
    fn from(feature: Feature) -> Self {
        Self {
            id: feature.feature_id,
            name: feature.feature_name,
            category: feature.category,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EntitlementsResponse {
    pub features: Vec<FeatureResponse>,
}

/// Grant upsert payload; `granted_by` comes from the authenticated
/// SuperAdmin, never the body.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpsertGrantRequest {
    pub admin_id: Uuid,
    pub feature_id: Uuid,
    pub is_active: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GrantResponse {
    pub admin_id: Uuid,
    pub feature_id: Uuid,
    pub is_active: bool,
    pub granted_by: Uuid,
    pub granted_utc: DateTime<Utc>,
}

impl From<AdminFeatureGrant> for GrantResponse {
    fn from(grant: AdminFeatureGrant) -> Self {
        Self {
            admin_id: grant.admin_id,
            feature_id: grant.feature_id,
            is_active: grant.is_active,
            granted_by: grant.granted_by,
            granted_utc: grant.granted_utc,
        }
    }
}
