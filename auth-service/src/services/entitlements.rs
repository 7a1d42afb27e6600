use sqlx::PgPool;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::models::{
    AdminFeatureGrant, AdminProfile, Feature, PlanFeature, ResolvedIdentity, Role,
    SubscriptionPlan,
};
use crate::services::ServiceError;

#[derive(Clone)]
pub struct EntitlementService {
    db: PgPool,
}

impl EntitlementService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Effective feature set for an admin-tier identity.
    ///
    /// SuperAdmin is implicitly entitled to the whole active catalog and
    /// short-circuits without walking any relation. Admin entitlements are
    /// the union of direct grants and plan-derived features, computed by
    /// [`resolve_entitlements`].
    pub async fn effective_features(
        &self,
        identity: &ResolvedIdentity,
    ) -> Result<Vec<Feature>, ServiceError> {
        if identity.role == Role::SuperAdmin {
            return self.all_active_features().await;
        }

        let profile = self
            .admin_profile_for(identity.id)
            .await?
            .ok_or(ServiceError::AdminProfileNotFound)?;

        let grants = self.grants_for(profile.admin_id).await?;
        let plans = self.plans_for(profile.admin_id).await?;

        let plan_ids: Vec<Uuid> = plans.iter().map(|p| p.plan_id).collect();
        let links = self.plan_links(&plan_ids).await?;

        let mut feature_ids: Vec<Uuid> = grants
            .iter()
            .map(|g| g.feature_id)
            .chain(links.iter().map(|l| l.feature_id))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        feature_ids.sort_unstable();

        let features = self.features_by_ids(&feature_ids).await?;

        Ok(resolve_entitlements(&grants, &plans, &links, &features))
    }

    /// Upsert a direct feature grant, keyed on `(admin_id, feature_id)`.
    ///
    /// Concurrent attempts for the same pair converge to one row;
    /// last-writer-wins on `is_active`/`granted_by`.
    pub async fn upsert_grant(
        &self,
        admin_id: Uuid,
        feature_id: Uuid,
        is_active: bool,
        granted_by: Uuid,
    ) -> Result<AdminFeatureGrant, ServiceError> {
        self.require_admin_profile(admin_id).await?;
        self.require_feature(feature_id).await?;

        let grant = sqlx::query_as::<_, AdminFeatureGrant>(
            "INSERT INTO admin_feature_grants (admin_id, feature_id, is_active, granted_by, granted_utc) \
             VALUES ($1, $2, $3, $4, now()) \
             ON CONFLICT (admin_id, feature_id) DO UPDATE \
             SET is_active = EXCLUDED.is_active, granted_by = EXCLUDED.granted_by, granted_utc = EXCLUDED.granted_utc \
             RETURNING admin_id, feature_id, is_active, granted_by, granted_utc",
        )
        .bind(admin_id)
        .bind(feature_id)
        .bind(is_active)
        .bind(granted_by)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(
            admin_id = %admin_id,
            feature_id = %feature_id,
            is_active = is_active,
            "Feature grant upserted"
        );

        Ok(grant)
    }

    async fn admin_profile_for(
        &self,
        identity_id: Uuid,
    ) -> Result<Option<AdminProfile>, ServiceError> {
        let profile = sqlx::query_as::<_, AdminProfile>(
            "SELECT admin_id, identity_id, created_by, permission_notes, created_utc \
             FROM admin_profiles WHERE identity_id = $1",
        )
        .bind(identity_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(profile)
    }

    async fn require_admin_profile(&self, admin_id: Uuid) -> Result<(), ServiceError> {
        let exists = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM admin_profiles WHERE admin_id = $1",
        )
        .bind(admin_id)
        .fetch_one(&self.db)
        .await?;

        if exists == 0 {
            return Err(ServiceError::AdminProfileNotFound);
        }
        Ok(())
    }

    async fn require_feature(&self, feature_id: Uuid) -> Result<(), ServiceError> {
        let exists =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM features WHERE feature_id = $1")
                .bind(feature_id)
                .fetch_one(&self.db)
                .await?;

        if exists == 0 {
            return Err(ServiceError::FeatureNotFound);
        }
        Ok(())
    }

    async fn grants_for(&self, admin_id: Uuid) -> Result<Vec<AdminFeatureGrant>, ServiceError> {
        let grants = sqlx::query_as::<_, AdminFeatureGrant>(
            "SELECT admin_id, feature_id, is_active, granted_by, granted_utc \
             FROM admin_feature_grants WHERE admin_id = $1",
        )
        .bind(admin_id)
        .fetch_all(&self.db)
        .await?;

        Ok(grants)
    }

    /// Plans owned by the admin plus global plans (`admin_id IS NULL`).
    async fn plans_for(&self, admin_id: Uuid) -> Result<Vec<SubscriptionPlan>, ServiceError> {
        let plans = sqlx::query_as::<_, SubscriptionPlan>(
            "SELECT plan_id, admin_id, plan_name, is_active, created_utc \
             FROM subscription_plans WHERE admin_id = $1 OR admin_id IS NULL",
        )
        .bind(admin_id)
        .fetch_all(&self.db)
        .await?;

        Ok(plans)
    }

    async fn plan_links(&self, plan_ids: &[Uuid]) -> Result<Vec<PlanFeature>, ServiceError> {
        if plan_ids.is_empty() {
            return Ok(Vec::new());
        }

        let links = sqlx::query_as::<_, PlanFeature>(
            "SELECT plan_id, feature_id FROM plan_features WHERE plan_id = ANY($1)",
        )
        .bind(plan_ids)
        .fetch_all(&self.db)
        .await?;

        Ok(links)
    }

    async fn features_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Feature>, ServiceError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let features = sqlx::query_as::<_, Feature>(
            "SELECT feature_id, feature_name, category, is_active, created_utc \
             FROM features WHERE feature_id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.db)
        .await?;

        Ok(features)
    }

    async fn all_active_features(&self) -> Result<Vec<Feature>, ServiceError> {
        let features = sqlx::query_as::<_, Feature>(
            "SELECT feature_id, feature_name, category, is_active, created_utc \
             FROM features WHERE is_active = TRUE ORDER BY feature_name",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(features)
    }
}

/// Compute the effective entitlement set from loaded relation rows.
///
/// A feature is entitled when it is active in the catalog AND reachable
/// through an active direct grant or an active plan; the two paths are
/// unioned and deduplicated by feature id, direct grants first.
pub fn resolve_entitlements(
    grants: &[AdminFeatureGrant],
    plans: &[SubscriptionPlan],
    plan_links: &[PlanFeature],
    features: &[Feature],
) -> Vec<Feature> {
    let catalog: HashMap<Uuid, &Feature> = features
        .iter()
        .filter(|f| f.is_active)
        .map(|f| (f.feature_id, f))
        .collect();

    let active_plans: HashSet<Uuid> = plans
        .iter()
        .filter(|p| p.is_active)
        .map(|p| p.plan_id)
        .collect();

    let mut seen = HashSet::new();
    let mut effective = Vec::new();

    for grant in grants.iter().filter(|g| g.is_active) {
        if let Some(feature) = catalog.get(&grant.feature_id) {
            if seen.insert(feature.feature_id) {
                effective.push((*feature).clone());
            }
        }
    }

    for link in plan_links
        .iter()
        .filter(|l| active_plans.contains(&l.plan_id))
    {
        if let Some(feature) = catalog.get(&link.feature_id) {
            if seen.insert(feature.feature_id) {
                effective.push((*feature).clone());
            }
        }
    }

    effective
}
