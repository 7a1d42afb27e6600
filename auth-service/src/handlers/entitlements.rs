use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use service_core::error::AppError;

use crate::{
    dtos::entitlements::{EntitlementsResponse, GrantResponse, UpsertGrantRequest},
    middleware::CurrentIdentity,
    utils::ValidatedJson,
    AppState,
};

/// Effective features for the authenticated admin-tier identity
#[utoipa::path(
    get,
    path = "/auth/entitlements",
    responses(
        (status = 200, description = "Effective feature set", body = EntitlementsResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Role not accepted", body = ErrorResponse),
        (status = 404, description = "Admin profile not found", body = ErrorResponse)
    ),
    tag = "Entitlements"
)]
pub async fn get_entitlements(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
) -> Result<impl IntoResponse, AppError> {
    let features = state.entitlements.effective_features(&identity).await?;

    Ok(Json(EntitlementsResponse {
        features: features.into_iter().map(Into::into).collect(),
    }))
}

/// Upsert a direct feature grant for an admin
#[utoipa::path(
    post,
    path = "/auth/admin/grants",
    request_body = UpsertGrantRequest,
    responses(
        (status = 200, description = "Grant upserted", body = GrantResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Role not accepted", body = ErrorResponse),
        (status = 404, description = "Unknown admin or feature", body = ErrorResponse)
    ),
    tag = "Entitlements"
)]
pub async fn upsert_grant(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    ValidatedJson(req): ValidatedJson<UpsertGrantRequest>,
) -> Result<impl IntoResponse, AppError> {
    let grant = state
        .entitlements
        .upsert_grant(req.admin_id, req.feature_id, req.is_active, identity.id)
        .await?;

    Ok((StatusCode::OK, Json(GrantResponse::from(grant))))
}
