use service_core::error::AppError;
use thiserror::Error;

/// Auth-core failure taxonomy. Verification and resolution failures are
/// returned as values; the HTTP boundary converts them to status codes via
/// the `AppError` mapping below.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Unknown identifier and deactivated account are deliberately one
    /// variant so callers cannot distinguish them.
    #[error("Account not found or inactive")]
    NotFoundOrInactive,

    #[error("Invalid credentials")]
    InvalidCredentials,

    /// A self-contained token that fails signature or expiry checks. The
    /// resolver treats this the same as an absent session.
    #[error("Expired or tampered token")]
    ExpiredOrTamperedToken,

    #[error("Admin profile not found")]
    AdminProfileNotFound,

    #[error("Feature not found")]
    FeatureNotFound,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Session store error: {0}")]
    SessionStore(anyhow::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFoundOrInactive => {
                AppError::NotFound(anyhow::anyhow!("Account not found or inactive"))
            }
            ServiceError::InvalidCredentials => {
                AppError::Unauthorized(anyhow::anyhow!("Invalid credentials"))
            }
            ServiceError::ExpiredOrTamperedToken => {
                AppError::Unauthorized(anyhow::anyhow!("Invalid or expired session"))
            }
            ServiceError::AdminProfileNotFound => {
                AppError::NotFound(anyhow::anyhow!("Admin profile not found"))
            }
            ServiceError::FeatureNotFound => {
                AppError::NotFound(anyhow::anyhow!("Feature not found"))
            }
            ServiceError::Database(e) => AppError::DatabaseError(e),
            ServiceError::SessionStore(e) => AppError::InternalError(e),
            ServiceError::Internal(e) => AppError::InternalError(e),
        }
    }
}
