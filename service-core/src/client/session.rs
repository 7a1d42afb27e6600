//! HTTP client for the auth service's session endpoints, plus the
//! process-local cached view of the resolved identity that frontends keep
//! per browser session.

use anyhow::Result;
use reqwest::{Client, header};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use std::time::Duration;
use uuid::Uuid;

/// Resolved identity as returned by `GET /auth/session`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionUser {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: String,
}

#[derive(Debug, Deserialize)]
struct SessionEnvelope {
    user: Option<SessionUser>,
}

pub struct SessionClient {
    http: Client,
    base_url: String,
}

impl SessionClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Ask the auth service who the presented cookies belong to.
    ///
    /// `cookie_header` is the inbound request's `Cookie` header, passed
    /// through verbatim so both credential carriers reach the resolver.
    pub async fn fetch_session(&self, cookie_header: &str) -> Result<Option<SessionUser>> {
        let url = format!("{}/auth/session", self.base_url);

        let response = self
            .http
            .get(&url)
            .header(header::COOKIE, cookie_header)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to query session at {}: {}", url, e);
                anyhow::anyhow!("Session query failed: {}", e)
            })?
            .error_for_status()
            .map_err(|e| anyhow::anyhow!("Session query failed: {}", e))?;

        let envelope: SessionEnvelope = response
            .json()
            .await
            .map_err(|e| anyhow::anyhow!("Malformed session response: {}", e))?;

        Ok(envelope.user)
    }

    /// Invalidate the session server-side (cookie clearing happens in the
    /// auth service's response; callers must forward its `Set-Cookie`s).
    pub async fn sign_out(&self, cookie_header: &str) -> Result<()> {
        let url = format!("{}/auth/logout", self.base_url);

        self.http
            .post(&url)
            .header(header::COOKIE, cookie_header)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to sign out at {}: {}", url, e);
                anyhow::anyhow!("Sign-out failed: {}", e)
            })?
            .error_for_status()
            .map_err(|e| anyhow::anyhow!("Sign-out failed: {}", e))?;

        Ok(())
    }
}

/// Process-local cache of the resolved identity.
///
/// The cache never refetches on its own: callers read with [`get`], refetch
/// explicitly with [`refresh`], and drop the cached view with [`clear`]
/// after sign-out.
///
/// [`get`]: SessionCache::get
/// [`refresh`]: SessionCache::refresh
/// [`clear`]: SessionCache::clear
#[derive(Default)]
pub struct SessionCache {
    current: RwLock<Option<SessionUser>>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<SessionUser> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Refetch the session from the auth service and replace the cached view.
    pub async fn refresh(
        &self,
        client: &SessionClient,
        cookie_header: &str,
    ) -> Result<Option<SessionUser>> {
        let user = client.fetch_session(cookie_header).await?;
        *self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = user.clone();
        Ok(user)
    }

    pub fn clear(&self) {
        self.current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> SessionUser {
        SessionUser {
            id: Uuid::new_v4(),
            email: "doc@x.com".to_string(),
            name: Some("Dr. Example".to_string()),
            role: "DOCTOR".to_string(),
        }
    }

    #[test]
    fn cache_starts_empty() {
        let cache = SessionCache::new();
        assert_eq!(cache.get(), None);
    }

    #[test]
    fn clear_drops_cached_view() {
        let cache = SessionCache::new();
        *cache.current.write().unwrap() = Some(sample_user());
        assert!(cache.get().is_some());

        cache.clear();
        assert_eq!(cache.get(), None);
    }

    #[test]
    fn clear_is_idempotent() {
        let cache = SessionCache::new();
        cache.clear();
        cache.clear();
        assert_eq!(cache.get(), None);
    }

    #[test]
    fn session_envelope_decodes_null_user() {
        let envelope: SessionEnvelope = serde_json::from_str(r#"{"user":null}"#).unwrap();
        assert!(envelope.user.is_none());
    }
}
