use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::RngCore;
use redis::{aio::ConnectionManager, Client};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::config::RedisConfig;

/// Record behind an opaque session reference. Resolution re-reads the
/// identity row, so only the pointer is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpaqueSession {
    pub identity_id: Uuid,
    pub issued_utc: DateTime<Utc>,
}

/// Store for opaque session references.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn put(
        &self,
        sid: &str,
        session: &OpaqueSession,
        ttl_seconds: i64,
    ) -> Result<(), anyhow::Error>;
    async fn get(&self, sid: &str) -> Result<Option<OpaqueSession>, anyhow::Error>;
    async fn delete(&self, sid: &str) -> Result<(), anyhow::Error>;
    async fn health_check(&self) -> Result<(), anyhow::Error>;
}

/// Random 128-bit session reference, hex encoded.
pub fn generate_session_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[derive(Clone)]
pub struct RedisSessionStore {
    _client: Client,
    manager: ConnectionManager,
}

// Stalled store lookups must surface as faults, not hang the request.
const OP_TIMEOUT: Duration = Duration::from_secs(5);

impl RedisSessionStore {
    pub async fn new(config: &RedisConfig) -> Result<Self, anyhow::Error> {
        tracing::info!(url = %config.url, "Connecting to Redis");
        let client = Client::open(config.url.clone())?;

        // ConnectionManager reconnects automatically
        let manager = client.get_connection_manager().await.map_err(|e| {
            tracing::error!("Failed to get Redis connection manager: {}", e);
            anyhow::anyhow!("Failed to connect to Redis: {}", e)
        })?;

        tracing::info!("Successfully connected to Redis");

        Ok(Self {
            _client: client,
            manager,
        })
    }

    fn key(sid: &str) -> String {
        format!("session:{}", sid)
    }
}

async fn bounded<T>(
    fut: impl std::future::Future<Output = Result<T, redis::RedisError>>,
) -> Result<T, anyhow::Error> {
    match tokio::time::timeout(OP_TIMEOUT, fut).await {
        Ok(result) => result.map_err(|e| anyhow::anyhow!("Session store error: {}", e)),
        Err(_) => Err(anyhow::anyhow!("Session store operation timed out")),
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn put(
        &self,
        sid: &str,
        session: &OpaqueSession,
        ttl_seconds: i64,
    ) -> Result<(), anyhow::Error> {
        let payload = serde_json::to_string(session)
            .map_err(|e| anyhow::anyhow!("Failed to serialize session: {}", e))?;
        let mut conn = self.manager.clone();

        bounded(
            redis::cmd("SET")
                .arg(Self::key(sid))
                .arg(payload)
                .arg("EX")
                .arg(ttl_seconds)
                .query_async::<_, ()>(&mut conn),
        )
        .await
    }

    async fn get(&self, sid: &str) -> Result<Option<OpaqueSession>, anyhow::Error> {
        let mut conn = self.manager.clone();

        let payload: Option<String> =
            bounded(redis::cmd("GET").arg(Self::key(sid)).query_async(&mut conn)).await?;

        match payload {
            Some(payload) => {
                let session = serde_json::from_str(&payload)
                    .map_err(|e| anyhow::anyhow!("Malformed session record: {}", e))?;
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, sid: &str) -> Result<(), anyhow::Error> {
        let mut conn = self.manager.clone();
        bounded(
            redis::cmd("DEL")
                .arg(Self::key(sid))
                .query_async::<_, ()>(&mut conn),
        )
        .await
    }

    async fn health_check(&self) -> Result<(), anyhow::Error> {
        let mut conn = self.manager.clone();
        bounded(redis::cmd("PING").query_async::<_, ()>(&mut conn)).await
    }
}

/// In-memory store for tests.
#[derive(Default)]
pub struct MockSessionStore {
    pub sessions: std::sync::Mutex<std::collections::HashMap<String, OpaqueSession>>,
}

impl MockSessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MockSessionStore {
    async fn put(
        &self,
        sid: &str,
        session: &OpaqueSession,
        _ttl_seconds: i64,
    ) -> Result<(), anyhow::Error> {
        self.sessions
            .lock()
            .map_err(|e| anyhow::anyhow!("Mock store mutex poisoned: {}", e))?
            .insert(sid.to_string(), session.clone());
        Ok(())
    }

    async fn get(&self, sid: &str) -> Result<Option<OpaqueSession>, anyhow::Error> {
        let session = self
            .sessions
            .lock()
            .map_err(|e| anyhow::anyhow!("Mock store mutex poisoned: {}", e))?
            .get(sid)
            .cloned();
        Ok(session)
    }

    async fn delete(&self, sid: &str) -> Result<(), anyhow::Error> {
        self.sessions
            .lock()
            .map_err(|e| anyhow::anyhow!("Mock store mutex poisoned: {}", e))?
            .remove(sid);
        Ok(())
    }

    async fn health_check(&self) -> Result<(), anyhow::Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_store_round_trips_sessions() {
        let store = MockSessionStore::new();
        let sid = generate_session_id();
        let session = OpaqueSession {
            identity_id: Uuid::new_v4(),
            issued_utc: Utc::now(),
        };

        store.put(&sid, &session, 60).await.unwrap();
        assert_eq!(store.get(&sid).await.unwrap(), Some(session));

        store.delete(&sid).await.unwrap();
        assert_eq!(store.get(&sid).await.unwrap(), None);
    }

    #[tokio::test]
    async fn mock_store_delete_is_idempotent() {
        let store = MockSessionStore::new();
        store.delete("missing").await.unwrap();
        store.delete("missing").await.unwrap();
    }

    #[test]
    fn session_ids_are_distinct() {
        assert_ne!(generate_session_id(), generate_session_id());
        assert_eq!(generate_session_id().len(), 32);
    }
}
