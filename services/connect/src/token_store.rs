//! Server-side persistence of provider tokens
//!
//! Records are keyed by user and provider. Cookies remain the carrier the
//! browser uses; the store keeps a copy so server-side jobs can reach a
//! user's integrations and so disconnect can drop it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{cache::RedisPool, error::CacheError};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    str::FromStr,
    sync::Arc,
    time::{Duration, Instant},
};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

use crate::{
    config::ConfigError,
    oauth::TokenGrant,
    providers::{ProviderId, REFRESH_TOKEN_TTL},
};

/// Which backend holds persisted tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenStoreKind {
    #[default]
    Memory,
    Redis,
}

impl FromStr for TokenStoreKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "memory" => Ok(TokenStoreKind::Memory),
            "redis" => Ok(TokenStoreKind::Redis),
            other => Err(ConfigError::invalid(
                "TOKEN_STORE",
                format!("expected \"memory\" or \"redis\", got \"{}\"", other),
            )),
        }
    }
}

/// Persisted token pair of one user for one provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub provider: ProviderId,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub instance_url: Option<String>,
    /// Access-token lifetime in seconds
    pub expires_in: u64,
    pub stored_at: DateTime<Utc>,
}

impl TokenRecord {
    pub fn new(provider: ProviderId, grant: &TokenGrant, access_ttl: u64) -> Self {
        Self {
            provider,
            access_token: grant.access_token.clone(),
            refresh_token: grant.refresh_token.clone(),
            instance_url: grant.instance_url.clone(),
            expires_in: access_ttl,
            stored_at: Utc::now(),
        }
    }

    /// How long the record stays useful, in seconds
    pub fn retention(&self) -> u64 {
        if self.refresh_token.is_some() {
            REFRESH_TOKEN_TTL
        } else {
            self.expires_in
        }
    }
}

#[derive(Debug, Error)]
pub enum TokenStoreError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("stored token record is corrupt: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn save(&self, user_id: &str, record: &TokenRecord) -> Result<(), TokenStoreError>;

    async fn load(
        &self,
        user_id: &str,
        provider: ProviderId,
    ) -> Result<Option<TokenRecord>, TokenStoreError>;

    async fn remove(&self, user_id: &str, provider: ProviderId) -> Result<(), TokenStoreError>;
}

/// Tokens stored as JSON strings in Redis, expiring with the record
#[derive(Clone)]
pub struct RedisTokenStore {
    pool: RedisPool,
}

impl RedisTokenStore {
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    fn key(user_id: &str, provider: ProviderId) -> String {
        format!("integration_token:{}:{}", user_id, provider)
    }
}

#[async_trait]
impl TokenStore for RedisTokenStore {
    async fn save(&self, user_id: &str, record: &TokenRecord) -> Result<(), TokenStoreError> {
        info!("Persisting {} tokens for user: {}", record.provider, user_id);

        let value = serde_json::to_string(record)?;
        self.pool
            .set(
                &Self::key(user_id, record.provider),
                &value,
                Some(record.retention()),
            )
            .await?;

        Ok(())
    }

    async fn load(
        &self,
        user_id: &str,
        provider: ProviderId,
    ) -> Result<Option<TokenRecord>, TokenStoreError> {
        match self.pool.get(&Self::key(user_id, provider)).await? {
            Some(value) => Ok(Some(serde_json::from_str(&value)?)),
            None => Ok(None),
        }
    }

    async fn remove(&self, user_id: &str, provider: ProviderId) -> Result<(), TokenStoreError> {
        info!("Removing {} tokens for user: {}", provider, user_id);
        self.pool.delete(&Self::key(user_id, provider)).await?;
        Ok(())
    }
}

/// Process-local store with the same expiry behaviour
#[derive(Clone, Default)]
pub struct MemoryTokenStore {
    /// Deadline is `None` when the retention is beyond what `Instant` can hold
    entries: Arc<Mutex<HashMap<(String, ProviderId), (TokenRecord, Option<Instant>)>>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn save(&self, user_id: &str, record: &TokenRecord) -> Result<(), TokenStoreError> {
        let now = Instant::now();
        let deadline = now.checked_add(Duration::from_secs(record.retention()));

        let mut entries = self.entries.lock().await;
        // Only live records stay in the map.
        entries.retain(|_, (_, expires)| expires.is_none_or(|expires| now < expires));
        entries.insert(
            (user_id.to_string(), record.provider),
            (record.clone(), deadline),
        );
        Ok(())
    }

    async fn load(
        &self,
        user_id: &str,
        provider: ProviderId,
    ) -> Result<Option<TokenRecord>, TokenStoreError> {
        let mut entries = self.entries.lock().await;
        let key = (user_id.to_string(), provider);

        let expired = match entries.get(&key) {
            Some((_, deadline)) => deadline.is_some_and(|deadline| Instant::now() >= deadline),
            None => return Ok(None),
        };
        if expired {
            entries.remove(&key);
            return Ok(None);
        }

        Ok(entries.get(&key).map(|(record, _)| record.clone()))
    }

    async fn remove(&self, user_id: &str, provider: ProviderId) -> Result<(), TokenStoreError> {
        self.entries
            .lock()
            .await
            .remove(&(user_id.to_string(), provider));
        Ok(())
    }
}
