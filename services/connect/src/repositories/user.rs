//! User directory mirrored from the external auth service

use async_trait::async_trait;
use common::error::DatabaseError;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::Mutex;
use tracing::info;

/// Identity pushed by the client after sign-up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncedUser {
    pub id: String,
    pub email: String,
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Insert the user or update the email of an existing id
    async fn upsert(&self, user: &SyncedUser) -> Result<(), DatabaseError>;
}

/// User directory backed by the `users` table
#[derive(Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn upsert(&self, user: &SyncedUser) -> Result<(), DatabaseError> {
        info!("Syncing user: {}", user.id);

        sqlx::query(
            r#"
            INSERT INTO users (id, email)
            VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE
            SET email = EXCLUDED.email, updated_at = now()
            "#,
        )
        .bind(&user.id)
        .bind(&user.email)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        Ok(())
    }
}

/// In-process directory, used when no database is wired in
#[derive(Clone, Default)]
pub struct MemoryUserDirectory {
    users: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn email_of(&self, id: &str) -> Option<String> {
        self.users.lock().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.users.lock().await.len()
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn upsert(&self, user: &SyncedUser) -> Result<(), DatabaseError> {
        self.users
            .lock()
            .await
            .insert(user.id.clone(), user.email.clone());
        Ok(())
    }
}
