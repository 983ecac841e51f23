//! Destination store: named document collections plus run bookkeeping.

use std::marker::PhantomData;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use sqlx::Row;
use tracing::{debug, instrument};

use crate::db::Pool;
use crate::model::{DataProvider, HarvestInfo, RunStatus};

/// A record that lives in a named collection, keyed by its own id.
pub trait Document: Serialize + Send + Sync {
    const COLLECTION: &'static str;

    fn document_id(&self) -> i64;
}

#[async_trait]
pub trait DestinationStore<T: Send + Sync>: Send + Sync {
    async fn delete_collection(&self) -> Result<()>;

    async fn add_collection(&self) -> Result<()>;

    /// Write a batch and return how many documents were written.
    async fn add_many(&self, items: &[T]) -> Result<usize>;
}

/// SQLite-backed collection storing each document as a JSON body.
pub struct SqliteCollection<T> {
    pool: Pool,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for SqliteCollection<T> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Document> SqliteCollection<T> {
    pub fn new(pool: Pool) -> Self {
        Self {
            pool,
            _marker: PhantomData,
        }
    }

    pub async fn exists(&self) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM collections WHERE name = ?")
            .bind(T::COLLECTION)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE collection = ?")
            .bind(T::COLLECTION)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Stored JSON body of one document.
    pub async fn get(&self, id: i64) -> Result<Option<serde_json::Value>> {
        let row = sqlx::query("SELECT body FROM documents WHERE collection = ? AND id = ?")
            .bind(T::COLLECTION)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => {
                let body: String = row.try_get("body")?;
                let value = serde_json::from_str(&body)
                    .with_context(|| format!("corrupt document {}/{}", T::COLLECTION, id))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl<T: Document + 'static> DestinationStore<T> for SqliteCollection<T> {
    #[instrument(skip_all, fields(collection = T::COLLECTION))]
    async fn delete_collection(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM documents WHERE collection = ?")
            .bind(T::COLLECTION)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM collections WHERE name = ?")
            .bind(T::COLLECTION)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip_all, fields(collection = T::COLLECTION))]
    async fn add_collection(&self) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO collections (name, created_at) VALUES (?, ?)")
            .bind(T::COLLECTION)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[instrument(skip_all, fields(collection = T::COLLECTION, items = items.len()))]
    async fn add_many(&self, items: &[T]) -> Result<usize> {
        if items.is_empty() {
            return Ok(0);
        }
        let mut tx = self.pool.begin().await?;
        for item in items {
            let body = serde_json::to_string(item).with_context(|| {
                format!("failed to serialize {}/{}", T::COLLECTION, item.document_id())
            })?;
            sqlx::query(
                "INSERT INTO documents (collection, id, body) VALUES (?, ?, ?)
                 ON CONFLICT(collection, id) DO UPDATE SET body = excluded.body",
            )
            .bind(T::COLLECTION)
            .bind(item.document_id())
            .bind(body)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        debug!("batch written");
        Ok(items.len())
    }
}

/// Record a finished run, replacing any earlier run with the same id.
#[instrument(skip_all, fields(id = %info.id))]
pub async fn save_harvest_info(pool: &Pool, info: &HarvestInfo) -> Result<()> {
    sqlx::query(
        "INSERT INTO harvest_info (id, data_provider, started_at, ended_at, status, count)
         VALUES (?, ?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
            data_provider = excluded.data_provider,
            started_at = excluded.started_at,
            ended_at = excluded.ended_at,
            status = excluded.status,
            count = excluded.count",
    )
    .bind(&info.id)
    .bind(info.data_provider.as_str())
    .bind(info.start)
    .bind(info.end)
    .bind(info.status.map(|s| s.as_str()))
    .bind(info.count as i64)
    .execute(pool)
    .await
    .context("failed to save harvest info")?;
    Ok(())
}

pub async fn get_harvest_info(pool: &Pool, id: &str) -> Result<Option<HarvestInfo>> {
    let row = sqlx::query(
        "SELECT id, data_provider, started_at, ended_at, status, count FROM harvest_info WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    let Some(row) = row else {
        return Ok(None);
    };

    let provider: String = row.try_get("data_provider")?;
    let status: Option<String> = row.try_get("status")?;
    let count: i64 = row.try_get("count")?;
    Ok(Some(HarvestInfo {
        id: row.try_get("id")?,
        data_provider: DataProvider::parse_provider(&provider)
            .with_context(|| format!("unknown data provider {}", provider))?,
        start: row.try_get("started_at")?,
        end: row.try_get("ended_at")?,
        status: status.as_deref().and_then(RunStatus::parse_status),
        count: usize::try_from(count).unwrap_or_default(),
    }))
}
