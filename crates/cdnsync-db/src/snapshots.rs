//! Database operations for the `cdn_snapshots` table.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `cdn_snapshots` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CdnSnapshotRow {
    pub id: i64,
    pub public_id: Uuid,
    pub cdn_slug: String,
    pub task_name: String,
    pub payload: Value,
    pub captured_at: DateTime<Utc>,
}

/// Insert one snapshot of a CDN's synced data and return the stored row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_cdn_snapshot(
    pool: &PgPool,
    cdn_slug: &str,
    task_name: &str,
    payload: &Value,
) -> Result<CdnSnapshotRow, DbError> {
    let row = sqlx::query_as::<_, CdnSnapshotRow>(
        "INSERT INTO cdn_snapshots (public_id, cdn_slug, task_name, payload) \
         VALUES ($1, $2, $3, $4) \
         RETURNING id, public_id, cdn_slug, task_name, payload, captured_at",
    )
    .bind(Uuid::new_v4())
    .bind(cdn_slug)
    .bind(task_name)
    .bind(payload)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Newest snapshot for a CDN.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the CDN has no snapshots yet, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn latest_cdn_snapshot(pool: &PgPool, cdn_slug: &str) -> Result<CdnSnapshotRow, DbError> {
    sqlx::query_as::<_, CdnSnapshotRow>(
        "SELECT id, public_id, cdn_slug, task_name, payload, captured_at \
         FROM cdn_snapshots \
         WHERE cdn_slug = $1 \
         ORDER BY captured_at DESC, id DESC \
         LIMIT 1",
    )
    .bind(cdn_slug)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// The most recent `limit` snapshots for a CDN, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_cdn_snapshots(
    pool: &PgPool,
    cdn_slug: &str,
    limit: i64,
) -> Result<Vec<CdnSnapshotRow>, DbError> {
    let rows = sqlx::query_as::<_, CdnSnapshotRow>(
        "SELECT id, public_id, cdn_slug, task_name, payload, captured_at \
         FROM cdn_snapshots \
         WHERE cdn_slug = $1 \
         ORDER BY captured_at DESC, id DESC \
         LIMIT $2",
    )
    .bind(cdn_slug)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
