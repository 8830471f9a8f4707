//! Period registry: resolve a structured period key to its stable identifier.

use sqlx::{Row, SqlitePool};
use thiserror::Error;

use crate::models::{Period, PeriodKey};

/// Storage failure while resolving or creating a reporting period.
#[derive(Debug, Error)]
#[error("failed to resolve reporting period: {0}")]
pub struct RegistryError(#[from] sqlx::Error);

/// Look up the period matching `key` on all three fields, creating it if
/// absent, and return its identifier.
///
/// One conflict-aware statement against the UNIQUE(year, quarter, title)
/// index, so concurrent uploads of the same workbook cannot race a duplicate
/// period row into existence. The DO UPDATE arm rewrites the title with
/// itself, which makes RETURNING yield the existing id on conflict.
pub async fn resolve_period_id(pool: &SqlitePool, key: &PeriodKey) -> Result<i64, RegistryError> {
    let row = sqlx::query(
        r#"
        INSERT INTO periods (title, year, quarter)
        VALUES (?1, ?2, ?3)
        ON CONFLICT(year, quarter, title) DO UPDATE SET title = excluded.title
        RETURNING id
        "#,
    )
    .bind(&key.title)
    .bind(key.year)
    .bind(key.quarter)
    .fetch_one(pool)
    .await?;

    Ok(row.get::<i64, _>("id"))
}

/// Fetch one stored period by identifier.
pub async fn period_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Period>, RegistryError> {
    let row = sqlx::query("SELECT id, title, year, quarter FROM periods WHERE id = ?1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|row| Period {
        id: row.get("id"),
        title: row.get("title"),
        year: row.get("year"),
        quarter: row.get("quarter"),
    }))
}
