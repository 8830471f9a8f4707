//! Dedup-aware persistence of normalized fact rows.
//!
//! Deduplication is coarse: one period either has rows in a
//! relation or it does not. Each persist call runs the existence check and
//! the bulk append inside a single transaction, so a relation is written
//! all-or-nothing and a crashed import cannot strand a half-written relation
//! that would short-circuit the next attempt.

use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};
use thiserror::Error;

use crate::models::{BaselineRow, ModelADetailRow, ModelARecapRow, RegistrationRecapRow};

/// Storage failure while appending fact rows to one relation.
#[derive(Debug, Error)]
#[error("failed to persist {relation}: {source}")]
pub struct PersistenceError {
    pub relation: &'static str,
    #[source]
    pub source: sqlx::Error,
}

/// What the persister did for one relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    /// All rows appended.
    Inserted(usize),
    /// Rows already exist for this period; nothing written.
    SkippedExisting,
    /// The normalizer produced no rows; nothing written.
    NothingToInsert,
}

async fn period_has_rows(
    tx: &mut Transaction<'_, Sqlite>,
    table: &str,
    period_id: i64,
) -> sqlx::Result<bool> {
    let exists: i64 = sqlx::query_scalar(&format!(
        "SELECT EXISTS(SELECT 1 FROM {table} WHERE period_id = ?1)"
    ))
    .bind(period_id)
    .fetch_one(&mut **tx)
    .await?;
    Ok(exists != 0)
}

pub async fn insert_registration_recap(
    pool: &SqlitePool,
    period_id: i64,
    rows: &[RegistrationRecapRow],
) -> Result<PersistOutcome, PersistenceError> {
    let relation = "registration_recap";
    let result: sqlx::Result<PersistOutcome> = async {
        let mut tx = pool.begin().await?;
        if period_has_rows(&mut tx, relation, period_id).await? {
            tx.commit().await?;
            return Ok(PersistOutcome::SkippedExisting);
        }
        if rows.is_empty() {
            tx.commit().await?;
            return Ok(PersistOutcome::NothingToInsert);
        }
        let current_time = Utc::now().naive_utc();
        for row in rows {
            sqlx::query(
                "INSERT INTO registration_recap
                     (period_id, district, villages, male_voters, female_voters, remarks, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )
            .bind(period_id)
            .bind(&row.district)
            .bind(row.villages)
            .bind(row.male_voters)
            .bind(row.female_voters)
            .bind(&row.remarks)
            .bind(current_time)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(PersistOutcome::Inserted(rows.len()))
    }
    .await;

    result.map_err(|source| PersistenceError { relation, source })
}

pub async fn insert_baseline(
    pool: &SqlitePool,
    period_id: i64,
    rows: &[BaselineRow],
) -> Result<PersistOutcome, PersistenceError> {
    let relation = "prior_quarter_baseline";
    let result: sqlx::Result<PersistOutcome> = async {
        let mut tx = pool.begin().await?;
        if period_has_rows(&mut tx, relation, period_id).await? {
            tx.commit().await?;
            return Ok(PersistOutcome::SkippedExisting);
        }
        if rows.is_empty() {
            tx.commit().await?;
            return Ok(PersistOutcome::NothingToInsert);
        }
        let current_time = Utc::now().naive_utc();
        for row in rows {
            sqlx::query(
                "INSERT INTO prior_quarter_baseline
                     (period_id, district, polling_stations, male_voters, female_voters, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .bind(period_id)
            .bind(&row.district)
            .bind(row.polling_stations)
            .bind(row.male_voters)
            .bind(row.female_voters)
            .bind(current_time)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(PersistOutcome::Inserted(rows.len()))
    }
    .await;

    result.map_err(|source| PersistenceError { relation, source })
}

pub async fn insert_model_a_recap(
    pool: &SqlitePool,
    period_id: i64,
    rows: &[ModelARecapRow],
) -> Result<PersistOutcome, PersistenceError> {
    let relation = "model_a_recap";
    let result: sqlx::Result<PersistOutcome> = async {
        let mut tx = pool.begin().await?;
        if period_has_rows(&mut tx, relation, period_id).await? {
            tx.commit().await?;
            return Ok(PersistOutcome::SkippedExisting);
        }
        if rows.is_empty() {
            tx.commit().await?;
            return Ok(PersistOutcome::NothingToInsert);
        }
        let current_time = Utc::now().naive_utc();
        for row in rows {
            sqlx::query(
                "INSERT INTO model_a_recap
                     (period_id, district, villages, new_voters, disqualified, corrected, remarks,
                      created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )
            .bind(period_id)
            .bind(&row.district)
            .bind(row.villages)
            .bind(row.new_voters)
            .bind(row.disqualified)
            .bind(row.corrected)
            .bind(&row.remarks)
            .bind(current_time)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(PersistOutcome::Inserted(rows.len()))
    }
    .await;

    result.map_err(|source| PersistenceError { relation, source })
}

pub async fn insert_model_a_detail(
    pool: &SqlitePool,
    period_id: i64,
    rows: &[ModelADetailRow],
) -> Result<PersistOutcome, PersistenceError> {
    let relation = "model_a_detail";
    let result: sqlx::Result<PersistOutcome> = async {
        let mut tx = pool.begin().await?;
        if period_has_rows(&mut tx, relation, period_id).await? {
            tx.commit().await?;
            return Ok(PersistOutcome::SkippedExisting);
        }
        if rows.is_empty() {
            tx.commit().await?;
            return Ok(PersistOutcome::NothingToInsert);
        }
        let current_time = Utc::now().naive_utc();
        for row in rows {
            sqlx::query(
                "INSERT INTO model_a_detail
                     (period_id, district, new_male, new_female,
                      deceased_male, deceased_female, underage_male, underage_female,
                      duplicate_male, duplicate_female, moved_male, moved_female,
                      military_male, military_female, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            )
            .bind(period_id)
            .bind(&row.district)
            .bind(row.new_male)
            .bind(row.new_female)
            .bind(row.deceased_male)
            .bind(row.deceased_female)
            .bind(row.underage_male)
            .bind(row.underage_female)
            .bind(row.duplicate_male)
            .bind(row.duplicate_female)
            .bind(row.moved_male)
            .bind(row.moved_female)
            .bind(row.military_male)
            .bind(row.military_female)
            .bind(current_time)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(PersistOutcome::Inserted(rows.len()))
    }
    .await;

    result.map_err(|source| PersistenceError { relation, source })
}
