//! Read interface consumed by the dashboard: period listing, the canonical
//! per-period field sets, and the aggregate summary (totals, deltas vs. the
//! prior-quarter baseline, disqualification breakdown).

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

use crate::database::periods;
use crate::models::{
    BaselineRow, ModelADetailRow, ModelARecapRow, Period, RegistrationRecapRow,
};

/// Stored periods, newest first.
pub async fn list_periods(pool: &SqlitePool) -> Result<Vec<Period>> {
    let rows = sqlx::query(
        "SELECT id, title, year, quarter FROM periods ORDER BY year DESC, quarter DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| Period {
            id: row.get("id"),
            title: row.get("title"),
            year: row.get("year"),
            quarter: row.get("quarter"),
        })
        .collect())
}

pub async fn registration_recap(
    pool: &SqlitePool,
    period_id: i64,
) -> Result<Vec<RegistrationRecapRow>> {
    let rows = sqlx::query(
        "SELECT district, villages, male_voters, female_voters, remarks
         FROM registration_recap WHERE period_id = ?1 ORDER BY id",
    )
    .bind(period_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| RegistrationRecapRow {
            district: row.get("district"),
            villages: row.get("villages"),
            male_voters: row.get("male_voters"),
            female_voters: row.get("female_voters"),
            remarks: row.get("remarks"),
        })
        .collect())
}

pub async fn prior_quarter_baseline(
    pool: &SqlitePool,
    period_id: i64,
) -> Result<Vec<BaselineRow>> {
    let rows = sqlx::query(
        "SELECT district, polling_stations, male_voters, female_voters
         FROM prior_quarter_baseline WHERE period_id = ?1 ORDER BY id",
    )
    .bind(period_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| BaselineRow {
            district: row.get("district"),
            polling_stations: row.get("polling_stations"),
            male_voters: row.get("male_voters"),
            female_voters: row.get("female_voters"),
        })
        .collect())
}

pub async fn model_a_recap(pool: &SqlitePool, period_id: i64) -> Result<Vec<ModelARecapRow>> {
    let rows = sqlx::query(
        "SELECT district, villages, new_voters, disqualified, corrected, remarks
         FROM model_a_recap WHERE period_id = ?1 ORDER BY id",
    )
    .bind(period_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| ModelARecapRow {
            district: row.get("district"),
            villages: row.get("villages"),
            new_voters: row.get("new_voters"),
            disqualified: row.get("disqualified"),
            corrected: row.get("corrected"),
            remarks: row.get("remarks"),
        })
        .collect())
}

pub async fn model_a_detail(pool: &SqlitePool, period_id: i64) -> Result<Vec<ModelADetailRow>> {
    let rows = sqlx::query(
        "SELECT district, new_male, new_female,
                deceased_male, deceased_female, underage_male, underage_female,
                duplicate_male, duplicate_female, moved_male, moved_female,
                military_male, military_female
         FROM model_a_detail WHERE period_id = ?1 ORDER BY id",
    )
    .bind(period_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| ModelADetailRow {
            district: row.get("district"),
            new_male: row.get("new_male"),
            new_female: row.get("new_female"),
            deceased_male: row.get("deceased_male"),
            deceased_female: row.get("deceased_female"),
            underage_male: row.get("underage_male"),
            underage_female: row.get("underage_female"),
            duplicate_male: row.get("duplicate_male"),
            duplicate_female: row.get("duplicate_female"),
            moved_male: row.get("moved_male"),
            moved_female: row.get("moved_female"),
            military_male: row.get("military_male"),
            military_female: row.get("military_female"),
        })
        .collect())
}

/// Disqualification counts summed over all districts, by reason.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisqualificationBreakdown {
    pub deceased: i64,
    pub underage: i64,
    pub duplicate: i64,
    pub moved_away: i64,
    pub military: i64,
    pub total: i64,
}

/// Aggregates for one period, as the dashboard displays them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub period: Period,
    pub districts: i64,
    pub villages: i64,
    pub polling_stations: i64,
    pub male_voters: i64,
    pub female_voters: i64,
    pub total_voters: i64,
    pub baseline_male: i64,
    pub baseline_female: i64,
    pub baseline_total: i64,
    pub male_delta: i64,
    pub female_delta: i64,
    pub total_delta: i64,
    pub new_voters: i64,
    pub corrected_records: i64,
    pub disqualified: DisqualificationBreakdown,
}

/// Compute the aggregate summary for one stored period.
pub async fn dashboard_summary(pool: &SqlitePool, period_id: i64) -> Result<DashboardSummary> {
    let Some(period) = periods::period_by_id(pool, period_id).await? else {
        bail!("no stored period with id {}", period_id);
    };

    let recap = sqlx::query(
        "SELECT COUNT(*) AS districts,
                COALESCE(SUM(villages), 0) AS villages,
                COALESCE(SUM(male_voters), 0) AS male_voters,
                COALESCE(SUM(female_voters), 0) AS female_voters
         FROM registration_recap WHERE period_id = ?1",
    )
    .bind(period_id)
    .fetch_one(pool)
    .await?;

    let baseline = sqlx::query(
        "SELECT COALESCE(SUM(polling_stations), 0) AS polling_stations,
                COALESCE(SUM(male_voters), 0) AS male_voters,
                COALESCE(SUM(female_voters), 0) AS female_voters
         FROM prior_quarter_baseline WHERE period_id = ?1",
    )
    .bind(period_id)
    .fetch_one(pool)
    .await?;

    let model_a = sqlx::query(
        "SELECT COALESCE(SUM(new_voters), 0) AS new_voters,
                COALESCE(SUM(corrected), 0) AS corrected
         FROM model_a_recap WHERE period_id = ?1",
    )
    .bind(period_id)
    .fetch_one(pool)
    .await?;

    let detail = sqlx::query(
        "SELECT COALESCE(SUM(deceased_male), 0) + COALESCE(SUM(deceased_female), 0) AS deceased,
                COALESCE(SUM(underage_male), 0) + COALESCE(SUM(underage_female), 0) AS underage,
                COALESCE(SUM(duplicate_male), 0) + COALESCE(SUM(duplicate_female), 0) AS duplicate,
                COALESCE(SUM(moved_male), 0) + COALESCE(SUM(moved_female), 0) AS moved_away,
                COALESCE(SUM(military_male), 0) + COALESCE(SUM(military_female), 0) AS military
         FROM model_a_detail WHERE period_id = ?1",
    )
    .bind(period_id)
    .fetch_one(pool)
    .await?;

    let male_voters: i64 = recap.get("male_voters");
    let female_voters: i64 = recap.get("female_voters");
    let baseline_male: i64 = baseline.get("male_voters");
    let baseline_female: i64 = baseline.get("female_voters");

    let deceased: i64 = detail.get("deceased");
    let underage: i64 = detail.get("underage");
    let duplicate: i64 = detail.get("duplicate");
    let moved_away: i64 = detail.get("moved_away");
    let military: i64 = detail.get("military");

    Ok(DashboardSummary {
        period,
        districts: recap.get("districts"),
        villages: recap.get("villages"),
        polling_stations: baseline.get("polling_stations"),
        male_voters,
        female_voters,
        total_voters: male_voters + female_voters,
        baseline_male,
        baseline_female,
        baseline_total: baseline_male + baseline_female,
        male_delta: male_voters - baseline_male,
        female_delta: female_voters - baseline_female,
        total_delta: (male_voters + female_voters) - (baseline_male + baseline_female),
        new_voters: model_a.get("new_voters"),
        corrected_records: model_a.get("corrected"),
        disqualified: DisqualificationBreakdown {
            deceased,
            underage,
            duplicate,
            moved_away,
            military,
            total: deceased + underage + duplicate + moved_away + military,
        },
    })
}
