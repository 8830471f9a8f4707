use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

/// Open (and create if missing) the SQLite database at `database_path`.
pub async fn connect(database_path: &str) -> Result<SqlitePool> {
    if let Some(parent) = Path::new(database_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(30))
        .connect_with(
            SqliteConnectOptions::new()
                .filename(database_path)
                .create_if_missing(true),
        )
        .await?;

    // WAL mode for readers (the dashboard) while an import is writing
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
    sqlx::query("PRAGMA synchronous = NORMAL").execute(&pool).await?;

    Ok(pool)
}

/// Create the period and fact tables if they do not exist yet.
///
/// `periods` is unique over the full (year, quarter, title) triple: lookups
/// match all three fields, so a reworded title for the same quarter is a
/// distinct period. Fact tables reference their period and are indexed by it
/// for the existence checks and the dashboard reads.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS periods (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            year INTEGER NOT NULL,
            quarter INTEGER NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            UNIQUE(year, quarter, title)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS registration_recap (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            period_id INTEGER NOT NULL REFERENCES periods(id),
            district TEXT NOT NULL,
            villages INTEGER,
            male_voters INTEGER,
            female_voters INTEGER,
            remarks TEXT,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS prior_quarter_baseline (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            period_id INTEGER NOT NULL REFERENCES periods(id),
            district TEXT NOT NULL,
            polling_stations INTEGER,
            male_voters INTEGER,
            female_voters INTEGER,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS model_a_recap (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            period_id INTEGER NOT NULL REFERENCES periods(id),
            district TEXT NOT NULL,
            villages INTEGER,
            new_voters INTEGER,
            disqualified INTEGER,
            corrected INTEGER,
            remarks TEXT,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS model_a_detail (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            period_id INTEGER NOT NULL REFERENCES periods(id),
            district TEXT NOT NULL,
            new_male INTEGER,
            new_female INTEGER,
            deceased_male INTEGER,
            deceased_female INTEGER,
            underage_male INTEGER,
            underage_female INTEGER,
            duplicate_male INTEGER,
            duplicate_female INTEGER,
            moved_male INTEGER,
            moved_female INTEGER,
            military_male INTEGER,
            military_female INTEGER,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    let indexes = [
        "CREATE INDEX IF NOT EXISTS idx_registration_recap_period ON registration_recap(period_id)",
        "CREATE INDEX IF NOT EXISTS idx_prior_quarter_baseline_period ON prior_quarter_baseline(period_id)",
        "CREATE INDEX IF NOT EXISTS idx_model_a_recap_period ON model_a_recap(period_id)",
        "CREATE INDEX IF NOT EXISTS idx_model_a_detail_period ON model_a_detail(period_id)",
    ];
    for index_sql in indexes {
        sqlx::query(index_sql).execute(pool).await?;
    }

    Ok(())
}
