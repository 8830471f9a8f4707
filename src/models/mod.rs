use serde::{Deserialize, Serialize};

/// Structured reporting-period key extracted from a workbook header block.
///
/// `title` keeps the header text verbatim; periods are matched on the full
/// `(year, quarter, title)` triple, so a reworded title for the same quarter
/// registers as a separate period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodKey {
    pub title: String,
    pub year: i32,
    pub quarter: i32,
}

/// A reporting period as stored, with its assigned identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub id: i64,
    pub title: String,
    pub year: i32,
    pub quarter: i32,
}

/// One district row of the registration recap sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRecapRow {
    pub district: String,
    pub villages: Option<i64>,
    pub male_voters: Option<i64>,
    pub female_voters: Option<i64>,
    pub remarks: Option<String>,
}

/// One district row of the prior-quarter closing snapshot, re-entered in the
/// current workbook for delta computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineRow {
    pub district: String,
    pub polling_stations: Option<i64>,
    pub male_voters: Option<i64>,
    pub female_voters: Option<i64>,
}

/// One district row of the Model-A recap sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelARecapRow {
    pub district: String,
    pub villages: Option<i64>,
    pub new_voters: Option<i64>,
    pub disqualified: Option<i64>,
    pub corrected: Option<i64>,
    pub remarks: Option<String>,
}

/// One district row of the Model-A disaggregated detail sheet: new voters and
/// disqualification counts broken out by reason, each split by sex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelADetailRow {
    pub district: String,
    pub new_male: Option<i64>,
    pub new_female: Option<i64>,
    pub deceased_male: Option<i64>,
    pub deceased_female: Option<i64>,
    pub underage_male: Option<i64>,
    pub underage_female: Option<i64>,
    pub duplicate_male: Option<i64>,
    pub duplicate_female: Option<i64>,
    pub moved_male: Option<i64>,
    pub moved_female: Option<i64>,
    pub military_male: Option<i64>,
    pub military_female: Option<i64>,
}

/// Configuration for the application.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        Ok(Config {
            database_path: std::env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "db/voter_rolls.db".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        std::env::remove_var("DATABASE_PATH");
        let config = Config::from_env().unwrap();
        assert_eq!(config.database_path, "db/voter_rolls.db");
    }
}
