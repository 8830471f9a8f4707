//! Reporting-period extraction from the free-text workbook header block.
//!
//! Source workbooks carry the reporting quarter as a sentence in the title
//! rows, e.g. `REKAPITULASI ... TRIWULAN KEDUA TAHUN 2024`. The quarter is
//! spelled as an ordinal word; year is a four-digit number.

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use crate::models::PeriodKey;

/// Failure modes of period extraction. Each reports distinctly so the caller
/// can tell a broken file from a reworded title.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("could not read the workbook header block: {0}")]
    HeaderUnreadable(String),
    #[error("no cell mentioning the reporting quarter was found in the header block")]
    MarkerNotFound,
    #[error("quarter/year format not recognized in '{text}'")]
    PatternMismatch { text: String },
    #[error("cannot convert ordinal '{word}' to a quarter number")]
    UnresolvedOrdinal { word: String },
}

/// Tokens that mark the title cell. Workbooks in the field use the Indonesian
/// form; English-labelled exports show up occasionally.
const MARKERS: [&str; 2] = ["TRIWULAN", "QUARTER"];

fn period_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // The `KE` prefix may be spelled as a separate word ("KE EMPAT").
        Regex::new(
            r"(?i)(?:TRIWULAN|QUARTER)\s+(?:KE[\s-]+)?([A-Za-z]+)\s+(?:TAHUN|YEAR)\s+([0-9]{4})",
        )
        .expect("period pattern is valid")
    })
}

/// Ordinal lexicon: cardinal and `ke-` honorific forms of one through four.
/// Exact lookup, not substring containment ("kedua" contains "dua").
fn ordinal_to_quarter(word: &str) -> Option<i32> {
    match word.to_lowercase().as_str() {
        "satu" | "kesatu" => Some(1),
        "dua" | "kedua" => Some(2),
        "tiga" | "ketiga" => Some(3),
        "empat" | "keempat" => Some(4),
        _ => None,
    }
}

/// Scan the header block for the quarter marker and parse the matching cell
/// into a structured period key. The title is kept verbatim (trimmed).
pub fn extract_period(header_cells: &[String]) -> Result<PeriodKey, ExtractionError> {
    let title = header_cells
        .iter()
        .map(|cell| cell.trim())
        .find(|cell| {
            let upper = cell.to_uppercase();
            MARKERS.iter().any(|marker| upper.contains(marker))
        })
        .ok_or(ExtractionError::MarkerNotFound)?
        .to_string();

    let caps = period_pattern()
        .captures(&title)
        .ok_or_else(|| ExtractionError::PatternMismatch {
            text: title.clone(),
        })?;

    let word = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
    let year: i32 = caps[2].parse().map_err(|_| ExtractionError::PatternMismatch {
        text: title.clone(),
    })?;
    let quarter = ordinal_to_quarter(word).ok_or_else(|| ExtractionError::UnresolvedOrdinal {
        word: word.to_string(),
    })?;

    Ok(PeriodKey {
        title,
        year,
        quarter,
    })
}
