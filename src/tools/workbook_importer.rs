//! Workbook import pipeline: extract the period, register it, normalize the
//! four source sheets and persist each relation with dedup.
//!
//! One linear pass per uploaded workbook. Period extraction or registry
//! failure aborts before any fact write; everything after that is reported
//! per relation, so one missing sheet does not block the other three.

use std::path::Path;

use sqlx::SqlitePool;
use thiserror::Error;
use tracing::warn;

use crate::database::{facts, periods, PersistOutcome, PersistenceError, RegistryError};
use crate::extractors::period::{extract_period, ExtractionError};
use crate::extractors::sheet::{self, RawTable, SheetError};
use crate::models::Period;
use crate::normalize;

/// Sheet whose title block carries the reporting-period metadata.
pub const PERIOD_HEADER_SHEET: &str = "REKAPITULASI PDPB";
/// Rows to probe for the period title. Enough to cover the header block.
const PERIOD_HEADER_ROWS: u32 = 8;

/// Everything pulled out of one uploaded workbook before any storage work.
/// Per-sheet read failures are kept as values so the pipeline can report them
/// per relation instead of aborting.
#[derive(Debug)]
pub struct WorkbookExtract {
    pub header_cells: Result<Vec<String>, SheetError>,
    pub baseline: Result<RawTable, SheetError>,
    pub registration_recap: Result<RawTable, SheetError>,
    pub model_a_recap: Result<RawTable, SheetError>,
    pub model_a_detail: Result<RawTable, SheetError>,
}

/// Failures that abort the whole import before any fact write.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Per-relation result of one import run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationOutcome {
    /// Appended this many rows.
    Inserted(usize),
    /// Skipped: rows already present for this period.
    SkippedExisting,
    /// The sheet normalized to zero usable rows; nothing written.
    NoUsableRows,
    /// Sheet read or storage failure; other relations unaffected.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationReport {
    pub relation: &'static str,
    pub outcome: RelationOutcome,
}

#[derive(Debug, Clone)]
pub struct ImportReport {
    pub period: Period,
    pub relations: Vec<RelationReport>,
}

impl ImportReport {
    pub fn failures(&self) -> usize {
        self.relations
            .iter()
            .filter(|r| matches!(r.outcome, RelationOutcome::Failed(_)))
            .count()
    }
}

/// Read the header block and the four source sheets out of a workbook file.
pub fn load_workbook(path: &Path) -> Result<WorkbookExtract, SheetError> {
    let mut workbook = sheet::open(path)?;
    Ok(WorkbookExtract {
        header_cells: sheet::read_header_block(&mut workbook, PERIOD_HEADER_SHEET, PERIOD_HEADER_ROWS),
        baseline: sheet::read_table(&mut workbook, &normalize::PRIOR_QUARTER_BASELINE.spec),
        registration_recap: sheet::read_table(&mut workbook, &normalize::REGISTRATION_RECAP.spec),
        model_a_recap: sheet::read_table(&mut workbook, &normalize::MODEL_A_RECAP.spec),
        model_a_detail: sheet::read_table(&mut workbook, &normalize::MODEL_A_DETAIL.spec),
    })
}

/// Run the full pipeline over an already-loaded extract.
pub async fn run_import(
    pool: &SqlitePool,
    extract: &WorkbookExtract,
) -> Result<ImportReport, ImportError> {
    let header_cells = extract
        .header_cells
        .as_ref()
        .map_err(|e| ExtractionError::HeaderUnreadable(e.to_string()))?;
    let key = extract_period(header_cells)?;
    let period_id = periods::resolve_period_id(pool, &key).await?;
    let period = Period {
        id: period_id,
        title: key.title,
        year: key.year,
        quarter: key.quarter,
    };

    let mut relations = Vec::new();

    relations.push(RelationReport {
        relation: normalize::PRIOR_QUARTER_BASELINE.relation,
        outcome: match &extract.baseline {
            Err(e) => RelationOutcome::Failed(e.to_string()),
            Ok(table) => {
                let rows = normalize::baseline_rows(table);
                outcome_for(
                    normalize::PRIOR_QUARTER_BASELINE.relation,
                    facts::insert_baseline(pool, period_id, &rows).await,
                )
            }
        },
    });

    relations.push(RelationReport {
        relation: normalize::REGISTRATION_RECAP.relation,
        outcome: match &extract.registration_recap {
            Err(e) => RelationOutcome::Failed(e.to_string()),
            Ok(table) => {
                let rows = normalize::registration_recap_rows(table);
                outcome_for(
                    normalize::REGISTRATION_RECAP.relation,
                    facts::insert_registration_recap(pool, period_id, &rows).await,
                )
            }
        },
    });

    relations.push(RelationReport {
        relation: normalize::MODEL_A_RECAP.relation,
        outcome: match &extract.model_a_recap {
            Err(e) => RelationOutcome::Failed(e.to_string()),
            Ok(table) => {
                let rows = normalize::model_a_recap_rows(table);
                outcome_for(
                    normalize::MODEL_A_RECAP.relation,
                    facts::insert_model_a_recap(pool, period_id, &rows).await,
                )
            }
        },
    });

    relations.push(RelationReport {
        relation: normalize::MODEL_A_DETAIL.relation,
        outcome: match &extract.model_a_detail {
            Err(e) => RelationOutcome::Failed(e.to_string()),
            Ok(table) => {
                let rows = normalize::model_a_detail_rows(table);
                outcome_for(
                    normalize::MODEL_A_DETAIL.relation,
                    facts::insert_model_a_detail(pool, period_id, &rows).await,
                )
            }
        },
    });

    Ok(ImportReport { period, relations })
}

/// Open a workbook file and run the full import pipeline against it.
pub async fn import_workbook(pool: &SqlitePool, path: &Path) -> anyhow::Result<ImportReport> {
    let extract = load_workbook(path)?;
    let report = run_import(pool, &extract).await?;
    Ok(report)
}

fn outcome_for(
    relation: &'static str,
    result: Result<PersistOutcome, PersistenceError>,
) -> RelationOutcome {
    match result {
        Ok(PersistOutcome::Inserted(n)) => RelationOutcome::Inserted(n),
        Ok(PersistOutcome::SkippedExisting) => RelationOutcome::SkippedExisting,
        Ok(PersistOutcome::NothingToInsert) => {
            warn!(relation, "sheet normalized to zero usable rows; nothing persisted");
            RelationOutcome::NoUsableRows
        }
        Err(e) => RelationOutcome::Failed(e.to_string()),
    }
}
