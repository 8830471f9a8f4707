//! End-to-end pipeline tests: extraction, registry, normalization and
//! dedup-aware persistence over fixture extracts.

mod common;

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;

use voter_rolls::database::{facts, periods, PersistOutcome};
use voter_rolls::extractors::period::ExtractionError;
use voter_rolls::extractors::sheet::{RawTable, SheetError};
use voter_rolls::models::PeriodKey;
use voter_rolls::tools::workbook_importer::{run_import, ImportError, RelationOutcome};

use common::{row_count, sample_extract, setup_pool};

const TITLE: &str = "REKAPITULASI PDPB TRIWULAN KEDUA TAHUN 2024";

#[tokio::test]
async fn full_import_persists_all_four_relations() {
    let (pool, _dir) = setup_pool().await;

    let report = run_import(&pool, &sample_extract(TITLE)).await.unwrap();

    assert_eq!(report.period.year, 2024);
    assert_eq!(report.period.quarter, 2);
    assert_eq!(report.period.title, TITLE);
    for relation in &report.relations {
        assert_eq!(
            relation.outcome,
            RelationOutcome::Inserted(2),
            "relation {}",
            relation.relation
        );
    }

    assert_eq!(row_count(&pool, "periods").await, 1);
    assert_eq!(row_count(&pool, "prior_quarter_baseline").await, 2);
    assert_eq!(row_count(&pool, "registration_recap").await, 2);
    assert_eq!(row_count(&pool, "model_a_recap").await, 2);
    assert_eq!(row_count(&pool, "model_a_detail").await, 2);
}

#[tokio::test]
async fn second_import_of_same_workbook_is_idempotent() {
    let (pool, _dir) = setup_pool().await;

    let first = run_import(&pool, &sample_extract(TITLE)).await.unwrap();
    let second = run_import(&pool, &sample_extract(TITLE)).await.unwrap();

    assert_eq!(second.period.id, first.period.id);
    for relation in &second.relations {
        assert_eq!(
            relation.outcome,
            RelationOutcome::SkippedExisting,
            "relation {}",
            relation.relation
        );
    }

    // Row counts identical after the second run: zero new rows written.
    assert_eq!(row_count(&pool, "periods").await, 1);
    assert_eq!(row_count(&pool, "prior_quarter_baseline").await, 2);
    assert_eq!(row_count(&pool, "registration_recap").await, 2);
    assert_eq!(row_count(&pool, "model_a_recap").await, 2);
    assert_eq!(row_count(&pool, "model_a_detail").await, 2);
}

#[tokio::test]
async fn missing_detail_sheet_fails_only_that_relation() {
    let (pool, _dir) = setup_pool().await;

    let mut extract = sample_extract(TITLE);
    extract.model_a_detail = Err(SheetError::Worksheet {
        name: "DB REKAP MODEL A".to_string(),
        message: "worksheet not found".to_string(),
    });

    let report = run_import(&pool, &extract).await.unwrap();

    let outcome_of = |name: &str| {
        report
            .relations
            .iter()
            .find(|r| r.relation == name)
            .map(|r| r.outcome.clone())
            .unwrap()
    };
    assert_eq!(outcome_of("prior_quarter_baseline"), RelationOutcome::Inserted(2));
    assert_eq!(outcome_of("registration_recap"), RelationOutcome::Inserted(2));
    assert_eq!(outcome_of("model_a_recap"), RelationOutcome::Inserted(2));
    assert_matches!(outcome_of("model_a_detail"), RelationOutcome::Failed(_));

    assert_eq!(row_count(&pool, "model_a_detail").await, 0);
    assert_eq!(row_count(&pool, "registration_recap").await, 2);
}

#[tokio::test]
async fn extraction_failure_aborts_before_any_write() {
    let (pool, _dir) = setup_pool().await;

    let mut extract = sample_extract(TITLE);
    extract.header_cells = Ok(vec!["REKAPITULASI PDPB".to_string(), "TAHUN 2024".to_string()]);

    let err = run_import(&pool, &extract).await.unwrap_err();
    assert_matches!(err, ImportError::Extraction(ExtractionError::MarkerNotFound));

    assert_eq!(row_count(&pool, "periods").await, 0);
    assert_eq!(row_count(&pool, "registration_recap").await, 0);
}

#[tokio::test]
async fn unreadable_header_block_reports_as_extraction_failure() {
    let (pool, _dir) = setup_pool().await;

    let mut extract = sample_extract(TITLE);
    extract.header_cells = Err(SheetError::Worksheet {
        name: "REKAPITULASI PDPB".to_string(),
        message: "worksheet not found".to_string(),
    });

    let err = run_import(&pool, &extract).await.unwrap_err();
    assert_matches!(err, ImportError::Extraction(ExtractionError::HeaderUnreadable(_)));
    assert_eq!(row_count(&pool, "periods").await, 0);
}

#[tokio::test]
async fn normalizer_without_district_column_reports_no_usable_rows() {
    let (pool, _dir) = setup_pool().await;

    let mut extract = sample_extract(TITLE);
    // Same shape but the mandatory district column is gone entirely.
    extract.registration_recap = Ok(RawTable {
        columns: vec!["no".to_string(), "jumlahdesakel".to_string()],
        rows: vec![vec![calamine::Data::Int(1), calamine::Data::Int(13)]],
    });

    let report = run_import(&pool, &extract).await.unwrap();
    let recap = report
        .relations
        .iter()
        .find(|r| r.relation == "registration_recap")
        .unwrap();
    assert_eq!(recap.outcome, RelationOutcome::NoUsableRows);

    assert_eq!(row_count(&pool, "registration_recap").await, 0);
    // The other relations persist as usual.
    assert_eq!(row_count(&pool, "model_a_recap").await, 2);
}

#[tokio::test]
async fn registry_returns_same_id_for_identical_triple() {
    let (pool, _dir) = setup_pool().await;

    let key = PeriodKey {
        title: TITLE.to_string(),
        year: 2024,
        quarter: 2,
    };
    let first = periods::resolve_period_id(&pool, &key).await.unwrap();
    let second = periods::resolve_period_id(&pool, &key).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(row_count(&pool, "periods").await, 1);
}

#[tokio::test]
async fn registry_treats_different_titles_as_distinct_periods() {
    let (pool, _dir) = setup_pool().await;

    let key = PeriodKey {
        title: TITLE.to_string(),
        year: 2024,
        quarter: 2,
    };
    let reworded = PeriodKey {
        title: "PDPB TRIWULAN KEDUA TAHUN 2024 (REVISI)".to_string(),
        year: 2024,
        quarter: 2,
    };
    let first = periods::resolve_period_id(&pool, &key).await.unwrap();
    let second = periods::resolve_period_id(&pool, &reworded).await.unwrap();

    assert_ne!(first, second);
    assert_eq!(row_count(&pool, "periods").await, 2);
}

#[tokio::test]
async fn existing_rows_win_over_empty_record_set() {
    let (pool, _dir) = setup_pool().await;

    let report = run_import(&pool, &sample_extract(TITLE)).await.unwrap();
    let period_id = report.period.id;

    // A retry whose normalizer came up empty still reports the dedup skip.
    let outcome = facts::insert_registration_recap(&pool, period_id, &[])
        .await
        .unwrap();
    assert_eq!(outcome, PersistOutcome::SkippedExisting);

    // A fresh period with an empty record set persists nothing.
    let fresh = periods::resolve_period_id(
        &pool,
        &PeriodKey {
            title: "TRIWULAN KETIGA TAHUN 2024".to_string(),
            year: 2024,
            quarter: 3,
        },
    )
    .await
    .unwrap();
    let outcome = facts::insert_registration_recap(&pool, fresh, &[])
        .await
        .unwrap();
    assert_eq!(outcome, PersistOutcome::NothingToInsert);
    assert_eq!(row_count(&pool, "registration_recap").await, 2);
}

#[tokio::test]
async fn reimport_after_detail_failure_fills_only_the_gap() {
    let (pool, _dir) = setup_pool().await;

    let mut broken = sample_extract(TITLE);
    broken.model_a_detail = Err(SheetError::Worksheet {
        name: "DB REKAP MODEL A".to_string(),
        message: "worksheet not found".to_string(),
    });
    run_import(&pool, &broken).await.unwrap();

    // Re-upload of the corrected workbook: three dedup skips, detail saved.
    let report = run_import(&pool, &sample_extract(TITLE)).await.unwrap();
    let outcome_of = |name: &str| {
        report
            .relations
            .iter()
            .find(|r| r.relation == name)
            .map(|r| r.outcome.clone())
            .unwrap()
    };
    assert_eq!(outcome_of("registration_recap"), RelationOutcome::SkippedExisting);
    assert_eq!(outcome_of("model_a_detail"), RelationOutcome::Inserted(2));
    assert_eq!(row_count(&pool, "model_a_detail").await, 2);
}
