//! Shared fixtures for the integration suites: a fresh temp database and
//! workbook extracts shaped like the real quarterly files.

use calamine::Data;
use sqlx::SqlitePool;
use tempfile::TempDir;

use voter_rolls::database;
use voter_rolls::extractors::sheet::RawTable;
use voter_rolls::tools::workbook_importer::WorkbookExtract;

/// Fresh database in a temp dir, schema applied. Keep the TempDir alive for
/// the duration of the test.
pub async fn setup_pool() -> (SqlitePool, TempDir) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let db_path = dir.path().join("test.db");
    let pool = database::connect(db_path.to_str().unwrap())
        .await
        .expect("failed to connect to test database");
    database::init_schema(&pool)
        .await
        .expect("failed to initialize schema");
    (pool, dir)
}

pub fn s(text: &str) -> Data {
    Data::String(text.to_string())
}

fn table(columns: &[&str], rows: Vec<Vec<Data>>) -> RawTable {
    RawTable {
        columns: columns.iter().map(|c| c.to_string()).collect(),
        rows,
    }
}

pub fn header_cells(title: &str) -> Vec<String> {
    vec![
        "KOMISI PEMILIHAN UMUM".to_string(),
        "KABUPATEN MALANG".to_string(),
        title.to_string(),
    ]
}

/// Prior-quarter snapshot: two districts plus the grand-total row.
pub fn baseline_table() -> RawTable {
    table(
        &["malang", "tps", "lk", "pr", "lp"],
        vec![
            vec![
                s("AMPELGADING"),
                Data::Int(87),
                Data::Int(21000),
                Data::Int(21500),
                Data::Int(42500),
            ],
            vec![
                s("BANTUR"),
                Data::Int(90),
                Data::Int(30000),
                Data::Int(30500),
                Data::Int(60500),
            ],
            vec![
                s("JUMLAH"),
                Data::Int(177),
                Data::Int(51000),
                Data::Int(52000),
                Data::Int(103000),
            ],
        ],
    )
}

/// Registration recap: two districts plus the grand-total row.
pub fn recap_table() -> RawTable {
    table(
        &[
            "no",
            "namakecamatan",
            "jumlahdesakel",
            "jumlahpemilih_l",
            "jumlahpemilih_p",
            "jumlahpemilih_lp",
            "keterangan",
        ],
        vec![
            vec![
                Data::Int(1),
                s("AMPELGADING"),
                Data::Int(13),
                Data::Int(21653),
                Data::Int(22033),
                Data::Int(43686),
                Data::Empty,
            ],
            vec![
                Data::Int(2),
                s("BANTUR"),
                Data::Int(22),
                Data::Int(30200),
                Data::Int(30700),
                Data::Int(60900),
                s("nihil"),
            ],
            vec![
                s("JUMLAH"),
                s(""),
                Data::Int(35),
                Data::Int(51853),
                Data::Int(52733),
                Data::Int(104586),
                Data::Empty,
            ],
        ],
    )
}

pub fn model_a_table() -> RawTable {
    table(
        &[
            "no",
            "namakecamatan",
            "jumlahdesakel",
            "jumlahpemilihbaru",
            "jumlahpemilihtidakmemenuhisyarat",
            "jumlahperbaikandatapemilih",
            "keterangan",
        ],
        vec![
            vec![
                Data::Int(1),
                s("AMPELGADING"),
                Data::Int(13),
                Data::Int(25),
                Data::Int(40),
                Data::Int(7),
                Data::Empty,
            ],
            vec![
                Data::Int(2),
                s("BANTUR"),
                Data::Int(22),
                Data::Int(30),
                Data::Int(10),
                Data::Int(3),
                Data::Empty,
            ],
            vec![
                s("JUMLAH"),
                s(""),
                Data::Int(35),
                Data::Int(55),
                Data::Int(50),
                Data::Int(10),
                Data::Empty,
            ],
        ],
    )
}

pub fn detail_table() -> RawTable {
    let detail_row = |no: i64, district: &str| {
        vec![
            Data::Int(no),
            s(district),
            Data::Int(11),
            Data::Int(12),
            Data::Int(1),
            Data::Int(2),
            Data::Int(3),
            Data::Int(4),
            Data::Int(5),
            Data::Int(6),
            Data::Int(7),
            Data::Int(8),
            Data::Int(9),
            Data::Int(10),
        ]
    };
    table(
        &[
            "no",
            "namakecamatan",
            "jumlahpemilihbaru_l",
            "jumlahpemilihbaru_p",
            "jumlahpemilihtidakmemenuhisyarat_meninggal_l",
            "jumlahpemilihtidakmemenuhisyarat_meninggal_p",
            "jumlahpemilihtidakmemenuhisyarat_dibawahumur_l",
            "jumlahpemilihtidakmemenuhisyarat_dibawahumur_p",
            "jumlahpemilihtidakmemenuhisyarat_ganda_l",
            "jumlahpemilihtidakmemenuhisyarat_ganda_p",
            "jumlahpemilihtidakmemenuhisyarat_pindahkeluar_l",
            "jumlahpemilihtidakmemenuhisyarat_pindahkeluar_p",
            "jumlahpemilihtidakmemenuhisyarat_tni_l",
            "jumlahpemilihtidakmemenuhisyarat_tni_p",
        ],
        vec![
            detail_row(1, "AMPELGADING"),
            detail_row(2, "BANTUR"),
        ],
    )
}

/// A complete, well-formed workbook extract for the given period title.
pub fn sample_extract(title: &str) -> WorkbookExtract {
    WorkbookExtract {
        header_cells: Ok(header_cells(title)),
        baseline: Ok(baseline_table()),
        registration_recap: Ok(recap_table()),
        model_a_recap: Ok(model_a_table()),
        model_a_detail: Ok(detail_table()),
    }
}

/// Row count of one table, for idempotence assertions.
pub async fn row_count(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .expect("count query failed")
}
