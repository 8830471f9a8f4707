//! Sheet normalization: loosely-shaped extracts into canonical record sets.
//!
//! Every source sheet goes through the same pipeline (strip the grand-total
//! row, resolve canonical fields from flattened header keys, drop rows with
//! no district name) and the sheet-specific quirks (location, header depth,
//! alias spellings, which column carries the total marker) live in the
//! [`SheetSchema`] constants, not in code.

use std::collections::HashMap;

use crate::extractors::sheet::{cell_count, cell_text, RawTable, SheetLocator, SheetSpec};
use crate::models::{BaselineRow, ModelADetailRow, ModelARecapRow, RegistrationRecapRow};

/// Canonical field names shared by the normalizers, the persistence layer and
/// the reporting queries.
pub mod fields {
    pub const DISTRICT: &str = "district";
    pub const VILLAGES: &str = "villages";
    pub const POLLING_STATIONS: &str = "polling_stations";
    pub const MALE_VOTERS: &str = "male_voters";
    pub const FEMALE_VOTERS: &str = "female_voters";
    pub const REMARKS: &str = "remarks";
    pub const NEW_VOTERS: &str = "new_voters";
    pub const DISQUALIFIED: &str = "disqualified";
    pub const CORRECTED: &str = "corrected";
    pub const NEW_MALE: &str = "new_male";
    pub const NEW_FEMALE: &str = "new_female";
    pub const DECEASED_MALE: &str = "deceased_male";
    pub const DECEASED_FEMALE: &str = "deceased_female";
    pub const UNDERAGE_MALE: &str = "underage_male";
    pub const UNDERAGE_FEMALE: &str = "underage_female";
    pub const DUPLICATE_MALE: &str = "duplicate_male";
    pub const DUPLICATE_FEMALE: &str = "duplicate_female";
    pub const MOVED_MALE: &str = "moved_male";
    pub const MOVED_FEMALE: &str = "moved_female";
    pub const MILITARY_MALE: &str = "military_male";
    pub const MILITARY_FEMALE: &str = "military_female";
}

/// Row-label text that marks the grand-total pseudo-row in every source
/// sheet shape.
const GRAND_TOTAL_MARKER: &str = "jumlah";

/// One canonical field and the header-key aliases that resolve to it, in
/// priority order.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub field: &'static str,
    pub aliases: &'static [&'static str],
}

/// Which column carries the row label scanned for the grand-total marker.
#[derive(Debug, Clone, Copy)]
pub enum LabelColumn {
    /// Fixed position (sheets whose label column has no usable header).
    Index(usize),
    /// Column whose flattened header key equals this value.
    Key(&'static str),
}

/// Declarative description of one source sheet shape.
#[derive(Debug, Clone, Copy)]
pub struct SheetSchema {
    pub relation: &'static str,
    pub spec: SheetSpec,
    pub label_column: LabelColumn,
    pub fields: &'static [FieldSpec],
}

/// Prior-quarter closing snapshot: first sheet, single header row. The
/// district column is headed by the regency name in the source layout.
pub const PRIOR_QUARTER_BASELINE: SheetSchema = SheetSchema {
    relation: "prior_quarter_baseline",
    spec: SheetSpec {
        locator: SheetLocator::First,
        header_row: 0,
        header_rows: 1,
    },
    label_column: LabelColumn::Index(0),
    fields: &[
        FieldSpec {
            field: fields::DISTRICT,
            aliases: &["namakecamatan", "malang"],
        },
        FieldSpec {
            field: fields::POLLING_STATIONS,
            aliases: &["jumlahtps", "tps"],
        },
        FieldSpec {
            field: fields::MALE_VOTERS,
            aliases: &["lk", "laki"],
        },
        FieldSpec {
            field: fields::FEMALE_VOTERS,
            aliases: &["pr", "perempuan"],
        },
    ],
};

/// Registration recap: fixed sheet title, two stacked header rows (the
/// "Jumlah Pemilih" label is merged over the L / P / L + P columns).
pub const REGISTRATION_RECAP: SheetSchema = SheetSchema {
    relation: "registration_recap",
    spec: SheetSpec {
        locator: SheetLocator::Named("REKAPITULASI PDPB"),
        header_row: 9,
        header_rows: 2,
    },
    label_column: LabelColumn::Key("no"),
    fields: &[
        FieldSpec {
            field: fields::DISTRICT,
            aliases: &["namakecamatan"],
        },
        FieldSpec {
            field: fields::VILLAGES,
            aliases: &["jumlahdesakel"],
        },
        FieldSpec {
            field: fields::MALE_VOTERS,
            aliases: &["jumlahpemilih_l"],
        },
        FieldSpec {
            field: fields::FEMALE_VOTERS,
            aliases: &["jumlahpemilih_p"],
        },
        FieldSpec {
            field: fields::REMARKS,
            aliases: &["keterangan"],
        },
    ],
};

/// Model-A recap: fixed sheet title, single header row below the title block.
pub const MODEL_A_RECAP: SheetSchema = SheetSchema {
    relation: "model_a_recap",
    spec: SheetSpec {
        locator: SheetLocator::Named("REKAP MODEL A"),
        header_row: 8,
        header_rows: 1,
    },
    label_column: LabelColumn::Key("no"),
    fields: &[
        FieldSpec {
            field: fields::DISTRICT,
            aliases: &["namakecamatan"],
        },
        FieldSpec {
            field: fields::VILLAGES,
            aliases: &["jumlahdesakel"],
        },
        FieldSpec {
            field: fields::NEW_VOTERS,
            aliases: &["jumlahpemilihbaru"],
        },
        FieldSpec {
            field: fields::DISQUALIFIED,
            aliases: &["jumlahpemilihtidakmemenuhisyarat", "jumlahpemilihtms"],
        },
        FieldSpec {
            field: fields::CORRECTED,
            aliases: &["jumlahperbaikandatapemilih", "jumlahperbaikandata"],
        },
        FieldSpec {
            field: fields::REMARKS,
            aliases: &["keterangan"],
        },
    ],
};

/// Model-A disaggregated detail: fixed sheet title, three stacked header
/// rows; disqualification reasons each split into L / P columns.
pub const MODEL_A_DETAIL: SheetSchema = SheetSchema {
    relation: "model_a_detail",
    spec: SheetSpec {
        locator: SheetLocator::Named("DB REKAP MODEL A"),
        header_row: 8,
        header_rows: 3,
    },
    label_column: LabelColumn::Key("no"),
    fields: &[
        FieldSpec {
            field: fields::DISTRICT,
            aliases: &["namakecamatan"],
        },
        FieldSpec {
            field: fields::NEW_MALE,
            aliases: &["jumlahpemilihbaru_l"],
        },
        FieldSpec {
            field: fields::NEW_FEMALE,
            aliases: &["jumlahpemilihbaru_p"],
        },
        FieldSpec {
            field: fields::DECEASED_MALE,
            aliases: &["meninggal_l"],
        },
        FieldSpec {
            field: fields::DECEASED_FEMALE,
            aliases: &["meninggal_p"],
        },
        FieldSpec {
            field: fields::UNDERAGE_MALE,
            aliases: &["dibawahumur_l"],
        },
        FieldSpec {
            field: fields::UNDERAGE_FEMALE,
            aliases: &["dibawahumur_p"],
        },
        FieldSpec {
            field: fields::DUPLICATE_MALE,
            aliases: &["ganda_l"],
        },
        FieldSpec {
            field: fields::DUPLICATE_FEMALE,
            aliases: &["ganda_p"],
        },
        FieldSpec {
            field: fields::MOVED_MALE,
            aliases: &["pindahkeluar_l"],
        },
        FieldSpec {
            field: fields::MOVED_FEMALE,
            aliases: &["pindahkeluar_p"],
        },
        FieldSpec {
            field: fields::MILITARY_MALE,
            aliases: &["tni_l"],
        },
        FieldSpec {
            field: fields::MILITARY_FEMALE,
            aliases: &["tni_p"],
        },
    ],
};

/// Resolve each canonical field to a source column index. For a field, the
/// first declared alias that is contained in any column key wins, and among
/// matching columns the leftmost wins. Unresolved fields are simply absent.
pub fn resolve_columns(
    schema: &SheetSchema,
    columns: &[String],
) -> HashMap<&'static str, usize> {
    let mut resolved = HashMap::new();
    for field in schema.fields {
        'aliases: for alias in field.aliases {
            for (idx, key) in columns.iter().enumerate() {
                if !key.is_empty() && key.contains(alias) {
                    resolved.insert(field.field, idx);
                    break 'aliases;
                }
            }
        }
    }
    resolved
}

fn is_grand_total(schema: &SheetSchema, columns: &[String], row: &[calamine::Data]) -> bool {
    let label_idx = match schema.label_column {
        LabelColumn::Index(idx) => Some(idx),
        LabelColumn::Key(key) => columns.iter().position(|c| c == key),
    };
    label_idx
        .and_then(|idx| row.get(idx))
        .and_then(cell_text)
        .map(|text| text.to_lowercase().contains(GRAND_TOTAL_MARKER))
        .unwrap_or(false)
}

fn text_at(
    resolved: &HashMap<&'static str, usize>,
    field: &'static str,
    row: &[calamine::Data],
) -> Option<String> {
    resolved.get(field).and_then(|&idx| row.get(idx)).and_then(cell_text)
}

fn count_at(
    resolved: &HashMap<&'static str, usize>,
    field: &'static str,
    row: &[calamine::Data],
) -> Option<i64> {
    resolved.get(field).and_then(|&idx| row.get(idx)).and_then(cell_count)
}

/// Data rows of `table` that survive the grand-total strip and carry a
/// district name, paired with the resolved column map. Empty when the
/// mandatory district column cannot be resolved at all.
fn usable_rows<'t>(
    schema: &SheetSchema,
    table: &'t RawTable,
) -> (HashMap<&'static str, usize>, Vec<&'t Vec<calamine::Data>>) {
    let resolved = resolve_columns(schema, &table.columns);
    if !resolved.contains_key(fields::DISTRICT) {
        return (resolved, Vec::new());
    }
    let rows = table
        .rows
        .iter()
        .filter(|row| !is_grand_total(schema, &table.columns, row))
        .filter(|row| text_at(&resolved, fields::DISTRICT, row).is_some())
        .collect();
    (resolved, rows)
}

pub fn baseline_rows(table: &RawTable) -> Vec<BaselineRow> {
    let (resolved, rows) = usable_rows(&PRIOR_QUARTER_BASELINE, table);
    rows.into_iter()
        .filter_map(|row| {
            Some(BaselineRow {
                district: text_at(&resolved, fields::DISTRICT, row)?,
                polling_stations: count_at(&resolved, fields::POLLING_STATIONS, row),
                male_voters: count_at(&resolved, fields::MALE_VOTERS, row),
                female_voters: count_at(&resolved, fields::FEMALE_VOTERS, row),
            })
        })
        .collect()
}

pub fn registration_recap_rows(table: &RawTable) -> Vec<RegistrationRecapRow> {
    let (resolved, rows) = usable_rows(&REGISTRATION_RECAP, table);
    rows.into_iter()
        .filter_map(|row| {
            Some(RegistrationRecapRow {
                district: text_at(&resolved, fields::DISTRICT, row)?,
                villages: count_at(&resolved, fields::VILLAGES, row),
                male_voters: count_at(&resolved, fields::MALE_VOTERS, row),
                female_voters: count_at(&resolved, fields::FEMALE_VOTERS, row),
                remarks: text_at(&resolved, fields::REMARKS, row),
            })
        })
        .collect()
}

pub fn model_a_recap_rows(table: &RawTable) -> Vec<ModelARecapRow> {
    let (resolved, rows) = usable_rows(&MODEL_A_RECAP, table);
    rows.into_iter()
        .filter_map(|row| {
            Some(ModelARecapRow {
                district: text_at(&resolved, fields::DISTRICT, row)?,
                villages: count_at(&resolved, fields::VILLAGES, row),
                new_voters: count_at(&resolved, fields::NEW_VOTERS, row),
                disqualified: count_at(&resolved, fields::DISQUALIFIED, row),
                corrected: count_at(&resolved, fields::CORRECTED, row),
                remarks: text_at(&resolved, fields::REMARKS, row),
            })
        })
        .collect()
}

pub fn model_a_detail_rows(table: &RawTable) -> Vec<ModelADetailRow> {
    let (resolved, rows) = usable_rows(&MODEL_A_DETAIL, table);
    rows.into_iter()
        .filter_map(|row| {
            Some(ModelADetailRow {
                district: text_at(&resolved, fields::DISTRICT, row)?,
                new_male: count_at(&resolved, fields::NEW_MALE, row),
                new_female: count_at(&resolved, fields::NEW_FEMALE, row),
                deceased_male: count_at(&resolved, fields::DECEASED_MALE, row),
                deceased_female: count_at(&resolved, fields::DECEASED_FEMALE, row),
                underage_male: count_at(&resolved, fields::UNDERAGE_MALE, row),
                underage_female: count_at(&resolved, fields::UNDERAGE_FEMALE, row),
                duplicate_male: count_at(&resolved, fields::DUPLICATE_MALE, row),
                duplicate_female: count_at(&resolved, fields::DUPLICATE_FEMALE, row),
                moved_male: count_at(&resolved, fields::MOVED_MALE, row),
                moved_female: count_at(&resolved, fields::MOVED_FEMALE, row),
                military_male: count_at(&resolved, fields::MILITARY_MALE, row),
                military_female: count_at(&resolved, fields::MILITARY_FEMALE, row),
            })
        })
        .collect()
}
