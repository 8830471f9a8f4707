//! Workbook access and raw tabular extraction.
//!
//! Source sheets are loosely structured: header blocks start at different row
//! offsets, composite headers span up to three rows with merged labels, and
//! numeric cells sometimes arrive as locale-formatted text ("1.234"). This
//! module turns a worksheet into a [`RawTable`] of flattened column keys plus
//! untyped cells that the normalizers can project from.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use thiserror::Error;

pub type Workbook = Xlsx<BufReader<File>>;

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("failed to open workbook {path}: {message}")]
    OpenWorkbook { path: String, message: String },
    #[error("worksheet '{name}' is missing or unreadable: {message}")]
    Worksheet { name: String, message: String },
    #[error("workbook has no worksheets")]
    NoSheets,
}

/// Where a source sheet lives in the workbook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetLocator {
    /// First sheet, whatever its name.
    First,
    /// Fixed sheet title.
    Named(&'static str),
}

/// Shape of one source sheet: where the header block starts and how many
/// stacked header rows it carries.
#[derive(Debug, Clone, Copy)]
pub struct SheetSpec {
    pub locator: SheetLocator,
    pub header_row: u32,
    pub header_rows: u32,
}

/// A loosely-structured tabular extract: one flattened key per column and the
/// raw cells below the header block.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Data>>,
}

pub fn open(path: &Path) -> Result<Workbook, SheetError> {
    open_workbook(path).map_err(|e: calamine::XlsxError| SheetError::OpenWorkbook {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Read one sheet into a [`RawTable`] according to its spec.
pub fn read_table(workbook: &mut Workbook, spec: &SheetSpec) -> Result<RawTable, SheetError> {
    let range = sheet_range(workbook, spec.locator)?;
    Ok(table_from_range(&range, spec.header_row, spec.header_rows))
}

/// Stringify every non-empty cell in the first `rows` rows of a named sheet,
/// row-major. Used to scan the title block for period metadata.
pub fn read_header_block(
    workbook: &mut Workbook,
    sheet: &'static str,
    rows: u32,
) -> Result<Vec<String>, SheetError> {
    let range = sheet_range(workbook, SheetLocator::Named(sheet))?;
    let Some(end) = range.end() else {
        return Ok(Vec::new());
    };

    let mut cells = Vec::new();
    for r in 0..rows.min(end.0 + 1) {
        for c in 0..=end.1 {
            if let Some(value) = range.get_value((r, c)) {
                let text = cell_label(value);
                if !text.is_empty() {
                    cells.push(text);
                }
            }
        }
    }
    Ok(cells)
}

fn sheet_range(workbook: &mut Workbook, locator: SheetLocator) -> Result<Range<Data>, SheetError> {
    match locator {
        SheetLocator::Named(name) => {
            workbook
                .worksheet_range(name)
                .map_err(|e| SheetError::Worksheet {
                    name: name.to_string(),
                    message: e.to_string(),
                })
        }
        SheetLocator::First => {
            let name = workbook
                .sheet_names()
                .first()
                .cloned()
                .ok_or(SheetError::NoSheets)?;
            workbook
                .worksheet_range(&name)
                .map_err(|e| SheetError::Worksheet {
                    name,
                    message: e.to_string(),
                })
        }
    }
}

/// Build a [`RawTable`] from a worksheet range. Header labels are
/// forward-filled per row (a merged label only materializes in its first
/// cell), stacked per column, and flattened into one key. Rows below the
/// header block become the data rows; fully empty rows are dropped.
pub fn table_from_range(range: &Range<Data>, header_row: u32, header_rows: u32) -> RawTable {
    let Some(end) = range.end() else {
        return RawTable::default();
    };
    let ncols = end.1 + 1;

    let mut header_grid: Vec<Vec<String>> = Vec::new();
    for r in header_row..header_row + header_rows {
        let mut labels: Vec<String> = (0..ncols)
            .map(|c| {
                range
                    .get_value((r, c))
                    .map(cell_label)
                    .unwrap_or_default()
            })
            .collect();
        forward_fill(&mut labels);
        header_grid.push(labels);
    }

    let columns: Vec<String> = (0..ncols as usize)
        .map(|c| {
            let segments: Vec<&str> = header_grid.iter().map(|row| row[c].as_str()).collect();
            flatten_key(&segments)
        })
        .collect();

    let mut rows = Vec::new();
    for r in header_row + header_rows..=end.0 {
        let cells: Vec<Data> = (0..ncols)
            .map(|c| range.get_value((r, c)).cloned().unwrap_or(Data::Empty))
            .collect();
        if cells.iter().any(|cell| !is_blank(cell)) {
            rows.push(cells);
        }
    }

    RawTable { columns, rows }
}

/// Collapse stacked header segments into one flat key: non-blank segments,
/// lower-cased, stripped to alphanumerics, joined with `_`.
pub fn flatten_key(segments: &[&str]) -> String {
    let parts: Vec<String> = segments
        .iter()
        .map(|segment| {
            segment
                .chars()
                .filter(|ch| ch.is_alphanumeric())
                .flat_map(|ch| ch.to_lowercase())
                .collect::<String>()
        })
        .filter(|part| !part.is_empty())
        .collect();
    parts.join("_")
}

/// Carry each label across the empty cells to its right. Merged header cells
/// only hold their value in the top-left cell of the merge region.
fn forward_fill(labels: &mut [String]) {
    let mut last = String::new();
    for label in labels.iter_mut() {
        if label.is_empty() {
            *label = last.clone();
        } else {
            last = label.clone();
        }
    }
}

fn is_blank(cell: &Data) -> bool {
    match cell {
        Data::Empty => true,
        Data::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn cell_label(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        other => other.to_string().trim().to_string(),
    }
}

/// Trimmed cell text; `None` for empty cells.
pub fn cell_text(cell: &Data) -> Option<String> {
    let text = cell_label(cell);
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Cell value as a whole count. Accepts numeric cells and locale-formatted
/// text: "1.234" (thousands dot) parses as 1234, "12,5" rounds to 13.
pub fn cell_count(cell: &Data) -> Option<i64> {
    match cell {
        Data::Int(i) => Some(*i),
        Data::Float(f) => Some(f.round() as i64),
        Data::String(s) => parse_count_text(s),
        _ => None,
    }
}

fn parse_count_text(text: &str) -> Option<i64> {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|ch| !ch.is_whitespace() && *ch != '.')
        .map(|ch| if ch == ',' { '.' } else { ch })
        .collect();
    if cleaned.is_empty() || cleaned == "-" {
        return None;
    }
    cleaned
        .parse::<i64>()
        .ok()
        .or_else(|| cleaned.parse::<f64>().ok().map(|f| f.round() as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn range_with(cells: &[(u32, u32, Data)]) -> Range<Data> {
        let max_r = cells.iter().map(|(r, _, _)| *r).max().unwrap_or(0);
        let max_c = cells.iter().map(|(_, c, _)| *c).max().unwrap_or(0);
        let mut range = Range::new((0, 0), (max_r, max_c));
        for (r, c, value) in cells {
            range.set_value((*r, *c), value.clone());
        }
        range
    }

    fn s(text: &str) -> Data {
        Data::String(text.to_string())
    }

    #[test]
    fn flatten_key_joins_non_blank_lowercased_alphanumerics() {
        assert_eq!(
            flatten_key(&["Jumlah Pemilih Tidak Memenuhi Syarat", "Meninggal", "L"]),
            "jumlahpemilihtidakmemenuhisyarat_meninggal_l"
        );
        assert_eq!(flatten_key(&["No.", "", ""]), "no");
        assert_eq!(flatten_key(&["L + P"]), "lp");
        assert_eq!(flatten_key(&["", "", ""]), "");
    }

    #[test]
    fn forward_fill_carries_merged_labels() {
        let mut labels = vec![
            "".to_string(),
            "Jumlah Pemilih".to_string(),
            "".to_string(),
            "".to_string(),
            "Keterangan".to_string(),
        ];
        forward_fill(&mut labels);
        assert_eq!(
            labels,
            vec!["", "Jumlah Pemilih", "Jumlah Pemilih", "Jumlah Pemilih", "Keterangan"]
        );
    }

    #[test]
    fn single_header_table_extracts_columns_and_rows() {
        let range = range_with(&[
            (0, 0, s("MALANG")),
            (0, 1, s("TPS")),
            (0, 2, s("LK")),
            (1, 0, s("AMPELGADING")),
            (1, 1, Data::Int(87)),
            (1, 2, Data::Int(21653)),
        ]);
        let table = table_from_range(&range, 0, 1);
        assert_eq!(table.columns, vec!["malang", "tps", "lk"]);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(cell_text(&table.rows[0][0]).as_deref(), Some("AMPELGADING"));
        assert_eq!(cell_count(&table.rows[0][1]), Some(87));
    }

    #[test]
    fn three_row_header_flattens_with_merged_blanks() {
        // No | Nama Kecamatan | Jumlah Pemilih Baru (L, P) | TMS (Meninggal (L, P))
        let range = range_with(&[
            (8, 0, s("No")),
            (8, 1, s("Nama Kecamatan")),
            (8, 2, s("Jumlah Pemilih Baru")),
            (8, 4, s("Jumlah Pemilih Tidak Memenuhi Syarat")),
            (9, 2, s("L")),
            (9, 3, s("P")),
            (9, 4, s("Meninggal")),
            (10, 4, s("L")),
            (10, 5, s("P")),
            (11, 0, Data::Int(1)),
            (11, 1, s("DAMPIT")),
            (11, 2, Data::Int(10)),
            (11, 3, Data::Int(12)),
            (11, 4, Data::Int(3)),
            (11, 5, Data::Int(4)),
        ]);
        let table = table_from_range(&range, 8, 3);
        assert_eq!(
            table.columns,
            vec![
                "no",
                "namakecamatan",
                "jumlahpemilihbaru_l",
                "jumlahpemilihbaru_p",
                "jumlahpemilihtidakmemenuhisyarat_meninggal_l",
                "jumlahpemilihtidakmemenuhisyarat_meninggal_p",
            ]
        );
        assert_eq!(table.rows.len(), 1);
    }

    #[test]
    fn rows_above_header_are_ignored_and_blank_rows_dropped() {
        let range = range_with(&[
            (0, 0, s("REKAPITULASI PDPB TRIWULAN KEDUA TAHUN 2024")),
            (3, 0, s("Nama Kecamatan")),
            (3, 1, s("Jumlah Desa/Kel")),
            (4, 0, s("TUREN")),
            (4, 1, Data::Int(15)),
            (5, 0, s("  ")),
            (6, 0, s("WAJAK")),
            (6, 1, Data::Int(13)),
        ]);
        let table = table_from_range(&range, 3, 1);
        assert_eq!(table.columns, vec!["namakecamatan", "jumlahdesakel"]);
        assert_eq!(table.rows.len(), 2);
    }

    #[test]
    fn count_parsing_handles_locale_text() {
        assert_eq!(cell_count(&s("1.234")), Some(1234));
        assert_eq!(cell_count(&s("21 653")), Some(21653));
        assert_eq!(cell_count(&s("12,5")), Some(13));
        assert_eq!(cell_count(&s("87")), Some(87));
        assert_eq!(cell_count(&s("-")), None);
        assert_eq!(cell_count(&s("")), None);
        assert_eq!(cell_count(&Data::Float(42.0)), Some(42));
        assert_eq!(cell_count(&Data::Empty), None);
    }
}
