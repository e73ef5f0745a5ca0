// Loader/Normalizer
// Reads the per-diem report once and builds the canonical table.

use crate::error::{LoadError, Result};
use crate::locale::{decode_latin1, parse_amount, parse_issue_date};
use chrono::{Datelike, NaiveDate};
use csv::{ReaderBuilder, StringRecord};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Column count of the source layout.
pub const COLUMN_COUNT: usize = 8;

/// Field separator of the source file.
pub const DELIMITER: u8 = b';';

/// Role used when the source leaves it blank.
pub const UNSPECIFIED_ROLE: &str = "Unspecified";

/// Entity used when the source leaves it blank.
pub const UNSPECIFIED_ENTITY: &str = "Unspecified";

// Positional layout of the source columns
const COL_ENTITY: usize = 0;
const COL_PAYEE: usize = 1;
const COL_ROLE: usize = 2;
const COL_KIND: usize = 3;
const COL_COMMITMENT: usize = 4;
const COL_ISSUE_DATE: usize = 5;
const COL_TRANSPORT: usize = 6;
const COL_ALLOWANCE: usize = 7;

/// One normalized per-diem expense.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub entity: String,
    pub payee: String,
    pub role: String,
    pub expense_kind: String,
    pub commitment_ref: String,
    /// None when the source date was missing or not a real calendar date
    pub issue_date: Option<NaiveDate>,
    pub transport_amount: f64,
    pub allowance_amount: f64,
}

impl Record {
    /// Month of the issue date, 1..=12.
    pub fn month(&self) -> Option<u32> {
        self.issue_date.map(|d| d.month())
    }

    pub fn year(&self) -> Option<i32> {
        self.issue_date.map(|d| d.year())
    }
}

/// Counters gathered while normalizing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    pub rows_read: usize,
    pub defaulted_entities: usize,
    pub invalid_dates: usize,
    pub coerced_amounts: usize,
    pub defaulted_roles: usize,
}

/// The canonical table. Read-only once built; share it behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct Table {
    records: Vec<Record>,
    stats: LoadStats,
    source: Option<PathBuf>,
}

impl Table {
    pub fn new(records: Vec<Record>, stats: LoadStats) -> Self {
        Table {
            records,
            stats,
            source: None,
        }
    }

    /// The zero-data table served when loading fails.
    pub fn empty() -> Self {
        Table::default()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn stats(&self) -> &LoadStats {
        &self.stats
    }

    /// File the table was loaded from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Distinct entities, sorted, for populating selectors.
    pub fn entities(&self) -> Vec<String> {
        self.records
            .iter()
            .map(|r| r.entity.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect()
    }
}

/// Load and normalize the report at `path`.
pub fn load(path: &Path) -> Result<Table> {
    let bytes = fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut table = parse_bytes(&bytes, path)?;
    table.source = Some(path.to_path_buf());

    let stats = table.stats();
    info!(
        path = %path.display(),
        records = table.len(),
        defaulted_entities = stats.defaulted_entities,
        invalid_dates = stats.invalid_dates,
        coerced_amounts = stats.coerced_amounts,
        defaulted_roles = stats.defaulted_roles,
        "Loaded per-diem report"
    );

    Ok(table)
}

/// Load the report, or fall back to an empty table so the dashboard stays up.
pub fn load_or_empty(path: &Path) -> Table {
    match load(path) {
        Ok(table) => table,
        Err(e) => {
            warn!("Serving empty dashboard, could not load data: {}", e);
            Table::empty()
        }
    }
}

/// Normalize raw Latin-1 file contents. `path` is only used in errors.
pub fn parse_bytes(bytes: &[u8], path: &Path) -> Result<Table> {
    let text = decode_latin1(bytes);

    let mut reader = ReaderBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let csv_error = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };

    // Header names are ignored, only the shape matters
    let header_len = reader.headers().map_err(csv_error)?.len();
    if header_len == 0 {
        return Err(LoadError::Empty(path.to_path_buf()));
    }
    if header_len != COLUMN_COUNT {
        return Err(LoadError::ColumnCount {
            expected: COLUMN_COUNT,
            found: header_len,
            line: 1,
        });
    }

    let mut records = Vec::new();
    let mut stats = LoadStats::default();

    for result in reader.records() {
        let row = result.map_err(csv_error)?;
        if row.len() != COLUMN_COUNT {
            return Err(LoadError::ColumnCount {
                expected: COLUMN_COUNT,
                found: row.len(),
                line: row.position().map(|p| p.line()).unwrap_or(0),
            });
        }

        stats.rows_read += 1;
        records.push(normalize_row(&row, &mut stats));
    }

    Ok(Table::new(records, stats))
}

fn normalize_row(row: &StringRecord, stats: &mut LoadStats) -> Record {
    let field = |i: usize| row.get(i).unwrap_or("");
    let line = row.position().map(|p| p.line()).unwrap_or(0);

    let entity = match field(COL_ENTITY) {
        e if e.trim().is_empty() => {
            warn!(line, "Row without entity, keeping it as {}", UNSPECIFIED_ENTITY);
            stats.defaulted_entities += 1;
            UNSPECIFIED_ENTITY.to_string()
        }
        e => e.to_string(),
    };

    let role = match field(COL_ROLE) {
        r if r.trim().is_empty() => {
            stats.defaulted_roles += 1;
            UNSPECIFIED_ROLE.to_string()
        }
        r => r.to_string(),
    };

    let issue_date = match parse_issue_date(field(COL_ISSUE_DATE)) {
        Ok(date) => Some(date),
        Err(e) => {
            debug!(line, "{}", e);
            stats.invalid_dates += 1;
            None
        }
    };

    let mut amount = |i: usize| match parse_amount(field(i)) {
        Ok(value) => value,
        Err(e) => {
            debug!(line, "{}, using 0", e);
            stats.coerced_amounts += 1;
            0.0
        }
    };
    let transport_amount = amount(COL_TRANSPORT);
    let allowance_amount = amount(COL_ALLOWANCE);

    Record {
        entity,
        payee: field(COL_PAYEE).to_string(),
        role,
        expense_kind: field(COL_KIND).to_string(),
        commitment_ref: field(COL_COMMITMENT).to_string(),
        issue_date,
        transport_amount,
        allowance_amount,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &[u8] =
        b"Entidade;Credor;Cargo;Especie;Empenho;Emissao;Valor_Transporte;Valor_Diarias\n";

    fn parse(body: &[u8]) -> Result<Table> {
        let mut bytes = HEADER.to_vec();
        bytes.extend_from_slice(body);
        parse_bytes(&bytes, Path::new("inline.csv"))
    }

    #[test]
    fn test_normalizes_reference_row() {
        let table = parse(
            b"\"Prefeitura\";\"Jo\xe3o Silva\";\"\";\"Di\xe1ria\";\"123\";\"05/03/2023\";\"150,00\";\"1.234,56\"\n",
        )
        .unwrap();

        assert_eq!(table.len(), 1);
        let r = &table.records()[0];
        assert_eq!(r.entity, "Prefeitura");
        assert_eq!(r.payee, "João Silva");
        assert_eq!(r.role, UNSPECIFIED_ROLE);
        assert_eq!(r.expense_kind, "Diária");
        assert_eq!(r.commitment_ref, "123");
        assert_eq!(r.issue_date, NaiveDate::from_ymd_opt(2023, 3, 5));
        assert_eq!(r.month(), Some(3));
        assert_eq!(r.year(), Some(2023));
        assert_eq!(r.transport_amount, 150.0);
        assert_eq!(r.allowance_amount, 1234.56);
        assert_eq!(table.stats().defaulted_roles, 1);
    }

    #[test]
    fn test_invalid_date_keeps_record() {
        let table = parse(b"Camara;Ana;Vereador;Diaria;9;31/02/2023;0;100,00\n").unwrap();

        assert_eq!(table.len(), 1);
        let r = &table.records()[0];
        assert_eq!(r.issue_date, None);
        assert_eq!(r.month(), None);
        assert_eq!(r.year(), None);
        assert_eq!(r.allowance_amount, 100.0);
        assert_eq!(table.stats().invalid_dates, 1);
    }

    #[test]
    fn test_bad_amounts_become_zero() {
        let table = parse(b"Camara;Ana;Vereador;Diaria;9;01/01/2023;abc;-5,00\n").unwrap();

        let r = &table.records()[0];
        assert_eq!(r.transport_amount, 0.0);
        assert_eq!(r.allowance_amount, 0.0);
        assert_eq!(table.stats().coerced_amounts, 2);
    }

    #[test]
    fn test_whitespace_role_is_defaulted() {
        let table = parse(b"Camara;Ana;   ;Diaria;9;01/01/2023;0;1\n").unwrap();
        assert_eq!(table.records()[0].role, UNSPECIFIED_ROLE);
    }

    #[test]
    fn test_blank_entity_is_kept_with_sentinel() {
        let table = parse(
            b";Ana;Vereador;Diaria;9;01/01/2023;0;500,00\nCamara;Bia;Vereador;Diaria;9;01/01/2023;0;1,00\n",
        )
        .unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.records()[0].entity, UNSPECIFIED_ENTITY);
        assert_eq!(table.records()[0].allowance_amount, 500.0);
        assert_eq!(table.stats().rows_read, 2);
        assert_eq!(table.stats().defaulted_entities, 1);
        assert_eq!(table.entities(), vec!["Camara", UNSPECIFIED_ENTITY]);
    }

    #[test]
    fn test_blank_entity_counts_toward_all_total() {
        use crate::query::{query, EntityFilter, MonthRange};

        let table = parse(
            b";Ana;Vereador;Diaria;9;01/01/2023;0;500,00\nCamara;Bia;Vereador;Diaria;9;01/01/2023;0;1,00\n",
        )
        .unwrap();

        let view = query(&table, &EntityFilter::All, MonthRange::FULL_YEAR);
        assert_eq!(view.summary.record_count, 2);
        assert_eq!(view.summary.total, 501.0);
        assert_eq!(view.summary.total_display, "R$ 501,00");
    }

    #[test]
    fn test_wrong_header_shape_is_fatal() {
        let result = parse_bytes(b"a;b;c\n1;2;3\n", Path::new("short.csv"));
        assert!(matches!(
            result,
            Err(LoadError::ColumnCount {
                expected: 8,
                found: 3,
                line: 1
            })
        ));
    }

    #[test]
    fn test_ragged_row_is_fatal() {
        let result = parse(b"Camara;Ana;Vereador;Diaria;9;01/01/2023;0\n");
        assert!(matches!(
            result,
            Err(LoadError::ColumnCount { found: 7, .. })
        ));
    }

    #[test]
    fn test_empty_file_is_fatal() {
        let result = parse_bytes(b"", Path::new("empty.csv"));
        assert!(matches!(result, Err(LoadError::Empty(_))));
    }

    #[test]
    fn test_entities_sorted_and_distinct() {
        let table = parse(
            b"Fundo;A;R;D;1;01/01/2023;0;1\nCamara;B;R;D;1;01/01/2023;0;1\nFundo;C;R;D;1;01/01/2023;0;1\n",
        )
        .unwrap();

        assert_eq!(table.entities(), vec!["Camara", "Fundo"]);
    }

    #[test]
    fn test_load_from_disk_records_source() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(HEADER).unwrap();
        file.write_all(b"Camara;Ana;Vereador;Diaria;9;01/01/2023;0;10,00\n")
            .unwrap();

        let table = load(file.path()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.source(), Some(file.path()));
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let result = load(Path::new("does/not/exist.csv"));
        assert!(matches!(result, Err(LoadError::Io { .. })));
    }

    #[test]
    fn test_load_or_empty_degrades() {
        let table = load_or_empty(Path::new("does/not/exist.csv"));
        assert!(table.is_empty());
        assert!(table.entities().is_empty());
    }

    #[test]
    fn test_fixture_file() {
        let table = load(Path::new("test_relatorio.csv")).unwrap();

        assert_eq!(table.len(), 6);
        assert!(table
            .records()
            .iter()
            .all(|r| r.transport_amount >= 0.0 && r.allowance_amount >= 0.0));
        assert!(table.records().iter().all(|r| !r.role.is_empty()));
        assert_eq!(table.stats().invalid_dates, 1);
    }
}
