// Query Engine
// Pure recompute of the dashboard for an (entity, month range) filter pair.

use crate::error::QueryError;
use crate::loader::{Record, Table};
use crate::locale::{format_currency, format_date, MONTH_LABELS};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Wire value selecting every entity.
pub const ALL_ENTITIES: &str = "All";

pub const TOP_PAYEES: usize = 10;
pub const TOP_ROLES: usize = 15;
pub const DETAIL_ROWS: usize = 20;

// ============================================================================
// FILTERS
// ============================================================================

/// Entity selector: everything, or one exact entity name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum EntityFilter {
    #[default]
    All,
    Only(String),
}

impl EntityFilter {
    /// Map the selector's wire value; `"All"` selects every entity.
    pub fn parse(value: &str) -> Self {
        if value == ALL_ENTITIES {
            EntityFilter::All
        } else {
            EntityFilter::Only(value.to_string())
        }
    }

    pub fn matches(&self, entity: &str) -> bool {
        match self {
            EntityFilter::All => true,
            EntityFilter::Only(name) => name == entity,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EntityFilter::All => ALL_ENTITIES,
            EntityFilter::Only(name) => name,
        }
    }
}

/// Inclusive month range, both ends in 1..=12 and `min <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct MonthRange {
    min: u32,
    max: u32,
}

impl MonthRange {
    pub const FULL_YEAR: MonthRange = MonthRange { min: 1, max: 12 };

    pub fn new(min: u32, max: u32) -> Result<Self, QueryError> {
        for month in [min, max] {
            if !(1..=12).contains(&month) {
                return Err(QueryError::MonthOutOfRange(month));
            }
        }
        if min > max {
            return Err(QueryError::InvertedRange { min, max });
        }
        Ok(MonthRange { min, max })
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    /// Records without a month never fall inside any range.
    pub fn contains(&self, month: Option<u32>) -> bool {
        month.is_some_and(|m| self.min <= m && m <= self.max)
    }

    /// Short label such as `Mar-Jun`.
    pub fn label(&self) -> String {
        let name = |m: u32| MONTH_LABELS[(m - 1) as usize];
        if self.min == self.max {
            name(self.min).to_string()
        } else {
            format!("{}-{}", name(self.min), name(self.max))
        }
    }
}

impl Default for MonthRange {
    fn default() -> Self {
        MonthRange::FULL_YEAR
    }
}

// ============================================================================
// VIEW TYPES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub record_count: usize,
    pub total: f64,
    /// None when nothing matched the filters
    pub mean: Option<f64>,
    pub max: Option<f64>,
    pub distinct_payees: usize,
    pub total_display: String,
    pub mean_display: String,
    pub max_display: String,
}

impl Summary {
    fn empty() -> Self {
        let zero = format_currency(0.0);
        Summary {
            record_count: 0,
            total: 0.0,
            mean: None,
            max: None,
            distinct_payees: 0,
            total_display: zero.clone(),
            mean_display: zero.clone(),
            max_display: zero,
        }
    }
}

/// Sum of daily allowances for one group key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupTotal {
    pub key: String,
    pub total: f64,
    pub total_display: String,
}

/// One line of the ranked detail table, ready for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailRow {
    pub entity: String,
    pub payee: String,
    pub role: String,
    pub issue_date: String,
    pub amount: f64,
    pub amount_display: String,
}

impl From<&Record> for DetailRow {
    fn from(r: &Record) -> Self {
        DetailRow {
            entity: r.entity.clone(),
            payee: r.payee.clone(),
            role: r.role.clone(),
            issue_date: r.issue_date.map(format_date).unwrap_or_default(),
            amount: r.allowance_amount,
            amount_display: format_currency(r.allowance_amount),
        }
    }
}

/// Everything the presentation layer renders for one filter state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub entity_filter: String,
    pub month_range: MonthRange,
    pub summary: Summary,
    pub entity_totals: Vec<GroupTotal>,
    pub top_payees: Vec<GroupTotal>,
    pub top_roles: Vec<GroupTotal>,
    pub detail: Vec<DetailRow>,
}

impl DashboardView {
    pub fn empty(entity: &EntityFilter, months: MonthRange) -> Self {
        DashboardView {
            entity_filter: entity.as_str().to_string(),
            month_range: months,
            summary: Summary::empty(),
            entity_totals: Vec::new(),
            top_payees: Vec::new(),
            top_roles: Vec::new(),
            detail: Vec::new(),
        }
    }
}

// ============================================================================
// ENGINE
// ============================================================================

/// Records matching both filters, in table order.
pub fn filter_records<'a>(
    table: &'a Table,
    entity: &EntityFilter,
    months: MonthRange,
) -> Vec<&'a Record> {
    table
        .records()
        .iter()
        .filter(|r| entity.matches(&r.entity) && months.contains(r.month()))
        .collect()
}

/// Build the dashboard for one filter state.
///
/// Rankings use a stable sort, so equal totals keep the order in which their
/// key first appears in the table.
pub fn query(table: &Table, entity: &EntityFilter, months: MonthRange) -> DashboardView {
    let filtered = filter_records(table, entity, months);
    if filtered.is_empty() {
        return DashboardView::empty(entity, months);
    }

    DashboardView {
        entity_filter: entity.as_str().to_string(),
        month_range: months,
        summary: summarize(&filtered),
        entity_totals: group_totals(&filtered, |r| Some(r.entity.as_str())),
        top_payees: top_n(group_totals(&filtered, payee_key), TOP_PAYEES),
        top_roles: top_n(group_totals(&filtered, |r| Some(r.role.as_str())), TOP_ROLES),
        detail: detail_rows(&filtered),
    }
}

// Blank payees are left out of payee grouping and counting
fn payee_key(r: &Record) -> Option<&str> {
    Some(r.payee.as_str()).filter(|p| !p.trim().is_empty())
}

fn summarize(records: &[&Record]) -> Summary {
    let total: f64 = records.iter().map(|r| r.allowance_amount).sum();
    let mean = total / records.len() as f64;
    let max = records
        .iter()
        .map(|r| r.allowance_amount)
        .fold(f64::MIN, f64::max);
    let distinct_payees = records
        .iter()
        .filter_map(|r| payee_key(r))
        .collect::<HashSet<_>>()
        .len();

    Summary {
        record_count: records.len(),
        total,
        mean: Some(mean),
        max: Some(max),
        distinct_payees,
        total_display: format_currency(total),
        mean_display: format_currency(mean),
        max_display: format_currency(max),
    }
}

/// Sum allowances per key, in first-seen key order.
fn group_totals<'a, F>(records: &[&'a Record], key: F) -> Vec<GroupTotal>
where
    F: Fn(&'a Record) -> Option<&'a str>,
{
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut sums: Vec<(&str, f64)> = Vec::new();

    for &record in records {
        let Some(k) = key(record) else { continue };
        let slot = *index.entry(k).or_insert_with(|| {
            sums.push((k, 0.0));
            sums.len() - 1
        });
        sums[slot].1 += record.allowance_amount;
    }

    sums.into_iter()
        .map(|(k, total)| GroupTotal {
            key: k.to_string(),
            total,
            total_display: format_currency(total),
        })
        .collect()
}

fn top_n(mut groups: Vec<GroupTotal>, n: usize) -> Vec<GroupTotal> {
    groups.sort_by(|a, b| b.total.total_cmp(&a.total));
    groups.truncate(n);
    groups
}

fn detail_rows(records: &[&Record]) -> Vec<DetailRow> {
    let mut ranked = records.to_vec();
    ranked.sort_by(|a, b| b.allowance_amount.total_cmp(&a.allowance_amount));
    ranked
        .into_iter()
        .take(DETAIL_ROWS)
        .map(DetailRow::from)
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
