use chrono::{NaiveDate, NaiveDateTime};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::schema::{Metric, COMPANY_COL, DATE_COL, REQUIRED_COLUMNS};
use super::upload::RawTable;

/// Markers accepted in place of a P/E ratio when it is undefined.
const UNDEFINED_MARKERS: [&str; 5] = ["NA", "N/A", "NaN", "null", "-"];

/// Largest accepted magnitude of a monetary cell, in millions.
pub const MAX_MONETARY_MILLIONS: f64 = 1e15;

/// Date layouts accepted on upload; the first one is canonical.
const DATE_LAYOUTS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// One problem found in an uploaded table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Defect {
    /// Required columns are absent. Reported alone; no other checks run.
    MissingColumns { columns: Vec<String> },
    /// At least one `Date` cell is not a calendar date.
    InvalidDates { rows: usize },
    /// At least one cell of a numeric field is not a number.
    NonNumeric { field: Metric, rows: usize },
    /// At least one monetary cell exceeds `MAX_MONETARY_MILLIONS` in magnitude.
    OutOfRange { field: Metric, rows: usize },
    /// At least one `Company` cell is blank.
    BlankCompany { rows: usize },
}

impl fmt::Display for Defect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Defect::MissingColumns { columns } => {
                write!(f, "Missing required columns: {}", columns.join(", "))
            }
            Defect::InvalidDates { rows } => write!(
                f,
                "Invalid date format in {DATE_COL} column ({rows} row(s)). Please use YYYY-MM-DD format"
            ),
            Defect::NonNumeric { field, rows } => write!(
                f,
                "Invalid numeric values in {field} column ({rows} row(s))"
            ),
            Defect::OutOfRange { field, rows } => write!(
                f,
                "Out-of-range values in {field} column ({rows} row(s)). Amounts are in millions and must not exceed {MAX_MONETARY_MILLIONS:e} in magnitude"
            ),
            Defect::BlankCompany { rows } => {
                write!(f, "Empty {COMPANY_COL} value in {rows} row(s)")
            }
        }
    }
}

/// Check an uploaded table against the record schema.
///
/// An empty result means the table can be normalized. Column completeness
/// short-circuits; every other check runs and reports independently.
pub fn validate(raw: &RawTable) -> Vec<Defect> {
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !raw.has_column(c))
        .map(|c| (*c).to_string())
        .collect();
    if !missing.is_empty() {
        return vec![Defect::MissingColumns { columns: missing }];
    }

    let mut defects = Vec::new();

    let bad_dates = count_bad(raw, DATE_COL, |v| v.is_some_and(|s| parse_date(s).is_some()));
    if bad_dates > 0 {
        defects.push(Defect::InvalidDates { rows: bad_dates });
    }

    for field in Metric::ALL {
        let bad = count_bad(raw, field.column(), |v| match v {
            Some(s) => parse_number(s, field.nullable()).is_some(),
            None => field.nullable(),
        });
        if bad > 0 {
            defects.push(Defect::NonNumeric { field, rows: bad });
        }
        if field.monetary() {
            let out_of_range = count_bad(raw, field.column(), |v| {
                !matches!(
                    v.and_then(|s| parse_number(s, false)),
                    Some(Some(n)) if n.abs() > MAX_MONETARY_MILLIONS
                )
            });
            if out_of_range > 0 {
                defects.push(Defect::OutOfRange {
                    field,
                    rows: out_of_range,
                });
            }
        }
    }

    let blank = count_bad(raw, COMPANY_COL, |v| v.is_some());
    if blank > 0 {
        defects.push(Defect::BlankCompany { rows: blank });
    }

    defects
}

/// Number of cells in `column` failing `ok`. A column that cannot be read as
/// text counts every row as bad.
fn count_bad(raw: &RawTable, column: &str, ok: impl Fn(Option<&str>) -> bool) -> usize {
    match raw.values(column) {
        Ok(values) => values.into_iter().filter(|v| !ok(*v)).count(),
        Err(_) => raw.height(),
    }
}

/// Parse a date cell. ISO datetimes are accepted and truncated to the date.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    DATE_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDate::parse_from_str(s, layout).ok())
        .or_else(|| {
            ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"]
                .iter()
                .find_map(|layout| NaiveDateTime::parse_from_str(s, layout).ok())
                .map(|dt| dt.date())
        })
}

/// Parse a numeric cell. Thousands separators and a leading `$` are tolerated.
///
/// Returns `Some(None)` for an undefined marker when `nullable` is set, and
/// `None` when the text is not a finite number.
pub fn parse_number(s: &str, nullable: bool) -> Option<Option<f64>> {
    let s = s.trim();
    if nullable && (s.is_empty() || UNDEFINED_MARKERS.iter().any(|m| m.eq_ignore_ascii_case(s))) {
        return Some(None);
    }
    let cleaned: String = s
        .strip_prefix('$')
        .unwrap_or(s)
        .chars()
        .filter(|c| *c != ',')
        .collect();
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(Some)
}
