use crate::utils::error::{AnalyticsError, Result};
use calamine::{Data, Range, Reader, Xlsx};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::io::Cursor;

pub const SHEET_SUMMARY: &str = "Star Ratings";
pub const SHEET_DETAIL: &str = "Detailed data";

/// Column names as declared in the quarterly extract. Order may vary between
/// releases; names may not.
pub mod columns {
    pub const SERVICE_ID: &str = "Service ID";
    pub const SERVICE_NAME: &str = "Service Name";
    pub const PROVIDER_ID: &str = "Provider ID";
    pub const PROVIDER_NAME: &str = "Provider Name";
    pub const STATE: &str = "State/Territory";
    pub const SUBURB: &str = "Service Suburb";
    pub const MMM_CODE: &str = "MMM Code";
    pub const SIZE: &str = "Size";
    pub const PLACES: &str = "Residential Places";
    pub const OVERALL_RATING: &str = "Overall Star Rating";
    pub const COMPLIANCE_RATING: &str = "Compliance rating";
    pub const STAFFING_RATING: &str = "Staffing rating";
    pub const QUALITY_RATING: &str = "Quality Measures rating";
    pub const EXPERIENCE_RATING: &str = "Residents' Experience rating";
    pub const RN_MINUTES_ACTUAL: &str = "[S] Registered Nurse Care Minutes - Actual";
    pub const RN_MINUTES_TARGET: &str = "[S] Registered Nurse Care Minutes - Target";
    pub const TOTAL_MINUTES_ACTUAL: &str = "[S] Total Care Minutes - Actual";
    pub const TOTAL_MINUTES_TARGET: &str = "[S] Total Care Minutes - Target";
    pub const DECISION_TYPE: &str = "[C] Decision type";
    pub const DECISION_APPLIED: &str = "[C] Date Decision Applied";
    pub const DECISION_ENDS: &str = "[C] Date Decision Ends";

    pub const QM_FIELDS: [&str; 7] = [
        "[QM] Pressure injuries*",
        "[QM] Restrictive practices",
        "[QM] Unplanned weight loss*",
        "[QM] Falls and major injury - falls*",
        "[QM] Falls and major injury - major injury from a fall*",
        "[QM] Medication management - polypharmacy",
        "[QM] Medication management - antipsychotic",
    ];

    pub const REQUIRED: [&str; 5] = [SERVICE_ID, SERVICE_NAME, PROVIDER_ID, PROVIDER_NAME, STATE];
}

/// Values the publisher uses for "no data". Coerced to missing, never zero,
/// so they cannot drag a mean down.
const MISSING_SENTINELS: [&str; 7] = ["", "n/a", "na", "np", "-", "not available", "null"];

/// One typed cell of the detail sheet.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
    Bool(bool),
}

/// The detail sheet as loaded: a header index plus one row of cells per
/// service. Pure data; all cleaning and derivation happens in the
/// normalizer.
#[derive(Debug, Clone)]
pub struct RawTable {
    headers: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<Vec<Cell>>,
}

impl RawTable {
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.index.contains_key(column)
    }

    fn cell(&self, row: usize, column: &str) -> Option<&Cell> {
        let col = *self.index.get(column)?;
        self.rows.get(row)?.get(col)
    }

    /// Text content of a cell, trimmed; `None` for blanks and sentinels.
    pub fn text(&self, row: usize, column: &str) -> Option<String> {
        match self.cell(row, column)? {
            Cell::Text(s) if !is_missing_sentinel(s) => Some(s.clone()),
            // Identifiers are sometimes typed as numbers in the extract.
            Cell::Number(n) if n.fract() == 0.0 => Some(format!("{}", *n as i64)),
            Cell::Number(n) => Some(n.to_string()),
            Cell::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Numeric content of a cell. Text cells are parsed with `%` suffixes and
    /// thousands separators stripped; sentinel values ("N/A", "NP", blank,
    /// "-") and unparseable text coerce to missing.
    pub fn number(&self, row: usize, column: &str) -> Option<f64> {
        match self.cell(row, column)? {
            Cell::Number(n) => Some(*n),
            Cell::Text(s) => parse_numeric_text(s),
            _ => None,
        }
    }

    /// Date content of a cell. Text dates tolerate the formats seen across
    /// quarterly releases.
    pub fn date(&self, row: usize, column: &str) -> Option<NaiveDate> {
        match self.cell(row, column)? {
            Cell::Date(d) => Some(*d),
            Cell::Text(s) => parse_date_text(s),
            _ => None,
        }
    }
}

fn is_missing_sentinel(text: &str) -> bool {
    let t = text.trim().to_ascii_lowercase();
    MISSING_SENTINELS.contains(&t.as_str())
}

fn parse_numeric_text(text: &str) -> Option<f64> {
    if is_missing_sentinel(text) {
        return None;
    }
    let cleaned = text.trim().trim_end_matches('%').replace(',', "");
    cleaned.trim().parse::<f64>().ok()
}

fn parse_date_text(text: &str) -> Option<NaiveDate> {
    let t = text.trim();
    for fmt in ["%Y-%m-%d", "%d/%m/%Y", "%d %B %Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(t, fmt) {
            return Some(d);
        }
    }
    None
}

fn to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Cell::Empty
            } else {
                Cell::Text(trimmed.to_string())
            }
        }
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(d) => Cell::Date(d.date()),
            None => Cell::Empty,
        },
        Data::DateTimeIso(s) => match parse_date_text(&s[..s.len().min(10)]) {
            Some(d) => Cell::Date(d),
            None => Cell::Empty,
        },
        // Cell-level errors (#DIV/0! etc.) degrade to missing.
        Data::Error(_) | Data::DurationIso(_) => Cell::Empty,
    }
}

/// Builds a [`RawTable`] from a sheet range: first row is the header,
/// everything below is data. Fails when a required column is absent.
pub fn table_from_range(range: &Range<Data>) -> Result<RawTable> {
    let mut rows_iter = range.rows();
    let header_row = rows_iter.next().ok_or_else(|| AnalyticsError::MissingColumn {
        sheet: SHEET_DETAIL.to_string(),
        column: columns::SERVICE_ID.to_string(),
    })?;

    let headers: Vec<String> = header_row
        .iter()
        .map(|c| match c {
            Data::String(s) => s.trim().to_string(),
            other => other.to_string().trim().to_string(),
        })
        .collect();

    let mut index = HashMap::new();
    for (i, name) in headers.iter().enumerate() {
        // First occurrence wins if a header repeats.
        index.entry(name.clone()).or_insert(i);
    }

    for required in columns::REQUIRED {
        if !index.contains_key(required) {
            return Err(AnalyticsError::MissingColumn {
                sheet: SHEET_DETAIL.to_string(),
                column: required.to_string(),
            });
        }
    }

    let rows: Vec<Vec<Cell>> = rows_iter
        .map(|row| row.iter().map(to_cell).collect())
        .collect();

    tracing::debug!(
        "Loaded '{}': {} columns, {} data rows",
        SHEET_DETAIL,
        headers.len(),
        rows.len()
    );

    Ok(RawTable { headers, index, rows })
}

/// Opens the extract from raw bytes and returns the detail sheet as a typed
/// table. Both published sheets must exist; only "Detailed data" feeds the
/// analytics.
pub fn load_workbook(bytes: &[u8]) -> Result<RawTable> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))?;

    let names = workbook.sheet_names();
    for required in [SHEET_SUMMARY, SHEET_DETAIL] {
        if !names.iter().any(|n| n == required) {
            return Err(AnalyticsError::MissingSheet {
                sheet: required.to_string(),
            });
        }
    }

    let range = workbook.worksheet_range(SHEET_DETAIL)?;
    table_from_range(&range)
}
