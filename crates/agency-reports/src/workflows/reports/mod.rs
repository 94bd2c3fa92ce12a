//! Filter-and-aggregate report builders. Each report narrows a
//! [`RecordTable`](crate::tabular::RecordTable) by date window and categorical
//! filters, then groups what is left into [`SummaryTable`]s.

pub mod coe;
pub mod filters;
pub mod financial;
pub mod ielts;
pub mod leads;
mod table;
pub mod visa;

pub use filters::{CategoricalFilter, DateWindow, Matcher};
pub use table::{metric_sheet, record_sheet, SummaryRow, SummaryTable, GRAND_TOTAL};

use crate::tabular::TableError;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error(transparent)]
    Table(#[from] TableError),
    #[error("missing column: {0}")]
    MissingColumn(String),
    #[error("no expiry date column found; expected one of {0}")]
    NoDateColumn(String),
    #[error("no transactions found for {0}")]
    UnknownMonth(String),
}

/// Non-fatal data problem reported next to a built report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportWarning {
    /// Line in the source file, header counted as line 1.
    pub row: Option<usize>,
    pub column: String,
    pub reason: String,
}

impl ReportWarning {
    pub(crate) fn unreadable_date(line: usize, column: &str, raw: &str) -> Self {
        Self {
            row: Some(line),
            column: column.to_string(),
            reason: format!("unreadable date '{}'", raw.trim()),
        }
    }

    pub(crate) fn unreadable_amount(line: usize, column: &str, raw: &str) -> Self {
        Self {
            row: Some(line),
            column: column.to_string(),
            reason: format!("unreadable amount '{}'", raw.trim()),
        }
    }

    pub(crate) fn column_skipped(column: &str, reason: impl Into<String>) -> Self {
        Self {
            row: None,
            column: column.to_string(),
            reason: reason.into(),
        }
    }
}

/// Reads a money cell, ignoring thousands separators. Blank cells are zero.
pub(crate) fn parse_amount(value: &str) -> Option<f64> {
    let cleaned: String = value
        .chars()
        .filter(|ch| *ch != ',' && !ch.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return Some(0.0);
    }
    cleaned.parse::<f64>().ok()
}
