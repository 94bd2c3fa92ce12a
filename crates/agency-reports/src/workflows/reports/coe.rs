use super::filters::{apply_all, parse_report_date, CategoricalFilter, DateWindow};
use super::table::{record_sheet, SummaryRow, SummaryTable};
use super::{ReportError, ReportWarning};
use crate::tabular::RecordTable;
use crate::workflows::delivery::workbook::WorkbookSheet;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

pub const DATE_CANDIDATES: [&str; 5] = [
    "COE End Date",
    "Visa Expiry Date",
    "End Date",
    "Expiry Date",
    "COE End",
];
pub const WINDOW_DAYS: i64 = 180;

pub const SHEET_ALL: &str = "All Students";
pub const SHEET_EXPIRING: &str = "Expiring Soon";

/// Picks the expiry column: a known header first, then any header naming a
/// date or expiry together with an end or COE.
pub fn detect_date_column(headers: &[String]) -> Option<usize> {
    DATE_CANDIDATES
        .iter()
        .find_map(|candidate| headers.iter().position(|header| header == candidate))
        .or_else(|| {
            headers.iter().position(|header| {
                let lowered = header.to_lowercase();
                (lowered.contains("date") || lowered.contains("expiry"))
                    && (lowered.contains("end") || lowered.contains("coe"))
            })
        })
}

#[derive(Debug, Clone)]
pub struct CoeReport {
    pub window: DateWindow,
    pub date_column: String,
    pub all: RecordTable,
    pub expiring: RecordTable,
    pub by_month: SummaryTable,
    pub warnings: Vec<ReportWarning>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CoeReportSummary {
    pub window: DateWindow,
    pub date_column: String,
    pub total_students: usize,
    pub expiring: usize,
    pub by_month: SummaryTable,
    pub warnings: Vec<ReportWarning>,
}

pub fn build(
    records: &RecordTable,
    window: &DateWindow,
    filters: &[CategoricalFilter],
) -> Result<CoeReport, ReportError> {
    let date_idx = detect_date_column(records.headers())
        .ok_or_else(|| ReportError::NoDateColumn(DATE_CANDIDATES.join(", ")))?;
    let date_column = records.headers()[date_idx].clone();

    let all = apply_all(records, filters)?;
    let (expiring, warnings) = window.apply(&all, date_idx);

    let mut months: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for idx in 0..expiring.len() {
        if let Some(date) = parse_report_date(expiring.cell(idx, Some(date_idx))) {
            let month = NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date);
            *months.entry(month).or_default() += 1;
        }
    }
    let by_month = SummaryTable::new(
        "Expiry Month",
        ["Students"],
        months
            .into_iter()
            .map(|(month, count)| SummaryRow::new(month.format("%B %Y").to_string(), vec![count as f64]))
            .collect(),
    );

    info!(
        students = all.len(),
        expiring = expiring.len(),
        column = %date_column,
        "built COE expiry report"
    );

    Ok(CoeReport {
        window: *window,
        date_column,
        all,
        expiring,
        by_month,
        warnings,
    })
}

impl CoeReport {
    /// `Expiring Soon` is left out when nothing expires in the window.
    pub fn sheets(&self) -> Vec<WorkbookSheet> {
        let mut sheets = vec![record_sheet(SHEET_ALL, &self.all)];
        if !self.expiring.is_empty() {
            sheets.push(record_sheet(SHEET_EXPIRING, &self.expiring));
        }
        sheets
    }

    pub fn summary(&self) -> CoeReportSummary {
        CoeReportSummary {
            window: self.window,
            date_column: self.date_column.clone(),
            total_students: self.all.len(),
            expiring: self.expiring.len(),
            by_month: self.by_month.clone(),
            warnings: self.warnings.clone(),
        }
    }
}
