use super::filters::{apply_all, CategoricalFilter, DateWindow};
use super::table::{record_sheet, SummaryRow, SummaryTable};
use super::{ReportError, ReportWarning};
use crate::tabular::RecordTable;
use crate::workflows::delivery::workbook::WorkbookSheet;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

pub const EXPIRY_COLUMN: &str = "Visa Expiry Date";
pub const VISA_TYPE_COLUMN: &str = "Visa Type";
pub const WINDOW_DAYS: i64 = 90;

pub const SHEET_ALL: &str = "All < 3 Months";
pub const SHEET_500: &str = "SC 500 < 3 Months";
pub const SHEET_485: &str = "SC 485 < 3 Months";

#[derive(Debug, Clone)]
pub struct VisaReport {
    pub window: DateWindow,
    pub all: RecordTable,
    pub subclass_500: RecordTable,
    pub subclass_485: RecordTable,
    pub by_visa_type: SummaryTable,
    pub warnings: Vec<ReportWarning>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VisaReportSummary {
    pub window: DateWindow,
    pub total: usize,
    pub subclass_500: usize,
    pub subclass_485: usize,
    pub by_visa_type: SummaryTable,
    pub warnings: Vec<ReportWarning>,
}

/// Clients whose visa expires inside `window`, split by subclass.
pub fn build(
    records: &RecordTable,
    window: &DateWindow,
    filters: &[CategoricalFilter],
) -> Result<VisaReport, ReportError> {
    let columns = records.require_columns(&[EXPIRY_COLUMN, VISA_TYPE_COLUMN])?;
    let (expiry, visa_type) = (columns[0], columns[1]);

    let filtered = apply_all(records, filters)?;
    let (all, warnings) = window.apply(&filtered, expiry);
    let subclass_500 = CategoricalFilter::contains(VISA_TYPE_COLUMN, "500").apply(&all)?;
    let subclass_485 = CategoricalFilter::contains(VISA_TYPE_COLUMN, "485").apply(&all)?;

    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for idx in 0..all.len() {
        let label = all.cell(idx, Some(visa_type)).trim();
        let label = if label.is_empty() { "Unknown" } else { label };
        *counts.entry(label.to_string()).or_default() += 1;
    }
    let by_visa_type = SummaryTable::new(
        "Visa Type",
        ["Clients"],
        counts
            .into_iter()
            .map(|(label, count)| SummaryRow::new(label, vec![count as f64]))
            .collect(),
    );

    info!(
        expiring = all.len(),
        subclass_500 = subclass_500.len(),
        subclass_485 = subclass_485.len(),
        "built visa expiry report"
    );

    Ok(VisaReport {
        window: *window,
        all,
        subclass_500,
        subclass_485,
        by_visa_type,
        warnings,
    })
}

impl VisaReport {
    pub fn sheets(&self) -> Vec<WorkbookSheet> {
        vec![
            record_sheet(SHEET_ALL, &self.all),
            record_sheet(SHEET_500, &self.subclass_500),
            record_sheet(SHEET_485, &self.subclass_485),
        ]
    }

    pub fn summary(&self) -> VisaReportSummary {
        VisaReportSummary {
            window: self.window,
            total: self.all.len(),
            subclass_500: self.subclass_500.len(),
            subclass_485: self.subclass_485.len(),
            by_visa_type: self.by_visa_type.clone(),
            warnings: self.warnings.clone(),
        }
    }
}
