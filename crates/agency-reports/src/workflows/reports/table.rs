use crate::tabular::RecordTable;
use crate::workflows::delivery::workbook::{CellValue, WorkbookSheet};
use serde::Serialize;

pub const GRAND_TOTAL: &str = "Grand Total";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub label: String,
    pub values: Vec<f64>,
}

impl SummaryRow {
    pub fn new(label: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            label: label.into(),
            values,
        }
    }
}

/// Grouped aggregate whose last row is always `Grand Total`, the column-wise
/// sum of every row above it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryTable {
    pub label_header: String,
    pub metric_headers: Vec<String>,
    rows: Vec<SummaryRow>,
}

impl SummaryTable {
    /// Builds the table and appends the total. Rows shorter than the header
    /// list are padded with zeros.
    pub fn new<H, S>(label_header: impl Into<String>, metric_headers: H, rows: Vec<SummaryRow>) -> Self
    where
        H: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let metric_headers: Vec<String> = metric_headers.into_iter().map(Into::into).collect();
        let width = metric_headers.len();

        let mut rows: Vec<SummaryRow> = rows
            .into_iter()
            .map(|mut row| {
                row.values.resize(width, 0.0);
                row
            })
            .collect();

        let mut totals = vec![0.0; width];
        for row in &rows {
            for (total, value) in totals.iter_mut().zip(&row.values) {
                *total += value;
            }
        }
        rows.push(SummaryRow::new(GRAND_TOTAL, totals));

        Self {
            label_header: label_header.into(),
            metric_headers,
            rows,
        }
    }

    /// Every row including the trailing total.
    pub fn rows(&self) -> &[SummaryRow] {
        &self.rows
    }

    /// Grouped rows without the total.
    pub fn body(&self) -> &[SummaryRow] {
        &self.rows[..self.rows.len().saturating_sub(1)]
    }

    pub fn grand_total(&self) -> Option<&SummaryRow> {
        self.rows.last()
    }

    pub fn row(&self, label: &str) -> Option<&SummaryRow> {
        self.body().iter().find(|row| row.label == label)
    }

    pub fn to_sheet(&self, name: &str) -> WorkbookSheet {
        let headers = std::iter::once(self.label_header.clone()).chain(self.metric_headers.clone());
        WorkbookSheet::new(name, headers).with_rows(self.rows.iter().map(|row| {
            std::iter::once(CellValue::from(row.label.clone()))
                .chain(row.values.iter().map(|value| CellValue::from(*value)))
                .collect()
        }))
    }
}

/// Filtered source rows as a worksheet, cells kept as text.
pub fn record_sheet(name: &str, table: &RecordTable) -> WorkbookSheet {
    WorkbookSheet::new(name, table.headers().to_vec()).with_rows(
        table
            .rows()
            .iter()
            .map(|row| row.iter().map(|cell| CellValue::from(cell.as_str())).collect()),
    )
}

/// Two-column `Metric`/`Value` sheet for headline figures.
pub fn metric_sheet(name: &str, metrics: &[(&str, f64)]) -> WorkbookSheet {
    WorkbookSheet::new(name, ["Metric", "Value"]).with_rows(
        metrics
            .iter()
            .map(|(label, value)| vec![CellValue::from(*label), CellValue::from(*value)]),
    )
}
