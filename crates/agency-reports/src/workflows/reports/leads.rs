use super::filters::{apply_all, CategoricalFilter, DateWindow};
use super::table::{SummaryRow, SummaryTable};
use super::{ReportError, ReportWarning};
use crate::tabular::RecordTable;
use crate::workflows::delivery::workbook::WorkbookSheet;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

pub const STATUS_COLUMN: &str = "Status";
pub const WORKFLOW_COLUMN: &str = "Workflow Name";
pub const OWNER_COLUMN: &str = "Application Owner";
pub const CLIENT_ID_COLUMN: &str = "Internal Client ID";
pub const LAST_UPDATED_COLUMN: &str = "Last Updated";

pub const IN_PROGRESS: &str = "In Progress";
pub const DEFAULT_COMPLETED_STATUS: &str = "Completed";
pub const UNASSIGNED: &str = "Unassigned";

pub const SHEET_SUMMARY: &str = "Summary";
pub const SHEET_COMPLETED: &str = "Completed Apps";

const MIGRATION_KEYWORDS: [&str; 3] = ["migration service", "skills assessment", "state government"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WorkflowKind {
    Migration,
    Admission,
}

impl WorkflowKind {
    pub fn classify(workflow: &str) -> Self {
        let lowered = workflow.to_lowercase();
        if MIGRATION_KEYWORDS
            .iter()
            .any(|keyword| lowered.contains(keyword))
        {
            WorkflowKind::Migration
        } else {
            WorkflowKind::Admission
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            WorkflowKind::Migration => "Migration",
            WorkflowKind::Admission => "Admission",
        }
    }
}

/// Selection for the completed-applications summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedSelection {
    pub status: String,
    /// Applied to `Last Updated` when present in the file.
    pub window: Option<DateWindow>,
    /// Exact workflow names; empty keeps every workflow.
    pub workflows: Vec<String>,
}

impl Default for CompletedSelection {
    fn default() -> Self {
        Self {
            status: DEFAULT_COMPLETED_STATUS.to_string(),
            window: None,
            workflows: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LeadReport {
    pub in_progress: RecordTable,
    pub in_progress_summary: SummaryTable,
    pub completed: RecordTable,
    pub completed_summary: SummaryTable,
    pub warnings: Vec<ReportWarning>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeadReportSummary {
    pub in_progress: usize,
    pub completed: usize,
    pub in_progress_summary: SummaryTable,
    pub completed_summary: SummaryTable,
    pub warnings: Vec<ReportWarning>,
}

pub fn build(
    records: &RecordTable,
    selection: &CompletedSelection,
    filters: &[CategoricalFilter],
) -> Result<LeadReport, ReportError> {
    let columns = records.require_columns(&[
        STATUS_COLUMN,
        WORKFLOW_COLUMN,
        OWNER_COLUMN,
        CLIENT_ID_COLUMN,
    ])?;
    let (workflow, owner, client) = (columns[1], columns[2], columns[3]);

    let filtered = apply_all(records, filters)?;
    let mut warnings = Vec::new();

    let in_progress = CategoricalFilter::exact(STATUS_COLUMN, IN_PROGRESS).apply(&filtered)?;
    let in_progress_summary = owner_funnel(&in_progress, owner, workflow, client);

    let mut completed =
        CategoricalFilter::exact(STATUS_COLUMN, selection.status.clone()).apply(&filtered)?;
    if let Some(window) = &selection.window {
        match completed.column(LAST_UPDATED_COLUMN) {
            Some(updated) => {
                let (kept, skipped) = window.apply(&completed, updated);
                completed = kept;
                warnings.extend(skipped);
            }
            None => {
                warn!(column = LAST_UPDATED_COLUMN, "date range ignored; column not present");
                warnings.push(ReportWarning::column_skipped(
                    LAST_UPDATED_COLUMN,
                    "column not present; date range ignored",
                ));
            }
        }
    }
    if !selection.workflows.is_empty() {
        completed = CategoricalFilter::one_of(WORKFLOW_COLUMN, selection.workflows.clone())
            .apply(&completed)?;
    }

    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for idx in 0..completed.len() {
        *counts.entry(owner_label(&completed, idx, owner)).or_default() += 1;
    }
    let completed_summary = SummaryTable::new(
        OWNER_COLUMN,
        ["Application Count"],
        counts
            .into_iter()
            .map(|(name, count)| SummaryRow::new(name, vec![count as f64]))
            .collect(),
    );

    info!(
        in_progress = in_progress.len(),
        completed = completed.len(),
        "built lead funnel report"
    );

    Ok(LeadReport {
        in_progress,
        in_progress_summary,
        completed,
        completed_summary,
        warnings,
    })
}

#[derive(Default)]
struct OwnerTally {
    clients: BTreeSet<String>,
    applications: usize,
    migration: usize,
    admission: usize,
}

fn owner_funnel(table: &RecordTable, owner: usize, workflow: usize, client: usize) -> SummaryTable {
    let mut owners: BTreeMap<String, OwnerTally> = BTreeMap::new();
    for idx in 0..table.len() {
        let tally = owners.entry(owner_label(table, idx, owner)).or_default();
        tally.clients.insert(table.cell(idx, Some(client)).trim().to_string());
        tally.applications += 1;
        match WorkflowKind::classify(table.cell(idx, Some(workflow))) {
            WorkflowKind::Migration => tally.migration += 1,
            WorkflowKind::Admission => tally.admission += 1,
        }
    }

    SummaryTable::new(
        OWNER_COLUMN,
        [
            "Distinct Clients",
            "Total Applications",
            WorkflowKind::Migration.label(),
            WorkflowKind::Admission.label(),
        ],
        owners
            .into_iter()
            .map(|(name, tally)| {
                SummaryRow::new(
                    name,
                    vec![
                        tally.clients.len() as f64,
                        tally.applications as f64,
                        tally.migration as f64,
                        tally.admission as f64,
                    ],
                )
            })
            .collect(),
    )
}

fn owner_label(table: &RecordTable, idx: usize, owner: usize) -> String {
    let name = table.cell(idx, Some(owner)).trim();
    if name.is_empty() {
        UNASSIGNED.to_string()
    } else {
        name.to_string()
    }
}

impl LeadReport {
    pub fn sheets(&self) -> Vec<WorkbookSheet> {
        vec![
            self.in_progress_summary.to_sheet(SHEET_SUMMARY),
            self.completed_summary.to_sheet(SHEET_COMPLETED),
        ]
    }

    pub fn summary(&self) -> LeadReportSummary {
        LeadReportSummary {
            in_progress: self.in_progress.len(),
            completed: self.completed.len(),
            in_progress_summary: self.in_progress_summary.clone(),
            completed_summary: self.completed_summary.clone(),
            warnings: self.warnings.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Cursor;

    fn applications() -> RecordTable {
        RecordTable::from_csv_reader(Cursor::new(
            "Status,Workflow Name,Application Owner,Internal Client ID,Last Updated\n\
In Progress,Migration Service - 190,Asha,C1,01/03/2026\n\
In Progress,University Admission,Asha,C1,02/03/2026\n\
In Progress,Skills Assessment,Asha,C2,03/03/2026\n\
In Progress,VET Admission,Ravi,C3,04/03/2026\n\
In Progress,State Government Nomination,,C4,05/03/2026\n\
Completed,University Admission,Ravi,C5,10/02/2026\n\
Completed,Migration Service - 491,Ravi,C6,15/03/2026\n\
Completed,University Admission,Asha,C7,20/03/2026\n\
Discontinued,University Admission,Asha,C8,20/03/2026\n",
        ))
        .expect("csv")
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn workflow_keywords_decide_migration() {
        assert_eq!(WorkflowKind::classify("Skills Assessment - ACS"), WorkflowKind::Migration);
        assert_eq!(WorkflowKind::classify("STATE GOVERNMENT nomination"), WorkflowKind::Migration);
        assert_eq!(WorkflowKind::classify("Migration"), WorkflowKind::Admission);
        assert_eq!(WorkflowKind::classify("University Admission"), WorkflowKind::Admission);
    }

    #[test]
    fn in_progress_funnel_per_owner() {
        let report = build(&applications(), &CompletedSelection::default(), &[]).expect("report");

        let asha = report.in_progress_summary.row("Asha").expect("asha");
        assert_eq!(asha.values, vec![2.0, 3.0, 2.0, 1.0]);
        let unassigned = report.in_progress_summary.row(UNASSIGNED).expect("unassigned");
        assert_eq!(unassigned.values, vec![1.0, 1.0, 1.0, 0.0]);

        let labels: Vec<&str> = report
            .in_progress_summary
            .body()
            .iter()
            .map(|row| row.label.as_str())
            .collect();
        assert_eq!(labels, vec!["Asha", "Ravi", UNASSIGNED]);

        let total = report.in_progress_summary.grand_total().expect("total");
        assert_eq!(total.values, vec![4.0, 5.0, 3.0, 2.0]);
    }

    #[test]
    fn completed_summary_honours_window_and_workflows() {
        let selection = CompletedSelection {
            window: Some(DateWindow::between(date(2026, 3, 1), date(2026, 3, 31))),
            workflows: vec!["University Admission".into()],
            ..CompletedSelection::default()
        };
        let report = build(&applications(), &selection, &[]).expect("report");

        assert_eq!(report.completed.len(), 1);
        assert_eq!(report.completed_summary.row("Asha").expect("asha").values, vec![1.0]);
        assert!(report.completed_summary.row("Ravi").is_none());
    }

    #[test]
    fn missing_last_updated_skips_window_with_warning() {
        let table = RecordTable::from_csv_reader(Cursor::new(
            "Status,Workflow Name,Application Owner,Internal Client ID\n\
Completed,University Admission,Ravi,C5\n",
        ))
        .expect("csv");
        let selection = CompletedSelection {
            window: Some(DateWindow::between(date(2026, 3, 1), date(2026, 3, 31))),
            ..CompletedSelection::default()
        };
        let report = build(&table, &selection, &[]).expect("report");
        assert_eq!(report.completed.len(), 1);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].row, None);
    }

    #[test]
    fn required_columns_are_checked() {
        let table = RecordTable::new(vec!["Status".into(), "Workflow Name".into()], Vec::new());
        let err = build(&table, &CompletedSelection::default(), &[]).expect_err("missing");
        assert_eq!(
            err.to_string(),
            "missing columns: Application Owner, Internal Client ID"
        );
    }

    #[test]
    fn sheets_are_summary_then_completed() {
        let report = build(&applications(), &CompletedSelection::default(), &[]).expect("report");
        let names: Vec<String> = report.sheets().into_iter().map(|sheet| sheet.name).collect();
        assert_eq!(names, vec![SHEET_SUMMARY.to_string(), SHEET_COMPLETED.to_string()]);
    }
}
