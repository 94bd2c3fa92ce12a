//! Attendance compliance: biometric punch exports in, per-day compliance
//! records and per-employee monthly statistics out.

mod classifier;
mod columns;
pub mod domain;
mod parser;
mod summary;

pub use classifier::classify;
pub use columns::AttendanceColumns;
pub use domain::{
    AttendanceNote, DailyRecord, DailyRecordView, DayStatus, EmployeeMonthlyStats,
    EmployeeStatsView, PunchEvent, RowWarning, ThresholdConfig,
};
pub use summary::{AttendanceSummary, CalendarDay};

use crate::tabular::{RecordTable, TableError};
use crate::workflows::delivery::workbook::{CellValue, WorkbookSheet};
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum AttendanceError {
    #[error("missing required column(s): {}", .columns.join(", "))]
    MissingColumn { columns: Vec<&'static str> },
    #[error(transparent)]
    Table(#[from] TableError),
}

/// Result of one upload. An upload with no usable punches yields an empty
/// report rather than an error.
#[derive(Debug, Clone, Default)]
pub struct AttendanceReport {
    pub daily: Vec<DailyRecord>,
    pub stats: Vec<EmployeeMonthlyStats>,
    pub warnings: Vec<RowWarning>,
}

impl AttendanceReport {
    pub fn is_empty(&self) -> bool {
        self.daily.is_empty()
    }

    pub fn daily_views(&self) -> Vec<DailyRecordView> {
        self.daily.iter().map(DailyRecord::to_view).collect()
    }

    pub fn stats_views(&self) -> Vec<EmployeeStatsView> {
        self.stats.iter().map(EmployeeMonthlyStats::to_view).collect()
    }

    /// `Daily Records` and `Monthly Summary` worksheets.
    pub fn sheets(&self) -> Vec<WorkbookSheet> {
        let daily = WorkbookSheet::new(
            "Daily Records",
            [
                "Employee", "Date", "First In", "Last Out", "Work Hours", "Late", "Early Exit",
                "Compliant", "Note",
            ],
        )
        .with_rows(self.daily_views().into_iter().map(|view| {
            vec![
                CellValue::from(view.employee),
                CellValue::from(view.date.format("%Y-%m-%d").to_string()),
                CellValue::from(view.first_in),
                CellValue::from(view.last_out),
                CellValue::from(view.work_hours),
                CellValue::from(view.is_late),
                CellValue::from(view.is_early_exit),
                CellValue::from(view.is_compliant),
                CellValue::from(view.note_label),
            ]
        }));

        let monthly = WorkbookSheet::new(
            "Monthly Summary",
            [
                "Employee",
                "Present Days",
                "Avg Work Hours",
                "Late Days",
                "Early Exit Days",
                "Compliant Days",
                "Attendance %",
                "Chronic Late",
                "Under Hours",
                "Total Risk Days",
                "Avg Deviation",
            ],
        )
        .with_rows(self.stats_views().into_iter().map(|view| {
            vec![
                CellValue::from(view.employee),
                CellValue::from(view.present_days),
                CellValue::from(view.avg_work_hours),
                CellValue::from(view.late_days),
                CellValue::from(view.early_exit_days),
                CellValue::from(view.compliant_days),
                CellValue::from(view.attendance_pct),
                CellValue::from(view.chronic_late),
                CellValue::from(view.under_hours),
                CellValue::from(view.total_risk_days),
                CellValue::from(view.avg_deviation),
            ]
        }));

        vec![daily, monthly]
    }
}

pub struct AttendanceImporter;

impl AttendanceImporter {
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        config: &ThresholdConfig,
    ) -> Result<AttendanceReport, AttendanceError> {
        let table = RecordTable::from_path(path)?;
        Self::from_table(&table, config)
    }

    pub fn from_reader<R: Read>(
        reader: R,
        config: &ThresholdConfig,
    ) -> Result<AttendanceReport, AttendanceError> {
        let table = RecordTable::from_csv_reader(reader)?;
        Self::from_table(&table, config)
    }

    pub fn from_table(
        table: &RecordTable,
        config: &ThresholdConfig,
    ) -> Result<AttendanceReport, AttendanceError> {
        let columns = AttendanceColumns::detect(table.headers())?;
        let (punches, warnings) = parser::parse_punches(table, columns);
        if !warnings.is_empty() {
            warn!(dropped = warnings.len(), "skipped unreadable attendance rows");
        }

        let (daily, stats) = classify(&punches, config);
        info!(
            punches = punches.len(),
            days = daily.len(),
            employees = stats.len(),
            "classified attendance"
        );

        Ok(AttendanceReport {
            daily,
            stats,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn importer_classifies_uploaded_csv() {
        let csv = "No.,Department Name,Name,Date/Time\n\
1,Ops,Alice,05/01/2026 09:52\n\
2,Ops,Alice,05/01/2026 18:05\n\
3,Ops,Bob,05/01/2026 09:15\n\
4,Ops,Bob,05/01/2026 17:00\n";
        let report = AttendanceImporter::from_reader(Cursor::new(csv), &ThresholdConfig::default())
            .expect("import succeeds");

        assert_eq!(report.daily.len(), 2);
        assert_eq!(report.daily[0].note, AttendanceNote::LateEntry);
        assert_eq!(report.daily[1].note, AttendanceNote::EarlyExit);
        assert_eq!(report.daily_views()[0].work_hours, 8.2);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn dataframe_export_with_index_column_imports() {
        let csv = ",Name,Date/Time\n0,Alice,05/01/2026 09:00\n1,Alice,05/01/2026 18:00\n";
        let report = AttendanceImporter::from_reader(Cursor::new(csv), &ThresholdConfig::default())
            .expect("index column is ignored");

        assert_eq!(report.daily.len(), 1);
        assert_eq!(report.daily[0].employee, "Alice");
        assert_eq!(report.daily[0].note, AttendanceNote::Compliant);
    }

    #[test]
    fn upload_without_valid_punches_is_empty_not_an_error() {
        let csv = "Name,Date/Time\nAlice,not a time\n";
        let report = AttendanceImporter::from_reader(Cursor::new(csv), &ThresholdConfig::default())
            .expect("import succeeds");

        assert!(report.is_empty());
        assert!(report.stats.is_empty());
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn missing_columns_surface_as_errors() {
        let err = AttendanceImporter::from_reader(
            Cursor::new("Employee,Clock\nAlice,09:00\n"),
            &ThresholdConfig::default(),
        )
        .expect_err("missing column");
        assert!(matches!(err, AttendanceError::MissingColumn { .. }));
    }

    #[test]
    fn from_path_propagates_io_errors() {
        let err = AttendanceImporter::from_path("./does-not-exist.csv", &ThresholdConfig::default())
            .expect_err("io error");
        match err {
            AttendanceError::Table(TableError::Io(_)) => {}
            other => panic!("expected io error, got {other:?}"),
        }
    }

    #[test]
    fn sheets_carry_one_row_per_record() {
        let csv = "Name,Date/Time\nAlice,2026-01-05 09:00\nAlice,2026-01-05 17:30\n";
        let report = AttendanceImporter::from_reader(Cursor::new(csv), &ThresholdConfig::default())
            .expect("import succeeds");
        let sheets = report.sheets();

        assert_eq!(sheets[0].name, "Daily Records");
        assert_eq!(sheets[0].rows.len(), 1);
        assert_eq!(sheets[1].name, "Monthly Summary");
        assert_eq!(sheets[1].rows[0][0], CellValue::Text("Alice".to_string()));
    }
}
