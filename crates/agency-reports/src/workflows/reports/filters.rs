use super::{ReportError, ReportWarning};
use crate::tabular::dates::parse_date;
use crate::tabular::RecordTable;
use chrono::{Datelike, Duration, Months, NaiveDate};
use serde::Serialize;

/// Inclusive date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// `[today, today + days]`.
    pub fn upcoming(today: NaiveDate, days: i64) -> Self {
        Self {
            start: today,
            end: today + Duration::days(days),
        }
    }

    /// Range between two dates, swapped when given in reverse.
    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    /// First day of `start_month` through the last day of `end_month`.
    pub fn months(start_month: NaiveDate, end_month: NaiveDate) -> Self {
        let (first, last) = if start_month <= end_month {
            (start_month, end_month)
        } else {
            (end_month, start_month)
        };
        Self {
            start: month_start(first),
            end: month_end(last),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Rows whose `column` date falls inside the window. Blank cells are
    /// skipped quietly, unreadable ones are reported.
    pub fn apply(
        &self,
        table: &RecordTable,
        column: usize,
    ) -> (RecordTable, Vec<ReportWarning>) {
        let header = table.headers().get(column).cloned().unwrap_or_default();
        let mut warnings = Vec::new();
        let mut kept = Vec::new();

        for idx in 0..table.len() {
            let raw = table.cell(idx, Some(column));
            if raw.trim().is_empty() {
                continue;
            }
            match parse_report_date(raw) {
                Some(date) if self.contains(date) => kept.push(idx),
                Some(_) => {}
                None => {
                    warnings.push(ReportWarning::unreadable_date(table.line(idx), &header, raw))
                }
            }
        }

        (table.select_rows(&kept), warnings)
    }
}

/// Day-first date, also accepting month-only values such as `January 2026`.
pub fn parse_report_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    parse_date(value).or_else(|| parse_date(&format!("1 {value}")))
}

/// Parses `YYYY-MM` into the first day of that month.
pub fn parse_month(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", value.trim()), "%Y-%m-%d").ok()
}

pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn month_end(date: NaiveDate) -> NaiveDate {
    month_start(date)
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(date)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    /// Case-insensitive substring.
    Contains(String),
    /// Trimmed, case-sensitive equality.
    Exact(String),
    /// Exact match against any of the values.
    OneOf(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoricalFilter {
    pub column: String,
    pub matcher: Matcher,
}

impl CategoricalFilter {
    pub fn contains(column: impl Into<String>, needle: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            matcher: Matcher::Contains(needle.into()),
        }
    }

    pub fn exact(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            matcher: Matcher::Exact(value.into()),
        }
    }

    pub fn one_of(column: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            column: column.into(),
            matcher: Matcher::OneOf(values),
        }
    }

    pub fn matches(&self, value: &str) -> bool {
        let value = value.trim();
        match &self.matcher {
            Matcher::Contains(needle) => value.to_lowercase().contains(&needle.to_lowercase()),
            Matcher::Exact(expected) => value == expected.trim(),
            Matcher::OneOf(options) => options.iter().any(|option| value == option.trim()),
        }
    }

    pub fn apply(&self, table: &RecordTable) -> Result<RecordTable, ReportError> {
        let column = table
            .column(&self.column)
            .ok_or_else(|| ReportError::MissingColumn(self.column.clone()))?;
        Ok(table.filter_rows(|row| {
            self.matches(row.get(column).map(String::as_str).unwrap_or(""))
        }))
    }
}

/// Applies every filter in turn.
pub fn apply_all(
    table: &RecordTable,
    filters: &[CategoricalFilter],
) -> Result<RecordTable, ReportError> {
    filters
        .iter()
        .try_fold(table.clone(), |current, filter| filter.apply(&current))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn upcoming_window_is_inclusive() {
        let window = DateWindow::upcoming(date(2026, 1, 1), 90);
        assert_eq!(window.end, date(2026, 4, 1));
        assert!(window.contains(date(2026, 1, 1)));
        assert!(window.contains(date(2026, 4, 1)));
        assert!(!window.contains(date(2025, 12, 31)));
        assert!(!window.contains(date(2026, 4, 2)));
    }

    #[test]
    fn month_window_covers_whole_months() {
        let window = DateWindow::months(date(2026, 2, 14), date(2025, 12, 3));
        assert_eq!(window.start, date(2025, 12, 1));
        assert_eq!(window.end, date(2026, 2, 28));
        assert_eq!(parse_month("2024-02").map(month_end), Some(date(2024, 2, 29)));
    }

    #[test]
    fn apply_reports_unreadable_dates_only() {
        let table = RecordTable::new(
            vec!["Client".into(), "Visa Expiry Date".into()],
            vec![
                vec!["A".into(), "15/01/2026".into()],
                vec!["B".into(), "".into()],
                vec!["C".into(), "soon".into()],
                vec!["D".into(), "2027-01-01".into()],
            ],
        );
        let window = DateWindow::upcoming(date(2026, 1, 1), 90);
        let (kept, warnings) = window.apply(&table, 1);

        assert_eq!(kept.len(), 1);
        assert_eq!(kept.cell(0, Some(0)), "A");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].row, Some(4));
    }

    #[test]
    fn month_names_parse_as_first_day() {
        assert_eq!(parse_report_date("January 2026"), Some(date(2026, 1, 1)));
        assert_eq!(parse_report_date("Jan 2026"), Some(date(2026, 1, 1)));
    }

    #[test]
    fn contains_filter_ignores_case() {
        let filter = CategoricalFilter::contains("Visa Type", "500");
        assert!(filter.matches("Subclass 500"));
        assert!(!filter.matches("Subclass 485"));
        assert!(CategoricalFilter::contains("Course Type", "ielts").matches("IELTS + Book"));
    }

    #[test]
    fn exact_and_one_of_filters_match_whole_values() {
        assert!(CategoricalFilter::exact("Status", "Completed").matches(" Completed "));
        assert!(!CategoricalFilter::exact("Status", "Completed").matches("completed"));
        let workflows = CategoricalFilter::one_of(
            "Workflow Name",
            vec!["Student Visa".into(), "Admission".into()],
        );
        assert!(workflows.matches("Admission"));
        assert!(!workflows.matches("Admission Plus"));
    }

    #[test]
    fn missing_filter_column_is_an_error() {
        let table = RecordTable::new(vec!["Status".into()], vec![vec!["Completed".into()]]);
        let err = CategoricalFilter::exact("Owner", "x")
            .apply(&table)
            .expect_err("missing");
        assert!(matches!(err, ReportError::MissingColumn(column) if column == "Owner"));
    }
}
