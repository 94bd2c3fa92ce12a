use super::domain::{round1, DayStatus, EmployeeMonthlyStats, EmployeeStatsView};
use super::AttendanceReport;
use chrono::NaiveDate;
use serde::Serialize;
use std::cmp::Ordering;

const LEADERBOARD_SIZE: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct AttendanceSummary {
    pub employees: usize,
    pub avg_attendance_pct: f64,
    pub avg_work_hours: f64,
    pub chronic_late_pct: f64,
    pub under_hours_pct: f64,
    pub top_compliant: Vec<EmployeeStatsView>,
    pub top_risk: Vec<EmployeeStatsView>,
    pub chronic_late: Vec<EmployeeStatsView>,
    pub under_hours: Vec<EmployeeStatsView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub status: DayStatus,
    pub status_label: String,
    pub note_label: String,
    pub work_hours: f64,
}

impl AttendanceReport {
    pub fn summary(&self) -> AttendanceSummary {
        let employees = self.stats.len();

        let top_compliant = ranked(&self.stats, |a, b| {
            b.avg_work_hours
                .partial_cmp(&a.avg_work_hours)
                .unwrap_or(Ordering::Equal)
        });
        let top_risk = ranked(&self.stats, |a, b| b.total_risk_days.cmp(&a.total_risk_days));

        let chronic_late: Vec<EmployeeStatsView> = self
            .stats
            .iter()
            .filter(|stats| stats.chronic_late)
            .map(EmployeeMonthlyStats::to_view)
            .collect();
        let under_hours: Vec<EmployeeStatsView> = self
            .stats
            .iter()
            .filter(|stats| stats.under_hours)
            .map(EmployeeMonthlyStats::to_view)
            .collect();

        AttendanceSummary {
            employees,
            avg_attendance_pct: round1(mean(self.stats.iter().map(|s| s.attendance_pct))),
            avg_work_hours: round1(mean(self.stats.iter().map(|s| s.avg_work_hours))),
            chronic_late_pct: round1(share(chronic_late.len(), employees)),
            under_hours_pct: round1(share(under_hours.len(), employees)),
            top_compliant,
            top_risk,
            chronic_late,
            under_hours,
        }
    }

    /// Per-day calendar for one employee, in date order.
    pub fn calendar(&self, employee: &str) -> Vec<CalendarDay> {
        self.daily
            .iter()
            .filter(|record| record.employee == employee)
            .map(|record| {
                let status = record.day_status();
                CalendarDay {
                    date: record.date,
                    status,
                    status_label: status.label().to_string(),
                    note_label: record.note.label().to_string(),
                    work_hours: round1(record.work_hours),
                }
            })
            .collect()
    }
}

/// Top entries under `order`, ties broken by employee name.
fn ranked(
    stats: &[EmployeeMonthlyStats],
    order: impl Fn(&EmployeeMonthlyStats, &EmployeeMonthlyStats) -> Ordering,
) -> Vec<EmployeeStatsView> {
    let mut sorted: Vec<&EmployeeMonthlyStats> = stats.iter().collect();
    sorted.sort_by(|a, b| order(a, b).then_with(|| a.employee.cmp(&b.employee)));
    sorted
        .into_iter()
        .take(LEADERBOARD_SIZE)
        .map(EmployeeMonthlyStats::to_view)
        .collect()
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

fn share(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}
