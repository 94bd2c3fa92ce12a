use super::domain::{
    AttendanceNote, DailyRecord, EmployeeMonthlyStats, PunchEvent, ThresholdConfig,
};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;

/// Classifies punches into per-day records and per-employee statistics.
///
/// Punches are grouped strictly by `(employee, date)`. The worked span of a day
/// runs from its earliest to its latest punch, so a lone punch yields zero
/// hours. Daily records come back ordered by employee then date, statistics by
/// employee.
pub fn classify(
    punches: &[PunchEvent],
    config: &ThresholdConfig,
) -> (Vec<DailyRecord>, Vec<EmployeeMonthlyStats>) {
    let mut days: BTreeMap<(&str, NaiveDate), Vec<NaiveDateTime>> = BTreeMap::new();
    for punch in punches {
        days.entry((punch.employee.as_str(), punch.timestamp.date()))
            .or_default()
            .push(punch.timestamp);
    }

    let daily: Vec<DailyRecord> = days
        .into_iter()
        .filter_map(|((employee, date), mut stamps)| {
            stamps.sort();
            let first = *stamps.first()?;
            let last = *stamps.last()?;
            Some(classify_day(employee, date, first, last, config))
        })
        .collect();

    let stats = aggregate(&daily, config);
    (daily, stats)
}

fn classify_day(
    employee: &str,
    date: NaiveDate,
    first: NaiveDateTime,
    last: NaiveDateTime,
    config: &ThresholdConfig,
) -> DailyRecord {
    let work_hours = (last - first).num_seconds() as f64 / 3600.0;
    let first_in = first.time();
    let last_out = last.time();

    let is_late = first_in > config.late_threshold;
    let is_early_exit = work_hours < config.required_hours && last_out < config.exit_threshold;
    let is_compliant = work_hours >= config.required_hours && !is_late;

    let note = if is_compliant {
        AttendanceNote::Compliant
    } else {
        match (is_late, is_early_exit) {
            (true, true) => AttendanceNote::LateEntryAndEarlyExit,
            (true, false) => AttendanceNote::LateEntry,
            (false, true) => AttendanceNote::EarlyExit,
            (false, false) => AttendanceNote::Compliant,
        }
    };

    DailyRecord {
        employee: employee.to_string(),
        date,
        first_in,
        last_out,
        work_hours,
        is_late,
        is_early_exit,
        is_compliant,
        note,
    }
}

fn aggregate(daily: &[DailyRecord], config: &ThresholdConfig) -> Vec<EmployeeMonthlyStats> {
    let total_days_in_month = daily.iter().map(|record| record.date.day()).max().unwrap_or(0);

    let mut by_employee: BTreeMap<&str, Vec<&DailyRecord>> = BTreeMap::new();
    for record in daily {
        by_employee
            .entry(record.employee.as_str())
            .or_default()
            .push(record);
    }

    by_employee
        .into_iter()
        .filter(|(_, records)| !records.is_empty())
        .map(|(employee, records)| {
            let present_days = records.len() as u32;
            let total_hours: f64 = records.iter().map(|record| record.work_hours).sum();
            let avg_work_hours = total_hours / present_days as f64;
            let late_days = records.iter().filter(|record| record.is_late).count() as u32;
            let early_exit_days = records.iter().filter(|record| record.is_early_exit).count() as u32;
            let compliant_days = records.iter().filter(|record| record.is_compliant).count() as u32;
            let attendance_pct = if total_days_in_month == 0 {
                0.0
            } else {
                present_days as f64 / total_days_in_month as f64 * 100.0
            };

            EmployeeMonthlyStats {
                employee: employee.to_string(),
                present_days,
                avg_work_hours,
                late_days,
                early_exit_days,
                compliant_days,
                attendance_pct,
                chronic_late: late_days as f64 / present_days as f64 >= config.chronic_late_ratio,
                under_hours: avg_work_hours < config.required_hours,
                total_risk_days: late_days + early_exit_days,
                avg_deviation: avg_work_hours - config.required_hours,
            }
        })
        .collect()
}
