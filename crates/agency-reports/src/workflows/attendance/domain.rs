use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One clock-in/out event read from an uploaded sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PunchEvent {
    pub employee: String,
    pub timestamp: NaiveDateTime,
}

impl PunchEvent {
    pub fn new(employee: impl Into<String>, timestamp: NaiveDateTime) -> Self {
        Self {
            employee: employee.into(),
            timestamp,
        }
    }
}

/// Office rules an employee-day is judged against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    #[serde(with = "clock")]
    pub late_threshold: NaiveTime,
    #[serde(with = "clock")]
    pub exit_threshold: NaiveTime,
    pub required_hours: f64,
    pub chronic_late_ratio: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            late_threshold: NaiveTime::from_hms_opt(9, 30, 0).unwrap_or(NaiveTime::MIN),
            exit_threshold: NaiveTime::from_hms_opt(17, 30, 0).unwrap_or(NaiveTime::MIN),
            required_hours: 8.0,
            chronic_late_ratio: 0.20,
        }
    }
}

/// Parses `HH:MM` or `HH:MM:SS`.
pub fn parse_clock(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .ok()
}

mod clock {
    use super::*;

    pub fn serialize<S>(value: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_clock(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid clock time: {raw}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceNote {
    Compliant,
    LateEntry,
    EarlyExit,
    LateEntryAndEarlyExit,
}

impl AttendanceNote {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Compliant => "Compliant",
            Self::LateEntry => "Late Entry",
            Self::EarlyExit => "Early Exit",
            Self::LateEntryAndEarlyExit => "Late Entry & Early Exit",
        }
    }
}

/// Calendar colouring for a single recorded day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayStatus {
    Compliant,
    LateOrEarly,
    ShortHours,
}

impl DayStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Compliant => "Compliant",
            Self::LateOrEarly => "Late or Early",
            Self::ShortHours => "Short Hours",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailyRecord {
    pub employee: String,
    pub date: NaiveDate,
    pub first_in: NaiveTime,
    pub last_out: NaiveTime,
    pub work_hours: f64,
    pub is_late: bool,
    pub is_early_exit: bool,
    pub is_compliant: bool,
    pub note: AttendanceNote,
}

impl DailyRecord {
    pub fn day_status(&self) -> DayStatus {
        if self.is_compliant {
            DayStatus::Compliant
        } else if self.is_late || self.is_early_exit {
            DayStatus::LateOrEarly
        } else {
            DayStatus::ShortHours
        }
    }

    pub fn to_view(&self) -> DailyRecordView {
        DailyRecordView {
            employee: self.employee.clone(),
            date: self.date,
            first_in: self.first_in.format("%H:%M").to_string(),
            last_out: self.last_out.format("%H:%M").to_string(),
            work_hours: round1(self.work_hours),
            is_late: self.is_late,
            is_early_exit: self.is_early_exit,
            is_compliant: self.is_compliant,
            note: self.note,
            note_label: self.note.label().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmployeeMonthlyStats {
    pub employee: String,
    pub present_days: u32,
    pub avg_work_hours: f64,
    pub late_days: u32,
    pub early_exit_days: u32,
    pub compliant_days: u32,
    pub attendance_pct: f64,
    pub chronic_late: bool,
    pub under_hours: bool,
    pub total_risk_days: u32,
    pub avg_deviation: f64,
}

impl EmployeeMonthlyStats {
    pub fn to_view(&self) -> EmployeeStatsView {
        EmployeeStatsView {
            employee: self.employee.clone(),
            present_days: self.present_days,
            avg_work_hours: round1(self.avg_work_hours),
            late_days: self.late_days,
            early_exit_days: self.early_exit_days,
            compliant_days: self.compliant_days,
            attendance_pct: round1(self.attendance_pct),
            chronic_late: self.chronic_late,
            under_hours: self.under_hours,
            total_risk_days: self.total_risk_days,
            avg_deviation: round1(self.avg_deviation),
        }
    }
}

/// A row the importer could not turn into a punch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowWarning {
    pub row: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyRecordView {
    pub employee: String,
    pub date: NaiveDate,
    pub first_in: String,
    pub last_out: String,
    pub work_hours: f64,
    pub is_late: bool,
    pub is_early_exit: bool,
    pub is_compliant: bool,
    pub note: AttendanceNote,
    pub note_label: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmployeeStatsView {
    pub employee: String,
    pub present_days: u32,
    pub avg_work_hours: f64,
    pub late_days: u32,
    pub early_exit_days: u32,
    pub compliant_days: u32,
    pub attendance_pct: f64,
    pub chronic_late: bool,
    pub under_hours: bool,
    pub total_risk_days: u32,
    pub avg_deviation: f64,
}

pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
