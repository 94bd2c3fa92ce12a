use agency_reports::workflows::attendance::domain::parse_clock;
use agency_reports::workflows::reports::filters::{month_start, parse_month, parse_report_date};
use agency_reports::workflows::reports::CategoricalFilter;
use chrono::{NaiveDate, NaiveTime};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

/// `2026-01`, `January 2026` or any full date inside the month.
pub(crate) fn parse_month_arg(raw: &str) -> Result<NaiveDate, String> {
    parse_month(raw)
        .or_else(|| parse_report_date(raw))
        .map(month_start)
        .ok_or_else(|| format!("failed to parse '{raw}' as a month (YYYY-MM or 'January 2026')"))
}

pub(crate) fn parse_clock_arg(raw: &str) -> Result<NaiveTime, String> {
    parse_clock(raw).ok_or_else(|| format!("failed to parse '{raw}' as HH:MM"))
}

/// `Column=value` keeps rows whose cell equals the value, `Column~text` keeps
/// rows whose cell contains the text in any case.
pub(crate) fn parse_filter(raw: &str) -> Result<CategoricalFilter, String> {
    let Some(split) = raw.find(['=', '~']) else {
        return Err(format!(
            "filter '{raw}' must look like Column=value or Column~text"
        ));
    };
    let contains = raw[split..].starts_with('~');
    let (column, value) = (raw[..split].trim(), &raw[split + 1..]);

    if column.is_empty() {
        return Err(format!("filter '{raw}' names no column"));
    }
    Ok(if contains {
        CategoricalFilter::contains(column, value.trim())
    } else {
        CategoricalFilter::exact(column, value.trim())
    })
}

pub(crate) fn deserialize_optional_date<'de, D>(
    deserializer: D,
) -> Result<Option<NaiveDate>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    opt.map(|value| parse_date(&value).map_err(serde::de::Error::custom))
        .transpose()
}
