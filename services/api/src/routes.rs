use crate::infra::{deserialize_optional_date, AppState};
use agency_reports::error::AppError;
use agency_reports::tabular::RecordTable;
use agency_reports::workflows::attendance::{
    AttendanceImporter, AttendanceSummary, DailyRecordView, EmployeeStatsView, RowWarning,
    ThresholdConfig,
};
use agency_reports::workflows::reports::leads::{self, CompletedSelection, LeadReportSummary};
use agency_reports::workflows::reports::visa::{self, VisaReportSummary};
use agency_reports::workflows::reports::DateWindow;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::io::Cursor;

#[derive(Debug, Deserialize)]
pub(crate) struct AttendanceRequest {
    pub(crate) csv: String,
    #[serde(default)]
    pub(crate) thresholds: Option<ThresholdConfig>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AttendanceResponse {
    pub(crate) thresholds: ThresholdConfig,
    pub(crate) summary: AttendanceSummary,
    pub(crate) daily: Vec<DailyRecordView>,
    pub(crate) employees: Vec<EmployeeStatsView>,
    pub(crate) warnings: Vec<RowWarning>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VisaRequest {
    pub(crate) csv: String,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub(crate) struct VisaResponse {
    pub(crate) today: NaiveDate,
    #[serde(flatten)]
    pub(crate) report: VisaReportSummary,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LeadsRequest {
    pub(crate) csv: String,
}

pub(crate) fn report_routes() -> Router {
    Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/v1/attendance/report", post(attendance_report_endpoint))
        .route("/api/v1/reports/visa", post(visa_report_endpoint))
        .route("/api/v1/reports/leads", post(leads_report_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn attendance_report_endpoint(
    Json(payload): Json<AttendanceRequest>,
) -> Result<Json<AttendanceResponse>, AppError> {
    let thresholds = payload.thresholds.unwrap_or_default();
    let report = AttendanceImporter::from_reader(Cursor::new(payload.csv.into_bytes()), &thresholds)?;

    Ok(Json(AttendanceResponse {
        thresholds,
        summary: report.summary(),
        daily: report.daily_views(),
        employees: report.stats_views(),
        warnings: report.warnings,
    }))
}

pub(crate) async fn visa_report_endpoint(
    Json(payload): Json<VisaRequest>,
) -> Result<Json<VisaResponse>, AppError> {
    let today = payload.today.unwrap_or_else(|| Local::now().date_naive());
    let records = RecordTable::from_csv_reader(Cursor::new(payload.csv.into_bytes()))?;
    let window = DateWindow::upcoming(today, visa::WINDOW_DAYS);
    let report = visa::build(&records, &window, &[])?;

    Ok(Json(VisaResponse {
        today,
        report: report.summary(),
    }))
}

pub(crate) async fn leads_report_endpoint(
    Json(payload): Json<LeadsRequest>,
) -> Result<Json<LeadReportSummary>, AppError> {
    let records = RecordTable::from_csv_reader(Cursor::new(payload.csv.into_bytes()))?;
    let report = leads::build(&records, &CompletedSelection::default(), &[])?;
    Ok(Json(report.summary()))
}
