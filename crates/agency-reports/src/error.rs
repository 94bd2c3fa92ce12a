use crate::config::ConfigError;
use crate::tabular::TableError;
use crate::telemetry::TelemetryError;
use crate::workflows::agentcis::FetchError;
use crate::workflows::attendance::AttendanceError;
use crate::workflows::delivery::{RenderError, SendError};
use crate::workflows::reports::ReportError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Table(TableError),
    Attendance(AttendanceError),
    Report(ReportError),
    Fetch(FetchError),
    Render(RenderError),
    Send(SendError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Table(err) => write!(f, "unreadable upload: {}", err),
            AppError::Attendance(err) => write!(f, "attendance error: {}", err),
            AppError::Report(err) => write!(f, "report error: {}", err),
            AppError::Fetch(err) => write!(f, "fetch error: {}", err),
            AppError::Render(err) => write!(f, "render error: {}", err),
            AppError::Send(err) => write!(f, "email error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Table(err) => Some(err),
            AppError::Attendance(err) => Some(err),
            AppError::Report(err) => Some(err),
            AppError::Fetch(err) => Some(err),
            AppError::Render(err) => Some(err),
            AppError::Send(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Table(_) | AppError::Attendance(_) | AppError::Report(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Fetch(_) | AppError::Send(_) => StatusCode::BAD_GATEWAY,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<TableError> for AppError {
    fn from(value: TableError) -> Self {
        Self::Table(value)
    }
}

impl From<AttendanceError> for AppError {
    fn from(value: AttendanceError) -> Self {
        Self::Attendance(value)
    }
}

impl From<ReportError> for AppError {
    fn from(value: ReportError) -> Self {
        Self::Report(value)
    }
}

impl From<FetchError> for AppError {
    fn from(value: FetchError) -> Self {
        Self::Fetch(value)
    }
}

impl From<RenderError> for AppError {
    fn from(value: RenderError) -> Self {
        Self::Render(value)
    }
}

impl From<SendError> for AppError {
    fn from(value: SendError) -> Self {
        Self::Send(value)
    }
}
