use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use backtest_dashboard_sdk::DashboardError;
use serde_json::json;

/// Unified error type that renders as a JSON `{"error": "..."}` response
/// with an appropriate HTTP status code.
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.into(),
        }
    }

    pub fn unprocessable(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: msg.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<DashboardError> for AppError {
    fn from(e: DashboardError) -> Self {
        match &e {
            DashboardError::NotFound(_) | DashboardError::NoData(_) => {
                AppError::not_found(e.to_string())
            }
            DashboardError::InvalidDate { .. } | DashboardError::InvalidArgument(_) => {
                AppError::unprocessable(e.to_string())
            }
            _ => {
                tracing::error!(error = %e, "request failed");
                AppError::internal(e.to_string())
            }
        }
    }
}
