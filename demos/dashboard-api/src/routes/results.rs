use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Json, Response};
use backtest_dashboard_sdk::queries::default_export_file_name;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/results
///
/// Rebuild the dataset and return every row plus the per-symbol summary.
pub async fn get_results(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    let snapshot = state.sdk.load_dashboard().await?;

    let count = snapshot.rows.len();
    Ok(Json(json!({
        "data": snapshot.rows,
        "count": count,
        "sources": snapshot.report.sources,
        "summary": snapshot.summary,
        "unrecognized_symbols": snapshot.unrecognized_symbols,
    })))
}

/// GET /api/summary
pub async fn get_summary(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    let summary = state
        .sdk
        .run(|s| {
            s.results().load()?;
            s.results().summary()
        })
        .await?;

    Ok(Json(json!({ "data": summary })))
}

/// GET /api/symbols/:symbol/series
///
/// Net PnL over time for one symbol, with a Vega-Lite line chart definition.
pub async fn get_series(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> Result<Json<Value>, AppError> {
    let series = state
        .sdk
        .run(move |s| {
            s.results().load()?;
            s.results().time_series(&symbol)
        })
        .await?;

    let chart = series.to_vega_lite();
    Ok(Json(json!({ "data": series, "chart": chart })))
}

/// GET /api/export
///
/// The unified dataset as a CSV download named `all_results_<today>.csv`.
pub async fn export_csv(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let bytes = state.sdk.export_csv_bytes().await?;
    let disposition = format!("attachment; filename=\"{}\"", default_export_file_name());

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}
