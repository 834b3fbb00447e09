use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Json, Response};
use serde_json::{json, Value};

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/plots
///
/// Stock and date options for the image selector.
pub async fn list_plots(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    let index = state.sdk.run(|s| s.plots().index()).await?;

    Ok(Json(json!({
        "stocks": index.stock_options(),
        "dates": index.date_options(),
        "count": index.len(),
    })))
}

/// GET /api/plots/:symbol/:date
///
/// The PNG for the selected pair.
pub async fn get_plot(
    State(state): State<Arc<AppState>>,
    Path((symbol, date)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let image = state
        .sdk
        .run(move |s| s.plots().image(&symbol, &date))
        .await?;

    match image {
        Some((_, bytes)) => Ok(([(header::CONTENT_TYPE, "image/png")], bytes).into_response()),
        None => Err(AppError::not_found("No plot for that stock and date")),
    }
}
