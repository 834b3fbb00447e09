mod error;
mod routes;
mod state;

use std::path::PathBuf;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use backtest_dashboard_sdk::config;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

use state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Optional settings file path as the first argument.
    let settings_path = std::env::args().nth(1).map(PathBuf::from);
    let settings =
        config::load_settings(settings_path.as_deref()).expect("Failed to load settings");

    tracing::info!(bucket = %settings.bucket, "initializing dashboard SDK");
    let sdk = backtest_dashboard_sdk::AsyncDashboardSdk::builder()
        .settings(settings)
        .build()
        .await
        .expect("Failed to initialize dashboard SDK");
    tracing::info!("SDK ready");

    let state = Arc::new(AppState { sdk });

    let app = Router::new()
        .route("/api/results", get(routes::results::get_results))
        .route("/api/summary", get(routes::results::get_summary))
        .route(
            "/api/symbols/{symbol}/series",
            get(routes::results::get_series),
        )
        .route("/api/export", get(routes::results::export_csv))
        .route("/api/plots", get(routes::plots::list_plots))
        .route("/api/plots/{symbol}/{date}", get(routes::plots::get_plot))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = "0.0.0.0:3000";
    tracing::info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
