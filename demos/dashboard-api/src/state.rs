/// Shared application state available to all route handlers via Axum's
/// `State` extractor.
pub struct AppState {
    /// The async dashboard SDK. Every handler that reads results rebuilds the
    /// dataset from the store first, so responses always reflect the bucket.
    pub sdk: backtest_dashboard_sdk::AsyncDashboardSdk,
}
