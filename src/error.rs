#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::DeError),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Parse error in {key}: {message}")]
    Parse { key: String, message: String },

    #[error("No data: {0}")]
    NoData(String),

    #[error("Invalid date '{value}' for symbol {symbol}: expected YYYYMMDD")]
    InvalidDate { symbol: String, value: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl DashboardError {
    pub(crate) fn parse(key: &str, message: impl Into<String>) -> Self {
        DashboardError::Parse {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;
