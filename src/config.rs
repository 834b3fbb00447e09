//! Storage coordinates, file naming conventions and settings loading.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Substring every daily result key must contain.
pub const RESULT_FILE_MARKER: &str = "aggregated_results";
/// Filename prefix stripped when deriving the date from a result key.
pub const RESULT_FILE_PREFIX: &str = "aggregated_results_";
pub const RESULT_FILE_SUFFIX: &str = ".csv";
pub const PLOT_FILE_SUFFIX: &str = ".png";
pub const EXPORT_FILE_PREFIX: &str = "all_results_";

/// Default settings file name, resolved by the `config` crate (`dashboard.toml`).
pub const SETTINGS_FILE: &str = "dashboard";
/// Prefix for environment overrides, e.g. `DASHBOARD_BUCKET`.
pub const ENV_PREFIX: &str = "DASHBOARD";

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Bootstrap parameters for the object store accessor.
///
/// Built once at startup (see [`load_settings`]) and handed to
/// [`DashboardSdkBuilder::settings`](crate::DashboardSdkBuilder::settings).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(default)]
    pub bucket: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom S3-compatible endpoint (MinIO, R2, ...). Defaults to AWS.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,
    #[serde(default)]
    pub session_token: Option<String>,
    /// Prefix under which the daily `aggregated_results_*.csv` files live.
    #[serde(default)]
    pub results_prefix: String,
    /// Prefix under which chart images live.
    #[serde(default)]
    pub plots_prefix: String,
    /// Key of the YAML dashboard config document.
    #[serde(default)]
    pub config_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Serve objects from this directory instead of S3.
    #[serde(default)]
    pub local_root: Option<PathBuf>,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            region: default_region(),
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
            results_prefix: String::new(),
            plots_prefix: String::new(),
            config_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            local_root: None,
        }
    }
}

impl StoreSettings {
    /// Settings for an offline, directory-backed store.
    pub fn local<P: AsRef<Path>>(root: P) -> Self {
        Self {
            local_root: Some(root.as_ref().to_path_buf()),
            ..Self::default()
        }
    }

    /// Base URL requests are sent to. Path-style addressing is used throughout.
    pub fn endpoint_url(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://s3.{}.amazonaws.com", self.region),
        }
    }

    /// True when both halves of an access key pair are present.
    pub fn has_credentials(&self) -> bool {
        self.access_key_id.is_some() && self.secret_access_key.is_some()
    }
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Load [`StoreSettings`] from a settings file and the environment.
///
/// Reads `path` if given, otherwise an optional `dashboard.toml` in the
/// working directory, then applies `DASHBOARD_*` environment overrides.
/// Missing credentials fall back to the standard `AWS_ACCESS_KEY_ID`,
/// `AWS_SECRET_ACCESS_KEY` and `AWS_SESSION_TOKEN` variables.
pub fn load_settings(path: Option<&Path>) -> Result<StoreSettings> {
    let file = match path {
        Some(p) => config::File::from(p).required(true),
        None => config::File::with_name(SETTINGS_FILE).required(false),
    };

    let builder = config::Config::builder()
        .add_source(file)
        .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
        .build()?;

    let mut settings = builder.try_deserialize::<StoreSettings>()?;

    if settings.access_key_id.is_none() {
        settings.access_key_id = std::env::var("AWS_ACCESS_KEY_ID").ok();
    }
    if settings.secret_access_key.is_none() {
        settings.secret_access_key = std::env::var("AWS_SECRET_ACCESS_KEY").ok();
    }
    if settings.session_token.is_none() {
        settings.session_token = std::env::var("AWS_SESSION_TOKEN").ok();
    }

    Ok(settings)
}

/// Where exported CSVs go when no directory is given.
pub fn default_export_dir() -> PathBuf {
    dirs::download_dir().unwrap_or_else(|| PathBuf::from("."))
}
