//! Backtest results dashboard SDK for Rust.
//!
//! Aggregates precomputed daily backtest result files from an S3-compatible
//! object store into one dataset, summarizes it per symbol, and indexes the
//! stored chart images. Data is loaded into an in-process DuckDB database and
//! rebuilt from the store on every load.
//!
//! # Quick start
//!
//! ```no_run
//! use backtest_dashboard_sdk::{config, DashboardSdk};
//!
//! let settings = config::load_settings(None).unwrap();
//! let sdk = DashboardSdk::builder().settings(settings).build().unwrap();
//!
//! // Load every aggregated_results_<DATE>.csv and summarize
//! sdk.results().load().unwrap();
//! let summary = sdk.results().summary().unwrap();
//!
//! // Net PnL over time for one symbol
//! let series = sdk.results().time_series("BEL").unwrap();
//! ```

#[cfg(feature = "async")]
pub mod async_client;
pub mod config;
pub mod connection;
pub mod error;
pub mod models;
pub mod queries;
pub mod schema;
pub mod store;

#[cfg(feature = "async")]
pub use async_client::AsyncDashboardSdk;
pub use config::StoreSettings;
pub use connection::Connection;
pub use error::{DashboardError, Result};
pub use store::{KeyFilter, LocalStore, ObjectStore, S3Store};

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::warn;

use models::{DashboardConfig, DashboardSnapshot};

// ---------------------------------------------------------------------------
// DashboardSdkBuilder
// ---------------------------------------------------------------------------

/// Builder for configuring and constructing a [`DashboardSdk`] instance.
///
/// Use [`DashboardSdk::builder()`] to obtain a builder, chain configuration
/// methods, and call [`build()`](DashboardSdkBuilder::build) to create the SDK.
#[derive(Default)]
pub struct DashboardSdkBuilder {
    settings: StoreSettings,
    store: Option<Box<dyn ObjectStore>>,
}

impl DashboardSdkBuilder {
    /// Use these storage coordinates. Later setters override individual fields.
    pub fn settings(mut self, settings: StoreSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Use a caller-provided store instead of building one from settings.
    pub fn store(mut self, store: Box<dyn ObjectStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Serve objects from a local directory instead of S3.
    pub fn local_root<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.settings.local_root = Some(path.as_ref().to_path_buf());
        self
    }

    /// Prefix under which the daily result CSVs live.
    pub fn results_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.settings.results_prefix = prefix.into();
        self
    }

    /// Prefix under which chart images live.
    pub fn plots_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.settings.plots_prefix = prefix.into();
        self
    }

    /// Key of the YAML dashboard config.
    pub fn config_key(mut self, key: impl Into<String>) -> Self {
        self.settings.config_key = Some(key.into());
        self
    }

    /// Set the HTTP request timeout for S3 requests.
    ///
    /// Defaults to 120 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.settings.timeout_secs = timeout.as_secs();
        self
    }

    /// Build the SDK, opening the store and an in-memory DuckDB database.
    ///
    /// Nothing is listed or downloaded until a query asks for it.
    pub fn build(self) -> Result<DashboardSdk> {
        let store: Box<dyn ObjectStore> = match self.store {
            Some(store) => store,
            None => match &self.settings.local_root {
                Some(root) => Box::new(LocalStore::new(root)?),
                None => Box::new(S3Store::new(&self.settings)?),
            },
        };
        let conn = Connection::new()?;
        Ok(DashboardSdk {
            conn,
            store,
            settings: self.settings,
        })
    }
}

// ---------------------------------------------------------------------------
// DashboardSdk
// ---------------------------------------------------------------------------

/// The main entry point for the dashboard SDK.
///
/// Owns the object store and the DuckDB [`Connection`] holding the unified
/// dataset, and exposes query interfaces as lightweight borrowing wrappers.
pub struct DashboardSdk {
    conn: Connection,
    store: Box<dyn ObjectStore>,
    settings: StoreSettings,
}

impl DashboardSdk {
    /// Create a new builder for configuring the SDK.
    pub fn builder() -> DashboardSdkBuilder {
        DashboardSdkBuilder::default()
    }

    // -- Query accessors ---------------------------------------------------

    /// Access the result aggregation interface.
    ///
    /// Call [`load()`](queries::ResultQuery::load) before querying rows,
    /// summary or time series.
    pub fn results(&self) -> queries::ResultQuery<'_> {
        queries::ResultQuery::new(&self.conn, self.store.as_ref(), &self.settings.results_prefix)
    }

    /// Access the chart image interface.
    pub fn plots(&self) -> queries::PlotQuery<'_> {
        queries::PlotQuery::new(self.store.as_ref(), &self.settings.plots_prefix)
    }

    // -- Config and rendering ----------------------------------------------

    /// Fetch and parse the YAML dashboard config.
    ///
    /// Returns `None` when no config key is configured.
    pub fn config(&self) -> Result<Option<DashboardConfig>> {
        match &self.settings.config_key {
            Some(key) => {
                let bytes = self.store.fetch(key)?;
                Ok(Some(DashboardConfig::from_bytes(key, &bytes)?))
            }
            None => Ok(None),
        }
    }

    /// Rebuild the dataset and gather everything a dashboard render shows.
    ///
    /// Symbols absent from the config's `stocks` are reported (and logged)
    /// but kept.
    pub fn load_dashboard(&self) -> Result<DashboardSnapshot> {
        let config = self.config()?;

        let results = self.results();
        let report = results.load()?;
        let rows = results.rows()?;
        let summary = results.summary()?;

        let unrecognized_symbols = match &config {
            Some(cfg) => cfg.unrecognized(summary.iter().map(|s| s.symbol.as_str())),
            None => Vec::new(),
        };
        if !unrecognized_symbols.is_empty() {
            warn!(
                symbols = %unrecognized_symbols.join(", "),
                "results contain symbols not listed in the dashboard config"
            );
        }

        Ok(DashboardSnapshot {
            report,
            rows,
            summary,
            unrecognized_symbols,
        })
    }

    // -- Accessors ---------------------------------------------------------

    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    pub fn store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }

    /// Return a reference to the underlying [`Connection`] for advanced usage.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Where [`export_to_downloads`](queries::ResultQuery::export_to_downloads) writes.
    pub fn export_dir(&self) -> PathBuf {
        config::default_export_dir()
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

impl fmt::Display for DashboardSdk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DashboardSdk(store={}, results_prefix={:?}, plots_prefix={:?}, tables=[{}])",
            self.store.location(),
            self.settings.results_prefix,
            self.settings.plots_prefix,
            self.conn.tables().join(", ")
        )
    }
}
