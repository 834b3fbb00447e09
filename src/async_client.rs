//! Async wrapper around [`DashboardSdk`] for use in async runtimes (Tokio, etc.).
//!
//! Runs all SDK operations on a blocking thread pool via
//! [`tokio::task::spawn_blocking`], keeping the async event loop free. The
//! pipeline itself stays sequential; this only moves it off the event loop.
//!
//! # Example
//!
//! ```no_run
//! use backtest_dashboard_sdk::{AsyncDashboardSdk, StoreSettings};
//!
//! # async fn example() -> backtest_dashboard_sdk::Result<()> {
//! let sdk = AsyncDashboardSdk::builder()
//!     .settings(StoreSettings::local("./results"))
//!     .build()
//!     .await?;
//!
//! let snapshot = sdk.load_dashboard().await?;
//! let series = sdk.run(|s| s.results().time_series("BEL")).await?;
//! # Ok(())
//! # }
//! ```

use std::sync::{Arc, Mutex};

use crate::error::{DashboardError, Result};
use crate::models::DashboardSnapshot;
use crate::store::ObjectStore;
use crate::{DashboardSdk, StoreSettings};

// ---------------------------------------------------------------------------
// AsyncDashboardSdkBuilder
// ---------------------------------------------------------------------------

/// Builder for configuring and constructing an [`AsyncDashboardSdk`] instance.
#[derive(Default)]
pub struct AsyncDashboardSdkBuilder {
    settings: StoreSettings,
    store: Option<Box<dyn ObjectStore>>,
}

impl AsyncDashboardSdkBuilder {
    /// Use these storage coordinates.
    pub fn settings(mut self, settings: StoreSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Use a caller-provided store instead of building one from settings.
    pub fn store(mut self, store: Box<dyn ObjectStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Build the async SDK.
    ///
    /// Initialization runs on the blocking thread pool, since the S3 store
    /// creates a blocking HTTP client.
    pub async fn build(self) -> Result<AsyncDashboardSdk> {
        tokio::task::spawn_blocking(move || {
            let mut builder = DashboardSdk::builder().settings(self.settings);
            if let Some(store) = self.store {
                builder = builder.store(store);
            }
            let sdk = builder.build()?;
            Ok(AsyncDashboardSdk {
                inner: Arc::new(Mutex::new(sdk)),
            })
        })
        .await
        .map_err(|e| DashboardError::InvalidArgument(format!("Task join error: {e}")))?
    }
}

// ---------------------------------------------------------------------------
// AsyncDashboardSdk
// ---------------------------------------------------------------------------

/// Async wrapper around [`DashboardSdk`].
///
/// The underlying [`DashboardSdk`] is protected by a [`Mutex`] since it uses
/// `RefCell` internally; concurrent callers are served one at a time.
#[derive(Clone)]
pub struct AsyncDashboardSdk {
    inner: Arc<Mutex<DashboardSdk>>,
}

impl AsyncDashboardSdk {
    /// Create a new builder for configuring the async SDK.
    pub fn builder() -> AsyncDashboardSdkBuilder {
        AsyncDashboardSdkBuilder::default()
    }

    /// Run a sync SDK operation on the blocking thread pool.
    ///
    /// The closure receives an `&DashboardSdk` reference and should return
    /// a `Result<T>`.
    pub async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&DashboardSdk) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let sdk = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let guard = sdk
                .lock()
                .map_err(|_| DashboardError::InvalidArgument("SDK lock poisoned".into()))?;
            f(&guard)
        })
        .await
        .map_err(|e| DashboardError::InvalidArgument(format!("Task join error: {e}")))?
    }

    /// Rebuild the dataset and return a full snapshot.
    pub async fn load_dashboard(&self) -> Result<DashboardSnapshot> {
        self.run(|s| s.load_dashboard()).await
    }

    /// Rebuild the dataset and return it as CSV bytes.
    pub async fn export_csv_bytes(&self) -> Result<Vec<u8>> {
        self.run(|s| {
            s.results().load()?;
            s.results().export_csv_bytes()
        })
        .await
    }
}
