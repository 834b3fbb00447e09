//! Shared test fixtures for the dashboard SDK integration tests.
//!
//! Provides `setup_sample_store()` which writes a small bucket layout (two
//! daily result files, a few chart images and a YAML config) into a temporary
//! directory served through `LocalStore`.

#![allow(dead_code)]

use backtest_dashboard_sdk::{DashboardSdk, StoreSettings};
use std::fs;
use std::path::Path;

pub const RESULTS_PREFIX: &str = "combined/";
pub const PLOTS_PREFIX: &str = "plots/";
pub const CONFIG_KEY: &str = "config/dashboard.yaml";

pub const DAY_ONE: &str = "combined/aggregated_results_20250101.csv";
pub const DAY_TWO: &str = "combined/aggregated_results_20250102.csv";

pub const DAY_ONE_CSV: &str = "\
Symbol,Net_PnL,Max_PnL,Drawdown,Trades
AAPL,10.0,15.0,-2.0,4
BEL,3.5,4.0,-0.5,2
";

pub const DAY_TWO_CSV: &str = "\
Symbol,Net_PnL,Max_PnL,Drawdown,Trades
AAPL,5.0,8.0,-1.0,3
TCS,,1.0,,1
";

pub const CONFIG_YAML: &str = "\
stocks:
  AAPL:
    lot_size: 1
  BEL:
    lot_size: 100
";

/// Write `body` at `key` under `root`, creating parent directories.
pub fn put(root: &Path, key: &str, body: &[u8]) {
    let path = root.join(key);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
}

/// Create a temp directory with the sample bucket contents.
///
/// The caller must keep the returned `TempDir` alive for the duration of the test.
pub fn setup_sample_store() -> tempfile::TempDir {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();

    put(root, DAY_TWO, DAY_TWO_CSV.as_bytes());
    put(root, DAY_ONE, DAY_ONE_CSV.as_bytes());
    put(root, "combined/readme.txt", b"not a result file");
    put(root, "combined/summary_20250101.csv", b"Symbol\nAAPL\n");

    put(root, "plots/BEL_20250407_plot.png", b"\x89PNG-one");
    put(root, "plots/BEL_20250408_plot.png", b"\x89PNG-two");
    put(root, "plots/overview.png", b"\x89PNG-skip");

    put(root, CONFIG_KEY, CONFIG_YAML.as_bytes());

    tmp
}

/// Settings pointing at a local store rooted at `root`.
pub fn local_settings(root: &Path) -> StoreSettings {
    StoreSettings {
        results_prefix: RESULTS_PREFIX.to_string(),
        plots_prefix: PLOTS_PREFIX.to_string(),
        config_key: Some(CONFIG_KEY.to_string()),
        ..StoreSettings::local(root)
    }
}

/// An SDK over the sample store.
pub fn sample_sdk() -> (DashboardSdk, tempfile::TempDir) {
    let tmp = setup_sample_store();
    let sdk = DashboardSdk::builder()
        .settings(local_settings(tmp.path()))
        .build()
        .unwrap();
    (sdk, tmp)
}
