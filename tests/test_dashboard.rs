//! Dashboard config, full snapshot and settings loading.

mod common;

use backtest_dashboard_sdk::config::load_settings;
use backtest_dashboard_sdk::{DashboardError, DashboardSdk, StoreSettings};
use std::io::Write;

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

#[test]
fn config_is_fetched_and_parsed() {
    let (sdk, _tmp) = common::sample_sdk();

    let cfg = sdk.config().unwrap().unwrap();
    let symbols: Vec<String> = cfg.recognized_symbols().into_iter().collect();
    assert_eq!(symbols, vec!["AAPL", "BEL"]);
}

#[test]
fn no_config_key_means_no_config() {
    let tmp = common::setup_sample_store();
    let settings = StoreSettings {
        config_key: None,
        ..common::local_settings(tmp.path())
    };
    let sdk = DashboardSdk::builder().settings(settings).build().unwrap();
    assert!(sdk.config().unwrap().is_none());
}

#[test]
fn missing_config_object_is_not_found() {
    let (_sdk, tmp) = common::sample_sdk();
    let sdk = DashboardSdk::builder()
        .settings(common::local_settings(tmp.path()))
        .config_key("config/absent.yaml")
        .build()
        .unwrap();
    assert!(matches!(sdk.config(), Err(DashboardError::NotFound(_))));
}

// ---------------------------------------------------------------------------
// load_dashboard
// ---------------------------------------------------------------------------

#[test]
fn snapshot_reports_unrecognized_symbols() {
    let (sdk, _tmp) = common::sample_sdk();

    let snapshot = sdk.load_dashboard().unwrap();
    assert_eq!(snapshot.report.rows, 4);
    assert_eq!(snapshot.rows.len(), 4);
    assert_eq!(snapshot.symbol_options(), vec!["AAPL", "BEL", "TCS"]);
    assert_eq!(snapshot.unrecognized_symbols, vec!["TCS"]);
}

#[test]
fn snapshot_serializes_with_dashboard_column_names() {
    let (sdk, _tmp) = common::sample_sdk();
    let snapshot = sdk.load_dashboard().unwrap();

    let json = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(json["rows"][0]["Symbol"], "AAPL");
    assert_eq!(json["rows"][0]["Date"], "20250101");
    assert_eq!(json["summary"][0]["Total Net PnL"], 15.0);
}

#[test]
fn snapshot_without_results_is_no_data() {
    let tmp = tempfile::tempdir().unwrap();
    common::put(tmp.path(), common::CONFIG_KEY, common::CONFIG_YAML.as_bytes());
    let sdk = DashboardSdk::builder()
        .settings(common::local_settings(tmp.path()))
        .build()
        .unwrap();

    assert!(matches!(sdk.load_dashboard(), Err(DashboardError::NoData(_))));
}

// ---------------------------------------------------------------------------
// settings
// ---------------------------------------------------------------------------

#[test]
fn settings_file_is_read() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        file,
        "bucket = \"backtests\"\nregion = \"ap-south-1\"\nresults_prefix = \"combined/\"\n\
         access_key_id = \"AKID\"\nsecret_access_key = \"SECRET\"\ntimeout_secs = 30"
    )
    .unwrap();

    let settings = load_settings(Some(file.path())).unwrap();
    assert_eq!(settings.bucket, "backtests");
    assert_eq!(settings.results_prefix, "combined/");
    assert_eq!(settings.timeout_secs, 30);
    assert!(settings.has_credentials());
    assert_eq!(settings.endpoint_url(), "https://s3.ap-south-1.amazonaws.com");
}

#[test]
fn missing_settings_file_is_an_error() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("absent.toml");
    assert!(matches!(
        load_settings(Some(&path)),
        Err(DashboardError::Config(_))
    ));
}

// ---------------------------------------------------------------------------
// builder
// ---------------------------------------------------------------------------

#[test]
fn builder_without_bucket_or_root_fails() {
    let err = DashboardSdk::builder().build().err().unwrap();
    assert!(matches!(err, DashboardError::InvalidArgument(_)));
}

#[test]
fn builder_rejects_missing_local_root() {
    let tmp = tempfile::tempdir().unwrap();
    let err = DashboardSdk::builder()
        .local_root(tmp.path().join("nope"))
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, DashboardError::NotFound(_)));
}

#[test]
fn display_names_store_and_prefixes() {
    let (sdk, tmp) = common::sample_sdk();
    let text = sdk.to_string();
    assert!(text.contains(&format!("file://{}", tmp.path().display())));
    assert!(text.contains("\"combined/\""));

    sdk.results().load().unwrap();
    assert!(sdk.to_string().contains("tables=[backtest_results]"));
}

#[test]
fn s3_store_is_built_from_bucket_settings() {
    let settings = StoreSettings {
        bucket: "backtests".into(),
        endpoint: Some("http://localhost:9000".into()),
        ..StoreSettings::default()
    };
    let sdk = DashboardSdk::builder().settings(settings).build().unwrap();
    assert!(sdk.store().location().contains("backtests"));
}
