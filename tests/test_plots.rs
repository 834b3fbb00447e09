//! Chart image index integration tests.

mod common;

use backtest_dashboard_sdk::{DashboardSdk, StoreSettings};

#[test]
fn index_lists_parseable_images_only() {
    let (sdk, _tmp) = common::sample_sdk();

    let index = sdk.plots().index().unwrap();
    assert_eq!(index.len(), 2);
    assert_eq!(index.stock_options(), vec!["BEL"]);
    assert_eq!(index.date_options(), vec!["20250407", "20250408"]);
    assert_eq!(index.dates_for("BEL"), vec!["20250407", "20250408"]);
}

#[test]
fn every_resolved_key_is_in_the_listing() {
    let (sdk, _tmp) = common::sample_sdk();
    let index = sdk.plots().index().unwrap();

    for symbol in index.stock_options() {
        for date in index.date_options() {
            if let Some(plot) = index.resolve(&symbol, &date) {
                assert!(index.entries().iter().any(|e| e.key == plot.key));
                assert_eq!(plot.symbol, symbol);
                assert_eq!(plot.date, date);
            }
        }
    }
}

#[test]
fn image_returns_bytes_for_selection() {
    let (sdk, _tmp) = common::sample_sdk();

    let (plot, bytes) = sdk.plots().image("BEL", "20250408").unwrap().unwrap();
    assert_eq!(plot.key, "plots/BEL_20250408_plot.png");
    assert_eq!(bytes, b"\x89PNG-two");
}

#[test]
fn image_for_missing_pair_is_none() {
    let (sdk, _tmp) = common::sample_sdk();
    assert!(sdk.plots().image("BEL", "20990101").unwrap().is_none());
    assert!(sdk.plots().image("AAPL", "20250407").unwrap().is_none());
}

#[test]
fn duplicate_pair_resolves_to_first_listed_key() {
    let (sdk, tmp) = common::sample_sdk();
    common::put(tmp.path(), "plots/BEL_20250407_zz.png", b"later");

    let (plot, bytes) = sdk.plots().image("BEL", "20250407").unwrap().unwrap();
    assert_eq!(plot.key, "plots/BEL_20250407_plot.png");
    assert_eq!(bytes, b"\x89PNG-one");
}

#[test]
fn empty_plot_prefix_is_an_empty_index() {
    let tmp = tempfile::tempdir().unwrap();
    let sdk = DashboardSdk::builder()
        .settings(StoreSettings::local(tmp.path()))
        .plots_prefix("plots/")
        .build()
        .unwrap();

    let index = sdk.plots().index().unwrap();
    assert!(index.is_empty());
    assert!(index.stock_options().is_empty());
}
