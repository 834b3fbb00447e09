//! Connection integration tests: raw SQL over the unified result table.

mod common;

use backtest_dashboard_sdk::Connection;

// ---------------------------------------------------------------------------
// execute
// ---------------------------------------------------------------------------

#[test]
fn execute_returns_correct_rows() {
    let conn = Connection::new().unwrap();

    let rows = conn
        .execute("SELECT * FROM (VALUES ('AAPL', 1.5::DOUBLE), ('BEL', 2.0::DOUBLE)) t(sym, pnl) ORDER BY sym", &[])
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["sym"], "AAPL");
    assert_eq!(rows[1]["pnl"], 2.0);
}

#[test]
fn execute_with_params() {
    let (sdk, _tmp) = common::sample_sdk();
    sdk.results().load().unwrap();

    let rows = sdk
        .connection()
        .execute(
            "SELECT * FROM backtest_results WHERE \"Symbol\" = ?",
            &["AAPL".to_string()],
        )
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["Date"], "20250101");
    assert_eq!(rows[0]["_source_key"], common::DAY_ONE);
    assert_eq!(rows[0]["Trades"], "4");
}

#[test]
fn missing_values_come_back_as_null() {
    let (sdk, _tmp) = common::sample_sdk();
    sdk.results().load().unwrap();

    let rows = sdk
        .connection()
        .execute(
            "SELECT \"Net_PnL\" FROM backtest_results WHERE \"Symbol\" = ?",
            &["TCS".to_string()],
        )
        .unwrap();
    assert!(rows[0]["Net_PnL"].is_null());
}

// ---------------------------------------------------------------------------
// execute_scalar
// ---------------------------------------------------------------------------

#[test]
fn execute_scalar_returns_single_value() {
    let (sdk, _tmp) = common::sample_sdk();
    sdk.results().load().unwrap();

    let result = sdk
        .connection()
        .execute_scalar("SELECT COUNT(*) FROM backtest_results", &[])
        .unwrap();
    assert_eq!(result.unwrap().as_i64().unwrap(), 4);
}

#[test]
fn execute_scalar_returns_none_for_empty_result() {
    let conn = Connection::new().unwrap();
    let result = conn
        .execute_scalar("SELECT 1 WHERE 1 = 0", &[])
        .unwrap();
    assert!(result.is_none());
}

#[test]
fn column_names_follow_table_order() {
    let (sdk, _tmp) = common::sample_sdk();
    sdk.results().load().unwrap();

    let names = sdk.connection().column_names("backtest_results").unwrap();
    assert_eq!(
        names,
        vec!["_ordinal", "Symbol", "Net_PnL", "Max_PnL", "Drawdown", "Date", "_source_key", "Trades"]
    );
    assert_eq!(sdk.connection().extra_columns("backtest_results").unwrap(), vec!["Trades"]);
}

// ---------------------------------------------------------------------------
// table tracking
// ---------------------------------------------------------------------------

#[test]
fn only_the_result_table_survives_a_load() {
    let (sdk, _tmp) = common::sample_sdk();
    assert!(sdk.connection().tables().is_empty());

    sdk.results().load().unwrap();
    assert_eq!(sdk.connection().tables(), vec!["backtest_results"]);
    assert!(sdk.connection().has_table("backtest_results"));
}

#[test]
fn failed_first_load_registers_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    common::put(
        tmp.path(),
        "aggregated_results_20250101.csv",
        b"Symbol,Net_PnL,Max_PnL,Drawdown\nAAPL,x,1,1\n",
    );
    let sdk = backtest_dashboard_sdk::DashboardSdk::builder()
        .local_root(tmp.path())
        .build()
        .unwrap();

    assert!(sdk.results().load().is_err());
    assert!(sdk.connection().tables().is_empty());
}

#[test]
fn failed_promotion_drops_the_pending_table() {
    let (sdk, _tmp) = common::sample_sdk();
    // A view under the result table's name makes the final swap fail.
    sdk.connection()
        .raw()
        .execute_batch("CREATE VIEW backtest_results AS SELECT 1 AS x")
        .unwrap();

    let err = sdk.results().load().unwrap_err();
    assert!(matches!(err, backtest_dashboard_sdk::DashboardError::DuckDb(_)));
    assert!(sdk.connection().tables().is_empty());

    let leftover = sdk
        .connection()
        .execute_scalar(
            "SELECT COUNT(*) FROM duckdb_tables() WHERE table_name = 'backtest_results_pending'",
            &[],
        )
        .unwrap();
    assert_eq!(leftover.unwrap().as_i64(), Some(0));
}
