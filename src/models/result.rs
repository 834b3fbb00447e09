use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::Path;

// ---------------------------------------------------------------------------
// ResultRow: One symbol's result for one day
// ---------------------------------------------------------------------------

/// A row of the unified dataset.
///
/// Numeric fields are `None` where the source cell was empty or an NA marker.
/// Columns outside the schema land in `extra` as text (or null when the
/// row's file did not have them).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    #[serde(rename = "Symbol")]
    pub symbol: String,
    #[serde(rename = "Net_PnL")]
    pub net_pnl: Option<f64>,
    #[serde(rename = "Max_PnL")]
    pub max_pnl: Option<f64>,
    #[serde(rename = "Drawdown")]
    pub drawdown: Option<f64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
    /// `YYYYMMDD`, taken from the source key.
    #[serde(rename = "Date")]
    pub date: String,
}

// ---------------------------------------------------------------------------
// SummaryRow: Per-symbol aggregates
// ---------------------------------------------------------------------------

/// Aggregates over every row of one symbol.
///
/// A field is `None` when every contributing value was missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    #[serde(rename = "Symbol")]
    pub symbol: String,
    #[serde(rename = "Total Net PnL")]
    pub total_net_pnl: Option<f64>,
    #[serde(rename = "Max Net PnL")]
    pub max_net_pnl: Option<f64>,
    #[serde(rename = "Max Drawdown")]
    pub max_drawdown: Option<f64>,
}

// ---------------------------------------------------------------------------
// SymbolSeries: Net PnL over time for one symbol
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub net_pnl: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolSeries {
    pub symbol: String,
    /// Ascending by date.
    pub points: Vec<SeriesPoint>,
}

impl SymbolSeries {
    pub fn title(&self) -> String {
        format!("Net PnL Over Time: {}", self.symbol)
    }

    /// Vega-Lite line chart (with points) of Net PnL against date.
    pub fn to_vega_lite(&self) -> Value {
        let values: Vec<Value> = self
            .points
            .iter()
            .map(|p| {
                json!({
                    "Date": p.date.format("%Y-%m-%d").to_string(),
                    "Net_PnL": p.net_pnl,
                })
            })
            .collect();

        json!({
            "$schema": "https://vega.github.io/schema/vega-lite/v5.json",
            "title": self.title(),
            "width": 800,
            "height": 400,
            "data": { "values": values },
            "mark": { "type": "line", "point": true },
            "encoding": {
                "x": { "field": "Date", "type": "temporal", "title": "Date" },
                "y": { "field": "Net_PnL", "type": "quantitative", "title": "Net PnL" },
                "tooltip": [
                    { "field": "Date", "type": "temporal" },
                    { "field": "Net_PnL", "type": "quantitative" }
                ]
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Outcome of a successful load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadReport {
    /// Source keys in load order.
    pub sources: Vec<String>,
    pub rows: usize,
}

/// Emitted after each source file is loaded.
#[derive(Debug, Clone, Copy)]
pub struct LoadProgress<'a> {
    pub loaded: usize,
    pub total: usize,
    pub key: &'a str,
}

impl LoadProgress<'_> {
    /// Fraction complete, in `0.0..=1.0`.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.loaded as f64 / self.total as f64
        }
    }

    /// Last path segment of the key.
    pub fn file_name(&self) -> &str {
        Path::new(self.key)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vega_lite_chart_describes_net_pnl_line() {
        let series = SymbolSeries {
            symbol: "AAPL".into(),
            points: vec![
                SeriesPoint {
                    date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                    net_pnl: Some(10.0),
                },
                SeriesPoint {
                    date: NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
                    net_pnl: None,
                },
            ],
        };

        let chart = series.to_vega_lite();
        assert_eq!(chart["title"], "Net PnL Over Time: AAPL");
        assert_eq!(chart["mark"]["point"], true);
        assert_eq!(chart["encoding"]["y"]["field"], "Net_PnL");
        assert_eq!(chart["data"]["values"][0]["Date"], "2025-01-01");
        assert_eq!(chart["data"]["values"][0]["Net_PnL"], 10.0);
        assert!(chart["data"]["values"][1]["Net_PnL"].is_null());
    }

    #[test]
    fn progress_reports_file_name_and_fraction() {
        let p = LoadProgress {
            loaded: 1,
            total: 4,
            key: "combined/aggregated_results_20250101.csv",
        };
        assert_eq!(p.file_name(), "aggregated_results_20250101.csv");
        assert!((p.fraction() - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn summary_row_serializes_with_display_labels() {
        let row = SummaryRow {
            symbol: "AAPL".into(),
            total_net_pnl: Some(15.0),
            max_net_pnl: Some(15.0),
            max_drawdown: Some(-1.0),
        };
        let v = serde_json::to_value(&row).unwrap();
        assert_eq!(v["Total Net PnL"], 15.0);
        assert_eq!(v["Max Drawdown"], -1.0);
    }

    #[test]
    fn result_row_collects_unknown_columns() {
        let row: ResultRow = serde_json::from_value(json!({
            "Symbol": "AAPL",
            "Net_PnL": 1.0,
            "Max_PnL": null,
            "Drawdown": -1,
            "Trades": "7",
            "Date": "20250101",
        }))
        .unwrap();
        assert_eq!(row.max_pnl, None);
        assert_eq!(row.drawdown, Some(-1.0));
        assert_eq!(row.extra.get("Trades"), Some(&json!("7")));
        assert_eq!(row.extra.len(), 1);
    }
}
