use crate::error::{DashboardError, Result};
use crate::models::{LoadReport, ResultRow, SummaryRow};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ---------------------------------------------------------------------------
// DashboardConfig: YAML document stored next to the results
// ---------------------------------------------------------------------------

/// Dashboard-level configuration.
///
/// Only `stocks` is interpreted; its keys are the recognized tickers and its
/// values are whatever per-stock settings the upstream backtester keeps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default)]
    pub stocks: BTreeMap<String, serde_json::Value>,
}

impl DashboardConfig {
    /// Parse the YAML document.
    pub fn from_yaml(text: &str) -> Result<Self> {
        let parsed = config::Config::builder()
            .add_source(config::File::from_str(text, config::FileFormat::Yaml))
            .build()?;
        Ok(parsed.try_deserialize::<DashboardConfig>()?)
    }

    /// Parse raw object bytes (must be UTF-8).
    pub fn from_bytes(key: &str, bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| DashboardError::parse(key, format!("config is not UTF-8: {}", e)))?;
        Self::from_yaml(text)
    }

    /// Recognized tickers, upper-cased, ascending.
    pub fn recognized_symbols(&self) -> BTreeSet<String> {
        self.stocks.keys().map(|s| s.to_uppercase()).collect()
    }

    /// Case-insensitive membership test.
    pub fn recognizes(&self, symbol: &str) -> bool {
        self.stocks.keys().any(|s| s.eq_ignore_ascii_case(symbol))
    }

    /// Symbols from `symbols` that the config does not list, in input order.
    pub fn unrecognized<'a, I>(&self, symbols: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        symbols
            .into_iter()
            .filter(|s| !self.recognizes(s))
            .map(str::to_string)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// DashboardSnapshot: Everything one render needs
// ---------------------------------------------------------------------------

/// The unified dataset and its summary, as produced by one full load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub report: LoadReport,
    pub rows: Vec<ResultRow>,
    pub summary: Vec<SummaryRow>,
    /// Loaded symbols missing from the dashboard config's `stocks`.
    pub unrecognized_symbols: Vec<String>,
}

impl DashboardSnapshot {
    /// Symbols offered for the time-series selector, in summary order.
    pub fn symbol_options(&self) -> Vec<String> {
        self.summary.iter().map(|s| s.symbol.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
stocks:
  BEL:
    lot_size: 100
    spread: 0.05
  TCS:
    lot_size: 25
strategy:
  name: market_making
"#;

    #[test]
    fn parses_stock_mapping() {
        let cfg = DashboardConfig::from_yaml(SAMPLE).unwrap();
        let symbols: Vec<String> = cfg.recognized_symbols().into_iter().collect();
        assert_eq!(symbols, vec!["BEL", "TCS"]);
        assert!(cfg.recognizes("bel"));
        assert!(!cfg.recognizes("INFY"));
    }

    #[test]
    fn unrecognized_keeps_input_order() {
        let cfg = DashboardConfig::from_yaml(SAMPLE).unwrap();
        assert_eq!(
            cfg.unrecognized(["WIPRO", "BEL", "INFY"]),
            vec!["WIPRO", "INFY"]
        );
    }

    #[test]
    fn missing_stocks_section_is_empty() {
        let cfg = DashboardConfig::from_yaml("strategy:\n  name: x\n").unwrap();
        assert!(cfg.stocks.is_empty());
    }

    #[test]
    fn rejects_non_utf8() {
        let err = DashboardConfig::from_bytes("config.yaml", &[0xff, 0xfe]).unwrap_err();
        assert!(matches!(err, DashboardError::Parse { .. }));
    }
}
