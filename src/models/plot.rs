use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ---------------------------------------------------------------------------
// PlotKey: A chart image addressed by symbol and date
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlotKey {
    pub symbol: String,
    pub date: String,
    /// Original object key.
    pub key: String,
}

impl PlotKey {
    /// Parse `<prefix>/<symbol>_<date>_<rest>`.
    ///
    /// Returns `None` when the filename has fewer than three `_`-separated parts.
    pub fn parse(key: &str) -> Option<Self> {
        let file_name = key.rsplit('/').next().unwrap_or(key);
        let mut parts = file_name.split('_');
        let symbol = parts.next()?;
        let date = parts.next()?;
        parts.next()?;
        Some(Self {
            symbol: symbol.to_string(),
            date: date.to_string(),
            key: key.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// PlotIndex: Selection menus over the stored images
// ---------------------------------------------------------------------------

/// Index of chart images, in listing order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlotIndex {
    entries: Vec<PlotKey>,
}

impl PlotIndex {
    /// Build from object keys, dropping any that do not parse.
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            entries: keys
                .into_iter()
                .filter_map(|k| PlotKey::parse(k.as_ref()))
                .collect(),
        }
    }

    pub fn entries(&self) -> &[PlotKey] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct symbols, ascending.
    pub fn stock_options(&self) -> Vec<String> {
        distinct(self.entries.iter().map(|e| e.symbol.as_str()))
    }

    /// Distinct dates, ascending.
    pub fn date_options(&self) -> Vec<String> {
        distinct(self.entries.iter().map(|e| e.date.as_str()))
    }

    /// Distinct dates that have an image for `symbol`, ascending.
    pub fn dates_for(&self, symbol: &str) -> Vec<String> {
        distinct(
            self.entries
                .iter()
                .filter(|e| e.symbol == symbol)
                .map(|e| e.date.as_str()),
        )
    }

    /// First entry for `(symbol, date)` in listing order. Later duplicates are unreachable.
    pub fn resolve(&self, symbol: &str, date: &str) -> Option<&PlotKey> {
        self.entries
            .iter()
            .find(|e| e.symbol == symbol && e.date == date)
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}
