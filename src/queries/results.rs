//! The result aggregation pipeline.
//!
//! Lists the daily `aggregated_results_<DATE>.csv` files, tags every row with
//! the date taken from its key, concatenates them into one table and derives
//! the per-symbol summary and time series from it.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::config;
use crate::connection::{Connection, PENDING_TABLE, RESULTS_TABLE};
use crate::error::{DashboardError, Result};
use crate::models::{LoadProgress, LoadReport, ResultRow, SeriesPoint, SummaryRow, SymbolSeries};
use crate::schema::{
    self, quote_ident, ORDINAL_COLUMN, RESULT_SCHEMA, SOURCE_COLUMN, SUMMARY_AGGREGATES,
};
use crate::store::{KeyFilter, ObjectStore};

/// Fixed layout of the date embedded in result keys.
pub const DATE_FORMAT: &str = "%Y%m%d";

// ---------------------------------------------------------------------------
// Key and file naming helpers
// ---------------------------------------------------------------------------

/// Derive the `Date` value from a result key.
///
/// Takes the last path segment and strips `aggregated_results_` and `.csv`.
/// The remainder is returned as-is; it is only checked when a time series is
/// built from it.
pub fn date_from_key(key: &str) -> String {
    let file_name = key.rsplit('/').next().unwrap_or(key);
    file_name
        .replace(config::RESULT_FILE_PREFIX, "")
        .replace(config::RESULT_FILE_SUFFIX, "")
}

/// `all_results_<YYYYMMDD>.csv` for the given day.
pub fn export_file_name(date: NaiveDate) -> String {
    format!(
        "{}{}{}",
        config::EXPORT_FILE_PREFIX,
        date.format(DATE_FORMAT),
        config::RESULT_FILE_SUFFIX
    )
}

/// Export file name for today's local date.
pub fn default_export_file_name() -> String {
    export_file_name(chrono::Local::now().date_naive())
}

/// Parse a `YYYYMMDD` string, rejecting anything else.
pub fn parse_result_date(symbol: &str, value: &str) -> Result<NaiveDate> {
    let invalid = || DashboardError::InvalidDate {
        symbol: symbol.to_string(),
        value: value.to_string(),
    };
    if value.len() != 8 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| invalid())
}

/// Result files must be UTF-8 text.
fn check_encoding(key: &str, bytes: &[u8]) -> Result<()> {
    std::str::from_utf8(bytes)
        .map(|_| ())
        .map_err(|e| DashboardError::parse(key, format!("not valid UTF-8: {}", e)))
}

// ---------------------------------------------------------------------------
// ResultQuery
// ---------------------------------------------------------------------------

/// Loads and queries the unified backtest result dataset.
pub struct ResultQuery<'a> {
    conn: &'a Connection,
    store: &'a dyn ObjectStore,
    prefix: &'a str,
}

impl<'a> ResultQuery<'a> {
    pub fn new(conn: &'a Connection, store: &'a dyn ObjectStore, prefix: &'a str) -> Self {
        Self {
            conn,
            store,
            prefix,
        }
    }

    // -- Loading -----------------------------------------------------------

    /// Sorted keys of every daily result file under the results prefix.
    pub fn list_sources(&self) -> Result<Vec<String>> {
        self.store.list(self.prefix, &KeyFilter::result_files())
    }

    /// Rebuild the unified dataset from the store.
    ///
    /// Fails with [`DashboardError::NoData`] when no result files exist and
    /// with [`DashboardError::Parse`] on the first malformed file. On failure
    /// the previously loaded dataset, if any, is left untouched.
    pub fn load(&self) -> Result<LoadReport> {
        self.load_with_progress(|p| {
            info!(
                loaded = p.loaded,
                total = p.total,
                "Loaded: {}",
                p.file_name()
            );
        })
    }

    /// Like [`load`](Self::load), reporting progress after every file.
    pub fn load_with_progress<F>(&self, mut on_progress: F) -> Result<LoadReport>
    where
        F: FnMut(LoadProgress<'_>),
    {
        let keys = self.list_sources()?;
        if keys.is_empty() {
            return Err(DashboardError::NoData(format!(
                "no result files found under '{}' in {}",
                self.prefix,
                self.store.location()
            )));
        }

        let total = keys.len();
        let objects = keys.iter().map(|key| {
            let bytes = self.store.fetch(key)?;
            Ok((key.as_str(), bytes))
        });
        self.ingest(objects, total, &mut on_progress)
    }

    /// Build the unified dataset from `(key, bytes)` pairs already in hand.
    ///
    /// Pairs are loaded in the order given.
    pub fn load_objects(&self, objects: &[(String, Vec<u8>)]) -> Result<LoadReport> {
        if objects.is_empty() {
            return Err(DashboardError::NoData("no result files given".into()));
        }
        let iter = objects.iter().map(|(k, b)| Ok((k.as_str(), b.clone())));
        self.ingest(iter, objects.len(), &mut |_: LoadProgress<'_>| {})
    }

    fn ingest<'k, I>(
        &self,
        objects: I,
        total: usize,
        on_progress: &mut dyn FnMut(LoadProgress<'_>),
    ) -> Result<LoadReport>
    where
        I: Iterator<Item = Result<(&'k str, Vec<u8>)>>,
    {
        let scratch = tempfile::tempdir()?;
        self.conn.create_result_table(PENDING_TABLE)?;

        let outcome = (|| -> Result<LoadReport> {
            let mut sources = Vec::with_capacity(total);
            let mut rows = 0usize;

            for (idx, object) in objects.enumerate() {
                let (key, bytes) = object?;
                let date = date_from_key(key);
                check_encoding(key, &bytes)?;
                let path = scratch.path().join(format!("{:05}.csv", idx));
                std::fs::write(&path, &bytes)?;

                self.conn.stage_csv(key, &path)?;
                rows += self.conn.append_staged(PENDING_TABLE, key, &date, rows)?;
                sources.push(key.to_string());

                on_progress(LoadProgress {
                    loaded: idx + 1,
                    total,
                    key,
                });
            }

            Ok(LoadReport { sources, rows })
        })();

        match outcome {
            Ok(report) => {
                if let Err(e) = self.conn.promote(PENDING_TABLE, RESULTS_TABLE) {
                    self.conn.discard_table(PENDING_TABLE);
                    return Err(e);
                }
                info!(
                    files = report.sources.len(),
                    rows = report.rows,
                    "result dataset rebuilt"
                );
                Ok(report)
            }
            Err(e) => {
                self.conn.discard_table(PENDING_TABLE);
                Err(e)
            }
        }
    }

    /// Parse and tag one result file without touching the loaded dataset.
    pub fn parse_result_table(&self, key: &str, bytes: &[u8]) -> Result<Vec<ResultRow>> {
        const SCRATCH_TABLE: &str = "parsed_results";

        check_encoding(key, bytes)?;
        let scratch = tempfile::tempdir()?;
        let path = scratch.path().join("parse.csv");
        std::fs::write(&path, bytes)?;

        self.conn.create_result_table(SCRATCH_TABLE)?;
        let parsed = (|| -> Result<Vec<ResultRow>> {
            self.conn.stage_csv(key, &path)?;
            self.conn
                .append_staged(SCRATCH_TABLE, key, &date_from_key(key), 0)?;
            self.select_rows(SCRATCH_TABLE)
        })();
        self.conn.discard_table(SCRATCH_TABLE);
        parsed
    }

    // -- Queries -----------------------------------------------------------

    fn ensure_loaded(&self) -> Result<()> {
        if self.conn.has_table(RESULTS_TABLE) {
            Ok(())
        } else {
            Err(DashboardError::NoData("results have not been loaded".into()))
        }
    }

    /// Schema columns, carried text columns and `Date`, in dataset order.
    fn output_query(&self, table: &str) -> Result<String> {
        let extras = self.conn.extra_columns(table)?;
        Ok(format!(
            "SELECT {} FROM {} ORDER BY {}",
            RESULT_SCHEMA.output_columns_sql(&extras),
            table,
            ORDINAL_COLUMN
        ))
    }

    fn select_rows(&self, table: &str) -> Result<Vec<ResultRow>> {
        self.conn.execute_into(&self.output_query(table)?, &[])
    }

    /// Every row of the unified dataset, in load order.
    pub fn rows(&self) -> Result<Vec<ResultRow>> {
        self.ensure_loaded()?;
        self.select_rows(RESULTS_TABLE)
    }

    pub fn row_count(&self) -> Result<usize> {
        self.ensure_loaded()?;
        let count = self
            .conn
            .execute_scalar(&format!("SELECT COUNT(*) FROM {}", RESULTS_TABLE), &[])?
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        Ok(count as usize)
    }

    /// Source keys that contributed to the dataset, in load order.
    pub fn sources(&self) -> Result<Vec<String>> {
        self.ensure_loaded()?;
        let rows = self.conn.execute(
            &format!(
                "SELECT {src} AS source_key FROM {} GROUP BY {src} ORDER BY MIN({})",
                RESULTS_TABLE,
                ORDINAL_COLUMN,
                src = SOURCE_COLUMN
            ),
            &[],
        )?;
        Ok(rows
            .into_iter()
            .filter_map(|r| r.get("source_key").and_then(|v| v.as_str()).map(String::from))
            .collect())
    }

    /// Distinct symbols, ascending.
    pub fn symbols(&self) -> Result<Vec<String>> {
        self.ensure_loaded()?;
        let symbol = quote_ident(schema::SYMBOL);
        let rows = self.conn.execute(
            &format!(
                "SELECT DISTINCT {symbol} AS symbol FROM {} ORDER BY symbol",
                RESULTS_TABLE
            ),
            &[],
        )?;
        Ok(rows
            .into_iter()
            .filter_map(|r| r.get("symbol").and_then(|v| v.as_str()).map(String::from))
            .collect())
    }

    /// One row per symbol: total Net PnL, max Max PnL, max Drawdown.
    ///
    /// Ordered by symbol ascending. Missing values are skipped; an aggregate
    /// over only missing values is `None`.
    pub fn summary(&self) -> Result<Vec<SummaryRow>> {
        self.ensure_loaded()?;
        let symbol = quote_ident(schema::SYMBOL);
        let aggregates: Vec<String> = SUMMARY_AGGREGATES.iter().map(|c| c.select_sql()).collect();
        let sql = format!(
            "SELECT {symbol}, {} FROM {} GROUP BY {symbol} ORDER BY {symbol}",
            aggregates.join(", "),
            RESULTS_TABLE
        );
        self.conn.execute_into(&sql, &[])
    }

    /// Net PnL by day for one symbol, ascending by date.
    ///
    /// Every `Date` of the symbol must be a valid `YYYYMMDD`; the first one
    /// that is not fails the whole series with [`DashboardError::InvalidDate`].
    /// Rows sharing a date keep load order.
    pub fn time_series(&self, symbol: &str) -> Result<SymbolSeries> {
        self.ensure_loaded()?;
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ? ORDER BY {}",
            RESULT_SCHEMA.output_columns_sql(&[]),
            RESULTS_TABLE,
            quote_ident(schema::SYMBOL),
            ORDINAL_COLUMN
        );
        let rows: Vec<ResultRow> = self.conn.execute_into(&sql, &[symbol.to_string()])?;
        if rows.is_empty() {
            return Err(DashboardError::NotFound(format!(
                "no results for symbol {}",
                symbol
            )));
        }

        let mut points = rows
            .iter()
            .map(|r| {
                Ok(SeriesPoint {
                    date: parse_result_date(symbol, &r.date)?,
                    net_pnl: r.net_pnl,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        points.sort_by_key(|p| p.date);

        Ok(SymbolSeries {
            symbol: symbol.to_string(),
            points,
        })
    }

    // -- Export ------------------------------------------------------------

    /// Write the unified dataset to `path` as CSV.
    ///
    /// Columns are the schema fields, every carried text column, then `Date`.
    pub fn export_csv(&self, path: &Path) -> Result<()> {
        self.ensure_loaded()?;
        self.conn.copy_to_csv(&self.output_query(RESULTS_TABLE)?, path)
    }

    /// The unified dataset as CSV bytes.
    pub fn export_csv_bytes(&self) -> Result<Vec<u8>> {
        self.ensure_loaded()?;
        let scratch = tempfile::tempdir()?;
        let path = scratch.path().join(default_export_file_name());
        self.conn.copy_to_csv(&self.output_query(RESULTS_TABLE)?, &path)?;
        Ok(std::fs::read(&path)?)
    }

    /// Write `all_results_<today>.csv` into `dir` and return its path.
    pub fn export_to_dir(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(default_export_file_name());
        self.export_csv(&path)?;
        info!(path = %path.display(), "exported results");
        Ok(path)
    }

    /// Write the export into the platform download directory.
    pub fn export_to_downloads(&self) -> Result<PathBuf> {
        let dir = config::default_export_dir();
        if !dir.exists() {
            warn!(dir = %dir.display(), "download directory missing; creating it");
        }
        self.export_to_dir(&dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_from_key_strips_prefix_and_suffix() {
        assert_eq!(
            date_from_key("combined/2025/aggregated_results_20250101.csv"),
            "20250101"
        );
        assert_eq!(date_from_key("aggregated_results_20250102.csv"), "20250102");
    }

    #[test]
    fn date_from_key_passes_malformed_dates_through() {
        assert_eq!(date_from_key("x/aggregated_results_latest.csv"), "latest");
        assert_eq!(date_from_key("x/run1_aggregated_results_2025.csv"), "run1_2025");
    }

    #[test]
    fn export_file_name_uses_compact_date() {
        let d = NaiveDate::from_ymd_opt(2025, 4, 7).unwrap();
        assert_eq!(export_file_name(d), "all_results_20250407.csv");
    }

    #[test]
    fn parse_result_date_is_strict() {
        assert_eq!(
            parse_result_date("AAPL", "20250101").unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
        );
        for bad in ["2025-01-01", "2025011", "20251301", "latest", ""] {
            let err = parse_result_date("AAPL", bad).unwrap_err();
            assert!(
                matches!(err, DashboardError::InvalidDate { ref value, .. } if value == bad),
                "{bad} should be rejected"
            );
        }
    }
}
