//! DuckDB connection wrapper holding the unified result table.
//!
//! Result CSVs are staged into a temp table with every column read as text,
//! validated against [`RESULT_SCHEMA`], then appended to the unified table
//! with the source date and an insertion ordinal. Columns outside the schema
//! are carried along as text; the unified table grows to the union of them.

use crate::error::{DashboardError, Result};
use crate::schema::{
    self, missing_cell_sql, numeric_cell_sql, quote_ident, ORDINAL_COLUMN, RESULT_SCHEMA,
    SOURCE_COLUMN,
};
use duckdb::{types::ValueRef, Connection as DuckDbConnection};
use serde::de::DeserializeOwned;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{debug, warn};

/// The unified dataset from the last successful load.
pub const RESULTS_TABLE: &str = "backtest_results";
/// Built during a load and swapped in on success.
pub const PENDING_TABLE: &str = "backtest_results_pending";
const STAGING_TABLE: &str = "staging_results";

/// Dialect every result file is read with. Nothing is sniffed but the header.
const CSV_OPTIONS: &str = "header = true, all_varchar = true, delim = ',', quote = '\"', \
                           escape = '\"', strict_mode = true, null_padding = false";

/// Wraps an in-memory DuckDB database.
pub struct Connection {
    conn: DuckDbConnection,
    registered_tables: RefCell<HashSet<String>>,
}

impl Connection {
    /// Open an in-memory database.
    ///
    /// Runs single-threaded so scans return rows in file order.
    pub fn new() -> Result<Self> {
        let conn = DuckDbConnection::open_in_memory()?;
        conn.execute_batch("SET threads TO 1")?;
        Ok(Self {
            conn,
            registered_tables: RefCell::new(HashSet::new()),
        })
    }

    /// Execute SQL and return results as a `Vec` of `HashMap`s.
    pub fn execute(
        &self,
        sql: &str,
        params: &[String],
    ) -> Result<Vec<HashMap<String, serde_json::Value>>> {
        let mut stmt = self.conn.prepare(sql)?;
        let param_values: Vec<&dyn duckdb::ToSql> =
            params.iter().map(|p| p as &dyn duckdb::ToSql).collect();

        let mut rows = stmt.query(param_values.as_slice())?;

        // Column metadata is only available once the query has run.
        let column_names: Vec<String> = rows
            .as_ref()
            .map(|s| s.column_names().into_iter().map(|c| c.to_string()).collect())
            .unwrap_or_default();

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut map = HashMap::with_capacity(column_names.len());
            for (i, name) in column_names.iter().enumerate() {
                map.insert(name.clone(), convert_value_ref(row.get_ref(i)?));
            }
            out.push(map);
        }
        Ok(out)
    }

    /// Execute SQL and deserialize each row into `T`.
    pub fn execute_into<T: DeserializeOwned>(&self, sql: &str, params: &[String]) -> Result<Vec<T>> {
        self.execute(sql, params)?
            .into_iter()
            .map(|row| {
                let value = serde_json::Value::Object(row.into_iter().collect());
                serde_json::from_value(value).map_err(DashboardError::from)
            })
            .collect()
    }

    /// Execute SQL and return the first column of the first row.
    pub fn execute_scalar(&self, sql: &str, params: &[String]) -> Result<Option<serde_json::Value>> {
        let mut stmt = self.conn.prepare(sql)?;
        let param_values: Vec<&dyn duckdb::ToSql> =
            params.iter().map(|p| p as &dyn duckdb::ToSql).collect();
        let mut rows = stmt.query(param_values.as_slice())?;
        match rows.next()? {
            Some(row) => Ok(Some(convert_value_ref(row.get_ref(0)?))),
            None => Ok(None),
        }
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.registered_tables.borrow().contains(name)
    }

    pub fn tables(&self) -> Vec<String> {
        let mut tables: Vec<String> = self.registered_tables.borrow().iter().cloned().collect();
        tables.sort();
        tables
    }

    /// Column names of `table` (or of any relation), in declaration order.
    pub fn column_names(&self, table: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT column_name FROM (DESCRIBE SELECT * FROM {})", table))?;
        let mut rows = stmt.query([])?;
        let mut names = Vec::new();
        while let Some(row) = rows.next()? {
            names.push(row.get(0)?);
        }
        Ok(names)
    }

    /// Text columns of `table` that came from the input files, in table order.
    pub fn extra_columns(&self, table: &str) -> Result<Vec<String>> {
        Ok(RESULT_SCHEMA.extra_columns(&self.column_names(table)?))
    }

    /// Access the underlying DuckDB connection for advanced usage.
    pub fn raw(&self) -> &DuckDbConnection {
        &self.conn
    }

    // -- Result table lifecycle --------------------------------------------

    /// (Re)create an empty result table laid out from the schema.
    pub(crate) fn create_result_table(&self, name: &str) -> Result<()> {
        self.conn.execute_batch(&format!(
            "CREATE OR REPLACE TABLE {} ({} BIGINT, {}, {} VARCHAR)",
            name,
            ORDINAL_COLUMN,
            RESULT_SCHEMA.table_columns_sql(),
            SOURCE_COLUMN
        ))?;
        self.registered_tables.borrow_mut().insert(name.to_string());
        Ok(())
    }

    pub(crate) fn drop_table(&self, name: &str) -> Result<()> {
        self.conn
            .execute_batch(&format!("DROP TABLE IF EXISTS {}", name))?;
        self.registered_tables.borrow_mut().remove(name);
        Ok(())
    }

    /// Replace `target` with `source`.
    pub(crate) fn promote(&self, source: &str, target: &str) -> Result<()> {
        self.conn.execute_batch(&format!(
            "DROP TABLE IF EXISTS {target}; ALTER TABLE {source} RENAME TO {target}",
        ))?;
        let mut tables = self.registered_tables.borrow_mut();
        tables.remove(source);
        tables.insert(target.to_string());
        Ok(())
    }

    /// Read a CSV file into the staging table and validate it.
    ///
    /// Any failure, from DuckDB's reader or from validation, is reported as
    /// [`DashboardError::Parse`] against `key`. Returns the staged row count.
    pub(crate) fn stage_csv(&self, key: &str, path: &Path) -> Result<usize> {
        let path_str = sql_path(path);
        self.conn
            .execute_batch(&format!(
                "CREATE OR REPLACE TEMP TABLE {} AS \
                 SELECT * FROM read_csv('{}', {})",
                STAGING_TABLE, path_str, CSV_OPTIONS
            ))
            .map_err(|e| DashboardError::parse(key, e.to_string()))?;

        self.validate_staged(key)?;

        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", STAGING_TABLE), [], |r| r.get(0))?;
        Ok(count as usize)
    }

    /// Check the staged header and cell contents against the schema.
    fn validate_staged(&self, key: &str) -> Result<()> {
        let header = self.column_names(STAGING_TABLE)?;
        let missing = RESULT_SCHEMA.missing_columns(&header);
        if !missing.is_empty() {
            return Err(DashboardError::parse(
                key,
                format!("missing column(s): {}", missing.join(", ")),
            ));
        }

        let empty_symbols: i64 = self.conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE NULLIF(TRIM({}), '') IS NULL",
                STAGING_TABLE,
                quote_ident(schema::SYMBOL)
            ),
            [],
            |r| r.get(0),
        )?;
        if empty_symbols > 0 {
            return Err(DashboardError::parse(
                key,
                format!("{} row(s) with an empty {}", empty_symbols, schema::SYMBOL),
            ));
        }

        for field in RESULT_SCHEMA.numeric_fields() {
            let col = quote_ident(field.name);
            let present = format!("NOT {}", missing_cell_sql(&col));

            let bad = self.execute_scalar(
                &format!(
                    "SELECT {col} FROM {} \
                     WHERE {present} AND TRY_CAST(TRIM({col}) AS DOUBLE) IS NULL \
                     LIMIT 1",
                    STAGING_TABLE
                ),
                &[],
            )?;
            if let Some(value) = bad {
                return Err(DashboardError::parse(
                    key,
                    format!("non-numeric value {} in column {}", value, field.name),
                ));
            }

            let non_finite = self.execute_scalar(
                &format!(
                    "SELECT {col} FROM {} \
                     WHERE {present} AND NOT isfinite(TRY_CAST(TRIM({col}) AS DOUBLE)) \
                     LIMIT 1",
                    STAGING_TABLE
                ),
                &[],
            )?;
            if let Some(value) = non_finite {
                return Err(DashboardError::parse(
                    key,
                    format!("non-finite value {} in column {}", value, field.name),
                ));
            }
        }

        Ok(())
    }

    /// Append the staged rows to `table`, tagged with `date` and `key`.
    ///
    /// Ordinals start at `first_ordinal` and follow file order. Staged columns
    /// outside the schema are added to `table` as text when it lacks them;
    /// rows from files without such a column hold NULL there.
    pub(crate) fn append_staged(
        &self,
        table: &str,
        key: &str,
        date: &str,
        first_ordinal: usize,
    ) -> Result<usize> {
        let extras = self.extra_columns(STAGING_TABLE)?;
        let existing = self.column_names(table)?;
        for extra in &extras {
            if !existing.iter().any(|c| c.eq_ignore_ascii_case(extra)) {
                self.conn.execute_batch(&format!(
                    "ALTER TABLE {} ADD COLUMN {} VARCHAR",
                    table,
                    quote_ident(extra)
                ))?;
                debug!(table, column = %extra, "added text column");
            }
        }

        let mut targets = vec![ORDINAL_COLUMN.to_string()];
        let mut values = vec![format!("{} + rowid", first_ordinal)];
        for field in RESULT_SCHEMA.fields() {
            let col = quote_ident(field.name);
            targets.push(col.clone());
            values.push(match field.kind {
                schema::FieldType::Text => col,
                schema::FieldType::Number => numeric_cell_sql(&col),
            });
        }
        for extra in &extras {
            targets.push(quote_ident(extra));
            values.push(quote_ident(extra));
        }
        targets.push(quote_ident(schema::DATE));
        values.push("?".to_string());
        targets.push(SOURCE_COLUMN.to_string());
        values.push("?".to_string());

        let sql = format!(
            "INSERT INTO {} ({}) SELECT {} FROM {} ORDER BY rowid",
            table,
            targets.join(", "),
            values.join(", "),
            STAGING_TABLE
        );
        let inserted = self.conn.execute(&sql, duckdb::params![date, key])?;
        debug!(key, date, rows = inserted, "appended staged rows");
        Ok(inserted)
    }

    /// Drop `table`, logging instead of failing. Used on cleanup paths.
    pub(crate) fn discard_table(&self, table: &str) {
        if let Err(e) = self.drop_table(table) {
            warn!(table, error = %e, "failed to drop scratch table");
        }
    }

    /// Write the result of `query` to `path` as CSV with a header row.
    pub(crate) fn copy_to_csv(&self, query: &str, path: &Path) -> Result<()> {
        self.conn.execute_batch(&format!(
            "COPY ({}) TO '{}' (HEADER, DELIMITER ',')",
            query,
            sql_path(path)
        ))?;
        Ok(())
    }
}

/// Forward slashes and escaped quotes, for paths embedded in SQL.
fn sql_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/").replace('\'', "''")
}

/// Convert a DuckDB `ValueRef` to a `serde_json::Value`.
fn convert_value_ref(val: ValueRef<'_>) -> serde_json::Value {
    use serde_json::Value;
    match val {
        ValueRef::Null => Value::Null,
        ValueRef::Boolean(b) => Value::Bool(b),
        ValueRef::TinyInt(n) => Value::Number(n.into()),
        ValueRef::SmallInt(n) => Value::Number(n.into()),
        ValueRef::Int(n) => Value::Number(n.into()),
        ValueRef::BigInt(n) => Value::Number(n.into()),
        ValueRef::HugeInt(n) => match i64::try_from(n) {
            Ok(i) => Value::Number(i.into()),
            Err(_) => Value::String(n.to_string()),
        },
        ValueRef::UBigInt(n) => Value::Number(n.into()),
        ValueRef::Float(f) => serde_json::Number::from_f64(f as f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        // NaN and infinities have no JSON form; treat them as missing.
        ValueRef::Double(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).to_string()),
        _ => Value::Null,
    }
}
