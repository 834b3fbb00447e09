//! Declared column layout of the daily result files.
//!
//! The parser validates incoming CSVs against [`RESULT_SCHEMA`], the unified
//! table is created from it, and the summarizer takes its aggregates from
//! [`SUMMARY_AGGREGATES`]. Nothing else hard-codes a column name.

pub const SYMBOL: &str = "Symbol";
pub const NET_PNL: &str = "Net_PnL";
pub const MAX_PNL: &str = "Max_PnL";
pub const DRAWDOWN: &str = "Drawdown";
/// Derived from the source key; never read from the file.
pub const DATE: &str = "Date";

/// Insertion order of a row in the unified table.
pub const ORDINAL_COLUMN: &str = "_ordinal";
/// Key of the file a row came from.
pub const SOURCE_COLUMN: &str = "_source_key";

/// Numeric cell spellings read as a missing value, compared case-insensitively
/// after trimming. Matches the usual CSV NA markers.
pub const MISSING_TOKENS: [&str; 9] = [
    "", "nan", "-nan", "na", "n/a", "#n/a", "null", "none", "<na>",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Number,
}

impl FieldType {
    pub fn sql_type(self) -> &'static str {
        match self {
            FieldType::Text => "VARCHAR",
            FieldType::Number => "DOUBLE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldType,
}

/// Ordered list of the columns a result file must provide.
#[derive(Debug, Clone, Copy)]
pub struct ResultSchema {
    fields: &'static [Field],
}

pub const RESULT_SCHEMA: ResultSchema = ResultSchema {
    fields: &[
        Field { name: SYMBOL, kind: FieldType::Text },
        Field { name: NET_PNL, kind: FieldType::Number },
        Field { name: MAX_PNL, kind: FieldType::Number },
        Field { name: DRAWDOWN, kind: FieldType::Number },
    ],
};

impl ResultSchema {
    pub fn fields(&self) -> &'static [Field] {
        self.fields
    }

    pub fn numeric_fields(&self) -> impl Iterator<Item = &'static Field> {
        self.fields.iter().filter(|f| f.kind == FieldType::Number)
    }

    /// Names of required columns absent from `header`.
    pub fn missing_columns(&self, header: &[String]) -> Vec<&'static str> {
        self.fields
            .iter()
            .filter(|f| !header.iter().any(|h| h == f.name))
            .map(|f| f.name)
            .collect()
    }

    /// True for names the unified table manages itself or takes from the schema.
    ///
    /// DuckDB identifiers are case-insensitive, so the comparison is too.
    pub fn is_reserved(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name.eq_ignore_ascii_case(name))
            || [DATE, ORDINAL_COLUMN, SOURCE_COLUMN]
                .iter()
                .any(|r| r.eq_ignore_ascii_case(name))
    }

    /// Columns of `header` carried through as text, in header order.
    pub fn extra_columns(&self, header: &[String]) -> Vec<String> {
        header
            .iter()
            .filter(|h| !self.is_reserved(h))
            .cloned()
            .collect()
    }

    /// `"Symbol", "Net_PnL", ..., <extras>, "Date"`, the exported column order.
    pub fn output_columns_sql(&self, extras: &[String]) -> String {
        self.fields
            .iter()
            .map(|f| quote_ident(f.name))
            .chain(extras.iter().map(|e| quote_ident(e)))
            .chain(std::iter::once(quote_ident(DATE)))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Column definitions for the unified table, schema fields then `Date`.
    pub fn table_columns_sql(&self) -> String {
        self.fields
            .iter()
            .map(|f| format!("{} {}", quote_ident(f.name), f.kind.sql_type()))
            .chain(std::iter::once(format!("{} VARCHAR", quote_ident(DATE))))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Sum,
    Max,
}

impl Aggregate {
    fn sql(self) -> &'static str {
        match self {
            Aggregate::Sum => "SUM",
            Aggregate::Max => "MAX",
        }
    }
}

/// One summary column: aggregate function, source column, output label.
#[derive(Debug, Clone, Copy)]
pub struct SummaryColumn {
    pub aggregate: Aggregate,
    pub source: &'static str,
    pub label: &'static str,
}

/// Per-symbol aggregates, in output order.
pub const SUMMARY_AGGREGATES: [SummaryColumn; 3] = [
    SummaryColumn { aggregate: Aggregate::Sum, source: NET_PNL, label: "Total Net PnL" },
    SummaryColumn { aggregate: Aggregate::Max, source: MAX_PNL, label: "Max Net PnL" },
    SummaryColumn { aggregate: Aggregate::Max, source: DRAWDOWN, label: "Max Drawdown" },
];

impl SummaryColumn {
    pub fn select_sql(&self) -> String {
        format!(
            "{}({}) AS {}",
            self.aggregate.sql(),
            quote_ident(self.source),
            quote_ident(self.label)
        )
    }
}

pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// SQL predicate: the text cell `col` holds a missing value.
pub fn missing_cell_sql(col: &str) -> String {
    let tokens: Vec<String> = MISSING_TOKENS
        .iter()
        .map(|t| format!("'{}'", t.replace('\'', "''")))
        .collect();
    format!(
        "({col} IS NULL OR lower(TRIM({col})) IN ({}))",
        tokens.join(", ")
    )
}

/// SQL expression: the text cell `col` as a DOUBLE, NULL when missing.
pub fn numeric_cell_sql(col: &str) -> String {
    format!(
        "CASE WHEN {} THEN NULL ELSE TRY_CAST(TRIM({col}) AS DOUBLE) END",
        missing_cell_sql(col)
    )
}
