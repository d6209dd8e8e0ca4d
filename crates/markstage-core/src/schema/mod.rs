//! # Schema Normalization
//!
//! Turns externally shaped tables into canonical [`ProductRecord`]s.
//!
//! - `RawTable`: the neutral table a host hands over (headers + string cells)
//! - `FieldAliases`: the documented header-spelling lookup table
//! - `WideAdapter`: one row per product, four markdown/sales column pairs
//! - `LongAdapter`: one row per (product, stage), already melted
//!
//! Column-name variants are resolved here and only here. Computation
//! modules receive `ProductRecord`s and never branch on input shape.

mod cells;
mod field;
mod long;
mod wide;

pub use field::{Field, FieldAliases, fold_header};
pub use long::LongAdapter;
pub use wide::WideAdapter;

use crate::primitives::MAX_TABLE_ROWS;
use crate::{ProductRecord, StageLabel};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// RAW TABLE
// =============================================================================

/// A header row plus string cells, exactly as read from the source.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Create a table from headers and rows.
    #[must_use]
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Number of data rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the table has no data rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn check_size(&self) -> Result<(), SchemaError> {
        if self.rows.len() > MAX_TABLE_ROWS {
            return Err(SchemaError::TooManyRows(self.rows.len()));
        }
        Ok(())
    }
}

// =============================================================================
// ADAPTER TRAIT
// =============================================================================

/// One implementation per external table layout.
///
/// Adapters are stateless apart from the alias table they resolve headers
/// with, and produce validated records in input order.
pub trait SchemaAdapter {
    /// Normalize a raw table into canonical records.
    fn normalize(&self, table: &RawTable) -> Result<Vec<ProductRecord>, SchemaError>;
}

/// The external layouts the adapters understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaKind {
    /// One row per product with `Markdown_i` / `Sales_After_Mi` pairs.
    Wide,
    /// One row per (product, stage) with `Stage` / `Markdown` / `Sales`.
    Long,
}

impl SchemaKind {
    /// Guess the layout of a table from its headers.
    ///
    /// A resolvable `Stage` column means long form; anything else is treated
    /// as wide form and left to the wide adapter to reject. Intended for
    /// hosts offering an "auto" setting.
    pub fn detect(table: &RawTable, aliases: &FieldAliases) -> SchemaKind {
        if table
            .headers
            .iter()
            .any(|h| aliases.resolve(h) == Some(Field::Stage))
        {
            SchemaKind::Long
        } else {
            SchemaKind::Wide
        }
    }

    /// Normalize `table` with the adapter for this layout.
    pub fn normalize(
        self,
        table: &RawTable,
        aliases: &FieldAliases,
    ) -> Result<Vec<ProductRecord>, SchemaError> {
        match self {
            SchemaKind::Wide => WideAdapter::new(aliases).normalize(table),
            SchemaKind::Long => LongAdapter::new(aliases).normalize(table),
        }
    }
}

impl std::str::FromStr for SchemaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wide" => Ok(SchemaKind::Wide),
            "long" => Ok(SchemaKind::Long),
            other => Err(format!("unknown schema '{}'. Use: wide, long", other)),
        }
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// A table could not be normalized into canonical records.
///
/// Cell-level variants carry the 1-based data row (header excluded).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("missing required column: {0}")]
    MissingColumn(Field),

    #[error("columns '{first}' and '{second}' both map to {field}")]
    AmbiguousColumn {
        field: Field,
        first: String,
        second: String,
    },

    #[error("row {row}: expected {expected} cells, found {found}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("row {row}: missing value for {field}")]
    MissingValue { row: usize, field: Field },

    #[error("row {row}: {field} is not numeric: '{value}'")]
    NotNumeric {
        row: usize,
        field: Field,
        value: String,
    },

    #[error("row {row}: column '{column}' is not valid UTF-8 text")]
    NotText { row: usize, column: String },

    #[error("product {product_id}: {field} is not finite")]
    NonFinite { product_id: String, field: Field },

    #[error("product {product_id}: {field} = {value} is outside {range}")]
    OutOfRange {
        product_id: String,
        field: Field,
        value: f64,
        range: &'static str,
    },

    #[error("row {row}: unknown stage '{value}'")]
    UnknownStage { row: usize, value: String },

    #[error("product {product_id}: stage {stage} is missing")]
    MissingStage {
        product_id: String,
        stage: StageLabel,
    },

    #[error("product {product_id}: stage {stage} appears more than once (row {row})")]
    DuplicateStage {
        product_id: String,
        stage: StageLabel,
        row: usize,
    },

    #[error("product {product_id}: {field} differs between rows {first_row} and {row}")]
    InconsistentProduct {
        product_id: String,
        field: Field,
        first_row: usize,
        row: usize,
    },

    #[error("table has {0} rows, maximum is {max}", max = MAX_TABLE_ROWS)]
    TooManyRows(usize),
}

// =============================================================================
// TESTS
// =============================================================================
