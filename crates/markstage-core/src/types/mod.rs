//! # Core Type Definitions
//!
//! This module contains the canonical types every other module works on:
//! - Stage identity (`StageLabel`)
//! - The wide input record (`ProductRecord`, `StageInput`)
//! - The long derived row (`StageMetric`)
//! - The crate error (`MarkstageError`)
//!
//! ## Canonical Shape
//!
//! `ProductRecord` is the ONE internal schema. External layouts are turned
//! into it by the adapters in [`crate::schema`]; nothing downstream of the
//! adapters ever inspects column names.

use crate::primitives::{MARKDOWN_MAX, MARKDOWN_MIN, STAGE_COUNT};
use crate::schema::{Field, SchemaError};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// STAGE LABEL
// =============================================================================

/// One of the four discount checkpoints.
///
/// The derive order IS the canonical order (`M1 < M2 < M3 < M4`) and is what
/// the selector uses to break ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StageLabel {
    M1,
    M2,
    M3,
    M4,
}

impl StageLabel {
    /// All stages in canonical order.
    pub const ALL: [StageLabel; STAGE_COUNT] =
        [StageLabel::M1, StageLabel::M2, StageLabel::M3, StageLabel::M4];

    /// Zero-based position in canonical order.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            StageLabel::M1 => 0,
            StageLabel::M2 => 1,
            StageLabel::M3 => 2,
            StageLabel::M4 => 3,
        }
    }

    /// Stage at a zero-based position, if any.
    #[must_use]
    pub const fn from_index(index: usize) -> Option<StageLabel> {
        match index {
            0 => Some(StageLabel::M1),
            1 => Some(StageLabel::M2),
            2 => Some(StageLabel::M3),
            3 => Some(StageLabel::M4),
            _ => None,
        }
    }

    /// One-based stage number as it appears in column names (`Markdown_3`).
    #[must_use]
    pub const fn number(self) -> usize {
        self.index() + 1
    }

    /// Parse a stage cell.
    ///
    /// Accepts `M1`, `m1`, `1` and `Markdown_1`-style spellings, with
    /// surrounding whitespace. Anything else is `None`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<StageLabel> {
        let lowered = raw.trim().to_ascii_lowercase();
        let digits = lowered
            .strip_prefix("markdown_")
            .or_else(|| lowered.strip_prefix("markdown"))
            .unwrap_or(lowered.as_str());
        let digits = digits.strip_prefix('m').unwrap_or(digits);
        match digits {
            "1" => Some(StageLabel::M1),
            "2" => Some(StageLabel::M2),
            "3" => Some(StageLabel::M3),
            "4" => Some(StageLabel::M4),
            _ => None,
        }
    }
}

impl fmt::Display for StageLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M{}", self.number())
    }
}

// =============================================================================
// PRODUCT RECORD (wide, input)
// =============================================================================

/// Markdown applied and units sold at one stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct StageInput {
    /// Discount fraction in `[0, 1]`.
    pub markdown: f64,
    /// Units sold after the markdown was applied.
    pub sales_after: f64,
}

impl StageInput {
    /// Create a new stage input.
    #[must_use]
    pub const fn new(markdown: f64, sales_after: f64) -> Self {
        Self {
            markdown,
            sales_after,
        }
    }
}

/// One product, one row, four stage tuples.
///
/// Immutable snapshot: loaded once, filtered by the host, never mutated by
/// the core. Descriptive attributes the computation never reads are
/// optional and are carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub product_id: String,
    pub product_name: String,
    pub category: String,
    pub season: String,
    pub brand: String,
    pub original_price: f64,
    pub competitor_price: Option<f64>,
    pub stock_level: f64,
    pub historical_sales: Option<f64>,
    pub seasonality_factor: Option<f64>,
    pub customer_rating: Option<f64>,
    pub return_rate: Option<f64>,
    pub promotion_type: Option<String>,
    /// Precomputed "optimal discount" label shipped with the dataset.
    /// Exposed as-is; never reconciled with the selector's choice.
    pub optimal_discount: Option<f64>,
    /// `(markdown, sales_after)` for M1..M4, indexed by `StageLabel::index`.
    pub stages: [StageInput; STAGE_COUNT],
}

impl ProductRecord {
    /// The input tuple for one stage.
    #[must_use]
    pub fn stage(&self, stage: StageLabel) -> StageInput {
        self.stages[stage.index()]
    }

    /// Validate the record invariants.
    ///
    /// A record is valid if:
    /// - every number is finite
    /// - `original_price >= 0` and `stock_level >= 0`
    /// - every markdown is in `[0, 1]`
    /// - every `sales_after >= 0`
    ///
    /// Monotonic markdown depth across stages is NOT required.
    pub fn validate(&self) -> Result<(), SchemaError> {
        self.check_non_negative(Field::OriginalPrice, self.original_price)?;
        self.check_non_negative(Field::StockLevel, self.stock_level)?;

        let optional = [
            (Field::CompetitorPrice, self.competitor_price),
            (Field::HistoricalSales, self.historical_sales),
            (Field::SeasonalityFactor, self.seasonality_factor),
            (Field::CustomerRating, self.customer_rating),
            (Field::ReturnRate, self.return_rate),
            (Field::OptimalDiscount, self.optimal_discount),
        ];
        for (field, value) in optional {
            if let Some(v) = value {
                self.check_finite(field, v)?;
            }
        }

        for stage in StageLabel::ALL {
            let input = self.stage(stage);
            self.check_finite(Field::Markdown(stage), input.markdown)?;
            if !(MARKDOWN_MIN..=MARKDOWN_MAX).contains(&input.markdown) {
                return Err(SchemaError::OutOfRange {
                    product_id: self.product_id.clone(),
                    field: Field::Markdown(stage),
                    value: input.markdown,
                    range: "[0, 1]",
                });
            }
            self.check_non_negative(Field::SalesAfter(stage), input.sales_after)?;
        }

        Ok(())
    }

    fn check_finite(&self, field: Field, value: f64) -> Result<(), SchemaError> {
        if value.is_finite() {
            Ok(())
        } else {
            Err(SchemaError::NonFinite {
                product_id: self.product_id.clone(),
                field,
            })
        }
    }

    fn check_non_negative(&self, field: Field, value: f64) -> Result<(), SchemaError> {
        self.check_finite(field, value)?;
        if value < 0.0 {
            return Err(SchemaError::OutOfRange {
                product_id: self.product_id.clone(),
                field,
                value,
                range: ">= 0",
            });
        }
        Ok(())
    }
}

// =============================================================================
// STAGE METRIC (long, derived)
// =============================================================================

/// Financial outcome of one product at one stage.
///
/// Field order is the stable column order of every tabular export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageMetric {
    pub product_id: String,
    pub product_name: String,
    pub category: String,
    pub season: String,
    pub brand: String,
    pub stage: StageLabel,
    pub markdown: f64,
    pub sales: f64,
    pub price_after: f64,
    pub revenue: f64,
    pub sell_through: f64,
    pub optimal_discount: Option<f64>,
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in Markstage.
///
/// - No silent failures, no sentinel values
/// - Use `Result<T, MarkstageError>` for fallible operations
/// - The core never panics; every error is surfaced to the caller
#[derive(Debug, Error)]
pub enum MarkstageError {
    /// Input could not be normalized into the canonical record shape.
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// A reduction that needs at least one row received none.
    #[error("Empty input: {0} requires at least one row")]
    EmptyInput(&'static str),

    /// Arg-max was requested over a group with no rows.
    #[error("Empty group: no rows for {0}")]
    EmptyGroup(String),

    /// The requested product id is not in the record set.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// An I/O error occurred (host side).
    #[error("I/O error: {0}")]
    IoError(String),

    /// A serialization or deserialization error occurred (host side).
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Configuration could not be read or is invalid (host side).
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

// =============================================================================
// TESTS
// =============================================================================
