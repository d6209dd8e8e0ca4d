//! # Primitives
//!
//! Fixed constants of the markdown-stage model.
//!
//! These are compiled in and immutable at runtime.

/// Number of markdown stages per product (M1..M4).
///
/// Every `ProductRecord` yields exactly this many `StageMetric` rows.
pub const STAGE_COUNT: usize = 4;

/// Lower bound of a markdown fraction.
pub const MARKDOWN_MIN: f64 = 0.0;

/// Upper bound of a markdown fraction.
pub const MARKDOWN_MAX: f64 = 1.0;

/// Maximum number of data rows a single table may carry into normalization.
///
/// Tables longer than this are rejected by the schema adapters.
/// This prevents memory exhaustion from malformed or hostile input.
pub const MAX_TABLE_ROWS: usize = 1_000_000;
