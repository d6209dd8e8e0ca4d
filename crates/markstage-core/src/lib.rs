//! # markstage-core
//!
//! The deterministic markdown-stage engine for Markstage - THE LOGIC.
//!
//! For every product in a retail markdown dataset this crate computes the
//! outcome (price after discount, revenue, sell-through) at each of four
//! sequential discount stages M1..M4, then picks the best stage per group
//! under a caller-chosen objective.
//!
//! ## Data Flow
//!
//! ```text
//! RawTable -> SchemaAdapter -> ProductRecord[] -> StageMetricsBuilder
//!          -> StageMetric[] -> StageSelector / aggregate -> results
//! ```
//!
//! ## Architectural Constraints
//!
//! - Pure Rust: NO async, NO network, NO file I/O
//! - Deterministic: BTreeMap ordering, stage-order tie-breaks
//! - Stateless: every operation is a function of its input rows
//! - Column names are resolved in `schema` and nowhere else

// =============================================================================
// MODULES
// =============================================================================

pub mod builder;
pub mod filter;
pub mod primitives;
pub mod report;
pub mod schema;
pub mod selector;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{MarkstageError, ProductRecord, StageInput, StageLabel, StageMetric};

// =============================================================================
// RE-EXPORTS: Schema Normalization
// =============================================================================

pub use schema::{
    Field, FieldAliases, LongAdapter, RawTable, SchemaAdapter, SchemaError, SchemaKind,
    WideAdapter,
};

// =============================================================================
// RE-EXPORTS: Computation
// =============================================================================

pub use builder::StageMetricsBuilder;
pub use filter::RecordFilter;
pub use report::ProductReport;
pub use selector::{
    BestStage, GroupAggregate, GroupKey, GroupValue, Mode, Objective, StageSelector, aggregate,
};
