//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.

use crate::loader::DatasetSummary;
use markstage_core::{
    BestStage, GroupAggregate, GroupKey, GroupValue, Mode, Objective, ProductReport,
    RecordFilter, StageLabel, StageMetric,
};
use serde::{Deserialize, Serialize};

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// SUMMARY RESPONSE
// =============================================================================

/// Dataset summary response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<DatasetSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SummaryResponse {
    #[must_use]
    pub fn success(summary: DatasetSummary) -> Self {
        Self {
            success: true,
            summary: Some(summary),
            error: None,
        }
    }

    #[must_use]
    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            summary: None,
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// STAGES REQUEST/RESPONSE
// =============================================================================

/// Per-stage metric request. Both filter fields are optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StagesRequest {
    #[serde(flatten)]
    pub filter: RecordFilter,
}

/// Per-stage metric rows, four per product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagesResponse {
    pub success: bool,
    #[serde(default)]
    pub rows: Vec<StageMetric>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StagesResponse {
    #[must_use]
    pub fn success(rows: Vec<StageMetric>) -> Self {
        Self {
            success: true,
            rows,
            error: None,
        }
    }

    #[must_use]
    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            rows: vec![],
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// BEST REQUEST/RESPONSE
// =============================================================================

fn default_best_key() -> GroupKey {
    GroupKey::Product
}

fn default_objective() -> Objective {
    Objective::Revenue
}

/// Best-stage request.
///
/// When `group` is set only that group is evaluated and an absent group
/// is an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BestRequest {
    #[serde(default = "default_best_key")]
    pub key: GroupKey,
    #[serde(default = "default_objective")]
    pub objective: Objective,
    #[serde(default)]
    pub mode: Mode,
    #[serde(flatten)]
    pub filter: RecordFilter,
    #[serde(default)]
    pub group: Option<GroupValue>,
}

/// Best-stage results, one per group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BestResponse {
    pub success: bool,
    #[serde(default)]
    pub results: Vec<BestStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BestResponse {
    #[must_use]
    pub fn success(results: Vec<BestStage>) -> Self {
        Self {
            success: true,
            results,
            error: None,
        }
    }

    #[must_use]
    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            results: vec![],
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// AGGREGATE REQUEST/RESPONSE
// =============================================================================

fn default_aggregate_key() -> GroupKey {
    GroupKey::Category
}

/// Grouped totals request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateRequest {
    #[serde(default = "default_aggregate_key")]
    pub key: GroupKey,
    #[serde(flatten)]
    pub filter: RecordFilter,
}

/// Grouped totals and means.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateResponse {
    pub success: bool,
    #[serde(default)]
    pub groups: Vec<GroupAggregate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AggregateResponse {
    #[must_use]
    pub fn success(groups: Vec<GroupAggregate>) -> Self {
        Self {
            success: true,
            groups,
            error: None,
        }
    }

    #[must_use]
    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            groups: vec![],
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// PRODUCT RESPONSE
// =============================================================================

/// Single-product report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ProductReport>,
    /// Stage whose markdown is nearest the dataset's optimal discount.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_stage: Option<StageLabel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stages_agree: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProductResponse {
    #[must_use]
    pub fn success(report: ProductReport) -> Self {
        Self {
            success: true,
            label_stage: report.label_stage(),
            stages_agree: Some(report.stages_agree()),
            report: Some(report),
            error: None,
        }
    }

    #[must_use]
    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            report: None,
            label_stage: None,
            stages_agree: None,
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// RELOAD RESPONSE
// =============================================================================

/// Result of re-reading the dataset file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReloadResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    pub products: usize,
    /// Whether the file content differed from the previous snapshot.
    pub changed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ReloadResponse {
    #[must_use]
    pub fn success(fingerprint: String, products: usize, changed: bool) -> Self {
        Self {
            success: true,
            fingerprint: Some(fingerprint),
            products,
            changed,
            error: None,
        }
    }

    #[must_use]
    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            fingerprint: None,
            products: 0,
            changed: false,
            error: Some(msg.into()),
        }
    }
}
