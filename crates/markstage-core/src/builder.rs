//! # Stage Metrics Builder
//!
//! Reshapes wide `ProductRecord`s into long `StageMetric` rows.
//!
//! - Exactly 4 rows per record, M1..M4, in input record order
//! - Each row reads only its own stage tuple
//! - Pure: no hidden state, no I/O
//!
//! Per stage:
//!
//! ```text
//! price_after  = original_price * (1 - markdown)
//! revenue      = price_after * sales_after
//! sell_through = sales_after / stock_level   if stock_level > 0
//!              = 0.0                         otherwise
//! ```

use crate::primitives::STAGE_COUNT;
use crate::{MarkstageError, ProductRecord, StageLabel, StageMetric};

/// The StageMetricsBuilder turns records into per-stage metric rows.
pub struct StageMetricsBuilder;

impl StageMetricsBuilder {
    /// Build the long table for a record set.
    ///
    /// Every record is validated first; the first invalid record aborts the
    /// whole call with a schema error. An empty input yields an empty output.
    pub fn build(records: &[ProductRecord]) -> Result<Vec<StageMetric>, MarkstageError> {
        let mut metrics = Vec::with_capacity(records.len() * STAGE_COUNT);
        for record in records {
            record.validate()?;
            metrics.extend(Self::stage_metrics(record));
        }
        Ok(metrics)
    }

    /// Build the long table across records with rayon.
    ///
    /// Output is identical to [`StageMetricsBuilder::build`]: the collect is
    /// order-preserving, so downstream tie-breaks see the same row order.
    #[cfg(feature = "parallel")]
    pub fn build_parallel(records: &[ProductRecord]) -> Result<Vec<StageMetric>, MarkstageError> {
        use rayon::prelude::*;

        let blocks = records
            .par_iter()
            .map(|record| {
                record.validate()?;
                Ok(Self::stage_metrics(record))
            })
            .collect::<Result<Vec<_>, MarkstageError>>()?;

        Ok(blocks.into_iter().flatten().collect())
    }

    /// The four rows of one record, in stage order.
    ///
    /// Does not validate; callers holding unchecked records should go
    /// through [`StageMetricsBuilder::build`].
    #[must_use]
    pub fn stage_metrics(record: &ProductRecord) -> [StageMetric; STAGE_COUNT] {
        StageLabel::ALL.map(|stage| Self::stage_metric(record, stage))
    }

    fn stage_metric(record: &ProductRecord, stage: StageLabel) -> StageMetric {
        let input = record.stage(stage);
        let price_after = record.original_price * (1.0 - input.markdown);
        let revenue = price_after * input.sales_after;
        let sell_through = if record.stock_level > 0.0 {
            input.sales_after / record.stock_level
        } else {
            0.0
        };

        StageMetric {
            product_id: record.product_id.clone(),
            product_name: record.product_name.clone(),
            category: record.category.clone(),
            season: record.season.clone(),
            brand: record.brand.clone(),
            stage,
            markdown: input.markdown,
            sales: input.sales_after,
            price_after,
            revenue,
            sell_through,
            optimal_discount: record.optimal_discount,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
