//! # Product Report
//!
//! Stage-by-stage view of a single product with its best revenue and best
//! sell-through stages.
//!
//! The dataset's `optimal_discount` label is reported next to the computed
//! stages. Its relation to them is unknown, so it is never used to override
//! or check them: [`ProductReport::label_stage`] only locates it.

use crate::selector::{GroupKey, GroupValue, Objective, StageSelector};
use crate::{MarkstageError, ProductRecord, StageLabel, StageMetric, StageMetricsBuilder};
use serde::{Deserialize, Serialize};

/// Analysis of one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductReport {
    pub record: ProductRecord,
    /// M1..M4 in stage order.
    pub metrics: Vec<StageMetric>,
    pub best_revenue: StageLabel,
    pub best_sell_through: StageLabel,
    pub optimal_discount: Option<f64>,
}

impl ProductReport {
    /// Build the report for `product_id`.
    ///
    /// Uses the first record with that id. Fails with `ProductNotFound` if
    /// there is none, or with a schema error if the record is invalid.
    pub fn for_product(
        records: &[ProductRecord],
        product_id: &str,
    ) -> Result<Self, MarkstageError> {
        let record = records
            .iter()
            .find(|r| r.product_id == product_id)
            .ok_or_else(|| MarkstageError::ProductNotFound(product_id.to_string()))?;
        Self::from_record(record.clone())
    }

    /// Build the report for an already selected record.
    pub fn from_record(record: ProductRecord) -> Result<Self, MarkstageError> {
        let metrics = StageMetricsBuilder::build(std::slice::from_ref(&record))?;
        let group = GroupValue::product(&record.product_id);

        let best_revenue = StageSelector::new(Objective::Revenue)
            .best_in_group(&metrics, GroupKey::Product, &group)?
            .stage;
        let best_sell_through = StageSelector::new(Objective::SellThrough)
            .best_in_group(&metrics, GroupKey::Product, &group)?
            .stage;

        Ok(Self {
            optimal_discount: record.optimal_discount,
            record,
            metrics,
            best_revenue,
            best_sell_through,
        })
    }

    /// Check if revenue and sell-through favour the same stage.
    #[must_use]
    pub fn stages_agree(&self) -> bool {
        self.best_revenue == self.best_sell_through
    }

    /// The stage whose markdown is nearest the `optimal_discount` label.
    ///
    /// Equal distances go to the earliest stage. `None` without a label.
    #[must_use]
    pub fn label_stage(&self) -> Option<StageLabel> {
        let label = self.optimal_discount?;
        let mut nearest: Option<(f64, StageLabel)> = None;
        for stage in StageLabel::ALL {
            let distance = (self.record.stage(stage).markdown - label).abs();
            match nearest {
                Some((best, _)) if distance >= best => {}
                _ => nearest = Some((distance, stage)),
            }
        }
        nearest.map(|(_, stage)| stage)
    }
}
