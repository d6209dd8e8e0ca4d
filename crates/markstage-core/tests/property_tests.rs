//! # Property-Based Tests
//!
//! Invariants of the builder and selector over generated record sets.

use markstage_core::{
    GroupKey, Mode, Objective, ProductRecord, StageInput, StageLabel, StageMetricsBuilder,
    StageSelector, aggregate,
};
use proptest::collection::vec;
use proptest::prelude::*;
use std::collections::BTreeMap;

const CATEGORIES: [&str; 3] = ["Coats", "Shirts", "Shoes"];
const SEASONS: [&str; 2] = ["Summer", "Winter"];

fn stage_input() -> impl Strategy<Value = StageInput> {
    (0.0f64..=1.0, 0u32..500).prop_map(|(md, sales)| StageInput::new(md, f64::from(sales)))
}

fn record_strategy() -> impl Strategy<Value = ProductRecord> {
    (
        0usize..CATEGORIES.len(),
        0usize..SEASONS.len(),
        1u32..100_000,
        0u32..1000,
        [stage_input(), stage_input(), stage_input(), stage_input()],
    )
        .prop_map(|(cat, season, cents, stock, stages)| ProductRecord {
            product_id: String::new(),
            product_name: "Generated".to_string(),
            category: CATEGORIES[cat].to_string(),
            season: SEASONS[season].to_string(),
            brand: "Acme".to_string(),
            original_price: f64::from(cents) / 100.0,
            competitor_price: None,
            stock_level: f64::from(stock),
            historical_sales: None,
            seasonality_factor: None,
            customer_rating: None,
            return_rate: None,
            promotion_type: None,
            optimal_discount: None,
            stages,
        })
}

fn records_strategy(max: usize) -> impl Strategy<Value = Vec<ProductRecord>> {
    vec(record_strategy(), 1..max).prop_map(|mut records| {
        for (i, r) in records.iter_mut().enumerate() {
            r.product_id = format!("P-{i:04}");
        }
        records
    })
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Exactly four rows per record, M1..M4, in record order.
    #[test]
    fn four_rows_per_record(records in records_strategy(30)) {
        let metrics = StageMetricsBuilder::build(&records).expect("build");
        prop_assert_eq!(metrics.len(), records.len() * 4);

        for (record, block) in records.iter().zip(metrics.chunks(4)) {
            for (stage, row) in StageLabel::ALL.iter().zip(block) {
                prop_assert_eq!(row.stage, *stage);
                prop_assert_eq!(&row.product_id, &record.product_id);
                // Each row reads only its own stage tuple.
                prop_assert_eq!(row.markdown, record.stage(*stage).markdown);
                prop_assert_eq!(row.sales, record.stage(*stage).sales_after);
            }
        }
    }

    /// revenue == original_price * (1 - markdown) * sales.
    #[test]
    fn revenue_formula(records in records_strategy(20)) {
        let metrics = StageMetricsBuilder::build(&records).expect("build");
        for (record, block) in records.iter().zip(metrics.chunks(4)) {
            for row in block {
                let expected = record.original_price * (1.0 - row.markdown) * row.sales;
                prop_assert!(close(row.revenue, expected));
                prop_assert!(row.revenue >= 0.0);
            }
        }
    }

    /// Zero stock never divides; sell-through is 0.0.
    #[test]
    fn zero_stock_sell_through_is_zero(mut records in records_strategy(10)) {
        for r in &mut records {
            r.stock_level = 0.0;
        }
        let metrics = StageMetricsBuilder::build(&records).expect("build");
        prop_assert!(metrics.iter().all(|m| m.sell_through == 0.0));
    }

    /// Category revenue totals equal the sum of that category's product totals.
    #[test]
    fn grouped_sums_are_consistent(records in records_strategy(40)) {
        let metrics = StageMetricsBuilder::build(&records).expect("build");
        let by_category = aggregate(&metrics, GroupKey::Category).expect("aggregate");
        let by_product = aggregate(&metrics, GroupKey::Product).expect("aggregate");

        let mut product_category: BTreeMap<&str, &str> = BTreeMap::new();
        for r in &records {
            product_category.insert(r.product_id.as_str(), r.category.as_str());
        }

        for cat in &by_category {
            let category = cat.group.category.as_deref().expect("category group");
            let from_products: f64 = by_product
                .iter()
                .filter(|p| {
                    let id = p.group.product_id.as_deref().expect("product group");
                    product_category.get(id) == Some(&category)
                })
                .map(|p| p.revenue_sum)
                .sum();
            prop_assert!(close(cat.revenue_sum, from_products));
        }
    }

    /// The selected stage's score is the maximum, and no earlier stage reaches it.
    #[test]
    fn best_stage_is_earliest_max(records in records_strategy(20)) {
        let metrics = StageMetricsBuilder::build(&records).expect("build");
        for objective in [Objective::Revenue, Objective::SellThrough, Objective::Sales] {
            let best = StageSelector::new(objective)
                .best_rows(&metrics, GroupKey::Product)
                .expect("select");
            prop_assert_eq!(best.len(), records.len());

            for result in &best {
                let id = result.group.product_id.as_deref().expect("product group");
                let rows: Vec<_> = metrics.iter().filter(|m| m.product_id == id).collect();
                for row in &rows {
                    let score = objective.score(row);
                    prop_assert!(score <= result.score);
                    if row.stage < result.stage {
                        prop_assert!(score < result.score);
                    }
                }
            }
        }
    }

    /// All four stages tied: M1 wins, in every mode.
    #[test]
    fn full_tie_selects_m1(sales in 0u32..100, price in 1u32..1000) {
        let record = ProductRecord {
            product_id: "T".to_string(),
            product_name: "Tie".to_string(),
            category: "Coats".to_string(),
            season: "Winter".to_string(),
            brand: "Acme".to_string(),
            original_price: f64::from(price),
            competitor_price: None,
            stock_level: 10.0,
            historical_sales: None,
            seasonality_factor: None,
            customer_rating: None,
            return_rate: None,
            promotion_type: None,
            optimal_discount: None,
            stages: [StageInput::new(0.2, f64::from(sales)); 4],
        };
        let metrics = StageMetricsBuilder::build(&[record]).expect("build");
        for mode in [Mode::Best, Mode::Sum, Mode::Mean] {
            let best = StageSelector::new(Objective::Revenue)
                .with_mode(mode)
                .select(&metrics, GroupKey::Category)
                .expect("select");
            prop_assert_eq!(best[0].stage, StageLabel::M1);
        }
    }

    /// Same input, same output.
    #[test]
    fn selection_is_deterministic(records in records_strategy(25)) {
        let metrics = StageMetricsBuilder::build(&records).expect("build");
        let selector = StageSelector::new(Objective::Revenue).with_mode(Mode::Mean);
        let a = selector.select(&metrics, GroupKey::CategorySeason).expect("select");
        let b = selector.select(&metrics, GroupKey::CategorySeason).expect("select");
        prop_assert_eq!(a, b);
    }
}
