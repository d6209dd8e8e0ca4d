//! # Validation Tier Tests (T0-T3)
//!
//! If ANY tier fails, the results are INVALID.
//!
//! ## Tiers
//! - T0: Schema Normalization
//! - T1: Stage Metrics
//! - T2: Best-Stage Selection
//! - T3: Aggregation and Reports

use markstage_core::{
    FieldAliases, GroupKey, GroupValue, MarkstageError, Mode, Objective, ProductRecord,
    ProductReport, RawTable, RecordFilter, SchemaAdapter, SchemaError, SchemaKind, StageLabel,
    StageMetricsBuilder, StageSelector, aggregate,
};

const WIDE_HEADERS: [&str; 15] = [
    "Product_ID",
    "Product_Name",
    "Category",
    "Season",
    "Brand",
    "Original_Price",
    "Stock_Level",
    "Markdown_1",
    "Markdown_2",
    "Markdown_3",
    "Markdown_4",
    "Sales_After_M1",
    "Sales_After_M2",
    "Sales_After_M3",
    "Sales_After_M4",
];

fn wide_table(rows: &[[&str; 15]]) -> RawTable {
    RawTable::new(
        WIDE_HEADERS.iter().map(|h| h.to_string()).collect(),
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect(),
    )
}

/// The documented worked example plus two more products.
fn dataset() -> Vec<ProductRecord> {
    let table = wide_table(&[
        [
            "P-1", "Linen Shirt", "Shirts", "Summer", "Northwind", "100", "50", "0.1", "0.2",
            "0.3", "0.4", "10", "12", "15", "8",
        ],
        [
            "P-2", "Oxford Shirt", "Shirts", "Winter", "Northwind", "80", "0", "0.1", "0.2",
            "0.3", "0.5", "5", "5", "5", "5",
        ],
        [
            "P-3", "Wool Coat", "Coats", "Winter", "Fjord", "200", "40", "0.05", "0.1", "0.2",
            "0.3", "2", "4", "6", "20",
        ],
    ]);
    SchemaKind::Wide
        .normalize(&table, &FieldAliases::builtin())
        .expect("normalize")
}

// =============================================================================
// TIER T0: SCHEMA NORMALIZATION
// =============================================================================

mod t0_schema_normalization {
    use super::*;
    use markstage_core::{Field, LongAdapter, WideAdapter};

    /// T0.1: Wide and long layouts of the same data normalize identically.
    #[test]
    fn wide_and_long_agree() {
        let wide = dataset();

        let mut rows = Vec::new();
        for r in &wide {
            for stage in StageLabel::ALL.iter().rev() {
                let input = r.stage(*stage);
                rows.push(vec![
                    r.product_id.clone(),
                    r.product_name.clone(),
                    r.category.clone(),
                    r.season.clone(),
                    r.brand.clone(),
                    r.original_price.to_string(),
                    r.stock_level.to_string(),
                    stage.to_string(),
                    input.markdown.to_string(),
                    input.sales_after.to_string(),
                ]);
            }
        }
        let headers = [
            "product id", "name", "category", "season", "brand", "price", "stock", "stage",
            "markdown", "sales",
        ];
        let table = RawTable::new(headers.iter().map(|h| h.to_string()).collect(), rows);

        let aliases = FieldAliases::builtin();
        assert_eq!(SchemaKind::detect(&table, &aliases), SchemaKind::Long);
        let long = LongAdapter::new(&aliases).normalize(&table).expect("long");
        assert_eq!(long, wide);
    }

    /// T0.2: Header spelling variants resolve to the same fields.
    #[test]
    fn header_variants_resolve() {
        let mut table = wide_table(&[[
            "P-9", "Tee", "Shirts", "Summer", "Acme", "10", "5", "0", "0", "0", "0", "1", "1",
            "1", "1",
        ]]);
        table.headers[0] = " SKU ".to_string();
        table.headers[6] = "Stock-Level".to_string();
        table.headers[7] = "markdown_m1".to_string();

        let aliases = FieldAliases::builtin();
        let records = WideAdapter::new(&aliases).normalize(&table).expect("normalize");
        assert_eq!(records[0].product_id, "P-9");
        assert_eq!(records[0].stock_level, 5.0);
    }

    /// T0.3: A missing required column fails before any row is read.
    #[test]
    fn missing_column_rejected() {
        let mut table = wide_table(&[]);
        table.headers.retain(|h| h != "Stock_Level");
        let err = SchemaKind::Wide
            .normalize(&table, &FieldAliases::builtin())
            .expect_err("missing");
        assert_eq!(err, SchemaError::MissingColumn(Field::StockLevel));
    }

    /// T0.4: Negative sales are out of range.
    #[test]
    fn negative_sales_rejected() {
        let table = wide_table(&[[
            "P-9", "Tee", "Shirts", "Summer", "Acme", "10", "5", "0", "0", "0", "0", "1", "-1",
            "1", "1",
        ]]);
        let err = SchemaKind::Wide
            .normalize(&table, &FieldAliases::builtin())
            .expect_err("negative");
        assert!(matches!(err, SchemaError::OutOfRange { .. }));
    }
}

// =============================================================================
// TIER T1: STAGE METRICS
// =============================================================================

mod t1_stage_metrics {
    use super::*;

    /// T1.1: Worked example revenues are 900 / 960 / 1050 / 480.
    #[test]
    fn worked_example_revenue() {
        let metrics = StageMetricsBuilder::build(&dataset()[..1]).expect("build");
        let revenue: Vec<f64> = metrics.iter().map(|m| m.revenue).collect();
        for (got, want) in revenue.iter().zip([900.0, 960.0, 1050.0, 480.0]) {
            assert!((got - want).abs() < 1e-9);
        }
    }

    /// T1.2: Worked example sell-through is .20 / .24 / .30 / .16.
    #[test]
    fn worked_example_sell_through() {
        let metrics = StageMetricsBuilder::build(&dataset()[..1]).expect("build");
        for (m, want) in metrics.iter().zip([0.20, 0.24, 0.30, 0.16]) {
            assert!((m.sell_through - want).abs() < 1e-9);
        }
    }

    /// T1.3: Zero stock yields sell-through 0.0 on every stage.
    #[test]
    fn zero_stock_is_guarded() {
        let metrics = StageMetricsBuilder::build(&dataset()).expect("build");
        let p2: Vec<_> = metrics.iter().filter(|m| m.product_id == "P-2").collect();
        assert_eq!(p2.len(), 4);
        assert!(p2.iter().all(|m| m.sell_through == 0.0));
    }

    /// T1.4: Row count is 4 per record.
    #[test]
    fn four_rows_per_record() {
        let records = dataset();
        let metrics = StageMetricsBuilder::build(&records).expect("build");
        assert_eq!(metrics.len(), 4 * records.len());
    }
}

// =============================================================================
// TIER T2: BEST-STAGE SELECTION
// =============================================================================

mod t2_selection {
    use super::*;

    /// T2.1: Worked example selects M3 for both objectives.
    #[test]
    fn worked_example_selects_m3() {
        let metrics = StageMetricsBuilder::build(&dataset()).expect("build");
        let group = GroupValue::product("P-1");
        for objective in [Objective::Revenue, Objective::SellThrough] {
            let best = StageSelector::new(objective)
                .best_in_group(&metrics, GroupKey::Product, &group)
                .expect("select");
            assert_eq!(best.stage, StageLabel::M3);
        }
    }

    /// T2.2: All-zero sell-through ties resolve to M1.
    #[test]
    fn zero_stock_tie_is_m1() {
        let metrics = StageMetricsBuilder::build(&dataset()).expect("build");
        let best = StageSelector::new(Objective::SellThrough)
            .best_in_group(&metrics, GroupKey::Product, &GroupValue::product("P-2"))
            .expect("select");
        assert_eq!(best.stage, StageLabel::M1);
        assert_eq!(best.score, 0.0);
    }

    /// T2.3: One result per group, at every granularity.
    #[test]
    fn one_result_per_group() {
        let metrics = StageMetricsBuilder::build(&dataset()).expect("build");
        let selector = StageSelector::new(Objective::Revenue);
        let expected = [
            (GroupKey::Product, 3),
            (GroupKey::Category, 2),
            (GroupKey::CategoryStage, 8),
            (GroupKey::CategorySeason, 3),
            (GroupKey::Season, 2),
            (GroupKey::All, 1),
        ];
        for (key, count) in expected {
            let best = selector.select(&metrics, key).expect("select");
            assert_eq!(best.len(), count, "key {key}");
        }
    }

    /// T2.4: Zero rows is EmptyGroup, never a default stage.
    #[test]
    fn empty_is_error() {
        let result = StageSelector::new(Objective::Revenue)
            .with_mode(Mode::Sum)
            .select(&[], GroupKey::Category);
        assert!(matches!(result, Err(MarkstageError::EmptyGroup(_))));
    }

    /// T2.5: A filter that empties the set surfaces as an error downstream.
    #[test]
    fn filtered_to_nothing() {
        let records = RecordFilter::all()
            .with_category("Shoes")
            .apply(&dataset());
        let metrics = StageMetricsBuilder::build(&records).expect("build");
        assert!(metrics.is_empty());
        let result = StageSelector::new(Objective::Revenue).select(&metrics, GroupKey::All);
        assert!(matches!(result, Err(MarkstageError::EmptyGroup(_))));
    }
}

// =============================================================================
// TIER T3: AGGREGATION AND REPORTS
// =============================================================================

mod t3_aggregation {
    use super::*;

    /// T3.1: Category sums equal the sum of their products' sums.
    #[test]
    fn category_sum_matches_products() {
        let metrics = StageMetricsBuilder::build(&dataset()).expect("build");
        let categories = aggregate(&metrics, GroupKey::Category).expect("aggregate");
        let products = aggregate(&metrics, GroupKey::Product).expect("aggregate");

        let shirts = categories
            .iter()
            .find(|a| a.group == GroupValue::category("Shirts"))
            .expect("shirts");
        let from_products: f64 = products
            .iter()
            .filter(|a| matches!(a.group.product_id.as_deref(), Some("P-1" | "P-2")))
            .map(|a| a.revenue_sum)
            .sum();
        assert!((shirts.revenue_sum - from_products).abs() < 1e-6);
        assert_eq!(shirts.products, 2);
        assert_eq!(shirts.rows, 8);
    }

    /// T3.2: Product report names both best stages and the label.
    #[test]
    fn product_report() {
        let report = ProductReport::for_product(&dataset(), "P-3").expect("report");
        // Revenue: 380, 720, 960, 2800. Sell-through follows sales.
        assert_eq!(report.best_revenue, StageLabel::M4);
        assert_eq!(report.best_sell_through, StageLabel::M4);
        assert_eq!(report.optimal_discount, None);
    }

    /// T3.3: Unknown product is ProductNotFound.
    #[test]
    fn unknown_product() {
        let result = ProductReport::for_product(&dataset(), "nope");
        assert!(matches!(result, Err(MarkstageError::ProductNotFound(_))));
    }
}
