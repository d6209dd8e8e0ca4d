//! # Stage Benchmarks
//!
//! Performance benchmarks for markstage-core building and selection.
//!
//! Run with: `cargo bench -p markstage-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use markstage_core::{
    GroupKey, Mode, Objective, ProductRecord, StageInput, StageMetricsBuilder, StageSelector,
    aggregate,
};
use std::hint::black_box;

const CATEGORIES: [&str; 5] = ["Coats", "Dresses", "Shirts", "Shoes", "Trousers"];
const SEASONS: [&str; 4] = ["Autumn", "Spring", "Summer", "Winter"];

/// Create N records with deterministic, varied stage data.
fn create_records(size: usize) -> Vec<ProductRecord> {
    (0..size)
        .map(|i| {
            let base = (i % 97) as f64;
            ProductRecord {
                product_id: format!("P-{i:06}"),
                product_name: format!("Item {i}"),
                category: CATEGORIES[i % CATEGORIES.len()].to_string(),
                season: SEASONS[i % SEASONS.len()].to_string(),
                brand: "Bench".to_string(),
                original_price: 20.0 + base,
                competitor_price: None,
                stock_level: (i % 200) as f64,
                historical_sales: None,
                seasonality_factor: None,
                customer_rating: None,
                return_rate: None,
                promotion_type: None,
                optimal_discount: None,
                stages: [
                    StageInput::new(0.1, base),
                    StageInput::new(0.2, base * 1.1),
                    StageInput::new(0.3, base * 1.3),
                    StageInput::new(0.5, base * 0.9),
                ],
            }
        })
        .collect()
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_stage_metrics");

    for size in [100, 1_000, 10_000] {
        let records = create_records(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &records, |b, records| {
            b.iter(|| StageMetricsBuilder::build(black_box(records)).expect("build"));
        });
    }

    group.finish();
}

fn bench_select(c: &mut Criterion) {
    let mut group = c.benchmark_group("select_best_stage");
    let metrics = StageMetricsBuilder::build(&create_records(10_000)).expect("build");

    for key in [GroupKey::Product, GroupKey::Category, GroupKey::CategorySeason] {
        group.bench_with_input(BenchmarkId::new("best", key), &metrics, |b, metrics| {
            let selector = StageSelector::new(Objective::Revenue);
            b.iter(|| selector.select(black_box(metrics), key).expect("select"));
        });
        group.bench_with_input(BenchmarkId::new("mean", key), &metrics, |b, metrics| {
            let selector = StageSelector::new(Objective::SellThrough).with_mode(Mode::Mean);
            b.iter(|| selector.select(black_box(metrics), key).expect("select"));
        });
    }

    group.finish();
}

fn bench_aggregate(c: &mut Criterion) {
    let metrics = StageMetricsBuilder::build(&create_records(10_000)).expect("build");
    c.bench_function("aggregate_category_stage", |b| {
        b.iter(|| aggregate(black_box(&metrics), GroupKey::CategoryStage).expect("aggregate"));
    });
}

criterion_group!(benches, bench_build, bench_select, bench_aggregate);
criterion_main!(benches);
