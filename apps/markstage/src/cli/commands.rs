//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use super::Cli;
use crate::config::AppConfig;
use crate::loader::{Dataset, DatasetCache};
use crate::{api, export};
use markstage_core::{
    BestStage, GroupKey, MarkstageError, ProductRecord, ProductReport, RecordFilter,
    StageSelector, aggregate,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

// =============================================================================
// COMMAND CONTEXT
// =============================================================================

/// Everything a command needs besides its own arguments.
pub struct Context {
    data: Option<PathBuf>,
    cache: DatasetCache,
    json_mode: bool,
    verbose: bool,
}

impl Context {
    /// Merge CLI flags over the config file.
    pub fn new(cli: &Cli, config: &AppConfig) -> Result<Self, MarkstageError> {
        let aliases = config.field_aliases()?;
        let schema = cli.schema.unwrap_or(config.data.schema);
        Ok(Self {
            data: cli.data.clone().or_else(|| config.data.path.clone()),
            cache: DatasetCache::new(aliases, schema),
            json_mode: cli.json_mode,
            verbose: cli.verbose,
        })
    }

    fn data_path(&self) -> Result<&Path, MarkstageError> {
        self.data.as_deref().ok_or_else(|| {
            MarkstageError::ConfigError(
                "No dataset given. Use --data <csv> or [data] path in the config file."
                    .to_string(),
            )
        })
    }

    fn dataset(&mut self) -> Result<Arc<Dataset>, MarkstageError> {
        let path = self.data_path()?.to_path_buf();
        self.cache.load(&path)
    }
}

/// Print the empty-state message instead of failing.
fn or_empty_state(result: Result<(), MarkstageError>) -> Result<(), MarkstageError> {
    match result {
        Err(MarkstageError::EmptyInput(_) | MarkstageError::EmptyGroup(_)) => {
            println!("No products match the selected filters.");
            Ok(())
        }
        other => other,
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), MarkstageError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| MarkstageError::SerializationError(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.2}", v))
}

/// Header lines of the product view. Absent optional columns print `-`.
fn product_detail_lines(r: &ProductRecord) -> Vec<String> {
    vec![
        format!("Category: {}   Season: {}   Brand: {}", r.category, r.season, r.brand),
        format!(
            "Price: {:.2}   Stock: {:.0}   Competitor: {}   Rating: {}",
            r.original_price,
            r.stock_level,
            fmt_opt(r.competitor_price),
            fmt_opt(r.customer_rating)
        ),
        format!(
            "Historical sales: {}   Seasonality: {}   Return rate: {}   Promotion: {}",
            fmt_opt(r.historical_sales),
            fmt_opt(r.seasonality_factor),
            fmt_opt(r.return_rate),
            r.promotion_type.as_deref().unwrap_or("-")
        ),
    ]
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(mut ctx: Context, host: &str, port: u16) -> Result<(), MarkstageError> {
    let path = ctx.data_path()?.to_path_buf();
    let dataset = ctx.dataset()?;

    println!("Markstage Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:     {}", host);
    println!("  Port:     {}", port);
    println!("  Dataset:  {}", dataset.source.display());
    println!("  Schema:   {:?}", dataset.schema);
    println!("  Products: {}", dataset.records.len());
    println!();
    println!("Endpoints:");
    println!("  GET  /health        - Health check");
    println!("  GET  /summary       - Dataset summary");
    println!("  POST /stages        - Per-stage metrics");
    println!("  POST /best          - Best stage per group");
    println!("  POST /aggregate     - Grouped totals and means");
    println!("  GET  /products/{{id}} - Single-product report");
    println!("  POST /reload        - Re-read the dataset");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let addr = format!("{}:{}", host, port);
    api::run_server(&addr, api::AppState::new(ctx.cache, path)).await
}

// =============================================================================
// SUMMARY COMMAND
// =============================================================================

/// Show dataset summary.
pub fn cmd_summary(ctx: &mut Context) -> Result<(), MarkstageError> {
    let dataset = ctx.dataset()?;
    let summary = dataset.summary();

    if ctx.json_mode {
        return print_json(&summary);
    }

    println!("Markstage Dataset");
    println!("=================");
    println!("Source:     {}", summary.source);
    println!("Schema:     {:?}", summary.schema);
    println!("Products:   {}", summary.products);
    println!("Categories: {}", summary.categories.join(", "));
    println!("Seasons:    {}", summary.seasons.join(", "));
    if ctx.verbose {
        println!("BLAKE3:     {}", summary.fingerprint);
    }

    Ok(())
}

// =============================================================================
// STAGES COMMAND
// =============================================================================

/// Show or export the per-stage metric table.
pub fn cmd_stages(
    ctx: &mut Context,
    filter: &RecordFilter,
    output: Option<&Path>,
) -> Result<(), MarkstageError> {
    let dataset = ctx.dataset()?;
    or_empty_state(show_stages(ctx.json_mode, &dataset, filter, output))
}

fn show_stages(
    json_mode: bool,
    dataset: &Dataset,
    filter: &RecordFilter,
    output: Option<&Path>,
) -> Result<(), MarkstageError> {
    let metrics = dataset.metrics(filter)?;

    if let Some(path) = output {
        export::to_file(path, |w| export::write_metrics(&metrics, w))?;
        println!("Exported {} rows to {}", metrics.len(), path.display());
        return Ok(());
    }
    if json_mode {
        return print_json(&metrics);
    }

    println!(
        "{:<12} {:<24} {:<5} {:>8} {:>8} {:>10} {:>12} {:>8}",
        "Product", "Name", "Stage", "Markdown", "Sales", "Price", "Revenue", "Sell-thr"
    );
    for m in &metrics {
        println!(
            "{:<12} {:<24} {:<5} {:>8.2} {:>8.0} {:>10.2} {:>12.2} {:>8.3}",
            m.product_id,
            m.product_name,
            m.stage.to_string(),
            m.markdown,
            m.sales,
            m.price_after,
            m.revenue,
            m.sell_through
        );
    }
    Ok(())
}

// =============================================================================
// BEST COMMAND
// =============================================================================

/// Show or export the best stage per group.
pub fn cmd_best(
    ctx: &mut Context,
    key: GroupKey,
    selector: StageSelector,
    filter: &RecordFilter,
    output: Option<&Path>,
) -> Result<(), MarkstageError> {
    let dataset = ctx.dataset()?;
    or_empty_state(show_best(ctx.json_mode, &dataset, key, selector, filter, output))
}

fn show_best(
    json_mode: bool,
    dataset: &Dataset,
    key: GroupKey,
    selector: StageSelector,
    filter: &RecordFilter,
    output: Option<&Path>,
) -> Result<(), MarkstageError> {
    let metrics = dataset.metrics(filter)?;
    let results = selector.select(&metrics, key)?;

    if let Some(path) = output {
        export::to_file(path, |w| export::write_best(&results, w))?;
        println!("Exported {} groups to {}", results.len(), path.display());
        return Ok(());
    }
    if json_mode {
        return print_json(&results);
    }

    println!(
        "Best stage by {} ({:?}), grouped by {}",
        selector.objective(),
        selector.mode(),
        key
    );
    println!();
    for result in &results {
        print_best(result);
    }
    Ok(())
}

fn print_best(result: &BestStage) {
    match &result.row {
        Some(row) => println!(
            "  {:<32} {}  score {:>12.3}  ({} @ {:.0}% off)",
            result.group.to_string(),
            result.stage,
            result.score,
            row.product_id,
            row.markdown * 100.0
        ),
        None => println!(
            "  {:<32} {}  score {:>12.3}",
            result.group.to_string(),
            result.stage,
            result.score
        ),
    }
}

// =============================================================================
// AGGREGATE COMMAND
// =============================================================================

/// Show or export grouped totals and means.
pub fn cmd_aggregate(
    ctx: &mut Context,
    key: GroupKey,
    filter: &RecordFilter,
    output: Option<&Path>,
) -> Result<(), MarkstageError> {
    let dataset = ctx.dataset()?;
    or_empty_state(show_aggregate(ctx.json_mode, &dataset, key, filter, output))
}

fn show_aggregate(
    json_mode: bool,
    dataset: &Dataset,
    key: GroupKey,
    filter: &RecordFilter,
    output: Option<&Path>,
) -> Result<(), MarkstageError> {
    let metrics = dataset.metrics(filter)?;
    let groups = aggregate(&metrics, key)?;

    if let Some(path) = output {
        export::to_file(path, |w| export::write_aggregates(&groups, w))?;
        println!("Exported {} groups to {}", groups.len(), path.display());
        return Ok(());
    }
    if json_mode {
        return print_json(&groups);
    }

    println!(
        "{:<32} {:>6} {:>9} {:>14} {:>12} {:>10} {:>10}",
        "Group", "Rows", "Products", "Revenue", "Rev/row", "Markdown", "Sell-thr"
    );
    for g in &groups {
        println!(
            "{:<32} {:>6} {:>9} {:>14.2} {:>12.2} {:>10.3} {:>10.3}",
            g.group.to_string(),
            g.rows,
            g.products,
            g.revenue_sum,
            g.revenue_mean,
            g.markdown_mean,
            g.sell_through_mean
        );
    }
    Ok(())
}

// =============================================================================
// PRODUCT COMMAND
// =============================================================================

/// Show the stage-by-stage report of one product.
pub fn cmd_product(ctx: &mut Context, id: &str) -> Result<(), MarkstageError> {
    let dataset = ctx.dataset()?;
    let report = ProductReport::for_product(&dataset.records, id)?;

    if ctx.json_mode {
        let output = serde_json::json!({
            "report": report,
            "label_stage": report.label_stage(),
            "stages_agree": report.stages_agree(),
        });
        return print_json(&output);
    }

    let r = &report.record;
    println!("{} ({})", r.product_name, r.product_id);
    for line in product_detail_lines(r) {
        println!("  {}", line);
    }
    println!();
    println!(
        "  {:<5} {:>8} {:>8} {:>10} {:>12} {:>8}",
        "Stage", "Markdown", "Sales", "Price", "Revenue", "Sell-thr"
    );
    for m in &report.metrics {
        println!(
            "  {:<5} {:>8.2} {:>8.0} {:>10.2} {:>12.2} {:>8.3}",
            m.stage.to_string(),
            m.markdown, m.sales, m.price_after, m.revenue, m.sell_through
        );
    }
    println!();
    println!("  Best revenue stage:      {}", report.best_revenue);
    println!("  Best sell-through stage: {}", report.best_sell_through);
    if let Some(label) = report.optimal_discount {
        let nearest = report
            .label_stage()
            .map_or_else(|| "-".to_string(), |s| s.to_string());
        println!(
            "  Dataset optimal discount: {:.0}% (nearest stage {})",
            label * 100.0,
            nearest
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use markstage_core::StageInput;

    fn record() -> ProductRecord {
        ProductRecord {
            product_id: "P-7".to_string(),
            product_name: "Wool Coat".to_string(),
            category: "Coats".to_string(),
            season: "Winter".to_string(),
            brand: "Northwind".to_string(),
            original_price: 200.0,
            competitor_price: None,
            stock_level: 40.0,
            historical_sales: Some(310.0),
            seasonality_factor: Some(1.25),
            customer_rating: Some(4.5),
            return_rate: Some(0.08),
            promotion_type: Some("Clearance".to_string()),
            optimal_discount: None,
            stages: [
                StageInput::new(0.1, 5.0),
                StageInput::new(0.2, 6.0),
                StageInput::new(0.3, 7.0),
                StageInput::new(0.4, 8.0),
            ],
        }
    }

    #[test]
    fn product_details_include_secondary_columns() {
        let lines = product_detail_lines(&record()).join("\n");
        assert!(lines.contains("Historical sales: 310.00"));
        assert!(lines.contains("Seasonality: 1.25"));
        assert!(lines.contains("Return rate: 0.08"));
        assert!(lines.contains("Promotion: Clearance"));
        assert!(lines.contains("Competitor: -"));
    }

    #[test]
    fn product_details_dash_for_absent_columns() {
        let mut r = record();
        r.historical_sales = None;
        r.return_rate = None;
        r.promotion_type = None;
        let lines = product_detail_lines(&r).join("\n");
        assert!(lines.contains("Historical sales: -"));
        assert!(lines.contains("Return rate: -"));
        assert!(lines.contains("Promotion: -"));
    }
}
