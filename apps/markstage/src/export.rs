//! CSV export of result tables.
//!
//! UTF-8, comma-separated, one header row. Column order follows the field
//! order of the exported type.

use markstage_core::{BestStage, GroupAggregate, MarkstageError, StageMetric};
use std::io::Write;
use std::path::Path;

fn csv_error(e: csv::Error) -> MarkstageError {
    MarkstageError::SerializationError(format!("CSV write: {}", e))
}

/// Write stage metric rows.
pub fn write_metrics<W: Write>(rows: &[StageMetric], out: W) -> Result<(), MarkstageError> {
    let mut writer = csv::Writer::from_writer(out);
    for row in rows {
        writer.serialize(row).map_err(csv_error)?;
    }
    writer
        .flush()
        .map_err(|e| MarkstageError::IoError(format!("CSV flush: {}", e)))
}

/// Write best-stage results. Row columns are empty for reduced results.
pub fn write_best<W: Write>(results: &[BestStage], out: W) -> Result<(), MarkstageError> {
    let mut writer = csv::Writer::from_writer(out);
    writer
        .write_record([
            "group",
            "best_stage",
            "score",
            "product_id",
            "product_name",
            "markdown",
            "sales",
            "revenue",
            "sell_through",
        ])
        .map_err(csv_error)?;

    for result in results {
        let (product_id, product_name, markdown, sales, revenue, sell_through) = match &result.row
        {
            Some(row) => (
                row.product_id.clone(),
                row.product_name.clone(),
                row.markdown.to_string(),
                row.sales.to_string(),
                row.revenue.to_string(),
                row.sell_through.to_string(),
            ),
            None => Default::default(),
        };
        writer
            .write_record([
                result.group.to_string(),
                result.stage.to_string(),
                result.score.to_string(),
                product_id,
                product_name,
                markdown,
                sales,
                revenue,
                sell_through,
            ])
            .map_err(csv_error)?;
    }

    writer
        .flush()
        .map_err(|e| MarkstageError::IoError(format!("CSV flush: {}", e)))
}

/// Write grouped aggregates.
pub fn write_aggregates<W: Write>(
    groups: &[GroupAggregate],
    out: W,
) -> Result<(), MarkstageError> {
    let mut writer = csv::Writer::from_writer(out);
    writer
        .write_record([
            "group",
            "rows",
            "products",
            "revenue_sum",
            "revenue_mean",
            "sales_sum",
            "sales_mean",
            "markdown_mean",
            "sell_through_mean",
        ])
        .map_err(csv_error)?;

    for g in groups {
        writer
            .write_record([
                g.group.to_string(),
                g.rows.to_string(),
                g.products.to_string(),
                g.revenue_sum.to_string(),
                g.revenue_mean.to_string(),
                g.sales_sum.to_string(),
                g.sales_mean.to_string(),
                g.markdown_mean.to_string(),
                g.sell_through_mean.to_string(),
            ])
            .map_err(csv_error)?;
    }

    writer
        .flush()
        .map_err(|e| MarkstageError::IoError(format!("CSV flush: {}", e)))
}

/// Create `path` and hand a buffered writer to `write`.
pub fn to_file<F>(path: &Path, write: F) -> Result<(), MarkstageError>
where
    F: FnOnce(std::io::BufWriter<std::fs::File>) -> Result<(), MarkstageError>,
{
    let file = std::fs::File::create(path)
        .map_err(|e| MarkstageError::IoError(format!("Create '{}': {}", path.display(), e)))?;
    write(std::io::BufWriter::new(file))
}
