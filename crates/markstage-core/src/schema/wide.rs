//! Adapter for the wide layout: one row per product.

use super::cells::{ColumnMap, ProductHead, RowReader};
use super::{Field, FieldAliases, RawTable, SchemaAdapter, SchemaError};
use crate::primitives::STAGE_COUNT;
use crate::{ProductRecord, StageInput, StageLabel};

/// Normalizes tables with `Markdown_i` / `Sales_After_Mi` column pairs.
pub struct WideAdapter<'a> {
    aliases: &'a FieldAliases,
}

impl<'a> WideAdapter<'a> {
    /// Create an adapter resolving headers through `aliases`.
    #[must_use]
    pub fn new(aliases: &'a FieldAliases) -> Self {
        Self { aliases }
    }

    fn required() -> Vec<Field> {
        let mut fields = Field::PRODUCT_REQUIRED.to_vec();
        for stage in StageLabel::ALL {
            fields.push(Field::Markdown(stage));
            fields.push(Field::SalesAfter(stage));
        }
        fields
    }
}

impl SchemaAdapter for WideAdapter<'_> {
    fn normalize(&self, table: &RawTable) -> Result<Vec<ProductRecord>, SchemaError> {
        table.check_size()?;
        let columns = ColumnMap::resolve(table, self.aliases)?;
        columns.require(&Self::required())?;

        let width = table.headers.len();
        let mut records = Vec::with_capacity(table.rows.len());

        for (idx, cells) in table.rows.iter().enumerate() {
            let row = RowReader::new(idx + 1, cells, &columns, width)?;
            let head = ProductHead::read(&row)?;

            let mut stages = [StageInput::default(); STAGE_COUNT];
            for stage in StageLabel::ALL {
                stages[stage.index()] = StageInput::new(
                    row.number(Field::Markdown(stage))?,
                    row.number(Field::SalesAfter(stage))?,
                );
            }

            records.push(head.into_record(stages)?);
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADERS: [&str; 21] = [
        "Product_ID",
        "Product_Name",
        "Category",
        "Brand",
        "Season",
        "Original_Price",
        "Competitor_Price",
        "Stock_Level",
        "Customer Ratings",
        "Return Rate",
        "Optimal Discount",
        "Promotion_Type",
        "Markdown_1",
        "Markdown_2",
        "Markdown_3",
        "Markdown_4",
        "Sales_After_M1",
        "Sales_After_M2",
        "Sales_After_M3",
        "Sales_After_M4",
        "Warehouse",
    ];

    fn table(rows: &[&[&str]]) -> RawTable {
        RawTable::new(
            HEADERS.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    const ROW: [&str; 21] = [
        "P-1", "Linen Shirt", "Shirts", "Northwind", "Summer", "100", "95", "50", "4.2", "0.05",
        "0.3", "BOGO", "0.1", "0.2", "0.3", "0.4", "10", "12", "15", "8", "W-9",
    ];

    #[test]
    fn normalizes_one_product() {
        let aliases = FieldAliases::builtin();
        let records = WideAdapter::new(&aliases)
            .normalize(&table(&[&ROW]))
            .expect("normalize");

        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.product_id, "P-1");
        assert_eq!(r.category, "Shirts");
        assert_eq!(r.original_price, 100.0);
        assert_eq!(r.stock_level, 50.0);
        assert_eq!(r.customer_rating, Some(4.2));
        assert_eq!(r.optimal_discount, Some(0.3));
        assert_eq!(r.promotion_type.as_deref(), Some("BOGO"));
        assert_eq!(r.historical_sales, None);
        assert_eq!(r.stage(StageLabel::M3), StageInput::new(0.3, 15.0));
        assert_eq!(r.stage(StageLabel::M4), StageInput::new(0.4, 8.0));
    }

    #[test]
    fn preserves_row_order() {
        let mut second = ROW;
        second[0] = "P-2";
        let mut third = ROW;
        third[0] = "P-0";
        let aliases = FieldAliases::builtin();
        let records = WideAdapter::new(&aliases)
            .normalize(&table(&[&ROW, &second, &third]))
            .expect("normalize");
        let ids: Vec<_> = records.iter().map(|r| r.product_id.as_str()).collect();
        assert_eq!(ids, vec!["P-1", "P-2", "P-0"]);
    }

    #[test]
    fn missing_stage_column_rejected_even_without_rows() {
        let aliases = FieldAliases::builtin();
        let mut t = table(&[]);
        t.headers.retain(|h| h != "Sales_After_M3");
        let err = WideAdapter::new(&aliases).normalize(&t).expect_err("missing");
        assert_eq!(
            err,
            SchemaError::MissingColumn(Field::SalesAfter(StageLabel::M3))
        );
    }

    #[test]
    fn non_numeric_markdown_rejected_with_row() {
        let mut bad = ROW;
        bad[13] = "twenty percent";
        let aliases = FieldAliases::builtin();
        let err = WideAdapter::new(&aliases)
            .normalize(&table(&[&ROW, &bad]))
            .expect_err("not numeric");
        assert_eq!(
            err,
            SchemaError::NotNumeric {
                row: 2,
                field: Field::Markdown(StageLabel::M2),
                value: "twenty percent".to_string(),
            }
        );
    }

    #[test]
    fn out_of_range_markdown_rejected() {
        let mut bad = ROW;
        bad[15] = "1.4";
        let aliases = FieldAliases::builtin();
        let err = WideAdapter::new(&aliases)
            .normalize(&table(&[&bad]))
            .expect_err("range");
        assert!(matches!(
            err,
            SchemaError::OutOfRange {
                field: Field::Markdown(StageLabel::M4),
                ..
            }
        ));
    }

    #[test]
    fn empty_optional_cell_is_none() {
        let mut sparse = ROW;
        sparse[6] = "";
        let aliases = FieldAliases::builtin();
        let records = WideAdapter::new(&aliases)
            .normalize(&table(&[&sparse]))
            .expect("normalize");
        assert_eq!(records[0].competitor_price, None);
    }

    #[test]
    fn custom_alias_resolves_renamed_column() {
        let mut aliases = FieldAliases::builtin();
        aliases.insert("Units", Field::StockLevel);
        let mut t = table(&[&ROW]);
        for h in &mut t.headers {
            if h == "Stock_Level" {
                *h = "Units".to_string();
            }
        }
        let records = WideAdapter::new(&aliases).normalize(&t).expect("normalize");
        assert_eq!(records[0].stock_level, 50.0);
    }
}
