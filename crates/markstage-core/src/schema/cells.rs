//! Column resolution and typed cell access shared by the adapters.

use super::{Field, FieldAliases, RawTable, SchemaError};
use crate::primitives::STAGE_COUNT;
use crate::{ProductRecord, StageInput};
use std::collections::BTreeMap;

/// Resolved position of every recognized column in a table.
#[derive(Debug, Clone)]
pub(crate) struct ColumnMap {
    positions: BTreeMap<Field, usize>,
}

impl ColumnMap {
    /// Resolve the table headers through the alias table.
    ///
    /// Unknown headers are ignored. Two headers resolving to the same field
    /// is an error.
    pub(crate) fn resolve(table: &RawTable, aliases: &FieldAliases) -> Result<Self, SchemaError> {
        let mut positions: BTreeMap<Field, usize> = BTreeMap::new();
        for (idx, header) in table.headers.iter().enumerate() {
            let Some(field) = aliases.resolve(header) else {
                continue;
            };
            if let Some(&first) = positions.get(&field) {
                return Err(SchemaError::AmbiguousColumn {
                    field,
                    first: table.headers[first].clone(),
                    second: header.clone(),
                });
            }
            positions.insert(field, idx);
        }
        Ok(Self { positions })
    }

    pub(crate) fn contains(&self, field: Field) -> bool {
        self.positions.contains_key(&field)
    }

    /// Fail on the first required field that has no column.
    pub(crate) fn require(&self, fields: &[Field]) -> Result<(), SchemaError> {
        match fields.iter().find(|f| !self.contains(**f)) {
            Some(missing) => Err(SchemaError::MissingColumn(*missing)),
            None => Ok(()),
        }
    }

    fn position(&self, field: Field) -> Option<usize> {
        self.positions.get(&field).copied()
    }
}

/// Typed view over one data row.
pub(crate) struct RowReader<'a> {
    /// 1-based data row number (header excluded).
    pub(crate) row: usize,
    cells: &'a [String],
    columns: &'a ColumnMap,
}

impl<'a> RowReader<'a> {
    pub(crate) fn new(
        row: usize,
        cells: &'a [String],
        columns: &'a ColumnMap,
        width: usize,
    ) -> Result<Self, SchemaError> {
        if cells.len() != width {
            return Err(SchemaError::RaggedRow {
                row,
                expected: width,
                found: cells.len(),
            });
        }
        Ok(Self {
            row,
            cells,
            columns,
        })
    }

    fn raw(&self, field: Field) -> Option<&'a str> {
        let idx = self.columns.position(field)?;
        let cell = self.cells[idx].trim();
        if cell.is_empty() { None } else { Some(cell) }
    }

    /// Required text cell.
    pub(crate) fn text(&self, field: Field) -> Result<String, SchemaError> {
        if !self.columns.contains(field) {
            return Err(SchemaError::MissingColumn(field));
        }
        self.raw(field)
            .map(str::to_string)
            .ok_or(SchemaError::MissingValue {
                row: self.row,
                field,
            })
    }

    /// Optional text cell: absent column or empty cell is `None`.
    pub(crate) fn opt_text(&self, field: Field) -> Result<Option<String>, SchemaError> {
        Ok(self.raw(field).map(str::to_string))
    }

    /// Required numeric cell.
    pub(crate) fn number(&self, field: Field) -> Result<f64, SchemaError> {
        if !self.columns.contains(field) {
            return Err(SchemaError::MissingColumn(field));
        }
        match self.raw(field) {
            Some(cell) => self.parse_number(field, cell),
            None => Err(SchemaError::MissingValue {
                row: self.row,
                field,
            }),
        }
    }

    /// Optional numeric cell: absent column or empty cell is `None`,
    /// a present non-numeric cell is still an error.
    pub(crate) fn opt_number(&self, field: Field) -> Result<Option<f64>, SchemaError> {
        match self.raw(field) {
            Some(cell) => self.parse_number(field, cell).map(Some),
            None => Ok(None),
        }
    }

    fn parse_number(&self, field: Field, cell: &str) -> Result<f64, SchemaError> {
        match cell.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(SchemaError::NotNumeric {
                row: self.row,
                field,
                value: cell.to_string(),
            }),
        }
    }
}

/// Every non-stage attribute of a product, as read from one row.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ProductHead {
    pub(crate) product_id: String,
    pub(crate) product_name: String,
    pub(crate) category: String,
    pub(crate) season: String,
    pub(crate) brand: String,
    pub(crate) original_price: f64,
    pub(crate) competitor_price: Option<f64>,
    pub(crate) stock_level: f64,
    pub(crate) historical_sales: Option<f64>,
    pub(crate) seasonality_factor: Option<f64>,
    pub(crate) customer_rating: Option<f64>,
    pub(crate) return_rate: Option<f64>,
    pub(crate) promotion_type: Option<String>,
    pub(crate) optimal_discount: Option<f64>,
}

impl ProductHead {
    pub(crate) fn read(row: &RowReader<'_>) -> Result<Self, SchemaError> {
        Ok(Self {
            product_id: row.text(Field::ProductId)?,
            product_name: row.text(Field::ProductName)?,
            category: row.text(Field::Category)?,
            season: row.text(Field::Season)?,
            brand: row.text(Field::Brand)?,
            original_price: row.number(Field::OriginalPrice)?,
            competitor_price: row.opt_number(Field::CompetitorPrice)?,
            stock_level: row.number(Field::StockLevel)?,
            historical_sales: row.opt_number(Field::HistoricalSales)?,
            seasonality_factor: row.opt_number(Field::SeasonalityFactor)?,
            customer_rating: row.opt_number(Field::CustomerRating)?,
            return_rate: row.opt_number(Field::ReturnRate)?,
            promotion_type: row.opt_text(Field::PromotionType)?,
            optimal_discount: row.opt_number(Field::OptimalDiscount)?,
        })
    }

    /// Combine with the four stage tuples into a validated record.
    pub(crate) fn into_record(
        self,
        stages: [StageInput; STAGE_COUNT],
    ) -> Result<ProductRecord, SchemaError> {
        let record = ProductRecord {
            product_id: self.product_id,
            product_name: self.product_name,
            category: self.category,
            season: self.season,
            brand: self.brand,
            original_price: self.original_price,
            competitor_price: self.competitor_price,
            stock_level: self.stock_level,
            historical_sales: self.historical_sales,
            seasonality_factor: self.seasonality_factor,
            customer_rating: self.customer_rating,
            return_rate: self.return_rate,
            promotion_type: self.promotion_type,
            optimal_discount: self.optimal_discount,
            stages,
        };
        record.validate()?;
        Ok(record)
    }

    /// First attribute that differs from `other`, in declaration order.
    pub(crate) fn first_difference(&self, other: &ProductHead) -> Option<Field> {
        if self.product_name != other.product_name {
            Some(Field::ProductName)
        } else if self.category != other.category {
            Some(Field::Category)
        } else if self.season != other.season {
            Some(Field::Season)
        } else if self.brand != other.brand {
            Some(Field::Brand)
        } else if self.original_price != other.original_price {
            Some(Field::OriginalPrice)
        } else if self.competitor_price != other.competitor_price {
            Some(Field::CompetitorPrice)
        } else if self.stock_level != other.stock_level {
            Some(Field::StockLevel)
        } else if self.historical_sales != other.historical_sales {
            Some(Field::HistoricalSales)
        } else if self.seasonality_factor != other.seasonality_factor {
            Some(Field::SeasonalityFactor)
        } else if self.customer_rating != other.customer_rating {
            Some(Field::CustomerRating)
        } else if self.return_rate != other.return_rate {
            Some(Field::ReturnRate)
        } else if self.promotion_type != other.promotion_type {
            Some(Field::PromotionType)
        } else if self.optimal_discount != other.optimal_discount {
            Some(Field::OptimalDiscount)
        } else {
            None
        }
    }
}
