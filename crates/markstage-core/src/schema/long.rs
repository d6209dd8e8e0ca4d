//! Adapter for the melted layout: one row per (product, stage).

use super::cells::{ColumnMap, ProductHead, RowReader};
use super::{Field, FieldAliases, RawTable, SchemaAdapter, SchemaError};
use crate::primitives::STAGE_COUNT;
use crate::{ProductRecord, StageInput, StageLabel};
use std::collections::BTreeMap;

/// Normalizes tables with `Stage` / `Markdown` / `Sales` columns.
///
/// Product attributes are repeated on every stage row and must agree.
/// Products come out in order of first appearance.
pub struct LongAdapter<'a> {
    aliases: &'a FieldAliases,
}

/// A product whose stage rows are still being collected.
struct PendingProduct {
    head: ProductHead,
    first_row: usize,
    stages: [Option<StageInput>; STAGE_COUNT],
}

impl<'a> LongAdapter<'a> {
    /// Create an adapter resolving headers through `aliases`.
    #[must_use]
    pub fn new(aliases: &'a FieldAliases) -> Self {
        Self { aliases }
    }

    fn required() -> Vec<Field> {
        let mut fields = Field::PRODUCT_REQUIRED.to_vec();
        fields.extend([Field::Stage, Field::StageMarkdown, Field::StageSales]);
        fields
    }
}

impl SchemaAdapter for LongAdapter<'_> {
    fn normalize(&self, table: &RawTable) -> Result<Vec<ProductRecord>, SchemaError> {
        table.check_size()?;
        let columns = ColumnMap::resolve(table, self.aliases)?;
        columns.require(&Self::required())?;

        let width = table.headers.len();
        let mut pending: Vec<PendingProduct> = Vec::new();
        let mut index: BTreeMap<String, usize> = BTreeMap::new();

        for (idx, cells) in table.rows.iter().enumerate() {
            let row = RowReader::new(idx + 1, cells, &columns, width)?;
            let head = ProductHead::read(&row)?;

            let stage_cell = row.text(Field::Stage)?;
            let stage = StageLabel::parse(&stage_cell).ok_or(SchemaError::UnknownStage {
                row: row.row,
                value: stage_cell,
            })?;
            let input = StageInput::new(
                row.number(Field::StageMarkdown)?,
                row.number(Field::StageSales)?,
            );

            let slot = match index.get(&head.product_id) {
                Some(&slot) => {
                    let product = &pending[slot];
                    if let Some(field) = product.head.first_difference(&head) {
                        return Err(SchemaError::InconsistentProduct {
                            product_id: head.product_id,
                            field,
                            first_row: product.first_row,
                            row: row.row,
                        });
                    }
                    slot
                }
                None => {
                    index.insert(head.product_id.clone(), pending.len());
                    pending.push(PendingProduct {
                        head,
                        first_row: row.row,
                        stages: [None; STAGE_COUNT],
                    });
                    pending.len() - 1
                }
            };

            let product = &mut pending[slot];
            if product.stages[stage.index()].is_some() {
                return Err(SchemaError::DuplicateStage {
                    product_id: product.head.product_id.clone(),
                    stage,
                    row: row.row,
                });
            }
            product.stages[stage.index()] = Some(input);
        }

        pending.into_iter().map(PendingProduct::finish).collect()
    }
}

impl PendingProduct {
    fn finish(self) -> Result<ProductRecord, SchemaError> {
        let mut stages = [StageInput::default(); STAGE_COUNT];
        for stage in StageLabel::ALL {
            stages[stage.index()] =
                self.stages[stage.index()].ok_or_else(|| SchemaError::MissingStage {
                    product_id: self.head.product_id.clone(),
                    stage,
                })?;
        }
        self.head.into_record(stages)
    }
}
