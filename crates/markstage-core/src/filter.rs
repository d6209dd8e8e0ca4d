//! Category / season narrowing applied before computation.

use crate::ProductRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Exact-match filter on category and season. `None` means "All".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecordFilter {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub season: Option<String>,
}

impl RecordFilter {
    /// A filter that keeps everything.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn with_season(mut self, season: impl Into<String>) -> Self {
        self.season = Some(season.into());
        self
    }

    /// Check if `record` passes the filter.
    #[must_use]
    pub fn matches(&self, record: &ProductRecord) -> bool {
        self.category.as_ref().is_none_or(|c| *c == record.category)
            && self.season.as_ref().is_none_or(|s| *s == record.season)
    }

    /// The matching records, in input order.
    #[must_use]
    pub fn apply(&self, records: &[ProductRecord]) -> Vec<ProductRecord> {
        records.iter().filter(|r| self.matches(r)).cloned().collect()
    }

    /// Sorted distinct categories, for building filter choices.
    #[must_use]
    pub fn categories(records: &[ProductRecord]) -> Vec<String> {
        distinct(records.iter().map(|r| r.category.as_str()))
    }

    /// Sorted distinct seasons.
    #[must_use]
    pub fn seasons(records: &[ProductRecord]) -> Vec<String> {
        distinct(records.iter().map(|r| r.season.as_str()))
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}
