//! # Stage Selector
//!
//! Arg-max over the four stages, per group.
//!
//! - `Objective`: which metric is maximized (revenue, sell-through, sales)
//! - `GroupKey`: which rows compete together (product, category, ...)
//! - `Mode`: best single row, or best stage after summing / averaging
//! - `aggregate`: plain grouped totals and means, no arg-max
//!
//! ## Tie-break
//!
//! Equal scores resolve to the earliest stage (`M1 < M2 < M3 < M4`). Among
//! rows of the same stage and score, the earliest input row wins. NaN never
//! wins. Results are ordered by group value.

use crate::primitives::STAGE_COUNT;
use crate::{MarkstageError, StageLabel, StageMetric};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// =============================================================================
// OBJECTIVE
// =============================================================================

/// The metric a selection maximizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    /// `price_after * sales`.
    Revenue,
    /// `sales / stock_level`.
    SellThrough,
    /// Units sold.
    Sales,
}

impl Objective {
    /// The value of this objective on one row.
    #[must_use]
    pub fn score(self, row: &StageMetric) -> f64 {
        match self {
            Objective::Revenue => row.revenue,
            Objective::SellThrough => row.sell_through,
            Objective::Sales => row.sales,
        }
    }

    /// Stable lowercase name, matching the serde form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Objective::Revenue => "revenue",
            Objective::SellThrough => "sell_through",
            Objective::Sales => "sales",
        }
    }
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Objective {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "revenue" => Ok(Objective::Revenue),
            "sell_through" | "sellthrough" => Ok(Objective::SellThrough),
            "sales" => Ok(Objective::Sales),
            other => Err(format!(
                "unknown objective '{}'. Use: revenue, sell_through, sales",
                other
            )),
        }
    }
}

// =============================================================================
// GROUPING
// =============================================================================

/// Granularity at which rows compete for the best stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKey {
    /// One group per product id.
    Product,
    /// One group per category.
    Category,
    /// One group per (category, stage): the stage is fixed inside a group.
    CategoryStage,
    /// One group per (category, season).
    CategorySeason,
    /// One group per season.
    Season,
    /// Every row in a single group.
    All,
}

impl GroupKey {
    /// The group a row belongs to under this key.
    #[must_use]
    pub fn group_of(self, row: &StageMetric) -> GroupValue {
        match self {
            GroupKey::Product => GroupValue::product(&row.product_id),
            GroupKey::Category => GroupValue::category(&row.category),
            GroupKey::CategoryStage => GroupValue::category_stage(&row.category, row.stage),
            GroupKey::CategorySeason => GroupValue::category_season(&row.category, &row.season),
            GroupKey::Season => GroupValue::season(&row.season),
            GroupKey::All => GroupValue::all(),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            GroupKey::Product => "product",
            GroupKey::Category => "category",
            GroupKey::CategoryStage => "category_stage",
            GroupKey::CategorySeason => "category_season",
            GroupKey::Season => "season",
            GroupKey::All => "all",
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GroupKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "product" => Ok(GroupKey::Product),
            "category" => Ok(GroupKey::Category),
            "category_stage" | "category_x_stage" => Ok(GroupKey::CategoryStage),
            "category_season" | "category_x_season" => Ok(GroupKey::CategorySeason),
            "season" => Ok(GroupKey::Season),
            "all" => Ok(GroupKey::All),
            other => Err(format!(
                "unknown group key '{}'. Use: product, category, category_stage, \
                 category_season, season, all",
                other
            )),
        }
    }
}

/// Concrete value of a group key. Unused parts are `None`.
///
/// Ordering is lexicographic over the fields in declaration order, which
/// gives results sorted by product, then category, season and stage.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct GroupValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<StageLabel>,
}

impl GroupValue {
    #[must_use]
    pub fn product(product_id: &str) -> Self {
        Self {
            product_id: Some(product_id.to_string()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn category(category: &str) -> Self {
        Self {
            category: Some(category.to_string()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn category_stage(category: &str, stage: StageLabel) -> Self {
        Self {
            category: Some(category.to_string()),
            stage: Some(stage),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn category_season(category: &str, season: &str) -> Self {
        Self {
            category: Some(category.to_string()),
            season: Some(season.to_string()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn season(season: &str) -> Self {
        Self {
            season: Some(season.to_string()),
            ..Self::default()
        }
    }

    /// The single group of [`GroupKey::All`].
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }
}

impl fmt::Display for GroupValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        parts.extend(self.product_id.iter().cloned());
        parts.extend(self.category.iter().cloned());
        parts.extend(self.season.iter().cloned());
        parts.extend(self.stage.iter().map(ToString::to_string));
        if parts.is_empty() {
            f.write_str("all")
        } else {
            f.write_str(&parts.join(" / "))
        }
    }
}

// =============================================================================
// SELECTION
// =============================================================================

/// How rows inside a group are turned into one score per stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// The single best row wins; its stage is the group's best stage.
    #[default]
    Best,
    /// Sum the objective per stage, then pick the best stage.
    Sum,
    /// Average the objective per stage, then pick the best stage.
    Mean,
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "best" | "max" => Ok(Mode::Best),
            "sum" | "total" => Ok(Mode::Sum),
            "mean" | "avg" | "average" => Ok(Mode::Mean),
            other => Err(format!("unknown mode '{}'. Use: best, sum, mean", other)),
        }
    }
}

/// The winning stage of one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestStage<K = GroupValue> {
    pub group: K,
    pub stage: StageLabel,
    /// Objective value of the winning row, or the reduced value of the
    /// winning stage.
    pub score: f64,
    /// The winning row. `None` for reduced selections.
    pub row: Option<StageMetric>,
}

/// Picks the best stage per group under one objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageSelector {
    objective: Objective,
    mode: Mode,
}

impl StageSelector {
    /// Selector for `objective` in [`Mode::Best`].
    #[must_use]
    pub fn new(objective: Objective) -> Self {
        Self {
            objective,
            mode: Mode::Best,
        }
    }

    #[must_use]
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn objective(&self) -> Objective {
        self.objective
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// One result per group, carrying the winning row.
    ///
    /// Ignores the configured mode.
    pub fn best_rows(
        &self,
        rows: &[StageMetric],
        key: GroupKey,
    ) -> Result<Vec<BestStage>, MarkstageError> {
        ensure_rows(rows, key)?;
        Ok(self.best_rows_in(rows, |row| key.group_of(row)))
    }

    /// One result per group after reducing each stage with the configured
    /// mode. [`Mode::Best`] reduces a stage to its maximum.
    pub fn best_reduced(
        &self,
        rows: &[StageMetric],
        key: GroupKey,
    ) -> Result<Vec<BestStage>, MarkstageError> {
        ensure_rows(rows, key)?;
        Ok(self.best_reduced_in(rows, |row| key.group_of(row)))
    }

    /// Dispatch on the configured mode.
    pub fn select(
        &self,
        rows: &[StageMetric],
        key: GroupKey,
    ) -> Result<Vec<BestStage>, MarkstageError> {
        ensure_rows(rows, key)?;
        self.select_by(rows, |row| key.group_of(row))
    }

    /// Like [`StageSelector::select`] with a caller-supplied grouping.
    pub fn select_by<K, F>(
        &self,
        rows: &[StageMetric],
        key_fn: F,
    ) -> Result<Vec<BestStage<K>>, MarkstageError>
    where
        K: Ord + Clone,
        F: Fn(&StageMetric) -> K,
    {
        if rows.is_empty() {
            return Err(MarkstageError::EmptyGroup("selection".to_string()));
        }
        Ok(match self.mode {
            Mode::Best => self.best_rows_in(rows, key_fn),
            Mode::Sum | Mode::Mean => self.best_reduced_in(rows, key_fn),
        })
    }

    /// The result for one requested group.
    ///
    /// Fails with `EmptyGroup` if no row belongs to `group`, including when
    /// `rows` itself is empty.
    pub fn best_in_group(
        &self,
        rows: &[StageMetric],
        key: GroupKey,
        group: &GroupValue,
    ) -> Result<BestStage, MarkstageError> {
        let members = rows.iter().filter(|row| key.group_of(row) == *group);
        let results = match self.mode {
            Mode::Best => self.best_rows_in(members, |row| key.group_of(row)),
            Mode::Sum | Mode::Mean => self.best_reduced_in(members, |row| key.group_of(row)),
        };
        results
            .into_iter()
            .next()
            .ok_or_else(|| MarkstageError::EmptyGroup(group.to_string()))
    }

    fn best_rows_in<'r, K, I, F>(&self, rows: I, key_fn: F) -> Vec<BestStage<K>>
    where
        K: Ord + Clone,
        I: IntoIterator<Item = &'r StageMetric>,
        F: Fn(&StageMetric) -> K,
    {
        let mut winners: BTreeMap<K, (f64, &'r StageMetric)> = BTreeMap::new();
        for row in rows {
            let score = self.objective.score(row);
            winners
                .entry(key_fn(row))
                .and_modify(|current| {
                    if beats((score, row.stage), (current.0, current.1.stage)) {
                        *current = (score, row);
                    }
                })
                .or_insert((score, row));
        }

        winners
            .into_iter()
            .map(|(group, (score, row))| BestStage {
                group,
                stage: row.stage,
                score,
                row: Some(row.clone()),
            })
            .collect()
    }

    fn best_reduced_in<'r, K, I, F>(&self, rows: I, key_fn: F) -> Vec<BestStage<K>>
    where
        K: Ord + Clone,
        I: IntoIterator<Item = &'r StageMetric>,
        F: Fn(&StageMetric) -> K,
    {
        let mut groups: BTreeMap<K, [StageTally; STAGE_COUNT]> = BTreeMap::new();
        for row in rows {
            let tallies = groups
                .entry(key_fn(row))
                .or_insert([StageTally::default(); STAGE_COUNT]);
            tallies[row.stage.index()].add(self.objective.score(row));
        }

        groups
            .into_iter()
            .filter_map(|(group, tallies)| {
                let mut best: Option<(f64, StageLabel)> = None;
                for stage in StageLabel::ALL {
                    let Some(value) = tallies[stage.index()].value(self.mode) else {
                        continue;
                    };
                    match best {
                        Some(incumbent) if !beats((value, stage), incumbent) => {}
                        _ => best = Some((value, stage)),
                    }
                }
                best.map(|(score, stage)| BestStage {
                    group,
                    stage,
                    score,
                    row: None,
                })
            })
            .collect()
    }
}

/// Whether `candidate` displaces `incumbent`.
///
/// Strictly greater wins; equal scores go to the earlier stage; an equal
/// score at the same stage keeps the incumbent. NaN never wins.
fn beats(candidate: (f64, StageLabel), incumbent: (f64, StageLabel)) -> bool {
    let (score, stage) = candidate;
    let (best, best_stage) = incumbent;
    if score.is_nan() {
        return false;
    }
    if best.is_nan() {
        return true;
    }
    score > best || (score == best && stage < best_stage)
}

fn ensure_rows(rows: &[StageMetric], key: GroupKey) -> Result<(), MarkstageError> {
    if rows.is_empty() {
        return Err(MarkstageError::EmptyGroup(key.to_string()));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, Default)]
struct StageTally {
    sum: f64,
    count: usize,
    max: Option<f64>,
}

impl StageTally {
    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
        self.max = match self.max {
            Some(max) if !beats((value, StageLabel::M1), (max, StageLabel::M1)) => Some(max),
            _ => Some(value),
        };
    }

    fn value(&self, mode: Mode) -> Option<f64> {
        if self.count == 0 {
            return None;
        }
        Some(match mode {
            Mode::Best => self.max?,
            Mode::Sum => self.sum,
            Mode::Mean => self.sum / self.count as f64,
        })
    }
}

// =============================================================================
// AGGREGATION
// =============================================================================

/// Totals and means of one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupAggregate {
    pub group: GroupValue,
    /// Number of stage rows in the group.
    pub rows: usize,
    /// Number of distinct product ids in the group.
    pub products: usize,
    pub revenue_sum: f64,
    pub revenue_mean: f64,
    pub sales_sum: f64,
    pub sales_mean: f64,
    pub markdown_mean: f64,
    pub sell_through_mean: f64,
}

/// Group `rows` by `key` and compute totals and means per group.
///
/// Fails with `EmptyInput` on zero rows.
pub fn aggregate(rows: &[StageMetric], key: GroupKey) -> Result<Vec<GroupAggregate>, MarkstageError> {
    if rows.is_empty() {
        return Err(MarkstageError::EmptyInput("aggregate"));
    }

    #[derive(Default)]
    struct Acc<'r> {
        rows: usize,
        products: BTreeSet<&'r str>,
        revenue: f64,
        sales: f64,
        markdown: f64,
        sell_through: f64,
    }

    let mut groups: BTreeMap<GroupValue, Acc<'_>> = BTreeMap::new();
    for row in rows {
        let acc = groups.entry(key.group_of(row)).or_default();
        acc.rows += 1;
        acc.products.insert(row.product_id.as_str());
        acc.revenue += row.revenue;
        acc.sales += row.sales;
        acc.markdown += row.markdown;
        acc.sell_through += row.sell_through;
    }

    Ok(groups
        .into_iter()
        .map(|(group, acc)| {
            let n = acc.rows as f64;
            GroupAggregate {
                group,
                rows: acc.rows,
                products: acc.products.len(),
                revenue_sum: acc.revenue,
                revenue_mean: acc.revenue / n,
                sales_sum: acc.sales,
                sales_mean: acc.sales / n,
                markdown_mean: acc.markdown / n,
                sell_through_mean: acc.sell_through / n,
            }
        })
        .collect())
}

fn normalize_token(s: &str) -> String {
    s.trim().to_ascii_lowercase().replace(['-', ' ', '*'], "_")
}

// =============================================================================
// TESTS
// =============================================================================
