//! Canonical fields and the header alias table.

use crate::StageLabel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// FIELD
// =============================================================================

/// A semantic column of the canonical schema.
///
/// `Stage`, `StageMarkdown` and `StageSales` exist only in the melted (long)
/// layout; `Markdown(_)` and `SalesAfter(_)` only in the wide layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Field {
    ProductId,
    ProductName,
    Category,
    Season,
    Brand,
    OriginalPrice,
    CompetitorPrice,
    StockLevel,
    HistoricalSales,
    SeasonalityFactor,
    CustomerRating,
    ReturnRate,
    PromotionType,
    OptimalDiscount,
    Markdown(StageLabel),
    SalesAfter(StageLabel),
    Stage,
    StageMarkdown,
    StageSales,
}

impl Field {
    /// Fields every product needs regardless of layout.
    pub const PRODUCT_REQUIRED: [Field; 7] = [
        Field::ProductId,
        Field::ProductName,
        Field::Category,
        Field::Season,
        Field::Brand,
        Field::OriginalPrice,
        Field::StockLevel,
    ];

    /// Canonical snake_case name. Also the name accepted by `FromStr`.
    #[must_use]
    pub fn canonical_name(&self) -> String {
        match self {
            Field::ProductId => "product_id".to_string(),
            Field::ProductName => "product_name".to_string(),
            Field::Category => "category".to_string(),
            Field::Season => "season".to_string(),
            Field::Brand => "brand".to_string(),
            Field::OriginalPrice => "original_price".to_string(),
            Field::CompetitorPrice => "competitor_price".to_string(),
            Field::StockLevel => "stock_level".to_string(),
            Field::HistoricalSales => "historical_sales".to_string(),
            Field::SeasonalityFactor => "seasonality_factor".to_string(),
            Field::CustomerRating => "customer_rating".to_string(),
            Field::ReturnRate => "return_rate".to_string(),
            Field::PromotionType => "promotion_type".to_string(),
            Field::OptimalDiscount => "optimal_discount".to_string(),
            Field::Markdown(stage) => format!("markdown_{}", stage.number()),
            Field::SalesAfter(stage) => format!("sales_after_m{}", stage.number()),
            Field::Stage => "stage".to_string(),
            Field::StageMarkdown => "markdown".to_string(),
            Field::StageSales => "sales".to_string(),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical_name())
    }
}

impl FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded = fold_header(s);
        let fixed = [
            Field::ProductId,
            Field::ProductName,
            Field::Category,
            Field::Season,
            Field::Brand,
            Field::OriginalPrice,
            Field::CompetitorPrice,
            Field::StockLevel,
            Field::HistoricalSales,
            Field::SeasonalityFactor,
            Field::CustomerRating,
            Field::ReturnRate,
            Field::PromotionType,
            Field::OptimalDiscount,
            Field::Stage,
            Field::StageMarkdown,
            Field::StageSales,
        ];
        if let Some(field) = fixed.into_iter().find(|f| f.canonical_name() == folded) {
            return Ok(field);
        }
        for stage in StageLabel::ALL {
            if Field::Markdown(stage).canonical_name() == folded {
                return Ok(Field::Markdown(stage));
            }
            if Field::SalesAfter(stage).canonical_name() == folded {
                return Ok(Field::SalesAfter(stage));
            }
        }
        Err(format!("unknown canonical field '{}'", s))
    }
}

// =============================================================================
// HEADER FOLDING
// =============================================================================

/// Fold a raw header into its lookup key.
///
/// Trims, strips a UTF-8 BOM, lower-cases ASCII, turns whitespace, `-` and
/// `.` into `_`, collapses repeated underscores and drops leading/trailing
/// ones. `"Customer Ratings"`, `"customer_ratings"` and `" CUSTOMER-RATINGS "`
/// all fold to `customer_ratings`.
#[must_use]
pub fn fold_header(raw: &str) -> String {
    let trimmed = raw.trim().trim_start_matches('\u{feff}');
    let mut out = String::with_capacity(trimmed.len());
    for ch in trimmed.chars() {
        let c = if ch.is_whitespace() || ch == '-' || ch == '.' || ch == '_' {
            '_'
        } else {
            ch.to_ascii_lowercase()
        };
        if c == '_' && (out.is_empty() || out.ends_with('_')) {
            continue;
        }
        out.push(c);
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

// =============================================================================
// ALIAS TABLE
// =============================================================================

/// Lookup table from folded header spellings to canonical fields.
///
/// `FieldAliases::builtin()` is the documented table of every naming variant
/// observed in the source datasets. Hosts extend it (for example from a
/// config file) with [`FieldAliases::insert`]; the core never guesses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldAliases {
    entries: BTreeMap<String, Field>,
}

impl FieldAliases {
    /// An empty table. Only explicitly inserted spellings resolve.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// The builtin alias table.
    ///
    /// | Field | Spellings (folded) |
    /// |-------|--------------------|
    /// | product_id | product_id, productid, id, sku |
    /// | product_name | product_name, name |
    /// | original_price | original_price, price, list_price |
    /// | stock_level | stock_level, stock, inventory |
    /// | customer_rating | customer_rating, customer_ratings, rating |
    /// | markdown_N | markdown_N, markdown_mN |
    /// | sales_after_mN | sales_after_mN, sales_after_N, sales_mN |
    ///
    /// Every canonical name also maps to itself.
    #[must_use]
    pub fn builtin() -> Self {
        let mut aliases = Self::empty();
        let fixed: [(Field, &[&str]); 17] = [
            (Field::ProductId, &["productid", "id", "sku"]),
            (Field::ProductName, &["name"]),
            (Field::Category, &[]),
            (Field::Season, &[]),
            (Field::Brand, &[]),
            (Field::OriginalPrice, &["price", "list_price"]),
            (Field::CompetitorPrice, &[]),
            (Field::StockLevel, &["stock", "inventory"]),
            (Field::HistoricalSales, &[]),
            (Field::SeasonalityFactor, &[]),
            (Field::CustomerRating, &["customer_ratings", "rating"]),
            (Field::ReturnRate, &[]),
            (Field::PromotionType, &[]),
            (Field::OptimalDiscount, &[]),
            (Field::Stage, &[]),
            (Field::StageMarkdown, &[]),
            (Field::StageSales, &[]),
        ];
        for (field, spellings) in fixed {
            aliases.insert(&field.canonical_name(), field);
            for spelling in spellings {
                aliases.insert(spelling, field);
            }
        }
        for stage in StageLabel::ALL {
            let n = stage.number();
            aliases.insert(&format!("markdown_{n}"), Field::Markdown(stage));
            aliases.insert(&format!("markdown_m{n}"), Field::Markdown(stage));
            aliases.insert(&format!("sales_after_m{n}"), Field::SalesAfter(stage));
            aliases.insert(&format!("sales_after_{n}"), Field::SalesAfter(stage));
            aliases.insert(&format!("sales_m{n}"), Field::SalesAfter(stage));
        }
        aliases
    }

    /// Map a header spelling to a field. The spelling is folded first.
    /// Returns the field it previously mapped to, if any.
    pub fn insert(&mut self, spelling: &str, field: Field) -> Option<Field> {
        self.entries.insert(fold_header(spelling), field)
    }

    /// Resolve a raw header.
    #[must_use]
    pub fn resolve(&self, header: &str) -> Option<Field> {
        self.entries.get(&fold_header(header)).copied()
    }

    /// Number of spellings in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the table has no spellings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for FieldAliases {
    fn default() -> Self {
        Self::builtin()
    }
}

// =============================================================================
// TESTS
// =============================================================================
