//! Table kinds and column names shared across the SalesMix crates.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Column names used by the input tables and the derived analysis table.
pub mod columns {
    /// Product identifier (key of the product catalog).
    pub const PRODUCT_ID: &str = "product_id";
    /// Week identifier.
    pub const WEEK_ID: &str = "week_id";
    /// Brand name.
    pub const BRAND: &str = "brand";
    /// Weekly unit sales.
    pub const SALES: &str = "sales";
    /// Recommended retail price.
    pub const RRP: &str = "RRP";
    /// Discount rate in [0, 1].
    pub const DISCOUNT: &str = "discount";
    /// Weekly marketing spend of a brand.
    pub const MARKETING_EXPENSE: &str = "marketing_expense";
    /// Net price after discount.
    pub const FINAL_PRICE: &str = "final_price";
    /// Set when the price inputs of a row were out of range.
    pub const PRICE_FLAGGED: &str = "price_flagged";
    /// Net revenue of a product in a week.
    pub const WEEKLY_DOLLAR_SALES: &str = "weekly_dollar_sales";
    /// Categorical copy of `brand` used by the brand-equity model.
    pub const BRAND_FACTOR: &str = "brand_factor";
    /// Stage-one fitted values of `final_price`.
    pub const PREDICTED_FINAL_PRICE: &str = "predicted_final_price";
}

/// The three input tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TableKind {
    /// Product catalog, one row per product.
    Products,

    /// Weekly sales, one row per product per week.
    Sales,

    /// Weekly marketing spend, one row per brand per week.
    Marketing,
}

impl TableKind {
    /// Returns all table kinds.
    pub fn all() -> Vec<Self> {
        vec![Self::Products, Self::Sales, Self::Marketing]
    }

    /// Returns the table name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Products => "products",
            Self::Sales => "sales",
            Self::Marketing => "marketing",
        }
    }

    /// Columns that must be present.
    pub const fn required_columns(&self) -> &'static [&'static str] {
        match self {
            Self::Products => &[columns::PRODUCT_ID, columns::BRAND],
            Self::Sales => &[
                columns::PRODUCT_ID,
                columns::WEEK_ID,
                columns::SALES,
                columns::RRP,
                columns::DISCOUNT,
            ],
            Self::Marketing => &[
                columns::BRAND,
                columns::WEEK_ID,
                columns::MARKETING_EXPENSE,
            ],
        }
    }

    /// Columns that identify one row at the table's granularity.
    pub const fn key_columns(&self) -> &'static [&'static str] {
        match self {
            Self::Products => &[columns::PRODUCT_ID],
            Self::Sales => &[columns::PRODUCT_ID, columns::WEEK_ID],
            Self::Marketing => &[columns::BRAND, columns::WEEK_ID],
        }
    }

    /// Identifier columns, normalized to strings on load.
    pub const fn id_columns(&self) -> &'static [&'static str] {
        match self {
            Self::Products => &[columns::PRODUCT_ID, columns::BRAND],
            Self::Sales => &[columns::PRODUCT_ID, columns::WEEK_ID],
            Self::Marketing => &[columns::BRAND, columns::WEEK_ID],
        }
    }

    /// Measure columns, cast to `f64` on load.
    pub const fn numeric_columns(&self) -> &'static [&'static str] {
        match self {
            Self::Products => &[],
            Self::Sales => &[columns::SALES, columns::RRP, columns::DISCOUNT],
            Self::Marketing => &[columns::MARKETING_EXPENSE],
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_tables() {
        assert_eq!(TableKind::all().len(), 3);
    }

    #[test]
    fn test_keys_are_required() {
        for kind in TableKind::all() {
            for key in kind.key_columns() {
                assert!(kind.required_columns().contains(key), "{kind}: {key}");
            }
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", TableKind::Marketing), "marketing");
    }
}
