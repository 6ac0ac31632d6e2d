//! Typed records for the three input tables.
//!
//! Most data arrives through [`crate::loader`], but small tables are easier
//! to build from records, and the frames produced here have exactly the
//! normalized schema the loader yields.

use crate::error::Result;
use crate::schema::columns;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// One product of the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Product identifier.
    pub product_id: String,
    /// Brand of the product.
    pub brand: String,
    /// Product category.
    pub category: Option<String>,
}

impl ProductRecord {
    /// Create a new product record.
    pub fn new(product_id: impl Into<String>, brand: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            brand: brand.into(),
            category: None,
        }
    }

    /// Set the category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Build a products table.
    pub fn to_frame(records: &[Self]) -> Result<DataFrame> {
        let df = DataFrame::new(vec![
            Column::new(
                columns::PRODUCT_ID.into(),
                records.iter().map(|r| r.product_id.as_str()).collect::<Vec<_>>(),
            ),
            Column::new(
                columns::BRAND.into(),
                records.iter().map(|r| r.brand.as_str()).collect::<Vec<_>>(),
            ),
            Column::new(
                "category".into(),
                records
                    .iter()
                    .map(|r| r.category.as_deref())
                    .collect::<Vec<_>>(),
            ),
        ])?;
        Ok(df)
    }
}

/// Weekly sales of one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesRecord {
    /// Product identifier.
    pub product_id: String,
    /// Week identifier.
    pub week_id: String,
    /// Units sold.
    pub sales: Option<f64>,
    /// Recommended retail price.
    #[serde(rename = "RRP")]
    pub rrp: Option<f64>,
    /// Discount rate.
    pub discount: Option<f64>,
}

impl SalesRecord {
    /// Create a new sales record with all measures present.
    pub fn new(
        product_id: impl Into<String>,
        week_id: impl Into<String>,
        sales: f64,
        rrp: f64,
        discount: f64,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            week_id: week_id.into(),
            sales: Some(sales),
            rrp: Some(rrp),
            discount: Some(discount),
        }
    }

    /// Build a sales table.
    pub fn to_frame(records: &[Self]) -> Result<DataFrame> {
        let df = DataFrame::new(vec![
            Column::new(
                columns::PRODUCT_ID.into(),
                records.iter().map(|r| r.product_id.as_str()).collect::<Vec<_>>(),
            ),
            Column::new(
                columns::WEEK_ID.into(),
                records.iter().map(|r| r.week_id.as_str()).collect::<Vec<_>>(),
            ),
            Column::new(
                columns::SALES.into(),
                records.iter().map(|r| r.sales).collect::<Vec<_>>(),
            ),
            Column::new(
                columns::RRP.into(),
                records.iter().map(|r| r.rrp).collect::<Vec<_>>(),
            ),
            Column::new(
                columns::DISCOUNT.into(),
                records.iter().map(|r| r.discount).collect::<Vec<_>>(),
            ),
        ])?;
        Ok(df)
    }
}

/// Weekly marketing spend of one brand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketingRecord {
    /// Brand name.
    pub brand: String,
    /// Week identifier.
    pub week_id: String,
    /// Spend in the week.
    pub marketing_expense: Option<f64>,
}

impl MarketingRecord {
    /// Create a new marketing record.
    pub fn new(brand: impl Into<String>, week_id: impl Into<String>, expense: f64) -> Self {
        Self {
            brand: brand.into(),
            week_id: week_id.into(),
            marketing_expense: Some(expense),
        }
    }

    /// Build a marketing table.
    pub fn to_frame(records: &[Self]) -> Result<DataFrame> {
        let df = DataFrame::new(vec![
            Column::new(
                columns::BRAND.into(),
                records.iter().map(|r| r.brand.as_str()).collect::<Vec<_>>(),
            ),
            Column::new(
                columns::WEEK_ID.into(),
                records.iter().map(|r| r.week_id.as_str()).collect::<Vec<_>>(),
            ),
            Column::new(
                columns::MARKETING_EXPENSE.into(),
                records
                    .iter()
                    .map(|r| r.marketing_expense)
                    .collect::<Vec<_>>(),
            ),
        ])?;
        Ok(df)
    }
}
