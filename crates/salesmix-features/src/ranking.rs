//! Brand revenue ranking.
//!
//! Ranks brands by their mean weekly dollar sales,
//! `weekly_dollar_sales = final_price * sales`, averaged over every product
//! row of the brand. Rows with a missing metric or a missing brand are left
//! out of the averages and counted in [`BrandRanking::excluded_rows`].
//!
//! Brands with equal averages keep the order in which they first appear in
//! the input. The ranking is descriptive only: a brand that sells more is not
//! thereby shown to carry more equity, since price and marketing spend are
//! not controlled for here.

use crate::error::Result;
use polars::prelude::*;
use salesmix_data::columns::{BRAND, FINAL_PRICE, SALES, WEEKLY_DOLLAR_SALES};
use serde::{Deserialize, Serialize};

const AVERAGE: &str = "avg_weekly_dollar_sales";
const OBSERVATIONS: &str = "observations";

/// Mean weekly dollar sales of one brand.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BrandRevenue {
    /// Brand name.
    pub brand: String,
    /// Mean of `final_price * sales` over the brand's rows.
    pub avg_weekly_dollar_sales: f64,
    /// Rows that entered the mean.
    pub observations: usize,
}

impl BrandRevenue {
    /// Create a new brand revenue entry.
    pub fn new(brand: impl Into<String>, avg_weekly_dollar_sales: f64, observations: usize) -> Self {
        Self {
            brand: brand.into(),
            avg_weekly_dollar_sales,
            observations,
        }
    }
}

/// Brands ordered by descending mean weekly dollar sales.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BrandRanking {
    /// Ranked entries, best first.
    pub entries: Vec<BrandRevenue>,
    /// Rows left out because the metric or the brand was missing.
    pub excluded_rows: usize,
}

impl BrandRanking {
    /// Top-ranked brand.
    pub fn top(&self) -> Option<&BrandRevenue> {
        self.entries.first()
    }

    /// Zero-based rank of a brand.
    pub fn position(&self, brand: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.brand == brand)
    }

    /// Number of ranked brands.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no brand was ranked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over the ranked entries.
    pub fn iter(&self) -> impl Iterator<Item = &BrandRevenue> {
        self.entries.iter()
    }
}

/// Add `weekly_dollar_sales = final_price * sales`.
pub fn with_weekly_dollar_sales(df: &DataFrame) -> Result<DataFrame> {
    let out = df
        .clone()
        .lazy()
        .with_column((col(FINAL_PRICE) * col(SALES)).alias(WEEKLY_DOLLAR_SALES))
        .collect()?;
    Ok(out)
}

/// Rank brands by mean weekly dollar sales.
///
/// Expects `brand`, `final_price` and `sales` columns. Rows whose metric is
/// null, NaN or infinite count as excluded.
pub fn rank_brands(df: &DataFrame) -> Result<BrandRanking> {
    let with_metric = with_weekly_dollar_sales(df)?.lazy();
    let usable = col(BRAND)
        .is_not_null()
        .and(col(WEEKLY_DOLLAR_SALES).is_not_null())
        .and(col(WEEKLY_DOLLAR_SALES).is_finite())
        .fill_null(lit(false));

    let excluded_rows = with_metric
        .clone()
        .filter(usable.clone().not())
        .collect()?
        .height();
    if excluded_rows > 0 {
        tracing::warn!(
            rows = excluded_rows,
            "rows without finite weekly dollar sales or brand left out of the ranking"
        );
    }

    let ranked = with_metric
        .filter(usable)
        .group_by_stable([col(BRAND)])
        .agg([
            col(WEEKLY_DOLLAR_SALES).mean().alias(AVERAGE),
            len().cast(DataType::UInt64).alias(OBSERVATIONS),
        ])
        .sort(
            [AVERAGE],
            SortMultipleOptions::default()
                .with_order_descending(true)
                .with_maintain_order(true),
        )
        .collect()?;

    let brands = ranked.column(BRAND)?.as_materialized_series().str()?.clone();
    let averages = ranked.column(AVERAGE)?.as_materialized_series().f64()?.clone();
    let counts = ranked
        .column(OBSERVATIONS)?
        .as_materialized_series()
        .u64()?
        .clone();

    let entries = brands
        .into_iter()
        .zip(averages.into_iter())
        .zip(counts.into_iter())
        .filter_map(|((brand, avg), n)| {
            Some(BrandRevenue::new(brand?, avg?, n.unwrap_or(0) as usize))
        })
        .collect();

    Ok(BrandRanking {
        entries,
        excluded_rows,
    })
}
