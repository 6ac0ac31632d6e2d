//! Net Transaction Price
//!
//! The price a customer actually pays is the list price less the discount:
//!
//! final_price = RRP - RRP * discount
//!
//! With a discount in [0, 1] and a non-negative RRP this always lies in
//! [0, RRP]. Inputs outside those ranges, NaN and infinite values included,
//! are never clamped; depending on the
//! [`InvalidPricePolicy`] they either fail the derivation or are flagged and
//! left without a price.

use crate::error::{FeatureError, Result};
use polars::prelude::*;
use salesmix_data::columns::{DISCOUNT, FINAL_PRICE, PRICE_FLAGGED, PRODUCT_ID, RRP, WEEK_ID};
use serde::{Deserialize, Serialize};

/// What to do with rows whose discount or RRP is out of range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidPricePolicy {
    /// Fail the whole derivation.
    #[default]
    Reject,

    /// Keep the row, leave `final_price` null and set `price_flagged`.
    Flag,
}

/// Net price of a single row.
pub fn final_price(rrp: f64, discount: f64) -> Result<f64> {
    if !(0.0..=1.0).contains(&discount) || rrp < 0.0 || !rrp.is_finite() {
        return Err(FeatureError::InvalidPriceValue { rrp, discount });
    }
    Ok(rrp - rrp * discount)
}

fn invalid_inputs() -> Expr {
    col(DISCOUNT)
        .lt(lit(0.0))
        .or(col(DISCOUNT).gt(lit(1.0)))
        .or(col(RRP).lt(lit(0.0)))
        .or(col(DISCOUNT).is_finite().not())
        .or(col(RRP).is_finite().not())
        .fill_null(lit(false))
}

fn net_price() -> Expr {
    col(RRP) - col(RRP) * col(DISCOUNT)
}

/// Add `final_price` to the analysis table.
///
/// Rows with a null RRP or discount get a null price and are not treated as
/// invalid.
pub fn derive_final_price(df: &DataFrame, policy: InvalidPricePolicy) -> Result<DataFrame> {
    let invalid = df.clone().lazy().filter(invalid_inputs()).collect()?;

    if invalid.height() > 0 {
        match policy {
            InvalidPricePolicy::Reject => {
                return Err(FeatureError::InvalidPrice {
                    count: invalid.height(),
                    product_id: first_value(&invalid, PRODUCT_ID)?,
                    week_id: first_value(&invalid, WEEK_ID)?,
                });
            }
            InvalidPricePolicy::Flag => {
                tracing::warn!(
                    rows = invalid.height(),
                    "flagged rows with discount outside [0, 1] or negative RRP"
                );
            }
        }
    }

    let derived = match policy {
        InvalidPricePolicy::Reject => df
            .clone()
            .lazy()
            .with_column(net_price().alias(FINAL_PRICE))
            .collect()?,
        InvalidPricePolicy::Flag => df
            .clone()
            .lazy()
            .with_columns([
                when(invalid_inputs())
                    .then(lit(NULL).cast(DataType::Float64))
                    .otherwise(net_price())
                    .alias(FINAL_PRICE),
                invalid_inputs().alias(PRICE_FLAGGED),
            ])
            .collect()?,
    };

    Ok(derived)
}

fn first_value(df: &DataFrame, name: &str) -> Result<String> {
    let values = df.column(name)?.cast(&DataType::String)?;
    let value = values
        .as_materialized_series()
        .str()?
        .get(0)
        .unwrap_or("null")
        .to_string();
    Ok(value)
}
