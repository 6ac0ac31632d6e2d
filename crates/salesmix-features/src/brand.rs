//! Brand factor column and reference level selection.
//!
//! The brand-equity regression treats `brand` as categorical. Its reference
//! level is always chosen explicitly, either by the caller or as the leading
//! brand of the revenue ranking, so coefficients read as sales relative to a
//! named baseline brand.

use crate::error::{FeatureError, Result};
use crate::ranking::BrandRanking;
use polars::prelude::*;
use salesmix_data::columns::{BRAND, BRAND_FACTOR};

/// Add `brand_factor`, a categorical copy of `brand`.
pub fn with_brand_factor(df: &DataFrame) -> Result<DataFrame> {
    let out = df
        .clone()
        .lazy()
        .with_column(col(BRAND).alias(BRAND_FACTOR))
        .collect()?;
    Ok(out)
}

/// Distinct non-null brands in order of first appearance.
pub fn brand_levels(df: &DataFrame) -> Result<Vec<String>> {
    let brands = df
        .clone()
        .lazy()
        .select([col(BRAND)])
        .filter(col(BRAND).is_not_null())
        .unique_stable(None, UniqueKeepStrategy::First)
        .collect()?;

    let levels = brands
        .column(BRAND)?
        .as_materialized_series()
        .str()?
        .into_iter()
        .flatten()
        .map(str::to_string)
        .collect();
    Ok(levels)
}

/// Pick the reference brand.
///
/// A requested brand must occur in `levels`. Without a request the top brand
/// of `ranking` is used.
pub fn resolve_reference_brand(
    requested: Option<&str>,
    levels: &[String],
    ranking: &BrandRanking,
) -> Result<String> {
    match requested {
        Some(brand) => {
            if levels.iter().any(|l| l == brand) {
                Ok(brand.to_string())
            } else {
                Err(FeatureError::UnknownBrand(brand.to_string()))
            }
        }
        None => {
            let top = ranking.top().ok_or(FeatureError::NoBrands)?;
            tracing::info!(
                brand = %top.brand,
                "no reference brand configured, using the top revenue brand"
            );
            Ok(top.brand.clone())
        }
    }
}
