//! Brand equity ranking
//!
//! Reads the brand indicators of a fitted brand-equity model: each
//! non-reference coefficient is that brand's sales differential versus the
//! reference brand at equal price and marketing spend. The ranking lists the
//! reference brand first, then the other brands by descending coefficient
//! (least negative first).

use crate::error::{ModelError, Result};
use crate::ols::FittedModel;
use serde::{Deserialize, Serialize};

/// Sales differential of one brand against the reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandEquity {
    /// Brand
    pub brand: String,
    /// Indicator coefficient, 0 for the reference brand
    pub coefficient: f64,
    /// Standard error, absent for the reference brand
    pub std_error: Option<f64>,
    /// Two-sided p-value, absent for the reference brand
    pub p_value: Option<f64>,
}

/// Brands ordered by equity, reference first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandEquityRanking {
    /// Reference brand
    pub reference: String,
    /// Entries, reference first
    pub entries: Vec<BrandEquity>,
}

impl BrandEquityRanking {
    /// Brands whose coefficient is positive, i.e. above the reference.
    pub fn above_reference(&self) -> impl Iterator<Item = &BrandEquity> {
        self.entries.iter().filter(|e| e.coefficient > 0.0)
    }

    /// Number of brands, reference included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the ranking is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Rank brands by their indicator coefficients on `factor`.
pub fn brand_equity_ranking(model: &FittedModel, factor: &str) -> Result<BrandEquityRanking> {
    let levels = model
        .factor_levels()
        .iter()
        .find(|f| f.column == factor)
        .ok_or_else(|| {
            ModelError::Specification(format!(
                "`{}` has no categorical term `{factor}`",
                model.formula()
            ))
        })?;

    let mut others: Vec<BrandEquity> = model
        .summary()
        .factor_coefficients(factor)
        .filter_map(|c| {
            Some(BrandEquity {
                brand: c.level.clone()?,
                coefficient: c.estimate,
                std_error: Some(c.std_error),
                p_value: Some(c.p_value),
            })
        })
        .collect();
    others.sort_by(|a, b| b.coefficient.total_cmp(&a.coefficient));

    let mut entries = Vec::with_capacity(others.len() + 1);
    entries.push(BrandEquity {
        brand: levels.reference.clone(),
        coefficient: 0.0,
        std_error: None,
        p_value: None,
    });
    entries.extend(others);

    let ranking = BrandEquityRanking {
        reference: levels.reference.clone(),
        entries,
    };

    let above: Vec<&str> = ranking.above_reference().map(|e| e.brand.as_str()).collect();
    if !above.is_empty() {
        tracing::warn!(
            reference = %ranking.reference,
            brands = ?above,
            "brands with a positive differential over the reference"
        );
    }

    Ok(ranking)
}
