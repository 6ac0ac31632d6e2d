//! Model specifications of the marketing-mix analysis
//!
//! - base: `sales ~ final_price + marketing_expense`
//! - brand equity: base plus `C(brand_factor, ref = <reference>)`
//! - instrumented: two-stage fit of `final_price` on configured instruments

use crate::formula::FormulaSpec;
use crate::iv::TwoStageSpec;
use salesmix_data::columns::{
    BRAND_FACTOR, FINAL_PRICE, MARKETING_EXPENSE, PREDICTED_FINAL_PRICE, SALES,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The three specifications, each fitted independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Specification {
    /// Price and marketing spend only
    Base,
    /// Base plus brand indicators
    BrandEquity,
    /// Two-stage least squares on price
    Instrumented,
}

impl Specification {
    /// All specifications in fitting order.
    pub const fn all() -> [Self; 3] {
        [Self::Base, Self::BrandEquity, Self::Instrumented]
    }

    /// Snake-case name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::BrandEquity => "brand_equity",
            Self::Instrumented => "instrumented",
        }
    }
}

impl fmt::Display for Specification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// `sales ~ final_price + marketing_expense`
pub fn base_model() -> FormulaSpec {
    FormulaSpec::new(SALES)
        .numeric(FINAL_PRICE)
        .numeric(MARKETING_EXPENSE)
}

/// `sales ~ final_price + marketing_expense + C(brand_factor, ref = reference)`
pub fn brand_equity_model(reference: &str) -> FormulaSpec {
    base_model().categorical(BRAND_FACTOR, reference)
}

/// Stage 1 `final_price ~ instruments + marketing_expense`,
/// stage 2 `sales ~ predicted_final_price + marketing_expense`.
pub fn instrumented_model(instruments: &[String]) -> TwoStageSpec {
    TwoStageSpec::new(SALES, FINAL_PRICE, instruments.iter().cloned())
        .with_exogenous(MARKETING_EXPENSE)
        .with_predicted_column(PREDICTED_FINAL_PRICE)
}
