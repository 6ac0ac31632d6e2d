//! Error types for feature derivation.

use thiserror::Error;

/// Result type for feature derivation.
pub type Result<T> = std::result::Result<T, FeatureError>;

/// Errors that can occur while deriving features.
#[derive(Debug, Error)]
pub enum FeatureError {
    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// Out-of-range price inputs in a table
    #[error(
        "{count} row(s) with discount outside [0, 1] or negative RRP, first at product {product_id} week {week_id}"
    )]
    InvalidPrice {
        /// Number of offending rows
        count: usize,
        /// Product of the first offending row
        product_id: String,
        /// Week of the first offending row
        week_id: String,
    },

    /// Out-of-range price inputs for a single row
    #[error("Invalid price inputs: RRP {rrp}, discount {discount}")]
    InvalidPriceValue {
        /// Recommended retail price
        rrp: f64,
        /// Discount rate
        discount: f64,
    },

    /// A brand was requested that does not occur in the data
    #[error("Unknown brand: {0}")]
    UnknownBrand(String),

    /// No brand could be ranked
    #[error("No brand has a weekly dollar sales observation")]
    NoBrands,
}
