//! Error types for model fitting.

use thiserror::Error;

/// Result type for model fitting.
pub type Result<T> = std::result::Result<T, ModelError>;

/// Errors that can occur while specifying or fitting a model.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// Formula could not be parsed
    #[error("Invalid formula `{formula}`: {reason}")]
    Formula {
        /// Formula text
        formula: String,
        /// What was wrong with it
        reason: String,
    },

    /// Specification is not usable as given
    #[error("Invalid specification: {0}")]
    Specification(String),

    /// A column referenced by the formula is absent
    #[error("`{formula}`: column `{column}` not found")]
    MissingColumn {
        /// Formula being fitted
        formula: String,
        /// Missing column
        column: String,
    },

    /// The reference level of a categorical term does not occur in the data
    #[error("`{formula}`: reference level `{level}` of `{column}` not found among complete rows")]
    UnknownReferenceLevel {
        /// Formula being fitted
        formula: String,
        /// Categorical column
        column: String,
        /// Requested reference level
        level: String,
    },

    /// The design matrix is rank deficient
    #[error("`{formula}`: design matrix is singular, `{term}` is collinear with earlier terms")]
    Singular {
        /// Formula being fitted
        formula: String,
        /// First term found to be linearly dependent
        term: String,
    },

    /// Not enough complete rows to estimate the parameters
    #[error(
        "`{formula}`: {observations} complete observation(s) for {parameters} parameter(s)"
    )]
    InsufficientData {
        /// Formula being fitted
        formula: String,
        /// Complete rows available
        observations: usize,
        /// Parameters to estimate
        parameters: usize,
    },

    /// A two-stage step ran out of order
    #[error("Sequencing error: {0}")]
    Sequencing(String),
}
