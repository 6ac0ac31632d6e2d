//! Error types for data operations.

use thiserror::Error;

/// Result type for data operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors that can occur while loading or merging tables.
#[derive(Debug, Error)]
pub enum DataError {
    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A required column is absent from an input table
    #[error("Table `{table}` is missing required column `{column}`")]
    MissingColumn {
        /// Table that was checked
        table: String,
        /// Column that was expected
        column: String,
    },

    /// A table that must be unique on its key holds repeated keys
    #[error(
        "Duplicate keys in `{table}` on ({keys}): {count} repeated key(s), e.g. {examples:?}"
    )]
    DuplicateKeys {
        /// Table that was checked
        table: String,
        /// Key columns, comma separated
        keys: String,
        /// Number of distinct keys that occur more than once
        count: usize,
        /// A few of the repeated keys
        examples: Vec<String>,
    },

    /// A join produced a different number of rows than its anchor table
    #[error("Join on `{anchor}` changed row count: expected {expected}, got {actual}")]
    CardinalityChanged {
        /// Anchor table of the join
        anchor: String,
        /// Rows in the anchor table
        expected: usize,
        /// Rows after the join
        actual: usize,
    },

    /// An input table has no rows
    #[error("Table `{0}` is empty")]
    EmptyTable(String),
}
