//! Error types for the pipeline.

use thiserror::Error;

/// Result type for the pipeline.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that stop a pipeline run.
///
/// Model fitting errors do not appear here: each specification records its
/// own outcome in the report.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Configuration file could not be parsed
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Loading or merging failed
    #[error(transparent)]
    Data(#[from] salesmix_data::DataError),

    /// Configured model formula could not be parsed
    #[error(transparent)]
    Formula(#[from] salesmix_model::ModelError),

    /// Deriving fields or ranking failed
    #[error(transparent)]
    Feature(#[from] salesmix_features::FeatureError),

    /// Writing results failed
    #[error(transparent)]
    Export(#[from] salesmix_output::ExportError),

    /// Building or writing the report failed
    #[error(transparent)]
    Report(#[from] salesmix_output::ReportError),

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),
}
