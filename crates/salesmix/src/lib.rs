#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/salesmix/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod pipeline;

// Re-export main types from sub-crates
pub use salesmix_data as data;
pub use salesmix_features as features;
pub use salesmix_model as model;
pub use salesmix_output as output;

pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use pipeline::{Pipeline, PipelineOutput, PreparedData};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
