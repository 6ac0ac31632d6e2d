#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/salesmix/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod loader;
pub mod merge;
pub mod records;
pub mod schema;

pub use error::{DataError, Result};
pub use loader::{DatasetPaths, Datasets, LoaderConfig, read_table, read_table_from_str};
pub use merge::{JoinMode, JoinSpec, ensure_unique_keys, join, merge};
pub use records::{MarketingRecord, ProductRecord, SalesRecord};
pub use schema::{TableKind, columns};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
