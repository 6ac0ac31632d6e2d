#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/salesmix/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod export;
pub mod report;
pub mod tables;

pub use export::{ExportError, ExportFormat, Exporter, table_to_csv_string, write_table};
pub use report::{AnalysisReport, ModelOutcome, ReportBuilder, ReportError, SpecificationReport};
pub use tables::{Render, format_p_value};
