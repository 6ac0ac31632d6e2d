#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/salesmix/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod design;
pub mod distribution;
pub mod equity;
pub mod error;
pub mod formula;
pub mod iv;
pub mod linalg;
pub mod ols;
pub mod specs;
pub mod summary;

pub use design::{DesignColumn, DesignMatrix, FactorLevels, INTERCEPT};
pub use equity::{BrandEquity, BrandEquityRanking, brand_equity_ranking};
pub use error::{ModelError, Result};
pub use formula::{FormulaSpec, Term};
pub use iv::{FirstStage, TwoStageFit, TwoStageLeastSquares, TwoStageSpec};
pub use ols::{FittedModel, OlsConfig, OlsEstimator};
pub use specs::{Specification, base_model, brand_equity_model, instrumented_model};
pub use summary::{Coefficient, FitSummary, significance_code};
