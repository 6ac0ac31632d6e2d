#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/salesmix/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod brand;
pub mod error;
pub mod price;
pub mod ranking;

pub use brand::{brand_levels, resolve_reference_brand, with_brand_factor};
pub use error::{FeatureError, Result};
pub use price::{InvalidPricePolicy, derive_final_price, final_price};
pub use ranking::{BrandRanking, BrandRevenue, rank_brands, with_weekly_dollar_sales};
