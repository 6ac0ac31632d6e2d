//! Pipeline configuration.
//!
//! Every field has a default, so a TOML file only needs the values it
//! changes:
//!
//! ```toml
//! products = "data/products.csv"
//! sales = "data/sales.csv"
//! marketing = "data/marketing.csv"
//! reference_brand = "Acme"
//! instruments = ["supplier_cost", "competitor_price"]
//! base_formula = "sales ~ final_price + marketing_expense"
//! invalid_price_policy = "flag"
//! export_dir = "out"
//! ```

use crate::error::Result;
use salesmix_data::{DatasetPaths, LoaderConfig};
use salesmix_features::InvalidPricePolicy;
use salesmix_model::OlsConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Product catalog file
    pub products: PathBuf,
    /// Weekly sales file
    pub sales: PathBuf,
    /// Weekly marketing spend file
    pub marketing: PathBuf,
    /// Delimited-file reading options
    pub loader: LoaderConfig,
    /// Reference level of the brand factor, the top revenue brand when unset
    pub reference_brand: Option<String>,
    /// Instrument columns for the two-stage price model, which is skipped when empty
    pub instruments: Vec<String>,
    /// Formula replacing `sales ~ final_price + marketing_expense` in the base
    /// and brand-equity fits
    pub base_formula: Option<String>,
    /// Handling of out-of-range discount or RRP
    pub invalid_price_policy: InvalidPricePolicy,
    /// Least squares options
    pub ols: OlsConfig,
    /// Directory receiving exported tables and the JSON report
    pub export_dir: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            products: PathBuf::from("data/products.csv"),
            sales: PathBuf::from("data/sales.csv"),
            marketing: PathBuf::from("data/marketing.csv"),
            loader: LoaderConfig::default(),
            reference_brand: None,
            instruments: Vec::new(),
            base_formula: None,
            invalid_price_policy: InvalidPricePolicy::default(),
            ols: OlsConfig::default(),
            export_dir: None,
        }
    }
}

impl PipelineConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read a TOML file. Relative input paths resolve against the file's directory.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&text)?;

        if let Some(base) = path.parent() {
            for file in [&mut config.products, &mut config.sales, &mut config.marketing] {
                if file.is_relative() {
                    *file = base.join(&*file);
                }
            }
            if let Some(dir) = config.export_dir.as_mut().filter(|d| d.is_relative()) {
                *dir = base.join(&*dir);
            }
        }

        tracing::debug!(path = %path.display(), "loaded pipeline config");
        Ok(config)
    }

    /// Input file locations.
    pub fn dataset_paths(&self) -> DatasetPaths {
        DatasetPaths::new(&self.products, &self.sales, &self.marketing)
    }
}
