//! Analysis report for a SalesMix run.

use crate::tables::Render;
use chrono::{DateTime, Utc};
use salesmix_features::BrandRanking;
use salesmix_model::{BrandEquityRanking, FitSummary, Specification, TwoStageFit};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during report generation.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A required section was never set.
    #[error("Report is missing its {0}")]
    Incomplete(&'static str),
}

/// What became of one model specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ModelOutcome {
    /// Single-equation fit.
    Fitted {
        /// Coefficient table and fit statistics
        summary: FitSummary,
    },

    /// Two-stage fit.
    TwoStage {
        /// Both stages and the structural table
        fit: TwoStageFit,
    },

    /// The fit failed; other specifications are unaffected.
    Failed {
        /// Error message
        error: String,
    },

    /// The specification was not run.
    Skipped {
        /// Why it was not run
        reason: String,
    },
}

impl ModelOutcome {
    /// Whether the specification produced estimates.
    pub const fn is_fitted(&self) -> bool {
        matches!(self, Self::Fitted { .. } | Self::TwoStage { .. })
    }
}

/// Outcome of one specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecificationReport {
    /// Which specification
    pub specification: Specification,
    /// What became of it
    pub outcome: ModelOutcome,
}

/// Everything a run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Report generation timestamp.
    pub generated_at: DateTime<Utc>,

    /// Rows of the merged analysis table.
    pub rows: usize,

    /// Rows whose price inputs were out of range and flagged.
    pub flagged_prices: usize,

    /// Reference level of the brand factor.
    pub reference_brand: Option<String>,

    /// Brands by average weekly dollar sales.
    pub ranking: BrandRanking,

    /// One entry per specification, in fitting order.
    pub models: Vec<SpecificationReport>,

    /// Brands by equity differential, when the brand-equity model fitted.
    pub brand_equity: Option<BrandEquityRanking>,
}

impl AnalysisReport {
    /// Outcome of a specification.
    pub fn outcome(&self, specification: Specification) -> Option<&ModelOutcome> {
        self.models
            .iter()
            .find(|m| m.specification == specification)
            .map(|m| &m.outcome)
    }

    /// Number of specifications that failed.
    pub fn failures(&self) -> usize {
        self.models
            .iter()
            .filter(|m| matches!(m.outcome, ModelOutcome::Failed { .. }))
            .count()
    }

    /// Convert report to JSON string.
    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the JSON report to a file.
    pub fn write_json(&self, path: &Path) -> Result<(), ReportError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

impl Render for AnalysisReport {
    fn to_ascii_table(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "SalesMix analysis, {} rows, generated {}\n",
            self.rows,
            self.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        if self.flagged_prices > 0 {
            output.push_str(&format!(
                "{} rows with out-of-range price inputs flagged\n",
                self.flagged_prices
            ));
        }
        output.push_str(&self.ranking.to_ascii_table());

        for model in &self.models {
            output.push_str(&format!("\n[{}]", model.specification));
            match &model.outcome {
                ModelOutcome::Fitted { summary } => output.push_str(&summary.to_ascii_table()),
                ModelOutcome::TwoStage { fit } => output.push_str(&fit.to_ascii_table()),
                ModelOutcome::Failed { error } => output.push_str(&format!(" failed: {error}\n")),
                ModelOutcome::Skipped { reason } => {
                    output.push_str(&format!(" skipped: {reason}\n"));
                }
            }
        }

        if let Some(equity) = &self.brand_equity {
            output.push_str(&equity.to_ascii_table());
        }

        output
    }

    fn to_markdown(&self) -> String {
        let mut output = String::new();

        output.push_str("# SalesMix Analysis\n\n");
        output.push_str(&format!(
            "**Generated:** {}  \n**Rows:** {}\n\n",
            self.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
            self.rows
        ));
        if self.flagged_prices > 0 {
            output.push_str(&format!(
                "**Flagged price rows:** {}\n\n",
                self.flagged_prices
            ));
        }
        output.push_str(&self.ranking.to_markdown());

        output.push_str("\n## Models\n\n");
        for model in &self.models {
            output.push_str(&format!("### {}\n\n", model.specification));
            match &model.outcome {
                ModelOutcome::Fitted { summary } => output.push_str(&summary.to_markdown()),
                ModelOutcome::TwoStage { fit } => output.push_str(&fit.to_markdown()),
                ModelOutcome::Failed { error } => {
                    output.push_str(&format!("**Failed:** {error}\n"));
                }
                ModelOutcome::Skipped { reason } => {
                    output.push_str(&format!("_Skipped: {reason}_\n"));
                }
            }
            output.push('\n');
        }

        if let Some(equity) = &self.brand_equity {
            output.push_str(&equity.to_markdown());
        }

        output
    }
}

/// Builder for creating reports.
#[derive(Debug, Default)]
pub struct ReportBuilder {
    rows: usize,
    flagged_prices: usize,
    reference_brand: Option<String>,
    ranking: Option<BrandRanking>,
    models: Vec<SpecificationReport>,
    brand_equity: Option<BrandEquityRanking>,
}

impl ReportBuilder {
    /// Create a new report builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the merged table size.
    pub const fn rows(mut self, rows: usize) -> Self {
        self.rows = rows;
        self
    }

    /// Set the number of flagged price rows.
    pub const fn flagged_prices(mut self, rows: usize) -> Self {
        self.flagged_prices = rows;
        self
    }

    /// Set the reference brand.
    pub fn reference_brand(mut self, brand: impl Into<String>) -> Self {
        self.reference_brand = Some(brand.into());
        self
    }

    /// Set the brand revenue ranking.
    pub fn ranking(mut self, ranking: BrandRanking) -> Self {
        self.ranking = Some(ranking);
        self
    }

    /// Record the outcome of a specification.
    pub fn model(mut self, specification: Specification, outcome: ModelOutcome) -> Self {
        self.models.push(SpecificationReport {
            specification,
            outcome,
        });
        self
    }

    /// Set the brand-equity ranking.
    pub fn brand_equity(mut self, ranking: BrandEquityRanking) -> Self {
        self.brand_equity = Some(ranking);
        self
    }

    /// Build the report.
    pub fn build(self) -> Result<AnalysisReport, ReportError> {
        Ok(AnalysisReport {
            generated_at: Utc::now(),
            rows: self.rows,
            flagged_prices: self.flagged_prices,
            reference_brand: self.reference_brand,
            ranking: self.ranking.ok_or(ReportError::Incomplete("brand ranking"))?,
            models: self.models,
            brand_equity: self.brand_equity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use salesmix_features::BrandRevenue;

    fn ranking() -> BrandRanking {
        BrandRanking {
            entries: vec![BrandRevenue::new("Acme", 900.0, 3)],
            excluded_rows: 0,
        }
    }

    #[test]
    fn test_report_builder() {
        let report = ReportBuilder::new()
            .rows(12)
            .reference_brand("Acme")
            .ranking(ranking())
            .model(
                Specification::Base,
                ModelOutcome::Failed {
                    error: "singular".to_string(),
                },
            )
            .model(
                Specification::Instrumented,
                ModelOutcome::Skipped {
                    reason: "no instruments".to_string(),
                },
            )
            .build()
            .unwrap();

        assert_eq!(report.rows, 12);
        assert_eq!(report.reference_brand.as_deref(), Some("Acme"));
        assert_eq!(report.failures(), 1);
        assert!(matches!(
            report.outcome(Specification::Instrumented),
            Some(ModelOutcome::Skipped { .. })
        ));
        assert!(report.outcome(Specification::BrandEquity).is_none());
    }

    #[test]
    fn test_builder_requires_ranking() {
        assert!(matches!(
            ReportBuilder::new().build(),
            Err(ReportError::Incomplete(_))
        ));
    }

    #[test]
    fn test_report_json() {
        let report = ReportBuilder::new()
            .ranking(ranking())
            .model(
                Specification::BrandEquity,
                ModelOutcome::Failed {
                    error: "singular".to_string(),
                },
            )
            .build()
            .unwrap();

        let json = report.to_json().unwrap();
        assert!(json.contains("\"generated_at\""));
        assert!(json.contains("\"specification\": \"brand_equity\""));
        assert!(json.contains("\"status\": \"failed\""));

        let ascii = report.to_ascii_table();
        assert!(ascii.contains("[brand_equity] failed: singular"));
    }
}
