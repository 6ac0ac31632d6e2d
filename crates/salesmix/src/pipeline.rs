//! Batch runner for the marketing-mix analysis.
//!
//! Load, merge, derive, rank and fit run in sequence, each stage fully
//! materialized before the next. Data errors abort the run. Each model
//! specification is fitted on its own and records its outcome in the
//! report, so a singular brand-equity design still leaves the base and
//! instrumented fits intact.

use crate::config::PipelineConfig;
use crate::error::Result;
use polars::prelude::*;
use salesmix_data::Datasets;
use salesmix_data::columns::{BRAND_FACTOR, PREDICTED_FINAL_PRICE, PRICE_FLAGGED};
use salesmix_features::{
    BrandRanking, brand_levels, derive_final_price, rank_brands, resolve_reference_brand,
    with_brand_factor, with_weekly_dollar_sales,
};
use salesmix_model::{
    BrandEquityRanking, FormulaSpec, OlsEstimator, Specification, TwoStageLeastSquares,
    base_model, brand_equity_ranking, brand_equity_model, instrumented_model,
};
use salesmix_output::{
    AnalysisReport, ExportFormat, Exporter, ModelOutcome, ReportBuilder, write_table,
};
use std::path::{Path, PathBuf};

/// Merged analysis table with derived columns and the brand ranking.
#[derive(Debug, Clone)]
pub struct PreparedData {
    /// Sales rows joined with product and marketing data, plus
    /// `final_price`, `weekly_dollar_sales` and `brand_factor`
    pub table: DataFrame,
    /// Brands by average weekly dollar sales
    pub ranking: BrandRanking,
    /// Rows whose price inputs were flagged as out of range
    pub flagged_prices: usize,
}

/// Result of a full run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Analysis table, with `predicted_final_price` when stage 1 ran
    pub table: DataFrame,
    /// Ranking, model outcomes and brand equity
    pub report: AnalysisReport,
}

/// Marketing-mix pipeline.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    estimator: OlsEstimator,
}

impl Pipeline {
    /// Create a pipeline from its configuration.
    pub fn new(config: PipelineConfig) -> Self {
        let estimator = OlsEstimator::new(config.ols);
        Self { config, estimator }
    }

    /// Configuration in use.
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Read the three input files.
    pub fn load(&self) -> Result<Datasets> {
        Ok(Datasets::load(
            &self.config.dataset_paths(),
            &self.config.loader,
        )?)
    }

    /// Merge the inputs, derive prices and revenue, and rank brands.
    pub fn prepare(&self, datasets: &Datasets) -> Result<PreparedData> {
        let merged = salesmix_data::merge(&datasets.sales, &datasets.products, &datasets.marketing)?;
        let priced = derive_final_price(&merged, self.config.invalid_price_policy)?;
        let table = with_brand_factor(&with_weekly_dollar_sales(&priced)?)?;
        let ranking = rank_brands(&table)?;
        let flagged_prices = count_flagged(&table)?;

        tracing::info!(
            rows = table.height(),
            brands = ranking.len(),
            flagged = flagged_prices,
            "prepared analysis table"
        );

        Ok(PreparedData {
            table,
            ranking,
            flagged_prices,
        })
    }

    /// Load the configured files and run every stage.
    pub fn run(&self) -> Result<PipelineOutput> {
        let datasets = self.load()?;
        self.run_on(&datasets)
    }

    /// Run every stage on tables already in memory.
    pub fn run_on(&self, datasets: &Datasets) -> Result<PipelineOutput> {
        let base = self.base_formula()?;
        let PreparedData {
            mut table,
            ranking,
            flagged_prices,
        } = self.prepare(datasets)?;

        let reference = self.reference_brand(&table, &ranking);
        let mut builder = ReportBuilder::new()
            .rows(table.height())
            .flagged_prices(flagged_prices);
        if let Ok(brand) = &reference {
            builder = builder.reference_brand(brand.clone());
        }

        builder = builder.model(Specification::Base, self.fit_base(&table, &base));

        let (outcome, equity) = match &reference {
            Ok(brand) => self.fit_brand_equity(&table, &base, brand),
            Err(error) => (failed(Specification::BrandEquity, error), None),
        };
        builder = builder.model(Specification::BrandEquity, outcome);
        if let Some(equity) = equity {
            builder = builder.brand_equity(equity);
        }

        let (outcome, predicted) = self.fit_instrumented(&table);
        builder = builder.model(Specification::Instrumented, outcome);
        if let Some(predicted) = predicted {
            table.with_column(Column::new(PREDICTED_FINAL_PRICE.into(), predicted))?;
        }

        let report = builder.ranking(ranking).build()?;
        if report.failures() > 0 {
            tracing::warn!(
                failed = report.failures(),
                "some model specifications failed"
            );
        }

        Ok(PipelineOutput { table, report })
    }

    /// Write the analysis table, rankings, model tables and JSON report to `dir`.
    ///
    /// Returns the files written.
    pub fn export(&self, output: &PipelineOutput, dir: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;
        let mut written = Vec::new();

        let path = dir.join("merged.csv");
        write_table(&output.table, &path)?;
        written.push(path);

        let path = dir.join("ranking.csv");
        output.report.ranking.export_to_file(&path, ExportFormat::Csv)?;
        written.push(path);

        for model in &output.report.models {
            let path = dir.join(format!("{}.csv", model.specification));
            match &model.outcome {
                ModelOutcome::Fitted { summary } => {
                    summary.export_to_file(&path, ExportFormat::Csv)?;
                }
                ModelOutcome::TwoStage { fit } => {
                    fit.export_to_file(&path, ExportFormat::Csv)?;
                    let path = dir.join(format!("{}_first_stage.csv", model.specification));
                    fit.first_stage.export_to_file(&path, ExportFormat::Csv)?;
                    written.push(path);
                }
                ModelOutcome::Failed { .. } | ModelOutcome::Skipped { .. } => continue,
            }
            written.push(path);
        }

        if let Some(equity) = &output.report.brand_equity {
            let path = dir.join("brand_equity_ranking.csv");
            equity.export_to_file(&path, ExportFormat::Csv)?;
            written.push(path);
        }

        let path = dir.join("report.json");
        output.report.write_json(&path)?;
        written.push(path);

        tracing::info!(dir = %dir.display(), files = written.len(), "exported results");
        Ok(written)
    }

    fn reference_brand(
        &self,
        table: &DataFrame,
        ranking: &BrandRanking,
    ) -> salesmix_features::Result<String> {
        let levels = brand_levels(table)?;
        resolve_reference_brand(self.config.reference_brand.as_deref(), &levels, ranking)
    }

    /// Configured base formula, or `sales ~ final_price + marketing_expense`.
    fn base_formula(&self) -> salesmix_model::Result<FormulaSpec> {
        match &self.config.base_formula {
            Some(text) => {
                let formula: FormulaSpec = text.parse()?;
                tracing::info!(%formula, "using configured base formula");
                Ok(formula)
            }
            None => Ok(base_model()),
        }
    }

    fn fit_base(&self, table: &DataFrame, base: &FormulaSpec) -> ModelOutcome {
        match self.estimator.fit(base, table) {
            Ok(model) => ModelOutcome::Fitted {
                summary: model.into_summary(),
            },
            Err(error) => failed(Specification::Base, &error),
        }
    }

    fn fit_brand_equity(
        &self,
        table: &DataFrame,
        base: &FormulaSpec,
        reference: &str,
    ) -> (ModelOutcome, Option<BrandEquityRanking>) {
        let formula = if self.config.base_formula.is_some() {
            base.clone().categorical(BRAND_FACTOR, reference)
        } else {
            brand_equity_model(reference)
        };
        let fitted = self
            .estimator
            .fit(&formula, table)
            .and_then(|model| {
                let equity = brand_equity_ranking(&model, BRAND_FACTOR)?;
                Ok((model, equity))
            });

        match fitted {
            Ok((model, equity)) => (
                ModelOutcome::Fitted {
                    summary: model.into_summary(),
                },
                Some(equity),
            ),
            Err(error) => (failed(Specification::BrandEquity, &error), None),
        }
    }

    fn fit_instrumented(&self, table: &DataFrame) -> (ModelOutcome, Option<Vec<Option<f64>>>) {
        if self.config.instruments.is_empty() {
            tracing::info!(
                specification = %Specification::Instrumented,
                "no instruments configured, skipping"
            );
            return (
                ModelOutcome::Skipped {
                    reason: "no instruments configured".to_string(),
                },
                None,
            );
        }

        let tsls = TwoStageLeastSquares::new(
            instrumented_model(&self.config.instruments),
            self.estimator.clone(),
        );
        match tsls.fit(table) {
            Ok(mut fit) => {
                let predicted = std::mem::take(&mut fit.predicted);
                (ModelOutcome::TwoStage { fit }, Some(predicted))
            }
            Err(error) => (failed(Specification::Instrumented, &error), None),
        }
    }
}

fn failed(specification: Specification, error: &dyn std::error::Error) -> ModelOutcome {
    tracing::warn!(%specification, %error, "model specification failed");
    ModelOutcome::Failed {
        error: error.to_string(),
    }
}

fn count_flagged(table: &DataFrame) -> Result<usize> {
    let Ok(flags) = table.column(PRICE_FLAGGED) else {
        return Ok(0);
    };
    let count = flags
        .as_materialized_series()
        .bool()?
        .into_iter()
        .filter(|flag| *flag == Some(true))
        .count();
    Ok(count)
}
