//! Two-Stage Least Squares
//!
//! Corrects for an endogenous regressor (price set in response to expected
//! demand) using instruments that move the regressor but not the response:
//!
//! Stage 1: endogenous ~ instruments + exogenous
//! Stage 2: response ~ predicted_endogenous + exogenous
//!
//! Stage 2 reads the endogenous regressor only through the stage-1 fitted
//! values, so its coefficients equal a plain OLS fit on those predictions.
//! The naive stage-2 standard errors use residuals built from the
//! predictions. The structural errors reported alongside use residuals
//! against the observed regressor:
//!
//! u = y - X b,   s^2 = u'u / (n - p),   Var(b) = s^2 (X_hat' X_hat)^-1

use crate::design::{DesignMatrix, numeric_values};
use crate::error::{ModelError, Result};
use crate::formula::FormulaSpec;
use crate::ols::{FittedModel, OlsEstimator, coefficient_table};
use crate::summary::{Coefficient, FitSummary};
use ndarray::Array1;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Columns of a two-stage model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwoStageSpec {
    /// Response of stage 2
    pub response: String,
    /// Endogenous regressor, response of stage 1
    pub endogenous: String,
    /// Excluded instruments, stage 1 only
    pub instruments: Vec<String>,
    /// Exogenous regressors, both stages
    pub exogenous: Vec<String>,
    /// Column receiving the stage-1 predictions
    pub predicted_column: String,
}

impl TwoStageSpec {
    /// Spec with no exogenous regressors; predictions go to `predicted_<endogenous>`.
    pub fn new(
        response: impl Into<String>,
        endogenous: impl Into<String>,
        instruments: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let endogenous = endogenous.into();
        Self {
            response: response.into(),
            predicted_column: format!("predicted_{endogenous}"),
            endogenous,
            instruments: instruments.into_iter().map(Into::into).collect(),
            exogenous: Vec::new(),
        }
    }

    /// Add an exogenous regressor.
    pub fn with_exogenous(mut self, column: impl Into<String>) -> Self {
        self.exogenous.push(column.into());
        self
    }

    /// Rename the prediction column.
    pub fn with_predicted_column(mut self, column: impl Into<String>) -> Self {
        self.predicted_column = column.into();
        self
    }

    /// Check that the spec identifies the endogenous coefficient.
    pub fn validate(&self) -> Result<()> {
        if self.instruments.is_empty() {
            return Err(ModelError::Specification(format!(
                "no instruments configured for `{}`",
                self.endogenous
            )));
        }

        let reserved = [&self.response, &self.endogenous, &self.predicted_column];
        if let Some(bad) = self
            .instruments
            .iter()
            .chain(&self.exogenous)
            .find(|c| reserved.contains(c))
        {
            return Err(ModelError::Specification(format!(
                "`{bad}` cannot be both a regressor and the response, endogenous or predicted column"
            )));
        }

        if let Some(both) = self.instruments.iter().find(|c| self.exogenous.contains(c)) {
            return Err(ModelError::Specification(format!(
                "`{both}` is listed both as an instrument and as exogenous"
            )));
        }

        Ok(())
    }

    /// `endogenous ~ instruments + exogenous`
    pub fn first_stage_formula(&self) -> Result<FormulaSpec> {
        self.validate()?;
        Ok(self
            .instruments
            .iter()
            .chain(&self.exogenous)
            .fold(FormulaSpec::new(&self.endogenous), |f, c| f.numeric(c)))
    }

    /// `response ~ predicted + exogenous`
    pub fn second_stage_formula(&self) -> FormulaSpec {
        self.exogenous.iter().fold(
            FormulaSpec::new(&self.response).numeric(&self.predicted_column),
            |f, c| f.numeric(c),
        )
    }
}

/// Fitted stage 1 and its predictions.
#[derive(Debug, Clone)]
pub struct FirstStage {
    /// Stage-1 regression
    pub model: FittedModel,
    /// Prediction for every row of the table stage 1 was fitted on
    pub predictions: Vec<Option<f64>>,
    /// Column the predictions are written to
    pub predicted_column: String,
}

impl FirstStage {
    /// Rows with a prediction.
    pub fn predicted_rows(&self) -> usize {
        self.predictions.iter().filter(|p| p.is_some()).count()
    }

    /// Copy of `df` with the prediction column set to the stage-1 predictions.
    ///
    /// An existing column of that name is replaced. `df` must be the table
    /// stage 1 was fitted on.
    pub fn augment(&self, df: &DataFrame) -> Result<DataFrame> {
        if df.height() != self.predictions.len() {
            return Err(ModelError::Sequencing(format!(
                "stage 1 predicted {} rows but the table has {}",
                self.predictions.len(),
                df.height()
            )));
        }

        let mut out = df.clone();
        out.with_column(Column::new(
            self.predicted_column.as_str().into(),
            self.predictions.clone(),
        ))?;
        Ok(out)
    }
}

/// Both stages and the structural coefficient table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwoStageFit {
    /// Stage-1 regression
    pub first_stage: FitSummary,
    /// Stage-2 regression with naive standard errors
    pub second_stage: FitSummary,
    /// Stage-2 estimates with structural standard errors, endogenous regressor under its own name
    pub structural: Vec<Coefficient>,
    /// Residual standard error against the observed endogenous regressor
    pub structural_residual_std_error: f64,
    /// Stage-1 predictions, one per input row
    #[serde(skip)]
    pub predicted: Vec<Option<f64>>,
}

impl TwoStageFit {
    /// Structural coefficient by name.
    pub fn structural_coefficient(&self, term: &str) -> Option<&Coefficient> {
        self.structural.iter().find(|c| c.term == term)
    }
}

/// Two-stage least squares estimator.
#[derive(Debug, Clone)]
pub struct TwoStageLeastSquares {
    spec: TwoStageSpec,
    estimator: OlsEstimator,
}

impl TwoStageLeastSquares {
    /// Create an estimator for `spec`.
    pub const fn new(spec: TwoStageSpec, estimator: OlsEstimator) -> Self {
        Self { spec, estimator }
    }

    /// Model columns.
    pub const fn spec(&self) -> &TwoStageSpec {
        &self.spec
    }

    /// Regress the endogenous column on instruments and exogenous columns,
    /// then predict it for every row whose regressors are present.
    pub fn fit_first_stage(&self, df: &DataFrame) -> Result<FirstStage> {
        let formula = self.spec.first_stage_formula()?;
        let model = self.estimator.fit(&formula, df)?;
        let predictions = model.predict(df)?;

        let first = FirstStage {
            model,
            predictions,
            predicted_column: self.spec.predicted_column.clone(),
        };
        tracing::info!(
            formula = %formula,
            predicted = first.predicted_rows(),
            rows = df.height(),
            "fitted first stage"
        );
        Ok(first)
    }

    /// Fit stage 2 on `df` augmented with the stage-1 predictions.
    ///
    /// Any prediction column already in `df` is overwritten, so stage 2
    /// never reads values that did not come from `first`.
    pub fn fit_second_stage(&self, df: &DataFrame, first: &FirstStage) -> Result<FittedModel> {
        if first.predicted_column != self.spec.predicted_column {
            return Err(ModelError::Sequencing(format!(
                "stage 1 wrote `{}` but stage 2 reads `{}`",
                first.predicted_column, self.spec.predicted_column
            )));
        }

        let augmented = first.augment(df)?;
        let formula = self.spec.second_stage_formula();
        self.estimator.fit(&formula, &augmented)
    }

    /// Run both stages and compute structural standard errors.
    pub fn fit(&self, df: &DataFrame) -> Result<TwoStageFit> {
        let first = self.fit_first_stage(df)?;
        let second = self.fit_second_stage(df, &first)?;
        let (structural, structural_residual_std_error) = self.structural(df, &second)?;

        Ok(TwoStageFit {
            first_stage: first.model.into_summary(),
            second_stage: second.summary().clone(),
            structural,
            structural_residual_std_error,
            predicted: first.predictions,
        })
    }

    fn structural(&self, df: &DataFrame, second: &FittedModel) -> Result<(Vec<Coefficient>, f64)> {
        let design: &DesignMatrix = second.design();
        let formula = second.formula();
        let k = design
            .column_index(&self.spec.predicted_column)
            .ok_or_else(|| {
                ModelError::Sequencing(format!(
                    "stage 2 has no `{}` coefficient",
                    self.spec.predicted_column
                ))
            })?;

        let observed = numeric_values(df, formula, &self.spec.endogenous)?;
        let beta_k = second.coefficients()[k];

        // X b differs from X_hat b only in column k
        let residuals: Vec<f64> = design
            .rows
            .iter()
            .enumerate()
            .filter_map(|(r, &row)| {
                let actual = observed[row]?;
                Some(second.residuals()[r] - beta_k * (actual - design.x[[r, k]]))
            })
            .collect();

        let p = design.nparams();
        let m = residuals.len();
        if m <= p {
            return Err(ModelError::InsufficientData {
                formula: formula.to_string(),
                observations: m,
                parameters: p,
            });
        }
        if m < design.nobs() {
            tracing::debug!(
                missing = design.nobs() - m,
                "stage-2 rows without an observed endogenous value left out of the structural residuals"
            );
        }

        let df_residual = m - p;
        let sigma2 = residuals.iter().map(|u| u * u).sum::<f64>() / df_residual as f64;
        let standard_errors: Array1<f64> = second
            .xtx_inverse()
            .diag()
            .mapv(|v| (sigma2 * v).max(0.0).sqrt());

        let mut table = coefficient_table(
            &design.columns,
            formula,
            second.coefficients(),
            &standard_errors,
            df_residual,
        );
        if let Some(row) = table.get_mut(k) {
            row.term = self.spec.endogenous.clone();
        }

        Ok((table, sigma2.sqrt()))
    }
}
