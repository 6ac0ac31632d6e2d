//! Ordinary Least Squares
//!
//! Solves the normal equations
//!
//! (X^T X) b = X^T y
//!
//! through a Cholesky factorization of X^T X. Standard errors come from
//! s^2 (X^T X)^-1 with s^2 = RSS / (n - p), and two-sided p-values from the
//! Student t distribution with n - p degrees of freedom.
//!
//! A column of X that is (numerically) a linear combination of earlier
//! columns stops the fit with [`ModelError::Singular`] naming the offending
//! coefficient, instead of returning a degenerate solution.

use crate::design::{DesignColumn, DesignMatrix, FactorLevels, INTERCEPT, TermValues};
use crate::distribution::{f_upper_tail, student_t_two_sided};
use crate::error::{ModelError, Result};
use crate::formula::{FormulaSpec, Term};
use crate::linalg::{DEFAULT_RANK_TOLERANCE, LinalgError, cholesky, cholesky_inverse, cholesky_solve};
use crate::summary::{Coefficient, FitSummary};
use ndarray::{Array1, Array2};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

/// OLS configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OlsConfig {
    /// Relative Cholesky pivot below which a column counts as collinear
    pub rank_tolerance: f64,
}

impl Default for OlsConfig {
    fn default() -> Self {
        Self {
            rank_tolerance: DEFAULT_RANK_TOLERANCE,
        }
    }
}

/// Ordinary least squares estimator
#[derive(Debug, Clone, Default)]
pub struct OlsEstimator {
    config: OlsConfig,
}

impl OlsEstimator {
    /// Create an estimator with the given configuration
    pub const fn new(config: OlsConfig) -> Self {
        Self { config }
    }

    /// Estimator configuration
    pub const fn config(&self) -> &OlsConfig {
        &self.config
    }

    /// Fit `formula` on `df`
    ///
    /// # Arguments
    /// * `formula` - Response and regressors
    /// * `df` - Table holding every column the formula names
    ///
    /// # Returns
    /// * Fitted model with its coefficient table
    pub fn fit(&self, formula: &FormulaSpec, df: &DataFrame) -> Result<FittedModel> {
        let design = DesignMatrix::build(df, formula)?;
        self.fit_design(formula, design)
    }

    /// Fit an already built design matrix
    pub fn fit_design(&self, formula: &FormulaSpec, design: DesignMatrix) -> Result<FittedModel> {
        let x = &design.x;
        let y = &design.y;
        let n = design.nobs();
        let p = design.nparams();

        let xtx = x.t().dot(x);
        let xty = x.t().dot(y);

        let factor = cholesky(&xtx, self.config.rank_tolerance)
            .map_err(|e| linalg_error(formula, &design.columns, e))?;
        let beta = cholesky_solve(&factor, &xty).map_err(|e| linalg_error(formula, &design.columns, e))?;
        let xtx_inv = cholesky_inverse(&factor).map_err(|e| linalg_error(formula, &design.columns, e))?;

        let fitted_values = x.dot(&beta);
        let residuals = y - &fitted_values;

        let df_residual = n - p;
        let rss = residuals.dot(&residuals);
        let sigma2 = rss / df_residual as f64;

        let standard_errors = xtx_inv.diag().mapv(|v| (sigma2 * v).max(0.0).sqrt());
        let coefficients =
            coefficient_table(&design.columns, formula, &beta, &standard_errors, df_residual);

        let tss = if formula.intercept {
            let mean = y.mean().unwrap_or_default();
            y.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
        } else {
            y.dot(y)
        };
        let r_squared = if tss > 0.0 { 1.0 - rss / tss } else { 0.0 };

        let baseline = usize::from(formula.intercept);
        let adj_r_squared =
            1.0 - (1.0 - r_squared) * (n - baseline) as f64 / df_residual as f64;

        let df_model = p - baseline;
        let (f_statistic, f_p_value) = if df_model > 0 {
            let f = ((tss - rss) / df_model as f64) / sigma2;
            (
                Some(f),
                Some(f_upper_tail(f, df_model as f64, df_residual as f64)),
            )
        } else {
            (None, None)
        };

        let summary = FitSummary {
            formula: formula.to_string(),
            coefficients,
            nobs: n,
            df_residual,
            r_squared,
            adj_r_squared,
            residual_std_error: sigma2.sqrt(),
            f_statistic,
            f_p_value,
            dropped_rows: design.dropped_rows,
        };

        tracing::debug!(
            formula = %formula,
            nobs = n,
            r_squared,
            "fitted OLS"
        );

        Ok(FittedModel {
            formula: formula.clone(),
            design,
            beta,
            xtx_inv,
            fitted_values,
            residuals,
            summary,
        })
    }
}

fn linalg_error(formula: &FormulaSpec, columns: &[DesignColumn], error: LinalgError) -> ModelError {
    match error {
        LinalgError::Singular { column } => ModelError::Singular {
            formula: formula.to_string(),
            term: columns
                .get(column)
                .map_or_else(|| format!("column {column}"), |c| c.name.clone()),
        },
        other => ModelError::Specification(format!("`{formula}`: {other}")),
    }
}

/// Coefficient rows for estimates and standard errors aligned with `columns`.
pub(crate) fn coefficient_table(
    columns: &[DesignColumn],
    formula: &FormulaSpec,
    beta: &Array1<f64>,
    standard_errors: &Array1<f64>,
    df_residual: usize,
) -> Vec<Coefficient> {
    columns
        .iter()
        .zip(beta.iter().zip(standard_errors.iter()))
        .map(|(column, (&estimate, &std_error))| {
            let t_statistic = estimate / std_error;
            let factor = column
                .term
                .and_then(|t| formula.terms.get(t))
                .filter(|t| t.is_categorical())
                .map(|t| t.column().to_string());
            Coefficient {
                term: column.name.clone(),
                factor,
                level: column.level.clone(),
                estimate,
                std_error,
                t_statistic,
                p_value: student_t_two_sided(t_statistic, df_residual as f64),
            }
        })
        .collect()
}

/// Result of an OLS fit
#[derive(Debug, Clone)]
pub struct FittedModel {
    formula: FormulaSpec,
    design: DesignMatrix,
    beta: Array1<f64>,
    xtx_inv: Array2<f64>,
    fitted_values: Array1<f64>,
    residuals: Array1<f64>,
    summary: FitSummary,
}

impl FittedModel {
    /// Coefficient table and fit statistics
    pub const fn summary(&self) -> &FitSummary {
        &self.summary
    }

    /// Consume the model, keeping only its summary
    pub fn into_summary(self) -> FitSummary {
        self.summary
    }

    /// Formula as fitted
    pub const fn formula(&self) -> &FormulaSpec {
        &self.formula
    }

    /// Coefficient by name
    pub fn coefficient(&self, term: &str) -> Option<&Coefficient> {
        self.summary.coefficient(term)
    }

    /// Estimates in design-matrix order
    pub const fn coefficients(&self) -> &Array1<f64> {
        &self.beta
    }

    /// (X^T X)^-1 of the fitted design
    pub const fn xtx_inverse(&self) -> &Array2<f64> {
        &self.xtx_inv
    }

    /// Design matrix the model was fitted on
    pub const fn design(&self) -> &DesignMatrix {
        &self.design
    }

    /// Fitted values of the rows used
    pub const fn fitted_values(&self) -> &Array1<f64> {
        &self.fitted_values
    }

    /// Residuals of the rows used
    pub const fn residuals(&self) -> &Array1<f64> {
        &self.residuals
    }

    /// Levels of the categorical terms as fitted
    pub fn factor_levels(&self) -> &[FactorLevels] {
        &self.design.factors
    }

    /// Predict the response for every row of `df`
    ///
    /// Rows with a missing regressor, or a categorical level the model never
    /// saw, get `None`. The response column itself is not required.
    pub fn predict(&self, df: &DataFrame) -> Result<Vec<Option<f64>>> {
        let values = self
            .formula
            .terms
            .iter()
            .map(|term| TermValues::extract(df, &self.formula, term))
            .collect::<Result<Vec<_>>>()?;

        let mut unseen = 0usize;
        let predictions: Vec<Option<f64>> = (0..df.height())
            .map(|row| {
                let prediction = self.predict_row(&values, row);
                if prediction.is_none() && values.iter().all(|v| v.is_present(row)) {
                    unseen += 1;
                }
                prediction
            })
            .collect();

        if unseen > 0 {
            tracing::warn!(
                formula = %self.formula,
                rows = unseen,
                "rows with factor levels absent from the fit left unpredicted"
            );
        }

        Ok(predictions)
    }

    fn predict_row(&self, values: &[TermValues], row: usize) -> Option<f64> {
        let mut prediction = 0.0;
        let mut coefficient = self.beta.iter();
        if self.formula.intercept {
            prediction += coefficient.next()?;
        }

        let mut factors = self.design.factors.iter();
        for (term, term_values) in self.formula.terms.iter().zip(values) {
            match (term, term_values) {
                (Term::Numeric { .. }, TermValues::Numeric(v)) => {
                    prediction += coefficient.next()? * v[row]?;
                }
                (Term::Categorical { .. }, TermValues::Categorical(v)) => {
                    let factor = factors.next()?;
                    let level = v[row].as_deref()?;
                    if !factor.knows(level) {
                        return None;
                    }
                    let estimates: Vec<f64> =
                        coefficient.by_ref().take(factor.levels.len()).copied().collect();
                    if let Some(pos) = factor.position(level) {
                        prediction += estimates.get(pos)?;
                    }
                }
                _ => return None,
            }
        }

        Some(prediction)
    }

    /// Name of the intercept coefficient when the model has one
    pub fn intercept_name(&self) -> Option<&'static str> {
        self.formula.intercept.then_some(INTERCEPT)
    }
}
