//! Regression result tables

use serde::{Deserialize, Serialize};

/// Significance code in the usual regression-table convention.
///
/// `***` p < 0.001, `**` p < 0.01, `*` p < 0.05, `.` p < 0.1.
pub fn significance_code(p_value: f64) -> &'static str {
    match p_value {
        p if p < 0.001 => "***",
        p if p < 0.01 => "**",
        p if p < 0.05 => "*",
        p if p < 0.1 => ".",
        _ => "",
    }
}

/// One row of a coefficient table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coefficient {
    /// Coefficient name, e.g. `final_price` or `brand_factor[Acme]`
    pub term: String,
    /// Categorical column the indicator belongs to
    pub factor: Option<String>,
    /// Level the indicator encodes
    pub level: Option<String>,
    /// Point estimate
    pub estimate: f64,
    /// Standard error
    pub std_error: f64,
    /// Estimate over standard error
    pub t_statistic: f64,
    /// Two-sided p-value
    pub p_value: f64,
}

impl Coefficient {
    /// Significance code of this coefficient.
    pub fn significance(&self) -> &'static str {
        significance_code(self.p_value)
    }
}

/// Fitted model summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitSummary {
    /// Formula as fitted
    pub formula: String,
    /// Coefficient table in design-matrix order
    pub coefficients: Vec<Coefficient>,
    /// Observations used
    pub nobs: usize,
    /// Residual degrees of freedom
    pub df_residual: usize,
    /// Coefficient of determination
    pub r_squared: f64,
    /// R^2 adjusted for the number of parameters
    pub adj_r_squared: f64,
    /// Square root of the residual variance
    pub residual_std_error: f64,
    /// Overall F statistic, absent when the model has no slope terms
    pub f_statistic: Option<f64>,
    /// P-value of the F statistic
    pub f_p_value: Option<f64>,
    /// Rows dropped for missing values
    pub dropped_rows: usize,
}

impl FitSummary {
    /// Coefficient by name.
    pub fn coefficient(&self, term: &str) -> Option<&Coefficient> {
        self.coefficients.iter().find(|c| c.term == term)
    }

    /// Indicator coefficients of one categorical column.
    pub fn factor_coefficients<'a>(
        &'a self,
        factor: &'a str,
    ) -> impl Iterator<Item = &'a Coefficient> + 'a {
        self.coefficients
            .iter()
            .filter(move |c| c.factor.as_deref() == Some(factor))
    }

    /// Number of estimated parameters, intercept included.
    pub fn parameters(&self) -> usize {
        self.nobs - self.df_residual
    }
}
