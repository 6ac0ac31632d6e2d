//! Design matrix construction
//!
//! Turns a [`FormulaSpec`] and a table into the dense `X` and `y` used by
//! least squares. Rows with a missing or non-finite value in any referenced
//! column are dropped listwise. Categorical terms expand into 0/1
//! indicators, one per level present among the complete rows, except the
//! reference level.

use crate::error::{ModelError, Result};
use crate::formula::{FormulaSpec, Term};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Name of the intercept column.
pub const INTERCEPT: &str = "(Intercept)";

/// Levels of a categorical term as seen in the fitted data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactorLevels {
    /// Categorical column
    pub column: String,
    /// Level absorbed into the intercept
    pub reference: String,
    /// Non-reference levels, sorted, one indicator column each
    pub levels: Vec<String>,
}

impl FactorLevels {
    /// Design column name of a level, e.g. `brand_factor[Acme]`.
    pub fn column_name(&self, level: &str) -> String {
        format!("{}[{}]", self.column, level)
    }

    /// Indicator position of a level, `None` for the reference or an unseen level.
    pub fn position(&self, level: &str) -> Option<usize> {
        self.levels.iter().position(|l| l == level)
    }

    /// Whether the level was present when the model was fitted.
    pub fn knows(&self, level: &str) -> bool {
        level == self.reference || self.position(level).is_some()
    }
}

/// One column of the design matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignColumn {
    /// Coefficient name
    pub name: String,
    /// Index into the formula terms, `None` for the intercept
    pub term: Option<usize>,
    /// Factor level for categorical indicators
    pub level: Option<String>,
}

/// Values of one formula column, aligned with the table rows.
#[derive(Debug, Clone)]
pub(crate) enum TermValues {
    Numeric(Vec<Option<f64>>),
    Categorical(Vec<Option<String>>),
}

impl TermValues {
    pub(crate) fn extract(df: &DataFrame, formula: &FormulaSpec, term: &Term) -> Result<Self> {
        match term {
            Term::Numeric { column } => numeric_values(df, formula, column).map(Self::Numeric),
            Term::Categorical { column, .. } => {
                categorical_values(df, formula, column).map(Self::Categorical)
            }
        }
    }

    pub(crate) fn is_present(&self, row: usize) -> bool {
        match self {
            Self::Numeric(values) => values[row].is_some(),
            Self::Categorical(values) => values[row].is_some(),
        }
    }
}

fn lookup<'a>(df: &'a DataFrame, formula: &FormulaSpec, name: &str) -> Result<&'a Column> {
    df.column(name).map_err(|_| ModelError::MissingColumn {
        formula: formula.to_string(),
        column: name.to_string(),
    })
}

/// Column as f64, treating nulls and non-finite values as missing.
pub(crate) fn numeric_values(
    df: &DataFrame,
    formula: &FormulaSpec,
    name: &str,
) -> Result<Vec<Option<f64>>> {
    let column = lookup(df, formula, name)?.cast(&DataType::Float64)?;
    let values = column
        .as_materialized_series()
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| x.is_finite()))
        .collect();
    Ok(values)
}

pub(crate) fn categorical_values(
    df: &DataFrame,
    formula: &FormulaSpec,
    name: &str,
) -> Result<Vec<Option<String>>> {
    let column = lookup(df, formula, name)?.cast(&DataType::String)?;
    let values = column
        .as_materialized_series()
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect();
    Ok(values)
}

/// Dense regression inputs built from a formula and a table.
#[derive(Debug, Clone)]
pub struct DesignMatrix {
    /// Regressors, one row per complete observation
    pub x: Array2<f64>,
    /// Response
    pub y: Array1<f64>,
    /// Column descriptions, aligned with the columns of `x`
    pub columns: Vec<DesignColumn>,
    /// Levels of every categorical term, in term order
    pub factors: Vec<FactorLevels>,
    /// Table row index of each row of `x`
    pub rows: Vec<usize>,
    /// Rows dropped for missing values
    pub dropped_rows: usize,
}

impl DesignMatrix {
    /// Build `X` and `y` for `formula` from `df`.
    pub fn build(df: &DataFrame, formula: &FormulaSpec) -> Result<Self> {
        if formula.term_count() == 0 {
            return Err(ModelError::Specification(format!(
                "`{formula}` has neither an intercept nor regressors"
            )));
        }

        let response = numeric_values(df, formula, &formula.response)?;
        let values = formula
            .terms
            .iter()
            .map(|term| TermValues::extract(df, formula, term))
            .collect::<Result<Vec<_>>>()?;

        let rows: Vec<usize> = (0..df.height())
            .filter(|&i| response[i].is_some() && values.iter().all(|v| v.is_present(i)))
            .collect();
        let dropped_rows = df.height() - rows.len();
        if dropped_rows > 0 {
            tracing::info!(
                formula = %formula,
                dropped = dropped_rows,
                kept = rows.len(),
                "dropped rows with missing values"
            );
        }

        let mut columns = Vec::new();
        let mut factors = Vec::new();
        if formula.intercept {
            columns.push(DesignColumn {
                name: INTERCEPT.to_string(),
                term: None,
                level: None,
            });
        }

        for (index, (term, term_values)) in formula.terms.iter().zip(&values).enumerate() {
            match (term, term_values) {
                (Term::Categorical { column, reference }, TermValues::Categorical(labels)) => {
                    let factor = observed_levels(formula, column, reference, labels, &rows)?;
                    for level in &factor.levels {
                        columns.push(DesignColumn {
                            name: factor.column_name(level),
                            term: Some(index),
                            level: Some(level.clone()),
                        });
                    }
                    factors.push(factor);
                }
                _ => columns.push(DesignColumn {
                    name: term.column().to_string(),
                    term: Some(index),
                    level: None,
                }),
            }
        }

        let n = rows.len();
        let p = columns.len();
        if n <= p {
            return Err(ModelError::InsufficientData {
                formula: formula.to_string(),
                observations: n,
                parameters: p,
            });
        }

        let mut x = Array2::<f64>::zeros((n, p));
        let mut y = Array1::<f64>::zeros(n);
        for (r, &row) in rows.iter().enumerate() {
            y[r] = response[row].unwrap_or_default();

            let mut c = 0;
            if formula.intercept {
                x[[r, 0]] = 1.0;
                c = 1;
            }
            let mut factor_iter = factors.iter();
            for term_values in &values {
                match term_values {
                    TermValues::Numeric(v) => {
                        x[[r, c]] = v[row].unwrap_or_default();
                        c += 1;
                    }
                    TermValues::Categorical(v) => {
                        let Some(factor) = factor_iter.next() else {
                            break;
                        };
                        if let Some(pos) = v[row].as_deref().and_then(|l| factor.position(l)) {
                            x[[r, c + pos]] = 1.0;
                        }
                        c += factor.levels.len();
                    }
                }
            }
        }

        tracing::debug!(formula = %formula, rows = n, columns = p, "built design matrix");

        Ok(Self {
            x,
            y,
            columns,
            factors,
            rows,
            dropped_rows,
        })
    }

    /// Number of observations.
    pub fn nobs(&self) -> usize {
        self.x.nrows()
    }

    /// Number of parameters.
    pub fn nparams(&self) -> usize {
        self.x.ncols()
    }

    /// Index of a design column by coefficient name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

fn observed_levels(
    formula: &FormulaSpec,
    column: &str,
    reference: &str,
    labels: &[Option<String>],
    rows: &[usize],
) -> Result<FactorLevels> {
    let observed: BTreeSet<&str> = rows.iter().filter_map(|&i| labels[i].as_deref()).collect();

    if !observed.contains(reference) {
        return Err(ModelError::UnknownReferenceLevel {
            formula: formula.to_string(),
            column: column.to_string(),
            level: reference.to_string(),
        });
    }

    Ok(FactorLevels {
        column: column.to_string(),
        reference: reference.to_string(),
        levels: observed
            .into_iter()
            .filter(|l| *l != reference)
            .map(str::to_string)
            .collect(),
    })
}
