//! Model formulas
//!
//! A formula names a response and an ordered list of regressors. Regressors
//! are either numeric columns used as-is, or categorical columns expanded
//! into one indicator per non-reference level:
//!
//! ```text
//! sales ~ final_price + marketing_expense + C(brand_factor, ref = "Acme")
//! ```
//!
//! A categorical term always carries its reference level. There is no
//! implicit first-level or alphabetical choice, so coefficients keep their
//! meaning whatever order the data arrives in.

use crate::error::{ModelError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One regressor of a formula.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Term {
    /// Numeric column entering the model with a single coefficient.
    Numeric {
        /// Column name
        column: String,
    },

    /// Categorical column expanded into indicators for every level but the
    /// reference.
    Categorical {
        /// Column name
        column: String,
        /// Level absorbed into the intercept
        reference: String,
    },
}

impl Term {
    /// Numeric term.
    pub fn numeric(column: impl Into<String>) -> Self {
        Self::Numeric {
            column: column.into(),
        }
    }

    /// Categorical term with an explicit reference level.
    pub fn categorical(column: impl Into<String>, reference: impl Into<String>) -> Self {
        Self::Categorical {
            column: column.into(),
            reference: reference.into(),
        }
    }

    /// Source column of the term.
    pub fn column(&self) -> &str {
        match self {
            Self::Numeric { column } | Self::Categorical { column, .. } => column,
        }
    }

    /// Whether the term is categorical.
    pub const fn is_categorical(&self) -> bool {
        matches!(self, Self::Categorical { .. })
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric { column } => write!(f, "{column}"),
            Self::Categorical { column, reference } => {
                write!(f, "C({column}, ref = \"{reference}\")")
            }
        }
    }
}

/// Response, regressors and intercept of a linear model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormulaSpec {
    /// Response column
    pub response: String,
    /// Regressors in design-matrix order
    pub terms: Vec<Term>,
    /// Whether an intercept column is added
    pub intercept: bool,
}

impl FormulaSpec {
    /// Formula with an intercept and no regressors yet.
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            terms: Vec::new(),
            intercept: true,
        }
    }

    /// Append a numeric regressor.
    pub fn numeric(mut self, column: impl Into<String>) -> Self {
        self.terms.push(Term::numeric(column));
        self
    }

    /// Append a categorical regressor.
    pub fn categorical(mut self, column: impl Into<String>, reference: impl Into<String>) -> Self {
        self.terms.push(Term::categorical(column, reference));
        self
    }

    /// Drop the intercept.
    pub fn without_intercept(mut self) -> Self {
        self.intercept = false;
        self
    }

    /// Columns the formula reads, response first, without repeats.
    pub fn columns(&self) -> Vec<&str> {
        let mut columns = vec![self.response.as_str()];
        for term in &self.terms {
            if !columns.contains(&term.column()) {
                columns.push(term.column());
            }
        }
        columns
    }

    /// Number of formula-level parameters before factor expansion.
    pub fn term_count(&self) -> usize {
        self.terms.len() + usize::from(self.intercept)
    }
}

impl fmt::Display for FormulaSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ~ ", self.response)?;

        let mut parts: Vec<String> = Vec::with_capacity(self.terms.len() + 1);
        if !self.intercept {
            parts.push("0".to_string());
        } else if self.terms.is_empty() {
            parts.push("1".to_string());
        }
        parts.extend(self.terms.iter().map(ToString::to_string));

        write!(f, "{}", parts.join(" + "))
    }
}

impl FromStr for FormulaSpec {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: &str| ModelError::Formula {
            formula: s.to_string(),
            reason: reason.to_string(),
        };

        let (lhs, rhs) = s.split_once('~').ok_or_else(|| invalid("missing `~`"))?;
        if rhs.contains('~') {
            return Err(invalid("more than one `~`"));
        }

        let response = lhs.trim();
        if !is_identifier(response) {
            return Err(invalid("response must be a single column name"));
        }

        let mut formula = Self::new(response);
        for piece in split_top_level(rhs, '+').map_err(|r| invalid(&r))? {
            let piece = piece.trim();
            match piece {
                "" => return Err(invalid("empty term")),
                "1" => formula.intercept = true,
                "0" | "-1" => formula.intercept = false,
                _ if piece.starts_with("C(") => {
                    let term = parse_categorical(piece).map_err(|r| invalid(&r))?;
                    formula.terms.push(term);
                }
                _ if is_identifier(piece) => formula.terms.push(Term::numeric(piece)),
                _ => return Err(invalid(&format!("cannot parse term `{piece}`"))),
            }
        }

        Ok(formula)
    }
}

fn parse_categorical(piece: &str) -> std::result::Result<Term, String> {
    let inner = piece
        .strip_prefix("C(")
        .and_then(|rest| rest.strip_suffix(')'))
        .ok_or_else(|| format!("unbalanced parentheses in `{piece}`"))?;

    let mut args = split_top_level(inner, ',')?.into_iter();
    let column = args.next().map(str::trim).unwrap_or_default();
    if !is_identifier(column) {
        return Err(format!("`{piece}` must name a column"));
    }

    let mut reference = None;
    for arg in args {
        let (key, value) = arg
            .split_once('=')
            .ok_or_else(|| format!("expected `ref = <level>` in `{piece}`"))?;
        if key.trim() != "ref" {
            return Err(format!("unknown argument `{}` in `{piece}`", key.trim()));
        }
        reference = Some(unquote(value.trim()).to_string());
    }

    match reference {
        Some(level) if !level.is_empty() => Ok(Term::categorical(column, level)),
        _ => Err(format!("`{piece}` needs an explicit reference level")),
    }
}

fn split_top_level(s: &str, separator: char) -> std::result::Result<Vec<&str>, String> {
    let mut pieces = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in s.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| "unbalanced parentheses".to_string())?;
            }
            (None, c) if c == separator && depth == 0 => {
                pieces.push(&s[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }

    if depth != 0 || quote.is_some() {
        return Err("unbalanced parentheses or quotes".to_string());
    }
    pieces.push(&s[start..]);
    Ok(pieces)
}

fn unquote(s: &str) -> &str {
    for q in ['"', '\''] {
        if let Some(inner) = s.strip_prefix(q).and_then(|rest| rest.strip_suffix(q)) {
            return inner;
        }
    }
    s
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '.')
}
