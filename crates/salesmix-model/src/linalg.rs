//! Dense linear algebra for the normal equations
//!
//! Least squares only ever needs to factor the symmetric positive
//! (semi-)definite cross-product matrix X^T X, so a Cholesky factorization
//! covers solving, inverting and rank detection.

use ndarray::{Array1, Array2};
use thiserror::Error;

/// Relative pivot below which a column is treated as linearly dependent.
pub const DEFAULT_RANK_TOLERANCE: f64 = 1e-10;

/// Errors from the factorization routines
#[derive(Debug, Error, PartialEq)]
pub enum LinalgError {
    /// Matrix is not square
    #[error("Matrix is not square: {rows}x{cols}")]
    NotSquare {
        /// Number of rows
        rows: usize,
        /// Number of columns
        cols: usize,
    },

    /// Column `column` lies (numerically) in the span of the columns before it
    #[error("Matrix is singular at column {column}")]
    Singular {
        /// Zero-based index of the dependent column
        column: usize,
    },

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension
        actual: usize,
    },
}

/// Cholesky factorization A = L * L^T of a symmetric matrix
///
/// The pivot of column k is the squared norm of column k of the underlying
/// data after projecting out the earlier columns. A pivot at or below
/// `tolerance * A[k, k]` means column k adds no new direction, and the
/// factorization stops with [`LinalgError::Singular`] naming that column.
///
/// # Arguments
/// * `a` - Symmetric positive definite matrix
/// * `tolerance` - Relative pivot threshold
///
/// # Returns
/// * Lower triangular factor L
pub fn cholesky(a: &Array2<f64>, tolerance: f64) -> Result<Array2<f64>, LinalgError> {
    let n = a.nrows();
    if n != a.ncols() {
        return Err(LinalgError::NotSquare {
            rows: n,
            cols: a.ncols(),
        });
    }

    let mut l = Array2::<f64>::zeros((n, n));

    for j in 0..n {
        let mut pivot = a[[j, j]];
        for k in 0..j {
            pivot -= l[[j, k]] * l[[j, k]];
        }

        let scale = a[[j, j]].abs();
        if !pivot.is_finite() || scale == 0.0 || pivot <= tolerance * scale {
            return Err(LinalgError::Singular { column: j });
        }

        let diag = pivot.sqrt();
        l[[j, j]] = diag;

        for i in (j + 1)..n {
            let mut sum = a[[i, j]];
            for k in 0..j {
                sum -= l[[i, k]] * l[[j, k]];
            }
            l[[i, j]] = sum / diag;
        }
    }

    Ok(l)
}

/// Solve (L * L^T) x = b given the Cholesky factor L
pub fn cholesky_solve(l: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>, LinalgError> {
    let n = l.nrows();
    if b.len() != n {
        return Err(LinalgError::DimensionMismatch {
            expected: n,
            actual: b.len(),
        });
    }

    // Forward substitution: L z = b
    let mut z = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = b[i];
        for k in 0..i {
            sum -= l[[i, k]] * z[k];
        }
        z[i] = sum / l[[i, i]];
    }

    // Back substitution: L^T x = z
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = z[i];
        for k in (i + 1)..n {
            sum -= l[[k, i]] * x[k];
        }
        x[i] = sum / l[[i, i]];
    }

    Ok(x)
}

/// Inverse of L * L^T given the Cholesky factor L
pub fn cholesky_inverse(l: &Array2<f64>) -> Result<Array2<f64>, LinalgError> {
    let n = l.nrows();
    let mut inverse = Array2::<f64>::zeros((n, n));

    for j in 0..n {
        let mut unit = Array1::<f64>::zeros(n);
        unit[j] = 1.0;
        let column = cholesky_solve(l, &unit)?;
        inverse.column_mut(j).assign(&column);
    }

    // Symmetrize away rounding noise
    let symmetric = (&inverse + &inverse.t()) / 2.0;
    Ok(symmetric)
}
